//! Character-level scanning for the command language.
//!
//! The language is context sensitive (`$` starts a shell command at the
//! beginning of an expression but is an ordinary character inside a word), so
//! the scanner does not produce a token stream up front. The parser asks for
//! the next word, separator or shell command depending on where it is.

use thiserror::Error;

/// Errors that can occur while scanning.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A closing quote (single or double) was not found.
    #[error("unterminated quote")]
    UnfinishedQuote,
    /// A `{{` block was not closed with `}}`.
    #[error("missing closing '}}}}'")]
    UnfinishedBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordState {
    Plain,
    SingleQuote,
    DoubleQuote,
}

pub(crate) struct Scanner {
    input: Vec<char>,
    pos: usize,
    line: usize,
}

impl Scanner {
    pub(crate) fn new(text: &str) -> Self {
        Scanner {
            input: text.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    /// 1-based line of the next unread character.
    pub(crate) fn line(&self) -> usize {
        self.line
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub(crate) fn at_open_block(&self) -> bool {
        self.peek() == Some('{') && self.peek_at(1) == Some('{')
    }

    pub(crate) fn at_close_block(&self) -> bool {
        self.peek() == Some('}') && self.peek_at(1) == Some('}')
    }

    /// Consume `{{` or `}}`.
    pub(crate) fn bump_block(&mut self) {
        self.pos += 2;
    }

    /// True at `;`, newline, `}}` or end of input.
    pub(crate) fn at_terminator(&self) -> bool {
        matches!(self.peek(), None | Some(';') | Some('\n')) || self.at_close_block()
    }

    /// Skip spaces, tabs and a trailing comment, stopping before a newline.
    pub(crate) fn skip_blanks(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '#' => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    /// Skip blanks, comments and expression separators.
    pub(crate) fn skip_separators(&mut self) {
        loop {
            self.skip_blanks();
            match self.peek() {
                Some(';') | Some('\n') => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    pub(crate) fn bump_char(&mut self) -> Option<char> {
        self.bump()
    }

    /// Read the next word, or `None` if the expression ends here.
    ///
    /// Quotes group characters and are removed; a backslash outside single
    /// quotes takes the next character literally.
    pub(crate) fn word(&mut self) -> Result<Option<String>, LexError> {
        self.skip_blanks();
        if self.at_terminator() {
            return Ok(None);
        }

        let mut state = WordState::Plain;
        let mut buf = String::new();
        loop {
            let Some(ch) = self.peek() else {
                return match state {
                    WordState::Plain => Ok(Some(buf)),
                    _ => Err(LexError::UnfinishedQuote),
                };
            };
            match state {
                WordState::Plain => {
                    if matches!(ch, ' ' | '\t' | '\r' | ';' | '\n') || self.at_close_block() {
                        return Ok(Some(buf));
                    }
                    self.bump();
                    match ch {
                        '\'' => state = WordState::SingleQuote,
                        '"' => state = WordState::DoubleQuote,
                        '\\' => {
                            if let Some(next) = self.bump() {
                                buf.push(next);
                            }
                        }
                        _ => buf.push(ch),
                    }
                }
                WordState::SingleQuote => {
                    self.bump();
                    if ch == '\'' {
                        state = WordState::Plain;
                    } else {
                        buf.push(ch);
                    }
                }
                WordState::DoubleQuote => {
                    self.bump();
                    match ch {
                        '"' => state = WordState::Plain,
                        '\\' => match self.bump() {
                            Some(next) => buf.push(next),
                            None => return Err(LexError::UnfinishedQuote),
                        },
                        _ => buf.push(ch),
                    }
                }
            }
        }
    }

    /// Read the text of a shell command whose prefix was already consumed.
    ///
    /// Either a `{{ ... }}` block, possibly spanning lines, or the rest of the
    /// current line. Separators do not end a shell command. With `in_block`
    /// set, a line command also ends before a closing `}}`.
    pub(crate) fn command(&mut self, in_block: bool) -> Result<String, LexError> {
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.bump();
        }

        if self.at_open_block() {
            self.bump_block();
            let mut text = String::new();
            while !self.at_close_block() {
                match self.bump() {
                    Some(ch) => text.push(ch),
                    None => return Err(LexError::UnfinishedBlock),
                }
            }
            self.bump_block();
            return Ok(text.trim().to_string());
        }

        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\n' || (in_block && self.at_close_block()) {
                break;
            }
            text.push(ch);
            self.bump();
        }
        Ok(text.trim_end().to_string())
    }
}
