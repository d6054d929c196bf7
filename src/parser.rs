use crate::command::{ExecPrefix, Expr};
use crate::lexer::{LexError, Scanner};
use std::rc::Rc;
use thiserror::Error;

/// Errors that can occur while parsing the command language.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The scanner could not finish a word or a `{{ }}` block.
    #[error("line {line}: {source}")]
    Lex { line: usize, source: LexError },
    /// `set`, `map` or `cmd` without the name that must follow it.
    #[error("line {line}: missing name after '{keyword}'")]
    MissingName { line: usize, keyword: &'static str },
    /// `map` or `cmd` without a body.
    #[error("line {line}: missing expression after '{keyword}'")]
    MissingExpr { line: usize, keyword: &'static str },
    /// Extra word after a complete `set`.
    #[error("line {line}: unexpected '{word}'")]
    UnexpectedWord { line: usize, word: String },
    /// `}}` with no open block.
    #[error("line {line}: unexpected '}}}}'")]
    UnexpectedClose { line: usize },
}

/// Incremental parser yielding one expression at a time.
///
/// Callers that evaluate while iterating keep the effects of expressions
/// preceding a syntax error. After the first error the iterator is exhausted.
///
/// ```
/// use browse_commands::{Expr, Parser};
/// let exprs: Vec<Expr> = Parser::new("set hidden; cd /tmp").map(Result::unwrap).collect();
/// assert_eq!(exprs, vec![Expr::set("hidden", ""), Expr::call("cd", &["/tmp"])]);
/// ```
pub struct Parser {
    sc: Scanner,
    failed: bool,
    /// Depth of open `:{{` lists.
    blocks: usize,
}

impl Parser {
    pub fn new(text: &str) -> Self {
        Parser {
            sc: Scanner::new(text),
            failed: false,
            blocks: 0,
        }
    }

    fn word(&mut self) -> Result<Option<String>, ParseError> {
        let line = self.sc.line();
        self.sc
            .word()
            .map_err(|source| ParseError::Lex { line, source })
    }

    fn name_after(&mut self, keyword: &'static str) -> Result<String, ParseError> {
        let line = self.sc.line();
        self.word()?
            .ok_or(ParseError::MissingName { line, keyword })
    }

    fn body_after(&mut self, keyword: &'static str) -> Result<Rc<Expr>, ParseError> {
        let line = self.sc.line();
        self.parse_expr()?
            .map(Rc::new)
            .ok_or(ParseError::MissingExpr { line, keyword })
    }

    /// Parse the expression starting at the current position, `None` if the
    /// position is already at a separator, `}}` or end of input.
    fn parse_expr(&mut self) -> Result<Option<Expr>, ParseError> {
        self.sc.skip_blanks();
        if self.sc.at_terminator() {
            return Ok(None);
        }

        let Some(ch) = self.sc.peek() else {
            return Ok(None);
        };

        if ch == ':' {
            self.sc.bump_char();
            return self.parse_list().map(Some);
        }

        if let Some(prefix) = ExecPrefix::from_symbol(ch) {
            self.sc.bump_char();
            let line = self.sc.line();
            let text = self
                .sc
                .command(self.blocks > 0)
                .map_err(|source| ParseError::Lex { line, source })?;
            return Ok(Some(Expr::Exec { prefix, text }));
        }

        let Some(head) = self.word()? else {
            return Ok(None);
        };

        let expr = match head.as_str() {
            "set" => {
                let opt = self.name_after("set")?;
                let val = self.word()?.unwrap_or_default();
                let line = self.sc.line();
                if let Some(word) = self.word()? {
                    return Err(ParseError::UnexpectedWord { line, word });
                }
                Expr::Set { opt, val }
            }
            "map" => {
                let keys = self.name_after("map")?;
                let expr = self.body_after("map")?;
                Expr::Map { keys, expr }
            }
            "cmd" => {
                let name = self.name_after("cmd")?;
                let expr = self.body_after("cmd")?;
                Expr::Cmd { name, expr }
            }
            _ => {
                let mut args = Vec::new();
                while let Some(arg) = self.word()? {
                    args.push(arg);
                }
                Expr::Call { name: head, args }
            }
        };
        Ok(Some(expr))
    }

    /// Body of a list after its `:`.
    ///
    /// `:{{ ... }}` may span lines; a bare `:` list runs to the end of the line
    /// with `;` between elements.
    fn parse_list(&mut self) -> Result<Expr, ParseError> {
        let mut exprs = Vec::new();
        self.sc.skip_blanks();

        if self.sc.at_open_block() {
            let line = self.sc.line();
            self.sc.bump_block();
            self.blocks += 1;
            let result = self.parse_block(line, &mut exprs);
            self.blocks -= 1;
            return result.map(|()| Expr::List(exprs));
        }

        loop {
            if let Some(expr) = self.parse_expr()? {
                exprs.push(expr);
            }
            if self.sc.peek() == Some(';') {
                self.sc.bump_char();
            } else {
                break;
            }
        }
        Ok(Expr::List(exprs))
    }

    fn parse_block(&mut self, line: usize, exprs: &mut Vec<Expr>) -> Result<(), ParseError> {
        loop {
            self.sc.skip_separators();
            if self.sc.at_close_block() {
                self.sc.bump_block();
                return Ok(());
            }
            if self.sc.at_eof() {
                return Err(ParseError::Lex {
                    line,
                    source: LexError::UnfinishedBlock,
                });
            }
            if let Some(expr) = self.parse_expr()? {
                exprs.push(expr);
            }
        }
    }
}

impl Iterator for Parser {
    type Item = Result<Expr, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.sc.skip_separators();
        if self.sc.at_eof() {
            return None;
        }

        let result = if self.sc.at_close_block() {
            Err(ParseError::UnexpectedClose {
                line: self.sc.line(),
            })
        } else {
            self.parse_expr()
        };

        match result {
            Ok(Some(expr)) => Some(Ok(expr)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Parse a whole script, stopping at the first error.
pub fn parse(text: &str) -> Result<Vec<Expr>, ParseError> {
    Parser::new(text).collect()
}
