//! Presentation layer: status line, prompts and window geometry.

use crate::nav::Navigation;
use crate::options::{Options, ShowInfo};
use chrono::{DateTime, Local};
use crossterm::{cursor, execute, terminal};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::ops::Range;
use std::path::Path;
use std::time::SystemTime;

/// Presentation collaborator consumed by the interpreter.
pub trait Presentation {
    fn set_message(&mut self, msg: String);
    fn clear_message(&mut self);
    fn message(&self) -> String;
    /// Replace the status message with information about the current entry.
    fn echo_file_info(&mut self, nav: &dyn Navigation);
    /// Read one line after showing `glyph`; empty on end of input.
    fn prompt(&mut self, nav: &dyn Navigation, glyph: &str) -> String;
    /// Force a full redraw of the terminal.
    fn resync(&mut self);
    /// Discard the current windows and build new ones from `ratios`.
    fn rebuild(&mut self, ratios: &[usize]);
    /// Height of the primary window.
    fn window_height(&self) -> usize;
    /// Next key sequence for the driver loop, `None` when input is exhausted.
    fn next_keys(&mut self) -> Option<String>;
    fn draw(&mut self, nav: &dyn Navigation, opts: &Options);
}

/// A column of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Win {
    pub x: usize,
    pub width: usize,
    pub height: usize,
}

/// Split `width` into columns proportional to `ratios`; the last column takes
/// the rounding remainder. Two rows are reserved for the path and status lines.
pub fn layout(width: usize, height: usize, ratios: &[usize]) -> Vec<Win> {
    // widened so huge ratios can neither overflow the sum nor the product
    let total: u128 = ratios.iter().map(|&r| r as u128).sum::<u128>().max(1);
    let mut wins = Vec::with_capacity(ratios.len());
    let mut x = 0;
    for (i, ratio) in ratios.iter().enumerate() {
        let w = if i + 1 == ratios.len() {
            width.saturating_sub(x)
        } else {
            (width as u128 * *ratio as u128 / total) as usize
        };
        wins.push(Win {
            x,
            width: w,
            height: height.saturating_sub(2),
        });
        x += w;
    }
    wins
}

/// Rows `[start, end)` of a listing of `len` entries shown in `height` rows,
/// keeping `scrolloff` rows of context around the cursor at `ind`.
pub fn visible_range(len: usize, ind: usize, height: usize, scrolloff: usize) -> Range<usize> {
    if height == 0 || len <= height {
        return 0..len;
    }
    let wanted_end = (ind + scrolloff + 1).min(len);
    let start = wanted_end.saturating_sub(height);
    start..start + height
}

/// Size with a one-letter decimal suffix, e.g. `512`, `1.5K`, `340M`.
pub fn humanize(size: u64) -> String {
    if size < 1000 {
        return size.to_string();
    }
    let mut curr = size as f64 / 1000.0;
    for suffix in ['K', 'M', 'G', 'T', 'P', 'E'] {
        if curr < 10.0 {
            return format!("{:.1}{}", curr, suffix);
        }
        if curr < 1000.0 {
            return format!("{}{}", curr as u64, suffix);
        }
        curr /= 1000.0;
    }
    format!("{}E", (curr * 1000.0) as u64)
}

/// Replace tabs with spaces up to the next multiple of `tabstop`.
pub fn expand_tabs(line: &str, tabstop: usize) -> String {
    let tabstop = tabstop.max(1);
    let mut out = String::with_capacity(line.len());
    let mut col = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let n = tabstop - col % tabstop;
            out.extend(std::iter::repeat_n(' ', n));
            col += n;
        } else {
            out.push(ch);
            col += 1;
        }
    }
    out
}

fn format_time(t: SystemTime) -> String {
    DateTime::<Local>::from(t).format("%a %b %e %H:%M:%S %Y").to_string()
}

#[cfg(unix)]
fn mode_string(meta: &fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    let mode = meta.permissions().mode();
    let kind = if meta.is_dir() {
        'd'
    } else if meta.file_type().is_symlink() {
        'L'
    } else {
        '-'
    };
    let mut s = String::with_capacity(10);
    s.push(kind);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        s.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        s.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        s.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    s
}

#[cfg(not(unix))]
fn mode_string(meta: &fs::Metadata) -> String {
    let kind = if meta.is_dir() { 'd' } else { '-' };
    let write = if meta.permissions().readonly() { '-' } else { 'w' };
    format!("{}r{}", kind, write)
}

/// Line-oriented terminal front end.
///
/// Draws the listing as plain lines and reads prompts with `rustyline`; the
/// terminal is never left in raw mode, so foreground shell commands can use
/// it directly.
pub struct LineUi {
    editor: Option<DefaultEditor>,
    message: String,
    wins: Vec<Win>,
}

impl LineUi {
    pub fn new(ratios: &[usize]) -> Self {
        let mut ui = LineUi {
            editor: None,
            message: String::new(),
            wins: Vec::new(),
        };
        ui.rebuild(ratios);
        ui
    }

    pub fn wins(&self) -> &[Win] {
        &self.wins
    }

    fn readline(&mut self, prompt: &str) -> Option<String> {
        if self.editor.is_none() {
            match DefaultEditor::new() {
                Ok(editor) => self.editor = Some(editor),
                Err(e) => {
                    tracing::warn!("can't start line editor: {}", e);
                    return None;
                }
            }
        }
        let editor = self.editor.as_mut()?;
        match editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(e) = editor.add_history_entry(line.as_str()) {
                        tracing::debug!("history: {}", e);
                    }
                }
                Some(line)
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => None,
            Err(e) => {
                tracing::warn!("readline: {}", e);
                None
            }
        }
    }

    fn draw_to(&self, out: &mut dyn Write, nav: &dyn Navigation, opts: &Options) -> std::io::Result<()> {
        let dir = nav.current_dir();
        let marks = nav.marks();
        let height = self.window_height().max(1);
        writeln!(out, "{}", dir.path.display())?;

        if dir.entries.is_empty() {
            writeln!(out, "  empty")?;
        }
        for i in visible_range(dir.entries.len(), dir.ind, height, opts.scrolloff) {
            let entry = &dir.entries[i];
            let cursor = if i == dir.ind { '>' } else { ' ' };
            let mark = if marks.contains(&dir.path.join(&entry.file_name)) { '*' } else { ' ' };
            let slash = if entry.is_dir { "/" } else { "" };
            let info = match opts.showinfo {
                ShowInfo::None => String::new(),
                ShowInfo::Size => format!("  {}", humanize(entry.size)),
                ShowInfo::Time => entry
                    .modified
                    .map(|t| format!("  {}", format_time(t)))
                    .unwrap_or_default(),
            };
            writeln!(
                out,
                "{}{} {}{}{}",
                cursor,
                mark,
                expand_tabs(&entry.name, opts.tabstop),
                slash,
                info
            )?;
        }

        if opts.preview {
            if let Some(path) = dir.current_path() {
                self.preview_to(out, &path, height.min(10), opts.tabstop)?;
            }
        }

        writeln!(out, "{}", self.message)?;
        out.flush()
    }

    /// First `rows` lines of a regular file. Anything else (directories,
    /// FIFOs, devices) is never opened.
    fn preview_to(&self, out: &mut dyn Write, path: &Path, rows: usize, tabstop: usize) -> std::io::Result<()> {
        if !fs::metadata(path).is_ok_and(|m| m.is_file()) {
            return Ok(());
        }
        let Ok(file) = File::open(path) else {
            return Ok(());
        };
        writeln!(out, "---")?;
        for line in BufReader::new(file).lines().take(rows).map_while(Result::ok) {
            writeln!(out, "{}", expand_tabs(&line, tabstop))?;
        }
        Ok(())
    }
}

impl Presentation for LineUi {
    fn set_message(&mut self, msg: String) {
        self.message = msg;
    }

    fn clear_message(&mut self) {
        self.message.clear();
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn echo_file_info(&mut self, nav: &dyn Navigation) {
        let Some(path) = nav.current_path() else {
            self.message.clear();
            return;
        };
        self.message = match fs::symlink_metadata(&path) {
            Ok(meta) => {
                let time = meta.modified().map(format_time).unwrap_or_default();
                format!("{} {} {}", mode_string(&meta), humanize(meta.len()), time)
            }
            Err(e) => e.to_string(),
        };
    }

    fn prompt(&mut self, _nav: &dyn Navigation, glyph: &str) -> String {
        self.readline(glyph).unwrap_or_default()
    }

    fn resync(&mut self) {
        if let Err(e) = execute!(
            std::io::stdout(),
            terminal::Clear(terminal::ClearType::All),
            cursor::MoveTo(0, 0)
        ) {
            tracing::warn!("resync: {}", e);
        }
    }

    fn rebuild(&mut self, ratios: &[usize]) {
        let (w, h) = terminal::size().unwrap_or((80, 24));
        self.wins = layout(w as usize, h as usize, ratios);
        self.message.clear();
    }

    fn window_height(&self) -> usize {
        self.wins.first().map(|w| w.height).unwrap_or(0)
    }

    fn next_keys(&mut self) -> Option<String> {
        self.readline("> ")
    }

    fn draw(&mut self, nav: &dyn Navigation, opts: &Options) {
        if let Err(e) = self.draw_to(&mut std::io::stdout(), nav, opts) {
            tracing::warn!("draw: {}", e);
        }
    }
}
