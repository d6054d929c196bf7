use crate::command::{Discipline, Expr};
use crate::interpreter::{Interpreter, lines};
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Built-in commands known to the interpreter at compile time.
///
/// The set is closed. A named command with the same name as a built-in can be
/// defined but is never dispatched, see [`Interpreter::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Quit,
    Echo,
    Down,
    Up,
    Updir,
    Open,
    Bot,
    Top,
    Cd,
    Read,
    ReadShell,
    ReadShellWait,
    ReadShellAsync,
    Search,
    SearchBack,
    Toggle,
    Yank,
    Delete,
    Paste,
    Renew,
}

impl Builtin {
    pub const ALL: [Builtin; 20] = [
        Builtin::Quit,
        Builtin::Echo,
        Builtin::Down,
        Builtin::Up,
        Builtin::Updir,
        Builtin::Open,
        Builtin::Bot,
        Builtin::Top,
        Builtin::Cd,
        Builtin::Read,
        Builtin::ReadShell,
        Builtin::ReadShellWait,
        Builtin::ReadShellAsync,
        Builtin::Search,
        Builtin::SearchBack,
        Builtin::Toggle,
        Builtin::Yank,
        Builtin::Delete,
        Builtin::Paste,
        Builtin::Renew,
    ];

    /// Canonical name of the command, e.g. "quit" or "read-shell".
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Quit => "quit",
            Builtin::Echo => "echo",
            Builtin::Down => "down",
            Builtin::Up => "up",
            Builtin::Updir => "updir",
            Builtin::Open => "open",
            Builtin::Bot => "bot",
            Builtin::Top => "top",
            Builtin::Cd => "cd",
            Builtin::Read => "read",
            Builtin::ReadShell => "read-shell",
            Builtin::ReadShellWait => "read-shell-wait",
            Builtin::ReadShellAsync => "read-shell-async",
            Builtin::Search => "search",
            Builtin::SearchBack => "search-back",
            Builtin::Toggle => "toggle",
            Builtin::Yank => "yank",
            Builtin::Delete => "delete",
            Builtin::Paste => "paste",
            Builtin::Renew => "renew",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }
}

/// Outcome of looking a command name up.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Builtin(Builtin),
    Named(Rc<Expr>),
    NotFound,
}

impl Interpreter {
    /// Resolve `name`: built-ins first, then the named-command table.
    pub fn resolve(&self, name: &str) -> Resolved {
        if let Some(builtin) = Builtin::from_name(name) {
            return Resolved::Builtin(builtin);
        }
        match self.env.options.cmds.get(name) {
            Some(expr) => Resolved::Named(Rc::clone(expr)),
            None => Resolved::NotFound,
        }
    }

    /// Evaluate `name args...`.
    pub(crate) fn call(&mut self, name: &str, args: &[String]) {
        match self.resolve(name) {
            Resolved::Builtin(builtin) => self.run_builtin(builtin, args),
            Resolved::Named(expr) => {
                tracing::debug!("{} -> {}", name, expr);
                self.eval(&expr, args);
            }
            Resolved::NotFound => self.report(format!("command not found: {}", name)),
        }
    }

    fn run_builtin(&mut self, builtin: Builtin, args: &[String]) {
        match builtin {
            Builtin::Quit => self.env.should_exit = true,
            Builtin::Echo => self.ui.set_message(args.join(" ")),
            Builtin::Down => {
                self.nav.down();
                self.echo_file_info();
            }
            Builtin::Up => {
                self.nav.up();
                self.echo_file_info();
            }
            Builtin::Updir => {
                if let Err(e) = self.nav.updir() {
                    self.report(format!("{:#}", e));
                    return;
                }
                self.echo_file_info();
            }
            Builtin::Open => self.open(args),
            Builtin::Bot => {
                self.nav.bot();
                self.echo_file_info();
            }
            Builtin::Top => {
                self.nav.top();
                self.echo_file_info();
            }
            Builtin::Cd => {
                let path = args.first().map(String::as_str).unwrap_or("~");
                if let Err(e) = self.nav.cd(path) {
                    self.report(format!("{:#}", e));
                    return;
                }
                self.echo_file_info();
            }
            Builtin::Read => {
                let line = self.ui.prompt(self.nav.as_ref(), ":");
                if line.trim().is_empty() {
                    self.echo_file_info();
                    return;
                }
                tracing::info!("command: {}", line);
                self.run_script(&line);
            }
            Builtin::ReadShell => self.read_shell("$", Discipline::Foreground),
            Builtin::ReadShellWait => self.read_shell("!", Discipline::Wait),
            Builtin::ReadShellAsync => self.read_shell("&", Discipline::Async),
            Builtin::Search => self.search("search", "/"),
            Builtin::SearchBack => self.search("search-back", "?"),
            Builtin::Toggle => self.nav.toggle(),
            Builtin::Yank => self.save("yank", true),
            Builtin::Delete => self.save("delete", false),
            Builtin::Paste => {
                if let Err(e) = self.nav.paste() {
                    self.report(format!("paste: {:#}", e));
                    return;
                }
                let height = self.nav.height();
                self.nav.renew(height, &self.env.options);
                self.nav.clear_marks();
            }
            Builtin::Renew => {
                self.ui.resync();
                self.ui.rebuild(&self.env.options.ratios);
                let height = self.ui.window_height();
                self.nav.renew(height, &self.env.options);
            }
        }
    }

    fn open(&mut self, args: &[String]) {
        if self.nav.current_dir().entries.is_empty() {
            return;
        }
        let Some(path) = self.nav.current_path() else {
            return;
        };

        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                self.report(format!("open: {}", e));
                return;
            }
        };

        if meta.is_dir() {
            if let Err(e) = self.nav.open() {
                self.report(format!("{:#}", e));
                return;
            }
            self.echo_file_info();
            return;
        }

        if let Some(selection) = self.env.selection_path.clone() {
            self.write_selection(&selection, &path);
            self.env.should_exit = true;
            return;
        }

        if let Some(expr) = self.env.options.cmds.get("open-file").cloned() {
            self.eval(&expr, args);
        }
    }

    /// Write the marked paths, or `current` if nothing is marked, to `selection`.
    /// Failures are logged only; selection mode exits regardless.
    fn write_selection(&mut self, selection: &Path, current: &Path) {
        let marks = self.nav.marks();
        let content = if marks.is_empty() {
            current.as_os_str().to_os_string()
        } else {
            lines(&marks)
        };
        if let Err(e) = fs::write(selection, content.as_encoded_bytes()) {
            tracing::error!("writing selection file {}: {}", selection.display(), e);
        }
    }

    fn read_shell(&mut self, glyph: &str, discipline: Discipline) {
        let line = self.ui.prompt(self.nav.as_ref(), glyph);
        self.run_shell(&line, &[], discipline);
    }

    fn search(&mut self, what: &str, glyph: &str) {
        let line = self.ui.prompt(self.nav.as_ref(), glyph);
        tracing::info!("{}: {}", what, line);
        self.report(format!("sorry, {} is not implemented yet!", what));
    }

    fn save(&mut self, what: &str, copy: bool) {
        if let Err(e) = self.nav.save(copy) {
            self.report(format!("{}: {:#}", what, e));
            return;
        }
        self.nav.clear_marks();
    }
}
