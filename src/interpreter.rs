use crate::command::{Discipline, ExecPrefix, Expr};
use crate::env::Environment;
use crate::external::{Invocation, ProcessRunner};
use crate::nav::Navigation;
use crate::options::Effect;
use crate::parser::Parser;
use crate::ui::Presentation;
use std::borrow::Cow;
use std::ffi::OsString;
use std::path::PathBuf;
use std::rc::Rc;

/// Paths one per line, keeping their on-disk bytes.
pub(crate) fn lines(paths: &[PathBuf]) -> OsString {
    let mut out = OsString::new();
    for (i, path) in paths.iter().enumerate() {
        if i > 0 {
            out.push("\n");
        }
        out.push(path);
    }
    out
}

/// Nested evaluations allowed before a chain is refused.
pub const MAX_EVAL_DEPTH: usize = 64;

/// Evaluates command-language expressions against the browser state.
///
/// The interpreter owns the [`Environment`] and drives three collaborators:
/// navigation, presentation and process execution. Every failure that
/// happens during evaluation ends up as a status-line message and a log
/// record; [`Interpreter::eval`] itself never fails.
pub struct Interpreter {
    pub env: Environment,
    pub(crate) nav: Box<dyn Navigation>,
    pub(crate) ui: Box<dyn Presentation>,
    runner: Box<dyn ProcessRunner>,
    depth: usize,
    unwinding: bool,
}

impl Interpreter {
    pub fn new(
        env: Environment,
        nav: Box<dyn Navigation>,
        ui: Box<dyn Presentation>,
        runner: Box<dyn ProcessRunner>,
    ) -> Self {
        Self {
            env,
            nav,
            ui,
            runner,
            depth: 0,
            unwinding: false,
        }
    }

    pub fn nav(&self) -> &dyn Navigation {
        self.nav.as_ref()
    }

    /// Current status-line message.
    pub fn message(&self) -> String {
        self.ui.message()
    }

    /// Evaluate `expr` with positional arguments `args`.
    ///
    /// Only `Exec` consumes `args` directly. A `Call` evaluates with its own
    /// arguments and a `List` evaluates each child with none.
    pub fn eval(&mut self, expr: &Expr, args: &[String]) {
        if self.unwinding {
            return;
        }
        if self.depth >= MAX_EVAL_DEPTH {
            self.unwinding = true;
            self.report(format!("evaluation depth exceeded: {}", expr));
            return;
        }

        self.depth += 1;
        match expr {
            Expr::Set { opt, val } => self.set_option(opt, val),
            Expr::Map { keys, expr } => {
                tracing::debug!("map {} -> {}", keys, expr);
                self.env.options.keys.insert(keys.clone(), Rc::clone(expr));
            }
            Expr::Cmd { name, expr } => {
                tracing::debug!("cmd {} -> {}", name, expr);
                self.env.options.cmds.insert(name.clone(), Rc::clone(expr));
            }
            Expr::Call { name, args } => self.call(name, args),
            Expr::Exec { prefix, text } => self.exec(*prefix, text, args),
            Expr::List(exprs) => {
                for expr in exprs {
                    self.eval(expr, &[]);
                }
            }
        }
        self.depth -= 1;

        if self.depth == 0 {
            self.unwinding = false;
        }
    }

    /// Evaluate every expression in `text` in order, stopping at the first
    /// parse error. Expressions before the error keep their effects.
    pub fn run_script(&mut self, text: &str) {
        for item in Parser::new(text) {
            match item {
                Ok(expr) => self.eval(&expr, &[]),
                Err(e) => self.report(e.to_string()),
            }
        }
    }

    /// Evaluate the binding for a key sequence.
    pub fn press(&mut self, keys: &str) {
        match self.env.options.keys.get(keys).cloned() {
            Some(expr) => self.eval(&expr, &[]),
            None => self.report(format!("unknown mapping: {}", keys)),
        }
    }

    /// Read key sequences from the presentation layer until `quit` or end of
    /// input. Finished background children are collected after every key.
    pub fn repl(&mut self) {
        self.ui.draw(self.nav.as_ref(), &self.env.options);
        while !self.env.should_exit {
            let Some(line) = self.ui.next_keys() else {
                tracing::info!("input closed");
                break;
            };
            let keys = match line.trim() {
                "" => "<enter>",
                keys => keys,
            };
            self.press(keys);
            self.runner.reap();
            if self.env.should_exit {
                break;
            }
            self.ui.draw(self.nav.as_ref(), &self.env.options);
        }
    }

    fn set_option(&mut self, opt: &str, val: &str) {
        let height = self.ui.window_height();
        match self.env.options.apply(opt, val, height) {
            Ok(Effect::None) => {}
            Ok(Effect::Relist) => {
                let height = self.nav.height();
                self.nav.renew(height, &self.env.options);
            }
            Ok(Effect::Rebuild) => self.ui.rebuild(&self.env.options.ratios),
            Err(e) => self.report(e.to_string()),
        }
    }

    fn exec(&mut self, prefix: ExecPrefix, text: &str, args: &[String]) {
        let Some(discipline) = prefix.discipline() else {
            let what = match prefix {
                ExecPrefix::SearchBack => "search-back",
                _ => "search",
            };
            tracing::info!("{}: {} -- {:?}", what, text, args);
            return;
        };

        if discipline == Discipline::Foreground {
            self.ui.clear_message();
        }
        if self.run_shell(text, args, discipline) && discipline == Discipline::Foreground {
            self.echo_file_info();
        }
    }

    /// Run `text` through the process runner. Returns whether it ran.
    pub(crate) fn run_shell(&mut self, text: &str, args: &[String], discipline: Discipline) -> bool {
        tracing::info!("{}: {} -- {:?}", discipline.label(), text, args);

        let current = self.nav.current_path().unwrap_or_default().into_os_string();
        let marks = self.nav.marks();
        let selected = if marks.is_empty() {
            current.clone()
        } else {
            lines(&marks)
        };

        let ifs = &self.env.options.ifs;
        let text = if ifs.is_empty() {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(format!("IFS='{}'; {}", ifs.replace('\'', r"'\''"), text))
        };

        let inv = Invocation {
            text: &text,
            args,
            discipline,
            vars: vec![("f", current), ("fs", selected)],
        };
        match self.runner.run(&inv) {
            Ok(()) => true,
            Err(e) => {
                self.report(format!("shell: {:#}", e));
                false
            }
        }
    }

    pub(crate) fn echo_file_info(&mut self) {
        self.ui.echo_file_info(self.nav.as_ref());
    }

    /// Show `msg` on the status line and log it.
    pub(crate) fn report(&mut self, msg: String) {
        tracing::warn!("{}", msg);
        self.ui.set_message(msg);
    }
}
