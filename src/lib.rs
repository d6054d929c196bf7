//! The command language of a terminal file browser.
//!
//! Everything a user can do in the browser goes through this language: key
//! bindings map to expressions, the `:` prompt reads expressions, and the
//! startup script is a sequence of expressions. The crate parses that
//! language and evaluates it against three collaborators: filesystem
//! navigation ([`Navigation`]), the screen ([`Presentation`]) and external
//! processes ([`ProcessRunner`]).
//!
//! The main entry point is [`Interpreter`]. Build one from an [`Environment`]
//! and the three collaborators, then feed it expressions with
//! [`Interpreter::eval`], scripts with [`Interpreter::run_script`] or key
//! sequences with [`Interpreter::press`]. [`Interpreter::repl`] is the
//! interactive driver used by the `browse` binary.

mod builtin;
pub mod command;
pub mod env;
pub mod external;
mod interpreter;
mod lexer;
pub mod nav;
pub mod options;
pub mod parser;
pub mod ui;

#[cfg(test)]
mod testing;

/// Re-export of the evaluator.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::{Interpreter, MAX_EVAL_DEPTH};

pub use builtin::{Builtin, Resolved};
pub use command::{Discipline, ExecPrefix, Expr};
pub use env::Environment;
pub use external::{Invocation, ProcessRunner, ShellRunner};
pub use nav::{FsNav, Navigation};
pub use options::{Options, SetError};
pub use parser::{ParseError, Parser, parse};
pub use ui::{LineUi, Presentation};
