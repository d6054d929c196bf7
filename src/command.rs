use std::fmt;
use std::rc::Rc;

/// One parsed unit of the command language.
///
/// Expressions are immutable once built. Bodies of `map` and `cmd` are shared
/// through [`Rc`] so that recording a binding never copies the tree and
/// evaluating a named command never has to clone it out of the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `set <opt> [<val>]`: assign or toggle an option.
    Set { opt: String, val: String },
    /// `map <keys> <expr>`: bind a key sequence.
    Map { keys: String, expr: Rc<Expr> },
    /// `cmd <name> <expr>`: define or override a named command.
    Cmd { name: String, expr: Rc<Expr> },
    /// `<name> <args>...`: invoke a built-in or named command.
    Call { name: String, args: Vec<String> },
    /// `$cmd`, `!cmd`, `&cmd`, `/pat`, `?pat`.
    Exec { prefix: ExecPrefix, text: String },
    /// `:{{ a; b }}` or `: a; b`.
    List(Vec<Expr>),
}

impl Expr {
    pub fn call(name: impl Into<String>, args: &[&str]) -> Self {
        Expr::Call {
            name: name.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn set(opt: impl Into<String>, val: impl Into<String>) -> Self {
        Expr::Set {
            opt: opt.into(),
            val: val.into(),
        }
    }

    pub fn exec(prefix: ExecPrefix, text: impl Into<String>) -> Self {
        Expr::Exec {
            prefix,
            text: text.into(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Set { opt, val } if val.is_empty() => write!(f, "set {}", opt),
            Expr::Set { opt, val } => write!(f, "set {} {}", opt, val),
            Expr::Map { keys, expr } => write!(f, "map {} {}", keys, expr),
            Expr::Cmd { name, expr } => write!(f, "cmd {} {}", name, expr),
            Expr::Call { name, args } => {
                write!(f, "{}", name)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
            Expr::Exec { prefix, text } if text.contains('\n') => {
                write!(f, "{}{{{{{}}}}}", prefix.symbol(), text)
            }
            Expr::Exec { prefix, text } => write!(f, "{}{}", prefix.symbol(), text),
            Expr::List(exprs) => {
                write!(f, ":{{{{ ")?;
                for expr in exprs {
                    write!(f, "{}; ", expr)?;
                }
                write!(f, "}}}}")
            }
        }
    }
}

/// Leading symbol of an [`Expr::Exec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecPrefix {
    /// `$`
    Shell,
    /// `!`
    ShellWait,
    /// `&`
    ShellAsync,
    /// `/`
    Search,
    /// `?`
    SearchBack,
}

impl ExecPrefix {
    pub fn from_symbol(ch: char) -> Option<Self> {
        match ch {
            '$' => Some(Self::Shell),
            '!' => Some(Self::ShellWait),
            '&' => Some(Self::ShellAsync),
            '/' => Some(Self::Search),
            '?' => Some(Self::SearchBack),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Shell => '$',
            Self::ShellWait => '!',
            Self::ShellAsync => '&',
            Self::Search => '/',
            Self::SearchBack => '?',
        }
    }

    /// Shell discipline for this prefix, `None` for the search prefixes.
    pub fn discipline(self) -> Option<Discipline> {
        match self {
            Self::Shell => Some(Discipline::Foreground),
            Self::ShellWait => Some(Discipline::Wait),
            Self::ShellAsync => Some(Discipline::Async),
            Self::Search | Self::SearchBack => None,
        }
    }
}

/// How an external command is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    /// Takes over the terminal; the interpreter resumes after exit.
    Foreground,
    /// Blocks until exit, then waits for the user to acknowledge.
    Wait,
    /// Detached; the interpreter resumes immediately.
    Async,
}

impl Discipline {
    /// Tag used in log records.
    pub fn label(self) -> &'static str {
        match self {
            Self::Foreground => "shell",
            Self::Wait => "shell-wait",
            Self::Async => "shell-async",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_source_form() {
        let list = Expr::List(vec![
            Expr::call("down", &[]),
            Expr::set("sortby", "time"),
            Expr::exec(ExecPrefix::ShellAsync, "make"),
        ]);
        assert_eq!(list.to_string(), ":{{ down; set sortby time; &make; }}");

        let map = Expr::Map {
            keys: "gh".into(),
            expr: Rc::new(Expr::call("cd", &["~"])),
        };
        assert_eq!(map.to_string(), "map gh cd ~");
        assert_eq!(Expr::set("hidden!", "").to_string(), "set hidden!");
    }

    #[test]
    fn test_prefix_disciplines() {
        for ch in ['$', '!', '&', '/', '?'] {
            let prefix = ExecPrefix::from_symbol(ch).unwrap();
            assert_eq!(prefix.symbol(), ch);
        }
        assert_eq!(ExecPrefix::from_symbol('%'), None);
        assert_eq!(ExecPrefix::Shell.discipline(), Some(Discipline::Foreground));
        assert_eq!(ExecPrefix::ShellWait.discipline(), Some(Discipline::Wait));
        assert_eq!(ExecPrefix::ShellAsync.discipline(), Some(Discipline::Async));
        assert_eq!(ExecPrefix::Search.discipline(), None);
        assert_eq!(ExecPrefix::SearchBack.discipline(), None);
    }
}
