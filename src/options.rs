//! Option registry and the validation half of the option setter.
//!
//! [`Options::apply`] only validates and stores. Side effects on navigation and
//! presentation are described by the returned [`Effect`] and carried out by the
//! interpreter, so the rules here can be exercised without any collaborator.

use crate::command::{ExecPrefix, Expr};
use std::collections::HashMap;
use std::fmt;
use std::num::ParseIntError;
use std::rc::Rc;
use std::str::FromStr;
use thiserror::Error;

/// What to show next to each entry in the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShowInfo {
    #[default]
    None,
    Size,
    Time,
}

impl FromStr for ShowInfo {
    type Err = SetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "size" => Ok(Self::Size),
            "time" => Ok(Self::Time),
            _ => Err(SetError::InvalidShowInfo),
        }
    }
}

impl fmt::Display for ShowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Size => "size",
            Self::Time => "time",
        })
    }
}

/// Ordering of directory listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Name,
    Size,
    Time,
}

impl FromStr for SortBy {
    type Err = SetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "size" => Ok(Self::Size),
            "time" => Ok(Self::Time),
            _ => Err(SetError::InvalidSortBy),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Size => "size",
            Self::Time => "time",
        })
    }
}

/// Rejected option assignment. The `Display` text is what the user sees.
#[derive(Debug, Error, PartialEq)]
pub enum SetError {
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("{opt}: {source}")]
    InvalidNumber {
        opt: &'static str,
        source: ParseIntError,
    },
    #[error("{0}: value should be a non-negative number")]
    Negative(&'static str),
    #[error("{0}: value should be a positive number")]
    NotPositive(&'static str),
    #[error("showinfo should either be 'none', 'size' or 'time'")]
    InvalidShowInfo,
    #[error("sortby should either be 'name', 'size' or 'time'")]
    InvalidSortBy,
}

/// Follow-up work requested by a successful assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Directory listing must be rebuilt (filtering or ordering changed).
    Relist,
    /// Window layout must be rebuilt from the new ratios.
    Rebuild,
}

/// Process-scoped configuration registry.
#[derive(Debug, Clone)]
pub struct Options {
    pub hidden: bool,
    pub preview: bool,
    pub scrolloff: usize,
    pub tabstop: usize,
    pub ifs: String,
    pub showinfo: ShowInfo,
    pub sortby: SortBy,
    pub ratios: Vec<usize>,
    /// Key sequence -> expression.
    pub keys: HashMap<String, Rc<Expr>>,
    /// Named command -> expression.
    pub cmds: HashMap<String, Rc<Expr>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            hidden: false,
            preview: true,
            scrolloff: 0,
            tabstop: 8,
            ifs: String::new(),
            showinfo: ShowInfo::None,
            sortby: SortBy::Name,
            ratios: vec![1, 2, 3],
            keys: default_keys(),
            cmds: HashMap::new(),
        }
    }
}

fn default_keys() -> HashMap<String, Rc<Expr>> {
    let calls = [
        ("j", "down"),
        ("<down>", "down"),
        ("k", "up"),
        ("<up>", "up"),
        ("h", "updir"),
        ("<left>", "updir"),
        ("l", "open"),
        ("<right>", "open"),
        ("<enter>", "open"),
        ("q", "quit"),
        ("gg", "top"),
        ("G", "bot"),
        (":", "read"),
        ("$", "read-shell"),
        ("!", "read-shell-wait"),
        ("&", "read-shell-async"),
        ("/", "search"),
        ("?", "search-back"),
        ("<space>", "toggle"),
        ("y", "yank"),
        ("d", "delete"),
        ("p", "paste"),
        ("<c-l>", "renew"),
    ];

    let mut keys: HashMap<String, Rc<Expr>> = calls
        .into_iter()
        .map(|(key, name)| (key.to_string(), Rc::new(Expr::call(name, &[]))))
        .collect();
    keys.insert("zh".into(), Rc::new(Expr::set("hidden!", "")));
    keys.insert("zp".into(), Rc::new(Expr::set("preview!", "")));
    keys.insert("gh".into(), Rc::new(Expr::call("cd", &["~"])));
    keys.insert("e".into(), Rc::new(Expr::exec(ExecPrefix::Shell, "$EDITOR \"$f\"")));
    keys
}

fn parse_int(opt: &'static str, val: &str) -> Result<i64, SetError> {
    val.parse::<i64>()
        .map_err(|source| SetError::InvalidNumber { opt, source })
}

impl Options {
    /// Validate `val` for option `opt` and store it.
    ///
    /// `window_height` is the height of the primary window and bounds
    /// `scrolloff` to `window_height / 2 - 1`. On error nothing is modified.
    pub fn apply(&mut self, opt: &str, val: &str, window_height: usize) -> Result<Effect, SetError> {
        let effect = match opt {
            "hidden" | "nohidden" | "hidden!" => {
                self.hidden = toggled(opt, self.hidden);
                Effect::Relist
            }
            "preview" | "nopreview" | "preview!" => {
                self.preview = toggled(opt, self.preview);
                Effect::None
            }
            "scrolloff" => {
                let n = parse_int("scrolloff", val)?;
                if n < 0 {
                    return Err(SetError::Negative("scrolloff"));
                }
                let max = (window_height / 2).saturating_sub(1) as i64;
                self.scrolloff = n.min(max) as usize;
                Effect::None
            }
            "tabstop" => {
                let n = parse_int("tabstop", val)?;
                if n <= 0 {
                    return Err(SetError::NotPositive("tabstop"));
                }
                self.tabstop = n as usize;
                Effect::None
            }
            "ifs" => {
                self.ifs = val.to_string();
                Effect::None
            }
            "showinfo" => {
                self.showinfo = val.parse()?;
                Effect::None
            }
            "sortby" => {
                self.sortby = val.parse()?;
                Effect::Relist
            }
            "ratios" => {
                let mut ratios = Vec::new();
                for tok in val.split(':') {
                    let n = parse_int("ratios", tok)?;
                    if n <= 0 {
                        return Err(SetError::NotPositive("ratios"));
                    }
                    ratios.push(n as usize);
                }
                self.ratios = ratios;
                Effect::Rebuild
            }
            _ => return Err(SetError::UnknownOption(opt.to_string())),
        };
        Ok(effect)
    }
}

/// New value of a boolean option for its `name`, `noname` or `name!` form.
fn toggled(form: &str, current: bool) -> bool {
    if form.ends_with('!') {
        !current
    } else {
        !form.starts_with("no")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("hidden")]
    #[case("preview")]
    fn test_boolean_forms_compose(#[case] name: &str) {
        let mut opts = Options::default();
        let no = format!("no{}", name);
        let toggle = format!("{}!", name);
        let get = |o: &Options| if name == "hidden" { o.hidden } else { o.preview };

        opts.apply(name, "", 40).unwrap();
        assert!(get(&opts));
        opts.apply(&toggle, "", 40).unwrap();
        assert!(!get(&opts));

        opts.apply(&no, "", 40).unwrap();
        assert!(!get(&opts));
        opts.apply(&toggle, "", 40).unwrap();
        assert!(get(&opts));
    }

    #[test]
    fn test_hidden_requests_relist_preview_does_not() {
        let mut opts = Options::default();
        assert_eq!(opts.apply("hidden!", "", 40), Ok(Effect::Relist));
        assert_eq!(opts.apply("nohidden", "", 40), Ok(Effect::Relist));
        assert_eq!(opts.apply("preview", "", 40), Ok(Effect::None));
    }

    #[test]
    fn test_scrolloff_rules() {
        let mut opts = Options::default();

        assert_eq!(
            opts.apply("scrolloff", "-1", 40),
            Err(SetError::Negative("scrolloff"))
        );
        assert_eq!(opts.scrolloff, 0);

        opts.apply("scrolloff", "5", 40).unwrap();
        assert_eq!(opts.scrolloff, 5);

        // 40 / 2 - 1
        opts.apply("scrolloff", "100", 40).unwrap();
        assert_eq!(opts.scrolloff, 19);

        let err = opts.apply("scrolloff", "abc", 40).unwrap_err();
        assert_eq!(err.to_string(), "scrolloff: invalid digit found in string");
        assert_eq!(opts.scrolloff, 19);
    }

    #[test]
    fn test_scrolloff_tiny_window_clamps_to_zero() {
        let mut opts = Options::default();
        opts.apply("scrolloff", "3", 1).unwrap();
        assert_eq!(opts.scrolloff, 0);
    }

    #[rstest]
    #[case("0")]
    #[case("-4")]
    fn test_tabstop_rejects_non_positive(#[case] val: &str) {
        let mut opts = Options::default();
        let err = opts.apply("tabstop", val, 40).unwrap_err();
        assert_eq!(err.to_string(), "tabstop: value should be a positive number");
        assert_eq!(opts.tabstop, 8);
    }

    #[rstest]
    #[case("tabstop", " 4")]
    #[case("tabstop", "4\n")]
    #[case("scrolloff", "2 ")]
    #[case("ratios", "1: 2")]
    fn test_numbers_are_not_trimmed(#[case] opt: &str, #[case] val: &str) {
        let mut opts = Options::default();
        let err = opts.apply(opt, val, 40).unwrap_err();
        assert_eq!(err.to_string(), format!("{}: invalid digit found in string", opt));
        assert_eq!(opts.tabstop, 8);
        assert_eq!(opts.ratios, vec![1, 2, 3]);
    }

    #[test]
    fn test_tabstop_stores_value() {
        let mut opts = Options::default();
        opts.apply("tabstop", "4", 40).unwrap();
        assert_eq!(opts.tabstop, 4);
    }

    #[test]
    fn test_ifs_is_verbatim() {
        let mut opts = Options::default();
        opts.apply("ifs", " \t:", 40).unwrap();
        assert_eq!(opts.ifs, " \t:");
    }

    #[rstest]
    #[case("none", ShowInfo::None)]
    #[case("size", ShowInfo::Size)]
    #[case("time", ShowInfo::Time)]
    fn test_showinfo_accepts(#[case] val: &str, #[case] expected: ShowInfo) {
        let mut opts = Options::default();
        assert_eq!(opts.apply("showinfo", val, 40), Ok(Effect::None));
        assert_eq!(opts.showinfo, expected);
    }

    #[rstest]
    #[case("showinfo", "Size")]
    #[case("showinfo", "")]
    #[case("sortby", "date")]
    #[case("sortby", "NAME")]
    fn test_enums_reject_outside_values(#[case] opt: &str, #[case] val: &str) {
        let mut opts = Options::default();
        opts.apply("showinfo", "time", 40).unwrap();
        opts.apply("sortby", "size", 40).unwrap();

        assert!(opts.apply(opt, val, 40).is_err());
        assert_eq!(opts.showinfo, ShowInfo::Time);
        assert_eq!(opts.sortby, SortBy::Size);
    }

    #[test]
    fn test_sortby_requests_relist() {
        let mut opts = Options::default();
        assert_eq!(opts.apply("sortby", "time", 40), Ok(Effect::Relist));
        assert_eq!(opts.sortby, SortBy::Time);
    }

    #[test]
    fn test_ratios_parse_and_reject() {
        let mut opts = Options::default();
        opts.apply("ratios", "2:5", 40).unwrap();

        assert_eq!(opts.apply("ratios", "1:2:3", 40), Ok(Effect::Rebuild));
        assert_eq!(opts.ratios, vec![1, 2, 3]);

        let err = opts.apply("ratios", "1:x:3", 40).unwrap_err();
        assert_eq!(err.to_string(), "ratios: invalid digit found in string");
        assert_eq!(opts.ratios, vec![1, 2, 3]);

        let err = opts.apply("ratios", "1:0", 40).unwrap_err();
        assert_eq!(err, SetError::NotPositive("ratios"));
        assert_eq!(opts.ratios, vec![1, 2, 3]);
    }

    #[test]
    fn test_unknown_option() {
        let mut opts = Options::default();
        let err = opts.apply("colour", "red", 40).unwrap_err();
        assert_eq!(err.to_string(), "unknown option: colour");
    }

    #[test]
    fn test_default_keys_cover_builtins() {
        let opts = Options::default();
        assert_eq!(*opts.keys["j"], Expr::call("down", &[]));
        assert_eq!(*opts.keys[":"], Expr::call("read", &[]));
        assert_eq!(*opts.keys["zh"], Expr::set("hidden!", ""));
        assert!(opts.cmds.is_empty());
    }
}
