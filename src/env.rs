use crate::options::Options;
use std::path::PathBuf;

/// Process-scoped state shared by every evaluation.
///
/// The environment contains:
/// - `options`: the option registry, key bindings and named commands.
/// - `should_exit`: set by `quit` (and by `open` in selection mode); the driver
///   loop stops once it is true.
/// - `selection_path`: when set, `open` on a file writes the selection there
///   instead of opening it.
///
/// There is exactly one per interpreter and no global copy, so tests can build
/// as many isolated instances as they like.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub options: Options,
    pub should_exit: bool,
    pub selection_path: Option<PathBuf>,
}

impl Environment {
    pub fn new(selection_path: Option<PathBuf>) -> Self {
        Self {
            options: Options::default(),
            should_exit: false,
            selection_path,
        }
    }
}
