//! Recording test doubles for the interpreter's collaborators.
//!
//! All three doubles share one [`Record`] through an `Rc<RefCell<_>>` handle,
//! so a test can inspect what happened after handing the boxes over to the
//! interpreter.

use crate::command::Discipline;
use crate::env::Environment;
use crate::external::{Invocation, ProcessRunner};
use crate::interpreter::Interpreter;
use crate::nav::{Dir, FileEntry, Navigation};
use crate::options::Options;
use crate::ui::Presentation;
use anyhow::{Result, bail};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::ffi::OsString;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard};

static CWD_LOCK: Mutex<()> = Mutex::new(());

/// Serialize tests that change the process working directory.
pub fn lock_current_dir() -> MutexGuard<'static, ()> {
    CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub args: Vec<String>,
    pub discipline: Discipline,
    pub vars: Vec<(&'static str, OsString)>,
}

#[derive(Debug, Default)]
pub struct Record {
    /// Collaborator calls in order, e.g. `down`, `renew 20`, `info`.
    pub calls: Vec<String>,
    pub message: String,
    /// Answers returned by successive prompts.
    pub answers: VecDeque<String>,
    /// Key sequences returned by successive `next_keys`.
    pub keys: VecDeque<String>,
    pub runs: Vec<Run>,
    pub marks: BTreeSet<PathBuf>,
    /// Operations that should fail: `updir`, `open`, `cd`, `save`, `paste`, `run`.
    pub failing: HashSet<&'static str>,
}

impl Record {
    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == call).count()
    }
}

pub type Handle = Rc<RefCell<Record>>;

pub struct MockNav {
    rec: Handle,
    dir: Dir,
    height: usize,
}

impl MockNav {
    fn fail(&self, op: &'static str) -> Result<()> {
        let mut rec = self.rec.borrow_mut();
        rec.calls.push(op.to_string());
        if rec.failing.contains(op) {
            bail!("{} failed", op);
        }
        Ok(())
    }
}

impl Navigation for MockNav {
    fn down(&mut self) {
        self.rec.borrow_mut().calls.push("down".into());
    }

    fn up(&mut self) {
        self.rec.borrow_mut().calls.push("up".into());
    }

    fn top(&mut self) {
        self.rec.borrow_mut().calls.push("top".into());
    }

    fn bot(&mut self) {
        self.rec.borrow_mut().calls.push("bot".into());
    }

    fn updir(&mut self) -> Result<()> {
        self.fail("updir")
    }

    fn open(&mut self) -> Result<()> {
        self.fail("open")
    }

    fn cd(&mut self, path: &str) -> Result<()> {
        self.rec.borrow_mut().calls.push(format!("cd {}", path));
        if self.rec.borrow().failing.contains("cd") {
            bail!("cd: can't canonicalize {}", path);
        }
        Ok(())
    }

    fn current_dir(&self) -> &Dir {
        &self.dir
    }

    fn toggle(&mut self) {
        if let Some(path) = self.dir.current_path() {
            let mut rec = self.rec.borrow_mut();
            if !rec.marks.remove(&path) {
                rec.marks.insert(path);
            }
        }
    }

    fn marks(&self) -> Vec<PathBuf> {
        self.rec.borrow().marks.iter().cloned().collect()
    }

    fn clear_marks(&mut self) {
        self.rec.borrow_mut().marks.clear();
    }

    fn save(&mut self, copy: bool) -> Result<()> {
        self.fail("save")?;
        let op = if copy { "copy" } else { "cut" };
        self.rec.borrow_mut().calls.push(op.into());
        Ok(())
    }

    fn paste(&mut self) -> Result<()> {
        self.fail("paste")
    }

    fn renew(&mut self, height: usize, _opts: &Options) {
        self.height = height;
        self.rec.borrow_mut().calls.push(format!("renew {}", height));
    }

    fn height(&self) -> usize {
        self.height
    }
}

pub struct MockUi {
    rec: Handle,
    height: usize,
}

impl Presentation for MockUi {
    fn set_message(&mut self, msg: String) {
        self.rec.borrow_mut().message = msg;
    }

    fn clear_message(&mut self) {
        let mut rec = self.rec.borrow_mut();
        rec.message.clear();
        rec.calls.push("clear".into());
    }

    fn message(&self) -> String {
        self.rec.borrow().message.clone()
    }

    fn echo_file_info(&mut self, _nav: &dyn Navigation) {
        self.rec.borrow_mut().calls.push("info".into());
    }

    fn prompt(&mut self, _nav: &dyn Navigation, glyph: &str) -> String {
        let mut rec = self.rec.borrow_mut();
        rec.calls.push(format!("prompt {}", glyph));
        rec.answers.pop_front().unwrap_or_default()
    }

    fn resync(&mut self) {
        self.rec.borrow_mut().calls.push("resync".into());
    }

    fn rebuild(&mut self, ratios: &[usize]) {
        let ratios: Vec<String> = ratios.iter().map(|r| r.to_string()).collect();
        self.rec
            .borrow_mut()
            .calls
            .push(format!("rebuild {}", ratios.join(":")));
    }

    fn window_height(&self) -> usize {
        self.height
    }

    fn next_keys(&mut self) -> Option<String> {
        self.rec.borrow_mut().keys.pop_front()
    }

    fn draw(&mut self, _nav: &dyn Navigation, _opts: &Options) {
        self.rec.borrow_mut().calls.push("draw".into());
    }
}

pub struct MockRunner {
    rec: Handle,
}

impl ProcessRunner for MockRunner {
    fn run(&mut self, inv: &Invocation<'_>) -> Result<()> {
        let mut rec = self.rec.borrow_mut();
        if rec.failing.contains("run") {
            bail!("can't run /bin/sh");
        }
        rec.runs.push(Run {
            text: inv.text.to_string(),
            args: inv.args.to_vec(),
            discipline: inv.discipline,
            vars: inv.vars.clone(),
        });
        Ok(())
    }

    fn reap(&mut self) {
        self.rec.borrow_mut().calls.push("reap".into());
    }
}

pub fn entry(name: &str, is_dir: bool) -> FileEntry {
    FileEntry {
        name: name.to_string(),
        file_name: name.into(),
        is_dir,
        size: 0,
        modified: None,
    }
}

/// A listing at `/virtual` with a directory and two files, cursor on `b.txt`.
pub fn virtual_dir() -> Dir {
    Dir {
        path: PathBuf::from("/virtual"),
        entries: vec![entry("a", true), entry("b.txt", false), entry("c.txt", false)],
        ind: 1,
    }
}

/// Interpreter over `dir` with a primary window of 20 rows.
pub fn interpreter_with(dir: Dir, env: Environment) -> (Interpreter, Handle) {
    let rec: Handle = Rc::new(RefCell::new(Record::default()));
    let nav = MockNav {
        rec: rec.clone(),
        dir,
        height: 20,
    };
    let ui = MockUi {
        rec: rec.clone(),
        height: 20,
    };
    let runner = MockRunner { rec: rec.clone() };
    let interp = Interpreter::new(env, Box::new(nav), Box::new(ui), Box::new(runner));
    (interp, rec)
}

pub fn interpreter() -> (Interpreter, Handle) {
    interpreter_with(virtual_dir(), Environment::default())
}
