//! Directory navigation: listing, cursor, marks and clipboard.
//!
//! The interpreter only talks to the [`Navigation`] trait. [`FsNav`] is the
//! implementation backed by the real filesystem.

use crate::options::{Options, SortBy};
use anyhow::{Context, Result, anyhow, bail};
use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One listed directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Display form of the name; lossy for names that are not UTF-8.
    pub name: String,
    /// Name as stored on disk, used for every path built from the entry.
    pub file_name: OsString,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// A listed directory together with the cursor position in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dir {
    pub path: PathBuf,
    pub entries: Vec<FileEntry>,
    pub ind: usize,
}

impl Dir {
    pub fn current(&self) -> Option<&FileEntry> {
        self.entries.get(self.ind)
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.current().map(|e| self.path.join(&e.file_name))
    }
}

/// Pending copy or move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clipboard {
    pub paths: Vec<PathBuf>,
    pub copy: bool,
}

/// Navigation model consumed by the interpreter.
pub trait Navigation {
    fn down(&mut self);
    fn up(&mut self);
    fn top(&mut self);
    fn bot(&mut self);
    /// Move to the parent directory.
    fn updir(&mut self) -> Result<()>;
    /// Descend into the directory under the cursor.
    fn open(&mut self) -> Result<()>;
    /// Change to `path`; `~` expands to the home directory.
    fn cd(&mut self, path: &str) -> Result<()>;
    fn current_dir(&self) -> &Dir;
    fn current_path(&self) -> Option<PathBuf> {
        self.current_dir().current_path()
    }
    /// Flip the mark of the entry under the cursor.
    fn toggle(&mut self);
    /// Marked paths in sorted order.
    fn marks(&self) -> Vec<PathBuf>;
    fn clear_marks(&mut self);
    /// Put the marked paths, or the current one if nothing is marked, on the
    /// clipboard for copying (`copy`) or moving.
    fn save(&mut self, copy: bool) -> Result<()>;
    /// Copy or move the clipboard into the current directory and empty it.
    fn paste(&mut self) -> Result<()>;
    /// Re-read the current directory with `opts` for a window of `height` rows.
    fn renew(&mut self, height: usize, opts: &Options);
    fn height(&self) -> usize;
}

/// Filesystem-backed [`Navigation`].
pub struct FsNav {
    dir: Dir,
    marks: BTreeSet<PathBuf>,
    clipboard: Option<Clipboard>,
    height: usize,
    hidden: bool,
    sortby: SortBy,
}

impl FsNav {
    /// Open `start` (or the process working directory) for `height` rows.
    pub fn new(start: Option<&str>, height: usize, opts: &Options) -> Result<Self> {
        let mut nav = FsNav {
            dir: Dir::default(),
            marks: BTreeSet::new(),
            clipboard: None,
            height,
            hidden: opts.hidden,
            sortby: opts.sortby,
        };
        match start {
            Some(path) => nav.cd(path)?,
            None => {
                let cwd = std::env::current_dir().context("can't read current directory")?;
                nav.load(cwd, None)?;
            }
        }
        Ok(nav)
    }

    pub fn clipboard(&self) -> Option<&Clipboard> {
        self.clipboard.as_ref()
    }

    /// List `path` and place the cursor on `select` if it is present.
    fn load(&mut self, path: PathBuf, select: Option<&OsStr>) -> Result<()> {
        let entries = read_entries(&path, self.hidden, self.sortby)?;
        let ind = select
            .and_then(|name| entries.iter().position(|e| e.file_name.as_os_str() == name))
            .unwrap_or(0);
        std::env::set_current_dir(&path)
            .with_context(|| format!("can't chdir to {}", path.display()))?;
        self.dir = Dir { path, entries, ind };
        Ok(())
    }
}

fn read_entries(path: &Path, hidden: bool, sortby: SortBy) -> Result<Vec<FileEntry>> {
    let mut entries = Vec::new();
    for item in fs::read_dir(path).with_context(|| format!("can't read {}", path.display()))? {
        let item = item?;
        let file_name = item.file_name();
        let name = file_name.to_string_lossy().into_owned();
        if !hidden && name.starts_with('.') {
            continue;
        }
        // follow symlinks so a link to a directory can be entered
        let meta = match fs::metadata(item.path()) {
            Ok(m) => m,
            Err(_) => item.metadata()?,
        };
        entries.push(FileEntry {
            name,
            file_name,
            is_dir: meta.is_dir(),
            size: meta.len(),
            modified: meta.modified().ok(),
        });
    }

    match sortby {
        SortBy::Name => entries.sort_by(|a, b| a.name.cmp(&b.name)),
        SortBy::Size => entries.sort_by(|a, b| a.size.cmp(&b.size).then(a.name.cmp(&b.name))),
        SortBy::Time => {
            entries.sort_by(|a, b| a.modified.cmp(&b.modified).then(a.name.cmp(&b.name)))
        }
    }
    Ok(entries)
}

fn expand_home(path: &str) -> Result<PathBuf> {
    if path == "~" || path.starts_with("~/") {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("cd: home directory not found"))?;
        return Ok(match path.strip_prefix("~/") {
            Some(rest) => home.join(rest),
            None => home,
        });
    }
    Ok(PathBuf::from(path))
}

fn copy_recursive(src: &Path, dst: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(src).with_context(|| format!("{}", src.display()))?;
    if meta.is_dir() {
        fs::create_dir(dst).with_context(|| format!("can't create {}", dst.display()))?;
        for item in fs::read_dir(src)? {
            let item = item?;
            copy_recursive(&item.path(), &dst.join(item.file_name()))?;
        }
    } else {
        fs::copy(src, dst)
            .with_context(|| format!("can't copy {} to {}", src.display(), dst.display()))?;
    }
    Ok(())
}

impl Navigation for FsNav {
    fn down(&mut self) {
        if self.dir.ind + 1 < self.dir.entries.len() {
            self.dir.ind += 1;
        }
    }

    fn up(&mut self) {
        self.dir.ind = self.dir.ind.saturating_sub(1);
    }

    fn top(&mut self) {
        self.dir.ind = 0;
    }

    fn bot(&mut self) {
        self.dir.ind = self.dir.entries.len().saturating_sub(1);
    }

    fn updir(&mut self) -> Result<()> {
        let current = self.dir.path.clone();
        let parent = current
            .parent()
            .ok_or_else(|| anyhow!("updir: already at root"))?
            .to_path_buf();
        let name = current.file_name().map(OsStr::to_os_string);
        self.load(parent, name.as_deref())
    }

    fn open(&mut self) -> Result<()> {
        let path = self
            .dir
            .current_path()
            .ok_or_else(|| anyhow!("open: empty directory"))?;
        if !path.is_dir() {
            bail!("open: {} is not a directory", path.display());
        }
        self.load(path, None)
    }

    fn cd(&mut self, path: &str) -> Result<()> {
        let target = expand_home(path)?;
        let target = if target.is_absolute() {
            target
        } else {
            self.dir.path.join(target)
        };
        let canonical = fs::canonicalize(&target)
            .with_context(|| format!("cd: can't canonicalize {}", target.display()))?;
        if !canonical.is_dir() {
            bail!("cd: {} is not a directory", canonical.display());
        }
        self.load(canonical, None)
    }

    fn current_dir(&self) -> &Dir {
        &self.dir
    }

    fn toggle(&mut self) {
        if let Some(path) = self.dir.current_path() {
            if !self.marks.remove(&path) {
                self.marks.insert(path);
            }
        }
    }

    fn marks(&self) -> Vec<PathBuf> {
        self.marks.iter().cloned().collect()
    }

    fn clear_marks(&mut self) {
        self.marks.clear();
    }

    fn save(&mut self, copy: bool) -> Result<()> {
        let paths = if self.marks.is_empty() {
            match self.dir.current_path() {
                Some(path) => vec![path],
                None => bail!("no file selected"),
            }
        } else {
            self.marks()
        };
        self.clipboard = Some(Clipboard { paths, copy });
        Ok(())
    }

    fn paste(&mut self) -> Result<()> {
        let Some(clip) = self.clipboard.as_ref() else {
            bail!("clipboard is empty");
        };

        for src in &clip.paths {
            let name = src
                .file_name()
                .ok_or_else(|| anyhow!("invalid path {}", src.display()))?;
            let dst = self.dir.path.join(name);
            if dst.exists() {
                bail!("{} already exists", dst.display());
            }
            if clip.copy {
                copy_recursive(src, &dst)?;
            } else {
                fs::rename(src, &dst).with_context(|| {
                    format!("can't move {} to {}", src.display(), dst.display())
                })?;
            }
        }

        self.clipboard = None;
        Ok(())
    }

    fn renew(&mut self, height: usize, opts: &Options) {
        self.height = height;
        self.hidden = opts.hidden;
        self.sortby = opts.sortby;

        let selected = self.dir.current().map(|e| e.file_name.clone());
        match read_entries(&self.dir.path, self.hidden, self.sortby) {
            Ok(entries) => {
                let ind = selected
                    .and_then(|name| entries.iter().position(|e| e.file_name == name))
                    .unwrap_or_else(|| self.dir.ind.min(entries.len().saturating_sub(1)));
                self.dir.entries = entries;
                self.dir.ind = ind;
            }
            Err(e) => tracing::warn!("renew: {:#}", e),
        }
    }

    fn height(&self) -> usize {
        self.height
    }
}
