use crate::command::Discipline;
use anyhow::{Context, Result, anyhow};
use std::ffi::{OsStr, OsString};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// One external command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    /// Shell text, passed to `$SHELL -c`.
    pub text: &'a str,
    /// Positional parameters `$1..`.
    pub args: &'a [String],
    pub discipline: Discipline,
    /// Extra environment variables for the child.
    pub vars: Vec<(&'static str, OsString)>,
}

/// Process execution collaborator.
pub trait ProcessRunner {
    /// Run an invocation under its discipline.
    ///
    /// `Foreground` and `Wait` return after the child exits; `Async` returns
    /// as soon as the child is spawned.
    fn run(&mut self, inv: &Invocation<'_>) -> Result<()>;

    /// Collect asynchronous children that have finished.
    fn reap(&mut self) {}
}

/// Runs commands through the user's shell.
///
/// Asynchronous children are kept in an explicit registry until [`reap`]
/// observes their exit; nothing is killed or waited on implicitly.
///
/// [`reap`]: ProcessRunner::reap
pub struct ShellRunner {
    shell: PathBuf,
    background: Vec<Child>,
}

impl ShellRunner {
    /// Use `$SHELL`, falling back to `sh`, resolved through `PATH`.
    pub fn new() -> Result<Self> {
        let shell = std::env::var("SHELL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "sh".to_string());
        let search_paths = std::env::var_os("PATH").unwrap_or_default();
        let resolved = find_command_path(&search_paths, Path::new(&shell))
            .ok_or_else(|| anyhow!("shell not found: {}", shell))?;
        Ok(Self::with_shell(resolved))
    }

    pub fn with_shell(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            background: Vec::new(),
        }
    }

    /// Number of asynchronous children not yet reaped.
    pub fn pending(&self) -> usize {
        self.background.len()
    }

    fn command(&self, inv: &Invocation<'_>) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(inv.text)
            .arg("--")
            .args(inv.args)
            .envs(inv.vars.iter().map(|(k, v)| (*k, v)));
        cmd
    }
}

impl ProcessRunner for ShellRunner {
    fn run(&mut self, inv: &Invocation<'_>) -> Result<()> {
        let mut cmd = self.command(inv);
        match inv.discipline {
            Discipline::Foreground => {
                let status = cmd
                    .status()
                    .with_context(|| format!("can't run {}", self.shell.display()))?;
                tracing::debug!(%status, "shell finished");
            }
            Discipline::Wait => {
                let status = cmd
                    .status()
                    .with_context(|| format!("can't run {}", self.shell.display()))?;
                tracing::debug!(%status, "shell-wait finished");
                print!("\nPress ENTER to continue");
                std::io::stdout().flush()?;
                let mut ack = String::new();
                std::io::stdin().lock().read_line(&mut ack)?;
            }
            Discipline::Async => {
                let child = cmd
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .with_context(|| format!("can't spawn {}", self.shell.display()))?;
                tracing::debug!(pid = child.id(), "shell-async started");
                self.background.push(child);
            }
        }
        Ok(())
    }

    fn reap(&mut self) {
        self.background.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!(pid = child.id(), %status, "shell-async finished");
                false
            }
            Ok(None) => true,
            Err(e) => {
                tracing::warn!(pid = child.id(), "shell-async: {}", e);
                false
            }
        });
    }
}

/// Locate `program` for spawning.
///
/// A name with a directory part (`/bin/sh`, `./sh`, `bin/sh`) is taken as a
/// path and must exist. A bare name is looked up in each directory of
/// `search_paths`, a `PATH`-style list.
pub fn find_command_path(search_paths: &OsStr, program: &Path) -> Option<PathBuf> {
    if program.as_os_str().is_empty() {
        return None;
    }
    if program.components().count() > 1 || program.is_absolute() {
        return program.exists().then(|| program.to_path_buf());
    }
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
