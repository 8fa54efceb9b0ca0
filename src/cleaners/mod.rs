//! Built-in cleanup actions.
//!
//! Each provider returns the cleanup types for one table (common, Linux,
//! macOS). Actions are silent: they never print, and report failure through
//! their `Result` only.

pub mod common;
pub mod linux;
pub mod macos;

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Result, anyhow, bail};
use walkdir::WalkDir;

use crate::platform::{self, CommandOutput, CommandRunOptions};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Tally of one deletion pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Sweep {
    pub removed: u64,
    pub failed: u64,
    pub first_error: Option<String>,
}

impl Sweep {
    fn record(&mut self, path: &Path, res: std::io::Result<()>) {
        match res {
            Ok(()) => self.removed += 1,
            Err(err) => {
                self.failed += 1;
                if self.first_error.is_none() {
                    self.first_error = Some(format!("{}: {err}", path.display()));
                }
            }
        }
    }

    pub fn merge(&mut self, other: Sweep) {
        self.removed += other.removed;
        self.failed += other.failed;
        if self.first_error.is_none() {
            self.first_error = other.first_error;
        }
    }

    /// A pass where nothing could be removed but something was attempted is a
    /// failure. Partial progress is success.
    pub fn finish(self, what: &str) -> Result<()> {
        if self.failed > 0 && self.removed == 0 {
            let detail = self.first_error.unwrap_or_default();
            bail!("could not remove {what} ({} entries failed): {detail}", self.failed);
        }
        Ok(())
    }
}

pub(crate) fn home_dir() -> Result<PathBuf> {
    platform::effective_home_dir()
}

/// Removes everything inside `dir`, keeping `dir` itself. A missing
/// directory is an empty sweep.
pub fn sweep_dir_contents(dir: &Path) -> Result<Sweep> {
    let mut sweep = Sweep::default();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(sweep),
        Err(err) => return Err(anyhow!("failed to read {}: {err}", dir.display())),
    };

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                sweep.record(dir, Err(err));
                continue;
            }
        };
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let res = if is_dir {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        sweep.record(&path, res);
    }

    Ok(sweep)
}

/// Deletes regular files under `root` accepted by `matches`. Symlinks are not
/// followed and directories are left in place.
pub fn sweep_files<F>(root: &Path, matches: F) -> Sweep
where
    F: Fn(&Path, &Metadata) -> bool,
{
    let mut sweep = Sweep::default();
    for entry in WalkDir::new(root).follow_links(false).into_iter() {
        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if matches(entry.path(), &meta) {
            sweep.record(entry.path(), std::fs::remove_file(entry.path()));
        }
    }
    sweep
}

/// Removes every directory named `name` below `root`, without descending
/// into the ones it removes.
pub fn sweep_dirs_named(root: &Path, name: &str) -> Sweep {
    let mut sweep = Sweep::default();
    let mut it = WalkDir::new(root).follow_links(false).min_depth(1).into_iter();
    while let Some(entry) = it.next() {
        let Ok(entry) = entry else {
            continue;
        };
        if entry.file_type().is_dir() && entry.file_name() == name {
            sweep.record(entry.path(), std::fs::remove_dir_all(entry.path()));
            it.skip_current_dir();
        }
    }
    sweep
}

pub fn sweep_each<I>(dirs: I) -> Result<Sweep>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut total = Sweep::default();
    for dir in dirs {
        total.merge(sweep_dir_contents(&dir)?);
    }
    Ok(total)
}

pub fn modified_before(meta: &Metadata, days: u64) -> bool {
    older_than(meta.modified(), days)
}

pub fn accessed_before(meta: &Metadata, days: u64) -> bool {
    older_than(meta.accessed(), days)
}

fn older_than(stamp: std::io::Result<SystemTime>, days: u64) -> bool {
    let Ok(stamp) = stamp else {
        return false;
    };
    SystemTime::now()
        .duration_since(stamp)
        .map(|age| age > Duration::from_secs(days.saturating_mul(SECS_PER_DAY)))
        .unwrap_or(false)
}

pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e == ext)
}

/// Runs a system tool when it is installed. A missing tool is not an error.
pub fn run_tool(cmd: &str, args: &[&str]) -> Result<()> {
    if !platform::command_exists(cmd) {
        return Ok(());
    }
    let out = platform::run_to_completion(cmd, args, &CommandRunOptions::default())?;
    check_exit(cmd, &out)
}

/// Runs a per-user tool (package manager caches and the like) as the invoking
/// user, also under `sudo`.
pub fn run_user_tool(cmd: &str, args: &[&str]) -> Result<()> {
    if !platform::command_exists(cmd) {
        return Ok(());
    }
    let out = platform::run_as_invoking_user(cmd, args)?;
    check_exit(cmd, &out)
}

fn check_exit(cmd: &str, out: &CommandOutput) -> Result<()> {
    if out.success() {
        return Ok(());
    }
    match out.first_error_line() {
        Some(line) => bail!("{cmd} exited with code {}: {line}", out.exit_code),
        None => bail!("{cmd} exited with code {}", out.exit_code),
    }
}
