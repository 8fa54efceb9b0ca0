use std::path::Path;

use anyhow::Result;

use crate::cleaners::{
    Sweep, accessed_before, has_extension, home_dir, modified_before, run_tool, sweep_dir_contents,
    sweep_each, sweep_files,
};
use crate::core::CleanupType;

const TEMP_MAX_AGE_DAYS: u64 = 10;
const LOG_MAX_AGE_DAYS: u64 = 30;

pub fn cleaners() -> Vec<CleanupType> {
    vec![
        CleanupType::new("apt", || run_tool("apt-get", &["clean"])).root(true),
        CleanupType::new("temp", remove_old_temp_files),
        CleanupType::new("crash", || {
            sweep_dir_contents(Path::new("/var/crash"))?.finish("crash reports")
        })
        .confirm(true)
        .root(true),
        CleanupType::new("logs", || {
            old_log_sweep(Path::new("/var/log"), LOG_MAX_AGE_DAYS).finish("old logs")
        })
        .confirm(true)
        .root(true),
        CleanupType::new("journal", || {
            run_tool("journalctl", &["--vacuum-time=30d"])
        })
        .confirm(true)
        .root(true),
        CleanupType::new("cache", clean_user_cache).confirm(true),
        CleanupType::new("trash", empty_trash).confirm(true),
        CleanupType::new("thumbnails", clean_thumbnails),
    ]
}

fn remove_old_temp_files() -> Result<()> {
    let mut sweep = Sweep::default();
    for dir in ["/tmp", "/var/tmp"] {
        sweep.merge(old_temp_sweep(Path::new(dir), TEMP_MAX_AGE_DAYS));
    }
    sweep.finish("temporary files")
}

fn old_temp_sweep(root: &Path, days: u64) -> Sweep {
    sweep_files(root, |_, meta| accessed_before(meta, days))
}

/// Plain and rotated logs (`*.log`, `*.gz`, `*.1`) untouched for `days`.
fn old_log_sweep(root: &Path, days: u64) -> Sweep {
    sweep_files(root, |path, meta| {
        let rotated = has_extension(path, "gz") || has_extension(path, "1");
        (has_extension(path, "log") || rotated) && modified_before(meta, days)
    })
}

fn clean_user_cache() -> Result<()> {
    let home = home_dir()?;
    sweep_dir_contents(&home.join(".cache"))?.finish("user cache")
}

fn clean_thumbnails() -> Result<()> {
    let home = home_dir()?;
    sweep_dir_contents(&home.join(".cache").join("thumbnails"))?.finish("thumbnails")
}

fn empty_trash() -> Result<()> {
    let home = home_dir()?;
    let trash = home.join(".local").join("share").join("Trash");
    sweep_each([trash.join("files"), trash.join("info"), trash.join("expunged")])?
        .finish("trash")
}
