use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::cleaners::{
    Sweep, has_extension, home_dir, run_tool, run_user_tool, sweep_dir_contents, sweep_dirs_named,
    sweep_each, sweep_files,
};
use crate::core::CleanupType;

/// Cleaners shared by every supported platform.
pub fn cleaners() -> Vec<CleanupType> {
    vec![
        CleanupType::new("python", clean_python_cache),
        CleanupType::new("npm", || run_user_tool("npm", &["cache", "clean", "--force"])),
        CleanupType::new("gradle", clean_gradle_cache),
        CleanupType::new("composer", || run_user_tool("composer", &["clear-cache"])),
        CleanupType::new("ruby", || run_user_tool("gem", &["cleanup"])),
        CleanupType::new("browser", clear_browser_caches),
        CleanupType::new("docker", || run_tool("docker", &["system", "prune", "-af"])).confirm(true),
    ]
}

fn clean_python_cache() -> Result<()> {
    let home = home_dir()?;
    python_sweep(&home).finish("Python caches")
}

fn python_sweep(root: &Path) -> Sweep {
    let mut sweep = sweep_dirs_named(root, "__pycache__");
    sweep.merge(sweep_files(root, |p, _| has_extension(p, "pyc")));
    sweep
}

fn clean_gradle_cache() -> Result<()> {
    let home = home_dir()?;
    sweep_dir_contents(&home.join(".gradle").join("caches"))?.finish("Gradle caches")
}

fn clear_browser_caches() -> Result<()> {
    let home = home_dir()?;
    sweep_each(browser_cache_dirs(&home, cfg!(target_os = "macos")))?.finish("browser caches")
}

fn browser_cache_dirs(home: &Path, macos: bool) -> Vec<PathBuf> {
    if macos {
        let caches = home.join("Library").join("Caches");
        return vec![
            caches.join("Google").join("Chrome"),
            caches.join("Chromium"),
            caches.join("Firefox"),
            caches.join("com.brave.Browser"),
        ];
    }

    let cache = home.join(".cache");
    let mut dirs = vec![
        cache.join("google-chrome").join("Default").join("Cache"),
        cache.join("chromium").join("Default").join("Cache"),
        cache.join("BraveSoftware"),
    ];
    // Firefox keeps one cache2 directory per profile.
    if let Ok(profiles) = std::fs::read_dir(cache.join("mozilla").join("firefox")) {
        dirs.extend(profiles.flatten().map(|p| p.path().join("cache2")));
    }
    dirs
}
