use std::path::Path;

use anyhow::Result;

use crate::cleaners::{home_dir, modified_before, sweep_dir_contents, sweep_files};
use crate::core::CleanupType;

const LOG_MAX_AGE_DAYS: u64 = 30;

pub fn cleaners() -> Vec<CleanupType> {
    vec![
        CleanupType::new("macOSUserCaches", clean_user_caches),
        CleanupType::new("macOSUserLogs", clean_user_logs).confirm(true),
        CleanupType::new("macOSTrash", empty_trash).confirm(true),
        CleanupType::new("macOSXcodeCache", clean_xcode_derived_data),
        CleanupType::new("macOSSystemLogs", || {
            old_files(Path::new("/private/var/log"), LOG_MAX_AGE_DAYS).finish("system logs")
        })
        .confirm(true)
        .root(true),
    ]
}

fn clean_user_caches() -> Result<()> {
    let home = home_dir()?;
    let caches = home.join("Library").join("Caches");
    // Directory tree stays; apps expect their cache folders to exist.
    sweep_files(&caches, |_, _| true).finish("user caches")
}

fn clean_user_logs() -> Result<()> {
    let home = home_dir()?;
    old_files(&home.join("Library").join("Logs"), LOG_MAX_AGE_DAYS).finish("user logs")
}

fn empty_trash() -> Result<()> {
    let home = home_dir()?;
    sweep_dir_contents(&home.join(".Trash"))?.finish("Trash")
}

fn clean_xcode_derived_data() -> Result<()> {
    let home = home_dir()?;
    let derived = home
        .join("Library")
        .join("Developer")
        .join("Xcode")
        .join("DerivedData");
    sweep_dir_contents(&derived)?.finish("Xcode derived data")
}

fn old_files(root: &Path, days: u64) -> crate::cleaners::Sweep {
    sweep_files(root, |_, meta| modified_before(meta, days))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macos_table_flags() {
        let types = cleaners();
        let names: Vec<&str> = types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "macOSUserCaches",
                "macOSUserLogs",
                "macOSTrash",
                "macOSXcodeCache",
                "macOSSystemLogs"
            ]
        );
        let root_only: Vec<&str> = types
            .iter()
            .filter(|t| t.requires_root)
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(root_only, vec!["macOSSystemLogs"]);
        assert!(types.iter().find(|t| t.name == "macOSTrash").unwrap().requires_confirmation);
    }
}
