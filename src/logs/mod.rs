use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::{CleanupResult, RunSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Tui,
    Batch,
}

/// One completed run, as handed to `write_run_log`.
#[derive(Debug, Clone)]
pub struct RunRecord<'a> {
    pub mode: RunMode,
    pub started_at: OffsetDateTime,
    pub finished_at: OffsetDateTime,
    pub free_before: u64,
    pub free_after: u64,
    pub results: &'a [CleanupResult],
    pub skipped: &'a [String],
}

#[derive(Debug, Serialize)]
struct RunLog {
    schema_version: &'static str,
    tool_version: String,
    mode: RunMode,
    started_at: String,
    finished_at: String,
    status: &'static str,
    summary: RunSummary,
    results: Vec<RunLogItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RunLogItem {
    name: String,
    status: &'static str,
    space_freed: u64,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn logs_dir(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/broom/logs")
}

pub fn run_status(results: &[CleanupResult]) -> &'static str {
    let failed = results.iter().filter(|r| !r.success).count();
    if failed == 0 {
        "ok"
    } else if failed == results.len() {
        "error"
    } else {
        "partial_error"
    }
}

pub fn write_run_log(home_dir: &Path, record: &RunRecord<'_>) -> Result<PathBuf> {
    let dir = logs_dir(home_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let pid = std::process::id();
    let ts = record.finished_at.unix_timestamp_nanos();
    let path = dir.join(format!("run-{pid}-{ts}.json"));

    let results = record
        .results
        .iter()
        .map(|r| RunLogItem {
            name: r.name.clone(),
            status: if r.success { "success" } else { "failed" },
            space_freed: r.space_freed,
            duration_ms: r.duration.as_millis().min(u128::from(u64::MAX)) as u64,
            error: r.error.as_deref().map(|e| mask_home(e, home_dir)),
        })
        .collect();

    let log = RunLog {
        schema_version: "1.0",
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        mode: record.mode,
        started_at: record
            .started_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string()),
        finished_at: record
            .finished_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string()),
        status: run_status(record.results),
        summary: RunSummary::new(record.results, record.free_before, record.free_after),
        results,
        skipped: record.skipped.to_vec(),
    };

    let buf = serde_json::to_vec_pretty(&log).context("failed to serialize run log")?;
    std::fs::write(&path, buf)
        .with_context(|| format!("failed to write run log: {}", path.display()))?;
    Ok(path)
}

/// `~`-relative form of `path` for display.
pub fn display_path(path: &Path, home_dir: &Path) -> String {
    path.strip_prefix(home_dir)
        .map(|p| format!("~/{}", p.display()))
        .unwrap_or_else(|_| path.display().to_string())
}

fn mask_home(text: &str, home_dir: &Path) -> String {
    let home = home_dir.display().to_string();
    if home.len() <= 1 {
        return text.to_string();
    }
    text.replace(&home, "~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    fn make_temp_home() -> PathBuf {
        static HOME_SEQ: AtomicU64 = AtomicU64::new(0);
        let seq = HOME_SEQ.fetch_add(1, Ordering::Relaxed);
        let home = std::env::temp_dir().join(format!("broom-log-test-{}-{seq}", std::process::id()));
        let _ = std::fs::remove_dir_all(&home);
        std::fs::create_dir_all(&home).expect("create home");
        home
    }

    #[test]
    fn write_run_log_records_results_and_masks_home() {
        let home = make_temp_home();
        let results = vec![
            CleanupResult {
                name: "npm".to_string(),
                success: true,
                space_freed: 4096,
                duration: Duration::from_millis(1500),
                error: None,
            },
            CleanupResult::failed(
                "cache",
                format!("could not remove user cache: {}/.cache/x: denied", home.display()),
                Duration::from_millis(3),
            ),
        ];
        let skipped = vec!["docker".to_string()];
        let now = OffsetDateTime::now_utc();

        let path = write_run_log(
            &home,
            &RunRecord {
                mode: RunMode::Batch,
                started_at: now,
                finished_at: now,
                free_before: 10_000,
                free_after: 14_096,
                results: &results,
                skipped: &skipped,
            },
        )
        .expect("write log");

        assert!(path.starts_with(logs_dir(&home)));
        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with(&format!("run-{}-", std::process::id())));

        let v: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).expect("read log")).expect("json");
        assert_eq!(v["mode"], "batch");
        assert_eq!(v["status"], "partial_error");
        assert_eq!(v["summary"]["total_freed"], 0);
        assert_eq!(v["summary"]["items_freed"], 4096);
        assert_eq!(v["results"][0]["duration_ms"], 1500);
        assert_eq!(v["results"][1]["status"], "failed");
        assert_eq!(
            v["results"][1]["error"],
            "could not remove user cache: ~/.cache/x: denied"
        );
        assert_eq!(v["skipped"][0], "docker");
        let _ = std::fs::remove_dir_all(&home);
    }

    #[test]
    fn run_status_classification() {
        let ok = CleanupResult::from_outcome("a", Ok(1), Duration::ZERO);
        let bad = CleanupResult::failed("b", "x", Duration::ZERO);
        assert_eq!(run_status(&[]), "ok");
        assert_eq!(run_status(&[ok.clone()]), "ok");
        assert_eq!(run_status(&[ok, bad.clone()]), "partial_error");
        assert_eq!(run_status(&[bad]), "error");
    }

    #[test]
    fn display_path_uses_tilde_inside_home() {
        let home = Path::new("/home/u");
        assert_eq!(
            display_path(Path::new("/home/u/.config/broom/logs/a.json"), home),
            "~/.config/broom/logs/a.json"
        );
        assert_eq!(display_path(Path::new("/var/log"), home), "/var/log");
    }
}
