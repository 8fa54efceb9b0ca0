use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use time::OffsetDateTime;

use crate::core::{CleanupResult, CleanupType, RunItem, RunSummary};
use crate::engine::{Engine, QuietPanics};
use crate::exit::ExitCode;
use crate::logs::{RunMode, RunRecord};
use crate::ui::UiConfig;

use super::RunArgs;
use super::interactive::prompt_proceed;

const OS_INFO_TIMEOUT: Duration = Duration::from_secs(5);
const INTERRUPTED: &str = "interrupted";

pub(crate) struct BatchOptions<'a> {
    pub json: bool,
    pub ui: &'a UiConfig,
    pub home_dir: &'a Path,
    pub logs_enabled: bool,
}

/// One chosen type, in registry order. `skip` is set when it must not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Planned {
    pub name: String,
    pub requires_confirmation: bool,
    pub skip: Option<String>,
}

/// Resolves `--all` / `--include` / `--exclude` against the registered types.
pub(crate) fn plan_run(types: &[CleanupType], args: &RunArgs, is_root: bool) -> Result<Vec<Planned>> {
    let include = clean_names(&args.include);
    let exclude = clean_names(&args.exclude);

    let given = [args.all, !include.is_empty(), !exclude.is_empty()]
        .iter()
        .filter(|b| **b)
        .count();
    if given == 0 {
        return Err(crate::exit::invalid_args(
            "run needs one of --all, --include or --exclude",
        ));
    }
    if given > 1 {
        return Err(crate::exit::invalid_args(
            "--all, --include and --exclude cannot be combined",
        ));
    }

    for name in include.iter().chain(&exclude) {
        if !types.iter().any(|t| t.name == *name) {
            return Err(crate::exit::invalid_args(format!(
                "unknown cleanup type: {name}"
            )));
        }
    }

    let chosen: Vec<&CleanupType> = types
        .iter()
        .filter(|t| {
            if !include.is_empty() {
                include.contains(&t.name)
            } else {
                !exclude.contains(&t.name)
            }
        })
        .collect();

    if !include.is_empty() && !is_root {
        if let Some(t) = chosen.iter().find(|t| t.requires_root) {
            return Err(crate::exit::invalid_args(format!(
                "{} requires root; re-run with sudo",
                t.name
            )));
        }
    }

    Ok(chosen
        .into_iter()
        .map(|t| Planned {
            name: t.name.clone(),
            requires_confirmation: t.requires_confirmation,
            skip: (t.requires_root && !is_root).then(|| "requires root".to_string()),
        })
        .collect())
}

fn clean_names(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = raw
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    out.sort();
    out.dedup();
    out
}

pub(crate) fn run_batch(engine: &Engine, args: &RunArgs, opts: &BatchOptions<'_>) -> Result<()> {
    let types = engine.registry().types();
    let plan = plan_run(&types, args, crate::platform::is_root())?;
    let chatty = !opts.json && !opts.ui.quiet;
    let _quiet_panics = QuietPanics::install();
    let interrupted = install_interrupt_handler(opts.ui.quiet);

    if chatty {
        let os = crate::platform::os_info(OS_INFO_TIMEOUT);
        println!(
            "broom v{} on {} {}\n",
            env!("CARGO_PKG_VERSION"),
            os.name,
            os.version
        );
    }

    let started_at = OffsetDateTime::now_utc();
    let free_before = engine.free_bytes();

    let items = execute_plan(engine, plan, args, opts, &interrupted)?;

    let free_after = engine.free_bytes();
    let finished_at = OffsetDateTime::now_utc();

    let results: Vec<CleanupResult> = items.iter().filter_map(|i| i.result().cloned()).collect();
    let skipped: Vec<String> = items
        .iter()
        .filter(|i| i.result().is_none())
        .map(|i| i.name().to_string())
        .collect();
    let summary = RunSummary::new(&results, free_before, free_after);

    let log_path = if opts.logs_enabled {
        let record = RunRecord {
            mode: RunMode::Batch,
            started_at,
            finished_at,
            free_before,
            free_after,
            results: &results,
            skipped: &skipped,
        };
        match crate::logs::write_run_log(opts.home_dir, &record) {
            Ok(path) => Some(crate::logs::display_path(&path, opts.home_dir)),
            Err(err) => {
                if !opts.ui.quiet {
                    eprintln!("warning: run log not written: {err:#}");
                }
                None
            }
        }
    } else {
        None
    };

    if opts.json {
        super::write_json(&BatchReport::new(&items, summary, log_path))?;
    } else {
        crate::ui::print_run_report(&items, &summary, opts.ui);
        if let Some(path) = &log_path {
            if !opts.ui.quiet {
                println!("Run log: {path}");
            }
        }
    }

    if interrupted.load(Ordering::SeqCst) {
        let not_started = items
            .iter()
            .filter(|i| matches!(i, RunItem::Skipped { reason, .. } if reason == INTERRUPTED))
            .count();
        return Err(crate::exit::interrupted(not_started));
    }
    if summary.failed > 0 {
        return Err(crate::exit::cleanup_failed(summary.failed, summary.total()));
    }
    Ok(())
}

/// SIGINT and SIGTERM set the returned flag; the step in flight finishes and
/// the rest are skipped. A second signal exits at once.
fn install_interrupt_handler(quiet: bool) -> Arc<AtomicBool> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    let installed = ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            std::process::exit(ExitCode::Interrupted.as_i32());
        }
        if !quiet {
            eprintln!("\nReceived interrupt signal. Exiting...");
        }
    });
    if let Err(err) = installed {
        if !quiet {
            eprintln!("warning: interrupt handler not installed: {err}");
        }
    }
    interrupted
}

/// Runs the plan in order. Once `interrupted` is set no further step starts;
/// the remaining ones are recorded as skipped.
fn execute_plan(
    engine: &Engine,
    plan: Vec<Planned>,
    args: &RunArgs,
    opts: &BatchOptions<'_>,
    interrupted: &AtomicBool,
) -> Result<Vec<RunItem>> {
    let chatty = !opts.json && !opts.ui.quiet;
    let mut items = Vec::with_capacity(plan.len());
    for step in plan {
        if interrupted.load(Ordering::SeqCst) {
            items.push(interrupted_skip(step.name));
            continue;
        }
        if chatty {
            println!("==> {}", step.name);
        }
        let item = match decide(&step, args.yes, opts.ui.stdin_is_tty)? {
            Some(reason) => RunItem::Skipped {
                name: step.name,
                reason,
            },
            None if interrupted.load(Ordering::SeqCst) => interrupted_skip(step.name),
            None => RunItem::Ran(run_one(engine, &step.name, opts)),
        };
        if !opts.json {
            crate::ui::print_item_outcome(&item, opts.ui);
        }
        items.push(item);
    }
    Ok(items)
}

fn interrupted_skip(name: String) -> RunItem {
    RunItem::Skipped {
        name,
        reason: INTERRUPTED.to_string(),
    }
}

/// Why `step` will not run, or `None` when it should.
fn decide(step: &Planned, yes: bool, stdin_is_tty: bool) -> Result<Option<String>> {
    if let Some(reason) = &step.skip {
        return Ok(Some(reason.clone()));
    }
    if !step.requires_confirmation || yes {
        return Ok(None);
    }
    if !stdin_is_tty {
        return Ok(Some("needs confirmation; pass --yes".to_string()));
    }
    if prompt_proceed(&step.name)? {
        Ok(None)
    } else {
        Ok(Some("declined".to_string()))
    }
}

fn run_one(engine: &Engine, name: &str, opts: &BatchOptions<'_>) -> CleanupResult {
    let progress_enabled = opts.ui.stderr_is_tty && !opts.ui.quiet && !opts.json;
    let pb = if progress_enabled {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.set_message(format!("cleaning {name}..."));
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let result = engine.run(name);

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    result
}

#[derive(Debug, Serialize)]
struct BatchReport<'a> {
    summary: RunSummary,
    results: Vec<&'a CleanupResult>,
    skipped: Vec<SkippedEntry<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct SkippedEntry<'a> {
    name: &'a str,
    reason: &'a str,
}

impl<'a> BatchReport<'a> {
    fn new(items: &'a [RunItem], summary: RunSummary, log_path: Option<String>) -> Self {
        let mut results = Vec::new();
        let mut skipped = Vec::new();
        for item in items {
            match item {
                RunItem::Ran(r) => results.push(r),
                RunItem::Skipped { name, reason } => skipped.push(SkippedEntry { name, reason }),
            }
        }
        Self {
            summary,
            results,
            skipped,
            log_path,
        }
    }
}
