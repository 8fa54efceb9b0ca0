use std::io;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde::Serialize;

use crate::config::EffectiveConfig;
use crate::engine::{Engine, FsProbe};
use crate::platform::Platform;
use crate::ui::UiConfig;

mod batch;
mod interactive;

#[derive(Debug, Parser)]
#[command(
    name = "broom",
    version,
    about = "Interactive disk cleanup for Linux and macOS"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Pick cleanup types in a full-screen terminal UI (the default).
    Ui(UiArgs),
    /// Run cleanup types without the UI.
    Run(RunArgs),
    /// Show every cleanup type available on this system.
    List(ListArgs),
    Completion(CompletionArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct UiArgs {}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Run every available cleanup type.
    #[arg(long)]
    pub all: bool,
    /// Comma separated cleanup types to run.
    #[arg(short = 'i', long, value_delimiter = ',')]
    pub include: Vec<String>,
    /// Run everything except these comma separated cleanup types.
    #[arg(short = 'x', long, value_delimiter = ',')]
    pub exclude: Vec<String>,
    /// Answer yes to every confirmation prompt.
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let stdin_is_tty = io::stdin().is_terminal();
    let stdout_is_tty = io::stdout().is_terminal();
    let stderr_is_tty = io::stderr().is_terminal();

    let home_dir = crate::platform::effective_home_dir()?;

    let env_config_path = std::env::var_os("BROOM_CONFIG").map(PathBuf::from);
    let cfg = crate::config::load(
        cli.config.as_deref().or(env_config_path.as_deref()),
        &home_dir,
    )
    .map_err(crate::exit::invalid_args_err)?;

    let color = stdout_is_tty && cfg.ui.color && !cli.no_color;

    let ui_cfg = UiConfig {
        color,
        stdin_is_tty,
        stdout_is_tty,
        stderr_is_tty,
        quiet: cli.quiet,
    };

    match cli.command.unwrap_or(Commands::Ui(UiArgs {})) {
        Commands::Ui(_args) => {
            if cli.json {
                return Err(crate::exit::invalid_args("ui cannot be combined with --json"));
            }
            if !(ui_cfg.stdin_is_tty && ui_cfg.stdout_is_tty) {
                return Err(crate::exit::invalid_args(
                    "the interactive UI needs a terminal on stdin and stdout; use `broom run` instead",
                ));
            }
            let engine = load_engine(&cfg)?;
            crate::tui::run(
                engine,
                crate::tui::TuiOptions {
                    home_dir,
                    color: ui_cfg.color,
                    log_capacity: cfg.ui.log_capacity,
                    logs_enabled: cfg.logs.enabled,
                },
            )?;
        }
        Commands::Run(args) => {
            let engine = load_engine(&cfg)?;
            batch::run_batch(
                &engine,
                &args,
                &batch::BatchOptions {
                    json: cli.json,
                    ui: &ui_cfg,
                    home_dir: &home_dir,
                    logs_enabled: cfg.logs.enabled,
                },
            )?;
        }
        Commands::List(_args) => {
            let engine = load_engine(&cfg)?;
            let types = engine.registry().types();
            if cli.json {
                let entries: Vec<ListEntry> = types
                    .iter()
                    .map(|t| ListEntry {
                        name: &t.name,
                        requires_confirmation: t.requires_confirmation,
                        requires_root: t.requires_root,
                    })
                    .collect();
                write_json(&entries)?;
            } else {
                crate::ui::print_list(&types, &ui_cfg);
            }
        }
        Commands::Completion(args) => {
            let shell = parse_shell(&args.shell)?;
            let mut cmd = Cli::command();
            let mut out = io::stdout().lock();
            clap_complete::generate(shell, &mut cmd, "broom", &mut out);
        }
        Commands::Config(args) => {
            if args.show {
                if cli.json {
                    write_json(&cfg)?;
                } else {
                    println!("{}", toml::to_string_pretty(&cfg)?);
                }
            } else if !ui_cfg.quiet {
                eprintln!("config: use `broom config --show`");
            }
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct ListEntry<'a> {
    name: &'a str,
    requires_confirmation: bool,
    requires_root: bool,
}

/// Registry for the running OS behind an engine sampling `/`.
fn load_engine(cfg: &EffectiveConfig) -> Result<Engine> {
    let platform = Platform::current()
        .ok_or_else(|| crate::exit::unsupported_platform(std::env::consts::OS))?;
    let registry = crate::registry::build_registry(platform, &cfg.cleaners.exclude)
        .map_err(crate::exit::invalid_args_err)?;
    if registry.is_empty() {
        return Err(crate::exit::unsupported_platform(platform.as_str()));
    }
    Ok(Engine::new(Arc::new(registry), Arc::new(FsProbe::root())))
}

fn write_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    use std::io::Write;

    let buf = serde_json::to_vec_pretty(value)?;

    let mut stdout = io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        "fish" => Ok(clap_complete::Shell::Fish),
        other => Err(crate::exit::invalid_args(format!(
            "unsupported shell: {other} (expected bash|zsh|fish)"
        ))),
    }
}
