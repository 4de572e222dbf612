//! `lumen`: run, replay and check the adaptive light-matching controller.

mod backend;
mod cli;
mod error_fmt;
mod replay;
mod rt;
mod run;
mod self_check;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use lumen_core::LumenError;
use lumen_traits::PanelSnapshot;
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::RunOptions;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = color_eyre::install() {
        eprintln!("warning: failed to install color-eyre: {e}");
    }

    if let Err(err) = try_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn try_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    // Held until return so the file sink flushes before the process exits.
    let _file_guard = init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    let json = cli.json;
    let result = dispatch(&cfg, cli.cmd, json);
    if let Err(err) = &result {
        let detail = format!("{err:#}");
        tracing::error!(error = %detail, "command failed");
    }
    result
}

fn dispatch(cfg: &lumen_config::Config, cmd: Commands, json: bool) -> eyre::Result<()> {
    match cmd {
        Commands::Run {
            ticks,
            manual,
            pot,
            off,
            trace,
            stats,
            rt,
            rt_lock,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            {
                let flag = Arc::clone(&shutdown);
                if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
                    tracing::warn!(error = %e, "failed to install Ctrl-C handler");
                }
            }
            let opts = RunOptions {
                ticks,
                panel: PanelSnapshot {
                    led_enabled: !off,
                    auto_mode: !manual,
                    pot_raw: pot,
                },
                trace,
                stats,
                rt,
                rt_lock,
            };
            let report = run::run_loop(cfg, &opts, shutdown)?;
            run::print_report(&report, json)?;
        }
        Commands::Replay { trace } => {
            replay::replay_trace(cfg, &trace, json)?;
        }
        Commands::SelfCheck => {
            let report = self_check::self_check(cfg)?;
            self_check::print_report(&report, json);
        }
    }
    Ok(())
}

/// Read, parse and validate the TOML config.
fn load_config(path: &Path) -> eyre::Result<lumen_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = lumen_config::load_toml(&text)
        .map_err(|e| eyre::Report::new(LumenError::Config(e.to_string())))
        .wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()
        .map_err(|e| eyre::Report::new(LumenError::Config(e.to_string())))?;
    Ok(cfg)
}

/// Console logs go to stderr (JSON with `--json`); `[logging].file` adds a
/// JSON-lines file sink. Level precedence: `RUST_LOG`, `--log-level`,
/// `logging.level`, then `info`.
fn init_tracing(
    json: bool,
    cli_level: Option<&str>,
    logging: &lumen_config::Logging,
) -> eyre::Result<Option<WorkerGuard>> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer, fmt};

    let level = cli_level
        .or(logging.level.as_deref())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let mut guard = None;
    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, g) = tracing_appender::non_blocking(appender);
            guard = Some(g);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(guard)
}
