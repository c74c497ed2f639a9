mod cli;
mod commands;
mod error_fmt;

use std::io;
use std::path::Path;

use clap::Parser;
use station_core::CleanError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if !cli.json {
        let _ = color_eyre::install();
    }

    if let Err(err) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

/// Load and validate the config; a missing `--config` means built-in defaults.
fn load_config(path: Option<&Path>) -> eyre::Result<station_config::Config> {
    let cfg = match path {
        Some(p) => station_config::load_config_file(p)
            .map_err(|e| eyre::Report::new(CleanError::Config(format!("{e:#}"))))?,
        None => station_config::Config::default(),
    };
    cfg.validate()
        .map_err(|e| eyre::Report::new(CleanError::Config(format!("{e:#}"))))?;
    Ok(cfg)
}

fn init_tracing(
    json: bool,
    level: Option<&str>,
    logging: &station_config::Logging,
) -> eyre::Result<()> {
    let level = level.or(logging.level.as_deref()).unwrap_or("warn");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_writer(writer).with_ansi(false))
        }
        None => None,
    };

    let json_console = json.then(|| fmt::layer().json().with_writer(io::stderr));
    let pretty_console = (!json).then(|| fmt::layer().with_writer(io::stderr));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_console)
        .with(pretty_console)
        .with(file_layer)
        .try_init();
    Ok(())
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "config loaded");

    match cli.cmd {
        Commands::Clean {
            input,
            window,
            output,
            parallel,
            diagnostics,
        } => commands::clean(
            &cfg,
            &input,
            &window,
            parallel,
            diagnostics.as_deref(),
            output.as_deref(),
        ),
        Commands::Series {
            csv,
            category,
            sensor,
            window,
            output,
        } => commands::series(&cfg, &csv, &category, &sensor, &window, output.as_deref()),
        Commands::Sensors => commands::sensors(cli.json),
        Commands::CheckConfig => commands::check_config(&cfg, cli.json),
        Commands::Simulate {
            hours,
            seed,
            end,
            no_faults,
            output,
        } => commands::simulate(hours, seed, end.as_deref(), no_faults, output.as_deref()),
    }
}
