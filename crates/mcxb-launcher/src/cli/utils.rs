use super::commands::Cli;
use mcxb_launcher::LoggingConfig;
use mcxb_types::{LauncherError, LauncherResult};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

fn filter_directive(cli: &Cli, config: &LoggingConfig) -> String {
    if cli.quiet {
        return "warn".to_string();
    }
    match cli.verbose {
        0 => config.level.to_string(),
        1 => "info,mcxb_launcher=debug,mcxb_runtime=debug".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// `RUST_LOG` wins over `-v`/`-q`, which win over `[logging].level`.
pub fn init_logging(cli: &Cli, config: &LoggingConfig) -> LauncherResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(cli, config)));

    let log_file = cli.log_file.as_ref().or(config.file.as_ref());
    let writer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    LauncherError::Config(format!("Failed to open log file {:?}: {}", path, e))
                })?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(cli.verbose >= 2)
                    .with_ansi(log_file.is_none())
                    .with_writer(writer),
            )
            .try_init()
    };

    result.map_err(|e| LauncherError::Internal(format!("Failed to initialise logging: {}", e)))
}

pub fn print_banner() {
    println!();
    println!("  \x1b[38;5;46mMCXboxBroadcast launcher\x1b[0m \x1b[38;5;245mv{}\x1b[0m", BUILD_VERSION);
    println!();
}
