mod cli;

use clap::Parser;
use cli::{handle_config, init_logging, run_checks, run_launcher, run_once, Cli, Commands};
use mcxb_launcher::{LauncherConfig, DEFAULT_CONFIG_FILE};
use mcxb_types::LauncherResult;
use std::path::{Path, PathBuf};

fn load_config(cli: &Cli, config_path: &Path, port: Option<u16>) -> LauncherResult<LauncherConfig> {
    let mut config = LauncherConfig::load(config_path)?;
    if let Some(ref dir) = cli.work_dir {
        config.work_dir = dir.clone();
    }
    if let Some(port) = port {
        config.api.port = port;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> LauncherResult<()> {
    let mut cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(|| {
        cli.work_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_CONFIG_FILE)
    });

    let (pid_file, port) = match cli.command.take() {
        Some(Commands::Config { action }) => {
            return handle_config(&config_path, cli.work_dir.clone(), action);
        }
        Some(Commands::Check) => {
            return run_checks(&config_path, cli.work_dir.clone()).await;
        }
        Some(Commands::Once) => {
            let config = load_config(&cli, &config_path, None)?;
            init_logging(&cli, &config.logging)?;
            let code = run_once(config).await?;
            std::process::exit(code);
        }
        Some(Commands::Run { pid_file, port }) => (pid_file, port),
        None => (None, None),
    };

    let config = load_config(&cli, &config_path, port)?;
    init_logging(&cli, &config.logging)?;
    run_launcher(config, pid_file).await
}
