use clap::{Parser, Subcommand};
use std::path::PathBuf;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "mcxb-launcher")]
#[command(version = BUILD_VERSION)]
#[command(about = "MCXboxBroadcast launcher - fetches, runs and supervises the standalone broadcaster")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(short, long, global = true, value_name = "FILE", help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(short = 'd', long, global = true, value_name = "DIR", env = "MCXB_WORK_DIR", help = "Working directory for the jar, config and runtime")]
    pub work_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase verbosity (-v, -vv, -vvv)")]
    pub verbose: u8,

    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[arg(long, global = true, value_name = "FILE", help = "Write logs to file")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the launcher (default)")]
    #[command(long_about = "Start the status server, provision Java, download the jar if missing, then run and restart it.\n\nThe status server keeps answering even when startup fails.")]
    Run {
        #[arg(long, value_name = "FILE", help = "Write PID to file")]
        pid_file: Option<PathBuf>,
        #[arg(short, long, value_name = "PORT", help = "Status server port (overrides config and PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Launch the jar once with inherited output")]
    #[command(long_about = "Provision Java and the jar, write the config, run the child once and exit with its code.\n\nNo status server, no restarts.")]
    Once,

    #[command(about = "Run diagnostic checks")]
    Check,

    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    #[command(about = "Show effective configuration")]
    Show,
    #[command(about = "Print the default configuration")]
    Default,
    #[command(about = "Validate configuration")]
    Validate,
}
