mod checks;
mod commands;
mod config_cmd;
mod once;
mod run;
mod utils;

pub use checks::run_checks;
pub use commands::{Cli, Commands};
pub use config_cmd::handle_config;
pub use once::run_once;
pub use run::run_launcher;
pub use utils::init_logging;
