use super::commands::ConfigAction;
use mcxb_launcher::LauncherConfig;
use mcxb_types::LauncherResult;
use std::path::{Path, PathBuf};

pub fn handle_config(
    config_path: &Path,
    work_dir: Option<PathBuf>,
    action: Option<ConfigAction>,
) -> LauncherResult<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let mut config = LauncherConfig::load(config_path)?;
            if let Some(dir) = work_dir {
                config.work_dir = dir;
            }
            if !config_path.exists() {
                println!("\x1b[38;5;245m# No configuration file at {:?}, showing defaults\x1b[0m", config_path);
            }
            println!("{}", config.to_toml()?);
        }
        Some(ConfigAction::Default) => {
            println!("{}", LauncherConfig::default().to_toml()?);
        }
        Some(ConfigAction::Validate) => {
            if config_path.exists() {
                match LauncherConfig::load(config_path) {
                    Ok(_) => println!("\x1b[38;5;46m[+]\x1b[0m Configuration is valid"),
                    Err(e) => println!("\x1b[38;5;196m[-]\x1b[0m Configuration error: {}", e),
                }
            } else {
                println!("\x1b[38;5;245mNo configuration file found at {:?}, defaults apply\x1b[0m", config_path);
            }
        }
    }
    Ok(())
}
