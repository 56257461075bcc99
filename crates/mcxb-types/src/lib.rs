#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod error;
pub mod log;
pub mod state;

pub use error::*;
pub use log::*;
pub use state::*;

pub const DEFAULT_ARTIFACT_URL: &str =
    "https://github.com/MCXboxBroadcast/Broadcaster/releases/download/129/MCXboxBroadcastStandalone.jar";

pub const DEFAULT_ARTIFACT_NAME: &str = "MCXboxBroadcastStandalone.jar";

pub const DEFAULT_CONFIG_NAME: &str = "config.yml";

pub const DEFAULT_RUNTIME_COMMAND: &str = "java";

pub const DEFAULT_MAX_REDIRECTS: usize = 10;

pub const DEFAULT_RESTART_DELAY_SECS: u64 = 10;

pub const DEFAULT_INSTALL_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_API_PORT: u16 = 8080;

pub const USER_AGENT: &str = concat!("mcxb-launcher/", env!("CARGO_PKG_VERSION"));
