mod api;
mod artifact;
mod child;
mod launcher;
mod logging;
mod runtime;
mod supervisor;
mod types;

pub use api::ApiConfig;
pub use artifact::ArtifactConfig;
pub use child::{ChildConfig, DEFAULT_CHILD_CONFIG};
pub use launcher::{LauncherConfig, DEFAULT_CONFIG_FILE};
pub use logging::LoggingConfig;
pub use runtime::RuntimeConfig;
pub use supervisor::SupervisorConfig;
pub use types::*;
