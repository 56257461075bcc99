#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod launcher;
pub mod metrics;
pub mod supervisor;

pub use api::{ApiContext, ApiServer, HealthResponse};
pub use config::{
    ApiConfig, ArtifactConfig, ChildConfig, LauncherConfig, LogLevel, LoggingConfig,
    RuntimeConfig, SupervisorConfig, DEFAULT_CHILD_CONFIG, DEFAULT_CONFIG_FILE,
};
pub use launcher::Launcher;
pub use metrics::{format_bytes, format_uptime, ProcessSampler};
pub use supervisor::{
    write_child_config, CancellationToken, ChildSupervisor, LaunchPlan, RestartPolicy,
    SupervisorExit,
};
