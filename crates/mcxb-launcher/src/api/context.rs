use crate::config::LauncherConfig;
use crate::metrics::ProcessSampler;
use mcxb_types::SharedState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Read-only view of the launcher handed to every request.
pub struct ApiContext {
    pub state: Arc<SharedState>,
    pub work_dir: PathBuf,
    pub config_path: PathBuf,
    pub artifact_name: String,
    pub request_timeout: Duration,
    pub refresh_secs: u64,
    pub log_lines: usize,
    pub sampler: ProcessSampler,
}

impl ApiContext {
    pub fn new(state: Arc<SharedState>, config: &LauncherConfig) -> Self {
        Self {
            state,
            work_dir: config.work_dir.clone(),
            config_path: config.child_config_path(),
            artifact_name: config.artifact.file_name.clone(),
            request_timeout: Duration::from_secs(config.api.request_timeout_secs.max(1)),
            refresh_secs: config.api.dashboard_refresh_secs,
            log_lines: config.api.dashboard_log_lines,
            sampler: ProcessSampler::current(),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
