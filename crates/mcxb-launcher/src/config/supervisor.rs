use mcxb_types::DEFAULT_RESTART_DELAY_SECS;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub restart_delay_secs: u64,
    /// Unbounded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_restarts: Option<u32>,
    pub restart_on_spawn_failure: bool,
    pub shutdown_grace_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_delay_secs: DEFAULT_RESTART_DELAY_SECS,
            max_restarts: None,
            restart_on_spawn_failure: false,
            shutdown_grace_secs: 10,
        }
    }
}
