use crate::config::SupervisorConfig;
use mcxb_runtime::ChildSpec;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestartPolicy {
    pub delay: Duration,
    pub max_restarts: Option<u32>,
    pub restart_on_spawn_failure: bool,
}

impl RestartPolicy {
    pub fn allows_restart(&self, restarts_so_far: u64) -> bool {
        match self.max_restarts {
            Some(max) => restarts_so_far < u64::from(max),
            None => true,
        }
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self::from(&SupervisorConfig::default())
    }
}

impl From<&SupervisorConfig> for RestartPolicy {
    fn from(config: &SupervisorConfig) -> Self {
        Self {
            delay: Duration::from_secs(config.restart_delay_secs),
            max_restarts: config.max_restarts,
            restart_on_spawn_failure: config.restart_on_spawn_failure,
        }
    }
}

/// Why the supervisor loop returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupervisorExit {
    Cancelled,
    SpawnFailed,
    RestartLimitReached,
}

/// Everything needed to (re)launch the child.
#[derive(Clone, Debug)]
pub struct LaunchPlan {
    pub spec: ChildSpec,
    pub config_path: PathBuf,
    pub config_contents: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_by_default() {
        let policy = RestartPolicy::default();
        assert_eq!(policy.delay, Duration::from_secs(10));
        assert!(policy.allows_restart(u64::MAX - 1));
        assert!(!policy.restart_on_spawn_failure);
    }

    #[test]
    fn test_cap() {
        let policy = RestartPolicy {
            max_restarts: Some(2),
            ..RestartPolicy::default()
        };
        assert!(policy.allows_restart(0));
        assert!(policy.allows_restart(1));
        assert!(!policy.allows_restart(2));

        let never = RestartPolicy {
            max_restarts: Some(0),
            ..RestartPolicy::default()
        };
        assert!(!never.allows_restart(0));
    }
}
