use async_trait::async_trait;
use mcxb_types::{LogBuffer, ProvisionError, StrategyError};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// One way of getting a Java runtime onto the host.
#[async_trait]
pub trait ProvisionStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn provision(&self) -> Result<PathBuf, StrategyError>;
}

/// Checks whether the runtime command is already invocable.
#[derive(Clone, Debug)]
pub struct RuntimeProbe {
    command: String,
    args: Vec<String>,
}

impl RuntimeProbe {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: vec!["-version".to_string()],
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub async fn locate(&self) -> Option<PathBuf> {
        let child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                debug!("Runtime probe for '{}' failed to spawn: {}", self.command, e);
                return None;
            }
        };

        match tokio::time::timeout(PROBE_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) if status.success() => Some(PathBuf::from(&self.command)),
            Ok(Ok(status)) => {
                debug!("Runtime probe for '{}' exited with {}", self.command, status);
                None
            }
            Ok(Err(e)) => {
                debug!("Runtime probe for '{}' failed: {}", self.command, e);
                None
            }
            Err(_) => {
                debug!("Runtime probe for '{}' timed out", self.command);
                None
            }
        }
    }
}

/// Tries the probe, then each strategy in order, stopping at the first success.
pub struct RuntimeProvisioner {
    probe: RuntimeProbe,
    strategies: Vec<Box<dyn ProvisionStrategy>>,
    logs: LogBuffer,
}

impl RuntimeProvisioner {
    pub fn new(probe: RuntimeProbe, logs: LogBuffer) -> Self {
        Self {
            probe,
            strategies: Vec::new(),
            logs,
        }
    }

    pub fn with_strategy(mut self, strategy: impl ProvisionStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn push_strategy(&mut self, strategy: Box<dyn ProvisionStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn ensure_runtime(&self) -> Result<PathBuf, ProvisionError> {
        if let Some(path) = self.probe.locate().await {
            self.logs
                .info(format!("Java runtime found: {}", path.display()));
            return Ok(path);
        }

        self.logs.warn(format!(
            "'{}' not found, attempting runtime installation",
            self.probe.command()
        ));

        for strategy in &self.strategies {
            self.logs
                .info(format!("Installing runtime via {}", strategy.name()));

            match strategy.provision().await {
                Ok(path) => {
                    self.logs.info(format!(
                        "Runtime provisioned via {}: {}",
                        strategy.name(),
                        path.display()
                    ));
                    return Ok(path);
                }
                Err(e) => {
                    self.logs
                        .warn(format!("Runtime install via {} failed: {}", strategy.name(), e));
                }
            }
        }

        self.logs
            .error("No Java runtime available after trying every install strategy");
        Err(ProvisionError::Unavailable)
    }
}
