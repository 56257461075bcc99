use mcxb_types::{LauncherError, LauncherResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::api::ApiConfig;
use super::artifact::ArtifactConfig;
use super::child::ChildConfig;
use super::logging::LoggingConfig;
use super::runtime::RuntimeConfig;
use super::supervisor::SupervisorConfig;

pub const DEFAULT_CONFIG_FILE: &str = "mcxb-launcher.toml";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub work_dir: PathBuf,
    pub artifact: ArtifactConfig,
    pub runtime: RuntimeConfig,
    pub child: ChildConfig,
    pub supervisor: SupervisorConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            artifact: ArtifactConfig::default(),
            runtime: RuntimeConfig::default(),
            child: ChildConfig::default(),
            supervisor: SupervisorConfig::default(),
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl LauncherConfig {
    pub fn load(path: impl AsRef<Path>) -> LauncherResult<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            Self::from_toml(&std::fs::read_to_string(path).map_err(|e| {
                LauncherError::Config(format!("Failed to read config {:?}: {}", path, e))
            })?)?
        } else {
            info!("Config file {:?} not found, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> LauncherResult<Self> {
        toml::from_str(contents)
            .map_err(|e| LauncherError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn to_toml(&self) -> LauncherResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| LauncherError::Config(format!("Failed to serialize config: {}", e)))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> LauncherResult<()> {
        let contents = self.to_toml()?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LauncherError::Config(format!("Failed to create config dir: {}", e))
                })?;
            }
        }

        std::fs::write(path.as_ref(), contents)
            .map_err(|e| LauncherError::Config(format!("Failed to write config: {}", e)))?;

        info!("Configuration saved to {:?}", path.as_ref());
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in ["PORT", "MCXB_API_PORT"] {
            if let Some(port) = lookup(key) {
                match port.trim().parse() {
                    Ok(p) => self.api.port = p,
                    Err(_) => warn!("Ignoring invalid {}={:?}", key, port),
                }
            }
        }

        if let Some(dir) = lookup("MCXB_WORK_DIR") {
            self.work_dir = PathBuf::from(dir);
        }

        if let Some(url) = lookup("MCXB_ARTIFACT_URL") {
            self.artifact.url = url;
        }

        if let Some(java) = lookup("MCXB_JAVA") {
            self.runtime.command = java;
        }

        if let Some(delay) = lookup("MCXB_RESTART_DELAY_SECS") {
            match delay.trim().parse() {
                Ok(d) => self.supervisor.restart_delay_secs = d,
                Err(_) => warn!("Ignoring invalid MCXB_RESTART_DELAY_SECS={:?}", delay),
            }
        }

        if let Some(max) = lookup("MCXB_MAX_RESTARTS") {
            let max = max.trim();
            if max.is_empty() || max.eq_ignore_ascii_case("unlimited") {
                self.supervisor.max_restarts = None;
            } else {
                match max.parse() {
                    Ok(m) => self.supervisor.max_restarts = Some(m),
                    Err(_) => warn!("Ignoring invalid MCXB_MAX_RESTARTS={:?}", max),
                }
            }
        }
    }

    pub fn validate(&self) -> LauncherResult<()> {
        if self.api.port == 0 {
            return Err(LauncherError::Config("API port cannot be 0".into()));
        }

        if self.logging.buffer_capacity == 0 {
            return Err(LauncherError::Config(
                "logging.buffer_capacity must be at least 1".into(),
            ));
        }

        if self.artifact.max_redirects == 0 {
            return Err(LauncherError::Config(
                "artifact.max_redirects must be at least 1".into(),
            ));
        }

        if self.artifact.file_name.trim().is_empty() {
            return Err(LauncherError::Config("artifact.file_name is empty".into()));
        }

        let url = self.artifact.url.trim();
        if url.is_empty() {
            return Err(LauncherError::Config("artifact.url is empty".into()));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(LauncherError::Config(format!(
                "artifact.url must be http or https: {}",
                url
            )));
        }

        if self.runtime.command.trim().is_empty() {
            return Err(LauncherError::Config("runtime.command is empty".into()));
        }

        if !self.runtime.enable_package_manager && !self.runtime.enable_bundle {
            return Err(LauncherError::Config(
                "At least one of runtime.enable_package_manager and runtime.enable_bundle must be set"
                    .into(),
            ));
        }

        if self.child.config_file_name.trim().is_empty() {
            return Err(LauncherError::Config("child.config_file_name is empty".into()));
        }

        Ok(())
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.work_dir.join(&self.artifact.file_name)
    }

    pub fn child_config_path(&self) -> PathBuf {
        self.work_dir.join(&self.child.config_file_name)
    }

    pub fn bundle_root(&self) -> PathBuf {
        self.work_dir.join(&self.runtime.bundle_dir)
    }
}
