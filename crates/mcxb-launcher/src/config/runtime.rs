use mcxb_runtime::{default_package_commands, DEFAULT_JAVA_VERSION};
use mcxb_types::{DEFAULT_INSTALL_TIMEOUT_SECS, DEFAULT_RUNTIME_COMMAND};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub command: String,
    pub install_timeout_secs: u64,
    /// Commands run in order by the package-manager strategy.
    pub package_install: Vec<Vec<String>>,
    /// Overrides the vendor bundle URL derived from the host platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_url: Option<String>,
    pub java_version: u32,
    /// Extraction directory for the bundle, relative to the work dir.
    pub bundle_dir: PathBuf,
    pub enable_package_manager: bool,
    pub enable_bundle: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_RUNTIME_COMMAND.to_string(),
            install_timeout_secs: DEFAULT_INSTALL_TIMEOUT_SECS,
            package_install: default_package_commands(),
            bundle_url: None,
            java_version: DEFAULT_JAVA_VERSION,
            bundle_dir: PathBuf::from("jre"),
            enable_package_manager: true,
            enable_bundle: true,
        }
    }
}
