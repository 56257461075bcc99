use mcxb_types::DEFAULT_CONFIG_NAME;
use serde::{Deserialize, Serialize};

/// Written to the child's config file before every launch.
pub const DEFAULT_CHILD_CONFIG: &str = r#"# MCXboxBroadcast standalone configuration
# Rewritten by mcxb-launcher before every launch; edit the launcher config instead.

session:
  # Seconds between session info updates
  update-interval: 30
  # Query the Bedrock server below to fill in the session info
  query-server: true
  # Fall back to the web query API when the direct query fails
  web-query-fallback: false
  # Shown to friends when the server is not queried
  session-info:
    host-name: "Geyser Test Server"
    world-name: "GeyserMC Demo & Test Server"
    version: "1.21.0"
    protocol: 685
    players: 0
    max-players: 20
    ip: "test.geysermc.org"
    port: 19132

friend-sync:
  # Seconds between friend list checks
  update-interval: 60
  auto-follow: true
  auto-unfollow: true
  initial-invite: true
  should-expire: true
  expire-days: 15
  expire-check: 1800

slack-webhook:
  enabled: false
  webhook-url: ""

# Extra output for troubleshooting authentication and session sync
debug-log: false
"#;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChildConfig {
    pub config_file_name: String,
    pub config_contents: String,
    /// Appended after `--config <path>`.
    pub extra_args: Vec<String>,
    pub capture_output: bool,
}

impl Default for ChildConfig {
    fn default() -> Self {
        Self {
            config_file_name: DEFAULT_CONFIG_NAME.to_string(),
            config_contents: DEFAULT_CHILD_CONFIG.to_string(),
            extra_args: Vec::new(),
            capture_output: true,
        }
    }
}
