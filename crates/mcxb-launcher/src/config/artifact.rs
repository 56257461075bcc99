use mcxb_types::{DEFAULT_ARTIFACT_NAME, DEFAULT_ARTIFACT_URL, DEFAULT_MAX_REDIRECTS};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub url: String,
    pub file_name: String,
    pub max_redirects: usize,
    pub timeout_secs: u64,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ARTIFACT_URL.to_string(),
            file_name: DEFAULT_ARTIFACT_NAME.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            timeout_secs: 300,
        }
    }
}
