use serde::Serialize;

/// Body of `GET /health`. `status` reports the launcher itself, `jar` the
/// supervised child's lifecycle state.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub jar: String,
}

impl HealthResponse {
    pub fn ok(jar: impl Into<String>) -> Self {
        Self {
            status: "ok",
            jar: jar.into(),
        }
    }
}

pub const CONFIG_PLACEHOLDER: &str = "No config file has been written yet.";
