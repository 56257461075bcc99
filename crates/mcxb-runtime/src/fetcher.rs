use mcxb_types::{FetchError, LogBuffer, DEFAULT_MAX_REDIRECTS, USER_AGENT};
use reqwest::header::LOCATION;
use reqwest::{Client, Response, StatusCode, Url};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const UNKNOWN_LENGTH_PROGRESS_STEP: u64 = 5 * 1024 * 1024;

/// Downloads a single artifact, following redirects by hand so every hop is
/// visible and the hop count stays bounded.
#[derive(Clone)]
pub struct ArtifactFetcher {
    client: Client,
    max_redirects: usize,
    logs: Option<LogBuffer>,
}

impl ArtifactFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            logs: None,
        })
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_logs(mut self, logs: LogBuffer) -> Self {
        self.logs = Some(logs);
        self
    }

    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        self.log(format!("Downloading {} to {}", url, dest.display()));

        let response = self.resolve(url).await?;
        let bytes = self.stream_to_file(response, dest).await?;

        self.log(format!("Download complete: {} bytes", bytes));
        Ok(bytes)
    }

    async fn resolve(&self, url: &str) -> Result<Response, FetchError> {
        let mut current = Url::parse(url)
            .map_err(|e| FetchError::Transport(format!("Invalid URL {}: {}", url, e)))?;
        let mut hops = 0usize;

        loop {
            debug!("HTTP GET: {}", current);
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = response.status();
            if is_followable_redirect(status) {
                if hops >= self.max_redirects {
                    return Err(FetchError::TooManyRedirects(self.max_redirects));
                }

                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or(FetchError::MissingLocation(status.as_u16()))?;

                let next = current.join(location).map_err(|e| {
                    FetchError::Transport(format!("Invalid redirect target {}: {}", location, e))
                })?;

                hops += 1;
                debug!("Redirect {} ({}): {} -> {}", hops, status.as_u16(), current, next);
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::BadStatus(status.as_u16()));
            }

            if hops > 0 {
                self.log(format!("Resolved download after {} redirect(s)", hops));
            }
            return Ok(response);
        }
    }

    async fn stream_to_file(&self, response: Response, dest: &Path) -> Result<u64, FetchError> {
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| FetchError::Io(format!("Failed to create {:?}: {}", parent, e)))?;
            }
        }

        let part = partial_path(dest);
        let mut file = tokio::fs::File::create(&part)
            .await
            .map_err(|e| FetchError::Io(format!("Failed to create {:?}: {}", part, e)))?;

        let result = self.copy_body(response, &mut file).await;
        drop(file);

        match result {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::rename(&part, dest).await {
                    let _ = tokio::fs::remove_file(&part).await;
                    return Err(FetchError::Io(format!("Failed to move artifact into place: {}", e)));
                }
                Ok(bytes)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }

    async fn copy_body(
        &self,
        mut response: Response,
        file: &mut tokio::fs::File,
    ) -> Result<u64, FetchError> {
        let total = response.content_length().filter(|len| *len > 0);
        let mut received: u64 = 0;
        let mut last_step: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::Io(e.to_string()))?;
            received += chunk.len() as u64;

            match total {
                Some(total) => {
                    let step = (received * 10 / total).min(10);
                    if step > last_step {
                        last_step = step;
                        self.log(format!(
                            "Download progress: {}% ({}/{} bytes)",
                            step * 10,
                            received,
                            total
                        ));
                    }
                }
                None => {
                    let step = received / UNKNOWN_LENGTH_PROGRESS_STEP;
                    if step > last_step {
                        last_step = step;
                        self.log(format!("Download progress: {} bytes", received));
                    }
                }
            }
        }

        file.flush()
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;
        Ok(received)
    }

    fn log(&self, message: String) {
        match self.logs {
            Some(ref logs) => logs.info(message),
            None => info!("{}", message),
        }
    }
}

fn is_followable_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
