use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Download failed with status: {0}")]
    BadStatus(u16),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(usize),

    #[error("Redirect status {0} without Location header")]
    MissingLocation(u16),

    #[error("Failed to write artifact: {0}")]
    Io(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("No Java runtime available: every provisioning strategy failed")]
    Unavailable,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    #[error("{0}")]
    Failed(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

impl From<FetchError> for StrategyError {
    fn from(e: FetchError) -> Self {
        StrategyError::Failed(e.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    #[error("Executable not found: {0:?}")]
    ExecNotFound(PathBuf),

    #[error("Permission denied launching {0:?}")]
    PermissionDenied(PathBuf),

    #[error("Failed to launch child: {0}")]
    Other(String),
}

impl SpawnError {
    pub fn from_io(program: &std::path::Path, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => SpawnError::ExecNotFound(program.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => {
                SpawnError::PermissionDenied(program.to_path_buf())
            }
            _ => SpawnError::Other(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Provision error: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Spawn error: {0}")]
    Spawn(#[from] SpawnError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type LauncherResult<T> = Result<T, LauncherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_error_classification() {
        let path = std::path::Path::new("/nope/java");

        let not_found = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(
            SpawnError::from_io(path, &not_found),
            SpawnError::ExecNotFound(path.to_path_buf())
        );

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            SpawnError::from_io(path, &denied),
            SpawnError::PermissionDenied(path.to_path_buf())
        );

        let other = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(matches!(SpawnError::from_io(path, &other), SpawnError::Other(_)));
    }

    #[test]
    fn test_launcher_error_from_components() {
        let err: LauncherError = FetchError::BadStatus(404).into();
        assert_eq!(err.to_string(), "Fetch error: Download failed with status: 404");

        let err: LauncherError = ProvisionError::Unavailable.into();
        assert!(err.to_string().contains("every provisioning strategy failed"));
    }
}
