use crate::log::LogBuffer;
use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum SupervisorState {
    #[default]
    Starting,
    InstallingRuntime,
    Downloading,
    Running,
    /// Child exited. `None` when it was terminated by a signal.
    Stopped(Option<i32>),
    Error(String),
}

impl SupervisorState {
    pub fn is_error(&self) -> bool {
        matches!(self, SupervisorState::Error(_))
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorState::Starting => write!(f, "starting"),
            SupervisorState::InstallingRuntime => write!(f, "installing-runtime"),
            SupervisorState::Downloading => write!(f, "downloading"),
            SupervisorState::Running => write!(f, "running"),
            SupervisorState::Stopped(Some(code)) => write!(f, "stopped (exit code {})", code),
            SupervisorState::Stopped(None) => write!(f, "stopped (terminated by signal)"),
            SupervisorState::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl Serialize for SupervisorState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Last-write-wins cell holding the externally visible lifecycle state.
#[derive(Clone, Debug, Default)]
pub struct StatusCell {
    inner: Arc<RwLock<SupervisorState>>,
}

impl StatusCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, state: SupervisorState) {
        *self.inner.write() = state;
    }

    pub fn get(&self) -> SupervisorState {
        self.inner.read().clone()
    }
}

const NO_EXIT_CODE: i64 = i64::MIN;

#[derive(Debug)]
pub struct ChildStats {
    launches: AtomicU64,
    restarts: AtomicU64,
    current_pid: AtomicU32,
    last_exit_code: AtomicI64,
}

impl Default for ChildStats {
    fn default() -> Self {
        Self {
            launches: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
            current_pid: AtomicU32::new(0),
            last_exit_code: AtomicI64::new(NO_EXIT_CODE),
        }
    }
}

impl ChildStats {
    pub fn record_launch(&self, pid: Option<u32>) {
        self.launches.fetch_add(1, Ordering::Relaxed);
        self.current_pid.store(pid.unwrap_or(0), Ordering::Relaxed);
    }

    pub fn record_exit(&self, code: Option<i32>) {
        self.current_pid.store(0, Ordering::Relaxed);
        self.last_exit_code.store(
            code.map(i64::from).unwrap_or(NO_EXIT_CODE),
            Ordering::Relaxed,
        );
    }

    pub fn record_restart(&self) {
        self.restarts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn launches(&self) -> u64 {
        self.launches.load(Ordering::Relaxed)
    }

    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::Relaxed)
    }

    pub fn current_pid(&self) -> Option<u32> {
        match self.current_pid.load(Ordering::Relaxed) {
            0 => None,
            pid => Some(pid),
        }
    }

    pub fn last_exit_code(&self) -> Option<i32> {
        match self.last_exit_code.load(Ordering::Relaxed) {
            NO_EXIT_CODE => None,
            code => Some(code as i32),
        }
    }
}

/// Everything the supervisor path and the request-handling path share.
///
/// Owned explicitly and handed out behind an `Arc`; there is no global state.
#[derive(Debug)]
pub struct SharedState {
    pub logs: LogBuffer,
    pub status: StatusCell,
    pub stats: ChildStats,
    runtime: OnceLock<PathBuf>,
    started_at: Instant,
}

impl SharedState {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            logs: LogBuffer::new(log_capacity),
            status: StatusCell::new(),
            stats: ChildStats::default(),
            runtime: OnceLock::new(),
            started_at: Instant::now(),
        }
    }

    pub fn set_state(&self, state: SupervisorState) {
        self.status.set(state);
    }

    pub fn state(&self) -> SupervisorState {
        self.status.get()
    }

    /// Records the resolved runtime. Only the first call has any effect.
    pub fn set_runtime(&self, path: PathBuf) -> bool {
        self.runtime.set(path).is_ok()
    }

    pub fn runtime(&self) -> Option<&Path> {
        self.runtime.get().map(PathBuf::as_path)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(crate::log::DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(SupervisorState::Starting.to_string(), "starting");
        assert_eq!(SupervisorState::InstallingRuntime.to_string(), "installing-runtime");
        assert_eq!(SupervisorState::Stopped(Some(1)).to_string(), "stopped (exit code 1)");
        assert_eq!(
            SupervisorState::Error("no java".into()).to_string(),
            "error: no java"
        );
    }

    #[test]
    fn test_state_serializes_as_string() {
        let json = serde_json::to_string(&SupervisorState::Running).unwrap();
        assert_eq!(json, "\"running\"");
    }

    #[test]
    fn test_status_cell_last_write_wins() {
        let cell = StatusCell::new();
        assert_eq!(cell.get(), SupervisorState::Starting);
        cell.set(SupervisorState::Downloading);
        cell.set(SupervisorState::Running);
        assert_eq!(cell.get(), SupervisorState::Running);
    }

    #[test]
    fn test_runtime_resolved_once() {
        let state = SharedState::new(10);
        assert!(state.runtime().is_none());
        assert!(state.set_runtime(PathBuf::from("java")));
        assert!(!state.set_runtime(PathBuf::from("/opt/jre/bin/java")));
        assert_eq!(state.runtime(), Some(Path::new("java")));
    }

    #[test]
    fn test_child_stats() {
        let stats = ChildStats::default();
        assert_eq!(stats.last_exit_code(), None);
        assert_eq!(stats.current_pid(), None);

        stats.record_launch(Some(4242));
        assert_eq!(stats.current_pid(), Some(4242));
        assert_eq!(stats.launches(), 1);

        stats.record_exit(Some(-1));
        assert_eq!(stats.current_pid(), None);
        assert_eq!(stats.last_exit_code(), Some(-1));

        stats.record_restart();
        assert_eq!(stats.restarts(), 1);
    }
}
