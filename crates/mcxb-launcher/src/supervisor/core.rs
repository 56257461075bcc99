use mcxb_runtime::{spawn_child, ForwardSignal, RunningChild};
use mcxb_types::{SharedState, SupervisorState};
use std::path::Path;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::cancellation::CancellationToken;
use super::types::{LaunchPlan, RestartPolicy, SupervisorExit};

const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

enum RunOutcome {
    Exited,
    Cancelled,
}

pub async fn write_child_config(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, contents).await
}

/// Owns the child's lifecycle: rewrite config, spawn, watch, restart.
pub struct ChildSupervisor {
    plan: LaunchPlan,
    policy: RestartPolicy,
    shutdown_grace: Duration,
    state: Arc<SharedState>,
}

impl ChildSupervisor {
    pub fn new(plan: LaunchPlan, policy: RestartPolicy, state: Arc<SharedState>) -> Self {
        Self {
            plan,
            policy,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            state,
        }
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn plan(&self) -> &LaunchPlan {
        &self.plan
    }

    pub fn policy(&self) -> &RestartPolicy {
        &self.policy
    }

    pub async fn run(&self, mut cancel: CancellationToken) -> SupervisorExit {
        let logs = &self.state.logs;

        loop {
            if cancel.is_cancelled() {
                return SupervisorExit::Cancelled;
            }

            self.write_config().await;

            match spawn_child(&self.plan.spec, logs) {
                Ok(child) => {
                    if let RunOutcome::Cancelled = self.supervise(child, &mut cancel).await {
                        return SupervisorExit::Cancelled;
                    }
                }
                Err(e) => {
                    logs.error(format!("Failed to launch child: {}", e));
                    self.state.set_state(SupervisorState::Error(e.to_string()));
                    if !self.policy.restart_on_spawn_failure {
                        return SupervisorExit::SpawnFailed;
                    }
                }
            }

            let restarts = self.state.stats.restarts();
            if !self.policy.allows_restart(restarts) {
                logs.warn(format!(
                    "Restart limit reached after {} restart(s), not restarting",
                    restarts
                ));
                return SupervisorExit::RestartLimitReached;
            }

            logs.info(format!(
                "Restarting in {}",
                format_delay(self.policy.delay)
            ));
            self.state.stats.record_restart();

            tokio::select! {
                _ = tokio::time::sleep(self.policy.delay) => {}
                _ = cancel.cancelled() => {
                    logs.info("Shutdown requested during restart delay");
                    return SupervisorExit::Cancelled;
                }
            }
        }
    }

    /// The supervisor is authoritative over the child's config: whatever the
    /// previous run left behind is overwritten.
    async fn write_config(&self) {
        let path = &self.plan.config_path;
        match write_child_config(path, &self.plan.config_contents).await {
            Ok(()) => debug!("Wrote child config to {:?}", path),
            Err(e) => self
                .state
                .logs
                .warn(format!("Failed to write {}: {}", path.display(), e)),
        }
    }

    async fn supervise(&self, mut child: RunningChild, cancel: &mut CancellationToken) -> RunOutcome {
        let logs = &self.state.logs;
        let pid = child.pid();

        self.state.stats.record_launch(pid);
        logs.info(format!(
            "starting: {} (pid {})",
            self.plan.spec.command_line(),
            pid.map(|p| p.to_string()).unwrap_or_else(|| "unknown".into())
        ));
        self.state.set_state(SupervisorState::Running);

        let exited = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        match exited {
            Some(status) => {
                child.drain_output(OUTPUT_DRAIN_TIMEOUT).await;
                self.record_exit(status);
                RunOutcome::Exited
            }
            None => {
                logs.info("Shutdown requested, forwarding SIGTERM to child");
                let status = child
                    .shutdown(ForwardSignal::Terminate, self.shutdown_grace)
                    .await;
                child.drain_output(OUTPUT_DRAIN_TIMEOUT).await;
                self.record_exit(status);
                RunOutcome::Cancelled
            }
        }
    }

    fn record_exit(&self, status: std::io::Result<ExitStatus>) {
        let logs = &self.state.logs;
        let code = match status {
            Ok(status) => {
                let message = format!("Child exited ({})", describe_exit(&status));
                if status.success() {
                    logs.info(message);
                } else {
                    logs.warn(message);
                }
                status.code()
            }
            Err(e) => {
                logs.error(format!("Failed to wait for child: {}", e));
                None
            }
        };

        self.state.stats.record_exit(code);
        self.state.set_state(SupervisorState::Stopped(code));
    }
}

fn describe_exit(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit code {}", code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("terminated by signal {}", signal);
        }
    }

    "unknown status".to_string()
}

fn format_delay(delay: Duration) -> String {
    if delay.subsec_millis() == 0 {
        format!("{}s", delay.as_secs())
    } else {
        format!("{}ms", delay.as_millis())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use mcxb_runtime::ChildSpec;
    use std::path::PathBuf;

    fn fast_policy(max_restarts: Option<u32>) -> RestartPolicy {
        RestartPolicy {
            delay: Duration::from_millis(50),
            max_restarts,
            restart_on_spawn_failure: false,
        }
    }

    fn plan(dir: &Path, spec: ChildSpec, contents: &str) -> LaunchPlan {
        LaunchPlan {
            spec: spec.current_dir(dir),
            config_path: dir.join("config.yml"),
            config_contents: contents.to_string(),
        }
    }

    fn sh(script: &str) -> ChildSpec {
        ChildSpec::new("sh").arg("-c").arg(script)
    }

    async fn wait_for(state: &SharedState, predicate: impl Fn(&SharedState) -> bool) {
        for _ in 0..200 {
            if predicate(state) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached; logs:\n{}", state.logs.render());
    }

    #[tokio::test]
    async fn test_immediate_exits_are_restarted_up_to_cap() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(SharedState::new(100));
        let supervisor = ChildSupervisor::new(
            plan(dir.path(), sh("echo boom; exit 1"), "debug-log: false\n"),
            fast_policy(Some(3)),
            state.clone(),
        );

        let (_tx, token) = CancellationToken::new();
        let exit = supervisor.run(token).await;

        assert_eq!(exit, SupervisorExit::RestartLimitReached);
        assert_eq!(state.logs.count_matching("Restarting in"), 3);
        assert_eq!(state.logs.count_matching("[CHILD] boom"), 4);
        assert_eq!(state.logs.count_matching("Child exited (exit code 1)"), 4);
        assert_eq!(state.stats.launches(), 4);
        assert_eq!(state.stats.restarts(), 3);
        assert_eq!(state.stats.last_exit_code(), Some(1));
        assert_eq!(state.state(), SupervisorState::Stopped(Some(1)));
    }

    #[tokio::test]
    async fn test_child_output_precedes_exit_entry() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(SharedState::new(100));
        let supervisor = ChildSupervisor::new(
            plan(dir.path(), sh("echo last words; exit 0"), ""),
            fast_policy(Some(0)),
            state.clone(),
        );

        let (_tx, token) = CancellationToken::new();
        supervisor.run(token).await;

        let messages: Vec<String> = state.logs.snapshot().into_iter().map(|e| e.message).collect();
        let output = messages.iter().position(|m| m == "[CHILD] last words").unwrap();
        let exit = messages.iter().position(|m| m.starts_with("Child exited")).unwrap();
        assert!(output < exit);
    }

    #[tokio::test]
    async fn test_config_rewritten_before_every_launch() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(SharedState::new(100));
        let blob = "session:\n  host-name: launcher\n";
        let supervisor = ChildSupervisor::new(
            plan(
                dir.path(),
                sh("cat config.yml; echo mutated > config.yml; exit 1"),
                blob,
            ),
            fast_policy(Some(1)),
            state.clone(),
        );

        let (_tx, token) = CancellationToken::new();
        supervisor.run(token).await;

        assert_eq!(state.logs.count_matching("[CHILD] session:"), 2);
        assert_eq!(state.logs.count_matching("[CHILD]   host-name: launcher"), 2);
        assert_eq!(state.logs.count_matching("[CHILD] mutated"), 0);
        // The last child's mutation survives until the next launch.
        assert_eq!(
            std::fs::read_to_string(dir.path().join("config.yml")).unwrap(),
            "mutated\n"
        );
    }

    #[tokio::test]
    async fn test_write_child_config_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        let blob = "friend-sync:\n  auto-follow: true\n";

        write_child_config(&path, blob).await.unwrap();
        std::fs::write(&path, "tampered").unwrap();
        write_child_config(&path, blob).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), blob.as_bytes());
    }

    #[tokio::test]
    async fn test_spawn_failure_does_not_restart() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(SharedState::new(100));
        let supervisor = ChildSupervisor::new(
            plan(dir.path(), ChildSpec::new("/nonexistent/mcxb/java"), "x: 1\n"),
            fast_policy(None),
            state.clone(),
        );

        let (_tx, token) = CancellationToken::new();
        assert_eq!(supervisor.run(token).await, SupervisorExit::SpawnFailed);
        assert!(state.state().is_error());
        assert_eq!(state.logs.count_matching("Failed to launch child"), 1);
        assert_eq!(state.logs.count_matching("Restarting in"), 0);
        assert!(dir.path().join("config.yml").exists());
    }

    #[tokio::test]
    async fn test_spawn_failure_restarts_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(SharedState::new(100));
        let policy = RestartPolicy {
            restart_on_spawn_failure: true,
            ..fast_policy(Some(2))
        };
        let supervisor = ChildSupervisor::new(
            plan(dir.path(), ChildSpec::new(PathBuf::from("/nonexistent/mcxb/java")), ""),
            policy,
            state.clone(),
        );

        let (_tx, token) = CancellationToken::new();
        assert_eq!(supervisor.run(token).await, SupervisorExit::RestartLimitReached);
        assert_eq!(state.logs.count_matching("Failed to launch child"), 3);
    }

    #[tokio::test]
    async fn test_cancel_forwards_sigterm_to_child() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(SharedState::new(100));
        let supervisor = ChildSupervisor::new(
            plan(dir.path(), ChildSpec::new("sleep").arg("30"), ""),
            fast_policy(None),
            state.clone(),
        )
        .with_shutdown_grace(Duration::from_secs(5));

        let (tx, token) = CancellationToken::new();
        let handle = tokio::spawn(async move { supervisor.run(token).await });

        wait_for(&state, |s| s.stats.current_pid().is_some()).await;
        tx.send(true).unwrap();

        let exit = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, SupervisorExit::Cancelled);
        assert_eq!(state.state(), SupervisorState::Stopped(None));
        assert_eq!(state.stats.current_pid(), None);
        assert_eq!(state.logs.count_matching("terminated by signal 15"), 1);
    }

    #[tokio::test]
    async fn test_cancel_during_restart_delay() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(SharedState::new(100));
        let policy = RestartPolicy {
            delay: Duration::from_secs(30),
            max_restarts: None,
            restart_on_spawn_failure: false,
        };
        let supervisor = ChildSupervisor::new(plan(dir.path(), sh("exit 0"), ""), policy, state.clone());

        let (tx, token) = CancellationToken::new();
        let handle = tokio::spawn(async move { supervisor.run(token).await });

        wait_for(&state, |s| s.logs.count_matching("Restarting in 30s") == 1).await;
        tx.send(true).unwrap();

        let exit = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, SupervisorExit::Cancelled);
        assert_eq!(state.stats.launches(), 1);
    }

    #[test]
    fn test_format_delay() {
        assert_eq!(format_delay(Duration::from_secs(10)), "10s");
        assert_eq!(format_delay(Duration::from_millis(250)), "250ms");
    }
}
