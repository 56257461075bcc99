use mcxb_launcher::{write_child_config, Launcher, LauncherConfig};
use mcxb_runtime::{spawn_child, ForwardSignal};
use mcxb_types::{LauncherError, LauncherResult, SharedState};
use std::process::ExitStatus;
use std::sync::Arc;
use tracing::{info, warn};

enum Event {
    Exited(std::io::Result<ExitStatus>),
    Signal(ForwardSignal),
}

/// Relays SIGINT/SIGTERM (Ctrl+C elsewhere) to the child.
struct SignalRelay {
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
    #[cfg(unix)]
    sigint: tokio::signal::unix::Signal,
}

impl SignalRelay {
    fn install() -> Self {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Self {
                sigterm: signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler"),
                sigint: signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler"),
            }
        }

        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    async fn recv(&mut self) -> ForwardSignal {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.sigterm.recv() => ForwardSignal::Terminate,
                _ = self.sigint.recv() => ForwardSignal::Interrupt,
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            ForwardSignal::Interrupt
        }
    }
}

/// Single launch with inherited stdio. Returns the code to exit with.
pub async fn run_once(config: LauncherConfig) -> LauncherResult<i32> {
    let state = Arc::new(SharedState::new(config.logging.buffer_capacity));
    let launcher = Launcher::new(config, state.clone());

    let runtime = launcher.prepare().await?;
    let plan = launcher.launch_plan(&runtime);
    write_child_config(&plan.config_path, &plan.config_contents)
        .await
        .map_err(|e| {
            LauncherError::Io(format!("Failed to write {}: {}", plan.config_path.display(), e))
        })?;

    let mut signals = SignalRelay::install();
    let spec = plan.spec.inherit_output();
    let mut child = spawn_child(&spec, &state.logs)?;
    info!("Launched: {} (pid {:?})", spec.command_line(), child.pid());

    let status = loop {
        let event = tokio::select! {
            status = child.wait() => Event::Exited(status),
            signal = signals.recv() => Event::Signal(signal),
        };

        match event {
            Event::Exited(status) => break status,
            Event::Signal(signal) => {
                info!("Forwarding {:?} to child", signal);
                if let Err(e) = child.signal(signal) {
                    warn!("Failed to signal child: {}", e);
                }
            }
        }
    };
    let status =
        status.map_err(|e| LauncherError::Io(format!("Failed to wait for child: {}", e)))?;

    info!("Child exited with {}", status);
    Ok(exit_code(&status))
}

fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(&ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(&ExitStatus::from_raw(3 << 8)), 3);
        assert_eq!(exit_code(&ExitStatus::from_raw(15)), 143);
    }
}
