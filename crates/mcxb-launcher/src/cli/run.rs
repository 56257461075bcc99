use super::utils::print_banner;
use mcxb_launcher::{ApiContext, ApiServer, CancellationToken, Launcher, LauncherConfig};
use mcxb_types::{LauncherError, LauncherResult, SharedState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const SHUTDOWN_SLACK: Duration = Duration::from_secs(5);

pub async fn run_launcher(config: LauncherConfig, pid_file: Option<PathBuf>) -> LauncherResult<()> {
    print_banner();
    info!("Starting mcxb-launcher v{}", env!("CARGO_PKG_VERSION"));
    info!("Working directory: {:?}", config.work_dir);

    std::fs::create_dir_all(&config.work_dir)
        .map_err(|e| LauncherError::Config(format!("Failed to create working directory: {}", e)))?;

    let state = Arc::new(SharedState::new(config.logging.buffer_capacity));
    let (cancel_tx, cancel) = CancellationToken::new();

    // Health checks must pass before the slow startup steps run.
    let server = ApiServer::new(
        config.api.socket_addr(),
        ApiContext::new(state.clone(), &config),
    );
    let api_addr = server.start(cancel.clone()).await?;
    state
        .logs
        .info(format!("Status server listening on port {}", api_addr.port()));

    if let Some(ref pid_path) = pid_file {
        if let Err(e) = std::fs::write(pid_path, std::process::id().to_string()) {
            let _ = cancel_tx.send(true);
            return Err(LauncherError::Config(format!("Failed to write PID file: {}", e)));
        }
        info!("PID file written: {:?}", pid_path);
    }

    let grace = Duration::from_secs(config.supervisor.shutdown_grace_secs);
    let launcher = Launcher::new(config, state.clone());
    let mut task_cancel = cancel;
    let mut task = tokio::spawn(async move {
        let prepared = tokio::select! {
            prepared = launcher.prepare() => prepared,
            _ = task_cancel.cancelled() => return None,
        };

        match prepared {
            Ok(runtime) => Some(launcher.supervisor(&runtime).run(task_cancel).await),
            Err(e) => {
                error!("Startup failed, status server stays up: {}", e);
                None
            }
        }
    });

    wait_for_shutdown().await;

    info!("Shutting down...");
    let _ = cancel_tx.send(true);

    match tokio::time::timeout(grace + SHUTDOWN_SLACK, &mut task).await {
        Ok(Ok(Some(exit))) => info!("Supervisor stopped: {:?}", exit),
        Ok(Ok(None)) => {}
        Ok(Err(e)) => error!("Launcher task failed: {}", e),
        Err(_) => {
            warn!("Supervisor did not stop within {:?}, aborting", grace + SHUTDOWN_SLACK);
            task.abort();
        }
    }

    if let Some(ref pid_path) = pid_file {
        let _ = std::fs::remove_file(pid_path);
    }

    info!("Shutdown complete");
    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => { info!("Received SIGTERM"); }
            _ = sigint.recv() => { info!("Received SIGINT"); }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C");
    }
}
