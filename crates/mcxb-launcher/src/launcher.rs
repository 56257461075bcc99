//! Startup orchestration: resolve the runtime, fetch the artifact, then hand a
//! launch plan to the supervisor.

use crate::config::LauncherConfig;
use crate::supervisor::{ChildSupervisor, LaunchPlan, RestartPolicy};
use mcxb_runtime::{
    ArtifactFetcher, BundleStrategy, ChildSpec, PackageManagerStrategy, Platform, RuntimeProbe,
    RuntimeProvisioner,
};
use mcxb_types::{LauncherError, LauncherResult, SharedState, SupervisorState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct Launcher {
    config: LauncherConfig,
    state: Arc<SharedState>,
}

impl Launcher {
    pub fn new(config: LauncherConfig, state: Arc<SharedState>) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn state(&self) -> Arc<SharedState> {
        self.state.clone()
    }

    fn fetcher(&self) -> LauncherResult<ArtifactFetcher> {
        let fetcher = ArtifactFetcher::new(Duration::from_secs(self.config.artifact.timeout_secs))?
            .with_max_redirects(self.config.artifact.max_redirects)
            .with_logs(self.state.logs.clone());
        Ok(fetcher)
    }

    /// Probe first, then package manager, then the vendor bundle.
    pub fn build_provisioner(&self) -> LauncherResult<RuntimeProvisioner> {
        let runtime = &self.config.runtime;
        let probe = RuntimeProbe::new(runtime.command.clone());
        let mut provisioner = RuntimeProvisioner::new(probe.clone(), self.state.logs.clone());

        if runtime.enable_package_manager {
            provisioner.push_strategy(Box::new(PackageManagerStrategy::new(
                runtime.package_install.clone(),
                Duration::from_secs(runtime.install_timeout_secs),
                probe,
            )));
        }

        if runtime.enable_bundle {
            match Platform::detect() {
                Ok(platform) => {
                    let url = runtime
                        .bundle_url
                        .clone()
                        .unwrap_or_else(|| platform.bundle_url(runtime.java_version));
                    provisioner.push_strategy(Box::new(BundleStrategy::new(
                        url,
                        self.config.work_dir.clone(),
                        runtime.bundle_dir.clone(),
                        platform,
                        self.fetcher()?,
                    )));
                }
                Err(e) => self
                    .state
                    .logs
                    .warn(format!("Runtime bundle unavailable on this host: {}", e)),
            }
        }

        debug!("Provisioning strategies: {:?}", provisioner.strategy_names());
        Ok(provisioner)
    }

    pub async fn ensure_runtime(&self) -> LauncherResult<PathBuf> {
        self.state.set_state(SupervisorState::InstallingRuntime);

        let provisioner = self
            .build_provisioner()
            .map_err(|e| self.fail("Cannot set up runtime provisioning", e))?;

        match provisioner.ensure_runtime().await {
            Ok(path) => {
                self.state.set_runtime(path.clone());
                Ok(path)
            }
            Err(e) => {
                // Already logged by the provisioner.
                self.state.set_state(SupervisorState::Error(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Downloads the artifact unless it is already on disk. An existing file
    /// is trusted as-is.
    pub async fn ensure_artifact(&self) -> LauncherResult<PathBuf> {
        let path = self.config.artifact_path();
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            self.state.logs.info(format!(
                "Artifact already present at {}, skipping download",
                path.display()
            ));
            return Ok(path);
        }

        self.state.set_state(SupervisorState::Downloading);
        let fetcher = self
            .fetcher()
            .map_err(|e| self.fail("Failed to download artifact", e))?;
        fetcher
            .fetch(&self.config.artifact.url, &path)
            .await
            .map_err(|e| self.fail("Failed to download artifact", e.into()))?;

        Ok(path)
    }

    /// Runs every startup step that must succeed before the first launch.
    /// Returns the resolved runtime.
    pub async fn prepare(&self) -> LauncherResult<PathBuf> {
        info!("Preparing launcher in {:?}", self.config.work_dir);

        tokio::fs::create_dir_all(&self.config.work_dir)
            .await
            .map_err(|e| {
                self.fail(
                    "Cannot create work dir",
                    LauncherError::Io(format!("{}: {}", self.config.work_dir.display(), e)),
                )
            })?;

        let runtime = self.ensure_runtime().await?;
        self.ensure_artifact().await?;
        Ok(runtime)
    }

    /// Startup failures are terminal: log, flip the state to error, hand the
    /// error back.
    fn fail(&self, context: &str, e: LauncherError) -> LauncherError {
        self.state.logs.error(format!("{}: {}", context, e));
        self.state.set_state(SupervisorState::Error(e.to_string()));
        e
    }

    pub fn launch_plan(&self, runtime: &Path) -> LaunchPlan {
        let child = &self.config.child;
        let config_path = self.config.child_config_path();
        let mut spec = ChildSpec::java(
            runtime,
            &self.config.artifact_path(),
            &config_path,
            &child.extra_args,
        );
        if !child.capture_output {
            spec = spec.inherit_output();
        }

        LaunchPlan {
            spec,
            config_path,
            config_contents: child.config_contents.clone(),
        }
    }

    pub fn supervisor(&self, runtime: &Path) -> ChildSupervisor {
        ChildSupervisor::new(
            self.launch_plan(runtime),
            RestartPolicy::from(&self.config.supervisor),
            self.state.clone(),
        )
        .with_shutdown_grace(Duration::from_secs(self.config.supervisor.shutdown_grace_secs))
    }
}
