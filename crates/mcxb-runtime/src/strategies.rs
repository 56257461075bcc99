use crate::extract::{ensure_executable, extract_archive, resolve_executable};
use crate::fetcher::ArtifactFetcher;
use crate::platform::Platform;
use crate::provisioner::{ProvisionStrategy, RuntimeProbe};
use async_trait::async_trait;
use mcxb_types::StrategyError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info};

pub fn default_package_commands() -> Vec<Vec<String>> {
    vec![
        vec!["apt-get".into(), "update".into()],
        vec![
            "apt-get".into(),
            "install".into(),
            "-y".into(),
            "openjdk-17-jre-headless".into(),
        ],
    ]
}

/// Installs a headless runtime with the system package manager.
pub struct PackageManagerStrategy {
    commands: Vec<Vec<String>>,
    timeout: Duration,
    probe: RuntimeProbe,
}

impl PackageManagerStrategy {
    pub fn new(commands: Vec<Vec<String>>, timeout: Duration, probe: RuntimeProbe) -> Self {
        Self {
            commands,
            timeout,
            probe,
        }
    }

    async fn run_command(&self, argv: &[String], deadline: Instant) -> Result<(), StrategyError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| StrategyError::Failed("empty install command".into()))?;

        debug!("Running install command: {}", argv.join(" "));
        let child = Command::new(program)
            .args(args)
            .env("DEBIAN_FRONTEND", "noninteractive")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    StrategyError::PermissionDenied(program.clone())
                }
                _ => StrategyError::Failed(format!("failed to run {}: {}", program, e)),
            })?;

        let remaining = deadline.saturating_duration_since(Instant::now());
        let output = match tokio::time::timeout(remaining, child.wait_with_output()).await {
            Ok(result) => result
                .map_err(|e| StrategyError::Failed(format!("{} failed: {}", program, e)))?,
            Err(_) => return Err(StrategyError::TimedOut(self.timeout)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last_line = stderr.lines().last().unwrap_or("").trim().to_string();
            if last_line.contains("Permission denied") || last_line.contains("are you root") {
                return Err(StrategyError::PermissionDenied(last_line));
            }
            return Err(StrategyError::Failed(format!(
                "`{}` exited with {}: {}",
                argv.join(" "),
                output.status,
                last_line
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ProvisionStrategy for PackageManagerStrategy {
    fn name(&self) -> &str {
        "package-manager"
    }

    async fn provision(&self) -> Result<PathBuf, StrategyError> {
        let deadline = Instant::now() + self.timeout;
        for argv in &self.commands {
            self.run_command(argv, deadline).await?;
        }

        self.probe.locate().await.ok_or_else(|| {
            StrategyError::Failed(format!(
                "package installed but '{}' is still not runnable",
                self.probe.command()
            ))
        })
    }
}

/// Downloads a vendor JRE bundle and extracts it under the work directory.
pub struct BundleStrategy {
    url: String,
    work_dir: PathBuf,
    bundle_dir: PathBuf,
    platform: Platform,
    fetcher: ArtifactFetcher,
}

impl BundleStrategy {
    pub fn new(
        url: impl Into<String>,
        work_dir: PathBuf,
        bundle_dir: PathBuf,
        platform: Platform,
        fetcher: ArtifactFetcher,
    ) -> Self {
        Self {
            url: url.into(),
            work_dir,
            bundle_dir,
            platform,
            fetcher,
        }
    }

    fn bundle_root(&self) -> PathBuf {
        self.work_dir.join(&self.bundle_dir)
    }

    /// Extraction target; renamed to the bundle root once complete.
    fn staging_root(&self) -> PathBuf {
        let mut name = self.bundle_dir.as_os_str().to_os_string();
        name.push(".partial");
        self.work_dir.join(name)
    }

    fn archive_path(&self) -> PathBuf {
        self.work_dir.join(format!(
            "runtime-bundle.{}",
            self.platform.archive_kind().extension()
        ))
    }

    fn existing_executable(&self) -> Option<PathBuf> {
        resolve_executable(&self.bundle_root(), &self.platform.java_relative_paths())
    }
}

#[async_trait]
impl ProvisionStrategy for BundleStrategy {
    fn name(&self) -> &str {
        "runtime-bundle"
    }

    async fn provision(&self) -> Result<PathBuf, StrategyError> {
        if let Some(exe) = self.existing_executable() {
            info!("Reusing extracted runtime at {:?}", exe);
            return Ok(exe);
        }

        let archive = self.archive_path();
        self.fetcher.fetch(&self.url, &archive).await?;

        let staging = self.staging_root();
        let _ = tokio::fs::remove_dir_all(&staging).await;

        let kind = self.platform.archive_kind();
        let extract_from = archive.clone();
        let extract_into = staging.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            extract_archive(&extract_from, kind, &extract_into)
        })
        .await
        .map_err(|e| StrategyError::Failed(format!("extraction task failed: {}", e)))
        .and_then(|result| result);

        let _ = tokio::fs::remove_file(&archive).await;

        if let Err(e) = extracted {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(e);
        }

        // Only a tree that holds the executable is moved into place.
        if resolve_executable(&staging, &self.platform.java_relative_paths()).is_none() {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(StrategyError::Failed(format!(
                "{} not found in extracted bundle from {}",
                self.platform.java_binary_name(),
                self.url
            )));
        }

        let root = self.bundle_root();
        let _ = tokio::fs::remove_dir_all(&root).await;
        if let Err(e) = tokio::fs::rename(&staging, &root).await {
            let _ = tokio::fs::remove_dir_all(&staging).await;
            return Err(StrategyError::Failed(format!(
                "Failed to move runtime into {:?}: {}",
                root, e
            )));
        }

        let exe = self.existing_executable().ok_or_else(|| {
            StrategyError::Failed(format!(
                "{} not found in extracted bundle at {:?}",
                self.platform.java_binary_name(),
                root
            ))
        })?;
        ensure_executable(&exe)?;
        Ok(exe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tar_gz_with_java() -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let data: &[u8] = b"#!/bin/sh\necho fake java\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "jdk-17-jre/bin/java", data)
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn truncated_tar_gz() -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let java: &[u8] = b"#!/bin/sh\necho fake java\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(java.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, "jdk/bin/java", java).unwrap();

        // Incompressible payload so the cut lands inside this entry.
        let mut seed: u32 = 0x2545_f491;
        let modules: Vec<u8> = (0..128 * 1024)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                seed as u8
            })
            .collect();
        let mut header = tar::Header::new_gnu();
        header.set_size(modules.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "jdk/lib/modules", modules.as_slice())
            .unwrap();

        let mut bytes = builder.into_inner().unwrap().finish().unwrap();
        bytes.truncate(bytes.len() / 2);
        bytes
    }

    fn fetcher() -> ArtifactFetcher {
        ArtifactFetcher::new(Duration::from_secs(10)).unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_bundle_download_and_extract() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(tar_gz_with_java()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let strategy = BundleStrategy::new(
            server.uri(),
            dir.path().to_path_buf(),
            PathBuf::from("jre"),
            Platform::LinuxAmd64,
            fetcher(),
        );

        let exe = strategy.provision().await.unwrap();
        assert_eq!(exe, dir.path().join("jre/jdk-17-jre/bin/java"));
        assert!(!dir.path().join("runtime-bundle.tar.gz").exists());

        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&exe).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);

        // Second call reuses the extracted tree; the mock expects one request.
        assert_eq!(strategy.provision().await.unwrap(), exe);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_truncated_bundle_is_not_reused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(truncated_tar_gz()))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let strategy = BundleStrategy::new(
            server.uri(),
            dir.path().to_path_buf(),
            PathBuf::from("jre"),
            Platform::LinuxAmd64,
            fetcher(),
        );

        assert!(strategy.provision().await.is_err());
        assert!(!dir.path().join("jre").exists());
        assert!(!dir.path().join("jre.partial").exists());
        assert!(!dir.path().join("runtime-bundle.tar.gz").exists());

        // Nothing half-extracted is picked up: the retry downloads again.
        assert!(strategy.provision().await.is_err());
        assert!(!dir.path().join("jre").exists());
    }

    #[tokio::test]
    async fn test_bundle_download_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let strategy = BundleStrategy::new(
            server.uri(),
            dir.path().to_path_buf(),
            PathBuf::from("jre"),
            Platform::LinuxAmd64,
            fetcher(),
        );

        let err = strategy.provision().await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_package_manager_missing_tool() {
        let strategy = PackageManagerStrategy::new(
            vec![vec!["mcxb-no-such-package-tool".into(), "install".into()]],
            Duration::from_secs(5),
            RuntimeProbe::new("mcxb-definitely-missing-runtime"),
        );
        assert!(matches!(
            strategy.provision().await,
            Err(StrategyError::Failed(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_package_manager_nonzero_exit() {
        let strategy = PackageManagerStrategy::new(
            vec![vec!["sh".into(), "-c".into(), "echo 'E: broken' >&2; exit 100".into()]],
            Duration::from_secs(5),
            RuntimeProbe::new("mcxb-definitely-missing-runtime"),
        );
        let err = strategy.provision().await.unwrap_err();
        assert!(err.to_string().contains("E: broken"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_package_manager_timeout() {
        let strategy = PackageManagerStrategy::new(
            vec![vec!["sleep".into(), "30".into()]],
            Duration::from_millis(200),
            RuntimeProbe::new("mcxb-definitely-missing-runtime"),
        );
        assert_eq!(
            strategy.provision().await.unwrap_err(),
            StrategyError::TimedOut(Duration::from_millis(200))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_package_manager_success_then_probe() {
        let strategy = PackageManagerStrategy::new(
            vec![vec!["true".into()]],
            Duration::from_secs(5),
            RuntimeProbe::new("true").with_args(Vec::new()),
        );
        assert_eq!(strategy.provision().await.unwrap(), PathBuf::from("true"));
    }

    #[test]
    fn test_default_package_commands() {
        let commands = default_package_commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[1].last().map(String::as_str), Some("openjdk-17-jre-headless"));
    }
}
