use mcxb_types::{LogBuffer, SpawnError, CHILD_STDERR_TAG, CHILD_STDOUT_TAG};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::debug;

fn anchored(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardSignal {
    Interrupt,
    Terminate,
}

#[derive(Clone, Debug)]
pub struct ChildSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub capture_output: bool,
}

impl ChildSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            capture_output: true,
        }
    }

    /// `<runtime> -jar <artifact> --config <config> [extra...]`, run from the
    /// artifact's directory. Relative paths are anchored at the current
    /// directory; a bare runtime name is left for `PATH` lookup.
    pub fn java(runtime: &Path, artifact: &Path, config: &Path, extra_args: &[String]) -> Self {
        let runtime = if runtime.components().count() > 1 {
            anchored(runtime)
        } else {
            runtime.to_path_buf()
        };
        let artifact = anchored(artifact);
        let config = anchored(config);

        let mut spec = Self::new(runtime)
            .arg("-jar")
            .arg(artifact.display().to_string())
            .arg("--config")
            .arg(config.display().to_string());
        spec.args.extend(extra_args.iter().cloned());
        spec.working_dir = artifact
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);
        spec
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn inherit_output(mut self) -> Self {
        self.capture_output = false;
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct RunningChild {
    child: Child,
    pid: Option<u32>,
    readers: Vec<JoinHandle<()>>,
}

/// Launches the child. With output capture on, every stdout/stderr line lands
/// in `logs` tagged with its stream.
pub fn spawn_child(spec: &ChildSpec, logs: &LogBuffer) -> Result<RunningChild, SpawnError> {
    let mut command = Command::new(&spec.program);
    command.args(&spec.args).stdin(Stdio::null()).kill_on_drop(true);

    if let Some(ref dir) = spec.working_dir {
        command.current_dir(dir);
    }

    if spec.capture_output {
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
    } else {
        command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    }

    let mut child = command
        .spawn()
        .map_err(|e| SpawnError::from_io(&spec.program, &e))?;
    let pid = child.id();

    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(capture_lines(stdout, CHILD_STDOUT_TAG, logs.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(capture_lines(stderr, CHILD_STDERR_TAG, logs.clone()));
    }

    Ok(RunningChild {
        child,
        pid,
        readers,
    })
}

fn capture_lines<R>(reader: R, tag: &'static str, logs: LogBuffer) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    debug!("{} {}", tag, line);
                    logs.push(format!("{} {}", tag, line));
                }
                Err(e) => {
                    logs.warn(format!("{} output capture stopped: {}", tag, e));
                    break;
                }
            }
        }
    })
}

impl RunningChild {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Waits for the capture tasks to hit EOF so the child's last lines are
    /// logged before its exit. Grandchildren holding the pipes open are cut off
    /// after `timeout`.
    pub async fn drain_output(&mut self, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        for mut handle in self.readers.drain(..) {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if tokio::time::timeout(remaining, &mut handle).await.is_err() {
                handle.abort();
            }
        }
    }

    pub fn signal(&mut self, signal: ForwardSignal) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = self
                .pid
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "child has no pid"))?;
            let sig = match signal {
                ForwardSignal::Interrupt => Signal::SIGINT,
                ForwardSignal::Terminate => Signal::SIGTERM,
            };
            kill(Pid::from_raw(pid as i32), sig).map_err(std::io::Error::from)
        }

        #[cfg(not(unix))]
        {
            let _ = signal;
            self.child.start_kill()
        }
    }

    /// Forwards `signal`, waits up to `grace` for the child to exit, then kills it.
    pub async fn shutdown(
        &mut self,
        signal: ForwardSignal,
        grace: Duration,
    ) -> std::io::Result<ExitStatus> {
        if let Ok(Some(status)) = self.child.try_wait() {
            return Ok(status);
        }

        if let Err(e) = self.signal(signal) {
            debug!("Failed to signal child: {}", e);
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                self.child.kill().await?;
                self.child.wait().await
            }
        }
    }
}
