//! CLI-backed container runtime
//!
//! Drives `podman` (or the command-compatible `docker`) through its command
//! line:
//! - `create` then `start` to launch the build container
//! - `logs --follow` to stream its output
//! - `wait` for the exit status
//! - `rm --force` to tear it down

use async_trait::async_trait;
use kiln_core::{Error, Result};
use std::future;
use std::io;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, error, info, warn};

use crate::runtime::{ContainerRuntime, LogStream, SessionHandle, SessionSpec};

/// Read size for log chunks
const CHUNK_SIZE: usize = 8192;

/// Container runtime that shells out to an engine CLI
#[derive(Debug, Clone)]
pub struct CliRuntime {
    program: String,
}

impl CliRuntime {
    /// Uses the given engine binary (`podman`, `docker`, or a path)
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn podman() -> Self {
        Self::new("podman")
    }

    pub fn docker() -> Self {
        Self::new("docker")
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Checks that the engine is installed and answering
    ///
    /// # Returns
    /// The engine's version string
    pub async fn check_available(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                Error::runtime(format!(
                    "Failed to execute '{} --version'. Is {} installed? ({})",
                    self.program, self.program, e
                ))
            })?;

        if !output.status.success() {
            return Err(Error::runtime(format!(
                "{} is not working correctly: {}",
                self.program,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("Container engine available: {}", version);
        Ok(version)
    }

    /// Arguments for creating the build container
    pub fn create_args(spec: &SessionSpec) -> Vec<String> {
        let mut args = vec![
            "create".to_string(),
            "--name".to_string(),
            spec.name.clone(),
            "--hostname".to_string(),
            spec.name.clone(),
            "--workdir".to_string(),
            spec.working_dir.clone(),
            "--volume".to_string(),
            spec.binding.volume_arg(),
        ];
        for var in &spec.env {
            args.push("--env".to_string());
            args.push(var.clone());
        }
        args.push("--entrypoint".to_string());
        args.push(spec.entrypoint.clone());
        args.push(spec.image.clone());
        args
    }

    /// Runs an engine subcommand to completion and captures its output
    async fn exec(&self, args: &[&str]) -> Result<std::process::Output> {
        debug!("Executing: {} {}", self.program, args.join(" "));
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                Error::runtime(format!(
                    "Failed to execute {} {}: {}",
                    self.program,
                    args.first().copied().unwrap_or_default(),
                    e
                ))
            })
    }
}

impl Default for CliRuntime {
    fn default() -> Self {
        Self::podman()
    }
}

/// Formats a failed engine invocation
fn failure(action: &str, output: &std::process::Output) -> Error {
    Error::runtime(format!(
        "{} failed: exit_code={}, stderr='{}'",
        action,
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stderr).trim()
    ))
}

#[async_trait]
impl ContainerRuntime for CliRuntime {
    async fn run(&self, spec: &SessionSpec) -> Result<SessionHandle> {
        info!(
            "Starting container {} from image {}",
            spec.name, spec.image
        );

        // Creation fails without side effects (missing image, name already in
        // use by another build), so there is nothing of ours to clean up.
        let args = Self::create_args(spec);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.exec(&args).await?;
        if !output.status.success() {
            let err = failure(&format!("Creating container from image {}", spec.image), &output);
            error!("{}", err);
            return Err(err);
        }
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("Container {} created with ID: {}", spec.name, id);

        let started = match self.exec(&["start", id.as_str()]).await {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => Err(failure(&format!("Starting container {}", spec.name), &output)),
            Err(e) => Err(e),
        };
        if let Err(err) = started {
            error!("{}", err);

            // Only the container this call created is removed.
            match self.exec(&["rm", "--force", id.as_str()]).await {
                Ok(rm) if rm.status.success() => debug!("Removed unstarted container {}", id),
                Ok(rm) => warn!("{}", failure(&format!("Removing unstarted container {}", id), &rm)),
                Err(e) => warn!("Failed to remove unstarted container {}: {}", id, e),
            }
            return Err(err);
        }

        info!("Container {} started with ID: {}", spec.name, id);

        Ok(SessionHandle {
            name: spec.name.clone(),
            id,
        })
    }

    async fn stream_logs(&self, handle: &SessionHandle) -> Result<Box<dyn LogStream>> {
        debug!("Following logs of container {}", handle.name);

        let mut child = Command::new(&self.program)
            .args(["logs", "--follow", handle.name.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::runtime(format!(
                    "Failed to follow logs of container {}: {}",
                    handle.name, e
                ))
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        Ok(Box::new(ProcessLogStream {
            container: handle.name.clone(),
            child,
            stdout,
            stderr,
            finished: false,
        }))
    }

    async fn wait(&self, handle: &SessionHandle) -> Result<i32> {
        let output = self.exec(&["wait", handle.name.as_str()]).await?;
        if !output.status.success() {
            return Err(failure(&format!("Waiting for container {}", handle.name), &output));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let code = stdout
            .lines()
            .last()
            .unwrap_or_default()
            .trim()
            .parse::<i32>()
            .map_err(|_| {
                Error::runtime(format!(
                    "Unexpected output from {} wait: '{}'",
                    self.program,
                    stdout.trim()
                ))
            })?;

        info!("Container {} exited with status {}", handle.name, code);
        Ok(code)
    }

    async fn remove(&self, handle: &SessionHandle) -> Result<()> {
        let output = self.exec(&["rm", "--force", handle.name.as_str()]).await?;
        if !output.status.success() {
            let err = failure(&format!("Removing container {}", handle.name), &output);
            warn!("{}", err);
            return Err(err);
        }

        debug!("Container {} removed", handle.name);
        Ok(())
    }
}

/// Output of a `logs --follow` process, stdout and stderr interleaved as they arrive
struct ProcessLogStream {
    container: String,
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    finished: bool,
}

/// Reads from a pipe, or never completes once the pipe is closed
async fn read_pipe<R: AsyncRead + Unpin>(pipe: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize> {
    match pipe {
        Some(reader) => reader.read(buf).await,
        None => future::pending().await,
    }
}

impl ProcessLogStream {
    fn read_error(&self, e: io::Error) -> Error {
        Error::runtime(format!(
            "Failed to read logs of container {}: {}",
            self.container, e
        ))
    }

    fn check_exit(&self, status: ExitStatus) -> Result<()> {
        if status.success() {
            Ok(())
        } else {
            Err(Error::runtime(format!(
                "Log stream for container {} ended abnormally: {}",
                self.container, status
            )))
        }
    }
}

#[async_trait]
impl LogStream for ProcessLogStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut out_buf = [0u8; CHUNK_SIZE];
        let mut err_buf = [0u8; CHUNK_SIZE];

        while self.stdout.is_some() || self.stderr.is_some() {
            tokio::select! {
                read = read_pipe(&mut self.stdout, &mut out_buf) => {
                    match read.map_err(|e| self.read_error(e))? {
                        0 => self.stdout = None,
                        n => return Ok(Some(out_buf[..n].to_vec())),
                    }
                }
                read = read_pipe(&mut self.stderr, &mut err_buf) => {
                    match read.map_err(|e| self.read_error(e))? {
                        0 => self.stderr = None,
                        n => return Ok(Some(err_buf[..n].to_vec())),
                    }
                }
            }
        }

        if !self.finished {
            self.finished = true;
            let status = self.child.wait().await.map_err(|e| self.read_error(e))?;
            self.check_exit(status)?;
        }

        Ok(None)
    }
}
