//! Container runtime abstraction
//!
//! The orchestrator only needs five things from a container engine: start a
//! detached container, follow its output, wait for it, and remove it. Any
//! engine that can do that is substitutable behind [`ContainerRuntime`].

use async_trait::async_trait;
use kiln_core::Result;
use std::path::PathBuf;

/// Environment variable every build container gets
pub const NONINTERACTIVE_ENV: &str = "DEBIAN_FRONTEND=noninteractive";

/// Read-write bind mount of a host directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Absolute host path
    pub host: PathBuf,
    /// Absolute path inside the container
    pub container: String,
}

impl Binding {
    /// Volume argument in `host:container:rw` form
    pub fn volume_arg(&self) -> String {
        format!("{}:{}:rw", self.host.display(), self.container)
    }
}

/// Everything needed to start one build container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSpec {
    /// Container name, reused across runs
    pub name: String,
    /// Image reference
    pub image: String,
    pub binding: Binding,
    /// `KEY=value` pairs
    pub env: Vec<String>,
    /// Working directory inside the container
    pub working_dir: String,
    /// Script the container runs on start
    pub entrypoint: String,
}

/// Reference to a started container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub name: String,
    /// Engine-assigned container id
    pub id: String,
}

/// Lazy, finite sequence of output chunks from a running container
///
/// Ends when the container's process exits. Not restartable.
#[async_trait]
pub trait LogStream: Send {
    /// Waits for the next chunk; `None` once the output is exhausted
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Container engine operations used by the orchestrator
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Creates and starts a detached container
    async fn run(&self, spec: &SessionSpec) -> Result<SessionHandle>;

    /// Opens a live stream of the container's output
    async fn stream_logs(&self, handle: &SessionHandle) -> Result<Box<dyn LogStream>>;

    /// Blocks until the container exits and returns its exit status
    async fn wait(&self, handle: &SessionHandle) -> Result<i32>;

    /// Removes the container
    async fn remove(&self, handle: &SessionHandle) -> Result<()>;
}
