//! Kiln Runner
//!
//! Runs generated build scripts inside an ephemeral container.
//!
//! Architecture:
//! - Runtime: the container engine seam ([`ContainerRuntime`]) and its CLI implementation
//! - Session: lifecycle state of the single build container
//! - Orchestrator: start, stream, wait, remove
//! - Sink: where streamed output goes

pub mod orchestrator;
pub mod podman;
pub mod runtime;
pub mod session;
pub mod sink;

pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use podman::CliRuntime;
pub use runtime::{
    Binding, ContainerRuntime, LogStream, NONINTERACTIVE_ENV, SessionHandle, SessionSpec,
};
pub use session::{BuildSession, SessionState};
pub use sink::LogSink;
