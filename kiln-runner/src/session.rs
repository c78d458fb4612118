//! Build session lifecycle
//!
//! One session wraps one ephemeral build container:
//! `Created -> Running -> Exited -> Removed`. A session whose output stream or
//! wait fails goes straight from `Running` to `Removed`.

use kiln_core::{Error, Result};
use std::fmt;
use tracing::debug;

use crate::runtime::{SessionHandle, SessionSpec};

/// Lifecycle state of a build session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Spec prepared, container not started
    Created,
    /// Container started, output being streamed
    Running,
    /// Container process terminated
    Exited,
    /// Container removed from the engine
    Removed,
}

impl SessionState {
    /// Whether `next` is a legal successor of this state
    pub fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Created, Running) | (Running, Exited) | (Running, Removed) | (Exited, Removed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Created => write!(f, "Created"),
            SessionState::Running => write!(f, "Running"),
            SessionState::Exited => write!(f, "Exited"),
            SessionState::Removed => write!(f, "Removed"),
        }
    }
}

/// One build container, owned by the orchestrator for its whole lifetime
#[derive(Debug)]
pub struct BuildSession {
    spec: SessionSpec,
    handle: Option<SessionHandle>,
    state: SessionState,
    exit_status: Option<i32>,
}

impl BuildSession {
    pub fn new(spec: SessionSpec) -> Self {
        Self {
            spec,
            handle: None,
            state: SessionState::Created,
            exit_status: None,
        }
    }

    pub fn spec(&self) -> &SessionSpec {
        &self.spec
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Engine handle, once started
    pub fn handle(&self) -> Option<&SessionHandle> {
        self.handle.as_ref()
    }

    /// Exit status, once the container has exited
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    /// Fails unless the session has never been started
    ///
    /// A session drives exactly one container; a finished one cannot be rerun.
    pub fn ensure_fresh(&self) -> Result<()> {
        if self.state == SessionState::Created {
            Ok(())
        } else {
            Err(Error::InvalidSession(format!(
                "session {} is already {}",
                self.spec.name, self.state
            )))
        }
    }

    pub(crate) fn mark_running(&mut self, handle: SessionHandle) -> Result<()> {
        self.advance(SessionState::Running)?;
        self.handle = Some(handle);
        Ok(())
    }

    pub(crate) fn mark_exited(&mut self, status: i32) -> Result<()> {
        self.advance(SessionState::Exited)?;
        self.exit_status = Some(status);
        Ok(())
    }

    pub(crate) fn mark_removed(&mut self) -> Result<()> {
        self.advance(SessionState::Removed)
    }

    fn advance(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(Error::InvalidSession(format!(
                "session {} cannot go from {} to {}",
                self.spec.name, self.state, next
            )));
        }
        debug!("Session {}: {} -> {}", self.spec.name, self.state, next);
        self.state = next;
        Ok(())
    }
}
