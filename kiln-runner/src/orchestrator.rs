//! Build environment orchestrator
//!
//! Runs one build from start to finish:
//! 1. Bind-mounts the scripts root into a fresh container
//! 2. Starts it detached with the driver script as entrypoint
//! 3. Forwards its output to the caller's sink as it arrives
//! 4. Waits for the exit status
//! 5. Removes the container
//!
//! Removal is attempted on every path once the container has started,
//! including stream and wait failures. A failed removal is only logged.

use kiln_core::{Error, PlatformProfile, Result};
use std::path::{Component, Path};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::runtime::{Binding, ContainerRuntime, NONINTERACTIVE_ENV, SessionHandle, SessionSpec};
use crate::session::BuildSession;
use crate::sink::LogSink;

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Fixed container name, reused by every run
    pub container_name: String,
    /// Repository a bare profile tag is qualified with
    pub image_repository: String,
    /// Directory inside the container the scripts root is mounted under
    pub container_home: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            container_name: "kiln-build".to_string(),
            image_repository: "ubuntu".to_string(),
            container_home: "/root".to_string(),
        }
    }
}

/// Drives a build container through its lifecycle
pub struct Orchestrator {
    runtime: Arc<dyn ContainerRuntime>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: OrchestratorConfig) -> Self {
        Self { runtime, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Describes the container for a build
    ///
    /// # Arguments
    /// * `profile` - Target platform, provides the base image
    /// * `scripts_root` - Absolute host directory holding the generated scripts
    /// * `entrypoint` - Driver script path, relative to `scripts_root`
    pub fn session_spec(
        &self,
        profile: &PlatformProfile,
        scripts_root: &Path,
        entrypoint: &Path,
    ) -> Result<SessionSpec> {
        if !scripts_root.is_absolute() {
            return Err(Error::InvalidPath {
                path: scripts_root.to_path_buf(),
                reason: "scripts root must be absolute".to_string(),
            });
        }
        let base_name = scripts_root
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::InvalidPath {
                path: scripts_root.to_path_buf(),
                reason: "scripts root needs a UTF-8 base name".to_string(),
            })?;

        let mut segments = Vec::new();
        for component in entrypoint.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_str().ok_or_else(|| {
                    Error::InvalidPath {
                        path: entrypoint.to_path_buf(),
                        reason: "entrypoint must be UTF-8".to_string(),
                    }
                })?),
                Component::CurDir => {}
                _ => {
                    return Err(Error::InvalidPath {
                        path: entrypoint.to_path_buf(),
                        reason: "entrypoint must be relative to the scripts root".to_string(),
                    });
                }
            }
        }
        if segments.is_empty() {
            return Err(Error::InvalidPath {
                path: entrypoint.to_path_buf(),
                reason: "entrypoint is empty".to_string(),
            });
        }

        let home = self.config.container_home.trim_end_matches('/');
        let mount = format!("{}/{}", home, base_name);

        Ok(SessionSpec {
            name: self.config.container_name.clone(),
            image: profile.image_reference(&self.config.image_repository),
            binding: Binding {
                host: scripts_root.to_path_buf(),
                container: mount.clone(),
            },
            env: vec![NONINTERACTIVE_ENV.to_string()],
            working_dir: if home.is_empty() { "/".to_string() } else { home.to_string() },
            entrypoint: format!("{}/{}", mount, segments.join("/")),
        })
    }

    /// Runs a build and returns the container's exit status
    ///
    /// A non-zero status is returned as-is; it is not an error.
    pub async fn run(
        &self,
        profile: &PlatformProfile,
        scripts_root: &Path,
        entrypoint: &Path,
        sink: &mut dyn LogSink,
    ) -> Result<i32> {
        let spec = self.session_spec(profile, scripts_root, entrypoint)?;
        let mut session = BuildSession::new(spec);
        self.run_session(&mut session, sink).await
    }

    /// Runs a prepared session, leaving it in its final state for inspection
    pub async fn run_session(
        &self,
        session: &mut BuildSession,
        sink: &mut dyn LogSink,
    ) -> Result<i32> {
        session.ensure_fresh()?;

        info!(
            "Launching build container {} (image {}, entrypoint {})",
            session.spec().name,
            session.spec().image,
            session.spec().entrypoint
        );

        let handle = self.runtime.run(session.spec()).await?;
        session.mark_running(handle.clone())?;

        let outcome = match self.observe(&handle, sink).await {
            Ok(status) => session.mark_exited(status).map(|()| status),
            Err(e) => {
                error!("Build container {} failed: {}", handle.name, e);
                Err(e)
            }
        };

        match self.runtime.remove(&handle).await {
            Ok(()) => session.mark_removed()?,
            Err(e) => warn!(
                "Failed to remove container {}; remove it manually: {}",
                handle.name, e
            ),
        }

        outcome
    }

    /// Streams output until the container exits, then collects its status
    async fn observe(&self, handle: &SessionHandle, sink: &mut dyn LogSink) -> Result<i32> {
        let mut stream = self.runtime.stream_logs(handle).await?;

        let mut chunks = 0usize;
        let mut bytes = 0usize;
        while let Some(chunk) = stream.next_chunk().await? {
            sink.write_chunk(&chunk).map_err(Error::Sink)?;
            chunks += 1;
            bytes += chunk.len();
        }
        drop(stream);
        debug!(
            "Log stream of {} ended after {} chunk(s), {} bytes",
            handle.name, chunks, bytes
        );

        let status = self.runtime.wait(handle).await?;
        info!("Build container {} exited with status {}", handle.name, status);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::LogStream;
    use crate::session::SessionState;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// In-memory runtime recording every call it receives
    #[derive(Default)]
    struct FakeRuntime {
        calls: Mutex<Vec<String>>,
        chunks: Vec<&'static str>,
        fail_run: bool,
        fail_stream_after: Option<usize>,
        fail_remove: bool,
        exit_status: i32,
    }

    impl FakeRuntime {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    struct FakeStream {
        chunks: VecDeque<Vec<u8>>,
        fail_after: Option<usize>,
        served: usize,
    }

    #[async_trait]
    impl LogStream for FakeStream {
        async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
            if self.fail_after == Some(self.served) {
                return Err(Error::runtime("log stream interrupted"));
            }
            self.served += 1;
            Ok(self.chunks.pop_front())
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn run(&self, spec: &SessionSpec) -> Result<SessionHandle> {
            self.record(format!("run {}", spec.image));
            if self.fail_run {
                return Err(Error::runtime(format!(
                    "Starting container from image {} failed: image not known",
                    spec.image
                )));
            }
            Ok(SessionHandle {
                name: spec.name.clone(),
                id: "0123abcd".to_string(),
            })
        }

        async fn stream_logs(&self, handle: &SessionHandle) -> Result<Box<dyn LogStream>> {
            self.record(format!("logs {}", handle.name));
            Ok(Box::new(FakeStream {
                chunks: self.chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
                fail_after: self.fail_stream_after,
                served: 0,
            }))
        }

        async fn wait(&self, handle: &SessionHandle) -> Result<i32> {
            self.record(format!("wait {}", handle.name));
            Ok(self.exit_status)
        }

        async fn remove(&self, handle: &SessionHandle) -> Result<()> {
            self.record(format!("rm {}", handle.name));
            if self.fail_remove {
                return Err(Error::runtime("container is busy"));
            }
            Ok(())
        }
    }

    fn focal() -> PlatformProfile {
        PlatformProfile::new(
            "focal",
            "20.04",
            vec!["git".to_string()],
            vec!["g++".to_string()],
        )
    }

    fn orchestrator(runtime: Arc<FakeRuntime>) -> Orchestrator {
        Orchestrator::new(runtime, OrchestratorConfig::default())
    }

    fn session(orch: &Orchestrator) -> BuildSession {
        let spec = orch
            .session_spec(
                &focal(),
                Path::new("/home/me/opencv-deb"),
                Path::new("make_package.sh"),
            )
            .unwrap();
        BuildSession::new(spec)
    }

    #[test]
    fn test_session_spec() {
        let orch = orchestrator(Arc::new(FakeRuntime::default()));
        let spec = session(&orch).spec().clone();

        assert_eq!(spec.name, "kiln-build");
        assert_eq!(spec.image, "ubuntu:20.04");
        assert_eq!(spec.binding.host, PathBuf::from("/home/me/opencv-deb"));
        assert_eq!(spec.binding.container, "/root/opencv-deb");
        assert_eq!(spec.env, vec!["DEBIAN_FRONTEND=noninteractive"]);
        assert_eq!(spec.working_dir, "/root");
        assert_eq!(spec.entrypoint, "/root/opencv-deb/make_package.sh");
    }

    #[test]
    fn test_session_spec_rejects_relative_root() {
        let orch = orchestrator(Arc::new(FakeRuntime::default()));
        let err = orch
            .session_spec(&focal(), Path::new("work"), Path::new("make_package.sh"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
    }

    #[test]
    fn test_session_spec_rejects_escaping_entrypoint() {
        let orch = orchestrator(Arc::new(FakeRuntime::default()));
        for entrypoint in ["../make_package.sh", "/bin/sh", ""] {
            let err = orch
                .session_spec(&focal(), Path::new("/work"), Path::new(entrypoint))
                .unwrap_err();
            assert!(matches!(err, Error::InvalidPath { .. }), "{entrypoint}");
        }
    }

    #[tokio::test]
    async fn test_successful_run_streams_and_removes() {
        let runtime = Arc::new(FakeRuntime {
            chunks: vec!["Reading package lists...\n", "[100%] Built target package\n"],
            ..Default::default()
        });
        let orch = orchestrator(runtime.clone());
        let mut session = session(&orch);
        let mut sink: Vec<u8> = Vec::new();

        let status = orch.run_session(&mut session, &mut sink).await.unwrap();

        assert_eq!(status, 0);
        assert_eq!(
            String::from_utf8(sink).unwrap(),
            "Reading package lists...\n[100%] Built target package\n"
        );
        assert_eq!(
            runtime.calls(),
            vec!["run ubuntu:20.04", "logs kiln-build", "wait kiln-build", "rm kiln-build"]
        );
        assert_eq!(session.state(), SessionState::Removed);
        assert_eq!(session.exit_status(), Some(0));
    }

    #[tokio::test]
    async fn test_missing_image_fails_before_streaming() {
        let runtime = Arc::new(FakeRuntime {
            chunks: vec!["never shown\n"],
            fail_run: true,
            ..Default::default()
        });
        let orch = orchestrator(runtime.clone());
        let mut session = session(&orch);
        let mut sink: Vec<u8> = Vec::new();

        let err = orch.run_session(&mut session, &mut sink).await.unwrap_err();

        assert!(err.is_runtime());
        assert!(sink.is_empty());
        assert_eq!(runtime.calls(), vec!["run ubuntu:20.04"]);
        assert_eq!(session.state(), SessionState::Created);
        assert!(session.handle().is_none());
    }

    #[tokio::test]
    async fn test_nonzero_exit_returned_and_removed() {
        let runtime = Arc::new(FakeRuntime {
            chunks: vec!["E: Unable to locate package\n"],
            exit_status: 2,
            ..Default::default()
        });
        let orch = orchestrator(runtime.clone());
        let mut sink: Vec<u8> = Vec::new();

        let status = orch
            .run(
                &focal(),
                Path::new("/home/me/opencv-deb"),
                Path::new("make_package.sh"),
                &mut sink,
            )
            .await
            .unwrap();

        assert_eq!(status, 2);
        assert_eq!(runtime.calls().last().map(String::as_str), Some("rm kiln-build"));
    }

    #[tokio::test]
    async fn test_stream_failure_still_removes() {
        let runtime = Arc::new(FakeRuntime {
            chunks: vec!["first\n", "second\n"],
            fail_stream_after: Some(1),
            ..Default::default()
        });
        let orch = orchestrator(runtime.clone());
        let mut session = session(&orch);
        let mut sink: Vec<u8> = Vec::new();

        let err = orch.run_session(&mut session, &mut sink).await.unwrap_err();

        assert!(err.to_string().contains("interrupted"));
        assert_eq!(sink, b"first\n");
        assert_eq!(
            runtime.calls(),
            vec!["run ubuntu:20.04", "logs kiln-build", "rm kiln-build"]
        );
        assert_eq!(session.state(), SessionState::Removed);
        assert_eq!(session.exit_status(), None);
    }

    #[tokio::test]
    async fn test_finished_session_cannot_be_rerun() {
        let runtime = Arc::new(FakeRuntime::default());
        let orch = orchestrator(runtime.clone());
        let mut session = session(&orch);
        let mut sink: Vec<u8> = Vec::new();
        orch.run_session(&mut session, &mut sink).await.unwrap();
        let calls_after_first = runtime.calls().len();

        let err = orch.run_session(&mut session, &mut sink).await.unwrap_err();

        assert!(matches!(err, Error::InvalidSession(_)));
        assert_eq!(runtime.calls().len(), calls_after_first);
        assert_eq!(session.state(), SessionState::Removed);
        assert_eq!(session.exit_status(), Some(0));
    }

    #[tokio::test]
    async fn test_failed_removal_does_not_mask_status() {
        let runtime = Arc::new(FakeRuntime {
            exit_status: 0,
            fail_remove: true,
            ..Default::default()
        });
        let orch = orchestrator(runtime.clone());
        let mut session = session(&orch);
        let mut sink: Vec<u8> = Vec::new();

        let status = orch.run_session(&mut session, &mut sink).await.unwrap();

        assert_eq!(status, 0);
        assert_eq!(session.state(), SessionState::Exited);
    }
}
