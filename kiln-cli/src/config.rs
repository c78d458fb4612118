//! Configuration module
//!
//! Settings come from command-line flags, each with an environment variable
//! fallback (see `main.rs`), and are validated before any work starts.

use anyhow::{Context, Result};
use kiln_core::ProjectSpec;
use kiln_runner::OrchestratorConfig;
use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one `<platform>.yaml` descriptor per target
    pub profile_dir: PathBuf,

    /// Scripts root: generated files land here and it is mounted into the container
    pub work_dir: PathBuf,

    /// Container engine binary (`podman` or `docker`)
    pub runtime: String,

    /// Image repository bare profile tags are qualified with
    pub image_repository: String,

    /// Fixed name of the build container
    pub container_name: String,

    /// Optional project file overriding the built-in package settings
    pub project: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let orchestrator = OrchestratorConfig::default();
        Self {
            profile_dir: PathBuf::from("platform"),
            work_dir: PathBuf::from("."),
            runtime: "podman".to_string(),
            image_repository: orchestrator.image_repository,
            container_name: orchestrator.container_name,
            project: None,
        }
    }
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.runtime.trim().is_empty() {
            anyhow::bail!("runtime cannot be empty");
        }

        if self.image_repository.trim().is_empty() {
            anyhow::bail!("image_repository cannot be empty");
        }

        if self.container_name.is_empty()
            || !self
                .container_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            anyhow::bail!(
                "container_name '{}' must be non-empty and use only [A-Za-z0-9_.-]",
                self.container_name
            );
        }

        if self.work_dir.as_os_str().is_empty() {
            anyhow::bail!("work_dir cannot be empty");
        }

        Ok(())
    }

    /// Loads the project file, or the built-in project when none is configured
    pub fn load_project(&self) -> Result<ProjectSpec> {
        match &self.project {
            Some(path) => ProjectSpec::from_file(path)
                .with_context(|| format!("Failed to load project file {:?}", path)),
            None => Ok(ProjectSpec::default()),
        }
    }

    /// Orchestrator settings derived from this configuration
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            container_name: self.container_name.clone(),
            image_repository: self.image_repository.clone(),
            ..OrchestratorConfig::default()
        }
    }
}
