//! Package descriptor construction
//!
//! Combines a platform profile, a caller-supplied version and the static
//! publisher metadata into the record every later stage renders from.

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::profile::PlatformProfile;
use crate::project::{DependsPolicy, NamingStrategy, ProjectSpec, PublisherInfo};

/// Resolved metadata of the package being built
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
    /// Package name, also used as the staging directory name
    pub name: String,
    pub version: String,
    pub architecture: String,
    pub maintainer: String,
    pub section: String,
    pub homepage: String,
    pub description: String,
    /// Runtime dependencies, in order
    pub depends: Vec<String>,
    /// Installed size in KiB, only known once the build has run
    pub installed_size: Option<u64>,
}

impl NamingStrategy {
    /// Derives the package name for a version
    pub fn resolve(&self, version: &str) -> Result<String> {
        match self {
            NamingStrategy::Fixed(name) => Ok(name.clone()),
            NamingStrategy::VersionTemplated(template) => {
                let major = version.split('.').next().unwrap_or_default();
                if major.is_empty() {
                    return Err(Error::InvalidVersion {
                        version: version.to_string(),
                        reason: "expected a leading major version segment".to_string(),
                    });
                }
                Ok(template
                    .replace("{major}", major)
                    .replace("{version}", version))
            }
        }
    }
}

/// Whether a name can be used as a single directory component
fn is_path_safe(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '\0' || c.is_whitespace())
}

/// Builds package descriptors for a fixed publisher and naming scheme
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    publisher: PublisherInfo,
    naming: NamingStrategy,
    depends_policy: DependsPolicy,
}

impl DescriptorBuilder {
    /// Creates a builder with the default naming strategy and depends policy
    pub fn new(publisher: PublisherInfo) -> Self {
        Self {
            publisher,
            naming: NamingStrategy::default(),
            depends_policy: DependsPolicy::default(),
        }
    }

    /// Creates a builder configured from a project
    pub fn from_project(project: &ProjectSpec) -> Self {
        Self::new(project.publisher.clone())
            .naming(project.naming.clone())
            .depends_policy(project.depends_policy)
    }

    /// Selects the naming strategy
    pub fn naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Selects which dependency lists go into `Depends`
    pub fn depends_policy(mut self, policy: DependsPolicy) -> Self {
        self.depends_policy = policy;
        self
    }

    /// Builds the descriptor for `profile` at `version`
    pub fn build(&self, profile: &PlatformProfile, version: &str) -> Result<PackageDescriptor> {
        // The version doubles as the git ref to clone.
        if version.trim().is_empty() {
            return Err(Error::InvalidVersion {
                version: version.to_string(),
                reason: "version must not be empty".to_string(),
            });
        }

        let name = self.naming.resolve(version)?;
        if !is_path_safe(&name) {
            return Err(Error::InvalidPackageName(name));
        }

        let depends = match self.depends_policy {
            DependsPolicy::RuntimeOnly => profile.pkg_deps.clone(),
            DependsPolicy::IncludeBuildDeps => profile
                .build_deps
                .iter()
                .chain(profile.pkg_deps.iter())
                .cloned()
                .collect(),
        };

        debug!(
            "Resolved package {} {} for platform {} ({} runtime deps)",
            name,
            version,
            profile.name,
            depends.len()
        );

        Ok(PackageDescriptor {
            name,
            version: version.to_string(),
            architecture: self.publisher.architecture.clone(),
            maintainer: self.publisher.maintainer.clone(),
            section: self.publisher.section.clone(),
            homepage: self.publisher.homepage.clone(),
            description: self.publisher.description.clone(),
            depends,
            installed_size: None,
        })
    }
}
