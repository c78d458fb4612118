//! Platform profiles
//!
//! A profile bundles everything that varies per target platform: the base
//! image tag and the two dependency lists. Profiles are loaded once from a
//! directory of YAML descriptors, one file per platform:
//!
//! ```yaml
//! tag: "20.04"
//! build_deps: [git, make]
//! pkg_deps: [g++, cmake]
//! ```
//!
//! The file's base name (extension stripped) is the platform name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Build profile for one target platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    /// Platform name, e.g. an OS release codename
    pub name: String,
    /// Base image tag
    pub tag: String,
    /// Tools only needed while compiling
    pub build_deps: Vec<String>,
    /// Packages the built artifact needs at runtime
    pub pkg_deps: Vec<String>,
}

/// On-disk shape of a profile descriptor
#[derive(Debug, Deserialize)]
struct ProfileFile {
    tag: String,
    build_deps: Vec<String>,
    pkg_deps: Vec<String>,
}

impl PlatformProfile {
    /// Creates a profile from its parts
    pub fn new(
        name: impl Into<String>,
        tag: impl Into<String>,
        build_deps: Vec<String>,
        pkg_deps: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            build_deps,
            pkg_deps,
        }
    }

    /// Decodes a profile from descriptor text
    ///
    /// `origin` is only used to make decode errors point at the right file.
    pub fn from_yaml(name: &str, text: &str, origin: &Path) -> Result<Self> {
        let file: ProfileFile = serde_yaml::from_str(text).map_err(|e| Error::ProfileDecode {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Self {
            name: name.to_string(),
            tag: file.tag,
            build_deps: file.build_deps,
            pkg_deps: file.pkg_deps,
        })
    }

    /// Full image reference for this profile
    ///
    /// A tag that already names a repository (contains `:` or `/`) is used
    /// verbatim, otherwise it is qualified with `repository`.
    pub fn image_reference(&self, repository: &str) -> String {
        if self.tag.contains(':') || self.tag.contains('/') {
            self.tag.clone()
        } else {
            format!("{}:{}", repository, self.tag)
        }
    }

    /// Everything the build container has to install: build deps first
    pub fn install_deps(&self) -> impl Iterator<Item = &str> {
        self.build_deps
            .iter()
            .chain(self.pkg_deps.iter())
            .map(String::as_str)
    }
}

/// Read-only registry of platform profiles keyed by name
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    profiles: BTreeMap<String, PlatformProfile>,
}

impl ProfileStore {
    /// Loads every `*.yaml` / `*.yml` descriptor in `dir`
    ///
    /// The directory is not searched recursively and other files are ignored.
    /// The first structurally invalid descriptor aborts the load.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

        let mut profiles = BTreeMap::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::io(dir, e))?.path();

            let is_descriptor = path.is_file()
                && matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("yaml") | Some("yml")
                );
            if !is_descriptor {
                continue;
            }

            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                debug!("Skipping descriptor with non UTF-8 name: {}", path.display());
                continue;
            };

            let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
            let profile = PlatformProfile::from_yaml(name, &text, &path)?;
            debug!(
                "Loaded profile {} (tag {}, {} build deps, {} pkg deps)",
                profile.name,
                profile.tag,
                profile.build_deps.len(),
                profile.pkg_deps.len()
            );
            profiles.insert(profile.name.clone(), profile);
        }

        info!("Loaded {} platform profile(s) from {}", profiles.len(), dir.display());
        Ok(Self { profiles })
    }

    /// Builds a store from in-memory profiles; later duplicates win
    pub fn from_profiles(profiles: impl IntoIterator<Item = PlatformProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|profile| (profile.name.clone(), profile))
                .collect(),
        }
    }

    /// Looks up a profile by platform name
    pub fn get(&self, name: &str) -> Result<&PlatformProfile> {
        self.profiles.get(name).ok_or_else(|| Error::UnknownProfile {
            name: name.to_string(),
            available: self.list_names(),
        })
    }

    /// Sorted names of all loaded profiles
    pub fn list_names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    /// Number of loaded profiles
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether no profile was loaded
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Iterates profiles in name order
    pub fn iter(&self) -> impl Iterator<Item = &PlatformProfile> {
        self.profiles.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, file: &str, content: &str) {
        fs::write(dir.path().join(file), content).unwrap();
    }

    #[test]
    fn test_load_keys_by_file_stem() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "focal.yaml",
            "tag: \"20.04\"\nbuild_deps: [git, make]\npkg_deps: [g++, cmake]\n",
        );
        write(
            &dir,
            "bionic.yml",
            "tag: \"18.04\"\nbuild_deps: [git]\npkg_deps: [g++]\n",
        );
        write(&dir, "README.md", "not a profile");

        let store = ProfileStore::load(dir.path()).unwrap();
        assert_eq!(store.list_names(), vec!["bionic", "focal"]);

        let focal = store.get("focal").unwrap();
        assert_eq!(focal.tag, "20.04");
        assert_eq!(focal.build_deps, vec!["git", "make"]);
        assert_eq!(focal.pkg_deps, vec!["g++", "cmake"]);
    }

    #[test]
    fn test_missing_key_is_decode_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "broken.yaml", "tag: \"20.04\"\nbuild_deps: [git]\n");

        let err = ProfileStore::load(dir.path()).unwrap_err();
        match err {
            Error::ProfileDecode { path, message } => {
                assert!(path.ends_with("broken.yaml"));
                assert!(message.contains("pkg_deps"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unquoted_tag_kept_as_written() {
        let profile = PlatformProfile::from_yaml(
            "groovy",
            "tag: 20.10\nbuild_deps: [git]\npkg_deps: [g++]\n",
            Path::new("groovy.yaml"),
        )
        .unwrap();
        assert_eq!(profile.tag, "20.10");
        assert_eq!(profile.image_reference("ubuntu"), "ubuntu:20.10");
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = ProfileStore::load(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_dependency_order_and_duplicates_preserved() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "dup.yaml",
            "tag: \"22.04\"\nbuild_deps: [make, git, make]\npkg_deps: []\n",
        );

        let store = ProfileStore::load(dir.path()).unwrap();
        let profile = store.get("dup").unwrap();
        assert_eq!(profile.build_deps, vec!["make", "git", "make"]);
        assert!(profile.pkg_deps.is_empty());
    }

    #[test]
    fn test_unknown_profile() {
        let store = ProfileStore::from_profiles([PlatformProfile::new(
            "focal",
            "20.04",
            vec![],
            vec![],
        )]);
        let err = store.get("jammy").unwrap_err();
        assert!(err.to_string().contains("available: focal"));
    }

    #[test]
    fn test_image_reference() {
        let mut profile = PlatformProfile::new("focal", "20.04", vec![], vec![]);
        assert_eq!(profile.image_reference("ubuntu"), "ubuntu:20.04");

        profile.tag = "docker.io/library/debian:bookworm".to_string();
        assert_eq!(
            profile.image_reference("ubuntu"),
            "docker.io/library/debian:bookworm"
        );
    }

    #[test]
    fn test_install_deps_build_first() {
        let profile = PlatformProfile::new(
            "focal",
            "20.04",
            vec!["git".to_string(), "make".to_string()],
            vec!["g++".to_string(), "cmake".to_string()],
        );
        let deps: Vec<&str> = profile.install_deps().collect();
        assert_eq!(deps, vec!["git", "make", "g++", "cmake"]);
    }
}
