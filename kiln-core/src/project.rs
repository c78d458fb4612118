//! Project configuration
//!
//! Everything about the package being built that does not depend on the
//! target platform: publisher metadata, naming, where the source lives and
//! how the build system is configured. The defaults describe the OpenCV
//! development package; a YAML project file can override any part of it.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// How the package name is derived
///
/// Written as a YAML tag in project files, e.g.
/// `naming: !version_templated "libopencv{major}-dev"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// Constant name, independent of the version
    Fixed(String),
    /// Template with `{major}` and `{version}` placeholders
    VersionTemplated(String),
}

impl Default for NamingStrategy {
    fn default() -> Self {
        Self::Fixed("libopencv4-dev".to_string())
    }
}

/// Which dependency lists end up in the control file's `Depends` field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependsPolicy {
    /// Only runtime dependencies (`pkg_deps`)
    #[default]
    RuntimeOnly,
    /// Build dependencies followed by runtime dependencies
    IncludeBuildDeps,
}

/// Static publisher metadata written into the control file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublisherInfo {
    pub architecture: String,
    pub maintainer: String,
    pub section: String,
    pub homepage: String,
    pub description: String,
}

impl Default for PublisherInfo {
    fn default() -> Self {
        Self {
            architecture: "amd64".to_string(),
            maintainer: "James Lai <jamesljlster@gmail.com>".to_string(),
            section: "universe/libdevel".to_string(),
            homepage: "https://opencv.org".to_string(),
            description: "development files for opencv".to_string(),
        }
    }
}

/// Where the source comes from and what the build system produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSpec {
    /// Git repository, cloned at the tag named by the version
    pub repo_url: String,
    /// Stem of the tarball produced by the `package` target; `{version}` is substituted
    pub artifact_template: String,
}

impl Default for SourceSpec {
    fn default() -> Self {
        Self {
            repo_url: "https://github.com/opencv/opencv.git".to_string(),
            artifact_template: "OpenCV-{version}-x86_64".to_string(),
        }
    }
}

impl SourceSpec {
    /// Artifact stem for a concrete version
    pub fn artifact_stem(&self, version: &str) -> String {
        self.artifact_template.replace("{version}", version)
    }
}

/// Ordered build-system options, rendered as `-D<key>=<value>`
///
/// Order is significant for reproducible scripts, so this keeps insertion
/// (and YAML document) order rather than sorting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildArgs(Vec<(String, String)>);

impl BuildArgs {
    /// Creates an empty option set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an option, replacing the value in place if the key exists
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets an option, replacing the value in place if the key exists
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Looks up an option value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates options in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for BuildArgs {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for BuildArgs {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BuildArgsVisitor;

        impl<'de> Visitor<'de> for BuildArgsVisitor {
            type Value = BuildArgs;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of build option names to string values")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<BuildArgs, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut args = BuildArgs::new();
                while let Some((key, value)) = map.next_entry::<String, String>()? {
                    args.set(key, value);
                }
                Ok(args)
            }
        }

        deserializer.deserialize_map(BuildArgsVisitor)
    }
}

/// Complete, immutable description of the package project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSpec {
    pub publisher: PublisherInfo,
    pub naming: NamingStrategy,
    pub depends_policy: DependsPolicy,
    pub source: SourceSpec,
    pub build_args: BuildArgs,
    /// Let the package manager pull in recommended packages
    pub install_recommends: bool,
}

impl Default for ProjectSpec {
    fn default() -> Self {
        Self {
            publisher: PublisherInfo::default(),
            naming: NamingStrategy::default(),
            depends_policy: DependsPolicy::default(),
            source: SourceSpec::default(),
            build_args: BuildArgs::new()
                .with("CMAKE_INSTALL_PREFIX", "/usr")
                .with("WITH_QT", "ON")
                .with("WITH_OPENGL", "ON")
                .with("BUILD_opencv_python3", "ON")
                .with("CMAKE_BUILD_TYPE", "Release")
                .with("OPENCV_GENERATE_PKGCONFIG", "ON")
                .with("OPENCV_DOWNLOAD_PATH", "/tmp/opencv-cache"),
            install_recommends: false,
        }
    }
}

impl ProjectSpec {
    /// Decodes a project from YAML; omitted fields keep their defaults
    pub fn from_yaml(text: &str, origin: &Path) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::ProjectDecode {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Reads and decodes a project file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml(&text, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_project_matches_opencv() {
        let project = ProjectSpec::default();
        assert_eq!(
            project.naming,
            NamingStrategy::Fixed("libopencv4-dev".to_string())
        );
        assert_eq!(project.depends_policy, DependsPolicy::RuntimeOnly);
        assert_eq!(project.build_args.len(), 7);
        assert_eq!(project.build_args.get("CMAKE_BUILD_TYPE"), Some("Release"));
        assert_eq!(
            project.source.artifact_stem("4.5.0"),
            "OpenCV-4.5.0-x86_64"
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
naming: !version_templated "libopencv{major}-dev"
depends_policy: include_build_deps
publisher:
  maintainer: "Someone <someone@example.com>"
build_args:
  CMAKE_INSTALL_PREFIX: /usr
  WITH_CUDA: "OFF"
  CMAKE_BUILD_TYPE: Debug
"#;
        let project = ProjectSpec::from_yaml(yaml, Path::new("project.yaml")).unwrap();

        assert_eq!(
            project.naming,
            NamingStrategy::VersionTemplated("libopencv{major}-dev".to_string())
        );
        assert_eq!(project.depends_policy, DependsPolicy::IncludeBuildDeps);
        assert_eq!(project.publisher.maintainer, "Someone <someone@example.com>");
        assert_eq!(project.publisher.architecture, "amd64");
        assert_eq!(project.source, SourceSpec::default());

        let keys: Vec<&str> = project.build_args.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["CMAKE_INSTALL_PREFIX", "WITH_CUDA", "CMAKE_BUILD_TYPE"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ProjectSpec::from_yaml("colour: blue\n", Path::new("p.yaml")).unwrap_err();
        assert!(matches!(err, Error::ProjectDecode { .. }));
    }

    #[test]
    fn test_serialized_project_reads_back() {
        let project = ProjectSpec {
            naming: NamingStrategy::VersionTemplated("libopencv{major}-dev".to_string()),
            build_args: BuildArgs::new().with("WITH_QT", "OFF").with("CMAKE_BUILD_TYPE", "Debug"),
            ..ProjectSpec::default()
        };

        let yaml = serde_yaml::to_string(&project).unwrap();
        let qt = yaml.find("WITH_QT:").unwrap();
        let build_type = yaml.find("CMAKE_BUILD_TYPE:").unwrap();
        assert!(qt < build_type);

        let decoded = ProjectSpec::from_yaml(&yaml, Path::new("project.yaml")).unwrap();
        assert_eq!(decoded, project);
    }

    #[test]
    fn test_build_args_set_replaces_in_place() {
        let mut args = BuildArgs::new().with("A", "1").with("B", "2");
        args.set("A", "3");
        let pairs: Vec<(&str, &str)> = args.iter().collect();
        assert_eq!(pairs, vec![("A", "3"), ("B", "2")]);
    }
}
