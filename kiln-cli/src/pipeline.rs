//! Pipeline wiring
//!
//! Connects the stages in order: profile store, descriptor builder, script
//! generator, artifact layout. Running the container is left to the caller.

use anyhow::{Context, Result};
use kiln_core::{DescriptorBuilder, PackageDescriptor, PlatformProfile, ProfileStore};
use kiln_script::{ArtifactLayout, GeneratorOptions, HostInfo, RenderedScripts, ScriptGenerator};
use tracing::info;

use crate::config::Config;

/// Everything a build needs once its files are on disk
#[derive(Debug)]
pub struct PreparedBuild {
    pub profile: PlatformProfile,
    pub descriptor: PackageDescriptor,
    pub scripts: RenderedScripts,
    pub layout: ArtifactLayout,
}

/// Loads the profile store named by the configuration
pub fn load_profiles(config: &Config) -> Result<ProfileStore> {
    ProfileStore::load(&config.profile_dir).with_context(|| {
        format!(
            "Failed to load platform profiles from {:?}",
            config.profile_dir
        )
    })
}

/// Resolves, renders and materializes a build for `platform` at `version`
pub fn prepare(
    config: &Config,
    platform: &str,
    version: &str,
    host: HostInfo,
) -> Result<PreparedBuild> {
    let store = load_profiles(config)?;
    let profile = store.get(platform)?.clone();
    let project = config.load_project()?;

    let descriptor = DescriptorBuilder::from_project(&project)
        .build(&profile, version)
        .context("Failed to build package descriptor")?;

    let generator = ScriptGenerator::new(GeneratorOptions::from_project(&project), host);
    let scripts = generator.render_all(&descriptor, &profile);

    let root = std::path::absolute(&config.work_dir)
        .with_context(|| format!("Failed to resolve work directory {:?}", config.work_dir))?;
    let layout = ArtifactLayout::new(root);
    layout
        .materialize(&descriptor, &scripts)
        .context("Failed to write build artifacts")?;

    info!(
        "Prepared {} {} for {} (image tag {})",
        descriptor.name, descriptor.version, profile.name, profile.tag
    );

    Ok(PreparedBuild {
        profile,
        descriptor,
        scripts,
        layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        let profile_dir = dir.path().join("platform");
        fs::create_dir_all(&profile_dir).unwrap();
        fs::write(
            profile_dir.join("focal.yaml"),
            "tag: \"20.04\"\nbuild_deps: [git, make]\npkg_deps: [g++, cmake]\n",
        )
        .unwrap();

        Config {
            profile_dir,
            work_dir: dir.path().join("work"),
            ..Config::default()
        }
    }

    #[test]
    fn test_prepare_writes_scenario_artifacts() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);

        let prepared = prepare(&config, "focal", "4.5.0", HostInfo::with_cpus(4)).unwrap();

        assert!(prepared.layout.root().is_absolute());
        let build = fs::read_to_string(prepared.layout.build_script()).unwrap();
        assert!(build.lines().any(|line| line
            == "git clone --branch 4.5.0 --depth 1 https://github.com/opencv/opencv.git ./libopencv4-dev-src"));

        let control = fs::read_to_string(prepared.layout.control_path(&prepared.descriptor)).unwrap();
        assert!(control.lines().any(|line| line == "Depends: g++, cmake"));
    }

    #[test]
    fn test_prepare_unknown_platform() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);

        let err = prepare(&config, "jammy", "4.5.0", HostInfo::with_cpus(1)).unwrap_err();
        assert!(err.to_string().contains("available: focal"));
    }

    #[test]
    fn test_prepare_with_project_file() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("project.yaml");
        fs::write(
            &project,
            "naming: !version_templated \"libopencv{major}-dev\"\n",
        )
        .unwrap();
        let config = Config {
            project: Some(project),
            ..config(&dir)
        };

        let prepared = prepare(&config, "focal", "3.4.16", HostInfo::with_cpus(1)).unwrap();
        assert_eq!(prepared.descriptor.name, "libopencv3-dev");
        assert!(prepared.layout.root().join("libopencv3-dev/DEBIAN/control").is_file());
    }
}
