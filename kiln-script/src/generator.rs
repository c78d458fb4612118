//! Script generation
//!
//! Renders the build-phase scripts that run inside the build container:
//! - build script: install deps, fetch source, configure, build the package target
//! - packaging script: stage the produced tarball and run `dpkg -b`
//! - driver script: container entrypoint chaining the two
//!
//! Rendering is pure string templating. Host facts (CPU count) are injected
//! through [`HostInfo`] so output only depends on explicit inputs.

use kiln_core::{BuildArgs, PackageDescriptor, PlatformProfile, ProjectSpec, SourceSpec};
use tracing::debug;

use crate::quote::quote;
use crate::script::Script;

/// File name of the generated build script
pub const BUILD_SCRIPT: &str = "build_package.sh";

/// File name of the generated packaging script
pub const PACKAGING_SCRIPT: &str = "make_deb.sh";

/// File name of the generated driver script (container entrypoint)
pub const DRIVER_SCRIPT: &str = "make_package.sh";

/// Build directory, relative to the scripts root
pub const BUILD_DIR: &str = "build";

/// Facts about the machine that affect generated scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostInfo {
    /// Parallelism handed to `make -j`
    pub cpu_count: usize,
}

impl HostInfo {
    /// Uses an explicit CPU count
    pub fn with_cpus(cpu_count: usize) -> Self {
        Self {
            cpu_count: cpu_count.max(1),
        }
    }

    /// Queries the current host's logical CPU count
    pub fn detect() -> Self {
        let cpu_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::with_cpus(cpu_count)
    }
}

/// Immutable build configuration consumed by the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Repository cloned at the version tag, and the tarball stem it builds
    pub source: SourceSpec,
    /// Options rendered as `-D<key>=<value>`
    pub build_args: BuildArgs,
    /// Let the package manager pull in recommended packages
    pub install_recommends: bool,
}

impl GeneratorOptions {
    pub fn from_project(project: &ProjectSpec) -> Self {
        Self {
            source: project.source.clone(),
            build_args: project.build_args.clone(),
            install_recommends: project.install_recommends,
        }
    }
}

/// Renders the scripts for one package build
#[derive(Debug, Clone)]
pub struct ScriptGenerator {
    options: GeneratorOptions,
    host: HostInfo,
}

impl ScriptGenerator {
    pub fn new(options: GeneratorOptions, host: HostInfo) -> Self {
        Self { options, host }
    }

    /// Source checkout directory, scoped by package name
    pub fn source_dir(descriptor: &PackageDescriptor) -> String {
        format!("./{}-src", descriptor.name)
    }

    /// Renders the build script
    ///
    /// Install step lists build deps before runtime deps; both are needed to
    /// compile even though only runtime deps end up in `Depends`. Every
    /// interpolated value is quoted as a single shell word.
    pub fn render_build_script(
        &self,
        descriptor: &PackageDescriptor,
        profile: &PlatformProfile,
    ) -> Script {
        let source_dir = Self::source_dir(descriptor);
        let mut script = Script::new();

        let deps: Vec<_> = profile.install_deps().map(quote).collect();
        let recommends = if self.options.install_recommends {
            ""
        } else {
            " --no-install-recommends"
        };
        script.push(format!(
            "apt update && apt install -y{} {}",
            recommends,
            deps.join(" ")
        ));

        script.push(format!(
            "git clone --branch {} --depth 1 {} {}",
            quote(&descriptor.version),
            quote(&self.options.source.repo_url),
            quote(&source_dir)
        ));

        script.push(format!("mkdir -p {dir} && cd {dir}", dir = BUILD_DIR));

        let mut configure = vec!["cmake".to_string()];
        configure.extend(
            self.options
                .build_args
                .iter()
                .map(|(key, value)| quote(&format!("-D{}={}", key, value)).into_owned()),
        );
        configure.push(quote(&format!(".{}", source_dir)).into_owned());
        script.push(configure.join(" "));

        script.push(format!("make -j {} package", self.host.cpu_count));

        debug!(
            "Rendered build script for {} {} ({} lines)",
            descriptor.name,
            descriptor.version,
            script.lines().len()
        );
        script
    }

    /// Renders the packaging script
    pub fn render_packaging_script(&self, descriptor: &PackageDescriptor) -> Script {
        let staging = format!("./{}", descriptor.name);
        let artifact = self.options.source.artifact_stem(&descriptor.version);
        let payload = format!("{}/usr", staging);
        let mut script = Script::new();

        script.push(format!(
            "tar -xzvf {} -C {}",
            quote(&format!("./{}/{}.tar.gz", BUILD_DIR, artifact)),
            quote(&staging)
        ));
        script.push(format!(
            "mv {} {}",
            quote(&format!("{}/{}", staging, artifact)),
            quote(&payload)
        ));
        script.push(format!(
            "echo \"Installed-Size: $(du -sk {} | cut -f1)\" | tee --append {}",
            quote(&payload),
            quote(&format!("{}/DEBIAN/control", staging))
        ));
        script.push(format!("dpkg -b {}", quote(&staging)));

        debug!(
            "Rendered packaging script for {} {}",
            descriptor.name, descriptor.version
        );
        script
    }

    /// Renders the container entrypoint running both phases from the scripts root
    ///
    /// A failing phase stops the driver, so its status becomes the container's.
    pub fn render_driver_script(&self) -> Script {
        let mut script = Script::new();
        script.push("set -e");
        script.push("cd \"$(dirname \"$0\")\"");
        script.push(format!("bash ./{}", BUILD_SCRIPT));
        script.push(format!("bash ./{}", PACKAGING_SCRIPT));
        script
    }

    /// Renders every script a build needs
    pub fn render_all(
        &self,
        descriptor: &PackageDescriptor,
        profile: &PlatformProfile,
    ) -> RenderedScripts {
        RenderedScripts {
            build: self.render_build_script(descriptor, profile),
            packaging: self.render_packaging_script(descriptor),
            driver: self.render_driver_script(),
        }
    }
}

/// The three scripts of one build, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedScripts {
    pub build: Script,
    pub packaging: Script,
    pub driver: Script,
}
