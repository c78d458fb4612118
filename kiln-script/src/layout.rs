//! On-disk artifact layout
//!
//! Everything a build needs lives under one scripts root, which is later
//! bind-mounted into the build container:
//!
//! ```text
//! <root>/
//!   build_package.sh
//!   make_deb.sh
//!   make_package.sh        (container entrypoint)
//!   <package>/DEBIAN/control
//! ```
//!
//! The build itself adds `<package>-src/`, `build/`, `<package>/usr/` and
//! `<package>.deb`. Those are left over from any earlier build in the same
//! root and are cleared before new scripts are written, so every build starts
//! from a fresh checkout.

use kiln_core::{PackageDescriptor, Result, render_control};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::fs::{ensure_directory, remove_stale, write_script, write_text};
use crate::generator::{
    BUILD_DIR, BUILD_SCRIPT, DRIVER_SCRIPT, PACKAGING_SCRIPT, RenderedScripts, ScriptGenerator,
};

/// Paths of the generated artifacts under a scripts root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Staging directory handed to `dpkg -b`
    pub fn staging_dir(&self, descriptor: &PackageDescriptor) -> PathBuf {
        self.root.join(&descriptor.name)
    }

    pub fn control_path(&self, descriptor: &PackageDescriptor) -> PathBuf {
        self.staging_dir(descriptor).join("DEBIAN").join("control")
    }

    pub fn build_script(&self) -> PathBuf {
        self.root.join(BUILD_SCRIPT)
    }

    pub fn packaging_script(&self) -> PathBuf {
        self.root.join(PACKAGING_SCRIPT)
    }

    pub fn driver_script(&self) -> PathBuf {
        self.root.join(DRIVER_SCRIPT)
    }

    /// Entrypoint path relative to the root, as the orchestrator expects it
    pub fn entrypoint(&self) -> &'static Path {
        Path::new(DRIVER_SCRIPT)
    }

    /// Path of the archive `dpkg -b` produces
    pub fn package_path(&self, descriptor: &PackageDescriptor) -> PathBuf {
        self.root.join(format!("{}.deb", descriptor.name))
    }

    /// Source checkout the build script clones into
    pub fn source_dir(&self, descriptor: &PackageDescriptor) -> PathBuf {
        self.root.join(ScriptGenerator::source_dir(descriptor))
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(BUILD_DIR)
    }

    /// Unpacked payload inside the staging directory
    pub fn payload_dir(&self, descriptor: &PackageDescriptor) -> PathBuf {
        self.staging_dir(descriptor).join("usr")
    }

    /// Paths a previous build of `descriptor` leaves behind
    pub fn build_outputs(&self, descriptor: &PackageDescriptor) -> Vec<PathBuf> {
        vec![
            self.source_dir(descriptor),
            self.build_dir(),
            self.payload_dir(descriptor),
            self.package_path(descriptor),
        ]
    }

    /// Writes control metadata and scripts, creating directories as needed
    ///
    /// Safe to repeat: outputs of an earlier build are removed and existing
    /// files are overwritten.
    pub fn materialize(
        &self,
        descriptor: &PackageDescriptor,
        scripts: &RenderedScripts,
    ) -> Result<()> {
        ensure_directory(&self.root)?;
        for stale in self.build_outputs(descriptor) {
            remove_stale(&stale)?;
        }
        debug!("Cleared previous build outputs under {}", self.root.display());
        ensure_directory(self.staging_dir(descriptor))?;
        ensure_directory(self.staging_dir(descriptor).join("DEBIAN"))?;

        write_text(self.control_path(descriptor), &render_control(descriptor))?;
        write_script(self.build_script(), &scripts.build)?;
        write_script(self.packaging_script(), &scripts.packaging)?;
        write_script(self.driver_script(), &scripts.driver)?;

        info!(
            "Materialized {} {} under {}",
            descriptor.name,
            descriptor.version,
            self.root.display()
        );
        Ok(())
    }
}
