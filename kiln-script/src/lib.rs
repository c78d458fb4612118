//! Kiln Script
//!
//! Turns a package descriptor and platform profile into the shell scripts
//! that run inside the build container, and lays them out on disk.

pub mod fs;
pub mod generator;
pub mod layout;
pub mod quote;
pub mod script;

pub use fs::{ensure_directory, remove_stale, write_script, write_text};
pub use generator::{
    BUILD_DIR, BUILD_SCRIPT, DRIVER_SCRIPT, GeneratorOptions, HostInfo, PACKAGING_SCRIPT,
    RenderedScripts, ScriptGenerator,
};
pub use layout::ArtifactLayout;
pub use quote::quote;
pub use script::Script;
