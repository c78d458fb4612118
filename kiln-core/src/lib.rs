//! Kiln Core
//!
//! Core types for the Kiln package build pipeline.
//!
//! This crate contains:
//! - Platform profiles and the store that loads them
//! - Project configuration (publisher metadata, naming, build options)
//! - Package descriptor construction
//! - Debian control metadata rendering and parsing
//! - The error taxonomy shared by every stage

pub mod control;
pub mod descriptor;
pub mod error;
pub mod profile;
pub mod project;

pub use control::{control_lines, parse_control, render_control};
pub use descriptor::{DescriptorBuilder, PackageDescriptor};
pub use error::{Error, Result};
pub use profile::{PlatformProfile, ProfileStore};
pub use project::{
    BuildArgs, DependsPolicy, NamingStrategy, ProjectSpec, PublisherInfo, SourceSpec,
};
