//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod build;
mod profiles;
mod render;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Render the build files and build the package in a container
    Build {
        /// Target platform (name of a profile in the profile directory)
        platform: String,

        /// Version to package; also the git tag that is cloned
        version: String,
    },
    /// Render and write the build files without starting a container
    Render {
        /// Target platform (name of a profile in the profile directory)
        platform: String,

        /// Version to package; also the git tag that is cloned
        version: String,

        /// Also print the generated scripts
        #[arg(long)]
        print: bool,
    },
    /// List available platform profiles
    Profiles {
        /// Print profiles as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Returns
/// The process exit status; for `build` this is the container's exit status
pub async fn handle_command(command: Commands, config: &Config) -> Result<i32> {
    match command {
        Commands::Build { platform, version } => {
            build::handle_build(config, &platform, &version).await
        }
        Commands::Render {
            platform,
            version,
            print,
        } => render::handle_render(config, &platform, &version, print).map(|_| 0),
        Commands::Profiles { json } => profiles::handle_profiles(config, json).map(|_| 0),
    }
}
