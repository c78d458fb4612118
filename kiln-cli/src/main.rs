//! Kiln CLI
//!
//! Builds native Debian packages inside an ephemeral container.
//!
//! Architecture:
//! - Configuration: flags with environment fallbacks, validated up front
//! - Pipeline: profile -> descriptor -> scripts -> files on disk
//! - Commands: build (pipeline + container run), render, profiles

mod commands;
mod config;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Build native packages in an ephemeral container", long_about = None)]
struct Cli {
    /// Directory of platform profile descriptors
    #[arg(long, env = "KILN_PROFILE_DIR", default_value = "platform")]
    profile_dir: PathBuf,

    /// Directory the build files are written to and mounted from
    #[arg(long, env = "KILN_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Container engine binary
    #[arg(long, env = "KILN_RUNTIME", default_value = "podman")]
    runtime: String,

    /// Repository bare profile tags are qualified with
    #[arg(long, env = "KILN_IMAGE_REPOSITORY", default_value = "ubuntu")]
    image_repository: String,

    /// Name of the build container
    #[arg(long, env = "KILN_CONTAINER_NAME", default_value = "kiln-build")]
    container_name: String,

    /// Project file overriding the built-in package settings
    #[arg(long, env = "KILN_PROJECT")]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr; stdout carries the container output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "kiln=info,kiln_core=info,kiln_script=info,kiln_runner=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        profile_dir: cli.profile_dir,
        work_dir: cli.work_dir,
        runtime: cli.runtime,
        image_repository: cli.image_repository,
        container_name: cli.container_name,
        project: cli.project,
    };
    config.validate()?;

    let status = handle_command(cli.command, &config).await?;
    Ok(ExitCode::from(u8::try_from(status).unwrap_or(1)))
}
