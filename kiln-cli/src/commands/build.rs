//! Build command handler
//!
//! Prepares the build files, then runs the driver script in a fresh
//! container and streams its output to stdout.

use anyhow::{Context, Result};
use colored::*;
use kiln_runner::{CliRuntime, Orchestrator};
use kiln_script::HostInfo;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::pipeline::prepare;

/// Build a package for `platform` at `version`
///
/// # Returns
/// The container's exit status, unchanged
pub async fn handle_build(config: &Config, platform: &str, version: &str) -> Result<i32> {
    let prepared = prepare(config, platform, version, HostInfo::detect())?;

    let runtime = CliRuntime::new(&config.runtime);
    runtime
        .check_available()
        .await
        .context("Container engine is not available")?;

    let orchestrator = Orchestrator::new(Arc::new(runtime), config.orchestrator_config());
    info!(
        "Building {} {} on {}",
        prepared.descriptor.name, prepared.descriptor.version, prepared.profile.name
    );

    let mut stdout = std::io::stdout();
    let status = orchestrator
        .run(
            &prepared.profile,
            prepared.layout.root(),
            prepared.layout.entrypoint(),
            &mut stdout,
        )
        .await
        .context("Build container failed")?;

    println!();
    if status == 0 {
        println!(
            "{} {}",
            "✓ Package built:".green().bold(),
            prepared
                .layout
                .package_path(&prepared.descriptor)
                .display()
                .to_string()
                .cyan()
        );
    } else {
        println!(
            "{} {}",
            "✗ Build container exited with status".red().bold(),
            status.to_string().red().bold()
        );
    }

    Ok(status)
}
