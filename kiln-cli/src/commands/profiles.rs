//! Profiles command handler

use anyhow::{Context, Result};
use colored::*;

use crate::config::Config;
use crate::pipeline::load_profiles;

/// List the available platform profiles
pub fn handle_profiles(config: &Config, json: bool) -> Result<()> {
    let store = load_profiles(config)?;

    if json {
        let profiles: Vec<_> = store.iter().collect();
        let output =
            serde_json::to_string_pretty(&profiles).context("Failed to serialize profiles")?;
        println!("{}", output);
        return Ok(());
    }

    if store.is_empty() {
        println!(
            "{} {}",
            "No profiles found in".yellow(),
            config.profile_dir.display()
        );
        return Ok(());
    }

    println!("{}", "Available platforms:".bold());
    for profile in store.iter() {
        println!(
            "  {:<12} {} ({} build deps, {} package deps)",
            profile.name.cyan(),
            profile.image_reference(&config.image_repository),
            profile.build_deps.len(),
            profile.pkg_deps.len()
        );
    }

    Ok(())
}
