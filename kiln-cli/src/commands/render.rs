//! Render command handler

use anyhow::Result;
use colored::*;
use kiln_script::HostInfo;

use crate::config::Config;
use crate::pipeline::prepare;

/// Write the control file and scripts for `platform` at `version`
pub fn handle_render(config: &Config, platform: &str, version: &str, print: bool) -> Result<()> {
    let prepared = prepare(config, platform, version, HostInfo::detect())?;
    let layout = &prepared.layout;

    println!(
        "{} {} {} for {}",
        "✓ Rendered".green().bold(),
        prepared.descriptor.name.bold(),
        prepared.descriptor.version,
        prepared.profile.name.cyan()
    );
    for path in [
        layout.control_path(&prepared.descriptor),
        layout.build_script(),
        layout.packaging_script(),
        layout.driver_script(),
    ] {
        println!("  {} {}", "Wrote".green(), path.display());
    }

    if print {
        for (title, script) in [
            (kiln_script::BUILD_SCRIPT, &prepared.scripts.build),
            (kiln_script::PACKAGING_SCRIPT, &prepared.scripts.packaging),
            (kiln_script::DRIVER_SCRIPT, &prepared.scripts.driver),
        ] {
            println!();
            println!("{}", format!("# {}", title).dimmed());
            print!("{}", script);
        }
    }

    Ok(())
}
