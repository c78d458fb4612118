//! Debian control metadata
//!
//! Renders a descriptor as the `DEBIAN/control` file consumed by `dpkg -b`,
//! and parses such a file back. `Installed-Size` is appended by the
//! packaging script after the build, so it is optional on both sides.

use std::collections::HashMap;

use crate::descriptor::PackageDescriptor;
use crate::error::{Error, Result};

/// Field order of the rendered control file
const FIELDS: [&str; 8] = [
    "Package",
    "Version",
    "Architecture",
    "Maintainer",
    "Depends",
    "Section",
    "Homepage",
    "Description",
];

const INSTALLED_SIZE: &str = "Installed-Size";

/// Control lines for a descriptor, without trailing newlines
pub fn control_lines(descriptor: &PackageDescriptor) -> Vec<String> {
    let depends = descriptor.depends.join(", ");
    let values = [
        descriptor.name.as_str(),
        descriptor.version.as_str(),
        descriptor.architecture.as_str(),
        descriptor.maintainer.as_str(),
        depends.as_str(),
        descriptor.section.as_str(),
        descriptor.homepage.as_str(),
        descriptor.description.as_str(),
    ];

    let mut lines: Vec<String> = FIELDS
        .iter()
        .zip(values)
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect();

    if let Some(size) = descriptor.installed_size {
        lines.push(format!("{}: {}", INSTALLED_SIZE, size));
    }

    lines
}

/// Full control file text, one newline-terminated line per field
pub fn render_control(descriptor: &PackageDescriptor) -> String {
    control_lines(descriptor)
        .into_iter()
        .map(|line| line + "\n")
        .collect()
}

/// Parses control text back into a descriptor
pub fn parse_control(text: &str) -> Result<PackageDescriptor> {
    let mut fields = HashMap::new();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) = line.split_once(':').ok_or_else(|| {
            Error::ControlParse(format!("line {}: expected 'Key: value', got '{}'", idx + 1, line))
        })?;
        fields.insert(key.trim().to_string(), value.trim().to_string());
    }

    let mut take = |key: &str| {
        fields
            .remove(key)
            .ok_or_else(|| Error::ControlParse(format!("missing field '{}'", key)))
    };

    let name = take("Package")?;
    let version = take("Version")?;
    let architecture = take("Architecture")?;
    let maintainer = take("Maintainer")?;
    let depends = take("Depends")?;
    let section = take("Section")?;
    let homepage = take("Homepage")?;
    let description = take("Description")?;

    let installed_size = fields
        .remove(INSTALLED_SIZE)
        .map(|size| {
            size.parse::<u64>().map_err(|_| {
                Error::ControlParse(format!("{} is not a number: '{}'", INSTALLED_SIZE, size))
            })
        })
        .transpose()?;

    let depends = depends
        .split(',')
        .map(str::trim)
        .filter(|dep| !dep.is_empty())
        .map(str::to_string)
        .collect();

    Ok(PackageDescriptor {
        name,
        version,
        architecture,
        maintainer,
        section,
        homepage,
        description,
        depends,
        installed_size,
    })
}
