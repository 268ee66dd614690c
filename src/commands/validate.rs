//! `wasconf validate`

use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;

use super::manifest_path;
use crate::Context;
use crate::config;
use crate::engine::differ::type_label;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    ui::header("Validating Manifest");

    let path = manifest_path(ctx)?;
    let loaded = config::load(&path)?;
    ui::kv("Manifest", &path.display().to_string());

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for resource in &loaded.resources {
        *counts.entry(resource.resource_type()).or_default() += 1;
    }

    ui::section("Resources");
    if counts.is_empty() {
        ui::dim("(none declared)");
    }
    for (resource_type, count) in &counts {
        println!("  {} {:<26} {}", "✓".green(), type_label(resource_type), count);
    }

    // The checks below are informational: the manifest itself is valid
    let layout = loaded.settings.layout();
    ui::section("Profile");
    ui::kv("Config root", &layout.config_root().display().to_string());
    ui::kv("wsadmin", &layout.wsadmin().display().to_string());
    if !layout.config_root().is_dir() {
        ui::warn("Configuration root does not exist on this host");
    }
    if !layout.wsadmin().is_file() {
        ui::warn("wsadmin launcher not found; only status, diff and dry runs will work");
    }

    println!();
    ui::success(&format!(
        "Manifest is valid ({})",
        ui::plural(loaded.resources.len(), "resource")
    ));
    Ok(())
}
