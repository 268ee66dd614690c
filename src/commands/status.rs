//! `wasconf status`

use anyhow::Result;
use colored::Colorize;
use declarative::{DiffKind, DiffOutcome, compute_diffs};

use super::Session;
use crate::Context;
use crate::engine::differ::type_label;
use crate::ui;

/// How one declared resource compares with the documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    InSync,
    Missing,
    Drifted(usize),
    ToRemove,
    Unreadable,
}

impl SyncState {
    fn from_outcome(outcome: &DiffOutcome) -> Self {
        match &outcome.1 {
            Ok(None) => Self::InSync,
            Ok(Some(diff)) => match diff.kind {
                DiffKind::Create => Self::Missing,
                DiffKind::Update => Self::Drifted(diff.changes.len()),
                DiffKind::Destroy => Self::ToRemove,
            },
            Err(_) => Self::Unreadable,
        }
    }

    fn describe(self) -> String {
        match self {
            Self::InSync => "in sync".to_string(),
            Self::Missing => "missing".to_string(),
            Self::Drifted(n) => format!("drifted ({})", ui::plural(n, "attribute")),
            Self::ToRemove => "present, declared absent".to_string(),
            Self::Unreadable => "unreadable".to_string(),
        }
    }
}

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    ui::header("WebSphere Configuration Status");

    let mut session = Session::open(ctx)?;
    let plan = session.plan(target);
    let apply_ctx = session.apply_context();

    ui::kv("Manifest", &session.loaded.path.display().to_string());
    ui::kv("Config root", &session.config_root.display().to_string());

    if plan.is_empty() {
        println!();
        ui::info("No resources declared for this target");
        return Ok(());
    }

    let outcomes = compute_diffs(&plan.resources, &apply_ctx);

    let mut current_type = "";
    let mut in_sync = 0;
    for (resource, outcome) in plan.resources.iter().zip(&outcomes) {
        if resource.resource_type() != current_type {
            current_type = resource.resource_type();
            ui::section(type_label(current_type));
        }

        let state = SyncState::from_outcome(outcome);
        let icon = match state {
            SyncState::InSync => {
                in_sync += 1;
                "✓".green()
            }
            SyncState::Missing | SyncState::ToRemove => "✗".red(),
            SyncState::Drifted(_) => "⚠".yellow(),
            SyncState::Unreadable => "✗".red(),
        };

        println!(
            "  {} {} {}",
            icon,
            resource.description().bold(),
            format!("({})", state.describe()).dimmed()
        );
        if !ctx.quiet {
            ui::dim(&format!("  {}", resource.id()));
        }
        if let Err(e) = &outcome.1 {
            println!("      {} {}", "✗".red(), e.to_string().dimmed());
        }
    }

    println!();
    let total = plan.total_resources();
    if in_sync == total {
        ui::success(&format!("All {} in sync", ui::plural(total, "resource")));
    } else {
        ui::warn(&format!(
            "{} of {} in sync; run 'wasconf diff' for details",
            in_sync,
            ui::plural(total, "resource")
        ));
    }

    Ok(())
}
