//! Execution engine - runs a plan with diff display, confirmation and progress

use anyhow::Result;
use colored::Colorize;
use declarative::{
    ApplyContext, ApplyResult, AutoConfirm, ExecuteOptions, ExecuteSummary, ExecutionPlan,
    PassReport, Reconciler, compute_diffs,
};

use crate::progress::ApplyProgress;
use crate::ui;

use super::differ::{display_diff, display_read_failures, partition};

/// Options for an apply run
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Emit scripts without running them
    pub dry_run: bool,
    /// Skip the confirmation prompt
    pub yes: bool,
    pub verbose: bool,
    /// Hide the progress bar
    pub quiet: bool,
}

/// Summary and per-resource reports of a run
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    pub summary: ExecuteSummary,
    pub reports: Vec<PassReport>,
}

impl ApplyOutcome {
    /// Passes that failed without a known recovery
    pub fn fatal(&self) -> impl Iterator<Item = &PassReport> {
        self.reports.iter().filter(|r| r.result.is_fatal())
    }
}

/// Execute the plan with diff display and confirmation
pub fn execute(
    plan: &ExecutionPlan,
    opts: &ApplyOptions,
    reconciler: &Reconciler,
    ctx: &ApplyContext,
) -> Result<ApplyOutcome> {
    // 1. Show what would change
    let (diffs, failures) = partition(compute_diffs(&plan.resources, ctx));
    display_diff(&diffs);
    display_read_failures(&failures);

    if diffs.is_empty() && failures.is_empty() {
        return Ok(ApplyOutcome {
            summary: ExecuteSummary {
                no_change: plan.total_resources(),
                ..Default::default()
            },
            reports: Vec::new(),
        });
    }

    // 2. Confirm (unless --yes)
    if !opts.yes && !opts.dry_run && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(ApplyOutcome {
            summary: ExecuteSummary {
                skipped: diffs.len() + failures.len(),
                ..Default::default()
            },
            reports: Vec::new(),
        });
    }

    // 3. One pass per resource, in plan order
    println!();
    println!(
        "  {} {} {}...",
        "→".cyan(),
        if opts.dry_run { "Previewing" } else { "Applying" },
        ui::plural(plan.total_resources(), "resource")
    );

    let mut progress = ApplyProgress::new(opts.quiet);
    let (summary, reports) = declarative::execute(
        plan,
        &ExecuteOptions {
            dry_run: opts.dry_run,
            verbose: opts.verbose,
        },
        reconciler,
        ctx,
        &mut progress,
        &mut AutoConfirm,
    )?;

    let outcome = ApplyOutcome { summary, reports };

    if opts.dry_run {
        print_scripts(&outcome.reports);
    }
    print_failures(&outcome.reports);
    print_summary(&outcome.summary, opts.dry_run);

    Ok(outcome)
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

fn print_scripts(reports: &[PassReport]) {
    for report in reports {
        if let Some(script) = &report.script {
            ui::section(&report.id);
            println!("{script}");
        }
    }
}

/// Deferred passes get their hint, fatal ones their full output
fn print_failures(reports: &[PassReport]) {
    for report in reports {
        let ApplyResult::Failed {
            error,
            retryable,
            hint,
        } = &report.result
        else {
            continue;
        };

        println!();
        if *retryable {
            ui::warn(&format!("{}: deferred ({error})", report.id));
            if let Some(hint) = hint {
                ui::dim(hint);
            }
        } else {
            ui::error(&format!("{} failed", report.id));
            ui::output_block(error);
        }
    }
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary, dry_run: bool) {
    println!();
    if dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
        if summary.skipped > 0 {
            println!("    • {} would change", ui::plural(summary.skipped, "resource"));
        }
    } else if summary.is_success() {
        println!(
            "  {} Configuration applied successfully!",
            "✓".green().bold()
        );
    } else {
        println!(
            "  {} Configuration applied with errors",
            "⚠".yellow().bold()
        );
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.modified > 0 {
        println!("    • {} resources modified", summary.modified);
    }
    if summary.removed > 0 {
        println!("    • {} resources removed", summary.removed);
    }
    if !dry_run && summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.deferred > 0 {
        println!(
            "    • {} resources deferred to the next run",
            summary.deferred
        );
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
