//! `wasconf diff`

use anyhow::Result;
use declarative::{Dialect, ExecutionPlan, ResourceDiff, compute_diffs};
use serde::Serialize;
use wsadmin::Jython;

use super::Session;
use crate::Context;
use crate::engine::differ::{display_diff, display_read_failures, partition, script_for};
use crate::ui;

#[derive(Debug, Serialize)]
struct ReadFailure {
    id: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct DiffDocument<'a> {
    diffs: &'a [ResourceDiff],
    failures: Vec<ReadFailure>,
}

pub fn run(ctx: &Context, target: Option<&str>, show_script: bool, json: bool) -> Result<()> {
    let mut session = Session::open(ctx)?;
    let plan = session.plan(target);
    let apply_ctx = session.apply_context();

    let (diffs, failures) = partition(compute_diffs(&plan.resources, &apply_ctx));

    if json {
        let document = DiffDocument {
            diffs: &diffs,
            failures: failures
                .iter()
                .map(|(id, e)| ReadFailure {
                    id: id.clone(),
                    error: e.to_string(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    if !ctx.quiet {
        ui::header("Configuration Diff");
    }
    display_diff(&diffs);
    display_read_failures(&failures);

    if show_script {
        for (id, script) in scripts(&plan, &diffs) {
            ui::section(&id);
            match script {
                Ok(text) => println!("{text}"),
                Err(e) => ui::error(&e.to_string()),
            }
        }
    }

    Ok(())
}

/// Rendered script of every diff, in plan order
fn scripts(
    plan: &ExecutionPlan,
    diffs: &[ResourceDiff],
) -> Vec<(String, declarative::Result<String>)> {
    diffs
        .iter()
        .filter_map(|diff| {
            let resource = plan
                .resources
                .iter()
                .find(|r| r.id() == diff.resource_id)?;
            let rendered = script_for(resource.as_ref(), diff).and_then(|s| Jython.render(&s));
            Some((diff.resource_id.clone(), rendered))
        })
        .collect()
}
