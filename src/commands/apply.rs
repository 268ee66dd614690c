//! `wasconf apply`

use anyhow::{Context as AnyhowContext, Result, bail};
use chrono::Local;
use declarative::{ExecuteSummary, PassReport, Reconciler, ScriptRunner};
use serde::Serialize;
use std::fs;
use std::path::Path;
use wsadmin::{Jython, WsadminRunner};

use super::{Offline, Session};
use crate::Context;
use crate::config::WsadminSettings;
use crate::engine::{self, ApplyOptions, ApplyOutcome};
use crate::ui;

/// Options of one apply invocation
pub struct ApplyArgs<'a> {
    pub target: Option<&'a str>,
    pub dry_run: bool,
    pub yes: bool,
    pub report: Option<&'a Path>,
}

/// What `--report` writes
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    generated_at: String,
    manifest: &'a Path,
    dry_run: bool,
    summary: &'a ExecuteSummary,
    passes: &'a [PassReport],
}

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    ui::header("Applying Configuration");

    if args.dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let mut session = Session::open(ctx)?;
    let plan = session.plan(args.target);
    if plan.is_empty() {
        ui::info("No resources declared for this target");
        return Ok(());
    }

    let runner: Box<dyn ScriptRunner> = if args.dry_run {
        Box::new(Offline)
    } else {
        Box::new(live_runner(&session.loaded.settings)?)
    };
    let reconciler = Reconciler::new(runner.as_ref(), &Jython, &session.classifier);
    let apply_ctx = session.apply_context();

    let opts = ApplyOptions {
        dry_run: args.dry_run,
        yes: args.yes,
        verbose: ctx.verbose > 0,
        quiet: ctx.quiet,
    };
    let outcome = engine::execute(&plan, &opts, &reconciler, &apply_ctx)?;

    if let Some(path) = args.report {
        write_report(path, &session.loaded.path, args.dry_run, &outcome)?;
        ui::info(&format!("Report written to {}", path.display()));
    }

    let fatal: Vec<&str> = outcome.fatal().map(|r| r.id.as_str()).collect();
    if !fatal.is_empty() {
        bail!("{} failed: {}", ui::plural(fatal.len(), "resource"), fatal.join(", "));
    }
    Ok(())
}

/// Runner for the deployment manager profile's launcher
fn live_runner(settings: &WsadminSettings) -> Result<WsadminRunner> {
    let mut runner = WsadminRunner::new(&settings.layout())?.timeout(settings.timeout());
    if let Some((user, password)) = settings.credentials() {
        runner = runner.credentials(user, password);
    }
    Ok(runner)
}

fn write_report(path: &Path, manifest: &Path, dry_run: bool, outcome: &ApplyOutcome) -> Result<()> {
    let report = RunReport {
        generated_at: Local::now().to_rfc3339(),
        manifest,
        dry_run,
        summary: &outcome.summary,
        passes: &outcome.reports,
    };
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(path, json).with_context(|| format!("Could not write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::Workspace;

    const RESOURCES: &str = r#"
[[variable]]
name = "LOG_ROOT"
scope = "cell"
cell = "C1"
value = "/var/log"
"#;

    #[test]
    fn test_dry_run_writes_a_report_without_wsadmin() {
        let ws = Workspace::new(RESOURCES);
        let report = ws.tree.root().join("report.json");
        let args = ApplyArgs {
            target: None,
            dry_run: true,
            yes: true,
            report: Some(&report),
        };
        run(&ws.context(), &args).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(json["dry_run"], true);
        assert_eq!(json["summary"]["skipped"], 1);
        let script = json["passes"][0]["script"].as_str().unwrap();
        assert!(script.contains("VariableSubstitutionEntry"));
    }

    #[test]
    fn test_missing_launcher_is_an_error() {
        let ws = Workspace::new(RESOURCES);
        let args = ApplyArgs {
            target: None,
            dry_run: false,
            yes: true,
            report: None,
        };
        let err = run(&ws.context(), &args).unwrap_err();
        assert!(err.to_string().contains("wsadmin not found"));
    }
}
