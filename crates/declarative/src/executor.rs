//! Execution engine - reconciles every planned resource, one at a time

use crate::context::{ApplyContext, ConfirmCallback, ProgressCallback};
use crate::error::Result;
use crate::planner::ExecutionPlan;
use crate::reconcile::{PassReport, Reconciler};
use crate::types::{ExecuteOptions, ExecuteSummary};

/// Execute a plan with the given options and callbacks
///
/// Passes run sequentially in plan order; each runs at most one script.
/// The confirmation is asked once, before the first mutating pass, and
/// not at all for dry runs.
///
/// # Returns
/// Summary of execution results plus the report of every pass
pub fn execute<P, C>(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    reconciler: &Reconciler,
    ctx: &ApplyContext,
    progress: &mut P,
    confirm: &mut C,
) -> Result<(ExecuteSummary, Vec<PassReport>)>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    if plan.is_empty() {
        return Ok((ExecuteSummary::default(), Vec::new()));
    }

    if !opts.dry_run && !confirm.confirm("Apply changes?")? {
        return Ok((
            ExecuteSummary {
                skipped: plan.total_resources(),
                ..Default::default()
            },
            Vec::new(),
        ));
    }

    let ctx = ApplyContext {
        dry_run: opts.dry_run,
        verbose: opts.verbose,
        ..*ctx
    };

    let mut summary = ExecuteSummary::default();
    let mut reports = Vec::with_capacity(plan.total_resources());

    progress.on_start(plan.total_resources());
    for resource in &plan.resources {
        progress.on_resource_start(&resource.id(), &resource.description());
        let report = reconciler.reconcile(resource.as_ref(), &ctx);
        progress.on_resource_complete(&report.id, &report.result);
        summary.add_result(&report.result);
        reports.push(report);
    }
    progress.on_complete();

    Ok((summary, reports))
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or confirmation.
pub fn execute_simple(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    reconciler: &Reconciler,
    ctx: &ApplyContext,
) -> Result<(ExecuteSummary, Vec<PassReport>)> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, reconciler, ctx, &mut NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::{ChangeSet, ChangeSetBuilder};
    use crate::classify::Classifier;
    use crate::context::{AutoDecline, NoProgress, ScriptRunner};
    use crate::resource::Resource;
    use crate::script::{Dialect, ObjectRef, Script};
    use crate::scope::ScopePath;
    use crate::types::{ApplyResult, CommandOutput, CurrentState};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock runner counting invocations
    #[derive(Default)]
    struct CountingRunner {
        calls: AtomicUsize,
    }

    impl ScriptRunner for CountingRunner {
        fn run(&self, _script: &str, _run_as: Option<&str>) -> Result<CommandOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CommandOutput::ok(""))
        }
    }

    struct Plain;

    impl Dialect for Plain {
        fn render(&self, script: &Script) -> Result<String> {
            Ok(format!("{} ops", script.ops().len()))
        }
    }

    #[derive(Debug)]
    struct TestResource {
        id: String,
        should_change: bool,
    }

    impl Resource for TestResource {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn description(&self) -> String {
            format!("Test resource {}", self.id)
        }

        fn resource_type(&self) -> &'static str {
            "test"
        }

        fn read_current(&self, _ctx: &ApplyContext) -> Result<Option<CurrentState>> {
            Ok(Some(CurrentState::new().with("value", "old")))
        }

        fn record_changes(&self, builder: &mut ChangeSetBuilder) {
            builder.set("value", if self.should_change { "new" } else { "old" });
        }

        fn create_script(&self) -> Result<Script> {
            Ok(Script::default())
        }

        fn update_script(&self, changes: &ChangeSet) -> Result<Script> {
            let scope = ScopePath::cell("CELL_01")?;
            let attrs = changes
                .sets()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect();
            Ok(Script::builder()
                .modify(ObjectRef::scope(&scope), attrs)
                .build())
        }
    }

    fn plan(changes: &[bool]) -> ExecutionPlan {
        let mut plan = ExecutionPlan::new();
        for (i, should_change) in changes.iter().enumerate() {
            plan.add_resource(Box::new(TestResource {
                id: format!("test{i}"),
                should_change: *should_change,
            }));
        }
        plan
    }

    #[test]
    fn test_execute_empty_plan() {
        let runner = CountingRunner::default();
        let classifier = Classifier::new();
        let reconciler = Reconciler::new(&runner, &Plain, &classifier);
        let ctx = ApplyContext::new(Path::new("/"));

        let (summary, reports) =
            execute_simple(&ExecutionPlan::new(), &ExecuteOptions::default(), &reconciler, &ctx)
                .unwrap();
        assert_eq!(summary.total(), 0);
        assert!(reports.is_empty());
    }

    #[test]
    fn test_execute_runs_only_changed_resources() {
        let runner = CountingRunner::default();
        let classifier = Classifier::new();
        let reconciler = Reconciler::new(&runner, &Plain, &classifier);
        let ctx = ApplyContext::new(Path::new("/"));

        let (summary, reports) = execute_simple(
            &plan(&[true, false, true]),
            &ExecuteOptions::default(),
            &reconciler,
            &ctx,
        )
        .unwrap();

        assert_eq!(summary.modified, 2);
        assert_eq!(summary.no_change, 1);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(reports[1].result, ApplyResult::NoChange);
    }

    #[test]
    fn test_declined_confirmation_runs_nothing() {
        let runner = CountingRunner::default();
        let classifier = Classifier::new();
        let reconciler = Reconciler::new(&runner, &Plain, &classifier);
        let ctx = ApplyContext::new(Path::new("/"));

        let (summary, _) = execute(
            &plan(&[true]),
            &ExecuteOptions::default(),
            &reconciler,
            &ctx,
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dry_run_skips_without_confirmation() {
        let runner = CountingRunner::default();
        let classifier = Classifier::new();
        let reconciler = Reconciler::new(&runner, &Plain, &classifier);
        let ctx = ApplyContext::new(Path::new("/"));
        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };

        let (summary, reports) = execute(
            &plan(&[true]),
            &opts,
            &reconciler,
            &ctx,
            &mut NoProgress,
            &mut AutoDecline,
        )
        .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(reports[0].script.as_deref(), Some("2 ops"));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }
}
