//! Reconciliation driver
//!
//! One pass per resource:
//!
//! ```text
//! Unchecked -> Absent  -> (create)  -> Applied | Failed
//!           -> Absent  (ensure absent)           Unchanged
//!           -> Present -> (destroy) -> Applied | Failed
//!           -> Present -> no diff   -> Unchanged
//!           -> Present -> PendingApply -> (update) -> Applied | Failed
//! ```
//!
//! At most one script is executed per pass and a failed pass is never
//! retried here; the next run re-reads everything from the documents.

use crate::changeset::ChangeSet;
use crate::classify::{Classification, Classifier, FatalReason};
use crate::context::{ApplyContext, ScriptRunner};
use crate::error::Error;
use crate::resource::{Resource, ResourceExt};
use crate::script::{Dialect, Script};
use crate::types::{ApplyResult, CurrentState, Ensure, PassState};
use serde::Serialize;

/// Everything that happened during one pass
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub id: String,
    /// States visited, in order
    pub states: Vec<PassState>,
    pub result: ApplyResult,
    /// Changes recorded for an update (empty for create/destroy)
    pub changes: ChangeSet,
    /// Rendered payload, when one was emitted
    pub script: Option<String>,
    /// Raw interpreter output, when the payload was run
    pub output: Option<String>,
    pub classification: Option<Classification>,
    /// State after the pass; `None` when the object is absent
    pub current: Option<CurrentState>,
}

impl PassReport {
    fn new(id: String) -> Self {
        Self {
            id,
            states: vec![PassState::Unchecked],
            result: ApplyResult::NoChange,
            changes: ChangeSet::default(),
            script: None,
            output: None,
            classification: None,
            current: None,
        }
    }

    /// Last state visited
    pub fn state(&self) -> PassState {
        self.states.last().copied().unwrap_or(PassState::Unchecked)
    }

    fn enter(&mut self, state: PassState) {
        self.states.push(state);
    }

    fn fail(mut self, error: String, retryable: bool, hint: Option<String>) -> Self {
        self.enter(PassState::Failed);
        self.result = ApplyResult::Failed {
            error,
            retryable,
            hint,
        };
        self
    }

    fn fail_with(self, err: &Error) -> Self {
        let reason = match err {
            Error::MalformedDocument { path, message } => {
                FatalReason::MalformedDocument(format!("{}: {message}", path.display()))
            }
            Error::UnknownScope(scope) => FatalReason::UnknownScope(scope.clone()),
            _ => FatalReason::InterpreterCrash(err.to_string()),
        };
        let error = match err {
            Error::Validation { .. } | Error::Unsupported { .. } => err.to_string(),
            _ => reason.to_string(),
        };
        let mut report = self.fail(error, false, None);
        if !matches!(err, Error::Validation { .. } | Error::Unsupported { .. }) {
            report.classification = Some(Classification::Fatal(reason));
        }
        report
    }
}

/// Runs reconciliation passes against one interpreter
pub struct Reconciler<'r> {
    runner: &'r dyn ScriptRunner,
    dialect: &'r dyn Dialect,
    classifier: &'r Classifier,
}

impl<'r> Reconciler<'r> {
    pub fn new(
        runner: &'r dyn ScriptRunner,
        dialect: &'r dyn Dialect,
        classifier: &'r Classifier,
    ) -> Self {
        Self {
            runner,
            dialect,
            classifier,
        }
    }

    /// Run one full pass for a resource
    pub fn reconcile(&self, resource: &dyn Resource, ctx: &ApplyContext) -> PassReport {
        let mut report = PassReport::new(resource.id());

        let current = match resource.read_current(ctx) {
            Ok(current) => current,
            Err(e) => return report.fail_with(&e),
        };

        match (current, resource.ensure()) {
            (None, Ensure::Absent) => {
                report.enter(PassState::Absent);
                report.enter(PassState::Unchanged);
                report
            }
            (None, Ensure::Present) => {
                report.enter(PassState::Absent);
                let created = resource.pending_changes(&CurrentState::new());
                let after = CurrentState::new().with_changes(&created);
                let script = resource.create_script();
                self.run(report, script, ctx, ApplyResult::Created, Some(after))
            }
            (Some(current), Ensure::Absent) => {
                report.enter(PassState::Present);
                report.current = Some(current);
                let script = resource.destroy_script();
                self.run(report, script, ctx, ApplyResult::Removed, None)
            }
            (Some(current), Ensure::Present) => {
                report.enter(PassState::Present);
                let changes = resource.pending_changes(&current);
                if changes.is_empty() {
                    report.enter(PassState::Unchanged);
                    report.current = Some(current);
                    return report;
                }

                report.enter(PassState::PendingApply);
                let after = current.with_changes(&changes);
                let script = resource.update_script(&changes);
                report.changes = changes;
                report.current = Some(current);
                self.run(report, script, ctx, ApplyResult::Modified, Some(after))
            }
        }
    }

    /// Render a script only, for previews
    pub fn render(&self, script: &Script) -> crate::Result<String> {
        self.dialect.render(script)
    }

    fn run(
        &self,
        mut report: PassReport,
        script: crate::Result<Script>,
        ctx: &ApplyContext,
        success: ApplyResult,
        after: Option<CurrentState>,
    ) -> PassReport {
        let script = match script {
            Ok(script) => script,
            Err(e) => return report.fail_with(&e),
        };

        if script.is_empty() {
            log::debug!("{}: nothing to emit", report.id);
            report.enter(PassState::Unchanged);
            return report;
        }

        let text = match self.dialect.render(&script) {
            Ok(text) => text,
            Err(e) => return report.fail_with(&e),
        };
        log::debug!("{}: emitted script\n{}", report.id, text);
        report.script = Some(text.clone());

        if ctx.dry_run {
            report.enter(PassState::Skipped);
            report.result = ApplyResult::Skipped {
                reason: "Dry run".to_string(),
            };
            return report;
        }

        log::info!("{}: running script", report.id);
        let output = match self.runner.run(&text, ctx.run_as) {
            Ok(output) => output,
            Err(e) => return report.fail_with(&e),
        };

        let combined = output.combined();
        let classification = self.classifier.classify(&output);
        report.output = Some(combined.clone());
        report.classification = Some(classification.clone());

        match classification {
            Classification::Success => {
                log::info!("{}: applied", report.id);
                report.enter(PassState::Applied);
                report.result = success;
                report.current = after;
                report
            }
            Classification::Recoverable { reason, hint } => {
                log::warn!("{}: {} ({})", report.id, reason, hint);
                report.fail(reason.to_string(), true, Some(hint))
            }
            Classification::Fatal(reason) => {
                log::warn!("{}: {}", report.id, reason);
                report.fail(format!("{reason}\n{combined}"), false, None)
            }
        }
    }
}
