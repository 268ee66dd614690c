//! Execution planner - turns loaded resources into an ordered plan

use declarative::{BoxedResource, ExecutionPlan};

/// Resource types and the group aliases accepted as a target
pub const TARGETS: &[&str] = &[
    "variable",
    "cluster_member",
    "jvm_log",
    "jdbc_provider",
    "jdbc_datasource",
    "mq_connection_factory",
    "group",
    "jdbc",
    "jms",
    "mq",
    "security",
];

/// Build a plan from resources already in dependency order.
///
/// `target` is `type` or `type.name`, as accepted by the CLI.
pub fn build_plan(resources: Vec<BoxedResource>, target: Option<&str>) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new();
    for resource in resources {
        plan.add_resource(resource);
    }
    let plan = plan.filter_by_target(target);
    log::debug!("planned {} resources (target: {:?})", plan.total_resources(), target);
    plan
}

/// Whether the type part of a target names anything
pub fn is_known_target(target: &str) -> bool {
    let kind = target.split_once('.').map_or(target, |(kind, _)| kind);
    TARGETS.contains(&kind)
}
