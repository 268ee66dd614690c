//! Diff display and script preview

use colored::Colorize;
use declarative::{
    DiffKind, DiffOutcome, DiffSummary, Error, Resource, ResourceDiff, Script, group_by_type,
};

/// Human-readable name of a resource type
pub fn type_label(resource_type: &str) -> &str {
    match resource_type {
        "variable" => "Variables",
        "cluster_member" => "Cluster members",
        "jvm_log" => "JVM logs",
        "jdbc_provider" => "JDBC providers",
        "jdbc_datasource" => "JDBC data sources",
        "mq_connection_factory" => "MQ connection factories",
        "group" => "Security groups",
        other => other,
    }
}

/// Split diff outcomes into diffs and read failures
pub fn partition(outcomes: Vec<DiffOutcome>) -> (Vec<ResourceDiff>, Vec<(String, Error)>) {
    let mut diffs = Vec::new();
    let mut failures = Vec::new();
    for (id, outcome) in outcomes {
        match outcome {
            Ok(Some(diff)) => diffs.push(diff),
            Ok(None) => {}
            Err(e) => failures.push((id, e)),
        }
    }
    (diffs, failures)
}

/// The script a pass would emit for this diff
pub fn script_for(resource: &dyn Resource, diff: &ResourceDiff) -> declarative::Result<Script> {
    match diff.kind {
        DiffKind::Create => resource.create_script(),
        DiffKind::Update => resource.update_script(&diff.changes),
        DiffKind::Destroy => resource.destroy_script(),
    }
}

fn describe(diff: &ResourceDiff) -> String {
    match diff.kind {
        DiffKind::Create => "(not configured)".to_string(),
        DiffKind::Destroy => "(will remove)".to_string(),
        DiffKind::Update => {
            let n = diff.changes.len();
            if n == 1 {
                "1 attribute".to_string()
            } else {
                format!("{n} attributes")
            }
        }
    }
}

/// Display a list of diffs in a user-friendly format
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    let by_type = group_by_type(diffs);
    let mut types: Vec<&String> = by_type.keys().collect();
    types.sort();

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Configuration Diff".bold()
    );
    println!("│");

    for resource_type in types {
        println!("│ {}", type_label(resource_type).bold());

        for diff in &by_type[resource_type] {
            let symbol = match diff.kind {
                DiffKind::Create => "+".green(),
                DiffKind::Destroy => "-".red(),
                DiffKind::Update => "~".yellow(),
            };

            println!(
                "│   {} {:<30} {}",
                symbol,
                diff.resource_id,
                describe(diff).dimmed()
            );
            for line in diff.change_lines() {
                println!("│       {}", line.dimmed());
            }
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to create, {} to update, {} to remove)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Display resources whose current state could not be read
pub fn display_read_failures(failures: &[(String, Error)]) {
    if failures.is_empty() {
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Unreadable Resources".red().bold()
    );
    println!("│");
    for (id, error) in failures {
        println!("│  {} {}", "✗".red(), id);
        println!("│      {}", error.to_string().dimmed());
    }
    println!("│");
    println!("└─────────────────────────────────────────────────────┘");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Manifest;
    use crate::resource::fixtures::ConfigTree;
    use declarative::{ApplyContext, Dialect, compute_diffs};
    use wsadmin::Jython;

    const MANIFEST: &str = r#"
[wsadmin]
profile_base = "/opt/IBM/WebSphere/AppServer/profiles"
dmgr_profile = "Dmgr01"

[[variable]]
name = "LOG_ROOT"
scope = "cell"
cell = "C1"
value = "/var/log"

[[variable]]
name = "APP_HOME"
scope = "cell"
cell = "C1"
value = "/opt/app"
"#;

    const VARIABLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<variables:VariableMap xmi:version="2.0" xmlns:xmi="http://www.omg.org/XMI" xmlns:variables="http://www.ibm.com/websphere/appserver/schemas/5.0/variables.xmi" xmi:id="VariableMap_1">
  <entries xmi:id="VariableSubstitutionEntry_1" symbolicName="LOG_ROOT" value="/tmp"/>
</variables:VariableMap>
"#;

    #[test]
    fn test_partition_and_preview() {
        let tree = ConfigTree::new();
        let cell = declarative::ScopePath::cell("C1").unwrap();
        tree.write(&cell, wsadmin::files::VARIABLES, VARIABLES);
        let ctx = ApplyContext::new(tree.root());

        let resources = Manifest::parse(MANIFEST).unwrap().resolve().unwrap().1;
        let (diffs, failures) = partition(compute_diffs(&resources, &ctx));
        assert!(failures.is_empty());
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].kind, DiffKind::Update);
        assert_eq!(diffs[1].kind, DiffKind::Create);
        assert_eq!(describe(&diffs[0]), "1 attribute");

        let script = script_for(resources[0].as_ref(), &diffs[0]).unwrap();
        let text = Jython.render(&script).unwrap();
        assert!(text.contains("[['value', '/var/log']]"));
    }

    #[test]
    fn test_malformed_document_is_a_read_failure() {
        let tree = ConfigTree::new();
        let cell = declarative::ScopePath::cell("C1").unwrap();
        tree.write(&cell, wsadmin::files::VARIABLES, "<variables:VariableMap");
        let ctx = ApplyContext::new(tree.root());

        let resources = Manifest::parse(MANIFEST).unwrap().resolve().unwrap().1;
        let (diffs, failures) = partition(compute_diffs(&resources, &ctx));
        assert!(diffs.is_empty());
        assert_eq!(failures.len(), 2);
    }

    #[test]
    fn test_type_labels() {
        assert_eq!(type_label("jdbc_datasource"), "JDBC data sources");
        assert_eq!(type_label("custom"), "custom");
    }
}
