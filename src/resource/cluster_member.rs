//! Cluster member resource
//!
//! Membership lives in the cluster's `cluster.xml`; the member's JVM
//! settings live in its own `server.xml`.

use super::{Declaration, default_true, open_document};
use declarative::script::args;
use declarative::{
    Api, ApplyContext, AttrValue, BoxedResource, ChangeSet, ChangeSetBuilder, Check, CurrentState,
    Ensure, FieldRule, ObjectRef, Parent, Resource, Result, ScopeKind, ScopePath, Script,
};
use serde::{Deserialize, Serialize};
use wsadmin::{Step, files};

const DEFAULT_WEIGHT: i64 = 2;

/// JVM attributes managed alongside membership
const HEAP_ATTRS: [&str; 2] = ["initialHeapSize", "maximumHeapSize"];

/// `[[cluster_member]]` manifest entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterMemberDecl {
    pub cell: String,
    pub cluster: String,
    pub node: String,
    /// Name of the member server
    pub server: String,
    #[serde(default)]
    pub weight: Option<i64>,
    #[serde(default = "default_true")]
    pub gen_unique_ports: bool,
    #[serde(default)]
    pub replicator_entry: bool,
    /// Server template used when this is the first member of the cluster
    #[serde(default)]
    pub template_name: Option<String>,
    /// Initial heap in MB
    #[serde(default)]
    pub jvm_initial_heap: Option<i64>,
    /// Maximum heap in MB
    #[serde(default)]
    pub jvm_max_heap: Option<i64>,
    #[serde(default)]
    pub ensure: Ensure,
}

impl Declaration for ClusterMemberDecl {
    const KIND: &'static str = "cluster_member";

    const RULES: &'static [FieldRule] = &[
        FieldRule::required("cell", &[Check::Identifier]),
        FieldRule::required("cluster", &[Check::Identifier]),
        FieldRule::required("node", &[Check::Identifier]),
        FieldRule::required("server", &[Check::Identifier]),
        FieldRule::optional("weight", &[Check::Range(0, 100)]),
        FieldRule::optional("template_name", &[Check::NonEmpty, Check::NoQuote]),
        FieldRule::optional("jvm_initial_heap", &[Check::Range(1, 262_144)]),
        FieldRule::optional("jvm_max_heap", &[Check::Range(1, 262_144)]),
    ];

    fn label(&self) -> String {
        format!("{}/{}", self.cluster, self.server)
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "cell" => Some(self.cell.clone()),
            "cluster" => Some(self.cluster.clone()),
            "node" => Some(self.node.clone()),
            "server" => Some(self.server.clone()),
            "weight" => self.weight.map(|w| w.to_string()),
            "template_name" => self.template_name.clone(),
            "jvm_initial_heap" => self.jvm_initial_heap.map(|h| h.to_string()),
            "jvm_max_heap" => self.jvm_max_heap.map(|h| h.to_string()),
            _ => None,
        }
    }

    fn build(self) -> Result<BoxedResource> {
        let cluster = ScopePath::derive(
            ScopeKind::Cluster,
            &self.cell,
            Some(&self.cluster),
            None,
            None,
        )?;
        let server = ScopePath::server(&self.cell, &self.node, &self.server)?;
        Ok(Box::new(ClusterMember {
            decl: self,
            cluster,
            server,
        }))
    }
}

/// A server that is a member of a cluster
#[derive(Debug)]
pub struct ClusterMember {
    decl: ClusterMemberDecl,
    cluster: ScopePath,
    server: ScopePath,
}

impl ClusterMember {
    fn jvm(&self) -> ObjectRef {
        ObjectRef::scope(&self.server).child("JavaVirtualMachine")
    }

    fn member(&self) -> ObjectRef {
        ObjectRef::named(&self.cluster, "ClusterMember", &self.decl.server)
    }

    fn heap(&self) -> Vec<(String, AttrValue)> {
        let mut attrs = Vec::new();
        if let Some(initial) = self.decl.jvm_initial_heap {
            attrs.push((HEAP_ATTRS[0].to_string(), AttrValue::Int(initial)));
        }
        if let Some(max) = self.decl.jvm_max_heap {
            attrs.push((HEAP_ATTRS[1].to_string(), AttrValue::Int(max)));
        }
        attrs
    }
}

impl Resource for ClusterMember {
    fn id(&self) -> String {
        format!(
            "cluster_member:{}:{}/{}",
            self.cluster, self.decl.node, self.decl.server
        )
    }

    fn description(&self) -> String {
        format!(
            "Member {} on {} of cluster {}",
            self.decl.server, self.decl.node, self.decl.cluster
        )
    }

    fn resource_type(&self) -> &'static str {
        "cluster_member"
    }

    fn ensure(&self) -> Ensure {
        self.decl.ensure
    }

    fn read_current(&self, ctx: &ApplyContext) -> Result<Option<CurrentState>> {
        let Some(cluster) = open_document(ctx, &self.cluster, files::CLUSTER)? else {
            return Ok(None);
        };
        let Some(member) = cluster.find(&[Step::new("members")
            .attr("memberName", &self.decl.server)
            .attr("nodeName", &self.decl.node)])
        else {
            return Ok(None);
        };

        let mut state = CurrentState::new().with(
            "weight",
            member.attr("weight").unwrap_or_default().to_string(),
        );

        if let Some(server) = open_document(ctx, &self.server, files::SERVER)?
            && let Some(jvm) = server.find(&[Step::new("jvmEntries")])
        {
            for attr in HEAP_ATTRS {
                state = state.with_opt(attr, jvm.attr(attr));
            }
        }
        Ok(Some(state))
    }

    fn record_changes(&self, builder: &mut ChangeSetBuilder) {
        builder.set_opt("weight", self.decl.weight);
        for (attr, value) in self.heap() {
            builder.set(&attr, value);
        }
    }

    fn create_script(&self) -> Result<Script> {
        let d = &self.decl;
        let member_config = AttrValue::Pairs(vec![
            ("memberNode".to_string(), d.node.clone()),
            ("memberName".to_string(), d.server.clone()),
            (
                "memberWeight".to_string(),
                d.weight.unwrap_or(DEFAULT_WEIGHT).to_string(),
            ),
            ("genUniquePorts".to_string(), d.gen_unique_ports.to_string()),
            ("replicatorEntry".to_string(), d.replicator_entry.to_string()),
        ]);
        let optional = match &d.template_name {
            Some(template) => vec![(
                "firstMember".to_string(),
                AttrValue::Pairs(vec![("templateName".to_string(), template.clone())]),
            )],
            None => Vec::new(),
        };

        Ok(Script::builder()
            .create(
                Api::AdminTask,
                "createClusterMember",
                Parent::None,
                vec![
                    ("clusterName".to_string(), AttrValue::from(d.cluster.as_str())),
                    ("memberConfig".to_string(), member_config),
                ],
                optional,
            )
            .modify(self.jvm(), self.heap())
            .build())
    }

    fn update_script(&self, changes: &ChangeSet) -> Result<Script> {
        let (heap, member): (Vec<_>, Vec<_>) = changes
            .sets()
            .map(|(attr, value)| (attr.to_string(), value.clone()))
            .partition(|(attr, _)| HEAP_ATTRS.contains(&attr.as_str()));

        Ok(Script::builder()
            .modify(self.member(), member)
            .modify(self.jvm(), heap)
            .build())
    }

    fn destroy_script(&self) -> Result<Script> {
        Ok(Script::builder()
            .invoke(
                "deleteClusterMember",
                args([
                    ("clusterName", self.decl.cluster.as_str()),
                    ("memberNode", self.decl.node.as_str()),
                    ("memberName", self.decl.server.as_str()),
                ]),
            )
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::fixtures::ConfigTree;
    use declarative::{Dialect, ResourceExt};
    use wsadmin::Jython;

    const CLUSTER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<topology.cluster:ServerCluster xmi:version="2.0" xmlns:xmi="http://www.omg.org/XMI" xmlns:topology.cluster="http://www.ibm.com/websphere/appserver/schemas/5.0/topology.cluster.xmi" xmi:id="ServerCluster_1" name="CLUSTER_01" nodeGroupName="DefaultNodeGroup">
  <members xmi:id="ClusterMember_1" memberName="SRV_01" nodeName="NODE_01" weight="2" uniqueId="1700000000001"/>
</topology.cluster:ServerCluster>
"#;

    const SERVER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<process:Server xmi:version="2.0" xmlns:xmi="http://www.omg.org/XMI" xmlns:process="http://www.ibm.com/websphere/appserver/schemas/5.0/process.xmi" xmlns:processexec="http://www.ibm.com/websphere/appserver/schemas/5.0/processexec.xmi" xmi:id="Server_1" name="SRV_01" clusterName="CLUSTER_01">
  <processDefinitions xmi:type="processexec:JavaProcessDef" xmi:id="JavaProcessDef_1">
    <jvmEntries xmi:id="JavaVirtualMachine_1" verboseModeGarbageCollection="false" initialHeapSize="256" maximumHeapSize="256"/>
  </processDefinitions>
</process:Server>
"#;

    fn decl() -> ClusterMemberDecl {
        ClusterMemberDecl {
            cell: "CELL_01".to_string(),
            cluster: "CLUSTER_01".to_string(),
            node: "NODE_01".to_string(),
            server: "SRV_01".to_string(),
            weight: Some(2),
            gen_unique_ports: true,
            replicator_entry: false,
            template_name: None,
            jvm_initial_heap: Some(256),
            jvm_max_heap: Some(256),
            ensure: Ensure::Present,
        }
    }

    fn tree() -> ConfigTree {
        let tree = ConfigTree::new();
        let cluster =
            ScopePath::derive(ScopeKind::Cluster, "CELL_01", Some("CLUSTER_01"), None, None)
                .unwrap();
        tree.write(&cluster, files::CLUSTER, CLUSTER);
        tree.write(
            &ScopePath::server("CELL_01", "NODE_01", "SRV_01").unwrap(),
            files::SERVER,
            SERVER,
        );
        tree
    }

    #[test]
    fn test_member_in_sync() {
        let tree = tree();
        let ctx = ApplyContext::new(tree.root());
        let resource = decl().resolve().unwrap();
        let current = resource.read_current(&ctx).unwrap().unwrap();
        assert!(resource.pending_changes(&current).is_empty());
    }

    #[test]
    fn test_heap_change_modifies_only_the_jvm() {
        let tree = tree();
        let ctx = ApplyContext::new(tree.root());
        let mut d = decl();
        d.jvm_max_heap = Some(512);
        let resource = d.resolve().unwrap();

        let current = resource.read_current(&ctx).unwrap().unwrap();
        let changes = resource.pending_changes(&current);
        assert_eq!(changes.len(), 1);

        let script = Jython.render(&resource.update_script(&changes).unwrap()).unwrap();
        assert_eq!(
            script,
            "target = AdminConfig.getid('/Cell:CELL_01/Node:NODE_01/Server:SRV_01/')\n\
             if not target:\n    raise Exception('/Cell:CELL_01/Node:NODE_01/Server:SRV_01/ not found')\n\
             target = (AdminConfig.list('JavaVirtualMachine', target).splitlines() or [''])[0]\n\
             if not target:\n    raise Exception('JavaVirtualMachine not found')\n\
             AdminConfig.modify(target, [['maximumHeapSize', '512']])\n\
             \n\
             AdminConfig.save()\n"
        );
    }

    #[test]
    fn test_missing_member_is_created_with_member_config() {
        let tree = tree();
        let ctx = ApplyContext::new(tree.root());
        let mut d = decl();
        d.server = "SRV_02".to_string();
        d.jvm_initial_heap = None;
        d.jvm_max_heap = None;
        let resource = d.resolve().unwrap();
        assert!(resource.read_current(&ctx).unwrap().is_none());

        let script = Jython.render(&resource.create_script().unwrap()).unwrap();
        assert_eq!(
            script,
            "AdminTask.createClusterMember('[-clusterName CLUSTER_01 -memberConfig \
             [-memberNode NODE_01 -memberName SRV_02 -memberWeight 2 -genUniquePorts true \
             -replicatorEntry false]]')\n\nAdminConfig.save()\n"
        );
    }

    #[test]
    fn test_missing_cluster_document_is_absent() {
        let tree = ConfigTree::new();
        let ctx = ApplyContext::new(tree.root());
        let resource = decl().resolve().unwrap();
        assert!(resource.read_current(&ctx).unwrap().is_none());
    }

    #[test]
    fn test_destroy_uses_the_task() {
        let mut d = decl();
        d.ensure = Ensure::Absent;
        let resource = d.resolve().unwrap();
        let script = Jython.render(&resource.destroy_script().unwrap()).unwrap();
        assert!(script.starts_with(
            "AdminTask.deleteClusterMember('[-clusterName CLUSTER_01 -memberNode NODE_01 -memberName SRV_01]')"
        ));
    }
}
