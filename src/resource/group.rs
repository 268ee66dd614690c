//! Security group resource
//!
//! Groups live in the federated file registry (`fileRegistry.xml`); their
//! administrative role grants live in `admin-authz.xml`. Both membership
//! and role grants are applied incrementally and followed by a refresh of
//! the authorization cache.

use super::{Declaration, open_document};
use declarative::{
    Api, ApplyContext, AttrValue, BoxedResource, ChangeSet, ChangeSetBuilder, Check, CurrentState,
    Ensure, FieldRule, MemberDelta, Parent, Resource, Result, ScopePath, Script, ScriptBuilder,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wsadmin::{ConfigDocument, Element, Step, files};

/// Administrative roles a group can be granted
pub const ADMIN_ROLES: &[&str] = &[
    "administrator",
    "operator",
    "configurator",
    "monitor",
    "deployer",
    "adminsecuritymanager",
    "iscadmins",
    "auditor",
];

const AUTHZ_QUERY: &str = "type=AuthorizationGroupManager,*";
const AUTHZ_REFRESH: &str = "refreshAll";

/// `[[group]]` manifest entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDecl {
    pub cell: String,
    pub name: String,
    #[serde(default = "default_realm")]
    pub realm: String,
    #[serde(default)]
    pub description: Option<String>,
    /// User ids, or `cn=<group>` for nested groups
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub ensure: Ensure,
}

fn default_realm() -> String {
    "defaultWIMFileBasedRealm".to_string()
}

impl Declaration for GroupDecl {
    const KIND: &'static str = "group";

    const RULES: &'static [FieldRule] = &[
        FieldRule::required("cell", &[Check::Identifier]),
        FieldRule::required("name", &[Check::NonEmpty, Check::Identifier]),
        FieldRule::required("realm", &[Check::NonEmpty, Check::NoQuote]),
        FieldRule::optional("description", &[Check::NoQuote]),
        FieldRule::optional("members", &[Check::NoQuote]),
    ];

    fn label(&self) -> String {
        self.name.clone()
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "cell" => Some(self.cell.clone()),
            "name" => Some(self.name.clone()),
            "realm" => Some(self.realm.clone()),
            "description" => self.description.clone(),
            "members" => Some(self.members.join(",")),
            _ => None,
        }
    }

    fn cross_checks(&self) -> Vec<String> {
        self.roles
            .iter()
            .filter(|r| !ADMIN_ROLES.contains(&r.as_str()))
            .map(|r| format!("roles: unknown administrative role '{r}'"))
            .collect()
    }

    fn build(self) -> Result<BoxedResource> {
        let scope = ScopePath::cell(&self.cell)?;
        Ok(Box::new(Group { decl: self, scope }))
    }
}

/// A file registry group and its administrative role grants
#[derive(Debug)]
pub struct Group {
    decl: GroupDecl,
    scope: ScopePath,
}

impl Group {
    fn unique_name(&self) -> String {
        format!("cn={},o={}", self.decl.name, self.decl.realm)
    }

    fn member_unique_name(&self, member: &str) -> String {
        if member.contains('=') {
            format!("{member},o={}", self.decl.realm)
        } else {
            format!("uid={member},o={}", self.decl.realm)
        }
    }

    fn group_id(&self) -> AttrValue {
        AttrValue::List(vec![format!("{}@{}", self.decl.name, self.decl.realm)])
    }

    fn membership(&self, builder: ScriptBuilder, delta: &MemberDelta) -> ScriptBuilder {
        let group = self.unique_name();
        let mut builder = builder;
        for (command, members) in [
            ("addMemberToGroup", &delta.additions),
            ("removeMemberFromGroup", &delta.removals),
        ] {
            for member in members {
                builder = builder.invoke(
                    command,
                    vec![
                        (
                            "memberUniqueName".to_string(),
                            AttrValue::Str(self.member_unique_name(member)),
                        ),
                        ("groupUniqueName".to_string(), AttrValue::Str(group.clone())),
                    ],
                );
            }
        }
        builder
    }

    fn grants(&self, builder: ScriptBuilder, delta: &MemberDelta) -> ScriptBuilder {
        let mut builder = builder;
        for (command, roles) in [
            ("mapGroupsToAdminRole", &delta.additions),
            ("removeGroupsFromAdminRole", &delta.removals),
        ] {
            for role in roles {
                builder = builder.invoke(
                    command,
                    vec![
                        ("roleName".to_string(), AttrValue::Str(role.clone())),
                        ("groupids".to_string(), self.group_id()),
                    ],
                );
            }
        }
        builder
    }
}

/// Value of the first RDN, keeping the `cn=` prefix for nested groups
fn member_name(unique_name: &str) -> String {
    let rdn = unique_name.split(',').next().unwrap_or(unique_name);
    match rdn.split_once('=') {
        Some((key, value)) if key.eq_ignore_ascii_case("uid") => value.to_string(),
        _ => rdn.to_string(),
    }
}

/// Roles granted to `group` in an authorization table
fn granted_roles(authz: &ConfigDocument, group: &str) -> Vec<String> {
    let names: HashMap<&str, &str> = authz
        .find_all(&[Step::new("roles")])
        .into_iter()
        .filter_map(|role| Some((role.attr("id")?, role.attr("roleName")?)))
        .collect();

    let role_ref = |assignment: &Element| -> Option<String> {
        // Either role="SecurityRoleExt_1" or <role href="...#SecurityRoleExt_1"/>
        let id = match assignment.attr("role") {
            Some(id) => id,
            None => assignment.child("role")?.attr("href")?.rsplit('#').next()?,
        };
        names.get(id).map(|name| name.to_string())
    };

    authz
        .find_all(&[Step::new("authorizations")])
        .into_iter()
        .filter(|a| a.children_named("groups").any(|g| g.attr("name") == Some(group)))
        .filter_map(role_ref)
        .collect()
}

impl Resource for Group {
    fn id(&self) -> String {
        format!("group:{}:{}", self.scope, self.decl.name)
    }

    fn description(&self) -> String {
        format!("Group {} in {}", self.decl.name, self.decl.realm)
    }

    fn resource_type(&self) -> &'static str {
        "group"
    }

    fn ensure(&self) -> Ensure {
        self.decl.ensure
    }

    fn read_current(&self, ctx: &ApplyContext) -> Result<Option<CurrentState>> {
        let Some(registry) = open_document(ctx, &self.scope, files::FILE_REGISTRY)? else {
            return Ok(None);
        };
        let Some(group) = registry.find(&[Step::new("entities")
            .attr("type", "wim:Group")
            .child_text("cn", &self.decl.name)])
        else {
            return Ok(None);
        };

        let members: Vec<String> = group
            .children_named("members")
            .filter_map(|m| m.child("identifier")?.attr("uniqueName"))
            .map(member_name)
            .collect();
        let description = group
            .child("description")
            .map(|d| d.text().to_string())
            .unwrap_or_default();
        let roles = match open_document(ctx, &self.scope, files::ADMIN_AUTHZ)? {
            Some(authz) => granted_roles(&authz, &self.decl.name),
            None => Vec::new(),
        };

        Ok(Some(
            CurrentState::new()
                .with("description", description)
                .with("members", AttrValue::List(members))
                .with("roles", AttrValue::List(roles)),
        ))
    }

    fn record_changes(&self, builder: &mut ChangeSetBuilder) {
        builder.set_opt("description", self.decl.description.as_deref());
        builder.set_members("members", &self.decl.members);
        builder.set_members("roles", &self.decl.roles);
        builder.mark_security("members");
        builder.mark_security("roles");
    }

    fn create_script(&self) -> Result<Script> {
        let d = &self.decl;
        let optional = match &d.description {
            Some(description) => vec![(
                "description".to_string(),
                AttrValue::from(description.as_str()),
            )],
            None => Vec::new(),
        };

        let mut builder = Script::builder().create(
            Api::AdminTask,
            "createGroup",
            Parent::None,
            vec![("cn".to_string(), AttrValue::from(d.name.as_str()))],
            optional,
        );
        builder = self.membership(builder, &MemberDelta::compute(&d.members, &[]));
        builder = self.grants(builder, &MemberDelta::compute(&d.roles, &[]));
        if !d.members.is_empty() || !d.roles.is_empty() {
            builder = builder.refresh(AUTHZ_QUERY, AUTHZ_REFRESH);
        }
        Ok(builder.build())
    }

    fn update_script(&self, changes: &ChangeSet) -> Result<Script> {
        let mut builder = Script::builder();
        for (attr, value) in changes.sets() {
            if attr == "description" {
                builder = builder.invoke(
                    "updateGroup",
                    vec![
                        ("groupUniqueName".to_string(), AttrValue::Str(self.unique_name())),
                        ("description".to_string(), value.clone()),
                    ],
                );
            }
        }
        for (attr, delta) in changes.memberships() {
            builder = match attr {
                "members" => self.membership(builder, delta),
                "roles" => self.grants(builder, delta),
                _ => builder,
            };
        }
        if changes.touches_security() {
            builder = builder.refresh(AUTHZ_QUERY, AUTHZ_REFRESH);
        }
        Ok(builder.build())
    }

    fn destroy_script(&self) -> Result<Script> {
        Ok(Script::builder()
            .invoke(
                "deleteGroup",
                vec![("uniqueName".to_string(), AttrValue::Str(self.unique_name()))],
            )
            .refresh(AUTHZ_QUERY, AUTHZ_REFRESH)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::fixtures::ConfigTree;
    use declarative::{Dialect, Error, Op, ResourceExt};
    use wsadmin::Jython;

    const REGISTRY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sdo:datagraph xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:sdo="commonj.sdo" xmlns:wim="http://www.ibm.com/websphere/wim">
  <wim:Root>
    <wim:entities xsi:type="wim:PersonAccount">
      <wim:identifier uniqueId="a1" uniqueName="uid=alice,o=defaultWIMFileBasedRealm"/>
      <wim:uid>alice</wim:uid>
      <wim:cn>Alice</wim:cn>
    </wim:entities>
    <wim:entities xsi:type="wim:Group">
      <wim:identifier uniqueId="g1" uniqueName="cn=wasadmins,o=defaultWIMFileBasedRealm"/>
      <wim:members>
        <wim:identifier uniqueName="uid=alice,o=defaultWIMFileBasedRealm"/>
      </wim:members>
      <wim:members>
        <wim:identifier uniqueName="uid=carol,o=defaultWIMFileBasedRealm"/>
      </wim:members>
      <wim:cn>wasadmins</wim:cn>
      <wim:description>WAS administrators</wim:description>
    </wim:entities>
  </wim:Root>
</sdo:datagraph>
"#;

    const AUTHZ: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rolebasedauthz:AuthorizationTableExt xmi:version="2.0" xmlns:xmi="http://www.omg.org/XMI" xmlns:rolebasedauthz="http://www.ibm.com/websphere/appserver/schemas/5.0/rolebasedauthz.xmi" xmi:id="AuthorizationTableExt_1" context="domain:">
  <authorizations xmi:id="RoleAssignmentExt_1" role="SecurityRoleExt_1">
    <groups xmi:id="GroupExt_1" name="wasadmins" accessId="group:defaultWIMFileBasedRealm/cn=wasadmins,o=defaultWIMFileBasedRealm"/>
  </authorizations>
  <authorizations xmi:id="RoleAssignmentExt_4" role="SecurityRoleExt_4"/>
  <roles xmi:id="SecurityRoleExt_1" roleName="administrator"/>
  <roles xmi:id="SecurityRoleExt_4" roleName="monitor"/>
</rolebasedauthz:AuthorizationTableExt>
"#;

    fn decl() -> GroupDecl {
        GroupDecl {
            cell: "CELL_01".to_string(),
            name: "wasadmins".to_string(),
            realm: default_realm(),
            description: Some("WAS administrators".to_string()),
            members: vec!["alice".to_string(), "carol".to_string()],
            roles: vec!["administrator".to_string()],
            ensure: Ensure::Present,
        }
    }

    fn tree() -> ConfigTree {
        let tree = ConfigTree::new();
        let cell = ScopePath::cell("CELL_01").unwrap();
        tree.write(&cell, files::FILE_REGISTRY, REGISTRY);
        tree.write(&cell, files::ADMIN_AUTHZ, AUTHZ);
        tree
    }

    fn commands(script: &Script) -> Vec<String> {
        script
            .ops()
            .iter()
            .map(|op| match op {
                Op::Create { command, .. } | Op::Invoke { command, .. } => command.clone(),
                Op::Save => "save".to_string(),
                Op::Refresh { operation, .. } => operation.clone(),
                other => format!("{other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_reads_members_and_roles() {
        let tree = tree();
        let ctx = ApplyContext::new(tree.root());
        let resource = decl().resolve().unwrap();

        let current = resource.read_current(&ctx).unwrap().unwrap();
        assert_eq!(
            current.get("members"),
            Some(&AttrValue::List(vec!["alice".into(), "carol".into()]))
        );
        assert_eq!(
            current.get("roles"),
            Some(&AttrValue::List(vec!["administrator".into()]))
        );
        assert!(resource.pending_changes(&current).is_empty());
    }

    #[test]
    fn test_membership_delta_refreshes_after_save() {
        let tree = tree();
        let ctx = ApplyContext::new(tree.root());
        let mut d = decl();
        d.members = vec!["alice".to_string(), "bob".to_string()];
        let resource = d.resolve().unwrap();

        let current = resource.read_current(&ctx).unwrap().unwrap();
        let changes = resource.pending_changes(&current);
        assert!(changes.touches_security());

        let script = resource.update_script(&changes).unwrap();
        assert_eq!(
            commands(&script),
            ["addMemberToGroup", "removeMemberFromGroup", "save", "refreshAll"]
        );

        let text = Jython.render(&script).unwrap();
        assert!(text.contains(
            "AdminTask.addMemberToGroup('[-memberUniqueName uid=bob,o=defaultWIMFileBasedRealm -groupUniqueName cn=wasadmins,o=defaultWIMFileBasedRealm]')"
        ));
        assert!(text.ends_with(
            "for mbean in AdminControl.queryNames('type=AuthorizationGroupManager,*').splitlines():\n    AdminControl.invoke(mbean, 'refreshAll')\n"
        ));
    }

    #[test]
    fn test_description_change_needs_no_refresh() {
        let tree = tree();
        let ctx = ApplyContext::new(tree.root());
        let mut d = decl();
        d.description = Some("Cell administrators".to_string());
        let resource = d.resolve().unwrap();

        let current = resource.read_current(&ctx).unwrap().unwrap();
        let changes = resource.pending_changes(&current);
        assert!(!changes.touches_security());
        let script = resource.update_script(&changes).unwrap();
        assert_eq!(commands(&script), ["updateGroup", "save"]);
    }

    #[test]
    fn test_role_grant_and_revoke() {
        let tree = tree();
        let ctx = ApplyContext::new(tree.root());
        let mut d = decl();
        d.roles = vec!["monitor".to_string()];
        let resource = d.resolve().unwrap();

        let current = resource.read_current(&ctx).unwrap().unwrap();
        let script = resource
            .update_script(&resource.pending_changes(&current))
            .unwrap();
        let text = Jython.render(&script).unwrap();
        assert!(text.contains(
            "AdminTask.mapGroupsToAdminRole('[-roleName monitor -groupids [wasadmins@defaultWIMFileBasedRealm]]')"
        ));
        assert!(text.contains(
            "AdminTask.removeGroupsFromAdminRole('[-roleName administrator -groupids [wasadmins@defaultWIMFileBasedRealm]]')"
        ));
    }

    #[test]
    fn test_new_group_is_created_then_populated() {
        let tree = tree();
        let ctx = ApplyContext::new(tree.root());
        let mut d = decl();
        d.name = "deployers".to_string();
        d.members = vec!["alice".to_string()];
        d.roles = vec!["deployer".to_string()];
        let resource = d.resolve().unwrap();
        assert!(resource.read_current(&ctx).unwrap().is_none());

        let script = resource.create_script().unwrap();
        assert_eq!(
            commands(&script),
            [
                "createGroup",
                "addMemberToGroup",
                "mapGroupsToAdminRole",
                "save",
                "refreshAll"
            ]
        );
    }

    #[test]
    fn test_unknown_role_fails_validation() {
        let mut d = decl();
        d.roles = vec!["superuser".to_string()];
        assert!(d.resolve().unwrap_err().is_validation());
    }

    #[test]
    fn test_unknown_role_is_reported_with_field_problems() {
        let mut d = decl();
        d.realm = String::new();
        d.roles = vec!["monitor".to_string(), "superuser".to_string()];
        match d.resolve().unwrap_err() {
            Error::Validation { problems, .. } => assert_eq!(
                problems,
                vec![
                    "realm must not be empty".to_string(),
                    "roles: unknown administrative role 'superuser'".to_string(),
                ]
            ),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_member_names() {
        assert_eq!(member_name("uid=alice,o=defaultWIMFileBasedRealm"), "alice");
        assert_eq!(member_name("cn=ops,o=defaultWIMFileBasedRealm"), "cn=ops");
    }
}
