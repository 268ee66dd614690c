//! WebSphere MQ connection factory resource

use super::{Declaration, ScopeDecl, open_document};
use declarative::script::args;
use declarative::{
    Api, ApplyContext, AttrValue, BoxedResource, ChangeSet, ChangeSetBuilder, Check, CurrentState,
    Ensure, Error, FieldRule, ObjectRef, Parent, Resource, Result, ScopePath, Script,
};
use serde::{Deserialize, Serialize};
use wsadmin::{Step, files};

const PROVIDER: &str = "WebSphere MQ JMS Provider";

/// `[[mq_connection_factory]]` manifest entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqConnectionFactoryDecl {
    pub name: String,
    #[serde(flatten)]
    pub scope: ScopeDecl,
    pub jndi_name: String,
    pub qmgr_name: String,
    /// CF (unified), QCF (queue) or TCF (topic)
    #[serde(default = "default_factory_type")]
    pub factory_type: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<i64>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub transport: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ensure: Ensure,
}

fn default_factory_type() -> String {
    "CF".to_string()
}

impl Declaration for MqConnectionFactoryDecl {
    const KIND: &'static str = "mq_connection_factory";

    const RULES: &'static [FieldRule] = &[
        FieldRule::required("name", &[Check::NonEmpty, Check::NoQuote]),
        ScopeDecl::RULES[0],
        ScopeDecl::RULES[1],
        ScopeDecl::RULES[2],
        ScopeDecl::RULES[3],
        ScopeDecl::RULES[4],
        FieldRule::required("jndi_name", &[Check::NonEmpty, Check::NoQuote]),
        FieldRule::required("qmgr_name", &[Check::NonEmpty, Check::NoQuote]),
        FieldRule::required("factory_type", &[Check::OneOf(&["CF", "QCF", "TCF"])]),
        FieldRule::optional("host", &[Check::NonEmpty, Check::NoQuote]),
        FieldRule::optional("port", &[Check::Range(1, 65535)]),
        FieldRule::optional("channel", &[Check::NonEmpty, Check::NoQuote]),
        FieldRule::optional(
            "transport",
            &[Check::OneOf(&["BINDINGS", "CLIENT", "BINDINGS_THEN_CLIENT"])],
        ),
        FieldRule::optional("description", &[Check::NoQuote]),
    ];

    fn label(&self) -> String {
        self.name.clone()
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => Some(self.name.clone()),
            "jndi_name" => Some(self.jndi_name.clone()),
            "qmgr_name" => Some(self.qmgr_name.clone()),
            "factory_type" => Some(self.factory_type.clone()),
            "host" => self.host.clone(),
            "port" => self.port.map(|p| p.to_string()),
            "channel" => self.channel.clone(),
            "transport" => self.transport.clone(),
            "description" => self.description.clone(),
            other => self.scope.field(other),
        }
    }

    fn cross_checks(&self) -> Vec<String> {
        self.scope.problems()
    }

    fn build(self) -> Result<BoxedResource> {
        let scope = self.scope.resolve()?;
        Ok(Box::new(MqConnectionFactory { decl: self, scope }))
    }
}

/// A connection factory of the WebSphere MQ messaging provider
#[derive(Debug)]
pub struct MqConnectionFactory {
    decl: MqConnectionFactoryDecl,
    scope: ScopePath,
}

impl MqConnectionFactory {
    /// Configuration type stored for the declared factory type
    fn config_type(&self) -> &'static str {
        match self.decl.factory_type.as_str() {
            "QCF" => "MQQueueConnectionFactory",
            "TCF" => "MQTopicConnectionFactory",
            _ => "MQConnectionFactory",
        }
    }

    fn target(&self) -> ObjectRef {
        ObjectRef::named(&self.scope, "JMSProvider", PROVIDER)
            .join(self.config_type(), &self.decl.name)
    }
}

impl Resource for MqConnectionFactory {
    fn id(&self) -> String {
        format!("mq_connection_factory:{}:{}", self.scope, self.decl.name)
    }

    fn description(&self) -> String {
        format!(
            "MQ {} {} on queue manager {}",
            self.decl.factory_type, self.decl.jndi_name, self.decl.qmgr_name
        )
    }

    fn resource_type(&self) -> &'static str {
        "mq_connection_factory"
    }

    fn ensure(&self) -> Ensure {
        self.decl.ensure
    }

    fn read_current(&self, ctx: &ApplyContext) -> Result<Option<CurrentState>> {
        let Some(doc) = open_document(ctx, &self.scope, files::RESOURCES)? else {
            return Ok(None);
        };
        let Some(factory) = doc.find(&[
            Step::new("JMSProvider").attr("name", PROVIDER),
            Step::new("factories").attr("name", &self.decl.name),
        ]) else {
            return Ok(None);
        };

        // xmi:type="resources.jms.mqseries:MQQueueConnectionFactory"
        let config_type = factory
            .attr("type")
            .map(|t| t.rsplit(':').next().unwrap_or(t));

        Ok(Some(
            CurrentState::new()
                .with_opt("configType", config_type)
                .with_opt("jndiName", factory.attr("jndiName"))
                .with_opt("queueManager", factory.attr("queueManager"))
                .with_opt("host", factory.attr("host"))
                .with_opt("port", factory.attr("port"))
                .with_opt("channel", factory.attr("channel"))
                .with_opt("transportType", factory.attr("transportType"))
                .with("description", factory.attr("description").unwrap_or_default()),
        ))
    }

    fn record_changes(&self, builder: &mut ChangeSetBuilder) {
        let d = &self.decl;
        builder.set("configType", self.config_type());
        builder.set("jndiName", d.jndi_name.as_str());
        builder.set("queueManager", d.qmgr_name.as_str());
        builder.set_opt("host", d.host.as_deref());
        builder.set_opt("port", d.port);
        builder.set_opt("channel", d.channel.as_deref());
        builder.set_opt("transportType", d.transport.as_deref());
        builder.set_opt("description", d.description.as_deref());
    }

    fn create_script(&self) -> Result<Script> {
        let d = &self.decl;
        let mut optional: Vec<(String, AttrValue)> = Vec::new();
        let mut add = |key: &str, value: Option<AttrValue>| {
            if let Some(value) = value {
                optional.push((key.to_string(), value));
            }
        };
        add("wmqTransportType", d.transport.as_deref().map(AttrValue::from));
        add("qmgrHostname", d.host.as_deref().map(AttrValue::from));
        add("qmgrPortNumber", d.port.map(AttrValue::from));
        add("qmgrSvrconnChannel", d.channel.as_deref().map(AttrValue::from));
        add("description", d.description.as_deref().map(AttrValue::from));

        Ok(Script::builder()
            .require("qmgrName", &d.qmgr_name)
            .create(
                Api::AdminTask,
                "createWMQConnectionFactory",
                Parent::Object(ObjectRef::scope(&self.scope)),
                args([
                    ("name", d.name.as_str()),
                    ("jndiName", d.jndi_name.as_str()),
                    ("type", d.factory_type.as_str()),
                    ("qmgrName", d.qmgr_name.as_str()),
                ]),
                optional,
            )
            .build())
    }

    fn update_script(&self, changes: &ChangeSet) -> Result<Script> {
        if changes.get("configType").is_some() {
            return Err(Error::unsupported(
                self.id(),
                "changing the factory type (remove and recreate the factory)",
            ));
        }

        let attrs = changes
            .sets()
            .map(|(attr, value)| (attr.to_string(), value.clone()))
            .collect();
        Ok(Script::builder()
            .require("qmgrName", &self.decl.qmgr_name)
            .modify(self.target(), attrs)
            .build())
    }

    fn destroy_script(&self) -> Result<Script> {
        Ok(Script::builder().delete(self.target()).build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::fixtures::ConfigTree;
    use declarative::{Dialect, ResourceExt};
    use wsadmin::Jython;

    const RESOURCES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xmi:XMI xmi:version="2.0" xmlns:xmi="http://www.omg.org/XMI" xmlns:resources.jms="http://www.ibm.com/websphere/appserver/schemas/5.0/resources.jms.xmi" xmlns:resources.jms.mqseries="http://www.ibm.com/websphere/appserver/schemas/5.0/resources.jms.mqseries.xmi">
  <resources.jms:JMSProvider xmi:id="builtin_mqprovider" name="WebSphere MQ JMS Provider" description="WebSphere MQ Messaging Provider">
    <factories xmi:type="resources.jms.mqseries:MQQueueConnectionFactory" xmi:id="MQQueueConnectionFactory_1" name="ordersQCF" jndiName="jms/ordersQCF" queueManager="QM_ORDERS" host="mq01.example.com" port="1414" channel="APP.SVRCONN" transportType="CLIENT"/>
  </resources.jms:JMSProvider>
</xmi:XMI>
"#;

    fn decl() -> MqConnectionFactoryDecl {
        MqConnectionFactoryDecl {
            name: "ordersQCF".to_string(),
            scope: ScopeDecl {
                scope: "cell".to_string(),
                cell: "CELL_01".to_string(),
                ..Default::default()
            },
            jndi_name: "jms/ordersQCF".to_string(),
            qmgr_name: "QM_ORDERS".to_string(),
            factory_type: "QCF".to_string(),
            host: Some("mq01.example.com".to_string()),
            port: Some(1414),
            channel: Some("APP.SVRCONN".to_string()),
            transport: Some("CLIENT".to_string()),
            description: None,
            ensure: Ensure::Present,
        }
    }

    fn ctx_tree() -> ConfigTree {
        let tree = ConfigTree::new();
        tree.write(&ScopePath::cell("CELL_01").unwrap(), files::RESOURCES, RESOURCES);
        tree
    }

    #[test]
    fn test_empty_queue_manager_fails_validation() {
        let mut d = decl();
        d.qmgr_name = String::new();
        match d.resolve().unwrap_err() {
            Error::Validation { problems, .. } => {
                assert!(problems.iter().any(|p| p.contains("qmgr_name")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_matching_factory_is_unchanged() {
        let tree = ctx_tree();
        let ctx = ApplyContext::new(tree.root());
        let resource = decl().resolve().unwrap();
        let current = resource.read_current(&ctx).unwrap().unwrap();
        assert_eq!(
            current.get("configType"),
            Some(&AttrValue::from("MQQueueConnectionFactory"))
        );
        assert!(resource.pending_changes(&current).is_empty());
    }

    #[test]
    fn test_port_drift_modifies_the_typed_factory() {
        let tree = ctx_tree();
        let ctx = ApplyContext::new(tree.root());
        let mut d = decl();
        d.port = Some(1415);
        let resource = d.resolve().unwrap();

        let current = resource.read_current(&ctx).unwrap().unwrap();
        let changes = resource.pending_changes(&current);
        let script = Jython.render(&resource.update_script(&changes).unwrap()).unwrap();
        assert!(script.contains(
            "AdminConfig.getid('/Cell:CELL_01/JMSProvider:WebSphere MQ JMS Provider/MQQueueConnectionFactory:ordersQCF/')"
        ));
        assert!(script.contains("[['port', '1415']]"));
    }

    #[test]
    fn test_factory_type_change_is_unsupported() {
        let tree = ctx_tree();
        let ctx = ApplyContext::new(tree.root());
        let mut d = decl();
        d.factory_type = "TCF".to_string();
        let resource = d.resolve().unwrap();

        let current = resource.read_current(&ctx).unwrap().unwrap();
        let err = resource
            .update_script(&resource.pending_changes(&current))
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }

    #[test]
    fn test_create_passes_the_scope_object() {
        let resource = decl().resolve().unwrap();
        let script = Jython.render(&resource.create_script().unwrap()).unwrap();
        assert!(script.contains("parent = AdminConfig.getid('/Cell:CELL_01/')"));
        assert!(script.contains(
            "AdminTask.createWMQConnectionFactory(parent, '[-name ordersQCF -jndiName jms/ordersQCF -type QCF -qmgrName QM_ORDERS -wmqTransportType CLIENT"
        ));
    }
}
