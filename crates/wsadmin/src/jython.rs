//! Jython rendering of remote-operation scripts
//!
//! Every operation becomes one block and blocks are separated by a blank
//! line. Object lookups assign to a local name and raise immediately when
//! the id comes back empty, so a missing parent never turns into a
//! cell-wide `AdminConfig.list`.
//!
//! Values are interpolated as-is. String literals use `'` and task
//! arguments are wrapped in `"` when they contain whitespace; values
//! carrying either character will produce a broken script. Declarations
//! are checked for the quote character when they are loaded.

use declarative::{
    Api, AttrValue, Dialect, Error, ObjectRef, Op, Parent, Result, ScopeKind, ScopePath, Script,
};

/// Jython dialect for `wsadmin -lang jython`
#[derive(Debug, Clone, Copy, Default)]
pub struct Jython;

impl Dialect for Jython {
    fn render(&self, script: &Script) -> Result<String> {
        let blocks = script
            .ops()
            .iter()
            .map(render_op)
            .collect::<Result<Vec<_>>>()?;
        Ok(format!("{}\n", blocks.join("\n\n")))
    }
}

fn render_op(op: &Op) -> Result<String> {
    let mut lines = Vec::new();

    match op {
        Op::Require { label, value } => {
            lines.push(format!("if not '{value}'.strip():"));
            lines.push(format!("    raise Exception('{label} must not be empty')"));
        }
        Op::Create {
            api: Api::AdminTask,
            command,
            parent,
            required,
            optional,
        } => {
            let mut args: Vec<(&str, AttrValue)> = Vec::new();
            if let Parent::ScopeArg(scope) = parent {
                args.push(("scope", AttrValue::Str(scope_arg(scope))));
            }
            args.extend(
                required
                    .iter()
                    .chain(optional)
                    .map(|(k, v)| (k.as_str(), v.clone())),
            );
            let rendered = task_args(args.iter().map(|(k, v)| (*k, v)));

            match parent {
                Parent::Object(reference) => {
                    resolve(reference, "parent", &mut lines);
                    lines.push(format!("AdminTask.{command}(parent, '{rendered}')"));
                }
                Parent::None | Parent::ScopeArg(_) => {
                    lines.push(format!("AdminTask.{command}('{rendered}')"));
                }
            }
        }
        Op::Create {
            api: Api::AdminConfig,
            command,
            parent,
            required,
            optional,
        } => {
            let parent = match parent {
                Parent::Object(reference) => reference.clone(),
                Parent::ScopeArg(scope) => ObjectRef::scope(scope),
                Parent::None => {
                    return Err(Error::unsupported(
                        command.clone(),
                        "AdminConfig.create without a parent",
                    ));
                }
            };
            resolve(&parent, "parent", &mut lines);
            let attrs = config_attrs(
                required
                    .iter()
                    .chain(optional)
                    .map(|(k, v)| (k.as_str(), v)),
            );
            lines.push(format!("AdminConfig.create('{command}', parent, {attrs})"));
        }
        Op::Modify { target, attrs } => {
            resolve(target, "target", &mut lines);
            let attrs = config_attrs(attrs.iter().map(|(k, v)| (k.as_str(), v)));
            lines.push(format!("AdminConfig.modify(target, {attrs})"));
        }
        Op::Invoke { command, args } => {
            let rendered = task_args(args.iter().map(|(k, v)| (k.as_str(), v)));
            lines.push(format!("AdminTask.{command}('{rendered}')"));
        }
        Op::Delete { target } => {
            resolve(target, "target", &mut lines);
            lines.push("AdminConfig.remove(target)".to_string());
        }
        Op::Save => lines.push("AdminConfig.save()".to_string()),
        Op::Refresh { query, operation } => {
            lines.push(format!(
                "for mbean in AdminControl.queryNames('{query}').splitlines():"
            ));
            lines.push(format!("    AdminControl.invoke(mbean, '{operation}')"));
        }
    }

    Ok(lines.join("\n"))
}

/// Assign the configuration id of `reference` to `var`, raising when empty
fn resolve(reference: &ObjectRef, var: &str, lines: &mut Vec<String>) {
    match reference {
        ObjectRef::Path { scope, chain } => {
            let path = containment_path(scope, chain);
            lines.push(format!("{var} = AdminConfig.getid('{path}')"));
            guard(var, &path, lines);
        }
        ObjectRef::Attribute { parent, attr } => {
            resolve(parent, var, lines);
            lines.push(format!("{var} = AdminConfig.showAttribute({var}, '{attr}')"));
            guard(var, attr, lines);
        }
        ObjectRef::Child {
            parent,
            kind,
            filter,
        } => {
            resolve(parent, var, lines);
            match filter {
                Some((attr, value)) => lines.push(format!(
                    "{var} = ([o for o in AdminConfig.list('{kind}', {var}).splitlines() \
                     if AdminConfig.showAttribute(o, '{attr}') == '{value}'] or [''])[0]"
                )),
                None => lines.push(format!(
                    "{var} = (AdminConfig.list('{kind}', {var}).splitlines() or [''])[0]"
                )),
            }
            guard(var, kind, lines);
        }
    }
}

fn guard(var: &str, what: &str, lines: &mut Vec<String>) {
    lines.push(format!("if not {var}:"));
    lines.push(format!("    raise Exception('{what} not found')"));
}

/// Containment path type names
fn path_type(kind: ScopeKind) -> &'static str {
    match kind {
        ScopeKind::Cell => "Cell",
        ScopeKind::Cluster => "ServerCluster",
        ScopeKind::Node => "Node",
        ScopeKind::Server => "Server",
    }
}

/// `/Cell:C/Node:N/Server:S/JDBCProvider:Oracle/`
fn containment_path(scope: &ScopePath, chain: &[(String, String)]) -> String {
    let mut path = String::from("/");
    for (kind, name) in scope.segments() {
        path.push_str(&format!("{}:{name}/", path_type(kind)));
    }
    for (kind, name) in chain {
        path.push_str(&format!("{kind}:{name}/"));
    }
    path
}

/// `Cell=C,Node=N,Server=S`, as taken by `-scope`
fn scope_arg(scope: &ScopePath) -> String {
    scope
        .segments()
        .into_iter()
        .map(|(kind, name)| {
            let key = match kind {
                ScopeKind::Cell => "Cell",
                ScopeKind::Cluster => "Cluster",
                ScopeKind::Node => "Node",
                ScopeKind::Server => "Server",
            };
            format!("{key}={name}")
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn task_word(value: &str) -> String {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

fn task_value(value: &AttrValue) -> String {
    match value {
        AttrValue::List(items) => format!(
            "[{}]",
            items.iter().map(|i| task_word(i)).collect::<Vec<_>>().join(" ")
        ),
        AttrValue::Pairs(pairs) => format!(
            "[{}]",
            pairs
                .iter()
                .map(|(k, v)| format!("-{k} {}", task_word(v)))
                .collect::<Vec<_>>()
                .join(" ")
        ),
        scalar => task_word(&scalar.as_text()),
    }
}

/// `[-name Oracle -description "Main pool"]`
fn task_args<'a>(args: impl Iterator<Item = (&'a str, &'a AttrValue)>) -> String {
    let rendered: Vec<String> = args
        .map(|(k, v)| format!("-{k} {}", task_value(v)))
        .collect();
    format!("[{}]", rendered.join(" "))
}

fn config_value(value: &AttrValue) -> String {
    match value {
        AttrValue::List(items) => format!(
            "[{}]",
            items
                .iter()
                .map(|i| format!("'{i}'"))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        AttrValue::Pairs(pairs) => format!(
            "[{}]",
            pairs
                .iter()
                .map(|(k, v)| format!("['{k}', '{v}']"))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        scalar => format!("'{}'", scalar.as_text()),
    }
}

/// `[['maximumHeapSize', '512'], ['verboseModeGarbageCollection', 'true']]`
fn config_attrs<'a>(attrs: impl Iterator<Item = (&'a str, &'a AttrValue)>) -> String {
    let rendered: Vec<String> = attrs
        .map(|(k, v)| format!("['{k}', {}]", config_value(v)))
        .collect();
    format!("[{}]", rendered.join(", "))
}
