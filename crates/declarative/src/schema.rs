//! Declaration schema checks
//!
//! Each resource kind carries a static table of [`FieldRule`]s. The table is
//! checked once when the declaration is loaded, so everything downstream can
//! trust the typed struct.

use crate::error::{Error, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

// `None` rejects every identifier rather than letting unchecked text into scripts
static IDENTIFIER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[-0-9A-Za-z._]+$")
        .inspect_err(|e| log::warn!("failed to compile identifier regex: {e}"))
        .ok()
});

/// Character used to delimit string literals in emitted scripts
pub const SCRIPT_QUOTE: char = '\'';

/// A single field constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    NonEmpty,
    /// Must start with `/`
    AbsolutePath,
    OneOf(&'static [&'static str]),
    /// Inclusive integer range
    Range(i64, i64),
    /// `[-0-9A-Za-z._]+`
    Identifier,
    /// Must not contain the script quote character
    NoQuote,
}

impl Check {
    /// Check a value, returning a problem description on failure
    pub fn check(&self, field: &str, value: &str) -> Option<String> {
        let ok = match self {
            Self::NonEmpty => !value.trim().is_empty(),
            Self::AbsolutePath => Path::new(value).is_absolute(),
            Self::OneOf(allowed) => allowed.contains(&value),
            Self::Range(min, max) => value
                .parse::<i64>()
                .is_ok_and(|n| (*min..=*max).contains(&n)),
            Self::Identifier => IDENTIFIER.as_ref().is_some_and(|re| re.is_match(value)),
            Self::NoQuote => !value.contains(SCRIPT_QUOTE),
        };
        if ok {
            return None;
        }

        Some(match self {
            Self::NonEmpty => format!("{field} must not be empty"),
            Self::AbsolutePath => format!("{field} must be an absolute path, got '{value}'"),
            Self::OneOf(allowed) => {
                format!("{field} must be one of {}, got '{value}'", allowed.join(", "))
            }
            Self::Range(min, max) => {
                format!("{field} must be a number between {min} and {max}, got '{value}'")
            }
            Self::Identifier => format!("{field} may only contain [-0-9A-Za-z._], got '{value}'"),
            Self::NoQuote => format!("{field} must not contain {SCRIPT_QUOTE}"),
        })
    }
}

/// Constraints for one declared field
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    /// Whether the field must be declared at all
    pub required: bool,
    pub checks: &'static [Check],
}

impl FieldRule {
    pub const fn required(name: &'static str, checks: &'static [Check]) -> Self {
        Self {
            name,
            required: true,
            checks,
        }
    }

    pub const fn optional(name: &'static str, checks: &'static [Check]) -> Self {
        Self {
            name,
            required: false,
            checks,
        }
    }
}

/// Every rule violation of a declaration, in rule order.
///
/// `lookup` returns the declared text of a field, `None` when undeclared.
pub fn problems<F>(rules: &[FieldRule], lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut problems = Vec::new();

    for rule in rules {
        match lookup(rule.name) {
            None if rule.required => problems.push(format!("{} is required", rule.name)),
            None => {}
            Some(value) => problems.extend(
                rule.checks
                    .iter()
                    .filter_map(|check| check.check(rule.name, &value)),
            ),
        }
    }
    problems
}

/// Validate a declaration against its rules, collecting all problems before failing
pub fn validate<F>(resource: &str, rules: &[FieldRule], lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let problems = problems(rules, lookup);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(resource, problems))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const RULES: &[FieldRule] = &[
        FieldRule::required("name", &[Check::NonEmpty, Check::Identifier]),
        FieldRule::required("classpath", &[Check::AbsolutePath]),
        FieldRule::optional("dbtype", &[Check::OneOf(&["DB2", "Oracle"])]),
        FieldRule::optional("weight", &[Check::Range(0, 100)]),
        FieldRule::optional("description", &[Check::NoQuote]),
    ];

    fn lookup<'a>(fields: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| fields.get(name).map(|v| v.to_string())
    }

    #[test]
    fn test_valid_declaration_passes() {
        let fields = HashMap::from([
            ("name", "Oracle_JDBC"),
            ("classpath", "/opt/oracle/ojdbc8.jar"),
            ("dbtype", "Oracle"),
            ("weight", "2"),
        ]);
        assert!(validate("jdbc_provider", RULES, lookup(&fields)).is_ok());
    }

    #[test]
    fn test_all_problems_are_collected() {
        let fields = HashMap::from([
            ("name", "bad name"),
            ("dbtype", "Sybase"),
            ("weight", "101"),
            ("description", "it's"),
        ]);
        let err = validate("jdbc_provider", RULES, lookup(&fields)).unwrap_err();
        match err {
            Error::Validation { problems, .. } => {
                assert_eq!(problems.len(), 5);
                assert!(problems[0].contains("[-0-9A-Za-z._]"));
                assert_eq!(problems[1], "classpath is required");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_identifier_charset() {
        assert!(Check::Identifier.check("cell", "CELL_01.node-a").is_none());
        assert!(Check::Identifier.check("cell", "").is_some());
        assert!(Check::Identifier.check("cell", "cell 01").is_some());
    }

    #[test]
    fn test_range_rejects_non_numbers() {
        assert!(Check::Range(0, 10).check("weight", "ten").is_some());
        assert!(Check::Range(0, 10).check("weight", "10").is_none());
    }
}
