use serde_json::Value;
use tracing::debug;

use crate::error::ExtractError;
use crate::model::{Origin, QueryExpression, RuleConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Segment {
    Field(&'static str),
    Each,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct PathMatcher {
    pub(super) name: &'static str,
    segments: &'static [Segment],
}

// Declaration order is output order.
pub(super) const DASHBOARD_MATCHERS: [PathMatcher; 4] = [
    PathMatcher {
        name: "templating.list[].query",
        segments: &[
            Segment::Field("templating"),
            Segment::Field("list"),
            Segment::Each,
            Segment::Field("query"),
        ],
    },
    PathMatcher {
        name: "panels[].targets[].expr",
        segments: &[
            Segment::Field("panels"),
            Segment::Each,
            Segment::Field("targets"),
            Segment::Each,
            Segment::Field("expr"),
        ],
    },
    PathMatcher {
        name: "panels[].panels[].targets[].expr",
        segments: &[
            Segment::Field("panels"),
            Segment::Each,
            Segment::Field("panels"),
            Segment::Each,
            Segment::Field("targets"),
            Segment::Each,
            Segment::Field("expr"),
        ],
    },
    PathMatcher {
        name: "rows[].panels[].targets[].expr",
        segments: &[
            Segment::Field("rows"),
            Segment::Each,
            Segment::Field("panels"),
            Segment::Each,
            Segment::Field("targets"),
            Segment::Each,
            Segment::Field("expr"),
        ],
    },
];

impl PathMatcher {
    // Missing keys and non-container nodes simply end that branch.
    pub(super) fn matches<'v>(&self, root: &'v Value) -> Vec<(String, &'v Value)> {
        let mut current = vec![(String::new(), root)];

        for segment in self.segments {
            let mut next = Vec::new();
            for (path, node) in current {
                match segment {
                    Segment::Field(key) => {
                        if let Some(child) = node.get(*key) {
                            let child_path = if path.is_empty() {
                                (*key).to_string()
                            } else {
                                format!("{path}.{key}")
                            };
                            next.push((child_path, child));
                        }
                    }
                    Segment::Each => {
                        if let Value::Array(items) = node {
                            for (index, item) in items.iter().enumerate() {
                                next.push((format!("{path}[{index}]"), item));
                            }
                        }
                    }
                }
            }
            current = next;
        }

        current
    }
}

#[derive(Debug, Default)]
pub(super) struct Located {
    pub(super) expressions: Vec<QueryExpression>,
    pub(super) errors: Vec<ExtractError>,
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "bool",
        serde_yaml::Value::Number(_) => "number",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "sequence",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged value",
    }
}

pub(super) fn locate_dashboard_queries(file: &str, bytes: &[u8]) -> Result<Located, ExtractError> {
    let dashboard: Value =
        serde_json::from_slice(bytes).map_err(|err| ExtractError::Deserialize {
            file: file.to_string(),
            message: err.to_string(),
        })?;
    if !dashboard.is_object() {
        return Err(ExtractError::Deserialize {
            file: file.to_string(),
            message: format!("expected dashboard object, found {}", json_kind(&dashboard)),
        });
    }

    let mut located = Located::default();
    for matcher in &DASHBOARD_MATCHERS {
        let matches = matcher.matches(&dashboard);
        debug!(
            file,
            matcher = matcher.name,
            matches = matches.len(),
            "located dashboard queries"
        );
        for (path, value) in matches {
            match value {
                Value::String(text) => located.expressions.push(QueryExpression {
                    file: file.to_string(),
                    origin: Origin::Path(path),
                    text: text.clone(),
                }),
                other => located.errors.push(ExtractError::Locator {
                    file: file.to_string(),
                    path,
                    found: json_kind(other),
                }),
            }
        }
    }

    Ok(located)
}

pub(super) fn locate_rule_queries(file: &str, bytes: &[u8]) -> Result<Located, ExtractError> {
    let config: RuleConfig = if bytes.iter().all(u8::is_ascii_whitespace) {
        RuleConfig::default()
    } else {
        serde_yaml::from_slice(bytes).map_err(|err| ExtractError::Deserialize {
            file: file.to_string(),
            message: err.to_string(),
        })?
    };

    let mut located = Located::default();
    for (group_index, group) in config.groups.iter().enumerate() {
        for (rule_index, rule) in group.rules.iter().enumerate() {
            let text = match &rule.expr {
                serde_yaml::Value::String(text) => text.clone(),
                serde_yaml::Value::Number(number) => number.to_string(),
                other => {
                    located.errors.push(ExtractError::Locator {
                        file: file.to_string(),
                        path: format!("groups[{group_index}].rules[{rule_index}].expr"),
                        found: yaml_kind(other),
                    });
                    continue;
                }
            };

            let rule_name = match rule.identity() {
                "" => format!("rules[{rule_index}]"),
                identity => identity.to_string(),
            };
            located.expressions.push(QueryExpression {
                file: file.to_string(),
                origin: Origin::Rule {
                    group: group.name.clone(),
                    rule: rule_name,
                },
                text,
            });
        }
    }

    Ok(located)
}
