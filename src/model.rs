use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::promql::MetricSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Path(String),
    Rule { group: String, rule: String },
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.write_str(path),
            Self::Rule { group, rule } => write!(f, "{group}/{rule}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExpression {
    pub file: String,
    pub origin: Origin,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedExpression {
    pub file: String,
    pub origin: Origin,
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleGroup {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub record: Option<String>,
    #[serde(default)]
    pub alert: Option<String>,
    #[serde(default)]
    pub expr: serde_yaml::Value,
    #[serde(default)]
    pub labels: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub annotations: BTreeMap<String, serde_yaml::Value>,
}

impl Rule {
    pub fn identity(&self) -> &str {
        self.record
            .as_deref()
            .or(self.alert.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub filename: String,
    pub metrics: Vec<String>,
    pub parse_errors: Vec<String>,
}

impl FileReport {
    pub fn new(filename: String, metrics: &MetricSet, errors: &[ExtractError]) -> Self {
        Self {
            filename,
            metrics: metrics.sorted(),
            parse_errors: errors.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryReport {
    #[serde(rename = "metricsfiles")]
    pub files: Vec<FileReport>,
}

impl DirectoryReport {
    pub fn all_metrics(&self) -> MetricSet {
        let mut metrics = MetricSet::default();
        for file in &self.files {
            metrics.extend(file.metrics.iter().cloned());
        }
        metrics
    }

    pub fn error_count(&self) -> usize {
        self.files.iter().map(|file| file.parse_errors.len()).sum()
    }
}
