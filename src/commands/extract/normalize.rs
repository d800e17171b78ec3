use anyhow::{Context, Result};
use regex::{Captures, Regex};

use crate::error::ExtractError;
use crate::model::{NormalizedExpression, QueryExpression};

// Grafana template variables, matched by whole name so `$__interval` never
// rewrites the head of `$__interval_ms`.
const PLACEHOLDERS: [(&str, &str); 9] = [
    ("__interval", "5m"),
    ("__rate_interval", "5m"),
    ("interval", "5m"),
    ("__range", "5m"),
    ("__interval_ms", "300000"),
    ("__rate_interval_ms", "300000"),
    ("__range_ms", "300000"),
    ("__range_s", "300"),
    ("resolution", "5s"),
];

fn placeholder_value(name: &str) -> Option<&'static str> {
    PLACEHOLDERS
        .iter()
        .find(|(placeholder, _)| *placeholder == name)
        .map(|(_, value)| *value)
}

#[derive(Debug)]
pub(super) struct ExpressionNormalizer {
    placeholder: Regex,
    label_values: Regex,
    query_result: Regex,
}

impl ExpressionNormalizer {
    pub(super) fn new() -> Result<Self> {
        Ok(Self {
            placeholder: Regex::new(r"\$\{(\w+)\}|\$(\w+)")
                .context("failed to compile template placeholder regex")?,
            label_values: Regex::new(r"label_values\s*\(\s*([a-zA-Z_:][a-zA-Z0-9_:]*)")
                .context("failed to compile label_values regex")?,
            query_result: Regex::new(r"(?s)^\s*query_result\s*\((.*)\)\s*$")
                .context("failed to compile query_result regex")?,
        })
    }

    pub(super) fn normalize(
        &self,
        expression: &QueryExpression,
    ) -> Result<NormalizedExpression, ExtractError> {
        let text = self
            .normalize_text(&expression.text)
            .map_err(|message| ExtractError::Normalize {
                file: expression.file.clone(),
                origin: expression.origin.clone(),
                expr: expression.text.clone(),
                message: message.to_string(),
            })?;

        Ok(NormalizedExpression {
            file: expression.file.clone(),
            origin: expression.origin.clone(),
            text,
        })
    }

    // Every rewrite shortens the text, so the loop reaches a fixpoint.
    pub(super) fn normalize_text(&self, raw: &str) -> Result<String, &'static str> {
        let mut current = raw.to_string();
        loop {
            let next = self.rewrite_once(&current)?;
            if next == current {
                return Ok(next);
            }
            current = next;
        }
    }

    fn rewrite_once(&self, text: &str) -> Result<String, &'static str> {
        let mut out = text.replace("\\\"", "\"").replace("\\n", "");

        if out.contains('$') {
            out = self
                .placeholder
                .replace_all(&out, |captures: &Captures<'_>| {
                    let name = captures.get(1).or_else(|| captures.get(2));
                    match name.and_then(|name| placeholder_value(name.as_str())) {
                        Some(value) => value.to_string(),
                        None => captures[0].to_string(),
                    }
                })
                .into_owned();
        }

        if out.contains("label_values") {
            let captures = self
                .label_values
                .captures(&out)
                .ok_or("no metric name found inside label_values()")?;
            out = captures[1].to_string();
        }

        if out.contains("query_result") {
            let captures = self
                .query_result
                .captures(&out)
                .ok_or("query_result() wrapper is not closed")?;
            out = captures[1].trim().to_string();
        }

        Ok(out)
    }
}
