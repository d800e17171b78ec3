use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::loader::{list_documents, load_document};
use super::locator::{Located, locate_dashboard_queries, locate_rule_queries};
use super::normalize::ExpressionNormalizer;
use crate::config::DocumentMode;
use crate::error::{ErrorKind, ExtractError};
use crate::model::{DirectoryReport, FileReport, QueryExpression};
use crate::promql::{self, MetricSet, collect_metrics};

#[derive(Debug)]
pub(super) struct ExtractionPipeline {
    mode: DocumentMode,
    keep_going: bool,
    normalizer: ExpressionNormalizer,
}

impl ExtractionPipeline {
    pub(super) fn new(mode: DocumentMode, keep_going: bool) -> Result<Self> {
        Ok(Self {
            mode,
            keep_going,
            normalizer: ExpressionNormalizer::new()?,
        })
    }

    pub(super) fn extract_directory(&self, dir: &Path) -> Result<DirectoryReport> {
        let paths = list_documents(dir)
            .with_context(|| format!("failed to list input directory {}", dir.display()))?;

        let mut report = DirectoryReport::default();
        for path in paths {
            info!(file = %path.display(), mode = self.mode.as_str(), "parsing");
            let file_report = self.extract_file(&path)?;
            report.files.push(file_report);
        }

        Ok(report)
    }

    // Fails only on errors that abort the run; everything else lands in the report.
    pub(super) fn extract_file(&self, path: &Path) -> Result<FileReport, ExtractError> {
        let file = path.display().to_string();
        let mut metrics = MetricSet::default();
        let mut errors = Vec::new();

        match self.locate(&file, path) {
            Ok(located) => {
                errors.extend(located.errors);
                for expression in &located.expressions {
                    if let Err(err) = self.extract_expression(expression, &mut metrics) {
                        debug!(
                            file = %file,
                            origin = %expression.origin,
                            error = %err,
                            "query skipped"
                        );
                        errors.push(err);
                    }
                }
            }
            Err(err) if self.aborts_run(&err) => return Err(err),
            Err(err) => {
                warn!(file = %file, error = %err, "document not readable, recording error");
                errors.push(err);
            }
        }

        debug!(
            file = %file,
            metrics = metrics.len(),
            errors = errors.len(),
            "file processed"
        );
        Ok(FileReport::new(file, &metrics, &errors))
    }

    // Malformed dashboards are always recorded; the rest abort unless keep_going is set.
    fn aborts_run(&self, err: &ExtractError) -> bool {
        if self.keep_going {
            return false;
        }
        match err.kind() {
            ErrorKind::Io => true,
            ErrorKind::Deserialize => self.mode == DocumentMode::Rules,
            ErrorKind::Locator | ErrorKind::Normalize | ErrorKind::Syntax => false,
        }
    }

    fn locate(&self, file: &str, path: &Path) -> Result<Located, ExtractError> {
        let bytes = load_document(path)?;
        match self.mode {
            DocumentMode::Dashboards => locate_dashboard_queries(file, &bytes),
            DocumentMode::Rules => locate_rule_queries(file, &bytes),
        }
    }

    fn extract_expression(
        &self,
        expression: &QueryExpression,
        metrics: &mut MetricSet,
    ) -> Result<(), ExtractError> {
        let normalized = self.normalizer.normalize(expression)?;
        let parsed = promql::parse(&normalized.text).map_err(|error| ExtractError::Syntax {
            file: normalized.file.clone(),
            origin: normalized.origin.clone(),
            expr: normalized.text.clone(),
            error,
        })?;

        debug!(origin = %normalized.origin, query = %parsed, "parsed query");
        collect_metrics(&parsed, metrics);
        Ok(())
    }
}
