use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::pipeline::ExtractionPipeline;
use crate::config::{ExtractConfig, OutputTarget};
use crate::model::DirectoryReport;
use crate::util::write_json_pretty;

pub fn run(config: &ExtractConfig) -> Result<()> {
    info!(
        dir = %config.input_dir.display(),
        mode = config.mode.as_str(),
        keep_going = config.keep_going,
        "starting extraction"
    );

    let pipeline = ExtractionPipeline::new(config.mode, config.keep_going)?;
    let report = pipeline.extract_directory(&config.input_dir)?;

    if report.all_metrics().is_empty() {
        warn!(dir = %config.input_dir.display(), "no metrics found");
    }
    info!(
        files = report.files.len(),
        errors = report.error_count(),
        "extraction completed"
    );

    match &config.output {
        OutputTarget::File(path) => {
            write_json_pretty(path, &report)?;
            info!(path = %path.display(), "wrote metrics report");
        }
        OutputTarget::Print => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", metric_line(&report))
                .context("failed to write metrics to stdout")?;
        }
    }

    Ok(())
}

pub(super) fn metric_line(report: &DirectoryReport) -> String {
    report.all_metrics().sorted().join(" | ")
}
