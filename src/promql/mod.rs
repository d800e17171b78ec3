mod ast;
mod metrics;
mod parser;
#[cfg(test)]
mod tests;

pub use metrics::{MetricSet, collect_metrics};
pub use parser::{SyntaxError, parse};
