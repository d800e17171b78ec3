use std::collections::BTreeSet;

use super::ast::Expr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricSet {
    names: BTreeSet<String>,
}

impl MetricSet {
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn extend<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.names.extend(names);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    // Emit order is lexicographic so reports are byte-stable across runs.
    pub fn sorted(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.iter().cloned().collect();
        names.sort_unstable();
        names
    }
}

pub fn collect_metrics(expr: &Expr, metrics: &mut MetricSet) {
    expr.walk(&mut |node| {
        let selector = match node {
            Expr::VectorSelector(selector) => selector,
            Expr::MatrixSelector(matrix) => &matrix.selector,
            _ => return,
        };
        if let Some(name) = selector.metric_name() {
            metrics.insert(name);
        }
    });
}
