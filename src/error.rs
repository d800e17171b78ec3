use std::path::PathBuf;

use crate::model::Origin;
use crate::promql::SyntaxError;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to deserialize {file}: {message}")]
    Deserialize { file: String, message: String },

    #[error("expected string at {path} in {file}, found {found}")]
    Locator {
        file: String,
        path: String,
        found: &'static str,
    },

    #[error("label query={expr} ({origin}): {message}")]
    Normalize {
        file: String,
        origin: Origin,
        expr: String,
        message: String,
    },

    #[error("promql query={expr} ({origin}): {error}")]
    Syntax {
        file: String,
        origin: Origin,
        expr: String,
        error: SyntaxError,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Io,
    Deserialize,
    Locator,
    Normalize,
    Syntax,
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::Deserialize { .. } => ErrorKind::Deserialize,
            Self::Locator { .. } => ErrorKind::Locator,
            Self::Normalize { .. } => ErrorKind::Normalize,
            Self::Syntax { .. } => ErrorKind::Syntax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let io = ExtractError::Io {
            path: PathBuf::from("dash/a.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        let locator = ExtractError::Locator {
            file: "dash/a.json".to_string(),
            path: "panels[0].targets[0].expr".to_string(),
            found: "number",
        };

        assert_eq!(io.kind(), ErrorKind::Io);
        assert_eq!(locator.kind(), ErrorKind::Locator);
    }

    #[test]
    fn display_includes_expression_and_origin() {
        let err = ExtractError::Normalize {
            file: "dash/a.json".to_string(),
            origin: Origin::Path("templating.list[0].query".to_string()),
            expr: "label_values(".to_string(),
            message: "no metric name inside label_values()".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "label query=label_values( (templating.list[0].query): no metric name inside label_values()"
        );
    }
}
