use std::path::PathBuf;

use thiserror::Error;

/// Failures that reach the caller of an analysis.
///
/// Out-of-domain points and non-finite results are not errors: evaluation
/// reports them as `None` and the affected property is skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("enter a function to analyze")]
    EmptyExpression,

    #[error("cannot parse '{expression}': {message}")]
    Parse { expression: String, message: String },

    #[error("'{expression}' has no plottable points in the selected range")]
    NoSamples { expression: String },

    #[error("invalid configuration {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let err = AnalysisError::Parse {
            expression: "2+".to_string(),
            message: "unexpected end".to_string(),
        };
        assert_eq!(err.to_string(), "cannot parse '2+': unexpected end");
        assert_eq!(
            AnalysisError::EmptyExpression.to_string(),
            "enter a function to analyze"
        );
    }
}
