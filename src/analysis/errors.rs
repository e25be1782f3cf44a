//! # Analysis Errors

use thiserror::Error;

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Conditions that stop the consistency analysis
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("Too many errors: reached limit of {limit} findings")]
    TooManyFindings { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = AnalysisError::TooManyFindings { limit: 10 };
        assert_eq!(err.to_string(), "Too many errors: reached limit of 10 findings");
    }
}
