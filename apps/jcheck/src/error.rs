//! Error taxonomy for tool runs.
//!
//! Unmatched output lines never become errors; the parser drops them.

use crate::models::{FailureKind, Tool};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{tool} failed with exit code {code:?} and no output")]
    ToolExecution { tool: Tool, code: Option<i32> },

    #[error("{tool} timed out after {after:?}")]
    Timeout { tool: Tool, after: Duration },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckError {
    /// Failure class used in reports.
    pub fn kind(&self) -> FailureKind {
        match self {
            CheckError::Configuration(_) => FailureKind::Configuration,
            CheckError::Timeout { .. } => FailureKind::Timeout,
            CheckError::ToolExecution { .. } | CheckError::Io { .. } => FailureKind::Execution,
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_keeps_subsecond_precision() {
        let err = CheckError::Timeout {
            tool: Tool::Pmd,
            after: Duration::from_millis(300),
        };
        assert_eq!(err.to_string(), "pmd timed out after 300ms");
        assert_eq!(err.kind(), FailureKind::Timeout);
    }
}
