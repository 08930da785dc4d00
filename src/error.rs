//! Error taxonomy for harness generation, toolchain runs and output decoding
//!
//! Every error is raised where it is detected and handed back unchanged; the
//! library never retries and never returns partial case results.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Pipeline stage an external process belonged to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compile,
    Run,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Compile => write!(f, "compile"),
            Stage::Run => write!(f, "run"),
        }
    }
}

#[derive(Error, Debug)]
pub enum HarnessError {
    /// A type tag has no entry in the vocabulary
    #[error("unsupported type: {tag}")]
    UnsupportedType { tag: String },

    /// Metadata is structurally inconsistent (e.g. void return with no parameters)
    #[error("invalid question metadata: {0}")]
    InvalidMetadata(String),

    #[error("question metadata not found: {}", path.display())]
    MetadataNotFound { path: PathBuf },

    /// Compiler diagnostics, verbatim
    #[error("compilation failed:\n{diagnostic}")]
    Compile { diagnostic: String },

    #[error("harness exited with code {exit_code}")]
    Runtime {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("{stage} step timed out after {limit_ms}ms")]
    Timeout {
        stage: Stage,
        limit_ms: u64,
        stdout: String,
        stderr: String,
    },

    #[error("malformed harness output: {reason} (expected {expected} results, found {found})")]
    MalformedOutput {
        reason: String,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    pub fn unsupported(tag: impl Into<String>) -> Self {
        HarnessError::UnsupportedType { tag: tag.into() }
    }

    pub(crate) fn malformed(reason: impl Into<String>, expected: usize, found: usize) -> Self {
        HarnessError::MalformedOutput {
            reason: reason.into(),
            expected,
            found,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = HarnessError::unsupported("map<string,integer>");
        assert_eq!(err.to_string(), "unsupported type: map<string,integer>");

        let err = HarnessError::Timeout {
            stage: Stage::Run,
            limit_ms: 10_000,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "run step timed out after 10000ms");

        let err = HarnessError::malformed("missing result for case 1", 2, 1);
        assert!(err.to_string().contains("case 1"));
    }
}
