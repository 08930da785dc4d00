use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{HarnessError, Stage};

/// Overall verdict of a local run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    CompileError,
    RuntimeError,
    TimeLimitExceeded,
    SystemError,
}

impl Verdict {
    /// Verdict for a run that produced a complete result list
    pub fn from_pass_count(passed: usize, total: usize) -> Self {
        if passed == total {
            Verdict::Accepted
        } else {
            Verdict::WrongAnswer
        }
    }
}

impl From<&HarnessError> for Verdict {
    fn from(err: &HarnessError) -> Self {
        match err {
            HarnessError::Compile { .. } => Verdict::CompileError,
            HarnessError::Timeout {
                stage: Stage::Compile,
                ..
            } => Verdict::CompileError,
            HarnessError::Timeout {
                stage: Stage::Run, ..
            } => Verdict::TimeLimitExceeded,
            HarnessError::Runtime { .. } | HarnessError::MalformedOutput { .. } => {
                Verdict::RuntimeError
            }
            _ => Verdict::SystemError,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Accepted => "accepted",
            Verdict::WrongAnswer => "wrong_answer",
            Verdict::CompileError => "compile_error",
            Verdict::RuntimeError => "runtime_error",
            Verdict::TimeLimitExceeded => "time_limit_exceeded",
            Verdict::SystemError => "system_error",
        };
        write!(f, "{}", s)
    }
}
