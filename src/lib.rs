//! Local runner for online-judge style solutions.
//!
//! Generates a C++ harness from a question's typed signature, compiles it,
//! runs it against a batch of encoded test cases and matches the tagged
//! output lines back to per-case results.

pub mod cases;
pub mod codec;
pub mod config;
pub mod error;
pub mod lang;
pub mod matcher;
pub mod meta;
pub mod pipeline;
pub mod toolchain;
pub mod types;
pub mod verdict;
pub mod workspace;

pub use codec::{CaseList, TestCase};
pub use error::{HarnessError, Result};
pub use matcher::TestResult;
pub use meta::{ParameterSpec, QuestionMeta, ReturnSpec};
pub use types::TypeTag;
