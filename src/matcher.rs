//! Result matcher: pairs decoded outputs with expected outputs per case

use serde::{Deserialize, Serialize};

use crate::codec::{DecodedOutput, TestCase};
use crate::error::{HarnessError, Result};

/// Outcome of one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub case_index: usize,
    pub actual_output: String,
    pub expected_output: String,
    pub passed: bool,
    /// Where the outputs diverge (failed cases only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

/// Pair every case with its decoded output, in case order.
///
/// Comparison is exact; the only normalization is what the harness
/// serializers already do.
pub fn match_results(cases: &[TestCase], decoded: &[DecodedOutput]) -> Result<Vec<TestResult>> {
    if cases.len() != decoded.len() {
        return Err(HarnessError::malformed(
            "decoded outputs do not line up with the case list",
            cases.len(),
            decoded.len(),
        ));
    }

    cases
        .iter()
        .zip(decoded)
        .enumerate()
        .map(|(case_index, (case, output))| {
            if output.case_index != case_index {
                return Err(HarnessError::malformed(
                    format!(
                        "output for case {} found at position {}",
                        output.case_index, case_index
                    ),
                    cases.len(),
                    decoded.len(),
                ));
            }
            let passed = output.actual_output == case.expected;
            let diagnostic = if passed {
                None
            } else {
                Some(describe_mismatch(&output.actual_output, &case.expected))
            };
            Ok(TestResult {
                case_index,
                actual_output: output.actual_output.clone(),
                expected_output: case.expected.clone(),
                passed,
                diagnostic,
            })
        })
        .collect()
}

fn describe_mismatch(actual: &str, expected: &str) -> String {
    let offset = actual
        .bytes()
        .zip(expected.bytes())
        .position(|(a, e)| a != e)
        .unwrap_or_else(|| actual.len().min(expected.len()));
    let distance = triple_accel::levenshtein(actual.as_bytes(), expected.as_bytes());
    format!(
        "expected {:?}, got {:?} (first difference at byte {}, edit distance {})",
        expected, actual, offset, distance
    )
}
