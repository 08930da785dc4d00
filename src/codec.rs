//! Case list codec
//!
//! Encodes a batch of test cases into the single process argument the harness
//! reads, and decodes the harness's tagged stdout lines back into per-case
//! outputs.
//!
//! Wire format, harness side: `argv[1]` is a JSON array (one entry per case)
//! of arrays of strings (the raw arguments of that case). Each case prints
//! exactly one line `resultabc<i>:<value>resultend`. A `resultend` inside a
//! serialized string arrives as `\u0072esultend` and is restored on decode.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{HarnessError, Result};

/// Opening marker of a result line, followed by `<index>:`
pub const RESULT_OPEN: &str = "resultabc";
/// Closing marker of a result line
pub const RESULT_CLOSE: &str = "resultend";
/// How `serializeString` writes a closing marker that occurs inside a value
const ESCAPED_CLOSE: &str = "\\u0072esultend";

/// One test case: raw argument strings in parameter order plus the expected output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub args: Vec<String>,
    #[serde(default)]
    pub expected: String,
}

impl TestCase {
    pub fn new(args: impl IntoIterator<Item = impl Into<String>>, expected: impl Into<String>) -> Self {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            expected: expected.into(),
        }
    }
}

/// Ordered batch of test cases; the position is the only correlation key
pub type CaseList = Vec<TestCase>;

/// How the encoded case list is quoted for the process boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgQuoting {
    /// Passed as one argv element to a directly spawned process
    #[default]
    Verbatim,
    /// Backslash-escaped for consumers that re-split the argument with a shell
    ShellEscaped,
}

impl ArgQuoting {
    pub fn apply(&self, encoded: String) -> String {
        match self {
            ArgQuoting::Verbatim => encoded,
            ArgQuoting::ShellEscaped => escape_shell_argument(&encoded),
        }
    }
}

/// Encode the argument lists of a batch as the harness's `argv[1]`
pub fn encode_case_list(cases: &[TestCase]) -> String {
    encode_arguments(cases.iter().map(|c| c.args.as_slice()))
}

/// Encode bare argument lists (no expected outputs), e.g. for a debug launch
pub fn encode_arguments<'a>(args: impl IntoIterator<Item = &'a [String]>) -> String {
    let nested: Vec<&[String]> = args.into_iter().collect();
    // Serializing strings and slices of strings cannot fail
    serde_json::to_string(&nested).unwrap_or_else(|_| "[]".to_string())
}

/// Backslash-escape quotes, backslashes and whitespace
pub fn escape_shell_argument(arg: &str) -> String {
    let mut escaped = String::with_capacity(arg.len() + 8);
    for c in arg.chars() {
        if c == '"' || c == '\\' || c.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Output recovered for one case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedOutput {
    pub case_index: usize,
    pub actual_output: String,
}

fn result_line_regex() -> &'static Regex {
    static RESULT_LINE: OnceLock<Regex> = OnceLock::new();
    RESULT_LINE.get_or_init(|| {
        let pattern = format!(
            r"{}(0|[1-9][0-9]*):(.*?){}",
            regex::escape(RESULT_OPEN),
            regex::escape(RESULT_CLOSE)
        );
        // The pattern is built from constants
        Regex::new(&pattern).unwrap_or_else(|e| panic!("invalid result line pattern: {e}"))
    })
}

/// Decode harness stdout into exactly `case_count` outputs ordered by index.
///
/// Lines without the result tag (debug prints from the solution) are
/// skipped. Anything other than one result per submitted case is an error.
pub fn decode_output(stdout: &str, case_count: usize) -> Result<Vec<DecodedOutput>> {
    let mut slots: Vec<Option<String>> = vec![None; case_count];
    let mut found = 0usize;

    for captures in result_line_regex().captures_iter(stdout) {
        found += 1;
        let index: usize = captures[1].parse().map_err(|_| {
            HarnessError::malformed(
                format!("bad case index {:?}", &captures[1]),
                case_count,
                found,
            )
        })?;
        let slot = slots.get_mut(index).ok_or_else(|| {
            HarnessError::malformed(
                format!(
                    "result for case {} but only {} cases were submitted",
                    index, case_count
                ),
                case_count,
                found,
            )
        })?;
        if slot.is_some() {
            return Err(HarnessError::malformed(
                format!("duplicate result for case {}", index),
                case_count,
                found,
            ));
        }
        *slot = Some(restore_markers(&captures[2]));
    }

    if found != case_count {
        let missing = slots.iter().position(Option::is_none);
        let reason = match missing {
            Some(index) => format!("missing result for case {}", index),
            None => "result count mismatch".to_string(),
        };
        return Err(HarnessError::malformed(reason, case_count, found));
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(case_index, slot)| {
            slot.map(|actual_output| DecodedOutput {
                case_index,
                actual_output,
            })
            .ok_or_else(|| {
                HarnessError::malformed(
                    format!("missing result for case {}", case_index),
                    case_count,
                    found,
                )
            })
        })
        .collect()
}

/// Undo the harness's escaping of `resultend` inside serialized strings.
///
/// An escape preceded by an odd number of backslashes is a literal
/// backslash followed by `u0072...` and stays as it is.
fn restore_markers(value: &str) -> String {
    let mut restored = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find(ESCAPED_CLOSE) {
        let (head, tail) = rest.split_at(pos);
        let backslashes = head.bytes().rev().take_while(|b| *b == b'\\').count();
        restored.push_str(head);
        restored.push_str(if backslashes % 2 == 0 {
            RESULT_CLOSE
        } else {
            ESCAPED_CLOSE
        });
        rest = &tail[ESCAPED_CLOSE.len()..];
    }
    restored.push_str(rest);
    restored
}
