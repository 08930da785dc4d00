//! Test cases annotated in solution comments
//!
//! ```text
//! // @test([2,7,11,15],9)=[0,1]
//! ```

use regex::Regex;
use std::sync::OnceLock;

use crate::codec::{CaseList, TestCase};

fn test_comment_regex() -> &'static Regex {
    static TEST_COMMENT: OnceLock<Regex> = OnceLock::new();
    TEST_COMMENT.get_or_init(|| {
        Regex::new(r#"//\s*@test\(((?:"(?:\\.|[^"\\])*"|[^)"])*)\)\s*(?:=\s*(.*?))?\s*$"#)
            .unwrap_or_else(|e| panic!("invalid @test pattern: {e}"))
    })
}

/// Whether a source line carries a test annotation
pub fn is_test_comment(line: &str) -> bool {
    test_comment_regex().is_match(line)
}

/// Parse one annotated line into a case
pub fn parse_test_comment(line: &str) -> Option<TestCase> {
    let captures = test_comment_regex().captures(line)?;
    let args = split_top_level(&captures[1]);
    let expected = captures
        .get(2)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    Some(TestCase { args, expected })
}

/// All annotated cases in source order
pub fn parse_comment_tests(source: &str) -> CaseList {
    source.lines().filter_map(parse_test_comment).collect()
}

/// Split on commas that are not nested in brackets or quoted strings
fn split_top_level(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_string {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '[' | '(' | '{' => {
                depth += 1;
                current.push(c);
            }
            ']' | ')' | '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    let last = current.trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last.to_string());
    }
    parts
}
