use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use solution_harness::cases::{is_test_comment, parse_comment_tests, parse_test_comment};
use solution_harness::config;
use solution_harness::lang;
use solution_harness::meta::load_question_meta;
use solution_harness::pipeline::{prepare_debug, run_cases};
use solution_harness::toolchain::NativeToolchain;
use solution_harness::verdict::Verdict;
use solution_harness::workspace::{ScratchWorkspace, Workspace};
use solution_harness::{HarnessError, TestCase, TestResult};

#[derive(Parser, Debug)]
#[command(name = "solution-harness", version, about = "Run online-judge style solutions locally")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the harness and run test cases against the solution
    Run {
        /// Solution source, ideally `<root>/question/<name>.cpp`
        solution: PathBuf,
        /// Question metadata JSON
        #[arg(long)]
        meta: PathBuf,
        /// JSON file with `[{"args": [...], "expected": "..."}]`; defaults to `@test` comments
        #[arg(long)]
        cases: Option<PathBuf>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the generated harness source
    Generate {
        solution: PathBuf,
        #[arg(long)]
        meta: PathBuf,
    },
    /// Build the harness and print a debugger launch description for one case
    DebugConfig {
        solution: PathBuf,
        #[arg(long)]
        meta: PathBuf,
        /// 1-based line of a `@test` comment in the solution
        #[arg(long, conflicts_with = "arg")]
        line: Option<usize>,
        /// Raw argument, repeated in parameter order
        #[arg(long = "arg")]
        arg: Vec<String>,
    },
}

/// Report of one `run` invocation
#[derive(Debug, Serialize, Deserialize)]
struct RunReport {
    verdict: Verdict,
    passed: usize,
    total: usize,
    results: Vec<TestResult>,
    /// Compile error / runtime error / decoding error message
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl RunReport {
    fn from_results(results: Vec<TestResult>) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            verdict: Verdict::from_pass_count(passed, results.len()),
            passed,
            total: results.len(),
            results,
            error_message: None,
        }
    }

    fn from_error(err: &HarnessError, total: usize) -> Self {
        Self {
            verdict: Verdict::from(err),
            passed: 0,
            total,
            results: Vec::new(),
            error_message: Some(error_details(err)),
        }
    }
}

/// Error text including the captured process streams
fn error_details(err: &HarnessError) -> String {
    match err {
        HarnessError::Runtime { stdout, stderr, .. }
        | HarnessError::Timeout { stdout, stderr, .. } => {
            let mut message = err.to_string();
            if !stderr.is_empty() {
                message.push_str(&format!("\nstderr:\n{}", stderr.trim_end()));
            }
            if !stdout.is_empty() {
                message.push_str(&format!("\nstdout:\n{}", stdout.trim_end()));
            }
            message
        }
        _ => err.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("solution_harness=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            solution,
            meta,
            cases,
            json,
        } => {
            let toolchain = native_toolchain()?;
            let accepted = run_command(&toolchain, &solution, &meta, cases.as_deref(), json).await?;
            if !accepted {
                std::process::exit(1);
            }
        }
        Command::Generate { solution, meta } => {
            let meta = load_question_meta(&meta)?;
            let name = question_name(&solution)?;
            print!("{}", lang::generate_harness(&name, &meta)?);
        }
        Command::DebugConfig {
            solution,
            meta,
            line,
            arg,
        } => {
            let args = match line {
                Some(line) => args_from_line(&solution, line)?,
                None => arg,
            };
            let meta = load_question_meta(&meta)?;
            let workspace = Workspace::from_solution_path(&solution).with_context(|| {
                format!(
                    "{:?} is not inside a question/ directory; debugging needs a persistent workspace",
                    solution
                )
            })?;
            let toolchain = native_toolchain()?;
            let launch = prepare_debug(&workspace, &meta, &args, &toolchain).await?;
            println!("{}", serde_json::to_string_pretty(&launch)?);
        }
    }

    Ok(())
}

/// Toolchain from the global config; only commands that compile need it
fn native_toolchain() -> Result<NativeToolchain> {
    let toolchain_config = config::init_config()?;
    info!(
        "Toolchain: {:?} (compile {}ms, run {}ms)",
        toolchain_config.compile_command,
        toolchain_config.compile_timeout_ms,
        toolchain_config.run_timeout_ms
    );
    Ok(NativeToolchain::new(toolchain_config.clone()))
}

async fn run_command(
    toolchain: &NativeToolchain,
    solution: &Path,
    meta_path: &Path,
    cases_path: Option<&Path>,
    json: bool,
) -> Result<bool> {
    let meta = load_question_meta(meta_path)?;
    let cases = load_cases(solution, cases_path)?;

    let scratch;
    let workspace = match Workspace::from_solution_path(solution) {
        Some(ws) => ws,
        None => {
            scratch = ScratchWorkspace::from_solution(solution).await?;
            scratch.workspace.clone()
        }
    };

    let report = match run_cases(&workspace, &meta, &cases, toolchain).await {
        Ok(results) => RunReport::from_results(results),
        Err(e) => {
            error!("Run failed for {}: {}", workspace.question_name(), e);
            RunReport::from_error(&e, cases.len())
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &cases);
    }
    Ok(report.verdict == Verdict::Accepted)
}

fn load_cases(solution: &Path, cases_path: Option<&Path>) -> Result<Vec<TestCase>> {
    match cases_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read cases file {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid cases file {:?}", path))
        }
        None => {
            let source = std::fs::read_to_string(solution)
                .with_context(|| format!("Failed to read solution {:?}", solution))?;
            Ok(parse_comment_tests(&source))
        }
    }
}

fn args_from_line(solution: &Path, line: usize) -> Result<Vec<String>> {
    let source = std::fs::read_to_string(solution)
        .with_context(|| format!("Failed to read solution {:?}", solution))?;
    let text = line
        .checked_sub(1)
        .and_then(|i| source.lines().nth(i))
        .with_context(|| format!("Line {} is outside {:?}", line, solution))?;
    if !is_test_comment(text) {
        anyhow::bail!("Line {} is not a @test comment; select a test case first", line);
    }
    let case = parse_test_comment(text)
        .with_context(|| format!("Failed to parse @test comment on line {}", line))?;
    Ok(case.args)
}

fn question_name(solution: &Path) -> Result<String> {
    solution
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("Cannot derive a question name from {:?}", solution))
}

fn print_report(report: &RunReport, cases: &[TestCase]) {
    for result in &report.results {
        let args = cases
            .get(result.case_index)
            .map(|c| c.args.join(", "))
            .unwrap_or_default();
        if result.passed {
            println!("✔ case {} ({}) -> {}", result.case_index, args, result.actual_output);
        } else {
            println!(
                "✘ case {} ({}) -> {}",
                result.case_index,
                args,
                result.diagnostic.as_deref().unwrap_or_default()
            );
        }
    }
    if let Some(message) = &report.error_message {
        println!("{}", message);
    }
    println!(
        "{}: {}/{} passed",
        report.verdict, report.passed, report.total
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let results = vec![
            TestResult {
                case_index: 0,
                actual_output: "1".into(),
                expected_output: "1".into(),
                passed: true,
                diagnostic: None,
            },
            TestResult {
                case_index: 1,
                actual_output: "2".into(),
                expected_output: "3".into(),
                passed: false,
                diagnostic: Some("expected \"3\"".into()),
            },
        ];
        let report = RunReport::from_results(results);
        assert_eq!(report.verdict, Verdict::WrongAnswer);
        assert_eq!(report.passed, 1);
        assert_eq!(report.total, 2);
    }

    #[test]
    fn test_error_report_includes_streams() {
        let err = HarnessError::Runtime {
            exit_code: 139,
            stdout: "resultabc0:1resultend\n".into(),
            stderr: "Segmentation fault\n".into(),
        };
        let report = RunReport::from_error(&err, 2);
        assert_eq!(report.verdict, Verdict::RuntimeError);
        let message = report.error_message.unwrap();
        assert!(message.contains("Segmentation fault"));
        assert!(message.contains("exited with code 139"));
    }

    #[test]
    fn test_help_renders_from_parser_alone() {
        let err = Cli::try_parse_from(["solution-harness", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        let err = Cli::try_parse_from(["solution-harness", "run", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "solution-harness",
            "run",
            "question/two-sum.cpp",
            "--meta",
            "meta.json",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Command::Run { json, cases, .. } => {
                assert!(json);
                assert!(cases.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
