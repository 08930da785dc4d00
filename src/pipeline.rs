//! Run pipeline: generate → provision → compile → run → decode → match
//!
//! Each run is computed from its inputs alone. Two runs against the same
//! workspace must not overlap; the harness file and binary are shared.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::codec::{decode_output, encode_arguments, encode_case_list, ArgQuoting, TestCase};
use crate::error::Result;
use crate::lang;
use crate::matcher::{match_results, TestResult};
use crate::meta::QuestionMeta;
use crate::toolchain::Toolchain;
use crate::workspace::Workspace;

/// Generate the harness and write it into the workspace.
///
/// Generation happens before any file is touched, so unsupported metadata
/// leaves the workspace unchanged.
pub async fn prepare_harness(workspace: &Workspace, meta: &QuestionMeta) -> Result<String> {
    let source = lang::generate_harness(workspace.question_name(), meta)?;
    workspace.provision_runtime().await?;
    workspace.write_harness(&source).await?;
    Ok(source)
}

/// Prepare and compile the harness, reusing the previous binary when nothing changed
pub async fn build_harness(
    workspace: &Workspace,
    meta: &QuestionMeta,
    toolchain: &dyn Toolchain,
) -> Result<PathBuf> {
    let source = prepare_harness(workspace, meta).await?;
    let stamp = workspace
        .build_stamp(&source, &toolchain.build_identity())
        .await?;

    if workspace.is_up_to_date(&stamp).await {
        debug!(
            "Harness for {} unchanged, using cached binary",
            workspace.question_name()
        );
        return Ok(workspace.binary_path());
    }

    workspace.clear_stamp().await?;
    let binary = toolchain.compile(workspace).await?;
    workspace.record_stamp(&stamp).await?;
    Ok(binary)
}

/// Run a batch of cases and return one result per case, in case order
pub async fn run_cases(
    workspace: &Workspace,
    meta: &QuestionMeta,
    cases: &[TestCase],
    toolchain: &dyn Toolchain,
) -> Result<Vec<TestResult>> {
    let binary = build_harness(workspace, meta, toolchain).await?;

    if cases.is_empty() {
        warn!("No test cases for {}", workspace.question_name());
        return Ok(Vec::new());
    }

    let encoded = ArgQuoting::Verbatim.apply(encode_case_list(cases));
    info!(
        "Running {} cases for {}",
        cases.len(),
        workspace.question_name()
    );
    let outcome = toolchain.run(&binary, workspace.root(), &encoded).await?;

    let decoded = decode_output(&outcome.stdout, cases.len())?;
    let results = match_results(cases, &decoded)?;

    info!(
        "{}: {}/{} cases passed",
        workspace.question_name(),
        results.iter().filter(|r| r.passed).count(),
        results.len()
    );
    Ok(results)
}

/// Debugger launch description for running one case under gdb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub debugger_type: String,
    pub request: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub stop_at_entry: bool,
    pub cwd: PathBuf,
    pub environment: Vec<String>,
    pub external_console: bool,
    #[serde(rename = "MIMode")]
    pub mi_mode: String,
    pub setup_commands: Vec<SetupCommand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupCommand {
    pub description: String,
    pub text: String,
    pub ignore_failures: bool,
}

/// Launch description for the workspace's harness with a single case.
///
/// The debugger hands `args` to a shell, so the case list is shell-escaped.
pub fn debug_launch(workspace: &Workspace, args: &[String]) -> LaunchConfig {
    let encoded = ArgQuoting::ShellEscaped.apply(encode_arguments([args]));
    LaunchConfig {
        name: "g++ - Build and debug active file".to_string(),
        debugger_type: "cppdbg".to_string(),
        request: "launch".to_string(),
        program: workspace.binary_path(),
        args: vec![encoded],
        stop_at_entry: false,
        cwd: workspace.root().to_path_buf(),
        environment: Vec::new(),
        external_console: false,
        mi_mode: "gdb".to_string(),
        setup_commands: vec![SetupCommand {
            description: "Enable pretty-printing for gdb".to_string(),
            text: "-enable-pretty-printing".to_string(),
            ignore_failures: true,
        }],
    }
}

/// Build the harness and describe how to debug it with one case
pub async fn prepare_debug(
    workspace: &Workspace,
    meta: &QuestionMeta,
    args: &[String],
    toolchain: &dyn Toolchain,
) -> Result<LaunchConfig> {
    build_harness(workspace, meta, toolchain).await?;
    Ok(debug_launch(workspace, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{RESULT_CLOSE, RESULT_OPEN};
    use crate::error::HarnessError;
    use crate::toolchain::{RunOutcome, RunStatus};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Toolchain stand-in: "compiles" by touching the binary and answers
    /// runs with canned per-case outputs.
    struct FakeToolchain {
        identity: String,
        outputs: Vec<String>,
        compiles: AtomicUsize,
        received: Mutex<Option<String>>,
    }

    impl FakeToolchain {
        fn new(outputs: &[&str]) -> Self {
            Self {
                identity: "fake-cc".to_string(),
                outputs: outputs.iter().map(|s| s.to_string()).collect(),
                compiles: AtomicUsize::new(0),
                received: Mutex::new(None),
            }
        }

        fn with_identity(mut self, identity: &str) -> Self {
            self.identity = identity.to_string();
            self
        }
    }

    #[async_trait]
    impl Toolchain for FakeToolchain {
        async fn compile(&self, workspace: &Workspace) -> Result<PathBuf> {
            self.compiles.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(workspace.binary_path(), b"").await?;
            Ok(workspace.binary_path())
        }

        async fn run(&self, _binary: &Path, _cwd: &Path, encoded_cases: &str) -> Result<RunOutcome> {
            *self.received.lock().unwrap() = Some(encoded_cases.to_string());
            let stdout = self
                .outputs
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{}{}:{}{}\n", RESULT_OPEN, i, v, RESULT_CLOSE))
                .collect();
            Ok(RunOutcome {
                status: RunStatus::Exited(0),
                stdout,
                stderr: String::new(),
                wall_time_ms: 1,
            })
        }

        fn build_identity(&self) -> String {
            self.identity.clone()
        }
    }

    fn two_sum() -> QuestionMeta {
        QuestionMeta::from_json(
            r#"{"name":"twoSum","params":[{"name":"nums","type":"integer[]"},{"name":"target","type":"integer"}],"return":{"type":"integer[]"}}"#,
        )
        .unwrap()
    }

    async fn workspace_with_solution(dir: &Path) -> Workspace {
        let ws = Workspace::new(dir, "two-sum");
        tokio::fs::create_dir_all(dir.join("question")).await.unwrap();
        tokio::fs::write(ws.solution_path(), "class Solution {};").await.unwrap();
        ws
    }

    #[tokio::test]
    async fn test_two_sum_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_with_solution(dir.path()).await;
        let toolchain = FakeToolchain::new(&["[0,1]"]);
        let cases = vec![TestCase::new(["[2,7,11,15]", "9"], "[0,1]")];

        let results = run_cases(&ws, &two_sum(), &cases, &toolchain).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].case_index, 0);
        assert!(results[0].passed);
        assert_eq!(
            toolchain.received.lock().unwrap().as_deref(),
            Some(r#"[["[2,7,11,15]","9"]]"#)
        );
        let harness = tokio::fs::read_to_string(ws.harness_path()).await.unwrap();
        assert!(harness.contains("s->twoSum(arg0,arg1)"));
        assert!(ws.runtime_dir().join("parse.h").exists());
    }

    #[tokio::test]
    async fn test_unchanged_harness_is_not_recompiled() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_with_solution(dir.path()).await;
        let toolchain = FakeToolchain::new(&["[0,1]"]);
        let cases = vec![TestCase::new(["[2,7,11,15]", "9"], "[1,0]")];

        let first = run_cases(&ws, &two_sum(), &cases, &toolchain).await.unwrap();
        assert!(!first[0].passed);
        run_cases(&ws, &two_sum(), &cases, &toolchain).await.unwrap();
        assert_eq!(toolchain.compiles.load(Ordering::SeqCst), 1);

        tokio::fs::write(ws.solution_path(), "class Solution { };").await.unwrap();
        run_cases(&ws, &two_sum(), &cases, &toolchain).await.unwrap();
        assert_eq!(toolchain.compiles.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_changed_compile_command_forces_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_with_solution(dir.path()).await;
        let gxx = FakeToolchain::new(&[]).with_identity("g++ -std=c++17");
        let broken = FakeToolchain::new(&[]).with_identity("g++ -this-flag-does-not-exist");

        build_harness(&ws, &two_sum(), &gxx).await.unwrap();
        build_harness(&ws, &two_sum(), &gxx).await.unwrap();
        assert_eq!(gxx.compiles.load(Ordering::SeqCst), 1);

        build_harness(&ws, &two_sum(), &broken).await.unwrap();
        assert_eq!(broken.compiles.load(Ordering::SeqCst), 1);

        build_harness(&ws, &two_sum(), &gxx).await.unwrap();
        assert_eq!(gxx.compiles.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_string_containing_result_marker_passes() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_with_solution(dir.path()).await;
        let meta = QuestionMeta::from_json(
            r#"{"name":"echo","params":[{"name":"s","type":"string"}],"return":{"type":"string"}}"#,
        )
        .unwrap();
        let toolchain = FakeToolchain::new(&[r#""a \u0072esultend b""#]);
        let cases = vec![TestCase::new([r#""a resultend b""#], r#""a resultend b""#)];

        let results = run_cases(&ws, &meta, &cases, &toolchain).await.unwrap();
        assert!(results[0].passed, "{results:?}");
        assert_eq!(results[0].actual_output, r#""a resultend b""#);
    }

    #[tokio::test]
    async fn test_missing_output_fails_whole_run() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_with_solution(dir.path()).await;
        let toolchain = FakeToolchain::new(&["[0,1]"]);
        let cases = vec![
            TestCase::new(["[2,7,11,15]", "9"], "[0,1]"),
            TestCase::new(["[3,2,4]", "6"], "[1,2]"),
        ];

        let err = run_cases(&ws, &two_sum(), &cases, &toolchain).await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::MalformedOutput {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unsupported_type_fails_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_with_solution(dir.path()).await;

        let err = QuestionMeta::from_json(
            r#"{"name":"f","params":[{"name":"m","type":"map<string,integer>"}],"return":{"type":"integer"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::UnsupportedType { ref tag } if tag == "map<string,integer>"));
        assert!(!ws.harness_path().exists());
        assert!(!ws.runtime_dir().exists());
    }

    #[tokio::test]
    async fn test_void_without_parameters_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_with_solution(dir.path()).await;
        let meta = QuestionMeta {
            function_name: "noop".into(),
            params: Vec::new(),
            return_spec: crate::meta::ReturnSpec::VoidMutatesFirstArgument,
        };

        let err = prepare_harness(&ws, &meta).await.unwrap_err();
        assert!(matches!(err, HarnessError::InvalidMetadata(_)));
        assert!(!ws.harness_path().exists());
        assert!(!ws.runtime_dir().exists());
    }

    #[tokio::test]
    async fn test_empty_case_list_skips_run() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_with_solution(dir.path()).await;
        let toolchain = FakeToolchain::new(&[]);

        let results = run_cases(&ws, &two_sum(), &[], &toolchain).await.unwrap();
        assert!(results.is_empty());
        assert!(toolchain.received.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prepare_debug_builds_and_describes_launch() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace_with_solution(dir.path()).await;
        let toolchain = FakeToolchain::new(&[]);
        let args = vec!["[2, 7]".to_string(), "9".to_string()];

        let launch = prepare_debug(&ws, &two_sum(), &args, &toolchain).await.unwrap();
        assert_eq!(toolchain.compiles.load(Ordering::SeqCst), 1);
        assert_eq!(launch.program, ws.binary_path());
        assert_eq!(launch.args, vec![r#"[[\"[2,\ 7]\",\"9\"]]"#.to_string()]);

        let json = serde_json::to_value(&launch).unwrap();
        assert_eq!(json["type"], "cppdbg");
        assert_eq!(json["MIMode"], "gdb");
        assert_eq!(json["stopAtEntry"], false);
        assert_eq!(json["setupCommands"][0]["ignoreFailures"], true);
    }
    const TWO_SUM_SOLUTION: &str = r#"
class Solution {
public:
    // @test([2,7,11,15],9)=[0,1]
    vector<int> twoSum(vector<int>& nums, int target) {
        unordered_map<int, int> seen;
        for (int i = 0; i < (int)nums.size(); i++) {
            auto it = seen.find(target - nums[i]);
            if (it != seen.end()) {
                return {it->second, i};
            }
            seen[nums[i]] = i;
        }
        return {};
    }
};
"#;

    const REVERSE_SOLUTION: &str = r#"
class Solution {
public:
    void reverseString(vector<string>& s) {
        reverse(s.begin(), s.end());
    }
};
"#;

    #[tokio::test]
    #[ignore = "requires g++"]
    async fn test_native_two_sum_round_trip() {
        use crate::config::ToolchainConfig;
        use crate::toolchain::NativeToolchain;

        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), "two-sum");
        tokio::fs::create_dir_all(dir.path().join("question")).await.unwrap();
        tokio::fs::write(ws.solution_path(), TWO_SUM_SOLUTION).await.unwrap();

        let mut cases = crate::cases::parse_comment_tests(TWO_SUM_SOLUTION);
        cases.push(TestCase::new(["[3,2,4]", "6"], "[1,2]"));
        cases.push(TestCase::new(["[3,3]", "6"], "[0,2]"));

        let toolchain = NativeToolchain::new(ToolchainConfig::default());
        let results = run_cases(&ws, &two_sum(), &cases, &toolchain).await.unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].passed);
        assert!(results[1].passed);
        assert!(!results[2].passed);
        assert_eq!(results[2].actual_output, "[0,1]");
    }

    #[tokio::test]
    #[ignore = "requires g++"]
    async fn test_native_void_string_array() {
        use crate::config::ToolchainConfig;
        use crate::toolchain::NativeToolchain;

        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), "reverse-string");
        tokio::fs::create_dir_all(dir.path().join("question")).await.unwrap();
        tokio::fs::write(ws.solution_path(), REVERSE_SOLUTION).await.unwrap();
        let meta = QuestionMeta::from_json(
            r#"{"name":"reverseString","params":[{"name":"s","type":"string[]"}],"return":{"type":"void"}}"#,
        )
        .unwrap();
        let cases = vec![
            TestCase::new([r#"["h","e","y"]"#], r#"["y","e","h"]"#),
            TestCase::new([r#"["a b","\"q\""]"#], r#"["\"q\"","a b"]"#),
        ];

        let toolchain = NativeToolchain::new(ToolchainConfig::default());
        let results = run_cases(&ws, &meta, &cases, &toolchain).await.unwrap();

        assert!(results.iter().all(|r| r.passed), "{results:?}");
    }
}
