//! Problem workspace layout and runtime provisioning
//!
//! ```text
//! <root>/
//!   question/<name>.cpp   solution
//!   algm/                 runtime support headers
//!   main/main.cpp         generated harness
//!   main/main             harness binary
//! ```

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{HarnessError, Result};

/// Runtime support headers shipped with the crate, written to `algm/`
pub const RUNTIME_FILES: [(&str, &str); 4] = [
    (
        "algm.h",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/cpp/algm.h")),
    ),
    (
        "ListNode.h",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/cpp/ListNode.h")),
    ),
    (
        "TreeNode.h",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/cpp/TreeNode.h")),
    ),
    (
        "parse.h",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/cpp/parse.h")),
    ),
];

const QUESTION_DIR: &str = "question";
const RUNTIME_DIR: &str = "algm";
/// Harness source, relative to the workspace root
pub const HARNESS_SOURCE: &str = "main/main.cpp";
/// Harness binary, relative to the workspace root
pub const HARNESS_BINARY: &str = "main/main";
const BUILD_STAMP: &str = "main/.build-stamp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    question_name: String,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, question_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            question_name: question_name.into(),
        }
    }

    /// Workspace of a solution stored as `<root>/question/<name>.cpp`
    pub fn from_solution_path(solution: &Path) -> Option<Self> {
        let question_dir = solution.parent()?;
        if question_dir.file_name()? != QUESTION_DIR {
            return None;
        }
        let root = question_dir.parent()?;
        let name = solution.file_stem()?.to_str()?;
        Some(Self::new(root, name))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn question_name(&self) -> &str {
        &self.question_name
    }

    pub fn solution_path(&self) -> PathBuf {
        self.root
            .join(QUESTION_DIR)
            .join(format!("{}.cpp", self.question_name))
    }

    pub fn runtime_dir(&self) -> PathBuf {
        self.root.join(RUNTIME_DIR)
    }

    pub fn harness_path(&self) -> PathBuf {
        self.root.join(HARNESS_SOURCE)
    }

    pub fn binary_path(&self) -> PathBuf {
        self.root.join(HARNESS_BINARY)
    }

    fn stamp_path(&self) -> PathBuf {
        self.root.join(BUILD_STAMP)
    }

    /// Copy runtime headers into `algm/`, leaving existing files alone
    pub async fn provision_runtime(&self) -> Result<()> {
        let dir = self.runtime_dir();
        fs::create_dir_all(&dir).await?;
        for (name, content) in RUNTIME_FILES {
            let path = dir.join(name);
            if fs::try_exists(&path).await? {
                continue;
            }
            debug!("Provisioning runtime header {:?}", path);
            fs::write(&path, content).await?;
        }
        Ok(())
    }

    /// Overwrite `main/main.cpp` with freshly generated source
    pub async fn write_harness(&self, source: &str) -> Result<PathBuf> {
        let path = self.harness_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, source).await?;
        debug!("Wrote harness {:?}", path);
        Ok(path)
    }

    pub async fn read_solution(&self) -> Result<String> {
        Ok(fs::read_to_string(self.solution_path()).await?)
    }

    /// Fingerprint of everything the harness binary is built from,
    /// including the toolchain's `build_identity`
    pub async fn build_stamp(&self, harness_source: &str, build_identity: &str) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(build_identity.as_bytes());
        hasher.update([0u8]);
        hasher.update(harness_source.as_bytes());
        hasher.update(fs::read(self.solution_path()).await?);
        for (name, _) in RUNTIME_FILES {
            hasher.update(name.as_bytes());
            hasher.update(fs::read(self.runtime_dir().join(name)).await?);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Whether the binary on disk was built from inputs with this stamp
    pub async fn is_up_to_date(&self, stamp: &str) -> bool {
        if !fs::try_exists(self.binary_path()).await.unwrap_or(false) {
            return false;
        }
        match fs::read_to_string(self.stamp_path()).await {
            Ok(recorded) => recorded.trim() == stamp,
            Err(_) => false,
        }
    }

    pub async fn record_stamp(&self, stamp: &str) -> Result<()> {
        fs::write(self.stamp_path(), stamp).await?;
        Ok(())
    }

    pub async fn clear_stamp(&self) -> Result<()> {
        match fs::remove_file(self.stamp_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Throwaway workspace for a solution that lives outside a problem tree
pub struct ScratchWorkspace {
    _dir: TempDir,
    pub workspace: Workspace,
}

impl ScratchWorkspace {
    pub async fn from_solution(solution: &Path) -> Result<Self> {
        let name = solution
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                HarnessError::InvalidMetadata(format!("cannot name question after {:?}", solution))
            })?
            .to_string();
        let dir = tempfile::tempdir()?;
        let workspace = Workspace::new(dir.path(), name);

        let target = workspace.solution_path();
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(solution, &target).await?;
        info!("Using scratch workspace {:?}", dir.path());

        Ok(Self {
            _dir: dir,
            workspace,
        })
    }
}
