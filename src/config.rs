//! Toolchain configuration
//!
//! Loaded from `files/toolchain.toml` (embedded) or from the file named by
//! `HARNESS_TOOLCHAIN_CONFIG`, then adjusted by environment overrides.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

const DEFAULT_TOOLCHAIN: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/toolchain.toml"));

/// Placeholder for the harness source path in the compile command
pub const SOURCE_PLACEHOLDER: &str = "{source}";
/// Placeholder for the output binary path in the compile command
pub const BINARY_PLACEHOLDER: &str = "{binary}";

#[derive(Debug, Clone, PartialEq)]
pub struct ToolchainConfig {
    /// Compile command template, split on whitespace
    pub compile_command: Vec<String>,
    /// Compile time limit in milliseconds (default: 10000ms)
    pub compile_timeout_ms: u64,
    /// Harness run time limit in milliseconds (default: 10000ms)
    pub run_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct RawToolchainConfig {
    compile_command: String,
    #[serde(default = "default_timeout_ms")]
    compile_timeout_ms: u64,
    #[serde(default = "default_timeout_ms")]
    run_timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compile_command: into_command("g++ -I . -g -std=c++17 {source} -o {binary}"),
            compile_timeout_ms: default_timeout_ms(),
            run_timeout_ms: default_timeout_ms(),
        }
    }
}

impl ToolchainConfig {
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let raw: RawToolchainConfig =
            toml::from_str(content).context("Invalid toolchain configuration")?;
        let compile_command = into_command(&raw.compile_command);
        if compile_command.is_empty() {
            anyhow::bail!("Toolchain compile_command is empty");
        }
        if !compile_command.iter().any(|a| a.contains(SOURCE_PLACEHOLDER)) {
            anyhow::bail!(
                "Toolchain compile_command must reference {}",
                SOURCE_PLACEHOLDER
            );
        }
        Ok(Self {
            compile_command,
            compile_timeout_ms: raw.compile_timeout_ms,
            run_timeout_ms: raw.run_timeout_ms,
        })
    }

    /// Load the configuration from a file, or the embedded default
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read toolchain config {:?}", path))?;
                Self::from_toml(&content)?
            }
            None => Self::from_toml(DEFAULT_TOOLCHAIN)?,
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(value) = std::env::var("HARNESS_COMPILE_TIMEOUT_MS") {
            self.compile_timeout_ms = value
                .parse()
                .with_context(|| format!("Invalid HARNESS_COMPILE_TIMEOUT_MS: {}", value))?;
        }
        if let Ok(value) = std::env::var("HARNESS_RUN_TIMEOUT_MS") {
            self.run_timeout_ms = value
                .parse()
                .with_context(|| format!("Invalid HARNESS_RUN_TIMEOUT_MS: {}", value))?;
        }
        Ok(())
    }

    /// Compile command with placeholders substituted
    pub fn compile_command_for(&self, source: &str, binary: &str) -> Vec<String> {
        self.compile_command
            .iter()
            .map(|arg| {
                arg.replace(SOURCE_PLACEHOLDER, source)
                    .replace(BINARY_PLACEHOLDER, binary)
            })
            .collect()
    }
}

/// Global toolchain configuration
static TOOLCHAIN_CONFIG: OnceLock<ToolchainConfig> = OnceLock::new();

/// Initialize the global configuration, honoring `HARNESS_TOOLCHAIN_CONFIG`
pub fn init_config() -> anyhow::Result<&'static ToolchainConfig> {
    let path = std::env::var("HARNESS_TOOLCHAIN_CONFIG").ok();
    let config = ToolchainConfig::load(path.as_deref().map(Path::new))?;

    TOOLCHAIN_CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("Toolchain configuration already initialized"))?;

    Ok(get_config())
}

/// Get toolchain configuration
pub fn get_config() -> &'static ToolchainConfig {
    TOOLCHAIN_CONFIG.get().unwrap_or_else(|| {
        static DEFAULT: OnceLock<ToolchainConfig> = OnceLock::new();

        warn!("Toolchain configuration not initialized, using default");
        DEFAULT.get_or_init(ToolchainConfig::default)
    })
}

fn into_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(|s| s.to_string()).collect()
}
