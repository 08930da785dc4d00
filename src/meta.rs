//! Question metadata: function name, parameter list and return type

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{HarnessError, Result};
use crate::types::TypeTag;

/// Spelling of a void return in metadata
const VOID: &str = "void";

/// One declared parameter of the solution function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub index: usize,
    pub name: String,
    pub tag: TypeTag,
}

/// What the harness serializes after calling the solution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnSpec {
    /// Serialize the call's return value
    Value(TypeTag),
    /// The function returns nothing; serialize the first argument after the call
    VoidMutatesFirstArgument,
}

/// Validated, read-only description of a question's solution signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionMeta {
    pub function_name: String,
    pub params: Vec<ParameterSpec>,
    pub return_spec: ReturnSpec,
}

/// Metadata as stored alongside the problem
#[derive(Debug, Serialize, Deserialize)]
pub struct RawQuestionMeta {
    pub name: String,
    #[serde(default)]
    pub params: Vec<RawParam>,
    #[serde(rename = "return")]
    pub return_type: RawReturn,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RawParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RawReturn {
    #[serde(rename = "type")]
    pub type_name: String,
}

impl QuestionMeta {
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawQuestionMeta = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    /// Tag of the first parameter, if any
    pub fn first_param_tag(&self) -> Option<TypeTag> {
        self.params.first().map(|p| p.tag)
    }
}

impl TryFrom<RawQuestionMeta> for QuestionMeta {
    type Error = HarnessError;

    fn try_from(raw: RawQuestionMeta) -> Result<Self> {
        let function_name = raw.name.trim().to_string();
        if !is_identifier(&function_name) {
            return Err(HarnessError::InvalidMetadata(format!(
                "function name {:?} is not a valid identifier",
                raw.name
            )));
        }

        let params = raw
            .params
            .into_iter()
            .enumerate()
            .map(|(index, p)| -> Result<ParameterSpec> {
                Ok(ParameterSpec {
                    index,
                    name: p.name,
                    tag: p.type_name.parse()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let return_spec = if raw.return_type.type_name.trim() == VOID {
            if params.is_empty() {
                return Err(HarnessError::InvalidMetadata(format!(
                    "{} returns void but declares no parameters",
                    function_name
                )));
            }
            ReturnSpec::VoidMutatesFirstArgument
        } else {
            ReturnSpec::Value(raw.return_type.type_name.parse()?)
        };

        Ok(QuestionMeta {
            function_name,
            params,
            return_spec,
        })
    }
}

/// Load metadata for a question from a JSON file
pub fn load_question_meta(path: &Path) -> Result<QuestionMeta> {
    if !path.exists() {
        return Err(HarnessError::MetadataNotFound {
            path: path.to_path_buf(),
        });
    }
    debug!("Loading question metadata from {:?}", path);
    let content = std::fs::read_to_string(path)?;
    QuestionMeta::from_json(&content)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
