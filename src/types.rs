//! Type vocabulary shared by question metadata and code generation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HarnessError;

/// Abstract parameter/return type as written in question metadata.
///
/// The set is closed: a tag outside of it is rejected with
/// [`HarnessError::UnsupportedType`] when metadata is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeTag {
    Integer,
    String,
    Boolean,
    Double,
    ListNode,
    TreeNode,
    IntegerArray,
    StringArray,
    ListNodeArray,
    TreeNodeArray,
    IntegerMatrix,
    StringMatrix,
    CharacterMatrix,
    IntegerList,
    StringList,
    IntegerListList,
    StringListList,
    ListNodeList,
    TreeNodeList,
}

impl TypeTag {
    /// Every tag in the vocabulary
    pub const ALL: [TypeTag; 19] = [
        TypeTag::Integer,
        TypeTag::String,
        TypeTag::Boolean,
        TypeTag::Double,
        TypeTag::ListNode,
        TypeTag::TreeNode,
        TypeTag::IntegerArray,
        TypeTag::StringArray,
        TypeTag::ListNodeArray,
        TypeTag::TreeNodeArray,
        TypeTag::IntegerMatrix,
        TypeTag::StringMatrix,
        TypeTag::CharacterMatrix,
        TypeTag::IntegerList,
        TypeTag::StringList,
        TypeTag::IntegerListList,
        TypeTag::StringListList,
        TypeTag::ListNodeList,
        TypeTag::TreeNodeList,
    ];

    /// Tag spelling used by question metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Integer => "integer",
            TypeTag::String => "string",
            TypeTag::Boolean => "boolean",
            TypeTag::Double => "double",
            TypeTag::ListNode => "ListNode",
            TypeTag::TreeNode => "TreeNode",
            TypeTag::IntegerArray => "integer[]",
            TypeTag::StringArray => "string[]",
            TypeTag::ListNodeArray => "ListNode[]",
            TypeTag::TreeNodeArray => "TreeNode[]",
            TypeTag::IntegerMatrix => "integer[][]",
            TypeTag::StringMatrix => "string[][]",
            TypeTag::CharacterMatrix => "character[][]",
            TypeTag::IntegerList => "list<integer>",
            TypeTag::StringList => "list<string>",
            TypeTag::IntegerListList => "list<list<integer>>",
            TypeTag::StringListList => "list<list<string>>",
            TypeTag::ListNodeList => "list<ListNode>",
            TypeTag::TreeNodeList => "list<TreeNode>",
        }
    }
}

impl FromStr for TypeTag {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s.trim())
            .ok_or_else(|| HarnessError::unsupported(s))
    }
}

impl TryFrom<String> for TypeTag {
    type Error = HarnessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeTag> for String {
    fn from(tag: TypeTag) -> Self {
        tag.as_str().to_string()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_tag_parses_back() {
        for tag in TypeTag::ALL {
            assert_eq!(tag.as_str().parse::<TypeTag>().unwrap(), tag);
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = "map<string,integer>".parse::<TypeTag>().unwrap_err();
        match err {
            HarnessError::UnsupportedType { tag } => assert_eq!(tag, "map<string,integer>"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!("Integer".parse::<TypeTag>().is_err());
        assert!("void".parse::<TypeTag>().is_err());
    }

    #[test]
    fn test_serde_uses_metadata_spelling() {
        let tag: TypeTag = serde_json::from_str("\"list<list<integer>>\"").unwrap();
        assert_eq!(tag, TypeTag::IntegerListList);
        assert_eq!(
            serde_json::to_string(&TypeTag::CharacterMatrix).unwrap(),
            "\"character[][]\""
        );
    }
}
