//! C++ harness generation
//!
//! The generated `main.cpp` includes the runtime support headers and the
//! user's `question/<name>.cpp`, decodes the case list from `argv[1]`, calls
//! `Solution::<function>` once per case and prints one tagged result line
//! per case.

use tracing::debug;

use super::TypeBinding;
use crate::codec::{RESULT_CLOSE, RESULT_OPEN};
use crate::error::{HarnessError, Result};
use crate::meta::{QuestionMeta, ReturnSpec};
use crate::types::TypeTag;

/// Runtime header every harness includes
const RUNTIME_HEADER: &str = "algm/parse.h";

/// Name of the per-case raw argument vector inside the harness
const ARGS_VAR: &str = "args";

/// Local holding the serialized result of one case
const SERIALIZED_VAR: &str = "serialized";

/// Mapping table from type tag to C++ storage type and runtime functions
pub fn binding(tag: TypeTag) -> TypeBinding {
    let (storage_type, parser, serializer) = match tag {
        TypeTag::Integer => ("int", "parseInteger", "serializeInteger"),
        TypeTag::String => ("string", "parseString", "serializeString"),
        TypeTag::Boolean => ("bool", "parseBool", "serializeBool"),
        TypeTag::Double => ("double", "parseFloat", "serializeFloat"),
        TypeTag::ListNode => ("ListNode *", "parseListNode", "serializeListNode"),
        TypeTag::TreeNode => ("TreeNode *", "parseTreeNode", "serializeTreeNode"),
        TypeTag::IntegerArray | TypeTag::IntegerList => {
            ("vector<int>", "parseIntegerArr", "serializeIntegerArr")
        }
        TypeTag::StringArray | TypeTag::StringList => {
            ("vector<string>", "parseStringArr", "serializeStringArr")
        }
        TypeTag::ListNodeArray | TypeTag::ListNodeList => (
            "vector<ListNode *>",
            "parseListNodeArr",
            "serializeListNodeArr",
        ),
        TypeTag::TreeNodeArray | TypeTag::TreeNodeList => (
            "vector<TreeNode *>",
            "parseTreeNodeArr",
            "serializeTreeNodeArr",
        ),
        TypeTag::IntegerMatrix | TypeTag::IntegerListList => (
            "vector<vector<int>>",
            "parseIntegerArrArr",
            "serializeIntegerArrArr",
        ),
        TypeTag::StringMatrix | TypeTag::CharacterMatrix | TypeTag::StringListList => (
            "vector<vector<string>>",
            "parseStringArrArr",
            "serializeStringArrArr",
        ),
    };
    TypeBinding {
        storage_type,
        parser,
        serializer,
    }
}

fn lookup(tag: &str) -> Result<TypeBinding> {
    Ok(binding(tag.parse()?))
}

pub fn resolve_storage_type(tag: &str) -> Result<&'static str> {
    lookup(tag).map(|b| b.storage_type)
}

pub fn resolve_parser(tag: &str) -> Result<&'static str> {
    lookup(tag).map(|b| b.parser)
}

pub fn resolve_serializer(tag: &str) -> Result<&'static str> {
    lookup(tag).map(|b| b.serializer)
}

fn argument_name(index: usize) -> String {
    format!("arg{}", index)
}

/// Bind the `index`-th raw argument of a case to a typed local `arg<index>`
pub fn compile_parameter_binding(index: usize, tag: TypeTag) -> String {
    let TypeBinding {
        storage_type,
        parser,
        ..
    } = binding(tag);
    format!(
        "{} {} = {}({}[{}]);",
        storage_type,
        argument_name(index),
        parser,
        ARGS_VAR,
        index
    )
}

/// Call the solution with `arg0..arg<n-1>` and serialize the outcome into
/// the `serialized` local.
///
/// A void function is assumed to mutate its first argument, which is what
/// gets serialized in that case.
pub fn compile_invocation_and_result(
    param_count: usize,
    function_name: &str,
    return_spec: ReturnSpec,
    first_param_tag: Option<TypeTag>,
) -> Result<String> {
    let call_args = (0..param_count)
        .map(argument_name)
        .collect::<Vec<_>>()
        .join(",");

    let fragment = match return_spec {
        ReturnSpec::Value(tag) => {
            let TypeBinding {
                storage_type,
                serializer,
                ..
            } = binding(tag);
            format!(
                "{} result = s->{}({});\nstring {} = {}(result);",
                storage_type, function_name, call_args, SERIALIZED_VAR, serializer
            )
        }
        ReturnSpec::VoidMutatesFirstArgument => {
            let tag = match first_param_tag {
                Some(tag) if param_count > 0 => tag,
                _ => {
                    return Err(HarnessError::InvalidMetadata(format!(
                        "{} returns void but declares no parameters",
                        function_name
                    )))
                }
            };
            format!(
                "s->{}({});\nstring {} = {}({});",
                function_name,
                call_args,
                SERIALIZED_VAR,
                binding(tag).serializer,
                argument_name(0)
            )
        }
    };
    Ok(fragment)
}

fn indent(fragment: &str, prefix: &str) -> String {
    fragment
        .lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap per-case code in the fixed harness template
pub fn assemble_harness(
    question_name: &str,
    argument_fragments: &[String],
    invocation_fragment: &str,
) -> String {
    let body_indent = "        ";
    let mut case_body = argument_fragments
        .iter()
        .map(|f| indent(f, body_indent))
        .collect::<Vec<_>>();
    case_body.push(indent(invocation_fragment, body_indent));

    format!(
        r#"#include "algm/algm.h"
#include "question/{question}.cpp"
#include "{runtime}"

int main(int argc, char *argv[])
{{
    if (argc < 2)
    {{
        cerr << "usage: " << argv[0] << " <case-list>" << endl;
        return 2;
    }}
    string encoded = argv[1];
    vector<vector<string>> cases = parseStringArrArr(encoded);
    for (size_t i = 0; i < cases.size(); i++)
    {{
        vector<string> {args} = cases[i];
        Solution *s = new Solution();
{body}
        cout << "{open}" << i << ":" << {serialized} << "{close}" << endl;
        delete s;
    }}
    return 0;
}}
"#,
        question = question_name,
        runtime = RUNTIME_HEADER,
        args = ARGS_VAR,
        body = case_body.join("\n"),
        open = RESULT_OPEN,
        close = RESULT_CLOSE,
        serialized = SERIALIZED_VAR,
    )
}

/// Generate the complete harness for a question.
///
/// `question_name` names the solution file under `question/`.
pub fn generate_harness(question_name: &str, meta: &QuestionMeta) -> Result<String> {
    let argument_fragments = meta
        .params
        .iter()
        .map(|p| compile_parameter_binding(p.index, p.tag))
        .collect::<Vec<_>>();

    let invocation = compile_invocation_and_result(
        meta.params.len(),
        &meta.function_name,
        meta.return_spec,
        meta.first_param_tag(),
    )?;

    debug!(
        "Generated harness for {} ({} parameters)",
        meta.function_name,
        meta.params.len()
    );

    Ok(assemble_harness(
        question_name,
        &argument_fragments,
        &invocation,
    ))
}
