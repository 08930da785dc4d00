//! Target language code generation
//!
//! Maps the type vocabulary onto the runtime support library of a target
//! language and emits harness source. C++ is the only target.

pub mod cpp;

/// Storage type and runtime support functions for one type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeBinding {
    /// Declared type of a local holding the value
    pub storage_type: &'static str,
    /// Runtime function turning one raw argument string into the value
    pub parser: &'static str,
    /// Runtime function turning the value into its output string
    pub serializer: &'static str,
}

pub use cpp::{
    assemble_harness, binding, compile_invocation_and_result, compile_parameter_binding,
    generate_harness, resolve_parser, resolve_serializer, resolve_storage_type,
};
