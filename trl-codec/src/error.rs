//! Defines [`CodecError`] and [`RegistrationError`], the error types of the
//! codec.
//!
//! Every error aborts the encode or decode call that raised it. The only
//! failures that are tried around silently are rejected constructor
//! candidates during positional decoding. A label with no statement is not
//! an error either; decoding then yields `None`.

use smartstring::alias::String;
use thiserror::Error;
use trl_terms::TermError;

/// Errors raised while setting up a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("term name '{name}' is already mapped to {existing}")]
    DuplicateTermName {
        name: String,
        existing: &'static str,
    },

    #[error("type {type_name} is already mapped to term name '{existing}'")]
    DuplicateTypeMapping {
        type_name: &'static str,
        existing: String,
    },

    #[error("identifier '{0}' is already defined")]
    DuplicateIdentifier(String),

    #[error("type {0} is already registered")]
    DuplicateType(&'static str),

    #[error("'{0}' contributes nothing and is not an extension provider")]
    NotAnExtensionProvider(String),

    #[error("extension provider '{0}' is already registered")]
    DuplicateExtensionProvider(String),

    #[error("type {0} is not registered")]
    UnknownType(&'static str),
}

/// Represents all possible errors of an encode or decode call.
///
/// Lower-level errors are wrapped with `#[from]` so `?` works across the
/// term store and the registry.
#[derive(Debug, Error)]
pub enum CodecError {
    /// All parser errors of the document, joined with `"; "`.
    #[error("parse error: {0}")]
    Parse(std::string::String),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Term(#[from] TermError),

    #[error("term '{term_name}' resolves to {resolved}, which is not assignable to {expected}")]
    TypeResolution {
        term_name: String,
        resolved: &'static str,
        expected: &'static str,
    },

    #[error("identifier '{0}' is not defined")]
    UndefinedIdentifier(String),

    #[error("unable to bind {argument} to member '{member}' of {target}: {reason}")]
    Binding {
        member: String,
        argument: std::string::String,
        target: &'static str,
        reason: std::string::String,
        #[source]
        source: Option<Box<CodecError>>,
    },

    #[error("unable to construct {target} from term '{term}': {reason}")]
    Construction {
        term: String,
        target: &'static str,
        reason: std::string::String,
    },

    #[error("more than one result for label '{label}' ({count} statements)")]
    MultipleRoots { label: String, count: usize },

    #[error("cannot convert {text} to {target}: {reason}")]
    Conversion {
        text: std::string::String,
        target: &'static str,
        reason: std::string::String,
    },

    #[error("null is not a valid value for {target}")]
    AbsentValue { target: &'static str },

    #[error("type {0} is not registered")]
    UnknownType(std::string::String),

    #[error("{type_name} value cannot be written as a term: {reason}")]
    Unrepresentable {
        type_name: &'static str,
        reason: std::string::String,
    },
}
