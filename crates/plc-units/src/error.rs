//! Error types for computational units.

use plc_core::CoreError;
use thiserror::Error;

pub type UnitResult<T> = Result<T, UnitError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum UnitError {
    /// Invalid construction or execution argument.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// A parameter value rejected with context (name and offending value).
    #[error("Invalid parameter {name} = {value}: {what}")]
    InvalidParam {
        name: &'static str,
        value: f64,
        what: &'static str,
    },

    /// No factory is registered under the type tag.
    #[error("Unknown unit type: {type_tag}")]
    UnknownType { type_tag: String },

    /// A model was executed without a step size.
    #[error("Model {type_tag} requires a step size")]
    MissingStep { type_tag: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}
