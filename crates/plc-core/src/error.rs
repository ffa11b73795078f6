use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid parameter address '{addr}': expected 'instance.param'")]
    InvalidAddress { addr: String },

    #[error("Parameter '{addr}' is not numeric")]
    NotNumeric { addr: String },
}
