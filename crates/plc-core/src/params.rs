//! Parameter addressing and value types shared by every layer.
//!
//! At the boundary every parameter is addressed as `instanceName.paramName`.
//! Instance names never contain a dot, so the first dot splits the address.

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};
use crate::numeric::Real;

/// Flat `"instance.param" -> value` map: the live snapshot, the published
/// state and the crash-recovery checkpoint all use this shape.
pub type ParamMap = BTreeMap<String, Real>;

/// Parsed `instance.param` address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamAddr {
    pub instance: String,
    pub param: String,
}

impl ParamAddr {
    pub fn new(instance: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            param: param.into(),
        }
    }

    /// Split `addr` at its first dot. Both halves must be non-empty.
    pub fn parse(addr: &str) -> CoreResult<Self> {
        match addr.split_once('.') {
            Some((instance, param)) if !instance.is_empty() && !param.is_empty() => {
                Ok(Self::new(instance, param))
            }
            _ => Err(CoreError::InvalidAddress {
                addr: addr.to_string(),
            }),
        }
    }

    /// Key used in a [`ParamMap`].
    pub fn key(&self) -> String {
        format!("{}.{}", self.instance, self.param)
    }

    /// `true` when `key` addresses a parameter of `instance`.
    pub fn key_belongs_to(key: &str, instance: &str) -> bool {
        key.len() > instance.len() + 1
            && key.starts_with(instance)
            && key.as_bytes()[instance.len()] == b'.'
    }
}

impl fmt::Display for ParamAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.instance, self.param)
    }
}

impl FromStr for ParamAddr {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Declarative parameter value as written in a configuration file.
///
/// Units only consume numbers; text values (such as a display name) are
/// carried through configuration edits untouched.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum ParamValue {
    Bool(bool),
    Number(Real),
    Text(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<Real> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParamValue::Text(_) => None,
        }
    }
}

impl From<Real> for ParamValue {
    fn from(v: Real) -> Self {
        ParamValue::Number(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}
