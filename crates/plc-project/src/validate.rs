//! Configuration validation logic.

use std::collections::HashSet;

use crate::schema::PlcConfig;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid instance name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("Malformed connection endpoint '{endpoint}' in {connection}")]
    MalformedEndpoint {
        endpoint: String,
        connection: String,
    },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },
}

/// Structural checks that need no unit registry.
///
/// The dependency ordering is checked separately by
/// [`PlcConfig::execution_order`], which is where cycles are reported.
pub fn validate_config(config: &PlcConfig) -> Result<(), ValidationError> {
    if !(config.cycle_period.is_finite() && config.cycle_period > 0.0) {
        return Err(ValidationError::InvalidValue {
            field: "cyclePeriodSeconds".to_string(),
            value: config.cycle_period.to_string(),
            reason: "must be a positive number of seconds".to_string(),
        });
    }

    for name in config.instances.names() {
        if name.is_empty() {
            return Err(ValidationError::InvalidName {
                name: name.to_string(),
                reason: "must not be empty",
            });
        }
        if name.contains('.') {
            return Err(ValidationError::InvalidName {
                name: name.to_string(),
                reason: "must not contain '.'",
            });
        }
    }

    let mut seen = HashSet::new();
    for conn in &config.connections {
        for endpoint in [&conn.from, &conn.to] {
            let addr = plc_core::ParamAddr::parse(endpoint).map_err(|_| {
                ValidationError::MalformedEndpoint {
                    endpoint: endpoint.clone(),
                    connection: conn.to_string(),
                }
            })?;
            if !config.instances.contains(&addr.instance) {
                return Err(ValidationError::MissingReference {
                    id: addr.instance,
                    context: format!("connection {conn}"),
                });
            }
        }
        if !seen.insert(conn) {
            tracing::warn!(connection = %conn, "duplicate connection");
        }
    }

    Ok(())
}
