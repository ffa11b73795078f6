//! Control-channel messages.
//!
//! Two classes arrive on the command channel: parameter writes, tagged by
//! `action`, and reconfiguration requests, tagged by `type`.

use plc_core::{ParamValue, Real};
use plc_project::{ConfigDiff, PlcConfig};
use serde::{Deserialize, Serialize};

use crate::error::{RuntimeError, RuntimeResult};

/// A staged configuration change, applied between cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConfigUpdate {
    /// Structural diff against the running configuration.
    #[serde(rename = "update_diff", alias = "config_update_diff")]
    Diff {
        diff: ConfigDiff,
        /// Configuration the sender expects after applying `diff`.
        #[serde(
            rename = "fullConfig",
            alias = "full_config",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        full_config: Option<PlcConfig>,
        #[serde(rename = "rebuildInstances", alias = "rebuild_instances", default)]
        rebuild_instances: bool,
        #[serde(rename = "cyclePeriodChanged", alias = "cycle_time_changed", default)]
        cycle_period_changed: bool,
        #[serde(
            rename = "newCyclePeriod",
            alias = "cycle_time",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        new_cycle_period: Option<Real>,
    },

    /// Complete new configuration, normalized to a diff on apply.
    #[serde(rename = "full_replace", alias = "config_update")]
    FullReplace {
        #[serde(alias = "fullConfig")]
        config: PlcConfig,
        #[serde(rename = "rebuildInstances", alias = "rebuild_instances", default)]
        rebuild_instances: bool,
    },

    /// Clear the snapshot and rebuild from `config`.
    #[serde(rename = "reset", alias = "config_reset")]
    Reset {
        #[serde(alias = "fullConfig")]
        config: PlcConfig,
    },
}

impl ConfigUpdate {
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigUpdate::Diff { .. } => "update_diff",
            ConfigUpdate::FullReplace { .. } => "full_replace",
            ConfigUpdate::Reset { .. } => "reset",
        }
    }
}

/// `{ "action": "write_parameter", "paramName": "pid1.sv", "value": 1.2 }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ParameterCommand {
    #[serde(rename = "write_parameter")]
    Write {
        #[serde(rename = "paramName", alias = "param_name")]
        param_name: String,
        value: ParamValue,
    },
}

/// Any message the command thread understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Parameter(ParameterCommand),
    Reconfigure(ConfigUpdate),
}

impl Command {
    /// Parse one JSON message.
    pub fn parse(text: &str) -> RuntimeResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let Some(object) = value.as_object() else {
            return Err(RuntimeError::InvalidMessage {
                message: "expected a JSON object".to_string(),
            });
        };
        if object.contains_key("action") {
            Ok(Command::Parameter(serde_json::from_value(value)?))
        } else if object.contains_key("type") {
            Ok(Command::Reconfigure(serde_json::from_value(value)?))
        } else {
            Err(RuntimeError::InvalidMessage {
                message: "message has neither an 'action' nor a 'type' field".to_string(),
            })
        }
    }
}
