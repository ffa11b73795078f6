//! Legacy layout migration.
//!
//! Older configurations split instances into `models:` and `algorithms:`
//! maps, name the cycle period `cycle_time`, and spell connections out in
//! four fields (`from`, `from_param`, `to`, `to_param`). Everything is
//! folded into the canonical [`PlcConfig`] while deserializing.

use plc_core::Real;
use serde::Deserialize;

use crate::schema::{ConnectionDef, DEFAULT_CYCLE_PERIOD, InstanceTable, PlcConfig};

fn default_cycle_period() -> Real {
    DEFAULT_CYCLE_PERIOD
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawConfig {
    #[serde(
        rename = "cyclePeriodSeconds",
        alias = "cycle_time",
        alias = "cycle_period",
        default = "default_cycle_period"
    )]
    cycle_period: Real,
    #[serde(default)]
    instances: InstanceTable,
    #[serde(default)]
    models: InstanceTable,
    #[serde(default)]
    algorithms: InstanceTable,
    #[serde(default)]
    connections: Vec<ConnectionDef>,
    #[serde(rename = "executionOrder", alias = "execution_order", default)]
    execution_order: Option<Vec<String>>,
}

impl From<RawConfig> for PlcConfig {
    fn from(raw: RawConfig) -> Self {
        let legacy = !raw.models.is_empty() || !raw.algorithms.is_empty();
        let mut instances = raw.instances;
        for (name, def) in raw.models.iter().chain(raw.algorithms.iter()) {
            if instances.contains(name) {
                tracing::warn!(instance = %name, "instance declared twice, keeping the first");
                continue;
            }
            instances.insert(name, def.clone());
        }
        if legacy {
            tracing::debug!(count = instances.len(), "migrated legacy models/algorithms layout");
        }

        PlcConfig {
            cycle_period: raw.cycle_period,
            instances,
            connections: raw.connections,
            execution_order: raw.execution_order,
        }
    }
}

/// Either connection spelling.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawConnection {
    Legacy {
        from: String,
        from_param: String,
        to: String,
        to_param: String,
    },
    Compact {
        from: String,
        to: String,
    },
}

impl From<RawConnection> for ConnectionDef {
    fn from(raw: RawConnection) -> Self {
        match raw {
            RawConnection::Legacy {
                from,
                from_param,
                to,
                to_param,
            } => ConnectionDef::new(format!("{from}.{from_param}"), format!("{to}.{to_param}")),
            RawConnection::Compact { from, to } => ConnectionDef::new(from, to),
        }
    }
}
