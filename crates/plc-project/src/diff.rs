//! Structural configuration diffs.
//!
//! A diff is the unit of online reconfiguration: a full replacement is
//! normalized with [`ConfigDiff::between`] and then applied like any other
//! diff, so both paths share [`ConfigDiff::apply`].

use std::collections::BTreeMap;

use plc_core::{ParamValue, Real};
use serde::{Deserialize, Serialize};

use crate::schema::{ConnectionDef, InstanceDef, InstanceTable, PlcConfig};

/// Changes between two configurations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDiff", rename_all = "camelCase")]
pub struct ConfigDiff {
    pub added_instances: InstanceTable,
    pub removed_instances: Vec<String>,
    pub modified_instances: BTreeMap<String, ModifiedInstance>,
    pub added_connections: Vec<ConnectionDef>,
    pub removed_connections: Vec<ConnectionDef>,
    pub cycle_period_changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_cycle_period: Option<Real>,
    pub execution_order_changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_execution_order: Option<Vec<String>>,
}

/// Before/after view of a modified instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedInstance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<InstanceDef>,
    pub to: InstancePatch,
}

/// New state of a modified instance.
///
/// With a type tag the patch is a complete definition and replaces the old
/// one. Without it, `params` are merged into the existing definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstancePatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl From<InstanceDef> for InstancePatch {
    fn from(def: InstanceDef) -> Self {
        Self {
            type_tag: Some(def.type_tag),
            params: def.params,
        }
    }
}

/// What applying a diff changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    /// Modified instances whose type tag changed.
    pub retyped: usize,
}

impl DiffSummary {
    /// Instances must be rebuilt when the set of instances (or the type of
    /// one of them) changed.
    pub fn requires_rebuild(&self) -> bool {
        self.added > 0 || self.removed > 0 || self.retyped > 0
    }
}

impl ConfigDiff {
    /// Diff that turns `old` into `new`.
    pub fn between(old: &PlcConfig, new: &PlcConfig) -> Self {
        let mut diff = Self::default();

        for (name, def) in new.instances.iter() {
            match old.instances.get(name) {
                None => {
                    diff.added_instances.insert(name, def.clone());
                }
                Some(prev) if prev != def => {
                    diff.modified_instances.insert(
                        name.to_string(),
                        ModifiedInstance {
                            from: Some(prev.clone()),
                            to: def.clone().into(),
                        },
                    );
                }
                Some(_) => {}
            }
        }
        diff.removed_instances = old
            .instances
            .names()
            .filter(|name| !new.instances.contains(name))
            .map(str::to_string)
            .collect();

        diff.added_connections = new
            .connections
            .iter()
            .filter(|c| !old.connections.contains(c))
            .cloned()
            .collect();
        diff.removed_connections = old
            .connections
            .iter()
            .filter(|c| !new.connections.contains(c))
            .cloned()
            .collect();

        if old.cycle_period != new.cycle_period {
            diff.cycle_period_changed = true;
            diff.new_cycle_period = Some(new.cycle_period);
        }
        if old.execution_order != new.execution_order {
            diff.execution_order_changed = true;
            diff.new_execution_order = new.execution_order.clone();
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added_instances.is_empty()
            && self.removed_instances.is_empty()
            && self.modified_instances.is_empty()
            && self.added_connections.is_empty()
            && self.removed_connections.is_empty()
            && !self.cycle_period_changed
            && !self.execution_order_changed
    }

    /// Apply to `config` in place: removals, additions, modifications, then
    /// connections, cycle period and execution order.
    pub fn apply(&self, config: &mut PlcConfig) -> DiffSummary {
        let mut summary = DiffSummary::default();

        for name in &self.removed_instances {
            if config.remove_instance(name).is_some() {
                summary.removed += 1;
            }
        }

        for (name, def) in self.added_instances.iter() {
            if config.instances.contains(name) {
                tracing::warn!(instance = name, "added instance already exists, replacing");
            } else {
                summary.added += 1;
            }
            config.add_instance(name, def.clone());
        }

        for (name, change) in &self.modified_instances {
            let existing = config.instances.get(name).map(|d| d.type_tag.clone());
            match (&change.to.type_tag, existing) {
                (Some(type_tag), Some(old_type)) => {
                    if *type_tag != old_type {
                        summary.retyped += 1;
                    }
                    config.add_instance(
                        name,
                        InstanceDef {
                            type_tag: type_tag.clone(),
                            params: change.to.params.clone(),
                        },
                    );
                }
                (Some(type_tag), None) => {
                    tracing::warn!(instance = %name, "modified instance does not exist, adding it");
                    summary.added += 1;
                    config.add_instance(
                        name,
                        InstanceDef {
                            type_tag: type_tag.clone(),
                            params: change.to.params.clone(),
                        },
                    );
                }
                (None, _) => config.update_instance(name, &change.to.params),
            }
            summary.modified += 1;
        }

        for conn in &self.removed_connections {
            config.remove_connection(conn);
        }
        for conn in &self.added_connections {
            config.add_connection(conn.clone());
        }

        if self.cycle_period_changed {
            match self.new_cycle_period {
                Some(period) => config.cycle_period = period,
                None => tracing::warn!("cycle period marked changed without a new value"),
            }
        }
        if self.execution_order_changed {
            config.execution_order = self.new_execution_order.clone();
        }

        summary
    }
}

/// Accepts camelCase and snake_case keys, and the legacy split into
/// models and algorithms.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDiff {
    #[serde(alias = "addedInstances")]
    added_instances: InstanceTable,
    added_models: InstanceTable,
    added_algorithms: InstanceTable,
    #[serde(alias = "removedInstances")]
    removed_instances: Vec<String>,
    removed_models: Vec<String>,
    removed_algorithms: Vec<String>,
    #[serde(alias = "modifiedInstances")]
    modified_instances: BTreeMap<String, ModifiedInstance>,
    modified_models: BTreeMap<String, ModifiedInstance>,
    modified_algorithms: BTreeMap<String, ModifiedInstance>,
    #[serde(alias = "addedConnections")]
    added_connections: Vec<ConnectionDef>,
    #[serde(alias = "removedConnections")]
    removed_connections: Vec<ConnectionDef>,
    #[serde(alias = "cyclePeriodChanged", alias = "cycle_time_changed")]
    cycle_period_changed: bool,
    #[serde(alias = "newCyclePeriod", alias = "cycle_time")]
    new_cycle_period: Option<Real>,
    #[serde(alias = "executionOrderChanged")]
    execution_order_changed: bool,
    #[serde(alias = "newExecutionOrder")]
    new_execution_order: Option<Vec<String>>,
}

impl From<RawDiff> for ConfigDiff {
    fn from(raw: RawDiff) -> Self {
        let mut added_instances = raw.added_instances;
        for (name, def) in raw.added_models.iter().chain(raw.added_algorithms.iter()) {
            added_instances.insert(name, def.clone());
        }
        let mut removed_instances = raw.removed_instances;
        removed_instances.extend(raw.removed_models);
        removed_instances.extend(raw.removed_algorithms);
        let mut modified_instances = raw.modified_instances;
        modified_instances.extend(raw.modified_models);
        modified_instances.extend(raw.modified_algorithms);

        Self {
            added_instances,
            removed_instances,
            modified_instances,
            added_connections: raw.added_connections,
            removed_connections: raw.removed_connections,
            cycle_period_changed: raw.cycle_period_changed,
            new_cycle_period: raw.new_cycle_period,
            execution_order_changed: raw.execution_order_changed,
            new_execution_order: raw.new_execution_order,
        }
    }
}
