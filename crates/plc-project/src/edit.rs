//! In-place configuration edits used by online reconfiguration.

use std::collections::BTreeMap;

use plc_core::ParamValue;

use crate::schema::{ConnectionDef, InstanceDef, PlcConfig};

/// Type tag given to an instance created implicitly by an update.
pub const PLACEHOLDER_TYPE: &str = "unknown";

impl PlcConfig {
    /// Add an instance, replacing any previous definition of the same name.
    pub fn add_instance(&mut self, name: &str, def: InstanceDef) {
        tracing::info!(instance = name, type_tag = %def.type_tag, "add instance");
        self.instances.insert(name, def);
    }

    /// Merge `params` into an instance's parameters.
    ///
    /// An unknown name creates a placeholder instance that no registry can
    /// build; the caller is expected to add it properly later.
    pub fn update_instance(&mut self, name: &str, params: &BTreeMap<String, ParamValue>) {
        if !self.instances.contains(name) {
            tracing::warn!(instance = name, "updating unknown instance, creating placeholder");
            self.instances.insert(name, InstanceDef::new(PLACEHOLDER_TYPE));
        }
        if let Some(def) = self.instances.get_mut(name) {
            def.params
                .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
            tracing::info!(instance = name, updated = params.len(), "update instance");
        }
    }

    /// Remove an instance together with every connection touching it and
    /// its slot in an explicit execution order.
    pub fn remove_instance(&mut self, name: &str) -> Option<InstanceDef> {
        let removed = self.instances.remove(name)?;
        let before = self.connections.len();
        self.connections.retain(|conn| !conn.touches(name));
        if let Some(order) = self.execution_order.as_mut() {
            order.retain(|n| n != name);
        }
        tracing::info!(
            instance = name,
            connections_removed = before - self.connections.len(),
            "remove instance"
        );
        Some(removed)
    }

    /// Add a connection unless an identical one exists. Returns `true` if
    /// it was added.
    pub fn add_connection(&mut self, conn: ConnectionDef) -> bool {
        if self.connections.contains(&conn) {
            return false;
        }
        tracing::info!(connection = %conn, "add connection");
        self.connections.push(conn);
        true
    }

    /// Remove every connection equal to `conn`. Returns `true` if any was
    /// removed.
    pub fn remove_connection(&mut self, conn: &ConnectionDef) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| c != conn);
        let removed = self.connections.len() != before;
        if removed {
            tracing::info!(connection = %conn, "remove connection");
        }
        removed
    }

    /// Offline replacement: discard everything and take `other`.
    pub fn replace(&mut self, other: PlcConfig) {
        *self = other;
        tracing::info!(instances = self.instances.len(), "configuration replaced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PlcConfig {
        PlcConfig::new(0.5)
            .with_instance("pid1", InstanceDef::new("PID").with_param("kp", 12.0))
            .with_instance("valve1", InstanceDef::new("valve"))
            .with_instance("tank1", InstanceDef::new("cylindrical_tank"))
            .with_connection("pid1.mv", "valve1.target_opening")
            .with_connection("valve1.current_opening", "tank1.valve_opening")
            .with_connection("tank1.level", "pid1.pv")
            .with_execution_order(["pid1", "valve1", "tank1"])
    }

    #[test]
    fn update_merges_params() {
        let mut c = config();
        let params = BTreeMap::from([("ti".to_string(), ParamValue::Number(10.0))]);
        c.update_instance("pid1", &params);
        let def = c.instances.get("pid1").unwrap();
        assert_eq!(def.params.len(), 2);
        assert_eq!(def.params["ti"], ParamValue::Number(10.0));
    }

    #[test]
    fn update_unknown_creates_placeholder() {
        let mut c = config();
        c.update_instance("pid9", &BTreeMap::new());
        assert_eq!(c.instances.get("pid9").unwrap().type_tag, PLACEHOLDER_TYPE);
    }

    #[test]
    fn remove_instance_drops_its_connections() {
        let mut c = config();
        assert!(c.remove_instance("valve1").is_some());
        assert_eq!(c.connections, vec![ConnectionDef::new("tank1.level", "pid1.pv")]);
        assert_eq!(
            c.execution_order,
            Some(vec!["pid1".to_string(), "tank1".to_string()])
        );
        assert!(c.remove_instance("valve1").is_none());
    }

    #[test]
    fn connections_are_idempotent() {
        let mut c = config();
        let conn = ConnectionDef::new("pid1.mv", "valve1.target_opening");
        assert!(!c.add_connection(conn.clone()));
        assert!(c.remove_connection(&conn));
        assert!(!c.remove_connection(&conn));
        assert!(c.add_connection(conn));
        assert_eq!(c.connections.len(), 3);
    }

    #[test]
    fn replace_discards_everything() {
        let mut c = config();
        c.replace(PlcConfig::new(1.0));
        assert!(c.instances.is_empty());
        assert_eq!(c.cycle_period, 1.0);
    }
}
