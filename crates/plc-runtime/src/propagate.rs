//! Connection propagation.
//!
//! Connections are resolved once per configuration into [`Route`]s grouped
//! by target instance, so a cycle only walks the routes feeding the
//! instance it is about to execute.
//!
//! The target bucket is inferred by probing the target's parameter set
//! (input, then config, defaulting to input). Parameter names must
//! therefore be unique across an instance's input and config buckets.

use std::collections::BTreeMap;

use plc_core::{ParamAddr, ParamMap};
use plc_project::ConnectionDef;
use plc_units::{Bucket, ParamSet};

/// A parsed connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub source: ParamAddr,
    pub target: ParamAddr,
    source_key: String,
}

impl Route {
    pub fn new(source: ParamAddr, target: ParamAddr) -> Self {
        let source_key = source.key();
        Self {
            source,
            target,
            source_key,
        }
    }

    /// Parse both endpoints of `conn`.
    pub fn parse(conn: &ConnectionDef) -> plc_core::CoreResult<Self> {
        let (source, target) = conn.endpoints()?;
        Ok(Self::new(source, target))
    }

    /// Copy the source value from `snapshot` into `target`.
    ///
    /// Returns the bucket written, or `None` when the source has no value
    /// in the snapshot yet (a freshly added instance before it first runs).
    pub fn apply(&self, snapshot: &ParamMap, target: &mut ParamSet) -> Option<Bucket> {
        let Some(&value) = snapshot.get(&self.source_key) else {
            tracing::debug!(
                source = %self.source,
                target = %self.target,
                "source value not available yet, skipping connection"
            );
            return None;
        };
        Some(target.set(&self.target.param, value))
    }
}

/// Routes keyed by target instance, in declaration order.
///
/// Malformed connections are logged and left out.
pub fn inbound_routes(connections: &[ConnectionDef]) -> BTreeMap<String, Vec<Route>> {
    let mut routes: BTreeMap<String, Vec<Route>> = BTreeMap::new();
    for conn in connections {
        match Route::parse(conn) {
            Ok(route) => routes
                .entry(route.target.instance.clone())
                .or_default()
                .push(route),
            Err(err) => {
                tracing::warn!(connection = %conn, error = %err, "skipping malformed connection");
            }
        }
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid_params() -> ParamSet {
        ParamSet::new()
            .with_config("kp", 12.0)
            .with_input("pv", 0.0)
            .with_output("mv", 0.0)
    }

    #[test]
    fn writes_into_declaring_bucket() {
        let snapshot = ParamMap::from([
            ("tank1.level".to_string(), 0.7),
            ("tuner.kp".to_string(), 4.0),
        ]);
        let mut params = pid_params();

        let to_input = Route::parse(&ConnectionDef::new("tank1.level", "pid1.pv")).unwrap();
        assert_eq!(to_input.apply(&snapshot, &mut params), Some(Bucket::Input));
        assert_eq!(params.input_value("pv"), 0.7);

        let to_config = Route::parse(&ConnectionDef::new("tuner.kp", "pid1.kp")).unwrap();
        assert_eq!(to_config.apply(&snapshot, &mut params), Some(Bucket::Config));
        assert_eq!(params.config_value("kp"), 4.0);
    }

    #[test]
    fn undeclared_target_defaults_to_input() {
        let snapshot = ParamMap::from([("a.x".to_string(), 1.0)]);
        let mut params = pid_params();
        let route = Route::parse(&ConnectionDef::new("a.x", "pid1.extra")).unwrap();
        assert_eq!(route.apply(&snapshot, &mut params), Some(Bucket::Input));
        assert_eq!(params.input_value("extra"), 1.0);
    }

    #[test]
    fn missing_source_is_skipped() {
        let mut params = pid_params();
        let route = Route::parse(&ConnectionDef::new("tank9.level", "pid1.pv")).unwrap();
        assert_eq!(route.apply(&ParamMap::new(), &mut params), None);
        assert_eq!(params.input_value("pv"), 0.0);
    }

    #[test]
    fn malformed_connections_are_dropped() {
        let routes = inbound_routes(&[
            ConnectionDef::new("pid1.mv", "valve1.target_opening"),
            ConnectionDef::new("pid1mv", "valve1.target_opening"),
            ConnectionDef::new("valve1.current_opening", "tank1.valve_opening"),
        ]);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes["valve1"].len(), 1);
        assert_eq!(routes["tank1"][0].source.key(), "valve1.current_opening");
    }
}
