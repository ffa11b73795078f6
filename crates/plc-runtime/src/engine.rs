//! The cycle engine.
//!
//! One [`Engine::tick`] is one PLC cycle:
//!
//! 1. On the very first cycle, seed the live snapshot from every unit's
//!    current parameters.
//! 2. For each instance in execution order, propagate its inbound
//!    connections from the snapshot, execute it, and write its parameters
//!    back into the snapshot so later instances see this cycle's values.
//! 3. Publish the snapshot and hand the storable parameters to the store.
//! 4. Every `snapshot_interval` cycles, write a snapshot checkpoint.
//!
//! Reconfiguration is staged with [`Engine::stage_update`] and applied by
//! [`Engine::apply_pending`] between cycles, never during one.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use plc_core::{ParamAddr, ParamMap, ParamValue, Real};
use plc_project::{ConfigDiff, DiffSummary, PlcConfig, validate_config};
use plc_store::{CycleStore, Publisher, SnapshotManager, StateFrame};
use plc_units::{Bucket, Unit, UnitKind, UnitRegistry};

use crate::error::{RuntimeError, RuntimeResult};
use crate::messages::ConfigUpdate;
use crate::propagate::{Route, inbound_routes};

/// Outcome of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub executed: usize,
    pub failed: usize,
}

/// How a reconfiguration reached the live instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Settable parameters copied into the live instances; state kept.
    Update,
    /// Every instance reconstructed from its definition; state discarded.
    Rebuild,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconfigureReport {
    pub mode: ApplyMode,
    pub summary: DiffSummary,
    pub order: Vec<String>,
}

pub struct Engine {
    config: PlcConfig,
    registry: UnitRegistry,
    units: BTreeMap<String, Box<dyn Unit>>,
    order: Vec<String>,
    routes: BTreeMap<String, Vec<Route>>,
    snapshot: ParamMap,
    seeded: bool,
    cycle: u64,
    sim_time: Real,
    pending: Option<ConfigUpdate>,
    publisher: Option<Box<dyn Publisher>>,
    store: Option<Box<dyn CycleStore>>,
    snapshots: Option<SnapshotManager>,
    snapshot_interval: u64,
    local_dir: Option<PathBuf>,
}

impl Engine {
    /// Build an engine for `config`.
    ///
    /// Fails on an invalid configuration or an unresolved dependency cycle.
    /// Instances of unknown or misconfigured types are skipped with a
    /// warning.
    pub fn new(config: PlcConfig, registry: UnitRegistry) -> RuntimeResult<Self> {
        validate_config(&config)?;
        let order = config.execution_order()?;
        let units = build_units(&registry, &config);
        let routes = inbound_routes(&config.connections);
        tracing::info!(
            instances = units.len(),
            order = ?order,
            cycle_period = config.cycle_period,
            "engine ready"
        );
        Ok(Self {
            config,
            registry,
            units,
            order,
            routes,
            snapshot: ParamMap::new(),
            seeded: false,
            cycle: 0,
            sim_time: 0.0,
            pending: None,
            publisher: None,
            store: None,
            snapshots: None,
            snapshot_interval: 0,
            local_dir: None,
        })
    }

    pub fn with_publisher(mut self, publisher: impl Publisher + 'static) -> Self {
        self.publisher = Some(Box::new(publisher));
        self
    }

    pub fn with_store(mut self, store: impl CycleStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Checkpoint to `snapshots` every `interval` cycles (`0` disables the
    /// periodic checkpoint).
    pub fn with_snapshots(mut self, snapshots: SnapshotManager, interval: u64) -> Self {
        self.snapshots = Some(snapshots);
        self.snapshot_interval = interval;
        self
    }

    /// Persist the merged configuration to `<dir>/config.yaml` after each
    /// reconfiguration.
    pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &PlcConfig {
        &self.config
    }

    pub fn cycle_period(&self) -> Real {
        self.config.cycle_period
    }

    pub fn execution_order(&self) -> &[String] {
        &self.order
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle
    }

    /// Virtual time: completed cycles times their periods.
    pub fn sim_time(&self) -> Real {
        self.sim_time
    }

    /// Live parameter snapshot, keyed `instance.param`.
    pub fn snapshot(&self) -> &ParamMap {
        &self.snapshot
    }

    /// Current value of `instance.param` in the live instance.
    pub fn value(&self, addr: &str) -> Option<Real> {
        let addr = ParamAddr::parse(addr).ok()?;
        self.units.get(&addr.instance)?.params().get(&addr.param)
    }

    pub fn unit(&self, name: &str) -> Option<&dyn Unit> {
        self.units.get(name).map(|u| u.as_ref())
    }

    pub fn instance_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.units.keys().map(String::as_str)
    }

    pub fn has_pending_update(&self) -> bool {
        self.pending.is_some()
    }

    /// Storable parameters of every live instance.
    pub fn storable_params(&self) -> ParamMap {
        self.units
            .iter()
            .flat_map(|(name, unit)| unit.storable_params(name))
            .collect()
    }

    /// Run one cycle.
    pub fn tick(&mut self) -> CycleReport {
        if !self.seeded {
            for (name, unit) in &self.units {
                self.snapshot.extend(unit.params().flatten(name));
            }
            self.seeded = true;
        }

        let period = self.config.cycle_period;
        let mut report = CycleReport::default();
        for name in &self.order {
            let Some(unit) = self.units.get_mut(name) else {
                continue;
            };
            if let Some(routes) = self.routes.get(name) {
                for route in routes {
                    route.apply(&self.snapshot, unit.params_mut());
                }
            }
            let step = match unit.kind() {
                UnitKind::Model => Some(period),
                UnitKind::Algorithm => None,
            };
            match unit.execute(step) {
                Ok(()) => report.executed += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::error!(instance = %name, error = %err, "instance execution failed");
                }
            }
            self.snapshot.extend(unit.params().flatten(name));
        }

        self.cycle += 1;
        self.sim_time += period;
        report.cycle = self.cycle;
        self.publish();

        if self.snapshot_interval > 0 && self.cycle % self.snapshot_interval == 0 {
            if let Err(err) = self.checkpoint() {
                tracing::error!(cycle = self.cycle, error = %err, "snapshot checkpoint failed");
            }
        }
        report
    }

    fn publish(&mut self) {
        let timestamp = Utc::now();
        if let Some(publisher) = self.publisher.as_mut() {
            let frame = StateFrame {
                cycle: self.cycle,
                timestamp,
                sim_time: self.sim_time,
                params: self.snapshot.clone(),
            };
            if let Err(err) = publisher.publish(&frame) {
                tracing::warn!(cycle = self.cycle, error = %err, "state publication failed");
            }
        }
        if self.store.is_some() {
            let storable = self.storable_params();
            if let Some(store) = self.store.as_mut() {
                if let Err(err) = store.store_cycle(&storable, timestamp) {
                    tracing::warn!(cycle = self.cycle, error = %err, "cycle store failed");
                }
            }
        }
    }

    /// Write a snapshot of the storable parameters now, regardless of the
    /// checkpoint interval. A no-op without a snapshot manager.
    pub fn checkpoint(&self) -> RuntimeResult<()> {
        if let Some(snapshots) = &self.snapshots {
            snapshots.save(&self.storable_params())?;
        }
        Ok(())
    }

    /// Flush any buffered cycle history.
    pub fn flush_store(&mut self) -> RuntimeResult<()> {
        if let Some(store) = self.store.as_mut() {
            store.flush()?;
        }
        Ok(())
    }

    /// Run `cycles` cycles back to back, applying staged updates between
    /// them the way the runner does.
    pub fn run_cycles(&mut self, cycles: u64) -> Vec<CycleReport> {
        (0..cycles)
            .map(|_| {
                let report = self.tick();
                if let Some(Err(err)) = self.apply_pending() {
                    tracing::error!(error = %err, "staged reconfiguration rejected");
                }
                report
            })
            .collect()
    }

    /// Write `value` to `instance.param` in the live instance.
    ///
    /// The value lands in the bucket the propagator would choose and is
    /// mirrored into the live snapshot.
    pub fn set_parameter(&mut self, addr: &str, value: &ParamValue) -> RuntimeResult<Bucket> {
        let parsed = ParamAddr::parse(addr).inspect_err(|_| {
            tracing::warn!(param = addr, "rejected write to malformed address");
        })?;
        let Some(number) = value.as_f64() else {
            tracing::warn!(param = addr, "rejected non-numeric parameter write");
            return Err(plc_core::CoreError::NotNumeric {
                addr: addr.to_string(),
            }
            .into());
        };
        let Some(unit) = self.units.get_mut(&parsed.instance) else {
            tracing::warn!(param = addr, "rejected write to unknown instance");
            return Err(RuntimeError::UnknownInstance {
                name: parsed.instance,
            });
        };
        let bucket = unit.set_param(&parsed.param, number);
        self.snapshot.insert(parsed.key(), number);
        tracing::info!(param = addr, value = number, bucket = %bucket, "parameter written");
        Ok(bucket)
    }

    /// Stage a reconfiguration for the next gap between cycles. A newer
    /// request replaces one that has not been applied yet.
    pub fn stage_update(&mut self, update: ConfigUpdate) {
        if let Some(previous) = self.pending.replace(update) {
            tracing::warn!(kind = previous.kind(), "staged update superseded before it was applied");
        }
        tracing::info!("configuration update staged");
    }

    /// Apply the staged update, if any.
    pub fn apply_pending(&mut self) -> Option<RuntimeResult<ReconfigureReport>> {
        let update = self.pending.take()?;
        Some(self.apply_update(update))
    }

    /// Apply a reconfiguration now.
    ///
    /// The new configuration is validated and ordered before anything live
    /// changes; on error the running configuration stays authoritative.
    pub fn apply_update(&mut self, update: ConfigUpdate) -> RuntimeResult<ReconfigureReport> {
        let kind = update.kind();
        let (config, summary, rebuild, reset) = match update {
            ConfigUpdate::Diff {
                diff,
                full_config,
                rebuild_instances,
                cycle_period_changed,
                new_cycle_period,
            } => {
                let mut merged = self.config.clone();
                let summary = diff.apply(&mut merged);
                if cycle_period_changed {
                    if let Some(period) = new_cycle_period {
                        merged.cycle_period = period;
                    }
                }
                if let Some(expected) = full_config {
                    if !ConfigDiff::between(&merged, &expected).is_empty() {
                        tracing::warn!("diff result differs from the attached full configuration, using the diff");
                    }
                }
                let rebuild = rebuild_instances || summary.requires_rebuild();
                (merged, summary, rebuild, false)
            }
            ConfigUpdate::FullReplace {
                config,
                rebuild_instances,
            } => {
                let mut merged = self.config.clone();
                let summary = ConfigDiff::between(&self.config, &config).apply(&mut merged);
                let rebuild = rebuild_instances || summary.requires_rebuild();
                (merged, summary, rebuild, false)
            }
            ConfigUpdate::Reset { config } => {
                let summary = ConfigDiff::between(&self.config, &config).apply(&mut self.config.clone());
                (config, summary, true, true)
            }
        };

        validate_config(&config)?;
        let order = config.execution_order()?;

        if reset {
            if let Some(snapshots) = &self.snapshots {
                snapshots.clear()?;
            }
        }
        let mode = if rebuild {
            self.units = build_units(&self.registry, &config);
            self.snapshot.clear();
            self.seeded = false;
            ApplyMode::Rebuild
        } else {
            self.update_units(&config);
            ApplyMode::Update
        };
        self.routes = inbound_routes(&config.connections);
        self.order = order.clone();
        if self.config.cycle_period != config.cycle_period {
            tracing::info!(
                from = self.config.cycle_period,
                to = config.cycle_period,
                "cycle period changed"
            );
        }
        self.config = config;

        if let Some(dir) = &self.local_dir {
            if let Err(err) = plc_project::save_to_local(dir, &self.config) {
                tracing::error!(dir = %dir.display(), error = %err, "failed to persist configuration");
            }
        }

        tracing::info!(
            kind,
            mode = ?mode,
            added = summary.added,
            removed = summary.removed,
            modified = summary.modified,
            order = ?order,
            "configuration applied"
        );
        Ok(ReconfigureReport {
            mode,
            summary,
            order,
        })
    }

    /// Copy settable parameters from `config` into the live instances.
    fn update_units(&mut self, config: &PlcConfig) {
        for (name, def) in config.instances.iter() {
            match self.units.get_mut(name) {
                Some(unit) => {
                    let written = unit.params_mut().update_settable(&def.numeric_params());
                    tracing::debug!(instance = name, written, "instance parameters updated");
                }
                None => {
                    tracing::warn!(instance = name, "instance added without rebuild, it will not run");
                }
            }
        }
        for name in self.units.keys() {
            if !config.instances.contains(name) {
                tracing::warn!(instance = %name, "instance removed without rebuild, it keeps running");
            }
        }
    }
}

/// Construct a unit for every instance definition. Failures are logged and
/// the instance is skipped.
fn build_units(registry: &UnitRegistry, config: &PlcConfig) -> BTreeMap<String, Box<dyn Unit>> {
    let mut units = BTreeMap::new();
    for (name, def) in config.instances.iter() {
        match registry.create(&def.type_tag, &def.numeric_params(), config.cycle_period) {
            Ok(unit) => {
                tracing::debug!(instance = name, type_tag = %def.type_tag, kind = %unit.kind(), "instance created");
                units.insert(name.to_string(), unit);
            }
            Err(err) => {
                tracing::warn!(
                    instance = name,
                    type_tag = %def.type_tag,
                    error = %err,
                    "instance creation failed, skipping"
                );
            }
        }
    }
    units
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("cycle", &self.cycle)
            .field("order", &self.order)
            .field("instances", &self.units.len())
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plc_project::InstanceDef;
    use plc_store::MemoryPublisher;

    fn tank_loop() -> PlcConfig {
        PlcConfig::new(0.5)
            .with_instance("pid1", InstanceDef::new("PID").with_param("sv", 1.0))
            .with_instance("valve1", InstanceDef::new("valve"))
            .with_instance("tank1", InstanceDef::new("cylindrical_tank"))
            .with_connection("tank1.level", "pid1.pv")
            .with_connection("pid1.mv", "valve1.target_opening")
            .with_connection("valve1.current_opening", "tank1.valve_opening")
            .with_execution_order(["pid1", "valve1", "tank1"])
    }

    #[test]
    fn first_cycle_seeds_every_parameter() {
        let mut engine = Engine::new(tank_loop(), UnitRegistry::default()).unwrap();
        assert!(engine.snapshot().is_empty());
        engine.tick();
        for key in ["pid1.kp", "valve1.full_travel_time", "tank1.radius", "tank1.level"] {
            assert!(engine.snapshot().contains_key(key), "{key}");
        }
    }

    #[test]
    fn cycle_without_override_is_fatal() {
        let mut config = tank_loop();
        config.execution_order = None;
        let err = Engine::new(config, UnitRegistry::default()).unwrap_err();
        assert!(matches!(err, RuntimeError::Graph(_)));
    }

    #[test]
    fn unknown_type_is_skipped() {
        let config = tank_loop().with_instance("mystery", InstanceDef::new("flux_capacitor"));
        let mut engine = Engine::new(config, UnitRegistry::default()).unwrap();
        assert!(engine.unit("mystery").is_none());
        let report = engine.tick();
        assert_eq!(report.executed, 3);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn publishes_every_cycle() {
        let publisher = MemoryPublisher::new(5);
        let mut engine = Engine::new(tank_loop(), UnitRegistry::default())
            .unwrap()
            .with_publisher(publisher.clone());
        engine.run_cycles(3);
        let current = publisher.current().unwrap();
        assert_eq!(current.cycle, 3);
        assert_eq!(current.sim_time, 1.5);
        assert_eq!(publisher.history_len(), 3);
        assert_eq!(current.params, *engine.snapshot());
    }

    #[test]
    fn parameter_writes_are_validated() {
        let mut engine = Engine::new(tank_loop(), UnitRegistry::default()).unwrap();
        assert_eq!(
            engine.set_parameter("pid1.sv", &ParamValue::Number(1.5)).unwrap(),
            Bucket::Input
        );
        assert_eq!(engine.value("pid1.sv"), Some(1.5));
        assert_eq!(engine.snapshot()["pid1.sv"], 1.5);
        assert_eq!(
            engine.set_parameter("pid1.kp", &ParamValue::Number(6.0)).unwrap(),
            Bucket::Config
        );

        assert!(matches!(
            engine.set_parameter("pid1", &ParamValue::Number(1.0)),
            Err(RuntimeError::Core(_))
        ));
        assert!(matches!(
            engine.set_parameter("pid9.sv", &ParamValue::Number(1.0)),
            Err(RuntimeError::UnknownInstance { .. })
        ));
        assert!(matches!(
            engine.set_parameter("pid1.sv", &ParamValue::Text("high".into())),
            Err(RuntimeError::Core(plc_core::CoreError::NotNumeric { .. }))
        ));
    }

    #[test]
    fn staged_update_waits_for_apply() {
        let mut engine = Engine::new(tank_loop(), UnitRegistry::default()).unwrap();
        let mut faster = tank_loop();
        faster.cycle_period = 0.25;
        engine.stage_update(ConfigUpdate::FullReplace {
            config: faster,
            rebuild_instances: false,
        });
        engine.tick();
        assert_eq!(engine.cycle_period(), 0.5);
        assert!(engine.has_pending_update());

        let report = engine.apply_pending().unwrap().unwrap();
        assert_eq!(report.mode, ApplyMode::Update);
        assert_eq!(engine.cycle_period(), 0.25);
        assert!(engine.apply_pending().is_none());
    }

    #[test]
    fn rejected_update_keeps_running_configuration() {
        let mut engine = Engine::new(tank_loop(), UnitRegistry::default()).unwrap();
        let mut cyclic = tank_loop();
        cyclic.execution_order = None;
        let err = engine
            .apply_update(ConfigUpdate::FullReplace {
                config: cyclic,
                rebuild_instances: true,
            })
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Graph(_)));
        assert_eq!(engine.config(), &tank_loop());
        assert_eq!(engine.execution_order(), ["pid1", "valve1", "tank1"]);
    }
}
