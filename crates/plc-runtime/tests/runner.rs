use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use plc_core::Real;
use plc_project::{InstanceDef, PlcConfig};
use plc_runtime::{
    ChannelSource, Engine, Runner, RuntimeSettings, bootstrap, handle_message, lock_engine,
};
use plc_store::SnapshotManager;
use plc_units::{ParamSet, Unit, UnitKind, UnitRegistry, UnitResult};

/// Records input `x` into output `seen`, signalling when it starts
/// executing and then dawdling so the test can act mid-cycle.
#[derive(Debug)]
struct Probe {
    params: ParamSet,
    started: Sender<()>,
}

impl Unit for Probe {
    fn type_tag(&self) -> &str {
        "probe"
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Algorithm
    }

    fn params(&self) -> &ParamSet {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    fn execute(&mut self, _step: Option<Real>) -> UnitResult<()> {
        let _ = self.started.send(());
        thread::sleep(Duration::from_millis(50));
        let x = self.params.input_value("x");
        self.params.output.insert("seen".to_string(), x);
        Ok(())
    }

    fn storable(&self) -> &[&'static str] {
        &["seen"]
    }
}

fn probe_registry(started: Sender<()>) -> UnitRegistry {
    let mut registry = UnitRegistry::empty();
    registry.register("probe", move |spec| {
        let mut params = ParamSet::new().with_input("x", 0.0).with_output("seen", 0.0);
        params.apply_initial("probe", spec.params);
        Ok(Box::new(Probe {
            params,
            started: started.clone(),
        }))
    });
    registry
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("plc_runner_it_{}_{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    done()
}

#[test]
fn write_during_cycle_takes_effect_next_cycle() {
    let (tx, started) = mpsc::channel();
    let config = PlcConfig::new(0.1).with_instance("probe", InstanceDef::new("probe"));
    let engine = Arc::new(Mutex::new(Engine::new(config, probe_registry(tx)).unwrap()));

    let cycle = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || lock_engine(&engine).tick())
    };
    started.recv().unwrap();
    // The cycle holds the engine; this blocks until it finishes.
    handle_message(
        &engine,
        r#"{"action":"write_parameter","paramName":"probe.x","value":5}"#,
    );
    cycle.join().unwrap();

    {
        let engine = lock_engine(&engine);
        assert_eq!(engine.value("probe.seen"), Some(0.0));
        assert_eq!(engine.value("probe.x"), Some(5.0));
    }
    lock_engine(&engine).tick();
    assert_eq!(lock_engine(&engine).value("probe.seen"), Some(5.0));
}

fn tank_loop() -> PlcConfig {
    PlcConfig::new(0.02)
        .with_instance("pid1", InstanceDef::new("PID"))
        .with_instance("valve1", InstanceDef::new("valve"))
        .with_instance("tank1", InstanceDef::new("cylindrical_tank"))
        .with_connection("tank1.level", "pid1.pv")
        .with_connection("pid1.mv", "valve1.target_opening")
        .with_connection("valve1.current_opening", "tank1.valve_opening")
        .with_execution_order(["pid1", "valve1", "tank1"])
}

#[test]
fn runner_serves_commands_and_snapshots_on_stop() {
    let dir = temp_dir("service");
    let settings = RuntimeSettings {
        local_dir: Some(dir.clone()),
        snapshot_interval: 0,
        ..Default::default()
    };
    let (engine, publisher) = bootstrap(tank_loop(), UnitRegistry::default(), &settings).unwrap();
    let (tx, source) = ChannelSource::channel();
    let runner = Runner::start(engine, &settings, Some(Box::new(source))).unwrap();
    let engine = runner.engine();

    assert!(wait_until(Duration::from_secs(5), || publisher.current().is_some()));

    tx.send("garbage".to_string()).unwrap();
    tx.send(r#"{"action":"write_parameter","paramName":"pid1.sv","value":1.5}"#.to_string())
        .unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        lock_engine(&engine).value("pid1.sv") == Some(1.5)
    }));

    let mut slower = tank_loop();
    slower.cycle_period = 0.03;
    let message = serde_json::json!({ "type": "full_replace", "config": slower });
    tx.send(message.to_string()).unwrap();
    assert!(wait_until(Duration::from_secs(5), || {
        (lock_engine(&engine).cycle_period() - 0.03).abs() < 1e-12
    }));
    assert!(runner.is_running());

    let snapshots = SnapshotManager::in_dir(&dir);
    assert!(!snapshots.exists());
    runner.stop().unwrap();

    let saved = snapshots.load().unwrap();
    assert_eq!(saved["pid1.sv"], 1.5);
    assert!(saved.contains_key("tank1.level"));
    let persisted = plc_project::load_from_local(&dir).unwrap().unwrap();
    assert!((persisted.cycle_period - 0.03).abs() < 1e-12);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn runner_stops_after_cycle_limit() {
    let settings = RuntimeSettings {
        realtime: false,
        max_cycles: Some(40),
        ..Default::default()
    };
    let (engine, publisher) = bootstrap(tank_loop(), UnitRegistry::default(), &settings).unwrap();
    let runner = Runner::start(engine, &settings, None).unwrap();
    let engine = runner.engine();
    runner.wait().unwrap();

    assert_eq!(lock_engine(&engine).cycle_count(), 40);
    assert_eq!(publisher.current().unwrap().cycle, 40);
    assert_eq!(publisher.history_len(), 40);
}

#[test]
fn stop_handle_ends_an_unbounded_run_with_a_final_snapshot() {
    let dir = temp_dir("interrupt");
    let settings = RuntimeSettings {
        local_dir: Some(dir.clone()),
        snapshot_interval: 0,
        realtime: false,
        ..Default::default()
    };
    let (engine, publisher) = bootstrap(tank_loop(), UnitRegistry::default(), &settings).unwrap();
    let runner = Runner::start(engine, &settings, None).unwrap();
    let engine = runner.engine();
    let stop = runner.stop_handle();

    let interrupter = thread::spawn(move || {
        assert!(wait_until(Duration::from_secs(5), || {
            publisher.current().is_some_and(|frame| frame.cycle >= 10)
        }));
        stop.request_stop();
    });
    runner.wait().unwrap();
    interrupter.join().unwrap();

    let cycles = lock_engine(&engine).cycle_count();
    assert!(cycles >= 10);
    let saved = SnapshotManager::in_dir(&dir).load().unwrap();
    let level = lock_engine(&engine).value("tank1.level").unwrap();
    assert!((saved["tank1.level"] - level).abs() < 1e-12);

    let _ = std::fs::remove_dir_all(dir);
}
