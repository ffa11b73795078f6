//! Threaded runner service.
//!
//! The cycle thread owns execution: it ticks the engine, applies staged
//! reconfigurations between cycles and paces to the cycle period. The
//! optional command thread feeds parameter writes and reconfiguration
//! requests into the same engine. Both go through one mutex, so a write
//! never lands in the middle of a cycle.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use plc_project::PlcConfig;
use plc_store::{JsonlCycleStore, MemoryPublisher, SnapshotManager, apply_snapshot_to_config};
use plc_units::UnitRegistry;

use crate::clock::Pacer;
use crate::command::{CommandSource, command_loop};
use crate::engine::Engine;
use crate::error::{RuntimeError, RuntimeResult};
use crate::settings::RuntimeSettings;

/// Lock the engine, recovering it if a previous holder panicked.
pub fn lock_engine(engine: &Mutex<Engine>) -> MutexGuard<'_, Engine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build an engine the way the runner service starts one.
///
/// Restores the snapshot found in the local directory (if any) into
/// `config`, then wires the publisher, snapshot checkpoints, local
/// configuration persistence and the optional JSON-lines cycle store.
pub fn bootstrap(
    mut config: PlcConfig,
    registry: UnitRegistry,
    settings: &RuntimeSettings,
) -> RuntimeResult<(Engine, MemoryPublisher)> {
    let snapshots = settings.local_dir.as_deref().map(SnapshotManager::in_dir);
    if let Some(params) = snapshots.as_ref().and_then(SnapshotManager::load) {
        apply_snapshot_to_config(&mut config, &params);
    }

    let publisher = MemoryPublisher::new(settings.history_capacity);
    let mut engine = Engine::new(config, registry)?.with_publisher(publisher.clone());
    if let Some(snapshots) = snapshots {
        engine = engine.with_snapshots(snapshots, settings.snapshot_interval);
    }
    if let Some(dir) = &settings.local_dir {
        engine = engine.with_local_dir(dir);
    }
    if let Some(path) = &settings.store_path {
        engine = engine.with_store(JsonlCycleStore::open(path, settings.store_flush_every)?);
    }
    Ok((engine, publisher))
}

/// Load `<dir>/config.yaml` when present, else `fallback`.
pub fn startup_config(dir: Option<&Path>, fallback: PlcConfig) -> RuntimeResult<PlcConfig> {
    match dir {
        Some(dir) => Ok(plc_project::load_from_local(dir)?.unwrap_or(fallback)),
        None => Ok(fallback),
    }
}

/// Asks a [`Runner`] to stop from another thread or a signal handler.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Clear the running flag. The cycle in flight completes and the final
    /// snapshot is written before the cycle thread exits.
    pub fn request_stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle on a running engine.
pub struct Runner {
    engine: Arc<Mutex<Engine>>,
    running: Arc<AtomicBool>,
    cycle_thread: Option<JoinHandle<()>>,
    command_thread: Option<JoinHandle<()>>,
}

impl Runner {
    /// Spawn the cycle thread and, with a command source, the command
    /// thread.
    pub fn start(
        engine: Engine,
        settings: &RuntimeSettings,
        commands: Option<Box<dyn CommandSource>>,
    ) -> RuntimeResult<Self> {
        let engine = Arc::new(Mutex::new(engine));
        let running = Arc::new(AtomicBool::new(true));

        let cycle_thread = {
            let engine = Arc::clone(&engine);
            let running = Arc::clone(&running);
            let pacer = Pacer::new(settings.realtime);
            let max_cycles = settings.max_cycles;
            thread::Builder::new()
                .name("plc-cycle".to_string())
                .spawn(move || cycle_loop(&engine, &running, pacer, max_cycles))
                .map_err(|_| RuntimeError::Thread {
                    what: "could not spawn cycle thread",
                })?
        };

        let command_thread = match commands {
            Some(source) => {
                let shared = Arc::clone(&engine);
                let flag = Arc::clone(&running);
                let spawned = thread::Builder::new()
                    .name("plc-commands".to_string())
                    .spawn(move || command_loop(source, shared, flag));
                match spawned {
                    Ok(handle) => Some(handle),
                    Err(_) => {
                        running.store(false, Ordering::SeqCst);
                        let _ = cycle_thread.join();
                        return Err(RuntimeError::Thread {
                            what: "could not spawn command thread",
                        });
                    }
                }
            }
            None => None,
        };

        tracing::info!("runner started");
        Ok(Self {
            engine,
            running,
            cycle_thread: Some(cycle_thread),
            command_thread,
        })
    }

    /// Shared handle on the engine.
    pub fn engine(&self) -> Arc<Mutex<Engine>> {
        Arc::clone(&self.engine)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.running))
    }

    /// `false` once stopped or once the cycle limit was reached.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request a stop and wait for both threads. The cycle thread finishes
    /// the cycle in flight and writes a final snapshot.
    pub fn stop(mut self) -> RuntimeResult<()> {
        self.running.store(false, Ordering::SeqCst);
        self.join()
    }

    /// Wait for the cycle thread to finish on its own (cycle limit or a
    /// [`StopHandle`] request), then stop the command thread.
    pub fn wait(mut self) -> RuntimeResult<()> {
        if let Some(handle) = self.cycle_thread.take() {
            handle.join().map_err(|_| RuntimeError::Thread {
                what: "cycle thread panicked",
            })?;
        }
        self.running.store(false, Ordering::SeqCst);
        self.join()
    }

    fn join(&mut self) -> RuntimeResult<()> {
        let mut result = Ok(());
        if let Some(handle) = self.cycle_thread.take() {
            if handle.join().is_err() {
                result = Err(RuntimeError::Thread {
                    what: "cycle thread panicked",
                });
            }
        }
        if let Some(handle) = self.command_thread.take() {
            if handle.join().is_err() {
                result = Err(RuntimeError::Thread {
                    what: "command thread panicked",
                });
            }
        }
        tracing::info!("runner stopped");
        result
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        if self.cycle_thread.is_some() || self.command_thread.is_some() {
            self.running.store(false, Ordering::SeqCst);
            let _ = self.join();
        }
    }
}

fn cycle_loop(
    engine: &Mutex<Engine>,
    running: &AtomicBool,
    mut pacer: Pacer,
    max_cycles: Option<u64>,
) {
    tracing::info!(realtime = pacer.is_realtime(), ?max_cycles, "cycle loop started");
    let mut cycles = 0u64;
    while running.load(Ordering::SeqCst) {
        if max_cycles.is_some_and(|max| cycles >= max) {
            break;
        }
        let started = Instant::now();
        let period = {
            let mut engine = lock_engine(engine);
            let report = engine.tick();
            if report.failed > 0 {
                tracing::debug!(cycle = report.cycle, failed = report.failed, "cycle finished with failures");
            }
            if let Some(Err(err)) = engine.apply_pending() {
                tracing::error!(error = %err, "reconfiguration rejected, keeping current configuration");
            }
            engine.cycle_period()
        };
        cycles += 1;
        pacer.wait(started, period, running);
    }

    let mut engine = lock_engine(engine);
    if let Err(err) = engine.checkpoint() {
        tracing::error!(error = %err, "final snapshot failed");
    }
    if let Err(err) = engine.flush_store() {
        tracing::error!(error = %err, "final store flush failed");
    }
    running.store(false, Ordering::SeqCst);
    tracing::info!(cycles, overruns = pacer.overruns(), "cycle loop stopped");
}
