//! plc-runtime: the soft PLC execution engine.
//!
//! Provides:
//! - [`Engine`]: cycle state machine (forward-pass propagation and
//!   execution, publication, checkpoints, staged reconfiguration)
//! - [`Runner`]: cycle and command threads around a shared engine
//! - Control-channel messages ([`Command`], [`ConfigUpdate`])
//! - [`RuntimeSettings`] and wall-clock pacing
//!
//! # Example
//!
//! ```
//! use plc_project::{InstanceDef, PlcConfig};
//! use plc_runtime::Engine;
//! use plc_units::UnitRegistry;
//!
//! let config = PlcConfig::new(0.5)
//!     .with_instance("pid1", InstanceDef::new("PID").with_param("sv", 1.0))
//!     .with_instance("valve1", InstanceDef::new("valve"))
//!     .with_connection("pid1.mv", "valve1.target_opening");
//! let mut engine = Engine::new(config, UnitRegistry::default()).unwrap();
//! engine.run_cycles(4);
//! assert!(engine.value("valve1.current_opening").unwrap() > 0.0);
//! ```

pub mod clock;
pub mod command;
pub mod engine;
pub mod error;
pub mod messages;
pub mod propagate;
pub mod runner;
pub mod settings;

pub use clock::{Pace, Pacer};
pub use command::{ChannelSource, CommandSource, Incoming, handle_message};
pub use engine::{ApplyMode, CycleReport, Engine, ReconfigureReport};
pub use error::{RuntimeError, RuntimeResult};
pub use messages::{Command, ConfigUpdate, ParameterCommand};
pub use propagate::{Route, inbound_routes};
pub use runner::{Runner, StopHandle, bootstrap, lock_engine, startup_config};
pub use settings::RuntimeSettings;
