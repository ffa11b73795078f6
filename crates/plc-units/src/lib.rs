//! plc-units: computational units executed by the soft PLC.
//!
//! Every unit owns a [`ParamSet`] split into `config`, `input` and `output`
//! buckets and implements [`Unit`]. Models (tank, valve) advance by the
//! cycle's step size; algorithms (PID) run on their own sample time.
//!
//! ```
//! use plc_core::ParamMap;
//! use plc_units::{Unit, UnitRegistry};
//!
//! let registry = UnitRegistry::default();
//! let initial = ParamMap::from([("sv".to_string(), 10.0)]);
//! let mut pid = registry.create("PID", &initial, 0.5).unwrap();
//! pid.execute(None).unwrap();
//! assert_eq!(pid.params().output_value("mv"), 100.0);
//! ```

pub mod error;
pub mod params;
pub mod pid;
pub mod registry;
pub mod tank;
pub mod unit;
pub mod valve;

pub use error::{UnitError, UnitResult};
pub use params::{Bucket, ParamSet};
pub use pid::Pid;
pub use registry::{UnitRegistry, UnitSpec};
pub use tank::CylindricalTank;
pub use unit::{Unit, UnitKind};
pub use valve::Valve;
