//! Derived signals computed from cached analysis results.
//!
//! Group delay and response measurements are read-only over a
//! [`CachedAnalysisResult`](spicebox_core::CachedAnalysisResult). Port
//! impedance runs its own AC sweep through a
//! [`SimulationEngine`](spicebox_core::SimulationEngine) on a probed copy of
//! the circuit and hands back a result the caller may cache.
//!
//! # Example
//!
//! ```no_run
//! use spicebox_signal::{group_delay, measure_response};
//! # fn demo(result: &spicebox_core::CachedAnalysisResult) -> spicebox_signal::Result<()> {
//! let gd = group_delay(result, "v(out)")?;
//! println!("mean delay {:.3e} s", gd.mean_delay);
//!
//! let report = measure_response(result, "v(out)", &["bandwidth_3db".to_string()])?;
//! println!("{:?}", report.measurements);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod group_delay;
pub mod impedance;
pub mod measure;
pub mod phase;

pub use error::{Error, Result};
pub use group_delay::{GroupDelay, group_delay};
pub use impedance::{Impedance, OPEN_PORT_OHMS, impedance_signal, port_impedance};
pub use measure::{Measurement, Metric, ResponseReport, measure_response};
pub use phase::{derivative, unwrap_phase, wrapped_phase};
