//! Session state for the spicebox tool server.
//!
//! This crate provides the pieces every other spicebox crate builds on:
//! - [`CircuitRegistry`]: circuit sessions plus the "active circuit" pointer
//! - [`ResultCache`]: the most recent analysis result per circuit
//! - [`CachedAnalysisResult`]: real/complex signal storage for one analysis run
//! - [`SimulationEngine`]: the interface to the external circuit solver
//! - SPICE value parsing with SI suffixes

pub mod analysis;
pub mod cache;
pub mod circuit;
pub mod component;
pub mod engine;
pub mod error;
pub mod registry;
pub mod units;

pub use analysis::{AnalysisKind, CachedAnalysisResult, ResultBuilder, current_signal, voltage_signal};
pub use cache::ResultCache;
pub use circuit::Circuit;
pub use component::{Component, ComponentKind, ModelCard, is_ground};
pub use engine::{
    AcSweep, AcSweepType, AnalysisRequest, MAX_AC_POINTS, SimulationEngine, SimulationOptions,
};
pub use error::{Error, Result};
pub use registry::CircuitRegistry;
