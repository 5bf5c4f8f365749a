//! Linear reference engine for spicebox.
//!
//! Solves circuits made of resistors, capacitors, inductors and independent
//! sources with dense Modified Nodal Analysis:
//! - DC operating point and DC source sweeps
//! - small-signal AC sweeps (linear, decade, octave)
//! - fixed-step backward-Euler transient with PULSE and SIN sources
//!
//! A `gmin` conductance ties every node to ground so isolated nodes stay
//! solvable. Any other device kind is rejected as unsupported.

pub mod analysis;
pub mod engine;
pub mod error;
pub mod mna;
pub mod netlist;
pub mod stamp;
pub mod waveform;

pub use engine::LinearEngine;
pub use error::{Error, Result};
pub use mna::MnaSystem;
pub use netlist::{Element, Netlist};
pub use waveform::{Pulse, Sine, Waveform};
