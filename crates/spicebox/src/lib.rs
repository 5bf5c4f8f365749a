//! # spicebox
//!
//! Stateful circuit-simulation sessions exposed as a set of JSON tools.
//!
//! A client creates named circuits, adds components and models, runs
//! operating point, DC, AC, transient, parameter and temperature analyses,
//! then plots, measures or exports the most recent result of each circuit.
//! The same tools are served over line-delimited JSON-RPC by the `spicebox`
//! binary.
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use spicebox::prelude::*;
//!
//! let tools = spicebox::tool_server(ServerConfig::default());
//! tools.execute("create_circuit", json!({"circuit_id": "divider"})).unwrap();
//! for (name, nodes, value) in [("V1", ["in", "0"], "10"), ("R1", ["in", "out"], "1k"), ("R2", ["out", "0"], "1k")] {
//!     let kind = &name[..1];
//!     tools
//!         .execute(
//!             "add_component",
//!             json!({"component_name": name, "component_type": kind, "nodes": nodes, "value": value}),
//!         )
//!         .unwrap();
//! }
//! let op = tools.execute("run_op_analysis", json!({})).unwrap();
//! let v_out = op.summary().unwrap()["values"]["v(out)"].as_f64().unwrap();
//! assert!((v_out - 5.0).abs() < 1e-9);
//! ```
//!
//! ## Crates
//!
//! - [`core`]: circuits, the registry, cached results and the engine trait
//! - [`engine`]: the bundled linear MNA engine
//! - [`library`]: SPICE model library indexing and search
//! - [`signal`]: group delay, port impedance and response measurements
//! - [`server`]: tool dispatch, plotting and the stdio transport

use std::sync::Arc;

pub use spicebox_core as core;
pub use spicebox_engine as engine;
pub use spicebox_library as library;
pub use spicebox_signal as signal;
pub use spicebox_server as server;

// ============================================================================
// Convenient re-exports from spicebox_core
// ============================================================================

pub use spicebox_core::{
    AcSweep,
    AcSweepType,
    AnalysisKind,
    AnalysisRequest,
    CachedAnalysisResult,
    Circuit,
    CircuitRegistry,
    Component,
    ComponentKind,
    // Errors
    Error as CoreError,
    ModelCard,
    ResultCache,
    // Engine seam
    SimulationEngine,
    SimulationOptions,
};

// ============================================================================
// Convenient re-exports from the other crates
// ============================================================================

pub use spicebox_engine::LinearEngine;
pub use spicebox_library::{DeviceType, IndexReport, LibraryCatalog, SearchQuery, SearchResults};
pub use spicebox_server::{
    ContentPart, ImageFormat, ServerConfig, StdioServer, ToolDispatcher, ToolError, ToolResponse,
};
pub use spicebox_signal::{GroupDelay, Impedance, ResponseReport};

/// A dispatcher backed by the bundled [`LinearEngine`].
pub fn tool_server(config: ServerConfig) -> ToolDispatcher {
    ToolDispatcher::new(Arc::new(LinearEngine::new()), config)
}

/// Prelude module containing commonly used types and traits.
///
/// ```rust
/// use spicebox::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AnalysisRequest, CachedAnalysisResult, Circuit, CircuitRegistry, Component, ComponentKind,
        SimulationEngine, SimulationOptions,
    };
    pub use crate::{LinearEngine, ServerConfig, StdioServer, ToolDispatcher, ToolResponse};
}
