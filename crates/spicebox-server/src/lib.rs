//! Tool server for spicebox.
//!
//! [`ToolDispatcher`] maps tool names to handlers that validate JSON
//! arguments, act on the circuit registry, the simulation engine and the
//! library catalog, and return a [`ToolResponse`]. [`StdioServer`] exposes the
//! dispatcher as line-delimited JSON-RPC.
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use spicebox_server::{ServerConfig, ToolDispatcher};
//! # fn engine() -> Arc<dyn spicebox_core::SimulationEngine> { unimplemented!() }
//!
//! let tools = ToolDispatcher::new(engine(), ServerConfig::default());
//! tools.execute("create_circuit", json!({"circuit_id": "rc"})).unwrap();
//! let listing = tools.execute("list_circuits", json!({})).unwrap();
//! assert_eq!(listing.summary().unwrap()["count"], 1);
//! ```

pub mod args;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod plot;
pub mod protocol;
pub mod response;
pub mod server;
pub mod sweep;
mod tools;

pub use config::ServerConfig;
pub use dispatcher::{ToolDispatcher, ToolSpec};
pub use error::{ConfigError, Result, ToolError};
pub use plot::{BasicRenderer, ImageFormat, PlotError, PlotRenderer, PlotRequest, RenderedPlot};
pub use response::{ContentPart, ToolResponse};
pub use server::StdioServer;
