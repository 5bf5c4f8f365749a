//! Tool table and the shared state every tool handler works against.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Value, json};
use spicebox_core::{
    AnalysisRequest, CachedAnalysisResult, Circuit, CircuitRegistry, SimulationEngine,
    SimulationOptions,
};
use spicebox_library::{IndexReport, LibraryCatalog};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{Result, ToolError};
use crate::plot::{BasicRenderer, ImageFormat, PlotRenderer, PlotRequest, RenderedPlot};
use crate::response::ToolResponse;
use crate::tools;

pub(crate) type Handler = fn(&ToolDispatcher, Value) -> Result<ToolResponse>;

/// A registered tool: its public description and the handler behind it.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema of the argument object.
    pub input_schema: Value,
    handler: Handler,
}

impl ToolSpec {
    pub(crate) fn new(
        name: &'static str,
        description: &'static str,
        input_schema: Value,
        handler: Handler,
    ) -> Self {
        Self {
            name,
            description,
            input_schema,
            handler,
        }
    }

    /// Entry for a `tools/list` reply.
    pub fn definition(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec").field("name", &self.name).finish()
    }
}

/// Single entry point for tool invocations.
///
/// Owns the circuit registry (and with it the result cache), the simulation
/// engine, the plot renderer and the optional library catalog.
pub struct ToolDispatcher {
    registry: CircuitRegistry,
    engine: Arc<dyn SimulationEngine>,
    renderer: Arc<dyn PlotRenderer>,
    catalog: RwLock<Option<LibraryCatalog>>,
    config: ServerConfig,
    tools: IndexMap<&'static str, ToolSpec>,
}

impl ToolDispatcher {
    pub fn new(engine: Arc<dyn SimulationEngine>, config: ServerConfig) -> Self {
        let tools = tools::all().into_iter().map(|spec| (spec.name, spec)).collect();
        Self {
            registry: CircuitRegistry::new(),
            engine,
            renderer: Arc::new(BasicRenderer),
            catalog: RwLock::new(None),
            config,
            tools,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PlotRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Run one tool.
    pub fn execute(&self, name: &str, arguments: Value) -> Result<ToolResponse> {
        let Some(spec) = self.tools.get(name) else {
            warn!(tool = name, "unknown tool");
            return Err(ToolError::UnknownTool(name.to_string()));
        };
        debug!(tool = name, "executing tool");
        let result = guarded(|| (spec.handler)(self, arguments));
        if let Err(e) = &result {
            debug!(tool = name, error = %e, "tool failed");
        }
        result
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.values()
    }

    /// Definitions for every tool, in registration order.
    pub fn tool_definitions(&self) -> Vec<Value> {
        self.tools.values().map(ToolSpec::definition).collect()
    }

    pub fn registry(&self) -> &CircuitRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Index library paths into the catalog, creating it on first use.
    ///
    /// With `clear` the existing catalog is emptied first.
    pub fn index_libraries<P: AsRef<Path>>(&self, paths: &[P], clear: bool) -> IndexReport {
        let mut guard = self.catalog.write();
        let catalog = guard.get_or_insert_with(LibraryCatalog::new);
        if clear {
            catalog.clear();
        }
        let report = catalog.index(paths);
        info!(
            files = report.files_scanned,
            models = catalog.model_count(),
            subcircuits = catalog.subcircuit_count(),
            "library catalog updated"
        );
        report
    }

    pub fn has_catalog(&self) -> bool {
        self.catalog.read().is_some()
    }

    pub(crate) fn with_catalog<T>(&self, f: impl FnOnce(Option<&LibraryCatalog>) -> T) -> T {
        f(self.catalog.read().as_ref())
    }

    pub(crate) fn options(&self) -> SimulationOptions {
        self.config.simulation_options()
    }

    pub(crate) fn engine(&self) -> &dyn SimulationEngine {
        self.engine.as_ref()
    }

    /// Snapshot of the circuit named by `explicit`, or of the active circuit.
    pub(crate) fn circuit(&self, explicit: Option<&str>) -> Result<Circuit> {
        let id = self.registry.resolve(explicit)?;
        Ok(self.registry.get(&id)?)
    }

    /// Run the engine, turning both errors and panics into
    /// [`ToolError::Engine`].
    pub(crate) fn simulate(
        &self,
        circuit: &Circuit,
        request: &AnalysisRequest,
        options: &SimulationOptions,
    ) -> Result<CachedAnalysisResult> {
        debug!(circuit = circuit.id(), analysis = request.name(), "running analysis");
        let result = guarded(|| {
            self.engine
                .run(circuit, request, options)
                .map_err(|e| ToolError::Engine(e.to_string()))
        });
        match &result {
            Ok(r) => debug!(
                circuit = circuit.id(),
                analysis = request.name(),
                points = r.len(),
                "analysis finished"
            ),
            Err(e) => warn!(circuit = circuit.id(), analysis = request.name(), error = %e, "analysis failed"),
        }
        result
    }

    pub(crate) fn render(&self, request: &PlotRequest, format: ImageFormat) -> Result<RenderedPlot> {
        guarded(|| Ok(self.renderer.render(request, format)?))
    }
}

/// Run `f`, converting a panic into [`ToolError::Engine`] with the panic
/// message. Every tool call runs under this, so a panic never reaches the
/// transport.
pub(crate) fn guarded<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "tool panicked".to_string());
            warn!(error = %message, "caught panic");
            Err(ToolError::Engine(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spicebox_core::Error as CoreError;

    struct Failing;

    impl SimulationEngine for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn run(
            &self,
            _circuit: &Circuit,
            request: &AnalysisRequest,
            _options: &SimulationOptions,
        ) -> spicebox_core::Result<CachedAnalysisResult> {
            match request {
                AnalysisRequest::OperatingPoint => Err(CoreError::Engine("no convergence".into())),
                _ => panic!("solver exploded"),
            }
        }
    }

    fn dispatcher() -> ToolDispatcher {
        ToolDispatcher::new(Arc::new(Failing), ServerConfig::default())
    }

    #[test]
    fn test_unknown_tool() {
        let d = dispatcher();
        let err = d.execute("run_noise_analysis", Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: run_noise_analysis");
        assert!(!d.has_tool("run_noise_analysis"));
    }

    #[test]
    fn test_engine_error_and_panic_are_caught() {
        let d = dispatcher();
        let circuit = Circuit::new("c", "");
        let options = d.options();

        let err = d
            .simulate(&circuit, &AnalysisRequest::OperatingPoint, &options)
            .unwrap_err();
        assert!(matches!(err, ToolError::Engine(_)));
        assert!(err.to_string().contains("no convergence"));

        let tran = AnalysisRequest::Transient {
            step: 1e-6,
            stop: 1e-3,
            start: 0.0,
        };
        let err = d.simulate(&circuit, &tran, &options).unwrap_err();
        assert!(err.to_string().contains("solver exploded"));
    }

    #[test]
    fn test_handler_panic_becomes_tool_error() {
        fn exploding(_: &ToolDispatcher, _: Value) -> Result<ToolResponse> {
            panic!("handler exploded")
        }

        let mut d = dispatcher();
        d.tools.insert(
            "explode",
            ToolSpec::new("explode", "always panics", json!({"type": "object"}), exploding),
        );
        let err = d.execute("explode", json!({})).unwrap_err();
        assert!(matches!(err, ToolError::Engine(_)));
        assert!(err.to_string().contains("handler exploded"));
        // The dispatcher stays usable afterwards.
        assert!(d.execute("list_circuits", json!({})).is_ok());
    }

    #[test]
    fn test_definitions_follow_registration_order() {
        let d = dispatcher();
        let names: Vec<_> = d.tools().map(|t| t.name).collect();
        assert_eq!(names.first(), Some(&"create_circuit"));
        assert!(names.contains(&"library_search"));
        let defs = d.tool_definitions();
        assert_eq!(defs.len(), names.len());
        assert!(defs.iter().all(|d| d["inputSchema"]["type"] == "object"));
    }
}
