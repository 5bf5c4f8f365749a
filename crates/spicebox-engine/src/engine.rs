//! [`SimulationEngine`] implementation backed by dense linear MNA.

use spicebox_core::{AnalysisRequest, CachedAnalysisResult, Circuit, SimulationEngine, SimulationOptions};
use tracing::{debug, info};

use crate::analysis;
use crate::error::Result;
use crate::netlist::Netlist;

/// Reference engine for linear circuits (R, C, L, independent V and I sources).
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearEngine;

impl LinearEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run an analysis, reporting engine errors.
    pub fn simulate(
        &self,
        circuit: &Circuit,
        request: &AnalysisRequest,
        options: &SimulationOptions,
    ) -> Result<CachedAnalysisResult> {
        let netlist = Netlist::from_circuit(circuit, options)?;
        debug!(
            circuit = circuit.id(),
            analysis = request.name(),
            nodes = netlist.num_nodes(),
            branches = netlist.num_branches(),
            temperature = options.temperature,
            "running analysis"
        );

        let result = match request {
            AnalysisRequest::OperatingPoint => analysis::operating_point(&netlist, options)?,
            AnalysisRequest::DcSweep {
                source,
                start,
                stop,
                step,
            } => analysis::dc_sweep(&netlist, options, source, *start, *stop, *step)?,
            AnalysisRequest::Ac(sweep) => analysis::ac_sweep(&netlist, options, sweep)?,
            AnalysisRequest::Transient { step, stop, start } => {
                analysis::transient(&netlist, options, *step, *stop, *start)?
            }
        };

        info!(
            circuit = circuit.id(),
            analysis = request.name(),
            points = result.len(),
            signals = result.signal_names().len(),
            "analysis complete"
        );
        Ok(result)
    }
}

impl SimulationEngine for LinearEngine {
    fn name(&self) -> &str {
        "spicebox-linear"
    }

    fn run(
        &self,
        circuit: &Circuit,
        request: &AnalysisRequest,
        options: &SimulationOptions,
    ) -> spicebox_core::Result<CachedAnalysisResult> {
        Ok(self.simulate(circuit, request, options)?)
    }
}
