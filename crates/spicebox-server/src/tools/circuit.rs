//! Circuit lifecycle and editing tools.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use spicebox_core::{Circuit, Component, ComponentKind, ModelCard};
use tracing::info;

use super::{CircuitArgs, Schema, numeric, string, string_list};
use crate::args::{Numeric, ToolArgs, parse_args, require_items, require_non_empty, resolve_parameters};
use crate::dispatcher::{ToolDispatcher, ToolSpec};
use crate::error::{Result, ToolError};
use crate::response::ToolResponse;

pub(super) fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec::new(
            "create_circuit",
            "Create a new, empty circuit session. The first circuit created becomes active.",
            Schema::new()
                .required("circuit_id", string("Unique circuit id"))
                .optional("description", string("Free-form description"))
                .build(),
            create_circuit,
        ),
        ToolSpec::new(
            "delete_circuit",
            "Delete a circuit and its cached results.",
            Schema::new()
                .required("circuit_id", string("Circuit to delete"))
                .build(),
            delete_circuit,
        ),
        ToolSpec::new(
            "list_circuits",
            "List circuit sessions and the active circuit.",
            Schema::new().build(),
            list_circuits,
        ),
        ToolSpec::new(
            "set_active_circuit",
            "Make a circuit the default target of analysis and plotting tools.",
            Schema::new()
                .required("circuit_id", string("Circuit to activate"))
                .build(),
            set_active_circuit,
        ),
        ToolSpec::new(
            "get_circuit",
            "Describe a circuit: components, models, nodes and available signals.",
            Schema::new().circuit_id().build(),
            get_circuit,
        ),
        ToolSpec::new(
            "add_component",
            "Add a component. Values accept SPICE suffixes (\"4.7k\", \"10u\").",
            Schema::new()
                .circuit_id()
                .required("component_name", string("Instance name, e.g. R1"))
                .required(
                    "component_type",
                    string("resistor, capacitor, inductor, voltage_source, current_source, diode, bjt, mosfet, jfet or subcircuit"),
                )
                .required("nodes", string_list("Terminal nodes in SPICE order; 0 or gnd is ground"))
                .optional("model", string("Model or subcircuit name"))
                .optional("value", numeric("Primary value"))
                .optional(
                    "parameters",
                    json!({"type": "object", "additionalProperties": {"type": ["number", "string"]}}),
                )
                .build(),
            add_component,
        ),
        ToolSpec::new(
            "add_model",
            "Attach a .MODEL card to a circuit, replacing any card with the same name.",
            Schema::new()
                .circuit_id()
                .required("model_name", string("Model name"))
                .required("model_type", string("Device type token, e.g. D, NPN, NMOS"))
                .optional(
                    "parameters",
                    json!({"type": "object", "additionalProperties": {"type": ["number", "string"]}}),
                )
                .build(),
            add_model,
        ),
    ]
}

#[derive(Serialize)]
struct CircuitSummary<'a> {
    circuit_id: &'a str,
    description: &'a str,
    active: bool,
    created_at: String,
    components: usize,
    models: usize,
}

impl<'a> CircuitSummary<'a> {
    fn of(circuit: &'a Circuit) -> Self {
        Self {
            circuit_id: circuit.id(),
            description: circuit.description(),
            active: circuit.is_active(),
            created_at: circuit.created_at().to_rfc3339(),
            components: circuit.components().len(),
            models: circuit.models().len(),
        }
    }
}

#[derive(Deserialize)]
struct CreateCircuitArgs {
    circuit_id: String,
    #[serde(default)]
    description: String,
}

impl ToolArgs for CreateCircuitArgs {
    fn validate(&self) -> Result<()> {
        require_non_empty("circuit_id", &self.circuit_id)?;
        if self.circuit_id.chars().any(char::is_whitespace) {
            return Err(ToolError::validation("circuit_id must not contain whitespace"));
        }
        Ok(())
    }
}

fn create_circuit(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: CreateCircuitArgs = parse_args("create_circuit", arguments)?;
    let registry = d.registry();
    let circuit = registry.create(&args.circuit_id, &args.description)?;

    let active = if registry.active_id().is_none() {
        registry.set_active(circuit.id())?;
        true
    } else {
        false
    };
    ToolResponse::json(&json!({
        "status": "created",
        "circuit_id": circuit.id(),
        "description": circuit.description(),
        "active": active,
        "created_at": circuit.created_at().to_rfc3339(),
    }))
}

#[derive(Deserialize)]
struct CircuitIdArgs {
    circuit_id: String,
}

impl ToolArgs for CircuitIdArgs {
    fn validate(&self) -> Result<()> {
        require_non_empty("circuit_id", &self.circuit_id)
    }
}

fn delete_circuit(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: CircuitIdArgs = parse_args("delete_circuit", arguments)?;
    let registry = d.registry();
    registry.delete(&args.circuit_id)?;
    ToolResponse::json(&json!({
        "status": "deleted",
        "circuit_id": args.circuit_id,
        "active_circuit": registry.active_id(),
        "remaining": registry.len(),
    }))
}

fn list_circuits(d: &ToolDispatcher, _arguments: Value) -> Result<ToolResponse> {
    let registry = d.registry();
    let circuits = registry.list();
    let summaries: Vec<_> = circuits.iter().map(CircuitSummary::of).collect();
    ToolResponse::json(&json!({
        "count": summaries.len(),
        "active_circuit": registry.active_id(),
        "circuits": summaries,
    }))
}

fn set_active_circuit(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: CircuitIdArgs = parse_args("set_active_circuit", arguments)?;
    let registry = d.registry();
    let previous = registry.active_id();
    registry.set_active(&args.circuit_id)?;
    ToolResponse::json(&json!({
        "status": "active",
        "circuit_id": args.circuit_id,
        "previous": previous,
    }))
}

fn get_circuit(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: CircuitArgs = parse_args("get_circuit", arguments)?;
    let circuit = d.circuit(args.circuit_id.as_deref())?;
    ToolResponse::json(&json!({
        "circuit": CircuitSummary::of(&circuit),
        "components": circuit.components(),
        "models": circuit.models(),
        "nodes": circuit.node_names(),
        "signals": circuit.signal_names(),
        "has_results": d.registry().cache().contains(circuit.id()),
    }))
}

#[derive(Deserialize)]
struct AddComponentArgs {
    #[serde(default)]
    circuit_id: Option<String>,
    component_name: String,
    component_type: String,
    nodes: Vec<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    value: Option<Numeric>,
    #[serde(default)]
    parameters: BTreeMap<String, Numeric>,
}

impl AddComponentArgs {
    fn component(&self) -> Result<Component> {
        let kind = ComponentKind::parse(&self.component_type).ok_or_else(|| {
            ToolError::validation(format!("unknown component_type '{}'", self.component_type))
        })?;
        let mut component = Component::new(self.component_name.trim(), kind, self.nodes.clone());
        if let Some(value) = &self.value {
            component = component.with_value(value.resolve("value")?);
        }
        if let Some(model) = &self.model {
            component = component.with_model(model.trim());
        }
        for (name, value) in resolve_parameters(&self.parameters)? {
            component = component.with_parameter(&name, value);
        }
        component.validate()?;
        Ok(component)
    }
}

impl ToolArgs for AddComponentArgs {
    fn validate(&self) -> Result<()> {
        require_non_empty("component_name", &self.component_name)?;
        require_non_empty("component_type", &self.component_type)?;
        require_items("nodes", &self.nodes)?;
        self.component().map(|_| ())
    }
}

fn add_component(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: AddComponentArgs = parse_args("add_component", arguments)?;
    let component = args.component()?;
    let id = d.registry().resolve(args.circuit_id.as_deref())?;

    let node_count = d.registry().update(&id, |circuit| {
        circuit.add_component(component.clone())?;
        Ok(circuit.node_names().len())
    })?;
    info!(circuit = %id, component = %component.name, kind = %component.kind, "component added");
    ToolResponse::json(&json!({
        "status": "added",
        "circuit_id": id,
        "component": component,
        "node_count": node_count,
    }))
}

#[derive(Deserialize)]
struct AddModelArgs {
    #[serde(default)]
    circuit_id: Option<String>,
    model_name: String,
    model_type: String,
    #[serde(default)]
    parameters: BTreeMap<String, Numeric>,
}

impl ToolArgs for AddModelArgs {
    fn validate(&self) -> Result<()> {
        require_non_empty("model_name", &self.model_name)?;
        require_non_empty("model_type", &self.model_type)?;
        resolve_parameters(&self.parameters).map(|_| ())
    }
}

fn add_model(d: &ToolDispatcher, arguments: Value) -> Result<ToolResponse> {
    let args: AddModelArgs = parse_args("add_model", arguments)?;
    let card = resolve_parameters(&args.parameters)?
        .into_iter()
        .fold(ModelCard::new(args.model_name.trim(), args.model_type.trim()), |card, (k, v)| {
            card.with_parameter(&k, v)
        });
    let id = d.registry().resolve(args.circuit_id.as_deref())?;

    let replaced = d.registry().update(&id, |circuit| Ok(circuit.add_model(card.clone())))?;
    info!(circuit = %id, model = %card.name, replaced, "model added");
    ToolResponse::json(&json!({
        "status": if replaced { "replaced" } else { "added" },
        "circuit_id": id,
        "model": card,
    }))
}
