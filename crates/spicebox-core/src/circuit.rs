//! Circuit session definition.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::Serialize;

use crate::analysis::{current_signal, voltage_signal};
use crate::component::{Component, ModelCard, is_ground};
use crate::error::{Error, Result};

/// A circuit being built up by a client session.
#[derive(Debug, Clone, Serialize)]
pub struct Circuit {
    id: String,
    description: String,
    created_at: DateTime<Utc>,
    components: Vec<Component>,
    models: Vec<ModelCard>,
    active: bool,
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            created_at: Utc::now(),
            components: Vec::new(),
            models: Vec::new(),
            active: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether this is the registry's active circuit.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active_flag(&mut self, active: bool) {
        self.active = active;
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn models(&self) -> &[ModelCard] {
        &self.models
    }

    /// Find a component by name (case-insensitive).
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Mutable access to a component by name (case-insensitive).
    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Find a model card by name (case-insensitive).
    pub fn model(&self, name: &str) -> Option<&ModelCard> {
        self.models.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Add a validated component. Names must be unique within the circuit.
    pub fn add_component(&mut self, component: Component) -> Result<()> {
        component.validate()?;
        if self.component(&component.name).is_some() {
            return Err(Error::InvalidComponent(format!(
                "component '{}' already exists in circuit '{}'",
                component.name, self.id
            )));
        }
        self.components.push(component);
        Ok(())
    }

    /// Remove a component by name, returning it.
    pub fn remove_component(&mut self, name: &str) -> Option<Component> {
        let index = self
            .components
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))?;
        Some(self.components.remove(index))
    }

    /// Add a model card. A card with the same name is replaced.
    pub fn add_model(&mut self, model: ModelCard) -> bool {
        if let Some(existing) = self
            .models
            .iter_mut()
            .find(|m| m.name.eq_ignore_ascii_case(&model.name))
        {
            *existing = model;
            true
        } else {
            self.models.push(model);
            false
        }
    }

    /// Non-ground node names in first-use order.
    pub fn node_names(&self) -> Vec<String> {
        let nodes: IndexSet<&str> = self
            .components
            .iter()
            .flat_map(|c| c.nodes.iter())
            .map(String::as_str)
            .filter(|n| !is_ground(n))
            .collect();
        nodes.into_iter().map(str::to_string).collect()
    }

    /// Signals an analysis of this circuit can produce.
    pub fn signal_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .node_names()
            .iter()
            .map(|n| voltage_signal(n))
            .collect();
        names.extend(
            self.components
                .iter()
                .filter(|c| c.kind.has_branch_current())
                .map(|c| current_signal(&c.name)),
        );
        names
    }
}
