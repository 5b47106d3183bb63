//! Template catalog
//!
//! Maps a document spec's `template_kind` to the instructions handed to the
//! generation provider. Kinds can be added or overridden from configuration.

use crate::error::GenerationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Prompt material for one template kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    /// Human name of the document type, used in prompts
    pub title: String,
    /// Drafting instructions appended to the system prompt
    pub instructions: String,
}

#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: HashMap<String, TemplateDefinition>,
    allow_unlisted: bool,
}

impl TemplateCatalog {
    pub fn new(allow_unlisted: bool) -> Self {
        Self {
            templates: HashMap::new(),
            allow_unlisted,
        }
    }

    /// Catalog with the built-in compliance document kinds.
    pub fn builtin() -> Self {
        let mut catalog = Self::new(true);
        catalog.insert(
            "risk_assessment",
            "Risk Assessment",
            "Identify hazards, who might be harmed and how, existing controls, \
             a likelihood/severity rating and further actions with owners.",
        );
        catalog.insert(
            "method_statement",
            "Method Statement",
            "Describe the scope of work, sequence of operations, required \
             equipment, PPE, competence requirements and emergency arrangements.",
        );
        catalog.insert(
            "policy",
            "Policy",
            "State the policy intent, scope, responsibilities, arrangements and \
             review cycle in plain language suitable for staff.",
        );
        catalog.insert(
            "procedure",
            "Procedure",
            "Give numbered steps, responsibilities, records to keep and the \
             escalation route when something goes wrong.",
        );
        catalog.insert(
            "coshh_assessment",
            "COSHH Assessment",
            "List the substances, exposure routes, health effects, control \
             measures, storage, first aid and disposal requirements.",
        );
        catalog
    }

    pub fn insert(
        &mut self,
        kind: impl Into<String>,
        title: impl Into<String>,
        instructions: impl Into<String>,
    ) {
        self.templates.insert(
            kind.into(),
            TemplateDefinition {
                title: title.into(),
                instructions: instructions.into(),
            },
        );
    }

    /// Add or replace definitions, e.g. from configuration.
    pub fn extend(&mut self, templates: &HashMap<String, TemplateDefinition>) {
        for (kind, definition) in templates {
            self.templates.insert(kind.clone(), definition.clone());
        }
    }

    pub fn get(&self, kind: &str) -> Option<&TemplateDefinition> {
        self.templates.get(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Resolve a kind to its definition, synthesizing a generic one for unlisted kinds.
    pub fn resolve(&self, kind: &str) -> Result<TemplateDefinition, GenerationError> {
        if let Some(definition) = self.templates.get(kind) {
            return Ok(definition.clone());
        }
        if !self.allow_unlisted {
            return Err(GenerationError::UnknownTemplate(kind.to_string()));
        }
        let title = humanize_kind(kind);
        Ok(TemplateDefinition {
            instructions: format!(
                "Write a complete, professional {} with clear headed sections.",
                title
            ),
            title,
        })
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// `fire_safety_plan` -> `Fire Safety Plan`
fn humanize_kind(kind: &str) -> String {
    kind.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
