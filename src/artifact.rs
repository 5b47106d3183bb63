//! Artifact records: the persisted output of attempting one document spec.

use crate::request::DocumentSpec;
use crate::types::{ArtifactId, RequestId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether an artifact came from the generator or from the degradation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Generated,
    Fallback,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Generated => "generated",
            Provenance::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

/// Structured result returned by an artifact generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub title: String,
    pub content: String,
    pub summary: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// Artifact fields before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArtifact {
    pub parent_request_id: Option<RequestId>,
    pub spec_id: String,
    pub template_kind: String,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub word_count: usize,
    pub structural_sections: Vec<Section>,
    pub provenance: Provenance,
}

impl NewArtifact {
    /// Artifact built from a successful generation.
    pub fn generated(
        request_id: &RequestId,
        spec: &DocumentSpec,
        document: GeneratedDocument,
    ) -> Self {
        let title = if document.title.trim().is_empty() {
            spec.display_title.clone()
        } else {
            document.title
        };
        Self {
            parent_request_id: Some(request_id.clone()),
            spec_id: spec.spec_id.clone(),
            template_kind: spec.template_kind.clone(),
            title,
            word_count: word_count(&document.content),
            content: document.content,
            summary: document.summary,
            structural_sections: document.sections,
            provenance: Provenance::Generated,
        }
    }

    pub fn into_artifact(self, id: ArtifactId, created_at_ms: u64) -> Artifact {
        Artifact {
            id,
            parent_request_id: self.parent_request_id,
            spec_id: self.spec_id,
            template_kind: self.template_kind,
            title: self.title,
            content: self.content,
            summary: self.summary,
            word_count: self.word_count,
            structural_sections: self.structural_sections,
            provenance: self.provenance,
            created_at_ms,
        }
    }
}

/// A persisted artifact. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub parent_request_id: Option<RequestId>,
    pub spec_id: String,
    pub template_kind: String,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub word_count: usize,
    pub structural_sections: Vec<Section>,
    pub provenance: Provenance,
    pub created_at_ms: u64,
}

impl Artifact {
    pub fn is_fallback(&self) -> bool {
        self.provenance == Provenance::Fallback
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
