//! Artifact generator adapter
//!
//! The orchestrator only sees `ArtifactGenerator::generate`: a template kind and a
//! context go in, a complete structured document or a `GenerationError` comes out.
//! `LlmArtifactGenerator` is the production implementation on top of a model provider.

use crate::artifact::{GeneratedDocument, Section};
use crate::error::GenerationError;
use crate::provider::{ChatMessage, CompletionOptions, ModelProviderClient};
use crate::request::GenerationContext;
use crate::template::TemplateCatalog;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

const SUMMARY_MAX_CHARS: usize = 280;

/// Capability boundary for producing one document.
#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    /// Produce a complete document or fail without side effects.
    async fn generate(
        &self,
        template_kind: &str,
        context: &GenerationContext,
    ) -> Result<GeneratedDocument, GenerationError>;
}

/// Generator backed by an LLM provider and the template catalog
pub struct LlmArtifactGenerator {
    client: Arc<dyn ModelProviderClient>,
    catalog: TemplateCatalog,
    options: CompletionOptions,
}

impl LlmArtifactGenerator {
    pub fn new(
        client: Arc<dyn ModelProviderClient>,
        catalog: TemplateCatalog,
        options: CompletionOptions,
    ) -> Self {
        Self {
            client,
            catalog,
            options,
        }
    }

    fn build_messages(&self, title: &str, instructions: &str, context: &GenerationContext) -> Vec<ChatMessage> {
        let system = format!(
            "You draft workplace health, safety and compliance documents for the organisation \
             described by the user. Document type: {title}.\n{instructions}\n\n\
             Respond with a single JSON object and nothing else, using the keys \
             \"title\" (string), \"summary\" (one or two sentences), \"content\" (the full \
             document as markdown) and \"sections\" (array of objects with \"heading\" and \"body\")."
        );

        let mut user = format!("Prepare the {title} using these organisation details:\n");
        if context.is_empty() {
            user.push_str("- (no details supplied)\n");
        }
        for (key, value) in context.iter() {
            user.push_str(&format!("- {}: {}\n", key, render_value(value)));
        }

        vec![ChatMessage::system(system), ChatMessage::user(user)]
    }
}

#[async_trait]
impl ArtifactGenerator for LlmArtifactGenerator {
    async fn generate(
        &self,
        template_kind: &str,
        context: &GenerationContext,
    ) -> Result<GeneratedDocument, GenerationError> {
        let template = self.catalog.resolve(template_kind)?;
        let messages = self.build_messages(&template.title, &template.instructions, context);

        let start = Instant::now();
        let response = self.client.complete(messages, self.options.clone()).await?;
        debug!(
            template_kind = %template_kind,
            provider = %self.client.provider_name(),
            model = %response.model,
            completion_tokens = response.usage.completion_tokens,
            duration_ms = start.elapsed().as_millis(),
            "Provider response received"
        );

        let mut document = parse_document(&response.content)?;
        if document.title.trim().is_empty() {
            document.title = template.title;
        }
        Ok(document)
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "(not provided)".to_string(),
        other => other.to_string(),
    }
}

#[derive(Deserialize)]
struct LlmDocument {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    sections: Option<Vec<Section>>,
}

/// Parse provider output into a document.
///
/// Accepts the requested JSON shape (optionally fenced), and falls back to treating
/// the whole reply as markdown when the model ignored the format instructions.
pub fn parse_document(raw: &str) -> Result<GeneratedDocument, GenerationError> {
    let trimmed = strip_code_fence(raw.trim());
    if trimmed.is_empty() {
        return Err(GenerationError::EmptyContent);
    }

    if let Some(parsed) = parse_json_document(trimmed) {
        return document_from_json(parsed);
    }

    warn!("Provider reply was not JSON, treating it as markdown");
    let sections = extract_sections(trimmed);
    Ok(GeneratedDocument {
        title: first_heading(trimmed).unwrap_or_default(),
        summary: summarize(trimmed),
        content: trimmed.to_string(),
        sections,
    })
}

fn parse_json_document(text: &str) -> Option<LlmDocument> {
    if let Ok(doc) = serde_json::from_str::<LlmDocument>(text) {
        return Some(doc);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<LlmDocument>(&text[start..=end]).ok()
}

fn document_from_json(doc: LlmDocument) -> Result<GeneratedDocument, GenerationError> {
    let sections: Vec<Section> = doc
        .sections
        .unwrap_or_default()
        .into_iter()
        .filter(|s| !s.heading.trim().is_empty() || !s.body.trim().is_empty())
        .collect();

    let content = match doc.content.filter(|c| !c.trim().is_empty()) {
        Some(content) => content,
        None => sections
            .iter()
            .map(|s| format!("## {}\n\n{}", s.heading, s.body))
            .collect::<Vec<_>>()
            .join("\n\n"),
    };
    if content.trim().is_empty() {
        return Err(GenerationError::EmptyContent);
    }

    let sections = if sections.is_empty() {
        extract_sections(&content)
    } else {
        sections
    };
    let summary = doc
        .summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| summarize(&content));

    Ok(GeneratedDocument {
        title: doc.title.unwrap_or_default().trim().to_string(),
        content,
        summary,
        sections,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an info string such as `json` on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn heading_level(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let text = trimmed[level..].strip_prefix(' ')?;
    Some((level, text.trim()))
}

fn first_heading(markdown: &str) -> Option<String> {
    markdown
        .lines()
        .find_map(heading_level)
        .map(|(_, text)| text.to_string())
}

/// Split markdown into sections at level-2+ headings, or level-1 when no deeper ones exist.
pub fn extract_sections(markdown: &str) -> Vec<Section> {
    let has_sub_headings = markdown
        .lines()
        .any(|line| matches!(heading_level(line), Some((level, _)) if level >= 2));
    let min_level = if has_sub_headings { 2 } else { 1 };

    let mut sections = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;
    for line in markdown.lines() {
        match heading_level(line) {
            Some((level, text)) if level >= min_level => {
                if let Some((heading, body)) = current.take() {
                    sections.push(Section {
                        heading,
                        body: body.join("\n").trim().to_string(),
                    });
                }
                current = Some((text.to_string(), Vec::new()));
            }
            _ => {
                if let Some((_, body)) = current.as_mut() {
                    body.push(line);
                }
            }
        }
    }
    if let Some((heading, body)) = current {
        sections.push(Section {
            heading,
            body: body.join("\n").trim().to_string(),
        });
    }
    sections
}

/// First prose paragraph, clipped to a word boundary.
pub fn summarize(markdown: &str) -> String {
    let paragraph = markdown
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty() && heading_level(p.lines().next().unwrap_or("")).is_none())
        .unwrap_or("");
    let flat = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SUMMARY_MAX_CHARS {
        return flat;
    }
    let mut out = String::new();
    for word in flat.split(' ') {
        if out.chars().count() + word.chars().count() + 1 > SUMMARY_MAX_CHARS {
            // A single oversized leading word is clipped rather than dropped.
            if out.is_empty() {
                out.extend(word.chars().take(SUMMARY_MAX_CHARS));
            }
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out.push_str("...");
    out
}
