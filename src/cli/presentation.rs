//! CLI presentation: text and json formatters for requests, artifacts and batch summaries.

use crate::artifact::{Artifact, Provenance};
use crate::error::ApiError;
use crate::generation::BatchSummary;
use crate::request::{GenerationRequest, RequestStatus};
use chrono::{DateTime, Utc};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn format_status(status: RequestStatus) -> String {
    match status {
        RequestStatus::Completed => status.as_str().green().to_string(),
        RequestStatus::Failed => status.as_str().red().to_string(),
        RequestStatus::InProgress => status.as_str().yellow().to_string(),
        RequestStatus::Pending => status.as_str().dimmed().to_string(),
    }
}

fn format_provenance(provenance: Provenance) -> String {
    match provenance {
        Provenance::Generated => provenance.as_str().to_string(),
        Provenance::Fallback => provenance.as_str().yellow().to_string(),
    }
}

fn format_timestamp(ms: Option<u64>) -> String {
    ms.and_then(|ms| i64::try_from(ms).ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::InvalidState(format!("Failed to render JSON: {}", e)))
}

pub fn format_request_text(request: &GenerationRequest) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Generation Request")));
    out.push_str(&format!("  ID:        {}\n", request.id));
    out.push_str(&format!("  Owner:     {}\n", request.owner_context_id));
    out.push_str(&format!("  Status:    {}\n", format_status(request.status)));
    out.push_str(&format!(
        "  Progress:  {} completed, {} failed, {} total\n",
        request.completed_count, request.failed_count, request.total_count
    ));
    out.push_str(&format!("  Created:   {}\n", format_timestamp(Some(request.created_at_ms))));
    out.push_str(&format!("  Started:   {}\n", format_timestamp(request.started_at_ms)));
    out.push_str(&format!("  Finished:  {}\n", format_timestamp(request.completed_at_ms)));
    if let Some(reason) = &request.failure_reason {
        out.push_str(&format!("  Reason:    {}\n", reason));
    }

    out.push_str(&format!("\n{}\n\n", format_section_heading("Requested documents")));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["#", "Spec ID", "Title", "Template"]);
    for (index, spec) in request.requested_specs.iter().enumerate() {
        table.add_row(vec![
            (index + 1).to_string(),
            spec.spec_id.clone(),
            spec.display_title.clone(),
            spec.template_kind.clone(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

pub fn format_request_json(request: &GenerationRequest) -> Result<String, ApiError> {
    to_json(request)
}

pub fn format_request_list_text(owner_context_id: &str, requests: &[GenerationRequest]) -> String {
    if requests.is_empty() {
        return format!(
            "No requests found for '{}'.\n\nUse 'docgen generate --owner {} --specs <file>' to start one.",
            owner_context_id, owner_context_id
        );
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Request", "Status", "Completed", "Failed", "Total", "Created"]);
    for request in requests {
        table.add_row(vec![
            request.id.to_string(),
            format_status(request.status),
            request.completed_count.to_string(),
            request.failed_count.to_string(),
            request.total_count.to_string(),
            format_timestamp(Some(request.created_at_ms)),
        ]);
    }
    format!("{}\n\nTotal: {} request(s)\n", table, requests.len())
}

pub fn format_request_list_json(requests: &[GenerationRequest]) -> Result<String, ApiError> {
    to_json(&serde_json::json!({ "requests": requests, "total": requests.len() }))
}

pub fn format_artifact_list_text(artifacts: &[Artifact]) -> String {
    if artifacts.is_empty() {
        return "No artifacts found for this request.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Artifact", "Spec ID", "Title", "Provenance", "Words"]);
    for artifact in artifacts {
        table.add_row(vec![
            artifact.id.to_string(),
            artifact.spec_id.clone(),
            artifact.title.clone(),
            format_provenance(artifact.provenance),
            artifact.word_count.to_string(),
        ]);
    }
    let fallback = artifacts.iter().filter(|a| a.is_fallback()).count();
    format!(
        "{}\n\nTotal: {} artifact(s), {} fallback\n",
        table,
        artifacts.len(),
        fallback
    )
}

pub fn format_artifact_list_json(artifacts: &[Artifact]) -> Result<String, ApiError> {
    to_json(&serde_json::json!({ "artifacts": artifacts, "total": artifacts.len() }))
}

pub fn format_artifact_text(artifact: &Artifact) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading(&artifact.title)));
    out.push_str(&format!("  ID:          {}\n", artifact.id));
    if let Some(request_id) = &artifact.parent_request_id {
        out.push_str(&format!("  Request:     {}\n", request_id));
    }
    out.push_str(&format!("  Spec ID:     {}\n", artifact.spec_id));
    out.push_str(&format!("  Template:    {}\n", artifact.template_kind));
    out.push_str(&format!("  Provenance:  {}\n", format_provenance(artifact.provenance)));
    out.push_str(&format!("  Words:       {}\n", artifact.word_count));
    out.push_str(&format!("  Created:     {}\n", format_timestamp(Some(artifact.created_at_ms))));
    if !artifact.summary.is_empty() {
        out.push_str(&format!("\n  {}\n", artifact.summary.italic()));
    }
    if !artifact.structural_sections.is_empty() {
        out.push_str(&format!("\n{}\n", format_section_heading("Sections")));
        for section in &artifact.structural_sections {
            out.push_str(&format!("  - {}\n", section.heading));
        }
    }
    out.push_str(&format!("\n{}\n\n{}\n", format_section_heading("Content"), artifact.content));
    out
}

pub fn format_artifact_json(artifact: &Artifact) -> Result<String, ApiError> {
    to_json(artifact)
}

/// One-line batch result for stderr after a streamed run.
pub fn format_summary_text(summary: &BatchSummary) -> String {
    format!(
        "Request {} {}: {} attempted, {} generated, {} fallback, {} failed",
        summary.request_id,
        format_status(summary.status),
        summary.total_attempted,
        summary.total_generated,
        summary.total_fallback,
        summary.total_failed
    )
}
