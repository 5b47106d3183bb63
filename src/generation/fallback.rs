//! Placeholder artifacts for items whose generation failed.

use crate::artifact::{word_count, NewArtifact, Provenance, Section};
use crate::error::GenerationError;
use crate::request::DocumentSpec;
use crate::types::RequestId;

/// Build the degraded artifact persisted in place of a generated one.
///
/// Content is always non-empty and clearly marked as unavailable.
pub fn fallback_artifact(
    request_id: &RequestId,
    spec: &DocumentSpec,
    reason: &GenerationError,
) -> NewArtifact {
    let title = spec.display_title.trim().to_string();
    let notice = format!(
        "Automatic drafting of \"{}\" was unavailable ({}). This placeholder must be \
         reviewed and completed manually, or the document requested again later.",
        title,
        reason_label(reason)
    );
    let next_steps = "1. Gather the information this document needs.\n\
                      2. Draft the content using your organisation's template.\n\
                      3. Have a competent person review and sign it off."
        .to_string();

    let content = format!(
        "# {}\n\n> Document unavailable: placeholder content.\n\n{}\n\n## Next steps\n\n{}\n",
        title, notice, next_steps
    );

    NewArtifact {
        parent_request_id: Some(request_id.clone()),
        spec_id: spec.spec_id.clone(),
        template_kind: spec.template_kind.clone(),
        title,
        word_count: word_count(&content),
        summary: "Placeholder: automatic generation was unavailable for this document.".to_string(),
        structural_sections: vec![
            Section {
                heading: "Status".to_string(),
                body: notice,
            },
            Section {
                heading: "Next steps".to_string(),
                body: next_steps,
            },
        ],
        content,
        provenance: Provenance::Fallback,
    }
}

fn reason_label(reason: &GenerationError) -> &'static str {
    match reason {
        GenerationError::Timeout(_) => "the generator timed out",
        GenerationError::RateLimited(_) => "the generator was rate limited",
        GenerationError::AuthFailed(_) => "the generator rejected our credentials",
        GenerationError::UnknownTemplate(_) => "no template exists for this document type",
        GenerationError::EmptyContent | GenerationError::InvalidResponse(_) => {
            "the generator returned unusable content"
        }
        GenerationError::Provider(_) | GenerationError::RequestFailed(_) => {
            "the generator could not be reached"
        }
    }
}
