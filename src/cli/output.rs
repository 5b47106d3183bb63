//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Validation(msg) => format!("Invalid submission: {}", msg),
        ApiError::RequestNotFound(id) => {
            format!("Request not found: {}\n\nUse 'docgen request list --owner <id>' to find requests.", id)
        }
        ApiError::ChannelClosed(msg) => format!("Batch cancelled: {}", msg),
        other => other.to_string(),
    }
}
