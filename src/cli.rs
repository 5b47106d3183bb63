//! CLI domain: parse, route, help, output, and presentation only.
//! No batch logic here; the route table dispatches to the generation service and stores.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{ArtifactCommands, ArtifactsCommands, Cli, Commands, RequestCommands};
pub use presentation::{
    format_artifact_json, format_artifact_list_json, format_artifact_list_text,
    format_artifact_text, format_request_json, format_request_list_json,
    format_request_list_text, format_request_text, format_summary_text,
};
pub use route::RunContext;
