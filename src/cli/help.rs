//! Stable command names used in logs.

use crate::cli::parse::{ArtifactCommands, ArtifactsCommands, Commands, RequestCommands};

pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Generate { .. } => "generate",
        Commands::Request { command } => match command {
            RequestCommands::Show { .. } => "request.show",
            RequestCommands::List { .. } => "request.list",
        },
        Commands::Artifacts { command } => match command {
            ArtifactsCommands::List { .. } => "artifacts.list",
        },
        Commands::Artifact { command } => match command {
            ArtifactCommands::Show { .. } => "artifact.show",
        },
    }
}
