//! High-level game authoring API.
//!
//! Wraps the dispatcher with scene-building helpers so callers work in
//! terms of "add a camera" rather than raw wire commands.

use crate::client::EditorClient;
use crate::dispatcher::{CommandDispatcher, Transport};
use crate::translator;
use forge_common::protocol::{Command, CommandKind, Response};
use forge_common::Config;
use serde_json::{json, Map, Value};
use std::path::Path;

/// Outcome of one command inside a build run.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub command: Command,
    pub response: Response,
}

/// Result of a full `create_game` run.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub description: String,
    pub success: bool,
    pub actions: Vec<ActionOutcome>,
    pub errors: Vec<String>,
}

/// High-level API for building games through the editor.
pub struct GameBuilder<T: Transport> {
    dispatcher: CommandDispatcher<T>,
}

impl GameBuilder<EditorClient> {
    pub fn new(config: Config) -> Self {
        let client = EditorClient::new(config.clone());
        Self {
            dispatcher: CommandDispatcher::new(client, &config),
        }
    }

    pub async fn connect(&mut self) -> bool {
        self.dispatcher.transport_mut().connect().await
    }

    pub async fn disconnect(&mut self) {
        self.dispatcher.transport_mut().disconnect().await;
    }
}

impl<T: Transport> GameBuilder<T> {
    pub fn with_transport(client: T, config: &Config) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(client, config),
        }
    }

    pub fn dispatcher(&mut self) -> &mut CommandDispatcher<T> {
        &mut self.dispatcher
    }

    /// Build a game from a natural language description.
    ///
    /// Commands run in order; the first error stops the run and lands in
    /// the report.
    pub async fn create_game(&mut self, description: &str) -> BuildReport {
        let mut report = BuildReport {
            description: description.to_string(),
            ..Default::default()
        };

        for command in translator::parse_game_description(description) {
            let response = self.dispatcher.execute_command(command.clone()).await;
            let failed = response.is_error();
            if failed {
                report.errors.push(response.error.clone());
            }
            report.actions.push(ActionOutcome { command, response });
            if failed {
                break;
            }
        }

        report.success = report.errors.is_empty();
        report
    }

    /// Add a player character to a scene.
    pub async fn add_player_character(
        &mut self,
        scene_path: &str,
        position: [f64; 3],
    ) -> Response {
        let scene_name = Path::new(scene_path)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(scene_path);
        self.dispatcher
            .execute_command(
                Command::new(CommandKind::AddNode)
                    .with_param("node_type", "CharacterBody3D")
                    .with_param("parent_path", format!("/root/{}", scene_name))
                    .with_param("name", "Player")
                    .with_param("position", json!(position)),
            )
            .await
    }

    /// Add a camera under a node.
    pub async fn add_camera(&mut self, parent_path: &str, position: [f64; 3]) -> Response {
        self.dispatcher
            .execute_command(
                Command::new(CommandKind::AddNode)
                    .with_param("node_type", "Camera3D")
                    .with_param("parent_path", parent_path)
                    .with_param("name", "Camera3D")
                    .with_param("position", json!(position)),
            )
            .await
    }

    /// Add a light under a node.
    pub async fn add_light(&mut self, parent_path: &str, light_type: &str) -> Response {
        self.dispatcher
            .execute_command(
                Command::new(CommandKind::AddNode)
                    .with_param("node_type", light_type)
                    .with_param("parent_path", parent_path)
                    .with_param("name", "Light")
                    .with_param("rotation", json!([-45, 45, 0])),
            )
            .await
    }

    /// Fetch the current scene tree. Empty on failure.
    pub async fn get_scene_snapshot(&mut self) -> Map<String, Value> {
        let response = self
            .dispatcher
            .execute_command(Command::new(CommandKind::GetSnapshot))
            .await;
        if response.is_success() {
            response.data
        } else {
            Map::new()
        }
    }

    /// Fetch the current performance metrics. Empty on failure.
    pub async fn get_performance_report(&mut self) -> Map<String, Value> {
        let response = self
            .dispatcher
            .execute_command(Command::new(CommandKind::GetPerformance))
            .await;
        if response.is_success() {
            response.data
        } else {
            Map::new()
        }
    }
}
