//! Natural-language-to-command translation.
//!
//! Keyword matching over the description, nothing clever. The editor-side
//! vocabulary is small enough that a heuristic keeps authoring usable
//! until a real planner exists.

use forge_common::protocol::{Command, CommandKind};
use serde_json::json;

/// Translate a game description into an executable command sequence.
///
/// Always ends with a `run_scene` so the result is immediately visible in
/// the editor.
pub fn parse_game_description(description: &str) -> Vec<Command> {
    let description = description.to_lowercase();
    let mut commands = Vec::new();

    if description.contains("third-person") && description.contains("survival") {
        commands.push(
            Command::new(CommandKind::CreateScene)
                .with_param("name", "MainScene")
                .with_param("scene_type", "Node3D")
                .with_param("save_path", "res://scenes/main.tscn")
                .with_auto_run(true),
        );

        // player character
        commands.push(
            Command::new(CommandKind::AddNode)
                .with_param("node_type", "CharacterBody3D")
                .with_param("parent_path", "/root/MainScene")
                .with_param("name", "Player")
                .with_param("position", json!([0, 1, 0])),
        );

        // chase camera
        commands.push(
            Command::new(CommandKind::AddNode)
                .with_param("node_type", "Camera3D")
                .with_param("parent_path", "/root/MainScene/Player")
                .with_param("name", "Camera3D")
                .with_param("position", json!([0, 2, 3])),
        );

        if description.contains("inventory") {
            commands.push(
                Command::new(CommandKind::CreateScript)
                    .with_param("path", "res://scripts/inventory.gd")
                    .with_param("name", "Inventory")
                    .with_param("base_class", "Node"),
            );
        }
    }

    commands.push(
        Command::new(CommandKind::RunScene).with_param("scene_path", "res://scenes/main.tscn"),
    );

    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survival_game_produces_full_sequence() {
        let commands =
            parse_game_description("Create a third-person survival game with inventory");

        let actions: Vec<&str> = commands.iter().map(|c| c.action.as_str()).collect();
        assert_eq!(
            actions,
            [
                "create_scene",
                "add_node",
                "add_node",
                "create_script",
                "run_scene"
            ]
        );
        assert!(commands[0].auto_run);
        assert_eq!(commands[1].parameters["node_type"], "CharacterBody3D");
        assert_eq!(commands[2].parameters["parent_path"], "/root/MainScene/Player");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let commands = parse_game_description("THIRD-PERSON Survival demo");
        assert_eq!(commands[0].action, "create_scene");
    }

    #[test]
    fn unrecognized_description_still_runs_the_scene() {
        let commands = parse_game_description("a peaceful farming simulator");
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].action, "run_scene");
        assert!(!commands[0].auto_run);
    }
}
