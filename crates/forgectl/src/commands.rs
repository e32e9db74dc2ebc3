//! Subcommand implementations for forgectl.

use anyhow::{bail, Result};
use forge_common::perf::{PerfReport, PerfStatus, Priority};
use forge_common::Config;
use forgectl::builder::GameBuilder;
use forgectl::client::EditorClient;
use owo_colors::OwoColorize;
use serde_json::Value;
use tracing::info;

/// Build a game from a description and report per-command results.
pub async fn build(config: Config, description: &str) -> Result<()> {
    let mut builder = GameBuilder::new(config);
    if !builder.connect().await {
        bail!("Could not connect to the Godot Editor. Is the plugin running?");
    }

    let report = builder.create_game(description).await;
    builder.disconnect().await;

    for outcome in &report.actions {
        if outcome.response.is_success() {
            println!("{} {}", "ok".green(), outcome.command.action);
        } else {
            println!(
                "{} {}: {}",
                "failed".red(),
                outcome.command.action,
                outcome.response.error
            );
        }
    }

    if report.success {
        println!("{}", "Build complete".green().bold());
        Ok(())
    } else {
        bail!("Build stopped after {} action(s)", report.actions.len());
    }
}

/// Print the current scene tree as pretty JSON.
pub async fn snapshot(config: Config) -> Result<()> {
    let mut builder = GameBuilder::new(config);
    if !builder.connect().await {
        bail!("Could not connect to the Godot Editor. Is the plugin running?");
    }

    let snapshot = builder.get_scene_snapshot().await;
    builder.disconnect().await;

    if snapshot.is_empty() {
        bail!("Editor returned no snapshot");
    }
    println!("{}", serde_json::to_string_pretty(&Value::Object(snapshot))?);
    Ok(())
}

/// Fetch a performance report and print the classified analysis.
pub async fn perf(config: Config) -> Result<()> {
    let mut builder = GameBuilder::new(config);
    if !builder.connect().await {
        bail!("Could not connect to the Godot Editor. Is the plugin running?");
    }

    let raw = builder.get_performance_report().await;
    builder.disconnect().await;

    if raw.is_empty() {
        bail!("Editor returned no performance report");
    }
    let report: PerfReport = serde_json::from_value(Value::Object(raw))?;
    let analysis = builder.dispatcher().analyze_performance(&report);

    match analysis.status {
        PerfStatus::Ok => println!("status: {}", "ok".green()),
        PerfStatus::Critical => println!("status: {}", "critical".red().bold()),
    }
    for issue in &analysis.issues {
        println!("  {} {}", "issue".red(), issue.message);
    }
    for warning in &analysis.warnings {
        println!("  {} {}", "warning".yellow(), warning.message);
    }
    for recommendation in &analysis.recommendations {
        let tag = match recommendation.priority {
            Priority::High => "high".red().to_string(),
            Priority::Medium => "medium".yellow().to_string(),
        };
        println!("  [{}] {}: {}", tag, recommendation.area, recommendation.message);
    }
    Ok(())
}

/// Stream out-of-band editor messages forever, reconnecting on drops.
pub async fn watch(config: Config) -> Result<()> {
    let mut client = EditorClient::new(config);
    client.add_message_handler(|message| match serde_json::to_string_pretty(message) {
        Ok(rendered) => println!("{}", rendered),
        Err(_) => println!("{}", message),
    });

    loop {
        client.reconnect_loop().await;
        info!("Watching for editor messages");
        client.receive_messages().await;
    }
}
