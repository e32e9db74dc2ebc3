//! Forge Control - client library for driving the Godot Editor plugin.
//!
//! The [`client::EditorClient`] owns the WebSocket connection, the
//! [`dispatcher::CommandDispatcher`] runs each command's retry state
//! machine on top of it, and [`builder::GameBuilder`] is the high-level
//! authoring API the CLI uses.

pub mod builder;
pub mod client;
pub mod dispatcher;
pub mod translator;
