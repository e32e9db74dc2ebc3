//! Wire protocol for the Godot Editor plugin.
//!
//! JSON text messages over a WebSocket connection. Commands flatten their
//! parameters into the top-level object next to `action`/`auto_run`/
//! `request_id`; responses carry every unrecognized top-level field in `data`.

use crate::error::ForgeError;
use serde_json::{Map, Value};

/// Top-level command keys that parameters must not shadow.
pub const RESERVED_COMMAND_KEYS: [&str; 3] = ["action", "auto_run", "request_id"];

/// Top-level response keys; everything else lands in `Response::data`.
const RESERVED_RESPONSE_KEYS: [&str; 5] = ["status", "action", "error", "type", "error_details"];

/// Command kinds the editor plugin understands.
///
/// The wire `action` stays an open string so unknown actions can pass
/// through; this enum covers the kinds the builder authors itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    CreateScene,
    AddNode,
    SetProperty,
    AttachScript,
    CreateScript,
    ModifyScript,
    DeleteNode,
    RunScene,
    SaveScene,
    GetSnapshot,
    GetPerformance,
    Retry,
    GetStatus,
    GetProtocol,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateScene => "create_scene",
            Self::AddNode => "add_node",
            Self::SetProperty => "set_property",
            Self::AttachScript => "attach_script",
            Self::CreateScript => "create_script",
            Self::ModifyScript => "modify_script",
            Self::DeleteNode => "delete_node",
            Self::RunScene => "run_scene",
            Self::SaveScene => "save_scene",
            Self::GetSnapshot => "get_snapshot",
            Self::GetPerformance => "get_performance",
            Self::Retry => "retry",
            Self::GetStatus => "get_status",
            Self::GetProtocol => "get_protocol",
        }
    }

    /// Parse a wire action string into a known kind.
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "create_scene" => Some(Self::CreateScene),
            "add_node" => Some(Self::AddNode),
            "set_property" => Some(Self::SetProperty),
            "attach_script" => Some(Self::AttachScript),
            "create_script" => Some(Self::CreateScript),
            "modify_script" => Some(Self::ModifyScript),
            "delete_node" => Some(Self::DeleteNode),
            "run_scene" => Some(Self::RunScene),
            "save_scene" => Some(Self::SaveScene),
            "get_snapshot" => Some(Self::GetSnapshot),
            "get_performance" => Some(Self::GetPerformance),
            "retry" => Some(Self::Retry),
            "get_status" => Some(Self::GetStatus),
            "get_protocol" => Some(Self::GetProtocol),
            _ => None,
        }
    }
}

/// A command to be sent to the Godot Editor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    pub action: String,
    pub parameters: Map<String, Value>,
    pub auto_run: bool,
    /// Assigned by the dispatcher when it takes ownership; stable across
    /// every retry of this command.
    pub request_id: String,
}

impl Command {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            action: kind.as_str().to_string(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    pub fn with_auto_run(mut self, auto_run: bool) -> Self {
        self.auto_run = auto_run;
        self
    }

    /// Flatten into the wire object.
    ///
    /// Parameter keys shadowing a reserved key would silently win on the
    /// merge, so they are rejected instead.
    pub fn encode(&self) -> Result<Value, ForgeError> {
        for key in RESERVED_COMMAND_KEYS {
            if self.parameters.contains_key(key) {
                return Err(ForgeError::ReservedKey(key.to_string()));
            }
        }

        let mut wire = Map::new();
        wire.insert("action".to_string(), Value::String(self.action.clone()));
        wire.insert("auto_run".to_string(), Value::Bool(self.auto_run));
        for (key, value) in &self.parameters {
            wire.insert(key.clone(), value.clone());
        }
        if !self.request_id.is_empty() {
            wire.insert(
                "request_id".to_string(),
                Value::String(self.request_id.clone()),
            );
        }
        Ok(Value::Object(wire))
    }

    /// Rebuild from a wire object. Missing fields fall back to defaults;
    /// a non-object decodes to the empty command.
    pub fn decode(wire: &Value) -> Self {
        let Some(object) = wire.as_object() else {
            return Self::default();
        };

        let mut parameters = Map::new();
        for (key, value) in object {
            if !RESERVED_COMMAND_KEYS.contains(&key.as_str()) {
                parameters.insert(key.clone(), value.clone());
            }
        }

        Self {
            action: string_field(object, "action"),
            parameters,
            auto_run: object
                .get("auto_run")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            request_id: string_field(object, "request_id"),
        }
    }
}

/// Response status reported by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    Success,
    Error,
    #[default]
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }

    /// Anything the editor sends that is not a recognized status decodes
    /// to `Unknown`, never an error.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "success" => Self::Success,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

/// A response from the Godot Editor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub status: Status,
    pub action: String,
    pub error: String,
    /// Free-form error category from the editor; `type` on the wire.
    pub error_type: String,
    pub error_details: Map<String, Value>,
    pub data: Map<String, Value>,
    pub timestamp: f64,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }

    /// Flatten into the wire object, reserved keys first, `data` merged flat.
    pub fn encode(&self) -> Value {
        let mut wire = Map::new();
        wire.insert(
            "status".to_string(),
            Value::String(self.status.as_str().to_string()),
        );
        if !self.action.is_empty() {
            wire.insert("action".to_string(), Value::String(self.action.clone()));
        }
        if !self.error.is_empty() {
            wire.insert("error".to_string(), Value::String(self.error.clone()));
        }
        if !self.error_type.is_empty() {
            wire.insert("type".to_string(), Value::String(self.error_type.clone()));
        }
        if !self.error_details.is_empty() {
            wire.insert(
                "error_details".to_string(),
                Value::Object(self.error_details.clone()),
            );
        }
        for (key, value) in &self.data {
            wire.insert(key.clone(), value.clone());
        }
        Value::Object(wire)
    }

    /// Rebuild from a wire object.
    ///
    /// `timestamp` is extracted as a field but stays inside `data` as well,
    /// so encode/decode round-trip cleanly.
    pub fn decode(wire: &Value) -> Self {
        let Some(object) = wire.as_object() else {
            return Self::default();
        };

        let mut data = Map::new();
        for (key, value) in object {
            if !RESERVED_RESPONSE_KEYS.contains(&key.as_str()) {
                data.insert(key.clone(), value.clone());
            }
        }

        Self {
            status: object
                .get("status")
                .and_then(Value::as_str)
                .map(Status::from_wire)
                .unwrap_or(Status::Unknown),
            action: string_field(object, "action"),
            error: string_field(object, "error"),
            error_type: string_field(object, "type"),
            error_details: map_field(object, "error_details"),
            timestamp: object
                .get("timestamp")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            data,
        }
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn map_field(object: &Map<String, Value>, key: &str) -> Map<String, Value> {
    object
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}
