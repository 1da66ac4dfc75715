//! Wire shapes exchanged with the coordinator.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Dotted location in the privileged graph, e.g. `window.location.href`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessorPath(String);

impl AccessorPath {
    pub fn root(name: impl Into<String>) -> Self {
        AccessorPath(name.into())
    }

    /// `parent.property`, or just `property` when the parent is empty.
    pub fn child(&self, property: &str) -> Self {
        if self.0.is_empty() {
            AccessorPath(property.to_string())
        } else {
            AccessorPath(format!("{}.{}", self.0, property))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for AccessorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Get,
    Set,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    #[serde(rename = "type")]
    pub kind: AccessKind,
    #[serde(rename = "api")]
    pub path: AccessorPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,
}

impl AccessRequest {
    pub fn get(path: AccessorPath) -> Self {
        AccessRequest {
            kind: AccessKind::Get,
            path,
            value: None,
        }
    }

    pub fn set(path: AccessorPath, value: Option<JsonValue>) -> Self {
        AccessRequest {
            kind: AccessKind::Set,
            path,
            value,
        }
    }
}

/// One message per terminal access, sandbox to coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorMessage {
    pub accessor_event: bool,
    pub id: u64,
    pub accessor: AccessRequest,
}

/// Coordinator to sandbox control message, e.g.
/// `{"command": "init", "commandOptions": {"inlineScript": "..."}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlMessage {
    pub command: String,
    #[serde(default)]
    pub command_options: Option<CommandOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOptions {
    #[serde(default)]
    pub inline_script: Option<String>,
}
