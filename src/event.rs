//! The structured log event and its severity levels.
//!
//! A [`LogEvent`] is a flat, insertion-ordered map from field name to JSON
//! value. Insertion order is preserved through serialization, so two events
//! built the same way serialize to byte-identical field sequences —
//! important for anyone diffing or tailing the log downstream.
//!
//! Reserved field names used by the middleware live in [`field`]. Handlers
//! may add any other field they like through [`crate::context`].

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

// ── Reserved field names ──────────────────────────────────────────────────────

/// Field names the middleware fills in automatically.
///
/// Handler code can read them back via [`crate::context::get`], but should
/// pick its own names for anything it adds.
pub mod field {
    pub const ID: &str = "id";
    pub const TYPE: &str = "type";
    pub const DATE: &str = "date";
    pub const LEVEL: &str = "level";
    pub const METHOD: &str = "method";
    pub const PATH: &str = "path";
    pub const STATUS_CODE: &str = "status_code";
    pub const EXECUTION_TIME: &str = "execution_time";
    pub const CLIENT_IP: &str = "client_ip";
    pub const CLIENT_USER_AGENT: &str = "client_user_agent";
    pub const ERROR_DETAIL: &str = "error_detail";
    pub const SERVER_ID: &str = "server_id";
    pub const SERVER_VERSION: &str = "server_version";
    pub const OS_UPTIME: &str = "os_uptime";
    pub const SERVER_UPTIME: &str = "server_uptime";
}

// ── Level ─────────────────────────────────────────────────────────────────────

/// Severity assigned to one event.
///
/// Serializes lowercase: `"info"`, `"warning"`, `"error"`, `"critical"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info     => "info",
            Self::Warning  => "warning",
            Self::Error    => "error",
            Self::Critical => "critical",
        }
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── LogEvent ──────────────────────────────────────────────────────────────────

/// One structured log event — an access record or a lifecycle record.
///
/// Created by the middleware at request entry (or at startup/shutdown),
/// owned exclusively by the handling task while the request runs, handed to
/// the backend once finalized. No locking anywhere: exclusivity does the job.
#[derive(Debug, Clone, Default)]
pub struct LogEvent {
    fields: Map<String, Value>,
}

impl LogEvent {
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Sets `name` to `value`, replacing any previous value.
    ///
    /// First insertion of a name fixes its position in the serialized
    /// output; replacing a value keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Pushes `value` onto the list-valued field `name`, creating the list
    /// on first use. A previous non-list value is replaced by a fresh list.
    pub fn append(&mut self, name: &str, value: impl Into<Value>) {
        match self.fields.get_mut(name) {
            Some(Value::Array(items)) => items.push(value.into()),
            _ => {
                self.fields.insert(name.to_owned(), Value::Array(vec![value.into()]));
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The event as one line of JSON. Serialization of a string/number/bool
    /// map cannot fail, so this is infallible.
    pub fn to_json(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }
}

impl Serialize for LogEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}
