//! Request and response messages.
//!
//! Both travel as JSON objects. A request names its operation in `op`:
//!
//! ```json
//! {"op": "create_session"}
//! {"op": "begin", "session": "2f1c..."}
//! {"op": "put", "session": "2f1c...", "key": "score", "value": {"p1": 10}}
//! {"op": "get", "key": "score"}
//! ```
//!
//! `put`, `get` and `delete` may omit `session`; they then run on a fresh
//! autocommit session.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Registers a new session.
    CreateSession,
    /// Removes a session and any open transaction layers.
    CloseSession {
        /// Session id.
        session: String,
    },
    /// Opens a transaction layer.
    Begin {
        /// Session id.
        session: String,
    },
    /// Commits the top transaction layer.
    Commit {
        /// Session id.
        session: String,
    },
    /// Discards the top transaction layer.
    Rollback {
        /// Session id.
        session: String,
    },
    /// Reports the number of open layers.
    Depth {
        /// Session id.
        session: String,
    },
    /// Writes a JSON value.
    Put {
        /// Session id; autocommit when absent.
        #[serde(default)]
        session: Option<String>,
        /// Key to write.
        key: String,
        /// Value to store.
        value: Value,
    },
    /// Reads a key.
    Get {
        /// Session id; committed state when absent.
        #[serde(default)]
        session: Option<String>,
        /// Key to read.
        key: String,
    },
    /// Deletes a key.
    Delete {
        /// Session id; autocommit when absent.
        #[serde(default)]
        session: Option<String>,
        /// Key to delete.
        key: String,
    },
    /// Lists every committed row.
    Dump,
}

impl Request {
    /// Returns the operation name.
    pub fn op(&self) -> &'static str {
        match self {
            Request::CreateSession => "create_session",
            Request::CloseSession { .. } => "close_session",
            Request::Begin { .. } => "begin",
            Request::Commit { .. } => "commit",
            Request::Rollback { .. } => "rollback",
            Request::Depth { .. } => "depth",
            Request::Put { .. } => "put",
            Request::Get { .. } => "get",
            Request::Delete { .. } => "delete",
            Request::Dump => "dump",
        }
    }
}

/// A server response.
///
/// `status` follows HTTP conventions. Fields that do not apply to the
/// operation are left out of the JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Response {
    /// HTTP-style status code.
    pub status: u16,
    /// True for 2xx responses.
    pub ok: bool,
    /// Session id, for `create_session`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    /// Layer depth after the operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    /// Key that was read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Value that was read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Whether the key was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found: Option<bool>,
    /// Committed rows, for `dump`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<BTreeMap<String, Value>>,
    /// Table sequence number when the operation flushed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    /// Non-fatal problem, such as a failed commit log append.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Error message for non-2xx responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// Creates an empty success response.
    pub fn success() -> Self {
        Self {
            status: 200,
            ok: true,
            ..Self::default()
        }
    }

    /// Creates an error response.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            ok: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Creates a response for a key read.
    pub fn read(key: String, value: Option<Value>) -> Self {
        let found = value.is_some();
        Self {
            status: if found { 200 } else { 404 },
            ok: found,
            key: Some(key),
            value: Some(value.unwrap_or(Value::Null)),
            found: Some(found),
            ..Self::default()
        }
    }

    /// Sets the depth field.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_names() {
        let request: Request =
            serde_json::from_value(json!({"op": "put", "key": "k", "value": [1, 2]})).unwrap();
        assert_eq!(
            request,
            Request::Put {
                session: None,
                key: "k".into(),
                value: json!([1, 2]),
            }
        );
        assert_eq!(request.op(), "put");

        let request: Request = serde_json::from_value(json!({"op": "create_session"})).unwrap();
        assert_eq!(request, Request::CreateSession);
    }

    #[test]
    fn session_ops_require_an_id() {
        let result: Result<Request, _> = serde_json::from_value(json!({"op": "begin"}));
        assert!(result.is_err());
    }

    #[test]
    fn response_omits_unused_fields() {
        let json = serde_json::to_value(Response::success().with_depth(2)).unwrap();
        assert_eq!(json, json!({"status": 200, "ok": true, "depth": 2}));
    }

    #[test]
    fn missing_key_read() {
        let response = Response::read("k".into(), None);
        assert_eq!(response.status, 404);
        assert_eq!(response.found, Some(false));
        assert_eq!(response.value, Some(Value::Null));
    }
}
