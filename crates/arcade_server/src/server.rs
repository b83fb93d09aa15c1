//! Transport-independent server facade.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::handler::RequestHandler;
use crate::protocol::{Request, Response};
use crate::registry::SessionRegistry;
use arcade_core::Store;

/// The key-value request server.
///
/// The server does not own a listener. A transport (HTTP, a line-oriented
/// socket, stdin) parses requests and hands them to [`KvServer::handle`] or
/// [`KvServer::handle_json`].
///
/// # Example
///
/// ```
/// use arcade_core::Store;
/// use arcade_server::{KvServer, ServerConfig};
///
/// let store = Store::open_in_memory().unwrap();
/// let server = KvServer::new(&store, ServerConfig::default());
///
/// let reply = server.handle_json(r#"{"op": "put", "key": "k", "value": 7}"#);
/// assert!(reply.contains(r#""ok":true"#));
/// ```
#[derive(Debug)]
pub struct KvServer<'s> {
    handler: RequestHandler<'s>,
}

impl<'s> KvServer<'s> {
    /// Creates a server over `store`.
    pub fn new(store: &'s Store, config: ServerConfig) -> Self {
        let registry = SessionRegistry::new(store, config);
        Self {
            handler: RequestHandler::new(store, registry),
        }
    }

    /// Handles one request.
    pub fn handle(&self, request: Request) -> Response {
        self.handler.handle(request)
    }

    /// Handles one JSON-encoded request and returns a JSON response.
    ///
    /// A request that does not parse gets a 400 response.
    pub fn handle_json(&self, line: &str) -> String {
        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                let err = ServerError::InvalidRequest(e.to_string());
                tracing::debug!(error = %err, "rejected request");
                Response::error(err.status_code(), err.to_string())
            }
        };
        serde_json::to_string(&response).unwrap_or_else(|e| {
            format!(r#"{{"status":500,"ok":false,"error":"cannot encode response: {e}"}}"#)
        })
    }

    /// Returns the session registry.
    pub fn registry(&self) -> &SessionRegistry<'s> {
        self.handler.registry()
    }

    /// Evicts sessions idle past their TTL.
    pub fn evict_expired(&self) -> usize {
        self.handler.registry().evict_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_json_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let server = KvServer::new(&store, ServerConfig::default());

        let reply: serde_json::Value =
            serde_json::from_str(&server.handle_json("{not json")).unwrap();
        assert_eq!(reply["status"], 400);
        assert_eq!(reply["ok"], false);
        assert!(reply["error"]
            .as_str()
            .unwrap()
            .starts_with("invalid request: "));
    }

    #[test]
    fn unknown_op_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let server = KvServer::new(&store, ServerConfig::default());

        let reply: serde_json::Value =
            serde_json::from_str(&server.handle_json(r#"{"op": "explode"}"#)).unwrap();
        assert_eq!(reply["status"], 400);
    }

    #[test]
    fn json_session_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let server = KvServer::new(&store, ServerConfig::default());

        let created: serde_json::Value =
            serde_json::from_str(&server.handle_json(r#"{"op": "create_session"}"#)).unwrap();
        let id = created["session"].as_str().unwrap();
        assert_eq!(server.registry().len(), 1);

        let reply: serde_json::Value = serde_json::from_str(
            &server.handle_json(&format!(r#"{{"op": "close_session", "session": "{id}"}}"#)),
        )
        .unwrap();
        assert_eq!(reply["ok"], true);
        assert!(server.registry().is_empty());
    }
}
