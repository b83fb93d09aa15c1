//! Routes requests to session operations.

use crate::codec::{decode_value, encode_value};
use crate::error::{ServerError, ServerResult};
use crate::protocol::{Request, Response};
use crate::registry::SessionRegistry;
use arcade_core::{Applied, Session, Store};
use std::collections::BTreeMap;

/// Handles requests against one store.
#[derive(Debug)]
pub struct RequestHandler<'s> {
    store: &'s Store,
    registry: SessionRegistry<'s>,
}

impl<'s> RequestHandler<'s> {
    /// Creates a handler over `store` with its own session registry.
    pub fn new(store: &'s Store, registry: SessionRegistry<'s>) -> Self {
        Self { store, registry }
    }

    /// Returns the session registry.
    pub fn registry(&self) -> &SessionRegistry<'s> {
        &self.registry
    }

    /// Handles one request, turning errors into error responses.
    pub fn handle(&self, request: Request) -> Response {
        let op = request.op();
        match self.dispatch(request) {
            Ok(response) => response,
            Err(err) => {
                if err.is_server_error() {
                    tracing::warn!(op, error = %err, "request failed");
                } else {
                    tracing::debug!(op, error = %err, "request rejected");
                }
                Response::error(err.status_code(), err.to_string())
            }
        }
    }

    /// Handles one request.
    ///
    /// # Errors
    ///
    /// Returns the error to report to the client.
    pub fn dispatch(&self, request: Request) -> ServerResult<Response> {
        match request {
            Request::CreateSession => {
                let id = self.registry.create()?;
                Ok(Response {
                    session: Some(id),
                    ..Response::success()
                })
            }
            Request::CloseSession { session } => {
                self.registry.close(&session)?;
                Ok(Response::success())
            }
            Request::Begin { session } => self.with_session(&session, |s| {
                s.begin();
                Ok(Response::success().with_depth(s.depth()))
            }),
            Request::Commit { session } => self.with_session(&session, |s| {
                let applied = s.commit()?;
                Ok(applied_response(applied).with_depth(s.depth()))
            }),
            Request::Rollback { session } => self.with_session(&session, |s| {
                s.rollback()?;
                Ok(Response::success().with_depth(s.depth()))
            }),
            Request::Depth { session } => {
                self.with_session(&session, |s| Ok(Response::success().with_depth(s.depth())))
            }
            Request::Put {
                session,
                key,
                value,
            } => {
                let bytes = encode_value(&value)?;
                self.with_optional_session(session.as_deref(), |s| {
                    let applied = s.set(key, bytes)?;
                    Ok(applied_response(applied))
                })
            }
            Request::Get { session, key } => self.with_optional_session(session.as_deref(), |s| {
                let value = s.get(&key)?.map(|bytes| decode_value(&bytes)).transpose()?;
                Ok(Response::read(key, value))
            }),
            Request::Delete { session, key } => {
                self.with_optional_session(session.as_deref(), |s| {
                    let applied = s.delete(key)?;
                    Ok(applied_response(applied))
                })
            }
            Request::Dump => {
                let rows = self
                    .store
                    .dump()?
                    .into_iter()
                    .map(|(key, bytes)| decode_value(&bytes).map(|value| (key, value)))
                    .collect::<ServerResult<BTreeMap<_, _>>>()?;
                Ok(Response {
                    rows: Some(rows),
                    ..Response::success()
                })
            }
        }
    }

    fn with_session<F>(&self, id: &str, op: F) -> ServerResult<Response>
    where
        F: FnOnce(&mut Session<'s>) -> ServerResult<Response>,
    {
        let entry = self.registry.get(id)?;
        let mut session = entry.lock();
        op(&mut *session)
    }

    /// Runs `op` on the named session, or on a fresh autocommit session.
    fn with_optional_session<F>(&self, id: Option<&str>, op: F) -> ServerResult<Response>
    where
        F: FnOnce(&mut Session<'s>) -> ServerResult<Response>,
    {
        match id {
            Some(id) => self.with_session(id, op),
            None => op(&mut self.store.new_session()),
        }
    }
}

fn applied_response(applied: Applied) -> Response {
    match applied {
        Applied::Flushed(report) => Response {
            sequence: Some(report.sequence.as_u64()),
            warning: report.log_error.map(|err| err.to_string()),
            ..Response::success()
        },
        Applied::Staged | Applied::Merged | Applied::RolledBack => Response::success(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use serde_json::json;

    fn handler(store: &Store) -> RequestHandler<'_> {
        RequestHandler::new(store, SessionRegistry::new(store, ServerConfig::default()))
    }

    fn create(handler: &RequestHandler<'_>) -> String {
        handler.handle(Request::CreateSession).session.unwrap()
    }

    #[test]
    fn autocommit_put_and_get() {
        let store = Store::open_in_memory().unwrap();
        let handler = handler(&store);

        let response = handler.handle(Request::Put {
            session: None,
            key: "k".into(),
            value: json!({"x": 1}),
        });
        assert!(response.ok);
        assert_eq!(response.sequence, Some(1));

        let response = handler.handle(Request::Get {
            session: None,
            key: "k".into(),
        });
        assert_eq!(response.value, Some(json!({"x": 1})));
        assert_eq!(response.found, Some(true));
    }

    #[test]
    fn session_transaction_flow() {
        let store = Store::open_in_memory().unwrap();
        let handler = handler(&store);
        let id = create(&handler);

        let response = handler.handle(Request::Begin {
            session: id.clone(),
        });
        assert_eq!(response.depth, Some(1));

        let response = handler.handle(Request::Put {
            session: Some(id.clone()),
            key: "k".into(),
            value: json!("staged"),
        });
        assert!(response.ok);
        assert_eq!(response.sequence, None);

        let outside = handler.handle(Request::Get {
            session: None,
            key: "k".into(),
        });
        assert_eq!(outside.status, 404);

        let response = handler.handle(Request::Commit {
            session: id.clone(),
        });
        assert_eq!(response.depth, Some(0));
        assert_eq!(response.sequence, Some(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn commit_without_transaction_is_a_client_error() {
        let store = Store::open_in_memory().unwrap();
        let handler = handler(&store);
        let id = create(&handler);

        let response = handler.handle(Request::Commit { session: id });
        assert_eq!(response.status, 400);
        assert!(!response.ok);
        assert!(response.error.unwrap().contains("no active transaction"));
    }

    #[test]
    fn unknown_session_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let handler = handler(&store);
        let response = handler.handle(Request::Depth {
            session: "nope".into(),
        });
        assert_eq!(response.status, 404);
    }

    #[test]
    fn dump_decodes_rows() {
        let store = Store::open_in_memory().unwrap();
        let handler = handler(&store);
        for (key, value) in [("b", json!(2)), ("a", json!([true]))] {
            handler.handle(Request::Put {
                session: None,
                key: key.into(),
                value,
            });
        }

        let rows = handler.handle(Request::Dump).rows.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows["a"], json!([true]));
        assert_eq!(rows["b"], json!(2));
    }
}
