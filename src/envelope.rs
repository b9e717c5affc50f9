//! Envelope — the canonical request shape for the MintDB wire protocol.
//!
//! Every `/sql` call is one [`RequestEnvelope`]: a statement tag plus
//! table/document addressing and an operation-specific payload. The server
//! dispatches on `stmt` and owns all result semantics, so payloads and
//! responses stay `serde_json::Value` end to end.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Statement tag selecting server-side behavior for a `/sql` request.
///
/// The set is closed: the client forwards these codes verbatim and never
/// infers semantics from them. `Find` and `Match` take identical payloads
/// and differ only in how the server narrows the result set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stmt {
    /// List tables.
    Info,
    /// Create a table.
    Add,
    /// Create a document.
    Create,
    /// Shallow-merge fields into a document.
    Merge,
    /// Append a value under a key.
    Push,
    /// Overwrite a value under a key.
    Put,
    /// Read one document, or a whole table with doc `"*"`.
    Select,
    /// Exact-match filter; all keys ANDed.
    Find,
    /// Fuzzy filter over the same payload shape as `Find`.
    Match,
    /// Operator comparison over a single field.
    Compare,
    /// Delete a key, a document, or a key across a table.
    Delete,
    /// Add a directed labeled edge between two documents.
    Rel,
    /// Breadth-first traversal from a document.
    Bfs,
    /// Depth-first traversal from a document.
    Dfs,
}

/// The canonical JSON request object sent to the `/sql` endpoint.
///
/// All seven fields serialize on every request, used or not: the server
/// expects a fixed shape regardless of which fields an operation reads.
/// Unused fields default to empty strings / an empty object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub stmt: Stmt,
    /// Table name, or `""` when the operation is not table-scoped.
    pub tb: String,
    /// Document identifier, `"*"` for whole-table operations, or `""`.
    pub doc: String,
    /// Operation-specific payload, `{}` when unused.
    pub data: Value,
    /// Vestigial pub/sub field, present for shape consistency.
    pub topic: String,
    /// Caller identity stamped into every request.
    pub user_id: i64,
    /// Vestigial field, present for shape consistency.
    pub message: String,
}

impl RequestEnvelope {
    /// Envelope carrying `stmt` with every other field defaulted.
    #[must_use]
    pub fn new(stmt: Stmt) -> Self {
        Self {
            stmt,
            tb: String::new(),
            doc: String::new(),
            data: Value::Object(Map::new()),
            topic: String::new(),
            user_id: 1,
            message: String::new(),
        }
    }

    /// Address a table.
    #[must_use]
    pub fn with_table(mut self, tb: impl Into<String>) -> Self {
        self.tb = tb.into();
        self
    }

    /// Address a document within the table.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Attach the operation payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Stamp the caller identity.
    #[must_use]
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = user_id;
        self
    }
}

/// `PUSH` / `PUT` payload addressing one key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: Value,
}

/// Single-key `DELETE` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub key: String,
}

/// `COMPARE` payload. `op` is a free-form operator string (e.g.
/// `"icontains"`) forwarded as-is; operator legality is server-enforced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Compare {
    pub lhs: String,
    pub op: String,
    pub rhs: Value,
}

/// `REL` payload: directed edge from the addressed document to
/// (`rel_tb`, `rel_doc`), labeled `rel`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub rel_tb: String,
    pub rel_doc: String,
    pub rel: String,
}

/// `BFS` / `DFS` payload: traversal target and edge label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Traversal {
    pub target_doc: String,
    pub rel: String,
}

/// Auth flow selector for the `/auth` endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthEvent {
    Signup,
    Signin,
    Signout,
}

/// Request body for the `/auth` endpoint. All three fields are always
/// present; signout carries the session token in `username` and an empty
/// password, matching the wire shape the server expects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub event: AuthEvent,
    pub username: String,
    pub password: String,
}

/// Opaque credential returned by signup/signin. The SDK never decodes or
/// validates it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub code: i64,
    pub status: String,
    pub token: String,
}

/// Request body for `/register`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub user_id: i64,
}

/// `/register` response: the WebSocket endpoint to connect to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WebSocketUrl {
    pub url: String,
}

/// Request body for `/publish`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub topic: String,
    pub user_id: i64,
    pub msg: String,
}

/// Full-replacement subscription list, the only outbound WebSocket frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicList {
    pub topics: Vec<String>,
}

#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;
