//! MintDB client: envelope construction and HTTP dispatch.
//!
//! One method per remote operation. Each builds a [`RequestEnvelope`] and
//! delegates to a shared POST-and-parse primitive; the parsed response is
//! returned to the caller exactly as received. The client performs no
//! validation of table or document existence, operator legality, or data
//! shape; the server owns all of that.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::envelope::{
    AuthEvent, AuthRequest, Compare, Edge, Key, KeyValue, PublishRequest, RegisterRequest,
    RequestEnvelope, Stmt, Token, Traversal, WebSocketUrl,
};
use crate::error::Error;
use crate::live::LiveHandle;

/// Client for one MintDB server.
///
/// An instance is single-owner: it holds the subscription set and at most
/// one live WebSocket connection, and mutating operations take `&mut self`.
/// Concurrent HTTP calls carry no ordering guarantee relative to one
/// another; dropping an in-flight future cancels the request at the
/// transport layer.
pub struct MintDb {
    base_url: String,
    http: reqwest::Client,
    token: Option<String>,
    user_id: i64,
    connect_timeout: Option<Duration>,
    subscriptions: Vec<String>,
    live: Option<LiveHandle>,
}

impl MintDb {
    /// Client for the server at `base_url` (e.g. `"http://127.0.0.1:8000"`).
    ///
    /// Defaults: `user_id` 1, no bearer token (the Authorization header is
    /// omitted entirely), no connect timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
            token: None,
            user_id: 1,
            connect_timeout: None,
            subscriptions: Vec::new(),
            live: None,
        }
    }

    /// Identity stamped into every envelope and the registration request.
    #[must_use]
    pub fn user_id(mut self, user_id: i64) -> Self {
        self.user_id = user_id;
        self
    }

    /// Bearer credential sent with every HTTP request.
    #[must_use]
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Deadline for the WebSocket connect handshake. Default: none,
    /// matching the server's own behavior of waiting indefinitely.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Install or clear the bearer token, e.g. after [`signin`](Self::signin).
    pub fn set_bearer_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Topics currently held in the local subscription set.
    #[must_use]
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    // -------------------------------------------------------------------
    // /sql operations
    // -------------------------------------------------------------------

    /// List all tables.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn table_list(&self) -> Result<Value, Error> {
        self.sql(self.envelope(Stmt::Info)).await
    }

    /// Create a table.
    ///
    /// The client forwards repeated calls identically; duplicate handling
    /// is the server's concern.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn create_table(&self, table: &str) -> Result<Value, Error> {
        self.sql(self.envelope(Stmt::Add).with_table(table)).await
    }

    /// Create document `doc` in `tb` with the full document body.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn create_doc(&self, tb: &str, doc: &str, doc_data: Value) -> Result<Value, Error> {
        self.sql(
            self.envelope(Stmt::Create)
                .with_table(tb)
                .with_doc(doc)
                .with_data(doc_data),
        )
        .await
    }

    /// Shallow-merge `doc_data` into document `doc`. Merge semantics are
    /// server-defined.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn merge(&self, tb: &str, doc: &str, doc_data: Value) -> Result<Value, Error> {
        self.sql(
            self.envelope(Stmt::Merge)
                .with_table(tb)
                .with_doc(doc)
                .with_data(doc_data),
        )
        .await
    }

    /// Append `value` under `key` in document `doc`.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn push(&self, tb: &str, doc: &str, key: &str, value: Value) -> Result<Value, Error> {
        let data = serde_json::to_value(KeyValue {
            key: key.to_owned(),
            value,
        })?;
        self.sql(
            self.envelope(Stmt::Push)
                .with_table(tb)
                .with_doc(doc)
                .with_data(data),
        )
        .await
    }

    /// Overwrite `key` in document `doc` with `value`.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn put(&self, tb: &str, doc: &str, key: &str, value: Value) -> Result<Value, Error> {
        let data = serde_json::to_value(KeyValue {
            key: key.to_owned(),
            value,
        })?;
        self.sql(
            self.envelope(Stmt::Put)
                .with_table(tb)
                .with_doc(doc)
                .with_data(data),
        )
        .await
    }

    /// Fetch one document by id.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn get_one(&self, tb: &str, doc: &str) -> Result<Value, Error> {
        self.sql(self.envelope(Stmt::Select).with_table(tb).with_doc(doc))
            .await
    }

    /// Fetch every document in `tb`.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn get_all(&self, tb: &str) -> Result<Value, Error> {
        self.sql(self.envelope(Stmt::Select).with_table(tb).with_doc("*"))
            .await
    }

    /// Exact-match filter; all keys in `filter` are ANDed.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn find(&self, tb: &str, filter: Value) -> Result<Value, Error> {
        self.sql(self.envelope(Stmt::Find).with_table(tb).with_data(filter))
            .await
    }

    /// Fuzzy filter with the same payload shape as [`find`](Self::find).
    /// The server returns a narrower result set for identical input; the
    /// client attaches no semantics to the difference.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn match_docs(&self, tb: &str, filter: Value) -> Result<Value, Error> {
        self.sql(self.envelope(Stmt::Match).with_table(tb).with_data(filter))
            .await
    }

    /// Filter `tb` by `lhs op rhs`. The operator string is forwarded
    /// unvalidated; legality is server-enforced.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn compare(&self, tb: &str, lhs: &str, op: &str, rhs: Value) -> Result<Value, Error> {
        let data = serde_json::to_value(Compare {
            lhs: lhs.to_owned(),
            op: op.to_owned(),
            rhs,
        })?;
        self.sql(self.envelope(Stmt::Compare).with_table(tb).with_data(data))
            .await
    }

    /// Delete one key from document `doc`.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn delete_key(&self, tb: &str, doc: &str, key: &str) -> Result<Value, Error> {
        let data = serde_json::to_value(Key { key: key.to_owned() })?;
        self.sql(
            self.envelope(Stmt::Delete)
                .with_table(tb)
                .with_doc(doc)
                .with_data(data),
        )
        .await
    }

    /// Delete the whole document `doc`.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn delete_doc(&self, tb: &str, doc: &str) -> Result<Value, Error> {
        self.sql(self.envelope(Stmt::Delete).with_table(tb).with_doc(doc))
            .await
    }

    /// Delete `key` from every document in `tb`.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn delete_key_all(&self, tb: &str, key: &str) -> Result<Value, Error> {
        let data = serde_json::to_value(Key { key: key.to_owned() })?;
        self.sql(
            self.envelope(Stmt::Delete)
                .with_table(tb)
                .with_doc("*")
                .with_data(data),
        )
        .await
    }

    /// Add a directed edge labeled `rel` from (`tb`, `doc`) to
    /// (`rel_tb`, `rel_doc`).
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn relate(
        &self,
        tb: &str,
        doc: &str,
        rel_tb: &str,
        rel_doc: &str,
        rel: &str,
    ) -> Result<Value, Error> {
        let data = serde_json::to_value(Edge {
            rel_tb: rel_tb.to_owned(),
            rel_doc: rel_doc.to_owned(),
            rel: rel.to_owned(),
        })?;
        self.sql(
            self.envelope(Stmt::Rel)
                .with_table(tb)
                .with_doc(doc)
                .with_data(data),
        )
        .await
    }

    /// Breadth-first traversal from (`tb`, `doc`) to `target_doc` over
    /// `rel` edges.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn bfs(
        &self,
        tb: &str,
        doc: &str,
        target_doc: &str,
        rel: &str,
    ) -> Result<Value, Error> {
        self.traverse(Stmt::Bfs, tb, doc, target_doc, rel).await
    }

    /// Depth-first traversal from (`tb`, `doc`) to `target_doc` over
    /// `rel` edges.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn dfs(
        &self,
        tb: &str,
        doc: &str,
        target_doc: &str,
        rel: &str,
    ) -> Result<Value, Error> {
        self.traverse(Stmt::Dfs, tb, doc, target_doc, rel).await
    }

    /// Send a caller-constructed envelope verbatim, bypassing all field
    /// construction (the `user_id` is not stamped).
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn sql(&self, envelope: RequestEnvelope) -> Result<Value, Error> {
        self.post("/sql", &envelope).await
    }

    // -------------------------------------------------------------------
    // /auth and /publish
    // -------------------------------------------------------------------

    /// Create an account. Returns the opaque credential; the SDK does not
    /// install it; pass it to [`set_bearer_token`](Self::set_bearer_token)
    /// to authenticate subsequent calls.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn signup(&self, username: &str, password: &str) -> Result<Token, Error> {
        self.auth(AuthEvent::Signup, username, password).await
    }

    /// Sign in to an existing account.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn signin(&self, username: &str, password: &str) -> Result<Token, Error> {
        self.auth(AuthEvent::Signin, username, password).await
    }

    /// End the session for `token`. Returns the server's plain
    /// confirmation string.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn signout(&self, token: &str) -> Result<String, Error> {
        let body = AuthRequest {
            event: AuthEvent::Signout,
            username: token.to_owned(),
            password: String::new(),
        };
        self.post("/auth", &body).await
    }

    /// Publish `msg` to `topic` as this client's `user_id`.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn publish(&self, topic: &str, msg: &str) -> Result<Value, Error> {
        let body = PublishRequest {
            topic: topic.to_owned(),
            user_id: self.user_id,
            msg: msg.to_owned(),
        };
        self.post("/publish", &body).await
    }

    // -------------------------------------------------------------------
    // Subscription channel
    // -------------------------------------------------------------------

    /// Request a WebSocket endpoint for this client's `user_id`. No retry.
    ///
    /// # Errors
    ///
    /// Returns transport, status, or decode failures.
    pub async fn register_web_socket(&self) -> Result<WebSocketUrl, Error> {
        self.post(
            "/register",
            &RegisterRequest {
                user_id: self.user_id,
            },
        )
        .await
    }

    /// Register with the server and open the WebSocket connection,
    /// replacing any existing one. The replaced connection's I/O task
    /// shuts its socket down.
    ///
    /// # Errors
    ///
    /// Returns registration failures, [`Error::WsConnect`], or
    /// [`Error::ConnectTimeout`] when a deadline is configured.
    pub async fn connect(&mut self) -> Result<(), Error> {
        let WebSocketUrl { url } = self.register_web_socket().await?;
        let live = LiveHandle::connect(&url, self.connect_timeout).await?;
        self.live = Some(live);
        Ok(())
    }

    /// Whether a live connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.live.as_ref().is_some_and(LiveHandle::is_open)
    }

    /// Connect if not already connected, append each topic, then push the
    /// full updated set to the server as one frame.
    ///
    /// # Errors
    ///
    /// Returns connect failures, or [`Error::NotConnected`] if the socket
    /// dropped between connecting and pushing.
    pub async fn subscribe(&mut self, topics: &[&str]) -> Result<(), Error> {
        if !self.is_connected() {
            self.connect().await?;
        }
        self.subscriptions
            .extend(topics.iter().map(|&topic| topic.to_owned()));
        self.push_subscriptions()
    }

    /// Append one topic and push the full set.
    ///
    /// The local mutation applies even when disconnected; the push is then
    /// reported as [`Error::NotConnected`] with zero send attempts, and the
    /// set re-syncs on the next [`subscribe`](Self::subscribe).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] when no socket is open.
    pub fn add_subscription(&mut self, topic: &str) -> Result<(), Error> {
        self.subscriptions.push(topic.to_owned());
        self.push_subscriptions()
    }

    /// Remove every exact match of `topic` and push the full set. Other
    /// elements keep their order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] when no socket is open.
    pub fn remove_subscription(&mut self, topic: &str) -> Result<(), Error> {
        self.subscriptions.retain(|existing| existing != topic);
        self.push_subscriptions()
    }

    /// Route every inbound frame's decoded JSON to `callback`. Single
    /// slot: registering again replaces the previous observer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] when no socket is open.
    pub fn on_message<F>(&self, callback: F) -> Result<(), Error>
    where
        F: FnMut(Value) + Send + 'static,
    {
        let Some(live) = &self.live else {
            return Err(Error::NotConnected);
        };
        live.set_observer(Box::new(callback));
        Ok(())
    }

    /// Close the connection with code 1000, reason "User Disconnect".
    /// Subsequent pushes report [`Error::NotConnected`]. No-op when
    /// already disconnected.
    pub fn close(&mut self) {
        if let Some(live) = self.live.take() {
            live.close();
        }
    }

    // -------------------------------------------------------------------
    // Shared primitives
    // -------------------------------------------------------------------

    fn envelope(&self, stmt: Stmt) -> RequestEnvelope {
        RequestEnvelope::new(stmt).with_user_id(self.user_id)
    }

    async fn auth(&self, event: AuthEvent, username: &str, password: &str) -> Result<Token, Error> {
        let body = AuthRequest {
            event,
            username: username.to_owned(),
            password: password.to_owned(),
        };
        self.post("/auth", &body).await
    }

    async fn traverse(
        &self,
        stmt: Stmt,
        tb: &str,
        doc: &str,
        target_doc: &str,
        rel: &str,
    ) -> Result<Value, Error> {
        let data = serde_json::to_value(Traversal {
            target_doc: target_doc.to_owned(),
            rel: rel.to_owned(),
        })?;
        self.sql(
            self.envelope(stmt)
                .with_table(tb)
                .with_doc(doc)
                .with_data(data),
        )
        .await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut request = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(body);
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))?;
            request = request.header(AUTHORIZATION, value);
        }

        tracing::debug!(%url, "dispatching request");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status { status, body });
        }

        Ok(response.json::<T>().await?)
    }

    fn push_subscriptions(&self) -> Result<(), Error> {
        let Some(live) = &self.live else {
            return Err(Error::NotConnected);
        };
        live.send_topics(&self.subscriptions)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
