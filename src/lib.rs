//! MintDB client SDK.
//!
//! MintDB is a remote document/graph database fronted by four HTTP
//! endpoints (`/sql`, `/auth`, `/register`, `/publish`) and a WebSocket
//! pub/sub feed. This crate marshals typed method calls into the fixed
//! `/sql` request envelope, returns parsed responses untouched, and
//! manages the one live subscription channel an instance may hold.
//!
//! ```no_run
//! use mintdb::MintDb;
//!
//! # async fn demo() -> Result<(), mintdb::Error> {
//! let mut db = MintDb::new("http://127.0.0.1:8000");
//!
//! let token = db.signin("lucy@gmail.com", "abc123").await?;
//! db.set_bearer_token(Some(token.token));
//!
//! let cars = db
//!     .find("car", serde_json::json!({ "make": "Mercedes-Benz" }))
//!     .await?;
//! println!("{cars}");
//!
//! db.subscribe(&["inventory"]).await?;
//! db.on_message(|frame| println!("{frame}"))?;
//! # Ok(())
//! # }
//! ```

mod client;
mod envelope;
mod error;
mod live;

pub use client::MintDb;
pub use envelope::{
    AuthEvent, AuthRequest, Compare, Edge, Key, KeyValue, PublishRequest, RegisterRequest,
    RequestEnvelope, Stmt, Token, TopicList, Traversal, WebSocketUrl,
};
pub use error::Error;
