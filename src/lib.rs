//! # bolt-session
//!
//! Client-side core of the Bolt v1 graph database protocol.
//!
//! ## Features
//!
//! - **PackStream** - Binary value codec covering every size class, with
//!   hydration of graph nodes and relationships
//! - **Chunk framing** - 16383-byte chunks, reassembly across arbitrary reads
//! - **Handshake + INIT** - Version negotiation and client identification
//! - **Pipelining** - RUN and PULL_ALL written back to back, replies routed
//!   through a strict FIFO of response handlers
//! - **Failure recovery** - ACK_FAILURE after every FAILURE before the next
//!   statement is dispatched
//! - **Async binding** - Drive a session over any tokio stream
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use bolt_session::{Connection, PackStreamMap, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut conn = Connection::connect("localhost:7687", SessionConfig::default()).await?;
//!
//!     let mut params = PackStreamMap::new();
//!     params.insert("name".to_string(), "Alice".into());
//!     let result = conn
//!         .run("CREATE (n:Person {name: $name}) RETURN n", params)
//!         .await?;
//!
//!     for record in &result.records {
//!         for value in record {
//!             println!("{}", value);
//!         }
//!     }
//!
//!     conn.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Without a runtime
//!
//! [`Session`] does no I/O; feed it bytes and write out what it produces:
//!
//! ```rust
//! use bolt_session::{Request, PackStreamMap, Session, SessionConfig, SessionState};
//!
//! let mut session = Session::new(SessionConfig::default());
//! session.open().unwrap();
//! let preamble = session.take_outbound();
//! assert_eq!(preamble.len(), 20);
//!
//! session.receive(&[0, 0, 0, 1]).unwrap();
//! assert_eq!(session.state(), SessionState::Initializing);
//!
//! // Queued until INIT succeeds.
//! session.run(Request::new("RETURN 1", PackStreamMap::new())).unwrap();
//! assert_eq!(session.queued_requests(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`client`] - Session state machine, requests and the async connection
//! - [`bolt`] - Wire-level codec, framing, handshake and messages

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod bolt;
pub mod client;

// Re-exports for convenience
pub use client::{
    Connection, Disposition, QueryHandle, QueryResult, Request, ResultMode, Session,
    SessionConfig, SessionConfigBuilder, SessionState, StatementId, Summary,
};

pub use bolt::{
    hydrate, BoltError, BoltResult, BoltVersion, HandshakeError, Node, PackStreamError,
    PackStreamMap, PackStreamStructure, PackStreamValue, Relationship,
};
