//! Client session.
//!
//! - [`Session`] - sans-I/O state machine: handshake, INIT, pipelining and
//!   response correlation
//! - [`Connection`] - drives a session over a tokio stream
//! - [`Request`] / [`Summary`] - statements and their outcomes
//! - [`SessionConfig`] - settings

pub mod config;
pub mod connection;
pub mod request;
pub mod session;

pub use config::{SessionConfig, SessionConfigBuilder};
pub use connection::{Connection, QueryHandle, QueryResult};
pub use request::{
    Disposition, RecordCallback, Request, ResultMode, StatementId, Summary, SummaryCallback,
};
pub use session::{Session, SessionState};
