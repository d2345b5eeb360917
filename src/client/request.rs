//! Statements, response handlers and summaries.
//!
//! A [`Request`] is what the caller queues; once dispatched it becomes two
//! wire requests (RUN followed by PULL_ALL or DISCARD_ALL), each represented
//! by a [`ResponseHandler`] waiting in the session's FIFO.

use std::fmt;

use crate::bolt::message::fields_of;
use crate::bolt::packstream::{PackStreamMap, PackStreamValue};

/// Callback receiving a summary (SUCCESS / FAILURE / IGNORED / cancellation).
pub type SummaryCallback = Box<dyn FnOnce(Summary) + Send>;

/// Callback receiving one hydrated record.
pub type RecordCallback = Box<dyn FnMut(Vec<PackStreamValue>) + Send>;

/// Identifies a statement submitted to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementId(pub(crate) u64);

impl StatementId {
    /// Raw sequence number.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// SUCCESS
    Success,
    /// FAILURE
    Failure,
    /// IGNORED
    Ignored,
    /// Cancelled locally or dropped when the session closed
    Cancelled,
}

/// Outcome delivered to header and footer callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// How the request ended
    pub disposition: Disposition,
    /// Server metadata (empty for local cancellation)
    pub metadata: PackStreamMap,
}

impl Summary {
    /// Create a summary.
    pub fn new(disposition: Disposition, metadata: PackStreamMap) -> Self {
        Self {
            disposition,
            metadata,
        }
    }

    /// Summary for a request that never reached a server reply.
    pub fn cancelled() -> Self {
        Self::new(Disposition::Cancelled, PackStreamMap::new())
    }

    /// Check for SUCCESS.
    pub fn is_success(&self) -> bool {
        self.disposition == Disposition::Success
    }

    /// Server error code, for FAILURE.
    pub fn code(&self) -> Option<&str> {
        self.metadata.get("code").and_then(|v| v.as_str())
    }

    /// Server error message, for FAILURE.
    pub fn message(&self) -> Option<&str> {
        self.metadata.get("message").and_then(|v| v.as_str())
    }

    /// Field names from a RUN header.
    pub fn fields(&self) -> Option<Vec<String>> {
        fields_of(&self.metadata)
    }
}

/// How the result stream of a statement is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMode {
    /// PULL_ALL: stream every record
    PullAll,
    /// DISCARD_ALL: drop the records, keep the summary
    DiscardAll,
}

/// A statement waiting to be sent.
pub struct Request {
    pub(crate) statement: String,
    pub(crate) parameters: PackStreamMap,
    pub(crate) mode: ResultMode,
    pub(crate) on_header: Option<SummaryCallback>,
    pub(crate) on_record: Option<RecordCallback>,
    pub(crate) on_footer: Option<SummaryCallback>,
}

impl Request {
    /// Statement whose records are pulled.
    pub fn new(statement: impl Into<String>, parameters: PackStreamMap) -> Self {
        Self {
            statement: statement.into(),
            parameters,
            mode: ResultMode::PullAll,
            on_header: None,
            on_record: None,
            on_footer: None,
        }
    }

    /// Statement whose records are discarded.
    pub fn discard(statement: impl Into<String>, parameters: PackStreamMap) -> Self {
        Self {
            mode: ResultMode::DiscardAll,
            ..Self::new(statement, parameters)
        }
    }

    /// Add a parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<PackStreamValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Called with the RUN summary.
    pub fn on_header(mut self, f: impl FnOnce(Summary) + Send + 'static) -> Self {
        self.on_header = Some(Box::new(f));
        self
    }

    /// Called once per record. Ignored for discarding requests.
    pub fn on_record(mut self, f: impl FnMut(Vec<PackStreamValue>) + Send + 'static) -> Self {
        self.on_record = Some(Box::new(f));
        self
    }

    /// Called with the PULL_ALL / DISCARD_ALL summary.
    pub fn on_footer(mut self, f: impl FnOnce(Summary) + Send + 'static) -> Self {
        self.on_footer = Some(Box::new(f));
        self
    }

    /// Statement text.
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Statement parameters.
    pub fn parameters(&self) -> &PackStreamMap {
        &self.parameters
    }

    /// Result mode.
    pub fn mode(&self) -> ResultMode {
        self.mode
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("statement", &self.statement)
            .field("parameters", &self.parameters)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Which wire request a handler answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandlerKind {
    Init,
    AckFailure,
    Run,
    PullAll,
    DiscardAll,
}

/// One entry of the response FIFO.
pub(crate) struct ResponseHandler {
    pub(crate) kind: HandlerKind,
    pub(crate) statement: Option<StatementId>,
    summary: Option<SummaryCallback>,
    detail: Option<RecordCallback>,
    cancelled: bool,
}

impl ResponseHandler {
    fn new(kind: HandlerKind, statement: Option<StatementId>) -> Self {
        Self {
            kind,
            statement,
            summary: None,
            detail: None,
            cancelled: false,
        }
    }

    pub(crate) fn init() -> Self {
        Self::new(HandlerKind::Init, None)
    }

    pub(crate) fn ack_failure() -> Self {
        Self::new(HandlerKind::AckFailure, None)
    }

    pub(crate) fn run(id: StatementId, header: Option<SummaryCallback>) -> Self {
        Self {
            summary: header,
            ..Self::new(HandlerKind::Run, Some(id))
        }
    }

    pub(crate) fn pull_all(
        id: StatementId,
        footer: Option<SummaryCallback>,
        records: Option<RecordCallback>,
    ) -> Self {
        Self {
            summary: footer,
            detail: records,
            ..Self::new(HandlerKind::PullAll, Some(id))
        }
    }

    pub(crate) fn discard_all(id: StatementId, footer: Option<SummaryCallback>) -> Self {
        Self {
            summary: footer,
            ..Self::new(HandlerKind::DiscardAll, Some(id))
        }
    }

    /// Last handler of a statement.
    pub(crate) fn is_terminal(&self) -> bool {
        matches!(self.kind, HandlerKind::PullAll | HandlerKind::DiscardAll)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub(crate) fn on_record(&mut self, fields: Vec<PackStreamValue>) {
        if let Some(detail) = self.detail.as_mut() {
            detail(fields);
        }
    }

    pub(crate) fn complete(mut self, summary: Summary) {
        if let Some(callback) = self.summary.take() {
            callback(summary);
        }
    }

    /// Suppress further callbacks, handing back the pending summary callback.
    pub(crate) fn cancel(&mut self) -> Option<SummaryCallback> {
        self.cancelled = true;
        self.detail = None;
        self.summary.take()
    }

    /// Footer still owed to the caller, if any.
    pub(crate) fn into_footer(mut self) -> Option<SummaryCallback> {
        if self.is_terminal() {
            self.summary.take()
        } else {
            None
        }
    }
}

impl fmt::Debug for ResponseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHandler")
            .field("kind", &self.kind)
            .field("statement", &self.statement)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}
