//! Session state machine.
//!
//! The session does no I/O. Bytes read from the transport go into
//! [`Session::receive`]; bytes to write come out of
//! [`Session::take_outbound`]. Between the two it negotiates the protocol
//! version, sends INIT, and pipelines statements: RUN and its PULL_ALL (or
//! DISCARD_ALL) are written back to back, and every reply is routed to the
//! head of the response-handler FIFO.
//!
//! Only one statement is in flight at a time; further statements wait in
//! the request queue until the previous one's footer arrives.

use std::collections::VecDeque;
use std::fmt;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, trace, warn};

use super::config::SessionConfig;
use super::request::{
    Disposition, HandlerKind, Request, ResponseHandler, ResultMode, StatementId, Summary,
};
use crate::bolt::codec::BoltCodec;
use crate::bolt::handshake::{BoltVersion, Handshake, HANDSHAKE_RESPONSE_SIZE};
use crate::bolt::message::{tag, BoltRequest, BoltResponse, InitMessage, RunMessage};
use crate::bolt::packstream::{decode_with_depth, hydrate, PackStreamMap, PackStreamValue};
use crate::bolt::{BoltError, BoltResult};

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, handshake not sent
    Connecting,
    /// Handshake sent, waiting for the version reply
    Handshaking,
    /// INIT sent, waiting for its summary
    Initializing,
    /// Idle, next statement may be dispatched
    Ready,
    /// A statement (or a failure acknowledgement) is outstanding
    Busy,
    /// Closed by the caller or by a fatal error
    Closed,
}

impl SessionState {
    /// Lowercase name for logs and errors.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::Handshaking => "handshaking",
            SessionState::Initializing => "initializing",
            SessionState::Ready => "ready",
            SessionState::Busy => "busy",
            SessionState::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queued statement with its RUN message already encoded.
struct PendingRequest {
    id: StatementId,
    request: Request,
    run_payload: BytesMut,
}

/// Sans-I/O Bolt v1 client session.
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    handshake: Handshake,
    codec: BoltCodec,
    inbound: BytesMut,
    outbound: BytesMut,
    handlers: VecDeque<ResponseHandler>,
    requests: VecDeque<PendingRequest>,
    in_flight: Option<StatementId>,
    awaiting_ack: bool,
    next_id: u64,
    version: Option<BoltVersion>,
    server_agent: Option<String>,
}

impl Session {
    /// Create a session.
    pub fn new(config: SessionConfig) -> Self {
        let codec = BoltCodec::with_max_size(config.max_message_size);
        Self {
            config,
            state: SessionState::Connecting,
            handshake: Handshake::new(),
            codec,
            inbound: BytesMut::new(),
            outbound: BytesMut::new(),
            handlers: VecDeque::new(),
            requests: VecDeque::new(),
            in_flight: None,
            awaiting_ack: false,
            next_id: 1,
            version: None,
            server_agent: None,
        }
    }

    /// Start the connection: queue the handshake preamble.
    pub fn open(&mut self) -> BoltResult<()> {
        if self.state != SessionState::Connecting {
            return Err(BoltError::invalid_state(format!(
                "cannot open a session that is {}",
                self.state
            )));
        }
        let preamble = self.handshake.preamble();
        debug!(proposals = ?self.handshake.proposals(), "C: [HANDSHAKE]");
        self.outbound.extend_from_slice(&preamble);
        self.state = SessionState::Handshaking;
        Ok(())
    }

    /// Feed bytes read from the transport.
    ///
    /// Any error returned other than `InvalidState` has closed the session.
    pub fn receive(&mut self, data: &[u8]) -> BoltResult<()> {
        match self.state {
            SessionState::Closed => return Err(BoltError::ConnectionClosed),
            SessionState::Connecting => {
                return Err(BoltError::invalid_state("data received before open"))
            }
            _ => {}
        }

        self.inbound.extend_from_slice(data);
        let result = self.process_inbound();
        if let Err(e) = &result {
            self.fail(e);
        }
        result
    }

    /// Queue a statement. Returns its id once the RUN message encodes.
    ///
    /// Encoding problems are reported here and leave the session untouched.
    pub fn run(&mut self, request: Request) -> BoltResult<StatementId> {
        if self.state == SessionState::Closed {
            return Err(BoltError::ConnectionClosed);
        }

        let run = BoltRequest::Run(
            RunMessage::new(request.statement.clone()).with_parameters(request.parameters.clone()),
        );
        let run_payload = run
            .to_bytes(self.config.max_nesting_depth)
            .map_err(BoltError::Encode)?;

        let id = StatementId(self.next_id);
        self.next_id += 1;
        trace!(statement = %id, text = %request.statement, "queued");
        self.requests.push_back(PendingRequest {
            id,
            request,
            run_payload,
        });
        self.drain()?;
        Ok(id)
    }

    /// Cancel a statement.
    ///
    /// A queued statement is removed. A statement already on the wire keeps
    /// its handlers in the FIFO so later replies still line up, but its
    /// callbacks are suppressed. Either way the footer callback receives
    /// [`Disposition::Cancelled`] right away. Returns false for unknown or
    /// finished statements.
    pub fn cancel(&mut self, id: StatementId) -> bool {
        if let Some(pos) = self.requests.iter().position(|p| p.id == id) {
            if let Some(pending) = self.requests.remove(pos) {
                warn!(statement = %id, "cancelled before dispatch");
                if let Some(footer) = pending.request.on_footer {
                    footer(Summary::cancelled());
                }
            }
            return true;
        }

        if self.in_flight != Some(id) {
            return false;
        }

        let mut found = false;
        let mut footers = Vec::new();
        for handler in self.handlers.iter_mut() {
            if handler.statement != Some(id) || handler.is_cancelled() {
                continue;
            }
            found = true;
            let terminal = handler.is_terminal();
            if let Some(callback) = handler.cancel() {
                if terminal {
                    footers.push(callback);
                }
            }
        }
        if found {
            warn!(statement = %id, "cancelled in flight; replies will be discarded");
        }
        for footer in footers {
            footer(Summary::cancelled());
        }
        found
    }

    /// Take bytes waiting to be written to the transport.
    pub fn take_outbound(&mut self) -> BytesMut {
        self.outbound.split()
    }

    /// Whether bytes are waiting to be written.
    pub fn has_outbound(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Close the session. Outstanding footers receive `Cancelled`.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            debug!(state = %self.state, "closing session");
            self.shutdown();
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the next queued statement would be dispatched immediately.
    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Statements waiting for dispatch.
    pub fn queued_requests(&self) -> usize {
        self.requests.len()
    }

    /// Wire requests waiting for a summary.
    pub fn outstanding_handlers(&self) -> usize {
        self.handlers.len()
    }

    /// Statement currently on the wire.
    pub fn in_flight(&self) -> Option<StatementId> {
        self.in_flight
    }

    /// Negotiated protocol version.
    pub fn protocol_version(&self) -> Option<BoltVersion> {
        self.version
    }

    /// Server agent reported in reply to INIT.
    pub fn server_agent(&self) -> Option<&str> {
        self.server_agent.as_deref()
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn process_inbound(&mut self) -> BoltResult<()> {
        if self.state == SessionState::Handshaking {
            if self.inbound.len() < HANDSHAKE_RESPONSE_SIZE {
                return Ok(());
            }
            let mut reply = [0u8; HANDSHAKE_RESPONSE_SIZE];
            reply.copy_from_slice(&self.inbound.split_to(HANDSHAKE_RESPONSE_SIZE));
            let version = self.handshake.accept(reply)?;
            debug!(%version, "S: [HANDSHAKE]");
            self.version = Some(version);
            self.state = SessionState::Initializing;

            let init = BoltRequest::Init(InitMessage::new(self.config.user_agent.clone()));
            debug!(user_agent = %self.config.user_agent, "C: INIT");
            self.write(&init)?;
            self.handlers.push_back(ResponseHandler::init());
        }

        while let Some(message) = self.codec.decode(&mut self.inbound)? {
            self.dispatch(message)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, message: BytesMut) -> BoltResult<()> {
        if message.is_empty() {
            trace!("S: empty message");
            return Ok(());
        }

        let structure = match decode_with_depth(&message, self.config.max_nesting_depth)
            .map_err(BoltError::Decode)?
        {
            PackStreamValue::Structure(s) => s,
            other => {
                return Err(BoltError::protocol(format!(
                    "expected a message structure, got {}",
                    other.type_name()
                )))
            }
        };
        if !tag::is_response(structure.signature) {
            return Err(BoltError::UnexpectedMessage {
                signature: structure.signature,
                state: self.state.as_str(),
            });
        }

        match BoltResponse::from_structure(structure).map_err(BoltError::Decode)? {
            BoltResponse::Record(record) => {
                let fields = record
                    .fields
                    .into_iter()
                    .map(hydrate)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(BoltError::Decode)?;
                debug!(values = fields.len(), "S: RECORD");
                self.on_record(fields)
            }
            BoltResponse::Success(msg) => {
                self.on_summary("SUCCESS", Disposition::Success, msg.metadata)
            }
            BoltResponse::Ignored(msg) => {
                self.on_summary("IGNORED", Disposition::Ignored, msg.metadata)
            }
            BoltResponse::Failure(msg) => {
                warn!(code = msg.code(), reason = msg.message(), "S: FAILURE");
                self.on_summary("FAILURE", Disposition::Failure, msg.metadata)
            }
        }
    }

    fn on_record(&mut self, fields: Vec<PackStreamValue>) -> BoltResult<()> {
        match self.handlers.front_mut() {
            Some(head) if head.kind == HandlerKind::PullAll => {
                head.on_record(fields);
                Ok(())
            }
            _ => Err(BoltError::UnexpectedMessage {
                signature: tag::RECORD,
                state: self.state.as_str(),
            }),
        }
    }

    fn on_summary(
        &mut self,
        name: &'static str,
        disposition: Disposition,
        metadata: PackStreamMap,
    ) -> BoltResult<()> {
        let handler = self.handlers.pop_front().ok_or_else(|| {
            BoltError::protocol(format!("{} received with no outstanding request", name))
        })?;
        let metadata = match hydrate(PackStreamValue::Map(metadata)).map_err(BoltError::Decode)? {
            PackStreamValue::Map(m) => m,
            _ => PackStreamMap::new(),
        };
        if disposition != Disposition::Failure {
            debug!(kind = ?handler.kind, statement = ?handler.statement, "S: {}", name);
        }

        match handler.kind {
            HandlerKind::Init => {
                if disposition != Disposition::Success {
                    let summary = Summary::new(disposition, metadata);
                    return Err(BoltError::InitFailed {
                        code: summary.code().unwrap_or(name).to_string(),
                        message: summary.message().unwrap_or_default().to_string(),
                    });
                }
                self.server_agent = metadata
                    .get("server")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                self.state = SessionState::Ready;
            }
            HandlerKind::AckFailure => {
                if disposition != Disposition::Success {
                    return Err(BoltError::protocol(format!(
                        "ACK_FAILURE answered with {}",
                        name
                    )));
                }
                self.awaiting_ack = false;
            }
            HandlerKind::Run | HandlerKind::PullAll | HandlerKind::DiscardAll => {
                if handler.is_terminal() && self.in_flight == handler.statement {
                    self.in_flight = None;
                }
                handler.complete(Summary::new(disposition, metadata));
            }
        }

        if disposition == Disposition::Failure && !self.awaiting_ack {
            debug!("C: ACK_FAILURE");
            self.write(&BoltRequest::AckFailure)?;
            self.handlers.push_back(ResponseHandler::ack_failure());
            self.awaiting_ack = true;
        }

        self.settle()
    }

    /// Return to Ready once nothing blocks the next statement.
    fn settle(&mut self) -> BoltResult<()> {
        if matches!(self.state, SessionState::Ready | SessionState::Busy)
            && self.in_flight.is_none()
            && !self.awaiting_ack
        {
            self.state = SessionState::Ready;
            self.drain()?;
        }
        Ok(())
    }

    /// Dispatch the next queued statement if the session is ready.
    fn drain(&mut self) -> BoltResult<()> {
        if self.state != SessionState::Ready {
            return Ok(());
        }
        let Some(pending) = self.requests.pop_front() else {
            return Ok(());
        };

        let PendingRequest {
            id,
            request,
            run_payload,
        } = pending;
        self.state = SessionState::Busy;
        self.in_flight = Some(id);

        debug!(statement = %id, text = %request.statement, params = ?request.parameters, "C: RUN");
        self.codec.encode(&run_payload[..], &mut self.outbound)?;
        self.handlers
            .push_back(ResponseHandler::run(id, request.on_header));

        match request.mode {
            ResultMode::PullAll => {
                debug!(statement = %id, "C: PULL_ALL");
                self.write(&BoltRequest::PullAll)?;
                self.handlers.push_back(ResponseHandler::pull_all(
                    id,
                    request.on_footer,
                    request.on_record,
                ));
            }
            ResultMode::DiscardAll => {
                debug!(statement = %id, "C: DISCARD_ALL");
                self.write(&BoltRequest::DiscardAll)?;
                self.handlers
                    .push_back(ResponseHandler::discard_all(id, request.on_footer));
            }
        }
        Ok(())
    }

    fn write(&mut self, request: &BoltRequest) -> BoltResult<()> {
        let payload = request
            .to_bytes(self.config.max_nesting_depth)
            .map_err(BoltError::Encode)?;
        self.codec.encode(&payload[..], &mut self.outbound)
    }

    fn fail(&mut self, err: &BoltError) {
        if err.is_fatal() && self.state != SessionState::Closed {
            error!(error = %err, state = %self.state, "session failed");
            self.shutdown();
        }
    }

    fn shutdown(&mut self) {
        self.state = SessionState::Closed;
        self.in_flight = None;
        self.awaiting_ack = false;
        self.inbound.clear();

        let handlers = std::mem::take(&mut self.handlers);
        let requests = std::mem::take(&mut self.requests);
        for handler in handlers {
            if let Some(footer) = handler.into_footer() {
                footer(Summary::cancelled());
            }
        }
        for pending in requests {
            if let Some(footer) = pending.request.on_footer {
                footer(Summary::cancelled());
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("in_flight", &self.in_flight)
            .field("handlers", &self.handlers.len())
            .field("requests", &self.requests.len())
            .finish()
    }
}
