//! Async transport binding.
//!
//! Moves bytes between a tokio stream and a [`Session`]. Every read is fed
//! to the session and whatever it queued in response is written back
//! before the next read.

use std::sync::Arc;

use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::config::SessionConfig;
use super::request::{Disposition, Request, StatementId, Summary};
use super::session::{Session, SessionState};
use crate::bolt::error::HandshakeError;
use crate::bolt::packstream::{PackStreamMap, PackStreamValue};
use crate::bolt::{BoltError, BoltResult};

/// Everything a pulled statement produced.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Field names from the RUN header
    pub fields: Vec<String>,
    /// Records in arrival order
    pub records: Vec<Vec<PackStreamValue>>,
    /// The FAILURE summary if RUN failed, otherwise the footer
    pub summary: Summary,
}

impl QueryResult {
    /// Check that both RUN and the result stream succeeded.
    pub fn is_success(&self) -> bool {
        self.summary.is_success()
    }

    /// Look up a value by field name in the given record.
    pub fn get(&self, record: usize, field: &str) -> Option<&PackStreamValue> {
        let index = self.fields.iter().position(|f| f == field)?;
        self.records.get(record)?.get(index)
    }
}

#[derive(Default)]
struct Collected {
    fields: Vec<String>,
    records: Vec<Vec<PackStreamValue>>,
    header_failure: Option<Summary>,
}

/// Pending result of a submitted statement.
pub struct QueryHandle {
    id: StatementId,
    collected: Arc<Mutex<Collected>>,
    footer: oneshot::Receiver<Summary>,
}

impl QueryHandle {
    /// Statement id, for [`Connection::cancel`].
    pub fn id(&self) -> StatementId {
        self.id
    }
}

/// Attach collecting callbacks to `request`.
fn collecting(request: Request) -> (Request, Arc<Mutex<Collected>>, oneshot::Receiver<Summary>) {
    let collected = Arc::new(Mutex::new(Collected::default()));
    let (tx, rx) = oneshot::channel();

    let header = collected.clone();
    let records = collected.clone();
    let request = request
        .on_header(move |summary| {
            let mut c = header.lock();
            if let Some(fields) = summary.fields() {
                c.fields = fields;
            }
            if summary.disposition == Disposition::Failure {
                c.header_failure = Some(summary);
            }
        })
        .on_record(move |values| records.lock().records.push(values))
        .on_footer(move |summary| {
            // Fails only if the caller dropped the handle.
            let _ = tx.send(summary);
        });
    (request, collected, rx)
}

/// Bolt connection over an async byte stream.
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    session: Session,
    read_buffer: BytesMut,
}

impl Connection<TcpStream> {
    /// Connect over TCP and complete handshake and INIT.
    pub async fn connect(addr: impl ToSocketAddrs, config: SessionConfig) -> BoltResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(peer = ?stream.peer_addr().ok(), "connected");
        Self::open(stream, config).await
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Complete handshake and INIT on an established stream.
    ///
    /// Both must finish within the configured handshake timeout.
    pub async fn open(stream: S, config: SessionConfig) -> BoltResult<Self> {
        let timeout = config.handshake_timeout;
        let mut conn = Self {
            stream,
            read_buffer: BytesMut::with_capacity(config.read_buffer_capacity),
            session: Session::new(config),
        };
        conn.session.open()?;

        match tokio::time::timeout(timeout, conn.establish()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(?timeout, "handshake timed out");
                conn.session.close();
                return Err(BoltError::Timeout("handshake"));
            }
        }
        debug!(
            version = ?conn.session.protocol_version(),
            server = conn.session.server_agent().unwrap_or(""),
            "session ready"
        );
        Ok(conn)
    }

    async fn establish(&mut self) -> BoltResult<()> {
        self.flush().await?;
        while matches!(
            self.session.state(),
            SessionState::Handshaking | SessionState::Initializing
        ) {
            self.pump().await?;
        }
        Ok(())
    }

    /// Queue a statement without writing it.
    pub fn submit(&mut self, request: Request) -> BoltResult<StatementId> {
        self.session.run(request)
    }

    /// Queue a pulled statement whose results are collected.
    pub fn submit_collecting(&mut self, request: Request) -> BoltResult<QueryHandle> {
        let (request, collected, footer) = collecting(request);
        let id = self.session.run(request)?;
        Ok(QueryHandle {
            id,
            collected,
            footer,
        })
    }

    /// Write everything the session has queued.
    pub async fn flush(&mut self) -> BoltResult<()> {
        if !self.session.has_outbound() {
            return Ok(());
        }
        let out = self.session.take_outbound();
        if let Err(e) = self.write_all(&out).await {
            self.session.close();
            return Err(e.into());
        }
        Ok(())
    }

    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }

    /// Read once from the stream, feed the session, and flush its replies.
    pub async fn pump(&mut self) -> BoltResult<()> {
        let n = match self.stream.read_buf(&mut self.read_buffer).await {
            Ok(n) => n,
            Err(e) => {
                self.session.close();
                return Err(e.into());
            }
        };
        if n == 0 {
            let handshaking = self.session.state() == SessionState::Handshaking;
            self.session.close();
            return Err(if handshaking {
                BoltError::from(HandshakeError::ConnectionClosed)
            } else {
                BoltError::ConnectionClosed
            });
        }

        let result = self.session.receive(&self.read_buffer);
        self.read_buffer.clear();
        result?;
        self.flush().await
    }

    /// Run a statement and collect its records.
    ///
    /// Server failures come back as a [`QueryResult`] whose summary carries
    /// the FAILURE; only transport and protocol errors are `Err`.
    pub async fn run(
        &mut self,
        statement: impl Into<String>,
        parameters: PackStreamMap,
    ) -> BoltResult<QueryResult> {
        let handle = self.submit_collecting(Request::new(statement, parameters))?;
        self.flush().await?;
        self.wait(handle).await
    }

    /// Pipeline several statements and collect their results in order.
    pub async fn run_batch<I, T>(&mut self, statements: I) -> BoltResult<Vec<QueryResult>>
    where
        I: IntoIterator<Item = (T, PackStreamMap)>,
        T: Into<String>,
    {
        let mut handles = Vec::new();
        for (statement, parameters) in statements {
            handles.push(self.submit_collecting(Request::new(statement, parameters))?);
        }
        self.flush().await?;

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(self.wait(handle).await?);
        }
        Ok(results)
    }

    /// Drive the connection until `handle`'s footer arrives.
    pub async fn wait(&mut self, handle: QueryHandle) -> BoltResult<QueryResult> {
        let QueryHandle {
            collected,
            mut footer,
            ..
        } = handle;

        let footer = loop {
            match footer.try_recv() {
                Ok(summary) => break summary,
                Err(oneshot::error::TryRecvError::Empty) => self.pump().await?,
                Err(oneshot::error::TryRecvError::Closed) => {
                    return Err(BoltError::ConnectionClosed)
                }
            }
        };

        let collected = std::mem::take(&mut *collected.lock());
        Ok(QueryResult {
            fields: collected.fields,
            records: collected.records,
            summary: collected.header_failure.unwrap_or(footer),
        })
    }

    /// Cancel a statement (see [`Session::cancel`]).
    pub fn cancel(&mut self, id: StatementId) -> bool {
        self.session.cancel(id)
    }

    /// Session state and introspection.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Close the session and shut the stream down.
    pub async fn close(mut self) -> BoltResult<()> {
        self.session.close();
        self.stream.shutdown().await?;
        Ok(())
    }
}
