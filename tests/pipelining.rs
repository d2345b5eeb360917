//! End-to-end tests against a scripted server.
//!
//! The server side reads real handshake and request bytes off an in-memory
//! duplex stream and answers with framed responses, so these cover the
//! codec, session and connection layers together.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio_util::codec::{Decoder, Encoder};
use tracing_subscriber::EnvFilter;

use bolt_session::bolt::codec::BoltCodec;
use bolt_session::bolt::message::{
    BoltRequest, BoltResponse, FailureMessage, IgnoredMessage, RecordMessage, SuccessMessage,
};
use bolt_session::bolt::packstream::{decode, encode};
use bolt_session::{
    Connection, Disposition, Node, PackStreamMap, PackStreamValue, Request, Session,
    SessionConfig, SessionState, Summary,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn frame(response: BoltResponse) -> Vec<u8> {
    let body = encode(&PackStreamValue::Structure(response.to_structure())).unwrap();
    let mut out = BytesMut::new();
    BoltCodec::new().encode(&body[..], &mut out).unwrap();
    out.to_vec()
}

fn params(entries: &[(&str, PackStreamValue)]) -> PackStreamMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Server end of a duplex stream speaking just enough Bolt for a test.
struct FakeServer {
    stream: DuplexStream,
    codec: BoltCodec,
    buf: BytesMut,
}

impl FakeServer {
    /// Answer the handshake and INIT.
    async fn accept(mut stream: DuplexStream) -> Self {
        let mut preamble = [0u8; 20];
        stream.read_exact(&mut preamble).await.unwrap();
        assert_eq!(&preamble[..4], &[0x60, 0x60, 0xB0, 0x17]);
        assert_eq!(&preamble[4..8], &[0, 0, 0, 1]);
        stream.write_all(&[0, 0, 0, 1]).await.unwrap();

        let mut server = Self {
            stream,
            codec: BoltCodec::new(),
            buf: BytesMut::new(),
        };
        let init = server.expect(1).await;
        match &init[0] {
            BoltRequest::Init(msg) => assert!(msg.user_agent.starts_with("bolt-session/")),
            other => panic!("expected INIT, got {}", other.name()),
        }
        let mut ok = SuccessMessage::new();
        ok.add("server", "Fake/1.0");
        server.send(vec![BoltResponse::Success(ok)]).await;
        server
    }

    /// Read exactly `count` requests.
    async fn expect(&mut self, count: usize) -> Vec<BoltRequest> {
        let mut out = Vec::new();
        while out.len() < count {
            if let Some(msg) = self.codec.decode(&mut self.buf).unwrap() {
                match decode(&msg).unwrap() {
                    PackStreamValue::Structure(s) => {
                        out.push(BoltRequest::from_structure(&s).unwrap())
                    }
                    other => panic!("not a structure: {:?}", other),
                }
                continue;
            }
            let n = self.stream.read_buf(&mut self.buf).await.unwrap();
            assert!(n > 0, "client hung up");
        }
        out
    }

    /// True if the client writes nothing for a short while.
    async fn idle(&mut self) -> bool {
        if !self.buf.is_empty() {
            return false;
        }
        let read = tokio::time::timeout(
            Duration::from_millis(50),
            self.stream.read_buf(&mut self.buf),
        )
        .await;
        read.is_err()
    }

    async fn send(&mut self, responses: Vec<BoltResponse>) {
        let mut out = Vec::new();
        for response in responses {
            out.extend(frame(response));
        }
        self.stream.write_all(&out).await.unwrap();
    }
}

fn statement(request: &BoltRequest) -> &str {
    match request {
        BoltRequest::Run(run) => &run.statement,
        other => panic!("expected RUN, got {}", other.name()),
    }
}

fn ok_fields(fields: &[&str]) -> BoltResponse {
    BoltResponse::Success(SuccessMessage::run_success(fields))
}

fn ok() -> BoltResponse {
    BoltResponse::Success(SuccessMessage::new())
}

fn record(values: Vec<PackStreamValue>) -> BoltResponse {
    BoltResponse::Record(RecordMessage::new(values))
}

#[tokio::test]
async fn test_batch_runs_one_statement_at_a_time() {
    init_tracing();
    let (client, server) = duplex(64 * 1024);

    let server_task = tokio::spawn(async move {
        let mut server = FakeServer::accept(server).await;
        for i in 1..=3i64 {
            let sent = server.expect(2).await;
            assert_eq!(statement(&sent[0]), format!("RETURN {} AS n", i));
            assert_eq!(sent[1], BoltRequest::PullAll);
            assert!(server.idle().await, "next RUN sent before summary");

            server
                .send(vec![ok_fields(&["n"]), record(vec![i.into()]), ok()])
                .await;
        }
        server
    });

    let mut conn = Connection::open(client, SessionConfig::default()).await.unwrap();
    let results = conn
        .run_batch((1..=3).map(|i| (format!("RETURN {} AS n", i), PackStreamMap::new())))
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    for (i, result) in results.iter().enumerate() {
        assert!(result.is_success());
        assert_eq!(result.get(0, "n"), Some(&PackStreamValue::Integer(i as i64 + 1)));
    }
    assert_eq!(conn.session().state(), SessionState::Ready);
    assert_eq!(conn.session().outstanding_handlers(), 0);

    let _server = server_task.await.unwrap();
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_failure_is_acknowledged_before_next_statement() {
    init_tracing();
    let (client, server) = duplex(64 * 1024);

    let server_task = tokio::spawn(async move {
        let mut server = FakeServer::accept(server).await;

        let sent = server.expect(2).await;
        assert_eq!(statement(&sent[0]), "BAD SYNTAX");
        server
            .send(vec![
                BoltResponse::Failure(FailureMessage::new(
                    "Neo.ClientError.Statement.SyntaxError",
                    "Invalid input",
                )),
                BoltResponse::Ignored(IgnoredMessage::default()),
            ])
            .await;

        let ack = server.expect(1).await;
        assert_eq!(ack[0], BoltRequest::AckFailure);
        assert!(server.idle().await, "RUN sent before ACK_FAILURE completed");
        server.send(vec![ok()]).await;

        let sent = server.expect(2).await;
        assert_eq!(statement(&sent[0]), "RETURN $x AS x");
        match &sent[0] {
            BoltRequest::Run(run) => {
                assert_eq!(run.parameters.get("x"), Some(&PackStreamValue::Integer(2)))
            }
            _ => unreachable!(),
        }
        server
            .send(vec![ok_fields(&["x"]), record(vec![2.into()]), ok()])
            .await;
        server
    });

    let mut conn = Connection::open(client, SessionConfig::default()).await.unwrap();
    let results = conn
        .run_batch(vec![
            ("BAD SYNTAX", PackStreamMap::new()),
            ("RETURN $x AS x", params(&[("x", 2.into())])),
        ])
        .await
        .unwrap();

    assert_eq!(results[0].summary.disposition, Disposition::Failure);
    assert_eq!(
        results[0].summary.code(),
        Some("Neo.ClientError.Statement.SyntaxError")
    );
    assert_eq!(results[0].summary.message(), Some("Invalid input"));
    assert!(results[0].records.is_empty());

    assert!(results[1].is_success());
    assert_eq!(results[1].records, vec![vec![PackStreamValue::Integer(2)]]);

    let _server = server_task.await.unwrap();
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_hydrated_node_and_multi_chunk_record() {
    init_tracing();
    let (client, server) = duplex(16 * 1024);
    let big = "x".repeat(40_000);
    let expected = big.clone();

    let server_task = tokio::spawn(async move {
        let mut server = FakeServer::accept(server).await;
        server.expect(2).await;

        let node = Node::new(
            "node/7",
            vec!["Person".to_string()],
            params(&[("name", "Alice".into())]),
        );
        let row = record(vec![node.to_structure().into(), big.into()]);
        let framed = frame(row.clone());
        // First chunk is full.
        assert_eq!(&framed[..2], &[0x3F, 0xFF]);

        server.send(vec![ok_fields(&["n", "blob"]), row, ok()]).await;
        server
    });

    let mut conn = Connection::open(client, SessionConfig::default()).await.unwrap();
    let result = conn
        .run("MATCH (n) RETURN n, n.blob AS blob", PackStreamMap::new())
        .await
        .unwrap();

    assert!(result.is_success());
    let node = result.get(0, "n").and_then(|v| v.as_node()).unwrap();
    assert_eq!(node.id(), Some(7));
    assert!(node.has_label("Person"));
    assert_eq!(node.get("name").and_then(|v| v.as_str()), Some("Alice"));
    assert_eq!(result.get(0, "blob").and_then(|v| v.as_str()), Some(expected.as_str()));

    let _server = server_task.await.unwrap();
    conn.close().await.unwrap();
}

#[tokio::test]
async fn test_cancel_queued_statement() {
    init_tracing();
    let (client, server) = duplex(64 * 1024);

    let server_task = tokio::spawn(async move {
        let mut server = FakeServer::accept(server).await;
        let sent = server.expect(2).await;
        assert_eq!(statement(&sent[0]), "RETURN 1");
        server.send(vec![ok_fields(&["1"]), ok()]).await;
        assert!(server.idle().await, "cancelled statement reached the wire");
        server
    });

    let mut conn = Connection::open(client, SessionConfig::default()).await.unwrap();
    let first = conn
        .submit_collecting(Request::new("RETURN 1", PackStreamMap::new()))
        .unwrap();
    let second = conn
        .submit_collecting(Request::new("RETURN 2", PackStreamMap::new()))
        .unwrap();
    assert_eq!(conn.session().queued_requests(), 1);

    assert!(conn.cancel(second.id()));
    assert!(!conn.cancel(second.id()));
    conn.flush().await.unwrap();

    let cancelled = conn.wait(second).await.unwrap();
    assert_eq!(cancelled.summary.disposition, Disposition::Cancelled);
    assert!(cancelled.records.is_empty());

    let done = conn.wait(first).await.unwrap();
    assert!(done.is_success());
    assert_eq!(done.fields, vec!["1".to_string()]);

    let _server = server_task.await.unwrap();
    conn.close().await.unwrap();
}

#[test]
fn test_medium_text_uses_16_bit_size_class() {
    let bytes = encode(&PackStreamValue::String("a".repeat(300))).unwrap();
    assert_eq!(&bytes[..3], &[0xD1, 0x01, 0x2C]);
    assert_eq!(bytes.len(), 303);
}

#[test]
fn test_session_fed_one_byte_at_a_time() {
    init_tracing();
    let mut session = Session::new(SessionConfig::default());
    session.open().unwrap();
    assert_eq!(session.take_outbound().len(), 20);

    for b in [0u8, 0, 0, 1] {
        session.receive(&[b]).unwrap();
    }
    assert_eq!(session.state(), SessionState::Initializing);
    assert!(session.has_outbound());
    session.take_outbound();

    for b in frame(ok()) {
        session.receive(&[b]).unwrap();
    }
    assert!(session.is_ready());

    let records = Arc::new(Mutex::new(Vec::new()));
    let footer: Arc<Mutex<Option<Summary>>> = Arc::new(Mutex::new(None));
    let sink = records.clone();
    let done = footer.clone();
    session
        .run(
            Request::new("UNWIND [1, 2] AS x RETURN x", PackStreamMap::new())
                .on_record(move |values| sink.lock().push(values))
                .on_footer(move |summary| *done.lock() = Some(summary)),
        )
        .unwrap();
    assert_eq!(session.state(), SessionState::Busy);
    assert_eq!(session.outstanding_handlers(), 2);

    let mut replies = frame(ok_fields(&["x"]));
    replies.extend(frame(record(vec![1.into()])));
    replies.extend(frame(record(vec![2.into()])));
    replies.extend(frame(ok()));
    for b in replies {
        session.receive(&[b]).unwrap();
    }

    assert_eq!(
        *records.lock(),
        vec![vec![PackStreamValue::Integer(1)], vec![PackStreamValue::Integer(2)]]
    );
    assert!(footer.lock().as_ref().unwrap().is_success());
    assert!(session.is_ready());
}
