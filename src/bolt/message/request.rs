//! Bolt protocol request messages.
//!
//! Request messages are sent from the client to the server.

use bytes::BytesMut;

use super::tag;
use crate::bolt::packstream::{
    PackStreamEncoder, PackStreamError, PackStreamMap, PackStreamStructure, PackStreamValue,
};

/// All Bolt request messages.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltRequest {
    /// INIT - Identify the client
    Init(InitMessage),
    /// ACK_FAILURE - Acknowledge a FAILURE so the server accepts work again
    AckFailure,
    /// RUN - Execute a statement
    Run(RunMessage),
    /// DISCARD_ALL - Drop the pending result stream
    DiscardAll,
    /// PULL_ALL - Stream every pending record
    PullAll,
}

impl BoltRequest {
    /// Get the message tag.
    pub fn tag(&self) -> u8 {
        match self {
            BoltRequest::Init(_) => tag::INIT,
            BoltRequest::AckFailure => tag::ACK_FAILURE,
            BoltRequest::Run(_) => tag::RUN,
            BoltRequest::DiscardAll => tag::DISCARD_ALL,
            BoltRequest::PullAll => tag::PULL_ALL,
        }
    }

    /// Get message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltRequest::Init(_) => "INIT",
            BoltRequest::AckFailure => "ACK_FAILURE",
            BoltRequest::Run(_) => "RUN",
            BoltRequest::DiscardAll => "DISCARD_ALL",
            BoltRequest::PullAll => "PULL_ALL",
        }
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        match self {
            BoltRequest::Init(msg) => msg.to_structure(),
            BoltRequest::AckFailure => PackStreamStructure::new(tag::ACK_FAILURE, vec![]),
            BoltRequest::Run(msg) => msg.to_structure(),
            BoltRequest::DiscardAll => PackStreamStructure::new(tag::DISCARD_ALL, vec![]),
            BoltRequest::PullAll => PackStreamStructure::new(tag::PULL_ALL, vec![]),
        }
    }

    /// Serialize the message body (unchunked).
    pub fn to_bytes(&self, max_depth: usize) -> Result<BytesMut, PackStreamError> {
        let mut encoder = PackStreamEncoder::new().with_max_depth(max_depth);
        encoder.encode_structure(&self.to_structure())?;
        Ok(encoder.into_bytes())
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        match s.signature {
            tag::INIT => Ok(BoltRequest::Init(InitMessage::from_structure(s)?)),
            tag::ACK_FAILURE => Ok(BoltRequest::AckFailure),
            tag::RUN => Ok(BoltRequest::Run(RunMessage::from_structure(s)?)),
            tag::DISCARD_ALL => Ok(BoltRequest::DiscardAll),
            tag::PULL_ALL => Ok(BoltRequest::PullAll),
            _ => Err(PackStreamError::InvalidStructure(format!(
                "Unknown request message tag: 0x{:02X}",
                s.signature
            ))),
        }
    }
}

/// INIT message - carries the client identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct InitMessage {
    /// Client name and version, e.g. `bolt-session/0.1.0`
    pub user_agent: String,
}

impl InitMessage {
    /// Create a new INIT message.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(tag::INIT, vec![PackStreamValue::String(self.user_agent.clone())])
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        let user_agent = s
            .fields
            .first()
            .and_then(|v| v.as_str())
            .ok_or_else(|| PackStreamError::InvalidStructure("INIT user agent must be string".to_string()))?;
        Ok(Self::new(user_agent))
    }
}

/// RUN message - Execute a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMessage {
    /// Statement text
    pub statement: String,
    /// Statement parameters
    pub parameters: PackStreamMap,
}

impl RunMessage {
    /// Create a new RUN message.
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            parameters: PackStreamMap::new(),
        }
    }

    /// Set statement parameters.
    pub fn with_parameters(mut self, params: PackStreamMap) -> Self {
        self.parameters = params;
        self
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(
            tag::RUN,
            vec![
                PackStreamValue::String(self.statement.clone()),
                PackStreamValue::Map(self.parameters.clone()),
            ],
        )
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        if s.fields.len() != 2 {
            return Err(PackStreamError::InvalidStructure(
                "RUN requires statement and parameters".to_string(),
            ));
        }

        let statement = s.fields[0]
            .as_str()
            .ok_or_else(|| PackStreamError::InvalidStructure("RUN statement must be string".to_string()))?;
        let parameters = s.fields[1]
            .as_map()
            .ok_or_else(|| PackStreamError::InvalidStructure("RUN parameters must be map".to_string()))?
            .clone();

        Ok(Self::new(statement).with_parameters(parameters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_bytes() {
        let bytes = BoltRequest::Init(InitMessage::new("a/1")).to_bytes(8).unwrap();
        assert_eq!(&bytes[..], &[0xB1, 0x01, 0x83, b'a', b'/', b'1']);
    }

    #[test]
    fn test_run_bytes() {
        let bytes = BoltRequest::Run(RunMessage::new("RETURN 1")).to_bytes(8).unwrap();
        let mut expected = vec![0xB2, 0x10, 0x88];
        expected.extend_from_slice(b"RETURN 1");
        expected.push(0xA0);
        assert_eq!(&bytes[..], &expected[..]);
    }

    #[test]
    fn test_empty_requests() {
        assert_eq!(&BoltRequest::PullAll.to_bytes(8).unwrap()[..], &[0xB0, 0x3F]);
        assert_eq!(&BoltRequest::DiscardAll.to_bytes(8).unwrap()[..], &[0xB0, 0x2F]);
        assert_eq!(&BoltRequest::AckFailure.to_bytes(8).unwrap()[..], &[0xB0, 0x0F]);
    }

    #[test]
    fn test_parse_run() {
        let mut params = PackStreamMap::new();
        params.insert("x".to_string(), PackStreamValue::Integer(1));
        let run = RunMessage::new("RETURN $x").with_parameters(params);

        let parsed = BoltRequest::from_structure(&run.to_structure()).unwrap();
        assert_eq!(parsed, BoltRequest::Run(run));
    }

    #[test]
    fn test_run_parameter_nesting_limit() {
        let mut params = PackStreamMap::new();
        params.insert(
            "deep".to_string(),
            PackStreamValue::List(vec![PackStreamValue::List(vec![])]),
        );
        let run = BoltRequest::Run(RunMessage::new("RETURN 1").with_parameters(params));
        assert!(matches!(
            run.to_bytes(3),
            Err(PackStreamError::NestingTooDeep(3))
        ));
        assert!(run.to_bytes(4).is_ok());
    }

    #[test]
    fn test_unknown_request_tag() {
        let s = PackStreamStructure::new(0x66, vec![]);
        assert!(BoltRequest::from_structure(&s).is_err());
    }

    #[test]
    fn test_names() {
        assert_eq!(BoltRequest::PullAll.name(), "PULL_ALL");
        assert_eq!(BoltRequest::AckFailure.tag(), 0x0F);
    }
}
