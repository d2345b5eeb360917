//! Bolt protocol response messages.
//!
//! Response messages are sent from the server to the client.

use super::tag;
use crate::bolt::packstream::{PackStreamError, PackStreamMap, PackStreamStructure, PackStreamValue};

/// All Bolt response messages.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltResponse {
    /// SUCCESS - Request completed
    Success(SuccessMessage),
    /// RECORD - One result row
    Record(RecordMessage),
    /// IGNORED - Request skipped because of an earlier failure
    Ignored(IgnoredMessage),
    /// FAILURE - Request failed
    Failure(FailureMessage),
}

impl BoltResponse {
    /// Get the message tag.
    pub fn tag(&self) -> u8 {
        match self {
            BoltResponse::Success(_) => tag::SUCCESS,
            BoltResponse::Record(_) => tag::RECORD,
            BoltResponse::Ignored(_) => tag::IGNORED,
            BoltResponse::Failure(_) => tag::FAILURE,
        }
    }

    /// Get message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltResponse::Success(_) => "SUCCESS",
            BoltResponse::Record(_) => "RECORD",
            BoltResponse::Ignored(_) => "IGNORED",
            BoltResponse::Failure(_) => "FAILURE",
        }
    }

    /// Whether this message completes a request.
    pub fn is_summary(&self) -> bool {
        !matches!(self, BoltResponse::Record(_))
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        match self {
            BoltResponse::Success(msg) => metadata_structure(tag::SUCCESS, &msg.metadata),
            BoltResponse::Record(msg) => PackStreamStructure::new(
                tag::RECORD,
                vec![PackStreamValue::List(msg.fields.clone())],
            ),
            BoltResponse::Ignored(msg) => metadata_structure(tag::IGNORED, &msg.metadata),
            BoltResponse::Failure(msg) => metadata_structure(tag::FAILURE, &msg.metadata),
        }
    }

    /// Parse from PackStream structure.
    ///
    /// Takes ownership so record payloads are moved rather than cloned.
    pub fn from_structure(s: PackStreamStructure) -> Result<Self, PackStreamError> {
        match s.signature {
            tag::SUCCESS => Ok(BoltResponse::Success(SuccessMessage {
                metadata: metadata_field(s, "SUCCESS")?,
            })),
            tag::IGNORED => Ok(BoltResponse::Ignored(IgnoredMessage {
                metadata: metadata_field(s, "IGNORED")?,
            })),
            tag::FAILURE => Ok(BoltResponse::Failure(FailureMessage {
                metadata: metadata_field(s, "FAILURE")?,
            })),
            tag::RECORD => Ok(BoltResponse::Record(RecordMessage::from_structure(s)?)),
            _ => Err(PackStreamError::InvalidStructure(format!(
                "Unknown response message tag: 0x{:02X}",
                s.signature
            ))),
        }
    }
}

fn metadata_structure(signature: u8, metadata: &PackStreamMap) -> PackStreamStructure {
    PackStreamStructure::new(signature, vec![PackStreamValue::Map(metadata.clone())])
}

/// Summary messages carry one metadata map; servers may omit it.
fn metadata_field(s: PackStreamStructure, name: &str) -> Result<PackStreamMap, PackStreamError> {
    match s.fields.into_iter().next() {
        None => Ok(PackStreamMap::new()),
        Some(PackStreamValue::Map(m)) => Ok(m),
        Some(other) => Err(PackStreamError::InvalidStructure(format!(
            "{} metadata must be map, got {}",
            name,
            other.type_name()
        ))),
    }
}

/// SUCCESS message - Request completed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuccessMessage {
    /// Response metadata
    pub metadata: PackStreamMap,
}

impl SuccessMessage {
    /// Create a new SUCCESS message with empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a SUCCESS message with metadata.
    pub fn with_metadata(metadata: PackStreamMap) -> Self {
        Self { metadata }
    }

    /// Add metadata entry.
    pub fn add(&mut self, key: &str, value: impl Into<PackStreamValue>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    /// Get metadata entry.
    pub fn get(&self, key: &str) -> Option<&PackStreamValue> {
        self.metadata.get(key)
    }

    /// Server agent reported in reply to INIT.
    pub fn server(&self) -> Option<&str> {
        self.metadata.get("server").and_then(|v| v.as_str())
    }

    /// Field names reported in reply to RUN.
    pub fn fields(&self) -> Option<Vec<String>> {
        fields_of(&self.metadata)
    }

    /// Create a RUN success response.
    pub fn run_success(fields: &[&str]) -> Self {
        let mut msg = Self::new();
        msg.add(
            "fields",
            PackStreamValue::List(fields.iter().map(|&f| f.into()).collect()),
        );
        msg
    }
}

/// Field names from a RUN summary's metadata.
pub fn fields_of(metadata: &PackStreamMap) -> Option<Vec<String>> {
    metadata.get("fields").and_then(|v| v.as_list()).map(|list| {
        list.iter()
            .filter_map(|item| item.as_str().map(|s| s.to_string()))
            .collect()
    })
}

/// RECORD message - One result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordMessage {
    /// Record values, in field order
    pub fields: Vec<PackStreamValue>,
}

impl RecordMessage {
    /// Create a new RECORD message.
    pub fn new(fields: Vec<PackStreamValue>) -> Self {
        Self { fields }
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: PackStreamStructure) -> Result<Self, PackStreamError> {
        match s.fields.into_iter().next() {
            Some(PackStreamValue::List(fields)) => Ok(Self { fields }),
            _ => Err(PackStreamError::InvalidStructure(
                "RECORD requires a list of values".to_string(),
            )),
        }
    }
}

/// IGNORED message - Request skipped by the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IgnoredMessage {
    /// Response metadata (usually empty)
    pub metadata: PackStreamMap,
}

/// FAILURE message - Request failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailureMessage {
    /// Response metadata (`code`, `message`)
    pub metadata: PackStreamMap,
}

impl FailureMessage {
    /// Create a FAILURE message.
    pub fn new(code: &str, message: &str) -> Self {
        let mut metadata = PackStreamMap::new();
        metadata.insert("code".to_string(), code.into());
        metadata.insert("message".to_string(), message.into());
        Self { metadata }
    }

    /// Get error code.
    pub fn code(&self) -> &str {
        self.metadata
            .get("code")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    /// Get error message.
    pub fn message(&self) -> &str {
        self.metadata
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let msg = SuccessMessage::run_success(&["n", "m"]);
        let parsed = BoltResponse::from_structure(BoltResponse::Success(msg).to_structure()).unwrap();
        match parsed {
            BoltResponse::Success(s) => {
                assert_eq!(s.fields(), Some(vec!["n".to_string(), "m".to_string()]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_success_without_metadata() {
        let parsed =
            BoltResponse::from_structure(PackStreamStructure::new(tag::SUCCESS, vec![])).unwrap();
        assert_eq!(parsed, BoltResponse::Success(SuccessMessage::new()));
    }

    #[test]
    fn test_parse_failure() {
        let msg = FailureMessage::new("Neo.ClientError.Statement.SyntaxError", "bad");
        let parsed = BoltResponse::from_structure(BoltResponse::Failure(msg).to_structure()).unwrap();
        match parsed {
            BoltResponse::Failure(f) => {
                assert_eq!(f.code(), "Neo.ClientError.Statement.SyntaxError");
                assert_eq!(f.message(), "bad");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_record() {
        let s = PackStreamStructure::new(
            tag::RECORD,
            vec![PackStreamValue::List(vec![1.into(), "a".into()])],
        );
        let parsed = BoltResponse::from_structure(s).unwrap();
        assert!(!parsed.is_summary());
        assert_eq!(
            parsed,
            BoltResponse::Record(RecordMessage::new(vec![1.into(), "a".into()]))
        );
    }

    #[test]
    fn test_record_requires_list() {
        let s = PackStreamStructure::new(tag::RECORD, vec![PackStreamValue::Integer(1)]);
        assert!(BoltResponse::from_structure(s).is_err());
    }

    #[test]
    fn test_bad_metadata() {
        let s = PackStreamStructure::new(tag::FAILURE, vec![PackStreamValue::Null]);
        let err = BoltResponse::from_structure(s).unwrap_err();
        assert!(err.to_string().contains("FAILURE metadata"));
    }

    #[test]
    fn test_unknown_response_tag() {
        let s = PackStreamStructure::new(tag::RUN, vec![]);
        assert!(BoltResponse::from_structure(s).is_err());
    }
}
