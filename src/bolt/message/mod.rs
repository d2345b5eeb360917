//! Bolt protocol message types.
//!
//! Every message is a single top-level structure whose signature byte
//! identifies it. Requests flow client to server, responses the other way.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

/// Bolt message tags.
pub mod tag {
    /// INIT message tag (0x01)
    pub const INIT: u8 = 0x01;
    /// ACK_FAILURE message tag (0x0F)
    pub const ACK_FAILURE: u8 = 0x0F;
    /// RUN message tag (0x10)
    pub const RUN: u8 = 0x10;
    /// DISCARD_ALL message tag (0x2F)
    pub const DISCARD_ALL: u8 = 0x2F;
    /// PULL_ALL message tag (0x3F)
    pub const PULL_ALL: u8 = 0x3F;

    /// SUCCESS response tag (0x70)
    pub const SUCCESS: u8 = 0x70;
    /// RECORD response tag (0x71)
    pub const RECORD: u8 = 0x71;
    /// IGNORED response tag (0x7E)
    pub const IGNORED: u8 = 0x7E;
    /// FAILURE response tag (0x7F)
    pub const FAILURE: u8 = 0x7F;

    /// Whether `signature` is a server response.
    pub fn is_response(signature: u8) -> bool {
        matches!(signature, SUCCESS | RECORD | IGNORED | FAILURE)
    }
}

#[cfg(test)]
mod tests {
    use super::tag::*;

    #[test]
    fn test_request_tags() {
        assert_eq!(INIT, 0x01);
        assert_eq!(ACK_FAILURE, 0x0F);
        assert_eq!(RUN, 0x10);
        assert_eq!(DISCARD_ALL, 0x2F);
        assert_eq!(PULL_ALL, 0x3F);
    }

    #[test]
    fn test_response_tags() {
        for sig in [SUCCESS, RECORD, IGNORED, FAILURE] {
            assert!(is_response(sig));
        }
        assert!(!is_response(RUN));
        assert!(!is_response(0x4E));
    }
}
