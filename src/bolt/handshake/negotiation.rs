//! Client side of the version negotiation.

use super::{BoltVersion, HandshakeError, BOLT_MAGIC, HANDSHAKE_RESPONSE_SIZE, HANDSHAKE_SIZE};

/// Client handshake.
///
/// Holds up to four version proposals. Builds the preamble sent on a fresh
/// transport and validates the server's 4-byte answer against it.
#[derive(Debug, Clone)]
pub struct Handshake {
    /// Proposed versions, preferred first, zero padded
    proposals: [u32; 4],
}

impl Handshake {
    /// Create a handshake proposing every supported version.
    pub fn new() -> Self {
        Self::with_versions(&BoltVersion::ALL)
    }

    /// Create a handshake proposing specific versions (at most four are used).
    pub fn with_versions(versions: &[BoltVersion]) -> Self {
        let mut proposals = [0u32; 4];
        for (slot, version) in proposals.iter_mut().zip(versions) {
            *slot = version.as_u32();
        }
        Self { proposals }
    }

    /// Raw proposal slots.
    pub fn proposals(&self) -> [u32; 4] {
        self.proposals
    }

    /// Build the 20-byte client preamble: magic followed by the proposals.
    pub fn preamble(&self) -> [u8; HANDSHAKE_SIZE] {
        let mut data = [0u8; HANDSHAKE_SIZE];
        data[0..4].copy_from_slice(&BOLT_MAGIC);
        for (i, version) in self.proposals.iter().enumerate() {
            let offset = 4 + i * 4;
            data[offset..offset + 4].copy_from_slice(&version.to_be_bytes());
        }
        data
    }

    /// Validate the server's reply.
    ///
    /// Zero means the server accepted none of the proposals. Any other value
    /// must be one this client both proposed and understands.
    pub fn accept(&self, reply: [u8; HANDSHAKE_RESPONSE_SIZE]) -> Result<BoltVersion, HandshakeError> {
        let chosen = u32::from_be_bytes(reply);
        if chosen == 0 {
            return Err(HandshakeError::NoCompatibleVersion);
        }
        if !self.proposals.contains(&chosen) {
            return Err(HandshakeError::UnsupportedVersion(chosen));
        }
        BoltVersion::from_u32(chosen).ok_or(HandshakeError::UnsupportedVersion(chosen))
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_layout() {
        let data = Handshake::new().preamble();
        assert_eq!(
            data,
            [
                0x60, 0x60, 0xB0, 0x17, // magic
                0x00, 0x00, 0x00, 0x01, // version 1
                0x00, 0x00, 0x00, 0x00, //
                0x00, 0x00, 0x00, 0x00, //
                0x00, 0x00, 0x00, 0x00,
            ]
        );
    }

    #[test]
    fn test_accept_v1() {
        let hs = Handshake::new();
        assert_eq!(hs.accept([0, 0, 0, 1]).unwrap(), BoltVersion::V1);
    }

    #[test]
    fn test_no_compatible_version() {
        let err = Handshake::new().accept([0, 0, 0, 0]).unwrap_err();
        assert_eq!(err, HandshakeError::NoCompatibleVersion);
    }

    #[test]
    fn test_unproposed_version_rejected() {
        let err = Handshake::new().accept([0x00, 0x05, 0x00, 0x00]).unwrap_err();
        assert_eq!(err, HandshakeError::UnsupportedVersion(0x0005_0000));

        // Known version the client did not offer.
        let err = Handshake::with_versions(&[]).accept([0, 0, 0, 1]).unwrap_err();
        assert_eq!(err, HandshakeError::UnsupportedVersion(1));
    }

    #[test]
    fn test_proposals_padded() {
        assert_eq!(Handshake::new().proposals(), [1, 0, 0, 0]);
    }
}
