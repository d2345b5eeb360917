//! Session configuration.

use std::time::Duration;

use crate::bolt::codec::DEFAULT_MAX_MESSAGE_SIZE;
use crate::bolt::packstream::DEFAULT_MAX_DEPTH;

/// Session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Client identifier sent with INIT
    pub user_agent: String,
    /// Limit on handshake plus INIT
    pub handshake_timeout: Duration,
    /// Largest reassembled message accepted from the server
    pub max_message_size: usize,
    /// Container nesting limit for encoding and decoding
    pub max_nesting_depth: usize,
    /// Initial read buffer size of the async connection
    pub read_buffer_capacity: usize,
}

impl SessionConfig {
    /// Start a builder from the defaults.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder {
            config: Self::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("bolt-session/{}", env!("CARGO_PKG_VERSION")),
            handshake_timeout: Duration::from_secs(30),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_nesting_depth: DEFAULT_MAX_DEPTH,
            read_buffer_capacity: 8 * 1024,
        }
    }
}

/// Builder for [`SessionConfig`].
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Set the INIT user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Set the maximum inbound message size.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Set the nesting limit.
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.config.max_nesting_depth = depth;
        self
    }

    /// Set the read buffer capacity.
    pub fn with_read_buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.read_buffer_capacity = capacity;
        self
    }

    /// Finish building.
    pub fn build(self) -> SessionConfig {
        self.config
    }
}
