//! Server configuration
//!
//! All values are compiled in; there is no configuration file and no
//! environment lookup. Tests build their own `ServerConfig` with an
//! ephemeral address and shorter deadlines.

use std::time::Duration;

/// Fixed server listen address
pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Address the client dials when none is given
pub const DEFAULT_CLIENT_ADDR: &str = "127.0.0.1:8080";

/// Runtime parameters for the listener, router and connection handlers
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind
    pub addr: String,
    /// Idle deadline for each line read from a client
    pub read_timeout: Duration,
    /// Deadline for writing one message to a client
    pub write_timeout: Duration,
    /// How long the router waits on one full outbound queue
    pub fanout_timeout: Duration,
    /// Capacity of each session's outbound queue
    pub outbound_capacity: usize,
    /// Capacity of the router's event channel
    pub event_buffer: usize,
    /// Maximum accepted line length in bytes
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            read_timeout: Duration::from_secs(5 * 60),
            write_timeout: Duration::from_secs(10),
            fanout_timeout: Duration::from_secs(1),
            outbound_capacity: 10,
            event_buffer: 256,
            max_line_length: 4096,
        }
    }
}

impl ServerConfig {
    /// Same defaults, bound to a different address
    pub fn with_addr(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }
}
