//! Configuration types for the rebalancing core.

use crate::error::{Error, Result};
use std::time::Duration;

/// Settings for an admin client used to talk to remote nodes.
///
/// There are no defaults: every value has to be supplied by whoever builds
/// the client, usually derived from [`AdminTimeouts`] plus the degree of
/// parallelism the caller wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminClientConfig {
    /// Maximum open connections to a single node.
    pub max_connections_per_node: usize,

    /// Maximum worker threads used by the client.
    pub max_threads: usize,

    /// Timeout for establishing a connection.
    pub connection_timeout: Duration,

    /// Timeout for a single socket read or write.
    pub socket_timeout: Duration,

    /// Socket buffer size in bytes.
    pub socket_buffer_size: usize,
}

impl AdminClientConfig {
    /// Create a new admin client configuration.
    pub fn new(
        max_connections_per_node: usize,
        max_threads: usize,
        connection_timeout: Duration,
        socket_timeout: Duration,
        socket_buffer_size: usize,
    ) -> Self {
        Self {
            max_connections_per_node,
            max_threads,
            connection_timeout,
            socket_timeout,
            socket_buffer_size,
        }
    }

    /// Build a client configuration from server-side admin settings.
    pub fn from_timeouts(
        timeouts: &AdminTimeouts,
        max_threads: usize,
        max_connections_per_node: usize,
    ) -> Self {
        Self::new(
            max_connections_per_node,
            max_threads,
            timeouts.connection_timeout,
            timeouts.socket_timeout,
            timeouts.socket_buffer_size,
        )
    }

    /// Set maximum connections per node.
    pub fn with_max_connections_per_node(mut self, max: usize) -> Self {
        self.max_connections_per_node = max;
        self
    }

    /// Set maximum worker threads.
    pub fn with_max_threads(mut self, max: usize) -> Self {
        self.max_threads = max;
        self
    }

    /// Set the connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the socket timeout.
    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = timeout;
        self
    }

    /// Set the socket buffer size.
    pub fn with_socket_buffer_size(mut self, size: usize) -> Self {
        self.socket_buffer_size = size;
        self
    }

    /// Reject values a client cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.max_connections_per_node == 0 {
            return Err(Error::Config(
                "max_connections_per_node must be at least 1".into(),
            ));
        }
        if self.max_threads == 0 {
            return Err(Error::Config("max_threads must be at least 1".into()));
        }
        if self.connection_timeout.is_zero() {
            return Err(Error::Config("connection_timeout must be non-zero".into()));
        }
        if self.socket_timeout.is_zero() {
            return Err(Error::Config("socket_timeout must be non-zero".into()));
        }
        if self.socket_buffer_size == 0 {
            return Err(Error::Config("socket_buffer_size must be non-zero".into()));
        }
        Ok(())
    }
}

/// Admin connection settings a server is configured with.
///
/// Temporary admin clients created for rebalancing inherit these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminTimeouts {
    /// Timeout for establishing an admin connection.
    pub connection_timeout: Duration,

    /// Timeout for admin socket reads and writes.
    pub socket_timeout: Duration,

    /// Admin socket buffer size in bytes.
    pub socket_buffer_size: usize,
}

impl AdminTimeouts {
    pub fn new(
        connection_timeout: Duration,
        socket_timeout: Duration,
        socket_buffer_size: usize,
    ) -> Self {
        Self {
            connection_timeout,
            socket_timeout,
            socket_buffer_size,
        }
    }
}

/// Configuration for the background operation runner.
#[derive(Debug, Clone)]
pub struct OperationRunnerConfig {
    /// Maximum operations executing at the same time.
    pub max_concurrent_operations: usize,

    /// Completed operations kept for status queries.
    pub max_history: usize,
}

impl Default for OperationRunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_operations: 4,
            max_history: 100,
        }
    }
}

impl OperationRunnerConfig {
    /// Set the number of concurrently executing operations.
    pub fn with_max_concurrent_operations(mut self, max: usize) -> Self {
        self.max_concurrent_operations = max;
        self
    }

    /// Set how many completed operations are retained.
    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_operations == 0 {
            return Err(Error::Config(
                "max_concurrent_operations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
