//! Connection options
//!
//! Centralized configuration with sensible defaults, plus parsing of the
//! `host:port[/default_space]` address syntax.

use std::time::Duration;

use crate::error::{Result, TntError};

/// Options for a single connection
#[derive(Debug, Clone)]
pub struct Options {
    // -------------------------------------------------------------------------
    // Timeouts
    // -------------------------------------------------------------------------
    /// Dial timeout for every connect attempt
    pub connect_timeout: Duration,

    /// Deadline for one request (send + response), unless overridden per call
    pub query_timeout: Duration,

    // -------------------------------------------------------------------------
    // Spaces
    // -------------------------------------------------------------------------
    /// Space used by requests without an explicit one.
    /// Takes precedence over the `/space` suffix of the address.
    pub default_space: Option<u32>,

    /// Space holding memcached-style tuples
    pub memcache_space: u32,

    // -------------------------------------------------------------------------
    // Engine
    // -------------------------------------------------------------------------
    /// Capacity of the outbound request queue
    pub queue_capacity: usize,

    /// How many times to redial after the socket is lost (0 disables reconnect)
    pub reconnect_attempts: u32,

    /// Pause between redial attempts
    pub reconnect_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            query_timeout: Duration::from_secs(1),
            default_space: None,
            memcache_space: 23,
            queue_capacity: 1024,
            reconnect_attempts: 0,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

impl Options {
    /// Create a new options builder
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }
}

/// Builder for Options
#[derive(Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Set the dial timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Set the default per-request timeout
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.options.query_timeout = timeout;
        self
    }

    /// Set the default space, overriding the address suffix
    pub fn default_space(mut self, space: u32) -> Self {
        self.options.default_space = Some(space);
        self
    }

    /// Set the memcache space
    pub fn memcache_space(mut self, space: u32) -> Self {
        self.options.memcache_space = space;
        self
    }

    /// Set the outbound queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.options.queue_capacity = capacity.max(1);
        self
    }

    /// Set the number of reconnect attempts
    pub fn reconnect_attempts(mut self, attempts: u32) -> Self {
        self.options.reconnect_attempts = attempts;
        self
    }

    /// Set the pause between reconnect attempts
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.options.reconnect_delay = delay;
        self
    }

    pub fn build(self) -> Options {
        self.options
    }
}

/// Parsed `host:port[/default_space]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// `host:port` part, suitable for `ToSocketAddrs`
    pub host_port: String,

    /// Space given after the slash, if any
    pub default_space: Option<u32>,
}

impl Address {
    /// Parse an address such as `127.0.0.1:2001/24`
    pub fn parse(addr: &str) -> Result<Self> {
        let (host_port, space) = match addr.split_once('/') {
            Some((host_port, space)) => (host_port, Some(space)),
            None => (addr, None),
        };

        if host_port.is_empty() {
            return Err(TntError::Config(format!("empty host in address {:?}", addr)));
        }

        let default_space = match space {
            Some(space) => Some(space.parse::<u32>().map_err(|_| {
                TntError::Config(format!("invalid default space {:?} in address {:?}", space, addr))
            })?),
            None => None,
        };

        Ok(Self {
            host_port: host_port.to_string(),
            default_space,
        })
    }
}
