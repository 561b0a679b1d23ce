//! Network identities and the rotation pool
//!
//! Every identity carries the pool index it was issued under. The index only
//! ever grows within a pass and never passes the pool ceiling.

use crate::config::{ProxyConfig, ProxyServerEntry};
use std::fmt;

/// A distinct network origin used to reach the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyIdentity {
    /// Position of this identity in its pool
    pub index: u32,

    /// Proxy server URL; `None` connects directly
    pub server: Option<String>,

    /// Proxy username
    pub username: Option<String>,

    /// Proxy password
    pub password: Option<String>,
}

impl ProxyIdentity {
    /// Identity that connects without a proxy
    pub fn direct() -> Self {
        Self {
            index: 0,
            server: None,
            username: None,
            password: None,
        }
    }
}

impl fmt::Display for ProxyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.server {
            Some(server) => write!(f, "#{} via {}", self.index, server),
            None => write!(f, "#{} direct", self.index),
        }
    }
}

/// Where the identities of a pool come from
#[derive(Debug, Clone)]
enum PoolSource {
    /// One identity that can never rotate
    Fixed(ProxyIdentity),

    /// A gateway that exposes one exit identity per port
    Ports {
        host: String,
        first_port: u16,
        username: Option<String>,
        password: Option<String>,
    },

    /// An explicit list of servers
    List(Vec<ProxyServerEntry>),
}

/// Bounded pool of network identities
#[derive(Debug, Clone)]
pub struct ProxyPool {
    source: PoolSource,
    ceiling: u32,
    current: ProxyIdentity,
}

impl ProxyPool {
    /// Builds the pool described by the configuration
    pub fn from_config(config: &ProxyConfig) -> Self {
        match config {
            ProxyConfig::Direct => Self::fixed(ProxyIdentity::direct()),
            ProxyConfig::Fixed {
                server,
                username,
                password,
            } => Self::fixed(ProxyIdentity {
                index: 0,
                server: Some(server.clone()),
                username: username.clone(),
                password: password.clone(),
            }),
            ProxyConfig::Ports {
                host,
                first_port,
                pool_size,
                username,
                password,
            } => Self::ports(
                host,
                *first_port,
                *pool_size,
                username.clone(),
                password.clone(),
            ),
            ProxyConfig::List { servers } => Self::list(servers.clone()),
        }
    }

    /// A pool holding exactly one identity
    pub fn fixed(identity: ProxyIdentity) -> Self {
        let current = ProxyIdentity { index: 0, ..identity };
        Self {
            source: PoolSource::Fixed(current.clone()),
            ceiling: 1,
            current,
        }
    }

    /// A gateway pool where identity `i` uses port `first_port + i`
    pub fn ports(
        host: &str,
        first_port: u16,
        pool_size: u32,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        let source = PoolSource::Ports {
            host: host.to_string(),
            first_port,
            username,
            password,
        };
        let current = Self::identity_at(&source, 0);
        Self {
            source,
            ceiling: pool_size.max(1),
            current,
        }
    }

    /// A pool over an explicit server list
    ///
    /// An empty list degrades to a single direct identity.
    pub fn list(servers: Vec<ProxyServerEntry>) -> Self {
        if servers.is_empty() {
            return Self::fixed(ProxyIdentity::direct());
        }
        let ceiling = servers.len() as u32;
        let source = PoolSource::List(servers);
        let current = Self::identity_at(&source, 0);
        Self {
            source,
            ceiling,
            current,
        }
    }

    /// The identity sessions must currently be bound to
    pub fn current(&self) -> &ProxyIdentity {
        &self.current
    }

    /// Hard limit on the number of identities
    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// Number of identities not yet used in this pass
    pub fn remaining(&self) -> u32 {
        self.ceiling - self.current.index - 1
    }

    /// Moves to the next identity
    ///
    /// Returns false and leaves the pool untouched when it is exhausted.
    pub fn advance(&mut self) -> bool {
        let next = self.current.index + 1;
        if next >= self.ceiling {
            return false;
        }
        self.current = Self::identity_at(&self.source, next);
        true
    }

    /// Starts over from the first identity
    pub fn reset(&mut self) {
        self.current = Self::identity_at(&self.source, 0);
    }

    fn identity_at(source: &PoolSource, index: u32) -> ProxyIdentity {
        match source {
            PoolSource::Fixed(identity) => identity.clone(),
            PoolSource::Ports {
                host,
                first_port,
                username,
                password,
            } => ProxyIdentity {
                index,
                server: Some(format!("http://{}:{}", host, u32::from(*first_port) + index)),
                username: username.clone(),
                password: password.clone(),
            },
            PoolSource::List(servers) => {
                let entry = &servers[index as usize];
                ProxyIdentity {
                    index,
                    server: Some(entry.server.clone()),
                    username: entry.username.clone(),
                    password: entry.password.clone(),
                }
            }
        }
    }
}
