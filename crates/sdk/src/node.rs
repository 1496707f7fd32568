//! Network nodes: address parsing, health/backoff state, and channel
//! management.
//!
//! A [`Node`] owns one endpoint's connection and its health bookkeeping.
//! Health is a readmit instant: a node that just failed is quarantined for
//! its current backoff, which doubles per failure (capped) and halves per
//! success (floored). All timing uses `tokio::time::Instant` so tests can
//! drive the clock with `tokio::time::pause`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::time::Instant;
use tonic::transport::{Channel, Endpoint};

use crate::entity_id::AccountId;
use crate::error::{Error, Result};

/// Default port for plaintext consensus-node connections.
pub const PLAINTEXT_PORT: u16 = 50211;

/// Default port for TLS consensus-node connections.
pub const TLS_PORT: u16 = 50212;

/// Default port for TLS mirror-node connections.
pub const MIRROR_TLS_PORT: u16 = 443;

/// Timeout for establishing a connection to a node.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP/2 keep-alive interval for idle connections.
const HTTP2_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// HTTP/2 keep-alive timeout.
const HTTP2_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP keepalive interval.
const TCP_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(60);

/// A node's listen address.
///
/// Accepted forms are `ip:port`, `domain:port`, `name:port`, and
/// `in-process:<name>` for test harnesses; a bare host defaults to the
/// plaintext port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeAddress {
    /// A network socket address.
    Socket {
        /// IP address, domain, or bare host name.
        host: String,
        /// Port; [`TLS_PORT`] and [`MIRROR_TLS_PORT`] imply TLS.
        port: u16,
    },
    /// An in-process server, used by test harnesses.
    InProcess {
        /// Name of the in-process server.
        name: String,
    },
}

impl NodeAddress {
    /// Whether connections to this address use TLS.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Socket { port, .. } if *port == TLS_PORT || *port == MIRROR_TLS_PORT)
    }

    /// The URI this address dials.
    #[must_use]
    pub fn to_uri(&self) -> String {
        match self {
            Self::Socket { host, port } => {
                let scheme = if self.is_tls() { "https" } else { "http" };
                format!("{scheme}://{host}:{port}")
            }
            Self::InProcess { name } => format!("http://{name}"),
        }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Socket { host, port } => write!(f, "{host}:{port}"),
            Self::InProcess { name } => write!(f, "in-process:{name}"),
        }
    }
}

impl FromStr for NodeAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(name) = s.strip_prefix("in-process:") {
            if name.is_empty() {
                return Err(Error::basic_parse("in-process address requires a name"));
            }
            return Ok(Self::InProcess { name: name.to_owned() });
        }
        match s.rsplit_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(Error::basic_parse(format!("empty host in address {s:?}")));
                }
                let port = port
                    .parse::<u16>()
                    .map_err(|_| Error::basic_parse(format!("invalid port in address {s:?}")))?;
                Ok(Self::Socket { host: host.to_owned(), port })
            }
            None => {
                if s.is_empty() {
                    return Err(Error::basic_parse("empty node address"));
                }
                Ok(Self::Socket { host: s.to_owned(), port: PLAINTEXT_PORT })
            }
        }
    }
}

/// Backoff bookkeeping guarded by the node's health mutex.
#[derive(Debug)]
struct NodeHealth {
    /// Quarantine applied on the next failure.
    backoff: Duration,
    /// Instant at which the node becomes usable again.
    readmit_time: Instant,
    /// Failures observed since construction.
    failure_count: u64,
    /// Whether a channel to this node has ever been established.
    has_connected: bool,
}

/// One network endpoint's health/backoff state plus its connection handle.
///
/// Channels are established lazily and shared: tonic's [`Channel`] is cheap
/// to clone, so concurrent requests reuse one HTTP/2 connection without
/// request-side locking. Health mutation is internally synchronized so
/// multiple in-flight requests may report outcomes concurrently.
#[derive(Debug)]
pub struct Node {
    /// Account id this endpoint answers for.
    account_id: AccountId,
    /// Where the node listens.
    address: NodeAddress,
    /// Floor for the backoff duration.
    min_backoff: Duration,
    /// Cap for the backoff duration.
    max_backoff: Duration,
    /// Health/backoff state.
    health: Mutex<NodeHealth>,
    /// Cached channel, lazily initialized.
    channel: Arc<RwLock<Option<Channel>>>,
}

impl Node {
    /// Creates a healthy node with its backoff at the floor.
    pub(crate) fn new(
        account_id: AccountId,
        address: NodeAddress,
        min_backoff: Duration,
        max_backoff: Duration,
    ) -> Self {
        Self {
            account_id,
            address,
            min_backoff,
            max_backoff,
            health: Mutex::new(NodeHealth {
                backoff: min_backoff,
                readmit_time: Instant::now(),
                failure_count: 0,
                has_connected: false,
            }),
            channel: Arc::new(RwLock::new(None)),
        }
    }

    /// The account id this endpoint answers for.
    #[must_use]
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// The address this node dials.
    #[must_use]
    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    /// Whether the node is currently usable: its readmit instant has passed.
    #[must_use]
    pub fn healthy(&self) -> bool {
        self.health.lock().readmit_time <= Instant::now()
    }

    /// Time left until the node is usable again; zero when healthy.
    ///
    /// Recomputed from the clock on every call, never cached: callers that
    /// rank unhealthy nodes depend on this tracking the moving minimum.
    #[must_use]
    pub fn remaining_backoff(&self) -> Duration {
        self.health
            .lock()
            .readmit_time
            .saturating_duration_since(Instant::now())
    }

    /// Records a failed attempt: quarantines the node for its current
    /// backoff and doubles the backoff, capped.
    pub fn mark_failed(&self) {
        let mut health = self.health.lock();
        health.failure_count += 1;
        health.readmit_time = Instant::now() + health.backoff;
        health.backoff = (health.backoff * 2).min(self.max_backoff);
        tracing::debug!(
            node = %self.account_id,
            next_backoff_ms = health.backoff.as_millis() as u64,
            "node marked failed"
        );
    }

    /// Records a successful attempt: halves the backoff, floored.
    pub fn mark_succeeded(&self) {
        let mut health = self.health.lock();
        health.backoff = (health.backoff / 2).max(self.min_backoff);
    }

    /// Failures observed since construction.
    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.health.lock().failure_count
    }

    /// Returns a connected channel, establishing the connection if needed.
    pub(crate) async fn channel(&self) -> Result<Channel> {
        // Fast path: channel already exists.
        {
            let guard = self.channel.read();
            if let Some(channel) = guard.as_ref() {
                return Ok(channel.clone());
            }
        }

        let endpoint = Endpoint::try_from(self.address.to_uri()).map_err(|e| Error::Connection {
            message: format!("invalid endpoint {}: {e}", self.address),
            location: snafu::Location::default(),
        })?;
        let endpoint = configure_endpoint(endpoint);
        let new_channel = endpoint.connect().await?;

        {
            let mut guard = self.channel.write();
            // Double-check: another task might have connected while we waited.
            if let Some(channel) = guard.as_ref() {
                return Ok(channel.clone());
            }
            *guard = Some(new_channel.clone());
        }
        self.health.lock().has_connected = true;

        Ok(new_channel)
    }

    /// Probes transport-level connectivity, distinct from the backoff timer.
    ///
    /// Returns the channel when the node is reachable. A `None` means the
    /// connection attempt failed and the caller should treat this exactly
    /// like a failed attempt, without having spent a wire round-trip.
    /// Once a node has connected, later calls reuse the cached channel.
    pub(crate) async fn try_connect(&self) -> Option<Channel> {
        if self.health.lock().has_connected {
            if let Some(channel) = self.channel.read().as_ref() {
                return Some(channel.clone());
            }
        }
        match self.channel().await {
            Ok(channel) => Some(channel),
            Err(e) => {
                tracing::warn!(node = %self.account_id, error = %e, "failed to connect");
                None
            }
        }
    }

    /// Clears the cached channel, forcing reconnection on next use.
    pub(crate) fn reset_channel(&self) {
        let mut guard = self.channel.write();
        *guard = None;
        self.health.lock().has_connected = false;
    }

    /// Quarantines the node for exactly `remaining`, without touching the
    /// backoff that the next failure would apply.
    #[cfg(test)]
    pub(crate) fn force_unhealthy_for(&self, remaining: Duration) {
        self.health.lock().readmit_time = Instant::now() + remaining;
    }
}

/// Applies the shared connection settings to an endpoint.
fn configure_endpoint(endpoint: Endpoint) -> Endpoint {
    endpoint
        .connect_timeout(CONNECT_TIMEOUT)
        .tcp_nodelay(true)
        .tcp_keepalive(Some(TCP_KEEPALIVE_INTERVAL))
        .http2_keep_alive_interval(HTTP2_KEEPALIVE_INTERVAL)
        .keep_alive_timeout(HTTP2_KEEPALIVE_TIMEOUT)
        .keep_alive_while_idle(true)
}
