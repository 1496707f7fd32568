//! The engine's view of the network: the account-id → node registry and
//! the mirror-node endpoint list.
//!
//! Node selection lives here too. The happy path is a scan for the first
//! healthy candidate starting at the request's cursor; when every candidate
//! is quarantined the scan falls back to the node whose backoff expires
//! soonest, recomputed fresh on every call so the choice tracks the moving
//! minimum as timers run down.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tonic::transport::Channel;

use crate::entity_id::AccountId;
use crate::error::{Error, Result};
use crate::node::{Node, NodeAddress};

/// Floor for a node's failure backoff.
pub(crate) const DEFAULT_MIN_NODE_BACKOFF: Duration = Duration::from_millis(250);

/// Cap for a node's failure backoff.
pub(crate) const DEFAULT_MAX_NODE_BACKOFF: Duration = Duration::from_secs(8);

/// Registry of consensus nodes keyed by account id.
///
/// `node_account_ids` preserves stable address-book order; every id in it
/// has a registered node. Nodes are shared (`Arc`) with in-flight requests,
/// so health updates from concurrent executions land on the same state.
#[derive(Debug)]
pub struct Network {
    /// All known nodes.
    nodes: RwLock<HashMap<AccountId, Arc<Node>>>,
    /// Account ids in stable address-book order.
    node_account_ids: RwLock<Vec<AccountId>>,
    /// Floor for per-node backoff.
    min_node_backoff: Duration,
    /// Cap for per-node backoff.
    max_node_backoff: Duration,
    /// Address-book refreshes requested so far; the refresh itself is
    /// fire-and-forget and never blocks a retry.
    refresh_requests: AtomicU64,
}

impl Network {
    /// Builds a network from an address-book map. Order of `entries` is the
    /// stable submission-priority order.
    pub fn from_addresses(entries: Vec<(AccountId, NodeAddress)>) -> Self {
        let network = Self {
            nodes: RwLock::new(HashMap::new()),
            node_account_ids: RwLock::new(Vec::new()),
            min_node_backoff: DEFAULT_MIN_NODE_BACKOFF,
            max_node_backoff: DEFAULT_MAX_NODE_BACKOFF,
            refresh_requests: AtomicU64::new(0),
        };
        for (account_id, address) in entries {
            network.add_node(account_id, address);
        }
        network
    }

    /// Registers a node, replacing any previous entry for the account id.
    pub fn add_node(&self, account_id: AccountId, address: NodeAddress) {
        let node = Arc::new(Node::new(
            account_id,
            address,
            self.min_node_backoff,
            self.max_node_backoff,
        ));
        let mut nodes = self.nodes.write();
        if nodes.insert(account_id, node).is_none() {
            self.node_account_ids.write().push(account_id);
        }
    }

    /// The node registered for an account id.
    #[must_use]
    pub fn node(&self, account_id: AccountId) -> Option<Arc<Node>> {
        self.nodes.read().get(&account_id).cloned()
    }

    /// All account ids, in stable address-book order.
    #[must_use]
    pub fn node_account_ids(&self) -> Vec<AccountId> {
        self.node_account_ids.read().clone()
    }

    /// The candidate subset a new request should target: roughly a third of
    /// the address book, preferring nodes whose backoff expires soonest.
    #[must_use]
    pub fn node_account_ids_for_execute(&self) -> Vec<AccountId> {
        let ids = self.node_account_ids.read();
        let nodes = self.nodes.read();
        let take = ids.len().div_ceil(3).max(1).min(ids.len());
        let mut ranked: Vec<(Duration, usize, AccountId)> = ids
            .iter()
            .enumerate()
            .filter_map(|(i, id)| nodes.get(id).map(|n| (n.remaining_backoff(), i, *id)))
            .collect();
        ranked.sort();
        ranked.into_iter().take(take).map(|(_, _, id)| id).collect()
    }

    /// Resolves candidate account ids to their nodes, erroring on ids the
    /// network does not know.
    pub(crate) fn nodes_for(&self, candidates: &[AccountId]) -> Result<Vec<Arc<Node>>> {
        let nodes = self.nodes.read();
        candidates
            .iter()
            .map(|id| {
                nodes.get(id).cloned().ok_or_else(|| Error::Config {
                    message: format!("node account id {id} is not in the configured network"),
                })
            })
            .collect()
    }

    /// Penalizes a node, quarantining it per its current backoff.
    pub fn increase_backoff(&self, account_id: AccountId) {
        if let Some(node) = self.node(account_id) {
            node.mark_failed();
        }
    }

    /// Rewards a node after a usable response.
    pub fn decrease_backoff(&self, account_id: AccountId) {
        if let Some(node) = self.node(account_id) {
            node.mark_succeeded();
        }
    }

    /// Requests an address-book refresh. Fire-and-forget: the engine keeps
    /// retrying without waiting for the refresh to land.
    pub(crate) fn request_address_book_refresh(&self) {
        self.refresh_requests.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("address book refresh requested");
    }

    /// Address-book refreshes requested so far.
    #[must_use]
    pub fn refresh_request_count(&self) -> u64 {
        self.refresh_requests.load(Ordering::Relaxed)
    }
}

/// Picks the index of the candidate a request should target next.
///
/// Scans candidates starting at `cursor` (wrapping) and returns the first
/// healthy one. If none are healthy, returns the candidate with the
/// minimum `remaining_backoff()`, evaluated fresh for every candidate on
/// every call; ties break toward scan order. Selection never advances the
/// cursor by itself.
pub(crate) fn select_node(candidates: &[Arc<Node>], cursor: usize) -> usize {
    debug_assert!(!candidates.is_empty());
    let len = candidates.len();

    let mut best = cursor % len;
    let mut best_remaining = Duration::MAX;
    for i in 0..len {
        let index = (cursor + i) % len;
        let remaining = candidates[index].remaining_backoff();
        if remaining.is_zero() {
            return index;
        }
        if remaining < best_remaining {
            best = index;
            best_remaining = remaining;
        }
    }
    best
}

/// The mirror-node endpoints a client streams from.
///
/// A single shared channel to the current mirror address, lazily
/// established; streaming retries reuse it.
#[derive(Debug)]
pub struct MirrorNetwork {
    /// Mirror addresses, first entry preferred.
    addresses: RwLock<Vec<NodeAddress>>,
    /// Cached channel, lazily initialized.
    channel: RwLock<Option<Channel>>,
}

impl MirrorNetwork {
    /// Builds a mirror network from an address list.
    #[must_use]
    pub fn from_addresses(addresses: Vec<NodeAddress>) -> Self {
        Self {
            addresses: RwLock::new(addresses),
            channel: RwLock::new(None),
        }
    }

    /// The configured mirror addresses.
    #[must_use]
    pub fn addresses(&self) -> Vec<NodeAddress> {
        self.addresses.read().clone()
    }

    /// Replaces the address list and drops any cached channel so the next
    /// call connects against the new endpoints.
    pub fn set_addresses(&self, addresses: Vec<NodeAddress>) {
        *self.addresses.write() = addresses;
        *self.channel.write() = None;
    }

    /// Returns a connected channel to the preferred mirror endpoint,
    /// establishing it if needed.
    pub(crate) async fn channel(&self) -> Result<Channel> {
        {
            let guard = self.channel.read();
            if let Some(channel) = guard.as_ref() {
                return Ok(channel.clone());
            }
        }

        let address = self.addresses.read().first().cloned().ok_or_else(|| Error::Config {
            message: "no mirror network addresses configured".to_owned(),
        })?;
        let endpoint =
            tonic::transport::Endpoint::try_from(address.to_uri()).map_err(|e| Error::Connection {
                message: format!("invalid mirror endpoint {address}: {e}"),
                location: snafu::Location::default(),
            })?;
        let new_channel = endpoint.connect().await?;

        let mut guard = self.channel.write();
        if let Some(channel) = guard.as_ref() {
            return Ok(channel.clone());
        }
        *guard = Some(new_channel.clone());
        Ok(new_channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_network(count: u64) -> Network {
        Network::from_addresses(
            (0..count)
                .map(|i| {
                    let id = AccountId::new(3 + i);
                    let address = format!("in-process:node{}", 3 + i).parse().unwrap();
                    (id, address)
                })
                .collect(),
        )
    }

    fn candidates(network: &Network) -> Vec<Arc<Node>> {
        network.nodes_for(&network.node_account_ids()).unwrap()
    }

    #[test]
    fn test_stable_address_book_order() {
        let network = test_network(5);
        assert_eq!(
            network.node_account_ids(),
            (3..8).map(AccountId::new).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_nodes_for_unknown_id_errors() {
        let network = test_network(2);
        let err = network.nodes_for(&[AccountId::new(99)]).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_first_healthy_from_cursor() {
        let network = test_network(4);
        let nodes = candidates(&network);
        assert_eq!(select_node(&nodes, 0), 0);
        assert_eq!(select_node(&nodes, 2), 2);

        nodes[2].force_unhealthy_for(Duration::from_millis(1000));
        assert_eq!(select_node(&nodes, 2), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_single_healthy_regardless_of_cursor() {
        let network = test_network(5);
        let nodes = candidates(&network);
        for (i, node) in nodes.iter().enumerate() {
            if i != 3 {
                node.force_unhealthy_for(Duration::from_secs(4));
            }
        }
        for cursor in 0..5 {
            assert_eq!(select_node(&nodes, cursor), 3, "cursor {cursor}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_all_unhealthy_picks_minimum_remaining() {
        let network = test_network(3);
        let nodes = candidates(&network);
        nodes[0].force_unhealthy_for(Duration::from_millis(4000));
        nodes[1].force_unhealthy_for(Duration::from_millis(3000));
        nodes[2].force_unhealthy_for(Duration::from_millis(5000));

        assert_eq!(select_node(&nodes, 1), 1);
        // The minimum is recomputed per call: as timers run down the pick
        // tracks whichever node expires soonest.
        nodes[0].force_unhealthy_for(Duration::from_millis(100));
        assert_eq!(select_node(&nodes, 1), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_tie_breaks_by_scan_order() {
        let network = test_network(3);
        let nodes = candidates(&network);
        for node in &nodes {
            node.force_unhealthy_for(Duration::from_millis(2000));
        }
        assert_eq!(select_node(&nodes, 0), 0);
        assert_eq!(select_node(&nodes, 2), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_node_becomes_selectable_after_backoff() {
        let network = test_network(3);
        let nodes = candidates(&network);
        nodes[0].force_unhealthy_for(Duration::from_millis(1000));

        // Falls back to the same healthy node while the backoff is pending.
        assert_eq!(select_node(&nodes, 0), 1);
        assert_eq!(select_node(&nodes, 0), 1);

        tokio::time::advance(Duration::from_millis(1001)).await;
        assert_eq!(select_node(&nodes, 0), 0);
    }

    #[test]
    fn test_increase_backoff_counts_failures() {
        let network = test_network(2);
        let id = AccountId::new(3);
        network.increase_backoff(id);
        assert_eq!(network.node(id).unwrap().failure_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_subset_prefers_soonest_available() {
        let network = test_network(6);
        for id in network.node_account_ids() {
            network.node(id).unwrap().force_unhealthy_for(Duration::from_secs(4));
        }
        network
            .node(AccountId::new(7))
            .unwrap()
            .force_unhealthy_for(Duration::from_millis(10));

        let subset = network.node_account_ids_for_execute();
        assert_eq!(subset.len(), 2);
        assert_eq!(subset[0], AccountId::new(7));
    }

    #[test]
    fn test_refresh_requests_are_counted() {
        let network = test_network(1);
        assert_eq!(network.refresh_request_count(), 0);
        network.request_address_book_refresh();
        network.request_address_book_refresh();
        assert_eq!(network.refresh_request_count(), 2);
    }
}
