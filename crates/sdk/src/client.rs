//! Process-wide client: operator identity, defaults, network handles, and
//! lifecycle.
//!
//! A [`Client`] is cheap to clone; clones share the same network registries
//! and executor. Blocking entry points drive the same async engine on the
//! client's runtime, so both modes make identical retry decisions.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::runtime::{Handle, Runtime};
use tokio_util::sync::CancellationToken;

use crate::config::RetryPolicy;
use crate::entity_id::{AccountId, LedgerId};
use crate::error::{Error, Result};
use crate::execute::{self, Execute};
use crate::key::Signer;
use crate::network::{MirrorNetwork, Network};
use crate::node::NodeAddress;

/// Default ceiling on the fee attached to a transaction, in tinybars.
const DEFAULT_MAX_TRANSACTION_FEE: u64 = 200_000_000;

/// Default ceiling on an automatically paid query cost, in tinybars.
const DEFAULT_MAX_QUERY_PAYMENT: u64 = 100_000_000;

/// The account paying for requests, with its signing capability.
#[derive(Clone)]
pub struct Operator {
    /// Account that pays for every request this client submits.
    pub account_id: AccountId,
    /// Signs transaction bodies on the account's behalf.
    pub signer: Arc<dyn Signer>,
}

impl std::fmt::Debug for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operator").field("account_id", &self.account_id).finish_non_exhaustive()
    }
}

/// The executor driving a client's async work.
///
/// A runtime created by the client is shut down on [`Client::close`]; an
/// externally supplied one is never closed.
enum Executor {
    Owned(Runtime),
    External(Handle),
}

impl Executor {
    fn handle(&self) -> Handle {
        match self {
            Self::Owned(runtime) => runtime.handle().clone(),
            Self::External(handle) => handle.clone(),
        }
    }
}

struct ClientInner {
    network: Arc<Network>,
    mirror_network: Arc<MirrorNetwork>,
    operator: RwLock<Option<Operator>>,
    retry_policy: RwLock<RetryPolicy>,
    ledger_id: RwLock<Option<LedgerId>>,
    max_transaction_fee: RwLock<u64>,
    max_query_payment: RwLock<u64>,
    executor: RwLock<Option<Executor>>,
    cancel: CancellationToken,
}

/// Handle to the SDK's process-wide state.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Builds a client for an explicit network map. Entry order is the
    /// stable submission-priority order.
    ///
    /// When called outside a tokio runtime the client creates and owns one;
    /// inside a runtime it borrows the ambient handle and will never shut
    /// it down.
    pub fn for_network(entries: Vec<(AccountId, NodeAddress)>) -> Result<Self> {
        let executor = match Handle::try_current() {
            Ok(handle) => Executor::External(handle),
            Err(_) => Executor::Owned(
                tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| Error::Config {
                        message: format!("failed to build client runtime: {e}"),
                    })?,
            ),
        };
        Ok(Self {
            inner: Arc::new(ClientInner {
                network: Arc::new(Network::from_addresses(entries)),
                mirror_network: Arc::new(MirrorNetwork::from_addresses(Vec::new())),
                operator: RwLock::new(None),
                retry_policy: RwLock::new(RetryPolicy::default()),
                ledger_id: RwLock::new(None),
                max_transaction_fee: RwLock::new(DEFAULT_MAX_TRANSACTION_FEE),
                max_query_payment: RwLock::new(DEFAULT_MAX_QUERY_PAYMENT),
                executor: RwLock::new(Some(executor)),
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// Sets the operator used to pay for and sign requests.
    pub fn set_operator(&self, account_id: AccountId, signer: Arc<dyn Signer>) {
        *self.inner.operator.write() = Some(Operator { account_id, signer });
    }

    /// The configured operator, if any.
    #[must_use]
    pub fn operator(&self) -> Option<Operator> {
        self.inner.operator.read().clone()
    }

    /// The consensus-node registry.
    #[must_use]
    pub fn network(&self) -> &Arc<Network> {
        &self.inner.network
    }

    /// The mirror-node registry.
    #[must_use]
    pub fn mirror_network(&self) -> &Arc<MirrorNetwork> {
        &self.inner.mirror_network
    }

    /// Replaces the mirror-node address list.
    pub fn set_mirror_network(&self, addresses: Vec<NodeAddress>) {
        self.inner.mirror_network.set_addresses(addresses);
    }

    /// The ledger this client validates entity-id checksums against.
    #[must_use]
    pub fn ledger_id(&self) -> Option<LedgerId> {
        self.inner.ledger_id.read().clone()
    }

    /// Sets the ledger used for checksum validation.
    pub fn set_ledger_id(&self, ledger_id: Option<LedgerId>) {
        *self.inner.ledger_id.write() = ledger_id;
    }

    /// The retry/deadline policy applied to executions.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.retry_policy.read().clone()
    }

    /// Replaces the retry/deadline policy.
    pub fn set_retry_policy(&self, policy: RetryPolicy) -> Result<()> {
        policy.validate()?;
        *self.inner.retry_policy.write() = policy;
        Ok(())
    }

    /// Ceiling on the fee attached to transactions, in tinybars.
    #[must_use]
    pub fn max_transaction_fee(&self) -> u64 {
        *self.inner.max_transaction_fee.read()
    }

    /// Sets the transaction fee ceiling, in tinybars.
    pub fn set_max_transaction_fee(&self, fee: u64) {
        *self.inner.max_transaction_fee.write() = fee;
    }

    /// Ceiling on automatically paid query costs, in tinybars.
    #[must_use]
    pub fn max_query_payment(&self) -> u64 {
        *self.inner.max_query_payment.read()
    }

    /// Sets the query payment ceiling, in tinybars.
    pub fn set_max_query_payment(&self, payment: u64) {
        *self.inner.max_query_payment.write() = payment;
    }

    /// The cancellation token tied to this client's lifetime.
    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    /// Runs one operation through the execution engine.
    pub(crate) async fn execute<E: Execute>(
        &self,
        executable: &E,
        timeout: Option<Duration>,
    ) -> Result<E::Output> {
        if self.inner.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let policy = self.retry_policy();
        execute::execute(&self.inner.network, &policy, &self.inner.cancel, executable, timeout)
            .await
    }

    /// Drives a future to completion on the client's executor.
    ///
    /// Must not be called from async context; the async entry points exist
    /// for that.
    pub(crate) fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        let handle = {
            let guard = self.inner.executor.read();
            guard.as_ref().map(Executor::handle)
        };
        match handle {
            Some(handle) => Ok(handle.block_on(future)),
            None => Err(Error::Config { message: "client is closed".to_owned() }),
        }
    }

    /// Spawns a background task on the client's executor.
    pub(crate) fn spawn<F>(&self, future: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = {
            let guard = self.inner.executor.read();
            guard.as_ref().map(Executor::handle)
        };
        match handle {
            Some(handle) => {
                handle.spawn(future);
                Ok(())
            }
            None => Err(Error::Config { message: "client is closed".to_owned() }),
        }
    }

    /// Probes one node's health with a zero-cost balance query against it.
    pub async fn ping(&self, node_account_id: AccountId) -> Result<()> {
        crate::query::AccountBalanceQuery::new(node_account_id)
            .with_node_account_ids(vec![node_account_id])
            .execute(self)
            .await
            .map(drop)
    }

    /// Shuts the client down: cancels in-flight executions and, when the
    /// client owns its runtime, shuts the runtime down within `timeout`.
    /// Externally supplied runtimes are never shut down. Consuming `self`
    /// makes a closed handle unusable by construction.
    pub fn close(self, timeout: Duration) {
        self.inner.cancel.cancel();
        let executor = self.inner.executor.write().take();
        if let Some(Executor::Owned(runtime)) = executor {
            runtime.shutdown_timeout(timeout);
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("nodes", &self.inner.network.node_account_ids())
            .field("operator", &self.inner.operator.read().as_ref().map(|o| o.account_id))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{PublicKey, Signer};

    struct FakeSigner;

    impl Signer for FakeSigner {
        fn public_key(&self) -> PublicKey {
            PublicKey::Ed25519([7; 32])
        }

        fn sign(&self, message: &[u8]) -> Vec<u8> {
            message.iter().rev().copied().collect()
        }
    }

    fn test_client() -> Client {
        Client::for_network(vec![
            (AccountId::new(3), "in-process:node3".parse().unwrap()),
            (AccountId::new(4), "in-process:node4".parse().unwrap()),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_client_inside_runtime_borrows_handle() {
        let client = test_client();
        let guard = client.inner.executor.read();
        assert!(matches!(guard.as_ref(), Some(Executor::External(_))));
    }

    #[test]
    fn test_client_outside_runtime_owns_one() {
        let client = test_client();
        {
            let guard = client.inner.executor.read();
            assert!(matches!(guard.as_ref(), Some(Executor::Owned(_))));
        }
        assert_eq!(client.block_on(async { 41 + 1 }).unwrap(), 42);
        client.close(Duration::from_secs(1));
    }

    #[test]
    fn test_operator_round_trip() {
        let client = test_client();
        assert!(client.operator().is_none());
        client.set_operator(AccountId::new(2), Arc::new(FakeSigner));
        assert_eq!(client.operator().unwrap().account_id, AccountId::new(2));
        client.close(Duration::from_secs(1));
    }

    #[test]
    fn test_defaults_and_setters() {
        let client = test_client();
        assert_eq!(client.max_transaction_fee(), DEFAULT_MAX_TRANSACTION_FEE);
        client.set_max_transaction_fee(5);
        assert_eq!(client.max_transaction_fee(), 5);

        assert!(client.ledger_id().is_none());
        client.set_ledger_id(Some(LedgerId::testnet()));
        assert_eq!(client.ledger_id(), Some(LedgerId::testnet()));
        client.close(Duration::from_secs(1));
    }

    #[test]
    fn test_close_makes_blocking_calls_fail_on_clones() {
        let client = test_client();
        let clone = client.clone();
        client.close(Duration::from_secs(1));
        assert!(clone.block_on(async {}).is_err());
        assert!(clone.cancel_token().is_cancelled());
    }

    #[test]
    fn test_invalid_retry_policy_rejected() {
        let client = test_client();
        let bad = RetryPolicy { max_attempts: 0, ..RetryPolicy::default() };
        assert!(client.set_retry_policy(bad).is_err());
        client.close(Duration::from_secs(1));
    }
}
