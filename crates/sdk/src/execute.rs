//! The request execution engine.
//!
//! Every operation in the SDK funnels through [`execute`]: select a node,
//! issue the wire call with a bounded deadline, classify the outcome, and
//! either return or back off and try again. The loop is mode-agnostic; the
//! blocking facade drives the same future to completion on a runtime
//! handle, so both modes make identical node-selection and retry decisions
//! for the same sequence of wire responses.

use std::future::Future;
use std::time::Duration;

use http::uri::PathAndQuery;
use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tonic::Code;

use crate::config::RetryPolicy;
use crate::entity_id::AccountId;
use crate::error::{is_rst_stream, Error, Result};
use crate::network::{select_node, Network};
use crate::node::Node;
use crate::status::{default_execution_state, ExecutionState, Status};
use crate::transaction_id::TransactionId;

/// One operation's view of the wire: how to build a request for a node,
/// read the status out of a response, and map the final answer.
///
/// The engine depends only on this capability set, never on concrete
/// operation types. [`Execute::call`] has a default unary implementation;
/// operations with a different transport shape (and test doubles that
/// script responses) override it.
pub trait Execute: Send + Sync {
    /// Wire request message.
    type GrpcRequest: prost::Message + Clone + 'static;

    /// Wire response message.
    type GrpcResponse: prost::Message + Default + Send + 'static;

    /// What a successful execution yields.
    type Output;

    /// Candidate node account ids fixed on this request, in submission
    /// priority order; `None` lets the network choose.
    fn node_account_ids(&self) -> Option<Vec<AccountId>>;

    /// The transaction id attached to this request, if any.
    fn transaction_id(&self) -> Option<TransactionId> {
        None
    }

    /// The gRPC method this operation invokes.
    fn method_path(&self) -> &'static str;

    /// Builds the wire request for an attempt against the given node.
    fn make_request(&self, node_account_id: AccountId) -> Result<Self::GrpcRequest>;

    /// Extracts the precheck status from a wire response.
    fn response_status(&self, response: &Self::GrpcResponse) -> Status;

    /// Classifies a completed attempt. The default is the shared
    /// precheck table; receipt-style queries widen the retry set.
    fn execution_state(&self, status: Status, response: &Self::GrpcResponse) -> ExecutionState {
        let _ = response;
        default_execution_state(status)
    }

    /// Maps the final successful response.
    fn map_response(
        &self,
        response: Self::GrpcResponse,
        node_account_id: AccountId,
        request: &Self::GrpcRequest,
    ) -> Result<Self::Output>;

    /// Issues the wire call for one attempt.
    ///
    /// The default performs a unary call on the node's channel; a failed
    /// connection surfaces as `UNAVAILABLE` so the loop treats it exactly
    /// like a failed attempt without a wire round-trip.
    fn call(
        &self,
        node: &Node,
        request: Self::GrpcRequest,
        deadline: Duration,
    ) -> impl Future<Output = std::result::Result<Self::GrpcResponse, tonic::Status>> + Send {
        unary_call(node, self.method_path(), request, deadline)
    }
}

/// Performs a unary gRPC call against a node's channel.
pub(crate) async fn unary_call<Req, Resp>(
    node: &Node,
    path: &'static str,
    request: Req,
    deadline: Duration,
) -> std::result::Result<Resp, tonic::Status>
where
    Req: prost::Message + 'static,
    Resp: prost::Message + Default + 'static,
{
    let Some(channel) = node.try_connect().await else {
        return Err(tonic::Status::unavailable(format!(
            "failed to connect to node {}",
            node.account_id()
        )));
    };
    let mut grpc = tonic::client::Grpc::new(channel);
    grpc.ready()
        .await
        .map_err(|e| tonic::Status::unavailable(format!("service not ready: {e}")))?;

    let mut request = tonic::Request::new(request);
    request.set_timeout(deadline);
    grpc.unary(
        request,
        PathAndQuery::from_static(path),
        tonic::codec::ProstCodec::default(),
    )
    .await
    .map(tonic::Response::into_inner)
}

/// Runs one operation to completion against the network.
///
/// `timeout` overrides the policy's overall request timeout. The loop
/// honors `cancel` at every await point; a cancelled execution never
/// retries.
pub(crate) async fn execute<E: Execute>(
    network: &Network,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    executable: &E,
    timeout: Option<Duration>,
) -> Result<E::Output> {
    let timeout = timeout.unwrap_or(policy.request_timeout);
    let timeout_at = Instant::now() + timeout;

    let candidate_ids = match executable.node_account_ids() {
        Some(ids) if !ids.is_empty() => ids,
        _ => network.node_account_ids_for_execute(),
    };
    let candidates = network.nodes_for(&candidate_ids)?;
    if candidates.is_empty() {
        return Err(Error::Config { message: "no candidate nodes to execute against".to_owned() });
    }

    let mut cursor = 0usize;
    let mut attempted = vec![false; candidates.len()];
    let mut last_error = String::new();

    for attempt in 1..=policy.max_attempts {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let remaining = remaining_or_timeout(timeout_at, timeout)?;

        let index = select_node(&candidates, cursor);
        let node = &candidates[index];

        // All candidates quarantined: wait out the chosen node's backoff.
        let wait = node.remaining_backoff();
        if !wait.is_zero() {
            sleep_cancellable(wait.min(remaining), cancel).await?;
        }

        let remaining = remaining_or_timeout(timeout_at, timeout)?;
        let grpc_deadline = match policy.grpc_deadline {
            Some(deadline) => deadline.min(remaining),
            None => remaining,
        };

        let request = executable.make_request(node.account_id())?;
        tracing::debug!(
            attempt,
            node = %node.account_id(),
            method = executable.method_path(),
            "executing request"
        );

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            outcome = executable.call(node, request.clone(), grpc_deadline) => outcome,
        };
        let swept_all = attempted.iter().all(|&a| a);
        attempted[index] = true;

        let response = match outcome {
            Ok(response) => response,
            Err(status) => {
                let retryable = match status.code() {
                    Code::Unavailable | Code::ResourceExhausted => true,
                    Code::Internal => is_rst_stream(status.message()),
                    Code::DeadlineExceeded => {
                        return Err(Error::Timeout { duration_ms: timeout.as_millis() as u64 })
                    }
                    _ => false,
                };
                if !retryable {
                    return Err(status.into());
                }
                tracing::warn!(
                    attempt,
                    node = %node.account_id(),
                    code = ?status.code(),
                    "attempt failed, advancing to next node"
                );
                last_error = format!("{:?}: {}", status.code(), status.message());
                node.mark_failed();
                cursor = index + 1;
                if attempt >= policy.max_attempts {
                    break;
                }
                let remaining = remaining_or_timeout(timeout_at, timeout)?;
                sleep_cancellable(backoff_for(attempt, policy).min(remaining), cancel).await?;
                continue;
            }
        };

        let status = executable.response_status(&response);
        let mut state = executable.execution_state(status, &response);
        // A server fault after a full sweep of the candidates keeps cycling
        // instead of quarantining nodes further.
        if state == ExecutionState::ServerError && swept_all {
            state = ExecutionState::Retry;
        }

        match state {
            ExecutionState::Success => {
                node.mark_succeeded();
                return executable.map_response(response, node.account_id(), &request);
            }
            ExecutionState::RequestError => {
                node.mark_succeeded();
                return Err(Error::Precheck {
                    status,
                    transaction_id: executable.transaction_id(),
                });
            }
            ExecutionState::Retry => {
                if status == Status::InvalidNodeAccount {
                    network.increase_backoff(node.account_id());
                    network.request_address_book_refresh();
                } else {
                    node.mark_succeeded();
                }
            }
            ExecutionState::ServerError => {
                node.mark_failed();
                cursor = index + 1;
            }
        }

        tracing::debug!(attempt, node = %node.account_id(), ?status, ?state, "retrying");
        last_error = format!("{status:?}");
        if attempt >= policy.max_attempts {
            break;
        }
        let remaining = remaining_or_timeout(timeout_at, timeout)?;
        sleep_cancellable(backoff_for(attempt, policy).min(remaining), cancel).await?;
    }

    Err(Error::MaxAttemptsExceeded { attempts: policy.max_attempts, last_error })
}

/// Time left before `timeout_at`, or the timeout error if none remains.
/// An attempt is never issued with a non-positive deadline.
fn remaining_or_timeout(timeout_at: Instant, timeout: Duration) -> Result<Duration> {
    let remaining = timeout_at.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Err(Error::Timeout { duration_ms: timeout.as_millis() as u64 });
    }
    Ok(remaining)
}

/// Geometric backoff for the given 1-based attempt, jittered and capped.
fn backoff_for(attempt: usize, policy: &RetryPolicy) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31) as u32;
    let base = policy
        .min_backoff
        .saturating_mul(2u32.saturating_pow(exponent))
        .min(policy.max_backoff);
    apply_jitter(base, policy.jitter)
}

/// Scales a duration by a random factor in `[1 - jitter, 1 + jitter]`.
fn apply_jitter(duration: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 || duration.is_zero() {
        return duration;
    }
    let factor = rand::thread_rng().gen_range((1.0 - jitter)..=(1.0 + jitter));
    duration.mul_f64(factor)
}

/// Sleeps, racing caller cancellation. Cancellation wins ties.
async fn sleep_cancellable(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        () = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeAddress;

    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// What one scripted attempt produces at the wire.
    #[derive(Debug, Clone)]
    enum Scripted {
        /// A response carrying a precheck status.
        Precheck(Status),
        /// A gRPC-level failure.
        Grpc(Code, &'static str),
    }

    /// A scripted operation standing in for a real wire call: pops one
    /// scripted outcome per attempt and records which node and deadline
    /// each attempt used. An exhausted script answers `OK`.
    struct TestOperation {
        node_ids: Vec<AccountId>,
        script: Mutex<VecDeque<Scripted>>,
        seen_nodes: Mutex<Vec<AccountId>>,
        seen_deadlines: Mutex<Vec<Duration>>,
    }

    impl TestOperation {
        fn new(node_ids: Vec<AccountId>, script: Vec<Scripted>) -> Self {
            Self {
                node_ids,
                script: Mutex::new(script.into()),
                seen_nodes: Mutex::new(Vec::new()),
                seen_deadlines: Mutex::new(Vec::new()),
            }
        }

        fn seen_nodes(&self) -> Vec<AccountId> {
            self.seen_nodes.lock().clone()
        }
    }

    impl Execute for TestOperation {
        type GrpcRequest = hiero_proto::Transaction;
        type GrpcResponse = hiero_proto::TransactionResponse;
        type Output = AccountId;

        fn node_account_ids(&self) -> Option<Vec<AccountId>> {
            Some(self.node_ids.clone())
        }

        fn method_path(&self) -> &'static str {
            hiero_proto::services::CRYPTO_TRANSFER
        }

        fn make_request(&self, _node_account_id: AccountId) -> Result<Self::GrpcRequest> {
            Ok(hiero_proto::Transaction::default())
        }

        fn response_status(&self, response: &Self::GrpcResponse) -> Status {
            Status::from_code(response.node_transaction_precheck_code)
        }

        fn map_response(
            &self,
            _response: Self::GrpcResponse,
            node_account_id: AccountId,
            _request: &Self::GrpcRequest,
        ) -> Result<Self::Output> {
            Ok(node_account_id)
        }

        fn call(
            &self,
            node: &Node,
            _request: Self::GrpcRequest,
            deadline: Duration,
        ) -> impl Future<Output = std::result::Result<Self::GrpcResponse, tonic::Status>> + Send
        {
            self.seen_nodes.lock().push(node.account_id());
            self.seen_deadlines.lock().push(deadline);
            let scripted = self.script.lock().pop_front();
            async move {
                match scripted {
                    None | Some(Scripted::Precheck(Status::Ok)) => {
                        Ok(hiero_proto::TransactionResponse::default())
                    }
                    Some(Scripted::Precheck(status)) => Ok(hiero_proto::TransactionResponse {
                        node_transaction_precheck_code: status.to_code(),
                        cost: 0,
                    }),
                    Some(Scripted::Grpc(code, message)) => {
                        Err(tonic::Status::new(code, message))
                    }
                }
            }
        }
    }

    fn test_network(count: u64) -> Network {
        Network::from_addresses(
            (0..count)
                .map(|i| {
                    let id = AccountId::new(3 + i);
                    let address: NodeAddress =
                        format!("in-process:node{}", 3 + i).parse().unwrap();
                    (id, address)
                })
                .collect(),
        )
    }

    fn ids(count: u64) -> Vec<AccountId> {
        (0..count).map(|i| AccountId::new(3 + i)).collect()
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::builder()
            .with_max_attempts(10)
            .with_min_backoff(Duration::from_millis(250))
            .with_max_backoff(Duration::from_secs(8))
            .with_jitter(0.0)
            .build()
            .unwrap()
    }

    async fn run(
        network: &Network,
        policy: &RetryPolicy,
        op: &TestOperation,
    ) -> Result<AccountId> {
        execute(network, policy, &CancellationToken::new(), op, None).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_node_healthy_succeeds_immediately() {
        let network = test_network(2);
        let op = TestOperation::new(ids(2), vec![]);
        let chosen = run(&network, &fast_policy(), &op).await.unwrap();
        assert_eq!(chosen, AccountId::new(3));
        assert_eq!(op.seen_nodes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_respects_explicit_grpc_deadline() {
        let network = test_network(1);
        let policy = RetryPolicy::builder()
            .with_grpc_deadline(Duration::from_secs(10))
            .with_request_timeout(Duration::from_secs(120))
            .with_jitter(0.0)
            .build()
            .unwrap();
        let op = TestOperation::new(ids(1), vec![]);
        run(&network, &policy, &op).await.unwrap();

        let deadlines = op.seen_deadlines.lock().clone();
        assert_eq!(deadlines.len(), 1);
        assert!(deadlines[0] > Duration::ZERO);
        assert!(deadlines[0] <= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounded_by_remaining_timeout() {
        let network = test_network(1);
        let policy = RetryPolicy::builder()
            .with_grpc_deadline(Duration::from_secs(30))
            .with_jitter(0.0)
            .build()
            .unwrap();
        let op = TestOperation::new(ids(1), vec![]);
        execute(
            &network,
            &policy,
            &CancellationToken::new(),
            &op,
            Some(Duration::from_secs(5)),
        )
        .await
        .unwrap();

        let deadlines = op.seen_deadlines.lock().clone();
        assert!(deadlines[0] > Duration::ZERO);
        assert!(deadlines[0] <= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_node_is_skipped() {
        let network = test_network(2);
        network
            .node(AccountId::new(3))
            .unwrap()
            .force_unhealthy_for(Duration::from_millis(1000));
        let op = TestOperation::new(ids(2), vec![]);
        let chosen = run(&network, &fast_policy(), &op).await.unwrap();
        assert_eq!(chosen, AccountId::new(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_unhealthy_waits_for_soonest_node() {
        let network = test_network(3);
        let nodes = ids(3);
        network.node(nodes[0]).unwrap().force_unhealthy_for(Duration::from_millis(4000));
        network.node(nodes[1]).unwrap().force_unhealthy_for(Duration::from_millis(3000));
        network.node(nodes[2]).unwrap().force_unhealthy_for(Duration::from_millis(5000));

        let op = TestOperation::new(nodes.clone(), vec![]);
        let started = Instant::now();
        let chosen = run(&network, &fast_policy(), &op).await.unwrap();
        assert_eq!(chosen, nodes[1]);
        assert!(started.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_retries_same_node() {
        let network = test_network(3);
        let op = TestOperation::new(
            ids(3),
            vec![Scripted::Precheck(Status::Busy), Scripted::Precheck(Status::Busy)],
        );
        let chosen = run(&network, &fast_policy(), &op).await.unwrap();
        assert_eq!(chosen, AccountId::new(3));
        assert_eq!(op.seen_nodes(), vec![AccountId::new(3); 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_advances_node() {
        let network = test_network(3);
        let op = TestOperation::new(
            ids(3),
            vec![Scripted::Precheck(Status::PlatformTransactionNotCreated)],
        );
        let chosen = run(&network, &fast_policy(), &op).await.unwrap();
        assert_eq!(chosen, AccountId::new(4));
        assert_eq!(op.seen_nodes(), vec![AccountId::new(3), AccountId::new(4)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_grpc_status_advances_node() {
        let network = test_network(3);
        let op = TestOperation::new(
            ids(3),
            vec![Scripted::Grpc(Code::Unavailable, "connection reset")],
        );
        let chosen = run(&network, &fast_policy(), &op).await.unwrap();
        assert_eq!(chosen, AccountId::new(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rst_stream_internal_is_retried() {
        let network = test_network(2);
        let op = TestOperation::new(
            ids(2),
            vec![Scripted::Grpc(Code::Internal, "stream closed: RST_STREAM")],
        );
        let chosen = run(&network, &fast_policy(), &op).await.unwrap();
        assert_eq!(chosen, AccountId::new(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_grpc_status_fails_fast() {
        let network = test_network(3);
        let op = TestOperation::new(ids(3), vec![Scripted::Grpc(Code::Aborted, "conflict")]);
        let err = run(&network, &fast_policy(), &op).await.unwrap_err();
        assert_eq!(err.code(), Some(Code::Aborted));
        assert_eq!(op.seen_nodes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded_maps_to_timeout() {
        let network = test_network(2);
        let op = TestOperation::new(
            ids(2),
            vec![Scripted::Grpc(Code::DeadlineExceeded, "deadline expired")],
        );
        let err = run(&network, &fast_policy(), &op).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_precheck_user_error_is_terminal() {
        let network = test_network(3);
        let op = TestOperation::new(ids(3), vec![Scripted::Precheck(Status::AccountDeleted)]);
        let err = run(&network, &fast_policy(), &op).await.unwrap_err();
        assert!(
            matches!(err, Error::Precheck { status: Status::AccountDeleted, .. }),
            "got {err:?}"
        );
        assert_eq!(op.seen_nodes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausting_attempts_is_distinct_error() {
        let network = test_network(1);
        let policy = RetryPolicy::builder()
            .with_max_attempts(3)
            .with_jitter(0.0)
            .build()
            .unwrap();
        let op = TestOperation::new(ids(1), vec![Scripted::Precheck(Status::Busy); 3]);
        let err = run(&network, &policy, &op).await.unwrap_err();
        assert!(
            matches!(err, Error::MaxAttemptsExceeded { attempts: 3, .. }),
            "got {err:?}"
        );
        assert_eq!(op.seen_nodes().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_node_account_penalizes_node_once() {
        let network = test_network(2);
        let op = TestOperation::new(
            ids(2),
            vec![Scripted::Precheck(Status::InvalidNodeAccount)],
        );
        let chosen = run(&network, &fast_policy(), &op).await.unwrap();

        // Exactly one backoff increase on the offending node and one
        // address-book refresh request per occurrence.
        assert_eq!(network.node(AccountId::new(3)).unwrap().failure_count(), 1);
        assert_eq!(network.refresh_request_count(), 1);
        assert_eq!(chosen, AccountId::new(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_downgrades_after_full_sweep() {
        let network = test_network(2);
        let op = TestOperation::new(
            ids(2),
            vec![
                Scripted::Precheck(Status::PlatformNotActive),
                Scripted::Precheck(Status::PlatformNotActive),
                Scripted::Precheck(Status::PlatformNotActive),
            ],
        );
        let chosen = run(&network, &fast_policy(), &op).await.unwrap();
        assert_eq!(op.seen_nodes().len(), 4);
        // First sweep fails both nodes; the downgraded third error no
        // longer marks its node failed.
        let failures: u64 = ids(2)
            .iter()
            .map(|id| network.node(*id).unwrap().failure_count())
            .sum();
        assert_eq!(failures, 2);
        assert!(ids(2).contains(&chosen));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overall_timeout_stops_retries() {
        let network = test_network(1);
        let policy = RetryPolicy::builder()
            .with_min_backoff(Duration::from_secs(2))
            .with_max_backoff(Duration::from_secs(2))
            .with_jitter(0.0)
            .build()
            .unwrap();
        let op = TestOperation::new(ids(1), vec![Scripted::Precheck(Status::Busy); 10]);
        let err = execute(
            &network,
            &policy,
            &CancellationToken::new(),
            &op,
            Some(Duration::from_secs(3)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }), "got {err:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff_stops_execution() {
        let network = Arc::new(test_network(1));
        let policy = RetryPolicy::builder()
            .with_min_backoff(Duration::from_secs(3600))
            .with_max_backoff(Duration::from_secs(3600))
            .with_jitter(0.0)
            .build()
            .unwrap();
        let op = Arc::new(TestOperation::new(
            ids(1),
            vec![Scripted::Precheck(Status::Busy); 10],
        ));
        let cancel = CancellationToken::new();

        let task = {
            let network = Arc::clone(&network);
            let op = Arc::clone(&op);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                execute(network.as_ref(), &policy, &cancel, op.as_ref(), None).await
            })
        };

        // Let the first attempt land and the backoff sleep start.
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        let result = task.await.unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(op.seen_nodes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_moving_minimum_tracked_across_executions() {
        let network = test_network(3);
        let nodes = ids(3);
        network.node(nodes[0]).unwrap().force_unhealthy_for(Duration::from_millis(5000));
        network.node(nodes[1]).unwrap().force_unhealthy_for(Duration::from_millis(3000));
        network.node(nodes[2]).unwrap().force_unhealthy_for(Duration::from_millis(4000));

        let op = TestOperation::new(nodes.clone(), vec![]);
        let first = run(&network, &fast_policy(), &op).await.unwrap();
        assert_eq!(first, nodes[1]);

        // 3000ms have elapsed; node 2 now expires soonest for a fresh
        // execution issued before any other timer runs out.
        network.node(nodes[1]).unwrap().force_unhealthy_for(Duration::from_millis(4000));
        let op = TestOperation::new(nodes.clone(), vec![]);
        let second = run(&network, &fast_policy(), &op).await.unwrap();
        assert_eq!(second, nodes[2]);
    }

    #[test]
    fn test_backoff_growth_is_geometric_and_capped() {
        let policy = RetryPolicy::builder()
            .with_min_backoff(Duration::from_millis(250))
            .with_max_backoff(Duration::from_secs(8))
            .with_jitter(0.0)
            .build()
            .unwrap();
        assert_eq!(backoff_for(1, &policy), Duration::from_millis(250));
        assert_eq!(backoff_for(2, &policy), Duration::from_millis(500));
        assert_eq!(backoff_for(3, &policy), Duration::from_millis(1000));
        assert_eq!(backoff_for(6, &policy), Duration::from_secs(8));
        assert_eq!(backoff_for(60, &policy), Duration::from_secs(8));
    }

    #[test]
    fn test_apply_jitter_stays_in_bounds() {
        let base = Duration::from_millis(1000);
        for _ in 0..100 {
            let jittered = apply_jitter(base, 0.25);
            assert!(jittered >= Duration::from_millis(750));
            assert!(jittered <= Duration::from_millis(1250));
        }
        assert_eq!(apply_jitter(base, 0.0), base);
    }
}

#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        /// Property: jittered duration never exceeds base * (1 + factor).
        #[test]
        fn prop_jitter_never_exceeds_upper_bound(
            base_ms in 1u64..10000,
            factor in 0.0f64..=1.0
        ) {
            let dur = Duration::from_millis(base_ms);
            let jittered = apply_jitter(dur, factor);

            let max_allowed = Duration::from_nanos(
                (dur.as_nanos() as f64 * (1.0 + factor)).ceil() as u64
            );

            prop_assert!(
                jittered <= max_allowed,
                "jittered {:?} exceeds max {:?} for base {:?} with factor {}",
                jittered, max_allowed, dur, factor
            );
        }

        /// Property: jittered duration is never below base * (1 - factor).
        #[test]
        fn prop_jitter_never_below_lower_bound(
            base_ms in 1u64..10000,
            factor in 0.0f64..=1.0
        ) {
            let dur = Duration::from_millis(base_ms);
            let jittered = apply_jitter(dur, factor);

            let min_allowed = Duration::from_nanos(
                (dur.as_nanos() as f64 * (1.0 - factor)).floor() as u64
            );

            prop_assert!(
                jittered >= min_allowed,
                "jittered {:?} below min {:?} for base {:?} with factor {}",
                jittered, min_allowed, dur, factor
            );
        }

        /// Property: unjittered backoff never exceeds the policy cap and
        /// never shrinks as attempts grow.
        #[test]
        fn prop_backoff_is_monotonic_and_capped(attempt in 1usize..100) {
            let policy = RetryPolicy {
                jitter: 0.0,
                ..RetryPolicy::default()
            };
            let current = backoff_for(attempt, &policy);
            let next = backoff_for(attempt + 1, &policy);

            prop_assert!(current <= policy.max_backoff);
            prop_assert!(next >= current);
        }
    }
}
