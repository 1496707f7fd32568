//! Mirror-node topic subscriptions: server-streamed messages with
//! resumption and chunk reassembly.
//!
//! A subscription runs as a background task. When the stream drops with a
//! retryable status the task reconnects where it left off: the start time
//! advances past the last delivered timestamp and the limit shrinks by
//! what was already delivered, so no message is lost or duplicated across
//! reconnects. Cancelling the handle stops the task silently; neither the
//! error handler nor another reconnect runs after cancellation.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use futures::{Stream, StreamExt};
use http::uri::PathAndQuery;
use tokio_util::sync::CancellationToken;
use tonic::Code;

use crate::client::Client;
use crate::entity_id::TopicId;
use crate::error::{is_rst_stream, Error, Result};
use crate::transaction_id::TransactionId;

/// Reconnect attempts before the subscription gives up.
const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Base delay before the first reconnect.
const BASE_RECONNECT_DELAY: Duration = Duration::from_millis(500);

/// Cap on the reconnect delay.
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(8);

/// One consensus message, reassembled if it arrived in chunks.
#[derive(Debug, Clone)]
pub struct TopicMessage {
    /// Consensus timestamp, nanoseconds since the epoch. For a chunked
    /// message, the final chunk's timestamp.
    pub consensus_timestamp_nanos: i64,
    /// The full message payload.
    pub contents: Vec<u8>,
    /// The topic's running hash after this message.
    pub running_hash: Vec<u8>,
    /// The topic's sequence number of this message.
    pub sequence_number: u64,
}

/// Cancels a running subscription when dropped or told to.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    token: CancellationToken,
}

impl SubscriptionHandle {
    /// Stops the subscription. The message and error handlers are never
    /// invoked again after this returns.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the subscription was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Subscribes to a consensus topic's message stream on a mirror node.
#[derive(Debug, Clone)]
pub struct TopicMessageQuery {
    topic_id: Option<TopicId>,
    start_time_nanos: Option<i64>,
    end_time_nanos: Option<i64>,
    limit: u64,
    max_attempts: usize,
}

impl TopicMessageQuery {
    /// A subscription to the given topic, from the current time, without
    /// a message limit.
    #[must_use]
    pub fn new(topic_id: TopicId) -> Self {
        Self {
            topic_id: Some(topic_id),
            start_time_nanos: None,
            end_time_nanos: None,
            limit: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Inclusive lower bound on consensus timestamps, nanoseconds since
    /// the epoch.
    #[must_use]
    pub fn with_start_time_nanos(mut self, nanos: i64) -> Self {
        self.start_time_nanos = Some(nanos);
        self
    }

    /// Exclusive upper bound on consensus timestamps.
    #[must_use]
    pub fn with_end_time_nanos(mut self, nanos: i64) -> Self {
        self.end_time_nanos = Some(nanos);
        self
    }

    /// Caps the number of stream responses delivered; 0 means unlimited.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Caps reconnect attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    fn initial_query(&self) -> hiero_proto::ConsensusTopicQuery {
        hiero_proto::ConsensusTopicQuery {
            topic_id: self.topic_id.map(TopicId::to_protobuf),
            consensus_start_time: self.start_time_nanos.map(timestamp_from_nanos),
            consensus_end_time: self.end_time_nanos.map(timestamp_from_nanos),
            limit: self.limit,
        }
    }

    /// Starts the subscription on the client's mirror network.
    ///
    /// `on_message` runs for every (reassembled) message; `on_error` runs
    /// at most once, when the stream fails terminally. A cancelled
    /// subscription invokes neither.
    pub fn subscribe<M, E>(
        self,
        client: &Client,
        on_message: M,
        on_error: E,
    ) -> Result<SubscriptionHandle>
    where
        M: FnMut(TopicMessage) + Send + 'static,
        E: FnOnce(Error) + Send + 'static,
    {
        let token = client.cancel_token().child_token();
        let handle = SubscriptionHandle { token: token.clone() };
        let mirror = client.mirror_network().clone();
        let max_attempts = self.max_attempts;
        let query = self.initial_query();

        client.spawn(async move {
            let connect = move |query: hiero_proto::ConsensusTopicQuery| {
                let mirror = mirror.clone();
                async move {
                    let channel = mirror.channel().await.map_err(|e| {
                        tonic::Status::unavailable(format!("mirror connection failed: {e}"))
                    })?;
                    let mut grpc = tonic::client::Grpc::new(channel);
                    grpc.ready().await.map_err(|e| {
                        tonic::Status::unavailable(format!("mirror service not ready: {e}"))
                    })?;
                    grpc.server_streaming(
                        tonic::Request::new(query),
                        PathAndQuery::from_static(hiero_proto::services::MIRROR_SUBSCRIBE_TOPIC),
                        tonic::codec::ProstCodec::default(),
                    )
                    .await
                    .map(tonic::Response::into_inner)
                }
            };
            run_subscription(connect, query, max_attempts, token, on_message, on_error).await;
        })?;
        Ok(handle)
    }
}

fn timestamp_from_nanos(nanos: i64) -> hiero_proto::Timestamp {
    hiero_proto::Timestamp {
        seconds: nanos.div_euclid(1_000_000_000),
        nanos: nanos.rem_euclid(1_000_000_000) as i32,
    }
}

/// Saturates rather than overflowing: the timestamp comes off the wire.
fn nanos_from_timestamp(ts: hiero_proto::Timestamp) -> i64 {
    ts.seconds.saturating_mul(1_000_000_000).saturating_add(i64::from(ts.nanos))
}

/// Whether a dropped stream is worth reconnecting.
fn is_stream_retryable(status: &tonic::Status) -> bool {
    match status.code() {
        Code::NotFound | Code::Unavailable | Code::ResourceExhausted => true,
        Code::Internal => is_rst_stream(status.message()),
        _ => false,
    }
}

fn reconnect_delay(attempt: usize) -> Duration {
    let exponent = (attempt.saturating_sub(1)).min(31) as u32;
    BASE_RECONNECT_DELAY
        .saturating_mul(2u32.saturating_pow(exponent))
        .min(MAX_RECONNECT_DELAY)
}

/// Delivery bookkeeping shared across reconnects.
struct SubscriptionState {
    /// Consensus timestamp of the last delivered response.
    last_timestamp_nanos: Option<i64>,
    /// Responses delivered so far, chunks counted individually.
    delivered: u64,
    /// Chunks awaiting their siblings, keyed by the first chunk's
    /// transaction id.
    pending: HashMap<TransactionId, Vec<Option<hiero_proto::ConsensusTopicResponse>>>,
}

impl SubscriptionState {
    fn new() -> Self {
        Self { last_timestamp_nanos: None, delivered: 0, pending: HashMap::new() }
    }

    /// Folds one stream response in; returns the completed message, if
    /// this response completed one.
    fn apply(&mut self, response: hiero_proto::ConsensusTopicResponse) -> Option<TopicMessage> {
        self.delivered += 1;
        if let Some(ts) = response.consensus_timestamp {
            self.last_timestamp_nanos = Some(nanos_from_timestamp(ts));
        }

        let Some(chunk_info) = response.chunk_info else {
            return Some(single_message(response));
        };
        if chunk_info.total <= 1 {
            return Some(single_message(response));
        }

        let total = chunk_info.total as usize;
        let number = chunk_info.number as usize;
        if number == 0 || number > total {
            // Malformed chunk metadata; deliver as-is rather than lose it.
            return Some(single_message(response));
        }
        let key = chunk_info
            .initial_transaction_id
            .map(TransactionId::from_protobuf)
            .unwrap_or_default();

        let slots = self.pending.entry(key).or_insert_with(|| vec![None; total]);
        // The group was sized by its first-seen chunk; a sibling claiming a
        // different total contradicts it and cannot be placed.
        if number > slots.len() {
            return Some(single_message(response));
        }
        slots[number - 1] = Some(response);
        if slots.iter().any(Option::is_none) {
            return None;
        }

        let slots = self.pending.remove(&key)?;
        let mut contents = Vec::new();
        let mut last = None;
        for slot in slots.into_iter().flatten() {
            contents.extend_from_slice(&slot.message);
            last = Some(slot);
        }
        let last = last?;
        Some(TopicMessage {
            consensus_timestamp_nanos: last
                .consensus_timestamp
                .map(nanos_from_timestamp)
                .unwrap_or_default(),
            contents,
            running_hash: last.running_hash,
            sequence_number: last.sequence_number,
        })
    }

    /// The query to reconnect with: resume just past the last delivered
    /// timestamp, asking only for the remainder of the limit.
    fn resumed_query(
        &self,
        initial: &hiero_proto::ConsensusTopicQuery,
    ) -> hiero_proto::ConsensusTopicQuery {
        let mut query = *initial;
        if let Some(last) = self.last_timestamp_nanos {
            query.consensus_start_time = Some(timestamp_from_nanos(last.saturating_add(1)));
        }
        if initial.limit > 0 {
            query.limit = initial.limit.saturating_sub(self.delivered);
        }
        query
    }

    /// Whether the requested number of responses has been delivered.
    fn reached_limit(&self, initial: &hiero_proto::ConsensusTopicQuery) -> bool {
        initial.limit > 0 && self.delivered >= initial.limit
    }
}

fn single_message(response: hiero_proto::ConsensusTopicResponse) -> TopicMessage {
    TopicMessage {
        consensus_timestamp_nanos: response
            .consensus_timestamp
            .map(nanos_from_timestamp)
            .unwrap_or_default(),
        contents: response.message,
        running_hash: response.running_hash,
        sequence_number: response.sequence_number,
    }
}

/// The subscription loop, generic over how a stream is established so the
/// retry and reassembly behavior is independent of the transport.
async fn run_subscription<C, Fut, S, M, E>(
    mut connect: C,
    initial: hiero_proto::ConsensusTopicQuery,
    max_attempts: usize,
    token: CancellationToken,
    mut on_message: M,
    on_error: E,
) where
    C: FnMut(hiero_proto::ConsensusTopicQuery) -> Fut,
    Fut: Future<Output = std::result::Result<S, tonic::Status>>,
    S: Stream<Item = std::result::Result<hiero_proto::ConsensusTopicResponse, tonic::Status>>
        + Unpin,
    M: FnMut(TopicMessage),
    E: FnOnce(Error),
{
    let mut state = SubscriptionState::new();
    let mut attempt: usize = 0;

    loop {
        let query = state.resumed_query(&initial);
        let outcome = tokio::select! {
            biased;
            () = token.cancelled() => return,
            outcome = connect(query) => outcome,
        };

        let failure = match outcome {
            Ok(mut stream) => loop {
                let item = tokio::select! {
                    biased;
                    () = token.cancelled() => return,
                    item = stream.next() => item,
                };
                match item {
                    Some(Ok(response)) => {
                        // A live stream resets the reconnect budget.
                        attempt = 0;
                        if let Some(message) = state.apply(response) {
                            on_message(message);
                        }
                        if state.reached_limit(&initial) {
                            return;
                        }
                    }
                    Some(Err(status)) => break Some(status),
                    // The server completed the stream.
                    None => break None,
                }
            },
            Err(status) => Some(status),
        };

        let Some(status) = failure else { return };
        attempt += 1;
        if attempt >= max_attempts || !is_stream_retryable(&status) {
            if !token.is_cancelled() {
                on_error(status.into());
            }
            return;
        }
        tracing::debug!(
            code = ?status.code(),
            attempt,
            "topic subscription dropped, reconnecting"
        );
        tokio::select! {
            biased;
            () = token.cancelled() => return,
            () = tokio::time::sleep(reconnect_delay(attempt)) => {}
        }
    }
}
