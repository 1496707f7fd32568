//! Mirror-node topic subscription messages.

use crate::basic::{Timestamp, TopicId, TransactionId};

/// Position of one transaction within a message split across several.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ConsensusMessageChunkInfo {
    /// Transaction id of the first chunk; keys reassembly.
    #[prost(message, optional, tag = "1")]
    pub initial_transaction_id: Option<TransactionId>,
    #[prost(int32, tag = "2")]
    pub total: i32,
    /// 1-based chunk number.
    #[prost(int32, tag = "3")]
    pub number: i32,
}

/// Subscribes to a topic's message stream.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ConsensusTopicQuery {
    #[prost(message, optional, tag = "1")]
    pub topic_id: Option<TopicId>,
    /// Inclusive lower bound on consensus timestamps; epoch if absent.
    #[prost(message, optional, tag = "2")]
    pub consensus_start_time: Option<Timestamp>,
    /// Exclusive upper bound; unbounded if absent.
    #[prost(message, optional, tag = "3")]
    pub consensus_end_time: Option<Timestamp>,
    /// Maximum number of messages to deliver; 0 means unlimited.
    #[prost(uint64, tag = "4")]
    pub limit: u64,
}

/// One message (or one chunk of one) pushed by the mirror node.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConsensusTopicResponse {
    #[prost(message, optional, tag = "1")]
    pub consensus_timestamp: Option<Timestamp>,
    #[prost(bytes = "vec", tag = "2")]
    pub message: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub running_hash: Vec<u8>,
    #[prost(uint64, tag = "4")]
    pub sequence_number: u64,
    #[prost(uint64, tag = "5")]
    pub running_hash_version: u64,
    #[prost(message, optional, tag = "6")]
    pub chunk_info: Option<ConsensusMessageChunkInfo>,
}
