//! Transaction envelope, body, and submit-acknowledgement messages.

use crate::basic::{AccountId, SignatureMap, TimestampSeconds, TopicId, TransactionId};

/// The outer transaction envelope submitted to a node.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Transaction {
    /// Serialized [`SignedTransaction`].
    #[prost(bytes = "vec", tag = "5")]
    pub signed_transaction_bytes: Vec<u8>,
}

/// A serialized transaction body plus the signatures over those exact bytes.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedTransaction {
    /// Serialized [`TransactionBody`].
    #[prost(bytes = "vec", tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub sig_map: Option<SignatureMap>,
}

/// The signed content of a transaction. The target node's account id is
/// embedded here, which is why every (node, chunk) pair has distinct bytes.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionBody {
    #[prost(message, optional, tag = "1")]
    pub transaction_id: Option<TransactionId>,
    /// Account of the node the transaction is submitted to.
    #[prost(message, optional, tag = "2")]
    pub node_account_id: Option<AccountId>,
    /// Maximum fee the payer is willing to pay, in tinybars.
    #[prost(uint64, tag = "3")]
    pub transaction_fee: u64,
    /// How long past `transaction_id.transaction_valid_start` the
    /// transaction remains valid.
    #[prost(message, optional, tag = "4")]
    pub transaction_valid_duration: Option<TimestampSeconds>,
    #[prost(string, tag = "6")]
    pub memo: String,
    #[prost(oneof = "transaction_body::Data", tags = "14, 27")]
    pub data: Option<transaction_body::Data>,
}

/// Nested message and enum types in `TransactionBody`.
pub mod transaction_body {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Data {
        #[prost(message, tag = "14")]
        CryptoTransfer(super::CryptoTransferTransactionBody),
        #[prost(message, tag = "27")]
        ConsensusSubmitMessage(super::ConsensusSubmitMessageTransactionBody),
    }
}

/// One account's balance adjustment within a transfer.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AccountAmount {
    #[prost(message, optional, tag = "1")]
    pub account_id: Option<AccountId>,
    /// Amount in tinybars; negative debits, positive credits.
    #[prost(int64, tag = "2")]
    pub amount: i64,
}

/// An ordered list of balance adjustments that must net to zero.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransferList {
    #[prost(message, repeated, tag = "1")]
    pub account_amounts: Vec<AccountAmount>,
}

/// Moves tinybars between accounts.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CryptoTransferTransactionBody {
    #[prost(message, optional, tag = "1")]
    pub transfers: Option<TransferList>,
}

/// Appends a message (or one chunk of one) to a consensus topic.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConsensusSubmitMessageTransactionBody {
    #[prost(message, optional, tag = "1")]
    pub topic_id: Option<TopicId>,
    #[prost(bytes = "vec", tag = "2")]
    pub message: Vec<u8>,
    /// Present only when the message is split across multiple transactions.
    #[prost(message, optional, tag = "3")]
    pub chunk_info: Option<crate::mirror::ConsensusMessageChunkInfo>,
}

/// A node's synchronous acknowledgement of a submitted transaction.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct TransactionResponse {
    /// Precheck result; values are the response-code space mapped by the
    /// SDK's status type.
    #[prost(int32, tag = "1")]
    pub node_transaction_precheck_code: i32,
    /// When the precheck failed for fee reasons, the required fee.
    #[prost(uint64, tag = "2")]
    pub cost: u64,
}
