//! Query envelope, headers, and the responses the engine consumes.

use crate::basic::{AccountId, TransactionId};
use crate::transaction::Transaction;

/// What a query response should carry: the answer itself or only its cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ResponseType {
    AnswerOnly = 0,
    AnswerStateProof = 1,
    CostAnswer = 2,
    CostAnswerStateProof = 3,
}

/// Sent with every query: the payment transaction and the requested
/// response type.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryHeader {
    /// Transfer paying the query fee; absent for free queries and cost asks.
    #[prost(message, optional, tag = "1")]
    pub payment: Option<Transaction>,
    #[prost(enumeration = "ResponseType", tag = "2")]
    pub response_type: i32,
}

/// Returned with every query response.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ResponseHeader {
    /// Precheck result for the query itself.
    #[prost(int32, tag = "1")]
    pub node_transaction_precheck_code: i32,
    #[prost(enumeration = "ResponseType", tag = "2")]
    pub response_type: i32,
    /// Fee required for the query, answered when `COST_ANSWER` was asked.
    #[prost(uint64, tag = "3")]
    pub cost: u64,
}

/// The final disposition of a transaction, once known.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionReceipt {
    /// Consensus status; values are the response-code space mapped by the
    /// SDK's status type.
    #[prost(int32, tag = "1")]
    pub status: i32,
    /// For topic submissions, the topic's sequence number after the message.
    #[prost(uint64, tag = "2")]
    pub topic_sequence_number: u64,
    /// For topic submissions, the topic's running hash after the message.
    #[prost(bytes = "vec", tag = "3")]
    pub topic_running_hash: Vec<u8>,
}

/// Asks a node for the receipt of a recently submitted transaction.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionGetReceiptQuery {
    #[prost(message, optional, tag = "1")]
    pub header: Option<QueryHeader>,
    #[prost(message, optional, tag = "2")]
    pub transaction_id: Option<TransactionId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionGetReceiptResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(message, optional, tag = "2")]
    pub receipt: Option<TransactionReceipt>,
}

/// Asks a node for an account's balance. Free, so it doubles as the ping.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CryptoGetAccountBalanceQuery {
    #[prost(message, optional, tag = "1")]
    pub header: Option<QueryHeader>,
    #[prost(message, optional, tag = "2")]
    pub account_id: Option<AccountId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CryptoGetAccountBalanceResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
    #[prost(message, optional, tag = "2")]
    pub account_id: Option<AccountId>,
    /// Balance in tinybars.
    #[prost(uint64, tag = "3")]
    pub balance: u64,
}

/// The query envelope submitted to a node.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Query {
    #[prost(oneof = "query::Data", tags = "4, 5")]
    pub data: Option<query::Data>,
}

/// Nested message and enum types in `Query`.
pub mod query {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Data {
        #[prost(message, tag = "4")]
        TransactionGetReceipt(super::TransactionGetReceiptQuery),
        #[prost(message, tag = "5")]
        CryptogetAccountBalance(super::CryptoGetAccountBalanceQuery),
    }
}

/// The response envelope returned by a node.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    #[prost(oneof = "response::Data", tags = "4, 5")]
    pub data: Option<response::Data>,
}

/// Nested message and enum types in `Response`.
pub mod response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Data {
        #[prost(message, tag = "4")]
        TransactionGetReceipt(super::TransactionGetReceiptResponse),
        #[prost(message, tag = "5")]
        CryptogetAccountBalance(super::CryptoGetAccountBalanceResponse),
    }
}

impl Response {
    /// The response header, whichever variant is present.
    pub fn header(&self) -> Option<&ResponseHeader> {
        match &self.data {
            Some(response::Data::TransactionGetReceipt(r)) => r.header.as_ref(),
            Some(response::Data::CryptogetAccountBalance(r)) => r.header.as_ref(),
            None => None,
        }
    }
}
