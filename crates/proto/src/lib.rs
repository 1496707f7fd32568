//! Wire message types for the Hiero ledger SDK.
//!
//! This crate provides:
//! - Hand-authored protobuf message types ([`basic`], [`transaction`],
//!   [`query`], [`mirror`]) covering the subset of the wire schema the
//!   request engine exercises
//! - gRPC method paths for the consensus, crypto, and mirror services
//!   ([`services`])
//!
//! # Architecture
//!
//! Messages are written directly with `prost` derives instead of build-time
//! codegen, so the workspace builds without `protoc`. Field tags match the
//! network schema; unary and streaming calls are issued through
//! `tonic::client::Grpc` against the paths in [`services`].

#![deny(unsafe_code)]
// gRPC calls return tonic::Status (176 bytes) - standard practice for gRPC error handling
#![allow(clippy::result_large_err)]

pub mod basic;
pub mod mirror;
pub mod query;
pub mod services;
pub mod transaction;

pub use basic::{
    AccountId, SignatureMap, SignaturePair, Timestamp, TimestampSeconds, TopicId, TransactionId,
};
pub use mirror::{ConsensusMessageChunkInfo, ConsensusTopicQuery, ConsensusTopicResponse};
pub use query::{
    CryptoGetAccountBalanceQuery, CryptoGetAccountBalanceResponse, Query, QueryHeader, Response,
    ResponseHeader, ResponseType, TransactionGetReceiptQuery, TransactionGetReceiptResponse,
    TransactionReceipt,
};
pub use transaction::{
    AccountAmount, ConsensusSubmitMessageTransactionBody, CryptoTransferTransactionBody,
    SignedTransaction, Transaction, TransactionBody, TransactionResponse, TransferList,
};
