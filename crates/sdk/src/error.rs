//! SDK error types with recovery context.
//!
//! The taxonomy mirrors how callers must react:
//! - **Parse/validation errors**: raised locally, never retried
//! - **Checksum errors**: an entity id does not belong to the target network
//! - **Precheck/receipt errors**: the network rejected the request's content
//! - **Transport/RPC errors**: transient node faults, retried by the engine
//! - **Attempts-exhausted and timeout**: liveness failures, distinct from
//!   semantic rejection

use snafu::{Location, Snafu};
use tonic::Code;

use crate::status::Status;
use crate::transaction_id::TransactionId;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SDK error types with context-rich error messages.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// Malformed entity-id or transaction-id string, or an invalid field
    /// value caught before submission.
    #[snafu(display("Parse error at {location}: {message}"))]
    BasicParse {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// An entity-id checksum does not match the client's ledger.
    #[snafu(display(
        "Checksum mismatch for {shard}.{realm}.{num}: expected {expected}, got {actual}"
    ))]
    BadEntityId {
        /// Shard part of the id.
        shard: u64,
        /// Realm part of the id.
        realm: u64,
        /// Entity number part of the id.
        num: u64,
        /// Checksum computed against the client's ledger id.
        expected: String,
        /// Checksum carried by the parsed string.
        actual: String,
    },

    /// The node rejected the request at precheck. Terminal.
    #[snafu(display("Precheck failed with status {status:?} for transaction {transaction_id:?}"))]
    Precheck {
        /// The precheck status code the node returned.
        status: Status,
        /// Id of the rejected transaction, when one was attached.
        transaction_id: Option<TransactionId>,
    },

    /// A receipt resolved to a failure status. Terminal.
    #[snafu(display("Receipt for transaction {transaction_id} has status {status:?}"))]
    ReceiptStatus {
        /// The receipt's final status code.
        status: Status,
        /// Id of the failed transaction.
        transaction_id: TransactionId,
    },

    /// Retries were exhausted without success or a terminal rejection.
    #[snafu(display("Exceeded maximum attempts ({attempts}): last error: {last_error}"))]
    MaxAttemptsExceeded {
        /// Number of attempts made.
        attempts: usize,
        /// Last error message before giving up.
        last_error: String,
    },

    /// The cost of a query exceeds the configured payment ceiling.
    #[snafu(display(
        "Query cost of {cost} tinybars exceeds max query payment of {max_query_payment} tinybars"
    ))]
    MaxQueryPaymentExceeded {
        /// Cost reported by the cost pre-check.
        cost: u64,
        /// Configured ceiling.
        max_query_payment: u64,
    },

    /// gRPC RPC error with status code.
    #[snafu(display("RPC error (code={code:?}): {message}"))]
    Rpc {
        /// gRPC status code.
        code: Code,
        /// Error message from server.
        message: String,
    },

    /// Transport-level error (HTTP/2, TLS).
    #[snafu(display("Transport error at {location}: {source}"))]
    Transport {
        /// Underlying transport error.
        source: tonic::transport::Error,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Failed to establish a connection to a node.
    #[snafu(display("Connection error at {location}: {message}"))]
    Connection {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// The overall execution deadline elapsed.
    #[snafu(display("Operation timed out after {duration_ms}ms"))]
    Timeout {
        /// Timeout duration in milliseconds.
        duration_ms: u64,
    },

    /// Execution was cancelled by the caller.
    #[snafu(display("Execution cancelled"))]
    Cancelled,

    /// Client or request configuration error.
    #[snafu(display("Configuration error: {message}"))]
    Config {
        /// Error description.
        message: String,
    },
}

impl Error {
    pub(crate) fn basic_parse(message: impl Into<String>) -> Self {
        Self::BasicParse {
            message: message.into(),
            location: Location::default(),
        }
    }

    /// Returns true if the error is transient and the engine may move to
    /// another node and try again.
    ///
    /// Retryable errors:
    /// - `UNAVAILABLE`: node temporarily unreachable
    /// - `RESOURCE_EXHAUSTED`: rate limited
    /// - `INTERNAL` carrying an HTTP/2 RST_STREAM message
    /// - Transport/connection errors
    ///
    /// `DEADLINE_EXCEEDED` is not retryable here: the engine surfaces it as
    /// a timeout because the per-call deadline is derived from the overall
    /// one.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Connection { .. } => true,
            Self::Rpc { code, message } => match code {
                Code::Unavailable | Code::ResourceExhausted => true,
                Code::Internal => is_rst_stream(message),
                _ => false,
            },
            _ => false,
        }
    }

    /// Returns the gRPC status code if this is an RPC error.
    #[must_use]
    pub fn code(&self) -> Option<Code> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Matches the HTTP/2 RST_STREAM diagnostics some nodes emit as `INTERNAL`,
/// i.e. the word pair "rst" / "stream" joined by a single non-alphanumeric
/// byte, case-insensitive.
pub(crate) fn is_rst_stream(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut search = 0;
    while let Some(pos) = lower[search..].find("rst") {
        let start = search + pos;
        let end = start + "rst".len();
        search = start + 1;
        // Word boundary before "rst".
        if start > 0 && bytes[start - 1].is_ascii_alphanumeric() {
            continue;
        }
        // Exactly one separator byte, then "stream" on a word boundary.
        let rest = &lower[end..];
        let mut chars = rest.char_indices();
        let Some((_, sep)) = chars.next() else { continue };
        if sep.is_ascii_alphanumeric() {
            continue;
        }
        let tail = &rest[sep.len_utf8()..];
        if let Some(after) = tail.strip_prefix("stream") {
            if after.as_bytes().first().map_or(true, |b| !b.is_ascii_alphanumeric()) {
                return true;
            }
        }
    }
    false
}

impl From<tonic::transport::Error> for Error {
    fn from(source: tonic::transport::Error) -> Self {
        Self::Transport {
            source,
            location: Location::default(),
        }
    }
}

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        Self::Rpc {
            code: status.code(),
            message: status.message().to_owned(),
        }
    }
}
