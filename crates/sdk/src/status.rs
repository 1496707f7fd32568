//! Precheck/receipt status codes and the engine's attempt classification.

/// Application-level status codes returned in prechecks and receipts.
///
/// Values are the response-code space carried on the wire; codes this crate
/// does not name are preserved in [`Status::Unrecognized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The transaction passed the precheck validations.
    Ok,
    /// Catch-all for errors without a specific code.
    InvalidTransaction,
    /// Payer account does not exist.
    PayerAccountNotFound,
    /// Node account in the body does not match the node actually reached.
    InvalidNodeAccount,
    /// The validity window ended before consensus.
    TransactionExpired,
    /// Transaction start time is in the future.
    InvalidTransactionStart,
    /// The transaction signature is not valid.
    InvalidSignature,
    /// The offered fee is insufficient for this transaction type.
    InsufficientTxFee,
    /// The payer cannot cover the transaction fee.
    InsufficientPayerBalance,
    /// Duplicate of a transaction submitted within the receipt period.
    DuplicateTransaction,
    /// The node is throttled; try again shortly.
    Busy,
    /// The transaction id is malformed or unknown.
    InvalidTransactionId,
    /// No receipt is (yet) available for the queried transaction.
    ReceiptNotFound,
    /// No record is (yet) available for the queried transaction.
    RecordNotFound,
    /// The transaction's outcome is not yet known.
    Unknown,
    /// The transaction reached consensus and succeeded.
    Success,
    /// The serialized transaction exceeds the node's message limit.
    TransactionOversize,
    /// The consensus platform on the node is not accepting work.
    PlatformNotActive,
    /// The node accepted the submission but the platform dropped it.
    PlatformTransactionNotCreated,
    /// The referenced account has been deleted.
    AccountDeleted,
    /// The referenced file has been deleted.
    FileDeleted,
    /// A code this crate does not name.
    Unrecognized(i32),
}

impl Status {
    /// Maps a wire response code to a status.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::InvalidTransaction,
            2 => Self::PayerAccountNotFound,
            3 => Self::InvalidNodeAccount,
            4 => Self::TransactionExpired,
            5 => Self::InvalidTransactionStart,
            7 => Self::InvalidSignature,
            9 => Self::InsufficientTxFee,
            10 => Self::InsufficientPayerBalance,
            11 => Self::DuplicateTransaction,
            12 => Self::Busy,
            17 => Self::InvalidTransactionId,
            18 => Self::ReceiptNotFound,
            19 => Self::RecordNotFound,
            21 => Self::Unknown,
            22 => Self::Success,
            64 => Self::TransactionOversize,
            67 => Self::PlatformNotActive,
            69 => Self::PlatformTransactionNotCreated,
            72 => Self::AccountDeleted,
            73 => Self::FileDeleted,
            other => Self::Unrecognized(other),
        }
    }

    /// The wire response code for this status.
    pub fn to_code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::InvalidTransaction => 1,
            Self::PayerAccountNotFound => 2,
            Self::InvalidNodeAccount => 3,
            Self::TransactionExpired => 4,
            Self::InvalidTransactionStart => 5,
            Self::InvalidSignature => 7,
            Self::InsufficientTxFee => 9,
            Self::InsufficientPayerBalance => 10,
            Self::DuplicateTransaction => 11,
            Self::Busy => 12,
            Self::InvalidTransactionId => 17,
            Self::ReceiptNotFound => 18,
            Self::RecordNotFound => 19,
            Self::Unknown => 21,
            Self::Success => 22,
            Self::TransactionOversize => 64,
            Self::PlatformNotActive => 67,
            Self::PlatformTransactionNotCreated => 69,
            Self::AccountDeleted => 72,
            Self::FileDeleted => 73,
            Self::Unrecognized(code) => code,
        }
    }
}

/// The engine's classification of one completed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// The attempt succeeded; map and return the response.
    Success,
    /// Transient condition on this node; retry without moving the cursor.
    Retry,
    /// The node itself is at fault; mark it failed and advance the cursor.
    ServerError,
    /// The request content was rejected; terminal, surfaced to the caller.
    RequestError,
}

/// Default precheck-status classification shared by transactions and queries.
///
/// Receipt-style queries additionally treat not-yet-available statuses as
/// [`ExecutionState::Retry`]; they override this per operation.
pub(crate) fn default_execution_state(status: Status) -> ExecutionState {
    match status {
        Status::Ok => ExecutionState::Success,
        Status::Busy | Status::InvalidNodeAccount => ExecutionState::Retry,
        Status::PlatformTransactionNotCreated | Status::PlatformNotActive => {
            ExecutionState::ServerError
        }
        _ => ExecutionState::RequestError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for code in [0, 3, 12, 18, 21, 22, 67, 69, 72, 9999] {
            assert_eq!(Status::from_code(code).to_code(), code);
        }
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(default_execution_state(Status::Ok), ExecutionState::Success);
        assert_eq!(default_execution_state(Status::Busy), ExecutionState::Retry);
        assert_eq!(
            default_execution_state(Status::InvalidNodeAccount),
            ExecutionState::Retry
        );
        assert_eq!(
            default_execution_state(Status::PlatformTransactionNotCreated),
            ExecutionState::ServerError
        );
        assert_eq!(
            default_execution_state(Status::PlatformNotActive),
            ExecutionState::ServerError
        );
        assert_eq!(
            default_execution_state(Status::AccountDeleted),
            ExecutionState::RequestError
        );
        assert_eq!(
            default_execution_state(Status::InsufficientTxFee),
            ExecutionState::RequestError
        );
        assert_eq!(
            default_execution_state(Status::Unrecognized(1234)),
            ExecutionState::RequestError
        );
    }
}
