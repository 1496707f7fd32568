//! gRPC method paths for the services the SDK calls.
//!
//! Calls go through `tonic::client::Grpc` directly, so each method is a
//! path constant rather than a generated client.

/// `CryptoService` transfer submission.
pub const CRYPTO_TRANSFER: &str = "/proto.CryptoService/cryptoTransfer";

/// `CryptoService` balance query (also the health-probe ping).
pub const CRYPTO_GET_BALANCE: &str = "/proto.CryptoService/cryptoGetBalance";

/// `CryptoService` receipt query.
pub const GET_TRANSACTION_RECEIPTS: &str = "/proto.CryptoService/getTransactionReceipts";

/// `ConsensusService` topic message submission.
pub const CONSENSUS_SUBMIT_MESSAGE: &str = "/proto.ConsensusService/submitMessage";

/// Mirror-node server-streamed topic subscription.
pub const MIRROR_SUBSCRIBE_TOPIC: &str =
    "/com.hedera.mirror.api.proto.ConsensusService/subscribeTopic";
