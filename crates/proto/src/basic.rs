//! Shared primitive messages: timestamps, entity ids, and signatures.

/// An exact date and time, with nanosecond precision.
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct Timestamp {
    /// Number of complete seconds since the epoch.
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    /// Number of nanoseconds since the start of the last second.
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

/// A length of time in whole seconds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct TimestampSeconds {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
}

/// The id of a ledger account, in `shard.realm.num` form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct AccountId {
    #[prost(int64, tag = "1")]
    pub shard_num: i64,
    #[prost(int64, tag = "2")]
    pub realm_num: i64,
    #[prost(int64, tag = "3")]
    pub account_num: i64,
}

/// The id of a consensus topic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct TopicId {
    #[prost(int64, tag = "1")]
    pub shard_num: i64,
    #[prost(int64, tag = "2")]
    pub realm_num: i64,
    #[prost(int64, tag = "3")]
    pub topic_num: i64,
}

/// The unique identity of a transaction: the paying account plus the start
/// of its validity window, with optional scheduled/nonce discriminators.
#[derive(Clone, Copy, PartialEq, Eq, Hash, ::prost::Message)]
pub struct TransactionId {
    #[prost(message, optional, tag = "1")]
    pub transaction_valid_start: Option<Timestamp>,
    #[prost(message, optional, tag = "2")]
    pub account_id: Option<AccountId>,
    /// Whether this id refers to the scheduled execution of a transaction.
    #[prost(bool, tag = "3")]
    pub scheduled: bool,
    #[prost(int32, tag = "4")]
    pub nonce: i32,
}

/// A public-key prefix paired with the signature that key produced.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignaturePair {
    /// Prefix (or entirety) of the signing public key's bytes.
    #[prost(bytes = "vec", tag = "1")]
    pub pub_key_prefix: Vec<u8>,
    #[prost(oneof = "signature_pair::Signature", tags = "2, 3")]
    pub signature: Option<signature_pair::Signature>,
}

/// Nested message and enum types in `SignaturePair`.
pub mod signature_pair {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Signature {
        #[prost(bytes, tag = "2")]
        Ed25519(Vec<u8>),
        #[prost(bytes, tag = "3")]
        EcdsaSecp256k1(Vec<u8>),
    }
}

/// The set of signatures over one signed transaction body.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignatureMap {
    #[prost(message, repeated, tag = "1")]
    pub sig_pair: Vec<SignaturePair>,
}
