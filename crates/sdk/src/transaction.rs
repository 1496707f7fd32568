//! Transaction construction, freezing, chunking, and the signature matrix.
//!
//! A transaction is built mutably, then frozen against a client. Freezing
//! resolves the payer id, the candidate node set, and the per-(node, chunk)
//! body bytes; only a [`FrozenTransaction`] can be signed or executed, so
//! post-freeze mutation is unrepresentable rather than checked at runtime.
//!
//! Because the target node's account id is embedded in the signed body,
//! every (node, chunk) pair has distinct bytes and therefore a distinct
//! signature slot. Chunked operations split their payload into
//! `ceil(len / chunk_size)` chunks, each a self-contained transaction whose
//! id is derived from the initial id by a fixed nanosecond offset.

use std::collections::HashMap;
use std::time::Duration;

use prost::Message as _;
use sha2::{Digest, Sha384};

use crate::client::Client;
use crate::entity_id::{AccountId, TopicId};
use crate::error::{Error, Result};
use crate::execute::Execute;
use crate::key::{PublicKey, Signer};
use crate::query::TransactionReceipt;
use crate::status::Status;
use crate::transaction_id::TransactionId;

/// Default validity window for a transaction.
const DEFAULT_VALID_DURATION: Duration = Duration::from_secs(120);

/// Default payload bytes per chunk of a chunked transaction.
const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default cap on the number of chunks a message may split into.
const DEFAULT_MAX_CHUNKS: usize = 20;

/// Operation-specific payload of a transaction.
///
/// Implementations describe which gRPC method carries them and how they
/// serialize into a transaction body, given the chunk being built. Most
/// operations ignore the chunk context; chunked ones slice their payload
/// by it.
pub trait TransactionData: Clone + Send + Sync {
    /// The gRPC method this transaction is submitted to.
    fn method_path(&self) -> &'static str;

    /// The chunking parameters, for operations that split their payload.
    fn chunk_data(&self) -> Option<&ChunkData> {
        None
    }

    /// Serializes this payload into the body's data field.
    fn to_body_data(&self, chunk: &ChunkContext) -> hiero_proto::transaction::transaction_body::Data;
}

/// Payload and limits of a chunked transaction.
#[derive(Debug, Clone)]
pub struct ChunkData {
    /// The full message to split.
    pub message: Vec<u8>,
    /// Payload bytes per chunk.
    pub chunk_size: usize,
    /// Cap on the chunk count; exceeding it fails at freeze time, before
    /// any network traffic.
    pub max_chunks: usize,
}

impl ChunkData {
    /// Number of chunks the message splits into. An empty message still
    /// occupies one chunk.
    pub(crate) fn chunk_count(&self) -> usize {
        self.message.len().div_ceil(self.chunk_size).max(1)
    }

    /// The payload slice of the given zero-based chunk.
    pub(crate) fn message_chunk(&self, index: usize) -> &[u8] {
        let start = (index * self.chunk_size).min(self.message.len());
        let end = (start + self.chunk_size).min(self.message.len());
        &self.message[start..end]
    }
}

/// The chunk a body is being built for.
pub struct ChunkContext {
    /// Id of the first chunk's transaction; chunks of one message are
    /// correlated through it.
    pub initial_transaction_id: TransactionId,
    /// Total number of chunks.
    pub total: usize,
    /// One-based index of this chunk.
    pub number: usize,
}

/// A transaction under construction. Freeze it to sign and execute.
#[derive(Debug, Clone)]
pub struct Transaction<D: TransactionData> {
    data: D,
    node_account_ids: Option<Vec<AccountId>>,
    transaction_id: Option<TransactionId>,
    max_transaction_fee: Option<u64>,
    transaction_valid_duration: Duration,
    memo: String,
}

impl<D: TransactionData> Transaction<D> {
    fn from_data(data: D) -> Self {
        Self {
            data,
            node_account_ids: None,
            transaction_id: None,
            max_transaction_fee: None,
            transaction_valid_duration: DEFAULT_VALID_DURATION,
            memo: String::new(),
        }
    }

    /// Pins the candidate nodes this transaction may be submitted to, in
    /// submission priority order.
    #[must_use]
    pub fn with_node_account_ids(mut self, node_account_ids: Vec<AccountId>) -> Self {
        self.node_account_ids = Some(node_account_ids);
        self
    }

    /// Sets an explicit transaction id instead of generating one from the
    /// operator at freeze time.
    #[must_use]
    pub fn with_transaction_id(mut self, transaction_id: TransactionId) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    /// Sets the fee ceiling for this transaction, in tinybars.
    #[must_use]
    pub fn with_max_transaction_fee(mut self, fee: u64) -> Self {
        self.max_transaction_fee = Some(fee);
        self
    }

    /// Sets the validity window measured from the transaction id's
    /// valid-start.
    #[must_use]
    pub fn with_transaction_valid_duration(mut self, duration: Duration) -> Self {
        self.transaction_valid_duration = duration;
        self
    }

    /// Sets the transaction memo.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Freezes the transaction against a client: resolves the transaction
    /// id, node set, and fee, splits chunked payloads, and serializes the
    /// body bytes for every (node, chunk) pair.
    pub fn freeze_with(self, client: &Client) -> Result<FrozenTransaction<D>> {
        let initial_id = match self.transaction_id {
            Some(id) => id,
            None => {
                let operator = client.operator().ok_or_else(|| Error::Config {
                    message: "transaction requires an explicit transaction id or a client operator"
                        .to_owned(),
                })?;
                TransactionId::generate(operator.account_id)
            }
        };

        let node_account_ids = match self.node_account_ids {
            Some(ids) if !ids.is_empty() => ids,
            Some(_) => {
                return Err(Error::Config {
                    message: "transaction node account id list is empty".to_owned(),
                })
            }
            None => client.network().node_account_ids_for_execute(),
        };
        if node_account_ids.is_empty() {
            return Err(Error::Config { message: "client network has no nodes".to_owned() });
        }

        let chunk_count = match self.data.chunk_data() {
            Some(chunk_data) => {
                let count = chunk_data.chunk_count();
                if count > chunk_data.max_chunks {
                    return Err(Error::Config {
                        message: format!(
                            "message of {} bytes would need {count} chunks, over the limit of {}",
                            chunk_data.message.len(),
                            chunk_data.max_chunks
                        ),
                    });
                }
                count
            }
            None => 1,
        };

        let fee = self.max_transaction_fee.unwrap_or_else(|| client.max_transaction_fee());

        let chunk_transaction_ids: Vec<TransactionId> =
            (0..chunk_count).map(|i| initial_id.offset_nanos(i as i64)).collect();

        let mut body_bytes = Vec::with_capacity(chunk_count);
        let mut signatures = HashMap::new();
        for (chunk_index, chunk_id) in chunk_transaction_ids.iter().enumerate() {
            let context = ChunkContext {
                initial_transaction_id: initial_id,
                total: chunk_count,
                number: chunk_index + 1,
            };
            let data = self.data.to_body_data(&context);
            let mut per_node = Vec::with_capacity(node_account_ids.len());
            for node_account_id in &node_account_ids {
                let body = hiero_proto::TransactionBody {
                    transaction_id: Some(chunk_id.to_protobuf()),
                    node_account_id: Some(node_account_id.to_protobuf()),
                    transaction_fee: fee,
                    transaction_valid_duration: Some(hiero_proto::TimestampSeconds {
                        seconds: self.transaction_valid_duration.as_secs() as i64,
                    }),
                    memo: self.memo.clone(),
                    data: Some(data.clone()),
                };
                per_node.push(body.encode_to_vec());
                signatures.insert((*node_account_id, *chunk_id), Vec::new());
            }
            body_bytes.push(per_node);
        }

        Ok(FrozenTransaction {
            data: self.data,
            node_account_ids,
            chunk_transaction_ids,
            body_bytes,
            signatures,
        })
    }
}

/// One signable body: the exact bytes a signature for the given
/// (node, transaction) pair must cover.
#[derive(Debug, Clone)]
pub struct SignableNodeBodyBytes {
    /// Node the body targets.
    pub node_account_id: AccountId,
    /// Id of the chunk transaction the body belongs to.
    pub transaction_id: TransactionId,
    /// Serialized transaction body.
    pub body_bytes: Vec<u8>,
}

/// A frozen transaction: bodies are fixed, signatures accumulate.
pub struct FrozenTransaction<D: TransactionData> {
    data: D,
    node_account_ids: Vec<AccountId>,
    chunk_transaction_ids: Vec<TransactionId>,
    /// Serialized bodies indexed `[chunk][node]`, aligned with
    /// `chunk_transaction_ids` and `node_account_ids`.
    body_bytes: Vec<Vec<Vec<u8>>>,
    /// Collected signatures per (node, chunk-transaction) pair. Every valid
    /// pair has an entry from freeze time; anything else is unknown.
    signatures: HashMap<(AccountId, TransactionId), Vec<(PublicKey, Vec<u8>)>>,
}

impl<D: TransactionData> FrozenTransaction<D> {
    /// The candidate nodes, in submission priority order.
    #[must_use]
    pub fn node_account_ids(&self) -> &[AccountId] {
        &self.node_account_ids
    }

    /// The first (or only) chunk's transaction id.
    #[must_use]
    pub fn transaction_id(&self) -> TransactionId {
        self.chunk_transaction_ids[0]
    }

    /// Number of chunk transactions this submission consists of.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunk_transaction_ids.len()
    }

    /// Signs every (node, chunk) body with the given signer.
    #[must_use]
    pub fn sign(mut self, signer: &dyn Signer) -> Self {
        let public_key = signer.public_key();
        for (chunk_index, chunk_id) in self.chunk_transaction_ids.iter().enumerate() {
            for (node_index, node_account_id) in self.node_account_ids.iter().enumerate() {
                let body = &self.body_bytes[chunk_index][node_index];
                let signature = signer.sign(body);
                if let Some(entries) = self.signatures.get_mut(&(*node_account_id, *chunk_id)) {
                    if !entries.iter().any(|(key, _)| *key == public_key) {
                        entries.push((public_key, signature));
                    }
                }
            }
        }
        self
    }

    /// Signs with the client's operator.
    pub fn sign_with_operator(self, client: &Client) -> Result<Self> {
        let operator = client.operator().ok_or_else(|| Error::Config {
            message: "client has no operator to sign with".to_owned(),
        })?;
        Ok(self.sign(operator.signer.as_ref()))
    }

    /// Records an externally produced signature for one
    /// (node, transaction) pair.
    ///
    /// Adding the same public key to a pair twice keeps the first
    /// signature; a pair this transaction does not contain is ignored.
    #[must_use]
    pub fn add_signature(
        mut self,
        node_account_id: AccountId,
        transaction_id: TransactionId,
        public_key: PublicKey,
        signature: Vec<u8>,
    ) -> Self {
        if let Some(entries) = self.signatures.get_mut(&(node_account_id, transaction_id)) {
            if !entries.iter().any(|(key, _)| *key == public_key) {
                entries.push((public_key, signature));
            }
        }
        self
    }

    /// Every signable body, one per (node, chunk) pair, chunk-major.
    ///
    /// External signers sign these bytes and feed the results back through
    /// [`FrozenTransaction::add_signature`].
    #[must_use]
    pub fn signable_node_body_bytes_list(&self) -> Vec<SignableNodeBodyBytes> {
        let mut list =
            Vec::with_capacity(self.chunk_transaction_ids.len() * self.node_account_ids.len());
        for (chunk_index, chunk_id) in self.chunk_transaction_ids.iter().enumerate() {
            for (node_index, node_account_id) in self.node_account_ids.iter().enumerate() {
                list.push(SignableNodeBodyBytes {
                    node_account_id: *node_account_id,
                    transaction_id: *chunk_id,
                    body_bytes: self.body_bytes[chunk_index][node_index].clone(),
                });
            }
        }
        list
    }

    /// SHA-384 hash of the first chunk's wire envelope, per node. The hash
    /// covers the bytes actually submitted, signatures included.
    pub fn transaction_hash_per_node(&self) -> Result<HashMap<AccountId, Vec<u8>>> {
        let mut hashes = HashMap::with_capacity(self.node_account_ids.len());
        for node_account_id in &self.node_account_ids {
            let envelope = self.wire_transaction(0, *node_account_id)?;
            hashes.insert(*node_account_id, Sha384::digest(envelope.encode_to_vec()).to_vec());
        }
        Ok(hashes)
    }

    /// Assembles the wire envelope for one (chunk, node) pair.
    fn wire_transaction(
        &self,
        chunk_index: usize,
        node_account_id: AccountId,
    ) -> Result<hiero_proto::Transaction> {
        let node_index = self
            .node_account_ids
            .iter()
            .position(|id| *id == node_account_id)
            .ok_or_else(|| Error::Config {
                message: format!("node {node_account_id} is not a candidate for this transaction"),
            })?;
        let chunk_id = self.chunk_transaction_ids[chunk_index];
        let sig_pair = self
            .signatures
            .get(&(node_account_id, chunk_id))
            .map(|entries| {
                entries
                    .iter()
                    .map(|(key, signature)| key.to_signature_pair(signature.clone()))
                    .collect()
            })
            .unwrap_or_default();
        let signed = hiero_proto::SignedTransaction {
            body_bytes: self.body_bytes[chunk_index][node_index].clone(),
            sig_map: Some(hiero_proto::SignatureMap { sig_pair }),
        };
        Ok(hiero_proto::Transaction { signed_transaction_bytes: signed.encode_to_vec() })
    }

    /// Submits every chunk in order and returns the first chunk's
    /// acknowledgement.
    pub async fn execute(&self, client: &Client) -> Result<TransactionResponse> {
        let responses = self.execute_all(client).await?;
        // Freezing guarantees at least one chunk.
        responses.into_iter().next().ok_or_else(|| Error::Config {
            message: "transaction has no chunks".to_owned(),
        })
    }

    /// Submits every chunk in order and returns all acknowledgements.
    ///
    /// Chunks are sequential: a chunk is submitted only after the previous
    /// one was accepted, so consensus order matches chunk order.
    pub async fn execute_all(&self, client: &Client) -> Result<Vec<TransactionResponse>> {
        let mut responses = Vec::with_capacity(self.chunk_transaction_ids.len());
        for chunk_index in 0..self.chunk_transaction_ids.len() {
            let response =
                client.execute(&ChunkSubmit { transaction: self, chunk_index }, None).await?;
            responses.push(response);
        }
        Ok(responses)
    }

    /// Blocking form of [`FrozenTransaction::execute`].
    pub fn execute_blocking(&self, client: &Client) -> Result<TransactionResponse> {
        client.block_on(self.execute(client))?
    }
}

impl<D: TransactionData> std::fmt::Debug for FrozenTransaction<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrozenTransaction")
            .field("node_account_ids", &self.node_account_ids)
            .field("chunk_transaction_ids", &self.chunk_transaction_ids)
            .finish_non_exhaustive()
    }
}

/// One chunk's trip through the execution engine.
struct ChunkSubmit<'a, D: TransactionData> {
    transaction: &'a FrozenTransaction<D>,
    chunk_index: usize,
}

impl<D: TransactionData> Execute for ChunkSubmit<'_, D> {
    type GrpcRequest = hiero_proto::Transaction;
    type GrpcResponse = hiero_proto::TransactionResponse;
    type Output = TransactionResponse;

    fn node_account_ids(&self) -> Option<Vec<AccountId>> {
        Some(self.transaction.node_account_ids.clone())
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        Some(self.transaction.chunk_transaction_ids[self.chunk_index])
    }

    fn method_path(&self) -> &'static str {
        self.transaction.data.method_path()
    }

    fn make_request(&self, node_account_id: AccountId) -> Result<Self::GrpcRequest> {
        self.transaction.wire_transaction(self.chunk_index, node_account_id)
    }

    fn response_status(&self, response: &Self::GrpcResponse) -> Status {
        Status::from_code(response.node_transaction_precheck_code)
    }

    fn map_response(
        &self,
        _response: Self::GrpcResponse,
        node_account_id: AccountId,
        request: &Self::GrpcRequest,
    ) -> Result<Self::Output> {
        Ok(TransactionResponse {
            node_account_id,
            transaction_id: self.transaction.chunk_transaction_ids[self.chunk_index],
            transaction_hash: Sha384::digest(request.encode_to_vec()).to_vec(),
        })
    }
}

/// A node's acknowledgement of one accepted chunk transaction.
#[derive(Debug, Clone)]
pub struct TransactionResponse {
    /// Node that accepted the transaction.
    pub node_account_id: AccountId,
    /// Id of the accepted chunk transaction.
    pub transaction_id: TransactionId,
    /// SHA-384 hash of the submitted wire bytes.
    pub transaction_hash: Vec<u8>,
}

impl TransactionResponse {
    /// Polls for this transaction's receipt and fails with the receipt's
    /// status when consensus rejected it.
    pub async fn get_receipt(&self, client: &Client) -> Result<TransactionReceipt> {
        let receipt = crate::query::TransactionReceiptQuery::new(self.transaction_id)
            .with_node_account_ids(vec![self.node_account_id])
            .execute(client)
            .await?;
        if receipt.status != Status::Success {
            return Err(Error::ReceiptStatus {
                status: receipt.status,
                transaction_id: self.transaction_id,
            });
        }
        Ok(receipt)
    }

    /// Blocking form of [`TransactionResponse::get_receipt`].
    pub fn get_receipt_blocking(&self, client: &Client) -> Result<TransactionReceipt> {
        client.block_on(self.get_receipt(client))?
    }
}

/// Payload of a [`TransferTransaction`].
#[derive(Debug, Clone, Default)]
pub struct TransferData {
    transfers: Vec<(AccountId, i64)>,
}

impl TransactionData for TransferData {
    fn method_path(&self) -> &'static str {
        hiero_proto::services::CRYPTO_TRANSFER
    }

    fn to_body_data(
        &self,
        _chunk: &ChunkContext,
    ) -> hiero_proto::transaction::transaction_body::Data {
        hiero_proto::transaction::transaction_body::Data::CryptoTransfer(
            hiero_proto::CryptoTransferTransactionBody {
                transfers: Some(hiero_proto::TransferList {
                    account_amounts: self
                        .transfers
                        .iter()
                        .map(|(account_id, amount)| hiero_proto::AccountAmount {
                            account_id: Some(account_id.to_protobuf()),
                            amount: *amount,
                        })
                        .collect(),
                }),
            },
        )
    }
}

/// Moves tinybars between accounts. Adjustments must net to zero.
pub type TransferTransaction = Transaction<TransferData>;

impl TransferTransaction {
    /// An empty transfer.
    #[must_use]
    pub fn new() -> Self {
        Self::from_data(TransferData::default())
    }

    /// Adds a balance adjustment; negative amounts debit, positive credit.
    #[must_use]
    pub fn add_hbar_transfer(mut self, account_id: AccountId, amount: i64) -> Self {
        self.data.transfers.push((account_id, amount));
        self
    }
}

impl Default for TransferTransaction {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload of a [`TopicMessageSubmitTransaction`].
#[derive(Debug, Clone)]
pub struct TopicMessageSubmitData {
    topic_id: Option<TopicId>,
    chunk_data: ChunkData,
}

impl TransactionData for TopicMessageSubmitData {
    fn method_path(&self) -> &'static str {
        hiero_proto::services::CONSENSUS_SUBMIT_MESSAGE
    }

    fn chunk_data(&self) -> Option<&ChunkData> {
        Some(&self.chunk_data)
    }

    fn to_body_data(
        &self,
        chunk: &ChunkContext,
    ) -> hiero_proto::transaction::transaction_body::Data {
        let chunk_info = (chunk.total > 1).then(|| hiero_proto::ConsensusMessageChunkInfo {
            initial_transaction_id: Some(chunk.initial_transaction_id.to_protobuf()),
            total: chunk.total as i32,
            number: chunk.number as i32,
        });
        hiero_proto::transaction::transaction_body::Data::ConsensusSubmitMessage(
            hiero_proto::ConsensusSubmitMessageTransactionBody {
                topic_id: self.topic_id.map(TopicId::to_protobuf),
                message: self.chunk_data.message_chunk(chunk.number - 1).to_vec(),
                chunk_info,
            },
        )
    }
}

/// Appends a message to a consensus topic, splitting oversized payloads
/// into ordered chunk transactions.
pub type TopicMessageSubmitTransaction = Transaction<TopicMessageSubmitData>;

impl TopicMessageSubmitTransaction {
    /// An empty submission.
    #[must_use]
    pub fn new() -> Self {
        Self::from_data(TopicMessageSubmitData {
            topic_id: None,
            chunk_data: ChunkData {
                message: Vec::new(),
                chunk_size: DEFAULT_CHUNK_SIZE,
                max_chunks: DEFAULT_MAX_CHUNKS,
            },
        })
    }

    /// Sets the topic the message is appended to.
    #[must_use]
    pub fn with_topic_id(mut self, topic_id: TopicId) -> Self {
        self.data.topic_id = Some(topic_id);
        self
    }

    /// Sets the message payload.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<Vec<u8>>) -> Self {
        self.data.chunk_data.message = message.into();
        self
    }

    /// Sets the payload bytes per chunk.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.data.chunk_data.chunk_size = chunk_size.max(1);
        self
    }

    /// Sets the cap on the number of chunks.
    #[must_use]
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.data.chunk_data.max_chunks = max_chunks;
        self
    }
}

impl Default for TopicMessageSubmitTransaction {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use prost::Message;

    use super::*;
    use crate::node::NodeAddress;

    struct FakeSigner(u8);

    impl Signer for FakeSigner {
        fn public_key(&self) -> PublicKey {
            PublicKey::Ed25519([self.0; 32])
        }

        fn sign(&self, message: &[u8]) -> Vec<u8> {
            let mut signature = vec![self.0];
            signature.extend_from_slice(&message[..8.min(message.len())]);
            signature
        }
    }

    fn test_client() -> Client {
        let client = Client::for_network(vec![
            (AccountId::new(3), "in-process:node3".parse::<NodeAddress>().unwrap()),
            (AccountId::new(4), "in-process:node4".parse::<NodeAddress>().unwrap()),
            (AccountId::new(5), "in-process:node5".parse::<NodeAddress>().unwrap()),
        ])
        .unwrap();
        client.set_operator(AccountId::new(2), Arc::new(FakeSigner(1)));
        client
    }

    fn submit_with_message(len: usize, chunk_size: usize) -> TopicMessageSubmitTransaction {
        TopicMessageSubmitTransaction::new()
            .with_topic_id(TopicId::new(7))
            .with_message(vec![0xab; len])
            .with_chunk_size(chunk_size)
            .with_node_account_ids(vec![AccountId::new(3), AccountId::new(4)])
            .with_transaction_id(TransactionId::with_valid_start(AccountId::new(2), 1_000_000))
    }

    #[tokio::test]
    async fn test_chunk_count_is_ceiling_of_length_over_size() {
        let client = test_client();
        for (len, chunk_size, expected) in
            [(500, 1024, 1), (1024, 1024, 1), (1025, 1024, 2), (2048, 1024, 2), (0, 1024, 1)]
        {
            let frozen = submit_with_message(len, chunk_size).freeze_with(&client).unwrap();
            assert_eq!(frozen.chunk_count(), expected, "len={len} chunk_size={chunk_size}");
        }
        client.close(Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_too_many_chunks_fails_at_freeze() {
        let client = test_client();
        let result = submit_with_message(3000, 1024).with_max_chunks(2).freeze_with(&client);
        assert!(matches!(result, Err(Error::Config { .. })));
        client.close(Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_chunk_transaction_ids_are_derived_and_distinct() {
        let client = test_client();
        let frozen = submit_with_message(3000, 1024).freeze_with(&client).unwrap();
        assert_eq!(frozen.chunk_count(), 3);
        let base = frozen.transaction_id().valid_start_nanos.unwrap();
        assert_eq!(frozen.chunk_transaction_ids[1].valid_start_nanos.unwrap(), base + 1);
        assert_eq!(frozen.chunk_transaction_ids[2].valid_start_nanos.unwrap(), base + 2);
        client.close(Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_signable_list_covers_every_node_chunk_pair() {
        let client = test_client();
        let frozen = submit_with_message(2048, 1024).freeze_with(&client).unwrap();
        let list = frozen.signable_node_body_bytes_list();
        assert_eq!(list.len(), 2 * 2);

        // Every body embeds its own node's account id, so all four byte
        // strings differ.
        for entry in &list {
            let body = hiero_proto::TransactionBody::decode(entry.body_bytes.as_slice()).unwrap();
            let embedded = AccountId::from_protobuf(body.node_account_id.unwrap());
            assert_eq!(embedded, entry.node_account_id);
        }
        let mut distinct: Vec<_> = list.iter().map(|e| e.body_bytes.clone()).collect();
        distinct.sort();
        distinct.dedup();
        assert_eq!(distinct.len(), 4);
        client.close(Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_chunk_bodies_carry_slice_and_chunk_info() {
        let client = test_client();
        let mut message = vec![0x11; 1024];
        message.extend_from_slice(&[0x22; 100]);
        let frozen = submit_with_message(0, 1024)
            .with_message(message)
            .freeze_with(&client)
            .unwrap();
        let list = frozen.signable_node_body_bytes_list();

        let second = hiero_proto::TransactionBody::decode(list[2].body_bytes.as_slice()).unwrap();
        let Some(hiero_proto::transaction::transaction_body::Data::ConsensusSubmitMessage(
            submit,
        )) = second.data
        else {
            panic!("expected consensus submit body");
        };
        assert_eq!(submit.message, vec![0x22; 100]);
        let chunk_info = submit.chunk_info.unwrap();
        assert_eq!(chunk_info.total, 2);
        assert_eq!(chunk_info.number, 2);
        assert_eq!(
            TransactionId::from_protobuf(chunk_info.initial_transaction_id.unwrap()),
            frozen.transaction_id()
        );
        client.close(Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_single_chunk_omits_chunk_info() {
        let client = test_client();
        let frozen = submit_with_message(100, 1024).freeze_with(&client).unwrap();
        let list = frozen.signable_node_body_bytes_list();
        let body = hiero_proto::TransactionBody::decode(list[0].body_bytes.as_slice()).unwrap();
        let Some(hiero_proto::transaction::transaction_body::Data::ConsensusSubmitMessage(
            submit,
        )) = body.data
        else {
            panic!("expected consensus submit body");
        };
        assert!(submit.chunk_info.is_none());
        client.close(Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_sign_fills_every_pair_and_is_idempotent() {
        let client = test_client();
        let frozen = submit_with_message(2048, 1024)
            .freeze_with(&client)
            .unwrap()
            .sign(&FakeSigner(1))
            .sign(&FakeSigner(1));
        for entries in frozen.signatures.values() {
            assert_eq!(entries.len(), 1);
        }
        assert_eq!(frozen.signatures.len(), 4);

        let frozen = frozen.sign(&FakeSigner(2));
        for entries in frozen.signatures.values() {
            assert_eq!(entries.len(), 2);
        }
        client.close(Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_add_signature_unknown_pair_is_silent() {
        let client = test_client();
        let frozen = submit_with_message(100, 1024).freeze_with(&client).unwrap();
        let transaction_id = frozen.transaction_id();
        let before: usize = frozen.signatures.values().map(Vec::len).sum();
        let frozen = frozen.add_signature(
            AccountId::new(99),
            transaction_id,
            PublicKey::Ed25519([9; 32]),
            vec![1, 2, 3],
        );
        let after: usize = frozen.signatures.values().map(Vec::len).sum();
        assert_eq!(before, after);
        client.close(Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_add_signature_known_pair_lands_in_wire_envelope() {
        let client = test_client();
        let frozen = submit_with_message(100, 1024).freeze_with(&client).unwrap();
        let node = AccountId::new(3);
        let transaction_id = frozen.transaction_id();
        let frozen = frozen.add_signature(
            node,
            transaction_id,
            PublicKey::Ed25519([9; 32]),
            vec![0xde, 0xad],
        );
        let envelope = frozen.wire_transaction(0, node).unwrap();
        let signed = hiero_proto::SignedTransaction::decode(
            envelope.signed_transaction_bytes.as_slice(),
        )
        .unwrap();
        let pairs = signed.sig_map.unwrap().sig_pair;
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].pub_key_prefix, vec![9u8; 32]);
        client.close(Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_freeze_without_operator_or_transaction_id_fails() {
        let client = Client::for_network(vec![(
            AccountId::new(3),
            "in-process:node3".parse::<NodeAddress>().unwrap(),
        )])
        .unwrap();
        let result = TransferTransaction::new()
            .add_hbar_transfer(AccountId::new(2), -10)
            .add_hbar_transfer(AccountId::new(8), 10)
            .freeze_with(&client);
        assert!(matches!(result, Err(Error::Config { .. })));
        client.close(Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_freeze_defaults_come_from_client() {
        let client = test_client();
        client.set_max_transaction_fee(12_345);
        let frozen = TransferTransaction::new()
            .add_hbar_transfer(AccountId::new(2), -10)
            .add_hbar_transfer(AccountId::new(8), 10)
            .freeze_with(&client)
            .unwrap();
        // No explicit nodes: the network chooses the candidate subset.
        assert!(!frozen.node_account_ids().is_empty());
        assert_eq!(frozen.transaction_id().account_id, Some(AccountId::new(2)));

        let list = frozen.signable_node_body_bytes_list();
        let body = hiero_proto::TransactionBody::decode(list[0].body_bytes.as_slice()).unwrap();
        assert_eq!(body.transaction_fee, 12_345);
        assert_eq!(body.transaction_valid_duration.unwrap().seconds, 120);
        client.close(Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_transaction_hash_per_node_is_sha384_of_wire_bytes() {
        let client = test_client();
        let frozen = submit_with_message(100, 1024)
            .freeze_with(&client)
            .unwrap()
            .sign(&FakeSigner(1));
        let hashes = frozen.transaction_hash_per_node().unwrap();
        assert_eq!(hashes.len(), 2);
        for (node_account_id, hash) in &hashes {
            assert_eq!(hash.len(), 48);
            let envelope = frozen.wire_transaction(0, *node_account_id).unwrap();
            assert_eq!(*hash, Sha384::digest(envelope.encode_to_vec()).to_vec());
        }
        client.close(Duration::from_secs(1));
    }
}
