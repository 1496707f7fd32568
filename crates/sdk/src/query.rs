//! Queries: balance and receipt reads, plus the payment pre-step for
//! cost-bearing queries.
//!
//! A paid query without an explicit payment first asks the network what it
//! costs (a `COST_ANSWER` round through the same engine), checks the answer
//! against the payment ceiling, and only then executes with a signed
//! transfer attached. Receipt queries widen the engine's retry set: a
//! receipt that has not reached consensus yet keeps polling the same node
//! instead of failing.

use std::time::Duration;

use prost::Message as _;

use crate::client::{Client, Operator};
use crate::entity_id::AccountId;
use crate::error::{Error, Result};
use crate::execute::Execute;
use crate::status::{default_execution_state, ExecutionState, Status};
use crate::transaction_id::TransactionId;

/// Validity window of a query's payment transfer.
const PAYMENT_VALID_DURATION_SECS: i64 = 120;

/// Operation-specific payload of a query.
pub trait QueryData: Clone + Send + Sync {
    /// What the query resolves to.
    type Output;

    /// The gRPC method this query is sent to.
    fn method_path(&self) -> &'static str;

    /// Whether the network charges for this query.
    fn is_payment_required(&self) -> bool {
        false
    }

    /// The transaction id this query is about, if any; attached to
    /// rejection errors for context.
    fn transaction_id(&self) -> Option<TransactionId> {
        None
    }

    /// Wraps this payload and the header into the query envelope.
    fn to_query_data(&self, header: hiero_proto::QueryHeader) -> hiero_proto::query::query::Data;

    /// Classifies a completed attempt; the default is the shared table.
    fn execution_state(&self, status: Status, response: &hiero_proto::Response) -> ExecutionState {
        let _ = response;
        default_execution_state(status)
    }

    /// Extracts the output from the response envelope.
    fn map_response(&self, response: hiero_proto::Response) -> Result<Self::Output>;
}

/// A query under construction.
#[derive(Debug, Clone)]
pub struct Query<D: QueryData> {
    data: D,
    node_account_ids: Option<Vec<AccountId>>,
    payment_amount: Option<u64>,
    max_query_payment: Option<u64>,
    timeout: Option<Duration>,
}

impl<D: QueryData> Query<D> {
    fn from_data(data: D) -> Self {
        Self {
            data,
            node_account_ids: None,
            payment_amount: None,
            max_query_payment: None,
            timeout: None,
        }
    }

    /// Pins the candidate nodes, in submission priority order.
    #[must_use]
    pub fn with_node_account_ids(mut self, node_account_ids: Vec<AccountId>) -> Self {
        self.node_account_ids = Some(node_account_ids);
        self
    }

    /// Sets an explicit payment, skipping the cost pre-step.
    #[must_use]
    pub fn with_payment_amount(mut self, amount: u64) -> Self {
        self.payment_amount = Some(amount);
        self
    }

    /// Caps what the cost pre-step may agree to pay, overriding the
    /// client-wide ceiling.
    #[must_use]
    pub fn with_max_query_payment(mut self, max: u64) -> Self {
        self.max_query_payment = Some(max);
        self
    }

    /// Bounds the whole execution, retries included.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Asks the network what this query costs, in tinybars.
    pub async fn get_cost(&self, client: &Client) -> Result<u64> {
        client.execute(&QueryCost { query: self }, self.timeout).await
    }

    /// Runs the query: resolves payment if the query is paid, then drives
    /// the request through the execution engine.
    pub async fn execute(&self, client: &Client) -> Result<D::Output> {
        let payment = self.resolve_payment(client).await?;
        client
            .execute(
                &QueryExecute {
                    query: self,
                    response_type: hiero_proto::ResponseType::AnswerOnly,
                    payment,
                },
                self.timeout,
            )
            .await
    }

    /// Blocking form of [`Query::execute`].
    pub fn execute_blocking(&self, client: &Client) -> Result<D::Output> {
        client.block_on(self.execute(client))?
    }

    async fn resolve_payment(&self, client: &Client) -> Result<Option<PaymentContext>> {
        if !self.data.is_payment_required() {
            return Ok(None);
        }
        let operator = client.operator().ok_or_else(|| Error::Config {
            message: "paid query requires a client operator".to_owned(),
        })?;
        let amount = match self.payment_amount {
            Some(amount) => amount,
            None => {
                let cost = self.get_cost(client).await?;
                let ceiling = self.max_query_payment.unwrap_or_else(|| client.max_query_payment());
                check_query_payment(cost, ceiling)?;
                cost
            }
        };
        Ok(Some(PaymentContext {
            transaction_id: TransactionId::generate(operator.account_id),
            operator,
            amount,
            max_fee: client.max_transaction_fee(),
        }))
    }
}

/// Fails when the network's quoted cost is over the payment ceiling.
fn check_query_payment(cost: u64, max_query_payment: u64) -> Result<()> {
    snafu::ensure!(
        cost <= max_query_payment,
        crate::error::MaxQueryPaymentExceededSnafu { cost, max_query_payment }
    );
    Ok(())
}

/// Payment details resolved before a paid query executes.
struct PaymentContext {
    operator: Operator,
    amount: u64,
    transaction_id: TransactionId,
    max_fee: u64,
}

impl PaymentContext {
    /// Builds and signs the transfer paying `amount` from the operator to
    /// the target node.
    fn payment_transaction(&self, node_account_id: AccountId) -> hiero_proto::Transaction {
        let body = hiero_proto::TransactionBody {
            transaction_id: Some(self.transaction_id.to_protobuf()),
            node_account_id: Some(node_account_id.to_protobuf()),
            transaction_fee: self.max_fee,
            transaction_valid_duration: Some(hiero_proto::TimestampSeconds {
                seconds: PAYMENT_VALID_DURATION_SECS,
            }),
            memo: String::new(),
            data: Some(hiero_proto::transaction::transaction_body::Data::CryptoTransfer(
                hiero_proto::CryptoTransferTransactionBody {
                    transfers: Some(hiero_proto::TransferList {
                        account_amounts: vec![
                            hiero_proto::AccountAmount {
                                account_id: Some(self.operator.account_id.to_protobuf()),
                                amount: -(self.amount as i64),
                            },
                            hiero_proto::AccountAmount {
                                account_id: Some(node_account_id.to_protobuf()),
                                amount: self.amount as i64,
                            },
                        ],
                    }),
                },
            )),
        };
        let body_bytes = body.encode_to_vec();
        let signature = self.operator.signer.sign(&body_bytes);
        let sig_pair = self.operator.signer.public_key().to_signature_pair(signature);
        let signed = hiero_proto::SignedTransaction {
            body_bytes,
            sig_map: Some(hiero_proto::SignatureMap { sig_pair: vec![sig_pair] }),
        };
        hiero_proto::Transaction { signed_transaction_bytes: signed.encode_to_vec() }
    }
}

/// One query's trip through the execution engine.
struct QueryExecute<'a, D: QueryData> {
    query: &'a Query<D>,
    response_type: hiero_proto::ResponseType,
    payment: Option<PaymentContext>,
}

impl<D: QueryData> QueryExecute<'_, D> {
    fn envelope(&self, node_account_id: AccountId) -> hiero_proto::Query {
        let header = hiero_proto::QueryHeader {
            payment: self.payment.as_ref().map(|p| p.payment_transaction(node_account_id)),
            response_type: self.response_type as i32,
        };
        hiero_proto::Query { data: Some(self.query.data.to_query_data(header)) }
    }
}

impl<D: QueryData> Execute for QueryExecute<'_, D> {
    type GrpcRequest = hiero_proto::Query;
    type GrpcResponse = hiero_proto::Response;
    type Output = D::Output;

    fn node_account_ids(&self) -> Option<Vec<AccountId>> {
        self.query.node_account_ids.clone()
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        self.query.data.transaction_id()
    }

    fn method_path(&self) -> &'static str {
        self.query.data.method_path()
    }

    fn make_request(&self, node_account_id: AccountId) -> Result<Self::GrpcRequest> {
        Ok(self.envelope(node_account_id))
    }

    fn response_status(&self, response: &Self::GrpcResponse) -> Status {
        Status::from_code(
            response.header().map(|h| h.node_transaction_precheck_code).unwrap_or_default(),
        )
    }

    fn execution_state(&self, status: Status, response: &Self::GrpcResponse) -> ExecutionState {
        self.query.data.execution_state(status, response)
    }

    fn map_response(
        &self,
        response: Self::GrpcResponse,
        _node_account_id: AccountId,
        _request: &Self::GrpcRequest,
    ) -> Result<Self::Output> {
        self.query.data.map_response(response)
    }
}

/// The cost pre-step: the same query asked for `COST_ANSWER`.
struct QueryCost<'a, D: QueryData> {
    query: &'a Query<D>,
}

impl<D: QueryData> Execute for QueryCost<'_, D> {
    type GrpcRequest = hiero_proto::Query;
    type GrpcResponse = hiero_proto::Response;
    type Output = u64;

    fn node_account_ids(&self) -> Option<Vec<AccountId>> {
        self.query.node_account_ids.clone()
    }

    fn method_path(&self) -> &'static str {
        self.query.data.method_path()
    }

    fn make_request(&self, node_account_id: AccountId) -> Result<Self::GrpcRequest> {
        let probe = QueryExecute {
            query: self.query,
            response_type: hiero_proto::ResponseType::CostAnswer,
            payment: None,
        };
        probe.make_request(node_account_id)
    }

    fn response_status(&self, response: &Self::GrpcResponse) -> Status {
        Status::from_code(
            response.header().map(|h| h.node_transaction_precheck_code).unwrap_or_default(),
        )
    }

    fn map_response(
        &self,
        response: Self::GrpcResponse,
        _node_account_id: AccountId,
        _request: &Self::GrpcRequest,
    ) -> Result<Self::Output> {
        Ok(response.header().map(|h| h.cost).unwrap_or_default())
    }
}

/// The final disposition of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Consensus status the transaction resolved to.
    pub status: Status,
    /// For topic submissions, the topic's sequence number after the
    /// message.
    pub topic_sequence_number: u64,
    /// For topic submissions, the topic's running hash after the message.
    pub topic_running_hash: Vec<u8>,
}

impl TransactionReceipt {
    fn from_protobuf(pb: hiero_proto::TransactionReceipt) -> Self {
        Self {
            status: Status::from_code(pb.status),
            topic_sequence_number: pb.topic_sequence_number,
            topic_running_hash: pb.topic_running_hash,
        }
    }
}

/// Payload of a [`TransactionReceiptQuery`].
#[derive(Debug, Clone)]
pub struct TransactionReceiptQueryData {
    transaction_id: TransactionId,
}

impl QueryData for TransactionReceiptQueryData {
    type Output = TransactionReceipt;

    fn method_path(&self) -> &'static str {
        hiero_proto::services::GET_TRANSACTION_RECEIPTS
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        Some(self.transaction_id)
    }

    fn to_query_data(&self, header: hiero_proto::QueryHeader) -> hiero_proto::query::query::Data {
        hiero_proto::query::query::Data::TransactionGetReceipt(
            hiero_proto::TransactionGetReceiptQuery {
                header: Some(header),
                transaction_id: Some(self.transaction_id.to_protobuf()),
            },
        )
    }

    /// A receipt that has not reached consensus yet is a retry, not a
    /// failure: the node knows the transaction but the outcome is pending.
    /// Retries stay on the same node, matching the shared RETRY semantics.
    fn execution_state(&self, status: Status, response: &hiero_proto::Response) -> ExecutionState {
        match status {
            Status::ReceiptNotFound | Status::RecordNotFound => ExecutionState::Retry,
            Status::Ok => {
                let receipt_status = receipt_of(response).map(|r| Status::from_code(r.status));
                match receipt_status {
                    Some(Status::Unknown) | None => ExecutionState::Retry,
                    Some(_) => ExecutionState::Success,
                }
            }
            _ => default_execution_state(status),
        }
    }

    fn map_response(&self, response: hiero_proto::Response) -> Result<Self::Output> {
        let Some(hiero_proto::query::response::Data::TransactionGetReceipt(inner)) = response.data
        else {
            return Err(Error::basic_parse("response is not a receipt response"));
        };
        let receipt =
            inner.receipt.ok_or_else(|| Error::basic_parse("receipt response has no receipt"))?;
        Ok(TransactionReceipt::from_protobuf(receipt))
    }
}

fn receipt_of(response: &hiero_proto::Response) -> Option<&hiero_proto::TransactionReceipt> {
    match &response.data {
        Some(hiero_proto::query::response::Data::TransactionGetReceipt(inner)) => {
            inner.receipt.as_ref()
        }
        _ => None,
    }
}

/// Polls for the receipt of a submitted transaction.
pub type TransactionReceiptQuery = Query<TransactionReceiptQueryData>;

impl TransactionReceiptQuery {
    /// A receipt query for the given transaction.
    #[must_use]
    pub fn new(transaction_id: TransactionId) -> Self {
        Self::from_data(TransactionReceiptQueryData { transaction_id })
    }
}

/// An account's balance, in tinybars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountBalance {
    /// The queried account.
    pub account_id: AccountId,
    /// Balance in tinybars.
    pub balance: u64,
}

/// Payload of an [`AccountBalanceQuery`].
#[derive(Debug, Clone)]
pub struct AccountBalanceQueryData {
    account_id: AccountId,
}

impl QueryData for AccountBalanceQueryData {
    type Output = AccountBalance;

    fn method_path(&self) -> &'static str {
        hiero_proto::services::CRYPTO_GET_BALANCE
    }

    fn to_query_data(&self, header: hiero_proto::QueryHeader) -> hiero_proto::query::query::Data {
        hiero_proto::query::query::Data::CryptogetAccountBalance(
            hiero_proto::CryptoGetAccountBalanceQuery {
                header: Some(header),
                account_id: Some(self.account_id.to_protobuf()),
            },
        )
    }

    fn map_response(&self, response: hiero_proto::Response) -> Result<Self::Output> {
        let Some(hiero_proto::query::response::Data::CryptogetAccountBalance(inner)) =
            response.data
        else {
            return Err(Error::basic_parse("response is not a balance response"));
        };
        Ok(AccountBalance {
            account_id: inner
                .account_id
                .map(AccountId::from_protobuf)
                .unwrap_or(self.account_id),
            balance: inner.balance,
        })
    }
}

/// Reads an account's balance. Free, so it doubles as the node ping.
pub type AccountBalanceQuery = Query<AccountBalanceQueryData>;

impl AccountBalanceQuery {
    /// A balance query for the given account.
    #[must_use]
    pub fn new(account_id: AccountId) -> Self {
        Self::from_data(AccountBalanceQueryData { account_id })
    }
}
