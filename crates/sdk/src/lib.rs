//! Rust SDK for the Hiero consensus network.
//!
//! Every request funnels through one execution engine: pick a healthy node,
//! issue the gRPC call with a bounded deadline, classify the outcome, and
//! either return, retry, or fail. Per-node health is tracked with
//! exponential backoff so a flapping node is quarantined without being
//! forgotten, and the async and blocking entry points drive the same engine
//! so both modes make identical decisions.
//!
//! # Features
//!
//! - **One retry loop**: transactions, queries, and pings share node
//!   selection, backoff, and deadline arithmetic
//! - **Node health tracking**: per-node exponential backoff with readmission,
//!   never a permanent blacklist
//! - **Chunked submissions**: oversized topic messages split into ordered
//!   chunk transactions with a per-(node, chunk) signature matrix
//! - **External signing**: export the exact signable bytes, feed signatures
//!   back in, no key material required in-process
//! - **Mirror streaming**: topic subscriptions reconnect where they left
//!   off, without duplicating or dropping messages
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hiero_sdk::{AccountId, Client, TransferTransaction};
//!
//! #[tokio::main]
//! async fn main() -> hiero_sdk::Result<()> {
//!     let client = Client::for_network(vec![
//!         (AccountId::new(3), "35.237.200.180:50211".parse()?),
//!     ])?;
//!     client.set_operator(AccountId::new(2), my_signer);
//!
//!     let receipt = TransferTransaction::new()
//!         .add_hbar_transfer(AccountId::new(2), -100)
//!         .add_hbar_transfer(AccountId::new(98), 100)
//!         .freeze_with(&client)?
//!         .sign_with_operator(&client)?
//!         .execute(&client)
//!         .await?
//!         .get_receipt(&client)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Operations (Public API)                     │
//! │  TransferTransaction │ TopicMessageSubmit │ Queries │ ping  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 Execution Engine                            │
//! │  Node selection │ Deadlines │ Outcome classification       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 Network Registry                            │
//! │  Node health │ Backoff/readmission │ Mirror endpoints      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 Tonic gRPC Transport                        │
//! │  Lazy channels │ TLS │ Server streaming                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod entity_id;
mod error;
mod execute;
mod key;
mod network;
mod node;
mod query;
mod status;
mod topic;
mod transaction;
mod transaction_id;

// Public API exports
pub use client::{Client, Operator};
pub use config::{RetryPolicy, RetryPolicyBuilder};
pub use entity_id::{AccountId, LedgerId, TopicId};
pub use error::{Error, Result};
pub use execute::Execute;
pub use key::{Key, PublicKey, Signer};
pub use network::{MirrorNetwork, Network};
pub use node::{Node, NodeAddress};
pub use query::{
    AccountBalance, AccountBalanceQuery, AccountBalanceQueryData, Query, QueryData,
    TransactionReceipt, TransactionReceiptQuery, TransactionReceiptQueryData,
};
pub use status::{ExecutionState, Status};
pub use topic::{SubscriptionHandle, TopicMessage, TopicMessageQuery};
pub use transaction::{
    ChunkContext, ChunkData, FrozenTransaction, SignableNodeBodyBytes, TopicMessageSubmitData,
    TopicMessageSubmitTransaction, Transaction, TransactionData, TransactionResponse,
    TransferData, TransferTransaction,
};
pub use transaction_id::TransactionId;
