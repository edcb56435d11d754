//! Source chain (L1) access.
//!
//! [L1Client] is the narrow capability the rest of the crate needs from an L1
//! node. [Source] wraps any client and adds the integrity checks: receipts are
//! verified against the block's receipt root and fetched blocks must match the
//! requested hash.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use alloy_consensus::{Block, Header, ReceiptEnvelope, TxEnvelope};
use alloy_eips::BlockNumberOrTag;
use alloy_primitives::B256;
use alloy_transport::TransportError;
use async_trait::async_trait;
use futures::Stream;
use tokio::{sync::mpsc, task::JoinHandle};

pub mod source;
pub use source::{receipts_root, Source, SourceError};

/// A full L1 block with its transactions
pub type L1Block = Block<TxEnvelope>;

/// An error returned by a chain client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The requested item does not exist, e.g. a height past the chain head.
    #[error("{0} not found")]
    NotFound(String),
    /// The request could not be completed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ClientError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// The subset of L1 node functionality needed to read the L1 block graph.
#[async_trait]
pub trait L1Client: Send + Sync {
    /// Returns the header at the given height or tag.
    async fn header_by_number(&self, number: BlockNumberOrTag) -> Result<Header, ClientError>;

    /// Returns the header with the given hash.
    async fn header_by_hash(&self, hash: B256) -> Result<Header, ClientError>;

    /// Returns the full block at the given height or tag.
    async fn block_by_number(&self, number: BlockNumberOrTag) -> Result<L1Block, ClientError>;

    /// Returns the full block with the given hash.
    async fn block_by_hash(&self, hash: B256) -> Result<L1Block, ClientError>;

    /// Returns the receipt of a single transaction.
    async fn transaction_receipt(&self, tx_hash: B256) -> Result<ReceiptEnvelope, ClientError>;

    /// Returns all receipts of the block with the given hash, in transaction order.
    async fn block_receipts(&self, block_hash: B256) -> Result<Vec<ReceiptEnvelope>, ClientError>;

    /// Subscribes to new chain heads.
    async fn subscribe_new_heads(&self) -> Result<HeadSubscription, ClientError>;
}

/// A feed of new L1 heads.
///
/// Heads may arrive duplicated or out of order. Dropping the subscription
/// stops the producer task, if there is one.
#[derive(Debug)]
pub struct HeadSubscription {
    receiver: mpsc::Receiver<Header>,
    producer: Option<JoinHandle<()>>,
}

impl HeadSubscription {
    pub fn new(receiver: mpsc::Receiver<Header>, producer: Option<JoinHandle<()>>) -> Self {
        Self { receiver, producer }
    }

    /// Waits for the next head. Returns `None` once the feed has closed.
    pub async fn recv(&mut self) -> Option<Header> {
        self.receiver.recv().await
    }

    /// Releases the subscription.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.receiver.close();
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

impl Drop for HeadSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl Stream for HeadSubscription {
    type Item = Header;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
