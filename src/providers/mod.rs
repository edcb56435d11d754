//! Chain clients backed by an alloy [RootProvider].

use std::time::Duration;

use alloy_consensus::{Header, ReceiptEnvelope};
use alloy_eips::BlockNumberOrTag;
use alloy_primitives::B256;
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::Block as RpcBlock;
use alloy_transport::TransportErrorKind;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;
use tokio::{spawn, sync::mpsc, task::JoinHandle, time::interval};

use crate::{
    l1::{ClientError, HeadSubscription, L1Block, L1Client},
    sync::{L2Block, L2Client},
};

/// Number of unread heads a subscription buffers before the producer waits
const HEAD_BUFFER: usize = 64;

/// A JSON-RPC chain client that serves both the [L1Client] and [L2Client]
/// capabilities.
///
/// Over a websocket new heads are pushed by `eth_subscribe`. There is no push
/// subscription over HTTP, so there new heads are found by polling the latest
/// header every `poll_interval`.
#[derive(Debug, Clone)]
pub struct AlloyChainClient {
    inner: RootProvider,
    poll_interval: Duration,
    pubsub: bool,
}

impl AlloyChainClient {
    pub const fn new(inner: RootProvider, poll_interval: Duration) -> Self {
        Self {
            inner,
            poll_interval,
            pubsub: false,
        }
    }

    pub fn new_http(url: Url, poll_interval: Duration) -> Self {
        Self::new(RootProvider::new_http(url), poll_interval)
    }

    /// Connects over the transport named by the URL scheme, `http(s)` or
    /// `ws(s)`.
    pub async fn connect(url: Url, poll_interval: Duration) -> Result<Self, ClientError> {
        match url.scheme() {
            "http" | "https" => Ok(Self::new_http(url, poll_interval)),
            "ws" | "wss" => {
                let inner = RootProvider::connect(url.as_str()).await?;
                Ok(Self {
                    inner,
                    poll_interval,
                    pubsub: true,
                })
            }
            scheme => Err(TransportErrorKind::custom_str(&format!(
                "unsupported URL scheme {scheme}"
            ))
            .into()),
        }
    }

    pub const fn provider(&self) -> &RootProvider {
        &self.inner
    }

    /// Whether new heads are pushed by the node rather than polled.
    pub const fn is_pubsub(&self) -> bool {
        self.pubsub
    }
}

/// Converts an RPC block with full transactions into its consensus form.
fn into_block(block: Option<RpcBlock>, what: String) -> Result<L1Block, ClientError> {
    let block = block.ok_or_else(|| ClientError::not_found(what))?;
    Ok(block
        .into_consensus()
        .map_transactions(|tx| tx.inner.into_inner()))
}

async fn fetch_header(provider: &RootProvider, number: BlockNumberOrTag) -> Result<Header, ClientError> {
    let block = provider
        .get_block_by_number(number)
        .await?
        .ok_or_else(|| ClientError::not_found(format!("block {number}")))?;
    Ok(block.header.into_consensus())
}

/// Polls the latest header and forwards it whenever the head hash changes.
fn start_head_poller(
    provider: RootProvider,
    poll_interval: Duration,
) -> (JoinHandle<()>, mpsc::Receiver<Header>) {
    let (sender, receiver) = mpsc::channel(HEAD_BUFFER);

    let handle = spawn(async move {
        let mut ticker = interval(poll_interval);
        let mut last_head = B256::ZERO;

        loop {
            ticker.tick().await;
            match fetch_header(&provider, BlockNumberOrTag::Latest).await {
                Ok(header) => {
                    let hash = header.hash_slow();
                    if hash == last_head {
                        continue;
                    }
                    last_head = hash;
                    tracing::trace!(target: "l1", number = header.number, %hash, "new head");
                    if sender.send(header).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(target: "l1", %err, "failed to poll latest header");
                }
            }
        }
    });

    (handle, receiver)
}

/// Forwards the heads pushed by a `newHeads` subscription.
async fn start_head_subscriber(
    provider: &RootProvider,
) -> Result<(JoinHandle<()>, mpsc::Receiver<Header>), ClientError> {
    let subscription = provider.subscribe_blocks().await?;
    let (sender, receiver) = mpsc::channel(HEAD_BUFFER);

    let handle = spawn(async move {
        let heads = subscription.into_stream();
        futures::pin_mut!(heads);
        while let Some(header) = heads.next().await {
            let header = header.into_consensus();
            tracing::trace!(target: "l1", number = header.number, "new head");
            if sender.send(header).await.is_err() {
                break;
            }
        }
        tracing::debug!(target: "l1", "head subscription closed");
    });

    Ok((handle, receiver))
}

#[async_trait]
impl L1Client for AlloyChainClient {
    async fn header_by_number(&self, number: BlockNumberOrTag) -> Result<Header, ClientError> {
        fetch_header(&self.inner, number).await
    }

    async fn header_by_hash(&self, hash: B256) -> Result<Header, ClientError> {
        let block = self
            .inner
            .get_block_by_hash(hash)
            .await?
            .ok_or_else(|| ClientError::not_found(format!("block {hash}")))?;
        Ok(block.header.into_consensus())
    }

    async fn block_by_number(&self, number: BlockNumberOrTag) -> Result<L1Block, ClientError> {
        let block = self.inner.get_block_by_number(number).full().await?;
        into_block(block, format!("block {number}"))
    }

    async fn block_by_hash(&self, hash: B256) -> Result<L1Block, ClientError> {
        let block = self.inner.get_block_by_hash(hash).full().await?;
        into_block(block, format!("block {hash}"))
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<ReceiptEnvelope, ClientError> {
        let receipt = self
            .inner
            .get_transaction_receipt(tx_hash)
            .await?
            .ok_or_else(|| ClientError::not_found(format!("receipt {tx_hash}")))?;
        Ok(receipt.inner.into_primitives_receipt())
    }

    async fn block_receipts(&self, block_hash: B256) -> Result<Vec<ReceiptEnvelope>, ClientError> {
        let receipts = self
            .inner
            .get_block_receipts(block_hash.into())
            .await?
            .ok_or_else(|| ClientError::not_found(format!("receipts of {block_hash}")))?;
        Ok(receipts
            .into_iter()
            .map(|receipt| receipt.inner.into_primitives_receipt())
            .collect())
    }

    async fn subscribe_new_heads(&self) -> Result<HeadSubscription, ClientError> {
        let (handle, receiver) = match self.pubsub {
            true => start_head_subscriber(&self.inner).await?,
            false => start_head_poller(self.inner.clone(), self.poll_interval),
        };
        Ok(HeadSubscription::new(receiver, Some(handle)))
    }
}

#[async_trait]
impl L2Client for AlloyChainClient {
    async fn block_by_number(&self, number: BlockNumberOrTag) -> Result<L2Block, ClientError> {
        L1Client::block_by_number(self, number).await
    }

    async fn block_by_hash(&self, hash: B256) -> Result<L2Block, ClientError> {
        L1Client::block_by_hash(self, hash).await
    }
}
