use alloy_eips::{eip2718::Encodable2718, BlockNumberOrTag};
use alloy_primitives::{keccak256, B256};
use futures::StreamExt;

use opnode::{
    common::BlockId,
    l1::{receipts_root, Source, SourceError},
    test_utils::{test_header, MockL1Client},
};

fn source(len: u64) -> Source<MockL1Client> {
    Source::new(MockL1Client::with_chain(len))
}

fn id(source: &Source<MockL1Client>, number: u64) -> BlockId {
    BlockId::new(source.client().canonical(number).unwrap(), number)
}

#[tokio::test]
async fn walks_the_chain_by_links() {
    let source = source(5);

    let mut link = source.block_link_by_number(4).await.unwrap();
    while link.number() > 0 {
        let parent = source.block_link_by_number(link.number() - 1).await.unwrap();
        assert_eq!(parent.self_id, link.parent);
        link = parent;
    }
    assert_eq!(link.parent, BlockId::new(B256::ZERO, 0));
}

#[tokio::test]
async fn past_the_head_is_not_found() {
    let source = source(3);
    let err = source.block_link_by_number(3).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_integrity());
}

#[tokio::test]
async fn fetched_receipts_commit_to_the_header() {
    let source = source(4);
    let id = id(&source, 2);

    let header = source.header_by_hash(id.hash).await.unwrap();
    let receipts = source.fetch_receipts(id, header.receipts_root).await.unwrap();
    assert_eq!(receipts.len(), 2);
    assert_eq!(receipts_root(&receipts), header.receipts_root);

    let (block, fetched) = source.fetch(id).await.unwrap();
    assert_eq!(block.header, header);
    assert_eq!(fetched, receipts);
}

#[tokio::test]
async fn receipts_by_transaction_hash() {
    let source = source(3);
    let hash = id(&source, 2).hash;
    let block = source.client().block(hash).unwrap();
    let receipts = source.client().receipts(hash).unwrap();

    for (tx, expected) in block.body.transactions.iter().zip(&receipts) {
        let receipt = source
            .transaction_receipt(keccak256(tx.encoded_2718()))
            .await
            .unwrap();
        assert_eq!(&receipt, expected);
    }

    let err = source
        .transaction_receipt(B256::repeat_byte(0x42))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SourceError::Request {
            method: "transaction_receipt",
            ..
        }
    ));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn substituted_block_is_rejected() {
    let source = source(4);
    let requested = id(&source, 1);
    let served = id(&source, 2);
    source.client().alias_block(requested.hash, served.hash);

    let err = source.fetch(requested).await.unwrap_err();
    assert!(err.is_integrity());
    assert!(matches!(err, SourceError::BlockHashMismatch { actual, .. } if actual == served.hash));
}

#[tokio::test]
async fn transactions_of_a_window_keep_block_order() {
    let source = source(4);
    let window = [id(&source, 1), id(&source, 3)];

    let transactions = source.fetch_transactions(&window).await.unwrap();
    let expected: Vec<_> = [1, 3]
        .into_iter()
        .flat_map(|n| source.client().block(id(&source, n).hash).unwrap().body.transactions)
        .collect();
    assert_eq!(transactions, expected);

    let missing = BlockId::new(B256::repeat_byte(0x77), 9);
    let err = source
        .fetch_transactions(&[window[0], missing])
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Fetch { id, .. } if id == missing));
}

#[tokio::test]
async fn head_subscription_delivers_and_releases() {
    let source = source(2);
    let mut heads = source.subscribe_new_heads().await.unwrap();
    assert_eq!(source.client().subscriber_count(), 1);

    let header = test_header(2, source.client().canonical(1).unwrap());
    source.client().announce(header.clone());
    assert_eq!(heads.next().await, Some(header));

    heads.unsubscribe();
    assert_eq!(source.client().subscriber_count(), 0);

    let latest = source
        .header_by_number(BlockNumberOrTag::Latest)
        .await
        .unwrap();
    assert_eq!(latest.number, 1);
}
