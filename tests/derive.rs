use alloy_primitives::{Address, Bytes, Log, LogData, B256};

use opnode::{
    common::{BlockId, Genesis},
    config::RollupConfig,
    derive::{invert_payload, ApplyOutcome, Pipeline, PipelineError, TRANSACTION_DEPOSITED_TOPIC},
    engine::{ForkchoiceState, L2EngineApi, MockEngine},
    l1::Source,
    test_utils::{test_chain, test_receipt, MockL1Client},
};

const L1_LEN: u64 = 6;

fn config(l1: &MockL1Client, l2_genesis: BlockId) -> RollupConfig {
    RollupConfig {
        genesis: Genesis {
            l1: BlockId::new(l1.canonical(1).unwrap(), 1),
            l2: l2_genesis,
            l2_time: l1.header(1).unwrap().timestamp,
        },
        fee_recipient: Address::repeat_byte(0x11),
        deposit_contract: Address::repeat_byte(0xdd),
    }
}

fn pipeline() -> Pipeline<MockL1Client, MockEngine> {
    let l1 = MockL1Client::with_chain(L1_LEN);
    let l2_genesis = BlockId::new(B256::repeat_byte(0x22), 0);
    let config = config(&l1, l2_genesis);
    Pipeline::new(Source::new(l1), MockEngine::new(l2_genesis), config)
}

#[tokio::test]
async fn derives_one_l2_block_per_l1_block() {
    let pipeline = pipeline();
    let genesis = pipeline.config().genesis;
    let mut forkchoice = ForkchoiceState::new(genesis.l2.hash, genesis.l2.hash, genesis.l2.hash);
    let mut head = genesis.l2;

    for number in genesis.l1.number..L1_LEN {
        let l1_block = BlockId::new(pipeline.source().client().canonical(number).unwrap(), number);
        let (derived, payload) = pipeline.derive_payload(l1_block, forkchoice).await.unwrap();
        assert_eq!(derived.l1_origin, l1_block);

        let l1_header = pipeline.source().client().header(number).unwrap();
        assert!(invert_payload(&payload).is_justified_by(&l1_header));

        let ApplyOutcome::Applied(new_head) = pipeline.apply_payload(payload, forkchoice).await.unwrap() else {
            panic!("payload derived from L1 block {number} was not applied");
        };
        assert_eq!(new_head.parent, head);
        head = new_head.self_id;
        forkchoice = forkchoice.with_head(&new_head);
    }

    assert_eq!(head.number, L1_LEN - genesis.l1.number);
    assert_eq!(pipeline.engine().forkchoice().unwrap().head_block_hash, head.hash);
}

#[tokio::test]
async fn deposits_are_carried_with_the_attributes() {
    let l1 = MockL1Client::new();
    let mut chain = test_chain(3);
    let (mut block, _) = chain.pop().unwrap();
    for (b, r) in chain {
        l1.push_block(b, r);
    }

    let deposit = Log {
        address: Address::repeat_byte(0xdd),
        data: LogData::new_unchecked(vec![TRANSACTION_DEPOSITED_TOPIC], Bytes::from_static(b"deposit")),
    };
    let receipts = vec![
        test_receipt(true, 21_000, vec![deposit.clone()]),
        test_receipt(true, 42_000, vec![]),
    ];
    block.header.receipts_root = opnode::l1::receipts_root(&receipts);
    let hash = l1.push_block(block, receipts);

    let l2_genesis = BlockId::new(B256::repeat_byte(0x22), 0);
    let config = config(&l1, l2_genesis);
    let pipeline = Pipeline::new(Source::new(l1), MockEngine::new(l2_genesis), config);

    let derived = pipeline.derive_attributes(BlockId::new(hash, 2)).await.unwrap();
    assert_eq!(derived.deposits, vec![deposit]);
}

#[tokio::test]
async fn payload_built_on_unknown_head_fails() {
    let pipeline = pipeline();
    let l1_block = BlockId::new(pipeline.source().client().canonical(2).unwrap(), 2);
    let unknown = B256::repeat_byte(0x99);

    let err = pipeline
        .derive_payload(l1_block, ForkchoiceState::new(unknown, unknown, unknown))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Build(_)));
}

#[tokio::test]
async fn mismatched_block_number_is_invalid() {
    let pipeline = pipeline();
    let genesis = pipeline.config().genesis;
    let forkchoice = ForkchoiceState::new(genesis.l2.hash, genesis.l2.hash, genesis.l2.hash);
    let l1_block = BlockId::new(pipeline.source().client().canonical(2).unwrap(), 2);

    let (_, mut payload) = pipeline.derive_payload(l1_block, forkchoice).await.unwrap();
    payload.block_number += 1;

    let outcome = pipeline.apply_payload(payload, forkchoice).await.unwrap();
    assert!(matches!(outcome, ApplyOutcome::Invalid { .. }));
    assert!(pipeline
        .engine()
        .forkchoice_updated(forkchoice, None)
        .await
        .unwrap()
        .is_success());
}
