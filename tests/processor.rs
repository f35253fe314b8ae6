use alloy_primitives::{Address, B256, U256};
use dualvm_runtime::{
    diagnostics::{bundle_dir, DiagnosticReport},
    execution::program::ProgramBuilder,
    params::DEFAULT_DIAGNOSTICS_NAMESPACE,
    Account, ChainConfig, DaoForkConfig, ExecutionConfig, ExecutionError, ExecutorKind,
    MismatchCheck, ProcessError, ReceiptOutcome, StateProcessor, Verification,
};

use crate::common::{
    processor, skewed_processor, TestChain, TestData, TestEngine, CHAIN_ID, COINBASE, CONTRACT,
    ORIGIN_BALANCE,
};

mod common;

/// A block without transactions only runs the engine finalization.
#[test]
fn test_empty_block() {
    let config = ChainConfig::all_forks(CHAIN_ID);
    let processor = StateProcessor::new(
        config.clone(),
        TestChain,
        TestEngine {
            reward: U256::from(5),
        },
    );
    let home = tempfile::tempdir().unwrap();
    let block = TestData::block(&config, 1, vec![]);
    let mut state = TestData::genesis();

    let output = processor
        .process(&block, &mut state, &TestData::exec_config(home.path()))
        .unwrap();

    assert!(output.receipts.is_empty());
    assert!(output.logs.is_empty());
    assert_eq!(output.gas_used, 0);
    assert_eq!(state.balance(&COINBASE), U256::from(5));
}

/// Both executors agree on a plain transfer: one receipt, 21000 gas, no diagnostics.
#[test]
fn test_single_transfer() {
    let config = ChainConfig::all_forks(CHAIN_ID);
    let home = tempfile::tempdir().unwrap();
    let block = TestData::block(&config, 1, vec![TestData::transaction(0)]);
    let mut state = TestData::genesis();

    let output = processor(config)
        .process(&block, &mut state, &TestData::exec_config(home.path()))
        .unwrap();

    assert_eq!(output.receipts.len(), 1);
    assert_eq!(output.gas_used, 21_000);
    let receipt = &output.receipts[0];
    assert_eq!(receipt.outcome, ReceiptOutcome::Status(true));
    assert_eq!(receipt.gas_used, 21_000);
    assert_eq!(receipt.cumulative_gas_used, 21_000);
    assert_eq!(receipt.tx_hash, block.transactions[0].hash());
    assert_eq!(receipt.block_hash, block.hash());
    assert_eq!(receipt.block_number, 1);
    assert_eq!(receipt.contract_address, None);

    let origin = TestData::get_origin_address();
    assert_eq!(state.nonce(&origin), 1);
    assert_eq!(
        state.balance(&origin),
        U256::from(ORIGIN_BALANCE - 21_000 - 1)
    );
    assert_eq!(state.balance(&TestData::get_target_address()), U256::from(1));
    assert_eq!(state.balance(&COINBASE), U256::from(21_000));

    assert!(!home.path().join(DEFAULT_DIAGNOSTICS_NAMESPACE).exists());
}

/// The alternate executor reports 21001 gas: processing fails before the live state is
/// mutated and a bundle keyed by block number and transaction hash is written.
#[test]
fn test_gas_mismatch_aborts_block() {
    let config = ChainConfig::all_forks(CHAIN_ID);
    let home = tempfile::tempdir().unwrap();
    let exec_config = TestData::exec_config(home.path());
    let block = TestData::block(&config, 1, vec![TestData::transaction(0)]);
    let genesis = TestData::genesis();
    let mut state = genesis.copy();

    let err = skewed_processor(config)
        .process(&block, &mut state, &exec_config)
        .unwrap_err();

    assert!(err.is_mismatch());
    let mismatch = err.mismatch().unwrap();
    assert_eq!(mismatch.check, MismatchCheck::GasUsed);
    assert_eq!(mismatch.detail, "alternate: 21001, reference: 21000");
    assert_eq!(state.dump(), genesis.dump());

    let tx_hash = block.transactions[0].hash();
    let dir = bundle_dir(&exec_config.diagnostics, 1, &tx_hash);
    assert!(dir.starts_with(
        home.path()
            .join(DEFAULT_DIAGNOSTICS_NAMESPACE)
            .join("1")
    ));
    for name in [
        "summary.json",
        "header.json",
        "tx.json",
        "receipt-alternate.json",
        "receipt-reference.json",
    ] {
        assert!(dir.join(name).is_file(), "missing {name}");
    }

    let summary: DiagnosticReport =
        serde_json::from_slice(&std::fs::read(dir.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary.block_number, 1);
    assert_eq!(summary.tx_hash, tx_hash);
    assert_eq!(summary.alternate.gas_used, 21_001);
    assert_eq!(summary.reference.gas_used, 21_000);
    assert_eq!(summary.mismatch, *mismatch);
    // the skew is in the reported gas only
    assert!(summary.diff.is_empty(), "{:?}", summary.diff);
}

/// Receipts are returned in block order with strictly increasing cumulative gas.
#[test]
fn test_receipts_in_order() {
    let config = ChainConfig::all_forks(CHAIN_ID);
    let home = tempfile::tempdir().unwrap();
    let code = ProgramBuilder::new()
        .log(vec![B256::repeat_byte(0x70)], vec![1, 2])
        .stop()
        .build();
    let block = TestData::block(
        &config,
        1,
        vec![
            TestData::contract_call(0),
            TestData::transaction(1),
            TestData::contract_call(2),
        ],
    );
    let mut state = TestData::genesis_with_contract(code);

    let output = processor(config)
        .process(&block, &mut state, &TestData::exec_config(home.path()))
        .unwrap();

    // 21000 + LOG (3 + 375 + 375 + 2 * 8) + STOP (3)
    let call_gas = 21_772;
    assert_eq!(output.receipts.len(), 3);
    assert_eq!(
        output
            .receipts
            .iter()
            .map(|r| r.cumulative_gas_used)
            .collect::<Vec<_>>(),
        vec![call_gas, call_gas + 21_000, 2 * call_gas + 21_000]
    );
    assert_eq!(output.gas_used, 2 * call_gas + 21_000);
    for (i, receipt) in output.receipts.iter().enumerate() {
        assert_eq!(receipt.transaction_index, i as u64);
        assert_eq!(receipt.tx_hash, block.transactions[i].hash());
    }

    assert_eq!(output.logs.len(), 2);
    assert_eq!(output.logs[0].tx_index, 0);
    assert_eq!(output.logs[1].tx_index, 2);
    assert_eq!(output.logs[1].index, 1);
    assert!(output.logs.iter().all(|log| log.address == CONTRACT
        && log.block_number == 1
        && log.block_hash == block.hash()));
    assert_eq!(output.receipts[1].logs.len(), 0);
}

/// The block runs out of gas on its second transaction.
#[test]
fn test_block_gas_limit_reached() {
    let config = ChainConfig::all_forks(CHAIN_ID);
    let home = tempfile::tempdir().unwrap();
    let mut block = TestData::block(
        &config,
        1,
        vec![TestData::transaction(0), TestData::transaction(1)],
    );
    block.header.gas_limit = 30_000;
    let mut state = TestData::genesis();

    let err = processor(config)
        .process(&block, &mut state, &TestData::exec_config(home.path()))
        .unwrap_err();

    assert!(err.is_gas_limit_reached());
    assert!(!err.is_mismatch());
    assert_eq!(
        err.to_string(),
        "gas limit reached: available 9000, requested 21000"
    );
}

/// The DAO drain happens before the transactions of the fork block.
#[test]
fn test_dao_fork_block() {
    let drained = Address::repeat_byte(0xda);
    let refund_contract = Address::repeat_byte(0xde);
    let mut config = ChainConfig::all_forks(CHAIN_ID);
    config.dao_fork = Some(DaoForkConfig {
        block: 2,
        support: true,
        refund_contract,
        drain_list: vec![drained],
    });
    let home = tempfile::tempdir().unwrap();
    let processor = processor(config.clone());
    let genesis =
        TestData::genesis().with_account(drained, Account::with_balance(U256::from(1_000)));

    let mut state = genesis.copy();
    processor
        .process(
            &TestData::block(&config, 1, vec![]),
            &mut state,
            &TestData::exec_config(home.path()),
        )
        .unwrap();
    assert_eq!(state.balance(&drained), U256::from(1_000));

    let mut state = genesis.copy();
    processor
        .process(
            &TestData::block(&config, 2, vec![TestData::transaction(0)]),
            &mut state,
            &TestData::exec_config(home.path()),
        )
        .unwrap();
    assert_eq!(state.balance(&drained), U256::ZERO);
    assert_eq!(state.balance(&refund_contract), U256::from(1_000));
}

/// With verification disabled, the configured executor alone decides the committed outcome.
#[test]
fn test_configured_executor_is_committed() {
    let config = ChainConfig::all_forks(CHAIN_ID);
    let home = tempfile::tempdir().unwrap();
    let block = TestData::block(&config, 1, vec![TestData::transaction(0)]);
    let processor = skewed_processor(config);

    let unverified = TestData::exec_config(home.path()).set_verification(Verification::Disabled);

    let mut state = TestData::genesis();
    let output = processor
        .process(
            &block,
            &mut state,
            &unverified.clone().set_executor(ExecutorKind::Alternate),
        )
        .unwrap();
    assert_eq!(output.gas_used, 21_001);

    let mut state = TestData::genesis();
    let output = processor.process(&block, &mut state, &unverified).unwrap();
    assert_eq!(output.gas_used, 21_000);

    assert!(!home.path().join(DEFAULT_DIAGNOSTICS_NAMESPACE).exists());
}

/// Pre-Byzantium receipts commit to the state root after each transaction.
#[test]
fn test_frontier_receipts_carry_roots() {
    let config = ChainConfig::frontier(CHAIN_ID);
    let home = tempfile::tempdir().unwrap();
    let block = TestData::block(
        &config,
        1,
        vec![TestData::transaction(0), TestData::transaction(1)],
    );
    let mut state = TestData::genesis();

    let output = processor(config)
        .process(&block, &mut state, &TestData::exec_config(home.path()))
        .unwrap();

    let roots: Vec<_> = output
        .receipts
        .iter()
        .map(|receipt| match receipt.outcome {
            ReceiptOutcome::PostState(root) => root,
            ReceiptOutcome::Status(_) => panic!("status receipt before Byzantium"),
        })
        .collect();
    assert_ne!(roots[0], roots[1]);
    assert_eq!(roots[1], state.intermediate_root(false));
}

/// ExecutionConfig::default writes bundles under $HOME.
#[test]
fn test_default_diagnostics_home() {
    let config = ExecutionConfig::default();
    assert_eq!(config.diagnostics.namespace, DEFAULT_DIAGNOSTICS_NAMESPACE);
    if let Some(home) = std::env::var_os("HOME") {
        assert_eq!(config.diagnostics.home, std::path::PathBuf::from(home));
    }
}

/// A sender at the largest nonce makes the block invalid instead of aborting the process.
#[test]
fn test_nonce_max_fails_block() {
    let config = ChainConfig::all_forks(CHAIN_ID);
    let home = tempfile::tempdir().unwrap();
    let origin = TestData::get_origin_address();
    let genesis = TestData::genesis().with_account(
        origin,
        Account {
            nonce: u64::MAX,
            ..Account::with_balance(U256::from(ORIGIN_BALANCE))
        },
    );
    let block = TestData::block(&config, 1, vec![TestData::transaction(u64::MAX)]);
    let mut state = genesis.copy();

    let err = processor(config)
        .process(&block, &mut state, &TestData::exec_config(home.path()))
        .unwrap_err();

    assert!(!err.is_mismatch());
    assert!(matches!(
        err,
        ProcessError::Execution(ExecutionError::NonceMax { address, nonce })
            if address == origin && nonce == u64::MAX
    ));
    assert_eq!(state.dump(), genesis.dump());
    assert!(!home.path().join(DEFAULT_DIAGNOSTICS_NAMESPACE).exists());
}
