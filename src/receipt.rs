/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Receipt is the durable record of the outcome of a transaction.

use alloy_primitives::{Address, Bloom, BloomInput, B256};
use serde::{Deserialize, Serialize};

use crate::types::Log;

/// Outcome of a transaction as committed in its receipt. Which variant is used depends on
/// whether EIP-658 (Byzantium) is active at the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptOutcome {
    /// State root after the transaction.
    PostState(B256),
    /// Whether execution succeeded.
    Status(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub outcome: ReceiptOutcome,
    /// Gas used in the block up to and including this transaction.
    pub cumulative_gas_used: u64,
    pub bloom: Bloom,
    pub logs: Vec<Log>,

    pub tx_hash: B256,
    /// Address of the created contract. Only set for contract creations.
    pub contract_address: Option<Address>,
    /// Gas used by this transaction alone.
    pub gas_used: u64,

    pub block_hash: B256,
    pub block_number: u64,
    pub transaction_index: u64,
}

impl Receipt {
    /// Creates a receipt with an empty log set. `root` is used as outcome if present,
    /// otherwise the status is derived from `failed`.
    pub fn new(root: Option<B256>, failed: bool, cumulative_gas_used: u64) -> Self {
        let outcome = match root {
            Some(root) => ReceiptOutcome::PostState(root),
            None => ReceiptOutcome::Status(!failed),
        };
        Self {
            outcome,
            cumulative_gas_used,
            bloom: Bloom::ZERO,
            logs: Vec::new(),
            tx_hash: B256::ZERO,
            contract_address: None,
            gas_used: 0,
            block_hash: B256::ZERO,
            block_number: 0,
            transaction_index: 0,
        }
    }

    /// Sets the logs of the receipt and derives its bloom filter from them.
    pub fn set_logs(&mut self, logs: Vec<Log>) {
        self.bloom = logs_bloom(&logs);
        self.logs = logs;
    }

    /// Whether the transaction succeeded. Receipts carrying a post-state root do not record
    /// the outcome and are reported as successful.
    pub fn succeeded(&self) -> bool {
        !matches!(self.outcome, ReceiptOutcome::Status(false))
    }
}

/// Bloom filter over the addresses and topics of the logs.
pub fn logs_bloom<'a>(logs: impl IntoIterator<Item = &'a Log>) -> Bloom {
    let mut bloom = Bloom::ZERO;
    for log in logs {
        bloom.accrue(BloomInput::Raw(log.address.as_slice()));
        for topic in &log.topics {
            bloom.accrue(BloomInput::Raw(topic.as_slice()));
        }
    }
    bloom
}

/// Bloom filter over every log of the receipts, as committed in a block header.
pub fn create_bloom(receipts: &[Receipt]) -> Bloom {
    logs_bloom(receipts.iter().flat_map(|receipt| receipt.logs.iter()))
}
