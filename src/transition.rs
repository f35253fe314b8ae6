/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! transition defines the state transition of a single transaction.
//!
//! [Applier::apply_transaction] is the entry point: it optionally cross-checks the
//! [executors](crate::execution) through the [verifier](crate::verifier), then applies the
//! transaction to the live state with the configured executor and builds its [Receipt].

use alloy_primitives::Address;
use tracing::debug;

use crate::{
    consensus::ChainContext,
    crypto::create_address,
    error::ProcessError,
    execution::{
        AlternateExecutor, BlockContext, Executors, ReferenceExecutor, TransactionExecutor,
    },
    gas_pool::GasPool,
    params::{ChainConfig, ExecutionConfig, ExecutorKind},
    receipt::Receipt,
    signer::Signer,
    state::StateDB,
    types::{Header, Transaction},
    verifier,
};

/// Applier applies transactions of blocks on a given chain.
pub struct Applier<'a, C, R = ReferenceExecutor, A = AlternateExecutor> {
    config: &'a ChainConfig,
    chain: &'a C,
    executors: &'a Executors<R, A>,
}

impl<'a, C, R, A> Applier<'a, C, R, A>
where
    C: ChainContext,
    R: TransactionExecutor,
    A: TransactionExecutor,
{
    pub fn new(config: &'a ChainConfig, chain: &'a C, executors: &'a Executors<R, A>) -> Self {
        Self {
            config,
            chain,
            executors,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        self.config
    }

    /// Applies the transaction to the state and returns its receipt and the gas it used.
    ///
    /// `author` overrides the fee beneficiary given by the chain context. `used_gas` is the gas
    /// used by the block so far and is increased by the gas of this transaction. On error,
    /// no receipt exists and the block must be discarded.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_transaction(
        &self,
        author: Option<Address>,
        gas_pool: &mut GasPool,
        state: &mut StateDB,
        header: &Header,
        tx: &Transaction,
        used_gas: &mut u64,
        exec_config: &ExecutionConfig,
    ) -> Result<(Receipt, u64), ProcessError> {
        if exec_config.verification_enabled() {
            verifier::verify(
                self,
                author,
                gas_pool,
                state,
                header,
                tx,
                *used_gas,
                &exec_config.diagnostics,
            )?;
        }

        self.apply_with(
            exec_config.executor,
            author,
            gas_pool,
            state,
            header,
            tx,
            used_gas,
        )
    }

    /// Applies the transaction with the given executor, without verification.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn apply_with(
        &self,
        executor: ExecutorKind,
        author: Option<Address>,
        gas_pool: &mut GasPool,
        state: &mut StateDB,
        header: &Header,
        tx: &Transaction,
        used_gas: &mut u64,
    ) -> Result<(Receipt, u64), ProcessError> {
        let message = Signer::for_block(self.config, header.number).as_message(tx)?;
        let coinbase = author.unwrap_or_else(|| self.chain.author(header));
        let ctx = BlockContext::new(&message, header, coinbase, self.config);

        let result = match executor {
            ExecutorKind::Reference => {
                self.executors
                    .reference
                    .apply_message(&ctx, &message, state, gas_pool)?
            }
            ExecutorKind::Alternate => {
                self.executors
                    .alternate
                    .apply_message(&ctx, &message, state, gas_pool)?
            }
        };

        // Byzantium receipts carry a status instead of the intermediate root.
        let rules = ctx.rules;
        let root = if rules.byzantium {
            state.finalise(rules.eip158);
            None
        } else {
            Some(state.intermediate_root(rules.eip158))
        };
        *used_gas += result.gas_used;

        let tx_hash = tx.hash();
        let mut receipt = Receipt::new(root, result.failed, *used_gas);
        receipt.tx_hash = tx_hash;
        receipt.gas_used = result.gas_used;
        if message.is_contract_creation() {
            receipt.contract_address = Some(create_address(&message.from, tx.nonce));
        }
        receipt.set_logs(state.get_logs(&tx_hash));
        receipt.block_hash = state.block_hash();
        receipt.block_number = header.number;
        receipt.transaction_index = state.tx_index();

        debug!(
            block = header.number,
            tx = %tx_hash,
            ?executor,
            gas_used = result.gas_used,
            failed = result.failed,
            "applied transaction"
        );
        Ok((receipt, result.gas_used))
    }
}
