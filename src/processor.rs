/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! processor applies whole blocks to a state.

use tracing::debug;

use crate::{
    consensus::{ChainContext, Engine},
    dao,
    error::ProcessError,
    execution::{AlternateExecutor, Executors, ReferenceExecutor, TransactionExecutor},
    gas_pool::GasPool,
    params::{ChainConfig, ExecutionConfig},
    receipt::Receipt,
    state::StateDB,
    transition::Applier,
    types::{Block, Log},
};

/// Result of processing a block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// One receipt per transaction, in block order.
    pub receipts: Vec<Receipt>,
    /// Every log of the block, in emission order.
    pub logs: Vec<Log>,
    pub gas_used: u64,
}

/// StateProcessor transitions a state from one block to the next. It applies every
/// transaction of the block and lets the consensus engine finalize it.
pub struct StateProcessor<C, E, R = ReferenceExecutor, A = AlternateExecutor> {
    config: ChainConfig,
    chain: C,
    engine: E,
    executors: Executors<R, A>,
}

impl<C, E> StateProcessor<C, E>
where
    C: ChainContext,
    E: Engine<C>,
{
    pub fn new(config: ChainConfig, chain: C, engine: E) -> Self {
        Self::with_executors(config, chain, engine, Executors::default())
    }
}

impl<C, E, R, A> StateProcessor<C, E, R, A>
where
    C: ChainContext,
    E: Engine<C>,
    R: TransactionExecutor,
    A: TransactionExecutor,
{
    pub fn with_executors(
        config: ChainConfig,
        chain: C,
        engine: E,
        executors: Executors<R, A>,
    ) -> Self {
        Self {
            config,
            chain,
            engine,
            executors,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Applier for applying single transactions on the chain of this processor.
    pub fn applier(&self) -> Applier<'_, C, R, A> {
        Applier::new(&self.config, &self.chain, &self.executors)
    }

    /// Processes the block by applying its transactions to the state.
    ///
    /// Returns the receipts, the logs and the gas used. If any transaction fails, processing
    /// stops and the error is returned instead: the block is invalid and the state must be
    /// discarded by the caller.
    pub fn process(
        &self,
        block: &Block,
        state: &mut StateDB,
        exec_config: &ExecutionConfig,
    ) -> Result<ProcessOutput, ProcessError> {
        let header = &block.header;
        let block_hash = block.hash();

        if let Some(dao) = self.config.dao_fork_at(header.number) {
            dao::apply_dao_hard_fork(state, dao);
        }

        let applier = self.applier();
        let mut gas_pool = GasPool::new(block.gas_limit());
        let mut used_gas = 0;
        let mut receipts = Vec::with_capacity(block.transactions.len());
        let mut logs = Vec::new();

        for (i, tx) in block.transactions.iter().enumerate() {
            state.prepare(tx.hash(), block_hash, header.number, i as u64);
            let (receipt, _) = applier.apply_transaction(
                None,
                &mut gas_pool,
                state,
                header,
                tx,
                &mut used_gas,
                exec_config,
            )?;
            logs.extend(receipt.logs.iter().cloned());
            receipts.push(receipt);
        }

        self.engine.finalize(
            &self.chain,
            header,
            state,
            &block.transactions,
            &block.uncles,
        );

        debug!(
            block = header.number,
            transactions = receipts.len(),
            gas_used = used_gas,
            "processed block"
        );
        Ok(ProcessOutput {
            receipts,
            logs,
            gas_used: used_gas,
        })
    }
}
