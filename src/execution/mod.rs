/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Implementation of message execution.
//!
//! A [TransactionExecutor] applies one [Message] to a [StateDB] within the budget of a
//! [GasPool]. Two independent implementations exist and are expected to agree bit for bit:
//! - [ReferenceExecutor] interprets [programs](program) while streaming over their bytes and
//!   mutates the state directly, undoing failed calls through state snapshots.
//! - [AlternateExecutor] decodes programs up front and executes them against a private write
//!   set that only reaches the state when the call succeeds.
//!
//! Both charge gas exclusively through [crate::gas] and run the same [precompile]s.

pub mod alternate;
pub use alternate::AlternateExecutor;

pub mod precompile;

pub mod program;

pub mod reference;
pub use reference::ReferenceExecutor;

pub(crate) mod write_set;

use alloy_primitives::{Address, Bytes, U256};

use crate::{
    error::ExecutionError,
    gas_pool::GasPool,
    params::{ChainConfig, Rules},
    types::{Header, Message},
};

/// BlockContext defines the environment a message is executed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContext {
    /// Sender of the transaction.
    pub origin: Address,
    pub gas_price: U256,
    /// Beneficiary of the transaction fees.
    pub coinbase: Address,
    pub number: u64,
    pub timestamp: u64,
    pub gas_limit: u64,
    pub rules: Rules,
}

impl BlockContext {
    pub fn new(message: &Message, header: &Header, coinbase: Address, config: &ChainConfig) -> Self {
        Self {
            origin: message.from,
            gas_price: message.gas_price,
            coinbase,
            number: header.number,
            timestamp: header.timestamp,
            gas_limit: header.gas_limit,
            rules: config.rules(header.number),
        }
    }
}

/// Outcome of executing a message that could be included in the block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Output of the call, or the deployed code of a successful creation.
    pub return_data: Bytes,
    /// Gas charged to the sender after refunds.
    pub gas_used: u64,
    /// Whether the call reverted or halted exceptionally. Gas is charged either way.
    pub failed: bool,
}

/// TransactionExecutor is the capability of applying one message to a state.
///
/// Implementations must check, in this order and before mutating anything: the nonce, the
/// balance for `gas_limit * gas_price`, the intrinsic gas, the balance for `gas_limit *
/// gas_price + value`, and finally deduct `gas_limit` from the gas pool. A returned error
/// therefore leaves the state and the gas pool untouched.
pub trait TransactionExecutor {
    fn apply_message(
        &self,
        ctx: &BlockContext,
        message: &Message,
        state: &mut crate::state::StateDB,
        gas_pool: &mut GasPool,
    ) -> Result<ExecutionResult, ExecutionError>;
}

/// Reason a call or creation failed without invalidating the transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Halt {
    /// REVERT: state changes are undone, remaining gas is kept.
    Revert,
    /// Out of gas, invalid instruction or failed creation: state changes are undone and all
    /// remaining gas is consumed.
    Exceptional,
}

/// Executors holds the two executor implementations side by side. Which one is used for a
/// given run is decided by the caller with a `match` over [ExecutorKind](crate::params::ExecutorKind).
#[derive(Debug, Clone, Default)]
pub struct Executors<R = ReferenceExecutor, A = AlternateExecutor> {
    pub reference: R,
    pub alternate: A,
}

impl<R, A> Executors<R, A>
where
    R: TransactionExecutor,
    A: TransactionExecutor,
{
    pub fn new(reference: R, alternate: A) -> Self {
        Self {
            reference,
            alternate,
        }
    }
}
