/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines the gas budget available to the transactions of one block.
//!
//! A block starts with a pool seeded from its gas limit. Each transaction buys its whole
//! gas limit from the pool before execution and returns whatever it did not use afterwards,
//! so the sum of gas consumed by a block can never exceed the block gas limit.

/// GasPool tracks the amount of gas available during execution of the transactions in a block.
///
/// It is `Copy` so that verification branches can seed independent pools from the live value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasPool(u64);

impl GasPool {
    pub fn new(gas: u64) -> Self {
        Self(gas)
    }

    /// Makes gas available for execution. Saturates at `u64::MAX`.
    pub fn add_gas(&mut self, amount: u64) -> &mut Self {
        self.0 = self.0.saturating_add(amount);
        self
    }

    /// Deducts the given amount from the pool if enough gas is available. The pool is left
    /// untouched on failure.
    pub fn sub_gas(&mut self, amount: u64) -> Result<(), GasPoolError> {
        if amount > self.0 {
            return Err(GasPoolError {
                available: self.0,
                requested: amount,
            });
        }
        self.0 -= amount;
        Ok(())
    }

    /// Returns the amount of gas remaining in the pool.
    pub fn gas(&self) -> u64 {
        self.0
    }
}

/// Returned by [GasPool::sub_gas] when a transaction asks for more gas than the block has left.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("gas limit reached: available {available}, requested {requested}")]
pub struct GasPoolError {
    pub available: u64,
    pub requested: u64,
}
