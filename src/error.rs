/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! error defines sets of error definitions in entire life time of block processing.
//!
//! Every error here is fatal to the transaction and to the block that contains it. A contract
//! that reverts or runs out of gas is not an error: it yields a receipt with a failed status.

use alloy_primitives::{Address, U256};

use crate::{gas_pool::GasPoolError, signer::SignerError, verifier::Mismatch};

/// Errors raised by an executor when a message cannot be included in a block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// Nonce of the message is ahead of the account nonce.
    #[error("nonce too high: address {address}, tx: {tx} state: {state}")]
    NonceTooHigh { address: Address, tx: u64, state: u64 },

    /// Nonce of the message has already been used.
    #[error("nonce too low: address {address}, tx: {tx} state: {state}")]
    NonceTooLow { address: Address, tx: u64, state: u64 },

    /// Account nonce cannot be increased any further.
    #[error("nonce has max value: address {address}, nonce: {nonce}")]
    NonceMax { address: Address, nonce: u64 },

    /// Not enough balance to pay for gas limit.
    #[error("insufficient funds for gas * price: address {address} have {have} want {want}")]
    InsufficientBalanceForGas {
        address: Address,
        have: U256,
        want: U256,
    },

    /// Not enough balance to pay for the transferred value.
    #[error("insufficient balance for transfer: address {address} have {have} want {want}")]
    InsufficientBalanceForTransfer {
        address: Address,
        have: U256,
        want: U256,
    },

    /// Gas limit was insufficient to cover pre-execution costs.
    #[error("intrinsic gas too low: have {have}, want {want}")]
    IntrinsicGas { have: u64, want: u64 },

    /// Intrinsic gas or gas cost does not fit in its integer type.
    #[error("gas uint64 overflow")]
    GasOverflow,

    /// The block does not have enough gas left for the message's gas limit.
    #[error(transparent)]
    GasLimitReached(#[from] GasPoolError),
}

/// Errors returned by transaction application and block processing.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The sender could not be resolved from the signature.
    #[error(transparent)]
    Sender(#[from] SignerError),

    /// The executor rejected the message.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The two executors disagreed on the outcome of a transaction.
    #[error(transparent)]
    Mismatch(#[from] Mismatch),

    /// The two executors disagreed and the diagnostic bundle could not be written either.
    #[error("{mismatch} (persisting diagnostics failed: {source:#})")]
    Diagnostics {
        mismatch: Mismatch,
        #[source]
        source: anyhow::Error,
    },
}

impl ProcessError {
    /// Returns the executor disagreement behind this error, if any. Retrying the block cannot
    /// resolve it.
    pub fn mismatch(&self) -> Option<&Mismatch> {
        match self {
            ProcessError::Mismatch(mismatch) | ProcessError::Diagnostics { mismatch, .. } => {
                Some(mismatch)
            }
            _ => None,
        }
    }

    pub fn is_mismatch(&self) -> bool {
        self.mismatch().is_some()
    }

    /// Whether the block ran out of gas for this transaction.
    pub fn is_gas_limit_reached(&self) -> bool {
        matches!(
            self,
            ProcessError::Execution(ExecutionError::GasLimitReached(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::MismatchCheck;

    fn mismatch() -> Mismatch {
        Mismatch::new(MismatchCheck::GasUsed, "alternate: 21001, reference: 21000")
    }

    #[test]
    fn test_mismatch_category_survives_diagnostics_failure() {
        let err = ProcessError::Diagnostics {
            mismatch: mismatch(),
            source: anyhow::anyhow!("disk full"),
        };
        assert!(err.is_mismatch());
        assert_eq!(err.mismatch(), Some(&mismatch()));
        assert!(err.to_string().contains("gas used"));
        assert!(err.to_string().contains("disk full"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_execution_errors_are_not_mismatches() {
        let err: ProcessError = ExecutionError::from(GasPoolError {
            available: 0,
            requested: 21_000,
        })
        .into();
        assert!(!err.is_mismatch());
        assert!(err.is_gas_limit_reached());
        assert_eq!(
            err.to_string(),
            "gas limit reached: available 0, requested 21000"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProcessError>();
    }
}
