/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines formulas in calculation of gas which is a measurement unit for transaction
//! execution. Both executors charge gas exclusively through the constants and functions in
//! this module, so that a disagreement between them is a disagreement in execution and not
//! in the schedule.
//!
//! |Name           | Related Function / Constants  |
//! |:---           |:---                           |
//! |G_transaction  | [TX_GAS]                      |
//! |G_txcreate     | [TX_GAS_CONTRACT_CREATION]    |
//! |G_txdatazero   | [TX_DATA_ZERO_GAS]            |
//! |G_txdatanonzero| [TX_DATA_NON_ZERO_GAS]        |
//! |G_codedeposit  | [CREATE_DATA_GAS]             |
//! |G_sset         | [SSTORE_SET_GAS]              |
//! |G_sreset       | [SSTORE_RESET_GAS]            |
//! |R_sclear       | [SSTORE_CLEAR_REFUND]         |
//! |G_log         | [LOG_GAS], [LOG_TOPIC_GAS], [LOG_DATA_GAS] |
//! |G_verylow      | [STEP_GAS]                    |
//! |G_intrinsic    | [intrinsic_gas]               |

/// Base cost of every transaction.
pub const TX_GAS: u64 = 21_000;

/// Base cost of a contract creation transaction once Homestead is active.
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;

/// Cost per zero byte of transaction payload.
pub const TX_DATA_ZERO_GAS: u64 = 4;

/// Cost per non-zero byte of transaction payload.
pub const TX_DATA_NON_ZERO_GAS: u64 = 68;

/// Cost per byte of code deposited by a contract creation.
pub const CREATE_DATA_GAS: u64 = 200;

/// Maximum size of deployed code once EIP-158 (EIP-170) is active.
pub const MAX_CODE_SIZE: usize = 24_576;

/// Cost of setting a storage slot from zero to non-zero.
pub const SSTORE_SET_GAS: u64 = 20_000;

/// Cost of any other storage write.
pub const SSTORE_RESET_GAS: u64 = 5_000;

/// Refund granted for clearing a storage slot.
pub const SSTORE_CLEAR_REFUND: u64 = 15_000;

pub const LOG_GAS: u64 = 375;
pub const LOG_TOPIC_GAS: u64 = 375;
pub const LOG_DATA_GAS: u64 = 8;

/// Cost charged for decoding and dispatching any program instruction.
pub const STEP_GAS: u64 = 3;

/// At most `gas_used / REFUND_QUOTIENT` gas is refunded at the end of a transaction.
pub const REFUND_QUOTIENT: u64 = 2;

pub const SHA256_BASE_GAS: u64 = 60;
pub const SHA256_PER_WORD_GAS: u64 = 12;
pub const RIPEMD160_BASE_GAS: u64 = 600;
pub const RIPEMD160_PER_WORD_GAS: u64 = 120;
pub const IDENTITY_BASE_GAS: u64 = 15;
pub const IDENTITY_PER_WORD_GAS: u64 = 3;

/// Computes the gas a message must pay before any execution happens. Returns None on overflow.
pub fn intrinsic_gas(data: &[u8], contract_creation: bool, homestead: bool) -> Option<u64> {
    let base = if contract_creation && homestead {
        TX_GAS_CONTRACT_CREATION
    } else {
        TX_GAS
    };
    let zeros = data.iter().filter(|b| **b == 0).count() as u64;
    let non_zeros = data.len() as u64 - zeros;

    non_zeros
        .checked_mul(TX_DATA_NON_ZERO_GAS)
        .and_then(|cost| cost.checked_add(base))
        .and_then(|cost| zeros.checked_mul(TX_DATA_ZERO_GAS)?.checked_add(cost))
}

/// Number of 32-byte words needed to hold `len` bytes.
pub const fn words(len: usize) -> u64 {
    ((len as u64) + 31) / 32
}

/// Cost of a precompile with a linear `base + per_word * words(input)` price.
pub const fn linear_cost(base: u64, per_word: u64, input_len: usize) -> u64 {
    base.saturating_add(per_word.saturating_mul(words(input_len)))
}

/// Cost of a LOG instruction, excluding [STEP_GAS].
pub const fn log_cost(topics: usize, data_len: usize) -> u64 {
    LOG_GAS + LOG_TOPIC_GAS * topics as u64 + LOG_DATA_GAS * data_len as u64
}

/// Cost of an SSTORE instruction, excluding [STEP_GAS], and the refund it earns.
pub fn sstore_cost(current_is_zero: bool, new_is_zero: bool) -> (u64, u64) {
    match (current_is_zero, new_is_zero) {
        (true, false) => (SSTORE_SET_GAS, 0),
        (false, true) => (SSTORE_RESET_GAS, SSTORE_CLEAR_REFUND),
        _ => (SSTORE_RESET_GAS, 0),
    }
}
