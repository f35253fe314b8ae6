/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Irregular state change performed at the DAO fork block.

use alloy_primitives::U256;

use crate::{params::DaoForkConfig, state::StateDB};

/// Moves the whole balance of every account in the drain list into the refund contract,
/// creating the contract account if it does not exist.
pub fn apply_dao_hard_fork(state: &mut StateDB, dao: &DaoForkConfig) {
    if !state.exist(&dao.refund_contract) {
        state.create_account(dao.refund_contract);
    }
    for address in &dao.drain_list {
        let balance = state.balance(address);
        state.add_balance(dao.refund_contract, balance);
        state.set_balance(*address, U256::ZERO);
    }
}
