/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Seams to the consensus layer. Block processing needs to know who receives the fees of a
//! block, and lets the consensus engine apply its own end-of-block effects (e.g. rewards).

use alloy_primitives::Address;

use crate::{
    state::StateDB,
    types::{Header, Transaction},
};

/// Read access to the chain a block is processed on.
pub trait ChainContext {
    /// Beneficiary of the fees of the block. Defaults to the coinbase of the header.
    fn author(&self, header: &Header) -> Address {
        header.coinbase
    }
}

/// Consensus engine of the chain.
pub trait Engine<C: ChainContext> {
    /// Applies consensus specific effects once every transaction of the block has been applied.
    fn finalize(
        &self,
        chain: &C,
        header: &Header,
        state: &mut StateDB,
        transactions: &[Transaction],
        uncles: &[Header],
    );
}
