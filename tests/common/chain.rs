use alloy_primitives::U256;
use dualvm_runtime::{ChainContext, Engine, Header, StateDB, Transaction};

/// Chain whose blocks pay their fees to the header coinbase.
#[derive(Debug, Clone, Default)]
pub struct TestChain;

impl ChainContext for TestChain {}

/// Engine that pays a fixed reward to the author of each block.
#[derive(Debug, Clone, Default)]
pub struct TestEngine {
    pub reward: U256,
}

impl Engine<TestChain> for TestEngine {
    fn finalize(
        &self,
        chain: &TestChain,
        header: &Header,
        state: &mut StateDB,
        _transactions: &[Transaction],
        _uncles: &[Header],
    ) {
        if !self.reward.is_zero() {
            state.add_balance(chain.author(header), self.reward);
        }
    }
}
