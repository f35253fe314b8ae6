use alloy_primitives::{Address, U256};
use dualvm_runtime::{
    AlternateExecutor, BlockContext, ChainConfig, ExecutionError, ExecutionResult, Executors,
    GasPool, Message, ReferenceExecutor, StateDB, StateProcessor, TransactionExecutor,
};

use super::{TestChain, TestEngine};

/// Executor that reports one more unit of gas than the executor it wraps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkewedExecutor<E>(pub E);

impl<E: TransactionExecutor> TransactionExecutor for SkewedExecutor<E> {
    fn apply_message(
        &self,
        ctx: &BlockContext,
        message: &Message,
        state: &mut StateDB,
        gas_pool: &mut GasPool,
    ) -> Result<ExecutionResult, ExecutionError> {
        let mut result = self.0.apply_message(ctx, message, state, gas_pool)?;
        result.gas_used += 1;
        Ok(result)
    }
}

/// Account that [StateSkewExecutor] credits behind the back of the receipt.
pub const SKEW_ADDRESS: Address = Address::repeat_byte(0x55);

/// Executor that credits one unit to [SKEW_ADDRESS] after every successful message. Gas and
/// logs are left as the wrapped executor produced them.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateSkewExecutor<E>(pub E);

impl<E: TransactionExecutor> TransactionExecutor for StateSkewExecutor<E> {
    fn apply_message(
        &self,
        ctx: &BlockContext,
        message: &Message,
        state: &mut StateDB,
        gas_pool: &mut GasPool,
    ) -> Result<ExecutionResult, ExecutionError> {
        let result = self.0.apply_message(ctx, message, state, gas_pool)?;
        state.add_balance(SKEW_ADDRESS, U256::from(1));
        Ok(result)
    }
}

/// Executor that rejects messages for the same reasons as the executor it wraps, but always
/// reports the rejection as a gas overflow.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorSkewExecutor<E>(pub E);

impl<E: TransactionExecutor> TransactionExecutor for ErrorSkewExecutor<E> {
    fn apply_message(
        &self,
        ctx: &BlockContext,
        message: &Message,
        state: &mut StateDB,
        gas_pool: &mut GasPool,
    ) -> Result<ExecutionResult, ExecutionError> {
        self.0
            .apply_message(ctx, message, state, gas_pool)
            .map_err(|_| ExecutionError::GasOverflow)
    }
}

pub type TestProcessor = StateProcessor<TestChain, TestEngine>;

pub type SkewedProcessor =
    StateProcessor<TestChain, TestEngine, ReferenceExecutor, SkewedExecutor<AlternateExecutor>>;

pub fn processor(config: ChainConfig) -> TestProcessor {
    StateProcessor::new(config, TestChain, TestEngine::default())
}

/// Processor with the reference executor and the given executor in the alternate seat.
pub fn processor_with<A: TransactionExecutor>(
    config: ChainConfig,
    alternate: A,
) -> StateProcessor<TestChain, TestEngine, ReferenceExecutor, A> {
    StateProcessor::with_executors(
        config,
        TestChain,
        TestEngine::default(),
        Executors::new(ReferenceExecutor, alternate),
    )
}

/// Processor whose alternate executor disagrees on the gas used of every transaction.
pub fn skewed_processor(config: ChainConfig) -> SkewedProcessor {
    processor_with(config, SkewedExecutor(AlternateExecutor))
}
