/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Alternate executor. It applies a message in three phases:
//! - Pre-Charge: checks that the message can be included in the block without touching the
//!   state, then buys the gas and increases the sender nonce.
//! - Frame: runs the call or creation against a [WriteSet]. Programs are decoded in full before
//!   the first instruction executes. The write set is committed only if the frame succeeds.
//! - Charge: refunds unused gas to the sender and the pool, and pays the coinbase.

use alloy_primitives::{Address, Bytes, U256};

use super::{
    precompile::Precompile,
    program::{self, Instruction},
    write_set::{Changes, WriteSet},
    BlockContext, ExecutionResult, Halt, TransactionExecutor,
};
use crate::{
    crypto::create_address,
    error::ExecutionError,
    gas::{self, STEP_GAS},
    gas_pool::GasPool,
    state::StateDB,
    types::{Log, Message},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct AlternateExecutor;

impl TransactionExecutor for AlternateExecutor {
    fn apply_message(
        &self,
        ctx: &BlockContext,
        message: &Message,
        state: &mut StateDB,
        gas_pool: &mut GasPool,
    ) -> Result<ExecutionResult, ExecutionError> {
        let upfront = pre_charge(ctx, message, state, gas_pool)?;

        let outcome = {
            let gas = message.gas_limit - upfront.intrinsic_gas;
            let mut frame = Frame::new(ctx, message, state, gas);
            match message.to {
                Some(to) => frame.call(to),
                None => frame.create(upfront.nonce),
            }
        };

        if let Some(changes) = outcome.changes {
            changes.commit(state);
        }
        let gas_used = charge(ctx, message, state, gas_pool, outcome.gas_left);

        Ok(ExecutionResult {
            return_data: outcome.return_data,
            gas_used,
            failed: outcome.halt.is_some(),
        })
    }
}

/// Values established during Pre-Charge.
struct Upfront {
    intrinsic_gas: u64,
    /// Sender nonce before the message.
    nonce: u64,
}

/// Pre-Charge is a Phase in State Transition. Every check happens before the first write, so
/// that an error leaves the state and the gas pool as they were.
fn pre_charge(
    ctx: &BlockContext,
    message: &Message,
    state: &mut StateDB,
    gas_pool: &mut GasPool,
) -> Result<Upfront, ExecutionError> {
    let from = message.from;
    let (nonce, balance) = match state.account(&from) {
        Some(account) => (account.nonce, account.balance),
        None => (0, U256::ZERO),
    };

    match nonce.cmp(&message.nonce) {
        std::cmp::Ordering::Less => {
            return Err(ExecutionError::NonceTooHigh {
                address: from,
                tx: message.nonce,
                state: nonce,
            })
        }
        std::cmp::Ordering::Greater => {
            return Err(ExecutionError::NonceTooLow {
                address: from,
                tx: message.nonce,
                state: nonce,
            })
        }
        std::cmp::Ordering::Equal => {}
    }
    if nonce == u64::MAX {
        return Err(ExecutionError::NonceMax {
            address: from,
            nonce,
        });
    }

    let Some(gas_cost) = message.gas_price.checked_mul(U256::from(message.gas_limit)) else {
        return Err(ExecutionError::GasOverflow);
    };
    let Some(after_gas) = balance.checked_sub(gas_cost) else {
        return Err(ExecutionError::InsufficientBalanceForGas {
            address: from,
            have: balance,
            want: gas_cost,
        });
    };

    let intrinsic_gas = gas::intrinsic_gas(
        &message.data,
        message.to.is_none(),
        ctx.rules.homestead,
    )
    .ok_or(ExecutionError::GasOverflow)?;
    if intrinsic_gas > message.gas_limit {
        return Err(ExecutionError::IntrinsicGas {
            have: message.gas_limit,
            want: intrinsic_gas,
        });
    }

    if after_gas < message.value {
        return Err(ExecutionError::InsufficientBalanceForTransfer {
            address: from,
            have: after_gas,
            want: message.value,
        });
    }

    gas_pool.sub_gas(message.gas_limit)?;

    state.set_balance(from, after_gas);
    state.set_nonce(from, nonce + 1);

    Ok(Upfront {
        intrinsic_gas,
        nonce,
    })
}

/// Charge is a Phase in State Transition. Returns the gas used by the message.
fn charge(
    ctx: &BlockContext,
    message: &Message,
    state: &mut StateDB,
    gas_pool: &mut GasPool,
    gas_left: u64,
) -> u64 {
    let spent = message.gas_limit - gas_left;
    let refund = state.refund().min(spent / gas::REFUND_QUOTIENT);
    let gas_left = gas_left + refund;
    let gas_used = message.gas_limit - gas_left;

    state.add_balance(
        message.from,
        message.gas_price.saturating_mul(U256::from(gas_left)),
    );
    gas_pool.add_gas(gas_left);
    state.add_balance(
        ctx.coinbase,
        message.gas_price.saturating_mul(U256::from(gas_used)),
    );
    gas_used
}

/// Result of a frame. `changes` is None if the frame failed or had nothing to write.
struct FrameOutcome {
    changes: Option<Changes>,
    gas_left: u64,
    return_data: Bytes,
    halt: Option<Halt>,
}

struct Frame<'a> {
    ctx: &'a BlockContext,
    message: &'a Message,
    writes: WriteSet<'a>,
    gas: u64,
}

impl<'a> Frame<'a> {
    fn new(ctx: &'a BlockContext, message: &'a Message, state: &'a StateDB, gas: u64) -> Self {
        Self {
            ctx,
            message,
            writes: WriteSet::new(state),
            gas,
        }
    }

    fn call(mut self, to: Address) -> FrameOutcome {
        let precompile = Precompile::at(&to);
        if !self.writes.exists(&to) {
            if precompile.is_none() && self.ctx.rules.eip158 && self.message.value.is_zero() {
                return self.finish(Ok(Bytes::new()));
            }
            self.writes.create_account(to);
        }
        self.writes
            .transfer(self.message.from, to, self.message.value);

        let result = match precompile {
            Some(precompile) => self
                .use_gas(precompile.gas_cost(&self.message.data))
                .map(|()| precompile.run(&self.message.data)),
            None => {
                let code = self.writes.code(&to);
                program::decode(&code)
                    .map_err(|_| Halt::Exceptional)
                    .and_then(|instructions| self.execute(to, &instructions))
            }
        };
        self.finish(result)
    }

    fn create(mut self, sender_nonce: u64) -> FrameOutcome {
        let rules = self.ctx.rules;
        let address = create_address(&self.message.from, sender_nonce);
        if self.writes.nonce(&address) != 0 || !self.writes.code(&address).is_empty() {
            return self.finish(Err(Halt::Exceptional));
        }

        self.writes.create_account(address);
        if rules.eip158 {
            self.writes.set_nonce(address, 1);
        }
        self.writes
            .transfer(self.message.from, address, self.message.value);

        let code = self.message.data.clone();
        if rules.eip158 && code.len() > gas::MAX_CODE_SIZE {
            return self.finish(Err(Halt::Exceptional));
        }
        let deposit_cost = gas::CREATE_DATA_GAS * code.len() as u64;
        let result = if self.gas >= deposit_cost {
            self.gas -= deposit_cost;
            self.writes.set_code(address, code.clone());
            Ok(code)
        } else if rules.homestead {
            Err(Halt::Exceptional)
        } else {
            Ok(Bytes::new())
        };
        self.finish(result)
    }

    fn execute(&mut self, address: Address, instructions: &[Instruction]) -> Result<Bytes, Halt> {
        for instruction in instructions {
            match instruction {
                Instruction::Stop => {
                    self.use_gas(STEP_GAS)?;
                    return Ok(Bytes::new());
                }
                Instruction::SStore { key, value } => {
                    let current = self.writes.storage(&address, key);
                    let (cost, refund) = gas::sstore_cost(current.is_zero(), value.is_zero());
                    self.use_gas(STEP_GAS + cost)?;
                    self.writes.set_storage(address, *key, *value);
                    self.writes.add_refund(refund);
                }
                Instruction::Log { topics, data } => {
                    self.use_gas(STEP_GAS + gas::log_cost(topics.len(), data.len()))?;
                    self.writes
                        .add_log(Log::new(address, topics.clone(), data.clone()));
                }
                Instruction::Return(data) => {
                    self.use_gas(STEP_GAS)?;
                    return Ok(data.clone());
                }
                Instruction::Revert => {
                    if !self.ctx.rules.byzantium {
                        return Err(Halt::Exceptional);
                    }
                    self.use_gas(STEP_GAS)?;
                    return Err(Halt::Revert);
                }
            }
        }
        Ok(Bytes::new())
    }

    fn use_gas(&mut self, amount: u64) -> Result<(), Halt> {
        if self.gas < amount {
            return Err(Halt::Exceptional);
        }
        self.gas -= amount;
        Ok(())
    }

    fn finish(self, result: Result<Bytes, Halt>) -> FrameOutcome {
        match result {
            Ok(return_data) => FrameOutcome {
                changes: Some(self.writes.into_changes()),
                gas_left: self.gas,
                return_data,
                halt: None,
            },
            Err(halt) => FrameOutcome {
                changes: None,
                gas_left: match halt {
                    Halt::Revert => self.gas,
                    Halt::Exceptional => 0,
                },
                return_data: Bytes::new(),
                halt: Some(halt),
            },
        }
    }
}
