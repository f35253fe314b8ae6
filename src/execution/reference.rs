/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Reference executor. It applies a message as a sequence of direct mutations of the state:
//!
//! 1. Pre-check: nonce, balance and gas pool are verified, then the gas is bought.
//! 2. Execution: the sender nonce is increased, a snapshot is taken, and the call or creation is
//!    performed. Program bytes are interpreted as they are read. A failure reverts the state to
//!    the snapshot.
//! 3. Settlement: unused gas plus refund is returned to the sender and the pool, and the
//!    coinbase is paid for the gas used.

use alloy_primitives::{Address, Bytes, B256, U256};

use super::{precompile::Precompile, program, BlockContext, ExecutionResult, Halt, TransactionExecutor};
use crate::{
    crypto::create_address,
    error::ExecutionError,
    gas::{self, STEP_GAS},
    gas_pool::GasPool,
    state::StateDB,
    types::{Log, Message},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceExecutor;

impl TransactionExecutor for ReferenceExecutor {
    fn apply_message(
        &self,
        ctx: &BlockContext,
        message: &Message,
        state: &mut StateDB,
        gas_pool: &mut GasPool,
    ) -> Result<ExecutionResult, ExecutionError> {
        StateTransition {
            ctx,
            message,
            state,
            gas_pool,
            gas: 0,
        }
        .transition_db()
    }
}

struct StateTransition<'a> {
    ctx: &'a BlockContext,
    message: &'a Message,
    state: &'a mut StateDB,
    gas_pool: &'a mut GasPool,
    /// Gas left.
    gas: u64,
}

impl<'a> StateTransition<'a> {
    fn transition_db(mut self) -> Result<ExecutionResult, ExecutionError> {
        self.pre_check()?;

        let from = self.message.from;
        let (return_data, outcome) = match self.message.to {
            None => self.create(),
            Some(to) => {
                let nonce = self.state.nonce(&from);
                self.state.set_nonce(from, nonce + 1);
                self.call(to)
            }
        };

        self.refund_gas();
        let gas_used = self.gas_used();
        self.state.add_balance(
            self.ctx.coinbase,
            U256::from(gas_used).saturating_mul(self.message.gas_price),
        );

        Ok(ExecutionResult {
            return_data,
            gas_used,
            failed: outcome.is_err(),
        })
    }

    //
    //
    // Pre-check
    //
    //

    fn pre_check(&mut self) -> Result<(), ExecutionError> {
        let message = self.message;
        let from = message.from;

        let state_nonce = self.state.nonce(&from);
        if state_nonce < message.nonce {
            return Err(ExecutionError::NonceTooHigh {
                address: from,
                tx: message.nonce,
                state: state_nonce,
            });
        }
        if state_nonce > message.nonce {
            return Err(ExecutionError::NonceTooLow {
                address: from,
                tx: message.nonce,
                state: state_nonce,
            });
        }
        if state_nonce == u64::MAX {
            return Err(ExecutionError::NonceMax {
                address: from,
                nonce: state_nonce,
            });
        }

        let gas_cost = U256::from(message.gas_limit)
            .checked_mul(message.gas_price)
            .ok_or(ExecutionError::GasOverflow)?;
        let balance = self.state.balance(&from);
        if balance < gas_cost {
            return Err(ExecutionError::InsufficientBalanceForGas {
                address: from,
                have: balance,
                want: gas_cost,
            });
        }

        let intrinsic = gas::intrinsic_gas(
            &message.data,
            message.is_contract_creation(),
            self.ctx.rules.homestead,
        )
        .ok_or(ExecutionError::GasOverflow)?;
        if message.gas_limit < intrinsic {
            return Err(ExecutionError::IntrinsicGas {
                have: message.gas_limit,
                want: intrinsic,
            });
        }

        if balance - gas_cost < message.value {
            return Err(ExecutionError::InsufficientBalanceForTransfer {
                address: from,
                have: balance - gas_cost,
                want: message.value,
            });
        }

        self.gas_pool.sub_gas(message.gas_limit)?;

        // buy gas
        self.state.sub_balance(from, gas_cost);
        self.gas = message.gas_limit - intrinsic;
        Ok(())
    }

    //
    //
    // Execution
    //
    //

    fn call(&mut self, to: Address) -> (Bytes, Result<(), Halt>) {
        let message = self.message;
        let snapshot = self.state.snapshot();
        let precompile = Precompile::at(&to);

        if !self.state.exist(&to) {
            if precompile.is_none() && self.ctx.rules.eip158 && message.value.is_zero() {
                return (Bytes::new(), Ok(()));
            }
            self.state.create_account(to);
        }
        self.state.sub_balance(message.from, message.value);
        self.state.add_balance(to, message.value);

        let result = match precompile {
            Some(precompile) => {
                let cost = precompile.gas_cost(&message.data);
                self.use_gas(cost)
                    .map(|_| precompile.run(&message.data))
            }
            None => {
                let code = self.state.code(&to);
                Interpreter::new(&code, to, self.ctx).run(self.state, &mut self.gas)
            }
        };

        self.settle_frame(snapshot, result)
    }

    fn create(&mut self) -> (Bytes, Result<(), Halt>) {
        let message = self.message;
        let rules = self.ctx.rules;
        let from = message.from;

        let nonce = self.state.nonce(&from);
        self.state.set_nonce(from, nonce + 1);

        let address = create_address(&from, nonce);
        if self.state.nonce(&address) != 0 || !self.state.code(&address).is_empty() {
            self.gas = 0;
            return (Bytes::new(), Err(Halt::Exceptional));
        }

        let snapshot = self.state.snapshot();
        self.state.create_account(address);
        if rules.eip158 {
            self.state.set_nonce(address, 1);
        }
        self.state.sub_balance(from, message.value);
        self.state.add_balance(address, message.value);

        let code = message.data.clone();
        let result = if rules.eip158 && code.len() > gas::MAX_CODE_SIZE {
            Err(Halt::Exceptional)
        } else {
            let deposit = code.len() as u64 * gas::CREATE_DATA_GAS;
            match self.use_gas(deposit) {
                Ok(()) => {
                    self.state.set_code(address, code.clone());
                    Ok(code)
                }
                Err(_) if rules.homestead => Err(Halt::Exceptional),
                // Frontier: the contract is created without code.
                Err(_) => Ok(Bytes::new()),
            }
        };

        self.settle_frame(snapshot, result)
    }

    fn settle_frame(
        &mut self,
        snapshot: usize,
        result: Result<Bytes, Halt>,
    ) -> (Bytes, Result<(), Halt>) {
        match result {
            Ok(return_data) => (return_data, Ok(())),
            Err(halt) => {
                self.state.revert_to_snapshot(snapshot);
                if halt == Halt::Exceptional {
                    self.gas = 0;
                }
                (Bytes::new(), Err(halt))
            }
        }
    }

    //
    //
    // Settlement
    //
    //

    fn use_gas(&mut self, amount: u64) -> Result<(), Halt> {
        self.gas = self.gas.checked_sub(amount).ok_or(Halt::Exceptional)?;
        Ok(())
    }

    fn refund_gas(&mut self) {
        let refund = std::cmp::min(
            self.gas_used() / gas::REFUND_QUOTIENT,
            self.state.refund(),
        );
        self.gas += refund;

        let remaining = U256::from(self.gas).saturating_mul(self.message.gas_price);
        self.state.add_balance(self.message.from, remaining);
        self.gas_pool.add_gas(self.gas);
    }

    fn gas_used(&self) -> u64 {
        self.message.gas_limit - self.gas
    }
}

/// Interpreter reads a program one instruction at a time, charging gas before each effect.
struct Interpreter<'c> {
    code: &'c [u8],
    pc: usize,
    address: Address,
    byzantium: bool,
}

impl<'c> Interpreter<'c> {
    fn new(code: &'c [u8], address: Address, ctx: &BlockContext) -> Self {
        Self {
            code,
            pc: 0,
            address,
            byzantium: ctx.rules.byzantium,
        }
    }

    fn run(mut self, state: &mut StateDB, gas: &mut u64) -> Result<Bytes, Halt> {
        let mut charge = |amount: u64| -> Result<(), Halt> {
            *gas = gas.checked_sub(amount).ok_or(Halt::Exceptional)?;
            Ok(())
        };

        while self.pc < self.code.len() {
            let opcode = self.read(1)?[0];
            match opcode {
                program::STOP => {
                    charge(STEP_GAS)?;
                    return Ok(Bytes::new());
                }
                program::SSTORE => {
                    let key = B256::from_slice(self.read(32)?);
                    let value = B256::from_slice(self.read(32)?);
                    let current = state.storage(&self.address, &key);
                    let (cost, refund) = gas::sstore_cost(current.is_zero(), value.is_zero());
                    charge(STEP_GAS + cost)?;
                    state.set_storage(self.address, key, value);
                    state.add_refund(refund);
                }
                program::LOG => {
                    let n = self.read(1)?[0] as usize;
                    if n > program::MAX_LOG_TOPICS {
                        return Err(Halt::Exceptional);
                    }
                    let mut topics = Vec::with_capacity(n);
                    for _ in 0..n {
                        topics.push(B256::from_slice(self.read(32)?));
                    }
                    let len = self.read(1)?[0] as usize;
                    let data = Bytes::copy_from_slice(self.read(len)?);
                    charge(STEP_GAS + gas::log_cost(topics.len(), data.len()))?;
                    state.add_log(Log::new(self.address, topics, data));
                }
                program::RETURN => {
                    let len = self.read(1)?[0] as usize;
                    let data = Bytes::copy_from_slice(self.read(len)?);
                    charge(STEP_GAS)?;
                    return Ok(data);
                }
                program::REVERT if self.byzantium => {
                    charge(STEP_GAS)?;
                    return Err(Halt::Revert);
                }
                _ => return Err(Halt::Exceptional),
            }
        }
        Ok(Bytes::new())
    }

    fn read(&mut self, len: usize) -> Result<&'c [u8], Halt> {
        let bytes = self
            .code
            .get(self.pc..self.pc + len)
            .ok_or(Halt::Exceptional)?;
        self.pc += len;
        Ok(bytes)
    }
}
