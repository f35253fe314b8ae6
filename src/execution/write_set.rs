/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines a write set that serves as a private layer on top of a [StateDB].
//!
//! In Read Operation, the pending `writes` are accessed first. If the data is not found there,
//! the underlying state is read. Accounts created within the write set read as fresh accounts
//! (no nonce, code or storage) apart from their balance.
//!
//! In Write Operation, only the write set is updated. At the end of execution, if it succeeds,
//! the write set is turned into [Changes] and committed to the state. Otherwise it is dropped
//! without any changes to the state.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, Bytes, B256, U256};

use crate::{state::StateDB, types::Log};

pub(crate) struct WriteSet<'s> {
    state: &'s StateDB,
    changes: Changes,
}

impl<'s> WriteSet<'s> {
    pub fn new(state: &'s StateDB) -> Self {
        Self {
            state,
            changes: Changes::default(),
        }
    }

    pub fn exists(&self, address: &Address) -> bool {
        self.changes.touched.contains(address) || self.state.exist(address)
    }

    pub fn balance(&self, address: &Address) -> U256 {
        match self.changes.balances.get(address) {
            Some(balance) => *balance,
            None => self.state.balance(address),
        }
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        match self.changes.nonces.get(address) {
            Some(nonce) => *nonce,
            None if self.changes.created.contains(address) => 0,
            None => self.state.nonce(address),
        }
    }

    pub fn code(&self, address: &Address) -> Bytes {
        match self.changes.codes.get(address) {
            Some(code) => code.clone(),
            None if self.changes.created.contains(address) => Bytes::new(),
            None => self.state.code(address),
        }
    }

    pub fn storage(&self, address: &Address, key: &B256) -> B256 {
        match self.changes.storage.get(&(*address, *key)) {
            Some(value) => *value,
            None if self.changes.created.contains(address) => B256::ZERO,
            None => self.state.storage(address, key),
        }
    }

    /// Replaces the account with a fresh one that keeps only the balance.
    pub fn create_account(&mut self, address: Address) {
        let changes = &mut self.changes;
        changes.created.insert(address);
        changes.touched.insert(address);
        changes.nonces.remove(&address);
        changes.codes.remove(&address);
        changes.storage.retain(|(owner, _), _| *owner != address);
    }

    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.changes.touched.insert(address);
        self.changes.balances.insert(address, balance);
    }

    /// Moves `value` between the accounts. Both accounts are touched even if `value` is zero.
    /// Affordability is checked before execution starts.
    pub fn transfer(&mut self, from: Address, to: Address, value: U256) {
        let from_balance = self.balance(&from).saturating_sub(value);
        self.set_balance(from, from_balance);
        let to_balance = self.balance(&to).saturating_add(value);
        self.set_balance(to, to_balance);
    }

    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.changes.touched.insert(address);
        self.changes.nonces.insert(address, nonce);
    }

    pub fn set_code(&mut self, address: Address, code: Bytes) {
        self.changes.touched.insert(address);
        self.changes.codes.insert(address, code);
    }

    pub fn set_storage(&mut self, address: Address, key: B256, value: B256) {
        self.changes.touched.insert(address);
        self.changes.storage.insert((address, key), value);
    }

    pub fn add_log(&mut self, log: Log) {
        self.changes.logs.push(log);
    }

    pub fn add_refund(&mut self, gas: u64) {
        self.changes.refund = self.changes.refund.saturating_add(gas);
    }

    pub fn into_changes(self) -> Changes {
        self.changes
    }
}

/// Pending changes detached from the state they were read from.
#[derive(Debug, Default)]
pub(crate) struct Changes {
    created: BTreeSet<Address>,
    touched: BTreeSet<Address>,
    balances: BTreeMap<Address, U256>,
    nonces: BTreeMap<Address, u64>,
    codes: BTreeMap<Address, Bytes>,
    storage: BTreeMap<(Address, B256), B256>,
    logs: Vec<Log>,
    refund: u64,
}

impl Changes {
    pub fn commit(self, state: &mut StateDB) {
        self.created
            .into_iter()
            .for_each(|address| state.create_account(address));
        self.touched
            .into_iter()
            .for_each(|address| state.touch(address));
        self.balances
            .into_iter()
            .for_each(|(address, balance)| state.set_balance(address, balance));
        self.nonces
            .into_iter()
            .for_each(|(address, nonce)| state.set_nonce(address, nonce));
        self.codes
            .into_iter()
            .for_each(|(address, code)| state.set_code(address, code));
        self.storage
            .into_iter()
            .for_each(|((address, key), value)| state.set_storage(address, key, value));
        self.logs.into_iter().for_each(|log| state.add_log(log));
        state.add_refund(self.refund);
    }
}
