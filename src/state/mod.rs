/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines the world state database that transactions are applied to.
//!
//! There are two layers of accounts:
//! - `accounts` (finalised accounts, shared behind an [Arc])
//! - `dirty` (accounts touched since the last [finalise](StateDB::finalise))
//!
//! In Read Operation, `dirty` is accessed first. If the account is not found, `accounts` is
//! searched. In Write Operation, the account is first copied into `dirty` (it is "touched")
//! and then updated there.
//!
//! On finalise, every dirty account is written back into `accounts`, except that empty
//! accounts are deleted when the EIP-158 rule is in force.
//!
//! ### Cost model of [copy](StateDB::copy)
//!
//! Copying clones the `Arc` of finalised accounts, the dirty accounts and the logs. It costs
//! O(dirty accounts + logs) and does not depend on the size of the state. The first finalise
//! performed on either side after a copy pays one O(accounts) clone of the finalised map, since
//! it is no longer uniquely owned (copy-on-write through [Arc::make_mut]). Later finalises on
//! the same side are in place again.

pub mod diff;
pub use diff::diff;

use std::{collections::BTreeMap, sync::Arc};

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::Serialize;

use crate::{
    crypto::{keccak256, rlp_list},
    types::Log,
};

/// Account is the state of one address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Account {
    pub nonce: u64,
    pub balance: U256,
    pub code: Bytes,
    /// Non-zero storage slots. Writing zero removes the slot.
    pub storage: BTreeMap<B256, B256>,
}

impl Account {
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    /// An account is empty if it has no nonce, no balance and no code (EIP-161).
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code.is_empty()
    }

    pub fn code_hash(&self) -> B256 {
        keccak256(&self.code)
    }

    /// Commitment to the storage slots of this account.
    pub fn storage_root(&self) -> B256 {
        let mut encoded = Vec::new();
        for (key, value) in &self.storage {
            encoded.extend(rlp_list(&[key, value]));
        }
        keccak256(encoded)
    }
}

/// A saved point of the journal that [StateDB::revert_to_snapshot] can roll back to.
#[derive(Debug)]
struct Snapshot {
    dirty: BTreeMap<Address, Account>,
    logs_len: usize,
    refund: u64,
}

/// StateDB is the mutable world state exclusively owned by one block processing call.
#[derive(Debug, Default)]
pub struct StateDB {
    accounts: Arc<BTreeMap<Address, Account>>,
    dirty: BTreeMap<Address, Account>,
    /// Logs of the whole block in emission order.
    logs: Vec<Log>,
    refund: u64,
    snapshots: Vec<Snapshot>,

    tx_hash: B256,
    block_hash: B256,
    block_number: u64,
    tx_index: u64,
}

impl StateDB {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder for genesis style state. The account is written as finalised.
    pub fn with_account(mut self, address: Address, account: Account) -> Self {
        self.insert_account(address, account);
        self
    }

    /// Writes a finalised account, bypassing the dirty layer.
    pub fn insert_account(&mut self, address: Address, account: Account) {
        Arc::make_mut(&mut self.accounts).insert(address, account);
    }

    /// Returns an independent copy of the state. Mutations of either side never affect the
    /// other. See the module documentation for the cost model.
    pub fn copy(&self) -> Self {
        Self {
            accounts: Arc::clone(&self.accounts),
            dirty: self.dirty.clone(),
            logs: self.logs.clone(),
            refund: self.refund,
            snapshots: Vec::new(),
            tx_hash: self.tx_hash,
            block_hash: self.block_hash,
            block_number: self.block_number,
            tx_index: self.tx_index,
        }
    }

    /// Sets the transaction context used to stamp logs emitted by the next transaction.
    pub fn prepare(&mut self, tx_hash: B256, block_hash: B256, block_number: u64, tx_index: u64) {
        self.tx_hash = tx_hash;
        self.block_hash = block_hash;
        self.block_number = block_number;
        self.tx_index = tx_index;
    }

    pub fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    pub fn block_hash(&self) -> B256 {
        self.block_hash
    }

    pub fn tx_index(&self) -> u64 {
        self.tx_index
    }

    //
    //
    // Account reads
    //
    //

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.dirty
            .get(address)
            .or_else(|| self.accounts.get(address))
    }

    pub fn exist(&self, address: &Address) -> bool {
        self.account(address).is_some()
    }

    /// Whether the account does not exist or is empty.
    pub fn is_empty(&self, address: &Address) -> bool {
        self.account(address).map_or(true, Account::is_empty)
    }

    pub fn balance(&self, address: &Address) -> U256 {
        self.account(address)
            .map_or(U256::ZERO, |account| account.balance)
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        self.account(address).map_or(0, |account| account.nonce)
    }

    pub fn code(&self, address: &Address) -> Bytes {
        self.account(address)
            .map_or_else(Bytes::new, |account| account.code.clone())
    }

    pub fn storage(&self, address: &Address, key: &B256) -> B256 {
        self.account(address)
            .and_then(|account| account.storage.get(key).copied())
            .unwrap_or_default()
    }

    /// Merged view of finalised and pending accounts.
    pub fn dump(&self) -> BTreeMap<Address, Account> {
        let mut merged = (*self.accounts).clone();
        merged.extend(self.dirty.iter().map(|(k, v)| (*k, v.clone())));
        merged
    }

    //
    //
    // Account writes. Each of them touches the account.
    //
    //

    fn account_mut(&mut self, address: Address) -> &mut Account {
        let accounts = &self.accounts;
        self.dirty
            .entry(address)
            .or_insert_with(|| accounts.get(&address).cloned().unwrap_or_default())
    }

    /// Marks the account as touched without changing it. A touched empty account is deleted on
    /// finalise under EIP-158.
    pub fn touch(&mut self, address: Address) {
        self.account_mut(address);
    }

    /// Replaces the account as a whole.
    pub fn set_account(&mut self, address: Address, account: Account) {
        self.dirty.insert(address, account);
    }

    /// Creates a fresh account, carrying over the balance of any previous account.
    pub fn create_account(&mut self, address: Address) {
        let balance = self.balance(&address);
        self.set_account(address, Account::with_balance(balance));
    }

    pub fn add_balance(&mut self, address: Address, amount: U256) {
        let account = self.account_mut(address);
        account.balance = account.balance.saturating_add(amount);
    }

    pub fn sub_balance(&mut self, address: Address, amount: U256) {
        let account = self.account_mut(address);
        account.balance = account.balance.saturating_sub(amount);
    }

    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.account_mut(address).balance = balance;
    }

    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.account_mut(address).nonce = nonce;
    }

    pub fn set_code(&mut self, address: Address, code: Bytes) {
        self.account_mut(address).code = code;
    }

    pub fn set_storage(&mut self, address: Address, key: B256, value: B256) {
        let storage = &mut self.account_mut(address).storage;
        if value.is_zero() {
            storage.remove(&key);
        } else {
            storage.insert(key, value);
        }
    }

    //
    //
    // Refund counter
    //
    //

    pub fn add_refund(&mut self, gas: u64) {
        self.refund = self.refund.saturating_add(gas);
    }

    pub fn refund(&self) -> u64 {
        self.refund
    }

    //
    //
    // Logs
    //
    //

    /// Appends a log, stamping it with the current transaction context.
    pub fn add_log(&mut self, mut log: Log) {
        log.tx_hash = self.tx_hash;
        log.block_hash = self.block_hash;
        log.block_number = self.block_number;
        log.tx_index = self.tx_index;
        log.index = self.logs.len() as u64;
        self.logs.push(log);
    }

    /// Logs emitted by the given transaction, in emission order.
    pub fn get_logs(&self, tx_hash: &B256) -> Vec<Log> {
        self.logs
            .iter()
            .filter(|log| log.tx_hash == *tx_hash)
            .cloned()
            .collect()
    }

    /// Every log emitted into this state, in emission order.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    //
    //
    // Journal
    //
    //

    /// Saves the current pending state and returns an identifier to revert to.
    pub fn snapshot(&mut self) -> usize {
        self.snapshots.push(Snapshot {
            dirty: self.dirty.clone(),
            logs_len: self.logs.len(),
            refund: self.refund,
        });
        self.snapshots.len() - 1
    }

    /// Discards every change made since the snapshot was taken. Unknown identifiers are ignored.
    pub fn revert_to_snapshot(&mut self, id: usize) {
        if id >= self.snapshots.len() {
            return;
        }
        self.snapshots.truncate(id + 1);
        let Some(snapshot) = self.snapshots.pop() else {
            return;
        };
        self.dirty = snapshot.dirty;
        self.logs.truncate(snapshot.logs_len);
        self.refund = snapshot.refund;
    }

    //
    //
    // Finalisation
    //
    //

    /// Writes the pending accounts back to the finalised layer, deleting empty accounts if
    /// `delete_empty_accounts` is set. Clears the journal and the refund counter.
    pub fn finalise(&mut self, delete_empty_accounts: bool) {
        if !self.dirty.is_empty() {
            let accounts = Arc::make_mut(&mut self.accounts);
            for (address, account) in std::mem::take(&mut self.dirty) {
                if delete_empty_accounts && account.is_empty() {
                    accounts.remove(&address);
                } else {
                    accounts.insert(address, account);
                }
            }
        }
        self.snapshots.clear();
        self.refund = 0;
    }

    /// Finalises the state and returns the commitment to it.
    ///
    /// The commitment is the Keccak-256 hash of the RLP encoded accounts in address order,
    /// each encoded as `[address, nonce, balance, code hash, storage root]`.
    pub fn intermediate_root(&mut self, delete_empty_accounts: bool) -> B256 {
        self.finalise(delete_empty_accounts);
        let mut encoded = Vec::new();
        for (address, account) in self.accounts.iter() {
            encoded.extend(rlp_list(&[
                address,
                &account.nonce,
                &account.balance,
                &account.code_hash(),
                &account.storage_root(),
            ]));
        }
        keccak256(encoded)
    }
}

impl PartialEq for StateDB {
    /// Compares the full contents of the state. The journal is not part of the contents.
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.accounts, &other.accounts) || self.accounts == other.accounts)
            && self.dirty == other.dirty
            && self.logs == other.logs
            && self.refund == other.refund
            && self.tx_hash == other.tx_hash
            && self.block_hash == other.block_hash
            && self.block_number == other.block_number
            && self.tx_index == other.tx_index
    }
}
