/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines common data structures to be used inside this library, or from outside application.

use alloy_primitives::{Address, Bytes, B256, B512, U256};
use serde::{Deserialize, Serialize};

use crate::crypto::{keccak256, rlp_list, OptionalAddress};

/// Header carries the block metadata visible to transaction execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub parent_hash: B256,
    /// Address credited with transaction fees unless an author override is supplied.
    pub coinbase: Address,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    /// Unix timestamp
    pub timestamp: u64,
    pub extra_data: Bytes,
}

impl Header {
    /// Keccak-256 hash of the RLP encoded header.
    pub fn hash(&self) -> B256 {
        keccak256(rlp_list(&[
            &self.parent_hash,
            &self.coinbase,
            &self.number,
            &self.gas_limit,
            &self.gas_used,
            &self.timestamp,
            &self.extra_data,
        ]))
    }
}

/// Block is the immutable input of block processing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    pub uncles: Vec<Header>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>, uncles: Vec<Header>) -> Self {
        Self {
            header,
            transactions,
            uncles,
        }
    }

    pub fn hash(&self) -> B256 {
        self.header.hash()
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn gas_limit(&self) -> u64 {
        self.header.gas_limit
    }
}

/// Transaction as included in a block. The sender is not part of the transaction; it is
/// derived from `public_key` once the signature has been checked by a
/// [Signer](crate::signer::Signer).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    /// Destination of the message. `None` creates a contract.
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    /// Chain the transaction is bound to. `None` for transactions without replay protection.
    pub chain_id: Option<u64>,
    /// ed25519 public key of the signer.
    pub public_key: B256,
    /// ed25519 signature over the signing hash.
    pub signature: B512,
}

impl Transaction {
    /// Keccak-256 hash of the RLP encoding of every field, signature included.
    pub fn hash(&self) -> B256 {
        let chain_id = self.chain_id.unwrap_or_default();
        keccak256(rlp_list(&[
            &self.nonce,
            &self.gas_price,
            &self.gas_limit,
            &OptionalAddress(self.to),
            &self.value,
            &self.input,
            &chain_id,
            &self.public_key,
            &self.signature,
        ]))
    }

    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Encoding of the fields covered by the signature, without replay protection.
    pub(crate) fn unprotected_payload(&self) -> Vec<u8> {
        rlp_list(&[
            &self.nonce,
            &self.gas_price,
            &self.gas_limit,
            &OptionalAddress(self.to),
            &self.value,
            &self.input,
        ])
    }

    /// Encoding of the fields covered by the signature with the chain id appended as in EIP-155.
    pub(crate) fn protected_payload(&self, chain_id: u64) -> Vec<u8> {
        rlp_list(&[
            &self.nonce,
            &self.gas_price,
            &self.gas_limit,
            &OptionalAddress(self.to),
            &self.value,
            &self.input,
            &chain_id,
            &0u8,
            &0u8,
        ])
    }
}

/// Message is a transaction whose sender has been resolved. It is the input of an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub data: Bytes,
}

impl Message {
    pub fn from_transaction(tx: &Transaction, from: Address) -> Self {
        Self {
            from,
            to: tx.to,
            nonce: tx.nonce,
            value: tx.value,
            gas_limit: tx.gas_limit,
            gas_price: tx.gas_price,
            data: tx.input.clone(),
        }
    }

    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}

/// Log is an event emitted during execution. The linkage fields are stamped by the
/// [StateDB](crate::state::StateDB) when the log is added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Account that emitted the event.
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub tx_hash: B256,
    pub tx_index: u64,
    pub block_hash: B256,
    /// Position of the log within the block.
    pub index: u64,
}

impl Log {
    pub fn new(address: Address, topics: Vec<B256>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
            ..Default::default()
        }
    }
}
