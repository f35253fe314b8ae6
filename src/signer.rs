/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Resolves the sender of a transaction.
//!
//! Transactions are signed with ed25519 over the Keccak-256 hash of their signing payload. The
//! payload depends on the fork in force: before EIP-155 it does not include the chain id, so a
//! signed transaction is valid on every chain; afterwards a transaction may commit to a chain id
//! and is then rejected on any other chain.

use alloy_primitives::{Address, B256, B512};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};

use crate::{
    crypto::{keccak256, public_key_to_address},
    params::ChainConfig,
    types::{Message, Transaction},
};

/// Signer selects the signing-hash domain of transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signer {
    /// Signing hash without chain id. Replay protected transactions are rejected.
    Frontier,
    /// Signing hash with chain id for protected transactions. Unprotected transactions are
    /// still accepted.
    Eip155 { chain_id: u64 },
}

impl Signer {
    /// Signer in force at the given block.
    pub fn for_block(config: &ChainConfig, number: u64) -> Self {
        if config.is_eip155(number) {
            Signer::Eip155 {
                chain_id: config.chain_id,
            }
        } else {
            Signer::Frontier
        }
    }

    /// Hash that the transaction signature must cover.
    pub fn signing_hash(&self, tx: &Transaction) -> Result<B256, SignerError> {
        match (self, tx.chain_id) {
            (_, None) => Ok(keccak256(tx.unprotected_payload())),
            (Signer::Frontier, Some(_)) => Err(SignerError::ReplayProtectionUnavailable),
            (Signer::Eip155 { chain_id }, Some(tx_chain_id)) => {
                if *chain_id != tx_chain_id {
                    return Err(SignerError::InvalidChainId {
                        expected: *chain_id,
                        got: tx_chain_id,
                    });
                }
                Ok(keccak256(tx.protected_payload(tx_chain_id)))
            }
        }
    }

    /// Verifies the signature and returns the address of the signer.
    pub fn sender(&self, tx: &Transaction) -> Result<Address, SignerError> {
        let signing_hash = self.signing_hash(tx)?;
        let public_key = VerifyingKey::from_bytes(&tx.public_key.0)
            .map_err(|_| SignerError::InvalidPublicKey)?;
        let signature = Signature::from_bytes(&tx.signature.0);
        public_key
            .verify(signing_hash.as_slice(), &signature)
            .map_err(|_| SignerError::InvalidSignature)?;
        Ok(public_key_to_address(&tx.public_key.0))
    }

    /// Resolves the transaction into the message consumed by executors.
    pub fn as_message(&self, tx: &Transaction) -> Result<Message, SignerError> {
        let from = self.sender(tx)?;
        Ok(Message::from_transaction(tx, from))
    }

    /// Fills in the public key and signature of the transaction. Used by pools and tests that
    /// build transactions locally.
    pub fn sign(&self, mut tx: Transaction, key: &SigningKey) -> Result<Transaction, SignerError> {
        tx.public_key = B256::from(key.verifying_key().to_bytes());
        let signing_hash = self.signing_hash(&tx)?;
        tx.signature = B512::from(key.sign(signing_hash.as_slice()).to_bytes());
        Ok(tx)
    }
}

/// Errors in resolving the sender of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    #[error("invalid sender: public key is not a valid ed25519 point")]
    InvalidPublicKey,

    #[error("invalid sender: signature verification failed")]
    InvalidSignature,

    #[error("invalid chain id for signer: expected {expected}, got {got}")]
    InvalidChainId { expected: u64, got: u64 },

    #[error("replay protected transaction before EIP-155")]
    ReplayProtectionUnavailable,
}
