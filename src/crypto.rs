/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Hashing and canonical encoding helpers shared by transactions, headers, receipts and state.

use alloy_primitives::{Address, B256};
use alloy_rlp::{Encodable, Header, EMPTY_STRING_CODE};
use tiny_keccak::{Hasher as _, Keccak};

/// Keccak-256 digest of the input.
pub fn keccak256(input: impl AsRef<[u8]>) -> B256 {
    let mut hasher = Keccak::v256();
    hasher.update(input.as_ref());
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    B256::from(output)
}

/// RLP encoding of a list made of the given items.
pub fn rlp_list(items: &[&dyn Encodable]) -> Vec<u8> {
    let payload_length = items.iter().map(|item| item.length()).sum();
    let mut out = Vec::with_capacity(payload_length + 9);
    Header {
        list: true,
        payload_length,
    }
    .encode(&mut out);
    for item in items {
        item.encode(&mut out);
    }
    out
}

/// Optional address encoded as the empty string when absent, as for a message destination.
pub(crate) struct OptionalAddress(pub Option<Address>);

impl Encodable for OptionalAddress {
    fn encode(&self, out: &mut dyn alloy_rlp::BufMut) {
        match &self.0 {
            Some(address) => address.encode(out),
            None => out.put_u8(EMPTY_STRING_CODE),
        }
    }

    fn length(&self) -> usize {
        self.0.as_ref().map_or(1, Encodable::length)
    }
}

/// Address of a contract created by `sender` when its account nonce is `nonce`.
pub fn create_address(sender: &Address, nonce: u64) -> Address {
    let encoded = rlp_list(&[sender, &nonce]);
    Address::from_slice(&keccak256(encoded)[12..])
}

/// Account address controlled by an ed25519 public key.
pub fn public_key_to_address(public_key: &[u8; 32]) -> Address {
    Address::from_slice(&keccak256(public_key)[12..])
}
