use std::path::Path;

use alloy_primitives::{Address, Bytes, B256, U256};
use dualvm_runtime::{
    crypto::public_key_to_address, Account, Block, ChainConfig, ExecutionConfig, Header, Signer,
    StateDB, Transaction,
};
use ed25519_dalek::SigningKey;

pub const CHAIN_ID: u64 = 61;
pub const BLOCK_GAS_LIMIT: u64 = 100_000;
pub const ORIGIN_BALANCE: u64 = 1_000_000_000_000_000_000;

// Origin Account.
pub const ORIGIN_SECRET_KEY_BASE64: &str = "W16XnCJuPYHIKq92aoInCstzSdiBVHXoYPsdM4D_xrk";
// Target Account.
pub const TARGET_PUBLIC_KEY_BASE64: &str = "WU-d7VzIVVgKiNM2CM_2j-BVY1JCjPFQBowsJKBt4aQ";

pub const COINBASE: Address = Address::repeat_byte(0xc0);
pub const CONTRACT: Address = Address::repeat_byte(0xcc);

pub struct TestData {}

impl TestData {
    pub fn origin_key() -> SigningKey {
        let secret: [u8; 32] = base64url::decode(ORIGIN_SECRET_KEY_BASE64)
            .unwrap()
            .try_into()
            .unwrap();
        SigningKey::from_bytes(&secret)
    }

    pub fn get_origin_address() -> Address {
        public_key_to_address(&Self::origin_key().verifying_key().to_bytes())
    }

    pub fn get_target_address() -> Address {
        let public_key: [u8; 32] = base64url::decode(TARGET_PUBLIC_KEY_BASE64)
            .unwrap()
            .try_into()
            .unwrap();
        public_key_to_address(&public_key)
    }

    pub fn header(number: u64) -> Header {
        Header {
            parent_hash: B256::repeat_byte(3),
            coinbase: COINBASE,
            number,
            gas_limit: BLOCK_GAS_LIMIT,
            gas_used: 0,
            timestamp: 1665370157,
            extra_data: Bytes::new(),
        }
    }

    /// State with a funded origin account.
    pub fn genesis() -> StateDB {
        StateDB::new().with_account(
            Self::get_origin_address(),
            Account::with_balance(U256::from(ORIGIN_BALANCE)),
        )
    }

    /// Genesis with a contract deployed at [CONTRACT].
    pub fn genesis_with_contract(code: Bytes) -> StateDB {
        Self::genesis().with_account(
            CONTRACT,
            Account {
                code,
                ..Account::default()
            },
        )
    }

    /// Unsigned transfer of 1 unit to the target account.
    pub fn transaction(nonce: u64) -> Transaction {
        Transaction {
            nonce,
            gas_price: U256::from(1),
            gas_limit: 21_000,
            to: Some(Self::get_target_address()),
            value: U256::from(1),
            ..Transaction::default()
        }
    }

    /// Unsigned call of the contract at [CONTRACT].
    pub fn contract_call(nonce: u64) -> Transaction {
        Transaction {
            to: Some(CONTRACT),
            value: U256::ZERO,
            gas_limit: 50_000,
            ..Self::transaction(nonce)
        }
    }

    /// Signs the transaction with the origin key, replay protected if EIP-155 is active.
    pub fn sign(config: &ChainConfig, number: u64, mut tx: Transaction) -> Transaction {
        tx.chain_id = config.is_eip155(number).then_some(config.chain_id);
        Signer::for_block(config, number)
            .sign(tx, &Self::origin_key())
            .unwrap()
    }

    pub fn block(config: &ChainConfig, number: u64, txs: Vec<Transaction>) -> Block {
        let txs = txs
            .into_iter()
            .map(|tx| Self::sign(config, number, tx))
            .collect();
        Block::new(Self::header(number), txs, vec![])
    }

    /// Execution config with verification enabled, writing bundles under `home`.
    pub fn exec_config(home: &Path) -> ExecutionConfig {
        ExecutionConfig::new().set_diagnostics_home(home)
    }
}
