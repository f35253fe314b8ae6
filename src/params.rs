/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The configuration structures that parameterize block processing.
//!
//! - [ChainConfig] holds the fork schedule of a chain. It is keyed by block number and decides
//!   signer selection, empty-account deletion, receipt format and the one-time DAO mutation.
//! - [ExecutionConfig] holds per-invocation choices: which executor commits, whether every
//!   transaction is cross-checked, and where mismatch diagnostics are written.

use std::path::PathBuf;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// ChainConfig defines the fork activation schedule of a chain. A fork whose block is `None`
/// is never active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain identifier mixed into signing hashes once EIP-155 is active.
    pub chain_id: u64,
    /// Contract creation costs [TX_GAS_CONTRACT_CREATION](crate::gas::TX_GAS_CONTRACT_CREATION)
    /// and failed code deposits revert.
    #[serde(default)]
    pub homestead_block: Option<u64>,
    /// One-time irregular state change.
    #[serde(default)]
    pub dao_fork: Option<DaoForkConfig>,
    /// Replay protected signing hashes.
    #[serde(default)]
    pub eip155_block: Option<u64>,
    /// Empty account deletion (EIP-161) and the contract code size limit (EIP-170).
    #[serde(default)]
    pub eip158_block: Option<u64>,
    /// Status receipts instead of intermediate roots (EIP-658) and the REVERT instruction.
    #[serde(default)]
    pub byzantium_block: Option<u64>,
}

/// DaoForkConfig describes the irregular balance drain applied at the beginning of one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoForkConfig {
    /// Block at which the drain happens.
    pub block: u64,
    /// Whether this chain follows the fork. A chain that opposes it ignores the drain.
    pub support: bool,
    /// Account that receives every drained balance.
    pub refund_contract: Address,
    /// Accounts whose balances are moved into the refund contract.
    pub drain_list: Vec<Address>,
}

impl ChainConfig {
    /// A chain with no fork ever activated.
    pub fn frontier(chain_id: u64) -> Self {
        Self {
            chain_id,
            homestead_block: None,
            dao_fork: None,
            eip155_block: None,
            eip158_block: None,
            byzantium_block: None,
        }
    }

    /// A chain with every fork active from genesis.
    pub fn all_forks(chain_id: u64) -> Self {
        Self {
            chain_id,
            homestead_block: Some(0),
            dao_fork: None,
            eip155_block: Some(0),
            eip158_block: Some(0),
            byzantium_block: Some(0),
        }
    }

    pub fn is_homestead(&self, number: u64) -> bool {
        is_forked(self.homestead_block, number)
    }

    pub fn is_eip155(&self, number: u64) -> bool {
        is_forked(self.eip155_block, number)
    }

    pub fn is_eip158(&self, number: u64) -> bool {
        is_forked(self.eip158_block, number)
    }

    pub fn is_byzantium(&self, number: u64) -> bool {
        is_forked(self.byzantium_block, number)
    }

    /// Returns the DAO fork parameters if the drain has to be applied at exactly this block.
    pub fn dao_fork_at(&self, number: u64) -> Option<&DaoForkConfig> {
        self.dao_fork
            .as_ref()
            .filter(|dao| dao.support && dao.block == number)
    }

    pub fn is_dao_fork_block(&self, number: u64) -> bool {
        self.dao_fork_at(number).is_some()
    }

    /// Snapshot of the fork rules in force at the given block.
    pub fn rules(&self, number: u64) -> Rules {
        Rules {
            homestead: self.is_homestead(number),
            eip155: self.is_eip155(number),
            eip158: self.is_eip158(number),
            byzantium: self.is_byzantium(number),
        }
    }
}

fn is_forked(fork: Option<u64>, number: u64) -> bool {
    fork.map_or(false, |block| block <= number)
}

/// Rules is the set of fork predicates evaluated once for a block, handed to executors so that
/// they never consult the [ChainConfig] themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rules {
    pub homestead: bool,
    pub eip155: bool,
    pub eip158: bool,
    pub byzantium: bool,
}

/// Names one of the two executor implementations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    #[default]
    Reference,
    Alternate,
}

/// Whether each transaction is cross-checked by both executors before it is committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verification {
    #[default]
    Enabled,
    Disabled,
}

/// Namespace directory created under the diagnostics home.
pub const DEFAULT_DIAGNOSTICS_NAMESPACE: &str = "dualvm-debug";

/// DiagnosticsConfig locates the directory tree that receives mismatch bundles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    pub home: PathBuf,
    pub namespace: String,
}

impl Default for DiagnosticsConfig {
    /// `$HOME/dualvm-debug`, or the working directory if `HOME` is unset.
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            home,
            namespace: DEFAULT_DIAGNOSTICS_NAMESPACE.to_string(),
        }
    }
}

/// ExecutionConfig defines the choices made by the caller of one block processing invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Executor whose effects are committed to the live state.
    pub executor: ExecutorKind,
    /// Whether both executors cross-check every transaction first.
    pub verification: Verification,
    /// Where mismatch bundles are persisted.
    pub diagnostics: DiagnosticsConfig,
}

impl ExecutionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// specify the executor whose results are committed to the live state.
    pub fn set_executor(mut self, executor: ExecutorKind) -> Self {
        self.executor = executor;
        self
    }

    /// enable or disable cross-checking of every transaction.
    pub fn set_verification(mut self, verification: Verification) -> Self {
        self.verification = verification;
        self
    }

    /// specify the home directory under which mismatch bundles are written.
    pub fn set_diagnostics_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.diagnostics.home = home.into();
        self
    }

    pub fn set_diagnostics_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.diagnostics.namespace = namespace.into();
        self
    }

    pub fn verification_enabled(&self) -> bool {
        self.verification == Verification::Enabled
    }
}
