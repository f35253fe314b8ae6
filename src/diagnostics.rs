/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Persists the diagnostic bundle of an executor disagreement.
//!
//! A bundle is a directory `{home}/{namespace}/{block number}/{0x tx hash}` containing:
//!
//! |File                    |Content                                         |
//! |:---                    |:---                                            |
//! |`summary.json`          |[DiagnosticReport]: gas, errors, check, diff    |
//! |`header.json`           |header of the block                             |
//! |`tx.json`               |the transaction                                 |
//! |`logs-{branch}-{i}.json`|i-th log emitted by the transaction on a branch |
//! |`receipt-{branch}.json` |receipt of a branch, if it produced one         |

use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::{hex, B256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    params::DiagnosticsConfig,
    receipt::Receipt,
    types::{Header, Log, Transaction},
    verifier::Mismatch,
};

/// Content of `summary.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub block_number: u64,
    pub tx_hash: B256,
    pub mismatch: Mismatch,
    pub alternate: BranchReport,
    pub reference: BranchReport,
    /// Per-field differences between the alternate (left) and reference (right) states.
    pub diff: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchReport {
    pub gas_used: u64,
    pub error: Option<String>,
}

/// What a branch produced for the transaction.
pub(crate) struct BranchArtifacts<'a> {
    pub name: &'static str,
    pub logs: Vec<Log>,
    pub receipt: Option<&'a Receipt>,
}

/// Directory of the bundle for a transaction.
pub fn bundle_dir(config: &DiagnosticsConfig, number: u64, tx_hash: &B256) -> PathBuf {
    config
        .home
        .join(&config.namespace)
        .join(number.to_string())
        .join(hex::encode_prefixed(tx_hash))
}

/// Writes the bundle and returns its directory.
pub(crate) fn persist(
    config: &DiagnosticsConfig,
    header: &Header,
    tx: &Transaction,
    report: &DiagnosticReport,
    branches: &[BranchArtifacts<'_>],
) -> Result<PathBuf> {
    let dir = bundle_dir(config, header.number, &report.tx_hash);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    write_json(&dir, "summary.json", report)?;
    write_json(&dir, "header.json", header)?;
    write_json(&dir, "tx.json", tx)?;
    for branch in branches {
        for (i, log) in branch.logs.iter().enumerate() {
            write_json(&dir, &format!("logs-{}-{i}.json", branch.name), log)?;
        }
        if let Some(receipt) = branch.receipt {
            write_json(&dir, &format!("receipt-{}.json", branch.name), receipt)?;
        }
    }
    Ok(dir)
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let path = dir.join(name);
    let file =
        fs::File::create(&path).with_context(|| format!("unable to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("unable to serialise {}", path.display()))
}
