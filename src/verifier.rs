/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Cross-checks the two executors on one transaction before its effects are committed.
//!
//! Each executor runs a full transaction application on its own copy of the state, the gas
//! pool and the used gas counter. The live values are never touched. The outcomes are then
//! compared in the order of [MismatchCheck], stopping at the first disagreement. On
//! disagreement a diagnostic bundle is written (see [crate::diagnostics]) and the
//! transaction fails with a [Mismatch].

use std::fmt;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::{
    consensus::ChainContext,
    diagnostics::{self, BranchArtifacts, BranchReport, DiagnosticReport},
    error::ProcessError,
    execution::TransactionExecutor,
    gas_pool::GasPool,
    params::{DiagnosticsConfig, ExecutorKind},
    receipt::Receipt,
    state::{self, StateDB},
    transition::Applier,
    types::{Header, Transaction},
};

/// The executors disagreed on the outcome of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("mismatched executor results: {check}: {detail}")]
pub struct Mismatch {
    /// First check that failed.
    pub check: MismatchCheck,
    /// Values observed by each executor.
    pub detail: String,
}

impl Mismatch {
    pub fn new(check: MismatchCheck, detail: impl Into<String>) -> Self {
        Self {
            check,
            detail: detail.into(),
        }
    }
}

/// Comparisons performed between the two outcomes, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchCheck {
    GasUsed,
    Receipt,
    /// One executor failed and the other did not.
    ErrorPresence,
    ErrorText,
    IntermediateRoot,
    State,
}

impl fmt::Display for MismatchCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MismatchCheck::GasUsed => "gas used",
            MismatchCheck::Receipt => "receipt",
            MismatchCheck::ErrorPresence => "error presence",
            MismatchCheck::ErrorText => "error text",
            MismatchCheck::IntermediateRoot => "intermediate root",
            MismatchCheck::State => "state",
        };
        f.write_str(name)
    }
}

/// Isolated context one executor runs in.
struct Branch {
    name: &'static str,
    state: StateDB,
    gas_pool: GasPool,
    used_gas: u64,
    outcome: Option<Result<(Receipt, u64), ProcessError>>,
}

impl Branch {
    /// Seeds a branch from the live values.
    ///
    /// ### Panics
    /// Panics if a copy does not equal its source. This is a fault of the state copy and not of
    /// the transaction, so it is never reported as an error.
    fn seed(name: &'static str, state: &StateDB, gas_pool: &GasPool, used_gas: u64) -> Self {
        let branch = Self {
            name,
            state: state.copy(),
            gas_pool: *gas_pool,
            used_gas,
            outcome: None,
        };
        assert!(
            branch.state == *state && branch.gas_pool == *gas_pool,
            "{name} branch diverged from the live state it was seeded from"
        );
        branch
    }

    fn run<C, R, A>(
        &mut self,
        applier: &Applier<'_, C, R, A>,
        kind: ExecutorKind,
        author: Option<Address>,
        header: &Header,
        tx: &Transaction,
    ) where
        C: ChainContext,
        R: TransactionExecutor,
        A: TransactionExecutor,
    {
        self.outcome = Some(applier.apply_with(
            kind,
            author,
            &mut self.gas_pool,
            &mut self.state,
            header,
            tx,
            &mut self.used_gas,
        ));
    }

    fn gas_used(&self) -> u64 {
        match &self.outcome {
            Some(Ok((_, gas))) => *gas,
            _ => 0,
        }
    }

    fn receipt(&self) -> Option<&Receipt> {
        match &self.outcome {
            Some(Ok((receipt, _))) => Some(receipt),
            _ => None,
        }
    }

    fn error(&self) -> Option<String> {
        match &self.outcome {
            Some(Err(err)) => Some(err.to_string()),
            _ => None,
        }
    }

    fn report(&self) -> BranchReport {
        BranchReport {
            gas_used: self.gas_used(),
            error: self.error(),
        }
    }
}

/// Runs both executors on isolated copies of the live values and compares their outcomes.
/// Returns `Ok(())` if they agree.
#[allow(clippy::too_many_arguments)]
pub(crate) fn verify<C, R, A>(
    applier: &Applier<'_, C, R, A>,
    author: Option<Address>,
    gas_pool: &GasPool,
    state: &StateDB,
    header: &Header,
    tx: &Transaction,
    used_gas: u64,
    diagnostics: &DiagnosticsConfig,
) -> Result<(), ProcessError>
where
    C: ChainContext,
    R: TransactionExecutor,
    A: TransactionExecutor,
{
    let mut alternate = Branch::seed("alternate", state, gas_pool, used_gas);
    let mut reference = Branch::seed("reference", state, gas_pool, used_gas);

    alternate.run(applier, ExecutorKind::Alternate, author, header, tx);
    reference.run(applier, ExecutorKind::Reference, author, header, tx);

    let delete_empty = applier.config().is_eip158(header.number);
    let Some(mismatch) = compare(&mut alternate, &mut reference, delete_empty) else {
        return Ok(());
    };

    let diff = state::diff(&alternate.state, &reference.state);
    std::thread::scope(|scope| {
        let worker = scope.spawn(|| alternate.state.finalise(delete_empty));
        reference.state.finalise(delete_empty);
        if let Err(panic) = worker.join() {
            std::panic::resume_unwind(panic);
        }
    });

    let tx_hash = tx.hash();
    let report = DiagnosticReport {
        block_number: header.number,
        tx_hash,
        mismatch: mismatch.clone(),
        alternate: alternate.report(),
        reference: reference.report(),
        diff,
    };
    let branches = [&alternate, &reference].map(|branch| BranchArtifacts {
        name: branch.name,
        logs: branch.state.get_logs(&tx_hash),
        receipt: branch.receipt(),
    });

    match diagnostics::persist(diagnostics, header, tx, &report, &branches) {
        Ok(dir) => {
            warn!(
                block = header.number,
                tx = %tx_hash,
                check = %mismatch.check,
                detail = %mismatch.detail,
                bundle = %dir.display(),
                "executors disagree"
            );
            Err(ProcessError::Mismatch(mismatch))
        }
        Err(source) => {
            error!(
                block = header.number,
                tx = %tx_hash,
                check = %mismatch.check,
                error = ?source,
                "executors disagree and the diagnostic bundle could not be written"
            );
            Err(ProcessError::Diagnostics { mismatch, source })
        }
    }
}

fn compare(alternate: &mut Branch, reference: &mut Branch, delete_empty: bool) -> Option<Mismatch> {
    let (a, b) = (alternate.gas_used(), reference.gas_used());
    if a != b {
        return Some(Mismatch::new(
            MismatchCheck::GasUsed,
            format!("alternate: {a}, reference: {b}"),
        ));
    }

    if alternate.receipt() != reference.receipt() {
        return Some(Mismatch::new(
            MismatchCheck::Receipt,
            format!(
                "alternate: {:?}, reference: {:?}",
                alternate.receipt(),
                reference.receipt()
            ),
        ));
    }

    match (alternate.error(), reference.error()) {
        (Some(a), Some(b)) if a != b => {
            return Some(Mismatch::new(
                MismatchCheck::ErrorText,
                format!("alternate: {a}, reference: {b}"),
            ))
        }
        (a, b) if a.is_some() != b.is_some() => {
            return Some(Mismatch::new(
                MismatchCheck::ErrorPresence,
                format!("alternate: {a:?}, reference: {b:?}"),
            ))
        }
        _ => {}
    }

    let (a, b) = (
        alternate.state.intermediate_root(delete_empty),
        reference.state.intermediate_root(delete_empty),
    );
    if a != b {
        return Some(Mismatch::new(
            MismatchCheck::IntermediateRoot,
            format!("alternate: {a}, reference: {b}"),
        ));
    }

    if alternate.state != reference.state {
        return Some(Mismatch::new(
            MismatchCheck::State,
            "state contents differ",
        ));
    }

    None
}
