/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! dualvm-runtime is the **State Processor** of a blockchain execution client: it transits an input
//! world state to the next state by applying every transaction of a block.
//!
//! ```text
//! f(WS, B) -> (WS', [R], [L], G)
//!
//! WS = World state, a set of accounts
//! B  = Block, a header and a sequence of transactions
//! R  = Receipt of each transaction
//! L  = Logs emitted by the block
//! G  = Gas used by the block
//! ```
//!
//! Every transaction is executed by two independently implemented [executors](execution) on
//! isolated copies of the state. Both must agree bit for bit before the transaction is applied
//! to the live state. A disagreement stops block processing with a [Mismatch] and leaves a
//! [diagnostic bundle](diagnostics) behind. This [verification](verifier) can be switched off
//! through [ExecutionConfig].
//!
//! ### Example
//!
//! ```rust
//! // prepare the chain config, chain context, consensus engine, block and state,
//! // and process the block.
//! let processor = dualvm_runtime::StateProcessor::new(config, chain, engine);
//! let output = processor.process(&block, &mut state, &ExecutionConfig::new())?;
//! ```
//!
//! In summary, the [processor] applies each transaction through the [transition] applier, which
//! resolves its sender with the [signer], charges [gas] against the block's [gas_pool] and
//! records the outcome in a [receipt].

pub mod consensus;
pub use consensus::{ChainContext, Engine};

pub mod crypto;

pub mod dao;

pub mod diagnostics;
pub use diagnostics::DiagnosticReport;

pub mod error;
pub use error::{ExecutionError, ProcessError};

pub mod execution;
pub use execution::{
    AlternateExecutor, BlockContext, ExecutionResult, Executors, ReferenceExecutor,
    TransactionExecutor,
};

pub mod gas;

pub mod gas_pool;
pub use gas_pool::{GasPool, GasPoolError};

pub mod params;
pub use params::{
    ChainConfig, DaoForkConfig, DiagnosticsConfig, ExecutionConfig, ExecutorKind, Rules,
    Verification,
};

pub mod processor;
pub use processor::{ProcessOutput, StateProcessor};

pub mod receipt;
pub use receipt::{Receipt, ReceiptOutcome};

pub mod signer;
pub use signer::{Signer, SignerError};

pub mod state;
pub use state::{Account, StateDB};

pub mod transition;
pub use transition::Applier;

pub mod types;
pub use types::{Block, Header, Log, Message, Transaction};

pub mod verifier;
pub use verifier::{Mismatch, MismatchCheck};
