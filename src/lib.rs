//! Reclaim: enumerate user files from catalogs and directory trees, check
//! them for structural damage, repair what can be repaired and copy the
//! rest with read-back verification.

pub mod cancel;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod repair;
pub mod report;
pub mod route;
pub mod scanner;
pub mod transfer;

pub use cancel::CancelToken;
pub use config::{ConfigError, EngineConfig};
pub use detect::CorruptionDetector;
pub use engine::{CheckBatch, CheckOutcome, RecoveryEngine};
pub use error::EngineError;
pub use repair::{Fidelity, RepairDispatcher, RepairError, Repaired};
pub use report::{ItemOutcome, OutcomeStatus, RecoveryMode, RecoveryReport};
pub use route::Route;
pub use scanner::{DedupPolicy, ScanOptions, ScanOutcome, Scanner, SourceFailure, SourceSet};
pub use transfer::{sha256_of, TransferError, Transferred, VerifiedCopy};

pub use reclaim_core::{
    classify, CatalogSource, Collection, CoreError, CorruptReport, DirectoryTree, FilteredView,
    Handle, Item, Kind, ScanProgress, SourceTier, Storage,
};
