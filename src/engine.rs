//! The engine facade: scan, check, repair and copy over one [`Storage`].

use crate::config::EngineConfig;
use crate::detect::CorruptionDetector;
use crate::error::EngineError;
use crate::repair::{Fidelity, RepairDispatcher, RepairError, Repaired};
use crate::report::{ItemOutcome, OutcomeStatus, RecoveryMode, RecoveryReport};
use crate::scanner::{ScanOptions, ScanOutcome, Scanner, SourceSet};
use crate::transfer::{TransferError, Transferred, VerifiedCopy};
use chrono::Utc;
use rayon::prelude::*;
use reclaim_core::{CorruptReport, Handle, Item, Kind, ScanProgress, Storage};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Result of checking one item.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    /// The item with its damage flag attached.
    pub item: Item,
    pub report: Option<CorruptReport>,
}

#[derive(Debug, Clone, Default)]
pub struct CheckBatch {
    /// Outcomes for the items checked, in input order.
    pub outcomes: Vec<CheckOutcome>,
    /// True when cancellation left some items unchecked.
    pub cancelled: bool,
}

impl CheckBatch {
    pub fn damaged(&self) -> impl Iterator<Item = &CorruptReport> {
        self.outcomes.iter().filter_map(|o| o.report.as_ref())
    }
}

pub struct RecoveryEngine {
    storage: Arc<dyn Storage>,
    config: EngineConfig,
}

impl RecoveryEngine {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_config(storage, EngineConfig::default())
    }

    pub fn with_config(storage: Arc<dyn Storage>, config: EngineConfig) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Enumerates every source in tier order.
    pub fn scan<P, C>(
        &self,
        sources: &SourceSet<'_>,
        options: &ScanOptions,
        on_progress: P,
        is_cancelled: C,
    ) -> ScanOutcome
    where
        P: FnMut(ScanProgress),
        C: Fn() -> bool,
    {
        Scanner::new(&self.config).scan(sources, options, on_progress, is_cancelled)
    }

    pub fn classify(&self, name: &str, mime: Option<&str>) -> Kind {
        reclaim_core::classify(name, mime)
    }

    pub fn detect_corruption(&self, item: &Item) -> Option<CorruptReport> {
        CorruptionDetector::new(self.storage(), &self.config).detect(item)
    }

    pub fn repair_best_effort(&self, item: &Item, dest_dir: &Handle) -> Result<Repaired, RepairError> {
        RepairDispatcher::new(self.storage(), &self.config).repair(item, dest_dir)
    }

    /// Byte-exact copy of `item` into `dest_dir` under `name`.
    pub fn copy_verified(&self, item: &Item, dest_dir: &Handle, name: &str) -> Result<Transferred, TransferError> {
        let copied = VerifiedCopy::new(self.storage(), &self.config).copy(item.handle(), dest_dir, name);
        match &copied {
            Ok(t) => tracing::info!(item = %item.handle(), output = %t.name, bytes = t.bytes, "copied"),
            Err(e) => tracing::warn!(item = %item.handle(), error = %e, "copy failed"),
        }
        copied
    }

    /// Probes every item in parallel. Items reached after cancellation are
    /// left out of the batch.
    pub fn check_all<P, C>(&self, items: &[Item], on_progress: P, is_cancelled: C) -> CheckBatch
    where
        P: Fn(u64, u64) + Sync,
        C: Fn() -> bool + Sync,
    {
        let started = Instant::now();
        let total = items.len() as u64;
        let done = AtomicU64::new(0);
        let detector = CorruptionDetector::new(self.storage(), &self.config);

        let checked: Vec<Option<CheckOutcome>> = items
            .par_iter()
            .map(|item| {
                if is_cancelled() {
                    return None;
                }
                let report = detector.detect(item);
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                on_progress(finished, total);
                Some(CheckOutcome {
                    item: item.with_damaged(report.is_some()),
                    report,
                })
            })
            .collect();

        let cancelled = checked.iter().any(Option::is_none);
        let outcomes: Vec<CheckOutcome> = checked.into_iter().flatten().collect();
        tracing::info!(
            checked = outcomes.len(),
            damaged = outcomes.iter().filter(|o| o.report.is_some()).count(),
            cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "check complete"
        );
        CheckBatch { outcomes, cancelled }
    }

    /// Recovers items one at a time into `dest_dir`.
    ///
    /// Cancellation is honoured between items; an item in flight finishes.
    pub fn recover_all<P, C>(
        &self,
        items: &[Item],
        dest_dir: &Handle,
        mode: RecoveryMode,
        mut on_progress: P,
        is_cancelled: C,
    ) -> Result<RecoveryReport, EngineError>
    where
        P: FnMut(usize, usize),
        C: Fn() -> bool,
    {
        if !self.storage.is_directory(dest_dir) {
            return Err(EngineError::DestinationUnavailable(dest_dir.clone()));
        }

        let started_at = Utc::now();
        let mut cancelled = false;
        let mut outcomes = Vec::with_capacity(items.len());
        let mut written = HashSet::new();

        for (index, item) in items.iter().enumerate() {
            let status = if cancelled || is_cancelled() {
                cancelled = true;
                OutcomeStatus::Skipped
            } else {
                self.recover_one(item, dest_dir, mode, &mut written)
            };
            outcomes.push(ItemOutcome {
                item: item.handle().clone(),
                name: item.name().to_string(),
                kind: item.kind(),
                status,
            });
            on_progress(index + 1, items.len());
        }

        let report = RecoveryReport {
            destination: dest_dir.clone(),
            mode,
            started_at,
            finished_at: Utc::now(),
            cancelled,
            outcomes,
        };
        tracing::info!(summary = %report.summary(), "recovery finished");
        Ok(report)
    }

    /// Recovers one item under a name no earlier item of the batch was
    /// written to, so a later item never replaces an earlier output.
    fn recover_one(
        &self,
        item: &Item,
        dest_dir: &Handle,
        mode: RecoveryMode,
        written: &mut HashSet<String>,
    ) -> OutcomeStatus {
        let dispatcher = RepairDispatcher::new(self.storage(), &self.config);
        let planned = match mode {
            RecoveryMode::Copy => item.name().to_string(),
            RecoveryMode::Repair => dispatcher.output_name(item),
        };
        let name = distinct_name(&planned, written);
        if name != planned {
            tracing::info!(
                item = %item.handle(),
                %planned,
                output = %name,
                "output name already used in this batch"
            );
        }

        let status = match mode {
            RecoveryMode::Copy => match self.copy_verified(item, dest_dir, &name) {
                Ok(t) => OutcomeStatus::Recovered {
                    output: t.handle,
                    output_name: t.name,
                    fidelity: Fidelity::Exact,
                    sha256: Some(t.sha256),
                },
                Err(e) => OutcomeStatus::Failed { reason: e.to_string() },
            },
            RecoveryMode::Repair => match dispatcher.repair_as(item, dest_dir, &name) {
                Ok(r) => OutcomeStatus::Recovered {
                    output: r.handle,
                    output_name: r.name,
                    fidelity: r.fidelity,
                    sha256: r.sha256,
                },
                Err(e) => OutcomeStatus::Failed { reason: e.to_string() },
            },
        };
        if let OutcomeStatus::Recovered { output_name, .. } = &status {
            written.insert(output_name.clone());
        }
        status
    }
}

/// `name` itself when unused, otherwise `<base> (n).<ext>` with the
/// smallest free `n` from 2.
fn distinct_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let base = reclaim_core::base_name(name);
    let ext = &name[base.len()..];
    (2u32..)
        .map(|n| format!("{base} ({n}){ext}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_name_keeps_extension() {
        let mut taken = HashSet::new();
        assert_eq!(distinct_name("note.txt", &taken), "note.txt");
        taken.insert("note.txt".to_string());
        assert_eq!(distinct_name("note.txt", &taken), "note (2).txt");
        taken.insert("note (2).txt".to_string());
        assert_eq!(distinct_name("note.txt", &taken), "note (3).txt");

        taken.insert("README".to_string());
        assert_eq!(distinct_name("README", &taken), "README (2)");
    }
}
