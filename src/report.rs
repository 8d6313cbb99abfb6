//! Per-run record of what a batch recovery produced.

use crate::repair::Fidelity;
use chrono::{DateTime, Utc};
use reclaim_core::{Handle, Kind};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryMode {
    /// Byte-exact verified copies under the original names.
    Copy,
    /// Best-effort repair into `<base>_fixed.<ext>` artifacts.
    Repair,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Recovered {
        output: Handle,
        output_name: String,
        #[serde(flatten)]
        fidelity: Fidelity,
        sha256: Option<String>,
    },
    Failed {
        reason: String,
    },
    /// Not attempted because the run was cancelled first.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutcome {
    pub item: Handle,
    pub name: String,
    pub kind: Kind,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl ItemOutcome {
    pub fn is_recovered(&self) -> bool {
        matches!(self.status, OutcomeStatus::Recovered { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecoveryReport {
    pub destination: Handle,
    pub mode: RecoveryMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
    pub outcomes: Vec<ItemOutcome>,
}

impl RecoveryReport {
    pub fn recovered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_recovered()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Failed { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Skipped))
            .count()
    }

    pub fn summary(&self) -> String {
        let elapsed = (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0;
        format!(
            "{} recovered, {} failed, {} skipped in {elapsed:.1}s{}",
            self.recovered(),
            self.failed(),
            self.skipped(),
            if self.cancelled { " (cancelled)" } else { "" }
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
