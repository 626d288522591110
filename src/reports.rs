//! User-submitted safety reports.
//!
//! Reports are kept in memory, most recent first, and never edited after
//! creation. They are not folded into [`crate::safety::SafetyGrid`] scores.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::coordinate::Coordinate;

/// Dashboard default for [`ReportLog::recent`].
pub const RECENT_REPORTS: usize = 5;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ReportKind {
    Harassment,
    PoorLighting,
    Crime,
    UnsafeArea,
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyReport {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub location: Coordinate,
    pub description: String,
    pub severity: Severity,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Dashboard counters over the report log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub total: usize,
    pub high_priority: usize,
    pub by_kind: BTreeMap<ReportKind, usize>,
}

/// Append-only, newest-first report list shared by the whole process.
#[derive(Debug, Default)]
pub struct ReportLog {
    reports: RwLock<VecDeque<SafetyReport>>,
}

impl ReportLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The two verified reports the app ships with, dated relative to `now`.
    #[must_use]
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let log = Self::new();
        log.insert(SafetyReport {
            id: Uuid::new_v4(),
            kind: ReportKind::Harassment,
            location: Coordinate::new(40.7614, -73.9776),
            description: "Unwanted attention from individuals".to_string(),
            severity: Severity::Medium,
            verified: true,
            created_at: now - Duration::days(2),
        });
        log.insert(SafetyReport {
            id: Uuid::new_v4(),
            kind: ReportKind::PoorLighting,
            location: Coordinate::new(40.7589, -73.9851),
            description: "Very dark alley with broken streetlights".to_string(),
            severity: Severity::High,
            verified: true,
            created_at: now - Duration::days(1),
        });
        log
    }

    /// Records a new, unverified report at the front of the list.
    ///
    /// Always succeeds; id and timestamp are assigned here.
    pub fn add_report(
        &self,
        kind: ReportKind,
        location: Coordinate,
        description: impl Into<String>,
        severity: Severity,
    ) -> SafetyReport {
        let report = SafetyReport {
            id: Uuid::new_v4(),
            kind,
            location,
            description: description.into(),
            severity,
            verified: false,
            created_at: Utc::now(),
        };

        log::info!("Recorded {} report ({}) at {}", report.kind, report.severity, report.location);
        self.insert(report.clone());
        report
    }

    fn insert(&self, report: SafetyReport) {
        self.reports
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push_front(report);
    }

    /// All reports, most recent first.
    #[must_use]
    pub fn all(&self) -> Vec<SafetyReport> {
        self.read(|reports| reports.iter().cloned().collect())
    }

    /// The first `limit` reports, most recent first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<SafetyReport> {
        self.read(|reports| reports.iter().take(limit).cloned().collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read(VecDeque::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> ReportStats {
        self.read(|reports| {
            let mut by_kind = BTreeMap::new();
            for report in reports {
                *by_kind.entry(report.kind).or_insert(0) += 1;
            }
            ReportStats {
                total: reports.len(),
                high_priority: reports.iter().filter(|r| r.severity == Severity::High).count(),
                by_kind,
            }
        })
    }

    fn read<T>(&self, f: impl FnOnce(&VecDeque<SafetyReport>) -> T) -> T {
        let guard = self.reports.read().unwrap_or_else(PoisonError::into_inner);
        f(&*guard)
    }
}
