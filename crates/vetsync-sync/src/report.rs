//! # Run Reports
//!
//! Per-record outcomes are folded into one [`PhaseReport`] per phase; the
//! orchestrator merges the phase reports into a [`RunReport`] once.
//!
//! ```text
//! record ─► RecordOutcome ─► PhaseReport::record() ─┐
//!                                                   ├─► RunReport::push_phase()
//! placeholders ─► AutoCreated ─► PhaseReport ───────┘          │
//!                                                              ▼
//!                                                   RunReport::finish(counts)
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::pagination::WalkEnd;
use crate::resolver::AutoCreated;
use vetsync_db::TableCounts;

/// Failure samples kept per phase.
const MAX_FAILURE_SAMPLES: usize = 20;

// =============================================================================
// Phase
// =============================================================================

/// A phase of the run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Customers,
    Pets,
    Vaccines,
    Grooming,
    Appointments,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Customers => "customers",
            Phase::Pets => "pets",
            Phase::Vaccines => "vaccines",
            Phase::Grooming => "grooming",
            Phase::Appointments => "appointments",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Record Outcome
// =============================================================================

/// What happened to one source record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Synced,
    /// Not attempted (the run was interrupted before reaching it).
    Skipped { reason: String },
    Failed { reason: String },
}

/// A failed record kept for the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureSample {
    /// Source id, or `?` when the payload had none.
    pub record: String,
    pub reason: String,
}

// =============================================================================
// Phase Report
// =============================================================================

/// Statistics of one phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub synced: usize,
    pub skipped: usize,
    pub errors: usize,
    pub auto_created_customers: usize,
    pub auto_created_pets: usize,

    /// Fetches that returned no data.
    pub source_misses: usize,

    /// How the pagination walk ended, for paginated phases.
    pub walk_end: Option<WalkEnd>,

    /// The item cap stopped the phase.
    pub limit_reached: bool,

    /// The phase could not complete (source or store failure).
    pub aborted: bool,

    pub interrupted: bool,

    pub failures: Vec<FailureSample>,
}

impl PhaseReport {
    pub fn new(phase: Phase) -> Self {
        PhaseReport {
            phase,
            synced: 0,
            skipped: 0,
            errors: 0,
            auto_created_customers: 0,
            auto_created_pets: 0,
            source_misses: 0,
            walk_end: None,
            limit_reached: false,
            aborted: false,
            interrupted: false,
            failures: Vec::new(),
        }
    }

    /// Counts one record outcome.
    pub fn record(&mut self, key: Option<&str>, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Synced => self.synced += 1,
            RecordOutcome::Skipped { .. } => self.skipped += 1,
            RecordOutcome::Failed { reason } => {
                self.errors += 1;
                if self.failures.len() < MAX_FAILURE_SAMPLES {
                    self.failures.push(FailureSample {
                        record: key.unwrap_or("?").to_string(),
                        reason,
                    });
                }
            }
        }
    }

    /// Adds placeholders created for a committed record.
    pub fn add_auto_created(&mut self, created: AutoCreated) {
        self.auto_created_customers += created.customers;
        self.auto_created_pets += created.pets;
    }

    /// Records how the walk feeding this phase ended.
    pub fn end_walk(&mut self, end: WalkEnd) {
        self.walk_end = Some(end);
        match end {
            WalkEnd::LimitReached => self.limit_reached = true,
            WalkEnd::SourceUnavailable => {
                self.source_misses += 1;
                self.aborted = true;
            }
            WalkEnd::UnexpectedPayload => self.aborted = true,
            WalkEnd::Exhausted | WalkEnd::RepeatedContent => {}
        }
    }

    /// Records processed, successfully or not.
    pub fn attempted(&self) -> usize {
        self.synced + self.errors
    }
}

impl fmt::Display for PhaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<13} synced {:>6}  errors {:>5}  skipped {:>5}",
            self.phase, self.synced, self.errors, self.skipped
        )?;
        if self.auto_created_customers + self.auto_created_pets > 0 {
            write!(
                f,
                "  auto-created {} customers / {} pets",
                self.auto_created_customers, self.auto_created_pets
            )?;
        }
        if self.source_misses > 0 {
            write!(f, "  source misses {}", self.source_misses)?;
        }
        if self.limit_reached {
            f.write_str("  [limit reached]")?;
        }
        if self.aborted {
            f.write_str("  [aborted]")?;
        }
        if self.interrupted {
            f.write_str("  [interrupted]")?;
        }
        Ok(())
    }
}

// =============================================================================
// Run Report
// =============================================================================

/// Totals across all phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub synced: usize,
    pub skipped: usize,
    pub errors: usize,
    pub auto_created_customers: usize,
    pub auto_created_pets: usize,
    pub source_misses: usize,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub phases: Vec<PhaseReport>,
    pub interrupted: bool,
    pub totals: RunTotals,

    /// Store row counts after the run, when they could be read.
    pub table_counts: Option<TableCounts>,
}

impl RunReport {
    pub fn new() -> Self {
        RunReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            phases: Vec::new(),
            interrupted: false,
            totals: RunTotals::default(),
            table_counts: None,
        }
    }

    pub fn push_phase(&mut self, phase: PhaseReport) {
        self.interrupted |= phase.interrupted;
        self.phases.push(phase);
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    /// Seals the report: computes totals and stamps the finish time.
    pub fn finish(&mut self, table_counts: Option<TableCounts>) {
        self.totals = self.phases.iter().fold(RunTotals::default(), |mut t, p| {
            t.synced += p.synced;
            t.skipped += p.skipped;
            t.errors += p.errors;
            t.auto_created_customers += p.auto_created_customers;
            t.auto_created_pets += p.auto_created_pets;
            t.source_misses += p.source_misses;
            t
        });
        self.table_counts = table_counts;
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration, once finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sync run {}", self.run_id)?;
        for phase in &self.phases {
            writeln!(f, "  {}", phase)?;
        }
        writeln!(
            f,
            "  total         synced {:>6}  errors {:>5}  skipped {:>5}",
            self.totals.synced, self.totals.errors, self.totals.skipped
        )?;
        if let Some(counts) = &self.table_counts {
            writeln!(
                f,
                "  store: {} customers, {} pets, {} vaccines, {} grooming, {} appointments",
                counts.customers,
                counts.pets,
                counts.vaccines,
                counts.grooming_services,
                counts.appointments
            )?;
        }
        if let Some(duration) = self.duration() {
            writeln!(f, "  took {:.1}s", duration.num_milliseconds() as f64 / 1000.0)?;
        }
        if self.interrupted {
            writeln!(f, "  interrupted: partial results")?;
        }
        Ok(())
    }
}
