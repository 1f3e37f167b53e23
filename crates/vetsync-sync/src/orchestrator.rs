//! # Sync Orchestrator
//!
//! Runs one full mirror of the clinic API into the local store.
//!
//! ## Run State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Idle ──► Connecting ──(store fails)──────────────────────────┐         │
//! │               │                                               │         │
//! │               ▼                                               │         │
//! │           Customers ──► Pets ──► SubResources ──► Appointments│         │
//! │               │           │            │               │      │         │
//! │               └───────────┴─(interrupt)┴───────────────┤      │         │
//! │                                                        ▼      │         │
//! │                                                  Summarizing  │         │
//! │                                                        │      │         │
//! │                                                        ▼      ▼         │
//! │                                                      Closed ◄─┘         │
//! │                                                                         │
//! │  Every phase runs whether or not the previous one succeeded.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Record Handling
//! ```text
//! payload ─► map (vetsync-core) ─► SAVEPOINT
//!                                    ├── resolve parents (appointments)
//!                                    ├── upsert
//!                                    └── RELEASE  → Synced
//!                                        ROLLBACK → Failed { reason }
//!
//! every `batch_size` synced records → COMMIT
//! ```
//!
//! Control flow is strictly sequential: one store connection, one request
//! at a time.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::pagination::{unwrap_items, PageStep, PaginationWalker, WalkConfig};
use crate::report::{Phase, PhaseReport, RecordOutcome, RunReport};
use crate::resolver::{AutoCreated, DependencyResolver};
use crate::source::SourceClient;
use vetsync_core::payload::{
    appointment_from_payload, customer_from_payload, grooming_from_payload, pet_from_payload,
    source_key, vaccine_from_payload,
};
use vetsync_core::SourceId;
use vetsync_db::{
    AppointmentRepository, CustomerRepository, Database, DbConfig, DbError, GroomingRepository,
    PetRepository, Savepoint, StoreSession, TableCounts, VaccineRepository,
};

// =============================================================================
// Run State
// =============================================================================

/// Where the orchestrator is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Connecting,
    Customers,
    Pets,
    SubResources,
    Appointments,
    Summarizing,
    Closed,
}

/// Collections walked page by page.
#[derive(Debug, Clone, Copy)]
enum Collection {
    Customers,
    Pets,
    Appointments,
}

impl Collection {
    fn phase(self) -> Phase {
        match self {
            Collection::Customers => Phase::Customers,
            Collection::Pets => Phase::Pets,
            Collection::Appointments => Phase::Appointments,
        }
    }
}

/// Per-pet sub-resources.
#[derive(Debug, Clone, Copy)]
enum Child {
    Vaccines,
    Grooming,
}

impl Child {
    fn endpoint(self, pet_id: SourceId) -> String {
        match self {
            Child::Vaccines => format!("/pets/{}/vacinacoes", pet_id),
            Child::Grooming => format!("/pets/{}/fichas-banho", pet_id),
        }
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Sequences the sync phases over one store session.
pub struct SyncOrchestrator<S> {
    config: SyncConfig,
    source: S,
    resolver: DependencyResolver,
    shutdown: watch::Receiver<bool>,
    state: RunState,
}

impl<S: SourceClient> SyncOrchestrator<S> {
    pub fn new(config: SyncConfig, source: S) -> Self {
        let (_, shutdown) = watch::channel(false);

        SyncOrchestrator {
            resolver: DependencyResolver::new(config.phone.clone()),
            config,
            source,
            shutdown,
            state: RunState::Idle,
        }
    }

    /// Stops the run early once the channel carries `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "Run state transition");
        self.state = next;
    }

    fn interrupted(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Enters the next phase unless the run was interrupted.
    fn proceed(&mut self, next: RunState, report: &mut RunReport) -> bool {
        if self.interrupted() {
            if !report.interrupted {
                info!(skipped_from = ?next, "Interrupted, skipping remaining phases");
            }
            report.interrupted = true;
            return false;
        }
        self.transition(next);
        true
    }

    /// Runs all phases and returns the run report.
    ///
    /// The only error is [`SyncError::StoreUnavailable`]: everything else is
    /// counted in the report.
    pub async fn run(&mut self) -> SyncResult<RunReport> {
        self.transition(RunState::Connecting);

        let db = match self.open_store().await {
            Ok(db) => db,
            Err(e) => {
                error!(error = %e, "Cannot open local store, aborting run");
                self.transition(RunState::Closed);
                return Err(e);
            }
        };

        let mut report = RunReport::new();
        info!(run_id = %report.run_id, "Sync run started");

        let mut session = db.session();

        if self.proceed(RunState::Customers, &mut report) {
            let phase = self.sync_collection(&mut session, Collection::Customers).await;
            report.push_phase(phase);
        }

        if self.proceed(RunState::Pets, &mut report) {
            let phase = self.sync_collection(&mut session, Collection::Pets).await;
            report.push_phase(phase);
        }

        if self.config.sync.sync_sub_resources && self.proceed(RunState::SubResources, &mut report)
        {
            let (vaccines, grooming) = self.sync_sub_resources(&mut session).await;
            report.push_phase(vaccines);
            report.push_phase(grooming);
        }

        if self.proceed(RunState::Appointments, &mut report) {
            let phase = self.sync_collection(&mut session, Collection::Appointments).await;
            report.push_phase(phase);
        }

        self.transition(RunState::Summarizing);

        if let Err(e) = session.finish().await {
            error!(error = %e, "Final commit failed");
        }

        let counts = match Self::table_counts(&db).await {
            Ok(counts) => Some(counts),
            Err(e) => {
                warn!(error = %e, "Could not read table counts");
                None
            }
        };
        report.finish(counts);

        for phase in &report.phases {
            info!(
                phase = %phase.phase,
                synced = phase.synced,
                errors = phase.errors,
                skipped = phase.skipped,
                auto_created_customers = phase.auto_created_customers,
                auto_created_pets = phase.auto_created_pets,
                "Phase summary"
            );
        }
        info!(
            run_id = %report.run_id,
            synced = report.totals.synced,
            errors = report.totals.errors,
            interrupted = report.interrupted,
            "Sync run finished"
        );

        db.close().await;
        self.transition(RunState::Closed);

        Ok(report)
    }

    async fn open_store(&self) -> SyncResult<Database> {
        let settings = &self.config.database;
        let config = DbConfig::new(settings.path.clone())
            .max_connections(settings.max_connections)
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs));

        Database::new(config)
            .await
            .map_err(|e| SyncError::StoreUnavailable(e.to_string()))
    }

    async fn table_counts(db: &Database) -> SyncResult<TableCounts> {
        let mut conn = db.pool().acquire().await.map_err(DbError::from)?;
        Ok(TableCounts::load(&mut conn).await?)
    }

    // =========================================================================
    // Paginated Phases
    // =========================================================================

    fn walker(&self, collection: Collection) -> PaginationWalker {
        let sync = &self.config.sync;
        let paged = WalkConfig {
            duplicate_threshold: sync.duplicate_threshold,
            max_items: None,
            page_delay: sync.page_delay(),
            paginated: true,
        };

        match collection {
            Collection::Customers => PaginationWalker::new(
                "/clientes",
                WalkConfig {
                    duplicate_threshold: sync.duplicate_threshold,
                    ..WalkConfig::single_page()
                },
            ),
            Collection::Pets => PaginationWalker::new(
                "/pets",
                WalkConfig {
                    max_items: sync.pet_cap(),
                    ..paged
                },
            ),
            Collection::Appointments => PaginationWalker::new("/agendamentos", paged)
                .with_param("data_inicio", sync.appointments_from.clone())
                .with_param("data_fim", sync.appointments_until.clone()),
        }
    }

    fn batch_size(&self, collection: Collection) -> usize {
        match collection {
            Collection::Customers => self.config.sync.customer_batch_size,
            Collection::Pets => self.config.sync.pet_batch_size,
            Collection::Appointments => self.config.sync.appointment_batch_size,
        }
    }

    async fn sync_collection(
        &self,
        session: &mut StoreSession,
        collection: Collection,
    ) -> PhaseReport {
        let phase = collection.phase();
        let batch_size = self.batch_size(collection);
        let mut report = PhaseReport::new(phase);
        let mut walker = self.walker(collection);

        info!(phase = %phase, endpoint = walker.endpoint(), "Phase started");

        'walk: loop {
            if self.interrupted() {
                report.interrupted = true;
                break;
            }

            let items = match walker.next_page(&self.source).await {
                PageStep::Items(items) => items,
                PageStep::Done(end) => {
                    debug!(phase = %phase, ?end, fetches = walker.fetches(), "Walk ended");
                    report.end_walk(end);
                    break;
                }
            };

            let mut items = items.into_iter();
            while let Some(item) = items.next() {
                if self.interrupted() {
                    report.interrupted = true;
                    for pending in std::iter::once(item).chain(items) {
                        report.record(
                            source_key(&pending).as_deref(),
                            RecordOutcome::Skipped {
                                reason: "interrupted".to_string(),
                            },
                        );
                    }
                    break 'walk;
                }

                let key = source_key(&item);
                let result = match collection {
                    Collection::Customers => self
                        .apply_customer(session, &item)
                        .await
                        .map(|_| AutoCreated::default()),
                    Collection::Pets => self
                        .apply_pet(session, &item)
                        .await
                        .map(|_| AutoCreated::default()),
                    Collection::Appointments => self.apply_appointment(session, &item).await,
                };

                if let Some(created) = tally(&mut report, session, key.as_deref(), result) {
                    report.add_auto_created(created);
                }

                if let Err(e) = session.commit_if_due(batch_size).await {
                    error!(phase = %phase, error = %e, "Batch commit failed, ending phase");
                    report.aborted = true;
                    break 'walk;
                }
            }
        }

        close_phase(session, &mut report).await;

        if report.limit_reached {
            warn!(phase = %phase, accepted = walker.accepted(), "Item cap reached");
        }
        info!(
            phase = %phase,
            synced = report.synced,
            errors = report.errors,
            "Phase complete"
        );

        report
    }

    // =========================================================================
    // Sub-resource Phase
    // =========================================================================

    async fn sync_sub_resources(&self, session: &mut StoreSession) -> (PhaseReport, PhaseReport) {
        let mut vaccines = PhaseReport::new(Phase::Vaccines);
        let mut grooming = PhaseReport::new(Phase::Grooming);
        let batch_size = self.config.sync.sub_resource_batch_size;
        let miss_limit = self.config.sync.sub_resource_miss_limit();
        let mut consecutive_misses = 0;

        let pet_ids = match session.conn().await {
            Ok(conn) => PetRepository::ids(conn).await,
            Err(e) => Err(e),
        };
        let pet_ids = match pet_ids {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "Cannot list stored pets, skipping sub-resources");
                vaccines.aborted = true;
                grooming.aborted = true;
                return (vaccines, grooming);
            }
        };

        info!(pets = pet_ids.len(), "Sub-resource phase started");

        for (done, pet_id) in pet_ids.into_iter().enumerate() {
            if self.interrupted() {
                vaccines.interrupted = true;
                grooming.interrupted = true;
                break;
            }

            for (child, report) in [
                (Child::Vaccines, &mut vaccines),
                (Child::Grooming, &mut grooming),
            ] {
                if self.sync_children(session, pet_id, child, report).await {
                    consecutive_misses = 0;
                } else {
                    consecutive_misses += 1;
                }
            }

            if miss_limit.is_some_and(|limit| consecutive_misses >= limit) {
                warn!(
                    pet_id,
                    misses = consecutive_misses,
                    "Source keeps failing, aborting sub-resources"
                );
                vaccines.aborted = true;
                grooming.aborted = true;
                break;
            }

            if (done + 1) % batch_size == 0 {
                if let Err(e) = session.commit().await {
                    error!(error = %e, "Batch commit failed, ending sub-resources");
                    vaccines.aborted = true;
                    grooming.aborted = true;
                    break;
                }
                debug!(pets = done + 1, "Sub-resource batch committed");
            }
        }

        close_phase(session, &mut vaccines).await;
        grooming.aborted |= vaccines.aborted;

        for report in [&vaccines, &grooming] {
            info!(
                phase = %report.phase,
                synced = report.synced,
                errors = report.errors,
                source_misses = report.source_misses,
                "Phase complete"
            );
        }

        (vaccines, grooming)
    }

    /// Returns false when the source gave no usable list for this pet.
    async fn sync_children(
        &self,
        session: &mut StoreSession,
        pet_id: SourceId,
        child: Child,
        report: &mut PhaseReport,
    ) -> bool {
        let endpoint = child.endpoint(pet_id);

        let Some(body) = self.source.fetch(&endpoint, &[]).await else {
            report.source_misses += 1;
            return false;
        };
        let Some(items) = unwrap_items(body) else {
            warn!(endpoint = %endpoint, "Unexpected sub-resource payload");
            report.source_misses += 1;
            return false;
        };

        for item in items {
            let key = source_key(&item).unwrap_or_else(|| format!("pet:{}", pet_id));
            let result = match child {
                Child::Vaccines => self.apply_vaccine(session, pet_id, &item).await,
                Child::Grooming => self.apply_grooming(session, pet_id, &item).await,
            };
            tally(report, session, Some(&key), result);
        }
        true
    }

    // =========================================================================
    // Record Application
    // =========================================================================

    async fn apply_customer(&self, session: &mut StoreSession, payload: &Value) -> SyncResult<()> {
        let customer = customer_from_payload(payload, &self.config.phone)?;

        let mut sp = session.savepoint().await?;
        let result = CustomerRepository::upsert(&mut *sp, &customer)
            .await
            .map_err(SyncError::from);
        settle(sp, result).await
    }

    async fn apply_pet(&self, session: &mut StoreSession, payload: &Value) -> SyncResult<()> {
        let pet = pet_from_payload(payload)?;

        let mut sp = session.savepoint().await?;
        let result = PetRepository::upsert(&mut *sp, &pet)
            .await
            .map_err(SyncError::from);
        settle(sp, result).await
    }

    async fn apply_vaccine(
        &self,
        session: &mut StoreSession,
        pet_id: SourceId,
        payload: &Value,
    ) -> SyncResult<()> {
        let record = vaccine_from_payload(pet_id, payload)?;

        let mut sp = session.savepoint().await?;
        let result = VaccineRepository::upsert(&mut *sp, &record)
            .await
            .map_err(SyncError::from);
        settle(sp, result).await
    }

    async fn apply_grooming(
        &self,
        session: &mut StoreSession,
        pet_id: SourceId,
        payload: &Value,
    ) -> SyncResult<()> {
        let service = grooming_from_payload(pet_id, payload)?;

        let mut sp = session.savepoint().await?;
        let result = GroomingRepository::upsert(&mut *sp, &service)
            .await
            .map_err(SyncError::from);
        settle(sp, result).await
    }

    /// Resolves parents and writes the appointment in one savepoint, so a
    /// failing appointment leaves no placeholders behind.
    async fn apply_appointment(
        &self,
        session: &mut StoreSession,
        payload: &Value,
    ) -> SyncResult<AutoCreated> {
        let appointment = appointment_from_payload(payload)?;

        let mut sp = session.savepoint().await?;
        let result = async {
            let created = self
                .resolver
                .ensure_appointment_parents(&mut *sp, payload)
                .await?;
            AppointmentRepository::upsert(&mut *sp, &appointment).await?;
            Ok::<_, SyncError>(created)
        }
        .await;
        settle(sp, result).await
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Releases the savepoint on success, rolls it back on failure.
async fn settle<T>(savepoint: Savepoint<'_>, result: SyncResult<T>) -> SyncResult<T> {
    match result {
        Ok(value) => {
            savepoint.commit().await.map_err(DbError::from)?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = savepoint.rollback().await {
                warn!(error = %rollback, "Savepoint rollback failed");
            }
            Err(e)
        }
    }
}

/// Folds a record result into the phase report.
fn tally<T>(
    report: &mut PhaseReport,
    session: &mut StoreSession,
    key: Option<&str>,
    result: SyncResult<T>,
) -> Option<T> {
    match result {
        Ok(value) => {
            session.record_applied();
            report.record(key, RecordOutcome::Synced);
            Some(value)
        }
        Err(e) => {
            warn!(
                phase = %report.phase,
                entity_id = key.unwrap_or("?"),
                error = %e,
                "Record failed"
            );
            report.record(
                key,
                RecordOutcome::Failed {
                    reason: e.to_string(),
                },
            );
            None
        }
    }
}

/// Commits what the phase left pending.
async fn close_phase(session: &mut StoreSession, report: &mut PhaseReport) {
    if let Err(e) = session.commit().await {
        error!(phase = %report.phase, error = %e, "Phase commit failed");
        report.aborted = true;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
