//! Business logic services

pub mod accrual;
pub mod catalog;
pub mod eligibility;
pub mod inventory;
pub mod lending;
pub mod rent_duration;
pub mod stats;

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::{
    config::{AccrualConfig, LendingConfig},
    error::AppResult,
    models::{Loan, LoanRecord},
    repository::LibraryStore,
};

/// Shared handle on the persistence collaborator
pub type Store = Arc<dyn LibraryStore>;

/// Single serialization point for every operation that reads inventory or a
/// balance and later writes it.
///
/// Borrow, return, sale, catalog edits and each accrual step hold the gate for
/// their whole read-check-write sequence, so two of them never interleave on
/// the same records. The gate is process-local: running several server
/// processes against one database needs per-entity locking or optimistic
/// concurrency on top of it.
#[derive(Clone, Default)]
pub struct WriteGate(Arc<Mutex<()>>);

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enter(&self) -> MutexGuard<'_, ()> {
        self.0.lock().await
    }
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub lending: lending::LendingService,
    pub accrual: accrual::AccrualJob,
    pub stats: stats::StatsService,
    store: Store,
}

impl Services {
    /// Create all services over the given store, sharing one write gate
    pub fn new(store: Store, lending_config: LendingConfig, accrual_config: AccrualConfig) -> Self {
        let gate = WriteGate::new();
        Self {
            catalog: catalog::CatalogService::new(store.clone(), gate.clone()),
            lending: lending::LendingService::new(store.clone(), gate.clone(), lending_config),
            accrual: accrual::AccrualJob::new(store.clone(), gate, accrual_config.overdue_rule),
            stats: stats::StatsService::new(store.clone()),
            store,
        }
    }

    /// Whether the store answers
    pub async fn check_ready(&self) -> AppResult<()> {
        self.store.ping().await
    }
}

/// Decode persisted loans, leaving out (and logging) malformed records
pub(crate) fn decode_loans(records: Vec<LoanRecord>) -> Vec<Loan> {
    records
        .into_iter()
        .filter_map(|record| {
            let loan_id = record.id;
            Loan::try_from(record)
                .map_err(|e| tracing::warn!(loan_id, error = %e, "Ignoring malformed loan record"))
                .ok()
        })
        .collect()
}
