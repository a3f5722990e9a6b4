pub mod auto_transfer;
pub mod card;
pub mod error;
pub mod money;
pub mod payment;
pub mod schedule;
pub mod store;
pub mod testing;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use auto_transfer::AutoTransferEngine;
use payment::PaymentProcessor;
use schedule::ScheduleLifecycle;
use store::{DbLedgerStore, LedgerStore};

/// The three engine components wired to one shared store.
///
/// Cheap to clone; handlers keep one in application state and call into the
/// component they need. Every public operation performs exactly one atomic
/// unit of work against the store.
#[derive(Clone)]
pub struct LedgerEngine {
    pub payments: PaymentProcessor,
    pub auto_transfers: AutoTransferEngine,
    pub schedules: ScheduleLifecycle,
}

impl LedgerEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            payments: PaymentProcessor::new(store.clone()),
            auto_transfers: AutoTransferEngine::new(store.clone()),
            schedules: ScheduleLifecycle::new(store),
        }
    }
}

/// Returns the engine wired to the production database-backed store.
pub fn default_engine(db: DatabaseConnection) -> LedgerEngine {
    LedgerEngine::new(Arc::new(DbLedgerStore::new(db)))
}
