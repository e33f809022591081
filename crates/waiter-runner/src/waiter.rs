use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info, warn};
use waiter_core::{sort_summary, Cycle, LifecycleError, Order, OrderStatus, StatusCount, StoreError, RESETTABLE};
use waiter_interchange::InterchangeError;
use waiter_storage::{OrderFilter, OrderStore, OrderUpdate};
use waiter_storage_sqlite::SqliteStore;

use crate::{sink::ExecutionSink, util::now_epoch, Config};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Input(#[from] InterchangeError),
}

/// A worker over the shared order store.
///
/// Holds no coordination state of its own: every decision is made by the store, so any
/// number of `Waiter`s in any number of processes can point at the same collection.
pub struct Waiter {
    store: Arc<dyn OrderStore>,
    name: String,
    clock: fn() -> f64,
}

impl Waiter {
    pub fn new(store: Arc<dyn OrderStore>, name: impl Into<String>) -> Self {
        Self { store, name: name.into(), clock: now_epoch }
    }

    /// Open the SQLite store named by `cfg`.
    pub fn open(cfg: &Config) -> Result<Self> {
        let path = cfg.database_path();
        let store = SqliteStore::open_with_timeout(&path, cfg.busy_timeout())
            .with_context(|| format!("open order store {}", path.display()))?;
        Ok(Self::new(Arc::new(store), cfg.waiter_name()))
    }

    pub fn with_clock(mut self, clock: fn() -> f64) -> Self {
        self.clock = clock;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Claim one READY order, deliver it, and write the outcome back.
    ///
    /// Delivery failures end up on the order as ERROR and still count as processed;
    /// only store failures are returned as errors.
    pub fn claim_and_deliver_once<S: ExecutionSink + ?Sized>(&self, sink: &S) -> Result<Cycle, RunnerError> {
        let claim = OrderUpdate::set_status(OrderStatus::Running).with_start((self.clock)());
        let Some(mut order) = self.store.find_and_modify(&OrderFilter::status(OrderStatus::Ready), &claim)? else {
            debug!(waiter = %self.name, "no READY orders");
            return Ok(Cycle::Idle);
        };

        info!(order = %order.id, arguments = ?order.arguments, "delivering order");
        let result = sink.deliver(&order.arguments);
        if let Err(failure) = &result {
            warn!(order = %order.id, error = %failure, "delivery failed");
        }

        order.complete(result, &self.name, (self.clock)())?;
        self.store.save(&order)?;
        Ok(Cycle::Processed { id: order.id, status: order.status })
    }

    /// Run cycles until nothing is READY. Returns how many orders were processed.
    pub fn deliver_all<S: ExecutionSink + ?Sized>(&self, sink: &S) -> Result<usize, RunnerError> {
        let mut n = 0;
        while self.claim_and_deliver_once(sink)?.processed() {
            n += 1;
        }
        Ok(n)
    }

    /// One READY order per row, no dedup.
    pub fn load_orders<I>(&self, rows: I) -> Result<usize, RunnerError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut n = 0;
        for arguments in rows {
            self.store.insert(arguments)?;
            n += 1;
        }
        info!(count = n, "loaded orders");
        Ok(n)
    }

    /// Parse CSV order rows and load them. A malformed row loads nothing.
    pub fn load_csv<R: Read>(&self, reader: R) -> Result<usize, RunnerError> {
        let rows = waiter_interchange::read_orders(reader)?;
        self.load_orders(rows)
    }

    /// Count per status; count descending, ties by label descending.
    pub fn status_summary(&self) -> Result<Vec<StatusCount>, RunnerError> {
        Ok(sort_summary(self.store.count_by_status()?))
    }

    pub fn list_orders(&self) -> Result<Vec<Order>, RunnerError> {
        Ok(self.store.find(&OrderFilter::any())?)
    }

    /// Write every order as CSV. Returns how many were written.
    pub fn extract_csv<W: Write>(&self, writer: W) -> Result<usize, RunnerError> {
        let orders = self.list_orders()?;
        waiter_interchange::write_orders(writer, &orders)?;
        Ok(orders.len())
    }

    /// Make RUNNING and ERROR orders eligible again. Audit fields are kept.
    pub fn reset_stuck(&self) -> Result<u64, RunnerError> {
        let n = self
            .store
            .update_many(&OrderFilter::statuses(&RESETTABLE), &OrderUpdate::set_status(OrderStatus::Ready))?;
        info!(count = n, "reset orders to READY");
        Ok(n)
    }

    /// Delete every order, whatever its status.
    pub fn clean_all(&self) -> Result<u64, RunnerError> {
        let n = self.store.delete_all()?;
        info!(count = n, "cleaned orders");
        Ok(n)
    }
}
