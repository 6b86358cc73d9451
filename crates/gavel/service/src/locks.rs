//! Per-lot serialization.
//!
//! Every read-then-write against one lot runs under that lot's async mutex;
//! bids on different lots never contend. Acquisition is bounded so a caller
//! stuck behind a busy lot fails cleanly instead of hanging.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use gavel_engine::{AuctionError, EngineResult};
use gavel_types::LotId;

/// Registry of per-lot mutexes, created on first use.
#[derive(Default)]
pub(crate) struct LotLocks {
    inner: StdMutex<HashMap<LotId, Arc<Mutex<()>>>>,
}

impl LotLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn handle(&self, lot_id: &LotId) -> Arc<Mutex<()>> {
        let mut registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        registry.entry(*lot_id).or_default().clone()
    }

    /// Take the lot's turn, failing with `LockTimeout` after `timeout`.
    pub(crate) async fn acquire(
        &self,
        lot_id: &LotId,
        timeout: Duration,
    ) -> EngineResult<OwnedMutexGuard<()>> {
        let handle = self.handle(lot_id);
        tokio::time::timeout(timeout, handle.lock_owned())
            .await
            .map_err(|_| AuctionError::LockTimeout)
    }
}
