//! Eligibility gate consumed before any bid or ceiling is considered.
//!
//! Habilitation (document review, deposits, signatures) is managed by an
//! external workflow; the engine only ever asks the resulting yes/no
//! question and treats the answer as authoritative at call time.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;

use gavel_storage::StorageError;
use gavel_types::{AuctionId, BidderId};

use crate::{AuctionError, EngineResult};

/// Answers "may this bidder participate in this auction?".
#[async_trait]
pub trait HabilitationGate: Send + Sync {
    /// No caching inside the engine; the gate is queried per request.
    async fn is_habilitated(&self, bidder: &BidderId, auction: &AuctionId)
        -> EngineResult<bool>;
}

/// Gate backed by an in-memory set of granted (bidder, auction) pairs.
/// Used in tests and local runs; deployments adapt their habilitation
/// service behind the same trait.
#[derive(Default)]
pub struct InMemoryHabilitationGate {
    granted: RwLock<HashSet<(BidderId, AuctionId)>>,
}

impl InMemoryHabilitationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, bidder: BidderId, auction: AuctionId) {
        if let Ok(mut granted) = self.granted.write() {
            granted.insert((bidder, auction));
        }
    }

    pub fn revoke(&self, bidder: &BidderId, auction: &AuctionId) {
        if let Ok(mut granted) = self.granted.write() {
            granted.remove(&(*bidder, *auction));
        }
    }
}

#[async_trait]
impl HabilitationGate for InMemoryHabilitationGate {
    async fn is_habilitated(
        &self,
        bidder: &BidderId,
        auction: &AuctionId,
    ) -> EngineResult<bool> {
        let granted = self
            .granted
            .read()
            .map_err(|_| AuctionError::Storage(StorageError::Backend(
                "habilitation lock poisoned".to_string(),
            )))?;
        Ok(granted.contains(&(*bidder, *auction)))
    }
}
