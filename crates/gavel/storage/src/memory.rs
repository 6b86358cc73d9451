//! In-memory reference implementation of the Gavel storage port.
//!
//! This adapter is deterministic and test-friendly. Production deployments
//! should back the same traits with a transactional store; the atomicity
//! contract of each mutating operation maps onto a transaction there.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gavel_types::{
    AuctionId, AuctionStage, Bid, BidderId, CeilingId, Lot, LotId, LotStagePrice, LotStatus,
    MaxBidCeiling, StageId,
};

use crate::traits::{BidLedger, CeilingStore, LotStore, QueryWindow, StageStore};
use crate::{StorageError, StorageResult};

/// In-memory Gavel storage adapter.
#[derive(Default)]
pub struct InMemoryAuctionStore {
    lots: RwLock<HashMap<LotId, Lot>>,
    bids: RwLock<HashMap<LotId, Vec<Bid>>>,
    ceilings: RwLock<Vec<MaxBidCeiling>>,
    stages: RwLock<HashMap<AuctionId, Vec<AuctionStage>>>,
    stage_prices: RwLock<HashMap<(LotId, StageId), LotStagePrice>>,
}

impl InMemoryAuctionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LotStore for InMemoryAuctionStore {
    async fn insert_lot(&self, lot: Lot) -> StorageResult<()> {
        let mut lots = self
            .lots
            .write()
            .map_err(|_| StorageError::Backend("lots lock poisoned".to_string()))?;
        if lots.contains_key(&lot.id) {
            return Err(StorageError::Conflict(format!(
                "lot {} already exists",
                lot.id
            )));
        }
        lots.insert(lot.id, lot);
        Ok(())
    }

    async fn get_lot(&self, lot_id: &LotId) -> StorageResult<Option<Lot>> {
        let lots = self
            .lots
            .read()
            .map_err(|_| StorageError::Backend("lots lock poisoned".to_string()))?;
        Ok(lots.get(lot_id).cloned())
    }

    async fn list_lots_by_auction(&self, auction_id: &AuctionId) -> StorageResult<Vec<Lot>> {
        let lots = self
            .lots
            .read()
            .map_err(|_| StorageError::Backend("lots lock poisoned".to_string()))?;
        let mut matching = lots
            .values()
            .filter(|lot| lot.auction_id == *auction_id)
            .cloned()
            .collect::<Vec<_>>();
        matching.sort_by_key(|lot| (lot.created_at, lot.id));
        Ok(matching)
    }

    async fn transition_status(
        &self,
        lot_id: &LotId,
        expected_from: LotStatus,
        to: LotStatus,
        now: DateTime<Utc>,
    ) -> StorageResult<Lot> {
        let mut lots = self
            .lots
            .write()
            .map_err(|_| StorageError::Backend("lots lock poisoned".to_string()))?;
        let lot = lots
            .get_mut(lot_id)
            .ok_or_else(|| StorageError::NotFound(format!("lot {lot_id} not found")))?;

        if lot.status != expected_from {
            return Err(StorageError::InvariantViolation(format!(
                "lot {lot_id}: expected status {expected_from}, found {}",
                lot.status
            )));
        }

        lot.status = to;
        lot.updated_at = now;
        Ok(lot.clone())
    }

    async fn append_bid(&self, bid: Bid, expected_price_minor: u64) -> StorageResult<Lot> {
        let mut lots = self
            .lots
            .write()
            .map_err(|_| StorageError::Backend("lots lock poisoned".to_string()))?;
        let mut bids = self
            .bids
            .write()
            .map_err(|_| StorageError::Backend("bids lock poisoned".to_string()))?;

        let lot = lots
            .get_mut(&bid.lot_id)
            .ok_or_else(|| StorageError::NotFound(format!("lot {} not found", bid.lot_id)))?;

        if lot.price_minor != expected_price_minor {
            return Err(StorageError::Conflict(format!(
                "lot {}: price moved from {} to {} since read",
                lot.id, expected_price_minor, lot.price_minor
            )));
        }
        if lot.bid_count > 0 && bid.amount_minor <= lot.price_minor {
            return Err(StorageError::Conflict(format!(
                "lot {}: bid of {} does not raise current price {}",
                lot.id, bid.amount_minor, lot.price_minor
            )));
        }

        lot.price_minor = bid.amount_minor;
        lot.bid_count += 1;
        lot.updated_at = bid.placed_at;
        let updated = lot.clone();

        bids.entry(bid.lot_id).or_default().push(bid);
        Ok(updated)
    }

    async fn extend_end_time(
        &self,
        lot_id: &LotId,
        new_end_at: DateTime<Utc>,
    ) -> StorageResult<Lot> {
        let mut lots = self
            .lots
            .write()
            .map_err(|_| StorageError::Backend("lots lock poisoned".to_string()))?;
        let lot = lots
            .get_mut(lot_id)
            .ok_or_else(|| StorageError::NotFound(format!("lot {lot_id} not found")))?;

        if new_end_at < lot.end_at {
            return Err(StorageError::InvalidInput(format!(
                "lot {lot_id}: end time only moves forward ({new_end_at} < {})",
                lot.end_at
            )));
        }

        lot.end_at = new_end_at;
        Ok(lot.clone())
    }

    async fn set_winner(
        &self,
        lot_id: &LotId,
        expected_from: LotStatus,
        winner: BidderId,
        final_price_minor: u64,
        now: DateTime<Utc>,
    ) -> StorageResult<Lot> {
        let mut lots = self
            .lots
            .write()
            .map_err(|_| StorageError::Backend("lots lock poisoned".to_string()))?;
        let lot = lots
            .get_mut(lot_id)
            .ok_or_else(|| StorageError::NotFound(format!("lot {lot_id} not found")))?;

        if lot.status != expected_from {
            return Err(StorageError::InvariantViolation(format!(
                "lot {lot_id}: expected status {expected_from}, found {}",
                lot.status
            )));
        }

        lot.status = LotStatus::Sold;
        lot.winner = Some(winner);
        lot.price_minor = final_price_minor;
        lot.updated_at = now;
        Ok(lot.clone())
    }

    async fn list_open_lots_past(&self, now: DateTime<Utc>) -> StorageResult<Vec<Lot>> {
        let lots = self
            .lots
            .read()
            .map_err(|_| StorageError::Backend("lots lock poisoned".to_string()))?;
        let mut expired = lots
            .values()
            .filter(|lot| lot.status == LotStatus::OpenForBids && lot.end_at <= now)
            .cloned()
            .collect::<Vec<_>>();
        expired.sort_by_key(|lot| (lot.end_at, lot.id));
        Ok(expired)
    }
}

#[async_trait]
impl BidLedger for InMemoryAuctionStore {
    async fn bids_for_lot(&self, lot_id: &LotId, window: QueryWindow) -> StorageResult<Vec<Bid>> {
        let bids = self
            .bids
            .read()
            .map_err(|_| StorageError::Backend("bids lock poisoned".to_string()))?;
        let rows = bids.get(lot_id).cloned().unwrap_or_default();
        Ok(apply_window(rows, window))
    }

    async fn highest_bid(&self, lot_id: &LotId) -> StorageResult<Option<Bid>> {
        let bids = self
            .bids
            .read()
            .map_err(|_| StorageError::Backend("bids lock poisoned".to_string()))?;
        // Scanning in ledger order and replacing only on a strictly greater
        // amount leaves the earliest row as the winner of any tie.
        let best = bids.get(lot_id).into_iter().flatten().fold(
            None::<&Bid>,
            |best, bid| match best {
                Some(current) if bid.amount_minor <= current.amount_minor => Some(current),
                _ => Some(bid),
            },
        );
        Ok(best.cloned())
    }
}

#[async_trait]
impl CeilingStore for InMemoryAuctionStore {
    async fn put_ceiling(&self, ceiling: MaxBidCeiling) -> StorageResult<MaxBidCeiling> {
        if !ceiling.active {
            return Err(StorageError::InvalidInput(
                "a new ceiling must be stored active".to_string(),
            ));
        }
        let mut ceilings = self
            .ceilings
            .write()
            .map_err(|_| StorageError::Backend("ceilings lock poisoned".to_string()))?;

        for existing in ceilings.iter_mut() {
            if existing.lot_id == ceiling.lot_id && existing.bidder == ceiling.bidder {
                existing.active = false;
            }
        }
        ceilings.push(ceiling.clone());
        Ok(ceiling)
    }

    async fn active_ceiling(
        &self,
        lot_id: &LotId,
        bidder: &BidderId,
    ) -> StorageResult<Option<MaxBidCeiling>> {
        let ceilings = self
            .ceilings
            .read()
            .map_err(|_| StorageError::Backend("ceilings lock poisoned".to_string()))?;
        Ok(ceilings
            .iter()
            .find(|c| c.active && c.lot_id == *lot_id && c.bidder == *bidder)
            .cloned())
    }

    async fn active_ceilings(&self, lot_id: &LotId) -> StorageResult<Vec<MaxBidCeiling>> {
        let ceilings = self
            .ceilings
            .read()
            .map_err(|_| StorageError::Backend("ceilings lock poisoned".to_string()))?;
        Ok(ceilings
            .iter()
            .filter(|c| c.active && c.lot_id == *lot_id)
            .cloned()
            .collect())
    }

    async fn deactivate_ceiling(&self, ceiling_id: &CeilingId) -> StorageResult<()> {
        let mut ceilings = self
            .ceilings
            .write()
            .map_err(|_| StorageError::Backend("ceilings lock poisoned".to_string()))?;
        let ceiling = ceilings
            .iter_mut()
            .find(|c| c.id == *ceiling_id)
            .ok_or_else(|| StorageError::NotFound(format!("ceiling {ceiling_id} not found")))?;
        ceiling.active = false;
        Ok(())
    }
}

#[async_trait]
impl StageStore for InMemoryAuctionStore {
    async fn insert_stage(&self, stage: AuctionStage) -> StorageResult<()> {
        let mut stages = self
            .stages
            .write()
            .map_err(|_| StorageError::Backend("stages lock poisoned".to_string()))?;
        stages.entry(stage.auction_id).or_default().push(stage);
        Ok(())
    }

    async fn stages_for_auction(&self, auction_id: &AuctionId) -> StorageResult<Vec<AuctionStage>> {
        let stages = self
            .stages
            .read()
            .map_err(|_| StorageError::Backend("stages lock poisoned".to_string()))?;
        let mut ordered = stages.get(auction_id).cloned().unwrap_or_default();
        ordered.sort_by_key(|stage| stage.starts_at);
        Ok(ordered)
    }

    async fn put_stage_price(&self, price: LotStagePrice) -> StorageResult<()> {
        let mut prices = self
            .stage_prices
            .write()
            .map_err(|_| StorageError::Backend("stage prices lock poisoned".to_string()))?;
        prices.insert((price.lot_id, price.stage_id), price);
        Ok(())
    }

    async fn stage_price(
        &self,
        lot_id: &LotId,
        stage_id: &StageId,
    ) -> StorageResult<Option<LotStagePrice>> {
        let prices = self
            .stage_prices
            .read()
            .map_err(|_| StorageError::Backend("stage prices lock poisoned".to_string()))?;
        Ok(prices.get(&(*lot_id, *stage_id)).cloned())
    }
}

fn apply_window<T>(items: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = items.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}
