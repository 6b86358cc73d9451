use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gavel_types::{
    AuctionId, AuctionStage, Bid, BidderId, CeilingId, Lot, LotId, LotStagePrice, LotStatus,
    MaxBidCeiling, StageId,
};

use crate::StorageResult;

/// Generic query window for paged reads. A `limit` of 0 means unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// Storage interface for lots and their serialized price/status mutations.
///
/// The mutating operations are the only writers of a lot's price and status.
/// Each one is atomic with respect to concurrent callers: it either applies
/// fully or returns an error leaving the lot untouched.
#[async_trait]
pub trait LotStore: Send + Sync {
    async fn insert_lot(&self, lot: Lot) -> StorageResult<()>;

    async fn get_lot(&self, lot_id: &LotId) -> StorageResult<Option<Lot>>;

    async fn list_lots_by_auction(&self, auction_id: &AuctionId) -> StorageResult<Vec<Lot>>;

    /// Transition lifecycle status from one state to another.
    /// Fails with `InvariantViolation` when the stored status no longer
    /// matches `expected_from`.
    async fn transition_status(
        &self,
        lot_id: &LotId,
        expected_from: LotStatus,
        to: LotStatus,
        now: DateTime<Utc>,
    ) -> StorageResult<Lot>;

    /// Append a bid row and roll the lot price forward as one unit:
    /// verify `lot.price_minor == expected_price_minor`, push the row,
    /// set `price_minor = bid.amount_minor`, increment `bid_count`.
    ///
    /// A price mismatch means another bid committed since the caller read
    /// the lot; the append fails with `Conflict` and nothing is written.
    /// Ledger order is (`placed_at`, insertion sequence), append-only.
    async fn append_bid(&self, bid: Bid, expected_price_minor: u64) -> StorageResult<Lot>;

    /// Move the closing time forward. Rewinding `end_at` is rejected.
    async fn extend_end_time(
        &self,
        lot_id: &LotId,
        new_end_at: DateTime<Utc>,
    ) -> StorageResult<Lot>;

    /// Record the sale: winner, frozen final price, and `Sold` status, with
    /// the same expected-status check as `transition_status`.
    async fn set_winner(
        &self,
        lot_id: &LotId,
        expected_from: LotStatus,
        winner: BidderId,
        final_price_minor: u64,
        now: DateTime<Utc>,
    ) -> StorageResult<Lot>;

    /// Open lots whose `end_at` has passed; feed for the closing sweep.
    async fn list_open_lots_past(&self, now: DateTime<Utc>) -> StorageResult<Vec<Lot>>;
}

/// Read boundary over the append-only bid ledger.
#[async_trait]
pub trait BidLedger: Send + Sync {
    /// Bids for a lot in ledger order (`placed_at`, insertion sequence).
    async fn bids_for_lot(&self, lot_id: &LotId, window: QueryWindow) -> StorageResult<Vec<Bid>>;

    /// The current highest bid: maximum `amount_minor`, ties broken by the
    /// earliest accepted row.
    async fn highest_bid(&self, lot_id: &LotId) -> StorageResult<Option<Bid>>;
}

/// Storage interface for proxy maximum-bid ceilings.
#[async_trait]
pub trait CeilingStore: Send + Sync {
    /// Upsert a bidder's ceiling for a lot as deactivate-then-create:
    /// any prior active ceiling for the (bidder, lot) pair is flipped
    /// inactive and kept, then the new row is stored. At most one active
    /// ceiling per pair ever exists.
    async fn put_ceiling(&self, ceiling: MaxBidCeiling) -> StorageResult<MaxBidCeiling>;

    async fn active_ceiling(
        &self,
        lot_id: &LotId,
        bidder: &BidderId,
    ) -> StorageResult<Option<MaxBidCeiling>>;

    /// All active ceilings on a lot, in creation order.
    async fn active_ceilings(&self, lot_id: &LotId) -> StorageResult<Vec<MaxBidCeiling>>;

    async fn deactivate_ceiling(&self, ceiling_id: &CeilingId) -> StorageResult<()>;
}

/// Storage interface for auction stages and per-lot stage pricing.
#[async_trait]
pub trait StageStore: Send + Sync {
    async fn insert_stage(&self, stage: AuctionStage) -> StorageResult<()>;

    /// Stages for an auction ordered by `starts_at`.
    async fn stages_for_auction(&self, auction_id: &AuctionId) -> StorageResult<Vec<AuctionStage>>;

    async fn put_stage_price(&self, price: LotStagePrice) -> StorageResult<()>;

    async fn stage_price(
        &self,
        lot_id: &LotId,
        stage_id: &StageId,
    ) -> StorageResult<Option<LotStagePrice>>;
}

/// Unified storage bundle consumed by the bidding service.
pub trait AuctionStore: LotStore + BidLedger + CeilingStore + StageStore + Send + Sync {}

impl<T> AuctionStore for T where T: LotStore + BidLedger + CeilingStore + StageStore + Send + Sync {}
