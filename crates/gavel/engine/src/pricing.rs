//! Stage price resolution.
//!
//! An auction runs ordered pricing stages ("1st session", "2nd session");
//! the same lot can carry a different floor and increment in each. The
//! resolver picks the stage whose window covers "now" and folds the
//! override chain into a single quote the validator and proxy resolver
//! work from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gavel_types::{AuctionStage, Lot, LotStagePrice, StageId};

use crate::{AuctionError, EngineResult};

/// Effective pricing for a lot under the currently active stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BidQuote {
    pub stage_id: StageId,
    /// Opening minimum for the stage: the stage's override initial bid when
    /// present, else the lot's own initial price.
    pub floor_minor: u64,
    /// Step between consecutive bids: stage override, else the lot's step,
    /// else the platform default.
    pub increment_minor: u64,
    /// Lowest amount the next bid must reach. The floor while the ledger is
    /// empty; `current price + increment` once a bid exists.
    pub minimum_minor: u64,
}

/// Resolve the stage whose window contains `now`.
///
/// Overlapping windows prefer the stage with the latest start. When nothing
/// is active, bidding is rejected and the nearest upcoming start is reported
/// so callers can show when the lot opens.
pub fn active_stage(stages: &[AuctionStage], now: DateTime<Utc>) -> EngineResult<&AuctionStage> {
    let active = stages
        .iter()
        .filter(|stage| stage.contains(now))
        .max_by_key(|stage| stage.starts_at);
    if let Some(stage) = active {
        return Ok(stage);
    }

    let opens_at = stages
        .iter()
        .filter(|stage| stage.starts_at > now)
        .map(|stage| stage.starts_at)
        .min();
    Err(AuctionError::StageNotOpen { opens_at })
}

/// Fold the (lot, stage) override chain into a quote.
pub fn quote_for(
    lot: &Lot,
    stage: &AuctionStage,
    stage_price: Option<&LotStagePrice>,
    default_increment_minor: u64,
) -> BidQuote {
    let floor_minor = stage_price
        .and_then(|p| p.initial_bid_minor)
        .unwrap_or(lot.initial_price_minor);
    let increment_minor = stage_price
        .and_then(|p| p.bid_increment_minor)
        .or(lot.bid_increment_minor)
        .unwrap_or(default_increment_minor)
        .max(1);
    let minimum_minor = if lot.bid_count == 0 {
        floor_minor
    } else {
        lot.price_minor + increment_minor
    };
    BidQuote {
        stage_id: stage.id,
        floor_minor,
        increment_minor,
        minimum_minor,
    }
}
