use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AuctionId, LotId, StageId};

/// An ordered pricing phase of an auction, e.g. "1st session".
///
/// Immutable once bidding has started against it; created at auction setup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuctionStage {
    pub id: StageId,
    pub auction_id: AuctionId,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Discount applied to appraised values in this phase, in percent.
    /// Informational for pricing setup; the binding floor comes from the
    /// per-lot stage price rows.
    pub discount_pct: u8,
}

impl AuctionStage {
    /// Whether `now` falls inside this stage's window.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }
}

/// Per (lot, stage) pricing override: the same lot can open at a different
/// minimum, with a different step, in each stage. Read-only during bidding.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LotStagePrice {
    pub lot_id: LotId,
    pub stage_id: StageId,
    pub initial_bid_minor: Option<u64>,
    pub bid_increment_minor: Option<u64>,
}
