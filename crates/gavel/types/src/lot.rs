use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AuctionId, BidderId, LotId};

/// Lifecycle state of a lot.
///
/// `Closed` is transient: the end time passed but finalization has not run
/// yet. `Sold` and `Unsold` are terminal once finalization assigns them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    Draft,
    Upcoming,
    OpenForBids,
    Closed,
    Sold,
    Unsold,
    Relisted,
    Cancelled,
}

impl LotStatus {
    /// Whether bids may be validated against a lot in this state.
    pub fn accepts_bids(&self) -> bool {
        matches!(self, LotStatus::OpenForBids)
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LotStatus::Sold | LotStatus::Unsold | LotStatus::Relisted | LotStatus::Cancelled
        )
    }

    /// Legality table for lifecycle transitions.
    pub fn can_transition_to(&self, to: LotStatus) -> bool {
        use LotStatus::*;
        match (self, to) {
            (Draft, Upcoming) => true,
            (Upcoming, OpenForBids) => true,
            (OpenForBids, Closed) => true,
            (OpenForBids, Sold) | (OpenForBids, Unsold) => true,
            (Closed, Sold) | (Closed, Unsold) => true,
            (Unsold, Relisted) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for LotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LotStatus::Draft => "draft",
            LotStatus::Upcoming => "upcoming",
            LotStatus::OpenForBids => "open_for_bids",
            LotStatus::Closed => "closed",
            LotStatus::Sold => "sold",
            LotStatus::Unsold => "unsold",
            LotStatus::Relisted => "relisted",
            LotStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// An auctionable item.
///
/// `price_minor` is monotonically non-decreasing while the lot is open and
/// only moves through the ledger append path. Amounts are integer minor
/// units of the platform currency.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lot {
    pub id: LotId,
    pub auction_id: AuctionId,
    /// Current binding price. Equals `initial_price_minor` until the first
    /// accepted bid.
    pub price_minor: u64,
    pub initial_price_minor: u64,
    /// Lot-level increment step; stages may override it.
    pub bid_increment_minor: Option<u64>,
    pub bid_count: u64,
    pub status: LotStatus,
    /// Effective closing time. Soft-close extensions move this forward.
    pub end_at: DateTime<Utc>,
    /// When set, late bids extend `end_at` instead of being sniped past.
    pub soft_close: bool,
    /// Assigned by finalization only.
    pub winner: Option<BidderId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lot {
    /// Create a lot scheduled into an auction, starting in `Draft`.
    pub fn new(
        auction_id: AuctionId,
        initial_price_minor: u64,
        bid_increment_minor: Option<u64>,
        end_at: DateTime<Utc>,
        soft_close: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LotId::generate(),
            auction_id,
            price_minor: initial_price_minor,
            initial_price_minor,
            bid_increment_minor,
            bid_count: 0,
            status: LotStatus::Draft,
            end_at,
            soft_close,
            winner: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Clone this lot into a fresh draft at its original starting price.
    /// Used when an unsold lot is relisted.
    pub fn relist_as_draft(&self, end_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: LotId::generate(),
            auction_id: self.auction_id,
            price_minor: self.initial_price_minor,
            initial_price_minor: self.initial_price_minor,
            bid_increment_minor: self.bid_increment_minor,
            bid_count: 0,
            status: LotStatus::Draft,
            end_at,
            soft_close: self.soft_close,
            winner: None,
            created_at: now,
            updated_at: now,
        }
    }
}
