use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AuctionId, BidId, BidderId, LotId};

/// One immutable row in a lot's bid ledger.
///
/// Ledger order is (`placed_at`, insertion sequence); rows are never
/// reordered or retroactively inserted ahead of an accepted one. The current
/// highest bid is the maximum `amount_minor`, ties broken by earliest
/// `placed_at`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub lot_id: LotId,
    pub auction_id: AuctionId,
    pub bidder: BidderId,
    /// Name shown in public bid history.
    pub bidder_display: String,
    pub amount_minor: u64,
    pub placed_at: DateTime<Utc>,
    /// True when the system placed this bid on behalf of a ceiling owner.
    pub proxy: bool,
}

impl Bid {
    pub fn new(
        lot_id: LotId,
        auction_id: AuctionId,
        bidder: BidderId,
        bidder_display: impl Into<String>,
        amount_minor: u64,
        placed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BidId::generate(),
            lot_id,
            auction_id,
            bidder,
            bidder_display: bidder_display.into(),
            amount_minor,
            placed_at,
            proxy: false,
        }
    }

    /// A system-attributed counter-bid placed for a ceiling owner.
    pub fn proxy_for(
        lot_id: LotId,
        auction_id: AuctionId,
        owner: BidderId,
        owner_display: impl Into<String>,
        amount_minor: u64,
        placed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            proxy: true,
            ..Self::new(lot_id, auction_id, owner, owner_display, amount_minor, placed_at)
        }
    }
}
