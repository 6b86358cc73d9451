use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BidderId, CeilingId, LotId};

/// A bidder's standing authorization to bid on their behalf up to a limit.
///
/// At most one active ceiling exists per (bidder, lot); raising a ceiling
/// deactivates the previous row rather than deleting it, so superseded
/// authorizations remain for audit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaxBidCeiling {
    pub id: CeilingId,
    pub lot_id: LotId,
    pub bidder: BidderId,
    pub bidder_display: String,
    pub max_minor: u64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl MaxBidCeiling {
    pub fn new(
        lot_id: LotId,
        bidder: BidderId,
        bidder_display: impl Into<String>,
        max_minor: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: CeilingId::generate(),
            lot_id,
            bidder,
            bidder_display: bidder_display.into(),
            max_minor,
            active: true,
            created_at: now,
        }
    }

    /// Whether this ceiling can still answer a rival bid at `price_minor`.
    pub fn outbids(&self, price_minor: u64) -> bool {
        self.active && self.max_minor > price_minor
    }
}
