//! Soft close: late bids extend the closing time so a last-second bid can
//! always be answered. A lot with the flag enabled only truly closes after
//! a full window passes with no bids.

use chrono::{DateTime, Duration, Utc};

use gavel_types::Lot;

/// New end time for the lot if this bid lands inside the anti-sniping
/// window, `None` when the close is unaffected.
pub fn extension(lot: &Lot, bid_at: DateTime<Utc>, window: Duration) -> Option<DateTime<Utc>> {
    if !lot.soft_close {
        return None;
    }
    let remaining = lot.end_at - bid_at;
    if remaining < window {
        Some(bid_at + window)
    } else {
        None
    }
}
