//! Bid validation: a pure predicate over current state, no side effects.
//!
//! Habilitation is the caller's first check (it needs the async gate);
//! everything after it runs here, in order, first failure wins.

use chrono::{DateTime, Utc};

use gavel_types::Lot;

use crate::pricing::BidQuote;
use crate::{AuctionError, EngineResult};

/// Check a proposed bid amount against the lot and the stage quote.
pub fn validate_bid(
    lot: &Lot,
    quote: &BidQuote,
    amount_minor: u64,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    if !lot.status.accepts_bids() {
        return Err(AuctionError::LotNotOpen { status: lot.status });
    }
    if now > lot.end_at {
        return Err(AuctionError::BiddingEnded);
    }
    if amount_minor < quote.minimum_minor {
        return Err(AuctionError::BidTooLow {
            minimum_minor: quote.minimum_minor,
        });
    }
    Ok(())
}

/// Check a proposed proxy ceiling: it must cover at least the next
/// acceptable bid (one increment above the current price, or the opening
/// minimum while the ledger is empty).
pub fn validate_ceiling(lot: &Lot, quote: &BidQuote, max_minor: u64) -> EngineResult<()> {
    if !lot.status.accepts_bids() {
        return Err(AuctionError::LotNotOpen { status: lot.status });
    }
    if max_minor < quote.minimum_minor {
        return Err(AuctionError::InvalidCeiling {
            minimum_minor: quote.minimum_minor,
        });
    }
    Ok(())
}
