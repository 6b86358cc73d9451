//! Lot lifecycle control.
//!
//! `Draft -> Upcoming -> OpenForBids -> {Closed, Sold, Unsold, Relisted,
//! Cancelled}`. `Closed` means the end time passed before finalization ran;
//! finalization settles the lot as `Sold` (highest ledger bid wins, price
//! frozen) or `Unsold`, and is idempotent so retried schedulers cannot
//! double-sell.

use chrono::{DateTime, Utc};
use tracing::info;

use gavel_storage::AuctionStore;
use gavel_types::{BidderId, Lot, LotStatus};

use crate::{AuctionError, EngineResult};

/// Result of a finalization call.
#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    pub lot: Lot,
    pub winner: Option<BidderId>,
    pub final_price_minor: u64,
    /// True when the lot was already settled and this call changed nothing.
    pub already_finalized: bool,
}

fn ensure_transition(lot: &Lot, to: LotStatus) -> EngineResult<()> {
    if !lot.status.can_transition_to(to) {
        return Err(AuctionError::InvalidLifecycleTransition {
            from: lot.status,
            to,
        });
    }
    Ok(())
}

/// `Draft -> Upcoming`: the lot is published into the auction catalogue.
pub async fn publish<S>(store: &S, lot: &Lot, now: DateTime<Utc>) -> EngineResult<Lot>
where
    S: AuctionStore + ?Sized,
{
    ensure_transition(lot, LotStatus::Upcoming)?;
    let updated = store
        .transition_status(&lot.id, lot.status, LotStatus::Upcoming, now)
        .await?;
    info!(lot = %updated.id, "lot published");
    Ok(updated)
}

/// `Upcoming -> OpenForBids`, triggered when the active stage's start time
/// is reached.
pub async fn open_for_bids<S>(store: &S, lot: &Lot, now: DateTime<Utc>) -> EngineResult<Lot>
where
    S: AuctionStore + ?Sized,
{
    ensure_transition(lot, LotStatus::OpenForBids)?;
    let updated = store
        .transition_status(&lot.id, lot.status, LotStatus::OpenForBids, now)
        .await?;
    info!(lot = %updated.id, "lot open for bids");
    Ok(updated)
}

/// `OpenForBids -> Closed` once the (possibly soft-close extended) end time
/// has passed. Finalization still has to run.
pub async fn close<S>(store: &S, lot: &Lot, now: DateTime<Utc>) -> EngineResult<Lot>
where
    S: AuctionStore + ?Sized,
{
    ensure_transition(lot, LotStatus::Closed)?;
    let updated = store
        .transition_status(&lot.id, lot.status, LotStatus::Closed, now)
        .await?;
    info!(lot = %updated.id, bid_count = updated.bid_count, "lot closed");
    Ok(updated)
}

/// Administrative cancellation; legal from any non-terminal state.
pub async fn cancel<S>(store: &S, lot: &Lot, now: DateTime<Utc>) -> EngineResult<Lot>
where
    S: AuctionStore + ?Sized,
{
    ensure_transition(lot, LotStatus::Cancelled)?;
    let updated = store
        .transition_status(&lot.id, lot.status, LotStatus::Cancelled, now)
        .await?;
    info!(lot = %updated.id, "lot cancelled");
    Ok(updated)
}

/// `Unsold -> Relisted`: retires the source lot and clones it into a fresh
/// draft at the original starting price. The source never accepts bids
/// again.
pub async fn relist<S>(
    store: &S,
    lot: &Lot,
    new_end_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> EngineResult<(Lot, Lot)>
where
    S: AuctionStore + ?Sized,
{
    ensure_transition(lot, LotStatus::Relisted)?;
    let retired = store
        .transition_status(&lot.id, lot.status, LotStatus::Relisted, now)
        .await?;
    let draft = retired.relist_as_draft(new_end_at, now);
    store.insert_lot(draft.clone()).await?;
    info!(source = %retired.id, draft = %draft.id, "lot relisted");
    Ok((retired, draft))
}

/// Settle the lot: highest ledger bid wins, else unsold.
///
/// Legal from `OpenForBids` or `Closed`. Calling it again on a settled lot
/// is a no-op success returning the recorded outcome.
pub async fn finalize<S>(store: &S, lot: &Lot, now: DateTime<Utc>) -> EngineResult<FinalizeOutcome>
where
    S: AuctionStore + ?Sized,
{
    match lot.status {
        LotStatus::Sold => {
            return Ok(FinalizeOutcome {
                winner: lot.winner,
                final_price_minor: lot.price_minor,
                lot: lot.clone(),
                already_finalized: true,
            });
        }
        LotStatus::Unsold => {
            return Ok(FinalizeOutcome {
                winner: None,
                final_price_minor: lot.price_minor,
                lot: lot.clone(),
                already_finalized: true,
            });
        }
        LotStatus::OpenForBids | LotStatus::Closed => {}
        from => {
            return Err(AuctionError::InvalidLifecycleTransition {
                from,
                to: LotStatus::Sold,
            });
        }
    }

    match store.highest_bid(&lot.id).await? {
        Some(highest) => {
            let updated = store
                .set_winner(
                    &lot.id,
                    lot.status,
                    highest.bidder,
                    highest.amount_minor,
                    now,
                )
                .await?;
            info!(
                lot = %updated.id,
                winner = %highest.bidder,
                final_price_minor = highest.amount_minor,
                "lot sold"
            );
            Ok(FinalizeOutcome {
                winner: Some(highest.bidder),
                final_price_minor: highest.amount_minor,
                lot: updated,
                already_finalized: false,
            })
        }
        None => {
            let updated = store
                .transition_status(&lot.id, lot.status, LotStatus::Unsold, now)
                .await?;
            info!(lot = %updated.id, "lot unsold");
            Ok(FinalizeOutcome {
                winner: None,
                final_price_minor: updated.price_minor,
                lot: updated,
                already_finalized: false,
            })
        }
    }
}
