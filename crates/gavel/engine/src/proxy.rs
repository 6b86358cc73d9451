//! Proxy ("maximum") bid resolution.
//!
//! A bidder pre-authorizes a ceiling; the system bids on their behalf up to
//! it, emulating competitive "up to X" bidding. Reconciliation runs after
//! every accepted bid and settles all standing ceilings before the
//! triggering caller gets a response.
//!
//! The pass is a work-list loop, not recursion. Each round selects the
//! strongest standing ceiling (highest `max_minor`, earliest creation on a
//! tie) and answers the strongest opposition in a single counter-bid:
//! one increment over the runner-up ceiling or over the current price,
//! capped at the winner's own limit. Ceilings left unable to raise the new
//! price are deactivated, so every round removes opposition and the loop
//! settles within the number of active ceilings.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use gavel_storage::AuctionStore;
use gavel_types::{Bid, BidderId, Lot, MaxBidCeiling};

use crate::error::map_append_error;
use crate::pricing::BidQuote;
use crate::validate::validate_ceiling;
use crate::EngineResult;

/// Everything one reconciliation pass changed.
#[derive(Debug)]
pub struct ReconcileOutcome {
    /// Lot state after all counter-bidding settled.
    pub lot: Lot,
    /// System bids appended during the pass, in ledger order.
    pub counter_bids: Vec<Bid>,
    /// Ceilings spent or overpowered during the pass.
    pub exhausted: Vec<MaxBidCeiling>,
}

/// Validate and store a bidder's ceiling as deactivate-then-create.
///
/// The caller runs a reconciliation pass afterwards so a standing rival
/// ceiling (or an empty ledger) is answered immediately.
pub async fn set_max_bid<S>(
    store: &S,
    lot: &Lot,
    quote: &BidQuote,
    bidder: BidderId,
    bidder_display: &str,
    max_minor: u64,
    now: DateTime<Utc>,
) -> EngineResult<MaxBidCeiling>
where
    S: AuctionStore + ?Sized,
{
    validate_ceiling(lot, quote, max_minor)?;
    let ceiling = store
        .put_ceiling(MaxBidCeiling::new(
            lot.id,
            bidder,
            bidder_display,
            max_minor,
            now,
        ))
        .await?;
    info!(
        lot = %lot.id,
        bidder = %bidder,
        max_minor,
        "max bid ceiling set"
    );
    Ok(ceiling)
}

/// Run proxy reconciliation for a lot until no active ceiling can raise the
/// price any further.
///
/// `leader` is the bidder currently holding the price (the one who placed
/// the bid that triggered this pass), or `None` when the ledger is empty.
/// A ceiling never produces a bid above its own `max_minor`.
pub async fn reconcile<S>(
    store: &S,
    mut lot: Lot,
    quote: &BidQuote,
    mut leader: Option<BidderId>,
    now: DateTime<Utc>,
) -> EngineResult<ReconcileOutcome>
where
    S: AuctionStore + ?Sized,
{
    let mut counter_bids = Vec::new();
    let mut exhausted = Vec::new();

    loop {
        let mut standing: Vec<MaxBidCeiling> = store
            .active_ceilings(&lot.id)
            .await?
            .into_iter()
            .filter(|c| c.max_minor > lot.price_minor || lot.bid_count == 0)
            .collect();

        // Only somebody other than the current leader has a reason to raise.
        if !standing.iter().any(|c| Some(c.bidder) != leader) {
            break;
        }

        // Strongest commitment wins; the first bidder to commit wins a tie.
        standing.sort_by(|a, b| {
            b.max_minor
                .cmp(&a.max_minor)
                .then(a.created_at.cmp(&b.created_at))
        });
        let winner = standing[0].clone();
        let runner_up_minor = standing.get(1).map(|c| c.max_minor);

        // One increment over the strongest opposition: the runner-up ceiling
        // when present, else the next acceptable bid on the lot.
        let next_required = if lot.bid_count == 0 {
            quote.minimum_minor
        } else {
            lot.price_minor + quote.increment_minor
        };
        let target = match runner_up_minor {
            Some(runner) => next_required.max(runner + quote.increment_minor),
            None => next_required,
        };
        let counter = winner.max_minor.min(target);

        // A counter must reach the opening minimum on an empty ledger, or
        // actually raise the price otherwise; a ceiling that cannot is spent.
        let insufficient = if lot.bid_count == 0 {
            counter < quote.minimum_minor
        } else {
            counter <= lot.price_minor
        };
        if insufficient {
            store.deactivate_ceiling(&winner.id).await?;
            debug!(lot = %lot.id, bidder = %winner.bidder, "ceiling exhausted without bidding");
            exhausted.push(winner);
            continue;
        }

        let counter_bid = Bid::proxy_for(
            lot.id,
            lot.auction_id,
            winner.bidder,
            winner.bidder_display.clone(),
            counter,
            now,
        );
        lot = store
            .append_bid(counter_bid.clone(), lot.price_minor)
            .await
            .map_err(map_append_error)?;
        info!(
            lot = %lot.id,
            bidder = %winner.bidder,
            amount_minor = counter,
            price_minor = lot.price_minor,
            "proxy counter-bid placed"
        );
        leader = Some(winner.bidder);
        counter_bids.push(counter_bid);

        // Everything the counter-bid just overpowered is out of the race,
        // including the winner's own ceiling when it bid its full limit.
        for ceiling in standing.into_iter() {
            let spent = if ceiling.id == winner.id {
                counter == ceiling.max_minor
            } else {
                ceiling.max_minor <= counter
            };
            if spent {
                store.deactivate_ceiling(&ceiling.id).await?;
                debug!(
                    lot = %lot.id,
                    bidder = %ceiling.bidder,
                    max_minor = ceiling.max_minor,
                    "ceiling exhausted"
                );
                exhausted.push(ceiling);
            }
        }
    }

    Ok(ReconcileOutcome {
        lot,
        counter_bids,
        exhausted,
    })
}
