use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use gavel_engine::proxy::ReconcileOutcome;
use gavel_engine::{
    lifecycle, map_append_error, pricing, proxy, soft_close, validate, AuctionError, BidQuote,
    EngineConfig, EngineResult, FinalizeOutcome, HabilitationGate,
};
use gavel_events::{EventBus, LotEvent, LotEventKind};
use gavel_storage::{AuctionStore, BidLedger, CeilingStore, LotStore, QueryWindow, StageStore};
use gavel_types::{
    AuctionStage, Bid, BidderId, Lot, LotId, LotStagePrice, LotStatus, MaxBidCeiling,
};

use crate::locks::LotLocks;

/// Successful bid response. The price and count reflect the settled state
/// after all proxy counter-bidding for the lot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BidAccepted {
    pub bid: Bid,
    pub new_price_minor: u64,
    pub new_bid_count: u64,
    /// Closing time after any soft-close extension this bid triggered.
    pub end_at: DateTime<Utc>,
    /// Proxy answers placed before this response was produced.
    pub counter_bids: Vec<Bid>,
}

/// Successful proxy-ceiling response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CeilingAccepted {
    pub ceiling: MaxBidCeiling,
    pub new_price_minor: u64,
    /// Bids the new ceiling triggered immediately (opening bid or duel).
    pub counter_bids: Vec<Bid>,
}

/// Public bidding operations over injected storage and habilitation ports.
///
/// Every read-then-write against one lot runs under that lot's lock; the
/// habilitation gate and event subscribers are never called while it is
/// held.
pub struct AuctionService {
    store: Arc<dyn AuctionStore>,
    gate: Arc<dyn HabilitationGate>,
    events: EventBus,
    config: EngineConfig,
    locks: LotLocks,
}

impl AuctionService {
    pub fn new(store: Arc<dyn AuctionStore>, gate: Arc<dyn HabilitationGate>) -> Self {
        Self::with_config(store, gate, EngineConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn AuctionStore>,
        gate: Arc<dyn HabilitationGate>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            gate,
            events: EventBus::default(),
            config,
            locks: LotLocks::new(),
        }
    }

    /// Bus carrying lot/auction change notifications.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ---- setup -----------------------------------------------------------

    pub async fn schedule_lot(&self, lot: Lot) -> EngineResult<()> {
        Ok(self.store.insert_lot(lot).await?)
    }

    pub async fn add_stage(&self, stage: AuctionStage) -> EngineResult<()> {
        Ok(self.store.insert_stage(stage).await?)
    }

    pub async fn set_stage_price(&self, price: LotStagePrice) -> EngineResult<()> {
        Ok(self.store.put_stage_price(price).await?)
    }

    // ---- queries ---------------------------------------------------------

    pub async fn lot(&self, lot_id: &LotId) -> EngineResult<Lot> {
        self.load_lot(lot_id).await
    }

    /// Ordered bid history for a lot.
    pub async fn bid_history(&self, lot_id: &LotId, window: QueryWindow) -> EngineResult<Vec<Bid>> {
        self.load_lot(lot_id).await?;
        Ok(self.store.bids_for_lot(lot_id, window).await?)
    }

    /// The bidder's standing ceiling on a lot, if any.
    pub async fn active_max_bid(
        &self,
        lot_id: &LotId,
        bidder: &BidderId,
    ) -> EngineResult<Option<MaxBidCeiling>> {
        self.load_lot(lot_id).await?;
        Ok(self.store.active_ceiling(lot_id, bidder).await?)
    }

    /// Advisory quote for display: what the next bid must reach right now.
    pub async fn minimum_bid(&self, lot_id: &LotId) -> EngineResult<BidQuote> {
        let lot = self.load_lot(lot_id).await?;
        self.quote_for_lot(&lot, Utc::now()).await
    }

    // ---- bidding ---------------------------------------------------------

    /// Validate and accept a bid, settle proxy answers, extend a soft close.
    ///
    /// The caller gets the final price: proxy reconciliation completes
    /// before this returns.
    pub async fn place_bid(
        &self,
        lot_id: &LotId,
        bidder: BidderId,
        bidder_display: &str,
        amount_minor: u64,
    ) -> EngineResult<BidAccepted> {
        let now = Utc::now();
        let lot = self.load_lot(lot_id).await?;
        self.require_habilitated(bidder, &lot).await?;

        let guard = self.locks.acquire(lot_id, self.config.lock_timeout).await?;
        let lot = self.load_lot(lot_id).await?;
        let quote = self.quote_for_lot(&lot, now).await?;
        validate::validate_bid(&lot, &quote, amount_minor, now)?;

        let bid = Bid::new(
            lot.id,
            lot.auction_id,
            bidder,
            bidder_display,
            amount_minor,
            now,
        );
        let updated = self
            .store
            .append_bid(bid.clone(), lot.price_minor)
            .await
            .map_err(map_append_error)?;

        let mut events = vec![lot_event(
            &updated,
            now,
            LotEventKind::BidAccepted {
                amount_minor,
                bid_count: updated.bid_count,
                proxy: false,
            },
        )];

        let base_count = updated.bid_count;
        let ReconcileOutcome {
            lot: settled,
            counter_bids,
            exhausted,
        } = proxy::reconcile(&*self.store, updated, &quote, Some(bidder), now).await?;
        push_reconcile_events(&mut events, &settled, base_count, &counter_bids, &exhausted, now);

        let settled = self.apply_soft_close(settled, now, &mut events).await?;

        drop(guard);
        for event in events {
            self.events.publish(event);
        }
        info!(
            lot = %settled.id,
            bidder = %bidder,
            amount_minor,
            price_minor = settled.price_minor,
            bid_count = settled.bid_count,
            "bid accepted"
        );

        Ok(BidAccepted {
            bid,
            new_price_minor: settled.price_minor,
            new_bid_count: settled.bid_count,
            end_at: settled.end_at,
            counter_bids,
        })
    }

    /// Set or raise a proxy ceiling, then settle any duel it starts.
    pub async fn set_max_bid(
        &self,
        lot_id: &LotId,
        bidder: BidderId,
        bidder_display: &str,
        max_minor: u64,
    ) -> EngineResult<CeilingAccepted> {
        let now = Utc::now();
        let lot = self.load_lot(lot_id).await?;
        self.require_habilitated(bidder, &lot).await?;

        let guard = self.locks.acquire(lot_id, self.config.lock_timeout).await?;
        let lot = self.load_lot(lot_id).await?;
        let quote = self.quote_for_lot(&lot, now).await?;
        let ceiling =
            proxy::set_max_bid(&*self.store, &lot, &quote, bidder, bidder_display, max_minor, now)
                .await?;

        let mut events = vec![lot_event(&lot, now, LotEventKind::CeilingSet { bidder })];

        let leader = self.store.highest_bid(lot_id).await?.map(|b| b.bidder);
        let base_count = lot.bid_count;
        let ReconcileOutcome {
            lot: settled,
            counter_bids,
            exhausted,
        } = proxy::reconcile(&*self.store, lot, &quote, leader, now).await?;
        push_reconcile_events(&mut events, &settled, base_count, &counter_bids, &exhausted, now);

        let settled = if counter_bids.is_empty() {
            settled
        } else {
            self.apply_soft_close(settled, now, &mut events).await?
        };

        drop(guard);
        for event in events {
            self.events.publish(event);
        }

        Ok(CeilingAccepted {
            ceiling,
            new_price_minor: settled.price_minor,
            counter_bids,
        })
    }

    // ---- lifecycle -------------------------------------------------------

    /// `Draft -> Upcoming`: publish a drafted lot into the catalogue.
    pub async fn publish_lot(&self, lot_id: &LotId) -> EngineResult<Lot> {
        let now = Utc::now();
        let guard = self.locks.acquire(lot_id, self.config.lock_timeout).await?;
        let lot = self.load_lot(lot_id).await?;
        let published = lifecycle::publish(&*self.store, &lot, now).await?;
        drop(guard);
        Ok(published)
    }

    /// `Upcoming -> OpenForBids`, triggered when a stage starts.
    pub async fn open_lot(&self, lot_id: &LotId) -> EngineResult<Lot> {
        let now = Utc::now();
        let guard = self.locks.acquire(lot_id, self.config.lock_timeout).await?;
        let lot = self.load_lot(lot_id).await?;
        let opened = lifecycle::open_for_bids(&*self.store, &lot, now).await?;
        drop(guard);
        self.events
            .publish(lot_event(&opened, now, LotEventKind::LotOpened));
        Ok(opened)
    }

    /// Settle the lot: sold to the highest ledger bid, else unsold.
    /// Idempotent; retried scheduler triggers get the recorded outcome.
    pub async fn finalize_lot(&self, lot_id: &LotId) -> EngineResult<FinalizeOutcome> {
        let now = Utc::now();
        let guard = self.locks.acquire(lot_id, self.config.lock_timeout).await?;
        let lot = self.load_lot(lot_id).await?;
        let outcome = lifecycle::finalize(&*self.store, &lot, now).await?;
        drop(guard);

        if !outcome.already_finalized {
            self.events.publish(lot_event(
                &outcome.lot,
                now,
                LotEventKind::LotFinalized {
                    status: outcome.lot.status,
                    winner: outcome.winner,
                    final_price_minor: outcome.final_price_minor,
                },
            ));
        }
        Ok(outcome)
    }

    pub async fn cancel_lot(&self, lot_id: &LotId) -> EngineResult<Lot> {
        let now = Utc::now();
        let guard = self.locks.acquire(lot_id, self.config.lock_timeout).await?;
        let lot = self.load_lot(lot_id).await?;
        let cancelled = lifecycle::cancel(&*self.store, &lot, now).await?;
        drop(guard);
        self.events
            .publish(lot_event(&cancelled, now, LotEventKind::LotCancelled));
        Ok(cancelled)
    }

    /// Retire an unsold lot and clone it into a fresh draft.
    pub async fn relist_lot(
        &self,
        lot_id: &LotId,
        new_end_at: DateTime<Utc>,
    ) -> EngineResult<(Lot, Lot)> {
        let now = Utc::now();
        let guard = self.locks.acquire(lot_id, self.config.lock_timeout).await?;
        let lot = self.load_lot(lot_id).await?;
        let relisted = lifecycle::relist(&*self.store, &lot, new_end_at, now).await?;
        drop(guard);
        Ok(relisted)
    }

    /// Sweep open lots whose (possibly extended) end time has passed into
    /// `Closed`. Driven by an external scheduler; safe to re-run.
    pub async fn close_expired_lots(&self, now: DateTime<Utc>) -> EngineResult<Vec<Lot>> {
        let due = self.store.list_open_lots_past(now).await?;
        let mut closed = Vec::new();

        for candidate in due {
            let guard = match self.locks.acquire(&candidate.id, self.config.lock_timeout).await {
                Ok(guard) => guard,
                Err(err) => {
                    warn!(lot = %candidate.id, error = %err, "skipping busy lot in closing sweep");
                    continue;
                }
            };
            let Some(fresh) = self.store.get_lot(&candidate.id).await? else {
                continue;
            };
            // A bid may have extended the close since the sweep listed it.
            if fresh.status != LotStatus::OpenForBids || fresh.end_at > now {
                continue;
            }
            match lifecycle::close(&*self.store, &fresh, now).await {
                Ok(updated) => {
                    drop(guard);
                    self.events
                        .publish(lot_event(&updated, now, LotEventKind::LotClosed));
                    closed.push(updated);
                }
                Err(err) => {
                    warn!(lot = %fresh.id, error = %err, "failed to close expired lot");
                }
            }
        }
        Ok(closed)
    }

    // ---- internals -------------------------------------------------------

    async fn load_lot(&self, lot_id: &LotId) -> EngineResult<Lot> {
        self.store
            .get_lot(lot_id)
            .await?
            .ok_or(AuctionError::LotNotFound(*lot_id))
    }

    async fn require_habilitated(&self, bidder: BidderId, lot: &Lot) -> EngineResult<()> {
        if self.gate.is_habilitated(&bidder, &lot.auction_id).await? {
            Ok(())
        } else {
            Err(AuctionError::NotHabilitated {
                bidder,
                auction: lot.auction_id,
            })
        }
    }

    async fn quote_for_lot(&self, lot: &Lot, now: DateTime<Utc>) -> EngineResult<BidQuote> {
        let stages = self.store.stages_for_auction(&lot.auction_id).await?;
        let stage = pricing::active_stage(&stages, now)?;
        let stage_price = self.store.stage_price(&lot.id, &stage.id).await?;
        Ok(pricing::quote_for(
            lot,
            stage,
            stage_price.as_ref(),
            self.config.default_increment_minor,
        ))
    }

    async fn apply_soft_close(
        &self,
        lot: Lot,
        bid_at: DateTime<Utc>,
        events: &mut Vec<LotEvent>,
    ) -> EngineResult<Lot> {
        match soft_close::extension(&lot, bid_at, self.config.soft_close_window) {
            Some(new_end_at) => {
                let extended = self.store.extend_end_time(&lot.id, new_end_at).await?;
                info!(lot = %extended.id, %new_end_at, "soft close extended");
                events.push(lot_event(
                    &extended,
                    bid_at,
                    LotEventKind::SoftCloseExtended { new_end_at },
                ));
                Ok(extended)
            }
            None => Ok(lot),
        }
    }
}

fn lot_event(lot: &Lot, at: DateTime<Utc>, kind: LotEventKind) -> LotEvent {
    LotEvent {
        lot_id: lot.id,
        auction_id: lot.auction_id,
        at,
        kind,
    }
}

fn push_reconcile_events(
    events: &mut Vec<LotEvent>,
    settled: &Lot,
    base_count: u64,
    counter_bids: &[Bid],
    exhausted: &[MaxBidCeiling],
    at: DateTime<Utc>,
) {
    for (offset, counter) in counter_bids.iter().enumerate() {
        events.push(lot_event(
            settled,
            at,
            LotEventKind::BidAccepted {
                amount_minor: counter.amount_minor,
                bid_count: base_count + offset as u64 + 1,
                proxy: true,
            },
        ));
    }
    for ceiling in exhausted {
        events.push(lot_event(
            settled,
            at,
            LotEventKind::CeilingExhausted {
                bidder: ceiling.bidder,
            },
        ));
    }
}
