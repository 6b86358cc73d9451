//! End-to-end bidding flows through the public service surface.

use std::sync::Arc;

use chrono::{Duration, Utc};

use gavel_engine::{AuctionError, InMemoryHabilitationGate};
use gavel_service::{AuctionService, EngineConfig, LotEventKind, QueryWindow};
use gavel_storage::InMemoryAuctionStore;
use gavel_types::{AuctionId, AuctionStage, BidderId, Lot, LotStagePrice, LotStatus, StageId};

struct Harness {
    service: Arc<AuctionService>,
    gate: Arc<InMemoryHabilitationGate>,
    auction_id: AuctionId,
    stage_id: StageId,
}

async fn harness() -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let store = Arc::new(InMemoryAuctionStore::new());
    let gate = Arc::new(InMemoryHabilitationGate::new());
    let service = Arc::new(AuctionService::new(store, gate.clone()));

    let auction_id = AuctionId::generate();
    let now = Utc::now();
    let stage = AuctionStage {
        id: StageId::generate(),
        auction_id,
        name: "1st session".into(),
        starts_at: now - Duration::hours(1),
        ends_at: now + Duration::hours(6),
        discount_pct: 0,
    };
    let stage_id = stage.id;
    service.add_stage(stage).await.unwrap();

    Harness {
        service,
        gate,
        auction_id,
        stage_id,
    }
}

impl Harness {
    async fn open_lot(&self, initial_minor: u64, increment_minor: u64, ends_in: Duration) -> Lot {
        self.open_lot_soft(initial_minor, increment_minor, ends_in, false)
            .await
    }

    async fn open_lot_soft(
        &self,
        initial_minor: u64,
        increment_minor: u64,
        ends_in: Duration,
        soft_close: bool,
    ) -> Lot {
        let now = Utc::now();
        let mut lot = Lot::new(
            self.auction_id,
            initial_minor,
            Some(increment_minor),
            now + ends_in,
            soft_close,
            now,
        );
        lot.status = LotStatus::OpenForBids;
        self.service.schedule_lot(lot.clone()).await.unwrap();
        lot
    }

    fn bidder(&self) -> BidderId {
        let bidder = BidderId::generate();
        self.gate.grant(bidder, self.auction_id);
        bidder
    }
}

#[tokio::test]
async fn a_lot_travels_the_whole_lifecycle() {
    let h = harness().await;
    let now = Utc::now();
    let draft = Lot::new(
        h.auction_id,
        1_000,
        Some(100),
        now + Duration::hours(2),
        false,
        now,
    );
    h.service.schedule_lot(draft.clone()).await.unwrap();

    let upcoming = h.service.publish_lot(&draft.id).await.unwrap();
    assert_eq!(upcoming.status, LotStatus::Upcoming);

    let open = h.service.open_lot(&draft.id).await.unwrap();
    assert_eq!(open.status, LotStatus::OpenForBids);

    let bidder = h.bidder();
    h.service.place_bid(&draft.id, bidder, "A", 1_100).await.unwrap();

    let outcome = h.service.finalize_lot(&draft.id).await.unwrap();
    assert_eq!(outcome.lot.status, LotStatus::Sold);
    assert_eq!(outcome.lot.winner, Some(bidder));
}

#[tokio::test]
async fn unhabilitated_bidders_are_turned_away() {
    let h = harness().await;
    let lot = h.open_lot(1_000, 100, Duration::hours(2)).await;

    let outsider = BidderId::generate();
    let err = h
        .service
        .place_bid(&lot.id, outsider, "Outsider", 2_000)
        .await
        .unwrap_err();
    assert!(matches!(err, AuctionError::NotHabilitated { .. }));

    let history = h.service.bid_history(&lot.id, QueryWindow::default()).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn low_bid_reports_the_corrected_minimum() {
    let h = harness().await;
    let lot = h.open_lot(1_000, 100, Duration::hours(2)).await;
    let a = h.bidder();
    let b = h.bidder();

    let accepted = h.service.place_bid(&lot.id, a, "A", 1_100).await.unwrap();
    assert_eq!(accepted.new_price_minor, 1_100);
    assert_eq!(accepted.new_bid_count, 1);

    let err = h.service.place_bid(&lot.id, b, "B", 1_050).await.unwrap_err();
    assert_eq!(err, AuctionError::BidTooLow { minimum_minor: 1_200 });
}

#[tokio::test]
async fn bidding_outside_any_stage_reports_when_it_opens() {
    let store = Arc::new(InMemoryAuctionStore::new());
    let gate = Arc::new(InMemoryHabilitationGate::new());
    let service = AuctionService::new(store, gate.clone());

    let auction_id = AuctionId::generate();
    let now = Utc::now();
    let opens_at = now + Duration::hours(1);
    service
        .add_stage(AuctionStage {
            id: StageId::generate(),
            auction_id,
            name: "2nd session".into(),
            starts_at: opens_at,
            ends_at: now + Duration::hours(3),
            discount_pct: 10,
        })
        .await
        .unwrap();

    let mut lot = Lot::new(auction_id, 1_000, Some(100), now + Duration::hours(3), false, now);
    lot.status = LotStatus::OpenForBids;
    service.schedule_lot(lot.clone()).await.unwrap();

    let bidder = BidderId::generate();
    gate.grant(bidder, auction_id);
    let err = service.place_bid(&lot.id, bidder, "A", 2_000).await.unwrap_err();
    assert_eq!(
        err,
        AuctionError::StageNotOpen {
            opens_at: Some(opens_at)
        }
    );
}

#[tokio::test]
async fn stage_override_sets_the_opening_minimum() {
    let h = harness().await;
    let lot = h.open_lot(1_000, 100, Duration::hours(2)).await;
    h.service
        .set_stage_price(LotStagePrice {
            lot_id: lot.id,
            stage_id: h.stage_id,
            initial_bid_minor: Some(500),
            bid_increment_minor: Some(50),
        })
        .await
        .unwrap();

    let quote = h.service.minimum_bid(&lot.id).await.unwrap();
    assert_eq!(quote.floor_minor, 500);
    assert_eq!(quote.increment_minor, 50);
    assert_eq!(quote.minimum_minor, 500);

    let bidder = h.bidder();
    let accepted = h.service.place_bid(&lot.id, bidder, "A", 500).await.unwrap();
    assert_eq!(accepted.new_price_minor, 500);

    let quote = h.service.minimum_bid(&lot.id).await.unwrap();
    assert_eq!(quote.minimum_minor, 550);
}

#[tokio::test]
async fn proxy_ceiling_defends_until_exhausted() {
    let h = harness().await;
    let lot = h.open_lot(1_000, 100, Duration::hours(2)).await;
    let a = h.bidder();
    let b = h.bidder();

    // A commits up to 5000; the ceiling opens the bidding at the floor.
    let ceiling = h.service.set_max_bid(&lot.id, a, "A", 5_000).await.unwrap();
    assert_eq!(ceiling.new_price_minor, 1_000);
    assert_eq!(ceiling.counter_bids.len(), 1);
    assert!(ceiling.counter_bids[0].proxy);

    // B's 1100 is answered with 1200 before B hears back.
    let accepted = h.service.place_bid(&lot.id, b, "B", 1_100).await.unwrap();
    assert_eq!(accepted.new_price_minor, 1_200);
    assert_eq!(accepted.counter_bids.len(), 1);
    assert_eq!(accepted.counter_bids[0].amount_minor, 1_200);
    assert_eq!(accepted.counter_bids[0].bidder, a);

    // B pushes to 4950; A caps out at exactly 5000 and the ceiling is spent.
    let accepted = h.service.place_bid(&lot.id, b, "B", 4_950).await.unwrap();
    assert_eq!(accepted.new_price_minor, 5_000);
    assert_eq!(accepted.counter_bids.last().unwrap().amount_minor, 5_000);
    assert!(h
        .service
        .active_max_bid(&lot.id, &a)
        .await
        .unwrap()
        .is_none());

    // Nothing answers a bid above the spent ceiling.
    let c = h.bidder();
    let accepted = h.service.place_bid(&lot.id, c, "C", 5_100).await.unwrap();
    assert!(accepted.counter_bids.is_empty());
    assert_eq!(accepted.new_price_minor, 5_100);

    let outcome = h.service.finalize_lot(&lot.id).await.unwrap();
    assert_eq!(outcome.winner, Some(c));
    assert_eq!(outcome.final_price_minor, 5_100);
}

#[tokio::test]
async fn late_bid_extends_a_soft_close() {
    let h = harness().await;
    let lot = h
        .open_lot_soft(1_000, 100, Duration::minutes(2), true)
        .await;
    let bidder = h.bidder();

    let accepted = h.service.place_bid(&lot.id, bidder, "A", 1_100).await.unwrap();
    // Default window is five minutes; a bid two minutes out pushes the end
    // past the original close.
    assert!(accepted.end_at > lot.end_at);

    let stored = h.service.lot(&lot.id).await.unwrap();
    assert_eq!(stored.end_at, accepted.end_at);
}

#[tokio::test]
async fn custom_soft_close_window_applies() {
    let store = Arc::new(InMemoryAuctionStore::new());
    let gate = Arc::new(InMemoryHabilitationGate::new());
    let service = AuctionService::with_config(
        store,
        gate.clone(),
        EngineConfig::with_soft_close_window(Duration::minutes(10)),
    );

    let auction_id = AuctionId::generate();
    let now = Utc::now();
    service
        .add_stage(AuctionStage {
            id: StageId::generate(),
            auction_id,
            name: "1st session".into(),
            starts_at: now - Duration::hours(1),
            ends_at: now + Duration::hours(6),
            discount_pct: 0,
        })
        .await
        .unwrap();

    let mut lot = Lot::new(auction_id, 1_000, Some(100), now + Duration::minutes(8), true, now);
    lot.status = LotStatus::OpenForBids;
    service.schedule_lot(lot.clone()).await.unwrap();

    let bidder = BidderId::generate();
    gate.grant(bidder, auction_id);
    let accepted = service.place_bid(&lot.id, bidder, "A", 1_100).await.unwrap();

    // Eight minutes out is inside a ten-minute window.
    assert!(accepted.end_at > lot.end_at);
    assert!(accepted.end_at - lot.end_at < Duration::minutes(3));
}

#[tokio::test]
async fn early_bid_leaves_the_close_untouched() {
    let h = harness().await;
    let lot = h.open_lot_soft(1_000, 100, Duration::hours(2), true).await;
    let bidder = h.bidder();

    let accepted = h.service.place_bid(&lot.id, bidder, "A", 1_100).await.unwrap();
    assert_eq!(accepted.end_at, lot.end_at);
}

#[tokio::test]
async fn finalize_without_bids_is_unsold() {
    let h = harness().await;
    let lot = h.open_lot(1_000, 100, Duration::hours(2)).await;

    let outcome = h.service.finalize_lot(&lot.id).await.unwrap();
    assert_eq!(outcome.lot.status, LotStatus::Unsold);
    assert!(outcome.winner.is_none());
    assert!(!outcome.already_finalized);
}

#[tokio::test]
async fn finalize_is_idempotent_and_notifies_once() {
    let h = harness().await;
    let lot = h.open_lot(1_000, 100, Duration::hours(2)).await;
    let bidder = h.bidder();
    h.service.place_bid(&lot.id, bidder, "A", 1_100).await.unwrap();

    let mut rx = h.service.events().subscribe();

    let first = h.service.finalize_lot(&lot.id).await.unwrap();
    assert_eq!(first.lot.status, LotStatus::Sold);
    assert_eq!(first.winner, Some(bidder));
    assert_eq!(first.final_price_minor, 1_100);

    let event = rx.recv().await.unwrap();
    assert!(matches!(event.kind, LotEventKind::LotFinalized { .. }));

    let second = h.service.finalize_lot(&lot.id).await.unwrap();
    assert!(second.already_finalized);
    assert_eq!(second.winner, first.winner);
    assert_eq!(second.final_price_minor, first.final_price_minor);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn concurrent_bids_on_one_lot_admit_exactly_one() {
    let h = harness().await;
    let lot = h.open_lot(1_000, 100, Duration::hours(2)).await;
    let a = h.bidder();
    let b = h.bidder();

    let service_a = h.service.clone();
    let service_b = h.service.clone();
    let lot_id = lot.id;

    let task_a = tokio::spawn(async move { service_a.place_bid(&lot_id, a, "A", 1_100).await });
    let task_b = tokio::spawn(async move { service_b.place_bid(&lot_id, b, "B", 1_150).await });

    let results = [task_a.await.unwrap(), task_b.await.unwrap()];
    let accepted: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
    assert_eq!(accepted.len(), 1);

    // The loser saw the fresh price, never a silent overwrite.
    let loser = results.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(
        loser,
        Err(AuctionError::BidTooLow { .. }) | Err(AuctionError::ConcurrentBidConflict)
    ));

    let stored = h.service.lot(&lot.id).await.unwrap();
    assert_eq!(stored.bid_count, 1);
}

#[tokio::test]
async fn expired_lot_rejects_bids_and_closes_in_the_sweep() {
    let h = harness().await;
    let lot = h.open_lot(1_000, 100, Duration::minutes(-1)).await;
    let bidder = h.bidder();

    let err = h.service.place_bid(&lot.id, bidder, "A", 1_100).await.unwrap_err();
    assert_eq!(err, AuctionError::BiddingEnded);

    let closed = h.service.close_expired_lots(Utc::now()).await.unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].status, LotStatus::Closed);

    let err = h.service.place_bid(&lot.id, bidder, "A", 1_100).await.unwrap_err();
    assert_eq!(
        err,
        AuctionError::LotNotOpen {
            status: LotStatus::Closed
        }
    );

    // The sweep is safe to re-run.
    let again = h.service.close_expired_lots(Utc::now()).await.unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn relisted_source_lot_never_accepts_bids_again() {
    let h = harness().await;
    let lot = h.open_lot(1_000, 100, Duration::hours(2)).await;

    h.service.finalize_lot(&lot.id).await.unwrap();
    let (retired, draft) = h
        .service
        .relist_lot(&lot.id, Utc::now() + Duration::days(7))
        .await
        .unwrap();
    assert_eq!(retired.status, LotStatus::Relisted);
    assert_eq!(draft.status, LotStatus::Draft);

    let bidder = h.bidder();
    let err = h.service.place_bid(&lot.id, bidder, "A", 1_100).await.unwrap_err();
    assert_eq!(
        err,
        AuctionError::LotNotOpen {
            status: LotStatus::Relisted
        }
    );
}

#[tokio::test]
async fn bid_history_pages_in_ledger_order() {
    let h = harness().await;
    let lot = h.open_lot(1_000, 100, Duration::hours(2)).await;
    let bidder = h.bidder();

    for amount in [1_000u64, 1_100, 1_200, 1_300] {
        h.service.place_bid(&lot.id, bidder, "A", amount).await.unwrap();
    }

    let all = h.service.bid_history(&lot.id, QueryWindow::default()).await.unwrap();
    let amounts: Vec<u64> = all.iter().map(|b| b.amount_minor).collect();
    assert_eq!(amounts, vec![1_000, 1_100, 1_200, 1_300]);

    let page = h
        .service
        .bid_history(&lot.id, QueryWindow { limit: 2, offset: 1 })
        .await
        .unwrap();
    let amounts: Vec<u64> = page.iter().map(|b| b.amount_minor).collect();
    assert_eq!(amounts, vec![1_100, 1_200]);
}

#[tokio::test]
async fn bid_events_reach_subscribers_keyed_by_lot_and_auction() {
    let h = harness().await;
    let lot = h.open_lot(1_000, 100, Duration::hours(2)).await;
    let bidder = h.bidder();

    let mut rx = h.service.events().subscribe();
    h.service.place_bid(&lot.id, bidder, "A", 1_100).await.unwrap();

    let event = rx.recv().await.unwrap();
    assert!(event.concerns_lot(&lot.id));
    assert!(event.concerns_auction(&h.auction_id));
    assert_eq!(
        event.kind,
        LotEventKind::BidAccepted {
            amount_minor: 1_100,
            bid_count: 1,
            proxy: false,
        }
    );
}
