//! Change notifications for lots and auctions.
//!
//! Live views subscribe to refresh when a lot changes. Delivery is
//! best-effort and at-least-once for connected subscribers: publishing
//! never blocks, never fails the mutation that produced the event, and is
//! always done after the change has committed.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use gavel_types::{AuctionId, BidderId, LotId, LotStatus};

/// A change on a lot, keyed by lot and by auction so subscribers can track
/// either a single lot page or a whole auction room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotEvent {
    pub lot_id: LotId,
    pub auction_id: AuctionId,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: LotEventKind,
}

impl LotEvent {
    pub fn concerns_lot(&self, lot_id: &LotId) -> bool {
        self.lot_id == *lot_id
    }

    pub fn concerns_auction(&self, auction_id: &AuctionId) -> bool {
        self.auction_id == *auction_id
    }
}

/// What changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LotEventKind {
    BidAccepted {
        amount_minor: u64,
        bid_count: u64,
        proxy: bool,
    },
    SoftCloseExtended {
        new_end_at: DateTime<Utc>,
    },
    LotOpened,
    LotClosed,
    LotCancelled,
    LotFinalized {
        status: LotStatus,
        winner: Option<BidderId>,
        final_price_minor: u64,
    },
    CeilingSet {
        bidder: BidderId,
    },
    CeilingExhausted {
        bidder: BidderId,
    },
}

/// Broadcast bus for lot events.
pub struct EventBus {
    sender: broadcast::Sender<LotEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Send errors (no receivers) are ignored; a
    /// notification must never fail or roll back the mutation behind it.
    pub fn publish(&self, event: LotEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to all lot events. Callers filter with
    /// [`LotEvent::concerns_lot`] / [`LotEvent::concerns_auction`].
    pub fn subscribe(&self) -> broadcast::Receiver<LotEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(kind: LotEventKind) -> LotEvent {
        LotEvent {
            lot_id: LotId::generate(),
            auction_id: AuctionId::generate(),
            at: Utc::now(),
            kind,
        }
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::default();
        bus.publish(sample_event(LotEventKind::LotOpened));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = sample_event(LotEventKind::BidAccepted {
            amount_minor: 1_100,
            bid_count: 1,
            proxy: false,
        });
        bus.publish(event.clone());

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn events_can_be_filtered_by_lot_and_auction() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = sample_event(LotEventKind::LotClosed);
        bus.publish(event.clone());

        let received = rx.recv().await.unwrap();
        assert!(received.concerns_lot(&event.lot_id));
        assert!(received.concerns_auction(&event.auction_id));
        assert!(!received.concerns_lot(&LotId::generate()));
    }

    #[test]
    fn events_serialize_with_a_kind_tag() {
        let event = sample_event(LotEventKind::SoftCloseExtended {
            new_end_at: Utc::now(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "soft_close_extended");

        let restored: LotEvent = serde_json::from_value(json).unwrap();
        assert_eq!(restored, event);
    }
}
