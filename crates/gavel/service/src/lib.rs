//! Gavel bidding service.
//!
//! The public surface of the bidding engine: place bids, set proxy
//! ceilings, query history, and drive the lot lifecycle. The service owns
//! per-lot serialization (one bid at a time per lot, never across lots),
//! calls the habilitation gate and event subscribers outside that lock, and
//! only answers a bid once all proxy counter-bidding has settled.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod locks;
mod service;

pub use service::{AuctionService, BidAccepted, CeilingAccepted};

// Re-exports for callers wiring up the service.
pub use gavel_engine::{AuctionError, EngineConfig, EngineResult, FinalizeOutcome};
pub use gavel_events::{EventBus, LotEvent, LotEventKind};
pub use gavel_storage::QueryWindow;
