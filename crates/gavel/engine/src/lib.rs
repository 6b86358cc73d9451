//! Gavel bidding engine.
//!
//! The decision core of the auction marketplace:
//! - stage price resolution (which session is live, what is the minimum)
//! - bid validation (pure, ordered preconditions)
//! - proxy maximum-bid reconciliation (work-list, settles before response)
//! - soft-close end-time extension (anti-sniping)
//! - lot lifecycle transitions and idempotent finalization
//!
//! Engine functions take "now" explicitly and stay deterministic; the
//! service layer supplies wall-clock time and per-lot serialization.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod config;
mod error;
pub mod habilitation;
pub mod lifecycle;
pub mod pricing;
pub mod proxy;
pub mod soft_close;
pub mod validate;

pub use config::EngineConfig;
pub use error::{map_append_error, AuctionError, EngineResult};
pub use habilitation::{HabilitationGate, InMemoryHabilitationGate};
pub use lifecycle::FinalizeOutcome;
pub use pricing::BidQuote;
pub use proxy::ReconcileOutcome;
