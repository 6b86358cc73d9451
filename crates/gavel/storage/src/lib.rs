//! Gavel storage abstractions.
//!
//! This crate defines the persistence port for the bidding engine:
//! - lot records with serialized price/status mutations
//! - the append-only bid ledger
//! - proxy maximum-bid ceilings (history-preserving upserts)
//! - auction stages and per-lot stage pricing
//!
//! Design stance: a transactional backend remains the source of truth in
//! production; the in-memory adapter here is the reference implementation of
//! the port and the fixture for engine tests.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryAuctionStore;
pub use traits::{AuctionStore, BidLedger, CeilingStore, LotStore, QueryWindow, StageStore};
