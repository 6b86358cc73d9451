//! Core type definitions for the Gavel bidding engine.
//!
//! Shared records and canonical ids for lots, auction stages, ledger bids,
//! and proxy ceilings. All monetary amounts are integer minor units of the
//! platform currency.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod bid;
pub mod ceiling;
pub mod ids;
pub mod lot;
pub mod stage;

pub use bid::Bid;
pub use ceiling::MaxBidCeiling;
pub use ids::{AuctionId, BidId, BidderId, CeilingId, LotId, StageId};
pub use lot::{Lot, LotStatus};
pub use stage::{AuctionStage, LotStagePrice};
