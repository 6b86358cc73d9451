use chrono::{DateTime, Utc};
use thiserror::Error;

use gavel_storage::StorageError;
use gavel_types::{AuctionId, BidderId, LotId, LotStatus};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, AuctionError>;

/// Errors returned to bidding callers.
///
/// Every variant is a typed outcome the caller is expected to handle;
/// only `ConcurrentBidConflict` and `LockTimeout` are worth retrying.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuctionError {
    #[error("bidder {bidder} is not habilitated for auction {auction}")]
    NotHabilitated {
        bidder: BidderId,
        auction: AuctionId,
    },

    #[error("lot is not open for bids (status: {status})")]
    LotNotOpen { status: LotStatus },

    #[error("bidding on this lot has ended")]
    BiddingEnded,

    #[error("no auction stage is open for bidding")]
    StageNotOpen {
        /// Start of the nearest upcoming stage, when one exists.
        opens_at: Option<DateTime<Utc>>,
    },

    #[error("bid too low: minimum acceptable amount is {minimum_minor}")]
    BidTooLow { minimum_minor: u64 },

    #[error("max bid too low: ceiling must be at least {minimum_minor}")]
    InvalidCeiling { minimum_minor: u64 },

    #[error("another bid committed first; re-read the lot and retry")]
    ConcurrentBidConflict,

    #[error("timed out waiting for the lot to become available")]
    LockTimeout,

    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidLifecycleTransition { from: LotStatus, to: LotStatus },

    #[error("lot {0} not found")]
    LotNotFound(LotId),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AuctionError {
    /// Whether the caller may retry the same request unchanged.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            AuctionError::ConcurrentBidConflict | AuctionError::LockTimeout
        )
    }
}

/// Map a failed ledger append onto the caller-facing taxonomy: a storage
/// conflict means another bid raced past validation on stale price data.
pub fn map_append_error(err: StorageError) -> AuctionError {
    match err {
        StorageError::Conflict(_) => AuctionError::ConcurrentBidConflict,
        other => AuctionError::Storage(other),
    }
}
