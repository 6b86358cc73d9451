use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random id.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(
    /// Identifies a single auctionable lot.
    LotId,
    "lot"
);
entity_id!(
    /// Identifies an auction (a set of lots sharing stages and habilitations).
    AuctionId,
    "auction"
);
entity_id!(
    /// Identifies a registered bidder.
    BidderId,
    "bidder"
);
entity_id!(
    /// Identifies a pricing stage within an auction.
    StageId,
    "stage"
);
entity_id!(
    /// Identifies one immutable ledger bid row.
    BidId,
    "bid"
);
entity_id!(
    /// Identifies a proxy maximum-bid ceiling.
    CeilingId,
    "ceiling"
);
