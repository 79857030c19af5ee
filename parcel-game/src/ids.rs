//! Non-owning handles that link records to the entities they describe.
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }
    };
}

handle!(
    /// A box placed in the world.
    ContainerId,
    "box"
);
handle!(
    /// A loose item waiting on the counter.
    ItemId,
    "item"
);
handle!(
    /// A customer actor owned by the outer game.
    CustomerId,
    "customer"
);
