//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `LedgerId` where a `GroupId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(TempleId, "Unique identifier for a temple (the tenant owning a ledger).");
typed_id!(ActorId, "Unique identifier for an actor supplied by the auth collaborator.");
typed_id!(GroupId, "Unique identifier for an account group.");
typed_id!(LedgerId, "Unique identifier for a ledger.");
typed_id!(AccountingYearId, "Unique identifier for an accounting year.");
typed_id!(EntryId, "Unique identifier for an entry.");
typed_id!(EntryLineId, "Unique identifier for an entry line.");
typed_id!(BudgetId, "Unique identifier for a budget.");
typed_id!(
    ReconciliationId,
    "Unique identifier for a bank reconciliation session."
);
typed_id!(
    ReconciliationItemId,
    "Unique identifier for a reconciliation item."
);

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
