//! Strongly typed local identifiers.
//!
//! Local ids are numeric element ids assigned by the store. Section, entry
//! type and category group ids come from configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw id.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Get the raw id.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| format!("Invalid {}: {s}", $label))
            }
        }
    };
}

numeric_id!(
    /// Id of a local entry or category.
    EntryId,
    "entry id"
);

numeric_id!(
    /// Id of a local section (the collection container).
    SectionId,
    "section id"
);

numeric_id!(
    /// Id of a local entry type within a section.
    EntryTypeId,
    "entry type id"
);

numeric_id!(
    /// Id of a local category group.
    CategoryGroupId,
    "category group id"
);
