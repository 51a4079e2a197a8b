//! Typed identifiers for every planning entity.
//!
//! All identifiers wrap a UUID v7 so that freshly generated ids sort by
//! creation time. Each entity gets its own newtype to keep a `PersonId` from
//! ever being passed where a `ProjectId` is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generate a new time-ordered identifier (UUID v7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// Create from an existing UUID.
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Short representation (first 8 characters of the UUID).
            pub fn short_id(&self) -> String {
                self.0.to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.short_id())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| TypeError::InvalidId(format!("{s}: {e}")))
            }
        }
    };
}

define_id!(
    /// Identifier of a scenario.
    ScenarioId
);
define_id!(
    /// Identifier of a scenario-scoped assignment row.
    AssignmentId
);
define_id!(
    /// Identifier of a scenario-scoped project override row.
    OverrideId
);
define_id!(
    /// Identifier of a scenario-scoped phase timeline row.
    PhaseTimelineId
);
define_id!(
    /// Identifier of a phase dependency edge.
    DependencyId
);
define_id!(
    /// Identifier of a catalog project.
    ProjectId
);
define_id!(
    /// Identifier of a catalog person.
    PersonId
);
define_id!(
    /// Identifier of a catalog role.
    RoleId
);
define_id!(
    /// Identifier of a catalog phase kind.
    PhaseId
);
define_id!(
    /// Identifier of an audit merge record.
    MergeRecordId
);
