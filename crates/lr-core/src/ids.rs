//! Strongly typed identifier wrappers.
//!
//! Two kinds of node identity exist in the engine:
//!
//! - [`RoadNodeId`] - the stable `i64` id stored in partition files.  It is
//!   the same across restarts and is what callers see in a route path.
//! - [`NodeId`] - a dense `u32` slot in the in-memory graph arena.  It is
//!   assigned in load order, so it differs between processes and must never
//!   leave the engine.

use std::fmt;

/// Generate a typed dense-index wrapper around a primitive unsigned integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Slot of a node in the in-memory graph arena.
    pub struct NodeId(u32);
}

typed_id! {
    /// Index of an interned road classification (`"residential"`, …).
    /// `u16` keeps edge records compact; real datasets use a few dozen tags.
    pub struct ClassId(u16);
}

/// Stable node identifier as stored in the partition files.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct RoadNodeId(pub i64);

impl fmt::Display for RoadNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RoadNodeId {
    #[inline(always)]
    fn from(id: i64) -> Self {
        RoadNodeId(id)
    }
}
