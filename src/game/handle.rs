//! Generational Actor Handles
//!
//! A handle packs a 16-bit uniqueness tag (high half) and a 16-bit slot
//! index (low half). Slots are reused after despawn; tags never are, so a
//! handle to a despawned actor stops resolving even when its slot is
//! occupied again.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Largest usable tag or slot index (exclusive). `0xFFFF` is reserved.
pub const MAX_HANDLE_PART: u32 = 0xFFFF;

/// Generational reference to an actor slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorHandle(u32);

impl ActorHandle {
    /// Sentinel meaning "no actor".
    pub const INVALID: Self = Self(0xFFFF_FFFF);

    /// Pack a tag and slot index.
    ///
    /// Both must be below [`MAX_HANDLE_PART`]; the registry checks this
    /// before constructing handles.
    pub const fn new(tag: u32, index: u32) -> Self {
        Self(((tag & 0xFFFF) << 16) | (index & 0xFFFF))
    }

    /// Raw packed value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Uniqueness tag.
    pub const fn tag(self) -> u32 {
        self.0 >> 16
    }

    /// Slot index.
    pub const fn index(self) -> usize {
        (self.0 & 0xFFFF) as usize
    }

    /// Whether this is anything other than the sentinel.
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl Default for ActorHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for ActorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "ActorHandle({}#{})", self.index(), self.tag())
        } else {
            f.write_str("ActorHandle(INVALID)")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let h = ActorHandle::new(7, 3);
        assert_eq!(h.tag(), 7);
        assert_eq!(h.index(), 3);
        assert_eq!(h.raw(), (7 << 16) | 3);
        assert!(h.is_valid());
    }

    #[test]
    fn test_invalid_sentinel() {
        assert!(!ActorHandle::INVALID.is_valid());
        assert_eq!(ActorHandle::INVALID.tag(), 0xFFFF);
        assert_eq!(ActorHandle::INVALID.index(), 0xFFFF);
        assert_eq!(ActorHandle::default(), ActorHandle::INVALID);
    }

    #[test]
    fn test_largest_usable_parts_stay_valid() {
        let h = ActorHandle::new(MAX_HANDLE_PART - 1, MAX_HANDLE_PART - 1);
        assert!(h.is_valid());
        assert_ne!(h, ActorHandle::INVALID);
    }
}
