use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OWNER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`LockOwner`], usable as a hash key for
/// owner-scoped bookkeeping.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("owner-{}", _0)]
pub struct OwnerId(u64);

/// # Lock Owner
///
/// The identity under which one logical transaction holds locks. All locks
/// acquired for the same owner stand and fall together: they stay in force
/// until a single `release` drops them all.
///
/// An owner is deliberately not `Clone`: one value is one identity, and
/// handing the same identity to two threads at once is outside the manager's
/// contract. Share it across the acquiring thread and any interrupting
/// thread with an [`Arc`](std::sync::Arc).
#[derive(Debug)]
pub struct LockOwner {
    id: OwnerId,
}

impl LockOwner {
    /// Creates a fresh identity, distinct from every other owner in the
    /// process.
    pub fn new() -> Self {
        Self {
            id: OwnerId(NEXT_OWNER_ID.fetch_add(1, Ordering::Relaxed)),
        }
    }

    /// The stable identity of this owner.
    #[inline]
    pub fn id(&self) -> OwnerId {
        self.id
    }
}

impl Default for LockOwner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owners_are_distinct() {
        let a = LockOwner::new();
        let b = LockOwner::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.id());
    }
}
