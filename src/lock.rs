use std::sync::atomic::{AtomicU64, Ordering};

use crate::key::KeyRange;
use crate::owner::OwnerId;

static NEXT_LOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Lock`] record. Tie-breaks the index
/// orderings so that records with equal endpoints can coexist in the same
/// ordered set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct LockId(u64);

impl LockId {
    /// Sorts at or before every id ever handed out, which makes it usable
    /// as the tie-break component of slice sentinels.
    pub(crate) const ZERO: Self = Self(0);
}

/// # Lock Record
///
/// One held lock: an owner, a half-open key range, and a mode (exclusive
/// `write` or shared read). A record never changes once created; when two
/// records combine, both are discarded in favor of a fresh one covering the
/// union.
#[derive(Debug, Clone)]
pub(crate) struct Lock {
    id: LockId,
    owner: OwnerId,
    range: KeyRange,
    write: bool,
}

impl Lock {
    pub(crate) fn new(owner: OwnerId, range: KeyRange, write: bool) -> Self {
        Self {
            id: LockId(NEXT_LOCK_ID.fetch_add(1, Ordering::Relaxed)),
            owner,
            range,
            write,
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> LockId {
        self.id
    }

    #[inline]
    pub(crate) fn owner(&self) -> OwnerId {
        self.owner
    }

    #[inline]
    pub(crate) fn range(&self) -> &KeyRange {
        &self.range
    }

    #[inline]
    pub(crate) fn is_write(&self) -> bool {
        self.write
    }

    /// Whether the two records cover at least one key in common.
    pub(crate) fn overlaps(&self, other: &Lock) -> bool {
        self.range.overlaps(&other.range)
    }

    /// Whether the two records cannot be held at the same time: common keys,
    /// different owners, and at least one writer. An owner never conflicts
    /// with itself: widening or upgrading its own coverage is resolved by
    /// merging, not blocking.
    pub(crate) fn conflicts_with(&self, other: &Lock) -> bool {
        self.overlaps(other) && self.owner != other.owner && (self.write || other.write)
    }

    /// Builds the record that results from absorbing `other` into `self`:
    /// same owner, same mode, and a combined range with no gap. Returns
    /// `None` when the two must remain separate records; in particular a
    /// read and a write of the same owner never combine.
    pub(crate) fn merge_with(&self, other: &Lock) -> Option<Lock> {
        if self.owner != other.owner || self.write != other.write {
            return None;
        }
        if !self.range.touches(&other.range) {
            return None;
        }
        Some(Lock::new(self.owner, self.range.union(&other.range), self.write))
    }
}
