//! # Lock Manager
//!
//! Arbitrates read/write locks on half-open byte-key ranges so that many
//! threads can share one ordered key/value store. Readers of a range
//! coexist; a writer excludes everybody else. All locks of one owner stand
//! until a single [`release`](LockManager::release) drops them together,
//! which is what makes transactions honoring the protocol serializable.
//!
//! The manager never touches the store itself; it only decides who may.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

use crate::errors::LatchError;
use crate::index::LockIndex;
use crate::key::KeyRange;
use crate::lock::Lock;
use crate::owner::{LockOwner, OwnerId};

/// Timeouts are capped here so deadline arithmetic can never overflow.
const TEN_YEARS: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Outcome of a [`LockManager::lock`] or [`LockManager::release`] call.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum LockResult {
    /// The lock was acquired, possibly after absorbing locks the owner
    /// already held on touching ranges.
    #[display("success")]
    Success,

    /// The per-call wait timeout elapsed before the range became free.
    #[display("wait timeout expired")]
    WaitTimeoutExpired,

    /// The owner sat on a contested lock past the hold timeout. All of its
    /// locks have been force-released and the owner must abort.
    #[display("hold timeout expired")]
    HoldTimeoutExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldState {
    /// The owner blocks somebody and must be done by this instant.
    Until(Instant),
    /// The deadline passed: the owner's locks are gone, and its next call
    /// reports [`LockResult::HoldTimeoutExpired`].
    Expired,
}

#[derive(Debug, Default)]
struct ManagerState {
    index: LockIndex,
    /// Per-owner sets of held locks; always the same population as `index`.
    owned: HashMap<OwnerId, Vec<Arc<Lock>>>,
    hold_deadlines: HashMap<OwnerId, HoldState>,
    interrupts: HashSet<OwnerId>,
    hold_timeout: Duration,
}

impl ManagerState {
    /// Whether `lock` can be granted right now. On `true`, `mergers` holds
    /// the records the caller must fold into the new lock.
    fn check_lock(&mut self, waiters: &Condvar, lock: &Lock, mergers: &mut Vec<Arc<Lock>>) -> bool {
        // A forced release invalidates the slice being scanned, so the whole
        // scan starts over whenever one happens.
        'start_over: loop {
            let overlapping = self.index.overlapping(lock.range());
            for other in &overlapping {
                if !lock.conflicts_with(other) {
                    continue;
                }
                if !self.hold_timeout.is_zero() {
                    let now = Instant::now();
                    match self.hold_deadlines.get(&other.owner()).copied() {
                        Some(HoldState::Until(deadline)) if now >= deadline => {
                            debug!(owner = %other.owner(), "hold deadline passed, force-releasing");
                            self.hold_deadlines.insert(other.owner(), HoldState::Expired);
                            self.release_owner(other.owner(), waiters);
                            continue 'start_over;
                        }
                        Some(_) => {}
                        None => {
                            // First time anybody was blocked by this owner;
                            // its hold clock starts ticking now.
                            self.hold_deadlines
                                .insert(other.owner(), HoldState::Until(now + self.hold_timeout));
                        }
                    }
                }
                trace!(
                    owner = %lock.owner(),
                    blocker = %other.owner(),
                    blocker_range = ?other.range(),
                    blocker_write = other.is_write(),
                    "lock blocked by conflicting lock"
                );
                return false;
            }
            for other in &overlapping {
                if lock.merge_with(other).is_some() {
                    mergers.push(Arc::clone(other));
                }
            }
            return true;
        }
    }

    /// Removes every lock `owner` holds and wakes all waiters.
    fn release_owner(&mut self, owner: OwnerId, waiters: &Condvar) {
        if let Some(locks) = self.owned.remove(&owner) {
            for lock in &locks {
                self.index.remove(lock);
            }
            trace!(owner = %owner, count = locks.len(), "released all locks of owner");
        }
        waiters.notify_all();
    }

    /// Drops one record from the index and from its owner's set.
    fn remove_lock(&mut self, lock: &Lock) {
        self.index.remove(lock);
        if let Some(locks) = self.owned.get_mut(&lock.owner()) {
            locks.retain(|held| held.id() != lock.id());
        }
    }
}

/// # Lock Manager
///
/// All state sits behind one mutex held for the full duration of every call;
/// contention is resolved by the wait/retry protocol rather than by
/// fine-grained locking. The only place a call blocks is the condition
/// variable inside [`lock`](Self::lock); [`release`](Self::release) never
/// waits.
///
/// Two independent timeouts apply:
///
/// - the **wait timeout**, a per-call bound on how long `lock` blocks on a
///   range held by somebody else;
/// - the **hold timeout** ([`set_hold_timeout`](Self::set_hold_timeout)), a
///   per-owner bound on how long a *contested* lock may be held. Once it
///   expires the owner's locks are force-released, and the owner learns of
///   it from its next `lock` or `release` call.
///
/// The manager keeps owner identities, never the owners themselves. A
/// caller must [`release`](Self::release) an owner exactly once before
/// dropping it (committed, aborted, or expired alike), or the owner's
/// bookkeeping entries stay behind.
#[derive(Debug)]
pub struct LockManager {
    state: Mutex<ManagerState>,
    /// Signaled whenever locks leave the index or an interrupt arrives.
    unlocked: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManagerState::default()),
            unlocked: Condvar::new(),
        }
    }

    /// The configured hold timeout; zero means unlimited.
    pub fn hold_timeout(&self) -> Duration {
        self.state.lock().hold_timeout
    }

    /// Bounds how long an owner may sit on a contested lock before all of
    /// its locks are force-released. Zero, the default, disables the bound.
    /// Values are clamped to ten years.
    ///
    /// The clock for an owner starts the first time some other owner's
    /// `lock` call finds itself blocked by it; owners that never block
    /// anybody are never force-released.
    pub fn set_hold_timeout(&self, hold_timeout: Duration) {
        self.state.lock().hold_timeout = hold_timeout.min(TEN_YEARS);
    }

    /// Acquires a lock on `[min_key, max_key)` for `owner`, blocking up to
    /// `wait_timeout` while the range conflicts with other owners' locks.
    ///
    /// An absent endpoint leaves the range unbounded on that side. A zero
    /// `wait_timeout` waits indefinitely; nonzero values are clamped to ten
    /// years. Equal endpoints are legal: the empty range conflicts with
    /// nobody but still merges into the owner's touching locks.
    ///
    /// Once acquired, a lock stays acquired until [`release`](Self::release)
    /// drops all of the owner's locks together. Locks of the same owner
    /// never block each other: a candidate covering or extending ranges the
    /// owner already holds in the same mode replaces them with one merged
    /// record.
    ///
    /// # Errors
    ///
    /// [`LatchError::InvalidRange`] when `min_key` sorts after `max_key`
    /// (nothing changes), and [`LatchError::Interrupted`] when
    /// [`interrupt`](Self::interrupt) aborts the wait (the candidate is not
    /// inserted).
    pub fn lock(
        &self,
        owner: &LockOwner,
        min_key: Option<Bytes>,
        max_key: Option<Bytes>,
        write: bool,
        wait_timeout: Duration,
    ) -> Result<LockResult, LatchError> {
        let range = KeyRange::new(min_key, max_key)?;
        let wait_timeout = wait_timeout.min(TEN_YEARS);

        let mut state = self.state.lock();

        // A force-release may already have happened; the owner finds out
        // here, and the marker is consumed by the observation.
        if state.hold_deadlines.get(&owner.id()) == Some(&HoldState::Expired) {
            state.hold_deadlines.remove(&owner.id());
            return Ok(LockResult::HoldTimeoutExpired);
        }

        let candidate = Lock::new(owner.id(), range, write);
        trace!(owner = %owner.id(), range = ?candidate.range(), write, "lock requested");

        let deadline = if wait_timeout.is_zero() {
            None
        } else {
            Some(Instant::now() + wait_timeout)
        };
        let mut mergers = Vec::new();
        loop {
            mergers.clear();
            if state.check_lock(&self.unlocked, &candidate, &mut mergers) {
                break;
            }
            // The wait below is the call's only suspension point; a pending
            // interrupt aborts instead of blocking.
            if state.interrupts.remove(&owner.id()) {
                return Err(LatchError::Interrupted);
            }
            match deadline {
                None => self.unlocked.wait(&mut state),
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        trace!(owner = %owner.id(), range = ?candidate.range(), "wait timeout expired");
                        return Ok(LockResult::WaitTimeoutExpired);
                    }
                    let _ = self.unlocked.wait_until(&mut state, deadline);
                }
            }
        }

        // Fold the owner's touching same-mode locks into a single record.
        let mut acquired = candidate;
        for other in mergers.drain(..) {
            let Some(merged) = acquired.merge_with(&other) else {
                continue;
            };
            state.remove_lock(&other);
            acquired = merged;
        }

        let acquired = Arc::new(acquired);
        state.index.insert(Arc::clone(&acquired));
        state
            .owned
            .entry(owner.id())
            .or_default()
            .push(Arc::clone(&acquired));
        // An interrupt that lost the race to admission is dropped.
        state.interrupts.remove(&owner.id());
        trace!(owner = %owner.id(), range = ?acquired.range(), write, "lock acquired");
        Ok(LockResult::Success)
    }

    /// Releases every lock held by `owner` and wakes all waiters.
    ///
    /// Returns [`LockResult::HoldTimeoutExpired`] when the owner's locks
    /// were already force-released by the hold timeout; either way the
    /// manager keeps no state for the owner afterwards.
    pub fn release(&self, owner: &LockOwner) -> LockResult {
        let mut state = self.state.lock();
        state.interrupts.remove(&owner.id());
        if state.hold_deadlines.remove(&owner.id()) == Some(HoldState::Expired) {
            trace!(owner = %owner.id(), "release after hold timeout expiry");
            return LockResult::HoldTimeoutExpired;
        }
        state.release_owner(owner.id(), &self.unlocked);
        LockResult::Success
    }

    /// Asks the owner's blocked [`lock`](Self::lock) call, if any, to give
    /// up and return [`LatchError::Interrupted`] instead of waiting on.
    ///
    /// The request is dropped if the call reaches admission first, and
    /// cleared by [`release`](Self::release).
    pub fn interrupt(&self, owner: &LockOwner) {
        let mut state = self.state.lock();
        state.interrupts.insert(owner.id());
        self.unlocked.notify_all();
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
