//! # Latch
//!
//! A range lock manager for ordered byte-keyed key/value stores. Many
//! threads share one store; before reading a key range a transaction takes a
//! shared lock on it, before writing an exclusive one, and transactions that
//! follow the protocol come out serializable. The manager arbitrates
//! ownership only; it never reads or writes the store itself.
//!
//! Read locks on a range can overlap freely; a write lock excludes every
//! other owner. All locks taken under one [`LockOwner`] stay in force until
//! a single [`release`](LockManager::release) drops them together, and locks
//! of the same owner on touching ranges collapse into one record, so a
//! contiguous scan taken piecewise stays cheap to track.
//!
//! Two timeouts guard liveness: the per-call wait timeout passed to
//! [`lock`](LockManager::lock), and the per-owner
//! [hold timeout](LockManager::set_hold_timeout) that force-releases owners
//! sitting on contested locks.
//!
//! ```
//! use std::time::Duration;
//!
//! use bytes::Bytes;
//! use latch::{LockManager, LockOwner, LockResult};
//!
//! let manager = LockManager::new();
//! let owner = LockOwner::new();
//!
//! let result = manager
//!     .lock(
//!         &owner,
//!         Some(Bytes::from_static(b"a")),
//!         Some(Bytes::from_static(b"m")),
//!         true,
//!         Duration::ZERO, // wait as long as it takes
//!     )
//!     .unwrap();
//! assert_eq!(result, LockResult::Success);
//!
//! // ... read and write keys in ["a", "m") ...
//!
//! assert_eq!(manager.release(&owner), LockResult::Success);
//! ```

#[macro_use]
extern crate derive_more;
#[macro_use]
extern crate tracing;

mod errors;
mod index;
mod key;
mod lock;
mod manager;
mod owner;

pub use errors::LatchError;
pub use key::{next_key, successor, KeyRange};
pub use manager::{LockManager, LockResult};
pub use owner::{LockOwner, OwnerId};
