use bytes::Bytes;

use crate::key::PrettyBytes;

/// Failures a lock call can surface out of band, distinct from the normal
/// [`LockResult`] outcomes.
///
/// [`LockResult`]: crate::LockResult
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum LatchError {
    /// The requested range runs backwards. The manager's state is unchanged.
    #[display(
        "invalid key range: min {:?} lies beyond max {:?}",
        PrettyBytes(min.as_ref()),
        PrettyBytes(max.as_ref())
    )]
    InvalidRange { min: Bytes, max: Bytes },

    /// The wait was aborted from outside before the range became free.
    /// The candidate lock was never inserted.
    #[display("lock wait interrupted")]
    Interrupted,
}
