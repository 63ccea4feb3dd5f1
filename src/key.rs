//! Byte-key ordering utilities and the half-open [`KeyRange`] type.
//!
//! Keys order lexicographically, byte by byte. A range endpoint may be
//! absent, in which case it reaches below the empty key or beyond every key;
//! the helpers here centralize that endpoint arithmetic so the rest of the
//! crate never has to reason about `None` cases directly.

use std::cmp::Ordering;
use std::fmt;

use bytes::Bytes;

use crate::errors::LatchError;

/// Returns the smallest key that sorts strictly after `key`.
///
/// Appending a zero byte is sufficient: no key fits between `key` and
/// `key + "\0"` in lexicographic order. This turns strict comparisons
/// against an endpoint into inclusive sentinels for ordered-set slicing.
pub fn next_key(key: &[u8]) -> Bytes {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.extend_from_slice(key);
    next.push(0x00);
    Bytes::from(next)
}

/// Returns the smallest key that sorts after every key starting with
/// `prefix`, or `None` when no such key exists (empty or all-`0xFF` prefix).
pub fn successor(prefix: &[u8]) -> Option<Bytes> {
    let mut succ = prefix.to_vec();
    while let Some(last) = succ.pop() {
        if last < 0xFF {
            succ.push(last + 1);
            return Some(Bytes::from(succ));
        }
        // 0xFF stays dropped; the increment carries into the byte before it
    }
    None
}

/// Orders two lower endpoints; an absent endpoint sits below every key.
pub(crate) fn min_cmp(a: Option<&Bytes>, b: Option<&Bytes>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

/// Orders two upper endpoints; an absent endpoint sits above every key.
pub(crate) fn max_cmp(a: Option<&Bytes>, b: Option<&Bytes>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

/// Orders a lower endpoint against an upper endpoint. When either side is
/// absent there is always key space between them.
pub(crate) fn min_vs_max(min: Option<&Bytes>, max: Option<&Bytes>) -> Ordering {
    match (min, max) {
        (Some(min), Some(max)) => min.cmp(max),
        _ => Ordering::Less,
    }
}

/// # Key Range
///
/// A half-open range `[min, max)` over byte keys: inclusive at `min`,
/// exclusive at `max`. Either endpoint may be absent, meaning the range is
/// unbounded on that side. When both endpoints are present, construction
/// enforces `min <= max`; equal endpoints form a legal range containing no
/// keys at all.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyRange {
    min: Option<Bytes>,
    max: Option<Bytes>,
}

impl KeyRange {
    /// The range covering every key.
    pub const UNBOUNDED: Self = Self {
        min: None,
        max: None,
    };

    /// Builds a range from its endpoints, rejecting a `min` beyond `max`.
    pub fn new(min: Option<Bytes>, max: Option<Bytes>) -> Result<Self, LatchError> {
        if let (Some(min_key), Some(max_key)) = (&min, &max) {
            if min_key > max_key {
                return Err(LatchError::InvalidRange {
                    min: min_key.clone(),
                    max: max_key.clone(),
                });
            }
        }
        Ok(Self { min, max })
    }

    /// The range covering exactly the keys that start with `prefix`.
    pub fn for_prefix(prefix: &[u8]) -> Self {
        Self {
            min: Some(Bytes::copy_from_slice(prefix)),
            max: successor(prefix),
        }
    }

    /// Lower endpoint, inclusive; `None` when unbounded below.
    #[inline]
    pub fn min(&self) -> Option<&Bytes> {
        self.min.as_ref()
    }

    /// Upper endpoint, exclusive; `None` when unbounded above.
    #[inline]
    pub fn max(&self) -> Option<&Bytes> {
        self.max.as_ref()
    }

    /// Whether the range contains no keys at all.
    pub fn is_empty(&self) -> bool {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => min == max,
            _ => false,
        }
    }

    /// Whether `key` falls inside the range.
    pub fn contains(&self, key: &[u8]) -> bool {
        if let Some(min) = &self.min {
            if key < min.as_ref() {
                return false;
            }
        }
        if let Some(max) = &self.max {
            if key >= max.as_ref() {
                return false;
            }
        }
        true
    }

    /// Whether the two ranges share at least one key. An empty range shares
    /// keys with nothing, itself included.
    pub fn overlaps(&self, other: &KeyRange) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        min_vs_max(self.min.as_ref(), other.max.as_ref()) == Ordering::Less
            && min_vs_max(other.min.as_ref(), self.max.as_ref()) == Ordering::Less
    }

    /// Whether the two ranges overlap or meet at an endpoint, i.e. whether
    /// their union is itself one contiguous range.
    pub fn touches(&self, other: &KeyRange) -> bool {
        min_vs_max(self.min.as_ref(), other.max.as_ref()) != Ordering::Greater
            && min_vs_max(other.min.as_ref(), self.max.as_ref()) != Ordering::Greater
    }

    /// The smallest range covering both inputs. Only meaningful when the
    /// inputs [touch](Self::touches); otherwise the result also spans the
    /// gap between them.
    pub fn union(&self, other: &KeyRange) -> KeyRange {
        let min = match min_cmp(self.min.as_ref(), other.min.as_ref()) {
            Ordering::Greater => other.min.clone(),
            _ => self.min.clone(),
        };
        let max = match max_cmp(self.max.as_ref(), other.max.as_ref()) {
            Ordering::Less => other.max.clone(),
            _ => self.max.clone(),
        };
        KeyRange { min, max }
    }
}

impl fmt::Debug for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.min {
            Some(min) => write!(f, "[{:?}, ", PrettyBytes(min))?,
            None => write!(f, "[-inf, ")?,
        }
        match &self.max {
            Some(max) => write!(f, "{:?})", PrettyBytes(max)),
            None => write!(f, "+inf)"),
        }
    }
}

/// Renders a byte key with printable ASCII as-is and everything else as
/// `\xNN` escapes.
pub(crate) struct PrettyBytes<'a>(pub(crate) &'a [u8]);

impl fmt::Debug for PrettyBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b\"")?;
        for &byte in self.0 {
            match byte {
                b' '..=b'~' => write!(f, "{}", byte as char)?,
                _ => write!(f, "\\x{byte:02x}")?,
            }
        }
        write!(f, "\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: Option<&[u8]>, max: Option<&[u8]>) -> KeyRange {
        KeyRange::new(
            min.map(Bytes::copy_from_slice),
            max.map(Bytes::copy_from_slice),
        )
        .expect("test ranges should be well formed")
    }

    #[test]
    fn test_next_key_is_immediate_successor() {
        assert_eq!(next_key(b"ab"), Bytes::from_static(b"ab\x00"));
        assert_eq!(next_key(b""), Bytes::from_static(b"\x00"));

        // Strictly greater, and no shorter key can sit in between.
        let key = Bytes::from_static(b"\x01\xff");
        let next = next_key(&key);
        assert!(next > key);
        assert!(next.starts_with(&key));
    }

    #[test]
    fn test_successor_carries_through_trailing_ff() {
        assert_eq!(successor(&[1, 2, 3]), Some(Bytes::from_static(b"\x01\x02\x04")));
        assert_eq!(successor(&[1, 0]), Some(Bytes::from_static(b"\x01\x01")));
        assert_eq!(successor(&[1, 2, 0xFF]), Some(Bytes::from_static(b"\x01\x03")));
        assert_eq!(successor(&[1, 0xFF, 0xFF]), Some(Bytes::from_static(b"\x02")));
        assert_eq!(successor(&[0xFF, 0xFF]), None);
        assert_eq!(successor(&[]), None);
    }

    #[test]
    fn test_for_prefix_covers_exactly_the_prefixed_keys() {
        let prefixed = KeyRange::for_prefix(b"ab");
        assert!(prefixed.contains(b"ab"));
        assert!(prefixed.contains(b"ab\x00"));
        assert!(prefixed.contains(b"ab\xff\xff"));
        assert!(!prefixed.contains(b"aa\xff"));
        assert!(!prefixed.contains(b"ac"));

        // A ceiling prefix has no successor, so the range runs to the top.
        let ceiling = KeyRange::for_prefix(&[0xFF]);
        assert_eq!(ceiling.max(), None);
        assert!(ceiling.contains(&[0xFF, 1, 2]));
    }

    #[test]
    fn test_new_rejects_inverted_endpoints() {
        let err = KeyRange::new(
            Some(Bytes::from_static(b"\x09")),
            Some(Bytes::from_static(b"\x01")),
        )
        .unwrap_err();
        assert!(matches!(err, LatchError::InvalidRange { .. }));

        // Equal endpoints are legal; the range is just empty.
        let empty = range(Some(b"\x05"), Some(b"\x05"));
        assert!(empty.is_empty());
        assert!(!empty.contains(b"\x05"));
    }

    #[test]
    fn test_overlaps() {
        let low = range(Some(b"\x01"), Some(b"\x05"));
        let mid = range(Some(b"\x03"), Some(b"\x07"));
        let high = range(Some(b"\x05"), Some(b"\x09"));

        assert!(low.overlaps(&mid));
        assert!(mid.overlaps(&low));
        // Half-open: sharing an endpoint is not sharing a key.
        assert!(!low.overlaps(&high));
        assert!(!high.overlaps(&low));

        assert!(KeyRange::UNBOUNDED.overlaps(&low));
        assert!(low.overlaps(&KeyRange::UNBOUNDED));
        assert!(KeyRange::UNBOUNDED.overlaps(&KeyRange::UNBOUNDED));

        let below = range(None, Some(b"\x03"));
        let above = range(Some(b"\x03"), None);
        assert!(!below.overlaps(&above));
        assert!(below.overlaps(&low));
        assert!(above.overlaps(&high));
    }

    #[test]
    fn test_empty_range_overlaps_nothing() {
        let empty = range(Some(b"\x05"), Some(b"\x05"));
        let around = range(Some(b"\x03"), Some(b"\x07"));

        assert!(!empty.overlaps(&around));
        assert!(!around.overlaps(&empty));
        assert!(!empty.overlaps(&KeyRange::UNBOUNDED));
        assert!(!empty.overlaps(&empty));
    }

    #[test]
    fn test_touches_includes_adjacency() {
        let low = range(Some(b"\x01"), Some(b"\x05"));
        let high = range(Some(b"\x05"), Some(b"\x09"));
        let far = range(Some(b"\x06"), Some(b"\x09"));

        assert!(low.touches(&high));
        assert!(high.touches(&low));
        assert!(!low.touches(&far));

        // An empty range still touches ranges meeting its position.
        let empty = range(Some(b"\x05"), Some(b"\x05"));
        assert!(empty.touches(&low));
        assert!(empty.touches(&high));
        assert!(!empty.touches(&far));
    }

    #[test]
    fn test_union_spans_both_inputs() {
        let low = range(Some(b"\x01"), Some(b"\x05"));
        let high = range(Some(b"\x05"), Some(b"\x09"));
        assert_eq!(low.union(&high), range(Some(b"\x01"), Some(b"\x09")));

        // An unbounded endpoint absorbs the bounded one.
        let below = range(None, Some(b"\x03"));
        assert_eq!(low.union(&below), range(None, Some(b"\x05")));
        assert_eq!(low.union(&KeyRange::UNBOUNDED), KeyRange::UNBOUNDED);
    }

    #[test]
    fn test_debug_rendering() {
        let bounded = range(Some(b"ab"), Some(b"\x01\x02"));
        assert_eq!(format!("{:?}", bounded), "[b\"ab\", b\"\\x01\\x02\")");
        assert_eq!(format!("{:?}", KeyRange::UNBOUNDED), "[-inf, +inf)");
    }
}
