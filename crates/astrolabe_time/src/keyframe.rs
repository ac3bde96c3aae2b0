use astrolabe_core::errors::{AstrolabeError, Result};

/// A payload scheduled at an application (wall) timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    pub timestamp: f64,
    pub data: T,
}

impl<T> Keyframe<T> {
    #[must_use]
    pub fn new(timestamp: f64, data: T) -> Self {
        Self { timestamp, data }
    }
}

/// An ordered sequence of keyframes indexed by application time.
///
/// Timestamps are unique and kept sorted ascending. Insertion keeps the order;
/// inserting at an occupied timestamp is rejected rather than replacing, since
/// two anchors at the same instant would make interpolation degenerate.
#[derive(Debug, Clone)]
pub struct Timeline<T> {
    keyframes: Vec<Keyframe<T>>,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Timeline<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            keyframes: Vec::new(),
        }
    }

    /// Inserts a keyframe, keeping the timeline sorted.
    pub fn add_keyframe(&mut self, timestamp: f64, data: T) -> Result<()> {
        if !timestamp.is_finite() {
            return Err(AstrolabeError::NonFiniteKeyframe(timestamp));
        }

        // partition_point finds the first index where t > timestamp
        let index = self.keyframes.partition_point(|k| k.timestamp <= timestamp);
        if index > 0 && self.keyframes[index - 1].timestamp == timestamp {
            return Err(AstrolabeError::DuplicateKeyframe(timestamp));
        }

        self.keyframes.insert(index, Keyframe::new(timestamp, data));
        Ok(())
    }

    /// Removes every keyframe before `timestamp`; with `inclusive` a keyframe
    /// exactly at `timestamp` is removed as well.
    pub fn remove_keyframes_before(&mut self, timestamp: f64, inclusive: bool) {
        let cut = if inclusive {
            self.keyframes.partition_point(|k| k.timestamp <= timestamp)
        } else {
            self.keyframes.partition_point(|k| k.timestamp < timestamp)
        };
        self.keyframes.drain(..cut);
    }

    /// Removes every keyframe after `timestamp`; with `inclusive` a keyframe
    /// exactly at `timestamp` is removed as well.
    pub fn remove_keyframes_after(&mut self, timestamp: f64, inclusive: bool) {
        let keep = if inclusive {
            self.keyframes.partition_point(|k| k.timestamp < timestamp)
        } else {
            self.keyframes.partition_point(|k| k.timestamp <= timestamp)
        };
        self.keyframes.truncate(keep);
    }

    pub fn clear_keyframes(&mut self) {
        self.keyframes.clear();
    }

    #[inline]
    #[must_use]
    pub fn keyframes(&self) -> &[Keyframe<T>] {
        &self.keyframes
    }

    #[inline]
    #[must_use]
    pub fn n_keyframes(&self) -> usize {
        self.keyframes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Index of the first keyframe strictly after `now`.
    ///
    /// Everything before the returned index is in the past relative to `now`;
    /// the index equals [`n_keyframes`](Self::n_keyframes) when no keyframe
    /// lies in the future.
    #[inline]
    #[must_use]
    pub fn first_future_index(&self, now: f64) -> usize {
        self.keyframes.partition_point(|k| k.timestamp <= now)
    }

    #[must_use]
    pub fn first_keyframe_after(&self, timestamp: f64, inclusive: bool) -> Option<&Keyframe<T>> {
        let index = if inclusive {
            self.keyframes.partition_point(|k| k.timestamp < timestamp)
        } else {
            self.keyframes.partition_point(|k| k.timestamp <= timestamp)
        };
        self.keyframes.get(index)
    }

    #[must_use]
    pub fn last_keyframe_before(&self, timestamp: f64, inclusive: bool) -> Option<&Keyframe<T>> {
        let index = if inclusive {
            self.keyframes.partition_point(|k| k.timestamp <= timestamp)
        } else {
            self.keyframes.partition_point(|k| k.timestamp < timestamp)
        };
        index.checked_sub(1).map(|i| &self.keyframes[i])
    }
}
