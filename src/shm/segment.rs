/*!
 * Shared Memory Segment
 * Per-segment state: attachment counts and the rolling access heatmap
 */

use super::types::{PredictionHint, ShmError};
use crate::core::limits::{HEATMAP_BUCKETS, HEATMAP_DECAY_INTERVAL, HEATMAP_RETAIN_THRESHOLD};
use crate::core::types::{Address, Pid, Size};
use crate::types::ShmId;
use parking_lot::Mutex;
use std::collections::HashMap;

pub(super) struct SegmentInner {
    /// Total live attachments; the backing store is released on the 1 -> 0
    /// detach transition and never while attached
    pub ref_count: Size,
    /// Attachment count per pid, for stats and process cleanup
    pub attachments: HashMap<Pid, Size>,
    /// Rolling histogram of recent access offsets
    pub heatmap: [u32; HEATMAP_BUCKETS],
    accesses: u64,
    /// Set once the final detach has released the backing store; a released
    /// segment refuses late attaches racing its removal
    pub released: bool,
}

/// One shared memory segment; mutable state behind the per-object lock
pub(super) struct SharedSegment {
    pub id: ShmId,
    pub size: Size,
    pub address: Address,
    pub owner_pid: Pid,
    pub inner: Mutex<SegmentInner>,
}

impl SharedSegment {
    pub fn new(id: ShmId, size: Size, owner_pid: Pid, address: Address) -> Self {
        Self {
            id,
            size,
            address,
            owner_pid,
            inner: Mutex::new(SegmentInner {
                ref_count: 0,
                attachments: HashMap::new(),
                heatmap: [0; HEATMAP_BUCKETS],
                accesses: 0,
                released: false,
            }),
        }
    }

    pub fn attach(&self, pid: Pid) -> Result<(), ShmError> {
        let mut inner = self.inner.lock();
        if inner.released {
            return Err(ShmError::NotFound(self.id));
        }
        inner.ref_count += 1;
        *inner.attachments.entry(pid).or_insert(0) += 1;
        Ok(())
    }

    /// Decrement the reference count; returns true when this was the final
    /// detach and the caller must release the backing store
    pub fn detach(&self, pid: Pid) -> Result<bool, ShmError> {
        let mut inner = self.inner.lock();

        let held = inner.attachments.get(&pid).copied().unwrap_or(0);
        if held == 0 || inner.ref_count == 0 {
            return Err(ShmError::NotAttached { id: self.id, pid });
        }

        if held == 1 {
            inner.attachments.remove(&pid);
        } else {
            inner.attachments.insert(pid, held - 1);
        }
        inner.ref_count -= 1;

        if inner.ref_count == 0 {
            inner.released = true;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn is_attached(&self, pid: Pid) -> bool {
        self.inner
            .lock()
            .attachments
            .get(&pid)
            .map(|count| *count > 0)
            .unwrap_or(false)
    }

    /// Validate an access range and record it into the heatmap
    pub fn record_access(&self, offset: Size, len: Size) -> Result<(), ShmError> {
        if offset.checked_add(len).map_or(true, |end| end > self.size) {
            return Err(ShmError::InvalidRange {
                offset,
                len,
                segment_size: self.size,
            });
        }

        let mut inner = self.inner.lock();
        let bucket = if self.size == 0 {
            0
        } else {
            (offset * HEATMAP_BUCKETS / self.size).min(HEATMAP_BUCKETS - 1)
        };
        inner.heatmap[bucket] = inner.heatmap[bucket].saturating_add(1);

        inner.accesses += 1;
        if inner.accesses % HEATMAP_DECAY_INTERVAL == 0 {
            for count in inner.heatmap.iter_mut() {
                *count /= 2;
            }
        }
        Ok(())
    }

    /// Advisory retention hint from the heatmap sum
    pub fn predict(&self) -> PredictionHint {
        if self.heatmap_sum() > HEATMAP_RETAIN_THRESHOLD {
            PredictionHint::Retain
        } else {
            PredictionHint::Evict
        }
    }

    pub fn heatmap_sum(&self) -> u32 {
        self.inner.lock().heatmap.iter().sum()
    }
}
