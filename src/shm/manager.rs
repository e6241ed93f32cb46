/*!
 * Shared Memory Manager
 * Segment lifecycle, attach/detach reference counting, and access hints
 */

use super::segment::SharedSegment;
use super::types::{PredictionHint, ShmAttachment, ShmError, ShmStats};
use crate::core::limits::{MAX_SEGMENTS, MAX_SEGMENT_SIZE};
use crate::core::types::{Pid, Size};
use crate::memory::MemoryManager;
use crate::registry::HandleTable;
use crate::types::{ObjectKind, ShmId};
use log::info;
use std::sync::Arc;

/// Shared memory manager
///
/// # Performance
/// - Cache-line aligned for concurrent attach/detach traffic
#[repr(C, align(64))]
pub struct ShmManager {
    segments: Arc<HandleTable<Arc<SharedSegment>>>,
    memory: MemoryManager,
}

impl ShmManager {
    pub fn new(memory: MemoryManager) -> Self {
        info!(
            "Shared memory manager initialized (max segment: {} MB, capacity: {})",
            MAX_SEGMENT_SIZE / (1024 * 1024),
            MAX_SEGMENTS
        );
        Self {
            segments: Arc::new(HandleTable::new(ObjectKind::Shmem, MAX_SEGMENTS)),
            memory,
        }
    }

    /// Create a segment; the backing store is allocated immediately and the
    /// segment starts with no attachments
    pub fn create(&self, size: Size, owner_pid: Pid) -> Result<ShmId, ShmError> {
        if size == 0 {
            return Err(ShmError::InvalidSize("size cannot be zero".to_string()));
        }
        if size > MAX_SEGMENT_SIZE {
            return Err(ShmError::SizeExceeded {
                requested: size,
                max: MAX_SEGMENT_SIZE,
            });
        }

        let address = self
            .memory
            .allocate(size, owner_pid)
            .map_err(|e| ShmError::AllocationFailed(e.to_string()))?;

        let segment_id = self
            .segments
            .insert_with(|id| Arc::new(SharedSegment::new(id, size, owner_pid, address)))
            .map_err(|_| {
                self.memory.deallocate(address);
                ShmError::LimitExceeded(format!("segment table full ({})", MAX_SEGMENTS))
            })?;

        info!(
            "Created segment {} ({} bytes) for PID {} at 0x{:x}",
            segment_id, size, owner_pid, address
        );
        Ok(segment_id)
    }

    /// Attach to a segment, incrementing its reference count
    pub fn attach(&self, segment_id: ShmId, pid: Pid) -> Result<ShmAttachment, ShmError> {
        let segment = self.lookup(segment_id)?;
        segment.attach(pid)?;

        info!("PID {} attached to segment {}", pid, segment_id);
        Ok(ShmAttachment {
            id: segment.id,
            address: segment.address,
            size: segment.size,
        })
    }

    /// Detach from a segment.
    ///
    /// The final detach releases the backing store and the handle; detaching
    /// a segment with no attachments is an error, not a no-op.
    pub fn detach(&self, segment_id: ShmId, pid: Pid) -> Result<(), ShmError> {
        let segment = self.lookup(segment_id)?;
        let last = segment.detach(pid)?;

        if last {
            // The segment marked itself released under its own lock, so a
            // racing attach can no longer succeed
            let _ = self.segments.remove(segment_id);
            self.memory.deallocate(segment.address);
            info!(
                "Released segment {} ({} bytes reclaimed)",
                segment_id, segment.size
            );
        } else {
            info!("PID {} detached from segment {}", pid, segment_id);
        }
        Ok(())
    }

    /// Write into an attached segment, recording the access
    pub fn write(
        &self,
        segment_id: ShmId,
        pid: Pid,
        offset: Size,
        data: &[u8],
    ) -> Result<(), ShmError> {
        let segment = self.lookup(segment_id)?;
        if !segment.is_attached(pid) {
            return Err(ShmError::NotAttached {
                id: segment_id,
                pid,
            });
        }

        segment.record_access(offset, data.len())?;
        self.memory
            .write_bytes(segment.address, offset, data)
            .map_err(|e| ShmError::AllocationFailed(e.to_string()))?;
        Ok(())
    }

    /// Read from an attached segment, recording the access
    pub fn read(
        &self,
        segment_id: ShmId,
        pid: Pid,
        offset: Size,
        size: Size,
    ) -> Result<Vec<u8>, ShmError> {
        let segment = self.lookup(segment_id)?;
        if !segment.is_attached(pid) {
            return Err(ShmError::NotAttached {
                id: segment_id,
                pid,
            });
        }

        segment.record_access(offset, size)?;
        self.memory
            .read_bytes(segment.address, offset, size)
            .map_err(|e| ShmError::AllocationFailed(e.to_string()))
    }

    /// Advisory retention hint; callers such as cache-eviction policies act
    /// on it, this subsystem never does
    pub fn predict_access(&self, segment_id: ShmId) -> Result<PredictionHint, ShmError> {
        Ok(self.lookup(segment_id)?.predict())
    }

    /// Destroy a segment (owner only); refused while attachments exist
    pub fn destroy(&self, segment_id: ShmId, pid: Pid) -> Result<(), ShmError> {
        let segment = self.lookup(segment_id)?;
        if segment.owner_pid != pid {
            return Err(ShmError::NotAttached {
                id: segment_id,
                pid,
            });
        }

        {
            let mut inner = segment.inner.lock();
            if inner.ref_count > 0 {
                return Err(ShmError::Busy {
                    id: segment_id,
                    ref_count: inner.ref_count,
                });
            }
            inner.released = true;
        }

        let _ = self.segments.remove(segment_id);
        self.memory.deallocate(segment.address);
        info!("PID {} destroyed segment {}", pid, segment_id);
        Ok(())
    }

    /// Get segment statistics
    pub fn stats(&self, segment_id: ShmId) -> Result<ShmStats, ShmError> {
        let segment = self.lookup(segment_id)?;
        let inner = segment.inner.lock();
        let attached_pids: Vec<Pid> = inner.attachments.keys().copied().collect();
        let ref_count = inner.ref_count;
        let heatmap_sum: u32 = inner.heatmap.iter().sum();
        drop(inner);

        Ok(ShmStats {
            id: segment.id,
            size: segment.size,
            owner_pid: segment.owner_pid,
            ref_count,
            attached_pids,
            heatmap_sum,
            hint: segment.predict(),
        })
    }

    /// Drop every attachment a terminated process holds; segments it was the
    /// last reference to are released. Returns segments fully released.
    pub fn cleanup_process(&self, pid: Pid) -> Size {
        let mut released = 0;
        for segment_id in self.segments.ids() {
            // Drop every attachment the pid still holds
            while self.detach(segment_id, pid).is_ok() {
                if !self.segments.contains(segment_id) {
                    released += 1;
                    break;
                }
            }
            // Segments it owns but never attached go too; attached ones are
            // left for their remaining holders
            if self.destroy(segment_id, pid).is_ok() {
                released += 1;
            }
        }

        if released > 0 {
            info!("Cleaned up {} segments for PID {}", released, pid);
        }
        released
    }

    fn lookup(&self, segment_id: ShmId) -> Result<Arc<SharedSegment>, ShmError> {
        self.segments
            .get(segment_id)
            .map_err(|_| ShmError::NotFound(segment_id))
    }
}

impl crate::traits::SharedMemory for ShmManager {
    fn create(&self, size: Size, owner: Pid) -> crate::types::IpcResult<ShmId> {
        ShmManager::create(self, size, owner).map_err(Into::into)
    }

    fn attach(&self, segment_id: ShmId, pid: Pid) -> crate::types::IpcResult<ShmAttachment> {
        ShmManager::attach(self, segment_id, pid).map_err(Into::into)
    }

    fn detach(&self, segment_id: ShmId, pid: Pid) -> crate::types::IpcResult<()> {
        ShmManager::detach(self, segment_id, pid).map_err(Into::into)
    }

    fn write(
        &self,
        segment_id: ShmId,
        pid: Pid,
        offset: Size,
        data: &[u8],
    ) -> crate::types::IpcResult<()> {
        ShmManager::write(self, segment_id, pid, offset, data).map_err(Into::into)
    }

    fn read(
        &self,
        segment_id: ShmId,
        pid: Pid,
        offset: Size,
        size: Size,
    ) -> crate::types::IpcResult<Vec<u8>> {
        ShmManager::read(self, segment_id, pid, offset, size).map_err(Into::into)
    }

    fn predict_access(&self, segment_id: ShmId) -> crate::types::IpcResult<PredictionHint> {
        ShmManager::predict_access(self, segment_id).map_err(Into::into)
    }

    fn stats(&self, segment_id: ShmId) -> crate::types::IpcResult<ShmStats> {
        ShmManager::stats(self, segment_id).map_err(Into::into)
    }
}

impl Clone for ShmManager {
    fn clone(&self) -> Self {
        Self {
            segments: Arc::clone(&self.segments),
            memory: self.memory.clone(),
        }
    }
}
