/*!
 * Memory Manager
 * Simulated address space backing message payloads, segments, and pipe
 * buffers, with per-owner tracking and a global usage counter
 */

use crate::core::limits::DEFAULT_MEMORY_POOL;
use crate::core::types::{Address, Pid, Size};
use ahash::RandomState;
use dashmap::DashMap;
use log::debug;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Memory operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: Size, available: Size },

    #[error("invalid address: 0x{0:x}")]
    InvalidAddress(Address),

    #[error("access out of range: offset {offset}, len {len}, region size {region_size}")]
    OutOfRange {
        offset: Size,
        len: Size,
        region_size: Size,
    },
}

struct Region {
    owner: Pid,
    data: RwLock<Vec<u8>>,
}

/// Memory manager
///
/// Addresses are simulated: each allocation claims a unique range in a flat
/// counter-driven address space and owns a zeroed byte region. All IPC
/// backing stores flow through here so the facade can report one usage
/// figure.
pub struct MemoryManager {
    regions: Arc<DashMap<Address, Region, RandomState>>,
    next_address: Arc<AtomicUsize>,
    used: Arc<AtomicUsize>,
    capacity: Size,
}

impl MemoryManager {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_POOL)
    }

    pub fn with_capacity(capacity: Size) -> Self {
        Self {
            regions: Arc::new(DashMap::with_hasher(RandomState::new())),
            // Address 0 stays unused so it can never alias a live region
            next_address: Arc::new(AtomicUsize::new(64)),
            used: Arc::new(AtomicUsize::new(0)),
            capacity,
        }
    }

    /// Allocate a zeroed region, tracked against `owner`
    pub fn allocate(&self, size: Size, owner: Pid) -> Result<Address, MemoryError> {
        let used = self.used.load(Ordering::Acquire);
        if used + size > self.capacity {
            return Err(MemoryError::OutOfMemory {
                requested: size,
                available: self.capacity - used,
            });
        }

        // Keep regions cache-line separated in the simulated space
        let span = size.max(1).next_multiple_of(64);
        let address = self.next_address.fetch_add(span, Ordering::SeqCst);

        self.regions.insert(
            address,
            Region {
                owner,
                data: RwLock::new(vec![0u8; size]),
            },
        );
        self.used.fetch_add(size, Ordering::Release);

        Ok(address)
    }

    /// Untrack and free a region.
    ///
    /// Idempotent: untracking an address that is not (or no longer) tracked
    /// is a logged no-op, so release paths that race teardown never
    /// double-free.
    pub fn deallocate(&self, address: Address) {
        match self.regions.remove(&address) {
            Some((_, region)) => {
                let size = region.data.read().len();
                self.used.fetch_sub(size, Ordering::Release);
            }
            None => {
                debug!("Untrack of unknown address 0x{:x} ignored", address);
            }
        }
    }

    /// Write into a tracked region at `offset`
    pub fn write_bytes(
        &self,
        address: Address,
        offset: Size,
        data: &[u8],
    ) -> Result<(), MemoryError> {
        let region = self
            .regions
            .get(&address)
            .ok_or(MemoryError::InvalidAddress(address))?;

        let mut bytes = region.data.write();
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= bytes.len())
            .ok_or(MemoryError::OutOfRange {
                offset,
                len: data.len(),
                region_size: bytes.len(),
            })?;

        bytes[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Read from a tracked region at `offset`
    pub fn read_bytes(
        &self,
        address: Address,
        offset: Size,
        len: Size,
    ) -> Result<Vec<u8>, MemoryError> {
        let region = self
            .regions
            .get(&address)
            .ok_or(MemoryError::InvalidAddress(address))?;

        let bytes = region.data.read();
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= bytes.len())
            .ok_or(MemoryError::OutOfRange {
                offset,
                len,
                region_size: bytes.len(),
            })?;

        Ok(bytes[offset..end].to_vec())
    }

    /// Free every region tracked against `pid`; returns regions freed
    pub fn cleanup_process(&self, pid: Pid) -> Size {
        let addresses: Vec<Address> = self
            .regions
            .iter()
            .filter(|entry| entry.value().owner == pid)
            .map(|entry| *entry.key())
            .collect();

        let count = addresses.len();
        for address in addresses {
            self.deallocate(address);
        }
        count
    }

    /// (capacity, used, available) in bytes
    #[must_use]
    pub fn info(&self) -> (Size, Size, Size) {
        let used = self.used.load(Ordering::Relaxed);
        (self.capacity, used, self.capacity.saturating_sub(used))
    }
}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryManager {
    fn clone(&self) -> Self {
        Self {
            regions: Arc::clone(&self.regions),
            next_address: Arc::clone(&self.next_address),
            used: Arc::clone(&self.used),
            capacity: self.capacity,
        }
    }
}
