/*!
 * Handle Table
 *
 * Generic registry table: a sharded map arena plus a lock-free free-list of
 * recycled handles. Allocation and release are O(1); handles stay low and
 * stable because released ids are reused before the counter advances.
 * Table locks are held only for the slot insert/lookup itself; object state
 * lives behind each object's own lock.
 */

use crate::types::{IpcError, IpcResult, ObjectKind};
use ahash::RandomState;
use crossbeam_queue::SegQueue;
use dashmap::DashMap;
use log::info;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

// Diagnostic counter across every table: successful allocations only
static ALLOCATION_OPS: AtomicU64 = AtomicU64::new(0);

/// Total successful slot allocations since startup, for diagnostics
#[must_use]
pub fn allocation_ops() -> u64 {
    ALLOCATION_OPS.load(Ordering::Relaxed)
}

/// Generic handle table for one object kind
pub struct HandleTable<T> {
    kind: ObjectKind,
    entries: DashMap<u32, T, RandomState>,
    next_id: AtomicU32,
    free_ids: SegQueue<u32>,
    capacity: usize,
}

impl<T> HandleTable<T> {
    pub fn new(kind: ObjectKind, capacity: usize) -> Self {
        Self {
            kind,
            entries: DashMap::with_hasher(RandomState::new()),
            next_id: AtomicU32::new(1),
            free_ids: SegQueue::new(),
            capacity,
        }
    }

    /// Allocate a slot and build the object from its handle
    pub fn insert_with(&self, build: impl FnOnce(u32) -> T) -> IpcResult<u32> {
        if self.entries.len() >= self.capacity {
            return Err(IpcError::ResourceExhausted(format!(
                "{} table full: {}/{}",
                self.kind.as_str(),
                self.entries.len(),
                self.capacity
            )));
        }

        let id = if let Some(recycled) = self.free_ids.pop() {
            info!("Recycled {} handle {}", self.kind.as_str(), recycled);
            recycled
        } else {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        };

        self.entries.insert(id, build(id));
        ALLOCATION_OPS.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    /// Remove a slot, recycling the handle
    pub fn remove(&self, id: u32) -> IpcResult<T> {
        let (_, value) = self.entries.remove(&id).ok_or_else(|| self.bad_handle(id))?;
        self.free_ids.push(id);
        Ok(value)
    }

    /// Look up a slot, cloning the stored reference
    pub fn get(&self, id: u32) -> IpcResult<T>
    where
        T: Clone,
    {
        self.entries
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| self.bad_handle(id))
    }

    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of live handles, for cleanup sweeps
    #[must_use]
    pub fn ids(&self) -> Vec<u32> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }

    fn bad_handle(&self, id: u32) -> IpcError {
        IpcError::InvalidHandle(format!("{} {} not found", self.kind.as_str(), id))
    }
}
