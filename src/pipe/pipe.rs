/*!
 * Pipe Implementation
 * Core pipe object over a ringbuf-backed circular buffer
 */

use super::types::PipeError;
use crate::core::types::{Address, Pid, Size};
use crate::types::PipeId;
use parking_lot::Mutex;
use ringbuf::{traits::*, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// One pipe; byte-channel mechanics are the ring buffer's, this object only
/// adds end ownership, the close flag, and the flow counter
pub(super) struct Pipe {
    pub id: PipeId,
    pub reader_pid: Pid,
    pub writer_pid: Pid,
    /// Accounting address of the buffer allocation
    pub address: Address,
    pub capacity: Size,
    buffer: Mutex<HeapRb<u8>>,
    closed: AtomicBool,
    flow: AtomicU64,
}

impl Pipe {
    pub fn new(
        id: PipeId,
        reader_pid: Pid,
        writer_pid: Pid,
        capacity: Size,
        address: Address,
    ) -> Self {
        Self {
            id,
            reader_pid,
            writer_pid,
            address,
            capacity,
            buffer: Mutex::new(HeapRb::new(capacity)),
            closed: AtomicBool::new(false),
            flow: AtomicU64::new(0),
        }
    }

    /// Write as many bytes as fit; zero space is backpressure, not a wait
    pub fn write(&self, data: &[u8]) -> Result<Size, PipeError> {
        if self.is_closed() {
            return Err(PipeError::Closed(self.id));
        }

        let mut buffer = self.buffer.lock();
        if buffer.vacant_len() == 0 {
            return Err(PipeError::Full(self.id));
        }

        let written = buffer.push_slice(data);
        self.flow.fetch_add(written as u64, Ordering::Relaxed);
        Ok(written)
    }

    /// Read up to `size` bytes; an empty read on a closed pipe is EOF
    pub fn read(&self, size: Size) -> Result<Vec<u8>, PipeError> {
        let mut buffer = self.buffer.lock();

        if buffer.is_empty() {
            if self.is_closed() {
                return Ok(Vec::new()); // EOF
            }
            return Err(PipeError::Empty(self.id));
        }

        let mut data = vec![0u8; size.min(buffer.occupied_len())];
        let read = buffer.pop_slice(&mut data);
        data.truncate(read);
        Ok(data)
    }

    pub fn buffered(&self) -> Size {
        self.buffer.lock().occupied_len()
    }

    pub fn flow_bytes(&self) -> u64 {
        self.flow.load(Ordering::Relaxed)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
