/*!
 * Pipe Manager
 * Pipe lifecycle with predictor-sized initial buffers
 */

use super::pipe::Pipe;
use super::types::{PipeEnds, PipeError, PipeStats};
use crate::core::limits::MAX_PIPES;
use crate::core::process::ProcessDirectory;
use crate::core::types::{Pid, Size};
use crate::memory::MemoryManager;
use crate::registry::HandleTable;
use crate::scoring::ScoringContext;
use crate::types::{ObjectKind, PipeId};
use log::info;
use std::sync::Arc;

/// Pipe manager
pub struct PipeManager {
    pipes: Arc<HandleTable<Arc<Pipe>>>,
    memory: MemoryManager,
    processes: ProcessDirectory,
    scoring: Arc<ScoringContext>,
}

impl PipeManager {
    pub fn new(
        memory: MemoryManager,
        processes: ProcessDirectory,
        scoring: Arc<ScoringContext>,
    ) -> Self {
        info!("Pipe manager initialized (capacity: {})", MAX_PIPES);
        Self {
            pipes: Arc::new(HandleTable::new(ObjectKind::Pipe, MAX_PIPES)),
            memory,
            processes,
            scoring,
        }
    }

    /// Create a pipe and return both endpoint descriptors.
    ///
    /// The initial buffer size comes from the scoring context's predictor:
    /// callers with large address-space footprints get larger buffers. The
    /// prediction only sizes the buffer, nothing else.
    pub fn create(&self, reader_pid: Pid, writer_pid: Pid) -> Result<PipeEnds, PipeError> {
        let footprint = self
            .processes
            .memory_footprint(reader_pid)
            .max(self.processes.memory_footprint(writer_pid));
        let capacity = self.scoring.predict_buffer_size(footprint);

        let address = self
            .memory
            .allocate(capacity, writer_pid)
            .map_err(|e| PipeError::AllocationFailed(e.to_string()))?;

        let pipe_id = self
            .pipes
            .insert_with(|id| Arc::new(Pipe::new(id, reader_pid, writer_pid, capacity, address)))
            .map_err(|_| {
                self.memory.deallocate(address);
                PipeError::LimitExceeded(format!("pipe table full ({})", MAX_PIPES))
            })?;

        info!(
            "Created pipe {} (reader: {}, writer: {}, predicted capacity: {} bytes)",
            pipe_id, reader_pid, writer_pid, capacity
        );
        Ok(PipeEnds::for_pipe(pipe_id))
    }

    /// Write to the pipe's write end
    pub fn write(&self, pipe_id: PipeId, pid: Pid, data: &[u8]) -> Result<Size, PipeError> {
        let pipe = self.lookup(pipe_id)?;
        if pipe.writer_pid != pid {
            return Err(PipeError::WrongEnd {
                id: pipe_id,
                pid,
                end: "write",
            });
        }
        pipe.write(data)
    }

    /// Read from the pipe's read end
    pub fn read(&self, pipe_id: PipeId, pid: Pid, size: Size) -> Result<Vec<u8>, PipeError> {
        let pipe = self.lookup(pipe_id)?;
        if pipe.reader_pid != pid {
            return Err(PipeError::WrongEnd {
                id: pipe_id,
                pid,
                end: "read",
            });
        }
        pipe.read(size)
    }

    /// Close a pipe endpoint; readers drain remaining bytes then see EOF
    pub fn close(&self, pipe_id: PipeId, pid: Pid) -> Result<(), PipeError> {
        let pipe = self.lookup(pipe_id)?;
        if pipe.reader_pid != pid && pipe.writer_pid != pid {
            return Err(PipeError::WrongEnd {
                id: pipe_id,
                pid,
                end: "either",
            });
        }

        pipe.close();
        info!("Closed pipe {} by PID {}", pipe_id, pid);
        Ok(())
    }

    /// Destroy a pipe, reclaiming its buffer
    pub fn destroy(&self, pipe_id: PipeId) -> Result<(), PipeError> {
        let pipe = self
            .pipes
            .remove(pipe_id)
            .map_err(|_| PipeError::NotFound(pipe_id))?;

        pipe.close();
        self.memory.deallocate(pipe.address);
        info!(
            "Destroyed pipe {} (reclaimed {} bytes)",
            pipe_id, pipe.capacity
        );
        Ok(())
    }

    /// Get pipe statistics
    pub fn stats(&self, pipe_id: PipeId) -> Result<PipeStats, PipeError> {
        let pipe = self.lookup(pipe_id)?;
        Ok(PipeStats {
            id: pipe.id,
            reader_pid: pipe.reader_pid,
            writer_pid: pipe.writer_pid,
            capacity: pipe.capacity,
            buffered: pipe.buffered(),
            flow_bytes: pipe.flow_bytes(),
            closed: pipe.is_closed(),
        })
    }

    /// Destroy every pipe a terminated process holds an end of
    pub fn cleanup_process(&self, pid: Pid) -> Size {
        let mut freed = 0;
        for pipe_id in self.pipes.ids() {
            let held = self
                .pipes
                .get(pipe_id)
                .map(|pipe| pipe.reader_pid == pid || pipe.writer_pid == pid)
                .unwrap_or(false);
            if held && self.destroy(pipe_id).is_ok() {
                freed += 1;
            }
        }

        if freed > 0 {
            info!("Cleaned up {} pipes for PID {}", freed, pid);
        }
        freed
    }

    fn lookup(&self, pipe_id: PipeId) -> Result<Arc<Pipe>, PipeError> {
        self.pipes.get(pipe_id).map_err(|_| PipeError::NotFound(pipe_id))
    }
}

impl crate::traits::PipeChannel for PipeManager {
    fn create(&self, reader_pid: Pid, writer_pid: Pid) -> crate::types::IpcResult<PipeEnds> {
        PipeManager::create(self, reader_pid, writer_pid).map_err(Into::into)
    }

    fn write(&self, pipe_id: PipeId, pid: Pid, data: &[u8]) -> crate::types::IpcResult<Size> {
        PipeManager::write(self, pipe_id, pid, data).map_err(Into::into)
    }

    fn read(&self, pipe_id: PipeId, pid: Pid, size: Size) -> crate::types::IpcResult<Vec<u8>> {
        PipeManager::read(self, pipe_id, pid, size).map_err(Into::into)
    }

    fn close(&self, pipe_id: PipeId, pid: Pid) -> crate::types::IpcResult<()> {
        PipeManager::close(self, pipe_id, pid).map_err(Into::into)
    }

    fn destroy(&self, pipe_id: PipeId) -> crate::types::IpcResult<()> {
        PipeManager::destroy(self, pipe_id).map_err(Into::into)
    }

    fn stats(&self, pipe_id: PipeId) -> crate::types::IpcResult<PipeStats> {
        PipeManager::stats(self, pipe_id).map_err(Into::into)
    }
}

impl Clone for PipeManager {
    fn clone(&self) -> Self {
        Self {
            pipes: Arc::clone(&self.pipes),
            memory: self.memory.clone(),
            processes: self.processes.clone(),
            scoring: Arc::clone(&self.scoring),
        }
    }
}
