/*!
 * IPC Manager
 * Unified facade wiring the scoring context and the five object managers
 */

use crate::core::process::ProcessDirectory;
use crate::core::types::{Pid, Size};
use crate::memory::MemoryManager;
use crate::notify::NotifyManager;
use crate::pipe::PipeManager;
use crate::queue::QueueManager;
use crate::scoring::{ScoringContext, ScoringSnapshot};
use crate::sem::SemManager;
use crate::shm::ShmManager;
use crate::traits::IpcCleanup;
use log::info;
use std::sync::Arc;

/// Unified IPC manager
///
/// Tables and the scoring context are process-wide singletons with
/// subsystem lifetime; clones share all underlying state.
pub struct IpcManager {
    memory: MemoryManager,
    processes: ProcessDirectory,
    scoring: Arc<ScoringContext>,
    queues: QueueManager,
    shm: ShmManager,
    semaphores: SemManager,
    pipes: PipeManager,
    notify: NotifyManager,
}

impl IpcManager {
    pub fn new() -> Self {
        Self::with_parts(MemoryManager::new(), ProcessDirectory::new())
    }

    /// Build over an existing allocator and process directory
    pub fn with_parts(memory: MemoryManager, processes: ProcessDirectory) -> Self {
        let scoring = Arc::new(ScoringContext::new());

        let manager = Self {
            queues: QueueManager::new(
                memory.clone(),
                processes.clone(),
                Arc::clone(&scoring),
            ),
            shm: ShmManager::new(memory.clone()),
            semaphores: SemManager::new(processes.clone(), Arc::clone(&scoring)),
            pipes: PipeManager::new(memory.clone(), processes.clone(), Arc::clone(&scoring)),
            notify: NotifyManager::new(Arc::clone(&scoring)),
            memory,
            processes,
            scoring,
        };

        info!("IPC manager initialized");
        manager
    }

    /// Get the queue manager
    pub fn queues(&self) -> &QueueManager {
        &self.queues
    }

    /// Get the shared memory manager
    pub fn shm(&self) -> &ShmManager {
        &self.shm
    }

    /// Get the semaphore manager
    pub fn semaphores(&self) -> &SemManager {
        &self.semaphores
    }

    /// Get the pipe manager
    pub fn pipes(&self) -> &PipeManager {
        &self.pipes
    }

    /// Get the notification manager
    pub fn notifications(&self) -> &NotifyManager {
        &self.notify
    }

    /// Get the process directory
    pub fn processes(&self) -> &ProcessDirectory {
        &self.processes
    }

    /// Get the backing allocator
    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    /// Diagnostic view of the scoring context
    pub fn scoring_snapshot(&self) -> ScoringSnapshot {
        self.scoring.snapshot()
    }

    /// Release every IPC resource a terminated process holds
    pub fn cleanup_process(&self, pid: Pid) -> Size {
        let queues = self.queues.cleanup_process(pid);
        let segments = self.shm.cleanup_process(pid);
        let semaphores = self.semaphores.cleanup_process(pid);
        let pipes = self.pipes.cleanup_process(pid);
        let descriptors = self.notify.cleanup_process(pid);
        // Any payloads still tracked against the pid (never dequeued, never
        // owned by a live object) go with it
        self.memory.cleanup_process(pid);

        let total = queues + segments + semaphores + pipes + descriptors;
        if total > 0 {
            info!(
                "IPC cleanup for PID {}: {} resources ({} queues, {} segments, {} semaphores, {} pipes, {} descriptors)",
                pid, total, queues, segments, semaphores, pipes, descriptors
            );
        }
        total
    }

    /// Total backing-store bytes in use across all managers
    pub fn global_memory_usage(&self) -> Size {
        let (_, used, _) = self.memory.info();
        used
    }
}

impl Default for IpcManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for IpcManager {
    fn clone(&self) -> Self {
        Self {
            memory: self.memory.clone(),
            processes: self.processes.clone(),
            scoring: Arc::clone(&self.scoring),
            queues: self.queues.clone(),
            shm: self.shm.clone(),
            semaphores: self.semaphores.clone(),
            pipes: self.pipes.clone(),
            notify: self.notify.clone(),
        }
    }
}

impl IpcCleanup for IpcManager {
    fn cleanup_process(&self, pid: Pid) -> Size {
        IpcManager::cleanup_process(self, pid)
    }

    fn global_memory_usage(&self) -> Size {
        IpcManager::global_memory_usage(self)
    }
}
