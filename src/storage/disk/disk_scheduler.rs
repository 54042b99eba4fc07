use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::common::{DbError, PageId, Result};

use super::DiskManager;

/// A disk I/O request. Buffers are owned so a request can cross to the
/// worker thread without borrowing from the caller; each request carries
/// its own reply channel.
pub enum DiskRequest {
    Read {
        page_id: PageId,
        reply: Sender<Result<Vec<u8>>>,
    },
    Write {
        page_id: PageId,
        data: Vec<u8>,
        reply: Sender<Result<()>>,
    },
    Append {
        reply: Sender<Result<u32>>,
    },
}

/// DiskScheduler runs a background worker thread that serves I/O requests
/// for one table file. The `*_sync` helpers queue a request and block on
/// its reply.
pub struct DiskScheduler {
    disk_manager: Arc<DiskManager>,
    request_sender: Sender<DiskRequest>,
    shutdown: Arc<AtomicBool>,
    worker_handle: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    /// Creates a scheduler and spawns its worker thread.
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        let (sender, receiver) = bounded::<DiskRequest>(128);
        let shutdown = Arc::new(AtomicBool::new(false));

        let dm_clone = Arc::clone(&disk_manager);
        let shutdown_clone = Arc::clone(&shutdown);

        let worker_handle = thread::spawn(move || {
            Self::run_worker(dm_clone, receiver, shutdown_clone);
        });

        Self {
            disk_manager,
            request_sender: sender,
            shutdown,
            worker_handle: Some(worker_handle),
        }
    }

    /// Queues a request for the worker.
    pub fn schedule(&self, request: DiskRequest) -> Result<()> {
        self.request_sender
            .send(request)
            .map_err(|e| DbError::DiskScheduler(format!("failed to schedule request: {}", e)))
    }

    /// Reads one page and waits for the result.
    pub fn schedule_read_sync(&self, page_id: PageId) -> Result<Vec<u8>> {
        let (tx, rx) = bounded(1);
        self.schedule(DiskRequest::Read { page_id, reply: tx })?;
        Self::wait(rx)
    }

    /// Writes one page and waits for completion.
    pub fn schedule_write_sync(&self, page_id: PageId, data: Vec<u8>) -> Result<()> {
        let (tx, rx) = bounded(1);
        self.schedule(DiskRequest::Write {
            page_id,
            data,
            reply: tx,
        })?;
        Self::wait(rx)
    }

    /// Appends a zero page and waits for its page number.
    pub fn schedule_append_sync(&self) -> Result<u32> {
        let (tx, rx) = bounded(1);
        self.schedule(DiskRequest::Append { reply: tx })?;
        Self::wait(rx)
    }

    fn wait<T>(rx: Receiver<Result<T>>) -> Result<T> {
        rx.recv()
            .map_err(|e| DbError::DiskScheduler(format!("failed to receive completion: {}", e)))?
    }

    /// Serves requests until shutdown is signaled, then drains the queue.
    fn run_worker(
        disk_manager: Arc<DiskManager>,
        receiver: Receiver<DiskRequest>,
        shutdown: Arc<AtomicBool>,
    ) {
        loop {
            if shutdown.load(Ordering::Relaxed) {
                while let Ok(request) = receiver.try_recv() {
                    Self::process_request(&disk_manager, request);
                }
                break;
            }

            match receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(request) => Self::process_request(&disk_manager, request),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn process_request(disk_manager: &DiskManager, request: DiskRequest) {
        // A dropped receiver means the caller gave up; nothing to report to.
        match request {
            DiskRequest::Read { page_id, reply } => {
                let mut data = vec![0u8; disk_manager.page_size()];
                let result = disk_manager.read_page(page_id, &mut data).map(|_| data);
                let _ = reply.send(result);
            }
            DiskRequest::Write {
                page_id,
                data,
                reply,
            } => {
                let _ = reply.send(disk_manager.write_page(page_id, &data));
            }
            DiskRequest::Append { reply } => {
                let _ = reply.send(disk_manager.append_empty_page());
            }
        }
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);

        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}
