//! Backend socket cap.
//!
//! # Responsibilities
//! - Bound the number of backend sockets open at once, idle ones included
//! - Queue connection attempts beyond the cap instead of failing them
//! - Provide guards that release a slot on drop

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

use crate::observability::metrics;

/// Fair FIFO cap on open backend sockets.
///
/// One slot is taken per socket by the connector and held by the socket
/// itself until it closes.
#[derive(Debug, Clone)]
pub struct SocketPool {
    permits: Arc<Semaphore>,
    capacity: usize,
    in_use: Arc<AtomicUsize>,
}

impl SocketPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_use: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<SocketGuard, AcquireError> {
        if self.permits.available_permits() == 0 {
            tracing::debug!(capacity = self.capacity, "Socket cap reached, queueing");
        }
        let permit = Arc::clone(&self.permits).acquire_owned().await?;
        let in_use = self.in_use.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_sockets_in_use(in_use);
        Ok(SocketGuard {
            _permit: permit,
            in_use: Arc::clone(&self.in_use),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sockets currently open.
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::SeqCst)
    }
}

/// A RAII guard holding one socket slot.
#[derive(Debug)]
pub struct SocketGuard {
    _permit: OwnedSemaphorePermit,
    in_use: Arc<AtomicUsize>,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        let in_use = self.in_use.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::record_sockets_in_use(in_use);
    }
}
