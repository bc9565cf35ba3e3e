//! Process-wide shutdown coordination.
//!
//! Mirrors the teacher's `running: Arc<AtomicBool>` flag, checked at loop
//! boundaries by every long-lived thread. Queue waits use a short timeout
//! rather than blocking indefinitely so every thread notices shutdown
//! promptly (target: <= 2s graceful shutdown).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Poll interval used by threads blocked on a queue pop; bounds how quickly
/// a thread notices `Shutdown::signal()`.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn signal(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_signaled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
