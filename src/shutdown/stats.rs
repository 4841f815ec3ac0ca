/*!
 * Shutdown Statistics
 * Atomic counters updated along the termination path
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the shutdown counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownStats {
    pub slots_registered: u64,
    pub slots_run: u64,
    pub slot_failures: u64,
    pub app_hooks_registered: u64,
    pub app_hooks_run: u64,
    pub app_hooks_panicked: u64,
    pub exit_requests: u64,
    pub halts: u64,
}

/// Atomic shutdown statistics
///
/// Cache-line aligned; shared by the registry, the hook set and the controller.
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct AtomicShutdownStats {
    slots_registered: AtomicU64,
    slots_run: AtomicU64,
    slot_failures: AtomicU64,
    app_hooks_registered: AtomicU64,
    app_hooks_run: AtomicU64,
    app_hooks_panicked: AtomicU64,
    exit_requests: AtomicU64,
    halts: AtomicU64,
}

impl AtomicShutdownStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc_slots_registered(&self) {
        self.slots_registered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_slots_run(&self) {
        self.slots_run.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_slot_failures(&self) {
        self.slot_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_app_hooks_registered(&self) {
        self.app_hooks_registered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_app_hooks_run(&self, count: u64) {
        self.app_hooks_run.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_app_hooks_panicked(&self, count: u64) {
        self.app_hooks_panicked.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_exit_requests(&self) {
        self.exit_requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_halts(&self) {
        self.halts.fetch_add(1, Ordering::SeqCst);
    }

    /// Take a snapshot of all counters
    pub fn snapshot(&self) -> ShutdownStats {
        ShutdownStats {
            slots_registered: self.slots_registered.load(Ordering::Relaxed),
            slots_run: self.slots_run.load(Ordering::Relaxed),
            slot_failures: self.slot_failures.load(Ordering::Relaxed),
            app_hooks_registered: self.app_hooks_registered.load(Ordering::Relaxed),
            app_hooks_run: self.app_hooks_run.load(Ordering::Relaxed),
            app_hooks_panicked: self.app_hooks_panicked.load(Ordering::Relaxed),
            exit_requests: self.exit_requests.load(Ordering::Relaxed),
            halts: self.halts.load(Ordering::SeqCst),
        }
    }
}
