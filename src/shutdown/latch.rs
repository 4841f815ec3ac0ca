/*!
 * Completion Latch
 *
 * Count-down latch used to wait for every application hook thread.
 * Built on parking_lot's Mutex/Condvar pair. There is no timeout and no early
 * return: `wait` re-checks the count after every wakeup, spurious or not.
 */

use parking_lot::{Condvar, Mutex};

pub struct CompletionLatch {
    remaining: Mutex<usize>,
    condvar: Condvar,
}

impl CompletionLatch {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            condvar: Condvar::new(),
        }
    }

    /// Record one completion; wakes waiters when the count reaches zero
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        debug_assert!(*remaining > 0, "completion latch counted down past zero");
        if *remaining == 0 {
            return;
        }
        *remaining -= 1;
        if *remaining == 0 {
            self.condvar.notify_all();
        }
    }

    /// Block until every participant has counted down
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.condvar.wait(&mut remaining);
        }
    }

    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }
}

/// Counts the latch down when dropped, including during unwinding
pub(crate) struct CountDownOnDrop<'a>(pub(crate) &'a CompletionLatch);

impl Drop for CountDownOnDrop<'_> {
    fn drop(&mut self) {
        self.0.count_down();
    }
}
