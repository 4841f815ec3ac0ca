/*!
 * Console Restore Hook
 * Puts the terminal back the way it was found before the process goes away
 */

use super::registry::HookRegistry;
use super::types::{HookError, HookResult};
use crate::core::errors::{ShutdownError, ShutdownResult};
use crate::core::limits::CONSOLE_RESTORE_SLOT;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

type RestoreFn = Box<dyn FnOnce() -> io::Result<()> + Send + 'static>;

/// Holds at most one pending console restoration
///
/// Whoever alters the console (disables echo, enters raw mode) installs the
/// inverse operation here. It runs once, in the first slot of the sequence.
pub struct ConsoleRestore {
    restore: Mutex<Option<RestoreFn>>,
}

impl ConsoleRestore {
    pub fn new() -> Self {
        Self {
            restore: Mutex::new(None),
        }
    }

    /// Create the hook and claim the console slot for it
    ///
    /// A console first touched by a shutdown hook is left alone: the slot has
    /// already been passed, so the returned instance is never run.
    pub fn install(registry: &HookRegistry) -> ShutdownResult<Arc<Self>> {
        let hook = Arc::new(Self::new());
        let runner = Arc::clone(&hook);

        match registry.register(CONSOLE_RESTORE_SLOT, false, "console-restore", move || {
            runner.run()
        }) {
            Ok(()) => Ok(hook),
            Err(ShutdownError::ShutdownInProgress(reason)) => {
                debug!(%reason, "Console restore not registered");
                Ok(hook)
            }
            Err(e) => Err(e),
        }
    }

    /// Install the restore operation, returning true if one was replaced
    pub fn set_restore<F>(&self, restore: F) -> bool
    where
        F: FnOnce() -> io::Result<()> + Send + 'static,
    {
        self.restore.lock().replace(Box::new(restore)).is_some()
    }

    /// Drop the pending restore (console already back to normal)
    pub fn clear(&self) -> bool {
        self.restore.lock().take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.restore.lock().is_some()
    }

    /// Run the pending restore, if any
    pub fn run(&self) -> HookResult {
        // Taken out of the lock so the restore may call back into this hook
        let pending = self.restore.lock().take();
        match pending {
            Some(restore) => restore().map_err(|e| {
                warn!(error = %e, "Console restore failed");
                HookError::recoverable(format!("console restore failed: {}", e))
            }),
            None => Ok(()),
        }
    }
}

impl Default for ConsoleRestore {
    fn default() -> Self {
        Self::new()
    }
}
