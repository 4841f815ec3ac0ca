/*!
 * Shutdown Controller
 *
 * Owns the termination sequence: serializes exit requests, drives the hook
 * registry through its single run and performs the final halt.
 *
 * # Locks
 *
 * - `termination_lock`: held for the whole sequence plus the halt of an exit
 *   request. Any other thread that asks to terminate waits here, possibly
 *   forever, since the winner halts the process.
 * - `halt_lock`: guards only the halt primitive, so a direct `halt` never
 *   waits for hook bookkeeping.
 *
 * # Example
 *
 * ```ignore
 * let controller = ShutdownController::builder()
 *     .with_console_restore()
 *     .with_delete_on_exit()
 *     .build()?;
 *
 * controller.add_application_hook(&ApplicationHook::new("flush", || flush_all()))?;
 * controller.request_exit(0);
 * ```
 */

use super::application::{ApplicationHook, ApplicationHookSet};
use super::config::ShutdownConfig;
use super::console::ConsoleRestore;
use super::delete_on_exit::DeleteOnExit;
use super::registry::HookRegistry;
use super::stats::{AtomicShutdownStats, ShutdownStats};
use super::traits::{Halt, ProcessHalt};
use super::types::{HookResult, RunSummary, TerminationPhase};
use crate::core::errors::ShutdownResult;
use crate::core::types::{ExitStatus, SlotIndex};
use crate::monitoring::ShutdownSpan;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, error, info, warn};

/// Coordinates the process termination sequence
pub struct ShutdownController {
    registry: Arc<HookRegistry>,
    application_hooks: Arc<ApplicationHookSet>,
    console: Option<Arc<ConsoleRestore>>,
    delete_on_exit: Option<Arc<DeleteOnExit>>,
    termination_lock: Mutex<()>,
    /// Thread currently executing the slot sequence
    sequence_owner: Mutex<Option<ThreadId>>,
    halt_lock: Mutex<()>,
    halter: Arc<dyn Halt>,
    config: ShutdownConfig,
    stats: Arc<AtomicShutdownStats>,
}

impl ShutdownController {
    pub fn builder() -> ShutdownControllerBuilder {
        ShutdownControllerBuilder::new()
    }

    /// Terminate the process with `status`
    ///
    /// Runs the hook sequence once and halts. In production the halt does not
    /// return. A nonzero status after the sequence has completed halts
    /// immediately without touching the hooks.
    pub fn request_exit(&self, status: ExitStatus) {
        self.stats.inc_exit_requests();
        if self.config.log_exit_requests {
            let current = thread::current();
            debug!(
                status,
                thread = current.name().unwrap_or("<unnamed>"),
                "Exit requested"
            );
        }

        if status != 0 && self.registry.phase() == TerminationPhase::Halted {
            info!(status, "Shutdown hooks already run, halting immediately");
            self.halt(status);
            return;
        }

        // A slot action asking to exit would otherwise wait on itself
        if self.is_sequence_owner() {
            warn!(status, "Exit requested from a running shutdown hook, halting");
            self.halt(status);
            return;
        }

        let _sequence = self.termination_lock.lock();
        {
            let span = ShutdownSpan::new("exit");
            let _entered = span.enter();
            span.record_status(status);

            self.halter.before_halt();
            match self.run_sequence() {
                Ok(summary) => {
                    span.record_slots_run(summary.executed.len());
                    span.record_result(true);
                }
                Err(e) => {
                    error!(error = %e, status, "Shutdown sequence aborted, halting anyway");
                    span.record_error(&e.to_string());
                }
            }
        }
        self.halt(status);
    }

    /// Run the hook sequence because no schedulable work remains
    ///
    /// Does not halt; the caller owns the process exit on this path.
    pub fn shutdown_from_last_thread_exit(&self) -> ShutdownResult<RunSummary> {
        if self.is_sequence_owner() {
            debug!("Last-thread shutdown requested from inside the sequence");
            return Ok(RunSummary::skipped());
        }

        let _sequence = self.termination_lock.lock();
        let span = ShutdownSpan::new("last-thread");
        let _entered = span.enter();

        let result = self.run_sequence();
        match &result {
            Ok(summary) => {
                span.record_slots_run(summary.executed.len());
                span.record_result(true);
            }
            Err(e) => span.record_error(&e.to_string()),
        }
        result
    }

    /// Halt immediately without running any hooks
    pub fn halt(&self, status: ExitStatus) {
        let _halt = self.halt_lock.lock();
        self.stats.inc_halts();
        info!(status, halter = self.halter.name(), "Halting");
        self.halter.halt(status);
    }

    /// Must be called with `termination_lock` held
    fn run_sequence(&self) -> ShutdownResult<RunSummary> {
        *self.sequence_owner.lock() = Some(thread::current().id());
        let _owner = ClearOwner(&self.sequence_owner);
        self.registry.run_all()
    }

    fn is_sequence_owner(&self) -> bool {
        *self.sequence_owner.lock() == Some(thread::current().id())
    }

    /// Claim an internal slot
    pub fn register<F>(
        &self,
        slot: SlotIndex,
        allow_during_shutdown: bool,
        name: impl Into<String>,
        action: F,
    ) -> ShutdownResult<()>
    where
        F: Fn() -> HookResult + Send + Sync + 'static,
    {
        self.registry
            .register(slot, allow_during_shutdown, name, action)
    }

    /// Register a user termination task
    pub fn add_application_hook(&self, hook: &ApplicationHook) -> ShutdownResult<()> {
        self.application_hooks.add(hook)
    }

    /// De-register a user termination task; `Ok(false)` if it was never added
    pub fn remove_application_hook(&self, hook: &ApplicationHook) -> ShutdownResult<bool> {
        self.application_hooks.remove(Some(hook))
    }

    pub fn phase(&self) -> TerminationPhase {
        self.registry.phase()
    }

    /// Get a snapshot of the shutdown counters
    pub fn stats(&self) -> ShutdownStats {
        self.stats.snapshot()
    }

    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    pub fn application_hooks(&self) -> &Arc<ApplicationHookSet> {
        &self.application_hooks
    }

    pub fn console_restore(&self) -> Option<&Arc<ConsoleRestore>> {
        self.console.as_ref()
    }

    pub fn delete_on_exit(&self) -> Option<&Arc<DeleteOnExit>> {
        self.delete_on_exit.as_ref()
    }

    pub fn config(&self) -> &ShutdownConfig {
        &self.config
    }
}

struct ClearOwner<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for ClearOwner<'_> {
    fn drop(&mut self) {
        *self.0.lock() = None;
    }
}

/// Builder for ShutdownController
pub struct ShutdownControllerBuilder {
    halter: Option<Arc<dyn Halt>>,
    config: Option<ShutdownConfig>,
    enable_console: bool,
    enable_delete_on_exit: bool,
}

impl ShutdownControllerBuilder {
    pub fn new() -> Self {
        Self {
            halter: None,
            config: None,
            enable_console: false,
            enable_delete_on_exit: false,
        }
    }

    /// Use a custom halt primitive (default: `ProcessHalt`)
    pub fn with_halter(mut self, halter: Arc<dyn Halt>) -> Self {
        self.halter = Some(halter);
        self
    }

    pub fn with_config(mut self, config: ShutdownConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Claim the console restore slot
    pub fn with_console_restore(mut self) -> Self {
        self.enable_console = true;
        self
    }

    /// Claim the delete-on-exit slot
    pub fn with_delete_on_exit(mut self) -> Self {
        self.enable_delete_on_exit = true;
        self
    }

    /// Build the controller; the application hook slot is always claimed
    pub fn build(self) -> ShutdownResult<ShutdownController> {
        let config = self.config.unwrap_or_default();
        let stats = Arc::new(AtomicShutdownStats::new());
        let registry = Arc::new(HookRegistry::with_stats(Arc::clone(&stats)));

        let console = if self.enable_console {
            Some(ConsoleRestore::install(&registry)?)
        } else {
            None
        };
        let application_hooks =
            ApplicationHookSet::install(&registry, config.clone(), Arc::clone(&stats))?;
        let delete_on_exit = if self.enable_delete_on_exit {
            Some(DeleteOnExit::install(&registry)?)
        } else {
            None
        };

        let halter = self.halter.unwrap_or_else(|| Arc::new(ProcessHalt));
        info!(
            halter = halter.name(),
            slots = registry.bound_count(),
            "Shutdown controller initialized"
        );

        Ok(ShutdownController {
            registry,
            application_hooks,
            console,
            delete_on_exit,
            termination_lock: Mutex::new(()),
            sequence_owner: Mutex::new(None),
            halt_lock: Mutex::new(()),
            halter,
            config,
            stats,
        })
    }
}

impl Default for ShutdownControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
