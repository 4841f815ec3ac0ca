/*!
 * Hook Registry
 *
 * Fixed table of internal termination actions. Each slot is claimed at most
 * once during initialization and the table runs exactly once, in ascending
 * slot order, when the process terminates.
 *
 * # Locking
 *
 * A single mutex guards the slot table, the running index and the
 * termination phase. Actions are invoked with the lock released so they can
 * call back into `register` (for a later slot) while the sequence runs.
 *
 * `run_all` itself must be serialized by the caller; `ShutdownController`
 * holds its termination lock around it.
 */

use super::stats::AtomicShutdownStats;
use super::types::{HookResult, RunSummary, TerminationPhase};
use crate::core::errors::{ShutdownError, ShutdownResult};
use crate::core::limits::MAX_SLOTS;
use crate::core::types::SlotIndex;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Action bound to a registry slot
pub type SlotAction = Arc<dyn Fn() -> HookResult + Send + Sync>;

struct BoundSlot {
    name: String,
    action: SlotAction,
}

struct RegistryState {
    /// Write-once entries; the index is the execution order
    slots: [Option<BoundSlot>; MAX_SLOTS],
    /// Slot currently executing, None until the sequence starts
    current_running: Option<SlotIndex>,
    phase: TerminationPhase,
}

impl RegistryState {
    /// Whether the sequence has reached or passed `slot`
    #[inline]
    fn has_passed(&self, slot: SlotIndex) -> bool {
        self.current_running.is_some_and(|running| slot <= running)
    }
}

/// Slot-indexed table of termination actions
pub struct HookRegistry {
    state: Mutex<RegistryState>,
    stats: Arc<AtomicShutdownStats>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::with_stats(Arc::new(AtomicShutdownStats::new()))
    }

    pub(crate) fn with_stats(stats: Arc<AtomicShutdownStats>) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                slots: [const { None }; MAX_SLOTS],
                current_running: None,
                phase: TerminationPhase::NotStarted,
            }),
            stats,
        }
    }

    /// Bind `action` to `slot`
    ///
    /// Without `allow_during_shutdown` the call is refused as soon as the
    /// sequence has started. With it, registration is still accepted for slots
    /// the sequence has not reached yet, until the sequence completes.
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
        self.register_action(slot, allow_during_shutdown, name, Arc::new(action))
    }

    /// Bind an already shared action to `slot`
    pub fn register_action(
        &self,
        slot: SlotIndex,
        allow_during_shutdown: bool,
        name: impl Into<String>,
        action: SlotAction,
    ) -> ShutdownResult<()> {
        if slot >= MAX_SLOTS {
            return Err(ShutdownError::InvalidSlot {
                slot,
                max: MAX_SLOTS,
            });
        }

        let name = name.into();
        let mut state = self.state.lock();

        if state.slots[slot].is_some() {
            error!(slot, hook = %name, "Shutdown hook slot already bound");
            return Err(ShutdownError::SlotAlreadyBound(slot));
        }

        if !allow_during_shutdown {
            if state.current_running.is_some() {
                return Err(ShutdownError::ShutdownInProgress(format!(
                    "cannot register '{}' once the hook sequence has started",
                    name
                )));
            }
        } else if state.phase == TerminationPhase::Halted || state.has_passed(slot) {
            return Err(ShutdownError::ShutdownInProgress(format!(
                "slot {} for '{}' has already been passed",
                slot, name
            )));
        }

        debug!(slot, hook = %name, allow_during_shutdown, "Registered shutdown hook");
        state.slots[slot] = Some(BoundSlot { name, action });
        self.stats.inc_slots_registered();
        Ok(())
    }

    /// Run every bound slot in ascending order
    ///
    /// Recoverable failures and panics are logged and the sequence continues.
    /// A fatal failure aborts the remaining slots and is returned; the phase
    /// then stays `InProgress`. The table is consumed by the first call: any
    /// later call returns immediately, whether the earlier run completed or
    /// was aborted.
    pub fn run_all(&self) -> ShutdownResult<RunSummary> {
        {
            let mut state = self.state.lock();
            if state.phase == TerminationPhase::Halted {
                debug!("Hook sequence already completed, skipping");
                return Ok(RunSummary::skipped());
            }
            if let Some(slot) = state.current_running {
                warn!(slot, "Hook sequence already started or aborted, not restarting");
                return Ok(RunSummary::skipped());
            }
            state.phase = TerminationPhase::InProgress;
        }

        let mut summary = RunSummary::default();

        for slot in 0..MAX_SLOTS {
            // Publish the index before invoking so racing registrations see it
            let bound = {
                let mut state = self.state.lock();
                state.current_running = Some(slot);
                state.slots[slot]
                    .as_ref()
                    .map(|bound| (bound.name.clone(), Arc::clone(&bound.action)))
            };

            let Some((name, action)) = bound else {
                continue;
            };

            debug!(slot, hook = %name, "Running shutdown hook");
            summary.executed.push(slot);
            self.stats.inc_slots_run();

            match panic::catch_unwind(AssertUnwindSafe(|| action())) {
                Ok(Ok(())) => {}
                Ok(Err(err)) if err.is_fatal() => {
                    error!(slot, hook = %name, error = %err.message, "Fatal shutdown hook failure, aborting sequence");
                    self.stats.inc_slot_failures();
                    return Err(ShutdownError::FatalHook {
                        slot,
                        reason: err.message,
                    });
                }
                Ok(Err(err)) => {
                    warn!(slot, hook = %name, error = %err.message, "Shutdown hook failed");
                    self.stats.inc_slot_failures();
                    summary.failed.push(slot);
                }
                Err(payload) => {
                    warn!(slot, hook = %name, panic = %panic_message(&*payload), "Shutdown hook panicked");
                    self.stats.inc_slot_failures();
                    summary.failed.push(slot);
                }
            }
        }

        self.state.lock().phase = TerminationPhase::Halted;
        info!(
            executed = summary.executed.len(),
            failed = summary.failed.len(),
            "Shutdown hook sequence completed"
        );
        Ok(summary)
    }

    /// Current termination phase
    pub fn phase(&self) -> TerminationPhase {
        self.state.lock().phase
    }

    /// Slot the sequence is executing (or last executed)
    pub fn current_running_slot(&self) -> Option<SlotIndex> {
        self.state.lock().current_running
    }

    /// Check if a slot has an action bound
    pub fn is_bound(&self, slot: SlotIndex) -> bool {
        slot < MAX_SLOTS && self.state.lock().slots[slot].is_some()
    }

    /// Get number of bound slots
    pub fn bound_count(&self) -> usize {
        self.state.lock().slots.iter().flatten().count()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
