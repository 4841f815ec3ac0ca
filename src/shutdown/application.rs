/*!
 * Application Hooks
 *
 * User-registered termination tasks. The set occupies a single registry slot;
 * when that slot runs, the set is sealed and every member is started on its
 * own thread. The draining thread then waits, without timeout, until each one
 * has finished.
 */

use super::config::ShutdownConfig;
use super::latch::{CompletionLatch, CountDownOnDrop};
use super::registry::{panic_message, HookRegistry};
use super::stats::AtomicShutdownStats;
use super::types::{DrainReport, HookState};
use crate::core::errors::{ShutdownError, ShutdownResult};
use crate::core::limits::APPLICATION_HOOKS_SLOT;
use crate::core::types::HookId;
use ahash::RandomState;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

static NEXT_HOOK_ID: AtomicU64 = AtomicU64::new(1);

type HookBody = Box<dyn FnOnce() + Send + 'static>;

struct HookInner {
    id: HookId,
    name: String,
    state: AtomicU8,
    body: Mutex<Option<HookBody>>,
}

/// Handle to a user termination task
///
/// Clones share identity: registering a clone of a registered hook is a
/// duplicate, and a clone can be used to remove it.
#[derive(Clone)]
pub struct ApplicationHook {
    inner: Arc<HookInner>,
}

impl ApplicationHook {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            inner: Arc::new(HookInner {
                id: NEXT_HOOK_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                state: AtomicU8::new(HookState::Idle as u8),
                body: Mutex::new(Some(Box::new(body))),
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> HookId {
        self.inner.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[inline]
    pub fn state(&self) -> HookState {
        HookState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Start the body on a dedicated thread
    ///
    /// Returns `Ok(None)` if the hook was already started elsewhere. The latch
    /// is counted down exactly once whatever the outcome.
    fn start(
        &self,
        config: &ShutdownConfig,
        latch: &Arc<CompletionLatch>,
    ) -> ShutdownResult<Option<JoinHandle<()>>> {
        let claimed = self.inner.state.compare_exchange(
            HookState::Idle as u8,
            HookState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        let body = match claimed {
            Ok(_) => self.inner.body.lock().take(),
            Err(_) => None,
        };
        let Some(body) = body else {
            latch.count_down();
            return Ok(None);
        };

        let mut builder =
            thread::Builder::new().name(format!("{}-{}", config.hook_thread_prefix, self.name()));
        if let Some(size) = config.hook_thread_stack_size {
            builder = builder.stack_size(size);
        }

        let inner = Arc::clone(&self.inner);
        let thread_latch = Arc::clone(latch);
        let spawned = builder.spawn(move || {
            let _done = CountDownOnDrop(&thread_latch);
            let _finished = MarkFinished(&inner);
            body();
        });

        match spawned {
            Ok(handle) => Ok(Some(handle)),
            Err(e) => {
                self.inner
                    .state
                    .store(HookState::Finished as u8, Ordering::Release);
                latch.count_down();
                Err(e.into())
            }
        }
    }
}

struct MarkFinished<'a>(&'a HookInner);

impl Drop for MarkFinished<'_> {
    fn drop(&mut self) {
        self.0
            .state
            .store(HookState::Finished as u8, Ordering::Release);
    }
}

impl PartialEq for ApplicationHook {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ApplicationHook {}

impl Hash for ApplicationHook {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for ApplicationHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationHook")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Identity-keyed set of application hooks
///
/// `None` in `members` means sealed: the collection has been handed to the
/// drain and every later mutation fails with `ShutdownInProgress`.
pub struct ApplicationHookSet {
    members: Mutex<Option<HashMap<HookId, ApplicationHook, RandomState>>>,
    config: ShutdownConfig,
    stats: Arc<AtomicShutdownStats>,
}

impl ApplicationHookSet {
    /// Create a free-standing, unsealed set
    pub fn new(config: ShutdownConfig) -> Self {
        Self::with_stats(config, Arc::new(AtomicShutdownStats::new()))
    }

    pub(crate) fn with_stats(config: ShutdownConfig, stats: Arc<AtomicShutdownStats>) -> Self {
        Self {
            members: Mutex::new(Some(HashMap::with_hasher(RandomState::new()))),
            config,
            stats,
        }
    }

    /// Create a set and claim the application hook slot for it
    ///
    /// If the registry has already started its sequence the set comes back
    /// sealed.
    pub fn install(
        registry: &HookRegistry,
        config: ShutdownConfig,
        stats: Arc<AtomicShutdownStats>,
    ) -> ShutdownResult<Arc<Self>> {
        let set = Arc::new(Self::with_stats(config, stats));
        let relay = Arc::clone(&set);

        match registry.register(APPLICATION_HOOKS_SLOT, false, "application-hooks", move || {
            relay.drain();
            Ok(())
        }) {
            Ok(()) => Ok(set),
            Err(ShutdownError::ShutdownInProgress(reason)) => {
                warn!(%reason, "Application hook set created during shutdown, sealing");
                set.seal();
                Ok(set)
            }
            Err(e) => Err(e),
        }
    }

    /// Register a hook
    pub fn add(&self, hook: &ApplicationHook) -> ShutdownResult<()> {
        let mut members = self.members.lock();
        let Some(members) = members.as_mut() else {
            return Err(ShutdownError::ShutdownInProgress(format!(
                "cannot add hook '{}'",
                hook.name()
            )));
        };

        if hook.state().has_started() {
            return Err(ShutdownError::AlreadyRunning(hook.name().to_string()));
        }
        if members.contains_key(&hook.id()) {
            return Err(ShutdownError::AlreadyRegistered(hook.name().to_string()));
        }

        members.insert(hook.id(), hook.clone());
        self.stats.inc_app_hooks_registered();
        debug!(hook = hook.name(), id = hook.id(), "Registered application hook");
        Ok(())
    }

    /// De-register a hook; `Ok(false)` if it was not registered
    pub fn remove(&self, hook: Option<&ApplicationHook>) -> ShutdownResult<bool> {
        let mut members = self.members.lock();
        let Some(members) = members.as_mut() else {
            return Err(ShutdownError::ShutdownInProgress(
                "cannot remove hooks".to_string(),
            ));
        };
        let hook = hook.ok_or(ShutdownError::NullAction)?;

        let removed = members.remove(&hook.id()).is_some();
        if removed {
            debug!(hook = hook.name(), id = hook.id(), "Removed application hook");
        }
        Ok(removed)
    }

    /// Seal the set, start every member concurrently and wait for all of them
    ///
    /// Only the first call does anything; later calls find the set sealed.
    pub fn drain(&self) -> DrainReport {
        let Some(captured) = self.members.lock().take() else {
            warn!("Application hooks already drained");
            return DrainReport::default();
        };

        let hooks: Vec<ApplicationHook> = captured.into_values().collect();
        info!(count = hooks.len(), "Starting application shutdown hooks");

        let latch = Arc::new(CompletionLatch::new(hooks.len()));
        let mut handles = Vec::with_capacity(hooks.len());
        let mut report = DrainReport::default();

        for hook in &hooks {
            match hook.start(&self.config, &latch) {
                Ok(Some(handle)) => {
                    report.started += 1;
                    handles.push((hook.name(), handle));
                }
                Ok(None) => debug!(hook = hook.name(), "Hook already started, skipping"),
                Err(e) => {
                    error!(hook = hook.name(), error = %e, "Could not start application hook");
                    report.spawn_failures += 1;
                }
            }
        }

        latch.wait();

        for (name, handle) in handles {
            if let Err(payload) = handle.join() {
                warn!(hook = name, panic = %panic_message(&*payload), "Application hook panicked");
                report.panicked += 1;
            }
        }

        self.stats.add_app_hooks_run(report.started as u64);
        self.stats.add_app_hooks_panicked(report.panicked as u64);
        info!(
            started = report.started,
            panicked = report.panicked,
            spawn_failures = report.spawn_failures,
            "Application shutdown hooks finished"
        );
        report
    }

    pub(crate) fn seal(&self) {
        self.members.lock().take();
    }

    pub fn is_sealed(&self) -> bool {
        self.members.lock().is_none()
    }

    /// Check if a hook is currently registered
    pub fn contains(&self, hook: &ApplicationHook) -> bool {
        self.members
            .lock()
            .as_ref()
            .is_some_and(|members| members.contains_key(&hook.id()))
    }

    /// Get registered hook count (0 once sealed)
    pub fn len(&self) -> usize {
        self.members.lock().as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
