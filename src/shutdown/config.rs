/*!
 * Shutdown Configuration
 *
 * Runtime configuration for hook threads and exit logging
 */

use crate::core::limits::{
    DEFAULT_HOOK_THREAD_PREFIX, ENV_HOOK_STACK_SIZE, ENV_LOG_EXIT, MIN_HOOK_STACK_SIZE,
};
use tracing::warn;

/// Shutdown configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownConfig {
    /// Name prefix for application hook threads
    pub hook_thread_prefix: &'static str,
    /// Stack size for application hook threads (platform default if None)
    pub hook_thread_stack_size: Option<usize>,
    /// Log every exit request at debug level
    pub log_exit_requests: bool,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            hook_thread_prefix: DEFAULT_HOOK_THREAD_PREFIX,
            hook_thread_stack_size: None,
            log_exit_requests: true,
        }
    }
}

impl ShutdownConfig {
    /// Configuration without exit logging, for embedders with their own audit trail
    pub const fn quiet() -> Self {
        Self {
            hook_thread_prefix: DEFAULT_HOOK_THREAD_PREFIX,
            hook_thread_stack_size: None,
            log_exit_requests: false,
        }
    }

    /// Default configuration overlaid with environment overrides
    ///
    /// - SHUTDOWN_HOOK_STACK_SIZE: hook thread stack size in bytes
    /// - SHUTDOWN_LOG_EXIT: `0`/`false` disables exit request logging
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(ENV_HOOK_STACK_SIZE) {
            match raw.trim().parse::<usize>() {
                Ok(size) if size >= MIN_HOOK_STACK_SIZE => {
                    config.hook_thread_stack_size = Some(size)
                }
                Ok(size) => warn!(
                    size,
                    min = MIN_HOOK_STACK_SIZE,
                    "Hook stack size below minimum, using platform default"
                ),
                Err(e) => warn!(value = %raw, error = %e, "Ignoring malformed hook stack size"),
            }
        }

        if let Ok(raw) = std::env::var(ENV_LOG_EXIT) {
            config.log_exit_requests = !matches!(raw.trim(), "0" | "false" | "off");
        }

        config
    }

    #[inline]
    #[must_use]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.hook_thread_stack_size = Some(bytes.max(MIN_HOOK_STACK_SIZE));
        self
    }

    #[inline]
    #[must_use]
    pub fn with_thread_prefix(mut self, prefix: &'static str) -> Self {
        self.hook_thread_prefix = prefix;
        self
    }
}
