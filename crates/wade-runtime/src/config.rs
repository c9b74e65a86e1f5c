#![forbid(unsafe_code)]

//! Scheduler configuration.

/// Default thread name prefix for background listeners.
pub const DEFAULT_LISTENER_PREFIX: &str = "wade-listener";

/// Knobs for [`Scheduler`](crate::scheduler::Scheduler).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    /// Whether [`run_scheduled`](crate::scheduler::Scheduler::run_scheduled)
    /// flushes pending notifications. When off, only explicit
    /// [`checkpoint`](crate::scheduler::Scheduler::checkpoint) calls do.
    pub auto_checkpoint: bool,
    /// Listener threads are named `{prefix}-{name}`.
    pub listener_thread_prefix: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            auto_checkpoint: true,
            listener_thread_prefix: DEFAULT_LISTENER_PREFIX.to_string(),
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn with_auto_checkpoint(mut self, enabled: bool) -> Self {
        self.auto_checkpoint = enabled;
        self
    }

    #[must_use]
    pub fn with_listener_thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.listener_thread_prefix = prefix.into();
        self
    }

    pub(crate) fn listener_thread_name(&self, name: &str) -> String {
        format!("{}-{}", self.listener_thread_prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SchedulerConfig::default();
        assert!(config.auto_checkpoint);
        assert_eq!(config.listener_thread_name("http"), "wade-listener-http");
    }

    #[test]
    fn builders() {
        let config = SchedulerConfig::default()
            .with_auto_checkpoint(false)
            .with_listener_thread_prefix("app");
        assert!(!config.auto_checkpoint);
        assert_eq!(config.listener_thread_name("dom"), "app-dom");
    }
}
