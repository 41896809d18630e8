use crate::events::{ProgressEvent, SummaryEvent};
use quotabatch_core::EventListeners;

/// Configuration for a [`crate::Processor`] run.
pub struct ProcessorConfig {
    pub(crate) worker_count: usize,
    pub(crate) limit: Option<u64>,
    pub(crate) name: String,
    pub(crate) progress_listeners: EventListeners<ProgressEvent>,
    pub(crate) summary_listeners: EventListeners<SummaryEvent>,
}

/// Builder for [`ProcessorConfig`].
pub struct ProcessorConfigBuilder {
    worker_count: usize,
    limit: Option<u64>,
    name: String,
    progress_listeners: EventListeners<ProgressEvent>,
    summary_listeners: EventListeners<SummaryEvent>,
}

impl Default for ProcessorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorConfigBuilder {
    /// `worker_count` defaults to 10, matching spec.md §4.5.
    pub fn new() -> Self {
        Self {
            worker_count: 10,
            limit: None,
            name: "quotabatch".to_string(),
            progress_listeners: EventListeners::new(),
            summary_listeners: EventListeners::new(),
        }
    }

    pub fn worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Caps the number of rows attempted across the whole pool. `None`
    /// (the default) processes until the store runs dry.
    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked after every completed item.
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.progress_listeners.add(quotabatch_core::FnListener::new(f));
        self
    }

    /// Registers a callback invoked once, after the run finishes.
    pub fn on_summary<F>(mut self, f: F) -> Self
    where
        F: Fn(&SummaryEvent) + Send + Sync + 'static,
    {
        self.summary_listeners.add(quotabatch_core::FnListener::new(f));
        self
    }

    pub fn build(self) -> ProcessorConfig {
        ProcessorConfig {
            worker_count: self.worker_count,
            limit: self.limit,
            name: self.name,
            progress_listeners: self.progress_listeners,
            summary_listeners: self.summary_listeners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_ten_workers_and_no_limit() {
        let config = ProcessorConfigBuilder::new().build();
        assert_eq!(config.worker_count, 10);
        assert_eq!(config.limit, None);
    }
}
