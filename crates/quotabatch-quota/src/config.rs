use crate::events::QuotaEvent;
use quotabatch_core::EventListeners;

/// Configuration for a [`crate::Coordinator`].
pub struct CoordinatorConfig {
    pub(crate) limit_total: u32,
    pub(crate) headroom: u32,
    pub(crate) event_listeners: EventListeners<QuotaEvent>,
    pub(crate) name: String,
}

/// Builder for [`CoordinatorConfig`].
pub struct CoordinatorConfigBuilder {
    limit_total: u32,
    headroom: u32,
    event_listeners: EventListeners<QuotaEvent>,
    name: String,
}

impl Default for CoordinatorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinatorConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - `limit_total`: 160 (the server's documented default window)
    /// - `headroom`: 10
    /// - `name`: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            limit_total: 160,
            headroom: 10,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the assumed server request budget until the first response
    /// provides an authoritative value via `x-ratelimit-total`.
    pub fn limit_total(mut self, limit_total: u32) -> Self {
        self.limit_total = limit_total;
        self
    }

    /// Sets the buffer below the server quota at which the coordinator
    /// switches from pacing to probing.
    pub fn headroom(mut self, headroom: u32) -> Self {
        self.headroom = headroom;
        self
    }

    /// Sets the name for this coordinator instance (used in events and logs).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked every time admission is granted.
    pub fn on_admission<F>(mut self, f: F) -> Self
    where
        F: Fn(&QuotaEvent) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(quotabatch_core::FnListener::new(move |event: &QuotaEvent| {
                if matches!(event, QuotaEvent::AdmissionGranted { .. }) {
                    f(event);
                }
            }));
        self
    }

    /// Registers a callback invoked for every coordinator event
    /// (admission, probe scheduling, pause engagement, quota refresh).
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&QuotaEvent) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(quotabatch_core::FnListener::new(f));
        self
    }

    /// Builds the coordinator configuration.
    pub fn build(self) -> CoordinatorConfig {
        CoordinatorConfig {
            limit_total: self.limit_total,
            headroom: self.headroom,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = CoordinatorConfigBuilder::new().build();
        assert_eq!(config.limit_total, 160);
        assert_eq!(config.headroom, 10);
    }

    #[test]
    fn builder_custom_values() {
        let config = CoordinatorConfigBuilder::new()
            .limit_total(200)
            .headroom(5)
            .name("primary")
            .build();
        assert_eq!(config.limit_total, 200);
        assert_eq!(config.headroom, 5);
        assert_eq!(config.name, "primary");
    }
}
