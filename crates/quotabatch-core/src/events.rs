//! Generic event system shared by the coordinator, store, and processor.
//!
//! Every subsystem that wants to report something observable (an admission
//! was granted, a row was claimed, an item finished) defines its own event
//! enum implementing [`BatchEvent`] and drives it through an
//! [`EventListeners`] collection. This keeps the subsystems decoupled from
//! any particular logging or metrics backend: a listener can forward events
//! to `tracing`, increment `metrics` counters, or just count them in a test.

#[cfg(feature = "tracing")]
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Trait for events emitted by quotabatch subsystems.
pub trait BatchEvent: Send + Sync + fmt::Debug {
    /// Returns the type of event (e.g. `"admission_granted"`, `"item_failed"`).
    fn event_type(&self) -> &'static str;

    /// Returns when this event occurred.
    fn timestamp(&self) -> Instant;

    /// Returns the name of the component instance that emitted this event.
    fn source(&self) -> &str;
}

/// Trait for listening to batch events.
pub trait EventListener<E: BatchEvent>: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &E);
}

/// Type alias for boxed event listeners.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// A collection of event listeners.
#[derive(Clone)]
pub struct EventListeners<E: BatchEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: BatchEvent> EventListeners<E> {
    /// Creates a new empty event listener collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Adds a listener to the collection.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to all registered listeners.
    ///
    /// If a listener panics, the panic is caught and the remaining listeners
    /// still run, so one misbehaving listener can't blind the others. With
    /// the `tracing` feature enabled, panicking listeners are logged as
    /// warnings; with `metrics` enabled, a counter is incremented.
    pub fn emit(&self, event: &E) {
        for (index, listener) in self.listeners.iter().enumerate() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));

            if let Err(_panic_payload) = result {
                #[cfg(feature = "tracing")]
                log_listener_panic(index, event, _panic_payload.as_ref());

                #[cfg(feature = "metrics")]
                record_listener_panic_metric(event);

                #[cfg(not(feature = "tracing"))]
                let _ = index;

                #[cfg(not(any(feature = "tracing", feature = "metrics")))]
                let _ = _panic_payload;
            }
        }
    }

    /// Returns true if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: BatchEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A simple function-based event listener.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<E>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Creates a new function-based listener.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: BatchEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}

#[cfg(feature = "tracing")]
fn log_listener_panic<E: BatchEvent>(index: usize, event: &E, panic_payload: &(dyn Any + Send)) {
    let panic_message = panic_payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic_payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());

    tracing::warn!(
        listener_index = index,
        source = event.source(),
        event_type = event.event_type(),
        panic_message = %panic_message,
        "batch event listener panicked"
    );
}

#[cfg(feature = "metrics")]
fn record_listener_panic_metric<E: BatchEvent>(event: &E) {
    let source_label = event.source().to_string();
    let event_type_label = event.event_type().to_string();

    metrics::counter!(
        "quotabatch_event_listener_panics_total",
        "source" => source_label,
        "event_type" => event_type_label
    )
    .increment(1);
}
