//! Engine Notifications
//!
//! Named notifications emitted by the engine (`enable`, `disable`, `resize`,
//! `navigate`, `error`) and the subscription surface callers register on.
//!
//! Handlers are invoked after the registry lock is released, so a handler may
//! call back into the engine (a `disable` handler starting a new load is the
//! classic case).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ShowcaseError};
use crate::navigation::Direction;

/// Notification names
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// The showcase became visible
    Enable,
    /// The showcase started closing
    Disable,
    /// Dimensions are about to change
    Resize,
    /// A navigation step was accepted
    Navigate,
    /// An error was reported
    Error,
}

impl EventKind {
    /// All notification kinds
    pub const ALL: [EventKind; 5] = [
        Self::Enable,
        Self::Disable,
        Self::Resize,
        Self::Navigate,
        Self::Error,
    ];

    /// Parse a registration name; unknown names yield `None`
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "enable" => Some(Self::Enable),
            "disable" => Some(Self::Disable),
            "resize" => Some(Self::Resize),
            "navigate" => Some(Self::Navigate),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Registration name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Resize => "resize",
            Self::Navigate => "navigate",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A notification with its payload
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// The showcase became visible
    Enable,
    /// The showcase started closing
    Disable,
    /// Dimensions are about to change
    Resize,
    /// A navigation step was accepted
    Navigate {
        /// Requested direction
        direction: Direction,
        /// Index being navigated to
        index: usize,
    },
    /// An error was reported
    Error(ShowcaseError),
}

impl EngineEvent {
    /// The kind handlers are registered under
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Enable => EventKind::Enable,
            Self::Disable => EventKind::Disable,
            Self::Resize => EventKind::Resize,
            Self::Navigate { .. } => EventKind::Navigate,
            Self::Error(_) => EventKind::Error,
        }
    }
}

/// Handle returned by a registration, used to remove one handler
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Notification handler
pub type Handler = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

#[derive(Clone)]
struct Subscription {
    handler: Handler,
    once: bool,
}

/// Registry of notification handlers
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<BTreeMap<EventKind, BTreeMap<SubscriptionId, Subscription>>>,
}

impl EventBus {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler by event name
    ///
    /// # Errors
    ///
    /// Returns `InvalidEventRegistration` for names outside
    /// `enable|disable|resize|navigate|error`; nothing is registered.
    pub fn on<F>(&self, name: &str, handler: F) -> Result<SubscriptionId, ShowcaseError>
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        let kind = parse_name(name)?;
        Ok(self.subscribe(kind, Arc::new(handler), false))
    }

    /// Register a handler that is removed after its first invocation
    pub fn once<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.subscribe(kind, Arc::new(handler), true)
    }

    fn subscribe(&self, kind: EventKind, handler: Handler, once: bool) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .insert(id, Subscription { handler, once });
        tracing::trace!(event = %kind, subscription = %id, "handler registered");
        id
    }

    /// Remove handlers
    ///
    /// - `off(None, _)` clears every handler
    /// - `off(Some(name), None)` clears all handlers for `name`
    /// - `off(Some(name), Some(id))` removes one handler
    ///
    /// # Errors
    ///
    /// Returns `InvalidEventRegistration` for unknown names.
    pub fn off(
        &self,
        name: Option<&str>,
        id: Option<SubscriptionId>,
    ) -> Result<(), ShowcaseError> {
        let Some(name) = name else {
            self.handlers.write().clear();
            return Ok(());
        };

        let kind = parse_name(name)?;
        let mut handlers = self.handlers.write();
        match id {
            Some(id) => {
                if let Some(set) = handlers.get_mut(&kind) {
                    set.remove(&id);
                }
            }
            None => {
                handlers.remove(&kind);
            }
        }
        Ok(())
    }

    /// Remove one handler by id regardless of its event
    pub fn remove(&self, id: SubscriptionId) {
        for set in self.handlers.write().values_mut() {
            set.remove(&id);
        }
    }

    /// Number of handlers registered for a kind
    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, BTreeMap::len)
    }

    /// Dispatch an event to its handlers
    pub fn emit(&self, event: &EngineEvent) {
        let kind = event.kind();
        let batch: Vec<Handler> = {
            let mut handlers = self.handlers.write();
            let Some(set) = handlers.get_mut(&kind) else {
                return;
            };
            let batch = set.values().map(|s| s.handler.clone()).collect();
            set.retain(|_, s| !s.once);
            batch
        };

        tracing::trace!(event = %kind, handlers = batch.len(), "dispatching");
        for handler in batch {
            handler(event);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let counts: BTreeMap<EventKind, usize> =
            handlers.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

fn parse_name(name: &str) -> Result<EventKind, ShowcaseError> {
    EventKind::parse(name)
        .ok_or_else(|| ShowcaseError::with_detail(ErrorKind::InvalidEventRegistration, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&EngineEvent) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move |_: &EngineEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_event_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::parse(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::parse("SC-enable"), None);
    }

    #[test]
    fn test_unknown_name_rejected() {
        let bus = EventBus::new();
        let err = bus.on("explode", |_| {}).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidEventRegistration);
        assert!(err.message.contains("explode"));
        assert!(bus.off(Some("explode"), None).is_err());
    }

    #[test]
    fn test_emit_reaches_matching_handlers_only() {
        let bus = EventBus::new();
        let (enabled, on_enable) = counter();
        let (disabled, on_disable) = counter();
        bus.on("enable", on_enable).unwrap();
        bus.on("disable", on_disable).unwrap();

        bus.emit(&EngineEvent::Enable);
        bus.emit(&EngineEvent::Enable);

        assert_eq!(enabled.load(Ordering::SeqCst), 2);
        assert_eq!(disabled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_once_fires_once() {
        let bus = EventBus::new();
        let (count, handler) = counter();
        bus.once(EventKind::Disable, handler);

        bus.emit(&EngineEvent::Disable);
        bus.emit(&EngineEvent::Disable);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_count(EventKind::Disable), 0);
    }

    #[test]
    fn test_off_variants() {
        let bus = EventBus::new();
        let (count, handler) = counter();
        let id = bus.on("resize", handler).unwrap();
        bus.on("resize", |_| {}).unwrap();
        bus.on("error", |_| {}).unwrap();

        bus.off(Some("resize"), Some(id)).unwrap();
        bus.emit(&EngineEvent::Resize);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.handler_count(EventKind::Resize), 1);

        bus.off(Some("resize"), None).unwrap();
        assert_eq!(bus.handler_count(EventKind::Resize), 0);

        bus.off(None, None).unwrap();
        assert_eq!(bus.handler_count(EventKind::Error), 0);
    }

    #[test]
    fn test_handler_may_reenter_bus() {
        let bus = Arc::new(EventBus::new());
        let inner = bus.clone();
        bus.on("disable", move |_| {
            inner.emit(&EngineEvent::Resize);
        })
        .unwrap();
        let (count, handler) = counter();
        bus.on("resize", handler).unwrap();

        bus.emit(&EngineEvent::Disable);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
