//! Transition tracking
//!
//! A resize or fade waits for the host to report `transitionend` for each
//! animated property. Waits are keyed sets: every reported property is
//! deleted from the set and the wait settles exactly once, when the set
//! empties. An empty set settles immediately.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Animated property reported by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransitionProperty {
    /// Frame width limit
    MaxWidth,
    /// Frame height limit
    MaxHeight,
    /// Overlay opacity (fade in/out)
    Opacity,
}

impl TransitionProperty {
    /// Element group the property animates on
    #[must_use]
    pub fn scope(self) -> TransitionScope {
        match self {
            Self::MaxWidth | Self::MaxHeight => TransitionScope::Frame,
            Self::Opacity => TransitionScope::Overlay,
        }
    }

    /// CSS property name
    #[must_use]
    pub fn css_name(self) -> &'static str {
        match self {
            Self::MaxWidth => "max-width",
            Self::MaxHeight => "max-height",
            Self::Opacity => "opacity",
        }
    }

    /// Parse a CSS property name
    #[must_use]
    pub fn from_css(name: &str) -> Option<Self> {
        match name {
            "max-width" => Some(Self::MaxWidth),
            "max-height" => Some(Self::MaxHeight),
            "opacity" => Some(Self::Opacity),
            _ => None,
        }
    }
}

/// Independent wait slots; arming a scope replaces its previous wait
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionScope {
    /// Content frame dimensions
    Frame,
    /// Whole overlay
    Overlay,
}

/// How a wait settled
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Every tracked property reported completion (or none were tracked)
    Completed,
    /// A newer wait on the same scope replaced this one
    Superseded,
    /// The configured transition timeout elapsed first
    TimedOut,
}

/// A settle-once transition signal
#[derive(Debug)]
pub struct TransitionWait {
    inner: WaitInner,
}

#[derive(Debug)]
enum WaitInner {
    Ready(TransitionOutcome),
    Pending(oneshot::Receiver<TransitionOutcome>),
}

impl TransitionWait {
    /// An already-settled wait
    #[must_use]
    pub fn ready() -> Self {
        Self {
            inner: WaitInner::Ready(TransitionOutcome::Completed),
        }
    }

    /// Whether the wait settled without any suspension
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.inner, WaitInner::Ready(_))
    }

    /// Wait for the transition to settle
    pub async fn settled(self) -> TransitionOutcome {
        match self.inner {
            WaitInner::Ready(outcome) => outcome,
            // A dropped sender means the tracker was torn down
            WaitInner::Pending(rx) => rx.await.unwrap_or(TransitionOutcome::Superseded),
        }
    }

    /// Wait, giving up after `timeout` (`None` waits indefinitely)
    pub async fn settled_within(self, timeout: Option<Duration>) -> TransitionOutcome {
        match timeout {
            Some(limit) if !self.is_ready() => tokio::time::timeout(limit, self.settled())
                .await
                .unwrap_or(TransitionOutcome::TimedOut),
            _ => self.settled().await,
        }
    }
}

struct PendingWait {
    remaining: BTreeSet<TransitionProperty>,
    done: oneshot::Sender<TransitionOutcome>,
}

/// Keyed transition waits, one per scope
#[derive(Default)]
pub struct TransitionTracker {
    pending: HashMap<TransitionScope, PendingWait>,
}

impl TransitionTracker {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for `properties` on `scope`
    ///
    /// Any earlier wait on the same scope settles as `Superseded`.
    pub fn arm(
        &mut self,
        scope: TransitionScope,
        properties: BTreeSet<TransitionProperty>,
    ) -> TransitionWait {
        if let Some(previous) = self.pending.remove(&scope) {
            let _ = previous.done.send(TransitionOutcome::Superseded);
        }

        if properties.is_empty() {
            return TransitionWait::ready();
        }

        let (done, rx) = oneshot::channel();
        self.pending.insert(
            scope,
            PendingWait {
                remaining: properties,
                done,
            },
        );
        TransitionWait {
            inner: WaitInner::Pending(rx),
        }
    }

    /// Record a `transitionend` report
    ///
    /// Returns true if this report settled a wait. Properties that are not
    /// tracked are ignored.
    pub fn observe(&mut self, property: TransitionProperty) -> bool {
        let scope = property.scope();
        let Some(wait) = self.pending.get_mut(&scope) else {
            return false;
        };

        wait.remaining.remove(&property);
        if !wait.remaining.is_empty() {
            return false;
        }

        if let Some(wait) = self.pending.remove(&scope) {
            let _ = wait.done.send(TransitionOutcome::Completed);
        }
        true
    }

    /// Whether a wait is outstanding on `scope`
    #[must_use]
    pub fn is_pending(&self, scope: TransitionScope) -> bool {
        self.pending.contains_key(&scope)
    }

    /// Properties still outstanding on `scope`
    #[must_use]
    pub fn remaining(&self, scope: TransitionScope) -> BTreeSet<TransitionProperty> {
        self.pending
            .get(&scope)
            .map(|w| w.remaining.clone())
            .unwrap_or_default()
    }

    /// Settle every outstanding wait as `Superseded`
    pub fn cancel_all(&mut self) {
        for (_, wait) in self.pending.drain() {
            let _ = wait.done.send(TransitionOutcome::Superseded);
        }
    }
}

impl std::fmt::Debug for TransitionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending: Vec<_> = self
            .pending
            .iter()
            .map(|(scope, w)| (*scope, w.remaining.clone()))
            .collect();
        f.debug_struct("TransitionTracker")
            .field("pending", &pending)
            .finish()
    }
}
