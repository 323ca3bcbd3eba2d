//! Lifecycle Controller
//!
//! [`Showcase`] owns the single presentation session: the state machine,
//! the bound target collection, the option set for the current load, the
//! timers and the size cache. Every other module is a pure helper that this
//! one sequences.
//!
//! # State machine
//!
//! ```text
//!             show                 load settled
//! Disabled ─────────> Enabling ──> Busy ─────────────> Enabled
//!    ^                               ^  \                 │  │
//!    │                      navigate │   \ failsafe click │  │ close
//!    │                               └────\───────────────┘  │
//!    │         fade settled                v                 v
//!    └──────────────────────────────── Unloading <───────────┘
//! ```
//!
//! # Concurrency
//!
//! Every pipeline step runs on the tokio runtime. State lives behind one
//! mutex that is never held across an `.await` or while notifying handlers.
//! Each load is stamped with a generation; a continuation whose generation
//! is no longer current drops its result instead of mutating the session.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use parking_lot::{Mutex, RwLock};

use crate::config::EngineConfig;
use crate::error::{ErrorChannel, ErrorKind, Result, ShowcaseError};
use crate::events::{EngineEvent, EventBus, SubscriptionId};
use crate::geometry::{
    self, Axis, FrameProbe, FrameSize, ScaleContext, ScaleMode, Size, TransitionProperty,
    TransitionScope, TransitionTracker, TransitionWait,
};
use crate::host::{Chrome, ContentHandle, HostSurface, OverlayState};
use crate::loader::{self, LoadOutcome, LoadRequest, Prepared};
use crate::navigation::{Direction, Navigator};
use crate::options::{OptionOverrides, Options};
use crate::popup::ActivePopup;
use crate::target::Target;
use crate::timers::{TimerPurpose, TimerSlots};

/// Lifecycle state of the session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Nothing displayed
    Disabled,
    /// A load was accepted and the overlay is being shown
    Enabling,
    /// Content is displayed and idle
    Enabled,
    /// A load pipeline is running
    Busy,
    /// Closing, waiting for the fade to settle
    Unloading,
}

impl LifecycleState {
    /// Whether new loads and unforced closes are refused
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Enabling | Self::Busy | Self::Unloading)
    }
}

/// Keys the engine reacts to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// Close
    Escape,
    /// Navigate left
    ArrowLeft,
    /// Navigate right
    ArrowRight,
    /// Confirm the displayed popup
    Enter,
    /// Anything else
    Other,
}

/// Readiness gate awaited before loading starts
///
/// An `Err` carrying a message shows that message in an alert; an empty
/// message closes the showcase.
pub type Gate = BoxFuture<'static, std::result::Result<(), String>>;

/// Completion callback, invoked once when a load settles
pub type Completion = Box<dyn FnOnce() + Send>;

/// A request to present a collection of targets
pub struct ShowRequest {
    targets: Vec<Target>,
    overrides: OptionOverrides,
    options_error: Option<ShowcaseError>,
    gate: Option<Gate>,
    on_complete: Option<Completion>,
}

impl ShowRequest {
    /// Present `targets`, starting at `currentIndex`
    pub fn new(targets: impl IntoIterator<Item = Target>) -> Self {
        Self {
            targets: targets.into_iter().collect(),
            overrides: OptionOverrides::default(),
            options_error: None,
            gate: None,
            on_complete: None,
        }
    }

    /// Typed per-call options
    #[must_use]
    pub fn options(mut self, overrides: OptionOverrides) -> Self {
        self.overrides = overrides;
        self.options_error = None;
        self
    }

    /// Untyped per-call options
    ///
    /// A value that is not a key/value map is reported as `InvalidOptions`
    /// when the request is shown, and no overrides apply.
    #[must_use]
    pub fn options_value(mut self, value: serde_json::Value) -> Self {
        match OptionOverrides::from_value(value) {
            Ok(overrides) => {
                self.overrides = overrides;
                self.options_error = None;
            }
            Err(e) => {
                self.overrides = OptionOverrides::default();
                self.options_error = Some(e);
            }
        }
        self
    }

    /// Wait for `gate` before loading
    #[must_use]
    pub fn gate<F>(mut self, gate: F) -> Self
    where
        F: Future<Output = std::result::Result<(), String>> + Send + 'static,
    {
        self.gate = Some(gate.boxed());
        self
    }

    /// Invoke `callback` once the content is displayed
    #[must_use]
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for ShowRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShowRequest")
            .field("targets", &self.targets)
            .field("overrides", &self.overrides)
            .field("gated", &self.gate.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

struct State {
    lifecycle: LifecycleState,
    generation: u64,
    targets: Vec<Target>,
    nav: Navigator,
    options: Options,
    content: Option<ContentHandle>,
    info: Option<String>,
    scale: Option<ScaleContext>,
    size_cache: HashMap<String, Size>,
    on_complete: Option<Completion>,
    expire_pending: f64,
    failsafe_engaged: bool,
    defer_reset: bool,
    shown_once: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleState::Disabled,
            generation: 0,
            targets: Vec::new(),
            nav: Navigator::default(),
            options: Options::default(),
            content: None,
            info: None,
            scale: None,
            size_cache: HashMap::new(),
            on_complete: None,
            expire_pending: 0.0,
            failsafe_engaged: false,
            defer_reset: false,
            shown_once: false,
        }
    }
}

impl State {
    fn closable(&self, force: bool) -> bool {
        match self.lifecycle {
            LifecycleState::Disabled => false,
            state if state.is_busy() => force,
            _ => true,
        }
    }

    fn chrome(&self) -> Chrome {
        Chrome {
            loading: false,
            close: true,
            navigation: self.nav.is_enabled(),
            info: self.info.clone(),
        }
    }
}

pub(crate) struct Inner {
    pub(crate) host: Arc<dyn HostSurface>,
    config: EngineConfig,
    state: Mutex<State>,
    pub(crate) events: EventBus,
    errors: ErrorChannel,
    timers: TimerSlots,
    transitions: Mutex<TransitionTracker>,
    pub(crate) defaults: RwLock<Options>,
    pub(crate) popup: Mutex<Option<ActivePopup>>,
}

/// Handle to the presentation session
///
/// Cheap to clone; every clone drives the same session.
#[derive(Clone)]
pub struct Showcase {
    pub(crate) inner: Arc<Inner>,
}

/// Applies tentative sizes through the host and restores the frame after
struct HostProbe<'a> {
    host: &'a dyn HostSurface,
}

impl FrameProbe for HostProbe<'_> {
    fn probe(&mut self, tentative: Size) -> Size {
        let previous = self.host.frame_limits();
        self.host
            .apply_frame(FrameSize::px(tentative.width, tentative.height), false);
        let rendered = self.host.rendered_frame();
        self.host.apply_frame(previous, false);
        rendered
    }
}

impl Showcase {
    /// Create the session
    ///
    /// Defaults from `config` are applied over the built-in option set; each
    /// rejected entry is reported and dropped.
    ///
    /// # Errors
    ///
    /// In strict mode, the first rejected default is returned.
    pub fn new(host: Arc<dyn HostSurface>, config: EngineConfig) -> Result<Self> {
        let mut defaults = Options::default();
        let rejected = defaults.apply_map(config.defaults.clone());

        let showcase = Self {
            inner: Arc::new(Inner {
                host,
                errors: ErrorChannel::new(config.strict),
                config,
                state: Mutex::new(State::default()),
                events: EventBus::new(),
                timers: TimerSlots::new(),
                transitions: Mutex::new(TransitionTracker::new()),
                defaults: RwLock::new(defaults),
                popup: Mutex::new(None),
            }),
        };

        for entry in rejected {
            showcase.report(entry.into_error())?;
        }

        tracing::debug!(
            strict = showcase.inner.config.strict,
            source = %showcase.inner.config.source(),
            "showcase created"
        );
        Ok(showcase)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.inner.state.lock().lifecycle
    }

    /// Whether a load or close is in progress
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    /// Index of the active target
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.inner.state.lock().nav.index()
    }

    /// Number of bound targets
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.inner.state.lock().targets.len()
    }

    /// Attached content, if any
    #[must_use]
    pub fn current_content(&self) -> Option<ContentHandle> {
        self.inner.state.lock().content
    }

    /// Options the current load was started with
    #[must_use]
    pub fn options(&self) -> Options {
        self.inner.state.lock().options.clone()
    }

    /// Scaling state kept for viewport resizes
    #[must_use]
    pub fn scale_context(&self) -> Option<ScaleContext> {
        self.inner.state.lock().scale
    }

    /// Cached natural size for a data source
    #[must_use]
    pub fn cached_size(&self, source: &str) -> Option<Size> {
        self.inner.state.lock().size_cache.get(source).copied()
    }

    /// `"{code} - {message}"` of the most recent error, empty if none
    #[must_use]
    pub fn last_error(&self) -> String {
        self.inner.errors.last_message()
    }

    /// The most recent error
    #[must_use]
    pub fn last_error_kind(&self) -> Option<ErrorKind> {
        self.inner.errors.last().map(|e| e.kind)
    }

    /// Whether the click guard is engaged for the running load
    #[must_use]
    pub fn failsafe_engaged(&self) -> bool {
        self.inner.state.lock().failsafe_engaged
    }

    /// Frame transition properties still awaited
    #[must_use]
    pub fn pending_transitions(&self) -> BTreeSet<TransitionProperty> {
        let tracker = self.inner.transitions.lock();
        let mut pending = tracker.remaining(TransitionScope::Frame);
        pending.extend(tracker.remaining(TransitionScope::Overlay));
        pending
    }

    /// Engine configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Notification registry
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    // ========================================================================
    // Defaults and subscriptions
    // ========================================================================

    /// Merge entries into the process-wide defaults
    ///
    /// Unknown keys report `InvalidDefaultKey` and are dropped; the remaining
    /// entries still apply.
    ///
    /// # Errors
    ///
    /// In strict mode, the first rejected entry is returned.
    pub fn set_defaults(&self, entries: serde_json::Map<String, serde_json::Value>) -> Result<()> {
        let rejected = self.inner.defaults.write().apply_map(entries);
        for entry in rejected {
            self.report(entry.into_error())?;
        }
        Ok(())
    }

    /// Restore the built-in defaults
    pub fn reset_defaults(&self) {
        *self.inner.defaults.write() = Options::default();
        tracing::debug!("defaults reset");
    }

    /// Current process-wide defaults
    #[must_use]
    pub fn defaults(&self) -> Options {
        self.inner.defaults.read().clone()
    }

    /// Register a handler by event name
    ///
    /// Unknown names are reported and the registration is ignored
    /// (`Ok(None)`).
    ///
    /// # Errors
    ///
    /// In strict mode, unknown names return `InvalidEventRegistration`.
    pub fn on<F>(&self, name: &str, handler: F) -> Result<Option<SubscriptionId>>
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        match self.inner.events.on(name, handler) {
            Ok(id) => Ok(Some(id)),
            Err(e) => self.report(e).map(|()| None),
        }
    }

    /// Remove handlers (see [`EventBus::off`])
    ///
    /// # Errors
    ///
    /// In strict mode, unknown names return `InvalidEventRegistration`.
    pub fn off(&self, name: Option<&str>, id: Option<SubscriptionId>) -> Result<()> {
        match self.inner.events.off(name, id) {
            Ok(()) => Ok(()),
            Err(e) => self.report(e),
        }
    }

    pub(crate) fn report(&self, error: ShowcaseError) -> Result<()> {
        self.inner.errors.report(error, &self.inner.events)
    }

    // ========================================================================
    // Open
    // ========================================================================

    /// Present a collection of targets
    ///
    /// Returns `Ok(true)` when the load was accepted. A request made while
    /// another load is in flight is rejected with `BusyConflict`; an empty
    /// collection is ignored.
    ///
    /// # Errors
    ///
    /// In strict mode, reported errors are returned.
    pub fn show(&self, request: ShowRequest) -> Result<bool> {
        self.show_with(request, false)
    }

    pub(crate) fn show_with(&self, request: ShowRequest, forced: bool) -> Result<bool> {
        let ShowRequest {
            targets,
            overrides,
            options_error,
            gate,
            on_complete,
        } = request;

        if let Some(e) = options_error {
            self.report(e)?;
        }

        if targets.is_empty() {
            tracing::debug!("show ignored: no targets");
            return Ok(false);
        }

        let options = self.inner.defaults.read().merged(&overrides);
        match self.begin_load(targets, options, on_complete, forced) {
            Some(generation) => {
                self.spawn_load(generation, gate);
                Ok(true)
            }
            None => {
                tracing::debug!("show rejected: busy");
                self.report(ShowcaseError::new(ErrorKind::BusyConflict))?;
                Ok(false)
            }
        }
    }

    /// Re-display the last content, or greet if nothing was ever shown
    ///
    /// # Errors
    ///
    /// In strict mode, errors from the greeting alert are returned.
    pub fn enable(&self) -> Result<bool> {
        let resumed = {
            let mut state = self.inner.state.lock();
            if state.lifecycle != LifecycleState::Disabled {
                return Ok(false);
            }
            if state.shown_once {
                state.lifecycle = LifecycleState::Enabled;
                Some((state.chrome(), state.content, state.options.fade))
            } else {
                None
            }
        };

        let Some((chrome, content, fade)) = resumed else {
            return self.alert("Hello!", None, None, 0.0);
        };

        let host = &self.inner.host;
        host.set_overlay(OverlayState::Visible { fade });
        host.set_chrome(&chrome);
        if let Some(handle) = content {
            host.set_content_visible(handle, true);
        }
        tracing::debug!("showcase re-enabled");
        self.inner.events.emit(&EngineEvent::Enable);
        Ok(true)
    }

    /// Start a load; `None` if one is in flight and `forced` is not set
    fn begin_load(
        &self,
        targets: Vec<Target>,
        options: Options,
        on_complete: Option<Completion>,
        forced: bool,
    ) -> Option<u64> {
        let host = &self.inner.host;

        let (generation, previous, was_disabled) = {
            let mut state = self.inner.state.lock();
            if state.lifecycle.is_busy() && !forced {
                return None;
            }
            let was_disabled = state.lifecycle == LifecycleState::Disabled;

            state.lifecycle = LifecycleState::Enabling;
            state.generation += 1;
            state.nav = Navigator::bind(targets.len(), options.current_index);
            state.targets = targets;
            state.expire_pending = options.expire;
            state.on_complete = on_complete;
            state.failsafe_engaged = false;
            state.defer_reset = false;
            state.shown_once = true;
            state.scale = None;
            state.info = None;
            state.options = options;
            (state.generation, state.content.take(), was_disabled)
        };

        self.dismiss_popup();
        self.inner.timers.clear(TimerPurpose::Expire);
        self.inner.timers.clear(TimerPurpose::Retry);
        self.inner.transitions.lock().cancel_all();
        host.set_expiry_progress(None);

        let (fade, control_text) = {
            let state = self.inner.state.lock();
            (state.options.fade, state.options.control_text.clone())
        };
        host.set_control_text(&control_text);

        tracing::debug!(generation, forced, "showcase enabling");
        self.inner.events.emit(&EngineEvent::Enable);

        {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                return Some(generation);
            }
            state.lifecycle = LifecycleState::Busy;
        }

        host.set_overlay(OverlayState::Visible { fade });
        host.set_chrome(&Chrome::loading());
        if let Some(handle) = previous {
            host.detach(handle);
        }
        if was_disabled {
            host.apply_frame(FrameSize::zero(), false);
        }

        self.arm_failsafe(generation, self.inner.config.enable_failsafe_delay);
        Some(generation)
    }

    fn spawn_load(&self, generation: u64, gate: Option<Gate>) {
        let this = self.clone();
        tokio::spawn(async move {
            if let Some(gate) = gate {
                if let Err(message) = gate.await {
                    this.abort(generation, message);
                    return;
                }
            }
            this.load_task(generation, 0).await;
        });
    }

    fn load_task(&self, generation: u64, attempt: u32) -> BoxFuture<'static, ()> {
        let this = self.clone();
        async move { this.run_load(generation, attempt).await }.boxed()
    }

    async fn run_load(&self, generation: u64, attempt: u32) {
        self.inner.timers.clear(TimerPurpose::Retry);

        loop {
            let Some(request) = self.snapshot(generation, attempt) else {
                tracing::trace!(generation, "load superseded before start");
                return;
            };
            tracing::debug!(
                generation,
                attempt,
                class = ?request.class,
                "loading target"
            );

            let outcome = loader::load(self.inner.host.as_ref(), &request).await;
            if !self.is_current(generation) {
                tracing::trace!(generation, "stale load result dropped");
                return;
            }

            match outcome {
                LoadOutcome::Redirect(target) => {
                    let mut state = self.inner.state.lock();
                    let index = state.nav.index();
                    if let Some(slot) = state.targets.get_mut(index) {
                        *slot = target;
                    }
                }
                LoadOutcome::RetryLater => {
                    self.schedule_retry(generation, attempt + 1);
                    return;
                }
                LoadOutcome::Failed(error) => {
                    self.load_failed(generation, error);
                    return;
                }
                LoadOutcome::Ready(prepared) => {
                    self.finish_load(generation, prepared).await;
                    return;
                }
            }
        }
    }

    fn snapshot(&self, generation: u64, attempt: u32) -> Option<LoadRequest> {
        let (target, options, cached) = {
            let state = self.inner.state.lock();
            if state.generation != generation {
                return None;
            }
            let target = state.targets.get(state.nav.index())?.clone();
            let cached = target
                .data_source()
                .and_then(|source| state.size_cache.get(source).copied());
            (target, state.options.clone(), cached)
        };
        let class = target.classify(self.inner.host.as_ref());
        Some(LoadRequest {
            target,
            class,
            cached,
            attempt,
            options,
        })
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.state.lock().generation == generation
    }

    fn schedule_retry(&self, generation: u64, attempt: u32) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.timers.arm(
            TimerPurpose::Retry,
            self.inner.config.image_retry_delay,
            async move {
                if let Some(inner) = weak.upgrade() {
                    Showcase { inner }.load_task(generation, attempt).await;
                }
            },
        );
    }

    /// Report a pipeline failure and display it in place of the content
    fn load_failed(&self, generation: u64, error: ShowcaseError) {
        let text = error.display_text();
        if let Err(e) = self.report(error) {
            tracing::debug!(error = %e, "strict mode: closing after load failure");
            self.close_with(true, true);
            return;
        }

        let (mut options, callback) = {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                return;
            }
            (state.options.clone(), state.on_complete.take())
        };
        options.current_index = 0;

        let markup = format!("<p>An error has occurred:<br>{text}</p>");
        if let Some(generation) =
            self.begin_load(vec![Target::markup(markup)], options, callback, true)
        {
            self.spawn_load(generation, None);
        }
    }

    fn abort(&self, generation: u64, message: String) {
        if !self.is_current(generation) {
            return;
        }
        tracing::debug!(generation, %message, "load gate rejected");
        if message.is_empty() {
            self.close_with(true, true);
        } else if let Err(e) = self.open_alert(&message, true) {
            tracing::debug!(error = %e, "abort alert failed");
        }
    }

    async fn finish_load(&self, generation: u64, prepared: Prepared) {
        let host = &self.inner.host;

        let (options, previous, index) = {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                return;
            }
            let previous = if std::mem::take(&mut state.defer_reset) {
                state.content.take()
            } else {
                None
            };
            let index = state.nav.index();
            state.info = state
                .targets
                .get(index)
                .and_then(|t| t.info.clone())
                .or_else(|| state.options.info_content.clone());
            (state.options.clone(), previous, index)
        };

        if let Some(handle) = previous {
            host.detach(handle);
        }
        let handle = host.attach(&prepared.content);
        host.set_content_visible(handle, false);

        let mode = if options.scale_media && prepared.scalable {
            Some(ScaleMode::Natural)
        } else if options.force_scaling {
            Some(ScaleMode::Forced)
        } else {
            None
        };
        if mode != Some(ScaleMode::Natural) {
            self.fix_extents(&options);
        }

        let natural = prepared.natural.unwrap_or_else(|| host.measure(handle));
        let resolution = geometry::resolve(
            natural,
            &options,
            mode,
            host.viewport(),
            &mut HostProbe {
                host: host.as_ref(),
            },
        );

        {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                drop(state);
                host.detach(handle);
                return;
            }
            state.content = Some(handle);
            state.scale = resolution.scale;
            if let Some((source, size)) = prepared.cache {
                state.size_cache.insert(source, size);
            }
        }

        tracing::debug!(
            generation,
            index,
            width = %resolution.size.width,
            height = %resolution.size.height,
            scaled = resolution.scale.is_some(),
            "content attached"
        );
        self.inner.events.emit(&EngineEvent::Resize);

        let wait = self.apply_dimensions(resolution.size, options.animate);
        let outcome = wait
            .settled_within(self.inner.config.transition_timeout)
            .await;
        tracing::trace!(generation, ?outcome, "load geometry settled");

        self.complete(generation);
    }

    /// Fix the content box for numeric options outside natural scaling
    fn fix_extents(&self, options: &Options) {
        let host = &self.inner.host;
        let viewport = host.viewport();
        let min = host.declared_min();

        if let Some(width) = options.width.px() {
            let (px, min_override) = geometry::clamp_request(width, viewport.width, min.width);
            host.set_content_extent(Axis::Width, px, min_override);
        }
        if let Some(height) = options.height.px() {
            let (px, min_override) = geometry::clamp_request(height, viewport.height, min.height);
            host.set_content_extent(Axis::Height, px, min_override);
        }
    }

    fn complete(&self, generation: u64) {
        let (chrome, content, callback, expire) = {
            let mut state = self.inner.state.lock();
            if state.generation != generation || state.lifecycle != LifecycleState::Busy {
                return;
            }
            state.lifecycle = LifecycleState::Enabled;
            state.failsafe_engaged = false;
            (
                state.chrome(),
                state.content,
                state.on_complete.take(),
                std::mem::take(&mut state.expire_pending),
            )
        };

        self.inner.timers.clear(TimerPurpose::Failsafe);
        let host = &self.inner.host;
        host.set_chrome(&chrome);
        if let Some(handle) = content {
            host.set_content_visible(handle, true);
        }
        if expire > 0.0 {
            self.arm_expire(expire);
        }

        tracing::debug!(generation, "showcase enabled");
        if let Some(callback) = callback {
            callback();
        }
    }

    fn arm_expire(&self, secs: f64) {
        let Ok(delay) = Duration::try_from_secs_f64(secs) else {
            tracing::debug!(secs, "expiration out of range, not armed");
            return;
        };
        self.inner.host.set_expiry_progress(Some(delay));
        let weak = Arc::downgrade(&self.inner);
        self.inner
            .timers
            .arm(TimerPurpose::Expire, delay, async move {
                if let Some(inner) = weak.upgrade() {
                    tracing::debug!("expiration elapsed");
                    Showcase { inner }.close(false);
                }
            });
    }

    fn arm_failsafe(&self, generation: u64, delay: Duration) {
        let weak = Arc::downgrade(&self.inner);
        self.inner
            .timers
            .arm(TimerPurpose::Failsafe, delay, async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let mut state = inner.state.lock();
                if state.generation == generation && state.lifecycle == LifecycleState::Busy {
                    state.failsafe_engaged = true;
                    tracing::warn!(generation, "load still running, click guard engaged");
                }
            });
    }

    // ========================================================================
    // Navigate
    // ========================================================================

    /// Step through the bound collection, wrapping at both ends
    ///
    /// Ignored unless the session is enabled with more than one target.
    pub fn navigate(&self, direction: Direction) -> bool {
        let (generation, index, content) = {
            let mut state = self.inner.state.lock();
            if state.lifecycle != LifecycleState::Enabled || !state.nav.is_enabled() {
                tracing::debug!(?direction, state = ?state.lifecycle, "navigate ignored");
                return false;
            }
            let index = state.nav.step(direction);
            state.lifecycle = LifecycleState::Busy;
            state.defer_reset = true;
            state.generation += 1;
            state.scale = None;
            (state.generation, index, state.content)
        };

        // The countdown belongs to the content being replaced
        self.inner.timers.clear(TimerPurpose::Expire);

        let host = &self.inner.host;
        host.set_expiry_progress(None);
        host.set_chrome(&Chrome::loading());
        if let Some(handle) = content {
            host.set_content_visible(handle, false);
        }

        tracing::debug!(generation, ?direction, index, "navigating");
        self.inner
            .events
            .emit(&EngineEvent::Navigate { direction, index });
        self.arm_failsafe(generation, self.inner.config.reinit_failsafe_delay);
        self.spawn_load(generation, None);
        true
    }

    // ========================================================================
    // Close
    // ========================================================================

    /// Close the showcase
    ///
    /// Rejected (returns false) when already disabled, or when a load or
    /// close is in progress and `force` is not set.
    pub fn close(&self, force: bool) -> bool {
        self.close_with(force, false)
    }

    /// User close
    pub fn disable(&self) -> bool {
        self.close(false)
    }

    pub(crate) fn close_with(&self, force: bool, immediate: bool) -> bool {
        if !self.inner.state.lock().closable(force) {
            tracing::debug!(force, "close rejected");
            return false;
        }

        self.inner.timers.clear(TimerPurpose::Expire);
        self.inner.timers.clear(TimerPurpose::Retry);
        self.inner.timers.clear(TimerPurpose::Failsafe);
        self.inner.host.set_expiry_progress(None);

        self.inner.events.emit(&EngineEvent::Disable);

        let (generation, fade) = {
            let mut state = self.inner.state.lock();
            // A handler may have started a new load
            if !state.closable(force) {
                return false;
            }
            state.generation += 1;
            state.lifecycle = LifecycleState::Unloading;
            state.on_complete = None;
            state.failsafe_engaged = false;
            state.defer_reset = false;
            (state.generation, state.options.fade)
        };

        let host = &self.inner.host;
        host.pause_media();
        self.inner.transitions.lock().cancel_all();
        tracing::debug!(generation, force, immediate, "showcase unloading");

        if fade && !immediate {
            host.set_overlay(OverlayState::FadingOut);
            let wait = self.inner.transitions.lock().arm(
                TransitionScope::Overlay,
                BTreeSet::from([TransitionProperty::Opacity]),
            );
            let this = self.clone();
            let timeout = self.inner.config.transition_timeout;
            tokio::spawn(async move {
                wait.settled_within(timeout).await;
                this.finish_close(generation);
            });
        } else {
            self.finish_close(generation);
        }
        true
    }

    fn finish_close(&self, generation: u64) {
        {
            let mut state = self.inner.state.lock();
            if state.generation != generation || state.lifecycle != LifecycleState::Unloading {
                return;
            }
            state.lifecycle = LifecycleState::Disabled;
            state.scale = None;
        }
        let host = &self.inner.host;
        host.set_chrome(&Chrome::hidden());
        host.set_overlay(OverlayState::Disabled);
        tracing::debug!(generation, "showcase disabled");
    }

    // ========================================================================
    // Resize
    // ========================================================================

    /// Start a resize; `None` while a load or close is in progress
    ///
    /// The returned wait is already settled when no axis changes by at
    /// least [`geometry::RESIZE_EPSILON_PX`].
    pub fn begin_resize(&self, size: FrameSize, animate: bool) -> Option<TransitionWait> {
        if self.is_busy() {
            tracing::debug!("resize ignored: busy");
            return None;
        }
        self.inner.events.emit(&EngineEvent::Resize);

        let host = &self.inner.host;
        let changes = geometry::transition_properties(host.frame_limits(), size);
        if animate && !changes.is_empty() {
            host.set_chrome(&Chrome::hidden());
        }
        Some(self.apply_dimensions(size, animate))
    }

    /// Resize and wait for the transition to settle
    ///
    /// Returns false if the resize was ignored.
    pub async fn resize(&self, size: FrameSize, animate: bool) -> bool {
        let Some(wait) = self.begin_resize(size, animate) else {
            return false;
        };
        let animated = !wait.is_ready();
        wait.settled_within(self.inner.config.transition_timeout)
            .await;
        if animated {
            let chrome = {
                let state = self.inner.state.lock();
                (state.lifecycle == LifecycleState::Enabled).then(|| state.chrome())
            };
            if let Some(chrome) = chrome {
                self.inner.host.set_chrome(&chrome);
            }
        }
        true
    }

    /// Window-resize hook: re-fit scaled content to the new viewport
    pub fn viewport_resized(&self) {
        self.inner.events.emit(&EngineEvent::Resize);

        // A running load or close owns the frame wait
        let scale = {
            let state = self.inner.state.lock();
            if state.lifecycle == LifecycleState::Enabled {
                state.scale
            } else {
                None
            }
        };
        let Some(context) = scale else {
            return;
        };

        let mut probe = HostProbe {
            host: self.inner.host.as_ref(),
        };
        if let Some(frame) = geometry::rescale(&context, &mut probe) {
            tracing::trace!(width = %frame.width, height = %frame.height, "rescaled");
            // Unanimated, so the returned wait is already settled
            let _ = self.apply_dimensions(frame, false);
        }
    }

    /// Apply frame limits, tracking the properties that will transition
    fn apply_dimensions(&self, size: FrameSize, animate: bool) -> TransitionWait {
        let host = &self.inner.host;
        let properties = geometry::transition_properties(host.frame_limits(), size);
        let animate = animate && !properties.is_empty();

        let wait = self.inner.transitions.lock().arm(
            TransitionScope::Frame,
            if animate { properties } else { BTreeSet::new() },
        );
        host.apply_frame(size, animate);
        wait
    }

    // ========================================================================
    // Host events
    // ========================================================================

    /// A CSS transition finished; returns true if it settled a wait
    pub fn transition_end(&self, property: TransitionProperty) -> bool {
        self.inner.transitions.lock().observe(property)
    }

    /// A click on the overlay outside the content
    ///
    /// Aborts the running load when the click guard is engaged.
    pub fn boundary_click(&self) -> bool {
        if !self.failsafe_engaged() {
            return false;
        }
        tracing::debug!("boundary click aborts load");
        self.close_with(true, true)
    }

    /// Keyboard input
    pub fn key(&self, key: Key) -> bool {
        if self.state() == LifecycleState::Disabled {
            return false;
        }
        match key {
            Key::Escape => self.close(false),
            Key::ArrowLeft => self.navigate(Direction::Left),
            Key::ArrowRight => self.navigate(Direction::Right),
            Key::Enter => self.popup_button(crate::popup::PopupButton::Confirm),
            Key::Other => false,
        }
    }
}

impl std::fmt::Debug for Showcase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Showcase")
            .field("state", &state.lifecycle)
            .field("generation", &state.generation)
            .field("index", &state.nav.index())
            .field("targets", &state.targets.len())
            .field("timers", &self.inner.timers)
            .finish_non_exhaustive()
    }
}
