//! Host Test Utilities
//!
//! A recording [`MockHost`] for driving the engine without a document. It
//! keeps every call the engine makes so tests can assert on attach/detach
//! order, applied frame sizes and chrome state.
//!
//! # Usage
//!
//! ```ignore
//! use showcase_core::test_utils::MockHost;
//!
//! let host = MockHost::new();
//! host.set_natural("<p>Hi</p>", Size::new(200.0, 50.0));
//!
//! // Keep image loads pending until time advances
//! host.set_image_delay(Duration::from_secs(10));
//!
//! // After the test, verify what the engine asked for
//! assert_eq!(host.image_loads().len(), 1);
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::geometry::{Axis, Dimension, FrameSize, MinOverride, Size};
use crate::host::{
    Chrome, Content, ContentHandle, FragmentRequest, HostError, HostSurface, ImageLoadError,
    ImageState, MediaReadiness, NodeRef, OverlayState,
};
use crate::options::ControlText;

// ============================================================================
// Recorded State
// ============================================================================

/// Size used for content without an explicit natural size
pub const DEFAULT_NATURAL: Size = Size::new(320.0, 240.0);

/// Viewport used unless overridden
pub const DEFAULT_VIEWPORT: Size = Size::new(1280.0, 800.0);

struct MockState {
    next_handle: u64,
    attached: BTreeMap<ContentHandle, Content>,
    visible: HashMap<ContentHandle, bool>,
    detached: Vec<ContentHandle>,
    naturals: HashMap<String, Size>,
    images: HashMap<NodeRef, ImageState>,
    media: HashMap<NodeRef, MediaReadiness>,
    media_waiters: HashMap<NodeRef, Vec<oneshot::Sender<Result<(), HostError>>>>,
    image_results: VecDeque<Result<Size, ImageLoadError>>,
    image_delay: Duration,
    image_loads: Vec<String>,
    fragment_result: Result<String, HostError>,
    fragments: Vec<FragmentRequest>,
    viewport: Size,
    container: Option<Size>,
    frame: FrameSize,
    frames: Vec<(FrameSize, bool)>,
    declared_min: Size,
    extents: Vec<(Axis, f64, MinOverride)>,
    overlay: OverlayState,
    chrome: Chrome,
    control_text: Option<ControlText>,
    expiry: Option<Duration>,
    inputs: Vec<String>,
    pauses: usize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            next_handle: 0,
            attached: BTreeMap::new(),
            visible: HashMap::new(),
            detached: Vec::new(),
            naturals: HashMap::new(),
            images: HashMap::new(),
            media: HashMap::new(),
            media_waiters: HashMap::new(),
            image_results: VecDeque::new(),
            image_delay: Duration::ZERO,
            image_loads: Vec::new(),
            fragment_result: Ok("<div>fragment</div>".to_string()),
            fragments: Vec::new(),
            viewport: DEFAULT_VIEWPORT,
            container: None,
            frame: FrameSize::zero(),
            frames: Vec::new(),
            declared_min: Size::new(50.0, 50.0),
            extents: Vec::new(),
            overlay: OverlayState::Disabled,
            chrome: Chrome::hidden(),
            control_text: None,
            expiry: None,
            inputs: Vec::new(),
            pauses: 0,
        }
    }
}

/// Key a content's natural size is registered under
#[must_use]
pub fn content_key(content: &Content) -> String {
    match content {
        Content::Node { node, .. } => node.to_string(),
        Content::Image { source } | Content::Video { source, .. } | Content::Fragment { source, .. } => {
            source.clone()
        }
        Content::Markup { markup, .. } => markup.clone(),
    }
}

// ============================================================================
// Mock Host
// ============================================================================

/// Recording host surface
///
/// The frame renders at the applied limits, clamped to the container size
/// (the viewport unless set otherwise). Transitions never report on their
/// own; tests call the engine's `transition_end` entry point.
#[derive(Default)]
pub struct MockHost {
    state: Mutex<MockState>,
}

impl std::fmt::Debug for MockHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockHost")
            .field("attached", &state.attached.len())
            .field("frame", &state.frame)
            .field("overlay", &state.overlay)
            .finish()
    }
}

impl MockHost {
    /// Create a host with default viewport and sizes
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Natural size reported for content with this key (see [`content_key`])
    pub fn set_natural(&self, key: impl Into<String>, size: Size) {
        self.state.lock().naturals.insert(key.into(), size);
    }

    /// Decode state of an embedded image
    pub fn set_image(&self, node: NodeRef, image: ImageState) {
        self.state.lock().images.insert(node, image);
    }

    /// Readiness of embedded media
    pub fn set_media(&self, node: NodeRef, readiness: MediaReadiness) {
        self.state.lock().media.insert(node, readiness);
    }

    /// Settle a pending `media_ready` wait
    pub fn resolve_media(&self, node: NodeRef, result: Result<(), HostError>) {
        let waiters = {
            let mut state = self.state.lock();
            state.media.insert(
                node,
                if result.is_ok() {
                    MediaReadiness::HaveData
                } else {
                    MediaReadiness::Failed
                },
            );
            state.media_waiters.remove(&node).unwrap_or_default()
        };
        for tx in waiters {
            let _ = tx.send(result.clone());
        }
    }

    /// Queue the result of the next image load (default: decoded at its natural size)
    pub fn push_image_result(&self, result: Result<Size, ImageLoadError>) {
        self.state.lock().image_results.push_back(result);
    }

    /// Delay every image load by `delay`
    pub fn set_image_delay(&self, delay: Duration) {
        self.state.lock().image_delay = delay;
    }

    /// Result of every fragment fetch
    pub fn set_fragment_result(&self, result: Result<String, HostError>) {
        self.state.lock().fragment_result = result;
    }

    /// Viewport size
    pub fn set_viewport(&self, viewport: Size) {
        self.state.lock().viewport = viewport;
    }

    /// Limit the rendered frame below the viewport
    pub fn set_container(&self, container: Size) {
        self.state.lock().container = Some(container);
    }

    /// Stylesheet minimum content size
    pub fn set_declared_min(&self, min: Size) {
        self.state.lock().declared_min = min;
    }

    /// Values returned for input controls
    pub fn set_inputs(&self, values: Vec<String>) {
        self.state.lock().inputs = values;
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Currently attached content, in attach order
    #[must_use]
    pub fn attached(&self) -> Vec<(ContentHandle, Content)> {
        self.state
            .lock()
            .attached
            .iter()
            .map(|(h, c)| (*h, c.clone()))
            .collect()
    }

    /// Whether attached content is visible
    #[must_use]
    pub fn is_visible(&self, handle: ContentHandle) -> bool {
        self.state.lock().visible.get(&handle).copied().unwrap_or(false)
    }

    /// Handles removed so far, in order
    #[must_use]
    pub fn detached(&self) -> Vec<ContentHandle> {
        self.state.lock().detached.clone()
    }

    /// Sources passed to `load_image`
    #[must_use]
    pub fn image_loads(&self) -> Vec<String> {
        self.state.lock().image_loads.clone()
    }

    /// Fragment requests made
    #[must_use]
    pub fn fragments(&self) -> Vec<FragmentRequest> {
        self.state.lock().fragments.clone()
    }

    /// Current frame limits
    #[must_use]
    pub fn frame(&self) -> FrameSize {
        self.state.lock().frame
    }

    /// Every `apply_frame` call with its animate flag
    #[must_use]
    pub fn frames(&self) -> Vec<(FrameSize, bool)> {
        self.state.lock().frames.clone()
    }

    /// Every `set_content_extent` call
    #[must_use]
    pub fn extents(&self) -> Vec<(Axis, f64, MinOverride)> {
        self.state.lock().extents.clone()
    }

    /// Current overlay state
    #[must_use]
    pub fn overlay(&self) -> OverlayState {
        self.state.lock().overlay
    }

    /// Current chrome state
    #[must_use]
    pub fn chrome(&self) -> Chrome {
        self.state.lock().chrome.clone()
    }

    /// Last control titles applied
    #[must_use]
    pub fn control_text(&self) -> Option<ControlText> {
        self.state.lock().control_text.clone()
    }

    /// Expiration progress currently shown
    #[must_use]
    pub fn expiry(&self) -> Option<Duration> {
        self.state.lock().expiry
    }

    /// Number of `pause_media` calls
    #[must_use]
    pub fn pauses(&self) -> usize {
        self.state.lock().pauses
    }

    fn rendered(state: &MockState) -> Size {
        let limit = state.container.unwrap_or(state.viewport);
        let axis = |dim: Dimension, limit: f64| match dim {
            Dimension::Px(v) => v.min(limit),
            Dimension::Auto | Dimension::Full => limit,
        };
        Size::new(
            axis(state.frame.width, limit.width),
            axis(state.frame.height, limit.height),
        )
    }
}

#[async_trait]
impl HostSurface for MockHost {
    fn attach(&self, content: &Content) -> ContentHandle {
        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = ContentHandle(state.next_handle);
        state.attached.insert(handle, content.clone());
        state.visible.insert(handle, true);
        handle
    }

    fn detach(&self, handle: ContentHandle) {
        let mut state = self.state.lock();
        if state.attached.remove(&handle).is_some() {
            state.visible.remove(&handle);
            state.detached.push(handle);
        }
    }

    fn set_content_visible(&self, handle: ContentHandle, visible: bool) {
        let mut state = self.state.lock();
        if state.attached.contains_key(&handle) {
            state.visible.insert(handle, visible);
        }
    }

    fn measure(&self, handle: ContentHandle) -> Size {
        let state = self.state.lock();
        state
            .attached
            .get(&handle)
            .map(content_key)
            .and_then(|key| state.naturals.get(&key).copied())
            .unwrap_or(DEFAULT_NATURAL)
    }

    fn set_content_extent(&self, axis: Axis, px: f64, min: MinOverride) {
        self.state.lock().extents.push((axis, px, min));
    }

    fn declared_min(&self) -> Size {
        self.state.lock().declared_min
    }

    fn image_state(&self, node: NodeRef) -> ImageState {
        self.state
            .lock()
            .images
            .get(&node)
            .copied()
            .unwrap_or(ImageState::Pending)
    }

    fn media_readiness(&self, node: NodeRef) -> MediaReadiness {
        self.state
            .lock()
            .media
            .get(&node)
            .copied()
            .unwrap_or(MediaReadiness::HaveData)
    }

    async fn media_ready(&self, node: NodeRef) -> Result<(), HostError> {
        let rx = {
            let mut state = self.state.lock();
            match state.media.get(&node) {
                Some(MediaReadiness::HaveData) | None => return Ok(()),
                Some(MediaReadiness::Failed) => {
                    return Err(HostError::Media("media error".to_string()))
                }
                Some(MediaReadiness::Pending) => {}
            }
            let (tx, rx) = oneshot::channel();
            state.media_waiters.entry(node).or_default().push(tx);
            rx
        };
        rx.await
            .unwrap_or_else(|_| Err(HostError::Media("host dropped".to_string())))
    }

    async fn load_image(&self, source: &str) -> Result<Size, ImageLoadError> {
        let (delay, result) = {
            let mut state = self.state.lock();
            state.image_loads.push(source.to_string());
            let natural = state.naturals.get(source).copied().unwrap_or(DEFAULT_NATURAL);
            let result = state.image_results.pop_front().unwrap_or(Ok(natural));
            (state.image_delay, result)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn fetch_fragment(&self, request: &FragmentRequest) -> Result<String, HostError> {
        let mut state = self.state.lock();
        state.fragments.push(request.clone());
        state.fragment_result.clone()
    }

    fn pause_media(&self) {
        self.state.lock().pauses += 1;
    }

    fn input_values(&self, _handle: ContentHandle) -> Vec<String> {
        self.state.lock().inputs.clone()
    }

    fn viewport(&self) -> Size {
        self.state.lock().viewport
    }

    fn frame_limits(&self) -> FrameSize {
        self.state.lock().frame
    }

    fn rendered_frame(&self) -> Size {
        Self::rendered(&self.state.lock())
    }

    fn apply_frame(&self, size: FrameSize, animate: bool) {
        let mut state = self.state.lock();
        state.frame = size;
        state.frames.push((size, animate));
    }

    fn set_overlay(&self, overlay: OverlayState) {
        self.state.lock().overlay = overlay;
    }

    fn set_chrome(&self, chrome: &Chrome) {
        self.state.lock().chrome = chrome.clone();
    }

    fn set_control_text(&self, text: &ControlText) {
        self.state.lock().control_text = Some(text.clone());
    }

    fn set_expiry_progress(&self, remaining: Option<Duration>) {
        self.state.lock().expiry = remaining;
    }
}
