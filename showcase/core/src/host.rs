//! Host Surface Trait
//!
//! The engine never touches a document directly. A host UI layer implements
//! [`HostSurface`] to attach content, measure it, apply frame sizes, fetch
//! remote data and toggle the overlay chrome.
//!
//! # Contract
//!
//! - Synchronous methods must not call back into the engine; events such as
//!   `transitionend`, boundary clicks and key presses are delivered through
//!   the engine's entry points from the host's own event loop.
//! - `apply_frame` with `animate = true` must eventually report a
//!   `transitionend` for every property whose value actually changed.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Axis, FrameSize, MinOverride, Size};
use crate::options::ControlText;

/// A node that already exists in the host document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef(pub u64);

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Content attached to the display surface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHandle(pub u64);

impl fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "content-{}", self.0)
    }
}

/// Content to attach
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Content {
    /// An existing node, attached as a copy
    Node {
        /// Node to copy
        node: NodeRef,
        /// Deep-clone attached behavior and data
        clone_data: bool,
    },
    /// An image element for a remote source
    Image {
        /// Image URL
        source: String,
    },
    /// A native video element
    Video {
        /// Video URL
        source: String,
        /// MIME subtype (`mp4`, `webm`, ...)
        subtype: String,
    },
    /// Markup fetched from a remote source
    Fragment {
        /// Where the markup came from
        source: String,
        /// The markup
        markup: String,
    },
    /// Caller-supplied markup (messages, popups)
    Markup {
        /// The markup
        markup: String,
        /// Deep-clone attached behavior and data
        clone_data: bool,
    },
}

impl Content {
    /// Whether aspect-ratio scaling applies to this content
    #[must_use]
    pub fn is_scalable(&self) -> bool {
        matches!(self, Self::Image { .. } | Self::Video { .. })
    }

    /// Source identifier used as the size-cache key
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Image { source } | Self::Video { source, .. } | Self::Fragment { source, .. } => {
                Some(source)
            }
            Self::Node { .. } | Self::Markup { .. } => None,
        }
    }
}

/// Decode state of an embedded image
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ImageState {
    /// Decoded with the given natural size
    Decoded(Size),
    /// The image reported an error
    Broken,
    /// Not decoded yet
    Pending,
}

/// Readiness of embedded media
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaReadiness {
    /// Decoded data for the current frame is available
    HaveData,
    /// The media element reported an error
    Failed,
    /// Still loading
    Pending,
}

/// A fragment fetch: a URL plus an optional in-document selection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentRequest {
    /// Document URL
    pub url: String,
    /// Element id to extract (the part after `#`)
    pub selector: Option<String>,
}

impl FragmentRequest {
    /// Split `url#id` into the document URL and the selection
    #[must_use]
    pub fn parse(source: &str) -> Self {
        match source.split_once('#') {
            Some((url, id)) if !id.is_empty() => Self {
                url: url.to_string(),
                selector: Some(id.to_string()),
            },
            Some((url, _)) => Self {
                url: url.to_string(),
                selector: None,
            },
            None => Self {
                url: source.to_string(),
                selector: None,
            },
        }
    }
}

/// Failure reported by the host
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HostError {
    /// A fetch completed with a non-success status
    #[error("request failed with status {0}")]
    Status(u16),
    /// The request never completed
    #[error("network error: {0}")]
    Network(String),
    /// A media element reported an error
    #[error("media error: {0}")]
    Media(String),
}

/// An image load that did not produce a decoded image
#[derive(Clone, Debug, Error, PartialEq)]
#[error("image load failed ({natural:?}): {reason}")]
pub struct ImageLoadError {
    /// Natural size the element reported; `0x0` means not decoded yet
    pub natural: Size,
    /// Host-provided reason
    pub reason: String,
}

/// Overlay visibility
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayState {
    /// Not displayed
    Disabled,
    /// Displayed, opaque
    Visible {
        /// Fade transitions apply
        fade: bool,
    },
    /// Fading towards transparent before being disabled
    FadingOut,
}

/// Control visibility around the content
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chrome {
    /// Loading indicator shown
    pub loading: bool,
    /// Close control shown
    pub close: bool,
    /// Navigation controls shown
    pub navigation: bool,
    /// Info panel content, if shown
    pub info: Option<String>,
}

impl Chrome {
    /// Loading state: indicator on, every control hidden
    #[must_use]
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    /// Every control hidden, no indicator
    #[must_use]
    pub fn hidden() -> Self {
        Self::default()
    }
}

/// Display surface the engine drives
#[async_trait]
pub trait HostSurface: Send + Sync {
    // ---------------------------------------------------------------------
    // Content
    // ---------------------------------------------------------------------

    /// Insert content into the display surface
    fn attach(&self, content: &Content) -> ContentHandle;

    /// Remove attached content
    fn detach(&self, handle: ContentHandle);

    /// Hide or reveal attached content without removing it
    fn set_content_visible(&self, handle: ContentHandle, visible: bool);

    /// Natural rendered size of attached content
    fn measure(&self, handle: ContentHandle) -> Size;

    /// Fix the content box on one axis (non-scaled numeric options)
    fn set_content_extent(&self, axis: Axis, px: f64, min: MinOverride);

    /// Stylesheet minimum content size
    fn declared_min(&self) -> Size;

    /// Decode state of an embedded image
    fn image_state(&self, node: NodeRef) -> ImageState;

    /// Readiness of embedded media
    fn media_readiness(&self, node: NodeRef) -> MediaReadiness;

    /// Resolves once embedded media has data, or fails on its error event
    async fn media_ready(&self, node: NodeRef) -> Result<(), HostError>;

    /// Load and decode a remote image
    async fn load_image(&self, source: &str) -> Result<Size, ImageLoadError>;

    /// Fetch remote markup
    async fn fetch_fragment(&self, request: &FragmentRequest) -> Result<String, HostError>;

    /// Pause any media playing inside the showcase
    fn pause_media(&self) {}

    /// Values of input controls inside attached content
    fn input_values(&self, _handle: ContentHandle) -> Vec<String> {
        Vec::new()
    }

    // ---------------------------------------------------------------------
    // Frame
    // ---------------------------------------------------------------------

    /// Current viewport size
    fn viewport(&self) -> Size;

    /// Frame limits currently applied
    fn frame_limits(&self) -> FrameSize;

    /// Size the frame is actually rendered at
    fn rendered_frame(&self) -> Size;

    /// Apply frame limits, animating if requested
    fn apply_frame(&self, size: FrameSize, animate: bool);

    // ---------------------------------------------------------------------
    // Chrome
    // ---------------------------------------------------------------------

    /// Show, hide or fade the overlay
    fn set_overlay(&self, state: OverlayState);

    /// Update control visibility
    fn set_chrome(&self, chrome: &Chrome);

    /// Update control titles
    fn set_control_text(&self, _text: &ControlText) {}

    /// Start (or clear) the expiration progress indicator
    fn set_expiry_progress(&self, _remaining: Option<Duration>) {}
}
