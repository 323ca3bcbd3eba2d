//! Targets and classification
//!
//! A [`Target`] is what a caller asks the showcase to present. Its class is
//! derived from the target and the host's view of it whenever the active
//! index changes; it is never stored.

use serde::{Deserialize, Serialize};

use crate::host::{HostSurface, ImageState, NodeRef};

/// What a target points at
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSource {
    /// An externally addressed resource (a link)
    Link {
        /// Resource URL, optionally with a `#id` selection
        href: String,
    },
    /// An image embedded in the host document
    Image {
        /// The image node
        node: NodeRef,
        /// Its source URL, if it has one
        source: Option<String>,
    },
    /// Audio or video embedded in the host document
    Media {
        /// The media node
        node: NodeRef,
    },
    /// Any other node in the host document
    Element {
        /// The node
        node: NodeRef,
    },
    /// Detached markup
    Markup {
        /// The markup
        markup: String,
    },
    /// A native video element synthesized for a video source
    Video {
        /// Video URL
        source: String,
        /// MIME subtype
        subtype: String,
    },
}

/// Content to present, plus its own info text
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// What to present
    pub source: TargetSource,
    /// Info panel text carried by the target itself
    pub info: Option<String>,
}

impl Target {
    /// A link to remote content
    #[must_use]
    pub fn link(href: impl Into<String>) -> Self {
        Self::from_source(TargetSource::Link { href: href.into() })
    }

    /// An embedded image
    #[must_use]
    pub fn image(node: NodeRef, source: Option<String>) -> Self {
        Self::from_source(TargetSource::Image { node, source })
    }

    /// Embedded audio or video
    #[must_use]
    pub fn media(node: NodeRef) -> Self {
        Self::from_source(TargetSource::Media { node })
    }

    /// Any other document node
    #[must_use]
    pub fn element(node: NodeRef) -> Self {
        Self::from_source(TargetSource::Element { node })
    }

    /// Detached markup
    #[must_use]
    pub fn markup(markup: impl Into<String>) -> Self {
        Self::from_source(TargetSource::Markup {
            markup: markup.into(),
        })
    }

    fn from_source(source: TargetSource) -> Self {
        Self { source, info: None }
    }

    /// Attach info panel text
    #[must_use]
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Remote source the data path would load, if any
    #[must_use]
    pub fn data_source(&self) -> Option<&str> {
        match &self.source {
            TargetSource::Link { href } => Some(href),
            TargetSource::Image { source, .. } => source.as_deref(),
            _ => None,
        }
    }

    /// Classify against the host's current view of the target
    ///
    /// First match wins: links and images that cannot be read in place are
    /// data; readable embedded media is an object; everything else is an
    /// element.
    #[must_use]
    pub fn classify(&self, host: &dyn HostSurface) -> TargetClass {
        match &self.source {
            TargetSource::Link { .. } => TargetClass::Data,
            TargetSource::Image { node, source } => match host.image_state(*node) {
                ImageState::Decoded(_) => TargetClass::Object(ObjectKind::Image),
                ImageState::Broken | ImageState::Pending if source.is_some() => TargetClass::Data,
                ImageState::Broken | ImageState::Pending => TargetClass::Object(ObjectKind::Image),
            },
            TargetSource::Media { .. } => TargetClass::Object(ObjectKind::Media),
            TargetSource::Element { .. } | TargetSource::Markup { .. } | TargetSource::Video { .. } => {
                TargetClass::Element
            }
        }
    }
}

/// Embedded object kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Image, svg or canvas
    Image,
    /// Audio or video
    Media,
}

/// Load path for a target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetClass {
    /// Fetched from a remote source
    Data,
    /// Embedded, readable media
    Object(ObjectKind),
    /// Attached as-is
    Element,
}

impl TargetClass {
    /// Whether the class is an embedded object
    #[must_use]
    pub fn is_object(self) -> bool {
        matches!(self, Self::Object(_))
    }
}
