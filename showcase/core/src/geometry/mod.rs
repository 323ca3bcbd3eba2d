//! Geometry Engine
//!
//! Computes the frame size for attached content and the set of properties a
//! resize will animate.
//!
//! # Resolution
//!
//! ```text
//! measured natural size ──┬── numeric option wins (clamped to viewport)
//!                         ├── "auto" keeps the measured size
//!                         └── scalable content
//!                              ├── record origin
//!                              ├── derive the missing axis from the ratio
//!                              ├── probe: apply tentative size, re-measure
//!                              └── correct each axis to the rendered ratio
//! ```
//!
//! The probe step exists because container clamps can shrink an axis the
//! engine never set; the rendered size is the only source of truth.

pub mod transition;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::options::{Extent, Options};

pub use transition::{
    TransitionOutcome, TransitionProperty, TransitionScope, TransitionTracker, TransitionWait,
};

/// Axes whose old and new sizes differ by less than this are not animated
pub const RESIZE_EPSILON_PX: f64 = 2.0;

/// A measured size in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

impl Size {
    /// Create a size
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether both axes are zero (broken or undecoded content)
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }

    /// Width over height, if defined
    #[must_use]
    pub fn aspect_ratio(&self) -> Option<f64> {
        (self.width > 0.0 && self.height > 0.0).then(|| self.width / self.height)
    }
}

/// One axis of a frame size
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Dimension {
    /// Fixed pixels
    Px(f64),
    /// Let the other axis drive this one
    Auto,
    /// Fill the container
    Full,
}

impl Dimension {
    /// Pixel value, if fixed
    #[must_use]
    pub fn px(self) -> Option<f64> {
        match self {
            Self::Px(v) => Some(v),
            Self::Auto | Self::Full => None,
        }
    }

    /// Whether a change from `self` to `other` is large enough to animate
    #[must_use]
    pub fn differs_from(self, other: Dimension) -> bool {
        match (self, other) {
            (Self::Px(a), Self::Px(b)) => (a.floor() - b.floor()).abs() >= RESIZE_EPSILON_PX,
            (a, b) => a != b,
        }
    }

    fn or_full_if_zero(self) -> Self {
        match self {
            Self::Px(v) if v == 0.0 => Self::Full,
            other => other,
        }
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Self::Px(0.0)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Px(v) => write!(f, "{v}px"),
            Self::Auto => f.write_str("auto"),
            Self::Full => f.write_str("100%"),
        }
    }
}

/// Frame limits (`max-width` on the wrapper, `max-height` on the content wrapper)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSize {
    /// Width limit
    pub width: Dimension,
    /// Height limit
    pub height: Dimension,
}

impl FrameSize {
    /// Create a frame size
    #[must_use]
    pub const fn new(width: Dimension, height: Dimension) -> Self {
        Self { width, height }
    }

    /// Fixed pixel frame size
    #[must_use]
    pub const fn px(width: f64, height: f64) -> Self {
        Self {
            width: Dimension::Px(width),
            height: Dimension::Px(height),
        }
    }

    /// Collapsed frame
    #[must_use]
    pub const fn zero() -> Self {
        Self::px(0.0, 0.0)
    }
}

impl From<Size> for FrameSize {
    fn from(size: Size) -> Self {
        Self::px(size.width, size.height)
    }
}

/// Axis selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Horizontal
    Width,
    /// Vertical
    Height,
}

/// Aspect-ratio scaling mode for the current content
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleMode {
    /// Scalable media with `scaleMedia`
    Natural,
    /// Any content with `forceScaling`
    Forced,
}

/// Scaling state for one load/resize cycle
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleContext {
    /// Natural size of the content
    pub origin: Size,
    /// Size requested before ratio correction
    pub requested: FrameSize,
    /// Scaling mode
    pub mode: ScaleMode,
}

/// Result of a ratio correction
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scaled {
    /// Corrected width
    pub width: f64,
    /// Corrected height
    pub height: f64,
    /// Width the frame actually rendered at for the tentative size
    pub rendered_width: f64,
    /// Height the frame actually rendered at for the tentative size
    pub rendered_height: f64,
}

/// Applies a tentative frame size and reports the size the frame rendered at
///
/// Implementations must restore the previous frame size before returning.
pub trait FrameProbe {
    /// Measure the frame as rendered with `tentative` applied
    fn probe(&mut self, tentative: Size) -> Size;
}

impl<F: FnMut(Size) -> Size> FrameProbe for F {
    fn probe(&mut self, tentative: Size) -> Size {
        self(tentative)
    }
}

/// Adjustment to the declared minimum content size on one axis
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MinOverride {
    /// Leave the minimum alone (the request was clamped to the viewport)
    Keep,
    /// Lower the minimum to the requested size
    Lower(f64),
    /// Restore the stylesheet minimum
    Reset,
}

/// Clamp a numeric request on one axis against the viewport and the
/// declared minimum
///
/// Returns the applied size and how the minimum must change.
#[must_use]
pub fn clamp_request(requested: f64, viewport: f64, declared_min: f64) -> (f64, MinOverride) {
    if viewport < requested {
        (viewport, MinOverride::Keep)
    } else if requested < declared_min {
        (requested, MinOverride::Lower(requested))
    } else {
        (requested, MinOverride::Reset)
    }
}

/// Result of resolving the frame size for newly attached content
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolution {
    /// Target frame size
    pub size: FrameSize,
    /// Scaling state to keep for viewport resizes, if scaling applied
    pub scale: Option<ScaleContext>,
}

/// Resolve the target frame size
///
/// - `natural`: measured size of the attached content (cached for images)
/// - `mode`: scaling mode chosen for the content, if any
/// - `viewport`: current viewport size, clamps numeric options
/// - `probe`: applies tentative sizes for the ratio correction pass
pub fn resolve(
    natural: Size,
    options: &Options,
    mode: Option<ScaleMode>,
    viewport: Size,
    probe: &mut dyn FrameProbe,
) -> Resolution {
    let mut auto = Vec::with_capacity(2);

    let width = match options.width {
        Extent::Px(w) => Dimension::Px(w.min(viewport.width)),
        Extent::Auto => {
            auto.push(Axis::Width);
            Dimension::Px(natural.width)
        }
    };
    let height = match options.height {
        Extent::Px(h) => Dimension::Px(h.min(viewport.height)),
        Extent::Auto => {
            auto.push(Axis::Height);
            Dimension::Px(natural.height)
        }
    };
    let mut size = FrameSize::new(width, height);
    let mut scale = None;

    match mode {
        Some(ScaleMode::Natural) if auto.is_empty() => {
            // Both axes fixed: stylesheet containment handles the ratio
        }
        Some(mode) => {
            if let [axis] = auto.as_slice() {
                match axis {
                    Axis::Width => size.width = Dimension::Auto,
                    Axis::Height => size.height = Dimension::Auto,
                }
            }
            let context = ScaleContext {
                origin: natural,
                requested: size,
                mode,
            };
            if let Some(scaled) = scale_to_aspect(&context, probe) {
                size = FrameSize::px(scaled.width, scaled.height);
                scale = Some(context);
            }
        }
        None => {}
    }

    size.width = size.width.or_full_if_zero();
    size.height = size.height.or_full_if_zero();

    Resolution { size, scale }
}

/// Correct a requested size to the content's aspect ratio
///
/// Returns `None` when no ratio can be derived: the origin is empty, or
/// neither axis of the request is numeric.
pub fn scale_to_aspect(context: &ScaleContext, probe: &mut dyn FrameProbe) -> Option<Scaled> {
    let origin = context.origin;
    let ratio = origin.aspect_ratio()?;

    let (mut width, mut height) = match (context.requested.width.px(), context.requested.height.px()) {
        (Some(w), Some(h)) => (w, h),
        (None, Some(h)) => (h / origin.height * origin.width, h),
        (Some(w), None) => (w, w / origin.width * origin.height),
        (None, None) => return None,
    };

    let rendered = probe.probe(Size::new(width, height));
    let target_width = rendered.height * ratio;
    let target_height = rendered.width / ratio;

    let width_shrunk = rendered.width < width;
    let height_shrunk = rendered.height < height;

    if width_shrunk && height_shrunk {
        // Whichever ratio target falls below its rendered axis is the binding one
        if target_width.floor() < rendered.width.floor() {
            width = target_width;
        }
        if target_height.floor() < rendered.height.floor() {
            height = target_height;
        }
    } else if width_shrunk {
        height = target_height;
    } else if height_shrunk {
        width = target_width;
    }

    Some(Scaled {
        width,
        height,
        rendered_width: rendered.width,
        rendered_height: rendered.height,
    })
}

/// Recompute a scaled frame after the viewport changed
///
/// Axes whose corrected value equals the origin keep the rendered size so
/// repeated resize events do not oscillate.
pub fn rescale(context: &ScaleContext, probe: &mut dyn FrameProbe) -> Option<FrameSize> {
    let scaled = scale_to_aspect(context, probe)?;
    let width = if scaled.width == context.origin.width {
        scaled.rendered_width
    } else {
        scaled.width
    };
    let height = if scaled.height == context.origin.height {
        scaled.rendered_height
    } else {
        scaled.height
    };
    Some(FrameSize::px(width, height))
}

/// Properties that will actually transition when moving from `current` to `target`
#[must_use]
pub fn transition_properties(current: FrameSize, target: FrameSize) -> BTreeSet<TransitionProperty> {
    let mut set = BTreeSet::new();
    if current.width.differs_from(target.width) {
        set.insert(TransitionProperty::MaxWidth);
    }
    if current.height.differs_from(target.height) {
        set.insert(TransitionProperty::MaxHeight);
    }
    set
}
