//! Options
//!
//! Resolved configuration for one load: process-wide defaults merged with
//! per-call overrides. Keys follow the plugin's camelCase names so option
//! maps can be written in JSON or TOML directly.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ErrorKind, ShowcaseError};

/// Image source pattern
pub const DEFAULT_IMAGE_PATTERN: &str =
    r"\.bmp|\.gif|\.ico|\.jpe|\.jpeg|\.jpg|\.png|\.apng|\.svg|\.tif|\.tiff|\.wbmp$";

/// Video source pattern
pub const DEFAULT_VIDEO_PATTERN: &str = r"\.mp4|\.ogg|\.webm$";

/// Every key accepted by [`Options::apply_entry`]
pub const OPTION_KEYS: [&str; 13] = [
    "width",
    "height",
    "currentIndex",
    "infoContent",
    "scaleMedia",
    "forceScaling",
    "animate",
    "fade",
    "cloneData",
    "expire",
    "imageRegExp",
    "videoRegExp",
    "controlText",
];

/// A requested dimension
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Extent {
    /// Measure the content
    #[default]
    Auto,
    /// Fixed size in pixels
    Px(f64),
}

impl Extent {
    /// Numeric value, if fixed
    #[must_use]
    pub fn px(self) -> Option<f64> {
        match self {
            Self::Auto => None,
            Self::Px(v) => Some(v),
        }
    }

    /// Whether the extent is `auto`
    #[must_use]
    pub fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }
}

impl Serialize for Extent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Px(v) => serializer.serialize_f64(*v),
        }
    }
}

impl<'de> Deserialize<'de> for Extent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Keyword(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(v) if v.is_finite() && v >= 0.0 => Ok(Self::Px(v)),
            Repr::Number(v) => Err(serde::de::Error::custom(format!(
                "dimension must be a non-negative number, got {v}"
            ))),
            Repr::Keyword(s) if s.eq_ignore_ascii_case("auto") => Ok(Self::Auto),
            Repr::Keyword(s) => Err(serde::de::Error::custom(format!(
                "expected a number or \"auto\", got \"{s}\""
            ))),
        }
    }
}

/// A source-matching regular expression
#[derive(Clone)]
pub struct SourcePattern(Regex);

impl SourcePattern {
    /// Compile a pattern
    ///
    /// # Errors
    ///
    /// Returns the regex compile error.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    /// Whether the source matches
    #[must_use]
    pub fn is_match(&self, source: &str) -> bool {
        self.0.is_match(source)
    }

    /// The pattern text
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    fn builtin(pattern: &'static str) -> Self {
        // Built-in patterns are constants covered by test_builtin_patterns
        Self(Regex::new(pattern).expect("built-in source pattern compiles"))
    }
}

impl PartialEq for SourcePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Debug for SourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.as_str())
    }
}

impl Serialize for SourcePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SourcePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pattern = String::deserialize(deserializer)?;
        Self::new(&pattern).map_err(serde::de::Error::custom)
    }
}

/// Titles for the control elements
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlText {
    /// Close button title
    pub close: String,
    /// Left navigation title
    pub nav_left: String,
    /// Right navigation title
    pub nav_right: String,
}

impl Default for ControlText {
    fn default() -> Self {
        Self {
            close: "Close".to_string(),
            nav_left: "Navigate Left".to_string(),
            nav_right: "Navigate Right".to_string(),
        }
    }
}

/// Fully resolved options
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Requested width
    pub width: Extent,
    /// Requested height
    pub height: Extent,
    /// Starting index within a collection
    pub current_index: i64,
    /// Markup for the info panel
    pub info_content: Option<String>,
    /// Scale images and video by aspect ratio
    pub scale_media: bool,
    /// Scale any content by aspect ratio
    pub force_scaling: bool,
    /// Animate dimension changes
    pub animate: bool,
    /// Fade in and out
    pub fade: bool,
    /// Deep-clone attached behavior with element content
    pub clone_data: bool,
    /// Seconds before closing automatically (0 disables); fractions allowed
    pub expire: f64,
    /// Pattern routing data sources to the image path
    #[serde(rename = "imageRegExp")]
    pub image_pattern: SourcePattern,
    /// Pattern routing data sources to the video path
    #[serde(rename = "videoRegExp")]
    pub video_pattern: SourcePattern,
    /// Control titles
    pub control_text: ControlText,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            width: Extent::Auto,
            height: Extent::Auto,
            current_index: 0,
            info_content: None,
            scale_media: true,
            force_scaling: false,
            animate: true,
            fade: true,
            clone_data: false,
            expire: 0.0,
            image_pattern: SourcePattern::builtin(DEFAULT_IMAGE_PATTERN),
            video_pattern: SourcePattern::builtin(DEFAULT_VIDEO_PATTERN),
            control_text: ControlText::default(),
        }
    }
}

/// Reason a single option entry was not applied
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryError {
    /// No option has this key
    UnknownKey(String),
    /// The key exists but the value has the wrong shape
    InvalidValue {
        /// Option key
        key: String,
        /// Deserialization message
        reason: String,
    },
}

impl EntryError {
    /// Map onto the engine taxonomy
    #[must_use]
    pub fn into_error(self) -> ShowcaseError {
        match self {
            Self::UnknownKey(key) => ShowcaseError::with_detail(ErrorKind::InvalidDefaultKey, key),
            Self::InvalidValue { key, reason } => {
                ShowcaseError::with_detail(ErrorKind::InvalidOptions, format!("{key}: {reason}"))
            }
        }
    }
}

impl Options {
    /// Whether the content is faded in/out as part of animating
    #[must_use]
    pub fn fades_content(&self) -> bool {
        self.animate && self.fade
    }

    /// Apply one `key = value` entry
    ///
    /// # Errors
    ///
    /// Returns [`EntryError`] for unknown keys or ill-typed values; `self` is
    /// left untouched in both cases.
    pub fn apply_entry(&mut self, key: &str, value: serde_json::Value) -> Result<(), EntryError> {
        fn parse<T: serde::de::DeserializeOwned>(
            key: &str,
            value: serde_json::Value,
        ) -> Result<T, EntryError> {
            serde_json::from_value(value).map_err(|e| EntryError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            })
        }

        match key {
            "width" => self.width = parse(key, value)?,
            "height" => self.height = parse(key, value)?,
            "currentIndex" => self.current_index = parse(key, value)?,
            "infoContent" => self.info_content = parse(key, value)?,
            "scaleMedia" => self.scale_media = parse(key, value)?,
            "forceScaling" => self.force_scaling = parse(key, value)?,
            "animate" => self.animate = parse(key, value)?,
            "fade" => self.fade = parse(key, value)?,
            "cloneData" => self.clone_data = parse(key, value)?,
            "expire" => self.expire = parse(key, value)?,
            "imageRegExp" => self.image_pattern = parse(key, value)?,
            "videoRegExp" => self.video_pattern = parse(key, value)?,
            "controlText" => self.control_text = parse(key, value)?,
            other => return Err(EntryError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Apply every entry of a map, collecting the entries that were rejected
    pub fn apply_map(&mut self, map: serde_json::Map<String, serde_json::Value>) -> Vec<EntryError> {
        map.into_iter()
            .filter_map(|(key, value)| self.apply_entry(&key, value).err())
            .collect()
    }

    /// Merge per-call overrides over these options
    #[must_use]
    pub fn merged(&self, overrides: &OptionOverrides) -> Self {
        let mut out = self.clone();
        if let Some(v) = overrides.width {
            out.width = v;
        }
        if let Some(v) = overrides.height {
            out.height = v;
        }
        if let Some(v) = overrides.current_index {
            out.current_index = v;
        }
        if let Some(ref v) = overrides.info_content {
            out.info_content = Some(v.clone());
        }
        if let Some(v) = overrides.scale_media {
            out.scale_media = v;
        }
        if let Some(v) = overrides.force_scaling {
            out.force_scaling = v;
        }
        if let Some(v) = overrides.animate {
            out.animate = v;
        }
        if let Some(v) = overrides.fade {
            out.fade = v;
        }
        if let Some(v) = overrides.clone_data {
            out.clone_data = v;
        }
        if let Some(v) = overrides.expire {
            out.expire = v;
        }
        if let Some(ref v) = overrides.image_pattern {
            out.image_pattern = v.clone();
        }
        if let Some(ref v) = overrides.video_pattern {
            out.video_pattern = v.clone();
        }
        if let Some(ref v) = overrides.control_text {
            out.control_text = v.clone();
        }
        out
    }
}

/// Per-call overrides; unset fields fall back to the defaults
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionOverrides {
    /// Requested width
    pub width: Option<Extent>,
    /// Requested height
    pub height: Option<Extent>,
    /// Starting index within a collection
    pub current_index: Option<i64>,
    /// Markup for the info panel
    pub info_content: Option<String>,
    /// Scale images and video by aspect ratio
    pub scale_media: Option<bool>,
    /// Scale any content by aspect ratio
    pub force_scaling: Option<bool>,
    /// Animate dimension changes
    pub animate: Option<bool>,
    /// Fade in and out
    pub fade: Option<bool>,
    /// Deep-clone attached behavior with element content
    pub clone_data: Option<bool>,
    /// Seconds before closing automatically
    pub expire: Option<f64>,
    /// Image source pattern
    #[serde(rename = "imageRegExp")]
    pub image_pattern: Option<SourcePattern>,
    /// Video source pattern
    #[serde(rename = "videoRegExp")]
    pub video_pattern: Option<SourcePattern>,
    /// Control titles
    pub control_text: Option<ControlText>,
}

impl OptionOverrides {
    /// No overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse overrides from an untyped value
    ///
    /// `null` means no overrides. Unrecognized keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOptions` when the value is not a map or a known key
    /// has the wrong type.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ShowcaseError> {
        match value {
            serde_json::Value::Null => Ok(Self::default()),
            serde_json::Value::Object(_) => serde_json::from_value(value)
                .map_err(|e| ShowcaseError::with_detail(ErrorKind::InvalidOptions, e.to_string())),
            other => Err(ShowcaseError::with_detail(
                ErrorKind::InvalidOptions,
                format!("expected a map, got {other}"),
            )),
        }
    }

    /// Set the width
    #[must_use]
    pub fn with_width(mut self, width: Extent) -> Self {
        self.width = Some(width);
        self
    }

    /// Set the height
    #[must_use]
    pub fn with_height(mut self, height: Extent) -> Self {
        self.height = Some(height);
        self
    }

    /// Set the starting index
    #[must_use]
    pub fn with_current_index(mut self, index: i64) -> Self {
        self.current_index = Some(index);
        self
    }

    /// Set the info panel markup
    #[must_use]
    pub fn with_info_content(mut self, info: impl Into<String>) -> Self {
        self.info_content = Some(info.into());
        self
    }

    /// Enable or disable media scaling
    #[must_use]
    pub fn with_scale_media(mut self, scale: bool) -> Self {
        self.scale_media = Some(scale);
        self
    }

    /// Force aspect-ratio scaling
    #[must_use]
    pub fn with_force_scaling(mut self, force: bool) -> Self {
        self.force_scaling = Some(force);
        self
    }

    /// Enable or disable animation
    #[must_use]
    pub fn with_animate(mut self, animate: bool) -> Self {
        self.animate = Some(animate);
        self
    }

    /// Enable or disable fading
    #[must_use]
    pub fn with_fade(mut self, fade: bool) -> Self {
        self.fade = Some(fade);
        self
    }

    /// Deep-clone attached behavior
    #[must_use]
    pub fn with_clone_data(mut self, clone: bool) -> Self {
        self.clone_data = Some(clone);
        self
    }

    /// Close automatically after `secs` seconds
    #[must_use]
    pub fn with_expire(mut self, secs: f64) -> Self {
        self.expire = Some(secs);
        self
    }
}
