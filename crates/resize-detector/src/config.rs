#![forbid(unsafe_code)]

//! Detector configuration.
//!
//! [`DetectorConfig`] is fixed at construction. The rate-limiting mode in
//! particular is only read once, when the detector builds its handler.

use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default interval for debounce/throttle.
pub const DEFAULT_REFRESH_RATE: Duration = Duration::from_millis(1000);

bitflags! {
    /// Dimensions whose changes trigger a notification.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Dimensions: u8 {
        const WIDTH = 0b01;
        const HEIGHT = 0b10;
    }
}

/// Rate-limiting strategy applied to raw notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshMode {
    /// Fire once after notifications have been quiet for the interval.
    Debounce,
    /// Fire at most once per interval, on both the leading and trailing edge.
    Throttle,
}

impl RefreshMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debounce => "debounce",
            Self::Throttle => "throttle",
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A refresh mode name with no matching strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRefreshMode(pub String);

impl fmt::Display for UnknownRefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown refresh mode {:?} (expected \"debounce\" or \"throttle\")",
            self.0
        )
    }
}

impl std::error::Error for UnknownRefreshMode {}

impl FromStr for RefreshMode {
    type Err = UnknownRefreshMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debounce" => Ok(Self::Debounce),
            "throttle" => Ok(Self::Throttle),
            _ => Err(UnknownRefreshMode(s.to_string())),
        }
    }
}

/// Immutable options for a [`ResizeDetector`](crate::detector::ResizeDetector).
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Dimensions whose changes are reported.
    pub watch: Dimensions,
    /// Suppress the very first notification batch.
    pub skip_on_mount: bool,
    /// Interval used by the rate limiter.
    pub refresh_rate: Duration,
    /// Rate-limiting strategy, or `None` to report every notification.
    pub refresh_mode: Option<RefreshMode>,
    /// Observe the element with this id instead of the probe's parent.
    /// Empty means not configured.
    pub resizable_element_id: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            watch: Dimensions::empty(),
            skip_on_mount: false,
            refresh_rate: DEFAULT_REFRESH_RATE,
            refresh_mode: None,
            resizable_element_id: String::new(),
        }
    }
}

impl DetectorConfig {
    /// Watch both width and height.
    pub fn both() -> Self {
        Self {
            watch: Dimensions::all(),
            ..Default::default()
        }
    }

    pub fn with_handle_width(mut self, enabled: bool) -> Self {
        self.watch.set(Dimensions::WIDTH, enabled);
        self
    }

    pub fn with_handle_height(mut self, enabled: bool) -> Self {
        self.watch.set(Dimensions::HEIGHT, enabled);
        self
    }

    pub fn with_skip_on_mount(mut self, enabled: bool) -> Self {
        self.skip_on_mount = enabled;
        self
    }

    pub fn with_refresh_rate(mut self, rate: Duration) -> Self {
        self.refresh_rate = rate;
        self
    }

    pub fn with_refresh_mode(mut self, mode: Option<RefreshMode>) -> Self {
        self.refresh_mode = mode;
        self
    }

    pub fn with_resizable_element_id(mut self, id: impl Into<String>) -> Self {
        self.resizable_element_id = id.into();
        self
    }

    #[must_use]
    pub fn handle_width(&self) -> bool {
        self.watch.contains(Dimensions::WIDTH)
    }

    #[must_use]
    pub fn handle_height(&self) -> bool {
        self.watch.contains(Dimensions::HEIGHT)
    }

    /// The explicit target id, if one is configured.
    #[must_use]
    pub fn target_id(&self) -> Option<&str> {
        (!self.resizable_element_id.is_empty()).then_some(self.resizable_element_id.as_str())
    }
}
