#![forbid(unsafe_code)]

//! Element size observation with rate limiting and render fan-out.
//!
//! # Overview
//! A [`ResizeDetector`] places a hidden probe next to its content, observes
//! the probe's parent (or an element found by id), and reports size changes
//! to three consumer channels: an `on_resize` callback, a render function and
//! the children. Raw notifications can be debounced or throttled before they
//! are compared against the last applied size.
//!
//! # Host capabilities
//! The crate never reaches for globals. The observer, element lookup, frame
//! scheduling and timers are traits in [`host`], bundled into a [`Host`].
//! [`HeadlessHost`] implements all of them deterministically for tests and
//! non-browser use; `resize-detector-web` implements them over `web-sys`.
//!
//! # Modules
//! - **config**: [`DetectorConfig`], [`Dimensions`], [`RefreshMode`].
//! - **rate_limit**: [`RateLimited`] debounce/throttle wrapper.
//! - **state**: [`SizeState`], the versioned size cell with listeners.
//! - **node** / **children**: render output and child resolution.
//! - **detector**: the component itself.
//! - **factory**: [`with_resize_detector`] for wrapping existing components.

pub mod children;
pub mod config;
pub mod detector;
pub mod factory;
pub mod geometry;
pub mod headless;
pub mod host;
pub mod node;
pub mod rate_limit;
pub mod state;

pub use children::{Child, SizeFn};
pub use config::{DEFAULT_REFRESH_RATE, DetectorConfig, Dimensions, RefreshMode, UnknownRefreshMode};
pub use detector::{DetectorProps, PROBE_KEY, RENDER_KEY, ResizeCallback, ResizeDetector};
pub use factory::{Component, FnComponent, WithResizeDetector, with_resize_detector};
pub use geometry::{ContentRect, ObservedSize, ResizeEntry};
pub use headless::{HeadlessElement, HeadlessHost};
pub use host::{
    ElementResolver, FrameHandle, FrameScheduler, Host, ObserverFactory, SizeObserver,
    TimerHandle, TimerHost,
};
pub use node::{ElementNode, Key, Node, PropValue};
pub use rate_limit::RateLimited;
pub use state::{SizeState, Subscription};
