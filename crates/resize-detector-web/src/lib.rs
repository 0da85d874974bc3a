#![forbid(unsafe_code)]

//! Browser host for `resize-detector`.
//!
//! - [`options`]: JSON options (JS property names) to `DetectorConfig`.
//! - `web_host` (`wasm32`): `web-sys` implementations of the host traits.
//! - `wasm` (`wasm32`): the `ResizeDetectorHandle` export.

pub mod options;

pub use options::{OptionsError, parse_detector_options};

#[cfg(target_arch = "wasm32")]
pub mod web_host;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::ResizeDetectorHandle;

#[cfg(target_arch = "wasm32")]
pub use web_host::WebHost;
