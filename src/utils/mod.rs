//! Shared utilities.
//!
//! - [`app_data`] - sanitizer configuration stored in the per-user app data
//!   directory (XDG-compliant)
//! - [`progress`] - progress bars that compile away without the `progress`
//!   feature

pub mod app_data;
pub mod progress;

pub use app_data::*;
