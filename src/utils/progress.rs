//! Progress bar abstraction that becomes no-op when the `progress` feature is disabled

#[cfg(feature = "progress")]
pub use indicatif::{ProgressBar, ProgressStyle};

#[cfg(not(feature = "progress"))]
pub use self::noop::*;

/// Bar for sanitizing `len` queries, hidden when `quiet` is set
pub fn batch_bar(len: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} queries")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

#[cfg(not(feature = "progress"))]
mod noop {
    /// No-op progress bar when `progress` feature is disabled
    #[derive(Clone)]
    pub struct ProgressBar;

    impl ProgressBar {
        pub fn new(_len: u64) -> Self {
            ProgressBar
        }

        pub fn hidden() -> Self {
            ProgressBar
        }

        pub fn set_style(&self, _style: ProgressStyle) {}
        pub fn inc(&self, _delta: u64) {}
        pub fn finish_with_message(&self, _msg: impl Into<std::borrow::Cow<'static, str>>) {}
        pub fn finish_and_clear(&self) {}
    }

    /// No-op progress style
    pub struct ProgressStyle;

    impl ProgressStyle {
        pub fn default_bar() -> Self {
            ProgressStyle
        }

        pub fn template(self, _template: &str) -> Result<Self, std::convert::Infallible> {
            Ok(self)
        }

        pub fn progress_chars(self, _chars: &str) -> Self {
            self
        }
    }
}
