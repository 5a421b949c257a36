//! Progress-callback trait for stage and page events.
//!
//! Inject an [`Arc<dyn ExportProgressCallback>`] via
//! [`crate::config::ExportConfigBuilder::progress_callback`] to receive events
//! as the pipeline advances. The CLI uses it to drive its progress bar; a
//! library caller can forward events anywhere.
//!
//! # Example
//!
//! ```rust
//! use docs2pdf::{ExportConfig, ExportProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl ExportProgressCallback for CountingCallback {
//!     fn on_page_rendered(&self, ordinal: usize, total: usize, title: &str) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{ordinal}/{total} {title}");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { rendered: AtomicUsize::new(0) });
//! let config = ExportConfig::builder()
//!     .progress_callback(cb as Arc<dyn ExportProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::{RenderWarning, Stage};
use std::sync::Arc;

/// Called by the pipeline as it runs.
///
/// Events arrive in order from a single thread. All methods have default
/// no-op implementations so callers only override what they care about.
pub trait ExportProgressCallback: Send + Sync {
    /// A stage is about to start.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// A stage finished successfully.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// Pages have been collected; rendering is about to start.
    fn on_pages_collected(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// One page has been rendered to an HTML fragment.
    ///
    /// # Arguments
    /// * `ordinal` — 1-based position in the table of contents
    /// * `total`   — number of pages
    /// * `title`   — page title
    fn on_page_rendered(&self, ordinal: usize, total: usize, title: &str) {
        let _ = (ordinal, total, title);
    }

    /// A page rendered with a visible degradation.
    fn on_warning(&self, warning: &RenderWarning) {
        let _ = warning;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExportConfig`].
pub type ProgressCallback = Arc<dyn ExportProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        stages: Mutex<Vec<Stage>>,
        pages: AtomicUsize,
        warnings: AtomicUsize,
    }

    impl ExportProgressCallback for TrackingCallback {
        fn on_stage_start(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_page_rendered(&self, _ordinal: usize, _total: usize, _title: &str) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_warning(&self, _warning: &RenderWarning) {
            self.warnings.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Fetch);
        cb.on_pages_collected(3);
        cb.on_page_rendered(1, 3, "Intro");
        cb.on_stage_complete(Stage::Pdf);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_stage_start(Stage::Collect);
        tracker.on_stage_start(Stage::Render);
        tracker.on_page_rendered(1, 2, "Intro");
        tracker.on_page_rendered(2, 2, "Setup");
        tracker.on_warning(&RenderWarning::UnsupportedComponent {
            page: 2,
            name: "Sandpack".into(),
        });

        assert_eq!(
            *tracker.stages.lock().unwrap(),
            vec![Stage::Collect, Stage::Render]
        );
        assert_eq!(tracker.pages.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start(Stage::Assemble);
    }
}
