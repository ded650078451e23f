//! Progress-callback trait for per-placeholder generation events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ArticleConfigBuilder::progress_callback`] to hear about
//! each illustration as it is generated. Image generation is the only slow
//! part of a conversion (tens of seconds per image), so it is the only part
//! that reports progress.
//!
//! # Example
//!
//! ```rust
//! use md2wechat::{ArticleConfig, ConversionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     generated: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, index: usize, total: usize, bytes: usize) {
//!         self.generated.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("image {index}/{total}: {bytes} bytes");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { generated: AtomicUsize::new(0) });
//! let config = ArticleConfig::builder()
//!     .progress_callback(cb as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the acquisition stage as it works through image placeholders.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Indices are 1-based.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, after scanning, with the number of placeholders found.
    fn on_conversion_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called before the first remote call for a placeholder.
    fn on_image_start(&self, index: usize, total: usize, description: &str) {
        let _ = (index, total, description);
    }

    /// Called when an illustration was generated and embedded.
    fn on_image_complete(&self, index: usize, total: usize, bytes: usize) {
        let _ = (index, total, bytes);
    }

    /// Called when a placeholder fell back to a placeholder-image URL.
    fn on_image_fallback(&self, index: usize, total: usize, reason: &str) {
        let _ = (index, total, reason);
    }

    /// Called once after every placeholder has been attempted.
    fn on_conversion_complete(&self, total_images: usize, generated: usize) {
        let _ = (total_images, generated);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ArticleConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
