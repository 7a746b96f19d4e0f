//! Client for the remote audiobook backend.
//!
//! This module provides:
//! * [`AudiobookBackend`] — async trait covering every remote call.
//! * [`HttpBackend`] — reqwest implementation against the real service.
//! * [`ApiError`] — transport vs. application failure taxonomy.
//! * The domain values the calls produce ([`DocumentMetadata`],
//!   [`ClassificationResult`], [`SummaryResult`], [`AudioLocator`],
//!   [`UsageSnapshot`], …).
//!
//! # Quick start
//!
//! ```rust,no_run
//! use pdf_audiobook::api::{AudiobookBackend, HttpBackend};
//! use pdf_audiobook::config::AppConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let backend = HttpBackend::from_config(&config.backend);
//!
//!     match backend.usage().await {
//!         Ok(usage) => println!("{} tokens today", usage.today.total_tokens),
//!         Err(e) => eprintln!("{}", e.user_message("fetching usage")),
//!     }
//! }
//! ```

pub mod client;
pub mod error;
pub mod types;

#[cfg(test)]
pub mod mock;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{AudiobookBackend, HttpBackend};
pub use error::ApiError;
pub use types::{
    AudioLocator, ClassificationResult, DailyUsage, Document, DocumentError, DocumentHandle,
    DocumentMetadata, SummaryResult, UsageSnapshot, SUMMARY_PREVIEW_CHARS,
};
