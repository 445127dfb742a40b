//! Translation backends.
//!
//! The pipeline only sees the [`Translator`] trait. [`GoogleTranslator`] is
//! the production backend.

pub mod google;
pub mod provider;

pub use google::GoogleTranslator;
pub use provider::{TranslationResult, Translator, UNKNOWN_LANGUAGE};
