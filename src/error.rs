//! Error kinds surfaced by the query inference pipeline.
//!
//! Five kinds, matching the error handling design: the first three
//! terminate a run, `BadSiteProfile` is raised while building the site
//! registry, and `CacheMismatch` never escapes the crate — `QueryIndex`
//! catches it internally and rebuilds.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("unsupported site: {0}")]
    UnsupportedSite(String),

    #[error("no TLS conversation to a known server name")]
    EmptyConversation,

    #[error("no subsequence of length > 2 was accepted on any stream")]
    NoSubsequence,

    #[error("site profile '{site}' violates an invariant: {reason}")]
    BadSiteProfile { site: String, reason: String },

    #[error("query index cache mismatch for {site}/{lang}: expected {expected} rows, found {found}")]
    CacheMismatch {
        site: String,
        lang: String,
        expected: usize,
        found: usize,
    },
}

pub type Result<T> = std::result::Result<T, InferenceError>;
