//! `queryscope`: recovers typed search queries from encrypted
//! incremental-search traffic via per-keystroke request-size and -timing
//! side channels. Does not decrypt TLS.
//!
//! The core pipeline is six components wired leaves-first:
//! [`site_profile`] (declarative per-site adjusters) feeds [`dfa`] (the
//! four accepting automata), both of which [`extractor`] drives as the
//! Longest Accepted Subsequence search over one stream. [`correlator`]
//! runs that across all streams of a capture and expands the winner into
//! candidate hypotheses. [`query_index`] precomputes per-query features
//! against the dictionary, and [`ranker`] narrows and scores candidates
//! against each hypothesis.

pub mod bigrams;
pub mod cli;
pub mod config;
pub mod contracts;
pub mod correlator;
pub mod dfa;
pub mod error;
pub mod extractor;
pub mod hpack;
pub mod packet;
pub mod query_index;
pub mod ranker;
pub mod site_profile;
pub mod testing;

pub use error::{InferenceError, Result};
