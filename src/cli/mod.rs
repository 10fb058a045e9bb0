//! CLI definition for the `queryscope` binary.
//!
//! One flat command (no subcommands — the pipeline has a single mode of
//! operation: capture in, ranked queries out) matching the external
//! interface in §6.

pub mod display;

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "queryscope",
    about = "Recovers typed search queries from encrypted incremental-search traffic",
    version
)]
pub struct Cli {
    /// Path to a packet observation file: newline-separated
    /// `time_ms,src,sport,dst,size_bytes` rows already filtered to TLS
    /// application-data records bound for one server.
    pub capture: PathBuf,

    /// Target site name. If omitted, detected from the capture's
    /// ClientHello server name (not implemented by the core — the core
    /// expects the collaborator to have resolved this already if absent).
    #[arg(long)]
    pub website: Option<String>,

    /// Treat the query language as Pinyin/Chinese rather than English.
    #[arg(long)]
    pub chinese: bool,

    /// Path to the candidate query dictionary (newline-separated).
    #[arg(long)]
    pub queryset: PathBuf,

    /// Path to the bigram timing table (`char1,char2,mean_ms,std_ms` rows).
    #[arg(long)]
    pub bigrams: PathBuf,

    /// Force `enc=false` for Chinese sites, modeling IE/Edge-Trident's
    /// apostrophe handling instead of a modern browser's.
    #[arg(long)]
    pub trident: bool,

    /// Maximum number of ranked queries to emit per candidate trace.
    #[arg(long, default_value_t = 10)]
    pub topk: usize,

    /// Raise log verbosity from `info` to `debug`.
    #[arg(short, long)]
    pub verbose: bool,
}
