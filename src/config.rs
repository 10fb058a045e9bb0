//! Run configuration, built directly from the parsed CLI arguments, and
//! `tracing-subscriber` initialization (§10.1, §10.3).

use crate::cli::Cli;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub capture: PathBuf,
    pub website: Option<String>,
    pub chinese: bool,
    pub queryset: PathBuf,
    pub bigrams: PathBuf,
    pub trident: bool,
    pub topk: usize,
    pub verbose: bool,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        RunConfig {
            capture: cli.capture,
            website: cli.website,
            chinese: cli.chinese,
            queryset: cli.queryset,
            bigrams: cli.bigrams,
            trident: cli.trident,
            topk: cli.topk,
            verbose: cli.verbose,
        }
    }
}

/// Install the global `tracing` subscriber. `--verbose` raises the default
/// filter from `info` to `debug`; `RUST_LOG` always takes precedence when
/// set, so verbosity can be tuned per-module without recompiling.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
