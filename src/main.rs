//! `queryscope` binary entry point: parse args, run the pipeline end to
//! end, print ranked queries, and map pipeline errors onto the exit codes
//! in §6/§7.

use anyhow::{Context, Result};
use clap::Parser;
use queryscope::bigrams::{load_dictionary, BigramTable};
use queryscope::cli::{display, Cli};
use queryscope::config::{self, RunConfig};
use queryscope::correlator;
use queryscope::packet::{PacketObservation, StreamKey};
use queryscope::query_index::QueryIndex;
use queryscope::ranker;
use queryscope::site_profile::{self, HttpVersion, Lang};
use queryscope::InferenceError;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config: RunConfig = cli.into();
    config::init_tracing(config.verbose);

    match run(&config) {
        Ok(()) => Ok(()),
        Err(err) => {
            let code = match err.downcast_ref::<InferenceError>() {
                Some(InferenceError::UnsupportedSite(_)) => 2,
                Some(InferenceError::EmptyConversation) => 3,
                Some(InferenceError::NoSubsequence) => 4,
                _ => 1,
            };
            eprintln!("error: {err:#}");
            std::process::exit(code);
        }
    }
}

fn run(config: &RunConfig) -> Result<()> {
    let site_name = config
        .website
        .as_deref()
        .context("--website is required (auto-detection is handled by the capture collaborator)")?;
    let mut site = site_profile::lookup(site_name)?;

    if config.chinese {
        site.lang = Lang::Pinyin;
        if site.name == "yahoo" {
            site.index_header = false;
            site.counter = site_profile::CounterMode::CounterFromN(2);
        }
    }
    if config.trident && config.chinese {
        site.encode_apostrophe = false;
    }

    let dictionary = load_dictionary(&config.queryset)
        .with_context(|| format!("reading query dictionary at {}", config.queryset.display()))?;
    let bigrams = BigramTable::load(&config.bigrams)
        .with_context(|| format!("reading bigram table at {}", config.bigrams.display()))?;

    let packets = load_capture(&config.capture)
        .with_context(|| format!("reading capture at {}", config.capture.display()))?;
    if packets.is_empty() {
        return Err(InferenceError::EmptyConversation.into());
    }

    let traces = correlator::correlate(&site, &packets);
    if traces.is_empty() {
        return Err(InferenceError::NoSubsequence.into());
    }

    let index = QueryIndex::build(&site, &dictionary, &bigrams);
    let http2_pattern_eligible = site.http_version == HttpVersion::Http2 && site.change_byte == 0;

    let mut results = Vec::new();
    for trace in &traces {
        results.extend(ranker::rank(&index, trace, http2_pattern_eligible, config.topk));
    }
    display::print_ranked_queries(&results);
    Ok(())
}

/// Parse `time_ms,src,sport,dst,size_bytes` rows, the shape §6 describes
/// the capture collaborator as already having produced.
fn load_capture(path: &std::path::Path) -> std::io::Result<Vec<(StreamKey, PacketObservation)>> {
    let text = std::fs::read_to_string(path)?;
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 5 {
            tracing::trace!(line, "skipping malformed capture row");
            continue;
        }
        let (Ok(time_ms), Ok(src), Ok(sport), Ok(dst), Ok(size_bytes)) = (
            fields[0].parse::<i64>(),
            fields[1].parse::<u32>(),
            fields[2].parse::<u16>(),
            fields[3].parse::<u32>(),
            fields[4].parse::<i32>(),
        ) else {
            continue;
        };
        out.push((
            StreamKey { src, sport, dst },
            PacketObservation { time_ms, stream_id: sport as u32, size_bytes },
        ));
    }
    Ok(out)
}
