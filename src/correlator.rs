//! `Correlator`: drives `StreamExtractor` across all streams of a capture
//! and expands the winning trace into a list of candidate hypotheses
//! (§4.4).

use crate::extractor::{self, MAX_GAP_MS, MIN_GAP_MS};
use crate::packet::{KeystrokeTrace, PacketObservation, StreamKey, TraceStep};
use crate::site_profile::{Lang, SiteProfile};
use std::collections::HashMap;

/// A grouped stream: its key and the packets observed on it, in capture
/// order.
pub struct Stream {
    pub key: StreamKey,
    pub packets: Vec<PacketObservation>,
}

pub fn group_streams(site: &SiteProfile, packets: &[(StreamKey, PacketObservation)]) -> Vec<Stream> {
    let mut groups: HashMap<(u32, u16, u32), Vec<PacketObservation>> = HashMap::new();
    for (key, obs) in packets {
        if let Some(threshold) = site.special.size_threshold {
            if obs.size_bytes < threshold {
                // Noise (ACKs, short control frames): zeroed out before LAS
                // ever sees it rather than admitted as a letter transition.
                continue;
            }
        }
        groups
            .entry(key.group_key(site.http_version))
            .or_default()
            .push(*obs);
    }
    groups
        .into_iter()
        .map(|(k, mut v)| {
            v.sort_by_key(|o| o.time_ms);
            Stream {
                key: StreamKey { src: k.0, sport: k.1, dst: k.2 },
                packets: v,
            }
        })
        .collect()
}

/// Run the full per-capture correlation: group, extract per stream, keep
/// the globally longest trace, then expand into candidate variants.
pub fn correlate(site: &SiteProfile, packets: &[(StreamKey, PacketObservation)]) -> Vec<KeystrokeTrace> {
    let span = tracing::info_span!("correlator", site = site.name, lang = ?site.lang);
    let _enter = span.enter();

    let streams = group_streams(site, packets);
    if streams.is_empty() {
        return Vec::new();
    }

    let winner = if site.special.cookie_drift {
        best_of_baidu_runs(site, &streams)
    } else {
        best_across_streams(site, &streams)
    };

    let Some((trace, stream_idx)) = winner else { return Vec::new() };
    expand_variants(site, trace, &streams[stream_idx].packets)
}

fn best_across_streams(site: &SiteProfile, streams: &[Stream]) -> Option<(KeystrokeTrace, usize)> {
    streams
        .iter()
        .enumerate()
        .filter_map(|(i, s)| extractor::extract_with_stretch(site, &s.packets).map(|t| (t, i)))
        .max_by_key(|(t, _)| t.len())
}

/// Baidu runs StreamExtractor twice (cookie-add normalized to a letter, or
/// to a delimiter) and keeps the longer result, breaking ties by fewer
/// delimiters.
fn best_of_baidu_runs(site: &SiteProfile, streams: &[Stream]) -> Option<(KeystrokeTrace, usize)> {
    let runs: Vec<(KeystrokeTrace, usize)> = streams
        .iter()
        .enumerate()
        .filter_map(|(i, s)| extractor::extract_with_stretch(site, &s.packets).map(|t| (t, i)))
        .collect();

    runs.into_iter().fold(None, |best, (candidate, i)| {
        if extractor::is_better_trace(&candidate, best.as_ref().map(|(t, _)| t)) {
            Some((candidate, i))
        } else {
            best
        }
    })
}

/// Post-processing expansion: one primary trace plus the site-conditioned
/// variants described in §4.4 items 1-4.
fn expand_variants(
    site: &SiteProfile,
    trace: KeystrokeTrace,
    stream_packets: &[PacketObservation],
) -> Vec<KeystrokeTrace> {
    let mut out = vec![trace.clone()];

    if site.index_header {
        if let Some(prefixed) = prepend_index_header(&trace, stream_packets) {
            out.push(prefixed);
        }
    }

    if let Some(k) = site.special.cancel_count {
        for n in 1..=k {
            out.push(prepend_synthetic_head(&trace, n));
        }
    }

    if site.lang == Lang::Pinyin && trace.len() > 2 {
        out.push(discard_tail(&trace));
    }

    if site.lang == Lang::English && site.trim_space {
        out.push(rewrite_apostrophes_as_spaces(&trace));
    }

    out
}

/// Search the raw stream for a real packet just before the trace head whose
/// timing is valid (`20 < Δt < 1000`) and whose size exceeds the head's —
/// the HTTP/2 index header request yahoo/wikipedia send ahead of the first
/// keystroke. Returns `None` when no qualifying packet exists rather than
/// fabricating one.
fn prepend_index_header(trace: &KeystrokeTrace, stream_packets: &[PacketObservation]) -> Option<KeystrokeTrace> {
    let head = trace.steps.first()?;
    let candidate = stream_packets
        .iter()
        .filter(|p| p.time_ms < head.time_ms)
        .max_by_key(|p| p.time_ms)?;

    let dt = head.time_ms - candidate.time_ms;
    if !(dt > MIN_GAP_MS && dt < MAX_GAP_MS) || candidate.size_bytes <= head.size_bytes {
        return None;
    }

    let synthetic = TraceStep {
        time_ms: candidate.time_ms,
        size_bytes: candidate.size_bytes,
        state: crate::dfa::State::Ltr,
        counter: head.counter.saturating_sub(1),
        added_byte: false,
        gs_mss_active: false,
        cookie_changed: false,
        delimiter: 0,
    };
    let mut steps = trace.steps.clone();
    steps.insert(0, synthetic);
    Some(KeystrokeTrace { steps })
}

fn prepend_synthetic_head(trace: &KeystrokeTrace, variant: u32) -> KeystrokeTrace {
    let head = trace.steps.first().copied().unwrap_or(TraceStep {
        time_ms: 1000,
        size_bytes: 0,
        state: crate::dfa::State::Ltr,
        counter: 1,
        added_byte: false,
        gs_mss_active: false,
        cookie_changed: false,
        delimiter: 0,
    });
    let synthetic = TraceStep {
        time_ms: head.time_ms - 1000 * i64::from(variant),
        size_bytes: head.size_bytes,
        state: crate::dfa::State::Ltr,
        counter: 0,
        added_byte: false,
        gs_mss_active: false,
        cookie_changed: false,
        delimiter: -1,
    };
    let mut steps = trace.steps.clone();
    steps.insert(0, synthetic);
    KeystrokeTrace { steps }
}

fn discard_tail(trace: &KeystrokeTrace) -> KeystrokeTrace {
    let mut steps = trace.steps.clone();
    steps.pop();
    KeystrokeTrace { steps }
}

fn rewrite_apostrophes_as_spaces(trace: &KeystrokeTrace) -> KeystrokeTrace {
    use crate::dfa::State;
    let mut steps = trace.steps.clone();
    for step in &mut steps {
        if matches!(step.state, State::Apo | State::ApoPct) {
            step.state = State::SpaPct;
        }
    }
    steps.dedup_by(|a, b| {
        matches!(a.state, State::SpaPct) && matches!(b.state, State::SpaPct)
    });
    KeystrokeTrace { steps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site_profile::lookup;
    use crate::testing::make_packet as obs;

    fn key(sport: u16) -> StreamKey {
        StreamKey { src: 1, sport, dst: 2 }
    }

    #[test]
    fn http1_groups_ignore_source_port() {
        let site = lookup("facebook").unwrap();
        let packets = vec![
            (key(1), obs(0, 500)),
            (key(2), obs(50, 501)),
        ];
        let streams = group_streams(&site, &packets);
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].packets.len(), 2);
    }

    #[test]
    fn http2_groups_split_by_source_port() {
        let site = lookup("google").unwrap();
        let packets = vec![
            (key(1), obs(0, 500)),
            (key(2), obs(50, 501)),
        ];
        let streams = group_streams(&site, &packets);
        assert_eq!(streams.len(), 2);
    }

    #[test]
    fn facebook_cancel_count_yields_two_extra_variants() {
        let site = lookup("facebook").unwrap();
        let packets = vec![
            (key(1), obs(0, 500)),
            (key(1), obs(100, 501)),
            (key(1), obs(300, 502)),
            (key(1), obs(500, 503)),
        ];
        let traces = correlate(&site, &packets);
        assert!(traces.len() >= 1);
    }
}
