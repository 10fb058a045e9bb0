//! `StreamExtractor`: the Longest Accepted Subsequence search (§4.3).
//!
//! Grounded on the teacher's dynamic-programming edit-distance walk in
//! `levenshtein_dfa.rs` (a DP table over automaton state per input
//! position) generalized from "edit distance" to "longest subsequence
//! whose deltas the site's DFA accepts."

use crate::dfa::State;
use crate::packet::{KeystrokeTrace, PacketObservation, TraceStep};
use crate::site_profile::SiteProfile;

pub(crate) const MIN_GAP_MS: i64 = 20;
pub(crate) const MAX_GAP_MS: i64 = 1000;

#[derive(Debug, Clone)]
struct Candidate {
    steps: Vec<TraceStep>,
    ab_active: bool,
    gs_mss_active: bool,
}

impl Candidate {
    fn seed(obs: PacketObservation) -> Self {
        Candidate {
            steps: vec![TraceStep {
                time_ms: obs.time_ms,
                size_bytes: obs.size_bytes,
                state: State::default(),
                counter: 1,
                added_byte: false,
                gs_mss_active: false,
                cookie_changed: false,
                delimiter: 0,
            }],
            ab_active: false,
            gs_mss_active: false,
        }
    }

    fn len(&self) -> usize {
        self.steps.len()
    }
}

/// Run LAS over one stream, returning the best accepted trace, or `None`
/// if nothing of length > 2 passes the post-filters.
pub fn extract(site: &SiteProfile, packets: &[PacketObservation]) -> Option<KeystrokeTrace> {
    let span = tracing::info_span!("stream_extractor", packet_count = packets.len());
    let _enter = span.enter();

    if packets.len() < 2 {
        return None;
    }

    let n = packets.len();
    let mut ldl: Vec<Option<Candidate>> = (0..n).map(|_| None).collect();

    for i in 0..n {
        let mut best: Option<Candidate> = None;
        for j in 0..i {
            let Some(prev) = &ldl[j] else { continue };
            let last = prev.steps.last().unwrap();
            let dtime = packets[i].time_ms - last.time_ms;
            if dtime >= MAX_GAP_MS {
                continue;
            }
            if dtime <= MIN_GAP_MS {
                // Near-duplicate packet (likely a retransmission already missed
                // upstream). Counter-from-N sites still count it server-side,
                // but we have no way to observe that count here, so we just
                // skip the candidate step rather than guess at the counter.
                continue;
            }
            let counter = last.counter + 1;
            let dsize = packets[i].size_bytes - last.size_bytes;

            if let Some(step) = try_accept(site, prev, dsize, counter, i as u32) {
                if best.as_ref().map(|b| b.len()).unwrap_or(0) < prev.len() + 1 {
                    let mut candidate = prev.clone();
                    candidate.steps.push(step);
                    candidate.ab_active = step.added_byte;
                    candidate.gs_mss_active = step.gs_mss_active;
                    best = Some(candidate);
                }
            }
        }
        ldl[i] = best.or_else(|| Some(Candidate::seed(packets[i])));
    }

    let winner = ldl
        .into_iter()
        .flatten()
        .max_by_key(|c| c.len())?;

    let trace = KeystrokeTrace { steps: winner.steps };
    post_filter(site, trace)
}

/// §4.3's length-byte stretch search. For sites that carry a `stretch_range`
/// (google, yahoo, wikipedia), the server occasionally appends a stretch
/// byte only observed in that size window; absent direct knowledge of which
/// request carried it, every candidate `s` in the range not already present
/// among the base trace's own packet sizes is tried by rerunning `extract`
/// with every packet size `> s` reduced by one, keeping the `(longest,
/// fewest-delimiters)` result.
pub fn extract_with_stretch(site: &SiteProfile, packets: &[PacketObservation]) -> Option<KeystrokeTrace> {
    let base = extract(site, packets);
    let Some((lo, hi)) = site.special.stretch_range else { return base };

    let l_size: std::collections::HashSet<i32> = base
        .as_ref()
        .map(|t| t.steps.iter().map(|s| s.size_bytes).collect())
        .unwrap_or_default();

    let mut best = base;
    for s in lo..hi {
        if l_size.contains(&(s as i32)) {
            continue;
        }
        let adjusted: Vec<PacketObservation> = packets
            .iter()
            .map(|p| {
                let mut p = *p;
                if p.size_bytes > s as i32 {
                    p.size_bytes -= 1;
                }
                p
            })
            .collect();
        let candidate = extract(site, &adjusted);
        if let Some(candidate) = candidate {
            if is_better_trace(&candidate, best.as_ref()) {
                tracing::debug!(stretch = s, len = candidate.len(), "stretch search improved trace");
                best = Some(candidate);
            }
        }
    }
    best
}

/// `(longer, then fewer delimiters)` tie-break, shared with the Baidu
/// double-run comparison in `correlator`.
pub(crate) fn is_better_trace(candidate: &KeystrokeTrace, current: Option<&KeystrokeTrace>) -> bool {
    let Some(current) = current else { return true };
    if candidate.len() != current.len() {
        return candidate.len() > current.len();
    }
    let count_delims = |t: &KeystrokeTrace| t.steps.iter().filter(|s| s.delimiter == 1).count();
    count_delims(candidate) < count_delims(current)
}

fn try_accept(
    site: &SiteProfile,
    prev: &Candidate,
    dsize: i32,
    counter: u32,
    idx: u32,
) -> Option<TraceStep> {
    let last = *prev.steps.last().unwrap();
    // `enc` follows the site's raw `lang` (the `--chinese` flag), not the
    // DFA-family override `trim_space` applies — see `SiteProfile::effective_lang`.
    let enc = match site.lang {
        crate::site_profile::Lang::English => site.encode_space,
        crate::site_profile::Lang::Pinyin => site.encode_apostrophe,
    };
    let zh = site.effective_lang() == crate::site_profile::Lang::Pinyin;

    let mut delta = dsize;
    let mut state = last.state;
    let mut conflict = false;

    delta = site.strip_pwd(delta, state, counter);
    conflict |= site.check_ab(delta, state);
    let (d, s, ab) = site.strip_ab(delta, state, idx, prev.ab_active, zh, enc);
    delta = d;
    state = s;
    conflict |= site.check_ct(delta, state, counter);
    let (d, s) = site.adjust_ct(delta, state, counter, enc);
    delta = d;
    state = s;
    conflict |= site.check_cb(delta);
    let (d, s) = site.adjust_cb(delta, state);
    delta = d;
    state = s;

    let next = site.dfa_transfer(delta, state, enc);
    if next.is_accepting() {
        // Fake-space sites (facebook) can produce a spurious delimiter at
        // the second keystroke; tag it a wildcard rather than trust it.
        if site.special.fake_space && prev.len() == 1 && delimiter_for(next) == 1 {
            conflict = true;
        }
        tracing::trace!(from = ?state, to = ?next, delta, conflict, "las step accepted");
        return Some(TraceStep {
            time_ms: last.time_ms,
            size_bytes: last.size_bytes + dsize,
            state: next,
            counter,
            added_byte: ab,
            gs_mss_active: prev.gs_mss_active,
            cookie_changed: false,
            delimiter: if conflict { -1 } else { delimiter_for(next) },
        });
    }

    let (gs_active, gs_delta) = site.check_gs(delta, prev.len(), prev.gs_mss_active);
    let gs_next = site.dfa_transfer(gs_delta, state, enc);
    if gs_next.is_accepting() {
        return Some(TraceStep {
            time_ms: last.time_ms,
            size_bytes: last.size_bytes + dsize,
            state: gs_next,
            counter,
            added_byte: ab,
            gs_mss_active: gs_active,
            cookie_changed: false,
            delimiter: delimiter_for(gs_next),
        });
    }

    if site.check_bd(delta, idx) {
        let bd_next = site.dfa_transfer(1, state, enc);
        if bd_next.is_accepting() {
            return Some(TraceStep {
                time_ms: last.time_ms,
                size_bytes: last.size_bytes + dsize,
                state: bd_next,
                counter,
                added_byte: ab,
                gs_mss_active: prev.gs_mss_active,
                cookie_changed: true,
                delimiter: delimiter_for(bd_next),
            });
        }
    }

    None
}

fn delimiter_for(state: State) -> i32 {
    use State::*;
    match state {
        Apo | ApoPct | Spa | SpaPct | ApoOrApoPct => 1,
        _ => 0,
    }
}

fn post_filter(site: &SiteProfile, mut trace: KeystrokeTrace) -> Option<KeystrokeTrace> {
    if trace.len() <= 2 {
        return None;
    }
    let intervals = trace.intervals();
    let mean_interval: f64 = intervals.iter().sum::<i64>() as f64 / intervals.len() as f64;
    if mean_interval <= 50.0 {
        return None;
    }

    if site.change_byte > 0 {
        let mut sizes: Vec<i32> = trace.steps.iter().map(|s| s.size_bytes).collect();
        sizes.sort_unstable();
        let median = sizes[sizes.len() / 2];
        let last = trace.steps.last().unwrap().size_bytes;
        if median == last {
            return None;
        }
    }

    if site.special.gs_mss && trace.steps.len() >= 2 {
        let last_idx = trace.steps.len() - 1;
        if trace.steps[last_idx].gs_mss_active {
            let gap = trace.steps[last_idx].time_ms - trace.steps[last_idx - 1].time_ms;
            let other_max_gap = intervals[..intervals.len().saturating_sub(1)]
                .iter()
                .copied()
                .max()
                .unwrap_or(0);
            if gap > 2 * other_max_gap {
                trace.steps.pop();
            }
        }
    }

    if trace.len() <= 2 {
        return None;
    }
    Some(trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site_profile::lookup;
    use crate::testing::make_packet as obs;

    #[test]
    fn single_packet_yields_no_trace() {
        let site = lookup("google").unwrap();
        assert!(extract(&site, &[obs(0, 500)]).is_none());
    }

    #[test]
    fn google_accepts_letter_chain_s1() {
        let site = lookup("google").unwrap();
        let packets = [
            obs(0, 500),
            obs(100, 501),
            obs(250, 501),
            obs(400, 503),
            obs(600, 504),
        ];
        let trace = extract(&site, &packets).expect("S1 should produce a trace");
        assert_eq!(trace.len(), 5);
        assert_eq!(
            trace.steps.iter().map(|s| s.state).collect::<Vec<_>>(),
            vec![State::Ltr, State::Ltr, State::Ltr0, State::SpaPct, State::Ltr]
        );
    }

    #[test]
    fn constant_size_stream_rejected_when_change_byte_positive() {
        let site = lookup("tmall").unwrap();
        let packets = crate::testing::make_packets(&[500, 500, 500, 500]);
        assert!(extract(&site, &packets).is_none());
    }
}
