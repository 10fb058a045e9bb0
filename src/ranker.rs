//! `Ranker`: progressive narrowing of the query dictionary against one
//! keystroke trace (§4.6).

use crate::packet::KeystrokeTrace;
use crate::query_index::{QueryIndex, QueryRow};
use std::f64::consts::PI;

#[derive(Debug, Clone)]
pub struct RankedQuery {
    pub query: String,
    pub score: f64,
}

/// Run all four stages and return the top-`k` surviving queries, best
/// (lowest score) first.
pub fn rank(index: &QueryIndex, trace: &KeystrokeTrace, http2_pattern_eligible: bool, k: usize) -> Vec<RankedQuery> {
    let span = tracing::info_span!("ranker", trace_len = trace.len());
    let _enter = span.enter();

    let after_length = filter_by_length(index, trace);
    let after_token = filter_by_token(&after_length, trace);
    let after_pattern = if http2_pattern_eligible {
        filter_by_pattern(&after_token, trace)
    } else {
        after_token.clone()
    };

    tracing::debug!(
        after_length = after_length.len(),
        after_token = after_token.len(),
        after_pattern = after_pattern.len(),
        "ranker progression"
    );
    debug_assert!(after_length.len() >= after_token.len());
    debug_assert!(after_token.len() >= after_pattern.len());

    let mut ranked = rank_by_rhythm(&after_pattern, trace);
    ranked.truncate(k);
    ranked
}

fn filter_by_length<'a>(index: &'a QueryIndex, trace: &KeystrokeTrace) -> Vec<&'a QueryRow> {
    let len = trace.len() as u32;
    index.rows.iter().filter(|r| r.length == len).collect()
}

fn filter_by_token<'a>(rows: &[&'a QueryRow], trace: &KeystrokeTrace) -> Vec<&'a QueryRow> {
    let observed = trace.delimiters();
    rows.iter()
        .copied()
        .filter(|row| {
            if row.delimiters.len() != observed.len() {
                return false;
            }
            row.delimiters
                .iter()
                .zip(observed.iter())
                .all(|(&d, &o)| o == -1 || i32::from(d) == o)
        })
        .collect()
}

fn filter_by_pattern<'a>(rows: &[&'a QueryRow], trace: &KeystrokeTrace) -> Vec<&'a QueryRow> {
    let observed: Vec<i32> = trace
        .steps
        .windows(2)
        .map(|w| w[1].size_bytes - w[0].size_bytes)
        .collect();
    let spans = split_into_spans(&observed, &trace.delimiters());

    rows.iter()
        .copied()
        .filter(|row| {
            let Some(patterns) = &row.patterns else { return true };
            spans.iter().all(|&(start, end)| {
                let observed_span = &observed[start..end];
                patterns
                    .iter()
                    .any(|alignment| span_matches(alignment, observed_span, &(start, end)))
            })
        })
        .collect()
}

fn split_into_spans(observed: &[i32], delimiters: &[i32]) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0usize;
    for (i, &d) in delimiters.iter().enumerate() {
        if d == -1 {
            if i > start {
                spans.push((start, i));
            }
            start = i + 1;
        }
    }
    if start < observed.len() + 1 {
        let end = observed.len();
        if end > start {
            spans.push((start, end));
        }
    }
    spans
}

/// A span matches an alignment when the alignment has a byte-delta run of
/// the right length at some offset whose deltas equal the observed ones. The
/// byte-index ↔ keystroke-index correspondence for a given query is
/// established once in `QueryIndex::build` (one delta per keystroke, already
/// keystroke-indexed), so a same-length alignment can be compared directly
/// against the observed slice at the same offset.
fn span_matches(alignment: &[i32], observed_span: &[i32], span: &(usize, usize)) -> bool {
    let (start, end) = *span;
    if end > alignment.len() {
        return false;
    }
    alignment[start..end] == *observed_span
}

fn rank_by_rhythm(rows: &[&QueryRow], trace: &KeystrokeTrace) -> Vec<RankedQuery> {
    let intervals = trace.intervals();
    let mut scored: Vec<(usize, RankedQuery)> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let mut total = 0.0;
            let mut n = 0usize;
            for (i, &interval) in intervals.iter().enumerate() {
                if interval == 1000 {
                    continue; // synthetic cancel/prepend gap, not real timing
                }
                let Some(&mean) = row.rhythm_mean.get(i) else { continue };
                if mean == 0.0 {
                    continue;
                }
                let std = row.rhythm_std.get(i).copied().unwrap_or(1.0).max(1e-6);
                total += -log10_normal_pdf(interval as f64, mean, std);
                n += 1;
            }
            let score = if n == 0 { f64::MAX } else { total / n as f64 };
            (idx, RankedQuery { query: row.query.clone(), score })
        })
        .collect();

    scored.sort_by(|a, b| {
        a.1.score
            .partial_cmp(&b.1.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.into_iter().map(|(_, r)| r).collect()
}

fn log10_normal_pdf(x: f64, mean: f64, std: f64) -> f64 {
    let variance = std * std;
    let exponent = -((x - mean) * (x - mean)) / (2.0 * variance);
    let density = (1.0 / (std * (2.0 * PI).sqrt())) * exponent.exp();
    density.max(f64::MIN_POSITIVE).log10()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigrams::BigramTable;
    use crate::query_index::QueryIndex;
    use crate::site_profile::lookup;
    use crate::testing::{make_step, make_trace};
    use crate::dfa::State;

    fn trace_for(sizes: &[i32], times: &[i64]) -> KeystrokeTrace {
        let steps = sizes
            .iter()
            .zip(times.iter())
            .map(|(&size_bytes, &time_ms)| make_step(time_ms, size_bytes, State::Ltr))
            .collect();
        make_trace(steps)
    }

    #[test]
    fn progression_is_monotone() {
        let site = lookup("google").unwrap();
        let bigrams = BigramTable::default();
        let index = QueryIndex::build(&site, &["cats".into(), "dogs".into(), "cars".into()], &bigrams);
        let trace = trace_for(&[100, 101, 102, 103], &[0, 100, 300, 500]);
        let after_length = filter_by_length(&index, &trace);
        let after_token = filter_by_token(&after_length, &trace);
        assert!(after_length.len() >= after_token.len());
    }

    #[test]
    fn filter_by_length_matches_trace_length() {
        let site = lookup("google").unwrap();
        let bigrams = BigramTable::default();
        let index = QueryIndex::build(&site, &["cats".into(), "elephant".into()], &bigrams);
        let trace = trace_for(&[100, 101, 102, 103], &[0, 100, 300, 500]);
        let after_length = filter_by_length(&index, &trace);
        assert_eq!(after_length.len(), 1);
        assert_eq!(after_length[0].query, "cats");
    }

    #[test]
    fn rank_by_rhythm_is_stable_on_ties() {
        let rows = vec![
            QueryRow {
                query: "a".into(),
                length: 1,
                delimiters: vec![],
                patterns: None,
                rhythm_mean: vec![],
                rhythm_std: vec![],
            },
            QueryRow {
                query: "b".into(),
                length: 1,
                delimiters: vec![],
                patterns: None,
                rhythm_mean: vec![],
                rhythm_std: vec![],
            },
        ];
        let refs: Vec<&QueryRow> = rows.iter().collect();
        let trace = trace_for(&[1], &[0]);
        let ranked = rank_by_rhythm(&refs, &trace);
        assert_eq!(ranked[0].query, "a");
        assert_eq!(ranked[1].query, "b");
    }
}
