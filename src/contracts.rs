//! Runtime contracts mirroring the testable properties (§8).
//!
//! `debug_assert!`-based, zero-cost in release builds, meant to catch a
//! broken invariant the moment a candidate trace or ranked list is built
//! rather than downstream in a confusing way.
//!
//! # Property correspondence
//!
//! | Contract function                  | Property |
//! |-------------------------------------|----------|
//! | `check_trace_timing`                | universal invariant 1 |
//! | `check_trace_initial_state`         | universal invariant 2 |
//! | `check_added_byte_budget`           | universal invariant 4 |
//! | `check_ranker_progression`          | universal invariant 6 |

use crate::dfa::State;
use crate::packet::KeystrokeTrace;

pub fn check_trace_timing(trace: &KeystrokeTrace) {
    for interval in trace.intervals() {
        debug_assert!(
            interval > 20 && interval < 1000,
            "trace interval {interval}ms out of (20, 1000) bounds"
        );
    }
}

pub fn check_trace_initial_state(trace: &KeystrokeTrace) {
    if let Some(first) = trace.steps.first() {
        debug_assert_eq!(first.state, State::Ltr, "trace does not start in Ltr");
    }
    debug_assert!(
        trace.steps.iter().all(|s| s.state != State::Nul),
        "trace contains a rejecting Nul state"
    );
}

pub fn check_added_byte_budget(trace: &KeystrokeTrace, range_len: usize) {
    let added = trace.steps.iter().filter(|s| s.added_byte).count();
    debug_assert!(added <= range_len, "added-byte flags exceed add_byte_range width");
    for w in trace.steps.windows(2) {
        debug_assert!(
            !(w[0].added_byte && w[1].added_byte),
            "two consecutive steps both absorbed a dummy byte"
        );
    }
}

pub fn check_ranker_progression(after_length: usize, after_token: usize, after_pattern: usize, after_rhythm: usize) {
    debug_assert!(after_length >= after_token, "token filter grew the survivor set");
    debug_assert!(after_token >= after_pattern, "pattern filter grew the survivor set");
    debug_assert!(after_pattern >= after_rhythm, "rhythm filter grew the survivor set");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::TraceStep;

    fn step(time_ms: i64, state: State) -> TraceStep {
        TraceStep {
            time_ms,
            size_bytes: 0,
            state,
            counter: 1,
            added_byte: false,
            gs_mss_active: false,
            cookie_changed: false,
            delimiter: 0,
        }
    }

    #[test]
    fn valid_trace_passes_all_contracts() {
        let trace = KeystrokeTrace {
            steps: vec![step(0, State::Ltr), step(100, State::Ltr), step(250, State::Ltr)],
        };
        check_trace_timing(&trace);
        check_trace_initial_state(&trace);
        check_added_byte_budget(&trace, 1);
    }

    #[test]
    #[should_panic]
    fn trace_starting_on_non_letter_panics_in_debug() {
        let trace = KeystrokeTrace {
            steps: vec![step(0, State::SpaPct)],
        };
        check_trace_initial_state(&trace);
    }
}
