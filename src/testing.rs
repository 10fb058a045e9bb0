//! Test utilities shared across unit and integration tests.
//!
//! Always compiled, hidden from docs. Canonical builders so every test
//! module constructs packets and traces the same way.

#![doc(hidden)]

use crate::dfa::State;
use crate::packet::{KeystrokeTrace, PacketObservation, TraceStep};

pub fn make_packet(time_ms: i64, size_bytes: i32) -> PacketObservation {
    PacketObservation { time_ms, stream_id: 0, size_bytes }
}

pub fn make_packets(sizes: &[i32]) -> Vec<PacketObservation> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, &size)| make_packet(i as i64 * 150, size))
        .collect()
}

pub fn make_step(time_ms: i64, size_bytes: i32, state: State) -> TraceStep {
    TraceStep {
        time_ms,
        size_bytes,
        state,
        counter: 1,
        added_byte: false,
        gs_mss_active: false,
        cookie_changed: false,
        delimiter: 0,
    }
}

pub fn make_trace(steps: Vec<TraceStep>) -> KeystrokeTrace {
    KeystrokeTrace { steps }
}
