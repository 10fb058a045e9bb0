//! Shared helpers for the integration test suites.

use queryscope::packet::PacketObservation;

pub fn packets_from_deltas(start_size: i32, start_time: i64, deltas: &[i32]) -> Vec<PacketObservation> {
    let mut time = start_time;
    let mut size = start_size;
    let mut out = vec![PacketObservation { time_ms: time, stream_id: 0, size_bytes: size }];
    for &d in deltas {
        time += 150;
        size += d;
        out.push(PacketObservation { time_ms: time, stream_id: 0, size_bytes: size });
    }
    out
}
