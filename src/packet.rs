//! The data model shared by every downstream component: a packet
//! observation on a filtered TLS application-data stream, and the
//! keystroke trace that `StreamExtractor`/`Correlator` build out of it.

use crate::site_profile::HttpVersion;

/// One observed TLS application-data record on a stream.
///
/// `time_ms` is relative to the first packet in the capture. `size_bytes`
/// is the TLS record length, not the TCP segment length — multi-record
/// segments are expected to already be split by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketObservation {
    pub time_ms: i64,
    pub stream_id: u32,
    pub size_bytes: i32,
}

/// Stream grouping key. HTTP/1.1 groups by `(src, dst)`; HTTP/2 by
/// `(src, sport, dst)`, since distinct source ports are distinct streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamKey {
    pub src: u32,
    pub sport: u16,
    pub dst: u32,
}

impl StreamKey {
    pub fn group_key(self, http_version: HttpVersion) -> (u32, u16, u32) {
        match http_version {
            HttpVersion::Http1 => (self.src, 0, self.dst),
            HttpVersion::Http2 => (self.src, self.sport, self.dst),
        }
    }
}

/// One step of an accepted keystroke trace, struct-of-arrays columns kept
/// together per-step for readability; `KeystrokeTrace` is the
/// column-oriented container the ranker actually walks.
#[derive(Debug, Clone, Copy)]
pub struct TraceStep {
    pub time_ms: i64,
    pub size_bytes: i32,
    pub state: crate::dfa::State,
    pub counter: u32,
    pub added_byte: bool,
    pub gs_mss_active: bool,
    pub cookie_changed: bool,
    /// -1 marks a position the correlator could not resolve (a conflict);
    /// the ranker treats it as a wildcard.
    pub delimiter: i32,
}

#[derive(Debug, Clone, Default)]
pub struct KeystrokeTrace {
    pub steps: Vec<TraceStep>,
}

impl KeystrokeTrace {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Inter-keystroke intervals, one shorter than `steps`.
    pub fn intervals(&self) -> Vec<i64> {
        self.steps
            .windows(2)
            .map(|w| w[1].time_ms - w[0].time_ms)
            .collect()
    }

    pub fn delimiters(&self) -> Vec<i32> {
        self.steps.iter().map(|s| s.delimiter).collect()
    }
}
