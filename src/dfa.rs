//! The DFA family: four small automata that accept per-keystroke size deltas.
//!
//! One automaton per (HTTP version × language). Each is a pure function
//! `(delta, state, enc) -> next_state`; `Nul` is the sink/reject state and
//! every other state accepts. `SiteProfile::dfa_transfer` dispatches to the
//! right one of the four based on `http_version` and `lang`.
//!
//! Unlike `ParametricDFA` in a Levenshtein automaton, these tables are tiny
//! (at most four states, eight-ish transitions) and are written directly as
//! match arms rather than compiled into a transition array — the automaton
//! *is* the site-feature coupling, so keeping it readable matters more than
//! a generic table-driven engine would buy us.

use crate::site_profile::{HttpVersion, Lang};

/// A DFA state. `Spa` is part of the state space the spec reserves but no
/// transition table in §4.2 ever produces it — kept for completeness of the
/// invariant checks in `contracts.rs`, unreachable in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Nul,
    Ltr,
    Ltr0,
    Apo,
    ApoPct,
    Spa,
    SpaPct,
    ApoOrApoPct,
}

impl State {
    pub fn is_accepting(self) -> bool {
        !matches!(self, State::Nul)
    }
}

impl Default for State {
    fn default() -> Self {
        State::Ltr
    }
}

/// Run the correct automaton for `(http_version, lang)` on one delta.
///
/// `enc` is the site's percent-encoding flag for the relevant character
/// class (space for English, apostrophe for Pinyin).
pub fn transfer(http_version: HttpVersion, lang: Lang, delta: i32, state: State, enc: bool) -> State {
    match (http_version, lang) {
        (HttpVersion::Http1, Lang::English) => h1_english(delta, state, enc),
        (HttpVersion::Http1, Lang::Pinyin) => h1_pinyin(delta, state, enc),
        (HttpVersion::Http2, Lang::English) => h2_english(delta, state, enc),
        (HttpVersion::Http2, Lang::Pinyin) => h2_pinyin(delta, state, enc),
    }
}

/// H1 English: `Ltr -1-> Ltr`; `Ltr -3-> SpaPct` (enc only); `SpaPct -1-> Ltr`.
fn h1_english(delta: i32, state: State, enc: bool) -> State {
    match (state, delta) {
        (State::Ltr, 1) => State::Ltr,
        (State::Ltr, 3) if enc => State::SpaPct,
        (State::SpaPct, 1) => State::Ltr,
        _ => State::Nul,
    }
}

/// H1 Pinyin: delimiter is a raw apostrophe (`Apo`, delta 2) when `!enc`,
/// or percent-encoded (`ApoPct`, delta 4) when `enc`.
fn h1_pinyin(delta: i32, state: State, enc: bool) -> State {
    match (state, delta) {
        (State::Ltr, 1) => State::Ltr,
        (State::Ltr, 2) if !enc => State::Apo,
        (State::Ltr, 4) if enc => State::ApoPct,
        (State::Apo, 1) => State::Ltr,
        (State::Apo, 2) => State::Apo,
        (State::ApoPct, 1) => State::Ltr,
        (State::ApoPct, 4) => State::ApoPct,
        _ => State::Nul,
    }
}

/// H2 English: a zero-delta `Ltr0` is the Huffman byte absorbing a letter
/// for free; `SpaPct` (enc only) is the percent-encoded space.
fn h2_english(delta: i32, state: State, enc: bool) -> State {
    match (state, delta) {
        (State::Ltr, 1) => State::Ltr,
        (State::Ltr, 0) => State::Ltr0,
        (State::Ltr, 2) if enc => State::SpaPct,
        (State::Ltr0, 1) => State::Ltr,
        (State::Ltr0, 2) if enc => State::SpaPct,
        (State::SpaPct, 1) => State::Ltr,
        (State::SpaPct, 0) => State::Ltr0,
        _ => State::Nul,
    }
}

/// H2 Pinyin: raw and percent-encoded apostrophe widths coincide under
/// Huffman coding, so both collapse onto `ApoOrApoPct` at deltas {2, 3}.
fn h2_pinyin(delta: i32, state: State, _enc: bool) -> State {
    match (state, delta) {
        (State::Ltr, 1) => State::Ltr,
        (State::Ltr, 0) => State::Ltr0,
        (State::Ltr, 2 | 3) => State::ApoOrApoPct,
        (State::Ltr0, 1) => State::Ltr,
        (State::Ltr0, 2 | 3) => State::ApoOrApoPct,
        (State::ApoOrApoPct, 1) => State::Ltr,
        (State::ApoOrApoPct, 0) => State::Ltr0,
        (State::ApoOrApoPct, 2 | 3) => State::ApoOrApoPct,
        _ => State::Nul,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn h1_english_accepts_letter_chain() {
        let mut s = State::Ltr;
        for _ in 0..5 {
            s = h1_english(1, s, false);
            assert!(s.is_accepting());
        }
    }

    #[test]
    fn h1_english_space_requires_enc() {
        assert_eq!(h1_english(3, State::Ltr, false), State::Nul);
        assert_eq!(h1_english(3, State::Ltr, true), State::SpaPct);
    }

    #[test]
    fn h2_english_zero_delta_letter() {
        assert_eq!(h2_english(0, State::Ltr, true), State::Ltr0);
        assert_eq!(h2_english(1, State::Ltr0, true), State::Ltr);
    }

    #[test]
    fn h2_pinyin_conflates_apostrophe_forms() {
        assert_eq!(h2_pinyin(2, State::Ltr, false), State::ApoOrApoPct);
        assert_eq!(h2_pinyin(3, State::Ltr, false), State::ApoOrApoPct);
    }

    #[test]
    fn initial_state_is_always_letter() {
        assert_eq!(State::default(), State::Ltr);
    }

    #[test]
    fn reject_is_never_accepting() {
        assert!(!State::Nul.is_accepting());
        for s in [
            State::Ltr,
            State::Ltr0,
            State::Apo,
            State::ApoPct,
            State::Spa,
            State::SpaPct,
            State::ApoOrApoPct,
        ] {
            assert!(s.is_accepting());
        }
    }
}
