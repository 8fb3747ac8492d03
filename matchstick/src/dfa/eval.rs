//! Driving a compiled DFA over an input.
//!
//! The automaton itself is immutable during matching; all cursor state
//! lives in the [`DfaEvaluator`], so one compiled program can serve any
//! number of concurrent runs.

use crate::dfa::Dfa;
use crate::fsm::{StateId, END, START};
use crate::regex::Match;

#[derive(Debug, Clone)]
pub(crate) struct DfaEvaluator<'a> {
    dfa: &'a Dfa,
    current: StateId,
    /// Set when no transition was eligible and the automaton has no dead
    /// state to park in.
    wedged: bool,
}

impl<'a> DfaEvaluator<'a> {
    pub(crate) fn current_state_id(&self) -> StateId {
        self.current
    }

    pub(crate) fn is_accepting(&self) -> bool {
        !self.wedged && self.dfa.states[self.current].accepting
    }

    pub(crate) fn reset(&mut self) {
        self.current = self.dfa.start;
        self.wedged = false;
    }

    /// Advances on one input byte. Returns whether the run is still live,
    /// i.e. the machine neither entered the dead state nor ran out of
    /// eligible transitions.
    pub(crate) fn step(&mut self, input: u8) -> bool {
        if self.wedged {
            return false;
        }
        let transition = self.dfa.states[self.current]
            .transitions
            .iter()
            .find(|transition| transition.is_allowed(input));
        match transition {
            Some(transition) => {
                self.current = transition.single_target();
                !self.dfa.states[self.current].dead
            }
            None => {
                match self.dfa.dead_state() {
                    Some(dead) => self.current = dead,
                    None => self.wedged = true,
                }
                false
            }
        }
    }
}

impl<'a> From<&'a Dfa> for DfaEvaluator<'a> {
    fn from(dfa: &'a Dfa) -> Self {
        DfaEvaluator {
            dfa,
            current: dfa.start,
            wedged: false,
        }
    }
}

impl Dfa {
    /// Extracts all non-overlapping matches from `input`.
    ///
    /// The input is wrapped in the START/END sentinels and the automaton is
    /// driven greedily: a run extends until it dies, at which point the
    /// final state it last held decides whether a match is emitted, the
    /// cursors reset past the consumed span, and a new run begins. A run
    /// that dies on its very first character forces the window one byte
    /// forward, which keeps the loop progressing. Reported ranges are
    /// indices into the original input; spans are clamped to it, and a span
    /// covering only sentinel bytes degenerates to the zero-width match at
    /// its clamp position. A nullable pattern additionally yields its
    /// zero-width match right after the START sentinel, and only there.
    pub(crate) fn find_matches(&self, input: &str) -> Vec<Match> {
        let mut adjusted = Vec::with_capacity(input.len() + 2);
        adjusted.push(START);
        adjusted.extend_from_slice(input.as_bytes());
        adjusted.push(END);

        let mut matches = Vec::new();
        let mut evaluator = self.evaluator();
        let mut begin = 0usize;
        let mut end = 0usize;

        loop {
            if end > adjusted.len() {
                // The END sentinel has been consumed: the input is
                // exhausted.
                break;
            }
            let current_is_start = evaluator.current_state_id() == self.start;
            let current_is_final = evaluator.is_accepting();
            let distance = end - begin;

            let still_live = match adjusted.get(end) {
                Some(&byte) => evaluator.step(byte),
                None => false,
            };
            if still_live {
                end += 1;
                continue;
            }

            // The run died; the state it held decides what it produced.
            if current_is_final {
                if distance == 0 {
                    if end == 1 {
                        matches.push(Match::zero_width(0));
                    }
                } else {
                    matches.push(clamp_match(input, adjusted.len(), begin, end));
                }
            }
            if current_is_start && distance == 0 {
                end += 1;
            }
            begin = end;
            evaluator.reset();
        }
        matches
    }
}

/// Converts a span over the adjusted input into a match over the original
/// one. Sentinel positions are cut off; a span with nothing left becomes
/// the zero-width match at the cut.
fn clamp_match(input: &str, adjusted_len: usize, begin: usize, end: usize) -> Match {
    let from = begin.max(1);
    let to = end.min(adjusted_len - 1);
    if from >= to {
        Match::zero_width((from - 1) as u32)
    } else {
        Match::new(
            input[from - 1..to - 1].to_string(),
            (from - 1) as u32,
            (to - 2) as u32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::tests::dfa_for;
    use crate::fsm::FsmModifiable;

    fn matches_of(pattern: &str, input: &str) -> Vec<(String, u32, u32)> {
        let mut dfa = dfa_for(pattern);
        dfa.minimize();
        dfa.find_matches(input)
            .into_iter()
            .map(|m| (m.value().to_string(), m.range_begin(), m.range_end()))
            .collect()
    }

    #[test]
    fn runs_are_greedy() {
        assert_eq!(
            matches_of("ab*", "abbb ab a"),
            vec![
                ("abbb".to_string(), 0, 3),
                ("ab".to_string(), 5, 6),
                ("a".to_string(), 8, 8)
            ]
        );
    }

    #[test]
    fn a_failed_run_restarts_after_the_window() {
        // `aab` is missed in `aaab` because the second run restarts at the
        // character that killed the first; runs never back up.
        assert_eq!(matches_of("aab", "aab aaab"), vec![("aab".to_string(), 0, 2)]);
    }

    #[test]
    fn anchored_spans_clamp_to_the_original_input() {
        assert_eq!(
            matches_of("^[0-9]+$", "12345"),
            vec![("12345".to_string(), 0, 4)]
        );
        assert_eq!(matches_of("^a", "abc"), vec![("a".to_string(), 0, 0)]);
        assert_eq!(matches_of("c$", "abc"), vec![("c".to_string(), 2, 2)]);
    }

    #[test]
    fn anchored_empties_degenerate_to_zero_width_matches() {
        assert_eq!(matches_of("^", "xyz"), vec![(String::new(), 0, 0)]);
        assert_eq!(matches_of("$", "xyz"), vec![(String::new(), 3, 3)]);
        assert_eq!(matches_of("^$", ""), vec![(String::new(), 0, 0)]);
        assert_eq!(matches_of("^$", "xyz"), vec![]);
    }

    #[test]
    fn nullable_patterns_match_once_at_input_start() {
        assert_eq!(matches_of("", "xyz"), vec![(String::new(), 0, 0)]);
        assert_eq!(matches_of("", ""), vec![(String::new(), 0, 0)]);
        assert_eq!(
            matches_of("a*", "bba"),
            vec![(String::new(), 0, 0), ("a".to_string(), 2, 2)]
        );
    }

    #[test]
    fn matches_never_overlap_and_stay_ordered() {
        let found = matches_of("a?b?", "abab b a");
        for window in found.windows(2) {
            assert!(window[1].1 > window[0].2);
        }
    }
}
