//! The deterministic automaton produced by subset construction, plus the
//! minimization pass that runs on every compiled pattern.
//!
//! Minimization has two phases: removing states that no transition targets,
//! then partition refinement over the remaining states. The refinement
//! starts from the final/non-final split and keeps splitting classes whose
//! members disagree on the class of some successor; when it settles, each
//! class collapses onto a single representative.

pub(crate) mod eval;

use crate::fsm::{FsmModifiable, State, StateId};
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
pub(crate) struct Dfa {
    pub(crate) states: Vec<State>,
    pub(crate) start: StateId,
    pub(crate) alphabet: Vec<u8>,
}

impl Dfa {
    /// First transition allowed on `character`, scanned most-specific
    /// first. Only the dead state lacks moves on the sentinel bytes; it
    /// absorbs them.
    pub(crate) fn target_on(&self, id: StateId, character: u8) -> StateId {
        self.states[id]
            .transitions
            .iter()
            .find(|transition| transition.is_allowed(character))
            .map(|transition| transition.single_target())
            .unwrap_or(id)
    }

    pub(crate) fn dead_state(&self) -> Option<StateId> {
        (0..self.states.len()).find(|&id| self.states[id].dead)
    }

    /// Removes every state that appears as no transition's target and is
    /// not the start state. Subset construction only emits reachable
    /// states, so for compiled patterns this is a no-op; it guards the
    /// general case.
    pub(crate) fn remove_unreachable_states(&mut self) {
        let mut targets: HashSet<StateId> = HashSet::new();
        for state in &self.states {
            for transition in &state.transitions {
                targets.extend(transition.targets().iter().copied());
            }
        }
        let to_remove: Vec<StateId> = (0..self.states.len())
            .filter(|&id| id != self.start && !targets.contains(&id))
            .collect();
        self.remove_states(to_remove);
    }

    /// The equivalence classes of mutually indistinguishable states,
    /// computed by refining the final/non-final partition with a worklist.
    pub(crate) fn state_equivalence_classes(&self) -> Vec<HashSet<StateId>> {
        let matrix: Vec<Vec<StateId>> = (0..self.states.len())
            .map(|id| {
                self.alphabet
                    .iter()
                    .map(|&character| self.target_on(id, character))
                    .collect()
            })
            .collect();

        let (finals, nonfinals): (HashSet<StateId>, HashSet<StateId>) =
            (0..self.states.len()).partition(|&id| self.states[id].accepting);
        if finals.is_empty() {
            return vec![nonfinals];
        } else if nonfinals.is_empty() {
            return vec![finals];
        }
        let mut partition = vec![finals, nonfinals];
        let mut worklist = partition.clone();

        while let Some(splitter) = worklist.pop() {
            for character_index in 0..self.alphabet.len() {
                let movers: HashSet<StateId> = (0..self.states.len())
                    .filter(|&id| splitter.contains(&matrix[id][character_index]))
                    .collect();
                partition = partition
                    .into_iter()
                    .map(|class| {
                        (
                            movers.intersection(&class).copied().collect::<HashSet<_>>(),
                            class.difference(&movers).copied().collect::<HashSet<_>>(),
                            class,
                        )
                    })
                    .flat_map(|(intersection, difference, class)| {
                        if !intersection.is_empty() && !difference.is_empty() {
                            if let Some(at) = worklist.iter().position(|set| set == &class) {
                                worklist.swap_remove(at);
                                worklist.push(intersection.clone());
                                worklist.push(difference.clone());
                            } else if intersection.len() <= difference.len() {
                                worklist.push(intersection.clone());
                            } else {
                                worklist.push(difference.clone());
                            }
                            vec![intersection, difference].into_iter()
                        } else {
                            vec![class].into_iter()
                        }
                    })
                    .collect();
            }
        }
        partition
    }

    /// Collapses every multi-member equivalence class onto one state. The
    /// dead state always represents its own class so that rewired
    /// transitions keep landing on an absorbing state; otherwise the
    /// lowest-numbered member is kept. Constituent sets of merged states
    /// are folded into the representative.
    pub(crate) fn merge_nondistinguishable_states(&mut self) {
        let classes = self.state_equivalence_classes();
        let mut mapper: HashMap<StateId, StateId> = HashMap::new();
        for class in &classes {
            if class.len() < 2 {
                continue;
            }
            let representative = class
                .iter()
                .copied()
                .find(|&id| self.states[id].dead)
                .unwrap_or_else(|| class.iter().copied().min().unwrap());
            for &member in class {
                if member != representative {
                    mapper.insert(member, representative);
                }
            }
            let mut merged: Vec<StateId> = class
                .iter()
                .flat_map(|&member| self.states[member].constituents.iter().copied())
                .collect();
            merged.sort_unstable();
            merged.dedup();
            self.states[representative].constituents = merged;
        }
        if mapper.is_empty() {
            return;
        }

        self.remap_transitions(|id| mapper.get(&id).copied());
        if let Some(&new_start) = mapper.get(&self.start) {
            self.states[new_start].initial = true;
            self.start = new_start;
        }
        let to_remove: Vec<StateId> = mapper.keys().copied().collect();
        self.remove_states(to_remove);
    }

    /// Removes the given states and re-indexes the remainder. There must
    /// be no transitions into a removed state from a surviving one; the
    /// start state cannot be removed.
    fn remove_states(&mut self, mut to_remove: Vec<StateId>) {
        if to_remove.is_empty() {
            return;
        }
        to_remove.sort_unstable();
        to_remove.dedup();

        let mut old_index: Vec<usize> = (0..self.states.len()).collect();
        match to_remove.binary_search(&self.start) {
            // `preceding` states before the start state go away: adjust.
            Err(preceding) => self.start -= preceding,
            Ok(_) => panic!("cannot remove the start state"),
        }
        for &id in to_remove.iter().rev() {
            self.states.remove(id);
            old_index.remove(id);
        }
        self.remap_transitions(|id| old_index.binary_search(&id).ok());
    }

    fn remap_transitions(&mut self, mapper: impl Fn(StateId) -> Option<StateId>) {
        for state in &mut self.states {
            for transition in &mut state.transitions {
                for target in transition.targets_mut() {
                    *target = mapper(*target).unwrap_or(*target);
                }
            }
        }
    }

    pub(crate) fn evaluator(&self) -> eval::DfaEvaluator<'_> {
        self.into()
    }
}

impl FsmModifiable for Dfa {
    fn minimize(&mut self) {
        self.remove_unreachable_states();
        self.merge_nondistinguishable_states();
    }

    /// Accepting states become rejecting and vice versa, so the automaton
    /// recognizes the complement language. The dead state turns accepting
    /// with everything else that rejected; a complemented automaton is
    /// meant for acceptance checks, not for the match-extraction loop.
    fn complement(&mut self) {
        for state in &mut self.states {
            state.accepting = !state.accepting;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::build_abstract_syntax_tree;
    use crate::enfa::build_acceptor;
    use crate::fsm::transition::Transition;
    use crate::fsm::FsmConvertible;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    pub(crate) fn dfa_for(pattern: &str) -> Dfa {
        let tokens = Lexer::new().tokenize(pattern).unwrap();
        let cst = Parser::new().parse(&tokens).unwrap();
        let ast = build_abstract_syntax_tree(&cst).unwrap();
        build_acceptor(&ast).construct_subset(4096).unwrap()
    }

    /// Whether the automaton accepts the raw byte string, stepping from the
    /// start state.
    fn accepts(dfa: &Dfa, input: &[u8]) -> bool {
        let mut evaluator = dfa.evaluator();
        for &byte in input {
            evaluator.step(byte);
        }
        evaluator.is_accepting()
    }

    #[test]
    fn minimization_merges_equivalent_states() {
        // a|b compiles to separate final states for the two branches which
        // accept the same (empty) remainder.
        let mut dfa = dfa_for("a|b");
        let before = dfa.states.len();
        dfa.minimize();
        assert!(dfa.states.len() < before);
        let finals = dfa.states.iter().filter(|s| s.accepting).count();
        assert_eq!(finals, 1);
    }

    #[test]
    fn minimization_preserves_acceptance() {
        let mut dfa = dfa_for("(a|b)*abb");
        let samples: &[&[u8]] = &[b"abb", b"aabb", b"babb", b"ab", b"", b"abba"];
        let before: Vec<bool> = samples.iter().map(|s| accepts(&dfa, s)).collect();
        dfa.minimize();
        let after: Vec<bool> = samples.iter().map(|s| accepts(&dfa, s)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn unreachable_states_are_removed() {
        let mut dfa = dfa_for("ab");
        // Graft an orphan state nothing points at.
        let orphan = dfa.states.len();
        dfa.states.push(State {
            accepting: true,
            ..State::default()
        });
        dfa.states[orphan]
            .transitions
            .push(Transition::deterministic(b'a', dfa.start));
        let before = dfa.states.len();
        dfa.remove_unreachable_states();
        assert_eq!(dfa.states.len(), before - 1);
        assert!(accepts(&dfa, &[b'a', b'b']));
    }

    #[test]
    fn the_dead_state_survives_merging() {
        let mut dfa = dfa_for("ab");
        dfa.minimize();
        let dead = dfa.dead_state().expect("dead state");
        let state = &dfa.states[dead];
        assert_eq!(state.transitions.len(), 1);
        assert_eq!(state.transitions[0].single_target(), dead);
    }

    #[test]
    fn complement_flips_acceptance() {
        let mut dfa = dfa_for("ab");
        assert!(accepts(&dfa, b"ab"));
        assert!(!accepts(&dfa, b"ba"));
        dfa.complement();
        assert!(!accepts(&dfa, b"ab"));
        assert!(accepts(&dfa, b"ba"));
    }

    #[test]
    fn complement_twice_restores_the_language() {
        let mut dfa = dfa_for("(a|b)+");
        let samples: &[&[u8]] = &[b"a", b"ab", b"", b"ba"];
        let before: Vec<bool> = samples.iter().map(|s| accepts(&dfa, s)).collect();
        dfa.complement();
        dfa.complement();
        let after: Vec<bool> = samples.iter().map(|s| accepts(&dfa, s)).collect();
        assert_eq!(before, after);
    }
}
