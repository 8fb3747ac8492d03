//! The ε-free NFA and the subset construction that determinizes it.

use crate::dfa::Dfa;
use crate::fsm::transition::Transition;
use crate::fsm::{FsmConvertible, State, StateId, ANY};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Subset construction is worst-case exponential in the number of NFA
/// states; rather than hang on a pathological pattern, the construction
/// fails once the ceiling is crossed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("The state machine grew beyond {limit} states during subset construction")]
pub struct StateLimitExceeded {
    pub(crate) limit: usize,
}

#[derive(Debug)]
pub(crate) struct Nfa {
    pub(crate) states: Vec<State>,
    pub(crate) start: StateId,
    pub(crate) alphabet: Vec<u8>,
}

impl Nfa {
    /// The union of targets reachable from `constituents` on `character`,
    /// sorted for use as a composite-state key.
    fn move_set(&self, constituents: &[StateId], character: u8) -> Vec<StateId> {
        let mut output = Vec::new();
        for &member in constituents {
            self.states[member].push_allowed_targets(character, &mut output);
        }
        output.sort_unstable();
        output
    }
}

impl FsmConvertible for Nfa {
    /// Already ε-free; the collapse is the identity.
    fn compute_epsilon_closures(self) -> Nfa {
        self
    }

    /// Builds one DFA state per reachable subset of NFA states. Singleton
    /// subsets keep the underlying state's flags; larger subsets become
    /// composite states that are final when any constituent is (the start
    /// flag is never inherited). Equal constituent sets resolve to the same
    /// composite state. Empty move-sets, like moves into the absorbing dead
    /// state alone, lead to the canonical dead state, created on first
    /// need.
    fn construct_subset(self, state_limit: usize) -> Result<Dfa, StateLimitExceeded> {
        let mut states: Vec<State> = Vec::new();
        let mut index: HashMap<Vec<StateId>, StateId> = HashMap::new();
        let mut dead: Option<StateId> = None;
        let mut pending: VecDeque<(StateId, Vec<StateId>)> = VecDeque::new();

        let start_key = vec![self.start];
        states.push(State {
            initial: true,
            accepting: self.states[self.start].accepting,
            constituents: start_key.clone(),
            ..State::default()
        });
        index.insert(start_key.clone(), 0);
        pending.push_back((0, start_key));

        while let Some((id, constituents)) = pending.pop_front() {
            for &character in &self.alphabet {
                let move_set = self.move_set(&constituents, character);
                let absorbed = move_set.is_empty()
                    || (move_set.len() == 1 && self.states[move_set[0]].dead);

                let target = if absorbed {
                    *dead.get_or_insert_with(|| {
                        let id = states.len();
                        states.push(State {
                            dead: true,
                            ..State::default()
                        });
                        states[id].transitions.push(Transition::deterministic(ANY, id));
                        id
                    })
                } else if let Some(&existing) = index.get(&move_set) {
                    existing
                } else {
                    let accepting = move_set
                        .iter()
                        .any(|&member| self.states[member].accepting);
                    let new_id = states.len();
                    states.push(State {
                        accepting,
                        constituents: move_set.clone(),
                        ..State::default()
                    });
                    if states.len() > state_limit {
                        return Err(StateLimitExceeded { limit: state_limit });
                    }
                    index.insert(move_set.clone(), new_id);
                    pending.push_back((new_id, move_set));
                    new_id
                };

                states[id].transitions.push(Transition::deterministic(character, target));
            }
            states[id].sort_transitions();
        }

        Ok(Dfa {
            states,
            start: 0,
            alphabet: self.alphabet,
        })
    }
}
