//! Thompson-style construction of an ε-NFA from the AST, and the ε-closure
//! pass that collapses it into an NFA.
//!
//! Every AST variant contributes a fragment with exactly one state flagged
//! start and one flagged final; composing fragments strips the flags from
//! the swallowed endpoints, so the finished automaton again carries exactly
//! one of each. All states live in a single arena owned by the automaton
//! under construction.

use crate::analyzer::{AnchorKind, Ast, BinaryKind, UnaryKind};
use crate::dfa::Dfa;
use crate::fsm::transition::Transition;
use crate::fsm::{Fragment, FsmConvertible, State, StateId, ANY, END, START};
use crate::nfa::{Nfa, StateLimitExceeded};
use std::collections::{BTreeSet, HashSet};

#[derive(Debug)]
pub(crate) struct EpsilonNfa {
    pub(crate) states: Vec<State>,
    pub(crate) start: StateId,
}

/// Builds the recognizing ε-NFA for the whole AST.
pub(crate) fn build_acceptor(ast: &Ast) -> EpsilonNfa {
    let mut builder = Builder {
        states: Vec::new(),
        dead: None,
    };
    let fragment = builder.fragment(ast);
    EpsilonNfa {
        states: builder.states,
        start: fragment.start,
    }
}

struct Builder {
    states: Vec<State>,
    dead: Option<StateId>,
}

impl Builder {
    fn push(&mut self, state: State) -> StateId {
        self.states.push(state);
        self.states.len() - 1
    }

    /// The canonical dead state: a single self-loop that consumes every
    /// non-sentinel input.
    fn dead_state(&mut self) -> StateId {
        if let Some(id) = self.dead {
            return id;
        }
        let id = self.push(State {
            dead: true,
            ..State::default()
        });
        self.states[id].transitions.push(Transition::deterministic(ANY, id));
        self.dead = Some(id);
        id
    }

    fn fragment(&mut self, ast: &Ast) -> Fragment {
        match ast {
            Ast::Empty => self.empty(),
            Ast::Constant { value, .. } => self.constant(*value),
            Ast::Anchor { start, end, inner } => self.anchor(*start, *end, inner),
            Ast::Unary { kind, operand } => self.quantification(*kind, operand),
            Ast::Binary { kind, left, right } => match kind {
                BinaryKind::Alternation => self.alternation(left, right),
                BinaryKind::Concatenation => self.concatenation(left, right),
                BinaryKind::Range => self.range(left, right),
            },
        }
    }

    /// Only the empty string reaches the final state: any input at all
    /// falls into the dead state.
    fn empty(&mut self) -> Fragment {
        let state = self.push(State {
            initial: true,
            accepting: true,
            ..State::default()
        });
        let dead = self.dead_state();
        self.states[state].transitions.push(Transition::deterministic(ANY, dead));
        Fragment {
            start: state,
            finish: state,
        }
    }

    fn constant(&mut self, value: u8) -> Fragment {
        let start = self.push(State::start());
        let finish = self.push(State::accepting());
        self.states[start].transitions.push(Transition::deterministic(value, finish));
        Fragment { start, finish }
    }

    fn alternation(&mut self, left: &Ast, right: &Ast) -> Fragment {
        let left = self.fragment(left);
        let right = self.fragment(right);
        let start = self.push(State::start());
        let finish = self.push(State::accepting());
        self.states[start]
            .transitions
            .push(Transition::epsilon_to_many(vec![left.start, right.start]));
        self.states[left.finish].transitions.push(Transition::epsilon(finish));
        self.states[right.finish].transitions.push(Transition::epsilon(finish));
        for id in [left.start, right.start] {
            self.states[id].initial = false;
        }
        for id in [left.finish, right.finish] {
            self.states[id].accepting = false;
        }
        Fragment { start, finish }
    }

    fn concatenation(&mut self, left: &Ast, right: &Ast) -> Fragment {
        let left = self.fragment(left);
        let right = self.fragment(right);
        self.states[left.finish].transitions.push(Transition::epsilon(right.start));
        self.states[left.finish].accepting = false;
        self.states[right.start].initial = false;
        Fragment {
            start: left.start,
            finish: right.finish,
        }
    }

    fn quantification(&mut self, kind: UnaryKind, operand: &Ast) -> Fragment {
        let operand = self.fragment(operand);
        let start = self.push(State::start());
        let finish = self.push(State::accepting());

        // Lower bound zero admits skipping the operand entirely.
        match kind {
            UnaryKind::Star | UnaryKind::Question => {
                self.states[start]
                    .transitions
                    .push(Transition::epsilon_to_many(vec![operand.start, finish]));
            }
            UnaryKind::Plus => {
                self.states[start].transitions.push(Transition::epsilon(operand.start));
            }
        }
        // An unbounded upper bound loops back for another round.
        match kind {
            UnaryKind::Star | UnaryKind::Plus => {
                self.states[operand.finish]
                    .transitions
                    .push(Transition::epsilon_to_many(vec![operand.start, finish]));
            }
            UnaryKind::Question => {
                self.states[operand.finish].transitions.push(Transition::epsilon(finish));
            }
        }

        self.states[operand.start].initial = false;
        self.states[operand.finish].accepting = false;
        Fragment { start, finish }
    }

    fn range(&mut self, left: &Ast, right: &Ast) -> Fragment {
        let (Ast::Constant { value: low, .. }, Ast::Constant { value: high, .. }) = (left, right)
        else {
            unreachable!("range endpoints are validated constants");
        };
        let start = self.push(State::start());
        let finish = self.push(State::accepting());
        for value in *low..=*high {
            self.states[start].transitions.push(Transition::deterministic(value, finish));
        }
        Fragment { start, finish }
    }

    fn anchor(&mut self, start_kind: AnchorKind, end_kind: AnchorKind, inner: &Ast) -> Fragment {
        let inner = self.fragment(inner);
        let start = self.push(State::start());
        let finish = self.push(State::accepting());

        let entry = match start_kind {
            AnchorKind::Anchored => Transition::deterministic(START, inner.start),
            AnchorKind::Unanchored => Transition::epsilon(inner.start),
        };
        self.states[start].transitions.push(entry);

        let exit = match end_kind {
            AnchorKind::Anchored => Transition::deterministic(END, finish),
            AnchorKind::Unanchored => Transition::epsilon(finish),
        };
        self.states[inner.finish].transitions.push(exit);

        self.states[inner.start].initial = false;
        self.states[inner.finish].accepting = false;
        Fragment { start, finish }
    }
}

impl EpsilonNfa {
    /// The ε-closure of a state: everything reachable through ε-moves
    /// alone, the state itself included. Cycles are broken by the visited
    /// set.
    pub(crate) fn closure(&self, start: StateId) -> Vec<StateId> {
        let mut all = HashSet::from([start]);
        let mut pending = vec![start];
        while let Some(state) = pending.pop() {
            for transition in &self.states[state].transitions {
                if !transition.is_epsilon() {
                    continue;
                }
                for &target in transition.targets() {
                    if all.insert(target) {
                        pending.push(target);
                    }
                }
            }
        }
        let mut all: Vec<StateId> = all.into_iter().collect();
        all.sort_unstable();
        all
    }

    /// The explicit alphabet: every expected character of a non-ε
    /// transition.
    pub(crate) fn alphabet(&self) -> Vec<u8> {
        let mut alphabet = BTreeSet::new();
        for state in &self.states {
            for transition in &state.transitions {
                if !transition.is_epsilon() {
                    alphabet.insert(transition.expected);
                }
            }
        }
        alphabet.into_iter().collect()
    }
}

impl FsmConvertible for EpsilonNfa {
    /// Replaces every ε-transition with equivalent direct moves: for each
    /// state `s` and alphabet character `c` the new target set is
    /// ε-closure(δ(ε-closure(s), c)). A state whose ε-closure contains a
    /// final state is final itself, so that acceptance survives the removal
    /// of the ε-paths carrying it.
    fn compute_epsilon_closures(mut self) -> Nfa {
        let closures: Vec<Vec<StateId>> =
            (0..self.states.len()).map(|id| self.closure(id)).collect();

        for (id, closure) in closures.iter().enumerate() {
            if closure.iter().any(|&member| self.states[member].accepting) {
                self.states[id].accepting = true;
            }
        }

        let alphabet = self.alphabet();
        let mut states: Vec<State> = self
            .states
            .iter()
            .map(|state| State {
                initial: state.initial,
                accepting: state.accepting,
                dead: state.dead,
                ..State::default()
            })
            .collect();

        for id in 0..self.states.len() {
            for &character in &alphabet {
                let mut step = Vec::new();
                for &member in &closures[id] {
                    self.states[member].push_allowed_targets(character, &mut step);
                }
                let mut output: Vec<StateId> = Vec::new();
                for &reached in &step {
                    for &member in &closures[reached] {
                        if !output.contains(&member) {
                            output.push(member);
                        }
                    }
                }
                output.sort_unstable();
                if output.is_empty() {
                    continue;
                }
                let transition = if output.len() == 1 {
                    Transition::deterministic(character, output[0])
                } else {
                    Transition::nondeterministic(character, output)
                };
                states[id].transitions.push(transition);
            }
            states[id].sort_transitions();
        }

        Nfa {
            states,
            start: self.start,
            alphabet,
        }
    }

    fn construct_subset(self, state_limit: usize) -> Result<Dfa, StateLimitExceeded> {
        self.compute_epsilon_closures().construct_subset(state_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::build_abstract_syntax_tree;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn enfa_for(pattern: &str) -> EpsilonNfa {
        let tokens = Lexer::new().tokenize(pattern).unwrap();
        let cst = Parser::new().parse(&tokens).unwrap();
        let ast = build_abstract_syntax_tree(&cst).unwrap();
        build_acceptor(&ast)
    }

    fn flag_counts(states: &[State]) -> (usize, usize) {
        (
            states.iter().filter(|s| s.initial).count(),
            states.iter().filter(|s| s.accepting).count(),
        )
    }

    #[test]
    fn fragments_keep_a_single_start_and_final_state() {
        for pattern in ["a", "ab", "a|b", "a*", "b+", "c?", "[a-f]", "^a$", "", "(a|b)*c"] {
            let enfa = enfa_for(pattern);
            assert_eq!(flag_counts(&enfa.states), (1, 1), "pattern {pattern:?}");
        }
    }

    #[test]
    fn closure_follows_epsilon_chains_transitively() {
        // a* : start reaches the operand start and the final state without
        // consuming input.
        let enfa = enfa_for("a*");
        let closure = enfa.closure(enfa.start);
        let finish = enfa
            .states
            .iter()
            .position(|state| state.accepting)
            .unwrap();
        assert!(closure.contains(&enfa.start));
        assert!(closure.contains(&finish));
    }

    #[test]
    fn collapse_marks_epsilon_reaching_states_final() {
        let enfa = enfa_for("a*");
        let nfa = enfa.compute_epsilon_closures();
        // The overall start can reach the final state through ε alone, so
        // it must be accepting after the collapse.
        assert!(nfa.states[nfa.start].accepting);
        for state in &nfa.states {
            for transition in &state.transitions {
                assert!(!transition.is_epsilon());
            }
        }
    }

    #[test]
    fn collapse_preserves_the_alphabet() {
        let enfa = enfa_for("^a[0-2]$");
        let nfa = enfa.compute_epsilon_closures();
        assert_eq!(nfa.alphabet, vec![START, END, b'0', b'1', b'2', b'a']);
    }

    #[test]
    fn anchored_fragments_consume_sentinels() {
        let enfa = enfa_for("^a");
        let start_moves: Vec<u8> = enfa.states[enfa.start]
            .transitions
            .iter()
            .map(|t| t.expected)
            .collect();
        assert_eq!(start_moves, vec![START]);
    }
}
