//! A small Mealy transducer: deterministic transitions that carry an output
//! payload. The lexer is its only client; it classifies pattern bytes by
//! running them through a four-state instance of this machine.

use crate::fsm::transition::Condition;
use crate::fsm::{ANY, EPSILON};

pub(crate) type MealyStateId = usize;

#[derive(Debug, Clone)]
struct MealyTransition<O> {
    condition: Condition,
    expected: u8,
    next: MealyStateId,
    output: O,
}

impl<O> MealyTransition<O> {
    fn is_possible(&self, input: u8) -> bool {
        match self.condition {
            Condition::Equal => self.expected == input,
            Condition::NotEqual => self.expected != input,
            Condition::Any => true,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Mealy<O> {
    states: Vec<Vec<MealyTransition<O>>>,
    start: MealyStateId,
    current: MealyStateId,
}

impl<O: Copy> Mealy<O> {
    pub(crate) fn new(state_count: usize, start: MealyStateId) -> Self {
        Mealy {
            states: vec![Vec::new(); state_count],
            start,
            current: start,
        }
    }

    /// Registers `expected -> (next, output)` for `from`. `ANY` acts as the
    /// wildcard; it is kept behind the specific conditions in the scan
    /// order, so register order does not matter.
    pub(crate) fn map(&mut self, from: MealyStateId, expected: u8, next: MealyStateId, output: O) {
        let condition = if expected == EPSILON || expected == ANY {
            Condition::Any
        } else {
            Condition::Equal
        };
        self.states[from].push(MealyTransition {
            condition,
            expected,
            next,
            output,
        });
        self.states[from].sort_by_key(|t| t.condition);
    }

    pub(crate) fn reset(&mut self) {
        self.current = self.start;
    }

    /// Fires the first satisfied transition and returns its output.
    ///
    /// Every state of the lexer transducer ends in a wildcard mapping, so a
    /// run can always proceed.
    pub(crate) fn run(&mut self, input: u8) -> O {
        let transition = self.states[self.current]
            .iter()
            .find(|t| t.is_possible(input))
            .expect("transducer states end in a wildcard mapping");
        self.current = transition.next;
        transition.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specific_mappings_shadow_the_wildcard() {
        let mut mealy: Mealy<u8> = Mealy::new(2, 0);
        mealy.map(0, ANY, 0, 1);
        mealy.map(0, b'x', 1, 2);
        mealy.map(1, ANY, 0, 3);
        assert_eq!(mealy.run(b'a'), 1);
        assert_eq!(mealy.run(b'x'), 2);
        assert_eq!(mealy.run(b'x'), 3);
        mealy.reset();
        assert_eq!(mealy.run(b'x'), 2);
    }
}
