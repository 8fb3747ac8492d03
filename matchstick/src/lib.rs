//! # matchstick
//!
//! `matchstick` is a regular expression engine for 7-bit ASCII patterns
//! that compiles every pattern all the way down to a minimized DFA and then
//! extracts non-overlapping matches in a single forward scan.
//!
//! ## Usage
//!
//! ```rust
//! use matchstick::Regex;
//!
//! let mut regex = Regex::new();
//! regex.compile("[A-C]+").unwrap();
//!
//! let matches = regex.matches("ABXCAAZB").unwrap();
//! let found: Vec<(&str, u32, u32)> = matches
//!     .iter()
//!     .map(|m| (m.value(), m.range_begin(), m.range_end()))
//!     .collect();
//! assert_eq!(found, vec![("AB", 0, 1), ("CAA", 3, 5), ("B", 7, 7)]);
//!
//! // Compile errors carry the offending pattern position.
//! let error = regex.compile("a(").unwrap_err();
//! assert_eq!(
//!     error.to_string(),
//!     "Unmatched open parenthesis (position 2)"
//! );
//! // The previously compiled program is still in place.
//! assert!(regex.matches("ABC").is_ok());
//! ```
//!
//! ## Pipeline
//!
//! Compilation is a strictly forward pipeline. The pattern is normalized
//! (empty constructs are expanded with a reserved marker byte) and
//! tokenized by a Mealy transducer that classifies each byte in context. An
//! LL(1) table-driven parser builds a concrete syntax tree from the token
//! stream; the semantic analyzer lowers it into an abstract syntax tree and
//! validates bracket ranges. Thompson construction turns the AST into an
//! ε-NFA, the ε-closure pass collapses it into an NFA, subset construction
//! determinizes it, and the resulting DFA is minimized. Matching wraps the
//! input in sentinel bytes and drives the minimized DFA greedily, emitting
//! a match whenever a run dies in a final state.
//!
//! The grammar and its parsing table are built once per process and shared
//! by all parsers. Matching never mutates the compiled program, so a
//! compiled [`Regex`] is freely shareable across threads.

mod analyzer;
mod dfa;
mod enfa;
mod fsm;
mod grammar;
mod lexer;
mod nfa;
mod parser;
pub mod regex;

pub use crate::analyzer::SemanticError;
pub use crate::lexer::LexerError;
pub use crate::nfa::StateLimitExceeded;
pub use crate::parser::ParserError;
pub use crate::regex::{CompileError, Match, MatchError, Regex};
