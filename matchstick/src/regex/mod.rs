//! # Compiling and matching regular expressions
//!
//! A [`Regex`] value owns at most one compiled program: a minimized DFA
//! produced by the full pipeline (normalization, Mealy tokenization, LL(1)
//! parsing, CST-to-AST lowering, Thompson construction, ε-closure collapse,
//! subset construction, minimization). Compiling again replaces the
//! program; a compile error leaves the previous program untouched.
//!
//! ```
//! use matchstick::Regex;
//!
//! let mut regex = Regex::new();
//! regex.compile("ab*c").unwrap();
//!
//! let matches = regex.matches("ac abc abbbc").unwrap();
//! let found: Vec<&str> = matches.iter().map(|m| m.value()).collect();
//! assert_eq!(found, vec!["ac", "abc", "abbbc"]);
//! assert_eq!(matches[1].range_begin(), 3);
//! assert_eq!(matches[1].range_end(), 5);
//! ```
//!
//! Matching takes `&self`: the per-run cursor lives outside the compiled
//! program, so a compiled `Regex` can be shared freely between threads.
//!
//! ## Supported syntax
//!
//! 7-bit ASCII patterns with alternation (`|`), juxtaposition, the greedy
//! quantifiers `*`, `+` and `?`, grouping parentheses, `.` for any
//! character, start/end anchors `^`/`$`, and bracket expressions with
//! letter and digit ranges (`[A-Fx0-9]`). A backslash escapes any regular
//! metacharacter; `\\` is a literal backslash. There are no capturing
//! groups, backreferences or counted repetitions.

use crate::analyzer::{self, SemanticError};
use crate::dfa::Dfa;
use crate::fsm::{FsmConvertible, FsmModifiable};
use crate::lexer::{Lexer, LexerError};
use crate::nfa::StateLimitExceeded;
use crate::parser::{Parser, ParserError};
use std::fmt;
use thiserror::Error;

/// Ceiling on DFA states materialized during subset construction.
pub(crate) const DEFAULT_STATE_LIMIT: usize = 4096;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parser(#[from] ParserError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    #[error(transparent)]
    StateLimit(#[from] StateLimitExceeded),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("The regular expression must be compiled beforehand")]
    NotCompiled,
    #[error("The input must be an ASCII string")]
    InputNotAscii,
}

/// One match: the matched text and its inclusive byte range within the
/// original input. A zero-width match reports `range_begin == range_end`
/// at the position it occurred and an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    value: String,
    range_begin: u32,
    range_end: u32,
}

impl Match {
    pub(crate) fn new(value: String, range_begin: u32, range_end: u32) -> Self {
        Match {
            value,
            range_begin,
            range_end,
        }
    }

    pub(crate) fn zero_width(position: u32) -> Self {
        Match::new(String::new(), position, position)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn range_begin(&self) -> u32 {
        self.range_begin
    }

    pub fn range_end(&self) -> u32 {
        self.range_end
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" [{}..{}]", self.value, self.range_begin, self.range_end)
    }
}

/// A regular expression, compiled on demand and matched any number of
/// times. See the [module documentation](self) for an overview.
#[derive(Debug, Default)]
pub struct Regex {
    program: Option<Dfa>,
}

impl Regex {
    pub fn new() -> Self {
        Regex::default()
    }

    /// Compiles `pattern`, replacing any previously compiled program. On
    /// error the previous program is kept as it was.
    pub fn compile(&mut self, pattern: &str) -> Result<(), CompileError> {
        let tokens = Lexer::new().tokenize(pattern)?;
        let cst = Parser::new().parse(&tokens)?;
        let ast = analyzer::build_abstract_syntax_tree(&cst)?;
        drop(cst);
        let mut dfa = crate::enfa::build_acceptor(&ast)
            .compute_epsilon_closures()
            .construct_subset(DEFAULT_STATE_LIMIT)?;
        dfa.minimize();
        self.program = Some(dfa);
        Ok(())
    }

    /// Finds all non-overlapping matches in `input`, in discovery order.
    ///
    /// ```
    /// use matchstick::Regex;
    ///
    /// let mut regex = Regex::new();
    /// regex.compile("a").unwrap();
    /// let matches = regex.matches("banana").unwrap();
    /// let positions: Vec<u32> = matches.iter().map(|m| m.range_begin()).collect();
    /// assert_eq!(positions, vec![1, 3, 5]);
    /// ```
    pub fn matches(&self, input: &str) -> Result<Vec<Match>, MatchError> {
        let program = self.program.as_ref().ok_or(MatchError::NotCompiled)?;
        if !input.is_ascii() {
            return Err(MatchError::InputNotAscii);
        }
        Ok(program.find_matches(input))
    }
}
