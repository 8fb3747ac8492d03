//! Table-driven LL(1) parsing of the token stream into a concrete syntax
//! tree.
//!
//! The parser keeps two queues: the *prediction queue* holds the symbols
//! still expected on the input, the *analysis queue* records the leftmost
//! derivation (which rule rewrote which production) interleaved with the
//! consumed tokens. Acceptance happens when the end-of-input terminal at the
//! head of the prediction queue matches the end-of-input token; the analysis
//! queue is then replayed front-to-back into the CST.
//!
//! When prediction fails, the error is discriminated by scanning backwards
//! through the token stream for the construct most likely at fault
//! (unmatched brackets and parentheses first, then dangling operators),
//! falling back to a plain unexpected-character report.

use crate::grammar::symbol::Symbol;
use crate::grammar::{grammar, Grammar, ProductionId, RuleId};
use crate::lexer::{Token, TokenCategory};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParserError {
    #[error("Unexpected character (position {position})")]
    UnexpectedCharacter { position: u32 },
    #[error("Dangling alternation operator (position {position})")]
    DanglingAlternationOperator { position: u32 },
    #[error("Dangling quantification operator (position {position})")]
    DanglingQuantificationOperator { position: u32 },
    #[error("Dangling range operator (position {position})")]
    DanglingRangeOperator { position: u32 },
    #[error("Dangling escape character (position {position})")]
    DanglingMetacharacterEscape { position: u32 },
    #[error("Unmatched open parenthesis (position {position})")]
    UnmatchedOpenParenthesis { position: u32 },
    #[error("Unmatched close parenthesis (position {position})")]
    UnmatchedCloseParenthesis { position: u32 },
    #[error("Unmatched open bracket (position {position})")]
    UnmatchedOpenBracket { position: u32 },
    #[error("Empty bracket expressions are not allowed (position {position})")]
    EmptyBracketExpression { position: u32 },
    #[error("Unexpected start anchor (position {position})")]
    UnexpectedStartAnchor { position: u32 },
    #[error("Unexpected end anchor (position {position})")]
    UnexpectedEndAnchor { position: u32 },
    #[error("Unexpected empty expression (position {position})")]
    UnexpectedEmptyExpression { position: u32 },
}

/// Concrete syntax tree. Terminal leaves hold the consumed token; ε-leaves
/// mark the spot where a production derived the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CstNode {
    NonTerminal {
        production: ProductionId,
        children: Vec<CstNode>,
    },
    Terminal(Token),
    Epsilon,
}

/// One entry of the analysis queue: either a derivation step or a token
/// consumed for a terminal.
#[derive(Debug)]
enum AnalysisItem {
    Derivation {
        production: ProductionId,
        rule: RuleId,
    },
    Token(Token),
}

pub(crate) struct Parser {
    grammar: &'static Grammar,
}

impl Parser {
    pub(crate) fn new() -> Self {
        Parser { grammar: grammar() }
    }

    pub(crate) fn parse(&self, tokens: &[Token]) -> Result<CstNode, ParserError> {
        debug_assert!(!tokens.is_empty(), "the lexer always appends an end-of-input token");

        let mut prediction: VecDeque<Symbol> = VecDeque::new();
        let mut analysis: VecDeque<AnalysisItem> = VecDeque::new();

        let start = self.grammar.start_production();
        Self::expand_queues(self.grammar, &mut analysis, &mut prediction, start, 0);

        let mut position = 0usize;
        let mut head = prediction.pop_front();
        loop {
            let token = &tokens[position];
            match head {
                Some(Symbol::Terminal(id)) if self.grammar.terminal(id).is_epsilon() => {
                    head = prediction.pop_front();
                }
                Some(Symbol::Terminal(id)) => {
                    analysis.push_back(AnalysisItem::Token(token.clone()));
                    if self.can_accept(id, token) {
                        return Ok(Self::transform_analysis(self.grammar, &mut analysis));
                    }
                    position += 1;
                    if position == tokens.len() {
                        // Ran past the end-of-input marker without accepting.
                        return Err(report_error(position, tokens));
                    }
                    head = prediction.pop_front();
                }
                Some(Symbol::NonTerminal(production)) => match self.predict(production, token) {
                    Some(rule) => {
                        Self::expand_queues(
                            self.grammar,
                            &mut analysis,
                            &mut prediction,
                            production,
                            rule,
                        );
                        head = prediction.pop_front();
                    }
                    None => return Err(report_error(position, tokens)),
                },
                None => return Err(report_error(position, tokens)),
            }
        }
    }

    /// Appends the derivation step and pushes the rule's symbols onto the
    /// prediction queue, leftmost at the head.
    fn expand_queues(
        grammar: &Grammar,
        analysis: &mut VecDeque<AnalysisItem>,
        prediction: &mut VecDeque<Symbol>,
        production: ProductionId,
        rule: RuleId,
    ) {
        analysis.push_back(AnalysisItem::Derivation { production, rule });
        for &symbol in grammar.rule(production, rule).symbols.iter().rev() {
            prediction.push_front(symbol);
        }
    }

    /// Looks up an eligible rule for the production. Several terminals may
    /// textually match the current lexeme, so the candidates are tried in
    /// the grammar's registration order; the first one with a table entry
    /// wins.
    fn predict(&self, production: ProductionId, token: &Token) -> Option<RuleId> {
        self.grammar
            .terminals()
            .filter(|(_, terminal)| terminal.matches(&token.lexeme.content))
            .find_map(|(id, _)| self.grammar.lookup(production, id))
    }

    /// The input is accepted when the end-of-input token matches the
    /// terminal at the head of the prediction queue.
    fn can_accept(&self, terminal: crate::grammar::symbol::TerminalId, token: &Token) -> bool {
        token.category == TokenCategory::EndOfInputMarker
            && self.grammar.terminal(terminal).matches(&token.lexeme.content)
    }

    /// Replays the recorded leftmost derivation into a CST. Each derivation
    /// item becomes a non-terminal node; its terminal symbols consume the
    /// next queued token (ε-terminals become ε-leaves and consume nothing),
    /// its non-terminal symbols recurse into the next derivation item.
    fn transform_analysis(grammar: &Grammar, analysis: &mut VecDeque<AnalysisItem>) -> CstNode {
        let Some(AnalysisItem::Derivation { production, rule }) = analysis.pop_front() else {
            unreachable!("analysis queue starts with the derivation of its production");
        };
        let symbols = &grammar.rule(production, rule).symbols;
        let mut children = Vec::with_capacity(symbols.len());
        for &symbol in symbols {
            match symbol {
                Symbol::Terminal(id) if grammar.terminal(id).is_epsilon() => {
                    children.push(CstNode::Epsilon);
                }
                Symbol::Terminal(_) => {
                    let Some(AnalysisItem::Token(token)) = analysis.pop_front() else {
                        unreachable!("tokens are queued right after their terminals");
                    };
                    children.push(CstNode::Terminal(token));
                }
                Symbol::NonTerminal(_) => {
                    children.push(Self::transform_analysis(grammar, analysis));
                }
            }
        }
        CstNode::NonTerminal {
            production,
            children,
        }
    }
}

/// Discriminates a parse failure at `position` into the most informative
/// error. Reported positions are the midpoint of the offending lexeme.
fn report_error(position: usize, tokens: &[Token]) -> ParserError {
    use TokenCategory::*;

    let starting = position.min(tokens.len() - 1);
    let current = &tokens[starting];

    if current.category == CloseBracket {
        if let Some((at, token)) = find_last(tokens, OpenBracket, starting) {
            if starting - at == 1 {
                return ParserError::EmptyBracketExpression {
                    position: token.position(),
                };
            }
        }
    }

    let additional: &[TokenCategory] = match current.category {
        EndOfInputMarker => &[
            OpenParenthesis,
            CloseParenthesis,
            OpenBracket,
            AlternationOperator,
            MetacharacterEscape,
            EndAnchor,
        ],
        CloseParenthesis => &[AlternationOperator],
        CloseBracket => &[RangeOperator],
        OrdinaryCharacter => &[CloseParenthesis, EndAnchor],
        _ => &[],
    };
    for &category in additional {
        if let Some((_, token)) = find_last(tokens, category, starting) {
            return error_for(category, token);
        }
    }

    error_for(current.category, current)
}

/// Scans backwards from `starting` (inclusive) for the nearest token of the
/// given category.
fn find_last(
    tokens: &[Token],
    category: TokenCategory,
    starting: usize,
) -> Option<(usize, &Token)> {
    tokens[..=starting]
        .iter()
        .enumerate()
        .rev()
        .find(|(_, token)| token.category == category)
}

fn error_for(category: TokenCategory, token: &Token) -> ParserError {
    use TokenCategory::*;

    let position = token.position();
    match category {
        AlternationOperator => ParserError::DanglingAlternationOperator { position },
        RangeOperator => ParserError::DanglingRangeOperator { position },
        MetacharacterEscape => ParserError::DanglingMetacharacterEscape { position },
        OpenParenthesis => ParserError::UnmatchedOpenParenthesis { position },
        CloseParenthesis => ParserError::UnmatchedCloseParenthesis { position },
        OpenBracket => ParserError::UnmatchedOpenBracket { position },
        StartAnchor => ParserError::UnexpectedStartAnchor { position },
        EndAnchor => ParserError::UnexpectedEndAnchor { position },
        EmptyExpressionMarker => ParserError::UnexpectedEmptyExpression { position },
        StarQuantifier | PlusQuantifier | QuestionMarkQuantifier => {
            ParserError::DanglingQuantificationOperator { position }
        }
        _ => ParserError::UnexpectedCharacter { position },
    }
}
