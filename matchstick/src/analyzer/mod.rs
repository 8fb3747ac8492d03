//! Semantic analysis: lowering the concrete syntax tree into an abstract
//! syntax tree and checking range validity.
//!
//! The lowering works by structural recognition rather than per-production
//! dispatch: a node either *is* a constant (a character-class production
//! with a token child), an anchored expression, a unary or binary operator
//! shape, or else the analyzer descends into its first non-terminal child and
//! tries again. Chains of single-child productions thus vanish from the
//! AST without being special-cased.

use crate::fsm::ANY;
use crate::grammar::{grammar, Caption, Grammar};
use crate::lexer::{Token, TokenCategory};
use crate::parser::CstNode;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SemanticError {
    #[error("Range contains invalid values (position {position})")]
    InvalidRangeValues { position: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnchorKind {
    Anchored,
    Unanchored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryKind {
    Star,
    Plus,
    Question,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryKind {
    Alternation,
    Concatenation,
    Range,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Ast {
    /// Accepts only the empty string.
    Empty,
    Constant {
        value: u8,
        position: u32,
    },
    Anchor {
        start: AnchorKind,
        end: AnchorKind,
        inner: Box<Ast>,
    },
    Unary {
        kind: UnaryKind,
        operand: Box<Ast>,
    },
    Binary {
        kind: BinaryKind,
        left: Box<Ast>,
        right: Box<Ast>,
    },
}

/// Lowers the CST and validates the result. The CST is discarded by the
/// caller afterwards; nothing of it survives into the AST but constant
/// values and their pattern positions.
pub(crate) fn build_abstract_syntax_tree(cst: &CstNode) -> Result<Ast, SemanticError> {
    let ast = lower(grammar(), cst);
    validate(&ast)?;
    Ok(ast)
}

const CONSTANT_CAPTIONS: &[Caption] = &[
    Caption::UpperCaseLetter,
    Caption::LowerCaseLetter,
    Caption::Digit,
    Caption::SpecialCharacter,
    Caption::RegularMetacharacter,
    Caption::BracketExpressionMetacharacter,
    Caption::AnyCharacter,
    Caption::MetacharacterEscape,
    Caption::EmptyExpression,
];

const BINARY_CAPTIONS: &[Caption] = &[
    Caption::Expression,
    Caption::Alternation,
    Caption::SimpleExpression,
    Caption::Concatenation,
    Caption::BracketExpressionItems,
    Caption::BracketExpressionItem,
];

fn lower(grammar: &Grammar, node: &CstNode) -> Ast {
    if let Some(token) = recognize_constant(grammar, node) {
        return create_constant(token);
    }
    if let Some((start, end, inner)) = recognize_anchor(grammar, node) {
        return Ast::Anchor {
            start,
            end,
            inner: Box::new(lower(grammar, inner)),
        };
    }
    if let Some((operand, kind)) = recognize_unary_operator(grammar, node) {
        return Ast::Unary {
            kind,
            operand: Box::new(lower(grammar, operand)),
        };
    }
    if let Some((left, right, kind)) = recognize_binary_operator(grammar, node) {
        return Ast::Binary {
            kind,
            left: Box::new(lower(grammar, left)),
            right: Box::new(lower(grammar, right)),
        };
    }

    // None of the shapes matched: continue with the first (and only
    // relevant) non-terminal child.
    let child = non_terminal_children(node)
        .into_iter()
        .next()
        .expect("a non-leaf CST node keeps at least one non-terminal child");
    lower(grammar, child)
}

fn caption_of(grammar: &Grammar, node: &CstNode) -> Option<Caption> {
    match node {
        CstNode::NonTerminal { production, .. } => Some(grammar.caption(*production)),
        _ => None,
    }
}

fn non_terminal_children(node: &CstNode) -> Vec<&CstNode> {
    match node {
        CstNode::NonTerminal { children, .. } => children
            .iter()
            .filter(|child| matches!(child, CstNode::NonTerminal { .. }))
            .collect(),
        _ => Vec::new(),
    }
}

fn token_child(node: &CstNode) -> Option<&Token> {
    match node {
        CstNode::NonTerminal { children, .. } => children.iter().find_map(|child| match child {
            CstNode::Terminal(token) => Some(token),
            _ => None,
        }),
        _ => None,
    }
}

/// Whether the node derived ε (its sole child is an ε-leaf).
fn derived_epsilon(node: &CstNode) -> bool {
    match node {
        CstNode::NonTerminal { children, .. } => {
            matches!(children.as_slice(), [CstNode::Epsilon])
        }
        _ => false,
    }
}

fn recognize_constant<'a>(grammar: &Grammar, node: &'a CstNode) -> Option<&'a Token> {
    let caption = caption_of(grammar, node)?;
    if !CONSTANT_CAPTIONS.contains(&caption) {
        return None;
    }
    token_child(node)
}

fn create_constant(token: &Token) -> Ast {
    match token.category {
        TokenCategory::EmptyExpressionMarker => Ast::Empty,
        TokenCategory::AnyCharacter => Ast::Constant {
            value: ANY,
            position: token.position(),
        },
        _ => Ast::Constant {
            value: token.lexeme.content.as_bytes()[0],
            position: token.position(),
        },
    }
}

/// The anchored-expression node has exactly three non-terminal children:
/// the optional start anchor, the expression, and the optional end anchor.
/// An anchor option is anchored when it derived the explicit `^`/`$`
/// alternative rather than ε.
fn recognize_anchor<'a>(
    grammar: &Grammar,
    node: &'a CstNode,
) -> Option<(AnchorKind, AnchorKind, &'a CstNode)> {
    if caption_of(grammar, node)? != Caption::AnchoredExpression {
        return None;
    }
    let children = non_terminal_children(node);
    let &[start_option, inner, end_option] = children.as_slice() else {
        return None;
    };
    let kind_of = |option: &CstNode| {
        if derived_epsilon(option) {
            AnchorKind::Unanchored
        } else {
            AnchorKind::Anchored
        }
    };
    Some((kind_of(start_option), kind_of(end_option), inner))
}

fn recognize_unary_operator<'a>(
    grammar: &Grammar,
    node: &'a CstNode,
) -> Option<(&'a CstNode, UnaryKind)> {
    if caption_of(grammar, node)? != Caption::BasicExpression {
        return None;
    }
    let children = non_terminal_children(node);
    for child in &children {
        if caption_of(grammar, child) != Some(Caption::BasicExpressionPrime)
            || derived_epsilon(child)
        {
            continue;
        }
        let quantification = non_terminal_children(child).into_iter().next()?;
        let kind = match caption_of(grammar, quantification)? {
            Caption::StarQuantification => UnaryKind::Star,
            Caption::PlusQuantification => UnaryKind::Plus,
            Caption::QuestionMarkQuantification => UnaryKind::Question,
            _ => continue,
        };
        return Some((children[0], kind));
    }
    None
}

/// A node with a non-ε prime (or range) sibling is a binary operator: the
/// left operand is the first non-terminal child, the right operand is the
/// last non-terminal under the prime sibling, and the sibling's caption
/// selects the operator kind.
fn recognize_binary_operator<'a>(
    grammar: &Grammar,
    node: &'a CstNode,
) -> Option<(&'a CstNode, &'a CstNode, BinaryKind)> {
    let caption = caption_of(grammar, node)?;
    if !BINARY_CAPTIONS.contains(&caption) {
        return None;
    }
    let children = non_terminal_children(node);
    for child in &children {
        let Some(kind) = binary_kind_of(caption_of(grammar, child)?) else {
            continue;
        };
        if derived_epsilon(child) {
            continue;
        }
        let grandchildren = non_terminal_children(child);
        let Some(&right) = grandchildren.last() else {
            continue;
        };
        return Some((children[0], right, kind));
    }
    None
}

fn binary_kind_of(caption: Caption) -> Option<BinaryKind> {
    match caption {
        Caption::ExpressionPrime
        | Caption::AlternationPrime
        | Caption::BracketExpressionItemsPrime => Some(BinaryKind::Alternation),
        Caption::SimpleExpressionPrime | Caption::ConcatenationPrime => {
            Some(BinaryKind::Concatenation)
        }
        Caption::UpperCaseLetterRange
        | Caption::LowerCaseLetterRange
        | Caption::DigitRange => Some(BinaryKind::Range),
        _ => None,
    }
}

/// A range is valid when its endpoints are constants in strictly ascending
/// order; the reported position is the midpoint of the two endpoints.
fn validate(ast: &Ast) -> Result<(), SemanticError> {
    match ast {
        Ast::Empty | Ast::Constant { .. } => Ok(()),
        Ast::Anchor { inner, .. } => validate(inner),
        Ast::Unary { operand, .. } => validate(operand),
        Ast::Binary { kind, left, right } => {
            if *kind == BinaryKind::Range {
                let (
                    Ast::Constant {
                        value: low,
                        position: low_position,
                    },
                    Ast::Constant {
                        value: high,
                        position: high_position,
                    },
                ) = (left.as_ref(), right.as_ref())
                else {
                    unreachable!("the grammar only derives ranges between constants");
                };
                if low >= high {
                    return Err(SemanticError::InvalidRangeValues {
                        position: (low_position + high_position) / 2,
                    });
                }
            }
            validate(left)?;
            validate(right)
        }
    }
}
