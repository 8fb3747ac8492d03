//! The pattern grammar: a fixed table of productions, the FIRST/FOLLOW
//! computation over them, and the LL(1) parsing table keyed by
//! (production, terminal).
//!
//! The grammar is a process-wide singleton built on first use; every parser
//! reads the same immutable instance. Terminal symbols are de-duplicated by
//! value, so the same character may be covered by several terminals (for
//! example `^` is both the start-anchor literal and a member of the
//! regular-metacharacter set); the parser resolves such overlaps by trying
//! the matching terminals in registration order and taking the first one
//! with a parsing-table entry.
//!
//! Building the table asserts key uniqueness: an LL(1) conflict in the
//! hand-tuned production table is a programming error, not an input error.

pub(crate) mod symbol;

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};
use symbol::{Symbol, Terminal, TerminalId};

pub(crate) type ProductionId = usize;
pub(crate) type RuleId = usize;

/// Production captions. The semantic analyzer recognizes CST shapes by
/// these, so they mirror the grammatical role rather than the lexical one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Caption {
    Start,
    AnchoredExpression,
    StartAnchor,
    EndAnchor,
    Expression,
    ExpressionPrime,
    Alternation,
    AlternationPrime,
    SimpleExpression,
    SimpleExpressionPrime,
    Concatenation,
    ConcatenationPrime,
    BasicExpression,
    BasicExpressionPrime,
    StarQuantification,
    PlusQuantification,
    QuestionMarkQuantification,
    ElementaryExpression,
    ElementaryExpressionPrime,
    Group,
    BracketExpression,
    BracketExpressionItems,
    BracketExpressionItemsPrime,
    BracketExpressionItem,
    BracketExpressionItemPrime,
    UpperCaseLetterRange,
    LowerCaseLetterRange,
    DigitRange,
    UpperCaseLetter,
    LowerCaseLetter,
    Digit,
    SpecialCharacter,
    RegularMetacharacter,
    BracketExpressionMetacharacter,
    AnyCharacter,
    MetacharacterEscape,
    EmptyExpression,
}

#[derive(Debug)]
pub(crate) struct Rule {
    pub(crate) symbols: Vec<Symbol>,
}

#[derive(Debug)]
pub(crate) struct Production {
    pub(crate) caption: Caption,
    pub(crate) rules: Vec<Rule>,
}

pub(crate) struct Grammar {
    productions: Vec<Production>,
    terminals: Vec<Terminal>,
    start: ProductionId,
    table: HashMap<(ProductionId, TerminalId), RuleId>,
}

/// Symbol shorthand for the production table below.
enum Def {
    N(Caption),
    L(char),
    S(&'static str),
    Eps,
    Eoi,
}

/// Every printable ASCII character that carries no meta role in any
/// context, plus space, newline and horizontal tab.
const SPECIAL_CHARACTERS: &str = "\t\n !\"#%&',/:;<=>@_`{}~";
/// Characters that act as metacharacters in the regular context and are
/// reachable as literals through `\`.
const REGULAR_METACHARACTERS: &str = "()[^$*+?|.";
/// Characters that act as metacharacters inside a bracket expression.
const BRACKET_METACHARACTERS: &str = "-]";

fn definition() -> Vec<(Caption, Vec<Vec<Def>>)> {
    use Caption::*;
    use Def::*;

    vec![
        (Start, vec![vec![N(AnchoredExpression), Eoi]]),
        (
            AnchoredExpression,
            vec![vec![N(StartAnchor), N(Expression), N(EndAnchor)]],
        ),
        (StartAnchor, vec![vec![L('^')], vec![Eps]]),
        (EndAnchor, vec![vec![L('$')], vec![Eps]]),
        (
            Expression,
            vec![vec![N(SimpleExpression), N(ExpressionPrime)]],
        ),
        (ExpressionPrime, vec![vec![N(Alternation)], vec![Eps]]),
        (
            Alternation,
            vec![vec![L('|'), N(SimpleExpression), N(AlternationPrime)]],
        ),
        (AlternationPrime, vec![vec![N(Alternation)], vec![Eps]]),
        (
            SimpleExpression,
            vec![vec![N(BasicExpression), N(SimpleExpressionPrime)]],
        ),
        (SimpleExpressionPrime, vec![vec![N(Concatenation)], vec![Eps]]),
        (
            Concatenation,
            vec![vec![N(BasicExpression), N(ConcatenationPrime)]],
        ),
        (ConcatenationPrime, vec![vec![N(Concatenation)], vec![Eps]]),
        (
            BasicExpression,
            vec![vec![N(ElementaryExpression), N(BasicExpressionPrime)]],
        ),
        (
            BasicExpressionPrime,
            vec![
                vec![N(StarQuantification)],
                vec![N(PlusQuantification)],
                vec![N(QuestionMarkQuantification)],
                vec![Eps],
            ],
        ),
        (StarQuantification, vec![vec![L('*')]]),
        (PlusQuantification, vec![vec![L('+')]]),
        (QuestionMarkQuantification, vec![vec![L('?')]]),
        (
            ElementaryExpression,
            vec![
                vec![N(Group)],
                vec![N(BracketExpression)],
                vec![N(UpperCaseLetter)],
                vec![N(LowerCaseLetter)],
                vec![N(Digit)],
                vec![N(SpecialCharacter)],
                vec![N(BracketExpressionMetacharacter)],
                vec![N(AnyCharacter)],
                vec![N(EmptyExpression)],
                vec![L('\\'), N(ElementaryExpressionPrime)],
            ],
        ),
        (
            ElementaryExpressionPrime,
            vec![vec![N(RegularMetacharacter)], vec![N(MetacharacterEscape)]],
        ),
        // Groups derive the anchored expression so that normalized forms
        // like `(^EMPTY)` and `(EMPTY$)` parse.
        (Group, vec![vec![L('('), N(AnchoredExpression), L(')')]]),
        (
            BracketExpression,
            vec![vec![L('['), N(BracketExpressionItems), L(']')]],
        ),
        (
            BracketExpressionItems,
            vec![vec![N(BracketExpressionItem), N(BracketExpressionItemsPrime)]],
        ),
        (
            BracketExpressionItemsPrime,
            vec![vec![N(BracketExpressionItems)], vec![Eps]],
        ),
        (
            BracketExpressionItem,
            vec![
                vec![N(UpperCaseLetter), N(UpperCaseLetterRange)],
                vec![N(LowerCaseLetter), N(LowerCaseLetterRange)],
                vec![N(Digit), N(DigitRange)],
                vec![N(SpecialCharacter)],
                vec![N(RegularMetacharacter)],
                vec![L('\\'), N(BracketExpressionItemPrime)],
            ],
        ),
        (
            BracketExpressionItemPrime,
            vec![
                vec![N(BracketExpressionMetacharacter)],
                vec![N(MetacharacterEscape)],
            ],
        ),
        (
            UpperCaseLetterRange,
            vec![vec![L('-'), N(UpperCaseLetter)], vec![Eps]],
        ),
        (
            LowerCaseLetterRange,
            vec![vec![L('-'), N(LowerCaseLetter)], vec![Eps]],
        ),
        (DigitRange, vec![vec![L('-'), N(Digit)], vec![Eps]]),
        (UpperCaseLetter, vec![vec![S("ABCDEFGHIJKLMNOPQRSTUVWXYZ")]]),
        (LowerCaseLetter, vec![vec![S("abcdefghijklmnopqrstuvwxyz")]]),
        (Digit, vec![vec![S("0123456789")]]),
        (SpecialCharacter, vec![vec![S(SPECIAL_CHARACTERS)]]),
        (RegularMetacharacter, vec![vec![S(REGULAR_METACHARACTERS)]]),
        (
            BracketExpressionMetacharacter,
            vec![vec![S(BRACKET_METACHARACTERS)]],
        ),
        (AnyCharacter, vec![vec![L('.')]]),
        (MetacharacterEscape, vec![vec![L('\\')]]),
        (EmptyExpression, vec![vec![L(crate::fsm::EMPTY as char)]]),
    ]
}

fn intern(terminals: &mut Vec<Terminal>, terminal: Terminal) -> TerminalId {
    if let Some(id) = terminals.iter().position(|t| *t == terminal) {
        id
    } else {
        terminals.push(terminal);
        terminals.len() - 1
    }
}

impl Grammar {
    fn define() -> Grammar {
        let definition = definition();
        let id_of: HashMap<Caption, ProductionId> = definition
            .iter()
            .enumerate()
            .map(|(id, (caption, _))| (*caption, id))
            .collect();

        let mut terminals = Vec::new();
        let mut productions = Vec::new();
        for (caption, rule_defs) in &definition {
            let rules = rule_defs
                .iter()
                .map(|symbol_defs| Rule {
                    symbols: symbol_defs
                        .iter()
                        .map(|def| match def {
                            Def::N(caption) => Symbol::NonTerminal(id_of[caption]),
                            Def::L(character) => Symbol::Terminal(intern(
                                &mut terminals,
                                Terminal::literal(*character as u8),
                            )),
                            Def::S(values) => {
                                Symbol::Terminal(intern(&mut terminals, Terminal::set(values)))
                            }
                            Def::Eps => {
                                Symbol::Terminal(intern(&mut terminals, Terminal::epsilon()))
                            }
                            Def::Eoi => {
                                Symbol::Terminal(intern(&mut terminals, Terminal::end_of_input()))
                            }
                        })
                        .collect(),
                })
                .collect();
            productions.push(Production {
                caption: *caption,
                rules,
            });
        }

        let epsilon = intern(&mut terminals, Terminal::epsilon());
        let first = compute_first_sets(&productions, epsilon);
        let follow = compute_follow_sets(&productions, &first, epsilon);
        let table = build_parsing_table(&productions, &first, &follow, epsilon);

        Grammar {
            productions,
            terminals,
            start: 0,
            table,
        }
    }

    pub(crate) fn start_production(&self) -> ProductionId {
        self.start
    }

    pub(crate) fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id]
    }

    pub(crate) fn caption(&self, id: ProductionId) -> Caption {
        self.productions[id].caption
    }

    pub(crate) fn rule(&self, production: ProductionId, rule: RuleId) -> &Rule {
        &self.productions[production].rules[rule]
    }

    pub(crate) fn terminal(&self, id: TerminalId) -> &Terminal {
        &self.terminals[id]
    }

    pub(crate) fn terminals(&self) -> impl Iterator<Item = (TerminalId, &Terminal)> {
        self.terminals.iter().enumerate()
    }

    pub(crate) fn lookup(&self, production: ProductionId, terminal: TerminalId) -> Option<RuleId> {
        self.table.get(&(production, terminal)).copied()
    }
}

fn compute_first_sets(productions: &[Production], epsilon: TerminalId) -> Vec<HashSet<TerminalId>> {
    let mut first: Vec<HashSet<TerminalId>> = vec![HashSet::new(); productions.len()];
    let mut changed = true;
    while changed {
        changed = false;
        for (id, production) in productions.iter().enumerate() {
            for rule in &production.rules {
                let addition = rule_first_set(rule, &first, epsilon);
                for terminal in addition {
                    changed |= first[id].insert(terminal);
                }
            }
        }
    }
    first
}

/// A rule's first set: walk the symbols, adding terminals directly and
/// non-terminal first sets minus ε, continuing only through symbols that
/// can derive ε; if every symbol is transparent the rule itself derives ε.
fn rule_first_set(
    rule: &Rule,
    first: &[HashSet<TerminalId>],
    epsilon: TerminalId,
) -> HashSet<TerminalId> {
    let mut result = HashSet::new();
    for symbol in &rule.symbols {
        match *symbol {
            Symbol::Terminal(terminal) => {
                result.insert(terminal);
                return result;
            }
            Symbol::NonTerminal(production) => {
                result.extend(first[production].iter().copied().filter(|&t| t != epsilon));
                if !first[production].contains(&epsilon) {
                    return result;
                }
            }
        }
    }
    result.insert(epsilon);
    result
}

fn compute_follow_sets(
    productions: &[Production],
    first: &[HashSet<TerminalId>],
    epsilon: TerminalId,
) -> Vec<HashSet<TerminalId>> {
    let mut follow: Vec<HashSet<TerminalId>> = vec![HashSet::new(); productions.len()];
    let mut changed = true;
    while changed {
        changed = false;
        for (lhs, production) in productions.iter().enumerate() {
            for rule in &production.rules {
                for (at, symbol) in rule.symbols.iter().enumerate() {
                    let Symbol::NonTerminal(occurrence) = *symbol else {
                        continue;
                    };
                    let mut transparent = true;
                    for neighbor in &rule.symbols[at + 1..] {
                        match *neighbor {
                            Symbol::Terminal(terminal) if terminal == epsilon => {}
                            Symbol::Terminal(terminal) => {
                                changed |= follow[occurrence].insert(terminal);
                                transparent = false;
                                break;
                            }
                            Symbol::NonTerminal(production) => {
                                let addition: Vec<TerminalId> = first[production]
                                    .iter()
                                    .copied()
                                    .filter(|&t| t != epsilon)
                                    .collect();
                                for terminal in addition {
                                    changed |= follow[occurrence].insert(terminal);
                                }
                                if !first[production].contains(&epsilon) {
                                    transparent = false;
                                    break;
                                }
                            }
                        }
                    }
                    if transparent {
                        let addition: Vec<TerminalId> = follow[lhs].iter().copied().collect();
                        for terminal in addition {
                            changed |= follow[occurrence].insert(terminal);
                        }
                    }
                }
            }
        }
    }
    follow
}

fn build_parsing_table(
    productions: &[Production],
    first: &[HashSet<TerminalId>],
    follow: &[HashSet<TerminalId>],
    epsilon: TerminalId,
) -> HashMap<(ProductionId, TerminalId), RuleId> {
    let mut table = HashMap::new();
    for (id, production) in productions.iter().enumerate() {
        for (rule_id, rule) in production.rules.iter().enumerate() {
            let rule_first = rule_first_set(rule, first, epsilon);
            for &terminal in rule_first.iter().filter(|&&t| t != epsilon) {
                let previous = table.insert((id, terminal), rule_id);
                assert!(
                    previous.is_none(),
                    "LL(1) conflict in production {:?}",
                    production.caption
                );
            }
            if rule_first.contains(&epsilon) {
                for &terminal in &follow[id] {
                    let previous = table.insert((id, terminal), rule_id);
                    assert!(
                        previous.is_none(),
                        "LL(1) conflict in production {:?}",
                        production.caption
                    );
                }
            }
        }
    }
    table
}

lazy_static! {
    static ref GRAMMAR: Grammar = Grammar::define();
}

/// The process-wide grammar singleton, built on first use.
pub(crate) fn grammar() -> &'static Grammar {
    &GRAMMAR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_production(caption: Caption) -> ProductionId {
        let grammar = grammar();
        (0..)
            .find(|&id| grammar.caption(id) == caption)
            .unwrap()
    }

    fn predict(production: ProductionId, lexeme: &str) -> Option<RuleId> {
        let grammar = grammar();
        grammar
            .terminals()
            .filter(|(_, terminal)| terminal.matches(lexeme))
            .find_map(|(id, _)| grammar.lookup(production, id))
    }

    #[test]
    fn table_builds_without_conflicts() {
        // Construction asserts key uniqueness; touching the singleton is
        // the test.
        assert!(grammar().production(0).caption == Caption::Start);
    }

    #[test]
    fn terminals_are_deduplicated() {
        let grammar = grammar();
        let backslashes = grammar
            .terminals()
            .filter(|(_, t)| t.matches("\\") && matches!(t.kind, symbol::TerminalKind::Literal(_)))
            .count();
        assert_eq!(backslashes, 1);
    }

    #[test]
    fn caret_is_an_anchor_at_expression_start() {
        let start_anchor = find_production(Caption::StartAnchor);
        // `^` takes the explicit anchor rule, everything else in
        // FIRST(expression) selects the ε-rule.
        assert_eq!(predict(start_anchor, "^"), Some(0));
        assert_eq!(predict(start_anchor, "a"), Some(1));
        assert_eq!(predict(start_anchor, "("), Some(1));
        // `*` cannot begin an expression at all.
        assert_eq!(predict(start_anchor, "*"), None);
    }

    #[test]
    fn caret_is_not_an_ordinary_character_mid_pattern() {
        let elementary = find_production(Caption::ElementaryExpression);
        assert_eq!(predict(elementary, "^"), None);
        assert_eq!(predict(elementary, "$"), None);
        // Unescaped `-` and `]` are ordinary in the regular context.
        assert!(predict(elementary, "-").is_some());
        assert!(predict(elementary, "]").is_some());
    }

    #[test]
    fn end_anchor_epsilon_rule_is_keyed_by_end_of_input() {
        let end_anchor = find_production(Caption::EndAnchor);
        assert_eq!(predict(end_anchor, "$"), Some(0));
        // The empty lexeme of the end-of-input token selects the ε-rule
        // through the follow set.
        assert_eq!(predict(end_anchor, ""), Some(1));
    }

    #[test]
    fn dot_is_any_character_outside_brackets_and_literal_inside() {
        let elementary = find_production(Caption::ElementaryExpression);
        let item = find_production(Caption::BracketExpressionItem);
        let any_rule = predict(elementary, ".").unwrap();
        let grammar = grammar();
        let rule = grammar.rule(elementary, any_rule);
        let Symbol::NonTerminal(target) = rule.symbols[0] else {
            panic!("expected a non-terminal");
        };
        assert_eq!(grammar.caption(target), Caption::AnyCharacter);

        let item_rule = predict(item, ".").unwrap();
        let rule = grammar.rule(item, item_rule);
        let Symbol::NonTerminal(target) = rule.symbols[0] else {
            panic!("expected a non-terminal");
        };
        assert_eq!(grammar.caption(target), Caption::RegularMetacharacter);
    }
}
