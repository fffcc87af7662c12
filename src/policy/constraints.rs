// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::error::PolicyError;
use super::index::PolicyIndex;
use super::parsed_policy::ConstraintData;
use super::symbols::{ObjectClass, Role, Type, User};

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Operand encodings of constraint expression terms. A base kind may be combined with
/// [`CEXPR_SYM_TARGET`] or [`CEXPR_SYM_XTARGET`] to name the target or transition side.
pub const CEXPR_SYM_USER: u32 = 1;
pub const CEXPR_SYM_ROLE: u32 = 2;
pub const CEXPR_SYM_TYPE: u32 = 4;
pub const CEXPR_SYM_TARGET: u32 = 8;
pub const CEXPR_SYM_XTARGET: u32 = 16;
pub const CEXPR_SYM_L1L2: u32 = 32;
pub const CEXPR_SYM_L1H2: u32 = 64;
pub const CEXPR_SYM_H1L2: u32 = 128;
pub const CEXPR_SYM_H1H2: u32 = 256;
pub const CEXPR_SYM_L1H1: u32 = 512;
pub const CEXPR_SYM_L2H2: u32 = 1024;

/// Precedence given to the first binary operator, so that a lone comparison is not
/// parenthesized.
const MAX_PRECEDENCE: u8 = 4;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConstraintError {
    #[error("invalid operand encoding {sym_type} in constraint term")]
    InvalidOperandType { sym_type: u32 },
    #[error("invalid constraint term sequence")]
    InvalidTermSequence,
}

keyword_enum! {
    /// The four kinds of constraint statements. `mls` kinds are derived from the operands of the
    /// expression rather than from the keyword used in the source.
    ConstraintRuleType,
    |ruletype: String| PolicyError::InvalidConstraintType { ruletype },
    {
        Constrain => "constrain",
        MlsConstrain => "mlsconstrain",
        ValidateTrans => "validatetrans",
        MlsValidateTrans => "mlsvalidatetrans",
    }
}

/// An operator comparing two security context fields, or a field against a set of names.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ConstraintOperator {
    Equal,        // `eq` or `==` in policy language
    NotEqual,     // `neq` or `!=` in policy language
    Dominates,    // `dom` in policy language
    DominatedBy,  // `domby` in policy language
    Incomparable, // `incomp` in policy language
}

impl fmt::Display for ConstraintOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConstraintOperator::Equal => "==",
            ConstraintOperator::NotEqual => "!=",
            ConstraintOperator::Dominates => "dom",
            ConstraintOperator::DominatedBy => "domby",
            ConstraintOperator::Incomparable => "incomp",
        })
    }
}

/// A term of a constraint expression, stored in postfix order.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(super) enum ConstraintTerm {
    /// Compares a field of the source context with a field of the target context.
    Attribute { sym_type: u32, operator: ConstraintOperator },
    /// Compares one context field with a literal set of user, role or type names.
    Names { sym_type: u32, operator: ConstraintOperator, names: Vec<String> },
    Not,
    And,
    Or,
}

/// Returns the mnemonic for an operand encoding.
///
/// `CEXPR_SYM_L1H1 + CEXPR_SYM_TARGET` maps to `h1`, which is what the right-hand side of an
/// `l1 ... h1` comparison names.
pub fn sym_to_text(sym_type: u32) -> Option<&'static str> {
    const T: u32 = CEXPR_SYM_TARGET;
    const X: u32 = CEXPR_SYM_XTARGET;
    Some(match sym_type {
        CEXPR_SYM_USER => "u1",
        s if s == CEXPR_SYM_USER + T => "u2",
        s if s == CEXPR_SYM_USER + X => "u3",
        CEXPR_SYM_ROLE => "r1",
        s if s == CEXPR_SYM_ROLE + T => "r2",
        s if s == CEXPR_SYM_ROLE + X => "r3",
        CEXPR_SYM_TYPE => "t1",
        s if s == CEXPR_SYM_TYPE + T => "t2",
        s if s == CEXPR_SYM_TYPE + X => "t3",
        CEXPR_SYM_L1L2 | CEXPR_SYM_L1H2 | CEXPR_SYM_L1H1 => "l1",
        CEXPR_SYM_H1L2 | CEXPR_SYM_H1H2 => "h1",
        CEXPR_SYM_L2H2 => "l2",
        s if s == CEXPR_SYM_L1L2 + T || s == CEXPR_SYM_H1L2 + T => "l2",
        s if s == CEXPR_SYM_L1H2 + T || s == CEXPR_SYM_H1H2 + T || s == CEXPR_SYM_L2H2 + T => {
            "h2"
        }
        s if s == CEXPR_SYM_L1H1 + T => "h1",
        _ => return None,
    })
}

fn base_kind(sym_type: u32) -> u32 {
    sym_type & !(CEXPR_SYM_TARGET | CEXPR_SYM_XTARGET)
}

/// Checks that `terms` is a well-formed postfix sequence with known operand encodings.
pub(super) fn validate_terms(terms: &[ConstraintTerm]) -> Result<(), ConstraintError> {
    let mut depth = 0usize;
    for term in terms {
        match term {
            ConstraintTerm::Attribute { sym_type, .. } => {
                if base_kind(*sym_type) != *sym_type
                    || sym_to_text(*sym_type).is_none()
                    || sym_to_text(sym_type + CEXPR_SYM_TARGET).is_none()
                {
                    return Err(ConstraintError::InvalidOperandType { sym_type: *sym_type });
                }
                depth += 1;
            }
            ConstraintTerm::Names { sym_type, .. } => {
                if base_kind(*sym_type) >= CEXPR_SYM_L1L2 || sym_to_text(*sym_type).is_none() {
                    return Err(ConstraintError::InvalidOperandType { sym_type: *sym_type });
                }
                depth += 1;
            }
            ConstraintTerm::Not => {
                if depth == 0 {
                    return Err(ConstraintError::InvalidTermSequence);
                }
            }
            ConstraintTerm::And | ConstraintTerm::Or => {
                if depth < 2 {
                    return Err(ConstraintError::InvalidTermSequence);
                }
                depth -= 1;
            }
        }
    }
    if depth != 1 {
        return Err(ConstraintError::InvalidTermSequence);
    }
    Ok(())
}

/// Returns true if any attribute comparison in `terms` involves MLS levels.
pub(super) fn is_mls_expression(terms: &[ConstraintTerm]) -> bool {
    terms.iter().any(|term| {
        matches!(term, ConstraintTerm::Attribute { sym_type, .. } if *sym_type >= CEXPR_SYM_L1L2)
    })
}

/// An operator of a constraint expression.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ExprOperator {
    Compare(ConstraintOperator),
    Not,
    And,
    Or,
}

impl ExprOperator {
    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            ExprOperator::Not => 4,
            ExprOperator::Compare(_) => 3,
            ExprOperator::And => 2,
            ExprOperator::Or => 1,
        }
    }
}

impl fmt::Display for ExprOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprOperator::Compare(operator) => write!(f, "{}", operator),
            ExprOperator::Not => f.write_str("not"),
            ExprOperator::And => f.write_str("and"),
            ExprOperator::Or => f.write_str("or"),
        }
    }
}

/// A symbol named in a constraint expression.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ExpressionSymbol<'a> {
    User(User<'a>),
    Role(Role<'a>),
    Type(Type<'a>),
}

impl fmt::Display for ExpressionSymbol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionSymbol::User(user) => write!(f, "{}", user),
            ExpressionSymbol::Role(role) => write!(f, "{}", role),
            ExpressionSymbol::Type(type_) => write!(f, "{}", type_),
        }
    }
}

/// A token of a constraint expression, in either postfix or infix order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExprToken<'a> {
    /// A context field mnemonic such as `u1` or `h2`.
    Operand(&'static str),
    /// A literal set of names.
    Names(BTreeSet<ExpressionSymbol<'a>>),
    Operator(ExprOperator),
    OpenParen,
    CloseParen,
}

impl fmt::Display for ExprToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprToken::Operand(operand) => f.write_str(operand),
            ExprToken::Names(names) => match names.len() {
                0 => f.write_str("<empty set>"),
                1 => names.iter().try_for_each(|name| write!(f, "{}", name)),
                _ => {
                    f.write_str("{")?;
                    names.iter().try_for_each(|name| write!(f, " {}", name))?;
                    f.write_str(" }")
                }
            },
            ExprToken::Operator(operator) => write!(f, "{}", operator),
            ExprToken::OpenParen => f.write_str("("),
            ExprToken::CloseParen => f.write_str(")"),
        }
    }
}

/// Converts a postfix token sequence to infix, parenthesizing every binary subexpression whose
/// operator does not bind strictly looser than the operator emitted before it. An operand that
/// would regroup under its enclosing operator is parenthesized as well.
pub fn postfix_to_infix(postfix: Vec<ExprToken<'_>>) -> Vec<ExprToken<'_>> {
    // Entries carry the precedence of their outermost operator; atoms and bracketed
    // subexpressions carry MAX_PRECEDENCE.
    let mut stack: Vec<(u8, Vec<ExprToken<'_>>)> = Vec::new();
    let mut prev_precedence = MAX_PRECEDENCE;
    for token in postfix {
        match token {
            ExprToken::Operator(ExprOperator::Not) => {
                let (_, operand) = stack.pop().unwrap_or_default();
                let mut expr = Vec::with_capacity(operand.len() + 3);
                expr.push(ExprToken::Operator(ExprOperator::Not));
                expr.push(ExprToken::OpenParen);
                expr.extend(operand);
                expr.push(ExprToken::CloseParen);
                stack.push((MAX_PRECEDENCE, expr));
            }
            ExprToken::Operator(operator) => {
                let (rhs_precedence, rhs) = stack.pop().unwrap_or_default();
                let (lhs_precedence, lhs) = stack.pop().unwrap_or_default();
                let precedence = operator.precedence();
                let parenthesize = precedence >= prev_precedence;
                let mut expr = Vec::with_capacity(lhs.len() + rhs.len() + 7);
                if parenthesize {
                    expr.push(ExprToken::OpenParen);
                }
                push_grouped(&mut expr, lhs, lhs_precedence < precedence);
                expr.push(ExprToken::Operator(operator));
                // Operators are left-associative, so an equal-precedence right operand is
                // grouped too.
                push_grouped(&mut expr, rhs, rhs_precedence <= precedence);
                if parenthesize {
                    expr.push(ExprToken::CloseParen);
                }
                stack.push((if parenthesize { MAX_PRECEDENCE } else { precedence }, expr));
                prev_precedence = precedence;
            }
            operand => stack.push((MAX_PRECEDENCE, vec![operand])),
        }
    }
    stack.into_iter().flat_map(|(_, expr)| expr).collect()
}

fn push_grouped<'a>(expr: &mut Vec<ExprToken<'a>>, operand: Vec<ExprToken<'a>>, group: bool) {
    if group {
        expr.push(ExprToken::OpenParen);
        expr.extend(operand);
        expr.push(ExprToken::CloseParen);
    } else {
        expr.extend(operand);
    }
}

fn join_tokens(tokens: &[ExprToken<'_>]) -> String {
    tokens.iter().map(|token| token.to_string()).collect::<Vec<_>>().join(" ")
}

/// A `constrain`, `mlsconstrain`, `validatetrans` or `mlsvalidatetrans` statement, for one
/// object class.
#[derive(Clone, Copy)]
pub struct Constraint<'a> {
    index: &'a PolicyIndex,
    data: &'a ConstraintData,
}

impl<'a> Constraint<'a> {
    pub(super) fn new(index: &'a PolicyIndex, data: &'a ConstraintData) -> Self {
        Self { index, data }
    }

    /// True if the expression compares MLS levels.
    pub fn is_mls(&self) -> bool {
        is_mls_expression(&self.data.terms)
    }

    pub fn ruletype(&self) -> ConstraintRuleType {
        match (self.data.validatetrans, self.is_mls()) {
            (false, false) => ConstraintRuleType::Constrain,
            (false, true) => ConstraintRuleType::MlsConstrain,
            (true, false) => ConstraintRuleType::ValidateTrans,
            (true, true) => ConstraintRuleType::MlsValidateTrans,
        }
    }

    pub fn tclass(&self) -> ObjectClass<'a> {
        ObjectClass::new(self.index, &self.index.parsed_policy().classes[self.data.class])
    }

    /// The constrained permissions. `validatetrans` kinds have none.
    pub fn perms(&self) -> Result<BTreeSet<&'a str>, PolicyError> {
        if self.data.validatetrans {
            return Err(PolicyError::ConstraintUse { ruletype: self.ruletype().to_string() });
        }
        Ok(self.data.perms.iter().map(String::as_str).collect())
    }

    fn names(&self, sym_type: u32, names: &'a [String]) -> BTreeSet<ExpressionSymbol<'a>> {
        let index = self.index;
        let policy = index.parsed_policy();
        names
            .iter()
            .filter_map(|name| match base_kind(sym_type) {
                CEXPR_SYM_USER => index
                    .user_index(name)
                    .map(|i| ExpressionSymbol::User(User::new(index, &policy.users[i]))),
                CEXPR_SYM_ROLE => index
                    .role_index(name)
                    .map(|i| ExpressionSymbol::Role(Role::new(index, &policy.roles[i]))),
                _ => index
                    .type_index(name)
                    .map(|i| ExpressionSymbol::Type(Type::new(index, &policy.types[i]))),
            })
            .collect()
    }

    /// The expression in postfix order: `[operand, operand, operator]` per comparison and
    /// `[operator]` per logical operator.
    pub fn postfix_expression(&self) -> Vec<ExprToken<'a>> {
        let mut tokens = Vec::with_capacity(self.data.terms.len() * 3);
        for term in &self.data.terms {
            match term {
                ConstraintTerm::Attribute { sym_type, operator } => {
                    tokens.push(ExprToken::Operand(sym_to_text(*sym_type).unwrap_or("?")));
                    tokens.push(ExprToken::Operand(
                        sym_to_text(sym_type + CEXPR_SYM_TARGET).unwrap_or("?"),
                    ));
                    tokens.push(ExprToken::Operator(ExprOperator::Compare(*operator)));
                }
                ConstraintTerm::Names { sym_type, operator, names } => {
                    tokens.push(ExprToken::Operand(sym_to_text(*sym_type).unwrap_or("?")));
                    tokens.push(ExprToken::Names(self.names(*sym_type, names)));
                    tokens.push(ExprToken::Operator(ExprOperator::Compare(*operator)));
                }
                ConstraintTerm::Not => tokens.push(ExprToken::Operator(ExprOperator::Not)),
                ConstraintTerm::And => tokens.push(ExprToken::Operator(ExprOperator::And)),
                ConstraintTerm::Or => tokens.push(ExprToken::Operator(ExprOperator::Or)),
            }
        }
        tokens
    }

    /// The expression in infix order, with parentheses.
    pub fn expression(&self) -> Vec<ExprToken<'a>> {
        postfix_to_infix(self.postfix_expression())
    }

    fn symbols_of_kind(&self, kind: u32) -> impl Iterator<Item = ExpressionSymbol<'a>> + '_ {
        self.data.terms.iter().flat_map(move |term| match term {
            ConstraintTerm::Names { sym_type, names, .. } if base_kind(*sym_type) == kind => {
                self.names(*sym_type, names).into_iter().collect::<Vec<_>>()
            }
            _ => Vec::new(),
        })
    }

    /// Users named in the expression.
    pub fn users(&self) -> BTreeSet<User<'a>> {
        self.symbols_of_kind(CEXPR_SYM_USER)
            .filter_map(|symbol| match symbol {
                ExpressionSymbol::User(user) => Some(user),
                _ => None,
            })
            .collect()
    }

    /// Roles named in the expression.
    pub fn roles(&self) -> BTreeSet<Role<'a>> {
        self.symbols_of_kind(CEXPR_SYM_ROLE)
            .filter_map(|symbol| match symbol {
                ExpressionSymbol::Role(role) => Some(role),
                _ => None,
            })
            .collect()
    }

    /// Types and attributes named in the expression.
    pub fn types(&self) -> BTreeSet<Type<'a>> {
        self.symbols_of_kind(CEXPR_SYM_TYPE)
            .filter_map(|symbol| match symbol {
                ExpressionSymbol::Type(type_) => Some(type_),
                _ => None,
            })
            .collect()
    }

    pub fn statement(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Constraint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.ruletype(), self.tclass())?;
        if let Ok(perms) = self.perms() {
            if perms.len() == 1 {
                perms.iter().try_for_each(|perm| write!(f, "{} ", perm))?;
            } else {
                write!(f, "{{ {} }} ", perms.into_iter().collect::<Vec<_>>().join(" "))?;
            }
        }
        write!(f, "({});", join_tokens(&self.expression()))
    }
}

impl fmt::Debug for Constraint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Constraint").field(&self.to_string()).finish()
    }
}

impl PartialEq for Constraint<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.data, other.data)
    }
}

impl Eq for Constraint<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::statements::{parse_statements, StatementKind};
    use crate::policy::{LoadOptions, Policy};
    use test_case::test_case;

    fn op(operator: ConstraintOperator) -> ExprToken<'static> {
        ExprToken::Operator(ExprOperator::Compare(operator))
    }

    fn render(tokens: Vec<ExprToken<'_>>) -> String {
        join_tokens(&postfix_to_infix(tokens))
    }

    #[test]
    fn single_comparison_has_no_parentheses() {
        let postfix = vec![
            ExprToken::Operand("u1"),
            ExprToken::Operand("u2"),
            op(ConstraintOperator::Equal),
        ];
        assert_eq!(render(postfix), "u1 == u2");
    }

    #[test]
    fn chained_and_parenthesizes_equal_precedence() {
        let postfix = vec![
            ExprToken::Operand("u1"),
            ExprToken::Operand("u2"),
            op(ConstraintOperator::Equal),
            ExprToken::Operand("r1"),
            ExprToken::Operand("r2"),
            op(ConstraintOperator::Equal),
            ExprToken::Operator(ExprOperator::And),
        ];
        assert_eq!(render(postfix), "u1 == u2 and ( r1 == r2 )");
    }

    #[test]
    fn not_wraps_operand() {
        let postfix = vec![
            ExprToken::Operand("t1"),
            ExprToken::Operand("t2"),
            op(ConstraintOperator::NotEqual),
            ExprToken::Operator(ExprOperator::Not),
        ];
        assert_eq!(render(postfix), "not ( t1 != t2 )");
    }

    #[test]
    fn nested_or_and() {
        let postfix = vec![
            ExprToken::Operand("u1"),
            ExprToken::Operand("u2"),
            op(ConstraintOperator::Equal),
            ExprToken::Operand("r1"),
            ExprToken::Operand("r2"),
            op(ConstraintOperator::Equal),
            ExprToken::Operator(ExprOperator::Or),
            ExprToken::Operand("t1"),
            ExprToken::Operand("t2"),
            op(ConstraintOperator::Equal),
            ExprToken::Operator(ExprOperator::And),
        ];
        assert_eq!(render(postfix), "( u1 == u2 or ( r1 == r2 ) ) and ( t1 == t2 )");
    }

    #[test]
    fn right_grouping_is_kept() {
        let postfix = vec![
            ExprToken::Operand("u1"),
            ExprToken::Operand("u2"),
            op(ConstraintOperator::Equal),
            ExprToken::Operand("r1"),
            ExprToken::Operand("r2"),
            op(ConstraintOperator::Equal),
            ExprToken::Operand("t1"),
            ExprToken::Operand("t2"),
            op(ConstraintOperator::Equal),
            ExprToken::Operator(ExprOperator::Or),
            ExprToken::Operator(ExprOperator::And),
        ];
        assert_eq!(render(postfix), "( u1 == u2 and ( ( r1 == r2 ) or ( t1 == t2 ) ) )");
    }

    #[test_case(CEXPR_SYM_USER, "u1")]
    #[test_case(CEXPR_SYM_USER + CEXPR_SYM_TARGET, "u2")]
    #[test_case(CEXPR_SYM_USER + CEXPR_SYM_XTARGET, "u3")]
    #[test_case(CEXPR_SYM_ROLE + CEXPR_SYM_TARGET, "r2")]
    #[test_case(CEXPR_SYM_TYPE + CEXPR_SYM_XTARGET, "t3")]
    #[test_case(CEXPR_SYM_L1L2, "l1")]
    #[test_case(CEXPR_SYM_L1H2, "l1")]
    #[test_case(CEXPR_SYM_L1H1, "l1")]
    #[test_case(CEXPR_SYM_H1L2, "h1")]
    #[test_case(CEXPR_SYM_H1H2, "h1")]
    #[test_case(CEXPR_SYM_L2H2, "l2")]
    #[test_case(CEXPR_SYM_L1L2 + CEXPR_SYM_TARGET, "l2")]
    #[test_case(CEXPR_SYM_H1L2 + CEXPR_SYM_TARGET, "l2")]
    #[test_case(CEXPR_SYM_L1H2 + CEXPR_SYM_TARGET, "h2")]
    #[test_case(CEXPR_SYM_H1H2 + CEXPR_SYM_TARGET, "h2")]
    #[test_case(CEXPR_SYM_L2H2 + CEXPR_SYM_TARGET, "h2")]
    #[test_case(CEXPR_SYM_L1H1 + CEXPR_SYM_TARGET, "h1")]
    fn mnemonics(sym_type: u32, mnemonic: &str) {
        assert_eq!(sym_to_text(sym_type), Some(mnemonic));
    }

    #[test]
    fn unknown_mnemonic() {
        assert_eq!(sym_to_text(3), None);
        assert_eq!(sym_to_text(CEXPR_SYM_L1L2 + CEXPR_SYM_XTARGET), None);
    }

    #[test]
    fn term_validation() {
        let compare = ConstraintTerm::Attribute {
            sym_type: CEXPR_SYM_USER,
            operator: ConstraintOperator::Equal,
        };
        assert_eq!(validate_terms(&[compare.clone()]), Ok(()));
        assert_eq!(
            validate_terms(&[compare.clone(), ConstraintTerm::And]),
            Err(ConstraintError::InvalidTermSequence)
        );
        assert_eq!(
            validate_terms(&[compare.clone(), compare.clone()]),
            Err(ConstraintError::InvalidTermSequence)
        );
        assert_eq!(
            validate_terms(&[ConstraintTerm::Names {
                sym_type: CEXPR_SYM_L1L2,
                operator: ConstraintOperator::Equal,
                names: vec![],
            }]),
            Err(ConstraintError::InvalidOperandType { sym_type: CEXPR_SYM_L1L2 })
        );
    }

    #[test]
    fn mls_detection() {
        let level = ConstraintTerm::Attribute {
            sym_type: CEXPR_SYM_L1L2,
            operator: ConstraintOperator::Dominates,
        };
        let user = ConstraintTerm::Names {
            sym_type: CEXPR_SYM_USER + CEXPR_SYM_TARGET,
            operator: ConstraintOperator::Equal,
            names: vec!["system_u".to_string()],
        };
        assert!(is_mls_expression(&[level]));
        assert!(!is_mls_expression(&[user]));
    }

    const POLICY: &str = r#"
class file
class process
common file { read write getattr }
class file inherits file
class process { transition }
sensitivity s0;
dominance { s0 }
category c0;
level s0:c0;
attribute domain;
type a_t, domain;
type b_t, domain;
role r;
role object_r;
user u roles { r object_r } level s0 range s0 - s0:c0;
user v roles r level s0 range s0;
constrain file { write read } (u1 == u2 and r1 == r2);
constrain file getattr (t1 == { a_t b_t } or u2 != v);
mlsconstrain process transition (l1 dom h2 and t1 == domain);
validatetrans file (t3 == a_t);
mlsvalidatetrans file (not l1 eq l2);
"#;

    fn policy() -> Policy {
        Policy::parse(POLICY, &LoadOptions::default()).expect("parse policy")
    }

    #[test]
    fn constraint_strings() {
        let policy = policy();
        let strings: Vec<String> = policy.constraints().map(|c| c.to_string()).collect();
        assert_eq!(
            strings,
            vec![
                "constrain file { read write } (u1 == u2 and ( r1 == r2 ));",
                "constrain file getattr (t1 == { a_t b_t } or ( u2 != v ));",
                "mlsconstrain process transition (l1 dom h2 and ( t1 == domain ));",
                "validatetrans file (t3 == a_t);",
                "mlsvalidatetrans file (not ( l1 == l2 ));",
            ]
        );
    }

    #[test]
    fn derived_ruletypes_and_perms() {
        let policy = policy();
        let constraints: Vec<_> = policy.constraints().collect();
        assert_eq!(constraints[0].ruletype(), ConstraintRuleType::Constrain);
        assert_eq!(constraints[2].ruletype(), ConstraintRuleType::MlsConstrain);
        assert_eq!(constraints[3].ruletype(), ConstraintRuleType::ValidateTrans);
        assert_eq!(constraints[4].ruletype(), ConstraintRuleType::MlsValidateTrans);
        assert_eq!(constraints[0].perms(), Ok(["read", "write"].into_iter().collect()));
        assert_eq!(
            constraints[3].perms(),
            Err(PolicyError::ConstraintUse { ruletype: "validatetrans".to_string() })
        );
    }

    #[test]
    fn operand_sets() {
        let policy = policy();
        let constraints: Vec<_> = policy.constraints().collect();
        let types: Vec<String> = constraints[1].types().iter().map(|t| t.to_string()).collect();
        assert_eq!(types, vec!["a_t", "b_t"]);
        let users: Vec<String> = constraints[1].users().iter().map(|u| u.to_string()).collect();
        assert_eq!(users, vec!["v"]);
        assert!(constraints[0].roles().is_empty());
        let attrs: Vec<String> = constraints[2].types().iter().map(|t| t.to_string()).collect();
        assert_eq!(attrs, vec!["domain"]);
    }

    #[test]
    fn postfix_tokens() {
        let policy = policy();
        let constraint = policy.constraints().nth(3).expect("validatetrans");
        let postfix = constraint.postfix_expression();
        assert_eq!(postfix.len(), 3);
        assert_eq!(postfix[0], ExprToken::Operand("t3"));
        assert!(matches!(&postfix[1], ExprToken::Names(names) if names.len() == 1));
        assert_eq!(
            postfix[2],
            ExprToken::Operator(ExprOperator::Compare(ConstraintOperator::Equal))
        );
    }

    const NESTED_CONSTRAINTS: &str = r#"
constrain file write (not (not u1 == u2 or r1 != r2) and (t1 == { a_t b_t } or t2 == { }));
constrain file read (u1 == u2 or r1 == r2 and not t1 == t2);
constrain file getattr ((u1 == u2 or r1 == r2) and (t1 == t2 or u2 == { u v }));
constrain file { read write } (u1 == u2 and (r1 == r2 and t1 == t2));
mlsconstrain process transition (l1 incomp h2 or (h1 domby h2 and l2 eq h2));
"#;

    /// Renders every constraint, parses the rendering back as a statement and checks that the
    /// postfix expression is unchanged. Returns how many constraints were checked.
    fn assert_statements_reparse(policy: &Policy) -> usize {
        let mut checked = 0;
        for constraint in policy.constraints() {
            let text = constraint.to_string().replace("<empty set>", "{ }");
            let statements = parse_statements(&text).expect("reparse constraint");
            assert_eq!(statements.len(), 1, "{}", text);
            let (validatetrans, terms) = match &statements[0].kind {
                StatementKind::Constraint { validatetrans, terms, .. } => {
                    (*validatetrans, terms.clone())
                }
                other => panic!("{} reparsed as {:?}", text, other),
            };
            let data = ConstraintData {
                validatetrans,
                class: constraint.data.class,
                perms: constraint.data.perms.clone(),
                terms,
            };
            let reparsed = Constraint::new(constraint.index, &data);
            assert_eq!(reparsed.postfix_expression(), constraint.postfix_expression(), "{}", text);
            assert_eq!(reparsed.ruletype(), constraint.ruletype(), "{}", text);
            checked += 1;
        }
        checked
    }

    #[test]
    fn rendered_statements_reparse() {
        let text = [POLICY, NESTED_CONSTRAINTS].concat();
        let policy = Policy::parse(&text, &LoadOptions::default()).expect("parse policy");
        assert_eq!(assert_statements_reparse(&policy), 10);

        let empty = policy
            .constraints()
            .find(|c| c.to_string().contains("<empty set>"))
            .expect("constraint with an empty name set");
        assert_eq!(
            empty.to_string(),
            "constrain file write (( not ( not ( u1 == u2 ) or ( r1 != r2 ) ) and \
             ( ( t1 == { a_t b_t } ) or ( t2 == <empty set> ) ) ));"
        );
    }

    #[test]
    fn fixture_statements_reparse() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/policies/selinuxpolicy.conf");
        let policy = Policy::open(path).expect("load fixture policy");
        assert_eq!(assert_statements_reparse(&policy), 50);
    }
}
