// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! nom grammar for source policies. Produces a flat list of [`Statement`]s whose names are
//! unresolved; binding happens in [`super::parsed_policy`].

use super::constraints::{
    ConstraintOperator, ConstraintTerm, CEXPR_SYM_H1H2, CEXPR_SYM_H1L2, CEXPR_SYM_L1H1,
    CEXPR_SYM_L1H2, CEXPR_SYM_L1L2, CEXPR_SYM_L2H2, CEXPR_SYM_ROLE, CEXPR_SYM_TARGET,
    CEXPR_SYM_TYPE, CEXPR_SYM_USER, CEXPR_SYM_XTARGET,
};
use super::error::ParseError;
use super::labeling::FsUseType;
use super::lexer::{
    blank, ident, identifier, invalid, keyword, line_at, number, path, punct, quoted, raw_word,
    spaced, PResult, SyntaxError, SyntaxErrorKind,
};
use super::rules::{CondTerm, DefaultRangeValue, DefaultRuleType, DefaultValue, TeRuleType};

use nom::branch::alt;
use nom::combinator::{all_consuming, complete, cut, eof, map, map_res, not, opt, value, verify};
use nom::error::context;
use nom::multi::{fold_many0, many0, many1, separated_list1};
use nom::sequence::{delimited, pair, preceded, terminated, tuple};

/// Operand keywords of constraint expressions.
const CONSTRAINT_OPERANDS: [&str; 13] =
    ["u1", "u2", "u3", "r1", "r2", "r3", "t1", "t2", "t3", "l1", "l2", "h1", "h2"];

/// A set of names as written: `name`, `{ a b -c }`, `*` or `~{ a b }`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(super) struct NameSet {
    pub names: Vec<String>,
    pub excluded: Vec<String>,
    pub star: bool,
    pub complement: bool,
}

impl NameSet {
    /// True when the set is a plain list of names, bound element by element.
    pub fn is_plain(&self) -> bool {
        !self.star && !self.complement && self.excluded.is_empty()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) enum CategorySpec {
    Single(String),
    Span(String, String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct LevelSpec {
    pub sensitivity: String,
    pub categories: Vec<CategorySpec>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct RangeSpec {
    pub low: LevelSpec,
    pub high: Option<LevelSpec>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) struct ContextSpec {
    pub user: String,
    pub role: String,
    pub type_: String,
    pub range: Option<RangeSpec>,
}

/// Extended permission values, as inclusive ranges.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(super) struct XpermSpec {
    pub ranges: Vec<(u16, u16)>,
    pub complement: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub(super) struct Statement {
    pub line: usize,
    pub kind: StatementKind,
}

#[derive(Clone, Debug, PartialEq)]
pub(super) enum StatementKind {
    ClassDecl { name: String },
    ClassDef { name: String, common: Option<String>, perms: Vec<String> },
    Common { name: String, perms: Vec<String> },
    SidDecl { name: String },
    SidContext { name: String, context: ContextSpec },
    Default {
        ruletype: DefaultRuleType,
        classes: NameSet,
        default: DefaultValue,
        range: Option<DefaultRangeValue>,
    },
    Sensitivity { name: String, aliases: Vec<String> },
    Dominance { order: Vec<String> },
    Category { name: String, aliases: Vec<String> },
    Level { level: LevelSpec },
    Constraint {
        validatetrans: bool,
        classes: NameSet,
        perms: NameSet,
        terms: Vec<ConstraintTerm>,
    },
    PolicyCap { name: String },
    Attribute { name: String },
    Type { name: String, aliases: Vec<String>, attributes: Vec<String> },
    TypeAlias { name: String, aliases: Vec<String> },
    TypeAttribute { name: String, attributes: Vec<String> },
    Permissive { name: String },
    Bool { name: String, state: bool },
    TypeBounds { parent: String, children: Vec<String> },
    AvRule {
        ruletype: TeRuleType,
        source: NameSet,
        target: NameSet,
        classes: NameSet,
        perms: NameSet,
    },
    XpermRule {
        ruletype: TeRuleType,
        source: NameSet,
        target: NameSet,
        classes: NameSet,
        xperm_type: String,
        xperms: XpermSpec,
    },
    TypeRule {
        ruletype: TeRuleType,
        source: NameSet,
        target: NameSet,
        classes: NameSet,
        default: String,
        filename: Option<String>,
    },
    RangeTransition {
        source: NameSet,
        target: NameSet,
        classes: Option<NameSet>,
        range: RangeSpec,
    },
    Role { name: String, types: Option<NameSet> },
    RoleTransition { roles: NameSet, types: NameSet, classes: Option<NameSet>, default: String },
    RoleAllow { sources: NameSet, targets: NameSet },
    Conditional { expr: Vec<CondTerm>, if_true: Vec<Statement>, if_false: Vec<Statement> },
    User { name: String, roles: NameSet, level: Option<LevelSpec>, range: Option<RangeSpec> },
    FsUse { behavior: FsUseType, fs_type: String, context: ContextSpec },
    Genfscon { fs_type: String, path: String, file_type: Option<String>, context: ContextSpec },
    Portcon { protocol: String, low: u16, high: u16, context: ContextSpec },
    Netifcon { interface: String, context: ContextSpec, packet_context: ContextSpec },
    Nodecon { address: String, netmask: String, context: ContextSpec },
}

/// Parses the whole of `text` into statements.
pub(super) fn parse_statements(text: &str) -> Result<Vec<Statement>, ParseError> {
    let result = complete(all_consuming(terminated(
        many0(preceded(not(preceded(blank, eof)), cut(|input| statement(text, input)))),
        blank,
    )))(text);
    match result {
        Ok((_, statements)) => Ok(statements),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(e.into_parse_error(text)),
        Err(nom::Err::Incomplete(_)) => {
            Err(ParseError::UnexpectedEnd { line: line_at(text, ""), expected: "statement" })
        }
    }
}

fn statement<'a>(text: &'a str, input: &'a str) -> PResult<'a, Statement> {
    let (input, _) = blank(input)?;
    let line = line_at(text, input);
    let (rest, word) = context("statement keyword", identifier)(input)?;
    let (rest, kind) = match word {
        "class" => class(rest)?,
        "common" => map(pair(ident("common name"), braced_names("permission")), |(name, perms)| {
            StatementKind::Common { name, perms }
        })(rest)?,
        "sid" => sid(rest)?,
        "default_user" | "default_role" | "default_type" | "default_range" => {
            let ruletype = word.parse::<DefaultRuleType>().map_err(|err| invalid(input, err))?;
            default_rule(ruletype, rest)?
        }
        "sensitivity" => map(declaration_with_aliases("sensitivity name"), |(name, aliases)| {
            StatementKind::Sensitivity { name, aliases }
        })(rest)?,
        "dominance" => map(terminated(braced_names("sensitivity"), opt(end)), |order| {
            StatementKind::Dominance { order }
        })(rest)?,
        "category" => map(declaration_with_aliases("category name"), |(name, aliases)| {
            StatementKind::Category { name, aliases }
        })(rest)?,
        "level" => map(terminated(level_spec, end), |level| StatementKind::Level { level })(rest)?,
        "constrain" | "mlsconstrain" => map(
            tuple((name_set("object class"), name_set("permission"), constraint_or, end)),
            |(classes, perms, terms, _)| StatementKind::Constraint {
                validatetrans: false,
                classes,
                perms,
                terms,
            },
        )(rest)?,
        "validatetrans" | "mlsvalidatetrans" => map(
            tuple((name_set("object class"), constraint_or, end)),
            |(classes, terms, _)| StatementKind::Constraint {
                validatetrans: true,
                classes,
                perms: NameSet::default(),
                terms,
            },
        )(rest)?,
        "policycap" => map(terminated(ident("policy capability"), end), |name| {
            StatementKind::PolicyCap { name }
        })(rest)?,
        "attribute" => {
            map(terminated(ident("attribute name"), end), |name| StatementKind::Attribute { name })(
                rest,
            )?
        }
        "type" => type_declaration(rest)?,
        "typealias" => map(
            tuple((ident("type name"), preceded(keyword("alias"), names("alias name")), end)),
            |(name, aliases, _)| StatementKind::TypeAlias { name, aliases },
        )(rest)?,
        "typeattribute" => map(
            tuple((ident("type name"), comma_list("attribute name"), end)),
            |(name, attributes, _)| StatementKind::TypeAttribute { name, attributes },
        )(rest)?,
        "permissive" => {
            map(terminated(ident("type name"), end), |name| StatementKind::Permissive { name })(
                rest,
            )?
        }
        "bool" => map(
            tuple((
                ident("boolean name"),
                context(
                    "true or false",
                    alt((value(true, keyword("true")), value(false, keyword("false")))),
                ),
                end,
            )),
            |(name, state, _)| StatementKind::Bool { name, state },
        )(rest)?,
        "typebounds" => map(
            tuple((ident("type name"), comma_list("type name"), end)),
            |(parent, children, _)| StatementKind::TypeBounds { parent, children },
        )(rest)?,
        "allow" => allow(rest)?,
        "role" => map(
            tuple((ident("role name"), opt(preceded(keyword("types"), cut(name_set("type")))), end)),
            |(name, types, _)| StatementKind::Role { name, types },
        )(rest)?,
        "role_transition" => map(
            tuple((
                name_set("role"),
                name_set("type"),
                opt(preceded(punct(":"), cut(name_set("object class")))),
                ident("default role"),
                end,
            )),
            |(roles, types, classes, default, _)| StatementKind::RoleTransition {
                roles,
                types,
                classes,
                default,
            },
        )(rest)?,
        "range_transition" => map(
            tuple((
                name_set("source type"),
                name_set("target type"),
                opt(preceded(punct(":"), cut(name_set("object class")))),
                range_spec,
                end,
            )),
            |(source, target, classes, range, _)| StatementKind::RangeTransition {
                source,
                target,
                classes,
                range,
            },
        )(rest)?,
        "if" => conditional(text, rest)?,
        "user" => user(rest)?,
        "fs_use_xattr" | "fs_use_task" | "fs_use_trans" => {
            let behavior = match word {
                "fs_use_xattr" => FsUseType::Xattr,
                "fs_use_task" => FsUseType::Task,
                _ => FsUseType::Trans,
            };
            let parsed = map(tuple((ident("file system type"), context_spec, end)), |(fs_type, context, _)| {
                StatementKind::FsUse { behavior, fs_type, context }
            })(rest)?;
            parsed
        }
        "genfscon" => genfscon(rest)?,
        "portcon" => map(
            tuple((
                ident("protocol"),
                port("port"),
                opt(preceded(punct("-"), cut(port("port")))),
                context_spec,
                opt(end),
            )),
            |(protocol, low, high, context, _)| StatementKind::Portcon {
                protocol,
                low,
                high: high.unwrap_or(low),
                context,
            },
        )(rest)?,
        "netifcon" => map(
            tuple((ident("network interface"), context_spec, context_spec, opt(end))),
            |(interface, context, packet_context, _)| StatementKind::Netifcon {
                interface,
                context,
                packet_context,
            },
        )(rest)?,
        "nodecon" => map(
            tuple((raw_word("node address"), raw_word("node netmask"), context_spec, opt(end))),
            |(address, netmask, context, _)| StatementKind::Nodecon { address, netmask, context },
        )(rest)?,
        other => match other.parse::<TeRuleType>() {
            Ok(ruletype) => te_rule(ruletype, rest)?,
            Err(_) => {
                return Err(nom::Err::Failure(SyntaxError::new(
                    input,
                    SyntaxErrorKind::UnknownStatement(other.to_string()),
                )))
            }
        },
    };
    Ok((rest, Statement { line, kind }))
}

fn end(input: &str) -> PResult<'_, &str> {
    punct(";")(input)
}

/// A port or extended permission value.
fn port<'a>(expected: &'static str) -> impl FnMut(&'a str) -> PResult<'a, u16> {
    context(
        expected,
        map_res(number, move |n: u64| {
            u16::try_from(n).map_err(|_| format!("{} {} is out of range", expected, n))
        }),
    )
}

/// `{ name ... }`.
fn braced_names<'a>(expected: &'static str) -> impl FnMut(&'a str) -> PResult<'a, Vec<String>> {
    preceded(punct("{"), cut(terminated(many0(ident(expected)), punct("}"))))
}

/// `name` or `{ name ... }`.
fn names<'a>(expected: &'static str) -> impl FnMut(&'a str) -> PResult<'a, Vec<String>> {
    alt((braced_names(expected), map(ident(expected), |name| vec![name])))
}

/// `name [, name]*`.
fn comma_list<'a>(expected: &'static str) -> impl FnMut(&'a str) -> PResult<'a, Vec<String>> {
    separated_list1(punct(","), ident(expected))
}

#[derive(Clone)]
enum SetElement {
    Star,
    Excluded(String),
    Name(String),
}

fn set_element<'a>(expected: &'static str) -> impl FnMut(&'a str) -> PResult<'a, SetElement> {
    alt((
        value(SetElement::Star, punct("*")),
        map(preceded(punct("-"), cut(ident(expected))), SetElement::Excluded),
        map(ident(expected), SetElement::Name),
    ))
}

fn name_set<'a>(expected: &'static str) -> impl FnMut(&'a str) -> PResult<'a, NameSet> {
    let braced = preceded(
        punct("{"),
        cut(terminated(
            fold_many0(set_element(expected), NameSet::default, |mut set, element| {
                match element {
                    SetElement::Star => set.star = true,
                    SetElement::Excluded(name) => set.excluded.push(name),
                    SetElement::Name(name) => set.names.push(name),
                }
                set
            }),
            punct("}"),
        )),
    );
    let single = map(ident(expected), |name| NameSet { names: vec![name], ..Default::default() });
    alt((
        value(NameSet { star: true, ..Default::default() }, punct("*")),
        map(pair(opt(punct("~")), alt((braced, single))), |(tilde, set)| NameSet {
            complement: tilde.is_some(),
            ..set
        }),
    ))
}

fn declaration_with_aliases<'a>(
    expected: &'static str,
) -> impl FnMut(&'a str) -> PResult<'a, (String, Vec<String>)> {
    map(
        tuple((ident(expected), opt(preceded(keyword("alias"), cut(names("alias name")))), end)),
        |(name, aliases, _)| (name, aliases.unwrap_or_default()),
    )
}

fn class(input: &str) -> PResult<'_, StatementKind> {
    let (rest, name) = ident("class name")(input)?;
    let (rest, common) = opt(preceded(keyword("inherits"), cut(ident("common name"))))(rest)?;
    let (rest, perms) = opt(braced_names("permission"))(rest)?;
    if common.is_none() && perms.is_none() {
        let (rest, _) = opt(end)(rest)?;
        return Ok((rest, StatementKind::ClassDecl { name }));
    }
    Ok((rest, StatementKind::ClassDef { name, common, perms: perms.unwrap_or_default() }))
}

/// `sid name` declares an initial SID; `sid name user:role:type[:range]` labels it.
fn sid(input: &str) -> PResult<'_, StatementKind> {
    map(pair(ident("initial sid name"), opt(context_spec)), |(name, context)| match context {
        Some(context) => StatementKind::SidContext { name, context },
        None => StatementKind::SidDecl { name },
    })(input)
}

fn default_rule(ruletype: DefaultRuleType, input: &str) -> PResult<'_, StatementKind> {
    let (rest, classes) = name_set("object class")(input)?;
    let (rest, default) =
        map_res(ident("source or target"), |word: String| word.parse::<DefaultValue>())(rest)?;
    let (rest, range) = if ruletype == DefaultRuleType::DefaultRange {
        map(
            map_res(ident("low, high or low_high"), |word: String| {
                word.parse::<DefaultRangeValue>()
            }),
            Some,
        )(rest)?
    } else {
        (rest, None)
    };
    let (rest, _) = end(rest)?;
    Ok((rest, StatementKind::Default { ruletype, classes, default, range }))
}

fn type_declaration(input: &str) -> PResult<'_, StatementKind> {
    map(
        tuple((
            ident("type name"),
            opt(preceded(keyword("alias"), cut(names("alias name")))),
            many0(preceded(punct(","), cut(ident("attribute name")))),
            end,
        )),
        |(name, aliases, attributes, _)| StatementKind::Type {
            name,
            aliases: aliases.unwrap_or_default(),
            attributes,
        },
    )(input)
}

/// TE `allow` when followed by `:class perms`, role `allow` otherwise.
fn allow(input: &str) -> PResult<'_, StatementKind> {
    let (rest, (source, target)) = pair(name_set("source"), name_set("target"))(input)?;
    let (rest, av) = opt(preceded(
        punct(":"),
        cut(pair(name_set("object class"), name_set("permission"))),
    ))(rest)?;
    let (rest, _) = end(rest)?;
    let kind = match av {
        Some((classes, perms)) => {
            StatementKind::AvRule { ruletype: TeRuleType::Allow, source, target, classes, perms }
        }
        None => StatementKind::RoleAllow { sources: source, targets: target },
    };
    Ok((rest, kind))
}

fn te_rule(ruletype: TeRuleType, input: &str) -> PResult<'_, StatementKind> {
    let (rest, (source, target, _, classes)) = tuple((
        name_set("source type"),
        name_set("target type"),
        punct(":"),
        name_set("object class"),
    ))(input)?;
    let (rest, kind) = if ruletype.is_xperm() {
        let (rest, (xperm_type, xperms)) =
            pair(ident("extended permission type"), xperm_spec)(rest)?;
        (rest, StatementKind::XpermRule { ruletype, source, target, classes, xperm_type, xperms })
    } else if ruletype.is_type_rule() {
        let (rest, (default, filename)) = pair(ident("default type"), opt(quoted))(rest)?;
        (rest, StatementKind::TypeRule { ruletype, source, target, classes, default, filename })
    } else {
        let (rest, perms) = name_set("permission")(rest)?;
        (rest, StatementKind::AvRule { ruletype, source, target, classes, perms })
    };
    let (rest, _) = end(rest)?;
    Ok((rest, kind))
}

/// `low[-high]`, normalized so that `low <= high`.
fn xperm_range(input: &str) -> PResult<'_, (u16, u16)> {
    map(
        pair(
            port("extended permission"),
            opt(preceded(punct("-"), cut(port("extended permission")))),
        ),
        |(low, high)| {
            let high = high.unwrap_or(low);
            (low.min(high), low.max(high))
        },
    )(input)
}

fn xperm_spec(input: &str) -> PResult<'_, XpermSpec> {
    map(
        pair(
            opt(punct("~")),
            alt((
                preceded(punct("{"), cut(terminated(many1(xperm_range), punct("}")))),
                map(xperm_range, |range| vec![range]),
            )),
        ),
        |(tilde, ranges)| XpermSpec { ranges, complement: tilde.is_some() },
    )(input)
}

fn user(input: &str) -> PResult<'_, StatementKind> {
    map(
        tuple((
            ident("user name"),
            preceded(keyword("roles"), cut(name_set("role"))),
            opt(preceded(keyword("level"), cut(level_spec))),
            opt(preceded(keyword("range"), cut(range_spec))),
            end,
        )),
        |(name, roles, level, range, _)| StatementKind::User { name, roles, level, range },
    )(input)
}

fn genfscon(input: &str) -> PResult<'_, StatementKind> {
    map(
        tuple((
            ident("file system type"),
            path,
            opt(preceded(
                punct("-"),
                cut(alt((value("-".to_string(), punct("-")), ident("file type")))),
            )),
            context_spec,
            opt(end),
        )),
        |(fs_type, path, file_type, context, _)| StatementKind::Genfscon {
            fs_type,
            path,
            file_type,
            context,
        },
    )(input)
}

fn category(input: &str) -> PResult<'_, CategorySpec> {
    map(ident("category"), |name| match name.split_once('.') {
        Some((low, high)) => CategorySpec::Span(low.to_string(), high.to_string()),
        None => CategorySpec::Single(name),
    })(input)
}

fn level_spec(input: &str) -> PResult<'_, LevelSpec> {
    map(
        pair(
            ident("sensitivity"),
            opt(preceded(punct(":"), cut(separated_list1(punct(","), category)))),
        ),
        |(sensitivity, categories)| LevelSpec {
            sensitivity,
            categories: categories.unwrap_or_default(),
        },
    )(input)
}

fn range_spec(input: &str) -> PResult<'_, RangeSpec> {
    map(pair(level_spec, opt(preceded(punct("-"), cut(level_spec)))), |(low, high)| RangeSpec {
        low,
        high,
    })(input)
}

/// `user:role:type[:range]`. Nothing is consumed unless the user is followed by `:`.
fn context_spec(input: &str) -> PResult<'_, ContextSpec> {
    map(
        pair(
            ident("user"),
            preceded(
                punct(":"),
                cut(tuple((
                    ident("role"),
                    punct(":"),
                    ident("type"),
                    opt(preceded(punct(":"), cut(range_spec))),
                ))),
            ),
        ),
        |(user, (role, _, type_, range))| ContextSpec { user, role, type_, range },
    )(input)
}

/// Appends each `(operator, operand)` pair after its operand, giving left-associative postfix.
fn postfix<T>((mut terms, rest): (Vec<T>, Vec<(T, Vec<T>)>)) -> Vec<T> {
    for (operator, operand) in rest {
        terms.extend(operand);
        terms.push(operator);
    }
    terms
}

fn constraint_or(input: &str) -> PResult<'_, Vec<ConstraintTerm>> {
    map(
        pair(
            constraint_and,
            many0(pair(
                value(ConstraintTerm::Or, alt((keyword("or"), punct("||")))),
                cut(constraint_and),
            )),
        ),
        postfix,
    )(input)
}

fn constraint_and(input: &str) -> PResult<'_, Vec<ConstraintTerm>> {
    map(
        pair(
            constraint_not,
            many0(pair(
                value(ConstraintTerm::And, alt((keyword("and"), punct("&&")))),
                cut(constraint_not),
            )),
        ),
        postfix,
    )(input)
}

fn constraint_not(input: &str) -> PResult<'_, Vec<ConstraintTerm>> {
    alt((
        map(preceded(alt((keyword("not"), punct("!"))), cut(constraint_not)), |mut terms| {
            terms.push(ConstraintTerm::Not);
            terms
        }),
        delimited(punct("("), cut(constraint_or), cut(punct(")"))),
        map(constraint_comparison, |term| vec![term]),
    ))(input)
}

fn constraint_operator(input: &str) -> PResult<'_, ConstraintOperator> {
    context(
        "constraint operator",
        alt((
            value(ConstraintOperator::Equal, alt((punct("=="), keyword("eq")))),
            value(ConstraintOperator::NotEqual, alt((punct("!="), keyword("neq")))),
            value(ConstraintOperator::Dominates, keyword("dom")),
            value(ConstraintOperator::DominatedBy, keyword("domby")),
            value(ConstraintOperator::Incomparable, keyword("incomp")),
        )),
    )(input)
}

fn constraint_comparison(input: &str) -> PResult<'_, ConstraintTerm> {
    let (start, _) = blank(input)?;
    let (rest, (left, operator)) =
        pair(context("constraint operand", identifier), cut(constraint_operator))(start)?;
    let malformed =
        |reason| nom::Err::Failure(SyntaxError::new(start, SyntaxErrorKind::Constraint(reason)));

    let (rest, right) =
        opt(verify(spaced(identifier), |name: &str| CONSTRAINT_OPERANDS.contains(&name)))(rest)?;
    if let Some(right) = right {
        let sym_type = match (left, right) {
            ("u1", "u2") => CEXPR_SYM_USER,
            ("r1", "r2") => CEXPR_SYM_ROLE,
            ("t1", "t2") => CEXPR_SYM_TYPE,
            ("l1", "l2") => CEXPR_SYM_L1L2,
            ("l1", "h2") => CEXPR_SYM_L1H2,
            ("h1", "l2") => CEXPR_SYM_H1L2,
            ("h1", "h2") => CEXPR_SYM_H1H2,
            ("l1", "h1") => CEXPR_SYM_L1H1,
            ("l2", "h2") => CEXPR_SYM_L2H2,
            _ => return Err(malformed("operands cannot be compared with each other")),
        };
        return Ok((rest, ConstraintTerm::Attribute { sym_type, operator }));
    }

    let sym_type = match left {
        "u1" => CEXPR_SYM_USER,
        "u2" => CEXPR_SYM_USER | CEXPR_SYM_TARGET,
        "u3" => CEXPR_SYM_USER | CEXPR_SYM_XTARGET,
        "r1" => CEXPR_SYM_ROLE,
        "r2" => CEXPR_SYM_ROLE | CEXPR_SYM_TARGET,
        "r3" => CEXPR_SYM_ROLE | CEXPR_SYM_XTARGET,
        "t1" => CEXPR_SYM_TYPE,
        "t2" => CEXPR_SYM_TYPE | CEXPR_SYM_TARGET,
        "t3" => CEXPR_SYM_TYPE | CEXPR_SYM_XTARGET,
        _ => return Err(malformed("only user, role and type operands compare against names")),
    };
    if !matches!(operator, ConstraintOperator::Equal | ConstraintOperator::NotEqual) {
        return Err(malformed("names are only compared with == or !="));
    }
    let (rest, names) = cut(names("name"))(rest)?;
    Ok((rest, ConstraintTerm::Names { sym_type, operator, names }))
}

fn conditional<'a>(text: &'a str, input: &'a str) -> PResult<'a, StatementKind> {
    let (rest, expr) = cond_or(input)?;
    let (rest, if_true) = conditional_block(text, rest)?;
    let (rest, if_false) =
        opt(preceded(keyword("else"), cut(|input| conditional_block(text, input))))(rest)?;
    Ok((rest, StatementKind::Conditional { expr, if_true, if_false: if_false.unwrap_or_default() }))
}

fn conditional_block<'a>(text: &'a str, input: &'a str) -> PResult<'a, Vec<Statement>> {
    preceded(
        punct("{"),
        cut(terminated(
            many0(preceded(not(punct("}")), cut(|input| statement(text, input)))),
            punct("}"),
        )),
    )(input)
}

fn cond_or(input: &str) -> PResult<'_, Vec<CondTerm>> {
    map(pair(cond_xor, many0(pair(value(CondTerm::Or, punct("||")), cut(cond_xor)))), postfix)(
        input,
    )
}

fn cond_xor(input: &str) -> PResult<'_, Vec<CondTerm>> {
    map(pair(cond_and, many0(pair(value(CondTerm::Xor, punct("^")), cut(cond_and)))), postfix)(
        input,
    )
}

fn cond_and(input: &str) -> PResult<'_, Vec<CondTerm>> {
    map(pair(cond_not, many0(pair(value(CondTerm::And, punct("&&")), cut(cond_not)))), postfix)(
        input,
    )
}

fn cond_not(input: &str) -> PResult<'_, Vec<CondTerm>> {
    alt((
        map(preceded(punct("!"), cut(cond_not)), |mut expr| {
            expr.push(CondTerm::Not);
            expr
        }),
        cond_eq,
    ))(input)
}

fn cond_eq(input: &str) -> PResult<'_, Vec<CondTerm>> {
    map(
        pair(
            cond_primary,
            many0(pair(
                alt((value(CondTerm::Eq, punct("==")), value(CondTerm::Neq, punct("!=")))),
                cut(cond_primary),
            )),
        ),
        postfix,
    )(input)
}

fn cond_primary(input: &str) -> PResult<'_, Vec<CondTerm>> {
    alt((
        delimited(punct("("), cut(cond_or), cut(punct(")"))),
        map(ident("boolean"), |name| vec![CondTerm::Bool(name)]),
    ))(input)
}
