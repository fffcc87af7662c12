// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Rule views: type enforcement, RBAC, MLS and `default_*` rules, and the conditional
//! expressions that guard TE rules.

use super::error::{PolicyError, RuleFamily};
use super::index::PolicyIndex;
use super::parsed_policy::{DefaultData, MlsRuleData, RbacRuleData, TeRuleBody, TeRuleData};
use super::symbols::{Boolean, ObjectClass, Range, Role, Type};

use std::collections::BTreeSet;
use std::fmt;

keyword_enum! {
    /// Type enforcement rule types.
    TeRuleType,
    |ruletype: String| PolicyError::InvalidRuleType { family: RuleFamily::Te, ruletype },
    {
        Allow => "allow",
        AuditAllow => "auditallow",
        DontAudit => "dontaudit",
        NeverAllow => "neverallow",
        AllowXperm => "allowxperm",
        AuditAllowXperm => "auditallowxperm",
        DontAuditXperm => "dontauditxperm",
        NeverAllowXperm => "neverallowxperm",
        TypeTransition => "type_transition",
        TypeChange => "type_change",
        TypeMember => "type_member",
    }
}

impl TeRuleType {
    /// Access vector rules, which carry a permission set.
    pub fn is_av(&self) -> bool {
        matches!(self, Self::Allow | Self::AuditAllow | Self::DontAudit | Self::NeverAllow)
    }

    /// Extended permission rules.
    pub fn is_xperm(&self) -> bool {
        matches!(
            self,
            Self::AllowXperm | Self::AuditAllowXperm | Self::DontAuditXperm | Self::NeverAllowXperm
        )
    }

    /// Type rules, which carry a default type.
    pub fn is_type_rule(&self) -> bool {
        matches!(self, Self::TypeTransition | Self::TypeChange | Self::TypeMember)
    }
}

keyword_enum! {
    /// RBAC rule types.
    RbacRuleType,
    |ruletype: String| PolicyError::InvalidRuleType { family: RuleFamily::Rbac, ruletype },
    {
        Allow => "allow",
        RoleTransition => "role_transition",
    }
}

keyword_enum! {
    /// MLS rule types.
    MlsRuleType,
    |ruletype: String| PolicyError::InvalidRuleType { family: RuleFamily::Mls, ruletype },
    {
        RangeTransition => "range_transition",
    }
}

keyword_enum! {
    DefaultRuleType,
    |ruletype: String| PolicyError::InvalidDefaultType { ruletype },
    {
        DefaultUser => "default_user",
        DefaultRole => "default_role",
        DefaultType => "default_type",
        DefaultRange => "default_range",
    }
}

keyword_enum! {
    /// Which context of a computation a `default_*` rule takes its value from.
    DefaultValue,
    |value: String| PolicyError::InvalidDefaultValue { value },
    {
        Source => "source",
        Target => "target",
    }
}

keyword_enum! {
    /// Which part of the chosen range a `default_range` rule takes.
    DefaultRangeValue,
    |value: String| PolicyError::InvalidDefaultRange { value },
    {
        Low => "low",
        High => "high",
        LowHigh => "low_high",
    }
}

/// A term of a conditional expression, in postfix order.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub(super) enum CondTerm {
    Bool(String),
    Not,
    And,
    Or,
    Xor,
    Eq,
    Neq,
}

impl CondTerm {
    fn precedence(&self) -> u8 {
        match self {
            CondTerm::Bool(_) | CondTerm::Not => 5,
            CondTerm::Eq | CondTerm::Neq => 4,
            CondTerm::And => 3,
            CondTerm::Xor => 2,
            CondTerm::Or => 1,
        }
    }

    fn operator(&self) -> &'static str {
        match self {
            CondTerm::Bool(_) => "",
            CondTerm::Not => "!",
            CondTerm::And => "&&",
            CondTerm::Or => "||",
            CondTerm::Xor => "^",
            CondTerm::Eq => "==",
            CondTerm::Neq => "!=",
        }
    }
}

/// The Boolean expression guarding a conditional rule.
#[derive(Clone, Copy)]
pub struct ConditionalExpr<'a> {
    index: &'a PolicyIndex,
    terms: &'a [CondTerm],
}

impl<'a> ConditionalExpr<'a> {
    pub(super) fn new(index: &'a PolicyIndex, terms: &'a [CondTerm]) -> Self {
        Self { index, terms }
    }

    /// The Booleans referenced by the expression.
    pub fn booleans(&self) -> BTreeSet<Boolean<'a>> {
        self.terms
            .iter()
            .filter_map(|term| match term {
                CondTerm::Bool(name) => self.index.boolean(name),
                _ => None,
            })
            .map(|decl| Boolean::new(self.index, decl))
            .collect()
    }

    /// Evaluates the expression with each Boolean's state given by `state`.
    pub fn evaluate(&self, state: impl Fn(&str) -> bool) -> bool {
        let mut stack: Vec<bool> = Vec::new();
        for term in self.terms {
            let value = match term {
                CondTerm::Bool(name) => state(name),
                CondTerm::Not => !stack.pop().unwrap_or(false),
                binary => {
                    let rhs = stack.pop().unwrap_or(false);
                    let lhs = stack.pop().unwrap_or(false);
                    match binary {
                        CondTerm::And => lhs && rhs,
                        CondTerm::Or => lhs || rhs,
                        CondTerm::Xor => lhs ^ rhs,
                        CondTerm::Eq => lhs == rhs,
                        _ => lhs != rhs,
                    }
                }
            };
            stack.push(value);
        }
        stack.pop().unwrap_or(false)
    }

    /// Infix tokens, parenthesizing a binary subexpression unless the previously emitted
    /// operator binds strictly tighter, and any operand that would otherwise regroup.
    fn infix(&self) -> Vec<String> {
        let atom = CondTerm::Not.precedence();
        let mut stack: Vec<(u8, Vec<String>)> = Vec::new();
        let mut prev_precedence = atom;
        for term in self.terms {
            match term {
                CondTerm::Bool(name) => stack.push((atom, vec![name.clone()])),
                CondTerm::Not => {
                    let (_, operand) = stack.pop().unwrap_or_default();
                    let mut expr = vec![term.operator().to_string()];
                    if operand.len() == 1 {
                        expr.extend(operand);
                    } else {
                        expr.push("(".to_string());
                        expr.extend(operand);
                        expr.push(")".to_string());
                    }
                    stack.push((atom, expr));
                    prev_precedence = term.precedence();
                }
                binary => {
                    let (rhs_precedence, rhs) = stack.pop().unwrap_or_default();
                    let (lhs_precedence, lhs) = stack.pop().unwrap_or_default();
                    let precedence = binary.precedence();
                    let parenthesize = prev_precedence <= precedence;
                    let mut expr = Vec::with_capacity(lhs.len() + rhs.len() + 7);
                    if parenthesize {
                        expr.push("(".to_string());
                    }
                    push_grouped(&mut expr, lhs, lhs_precedence < precedence);
                    expr.push(binary.operator().to_string());
                    push_grouped(&mut expr, rhs, rhs_precedence <= precedence);
                    if parenthesize {
                        expr.push(")".to_string());
                    }
                    stack.push((if parenthesize { atom } else { precedence }, expr));
                    prev_precedence = precedence;
                }
            }
        }
        stack.into_iter().flat_map(|(_, expr)| expr).collect()
    }
}

fn push_grouped(expr: &mut Vec<String>, operand: Vec<String>, group: bool) {
    if group {
        expr.push("(".to_string());
        expr.extend(operand);
        expr.push(")".to_string());
    } else {
        expr.extend(operand);
    }
}

impl fmt::Display for ConditionalExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.infix().join(" "))
    }
}

impl fmt::Debug for ConditionalExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConditionalExpr").field(&self.to_string()).finish()
    }
}

impl PartialEq for ConditionalExpr<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.index, other.index) && self.terms == other.terms
    }
}

impl Eq for ConditionalExpr<'_> {}

fn write_set<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl ExactSizeIterator<Item = T>,
) -> fmt::Result {
    if items.len() == 1 {
        items.into_iter().try_for_each(|item| write!(f, "{}", item))
    } else {
        f.write_str("{")?;
        items.into_iter().try_for_each(|item| write!(f, " {}", item))?;
        f.write_str(" }")
    }
}

/// Renders extended permissions as hexadecimal values, collapsing consecutive runs to ranges.
pub(super) fn xperm_ranges(xperms: &BTreeSet<u16>) -> Vec<String> {
    let mut ranges: Vec<(u16, u16)> = Vec::new();
    for &value in xperms {
        match ranges.last_mut() {
            Some((_, high)) if u32::from(*high) + 1 == u32::from(value) => *high = value,
            _ => ranges.push((value, value)),
        }
    }
    ranges
        .into_iter()
        .map(|(low, high)| {
            if low == high {
                format!("{:#06x}", low)
            } else {
                format!("{:#06x}-{:#06x}", low, high)
            }
        })
        .collect()
}

/// A type enforcement rule: an access vector rule, an extended permission rule or a type rule.
#[derive(Clone, Copy)]
pub struct TeRule<'a> {
    index: &'a PolicyIndex,
    data: &'a TeRuleData,
}

impl<'a> TeRule<'a> {
    pub(super) fn new(index: &'a PolicyIndex, data: &'a TeRuleData) -> Self {
        Self { index, data }
    }

    pub fn ruletype(&self) -> TeRuleType {
        self.data.ruletype
    }

    pub fn source(&self) -> Type<'a> {
        Type::new(self.index, &self.index.parsed_policy().types[self.data.source])
    }

    pub fn target(&self) -> Type<'a> {
        Type::new(self.index, &self.index.parsed_policy().types[self.data.target])
    }

    pub fn tclass(&self) -> ObjectClass<'a> {
        ObjectClass::new(self.index, &self.index.parsed_policy().classes[self.data.class])
    }

    /// The permission set of an access vector rule.
    pub fn perms(&self) -> Result<BTreeSet<&'a str>, PolicyError> {
        match &self.data.body {
            TeRuleBody::Permissions(perms) => Ok(perms.iter().map(String::as_str).collect()),
            _ => Err(PolicyError::rule_use(self.ruletype(), "a permission set")),
        }
    }

    /// The default type of a type rule.
    pub fn default(&self) -> Result<Type<'a>, PolicyError> {
        match &self.data.body {
            TeRuleBody::Default { default, .. } => {
                Ok(Type::new(self.index, &self.index.parsed_policy().types[*default]))
            }
            _ => Err(PolicyError::rule_use(self.ruletype(), "a default type")),
        }
    }

    /// The object name of a named `type_transition` rule.
    pub fn filename(&self) -> Result<&'a str, PolicyError> {
        match &self.data.body {
            TeRuleBody::Default { filename: Some(filename), .. } => Ok(filename),
            TeRuleBody::Default { filename: None, .. }
                if self.ruletype() == TeRuleType::TypeTransition =>
            {
                Err(PolicyError::TeRuleNoFilename)
            }
            _ => Err(PolicyError::rule_use(self.ruletype(), "a file name")),
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self.data.body, TeRuleBody::Xperms { .. })
    }

    /// The extended permission kind, such as `ioctl`.
    pub fn xperm_type(&self) -> Result<&'a str, PolicyError> {
        match &self.data.body {
            TeRuleBody::Xperms { xperm_type, .. } => Ok(xperm_type),
            _ => Err(PolicyError::rule_use(self.ruletype(), "extended permissions")),
        }
    }

    pub fn xperms(&self) -> Result<&'a BTreeSet<u16>, PolicyError> {
        match &self.data.body {
            TeRuleBody::Xperms { xperms, .. } => Ok(xperms),
            _ => Err(PolicyError::rule_use(self.ruletype(), "extended permissions")),
        }
    }

    /// The expression of the conditional block containing this rule.
    pub fn conditional(&self) -> Result<ConditionalExpr<'a>, PolicyError> {
        let (id, _) = self.data.conditional.ok_or(PolicyError::RuleNotConditional)?;
        Ok(ConditionalExpr::new(self.index, &self.index.parsed_policy().conditionals[id]))
    }

    /// True if the rule is in the true branch of its conditional block.
    pub fn conditional_block(&self) -> Result<bool, PolicyError> {
        self.data.conditional.map(|(_, branch)| branch).ok_or(PolicyError::RuleNotConditional)
    }

    pub fn statement(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TeRule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}:{} ", self.ruletype(), self.source(), self.target(), self.tclass())?;
        match &self.data.body {
            TeRuleBody::Permissions(perms) => write_set(f, perms.iter())?,
            TeRuleBody::Xperms { xperm_type, xperms } => {
                write!(f, "{} ", xperm_type)?;
                write_set(f, xperm_ranges(xperms).iter())?;
            }
            TeRuleBody::Default { default, filename } => {
                write!(f, "{}", self.index.parsed_policy().types[*default].name)?;
                if let Some(filename) = filename {
                    write!(f, " \"{}\"", filename)?;
                }
            }
        }
        f.write_str(";")?;
        if let (Ok(expr), Ok(branch)) = (self.conditional(), self.conditional_block()) {
            write!(f, " [ {} ]:{}", expr, if branch { "True" } else { "False" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for TeRule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TeRule").field(&self.to_string()).finish()
    }
}

impl PartialEq for TeRule<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.data, other.data)
    }
}

impl Eq for TeRule<'_> {}

/// The target of an RBAC rule: a role for `allow`, a type or attribute for `role_transition`.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum RbacTarget<'a> {
    Role(Role<'a>),
    Type(Type<'a>),
}

impl fmt::Display for RbacTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RbacTarget::Role(role) => write!(f, "{}", role),
            RbacTarget::Type(type_) => write!(f, "{}", type_),
        }
    }
}

/// A role `allow` or `role_transition` rule.
#[derive(Clone, Copy)]
pub struct RbacRule<'a> {
    index: &'a PolicyIndex,
    data: &'a RbacRuleData,
}

impl<'a> RbacRule<'a> {
    pub(super) fn new(index: &'a PolicyIndex, data: &'a RbacRuleData) -> Self {
        Self { index, data }
    }

    fn role(&self, role: usize) -> Role<'a> {
        Role::new(self.index, &self.index.parsed_policy().roles[role])
    }

    pub fn ruletype(&self) -> RbacRuleType {
        match self.data {
            RbacRuleData::Allow { .. } => RbacRuleType::Allow,
            RbacRuleData::Transition { .. } => RbacRuleType::RoleTransition,
        }
    }

    pub fn source(&self) -> Role<'a> {
        match self.data {
            RbacRuleData::Allow { source, .. } | RbacRuleData::Transition { source, .. } => {
                self.role(*source)
            }
        }
    }

    pub fn target(&self) -> RbacTarget<'a> {
        match self.data {
            RbacRuleData::Allow { target, .. } => RbacTarget::Role(self.role(*target)),
            RbacRuleData::Transition { target, .. } => RbacTarget::Type(Type::new(
                self.index,
                &self.index.parsed_policy().types[*target],
            )),
        }
    }

    pub fn tclass(&self) -> Result<ObjectClass<'a>, PolicyError> {
        match self.data {
            RbacRuleData::Transition { class, .. } => {
                Ok(ObjectClass::new(self.index, &self.index.parsed_policy().classes[*class]))
            }
            RbacRuleData::Allow { .. } => Err(PolicyError::rule_use(self.ruletype(), "a class")),
        }
    }

    pub fn default(&self) -> Result<Role<'a>, PolicyError> {
        match self.data {
            RbacRuleData::Transition { default, .. } => Ok(self.role(*default)),
            RbacRuleData::Allow { .. } => {
                Err(PolicyError::rule_use(self.ruletype(), "a default role"))
            }
        }
    }

    pub fn statement(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RbacRule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.ruletype(), self.source(), self.target())?;
        if let (Ok(tclass), Ok(default)) = (self.tclass(), self.default()) {
            write!(f, ":{} {}", tclass, default)?;
        }
        f.write_str(";")
    }
}

impl fmt::Debug for RbacRule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RbacRule").field(&self.to_string()).finish()
    }
}

impl PartialEq for RbacRule<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.data, other.data)
    }
}

impl Eq for RbacRule<'_> {}

/// A `range_transition` rule.
#[derive(Clone, Copy)]
pub struct MlsRule<'a> {
    index: &'a PolicyIndex,
    data: &'a MlsRuleData,
}

impl<'a> MlsRule<'a> {
    pub(super) fn new(index: &'a PolicyIndex, data: &'a MlsRuleData) -> Self {
        Self { index, data }
    }

    pub fn ruletype(&self) -> MlsRuleType {
        MlsRuleType::RangeTransition
    }

    pub fn source(&self) -> Type<'a> {
        Type::new(self.index, &self.index.parsed_policy().types[self.data.source])
    }

    pub fn target(&self) -> Type<'a> {
        Type::new(self.index, &self.index.parsed_policy().types[self.data.target])
    }

    pub fn tclass(&self) -> ObjectClass<'a> {
        ObjectClass::new(self.index, &self.index.parsed_policy().classes[self.data.class])
    }

    /// The range given to the new process or object.
    pub fn default(&self) -> Range<'a> {
        Range::from_data(self.index, &self.data.range)
    }

    pub fn statement(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MlsRule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}:{} {};",
            self.ruletype(),
            self.source(),
            self.target(),
            self.tclass(),
            self.default()
        )
    }
}

impl fmt::Debug for MlsRule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MlsRule").field(&self.to_string()).finish()
    }
}

impl PartialEq for MlsRule<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.data, other.data)
    }
}

impl Eq for MlsRule<'_> {}

/// A `default_user`, `default_role`, `default_type` or `default_range` rule for one class.
#[derive(Clone, Copy)]
pub struct DefaultRule<'a> {
    index: &'a PolicyIndex,
    data: &'a DefaultData,
}

impl<'a> DefaultRule<'a> {
    pub(super) fn new(index: &'a PolicyIndex, data: &'a DefaultData) -> Self {
        Self { index, data }
    }

    pub fn ruletype(&self) -> DefaultRuleType {
        self.data.ruletype
    }

    pub fn tclass(&self) -> ObjectClass<'a> {
        ObjectClass::new(self.index, &self.index.parsed_policy().classes[self.data.class])
    }

    pub fn default(&self) -> DefaultValue {
        self.data.default
    }

    /// The part of the range taken by a `default_range` rule.
    pub fn default_range(&self) -> Result<DefaultRangeValue, PolicyError> {
        self.data.range.ok_or_else(|| PolicyError::rule_use(self.ruletype(), "a default range"))
    }

    pub fn statement(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DefaultRule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.ruletype(), self.tclass(), self.default())?;
        if let Ok(range) = self.default_range() {
            write!(f, " {}", range)?;
        }
        f.write_str(";")
    }
}

impl fmt::Debug for DefaultRule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DefaultRule").field(&self.to_string()).finish()
    }
}

impl PartialEq for DefaultRule<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.data, other.data)
    }
}

impl Eq for DefaultRule<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{LoadOptions, Policy};
    use assert_matches::assert_matches;
    use test_case::test_case;

    const POLICY: &str = r#"
class file
class dir
class process
class chr_file
common file { read write getattr ioctl }
class file inherits file { execute }
class dir inherits file { search }
class process { transition }
class chr_file inherits file
attribute domain;
type init_t, domain;
type shell_t, domain;
type etc_t;
type tmp_t;
type tty_t;
bool secure_mode false;
bool allow_exec true;
role system_r types domain;
role staff_r;
allow system_r staff_r;
role_transition system_r etc_t:process staff_r;
allow domain etc_t:{ file dir } { read getattr };
allow init_t etc_t:file read;
dontaudit shell_t tmp_t:dir search;
type_transition init_t tmp_t:file etc_t "motd";
type_change init_t tty_t:chr_file tty_t;
allowxperm init_t tty_t:chr_file ioctl { 0x8900-0x8902 0x8910 };
if (allow_exec && ! secure_mode) {
    allow shell_t etc_t:file execute;
} else {
    dontaudit shell_t etc_t:file execute;
}
default_user file source;
default_type dir target;
user system_u roles { system_r staff_r };
"#;

    fn policy() -> Policy {
        Policy::parse(POLICY, &LoadOptions::default()).expect("parse policy")
    }

    #[test_case("allow", TeRuleType::Allow)]
    #[test_case("neverallowxperm", TeRuleType::NeverAllowXperm)]
    #[test_case("type_member", TeRuleType::TypeMember)]
    fn te_ruletype_names(name: &str, ruletype: TeRuleType) {
        assert_eq!(name.parse::<TeRuleType>(), Ok(ruletype));
        assert_eq!(ruletype.to_string(), name);
    }

    #[test]
    fn invalid_ruletype_names() {
        assert_matches!(
            "alow".parse::<TeRuleType>(),
            Err(PolicyError::InvalidRuleType { family: RuleFamily::Te, .. })
        );
        assert_matches!(
            "type_transition".parse::<RbacRuleType>(),
            Err(PolicyError::InvalidRuleType { family: RuleFamily::Rbac, .. })
        );
        assert_matches!(
            "default_level".parse::<DefaultRuleType>(),
            Err(PolicyError::InvalidDefaultType { .. })
        );
        assert_matches!(
            "both".parse::<DefaultValue>(),
            Err(PolicyError::InvalidDefaultValue { .. })
        );
        assert_matches!(
            "middle".parse::<DefaultRangeValue>(),
            Err(PolicyError::InvalidDefaultRange { .. })
        );
    }

    #[test]
    fn xperm_rendering() {
        let xperms: BTreeSet<u16> = [0x8900, 0x8901, 0x8902, 0x8910].into_iter().collect();
        assert_eq!(xperm_ranges(&xperms), vec!["0x8900-0x8902", "0x8910"]);
    }

    #[test]
    fn te_rule_strings() {
        let policy = policy();
        let strings: Vec<String> = policy.terules().map(|rule| rule.to_string()).collect();
        assert!(strings.contains(&"allow domain etc_t:file { getattr read };".to_string()));
        assert!(strings.contains(&"allow domain etc_t:dir { getattr read };".to_string()));
        assert!(strings.contains(&"allow init_t etc_t:file read;".to_string()));
        assert!(strings.contains(&"type_transition init_t tmp_t:file etc_t \"motd\";".to_string()));
        assert!(strings.contains(&"type_change init_t tty_t:chr_file tty_t;".to_string()));
        assert!(strings.contains(
            &"allowxperm init_t tty_t:chr_file ioctl { 0x8900-0x8902 0x8910 };".to_string()
        ));
        assert!(strings.contains(
            &"allow shell_t etc_t:file execute; [ allow_exec && ! secure_mode ]:True".to_string()
        ));
        assert!(strings.contains(
            &"dontaudit shell_t etc_t:file execute; [ allow_exec && ! secure_mode ]:False"
                .to_string()
        ));
    }

    #[test]
    fn te_rule_field_misuse() {
        let policy = policy();
        let transition = policy
            .terules()
            .find(|rule| rule.ruletype() == TeRuleType::TypeTransition)
            .expect("type_transition");
        assert_eq!(transition.filename(), Ok("motd"));
        assert_matches!(transition.perms(), Err(PolicyError::RuleUse { .. }));
        assert_eq!(transition.default().map(|t| t.to_string()), Ok("etc_t".to_string()));
        assert_eq!(transition.conditional(), Err(PolicyError::RuleNotConditional));

        let change = policy
            .terules()
            .find(|rule| rule.ruletype() == TeRuleType::TypeChange)
            .expect("type_change");
        assert_matches!(change.filename(), Err(PolicyError::RuleUse { .. }));

        let allow = policy.terules().next().expect("allow");
        assert_matches!(allow.default(), Err(PolicyError::RuleUse { .. }));
        assert_matches!(allow.xperms(), Err(PolicyError::RuleUse { .. }));
        assert!(!allow.is_extended());
    }

    #[test]
    fn conditional_expressions() {
        let policy = policy();
        let rule = policy
            .terules()
            .find(|rule| rule.conditional().is_ok())
            .expect("conditional rule");
        let expr = rule.conditional().expect("expression");
        let booleans: Vec<String> = expr.booleans().iter().map(|b| b.to_string()).collect();
        assert_eq!(booleans, vec!["allow_exec", "secure_mode"]);
        assert!(expr.evaluate(|name| name == "allow_exec"));
        assert!(!expr.evaluate(|_| true));
    }

    #[test]
    fn conditional_grouping() {
        let policy = policy();
        let rule = policy
            .terules()
            .find(|rule| rule.conditional().is_ok())
            .expect("conditional rule");
        let expr = rule.conditional().expect("expression");
        assert_eq!(expr.to_string(), "allow_exec && ! secure_mode");

        let bool_ = |name: &str| CondTerm::Bool(name.to_string());
        let terms = vec![bool_("a"), bool_("b"), CondTerm::Or, bool_("c"), CondTerm::And];
        assert_eq!(ConditionalExpr::new(expr.index, &terms).to_string(), "( ( a || b ) && c )");
        let terms = vec![bool_("a"), bool_("b"), bool_("c"), CondTerm::Xor, CondTerm::Xor];
        assert_eq!(ConditionalExpr::new(expr.index, &terms).to_string(), "( a ^ ( b ^ c ) )");
    }

    #[test]
    fn rbac_rules() {
        let policy = policy();
        let rules: Vec<RbacRule<'_>> = policy.rbacrules().collect();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].to_string(), "allow system_r staff_r;");
        assert_matches!(rules[0].tclass(), Err(PolicyError::RuleUse { .. }));
        assert_matches!(rules[0].default(), Err(PolicyError::RuleUse { .. }));
        assert_eq!(rules[1].to_string(), "role_transition system_r etc_t:process staff_r;");
        assert_matches!(rules[1].target(), RbacTarget::Type(_));
    }

    #[test]
    fn default_rules() {
        let policy = policy();
        let rules: Vec<String> = policy.defaults().map(|rule| rule.to_string()).collect();
        assert_eq!(rules, vec!["default_user file source;", "default_type dir target;"]);
        let rule = policy.defaults().next().expect("default rule");
        assert_matches!(rule.default_range(), Err(PolicyError::RuleUse { .. }));
    }
}
