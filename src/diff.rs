// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Symbol-level differences between two policies.
//!
//! Results are names, never symbol views: a name matched in both policies refers to two distinct
//! symbols, and handing out either one would tie the result to a single side.

use crate::policy::rules::{TeRule, TeRuleType};
use crate::policy::symbols::{Boolean, Common, ObjectClass, Role, Type, User};
use crate::policy::Policy;

use log::{debug, info};
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Names present only on the right (`added`), only on the left (`removed`), or on both sides.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SetDelta {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub matched: BTreeSet<String>,
}

impl SetDelta {
    fn new<L, R>(left: L, right: R) -> Self
    where
        L: IntoIterator,
        L::Item: ToString,
        R: IntoIterator,
        R::Item: ToString,
    {
        let left: BTreeSet<String> = left.into_iter().map(|item| item.to_string()).collect();
        let right: BTreeSet<String> = right.into_iter().map(|item| item.to_string()).collect();
        Self {
            added: right.difference(&left).cloned().collect(),
            removed: left.difference(&right).cloned().collect(),
            matched: left.intersection(&right).cloned().collect(),
        }
    }

    /// True if anything was added or removed.
    pub fn is_changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// A common or class whose permission set changed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ModifiedPermissions {
    pub perms: SetDelta,
}

/// A role whose authorized types changed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ModifiedRole {
    pub types: SetDelta,
}

/// A type whose attributes, aliases or permissive state changed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ModifiedType {
    pub attributes: SetDelta,
    pub aliases: SetDelta,
    pub modified_permissive: bool,
    /// Permissive state in the left policy.
    pub permissive: bool,
}

/// A value that differs between the left and the right policy.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Change<T> {
    pub left: T,
    pub right: T,
}

/// A user whose roles, default level or range changed. Levels and ranges are compared only
/// when both policies are MLS.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ModifiedUser {
    pub roles: SetDelta,
    pub level: Option<Change<String>>,
    pub range: Option<Change<String>>,
}

/// An attribute whose member types changed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ModifiedTypeAttribute {
    pub types: SetDelta,
}

/// The difference in one symbol kind.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SymbolDiff<M> {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub modified: BTreeMap<String, M>,
}

impl<M> SymbolDiff<M> {
    /// Diffs `left` against `right` by name, calling `modified` on each pair of symbols with a
    /// matching name.
    fn compute<S>(
        left: impl Iterator<Item = S>,
        right: impl Iterator<Item = S>,
        name: impl Fn(&S) -> String,
        modified: impl Fn(&S, &S) -> Option<M>,
    ) -> Self {
        let left: BTreeMap<String, S> = left.map(|symbol| (name(&symbol), symbol)).collect();
        let right: BTreeMap<String, S> = right.map(|symbol| (name(&symbol), symbol)).collect();
        let delta = SetDelta::new(left.keys(), right.keys());
        let modified = delta
            .matched
            .iter()
            .filter_map(|name| {
                let (left, right) = (left.get(name)?, right.get(name)?);
                modified(left, right).map(|record| (name.clone(), record))
            })
            .collect();
        Self { added: delta.added, removed: delta.removed, modified }
    }
}

/// What identifies a TE rule across policies: everything but its permissions or default type.
/// Rules are keyed as written; attributes are not expanded.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct RuleKey {
    pub ruletype: TeRuleType,
    pub source: String,
    pub target: String,
    pub tclass: String,
    /// Object name of a named `type_transition`.
    pub filename: Option<String>,
    /// The guarding expression and branch of a conditional rule.
    pub conditional: Option<(String, bool)>,
}

impl RuleKey {
    fn new(rule: &TeRule<'_>) -> Self {
        Self {
            ruletype: rule.ruletype(),
            source: rule.source().name().to_string(),
            target: rule.target().name().to_string(),
            tclass: rule.tclass().name().to_string(),
            filename: rule.filename().ok().map(str::to_string),
            conditional: rule
                .conditional()
                .ok()
                .zip(rule.conditional_block().ok())
                .map(|(expr, branch)| (expr.to_string(), branch)),
        }
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}:{}", self.ruletype, self.source, self.target, self.tclass)?;
        if let Some(filename) = &self.filename {
            write!(f, " \"{}\"", filename)?;
        }
        if let Some((expr, branch)) = &self.conditional {
            write!(f, " [ {} ]:{}", expr, if *branch { "True" } else { "False" })?;
        }
        Ok(())
    }
}

/// The difference in one TE rule type. Added and removed rules keep their permissions or
/// default type.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RuleDiff<V, M> {
    pub added: BTreeMap<RuleKey, V>,
    pub removed: BTreeMap<RuleKey, V>,
    pub modified: BTreeMap<RuleKey, M>,
}

impl<V, M> RuleDiff<V, M> {
    fn compute(
        mut left: BTreeMap<RuleKey, V>,
        mut right: BTreeMap<RuleKey, V>,
        modified: impl Fn(&V, &V) -> Option<M>,
    ) -> Self {
        let matched: Vec<RuleKey> =
            left.keys().filter(|key| right.contains_key(*key)).cloned().collect();
        let mut modified_rules = BTreeMap::new();
        for key in matched {
            if let (Some(l), Some(r)) = (left.remove(&key), right.remove(&key)) {
                if let Some(record) = modified(&l, &r) {
                    modified_rules.insert(key, record);
                }
            }
        }
        Self { added: right, removed: left, modified: modified_rules }
    }
}

/// Access vector rules of `ruletype`, with the permissions of rules sharing a key merged.
fn av_rules(policy: &Policy, ruletype: TeRuleType) -> BTreeMap<RuleKey, BTreeSet<String>> {
    let mut rules: BTreeMap<RuleKey, BTreeSet<String>> = BTreeMap::new();
    for rule in policy.terules().filter(|rule| rule.ruletype() == ruletype) {
        if let Ok(perms) = rule.perms() {
            rules
                .entry(RuleKey::new(&rule))
                .or_default()
                .extend(perms.into_iter().map(str::to_string));
        }
    }
    rules
}

/// Type rules of `ruletype`, mapped to their default type.
fn type_rules(policy: &Policy, ruletype: TeRuleType) -> BTreeMap<RuleKey, String> {
    policy
        .terules()
        .filter(|rule| rule.ruletype() == ruletype)
        .filter_map(|rule| Some((RuleKey::new(&rule), rule.default().ok()?.name().to_string())))
        .collect()
}

fn diff_perm_sets(
    left: &BTreeSet<String>,
    right: &BTreeSet<String>,
) -> Option<ModifiedPermissions> {
    let perms = SetDelta::new(left, right);
    perms.is_changed().then_some(ModifiedPermissions { perms })
}

fn class_perms<'a>(class: &ObjectClass<'a>) -> BTreeSet<&'a str> {
    let mut perms = class.perms();
    if let Ok(common) = class.common() {
        perms.extend(common.perms());
    }
    perms
}

fn diff_commons(left: &Common<'_>, right: &Common<'_>) -> Option<ModifiedPermissions> {
    let perms = SetDelta::new(left.perms(), right.perms());
    perms.is_changed().then_some(ModifiedPermissions { perms })
}

fn diff_classes(left: &ObjectClass<'_>, right: &ObjectClass<'_>) -> Option<ModifiedPermissions> {
    let perms = SetDelta::new(class_perms(left), class_perms(right));
    perms.is_changed().then_some(ModifiedPermissions { perms })
}

fn diff_roles(left: &Role<'_>, right: &Role<'_>) -> Option<ModifiedRole> {
    let types = SetDelta::new(left.types(), right.types());
    types.is_changed().then_some(ModifiedRole { types })
}

fn diff_types(left: &Type<'_>, right: &Type<'_>) -> Option<ModifiedType> {
    let attributes = SetDelta::new(left.attributes(), right.attributes());
    let aliases = SetDelta::new(left.aliases(), right.aliases());
    let modified_permissive = left.is_permissive() != right.is_permissive();
    (attributes.is_changed() || aliases.is_changed() || modified_permissive).then_some(
        ModifiedType { attributes, aliases, modified_permissive, permissive: left.is_permissive() },
    )
}

fn diff_booleans(left: &Boolean<'_>, right: &Boolean<'_>) -> Option<Change<bool>> {
    (left.state() != right.state()).then_some(Change { left: left.state(), right: right.state() })
}

fn diff_users(left: &User<'_>, right: &User<'_>) -> Option<ModifiedUser> {
    let roles = SetDelta::new(left.roles(), right.roles());
    let changed = |l: String, r: String| (l != r).then_some(Change { left: l, right: r });
    let level = match (left.mls_level(), right.mls_level()) {
        (Ok(l), Ok(r)) => changed(l.to_string(), r.to_string()),
        _ => None,
    };
    let range = match (left.mls_range(), right.mls_range()) {
        (Ok(l), Ok(r)) => changed(l.to_string(), r.to_string()),
        _ => None,
    };
    (roles.is_changed() || level.is_some() || range.is_some())
        .then_some(ModifiedUser { roles, level, range })
}

fn diff_type_attributes(left: &Type<'_>, right: &Type<'_>) -> Option<ModifiedTypeAttribute> {
    let types = SetDelta::new(left.expand(), right.expand());
    types.is_changed().then_some(ModifiedTypeAttribute { types })
}

/// Differences between a `left` and a `right` policy.
///
/// Each symbol kind is diffed on first access and cached until either policy is replaced.
#[derive(Debug)]
pub struct PolicyDifference<'p> {
    left: &'p Policy,
    right: &'p Policy,
    commons: OnceCell<SymbolDiff<ModifiedPermissions>>,
    classes: OnceCell<SymbolDiff<ModifiedPermissions>>,
    roles: OnceCell<SymbolDiff<ModifiedRole>>,
    types: OnceCell<SymbolDiff<ModifiedType>>,
    type_attributes: OnceCell<SymbolDiff<ModifiedTypeAttribute>>,
    users: OnceCell<SymbolDiff<ModifiedUser>>,
    booleans: OnceCell<SymbolDiff<Change<bool>>>,
    allows: OnceCell<RuleDiff<BTreeSet<String>, ModifiedPermissions>>,
    type_transitions: OnceCell<RuleDiff<String, Change<String>>>,
}

impl<'p> PolicyDifference<'p> {
    pub fn new(left: &'p Policy, right: &'p Policy) -> Self {
        Self {
            left,
            right,
            commons: OnceCell::new(),
            classes: OnceCell::new(),
            roles: OnceCell::new(),
            types: OnceCell::new(),
            type_attributes: OnceCell::new(),
            users: OnceCell::new(),
            booleans: OnceCell::new(),
            allows: OnceCell::new(),
            type_transitions: OnceCell::new(),
        }
    }

    pub fn left(&self) -> &'p Policy {
        self.left
    }

    pub fn right(&self) -> &'p Policy {
        self.right
    }

    pub fn set_left(&mut self, policy: &'p Policy) {
        self.left = policy;
        self.reset();
    }

    pub fn set_right(&mut self, policy: &'p Policy) {
        self.right = policy;
        self.reset();
    }

    fn reset(&mut self) {
        debug!("Resetting all policy difference results");
        self.commons.take();
        self.classes.take();
        self.roles.take();
        self.types.take();
        self.type_attributes.take();
        self.users.take();
        self.booleans.take();
        self.allows.take();
        self.type_transitions.take();
    }

    // Commons.

    pub fn commons(&self) -> &SymbolDiff<ModifiedPermissions> {
        self.commons.get_or_init(|| {
            info!("Generating common differences");
            SymbolDiff::compute(
                self.left.commons(),
                self.right.commons(),
                |common| common.name().to_string(),
                diff_commons,
            )
        })
    }

    pub fn added_commons(&self) -> &BTreeSet<String> {
        &self.commons().added
    }

    pub fn removed_commons(&self) -> &BTreeSet<String> {
        &self.commons().removed
    }

    pub fn modified_commons(&self) -> &BTreeMap<String, ModifiedPermissions> {
        &self.commons().modified
    }

    // Classes.

    /// Class differences. Permissions inherited from a common count as the class's own.
    pub fn classes(&self) -> &SymbolDiff<ModifiedPermissions> {
        self.classes.get_or_init(|| {
            info!("Generating class differences");
            SymbolDiff::compute(
                self.left.classes(),
                self.right.classes(),
                |class| class.name().to_string(),
                diff_classes,
            )
        })
    }

    pub fn added_classes(&self) -> &BTreeSet<String> {
        &self.classes().added
    }

    pub fn removed_classes(&self) -> &BTreeSet<String> {
        &self.classes().removed
    }

    pub fn modified_classes(&self) -> &BTreeMap<String, ModifiedPermissions> {
        &self.classes().modified
    }

    // Roles.

    pub fn roles(&self) -> &SymbolDiff<ModifiedRole> {
        self.roles.get_or_init(|| {
            info!("Generating role differences");
            SymbolDiff::compute(
                self.left.roles(),
                self.right.roles(),
                |role| role.name().to_string(),
                diff_roles,
            )
        })
    }

    pub fn added_roles(&self) -> &BTreeSet<String> {
        &self.roles().added
    }

    pub fn removed_roles(&self) -> &BTreeSet<String> {
        &self.roles().removed
    }

    pub fn modified_roles(&self) -> &BTreeMap<String, ModifiedRole> {
        &self.roles().modified
    }

    // Types.

    /// Differences in concrete types. Attributes are not diffed as types.
    pub fn types(&self) -> &SymbolDiff<ModifiedType> {
        self.types.get_or_init(|| {
            info!("Generating type differences");
            SymbolDiff::compute(
                self.left.types(),
                self.right.types(),
                |type_| type_.name().to_string(),
                diff_types,
            )
        })
    }

    pub fn added_types(&self) -> &BTreeSet<String> {
        &self.types().added
    }

    pub fn removed_types(&self) -> &BTreeSet<String> {
        &self.types().removed
    }

    pub fn modified_types(&self) -> &BTreeMap<String, ModifiedType> {
        &self.types().modified
    }

    // Type attributes.

    /// Attribute differences. An attribute is modified when its expanded member set changes.
    pub fn type_attributes(&self) -> &SymbolDiff<ModifiedTypeAttribute> {
        self.type_attributes.get_or_init(|| {
            info!("Generating type attribute differences");
            SymbolDiff::compute(
                self.left.typeattributes(),
                self.right.typeattributes(),
                |attr| attr.name().to_string(),
                diff_type_attributes,
            )
        })
    }

    pub fn added_type_attributes(&self) -> &BTreeSet<String> {
        &self.type_attributes().added
    }

    pub fn removed_type_attributes(&self) -> &BTreeSet<String> {
        &self.type_attributes().removed
    }

    pub fn modified_type_attributes(&self) -> &BTreeMap<String, ModifiedTypeAttribute> {
        &self.type_attributes().modified
    }

    // Users.

    pub fn users(&self) -> &SymbolDiff<ModifiedUser> {
        self.users.get_or_init(|| {
            info!("Generating user differences");
            SymbolDiff::compute(
                self.left.users(),
                self.right.users(),
                |user| user.name().to_string(),
                diff_users,
            )
        })
    }

    pub fn added_users(&self) -> &BTreeSet<String> {
        &self.users().added
    }

    pub fn removed_users(&self) -> &BTreeSet<String> {
        &self.users().removed
    }

    pub fn modified_users(&self) -> &BTreeMap<String, ModifiedUser> {
        &self.users().modified
    }

    // Booleans.

    /// Boolean differences. A Boolean is modified when its default state changes.
    pub fn booleans(&self) -> &SymbolDiff<Change<bool>> {
        self.booleans.get_or_init(|| {
            info!("Generating Boolean differences");
            SymbolDiff::compute(
                self.left.booleans(),
                self.right.booleans(),
                |boolean| boolean.name().to_string(),
                diff_booleans,
            )
        })
    }

    pub fn added_booleans(&self) -> &BTreeSet<String> {
        &self.booleans().added
    }

    pub fn removed_booleans(&self) -> &BTreeSet<String> {
        &self.booleans().removed
    }

    pub fn modified_booleans(&self) -> &BTreeMap<String, Change<bool>> {
        &self.booleans().modified
    }

    // TE rules.

    /// `allow` rule differences. A rule is modified when its permission set changes.
    pub fn allows(&self) -> &RuleDiff<BTreeSet<String>, ModifiedPermissions> {
        self.allows.get_or_init(|| {
            info!("Generating allow differences");
            RuleDiff::compute(
                av_rules(self.left, TeRuleType::Allow),
                av_rules(self.right, TeRuleType::Allow),
                diff_perm_sets,
            )
        })
    }

    pub fn added_allows(&self) -> &BTreeMap<RuleKey, BTreeSet<String>> {
        &self.allows().added
    }

    pub fn removed_allows(&self) -> &BTreeMap<RuleKey, BTreeSet<String>> {
        &self.allows().removed
    }

    pub fn modified_allows(&self) -> &BTreeMap<RuleKey, ModifiedPermissions> {
        &self.allows().modified
    }

    /// `type_transition` rule differences. A rule is modified when its default type changes.
    pub fn type_transitions(&self) -> &RuleDiff<String, Change<String>> {
        self.type_transitions.get_or_init(|| {
            info!("Generating type_transition differences");
            RuleDiff::compute(
                type_rules(self.left, TeRuleType::TypeTransition),
                type_rules(self.right, TeRuleType::TypeTransition),
                |left, right| {
                    (left != right).then(|| Change { left: left.clone(), right: right.clone() })
                },
            )
        })
    }

    pub fn added_type_transitions(&self) -> &BTreeMap<RuleKey, String> {
        &self.type_transitions().added
    }

    pub fn removed_type_transitions(&self) -> &BTreeMap<RuleKey, String> {
        &self.type_transitions().removed
    }

    pub fn modified_type_transitions(&self) -> &BTreeMap<RuleKey, Change<String>> {
        &self.type_transitions().modified
    }
}
