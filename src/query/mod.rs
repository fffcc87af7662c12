// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Rule and symbol queries over a loaded [`Policy`](crate::policy::Policy).
//!
//! Each query is a builder. Setters that name symbols resolve them immediately, so an unknown
//! name or rule type fails before any rule is inspected. `results()` then filters the matching
//! rule or symbol enumeration lazily, in policy order. A rule that does not carry a field a
//! criterion applies to (the permissions of a `type_transition`, the class of a role `allow`)
//! does not match.

pub mod boolean;
pub mod common;
pub mod constraint;
pub mod default;
pub mod mlsrule;
pub mod objclass;
pub mod rbacrule;
pub mod role;
pub mod terule;
pub mod types;
pub mod user;

pub use boolean::BoolQuery;
pub use common::CommonQuery;
pub use constraint::ConstraintQuery;
pub use default::DefaultQuery;
pub use mlsrule::MlsRuleQuery;
pub use objclass::ObjClassQuery;
pub use rbacrule::RbacRuleQuery;
pub use role::RoleQuery;
pub use terule::TeRuleQuery;
pub use types::TypeQuery;
pub use user::UserQuery;

use crate::policy::error::PolicyError;
use crate::policy::rules::RbacTarget;
use crate::policy::symbols::{Level, Range, Role, Type};

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

/// A criterion a rule field is matched against: a resolved value, or a pattern searched for
/// anywhere in the field's string form.
#[derive(Clone, Debug)]
pub enum Criterion<T> {
    Exact(T),
    Regex(Regex),
}

impl<T> Criterion<T> {
    /// Compiles `pattern` into a [`Criterion::Regex`].
    pub fn regex(pattern: &str) -> Result<Self, PolicyError> {
        Regex::new(pattern).map(Criterion::Regex).map_err(|e| PolicyError::InvalidRegex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
    }
}

impl<T: fmt::Debug> fmt::Display for Criterion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Exact(value) => write!(f, "{:?}", value),
            Criterion::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// Symbols that stand for a set of symbols in indirect matching: attributes expand to their
/// member types, everything else to itself.
pub trait Expand: Sized {
    fn expand(&self) -> Vec<Self>;
}

impl<'a> Expand for Type<'a> {
    fn expand(&self) -> Vec<Self> {
        Type::expand(self)
    }
}

impl<'a> Expand for Role<'a> {
    fn expand(&self) -> Vec<Self> {
        Role::expand(self)
    }
}

impl<'a> Expand for RbacTarget<'a> {
    fn expand(&self) -> Vec<Self> {
        match self {
            RbacTarget::Role(role) => role.expand().into_iter().map(RbacTarget::Role).collect(),
            RbacTarget::Type(type_) => type_.expand().into_iter().map(RbacTarget::Type).collect(),
        }
    }
}

/// Matches `obj` by equality, or by searching its string form with the pattern.
pub fn match_regex<T: PartialEq + fmt::Display>(obj: &T, criterion: &Criterion<T>) -> bool {
    match criterion {
        Criterion::Exact(value) => obj == value,
        Criterion::Regex(regex) => regex.is_match(&obj.to_string()),
    }
}

/// True if any of `items` matches `criterion`.
pub fn match_in_set<T: PartialEq + fmt::Display>(
    items: impl IntoIterator<Item = T>,
    criterion: &Criterion<T>,
) -> bool {
    items.into_iter().any(|item| match_regex(&item, criterion))
}

/// Matches `obj` directly, or, if `indirect`, by the members of both `obj` and the criterion:
/// an exact criterion matches when the two expansions intersect, a pattern when any member of
/// `obj` matches it.
pub fn match_indirect_regex<T: Expand + PartialEq + fmt::Display>(
    obj: &T,
    criterion: &Criterion<T>,
    indirect: bool,
) -> bool {
    if !indirect {
        return match_regex(obj, criterion);
    }
    match criterion {
        Criterion::Exact(value) => {
            let members = obj.expand();
            value.expand().iter().any(|member| members.contains(member))
        }
        Criterion::Regex(_) => match_in_set(obj.expand(), criterion),
    }
}

/// Matches a set field. An exact criterion matches by set equality if `equal`, otherwise by a
/// nonempty intersection; a pattern matches when any element matches it.
pub fn match_regex_or_set<T: Ord + fmt::Display>(
    candidates: &BTreeSet<T>,
    criterion: &Criterion<BTreeSet<T>>,
    equal: bool,
) -> bool {
    match criterion {
        Criterion::Exact(set) if equal => candidates == set,
        Criterion::Exact(set) => !candidates.is_disjoint(set),
        Criterion::Regex(regex) => candidates.iter().any(|item| regex.is_match(&item.to_string())),
    }
}

/// Matches an object class against a set of classes, or a pattern.
pub fn match_object_class<T: Ord + fmt::Display>(
    obj: &T,
    criterion: &Criterion<BTreeSet<T>>,
) -> bool {
    match criterion {
        Criterion::Exact(classes) => classes.contains(obj),
        Criterion::Regex(regex) => regex.is_match(&obj.to_string()),
    }
}

/// Matches a permission set: by equality if `equal`, otherwise by a nonempty intersection. A
/// pattern matches when any permission matches it.
pub fn match_permissions(
    perms: &BTreeSet<&str>,
    criterion: &Criterion<BTreeSet<String>>,
    equal: bool,
) -> bool {
    match criterion {
        Criterion::Exact(set) if equal => {
            perms.len() == set.len() && set.iter().all(|perm| perms.contains(perm.as_str()))
        }
        Criterion::Exact(set) => set.iter().any(|perm| perms.contains(perm.as_str())),
        Criterion::Regex(regex) => perms.iter().any(|perm| regex.is_match(perm)),
    }
}

/// How a level criterion is compared with a symbol's level.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LevelMatch {
    #[default]
    Equal,
    /// The criterion dominates the level.
    Dominates,
    /// The level dominates the criterion.
    DominatedBy,
    /// Neither dominates the other.
    Incomparable,
}

/// Matches `obj` against a level criterion.
pub fn match_level<'a>(obj: &Level<'a>, criterion: &Level<'a>, how: LevelMatch) -> bool {
    match how {
        LevelMatch::Equal => obj == criterion,
        LevelMatch::Dominates => criterion.dominates(obj),
        LevelMatch::DominatedBy => obj.dominates(criterion),
        LevelMatch::Incomparable => !criterion.dominates(obj) && !obj.dominates(criterion),
    }
}

/// How a range criterion is compared with a symbol's range.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RangeMatch {
    #[default]
    Equal,
    /// The ranges share at least one level.
    Overlap,
    /// The criterion lies within the range.
    Subset,
    ProperSubset,
    /// The range lies within the criterion.
    Superset,
    ProperSuperset,
}

/// Matches `obj` against a range criterion.
pub fn match_range<'a>(obj: &Range<'a>, criterion: &Range<'a>, how: RangeMatch) -> bool {
    // `a <= b` in the dominance order.
    let le = |a: &Level<'_>, b: &Level<'_>| b.dominates(a);
    let within = |inner: &Range<'_>, outer: &Range<'_>| {
        le(outer.low(), inner.low()) && le(inner.high(), outer.high())
    };
    let equal = obj == criterion;
    match how {
        RangeMatch::Equal => equal,
        RangeMatch::Overlap => {
            (le(obj.low(), criterion.low()) && le(criterion.low(), obj.high()))
                || (le(obj.low(), criterion.high()) && le(criterion.high(), obj.high()))
                || within(obj, criterion)
        }
        RangeMatch::Subset => within(criterion, obj),
        RangeMatch::ProperSubset => within(criterion, obj) && !equal,
        RangeMatch::Superset => within(obj, criterion),
        RangeMatch::ProperSuperset => within(obj, criterion) && !equal,
    }
}

/// Resolves each of `names` with `lookup`, collecting the results.
pub(crate) fn resolve_all<'n, T: Ord>(
    names: impl IntoIterator<Item = &'n str>,
    lookup: impl Fn(&str) -> Result<T, PolicyError>,
) -> Result<BTreeSet<T>, PolicyError> {
    names.into_iter().map(lookup).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{LoadOptions, Policy};
    use assert_matches::assert_matches;

    const POLICY: &str = r#"
class file
class dir
class file { read write }
class dir { search }
attribute domain;
type init_t, domain;
type shell_t, domain;
type etc_t;
role system_r types domain;
user system_u roles system_r;
"#;

    fn policy() -> Policy {
        Policy::parse(POLICY, &LoadOptions::default()).expect("parse policy")
    }

    #[test]
    fn exact_and_regex() {
        let policy = policy();
        let init = policy.lookup_type("init_t").expect("init_t");
        let shell = policy.lookup_type("shell_t").expect("shell_t");
        assert!(match_regex(&init, &Criterion::Exact(init)));
        assert!(!match_regex(&shell, &Criterion::Exact(init)));
        let pattern = Criterion::regex("it_").expect("regex");
        assert!(match_regex(&init, &pattern));
        assert!(!match_regex(&shell, &pattern));
        assert_matches!(Criterion::<Type<'_>>::regex("("), Err(PolicyError::InvalidRegex { .. }));
    }

    #[test]
    fn indirect_matching() {
        let policy = policy();
        let domain = policy.lookup_type_or_attr("domain").expect("domain");
        let init = policy.lookup_type("init_t").expect("init_t");
        let etc = policy.lookup_type("etc_t").expect("etc_t");
        assert!(!match_indirect_regex(&init, &Criterion::Exact(domain), false));
        assert!(match_indirect_regex(&init, &Criterion::Exact(domain), true));
        assert!(match_indirect_regex(&domain, &Criterion::Exact(init), true));
        assert!(!match_indirect_regex(&etc, &Criterion::Exact(domain), true));
        let pattern = Criterion::regex("^shell").expect("regex");
        assert!(match_indirect_regex(&domain, &pattern, true));
        assert!(!match_indirect_regex(&domain, &pattern, false));
    }

    #[test]
    fn set_matching() {
        let set = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<BTreeSet<_>>();
        let candidates = set(&["read", "write"]);
        assert!(match_regex_or_set(&candidates, &Criterion::Exact(set(&["read"])), false));
        assert!(!match_regex_or_set(&candidates, &Criterion::Exact(set(&["read"])), true));
        assert!(match_regex_or_set(&candidates, &Criterion::Exact(set(&["write", "read"])), true));
        assert!(match_regex_or_set(&candidates, &Criterion::regex("^wr").expect("regex"), false));

        let perms: BTreeSet<&str> = ["read", "write"].into_iter().collect();
        assert!(match_permissions(&perms, &Criterion::Exact(set(&["write", "execute"])), false));
        assert!(!match_permissions(&perms, &Criterion::Exact(set(&["write", "execute"])), true));
        assert!(match_permissions(&perms, &Criterion::Exact(set(&["write", "read"])), true));
    }

    #[test]
    fn object_classes() {
        let policy = policy();
        let file = policy.lookup_class("file").expect("file");
        let dir = policy.lookup_class("dir").expect("dir");
        let classes: BTreeSet<_> = [file].into_iter().collect();
        assert!(match_object_class(&file, &Criterion::Exact(classes.clone())));
        assert!(!match_object_class(&dir, &Criterion::Exact(classes)));
        assert!(match_object_class(&dir, &Criterion::regex("d.r").expect("regex")));
    }
}
