// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Borrowed views of the symbols declared by a policy.
//!
//! Every view refers to the policy it was obtained from and cannot outlive it. Views compare
//! equal when they come from the same policy and have the same name; they order and hash by
//! name alone.

use super::constraints::Constraint;
use super::error::PolicyError;
use super::index::PolicyIndex;
use super::labeling::Context;
use super::parsed_policy::{
    BooleanDecl, CategoryDecl, ClassDecl, CommonDecl, InitialSidDecl, LevelData,
    PolicyCapDecl, RangeData, RoleDecl, SensitivityDecl, TypeDecl, UserDecl,
};
use super::rules::DefaultRule;

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

macro_rules! policy_symbol {
    ($(#[$meta:meta])* $name:ident, $decl:ty) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        pub struct $name<'a> {
            index: &'a PolicyIndex,
            decl: &'a $decl,
        }

        impl<'a> $name<'a> {
            pub(super) fn new(index: &'a PolicyIndex, decl: &'a $decl) -> Self {
                Self { index, decl }
            }

            pub fn name(&self) -> &'a str {
                &self.decl.name
            }
        }

        impl fmt::Display for $name<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.decl.name)
            }
        }

        impl fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.decl.name).finish()
            }
        }

        impl PartialEq for $name<'_> {
            fn eq(&self, other: &Self) -> bool {
                std::ptr::eq(self.index, other.index) && self.decl.name == other.decl.name
            }
        }

        impl Eq for $name<'_> {}

        impl Hash for $name<'_> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.decl.name.hash(state);
            }
        }

        impl PartialOrd for $name<'_> {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name<'_> {
            fn cmp(&self, other: &Self) -> Ordering {
                self.decl.name.cmp(&other.decl.name)
            }
        }
    };
}

/// Formats `names` as a single name, or as `{ a b }` when there are several.
fn braced<'n>(names: impl IntoIterator<Item = &'n str>) -> String {
    let names: Vec<&str> = names.into_iter().collect();
    if names.len() == 1 {
        names[0].to_string()
    } else {
        format!("{{ {} }}", names.join(" "))
    }
}

policy_symbol!(
    /// A named set of permissions that classes may inherit.
    Common,
    CommonDecl
);

impl<'a> Common<'a> {
    pub fn perms(&self) -> BTreeSet<&'a str> {
        self.decl.perms.iter().map(String::as_str).collect()
    }

    pub fn statement(&self) -> String {
        let perms: Vec<&str> = self.perms().into_iter().collect();
        format!("common {} {{ {} }}", self.name(), perms.join(" "))
    }
}

policy_symbol!(
    /// An object class.
    ObjectClass,
    ClassDecl
);

impl<'a> ObjectClass<'a> {
    /// The permissions declared by the class itself.
    pub fn perms(&self) -> BTreeSet<&'a str> {
        self.decl.perms.iter().map(String::as_str).collect()
    }

    /// The common the class inherits permissions from.
    pub fn common(&self) -> Result<Common<'a>, PolicyError> {
        self.decl
            .common
            .map(|common| Common::new(self.index, &self.index.parsed_policy().commons[common]))
            .ok_or_else(|| PolicyError::NoCommon { class: self.name().to_string() })
    }

    /// Declared and inherited permissions.
    pub fn all_perms(&self) -> BTreeSet<&'a str> {
        let mut perms = self.perms();
        if let Ok(common) = self.common() {
            perms.extend(common.perms());
        }
        perms
    }

    fn class_index(&self) -> Option<usize> {
        self.index.class_index(self.name())
    }

    /// The `default_*` rules of this class.
    pub fn defaults(&self) -> Result<Vec<DefaultRule<'a>>, PolicyError> {
        let class = self.class_index();
        let defaults: Vec<_> = self
            .index
            .parsed_policy()
            .defaults
            .iter()
            .filter(|data| Some(data.class) == class)
            .map(|data| DefaultRule::new(self.index, data))
            .collect();
        if defaults.is_empty() {
            return Err(PolicyError::NoDefaults { class: self.name().to_string() });
        }
        Ok(defaults)
    }

    /// The constraints and validatetrans statements on this class.
    pub fn constraints(&self) -> Vec<Constraint<'a>> {
        let class = self.class_index();
        self.index
            .parsed_policy()
            .constraints
            .iter()
            .filter(|data| Some(data.class) == class)
            .map(|data| Constraint::new(self.index, data))
            .collect()
    }

    pub fn statement(&self) -> String {
        let mut statement = format!("class {}", self.name());
        if let Ok(common) = self.common() {
            statement.push_str(&format!(" inherits {}", common));
        }
        let perms = self.perms();
        if !perms.is_empty() {
            statement
                .push_str(&format!(" {{ {} }}", perms.into_iter().collect::<Vec<_>>().join(" ")));
        }
        statement
    }
}

policy_symbol!(
    /// A role.
    Role,
    RoleDecl
);

impl<'a> Role<'a> {
    /// The concrete types authorized for the role.
    pub fn types(&self) -> BTreeSet<Type<'a>> {
        let types = &self.index.parsed_policy().types;
        self.decl.types.iter().map(|t| Type::new(self.index, &types[*t])).collect()
    }

    /// Roles are atoms: a role expands to itself.
    pub fn expand(&self) -> Vec<Role<'a>> {
        vec![*self]
    }

    pub fn statement(&self) -> String {
        let types = self.types();
        if types.is_empty() {
            format!("role {};", self.name())
        } else {
            format!("role {} types {};", self.name(), braced(types.iter().map(|t| t.name())))
        }
    }
}

policy_symbol!(
    /// A type or a type attribute.
    Type,
    TypeDecl
);

impl<'a> Type<'a> {
    pub fn is_attribute(&self) -> bool {
        self.decl.is_attribute
    }

    /// The member types of an attribute, or the type itself.
    pub fn expand(&self) -> Vec<Type<'a>> {
        if !self.decl.is_attribute {
            return vec![*self];
        }
        let types = &self.index.parsed_policy().types;
        self.decl.members.iter().map(|t| Type::new(self.index, &types[*t])).collect()
    }

    /// The attributes of a type. Empty for attributes.
    pub fn attributes(&self) -> BTreeSet<Type<'a>> {
        let types = &self.index.parsed_policy().types;
        self.decl.attributes.iter().map(|t| Type::new(self.index, &types[*t])).collect()
    }

    pub fn aliases(&self) -> BTreeSet<&'a str> {
        self.decl.aliases.iter().map(String::as_str).collect()
    }

    pub fn is_permissive(&self) -> bool {
        self.decl.permissive
    }

    /// The parent of a bounded type.
    pub fn bounds(&self) -> Option<Type<'a>> {
        self.decl.bounds.map(|t| Type::new(self.index, &self.index.parsed_policy().types[t]))
    }

    pub fn statement(&self) -> String {
        if self.is_attribute() {
            return format!("attribute {};", self.name());
        }
        let mut statement = format!("type {}", self.name());
        let aliases = self.aliases();
        if !aliases.is_empty() {
            statement.push_str(&format!(" alias {}", braced(aliases)));
        }
        for attribute in self.attributes() {
            statement.push_str(&format!(", {}", attribute));
        }
        statement.push(';');
        statement
    }
}

policy_symbol!(
    /// A user.
    User,
    UserDecl
);

impl<'a> User<'a> {
    pub fn roles(&self) -> BTreeSet<Role<'a>> {
        let roles = &self.index.parsed_policy().roles;
        self.decl.roles.iter().map(|r| Role::new(self.index, &roles[*r])).collect()
    }

    /// The default level of the user.
    pub fn mls_level(&self) -> Result<Level<'a>, PolicyError> {
        self.decl
            .level
            .as_ref()
            .map(|level| Level::new(self.index, level.clone()))
            .ok_or(PolicyError::MlsDisabled)
    }

    /// The range the user is authorized for.
    pub fn mls_range(&self) -> Result<Range<'a>, PolicyError> {
        self.decl
            .range
            .as_ref()
            .map(|range| Range::from_data(self.index, range))
            .ok_or(PolicyError::MlsDisabled)
    }

    pub fn statement(&self) -> String {
        let mut statement =
            format!("user {} roles {}", self.name(), braced(self.roles().iter().map(|r| r.name())));
        if let (Ok(level), Ok(range)) = (self.mls_level(), self.mls_range()) {
            statement.push_str(&format!(" level {} range {}", level, range));
        }
        statement.push(';');
        statement
    }
}

policy_symbol!(
    /// A conditional policy Boolean.
    Boolean,
    BooleanDecl
);

impl Boolean<'_> {
    /// The default state.
    pub fn state(&self) -> bool {
        self.decl.state
    }

    pub fn statement(&self) -> String {
        format!("bool {} {};", self.name(), self.state())
    }
}

policy_symbol!(
    /// An MLS sensitivity.
    Sensitivity,
    SensitivityDecl
);

impl<'a> Sensitivity<'a> {
    pub fn aliases(&self) -> BTreeSet<&'a str> {
        self.decl.aliases.iter().map(String::as_str).collect()
    }

    /// Position in the dominance order; higher dominates lower.
    pub fn value(&self) -> usize {
        self.decl.value
    }

    /// The `level` statement declaring the categories valid with this sensitivity.
    pub fn level_decl(&self) -> Result<LevelDecl<'a>, PolicyError> {
        self.index
            .sensitivity_index(self.name())
            .and_then(|sensitivity| {
                self.index.parsed_policy().levels.iter().find(|l| l.sensitivity == sensitivity)
            })
            .map(|data| LevelDecl::new(self.index, data))
            .ok_or_else(|| PolicyError::InvalidLevelDecl { name: self.name().to_string() })
    }

    pub fn statement(&self) -> String {
        let aliases = self.aliases();
        if aliases.is_empty() {
            format!("sensitivity {};", self.name())
        } else {
            format!("sensitivity {} alias {};", self.name(), braced(aliases))
        }
    }
}

policy_symbol!(
    /// An MLS category.
    Category,
    CategoryDecl
);

impl<'a> Category<'a> {
    pub fn aliases(&self) -> BTreeSet<&'a str> {
        self.decl.aliases.iter().map(String::as_str).collect()
    }

    /// Position in declaration order.
    pub fn value(&self) -> usize {
        self.decl.value
    }

    pub fn statement(&self) -> String {
        let aliases = self.aliases();
        if aliases.is_empty() {
            format!("category {};", self.name())
        } else {
            format!("category {} alias {};", self.name(), braced(aliases))
        }
    }
}

policy_symbol!(
    /// A policy capability enabled with `policycap`.
    PolicyCapability,
    PolicyCapDecl
);

impl PolicyCapability<'_> {
    pub fn statement(&self) -> String {
        format!("policycap {};", self.name())
    }
}

policy_symbol!(
    /// An initial security identifier.
    InitialSid,
    InitialSidDecl
);

impl<'a> InitialSid<'a> {
    /// The context of the SID, if the policy labels it.
    pub fn context(&self) -> Option<Context<'a>> {
        self.decl.context.as_ref().map(|context| Context::new(self.index, context))
    }

    pub fn statement(&self) -> String {
        match self.context() {
            Some(context) => format!("sid {} {}", self.name(), context),
            None => format!("sid {}", self.name()),
        }
    }
}

/// Writes `sensitivity[:categories]`, collapsing runs of consecutive categories to `first.last`.
fn write_level(
    f: &mut fmt::Formatter<'_>,
    index: &PolicyIndex,
    sensitivity: usize,
    categories: &[usize],
) -> fmt::Result {
    let policy = index.parsed_policy();
    f.write_str(&policy.sensitivities[sensitivity].name)?;
    let mut runs: Vec<(usize, usize)> = Vec::new();
    for &category in categories {
        match runs.last_mut() {
            Some((_, last))
                if policy.categories[*last].value + 1 == policy.categories[category].value =>
            {
                *last = category
            }
            _ => runs.push((category, category)),
        }
    }
    for (i, (first, last)) in runs.into_iter().enumerate() {
        f.write_str(if i == 0 { ":" } else { "," })?;
        f.write_str(&policy.categories[first].name)?;
        if first != last {
            write!(f, ".{}", policy.categories[last].name)?;
        }
    }
    Ok(())
}

/// A `level` declaration: a sensitivity and the categories allowed with it.
#[derive(Clone, Copy)]
pub struct LevelDecl<'a> {
    index: &'a PolicyIndex,
    data: &'a LevelData,
}

impl<'a> LevelDecl<'a> {
    pub(super) fn new(index: &'a PolicyIndex, data: &'a LevelData) -> Self {
        Self { index, data }
    }

    pub fn sensitivity(&self) -> Sensitivity<'a> {
        let sensitivities = &self.index.parsed_policy().sensitivities;
        Sensitivity::new(self.index, &sensitivities[self.data.sensitivity])
    }

    pub fn categories(&self) -> Vec<Category<'a>> {
        let categories = &self.index.parsed_policy().categories;
        self.data.categories.iter().map(|c| Category::new(self.index, &categories[*c])).collect()
    }

    pub fn statement(&self) -> String {
        format!("level {};", self)
    }
}

impl fmt::Display for LevelDecl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_level(f, self.index, self.data.sensitivity, &self.data.categories)
    }
}

impl fmt::Debug for LevelDecl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LevelDecl").field(&self.to_string()).finish()
    }
}

impl PartialEq for LevelDecl<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.index, other.index) && self.data == other.data
    }
}

impl Eq for LevelDecl<'_> {}

/// An MLS level: a sensitivity and a set of categories.
#[derive(Clone)]
pub struct Level<'a> {
    index: &'a PolicyIndex,
    data: LevelData,
}

impl<'a> Level<'a> {
    pub(super) fn new(index: &'a PolicyIndex, data: LevelData) -> Self {
        Self { index, data }
    }

    pub fn sensitivity(&self) -> Sensitivity<'a> {
        let sensitivities = &self.index.parsed_policy().sensitivities;
        Sensitivity::new(self.index, &sensitivities[self.data.sensitivity])
    }

    pub fn categories(&self) -> Vec<Category<'a>> {
        let categories = &self.index.parsed_policy().categories;
        self.data.categories.iter().map(|c| Category::new(self.index, &categories[*c])).collect()
    }

    /// True if this level's sensitivity is at least `other`'s and its categories are a superset.
    pub fn dominates(&self, other: &Level<'_>) -> bool {
        self.sensitivity().value() >= other.sensitivity().value()
            && other.data.categories.iter().all(|c| self.data.categories.contains(c))
    }

    pub fn statement(&self) -> Result<String, PolicyError> {
        Err(PolicyError::NoStatement { what: format!("level {}", self) })
    }
}

impl fmt::Display for Level<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_level(f, self.index, self.data.sensitivity, &self.data.categories)
    }
}

impl fmt::Debug for Level<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Level").field(&self.to_string()).finish()
    }
}

impl PartialEq for Level<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.index, other.index) && self.data == other.data
    }
}

impl Eq for Level<'_> {}

/// An MLS range, from a low level to a high level that dominates it.
#[derive(Clone, PartialEq, Eq)]
pub struct Range<'a> {
    low: Level<'a>,
    high: Level<'a>,
}

impl<'a> Range<'a> {
    pub(super) fn from_data(index: &'a PolicyIndex, data: &RangeData) -> Self {
        Self {
            low: Level::new(index, data.low.clone()),
            high: Level::new(index, data.high.clone()),
        }
    }

    pub fn low(&self) -> &Level<'a> {
        &self.low
    }

    pub fn high(&self) -> &Level<'a> {
        &self.high
    }

    /// True if `level` lies within the range.
    pub fn contains(&self, level: &Level<'_>) -> bool {
        self.high.dominates(level) && level.dominates(&self.low)
    }

    pub fn statement(&self) -> Result<String, PolicyError> {
        Err(PolicyError::NoStatement { what: format!("range {}", self) })
    }
}

impl fmt::Display for Range<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{} - {}", self.low, self.high)
        }
    }
}

impl fmt::Debug for Range<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Range").field(&self.to_string()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{LoadOptions, Policy};
    use assert_matches::assert_matches;

    const POLICY: &str = r#"
class file
class process
common file { read write }
class file inherits file { execute }
class process { transition fork }
sensitivity s0 alias unclassified;
sensitivity s1;
dominance { s0 s1 }
category c0;
category c1;
category c2;
category c3;
category c4;
category c5 alias five;
level s0:c0.c3,c5;
level s1:c0.c3,c5;
attribute domain;
attribute file_type;
type init_t alias { sysinit_t boot_t }, domain;
type shell_t, domain;
type etc_t, file_type;
typealias etc_t alias config_t;
permissive shell_t;
typebounds init_t shell_t;
role system_r types { domain etc_t };
role system_r types shell_t;
bool secure true;
user system_u roles { system_r object_r } level s0 range s0 - s1:c0.c3,c5;
"#;

    fn policy() -> Policy {
        Policy::parse(POLICY, &LoadOptions::default()).expect("parse policy")
    }

    #[test]
    fn class_permissions() {
        let policy = policy();
        let file = policy.lookup_class("file").expect("file");
        assert_eq!(file.perms(), ["execute"].into_iter().collect());
        assert_eq!(file.all_perms(), ["execute", "read", "write"].into_iter().collect());
        assert_eq!(file.statement(), "class file inherits file { execute }");
        let process = policy.lookup_class("process").expect("process");
        assert_eq!(process.common(), Err(PolicyError::NoCommon { class: "process".to_string() }));
        assert_eq!(process.statement(), "class process { fork transition }");
        assert_matches!(process.defaults(), Err(PolicyError::NoDefaults { .. }));
        let common = policy.lookup_common("file").expect("common");
        assert_eq!(common.statement(), "common file { read write }");
    }

    #[test]
    fn types_and_attributes() {
        let policy = policy();
        let init = policy.lookup_type("init_t").expect("init_t");
        assert!(!init.is_attribute());
        assert_eq!(init.aliases(), ["boot_t", "sysinit_t"].into_iter().collect());
        assert_eq!(init.statement(), "type init_t alias { boot_t sysinit_t }, domain;");
        assert_eq!(init.expand(), vec![init]);
        assert_eq!(policy.lookup_type("boot_t"), Ok(init));

        let shell = policy.lookup_type("shell_t").expect("shell_t");
        assert!(shell.is_permissive());
        assert_eq!(shell.bounds(), Some(init));

        let etc = policy.lookup_type("config_t").expect("alias");
        assert_eq!(etc.statement(), "type etc_t alias config_t, file_type;");

        let domain = policy.lookup_type_or_attr("domain").expect("domain");
        assert!(domain.is_attribute());
        let members: Vec<String> = domain.expand().iter().map(|t| t.to_string()).collect();
        assert_eq!(members, vec!["init_t", "shell_t"]);
        assert!(domain.attributes().is_empty());
        assert_eq!(domain.statement(), "attribute domain;");
    }

    #[test]
    fn roles_merge_and_expand_attributes() {
        let policy = policy();
        let role = policy.lookup_role("system_r").expect("system_r");
        let types: Vec<String> = role.types().iter().map(|t| t.to_string()).collect();
        assert_eq!(types, vec!["etc_t", "init_t", "shell_t"]);
        assert_eq!(role.statement(), "role system_r types { etc_t init_t shell_t };");
        assert_eq!(role.expand(), vec![role]);
        assert_eq!(policy.lookup_role("object_r").expect("object_r").statement(), "role object_r;");
    }

    #[test]
    fn users_and_levels() {
        let policy = policy();
        let user = policy.lookup_user("system_u").expect("system_u");
        assert_eq!(user.mls_level().map(|l| l.to_string()), Ok("s0".to_string()));
        assert_eq!(user.mls_range().map(|r| r.to_string()), Ok("s0 - s1:c0.c3,c5".to_string()));
        assert_eq!(
            user.statement(),
            "user system_u roles { object_r system_r } level s0 range s0 - s1:c0.c3,c5;"
        );
        let range = user.mls_range().expect("range");
        let s1_c0 = policy.lookup_level("s1:c0").expect("level");
        let s0 = policy.lookup_level("s0").expect("level");
        assert!(range.contains(&s1_c0));
        assert!(s1_c0.dominates(&s0));
        assert!(!s0.dominates(&s1_c0));
        assert_eq!(
            policy.lookup_level("s0:c0,c1,c2,c5").map(|l| l.to_string()),
            Ok("s0:c0.c2,c5".to_string())
        );
        assert_matches!(range.statement(), Err(PolicyError::NoStatement { .. }));
    }

    #[test]
    fn mls_declarations() {
        let policy = policy();
        let s0 = policy.lookup_sensitivity("unclassified").expect("alias");
        assert_eq!(s0.statement(), "sensitivity s0 alias unclassified;");
        assert_eq!(s0.level_decl().map(|l| l.statement()), Ok("level s0:c0.c3,c5;".to_string()));
        let c5 = policy.lookup_category("five").expect("alias");
        assert_eq!(c5.statement(), "category c5 alias five;");
        assert_eq!(policy.lookup_boolean("secure").expect("bool").statement(), "bool secure true;");
    }
}
