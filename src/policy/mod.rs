// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

pub mod constraints;
pub mod error;
pub mod labeling;
pub mod metadata;
pub mod parser;
pub mod rules;
pub mod symbols;

mod index;
mod lexer;
mod parsed_policy;
mod statements;

use anyhow::Context as _;
use log::{debug, info};
use std::collections::BTreeSet;
use std::path::Path;

use constraints::{Constraint, ConstraintRuleType};
use error::{ParseError, PolicyError};
use index::PolicyIndex;
use labeling::{FsUse, Genfscon, Netifcon, Nodecon, Portcon};
use metadata::{HandleUnknown, PolicyFormat};
use parsed_policy::{LevelData, ParsedPolicy, RangeData, TeRuleBody};
use rules::{
    DefaultRangeValue, DefaultRule, DefaultRuleType, DefaultValue, MlsRule, MlsRuleType, RbacRule,
    RbacRuleType, TeRule, TeRuleType,
};
use symbols::{
    Boolean, Category, Common, InitialSid, Level, LevelDecl, ObjectClass, PolicyCapability,
    Range, Role, Sensitivity, Type, User,
};

pub use parsed_policy::{KNOWN_POLICY_CAPABILITIES, MAX_CLASS_PERMISSIONS, OBJECT_R};

/// The policy version assumed for source policies when none is configured.
pub const DEFAULT_POLICY_VERSION: u32 = 33;

/// Settings for loading a source policy, which does not record them itself.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoadOptions {
    pub handle_unknown: HandleUnknown,
    pub version: u32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { handle_unknown: HandleUnknown::Deny, version: DEFAULT_POLICY_VERSION }
    }
}

/// Parses the source policy `text`, returning a policy that must be validated before use.
pub fn parse_policy(text: &str, options: &LoadOptions) -> Result<Unvalidated, anyhow::Error> {
    let parsed_policy = ParsedPolicy::parse(text, options).context("parsing policy")?;
    Ok(Unvalidated(parsed_policy))
}

/// A parsed policy that has not yet been checked for internal consistency.
pub struct Unvalidated(ParsedPolicy);

impl Unvalidated {
    pub fn validate(self) -> Result<Policy, anyhow::Error> {
        Validate::validate(&self.0).context("validating parsed policy")?;
        let index = PolicyIndex::new(self.0);
        Ok(Policy(index))
    }
}

/// Validate a parsed data structure.
pub(super) trait Validate {
    /// The type of error that may be returned from `validate()`.
    type Error: Into<anyhow::Error>;

    /// Validates a `Self`, returning a `Self::Error` if `self` is internally inconsistent.
    fn validate(&self) -> Result<(), Self::Error>;
}

/// A loaded, validated and indexed policy.
///
/// The policy is immutable. Every symbol, rule and labeling statement obtained from it borrows
/// the policy and cannot outlive it.
#[derive(Debug)]
pub struct Policy(PolicyIndex);

impl Policy {
    /// Loads the policy file at `path` with default [`LoadOptions`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        Self::open_with_options(path, &LoadOptions::default())
    }

    /// Loads the policy file at `path`.
    ///
    /// Compiled policies are recognized by their header, which is reported in the returned
    /// error; only source policies can be loaded.
    pub fn open_with_options(
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading policy file {}", path.display()))?;
        match metadata::probe(&bytes)
            .with_context(|| format!("probing policy file {}", path.display()))?
        {
            PolicyFormat::Binary(header) => {
                debug!("{} is a compiled policy: {:?}", path.display(), header);
                return Err(ParseError::UnsupportedBinaryPolicy { version: header.version })
                    .with_context(|| format!("loading {}", path.display()));
            }
            PolicyFormat::Source => {}
        }
        let text = std::str::from_utf8(&bytes)
            .map_err(|_| ParseError::InvalidEncoding)
            .with_context(|| format!("loading {}", path.display()))?;
        let policy =
            Self::parse(text, options).with_context(|| format!("loading {}", path.display()))?;
        info!(
            "loaded policy {}: {} classes, {} types, {} TE rules, mls {}",
            path.display(),
            policy.class_count(),
            policy.type_count(),
            policy.parsed_policy().te_rules.len(),
            policy.mls()
        );
        Ok(policy)
    }

    /// Parses and validates the source policy `text`.
    pub fn parse(text: &str, options: &LoadOptions) -> Result<Self, anyhow::Error> {
        parse_policy(text, options)?.validate()
    }

    fn parsed_policy(&self) -> &ParsedPolicy {
        self.0.parsed_policy()
    }

    /// True if the policy declares MLS sensitivities.
    pub fn mls(&self) -> bool {
        self.parsed_policy().mls
    }

    pub fn version(&self) -> u32 {
        self.parsed_policy().version
    }

    pub fn handle_unknown(&self) -> HandleUnknown {
        self.parsed_policy().handle_unknown
    }

    // Counters.

    fn te_rule_count(&self, ruletype: TeRuleType) -> usize {
        self.parsed_policy().te_rules.iter().filter(|rule| rule.ruletype == ruletype).count()
    }

    fn constraint_count_of(&self, ruletype: ConstraintRuleType) -> usize {
        self.constraints().filter(|constraint| constraint.ruletype() == ruletype).count()
    }

    pub fn allow_count(&self) -> usize {
        self.te_rule_count(TeRuleType::Allow)
    }

    pub fn auditallow_count(&self) -> usize {
        self.te_rule_count(TeRuleType::AuditAllow)
    }

    pub fn dontaudit_count(&self) -> usize {
        self.te_rule_count(TeRuleType::DontAudit)
    }

    pub fn neverallow_count(&self) -> usize {
        self.te_rule_count(TeRuleType::NeverAllow)
    }

    pub fn allowxperm_count(&self) -> usize {
        self.te_rule_count(TeRuleType::AllowXperm)
    }

    pub fn auditallowxperm_count(&self) -> usize {
        self.te_rule_count(TeRuleType::AuditAllowXperm)
    }

    pub fn dontauditxperm_count(&self) -> usize {
        self.te_rule_count(TeRuleType::DontAuditXperm)
    }

    pub fn neverallowxperm_count(&self) -> usize {
        self.te_rule_count(TeRuleType::NeverAllowXperm)
    }

    pub fn type_transition_count(&self) -> usize {
        self.te_rule_count(TeRuleType::TypeTransition)
    }

    pub fn type_change_count(&self) -> usize {
        self.te_rule_count(TeRuleType::TypeChange)
    }

    pub fn type_member_count(&self) -> usize {
        self.te_rule_count(TeRuleType::TypeMember)
    }

    pub fn boolean_count(&self) -> usize {
        self.parsed_policy().booleans.len()
    }

    pub fn category_count(&self) -> usize {
        self.parsed_policy().categories.len()
    }

    pub fn sensitivity_count(&self) -> usize {
        self.parsed_policy().sensitivities.len()
    }

    pub fn class_count(&self) -> usize {
        self.parsed_policy().classes.len()
    }

    pub fn common_count(&self) -> usize {
        self.parsed_policy().commons.len()
    }

    /// Number of distinct conditional expressions.
    pub fn conditional_count(&self) -> usize {
        self.parsed_policy().conditionals.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraint_count_of(ConstraintRuleType::Constrain)
    }

    pub fn mlsconstraint_count(&self) -> usize {
        self.constraint_count_of(ConstraintRuleType::MlsConstrain)
    }

    pub fn validatetrans_count(&self) -> usize {
        self.constraint_count_of(ConstraintRuleType::ValidateTrans)
    }

    pub fn mlsvalidatetrans_count(&self) -> usize {
        self.constraint_count_of(ConstraintRuleType::MlsValidateTrans)
    }

    pub fn default_count(&self) -> usize {
        self.parsed_policy().defaults.len()
    }

    pub fn fs_use_count(&self) -> usize {
        self.parsed_policy().fs_uses.len()
    }

    pub fn genfscon_count(&self) -> usize {
        self.parsed_policy().genfscons.len()
    }

    pub fn initialsids_count(&self) -> usize {
        self.parsed_policy().initial_sids.len()
    }

    /// Number of `level` declarations.
    pub fn level_count(&self) -> usize {
        self.parsed_policy().levels.len()
    }

    pub fn netifcon_count(&self) -> usize {
        self.parsed_policy().netifcons.len()
    }

    pub fn nodecon_count(&self) -> usize {
        self.parsed_policy().nodecons.len()
    }

    pub fn portcon_count(&self) -> usize {
        self.parsed_policy().portcons.len()
    }

    /// Number of permissions declared by commons and classes. Inherited permissions are
    /// counted once, with their common.
    pub fn permission_count(&self) -> usize {
        let policy = self.parsed_policy();
        policy.commons.iter().map(|common| common.perms.len()).sum::<usize>()
            + policy.classes.iter().map(|class| class.perms.len()).sum::<usize>()
    }

    pub fn permissives_count(&self) -> usize {
        self.permissives().count()
    }

    pub fn polcap_count(&self) -> usize {
        self.parsed_policy().policy_capabilities.len()
    }

    pub fn range_transition_count(&self) -> usize {
        self.parsed_policy().mls_rules.len()
    }

    pub fn role_count(&self) -> usize {
        self.parsed_policy().roles.len()
    }

    pub fn role_allow_count(&self) -> usize {
        self.rbacrules().filter(|rule| rule.ruletype() == RbacRuleType::Allow).count()
    }

    pub fn role_transition_count(&self) -> usize {
        self.rbacrules().filter(|rule| rule.ruletype() == RbacRuleType::RoleTransition).count()
    }

    /// Number of concrete types. Attributes and aliases are not counted.
    pub fn type_count(&self) -> usize {
        self.types().count()
    }

    pub fn type_attribute_count(&self) -> usize {
        self.typeattributes().count()
    }

    pub fn user_count(&self) -> usize {
        self.parsed_policy().users.len()
    }

    // Enumerators.

    pub fn commons(&self) -> impl Iterator<Item = Common<'_>> + '_ {
        self.parsed_policy().commons.iter().map(|decl| Common::new(&self.0, decl))
    }

    pub fn classes(&self) -> impl Iterator<Item = ObjectClass<'_>> + '_ {
        self.parsed_policy().classes.iter().map(|decl| ObjectClass::new(&self.0, decl))
    }

    pub fn roles(&self) -> impl Iterator<Item = Role<'_>> + '_ {
        self.parsed_policy().roles.iter().map(|decl| Role::new(&self.0, decl))
    }

    /// Concrete types.
    pub fn types(&self) -> impl Iterator<Item = Type<'_>> + '_ {
        self.types_and_attributes().filter(|type_| !type_.is_attribute())
    }

    /// Type attributes.
    pub fn typeattributes(&self) -> impl Iterator<Item = Type<'_>> + '_ {
        self.types_and_attributes().filter(|type_| type_.is_attribute())
    }

    fn types_and_attributes(&self) -> impl Iterator<Item = Type<'_>> + '_ {
        self.parsed_policy().types.iter().map(|decl| Type::new(&self.0, decl))
    }

    pub fn users(&self) -> impl Iterator<Item = User<'_>> + '_ {
        self.parsed_policy().users.iter().map(|decl| User::new(&self.0, decl))
    }

    pub fn booleans(&self) -> impl Iterator<Item = Boolean<'_>> + '_ {
        self.parsed_policy().booleans.iter().map(|decl| Boolean::new(&self.0, decl))
    }

    pub fn sensitivities(&self) -> impl Iterator<Item = Sensitivity<'_>> + '_ {
        self.parsed_policy().sensitivities.iter().map(|decl| Sensitivity::new(&self.0, decl))
    }

    pub fn categories(&self) -> impl Iterator<Item = Category<'_>> + '_ {
        self.parsed_policy().categories.iter().map(|decl| Category::new(&self.0, decl))
    }

    /// The `level` declarations.
    pub fn levels(&self) -> impl Iterator<Item = LevelDecl<'_>> + '_ {
        self.parsed_policy().levels.iter().map(|data| LevelDecl::new(&self.0, data))
    }

    pub fn polcaps(&self) -> impl Iterator<Item = PolicyCapability<'_>> + '_ {
        self.parsed_policy()
            .policy_capabilities
            .iter()
            .map(|decl| PolicyCapability::new(&self.0, decl))
    }

    /// Types declared `permissive`.
    pub fn permissives(&self) -> impl Iterator<Item = Type<'_>> + '_ {
        self.types().filter(|type_| type_.is_permissive())
    }

    pub fn terules(&self) -> impl Iterator<Item = TeRule<'_>> + '_ {
        self.parsed_policy().te_rules.iter().map(|data| TeRule::new(&self.0, data))
    }

    pub fn rbacrules(&self) -> impl Iterator<Item = RbacRule<'_>> + '_ {
        self.parsed_policy().rbac_rules.iter().map(|data| RbacRule::new(&self.0, data))
    }

    pub fn mlsrules(&self) -> impl Iterator<Item = MlsRule<'_>> + '_ {
        self.parsed_policy().mls_rules.iter().map(|data| MlsRule::new(&self.0, data))
    }

    pub fn constraints(&self) -> impl Iterator<Item = Constraint<'_>> + '_ {
        self.parsed_policy().constraints.iter().map(|data| Constraint::new(&self.0, data))
    }

    pub fn defaults(&self) -> impl Iterator<Item = DefaultRule<'_>> + '_ {
        self.parsed_policy().defaults.iter().map(|data| DefaultRule::new(&self.0, data))
    }

    pub fn initial_sids(&self) -> impl Iterator<Item = InitialSid<'_>> + '_ {
        self.parsed_policy().initial_sids.iter().map(|decl| InitialSid::new(&self.0, decl))
    }

    pub fn fs_uses(&self) -> impl Iterator<Item = FsUse<'_>> + '_ {
        self.parsed_policy().fs_uses.iter().map(|data| FsUse::new(&self.0, data))
    }

    pub fn genfscons(&self) -> impl Iterator<Item = Genfscon<'_>> + '_ {
        self.parsed_policy().genfscons.iter().map(|data| Genfscon::new(&self.0, data))
    }

    pub fn portcons(&self) -> impl Iterator<Item = Portcon<'_>> + '_ {
        self.parsed_policy().portcons.iter().map(|data| Portcon::new(&self.0, data))
    }

    pub fn netifcons(&self) -> impl Iterator<Item = Netifcon<'_>> + '_ {
        self.parsed_policy().netifcons.iter().map(|data| Netifcon::new(&self.0, data))
    }

    pub fn nodecons(&self) -> impl Iterator<Item = Nodecon<'_>> + '_ {
        self.parsed_policy().nodecons.iter().map(|data| Nodecon::new(&self.0, data))
    }

    // Lookups.

    pub fn lookup_common(&self, name: &str) -> Result<Common<'_>, PolicyError> {
        self.0
            .common_index(name)
            .map(|i| Common::new(&self.0, &self.parsed_policy().commons[i]))
            .ok_or_else(|| PolicyError::InvalidCommon { name: name.to_string() })
    }

    pub fn lookup_class(&self, name: &str) -> Result<ObjectClass<'_>, PolicyError> {
        self.0
            .class_index(name)
            .map(|i| ObjectClass::new(&self.0, &self.parsed_policy().classes[i]))
            .ok_or_else(|| PolicyError::InvalidClass { name: name.to_string() })
    }

    pub fn lookup_role(&self, name: &str) -> Result<Role<'_>, PolicyError> {
        self.0
            .role_index(name)
            .map(|i| Role::new(&self.0, &self.parsed_policy().roles[i]))
            .ok_or_else(|| PolicyError::InvalidRole { name: name.to_string() })
    }

    /// Looks up a concrete type by name or alias. Attributes are not types.
    pub fn lookup_type(&self, name: &str) -> Result<Type<'_>, PolicyError> {
        self.lookup_type_or_attr(name)
            .ok()
            .filter(|type_| !type_.is_attribute())
            .ok_or_else(|| PolicyError::InvalidType { name: name.to_string() })
    }

    /// Looks up a type, by name or alias, or an attribute.
    pub fn lookup_type_or_attr(&self, name: &str) -> Result<Type<'_>, PolicyError> {
        self.0
            .type_index(name)
            .map(|i| Type::new(&self.0, &self.parsed_policy().types[i]))
            .ok_or_else(|| PolicyError::InvalidType { name: name.to_string() })
    }

    /// Same as [`Policy::lookup_type_or_attr`].
    pub fn lookup_type_or_typeattr(&self, name: &str) -> Result<Type<'_>, PolicyError> {
        self.lookup_type_or_attr(name)
    }

    pub fn lookup_boolean(&self, name: &str) -> Result<Boolean<'_>, PolicyError> {
        self.0
            .boolean(name)
            .map(|decl| Boolean::new(&self.0, decl))
            .ok_or_else(|| PolicyError::InvalidBoolean { name: name.to_string() })
    }

    pub fn lookup_user(&self, name: &str) -> Result<User<'_>, PolicyError> {
        self.0
            .user_index(name)
            .map(|i| User::new(&self.0, &self.parsed_policy().users[i]))
            .ok_or_else(|| PolicyError::InvalidUser { name: name.to_string() })
    }

    pub fn lookup_sensitivity(&self, name: &str) -> Result<Sensitivity<'_>, PolicyError> {
        if !self.mls() {
            return Err(PolicyError::MlsDisabled);
        }
        self.0
            .sensitivity_index(name)
            .map(|i| Sensitivity::new(&self.0, &self.parsed_policy().sensitivities[i]))
            .ok_or_else(|| PolicyError::InvalidSensitivity { name: name.to_string() })
    }

    pub fn lookup_category(&self, name: &str) -> Result<Category<'_>, PolicyError> {
        if !self.mls() {
            return Err(PolicyError::MlsDisabled);
        }
        self.0
            .category_index(name)
            .map(|i| Category::new(&self.0, &self.parsed_policy().categories[i]))
            .ok_or_else(|| PolicyError::InvalidCategory { name: name.to_string() })
    }

    pub fn lookup_initial_sid(&self, name: &str) -> Result<InitialSid<'_>, PolicyError> {
        self.0
            .initial_sid_index(name)
            .map(|i| InitialSid::new(&self.0, &self.parsed_policy().initial_sids[i]))
            .ok_or_else(|| PolicyError::InvalidInitialSid { name: name.to_string() })
    }

    /// Parses a level such as `s0:c0.c3,c5`. The categories must be allowed with the
    /// sensitivity by its `level` declaration.
    pub fn lookup_level(&self, name: &str) -> Result<Level<'_>, PolicyError> {
        if !self.mls() {
            return Err(PolicyError::MlsDisabled);
        }
        self.level_data(name)
            .map(|data| Level::new(&self.0, data))
            .map_err(|reason| PolicyError::InvalidLevel { name: name.to_string(), reason })
    }

    /// Parses a range such as `s0 - s1:c0.c3`. A single level is a range whose low and high
    /// levels are equal.
    pub fn lookup_range(&self, name: &str) -> Result<Range<'_>, PolicyError> {
        if !self.mls() {
            return Err(PolicyError::MlsDisabled);
        }
        let invalid = |reason: String| PolicyError::InvalidRange { name: name.to_string(), reason };
        let (low, high) = match name.split_once('-') {
            Some((low, high)) => (low.trim(), high.trim()),
            None => (name.trim(), name.trim()),
        };
        let low = self.level_data(low).map_err(invalid)?;
        let high = self.level_data(high).map_err(invalid)?;
        let range = Range::from_data(&self.0, &RangeData { low, high });
        if !range.high().dominates(range.low()) {
            return Err(invalid("high level does not dominate low level".to_string()));
        }
        Ok(range)
    }

    fn level_data(&self, text: &str) -> Result<LevelData, String> {
        let (sensitivity_name, categories_text) = match text.split_once(':') {
            Some((sensitivity, categories)) => (sensitivity.trim(), Some(categories.trim())),
            None => (text.trim(), None),
        };
        let sensitivity = self
            .0
            .sensitivity_index(sensitivity_name)
            .ok_or_else(|| format!("no sensitivity {:?}", sensitivity_name))?;
        let category = |name: &str| {
            self.0.category_index(name.trim()).ok_or_else(|| format!("no category {:?}", name))
        };

        let mut categories = std::collections::BTreeSet::new();
        for part in categories_text.into_iter().flat_map(|text| text.split(',')) {
            match part.split_once('.') {
                Some((low, high)) => {
                    let (low, high) = (category(low)?, category(high)?);
                    if low > high {
                        return Err(format!("category range {:?} is reversed", part));
                    }
                    categories.extend(low..=high);
                }
                None => {
                    categories.insert(category(part)?);
                }
            }
        }

        let policy = self.parsed_policy();
        let allowed = policy
            .levels
            .iter()
            .find(|level| level.sensitivity == sensitivity)
            .ok_or_else(|| format!("sensitivity {:?} has no level declaration", sensitivity_name))?;
        if let Some(category) = categories.iter().find(|c| !allowed.categories.contains(c)) {
            return Err(format!(
                "category {:?} is not allowed with sensitivity {:?}",
                policy.categories[*category].name, sensitivity_name
            ));
        }
        Ok(LevelData { sensitivity, categories: categories.into_iter().collect() })
    }

    // Rule type validators.

    pub fn validate_te_ruletype(&self, ruletype: &str) -> Result<TeRuleType, PolicyError> {
        ruletype.parse()
    }

    pub fn validate_rbac_ruletype(&self, ruletype: &str) -> Result<RbacRuleType, PolicyError> {
        ruletype.parse()
    }

    pub fn validate_mls_ruletype(&self, ruletype: &str) -> Result<MlsRuleType, PolicyError> {
        ruletype.parse()
    }

    pub fn validate_constraint_ruletype(
        &self,
        ruletype: &str,
    ) -> Result<ConstraintRuleType, PolicyError> {
        ruletype.parse()
    }

    pub fn validate_default_ruletype(
        &self,
        ruletype: &str,
    ) -> Result<DefaultRuleType, PolicyError> {
        ruletype.parse()
    }

    pub fn validate_default_value(&self, value: &str) -> Result<DefaultValue, PolicyError> {
        value.parse()
    }

    pub fn validate_default_range(&self, value: &str) -> Result<DefaultRangeValue, PolicyError> {
        value.parse()
    }

    /// Checks that each of `perms` is defined by at least one object class, directly or through
    /// its common. Unknown names are reported together.
    pub fn validate_perms<'n>(
        &self,
        perms: impl IntoIterator<Item = &'n str>,
    ) -> Result<BTreeSet<String>, PolicyError> {
        let perms: BTreeSet<String> = perms.into_iter().map(str::to_string).collect();
        let defined: BTreeSet<&str> = self.classes().flat_map(|class| class.all_perms()).collect();
        let invalid: Vec<String> = perms
            .iter()
            .filter(|perm| !defined.contains(perm.as_str()))
            .map(|perm| format!("{:?}", perm))
            .collect();
        if invalid.is_empty() {
            Ok(perms)
        } else {
            Err(PolicyError::InvalidPermission { perms: invalid.join(", ") })
        }
    }

    /// Total number of extended permissions granted by `allowxperm` rules.
    pub fn allowxperm_permission_count(&self) -> usize {
        self.parsed_policy()
            .te_rules
            .iter()
            .filter(|rule| rule.ruletype == TeRuleType::AllowXperm)
            .map(|rule| match &rule.body {
                TeRuleBody::Xperms { xperms, .. } => xperms.len(),
                _ => 0,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use test_case::test_case;

    const POLICY: &str = r#"
class file
class process
common file { read write }
class file inherits file { execute }
class process { transition }
sid kernel
sid kernel system_u:system_r:init_t
policycap open_perms;
attribute domain;
type init_t, domain;
type etc_t;
permissive init_t;
bool b true;
role system_r types domain;
allow system_r system_r;
allow domain etc_t:file read;
auditallow domain etc_t:file write;
if (b) { dontaudit init_t etc_t:file execute; }
type_transition init_t etc_t:process init_t;
user system_u roles system_r;
fs_use_xattr ext4 system_u:object_r:etc_t;
"#;

    fn policy() -> Policy {
        Policy::parse(POLICY, &LoadOptions::default()).expect("parse policy")
    }

    #[test]
    fn properties() {
        let policy = policy();
        assert!(!policy.mls());
        assert_eq!(policy.version(), DEFAULT_POLICY_VERSION);
        assert_eq!(policy.handle_unknown(), HandleUnknown::Deny);

        let options = LoadOptions { handle_unknown: HandleUnknown::Allow, version: 31 };
        let policy = Policy::parse(POLICY, &options).expect("parse policy");
        assert_eq!(policy.version(), 31);
        assert_eq!(policy.handle_unknown(), HandleUnknown::Allow);
    }

    #[test]
    fn counters_match_enumerations() {
        let policy = policy();
        assert_eq!(policy.class_count(), policy.classes().count());
        assert_eq!(policy.class_count(), 2);
        assert_eq!(policy.common_count(), 1);
        assert_eq!(policy.type_count(), 2);
        assert_eq!(policy.type_attribute_count(), 1);
        assert_eq!(policy.role_count(), 2);
        assert_eq!(policy.user_count(), 1);
        assert_eq!(policy.boolean_count(), 1);
        assert_eq!(policy.allow_count(), 1);
        assert_eq!(policy.auditallow_count(), 1);
        assert_eq!(policy.dontaudit_count(), 1);
        assert_eq!(policy.neverallow_count(), 0);
        assert_eq!(policy.type_transition_count(), 1);
        assert_eq!(policy.conditional_count(), 1);
        assert_eq!(policy.role_allow_count(), 1);
        assert_eq!(policy.permission_count(), 4);
        assert_eq!(policy.permissives_count(), 1);
        assert_eq!(policy.polcap_count(), 1);
        assert_eq!(policy.initialsids_count(), 1);
        assert_eq!(policy.fs_use_count(), 1);
        assert_eq!(policy.level_count(), 0);
    }

    #[test_case("nobody_t"; "undeclared")]
    #[test_case("domain"; "attribute")]
    fn lookup_type_rejects(name: &str) {
        assert_eq!(
            policy().lookup_type(name),
            Err(PolicyError::InvalidType { name: name.to_string() })
        );
    }

    #[test]
    fn lookups() {
        let policy = policy();
        assert!(policy.lookup_type_or_attr("domain").expect("attribute").is_attribute());
        assert_eq!(
            policy.lookup_type_or_typeattr("etc_t").map(|t| t.to_string()),
            Ok("etc_t".into())
        );
        assert_matches!(policy.lookup_class("dir"), Err(PolicyError::InvalidClass { .. }));
        assert_matches!(policy.lookup_common("socket"), Err(PolicyError::InvalidCommon { .. }));
        assert_matches!(policy.lookup_role("staff_r"), Err(PolicyError::InvalidRole { .. }));
        assert_matches!(policy.lookup_user("root"), Err(PolicyError::InvalidUser { .. }));
        assert_matches!(policy.lookup_boolean("c"), Err(PolicyError::InvalidBoolean { .. }));
        assert_matches!(
            policy.lookup_initial_sid("init"),
            Err(PolicyError::InvalidInitialSid { .. })
        );
        assert_eq!(policy.lookup_level("s0"), Err(PolicyError::MlsDisabled));
        assert_eq!(policy.lookup_range("s0"), Err(PolicyError::MlsDisabled));
        assert_eq!(policy.lookup_sensitivity("s0"), Err(PolicyError::MlsDisabled));
    }

    #[test]
    fn ruletype_validators() {
        let policy = policy();
        assert_eq!(policy.validate_te_ruletype("dontaudit"), Ok(TeRuleType::DontAudit));
        assert_matches!(
            policy.validate_rbac_ruletype("type_transition"),
            Err(PolicyError::InvalidRuleType { .. })
        );
        assert_eq!(
            policy.validate_mls_ruletype("range_transition"),
            Ok(MlsRuleType::RangeTransition)
        );
        assert_matches!(
            policy.validate_constraint_ruletype("neverallow"),
            Err(PolicyError::InvalidConstraintType { .. })
        );
        assert_eq!(policy.validate_default_value("target"), Ok(DefaultValue::Target));
        assert_eq!(policy.validate_default_range("low_high"), Ok(DefaultRangeValue::LowHigh));
        assert_matches!(
            policy.validate_default_ruletype("default_level"),
            Err(PolicyError::InvalidDefaultType { .. })
        );
    }

    #[test]
    fn mls_lookups() {
        let text = format!(
            "{}sensitivity s0;\nsensitivity s1;\ndominance {{ s0 s1 }}\ncategory c0;\ncategory c1;\nlevel s0:c0;\nlevel s1:c0.c1;\n",
            POLICY
                .replace("system_u:system_r:init_t", "system_u:system_r:init_t:s0")
                .replace("system_u:object_r:etc_t", "system_u:object_r:etc_t:s0")
                .replace("roles system_r;", "roles system_r level s0 range s0 - s1:c0.c1;")
        );
        let policy = Policy::parse(&text, &LoadOptions::default()).expect("parse policy");
        assert!(policy.mls());
        assert_eq!(policy.level_count(), 2);
        assert_eq!(
            policy.lookup_range("s0 - s1:c0.c1").map(|r| r.to_string()),
            Ok("s0 - s1:c0.c1".into())
        );
        assert_eq!(policy.lookup_range("s1").map(|r| r.to_string()), Ok("s1".into()));
        assert_matches!(policy.lookup_range("s1 - s0"), Err(PolicyError::InvalidRange { .. }));
        assert_matches!(policy.lookup_level("s0:c1"), Err(PolicyError::InvalidLevel { .. }));
        assert_matches!(policy.lookup_level("s2"), Err(PolicyError::InvalidLevel { .. }));
        assert_matches!(policy.lookup_category("c2"), Err(PolicyError::InvalidCategory { .. }));
        assert_eq!(policy.lookup_sensitivity("s1").map(|s| s.value()), Ok(1));
    }

    #[test]
    fn permissions_are_validated_across_classes() {
        let policy = policy();
        assert_eq!(
            policy.validate_perms(["transition", "read"]),
            Ok(["read", "transition"].into_iter().map(str::to_string).collect())
        );
        assert_eq!(
            policy.validate_perms(["fork", "read", "exec"]),
            Err(PolicyError::InvalidPermission { perms: "\"exec\", \"fork\"".to_string() })
        );
    }

    #[test]
    fn load_failures() {
        let err = Policy::parse("type t;\ntype t;\n", &LoadOptions::default()).unwrap_err();
        assert_matches!(
            err.downcast_ref::<ParseError>(),
            Some(ParseError::DuplicateDeclaration { line: 2, .. })
        );
        let err = Policy::open("/nonexistent/policy.conf").unwrap_err();
        assert!(err.downcast_ref::<std::io::Error>().is_some());
    }
}
