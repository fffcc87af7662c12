// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::{
    match_indirect_regex, match_object_class, match_permissions, match_regex, match_regex_or_set,
    resolve_all, Criterion,
};
use crate::policy::error::PolicyError;
use crate::policy::rules::{TeRule, TeRuleType};
use crate::policy::symbols::{Boolean, ObjectClass, Type};
use crate::policy::Policy;

use log::{debug, info};
use std::collections::BTreeSet;

/// Query of type enforcement rules.
#[derive(Clone, Debug)]
pub struct TeRuleQuery<'a> {
    policy: &'a Policy,
    ruletypes: Option<BTreeSet<TeRuleType>>,
    source: Option<Criterion<Type<'a>>>,
    source_indirect: bool,
    target: Option<Criterion<Type<'a>>>,
    target_indirect: bool,
    tclass: Option<Criterion<BTreeSet<ObjectClass<'a>>>>,
    perms: Option<Criterion<BTreeSet<String>>>,
    perms_equal: bool,
    xperms: Option<BTreeSet<u16>>,
    xperms_equal: bool,
    default: Option<Criterion<Type<'a>>>,
    boolean: Option<Criterion<BTreeSet<Boolean<'a>>>>,
    boolean_equal: bool,
}

impl<'a> TeRuleQuery<'a> {
    /// A query matching every TE rule of `policy`.
    pub fn new(policy: &'a Policy) -> Self {
        Self {
            policy,
            ruletypes: None,
            source: None,
            source_indirect: true,
            target: None,
            target_indirect: true,
            tclass: None,
            perms: None,
            perms_equal: false,
            xperms: None,
            xperms_equal: false,
            default: None,
            boolean: None,
            boolean_equal: false,
        }
    }

    /// Restricts results to the named rule types.
    pub fn ruletypes<'n>(
        mut self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<Self, PolicyError> {
        self.ruletypes = Some(resolve_all(names, |name| self.policy.validate_te_ruletype(name))?);
        Ok(self)
    }

    /// Matches rules whose source is the named type or attribute.
    pub fn source(mut self, name: &str) -> Result<Self, PolicyError> {
        self.source = Some(Criterion::Exact(self.policy.lookup_type_or_attr(name)?));
        Ok(self)
    }

    pub fn source_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.source = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// Whether the source matches through attribute membership. On by default.
    pub fn source_indirect(mut self, indirect: bool) -> Self {
        self.source_indirect = indirect;
        self
    }

    /// Matches rules whose target is the named type or attribute.
    pub fn target(mut self, name: &str) -> Result<Self, PolicyError> {
        self.target = Some(Criterion::Exact(self.policy.lookup_type_or_attr(name)?));
        Ok(self)
    }

    pub fn target_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.target = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// Whether the target matches through attribute membership. On by default.
    pub fn target_indirect(mut self, indirect: bool) -> Self {
        self.target_indirect = indirect;
        self
    }

    /// Matches rules on any of the named classes.
    pub fn tclass<'n>(
        mut self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<Self, PolicyError> {
        let classes = resolve_all(names, |name| self.policy.lookup_class(name))?;
        self.tclass = Some(Criterion::Exact(classes));
        Ok(self)
    }

    pub fn tclass_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.tclass = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// Matches access vector rules granting any of `perms`, or exactly `perms` if `equal`.
    /// Rules without permissions never match. Each permission must be defined by some class.
    pub fn perms<'n>(
        mut self,
        perms: impl IntoIterator<Item = &'n str>,
        equal: bool,
    ) -> Result<Self, PolicyError> {
        self.perms = Some(Criterion::Exact(self.policy.validate_perms(perms)?));
        self.perms_equal = equal;
        Ok(self)
    }

    pub fn perms_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.perms = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// Matches extended permission rules covering any of the inclusive `ranges`, or exactly
    /// their values if `equal`.
    pub fn xperms(mut self, ranges: impl IntoIterator<Item = (u16, u16)>, equal: bool) -> Self {
        self.xperms = Some(ranges.into_iter().flat_map(|(low, high)| low..=high).collect());
        self.xperms_equal = equal;
        self
    }

    /// Matches type rules whose default is the named type.
    pub fn default(mut self, name: &str) -> Result<Self, PolicyError> {
        self.default = Some(Criterion::Exact(self.policy.lookup_type(name)?));
        Ok(self)
    }

    pub fn default_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.default = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// Matches conditional rules whose expression uses any of the named Booleans, or exactly
    /// those Booleans if `equal`.
    pub fn booleans<'n>(
        mut self,
        names: impl IntoIterator<Item = &'n str>,
        equal: bool,
    ) -> Result<Self, PolicyError> {
        let booleans = resolve_all(names, |name| self.policy.lookup_boolean(name))?;
        self.boolean = Some(Criterion::Exact(booleans));
        self.boolean_equal = equal;
        Ok(self)
    }

    pub fn boolean_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.boolean = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// The matching rules, in policy order.
    pub fn results(&self) -> impl Iterator<Item = TeRule<'a>> + '_ {
        info!("Generating TE rule results");
        debug!("Ruletypes: {:?}", self.ruletypes);
        debug!("Source: {:?}, indirect: {}", self.source, self.source_indirect);
        debug!("Target: {:?}, indirect: {}", self.target, self.target_indirect);
        debug!("Class: {:?}", self.tclass);
        debug!("Perms: {:?}, eq: {}", self.perms, self.perms_equal);
        debug!("Xperms: {:?}, eq: {}", self.xperms, self.xperms_equal);
        debug!("Default: {:?}", self.default);
        debug!("Boolean: {:?}, eq: {}", self.boolean, self.boolean_equal);
        self.policy.terules().filter(move |rule| self.matches(rule))
    }

    fn matches(&self, rule: &TeRule<'a>) -> bool {
        if let Some(ruletypes) = &self.ruletypes {
            if !ruletypes.contains(&rule.ruletype()) {
                return false;
            }
        }
        if let Some(source) = &self.source {
            if !match_indirect_regex(&rule.source(), source, self.source_indirect) {
                return false;
            }
        }
        if let Some(target) = &self.target {
            if !match_indirect_regex(&rule.target(), target, self.target_indirect) {
                return false;
            }
        }
        if let Some(tclass) = &self.tclass {
            if !match_object_class(&rule.tclass(), tclass) {
                return false;
            }
        }
        if let Some(perms) = &self.perms {
            match rule.perms() {
                Ok(rule_perms) if match_permissions(&rule_perms, perms, self.perms_equal) => {}
                _ => return false,
            }
        }
        if let Some(xperms) = &self.xperms {
            match rule.xperms() {
                Ok(rule_xperms) if self.xperms_equal && rule_xperms == xperms => {}
                Ok(rule_xperms) if !self.xperms_equal && !rule_xperms.is_disjoint(xperms) => {}
                _ => return false,
            }
        }
        if let Some(default) = &self.default {
            match rule.default() {
                Ok(rule_default) if match_regex(&rule_default, default) => {}
                _ => return false,
            }
        }
        if let Some(boolean) = &self.boolean {
            match rule.conditional() {
                Ok(expr) if match_regex_or_set(&expr.booleans(), boolean, self.boolean_equal) => {}
                _ => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::LoadOptions;
    use assert_matches::assert_matches;

    const POLICY: &str = r#"
class file
class dir
class chr_file
common file { read write getattr ioctl }
class file inherits file { execute }
class dir inherits file { search }
class chr_file inherits file
attribute domain;
attribute file_type;
type init_t, domain;
type shell_t, domain;
type etc_t, file_type;
type tmp_t, file_type;
type tty_t;
bool secure_mode false;
bool allow_exec true;
role system_r types domain;
allow domain etc_t:file { read getattr };
allow init_t tmp_t:{ file dir } { read write };
auditallow shell_t file_type:file write;
dontaudit shell_t tmp_t:dir search;
type_transition init_t tmp_t:file etc_t;
allowxperm init_t tty_t:chr_file ioctl { 0x8900-0x8902 };
if (allow_exec && ! secure_mode) {
    allow shell_t etc_t:file execute;
}
if (secure_mode) {
    allow init_t etc_t:file execute;
}
user system_u roles system_r;
"#;

    fn policy() -> Policy {
        Policy::parse(POLICY, &LoadOptions::default()).expect("parse policy")
    }

    fn strings<'a>(rules: impl Iterator<Item = TeRule<'a>>) -> Vec<String> {
        rules.map(|rule| rule.to_string()).collect()
    }

    #[test]
    fn no_criteria_returns_every_rule() {
        let policy = policy();
        let query = TeRuleQuery::new(&policy);
        assert_eq!(query.results().count(), policy.terules().count());
    }

    #[test]
    fn invalid_criteria_fail_fast() {
        let policy = policy();
        assert_matches!(
            TeRuleQuery::new(&policy).ruletypes(["allow", "alow"]),
            Err(PolicyError::InvalidRuleType { .. })
        );
        assert_matches!(
            TeRuleQuery::new(&policy).source("nobody_t"),
            Err(PolicyError::InvalidType { .. })
        );
        assert_matches!(
            TeRuleQuery::new(&policy).tclass(["socket"]),
            Err(PolicyError::InvalidClass { .. })
        );
        assert_matches!(
            TeRuleQuery::new(&policy).booleans(["nope"], false),
            Err(PolicyError::InvalidBoolean { .. })
        );
        assert_matches!(
            TeRuleQuery::new(&policy).default("domain"),
            Err(PolicyError::InvalidType { .. })
        );
        assert_matches!(
            TeRuleQuery::new(&policy).source_regex("["),
            Err(PolicyError::InvalidRegex { .. })
        );
    }

    #[test]
    fn source_direct_and_indirect() {
        let policy = policy();
        let query = TeRuleQuery::new(&policy).source("init_t").expect("source");
        assert_eq!(
            strings(query.results()),
            vec![
                "allow domain etc_t:file { getattr read };",
                "allow init_t tmp_t:file { read write };",
                "allow init_t tmp_t:dir { read write };",
                "type_transition init_t tmp_t:file etc_t;",
                "allowxperm init_t tty_t:chr_file ioctl 0x8900-0x8902;",
                "allow init_t etc_t:file execute; [ secure_mode ]:True",
            ]
        );
        let query = query.source_indirect(false);
        assert_eq!(query.results().count(), 5);
    }

    #[test]
    fn target_attribute() {
        let policy = policy();
        let query = TeRuleQuery::new(&policy)
            .target("file_type")
            .expect("target")
            .target_indirect(false);
        assert_eq!(strings(query.results()), vec!["auditallow shell_t file_type:file write;"]);
    }

    #[test]
    fn ruletype_and_class() {
        let policy = policy();
        let query = TeRuleQuery::new(&policy)
            .ruletypes(["allow", "dontaudit"])
            .expect("ruletypes")
            .tclass(["dir"])
            .expect("tclass");
        assert_eq!(
            strings(query.results()),
            vec!["allow init_t tmp_t:dir { read write };", "dontaudit shell_t tmp_t:dir search;"]
        );
        let query = TeRuleQuery::new(&policy).tclass_regex("^chr").expect("tclass");
        assert_eq!(query.results().count(), 1);
    }

    #[test]
    fn permissions() {
        let policy = policy();
        let any = TeRuleQuery::new(&policy).perms(["write"], false).expect("perms");
        assert_eq!(any.results().count(), 3);
        let exact = TeRuleQuery::new(&policy).perms(["write", "read"], true).expect("perms");
        assert_eq!(
            strings(exact.results()),
            vec!["allow init_t tmp_t:file { read write };", "allow init_t tmp_t:dir { read write };"]
        );
        let regex = TeRuleQuery::new(&policy).perms_regex("^exec").expect("regex");
        assert_eq!(regex.results().count(), 2);
    }

    #[test]
    fn undefined_permissions_are_rejected() {
        let policy = policy();
        assert_matches!(
            TeRuleQuery::new(&policy).perms(["read", "reed", "wrte"], false),
            Err(PolicyError::InvalidPermission { perms }) if perms == "\"reed\", \"wrte\""
        );
        // Inherited from a common.
        assert!(TeRuleQuery::new(&policy).perms(["ioctl"], true).is_ok());
    }

    #[test]
    fn extended_permissions() {
        let policy = policy();
        let query = TeRuleQuery::new(&policy).xperms([(0x8902, 0x8905)], false);
        assert_eq!(query.results().count(), 1);
        let query = TeRuleQuery::new(&policy).xperms([(0x8902, 0x8905)], true);
        assert_eq!(query.results().count(), 0);
    }

    #[test]
    fn defaults_skip_access_vector_rules() {
        let policy = policy();
        let query = TeRuleQuery::new(&policy).default("etc_t").expect("default");
        assert_eq!(strings(query.results()), vec!["type_transition init_t tmp_t:file etc_t;"]);
        let query = TeRuleQuery::new(&policy).default_regex("tmp").expect("default");
        assert_eq!(query.results().count(), 0);
    }

    #[test]
    fn booleans_skip_unconditional_rules() {
        let policy = policy();
        let query = TeRuleQuery::new(&policy).booleans(["secure_mode"], false).expect("booleans");
        assert_eq!(query.results().count(), 2);
        let query = TeRuleQuery::new(&policy).booleans(["secure_mode"], true).expect("booleans");
        assert_eq!(
            strings(query.results()),
            vec!["allow init_t etc_t:file execute; [ secure_mode ]:True"]
        );
        let query = TeRuleQuery::new(&policy).boolean_regex("^allow_").expect("regex");
        assert_eq!(query.results().count(), 1);
    }
}
