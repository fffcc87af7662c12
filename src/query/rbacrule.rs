// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::{match_indirect_regex, match_object_class, resolve_all, Criterion};
use crate::policy::error::PolicyError;
use crate::policy::rules::{RbacRule, RbacRuleType, RbacTarget};
use crate::policy::symbols::{ObjectClass, Role};
use crate::policy::Policy;

use log::{debug, info};
use std::collections::BTreeSet;

/// Query of role `allow` and `role_transition` rules.
#[derive(Clone, Debug)]
pub struct RbacRuleQuery<'a> {
    policy: &'a Policy,
    ruletypes: Option<BTreeSet<RbacRuleType>>,
    source: Option<Criterion<Role<'a>>>,
    source_indirect: bool,
    target: Option<Criterion<RbacTarget<'a>>>,
    target_indirect: bool,
    tclass: Option<Criterion<BTreeSet<ObjectClass<'a>>>>,
    default: Option<Criterion<Role<'a>>>,
    default_indirect: bool,
}

impl<'a> RbacRuleQuery<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self {
            policy,
            ruletypes: None,
            source: None,
            source_indirect: true,
            target: None,
            target_indirect: true,
            tclass: None,
            default: None,
            default_indirect: true,
        }
    }

    pub fn ruletypes<'n>(
        mut self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<Self, PolicyError> {
        self.ruletypes =
            Some(resolve_all(names, |name| self.policy.validate_rbac_ruletype(name))?);
        Ok(self)
    }

    pub fn source(mut self, name: &str) -> Result<Self, PolicyError> {
        self.source = Some(Criterion::Exact(self.policy.lookup_role(name)?));
        Ok(self)
    }

    pub fn source_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.source = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    pub fn source_indirect(mut self, indirect: bool) -> Self {
        self.source_indirect = indirect;
        self
    }

    /// Matches rules whose target is named `name`: a type or attribute for `role_transition`
    /// rules, or, when no type has that name, a role for `allow` rules.
    pub fn target(mut self, name: &str) -> Result<Self, PolicyError> {
        let target = match self.policy.lookup_type_or_attr(name) {
            Ok(type_) => RbacTarget::Type(type_),
            Err(PolicyError::InvalidType { .. }) => {
                RbacTarget::Role(self.policy.lookup_role(name)?)
            }
            Err(e) => return Err(e),
        };
        self.target = Some(Criterion::Exact(target));
        Ok(self)
    }

    pub fn target_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.target = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    pub fn target_indirect(mut self, indirect: bool) -> Self {
        self.target_indirect = indirect;
        self
    }

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

    pub fn default(mut self, name: &str) -> Result<Self, PolicyError> {
        self.default = Some(Criterion::Exact(self.policy.lookup_role(name)?));
        Ok(self)
    }

    pub fn default_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.default = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    pub fn default_indirect(mut self, indirect: bool) -> Self {
        self.default_indirect = indirect;
        self
    }

    pub fn results(&self) -> impl Iterator<Item = RbacRule<'a>> + '_ {
        info!("Generating RBAC rule results");
        debug!("Ruletypes: {:?}", self.ruletypes);
        debug!("Source: {:?}, indirect: {}", self.source, self.source_indirect);
        debug!("Target: {:?}, indirect: {}", self.target, self.target_indirect);
        debug!("Class: {:?}", self.tclass);
        debug!("Default: {:?}, indirect: {}", self.default, self.default_indirect);
        self.policy.rbacrules().filter(move |rule| self.matches(rule))
    }

    fn matches(&self, rule: &RbacRule<'a>) -> bool {
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
            match rule.tclass() {
                Ok(class) if match_object_class(&class, tclass) => {}
                _ => return false,
            }
        }
        if let Some(default) = &self.default {
            match rule.default() {
                Ok(role) if match_indirect_regex(&role, default, self.default_indirect) => {}
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
class process
class file
class process { transition }
class file { read }
attribute system;
type init_t, system;
type login_t, system;
type user_t;
role system_r types system;
role staff_r types user_t;
role sysadm_r;
allow system_r staff_r;
allow staff_r sysadm_r;
role_transition system_r init_t staff_r;
role_transition staff_r system:file sysadm_r;
role_transition staff_r user_t sysadm_r;
user system_u roles { system_r staff_r sysadm_r };
"#;

    fn policy() -> Policy {
        Policy::parse(POLICY, &LoadOptions::default()).expect("parse policy")
    }

    fn strings<'a>(rules: impl Iterator<Item = RbacRule<'a>>) -> Vec<String> {
        rules.map(|rule| rule.to_string()).collect()
    }

    #[test]
    fn no_criteria_returns_every_rule() {
        let policy = policy();
        assert_eq!(RbacRuleQuery::new(&policy).results().count(), policy.rbacrules().count());
    }

    #[test]
    fn invalid_criteria_fail_fast() {
        let policy = policy();
        assert_matches!(
            RbacRuleQuery::new(&policy).ruletypes(["type_transition"]),
            Err(PolicyError::InvalidRuleType { .. })
        );
        assert_matches!(
            RbacRuleQuery::new(&policy).source("nobody_r"),
            Err(PolicyError::InvalidRole { .. })
        );
        assert_matches!(
            RbacRuleQuery::new(&policy).target("nothing"),
            Err(PolicyError::InvalidRole { .. })
        );
    }

    #[test]
    fn target_through_attribute() {
        let policy = policy();
        let query = RbacRuleQuery::new(&policy).target("system").expect("target");
        assert_eq!(
            strings(query.results()),
            vec![
                "role_transition system_r init_t:process staff_r;",
                "role_transition staff_r system:file sysadm_r;",
            ]
        );
        let direct = query.target_indirect(false);
        assert_eq!(
            strings(direct.results()),
            vec!["role_transition staff_r system:file sysadm_r;"]
        );
    }

    #[test]
    fn target_role() {
        let policy = policy();
        let query = RbacRuleQuery::new(&policy).target("sysadm_r").expect("target");
        assert_eq!(strings(query.results()), vec!["allow staff_r sysadm_r;"]);
    }

    #[test]
    fn class_and_default_skip_role_allows() {
        let policy = policy();
        let query = RbacRuleQuery::new(&policy).tclass(["process"]).expect("tclass");
        assert_eq!(query.results().count(), 2);
        let query = RbacRuleQuery::new(&policy).default("sysadm_r").expect("default");
        assert_eq!(query.results().count(), 2);
        let query = RbacRuleQuery::new(&policy)
            .ruletypes(["allow"])
            .expect("ruletypes")
            .source_regex("^staff")
            .expect("regex");
        assert_eq!(strings(query.results()), vec!["allow staff_r sysadm_r;"]);
    }
}
