// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::{match_indirect_regex, match_object_class, resolve_all, Criterion};
use crate::policy::error::PolicyError;
use crate::policy::rules::{MlsRule, MlsRuleType};
use crate::policy::symbols::{ObjectClass, Range, Type};
use crate::policy::Policy;

use log::{debug, info};
use std::collections::BTreeSet;

/// Query of `range_transition` rules.
#[derive(Clone, Debug)]
pub struct MlsRuleQuery<'a> {
    policy: &'a Policy,
    ruletypes: Option<BTreeSet<MlsRuleType>>,
    source: Option<Criterion<Type<'a>>>,
    source_indirect: bool,
    target: Option<Criterion<Type<'a>>>,
    target_indirect: bool,
    tclass: Option<Criterion<BTreeSet<ObjectClass<'a>>>>,
    default: Option<Range<'a>>,
}

impl<'a> MlsRuleQuery<'a> {
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
        }
    }

    pub fn ruletypes<'n>(
        mut self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<Self, PolicyError> {
        self.ruletypes = Some(resolve_all(names, |name| self.policy.validate_mls_ruletype(name))?);
        Ok(self)
    }

    pub fn source(mut self, name: &str) -> Result<Self, PolicyError> {
        self.source = Some(Criterion::Exact(self.policy.lookup_type_or_attr(name)?));
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

    pub fn target(mut self, name: &str) -> Result<Self, PolicyError> {
        self.target = Some(Criterion::Exact(self.policy.lookup_type_or_attr(name)?));
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

    /// Matches rules whose new range is exactly `range`, e.g. `s0 - s1:c0.c3`.
    pub fn default(mut self, range: &str) -> Result<Self, PolicyError> {
        self.default = Some(self.policy.lookup_range(range)?);
        Ok(self)
    }

    pub fn results(&self) -> impl Iterator<Item = MlsRule<'a>> + '_ {
        info!("Generating MLS rule results");
        debug!("Ruletypes: {:?}", self.ruletypes);
        debug!("Source: {:?}, indirect: {}", self.source, self.source_indirect);
        debug!("Target: {:?}, indirect: {}", self.target, self.target_indirect);
        debug!("Class: {:?}", self.tclass);
        debug!("Default: {:?}", self.default);
        self.policy.mlsrules().filter(move |rule| self.matches(rule))
    }

    fn matches(&self, rule: &MlsRule<'a>) -> bool {
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
        if let Some(default) = &self.default {
            if rule.default() != *default {
                return false;
            }
        }
        true
    }
}
