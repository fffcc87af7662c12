// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::{match_object_class, resolve_all, Criterion};
use crate::policy::error::PolicyError;
use crate::policy::rules::{DefaultRangeValue, DefaultRule, DefaultRuleType, DefaultValue};
use crate::policy::symbols::ObjectClass;
use crate::policy::Policy;

use log::{debug, info};
use std::collections::BTreeSet;

/// Query of `default_user`, `default_role`, `default_type` and `default_range` rules.
///
/// Setters validate their arguments against the policy when called, so a misspelled ruletype,
/// class or value fails at the setter rather than silently matching nothing.
#[derive(Clone, Debug)]
pub struct DefaultQuery<'a> {
    policy: &'a Policy,
    ruletypes: Option<BTreeSet<DefaultRuleType>>,
    tclass: Option<Criterion<BTreeSet<ObjectClass<'a>>>>,
    default: Option<DefaultValue>,
    default_range: Option<DefaultRangeValue>,
}

impl<'a> DefaultQuery<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self { policy, ruletypes: None, tclass: None, default: None, default_range: None }
    }

    pub fn ruletypes<'n>(
        mut self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<Self, PolicyError> {
        self.ruletypes =
            Some(resolve_all(names, |name| self.policy.validate_default_ruletype(name))?);
        Ok(self)
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

    /// Matches rules taking their value from `source` or `target`.
    pub fn default(mut self, value: &str) -> Result<Self, PolicyError> {
        self.default = Some(self.policy.validate_default_value(value)?);
        Ok(self)
    }

    /// Matches `default_range` rules taking the `low`, `high` or `low_high` part of the range.
    /// Other default rules never match.
    pub fn default_range(mut self, value: &str) -> Result<Self, PolicyError> {
        self.default_range = Some(self.policy.validate_default_range(value)?);
        Ok(self)
    }

    pub fn results(&self) -> impl Iterator<Item = DefaultRule<'a>> + '_ {
        info!("Generating default_* results");
        debug!("Ruletypes: {:?}", self.ruletypes);
        debug!("Class: {:?}", self.tclass);
        debug!("Default: {:?}", self.default);
        debug!("Range: {:?}", self.default_range);
        self.policy.defaults().filter(move |rule| self.matches(rule))
    }

    fn matches(&self, rule: &DefaultRule<'a>) -> bool {
        if let Some(ruletypes) = &self.ruletypes {
            if !ruletypes.contains(&rule.ruletype()) {
                return false;
            }
        }
        if let Some(tclass) = &self.tclass {
            if !match_object_class(&rule.tclass(), tclass) {
                return false;
            }
        }
        if let Some(default) = self.default {
            if rule.default() != default {
                return false;
            }
        }
        if let Some(range) = self.default_range {
            match rule.default_range() {
                Ok(value) if value == range => {}
                _ => return false,
            }
        }
        true
    }
}
