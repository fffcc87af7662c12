// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::{match_regex, Criterion};
use crate::policy::error::PolicyError;
use crate::policy::symbols::Boolean;
use crate::policy::Policy;

use log::{debug, info};

/// Query of conditional policy Booleans.
#[derive(Clone, Debug)]
pub struct BoolQuery<'a> {
    policy: &'a Policy,
    name: Option<Criterion<Boolean<'a>>>,
    default: Option<bool>,
}

impl<'a> BoolQuery<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self { policy, name: None, default: None }
    }

    pub fn name(mut self, name: &str) -> Result<Self, PolicyError> {
        self.name = Some(Criterion::Exact(self.policy.lookup_boolean(name)?));
        Ok(self)
    }

    pub fn name_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.name = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// Matches Booleans whose default state is `state`.
    pub fn default(mut self, state: bool) -> Self {
        self.default = Some(state);
        self
    }

    pub fn results(&self) -> impl Iterator<Item = Boolean<'a>> + '_ {
        info!("Generating Boolean results");
        debug!("Name: {:?}", self.name);
        debug!("Default: {:?}", self.default);
        self.policy.booleans().filter(move |boolean| self.matches(boolean))
    }

    fn matches(&self, boolean: &Boolean<'a>) -> bool {
        if let Some(name) = &self.name {
            if !match_regex(boolean, name) {
                return false;
            }
        }
        self.default.map_or(true, |state| boolean.state() == state)
    }
}
