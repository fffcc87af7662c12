// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::{match_permissions, match_regex, Criterion};
use crate::policy::error::PolicyError;
use crate::policy::symbols::Common;
use crate::policy::Policy;

use log::{debug, info};
use std::collections::BTreeSet;

/// Query of common permission sets.
#[derive(Clone, Debug)]
pub struct CommonQuery<'a> {
    policy: &'a Policy,
    name: Option<Criterion<Common<'a>>>,
    perms: Option<Criterion<BTreeSet<String>>>,
    perms_equal: bool,
}

impl<'a> CommonQuery<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self { policy, name: None, perms: None, perms_equal: false }
    }

    pub fn name(mut self, name: &str) -> Result<Self, PolicyError> {
        self.name = Some(Criterion::Exact(self.policy.lookup_common(name)?));
        Ok(self)
    }

    pub fn name_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.name = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// Matches commons with any of `perms`, or with exactly `perms` if `equal`.
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

    pub fn results(&self) -> impl Iterator<Item = Common<'a>> + '_ {
        info!("Generating common results");
        debug!("Name: {:?}", self.name);
        debug!("Perms: {:?}, eq: {}", self.perms, self.perms_equal);
        self.policy.commons().filter(move |common| self.matches(common))
    }

    fn matches(&self, common: &Common<'a>) -> bool {
        if let Some(name) = &self.name {
            if !match_regex(common, name) {
                return false;
            }
        }
        if let Some(perms) = &self.perms {
            if !match_permissions(&common.perms(), perms, self.perms_equal) {
                return false;
            }
        }
        true
    }
}
