// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::{match_regex, match_regex_or_set, resolve_all, Criterion};
use crate::policy::error::PolicyError;
use crate::policy::symbols::{Role, Type};
use crate::policy::Policy;

use log::{debug, info};
use std::collections::BTreeSet;

/// Query of roles.
#[derive(Clone, Debug)]
pub struct RoleQuery<'a> {
    policy: &'a Policy,
    name: Option<Criterion<Role<'a>>>,
    types: Option<Criterion<BTreeSet<Type<'a>>>>,
    types_equal: bool,
}

impl<'a> RoleQuery<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self { policy, name: None, types: None, types_equal: false }
    }

    pub fn name(mut self, name: &str) -> Result<Self, PolicyError> {
        self.name = Some(Criterion::Exact(self.policy.lookup_role(name)?));
        Ok(self)
    }

    pub fn name_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.name = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// Matches roles authorized for any of `types`, or for exactly `types` if `equal`.
    /// Attributes are not accepted: a role's type set holds concrete types only.
    pub fn types<'n>(
        mut self,
        names: impl IntoIterator<Item = &'n str>,
        equal: bool,
    ) -> Result<Self, PolicyError> {
        let types = resolve_all(names, |name| self.policy.lookup_type(name))?;
        self.types = Some(Criterion::Exact(types));
        self.types_equal = equal;
        Ok(self)
    }

    pub fn types_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.types = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    pub fn results(&self) -> impl Iterator<Item = Role<'a>> + '_ {
        info!("Generating role results");
        debug!("Name: {:?}", self.name);
        debug!("Types: {:?}, eq: {}", self.types, self.types_equal);
        self.policy.roles().filter(move |role| self.matches(role))
    }

    fn matches(&self, role: &Role<'a>) -> bool {
        if let Some(name) = &self.name {
            if !match_regex(role, name) {
                return false;
            }
        }
        if let Some(types) = &self.types {
            if !match_regex_or_set(&role.types(), types, self.types_equal) {
                return false;
            }
        }
        true
    }
}
