// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::{
    match_level, match_range, match_regex, match_regex_or_set, resolve_all, Criterion,
    LevelMatch, RangeMatch,
};
use crate::policy::error::PolicyError;
use crate::policy::symbols::{Level, Range, Role, User};
use crate::policy::Policy;

use log::{debug, info};
use std::collections::BTreeSet;

/// Query of users. The level and range criteria need an MLS policy, and users match them only
/// when they carry a level and range.
#[derive(Clone, Debug)]
pub struct UserQuery<'a> {
    policy: &'a Policy,
    name: Option<Criterion<User<'a>>>,
    roles: Option<Criterion<BTreeSet<Role<'a>>>>,
    roles_equal: bool,
    level: Option<(Level<'a>, LevelMatch)>,
    range: Option<(Range<'a>, RangeMatch)>,
}

impl<'a> UserQuery<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self { policy, name: None, roles: None, roles_equal: false, level: None, range: None }
    }

    pub fn name(mut self, name: &str) -> Result<Self, PolicyError> {
        self.name = Some(Criterion::Exact(self.policy.lookup_user(name)?));
        Ok(self)
    }

    pub fn name_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.name = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// Matches users authorized for any of `roles`, or for exactly `roles` if `equal`.
    pub fn roles<'n>(
        mut self,
        names: impl IntoIterator<Item = &'n str>,
        equal: bool,
    ) -> Result<Self, PolicyError> {
        let roles = resolve_all(names, |name| self.policy.lookup_role(name))?;
        self.roles = Some(Criterion::Exact(roles));
        self.roles_equal = equal;
        Ok(self)
    }

    pub fn roles_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.roles = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// Matches users whose default level relates to `level` as `how` says.
    pub fn level(mut self, level: &str, how: LevelMatch) -> Result<Self, PolicyError> {
        self.level = Some((self.policy.lookup_level(level)?, how));
        Ok(self)
    }

    /// Matches users whose authorized range relates to `range` as `how` says.
    pub fn range(mut self, range: &str, how: RangeMatch) -> Result<Self, PolicyError> {
        self.range = Some((self.policy.lookup_range(range)?, how));
        Ok(self)
    }

    pub fn results(&self) -> impl Iterator<Item = User<'a>> + '_ {
        info!("Generating user results");
        debug!("Name: {:?}", self.name);
        debug!("Roles: {:?}, eq: {}", self.roles, self.roles_equal);
        debug!("Level: {:?}", self.level);
        debug!("Range: {:?}", self.range);
        self.policy.users().filter(move |user| self.matches(user))
    }

    fn matches(&self, user: &User<'a>) -> bool {
        if let Some(name) = &self.name {
            if !match_regex(user, name) {
                return false;
            }
        }
        if let Some(roles) = &self.roles {
            if !match_regex_or_set(&user.roles(), roles, self.roles_equal) {
                return false;
            }
        }
        if let Some((level, how)) = &self.level {
            match user.mls_level() {
                Ok(user_level) if match_level(&user_level, level, *how) => {}
                _ => return false,
            }
        }
        if let Some((range, how)) = &self.range {
            match user.mls_range() {
                Ok(user_range) if match_range(&user_range, range, *how) => {}
                _ => return false,
            }
        }
        true
    }
}
