// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::{match_permissions, match_regex, Criterion};
use crate::policy::error::PolicyError;
use crate::policy::symbols::{Common, ObjectClass};
use crate::policy::Policy;

use log::{debug, info};
use std::collections::BTreeSet;

/// Query of object classes.
#[derive(Clone, Debug)]
pub struct ObjClassQuery<'a> {
    policy: &'a Policy,
    name: Option<Criterion<ObjectClass<'a>>>,
    common: Option<Criterion<Common<'a>>>,
    perms: Option<Criterion<BTreeSet<String>>>,
    perms_equal: bool,
    perms_indirect: bool,
}

impl<'a> ObjClassQuery<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self {
            policy,
            name: None,
            common: None,
            perms: None,
            perms_equal: false,
            perms_indirect: true,
        }
    }

    pub fn name(mut self, name: &str) -> Result<Self, PolicyError> {
        self.name = Some(Criterion::Exact(self.policy.lookup_class(name)?));
        Ok(self)
    }

    pub fn name_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.name = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// Matches classes inheriting `name`. Classes without a common never match.
    pub fn common(mut self, name: &str) -> Result<Self, PolicyError> {
        self.common = Some(Criterion::Exact(self.policy.lookup_common(name)?));
        Ok(self)
    }

    pub fn common_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.common = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// Matches classes with any of `perms`, or with exactly `perms` if `equal`.
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

    /// Whether permissions inherited from the common count towards the permission criterion.
    pub fn perms_indirect(mut self, indirect: bool) -> Self {
        self.perms_indirect = indirect;
        self
    }

    pub fn results(&self) -> impl Iterator<Item = ObjectClass<'a>> + '_ {
        info!("Generating object class results");
        debug!("Name: {:?}", self.name);
        debug!("Common: {:?}", self.common);
        debug!(
            "Perms: {:?}, eq: {}, indirect: {}",
            self.perms, self.perms_equal, self.perms_indirect
        );
        self.policy.classes().filter(move |class| self.matches(class))
    }

    fn matches(&self, class: &ObjectClass<'a>) -> bool {
        if let Some(name) = &self.name {
            if !match_regex(class, name) {
                return false;
            }
        }
        if let Some(common) = &self.common {
            match class.common() {
                Ok(inherited) if match_regex(&inherited, common) => {}
                _ => return false,
            }
        }
        if let Some(perms) = &self.perms {
            let candidates = if self.perms_indirect { class.all_perms() } else { class.perms() };
            if !match_permissions(&candidates, perms, self.perms_equal) {
                return false;
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
class process
common file { read write getattr }
class file inherits file
class dir inherits file { search }
class process { transition getattr }
type t;
role r types t;
user u roles r;
"#;

    fn policy() -> Policy {
        Policy::parse(POLICY, &LoadOptions::default()).expect("parse policy")
    }

    fn names<'a>(classes: impl Iterator<Item = ObjectClass<'a>>) -> Vec<&'a str> {
        classes.map(|class| class.name()).collect()
    }

    #[test]
    fn name_and_common() {
        let policy = policy();
        assert_matches!(
            ObjClassQuery::new(&policy).name("socket"),
            Err(PolicyError::InvalidClass { .. })
        );
        let query = ObjClassQuery::new(&policy).name_regex("^d").expect("regex");
        assert_eq!(names(query.results()), ["dir"]);
        let query = ObjClassQuery::new(&policy).common("file").expect("common");
        assert_eq!(names(query.results()), ["file", "dir"]);
        let query = ObjClassQuery::new(&policy).common_regex(".").expect("regex");
        assert_eq!(query.results().count(), 2);
    }

    #[test]
    fn inherited_perms() {
        let policy = policy();
        let query = ObjClassQuery::new(&policy).perms(["getattr"], false).expect("perms");
        assert_eq!(names(query.results()), ["file", "dir", "process"]);
        let query = query.perms_indirect(false);
        assert_eq!(names(query.results()), ["process"]);

        let query = ObjClassQuery::new(&policy)
            .perms(["read", "write", "getattr", "search"], true)
            .expect("perms");
        assert_eq!(names(query.results()), ["dir"]);
        let query = query.perms_indirect(false);
        assert_eq!(query.results().count(), 0);

        let query = ObjClassQuery::new(&policy).perms_regex("^trans").expect("regex");
        assert_eq!(names(query.results()), ["process"]);
    }
}
