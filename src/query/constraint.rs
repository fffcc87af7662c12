// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::{match_in_set, match_object_class, match_permissions, resolve_all, Criterion, Expand};
use crate::policy::constraints::{Constraint, ConstraintRuleType};
use crate::policy::error::PolicyError;
use crate::policy::symbols::{ObjectClass, Role, Type, User};
use crate::policy::Policy;

use log::{debug, info};
use std::collections::BTreeSet;
use std::fmt;

/// Query of `constrain`, `mlsconstrain`, `validatetrans` and `mlsvalidatetrans` statements.
#[derive(Clone, Debug)]
pub struct ConstraintQuery<'a> {
    policy: &'a Policy,
    ruletypes: Option<BTreeSet<ConstraintRuleType>>,
    tclass: Option<Criterion<BTreeSet<ObjectClass<'a>>>>,
    perms: Option<Criterion<BTreeSet<String>>>,
    perms_equal: bool,
    role: Option<Criterion<Role<'a>>>,
    role_indirect: bool,
    type_: Option<Criterion<Type<'a>>>,
    type_indirect: bool,
    user: Option<Criterion<User<'a>>>,
}

/// Matches `criterion` against the operands of an expression, or, if `indirect`, against the
/// members of those operands.
fn match_operands<T: Expand + Ord + PartialEq + fmt::Display>(
    operands: BTreeSet<T>,
    criterion: &Criterion<T>,
    indirect: bool,
) -> bool {
    if indirect {
        match_in_set(operands.iter().flat_map(|operand| operand.expand()), criterion)
    } else {
        match_in_set(operands, criterion)
    }
}

impl<'a> ConstraintQuery<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self {
            policy,
            ruletypes: None,
            tclass: None,
            perms: None,
            perms_equal: false,
            role: None,
            role_indirect: true,
            type_: None,
            type_indirect: true,
            user: None,
        }
    }

    pub fn ruletypes<'n>(
        mut self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<Self, PolicyError> {
        self.ruletypes =
            Some(resolve_all(names, |name| self.policy.validate_constraint_ruletype(name))?);
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

    /// Matches constraints on any of `perms`, or on exactly `perms` if `equal`. Transition
    /// constraints have no permissions and never match. Fails if a permission is not defined by
    /// any class of the policy.
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

    /// Matches constraints whose expression names the role.
    pub fn role(mut self, name: &str) -> Result<Self, PolicyError> {
        self.role = Some(Criterion::Exact(self.policy.lookup_role(name)?));
        Ok(self)
    }

    pub fn role_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.role = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    pub fn role_indirect(mut self, indirect: bool) -> Self {
        self.role_indirect = indirect;
        self
    }

    /// Matches constraints whose expression names the type or attribute. With indirect
    /// matching, attributes named by the expression are replaced by their members.
    pub fn type_(mut self, name: &str) -> Result<Self, PolicyError> {
        self.type_ = Some(Criterion::Exact(self.policy.lookup_type_or_attr(name)?));
        Ok(self)
    }

    pub fn type_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.type_ = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    pub fn type_indirect(mut self, indirect: bool) -> Self {
        self.type_indirect = indirect;
        self
    }

    pub fn user(mut self, name: &str) -> Result<Self, PolicyError> {
        self.user = Some(Criterion::Exact(self.policy.lookup_user(name)?));
        Ok(self)
    }

    pub fn user_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.user = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    pub fn results(&self) -> impl Iterator<Item = Constraint<'a>> + '_ {
        info!("Generating constraint results");
        debug!("Ruletypes: {:?}", self.ruletypes);
        debug!("Class: {:?}", self.tclass);
        debug!("Perms: {:?}, eq: {}", self.perms, self.perms_equal);
        debug!("Role: {:?}, indirect: {}", self.role, self.role_indirect);
        debug!("Type: {:?}, indirect: {}", self.type_, self.type_indirect);
        debug!("User: {:?}", self.user);
        self.policy.constraints().filter(move |constraint| self.matches(constraint))
    }

    fn matches(&self, constraint: &Constraint<'a>) -> bool {
        if let Some(ruletypes) = &self.ruletypes {
            if !ruletypes.contains(&constraint.ruletype()) {
                return false;
            }
        }
        if let Some(tclass) = &self.tclass {
            if !match_object_class(&constraint.tclass(), tclass) {
                return false;
            }
        }
        if let Some(perms) = &self.perms {
            match constraint.perms() {
                Ok(constraint_perms)
                    if match_permissions(&constraint_perms, perms, self.perms_equal) => {}
                _ => return false,
            }
        }
        if let Some(role) = &self.role {
            if !match_operands(constraint.roles(), role, self.role_indirect) {
                return false;
            }
        }
        if let Some(type_) = &self.type_ {
            if !match_operands(constraint.types(), type_, self.type_indirect) {
                return false;
            }
        }
        if let Some(user) = &self.user {
            if !match_in_set(constraint.users(), user) {
                return false;
            }
        }
        true
    }
}
