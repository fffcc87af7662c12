// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::{match_in_set, match_regex, match_regex_or_set, resolve_all, Criterion};
use crate::policy::error::PolicyError;
use crate::policy::symbols::Type;
use crate::policy::Policy;

use log::{debug, info};
use std::collections::BTreeSet;

/// Query of concrete types. Attributes are never returned.
#[derive(Clone, Debug)]
pub struct TypeQuery<'a> {
    policy: &'a Policy,
    name: Option<Criterion<Type<'a>>>,
    alias: Option<Criterion<String>>,
    attrs: Option<Criterion<BTreeSet<Type<'a>>>>,
    attrs_equal: bool,
    permissive: Option<bool>,
}

impl<'a> TypeQuery<'a> {
    pub fn new(policy: &'a Policy) -> Self {
        Self { policy, name: None, alias: None, attrs: None, attrs_equal: false, permissive: None }
    }

    /// Matches the type named `name`, which may be one of its aliases.
    pub fn name(mut self, name: &str) -> Result<Self, PolicyError> {
        self.name = Some(Criterion::Exact(self.policy.lookup_type(name)?));
        Ok(self)
    }

    pub fn name_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.name = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// Matches the type that declares `alias`.
    pub fn alias(mut self, alias: &str) -> Result<Self, PolicyError> {
        let type_ = self.policy.lookup_type(alias)?;
        if !type_.aliases().contains(alias) {
            return Err(PolicyError::InvalidType { name: alias.to_string() });
        }
        self.alias = Some(Criterion::Exact(alias.to_string()));
        Ok(self)
    }

    pub fn alias_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.alias = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    /// Matches types with any of the attributes `names`, or with exactly those attributes if
    /// `equal`.
    pub fn attrs<'n>(
        mut self,
        names: impl IntoIterator<Item = &'n str>,
        equal: bool,
    ) -> Result<Self, PolicyError> {
        let attrs = resolve_all(names, |name| {
            self.policy
                .lookup_type_or_attr(name)
                .ok()
                .filter(Type::is_attribute)
                .ok_or_else(|| PolicyError::InvalidType { name: name.to_string() })
        })?;
        self.attrs = Some(Criterion::Exact(attrs));
        self.attrs_equal = equal;
        Ok(self)
    }

    pub fn attrs_regex(mut self, pattern: &str) -> Result<Self, PolicyError> {
        self.attrs = Some(Criterion::regex(pattern)?);
        Ok(self)
    }

    pub fn permissive(mut self, permissive: bool) -> Self {
        self.permissive = Some(permissive);
        self
    }

    pub fn results(&self) -> impl Iterator<Item = Type<'a>> + '_ {
        info!("Generating type results");
        debug!("Name: {:?}", self.name);
        debug!("Alias: {:?}", self.alias);
        debug!("Attrs: {:?}, eq: {}", self.attrs, self.attrs_equal);
        debug!("Permissive: {:?}", self.permissive);
        self.policy.types().filter(move |type_| self.matches(type_))
    }

    fn matches(&self, type_: &Type<'a>) -> bool {
        if let Some(name) = &self.name {
            if !match_regex(type_, name) {
                return false;
            }
        }
        if let Some(alias) = &self.alias {
            if !match_in_set(type_.aliases().into_iter().map(str::to_string), alias) {
                return false;
            }
        }
        if let Some(attrs) = &self.attrs {
            if !match_regex_or_set(&type_.attributes(), attrs, self.attrs_equal) {
                return false;
            }
        }
        self.permissive.map_or(true, |permissive| type_.is_permissive() == permissive)
    }
}
