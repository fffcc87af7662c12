// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::parsed_policy::{BooleanDecl, ParsedPolicy};

use std::collections::HashMap;

/// An index for facilitating fast lookup of symbols by name in a validated policy.
///
/// Type, sensitivity and category aliases index the symbol they alias.
#[derive(Debug)]
pub(super) struct PolicyIndex {
    commons: HashMap<String, usize>,
    classes: HashMap<String, usize>,
    initial_sids: HashMap<String, usize>,
    roles: HashMap<String, usize>,
    types: HashMap<String, usize>,
    users: HashMap<String, usize>,
    booleans: HashMap<String, usize>,
    sensitivities: HashMap<String, usize>,
    categories: HashMap<String, usize>,
    parsed_policy: ParsedPolicy,
}

fn names<'a, T: 'a>(
    decls: &'a [T],
    name: impl Fn(&'a T) -> &'a str,
) -> HashMap<String, usize> {
    decls.iter().enumerate().map(|(i, decl)| (name(decl).to_string(), i)).collect()
}

fn names_with_aliases<'a, T: 'a>(
    decls: &'a [T],
    name: impl Fn(&'a T) -> &'a str,
    aliases: impl Fn(&'a T) -> &'a [String],
) -> HashMap<String, usize> {
    let mut map = names(decls, &name);
    for (i, decl) in decls.iter().enumerate() {
        for alias in aliases(decl) {
            map.insert(alias.clone(), i);
        }
    }
    map
}

impl PolicyIndex {
    /// Constructs a [`PolicyIndex`] that indexes over the symbols of `parsed_policy`.
    pub fn new(parsed_policy: ParsedPolicy) -> Self {
        let p = &parsed_policy;
        Self {
            commons: names(&p.commons, |d| d.name.as_str()),
            classes: names(&p.classes, |d| d.name.as_str()),
            initial_sids: names(&p.initial_sids, |d| d.name.as_str()),
            roles: names(&p.roles, |d| d.name.as_str()),
            types: names_with_aliases(
                &p.types,
                |d| d.name.as_str(),
                |d| d.aliases.as_slice(),
            ),
            users: names(&p.users, |d| d.name.as_str()),
            booleans: names(&p.booleans, |d| d.name.as_str()),
            sensitivities: names_with_aliases(
                &p.sensitivities,
                |d| d.name.as_str(),
                |d| d.aliases.as_slice(),
            ),
            categories: names_with_aliases(
                &p.categories,
                |d| d.name.as_str(),
                |d| d.aliases.as_slice(),
            ),
            parsed_policy,
        }
    }

    pub fn parsed_policy(&self) -> &ParsedPolicy {
        &self.parsed_policy
    }

    pub fn common_index(&self, name: &str) -> Option<usize> {
        self.commons.get(name).copied()
    }

    pub fn class_index(&self, name: &str) -> Option<usize> {
        self.classes.get(name).copied()
    }

    pub fn initial_sid_index(&self, name: &str) -> Option<usize> {
        self.initial_sids.get(name).copied()
    }

    pub fn role_index(&self, name: &str) -> Option<usize> {
        self.roles.get(name).copied()
    }

    /// Index of the type or attribute named, or aliased, `name`.
    pub fn type_index(&self, name: &str) -> Option<usize> {
        self.types.get(name).copied()
    }

    pub fn user_index(&self, name: &str) -> Option<usize> {
        self.users.get(name).copied()
    }

    pub fn boolean_index(&self, name: &str) -> Option<usize> {
        self.booleans.get(name).copied()
    }

    pub fn sensitivity_index(&self, name: &str) -> Option<usize> {
        self.sensitivities.get(name).copied()
    }

    pub fn category_index(&self, name: &str) -> Option<usize> {
        self.categories.get(name).copied()
    }

    pub fn boolean(&self, name: &str) -> Option<&BooleanDecl> {
        self.boolean_index(name).map(|i| &self.parsed_policy.booleans[i])
    }
}
