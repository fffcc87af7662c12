// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use selinux_analysis::diff::{PolicyDifference, SetDelta};
use selinux_analysis::policy::Policy;

use std::path::PathBuf;

fn load(name: &str) -> Policy {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name);
    Policy::open(&path).unwrap_or_else(|e| panic!("loading {}: {:?}", path.display(), e))
}

#[test]
fn permissive_toggle_is_the_only_type_change() {
    let left = load("micro_policies/permissive_left.conf");
    let right = load("micro_policies/permissive_right.conf");
    let diff = PolicyDifference::new(&left, &right);

    assert!(diff.added_types().is_empty());
    assert!(diff.removed_types().is_empty());
    let modified = diff.modified_types();
    assert_eq!(modified.len(), 1);
    let shell = &modified["shell_t"];
    assert!(!shell.attributes.is_changed());
    assert!(!shell.aliases.is_changed());
    assert_eq!(shell.aliases.matched.iter().map(String::as_str).collect::<Vec<_>>(), ["sh_t"]);
    assert!(shell.modified_permissive);
    assert!(!shell.permissive);

    let reverse = PolicyDifference::new(&right, &left);
    assert!(reverse.modified_types()["shell_t"].permissive);
    assert!(diff.modified_roles().is_empty());
    assert!(diff.modified_classes().is_empty());
}

#[test]
fn counter_policy_against_itself() {
    let policy = load("policies/selinuxpolicy.conf");
    let other = load("policies/selinuxpolicy.conf");
    let diff = PolicyDifference::new(&policy, &other);
    assert!(diff.added_commons().is_empty() && diff.removed_commons().is_empty());
    assert!(diff.modified_commons().is_empty());
    assert!(diff.added_classes().is_empty() && diff.removed_classes().is_empty());
    assert!(diff.modified_classes().is_empty());
    assert!(diff.added_roles().is_empty() && diff.removed_roles().is_empty());
    assert!(diff.modified_roles().is_empty());
    assert!(diff.added_types().is_empty() && diff.removed_types().is_empty());
    assert!(diff.modified_types().is_empty());
    assert!(diff.added_type_attributes().is_empty());
    assert!(diff.modified_type_attributes().is_empty());
    assert!(diff.added_users().is_empty() && diff.modified_users().is_empty());
    assert!(diff.added_booleans().is_empty() && diff.modified_booleans().is_empty());
    assert!(diff.added_allows().is_empty() && diff.removed_allows().is_empty());
    assert!(diff.modified_allows().is_empty());
    assert!(diff.added_type_transitions().is_empty());
    assert!(diff.modified_type_transitions().is_empty());
}

#[test]
fn micro_policy_against_counter_policy() {
    let small = load("micro_policies/permissive_left.conf");
    let large = load("policies/selinuxpolicy.conf");
    let forward = PolicyDifference::new(&small, &large);
    let backward = PolicyDifference::new(&large, &small);

    assert_eq!(forward.added_types(), backward.removed_types());
    assert_eq!(forward.removed_types(), backward.added_types());
    assert_eq!(forward.added_roles(), backward.removed_roles());
    assert_eq!(forward.added_classes(), backward.removed_classes());
    assert_eq!(forward.added_users(), backward.removed_users());
    assert_eq!(forward.added_booleans(), backward.removed_booleans());
    assert_eq!(forward.added_allows(), backward.removed_allows());
    assert_eq!(forward.removed_type_transitions(), backward.added_type_transitions());
    assert_eq!(forward.added_commons().len(), 3);
    assert_eq!(forward.added_types().len(), 137);
    assert_eq!(forward.removed_types().len(), 2);

    // Both policies declare the file and process classes.
    let classes = forward.classes();
    assert_eq!(classes.added.len(), 5);
    assert!(classes.removed.is_empty());
    let file = &classes.modified["file"];
    assert_eq!(
        file.perms,
        SetDelta {
            added: ["getattr", "write"].into_iter().map(String::from).collect(),
            removed: Default::default(),
            matched: ["read"].into_iter().map(String::from).collect(),
        }
    );
}
