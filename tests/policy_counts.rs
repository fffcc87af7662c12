// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use selinux_analysis::policy::Policy;
use selinux_analysis::query::{
    BoolQuery, CommonQuery, ConstraintQuery, DefaultQuery, MlsRuleQuery, ObjClassQuery,
    RbacRuleQuery, RoleQuery, TeRuleQuery, TypeQuery, UserQuery,
};

use std::path::PathBuf;

fn testdata(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
}

fn counter_policy() -> Policy {
    Policy::open(testdata("policies/selinuxpolicy.conf")).expect("load counter policy")
}

#[test]
fn symbol_and_rule_counts() {
    let policy = counter_policy();
    assert!(policy.mls());
    assert_eq!(policy.allow_count(), 113);
    assert_eq!(policy.auditallow_count(), 109);
    assert_eq!(policy.boolean_count(), 127);
    assert_eq!(policy.class_count(), 7);
    assert_eq!(policy.common_count(), 3);
    assert_eq!(policy.role_count(), 131);
    assert_eq!(policy.type_count(), 137);
    assert_eq!(policy.user_count(), 101);
    assert_eq!(policy.constraint_count(), 19);
    assert_eq!(policy.mlsconstraint_count(), 23);
    assert_eq!(policy.validatetrans_count(), 5);
    assert_eq!(policy.mlsvalidatetrans_count(), 3);
}

#[test]
fn supplementary_counts() {
    let policy = counter_policy();
    assert_eq!(policy.type_attribute_count(), 1);
    assert_eq!(policy.type_transition_count(), 1);
    assert_eq!(policy.dontaudit_count(), 0);
    assert_eq!(policy.sensitivity_count(), 2);
    assert_eq!(policy.category_count(), 2);
    assert_eq!(policy.level_count(), 2);
    assert_eq!(policy.default_count(), 2);
    assert_eq!(policy.initialsids_count(), 2);
    assert_eq!(policy.polcap_count(), 1);
    assert_eq!(policy.fs_use_count(), 1);
    assert_eq!(policy.genfscon_count(), 1);
    assert_eq!(policy.portcon_count(), 1);
    assert_eq!(policy.netifcon_count(), 1);
    assert_eq!(policy.nodecon_count(), 1);
    // Seven permissions on commons, five declared by classes themselves.
    assert_eq!(policy.permission_count(), 12);
}

#[test]
fn enumerations_agree_with_counts() {
    let policy = counter_policy();
    assert_eq!(policy.commons().count(), policy.common_count());
    assert_eq!(policy.classes().count(), policy.class_count());
    assert_eq!(policy.roles().count(), policy.role_count());
    assert_eq!(policy.types().count(), policy.type_count());
    assert_eq!(policy.typeattributes().count(), policy.type_attribute_count());
    assert_eq!(policy.users().count(), policy.user_count());
    assert_eq!(policy.booleans().count(), policy.boolean_count());
    assert_eq!(policy.levels().count(), policy.level_count());
    assert_eq!(policy.initial_sids().count(), policy.initialsids_count());
    assert_eq!(policy.portcons().count(), policy.portcon_count());
}

#[test]
fn class_permissions_include_common() {
    let policy = counter_policy();
    for class in policy.classes() {
        let all = class.all_perms();
        assert!(class.perms().is_subset(&all));
        match class.common() {
            Ok(common) => {
                let mut expected = class.perms();
                expected.extend(common.perms());
                assert_eq!(all, expected, "class {}", class);
            }
            Err(_) => assert_eq!(all, class.perms(), "class {}", class),
        }
    }
}

#[test]
fn unfiltered_queries_return_every_rule() {
    let policy = counter_policy();
    assert_eq!(TeRuleQuery::new(&policy).results().count(), policy.terules().count());
    assert_eq!(RbacRuleQuery::new(&policy).results().count(), policy.rbacrules().count());
    assert_eq!(MlsRuleQuery::new(&policy).results().count(), policy.mlsrules().count());
    assert_eq!(ConstraintQuery::new(&policy).results().count(), 19 + 23 + 5 + 3);
    assert_eq!(DefaultQuery::new(&policy).results().count(), policy.default_count());
}

#[test]
fn unfiltered_symbol_queries_return_every_symbol() {
    let policy = counter_policy();
    assert_eq!(TypeQuery::new(&policy).results().count(), policy.type_count());
    assert_eq!(RoleQuery::new(&policy).results().count(), policy.role_count());
    assert_eq!(UserQuery::new(&policy).results().count(), policy.user_count());
    assert_eq!(BoolQuery::new(&policy).results().count(), policy.boolean_count());
    assert_eq!(CommonQuery::new(&policy).results().count(), policy.common_count());
    assert_eq!(ObjClassQuery::new(&policy).results().count(), policy.class_count());
    let permissive = TypeQuery::new(&policy).permissive(true);
    assert_eq!(permissive.results().count(), policy.permissives_count());
}

#[test]
fn constraint_queries_on_counter_policy() {
    let policy = counter_policy();
    let query = ConstraintQuery::new(&policy)
        .ruletypes(["mlsconstrain", "mlsvalidatetrans"])
        .expect("ruletypes");
    assert_eq!(query.results().count(), 26);

    let query = ConstraintQuery::new(&policy)
        .type_("t2_t")
        .expect("type")
        .type_indirect(false);
    // t2_t is named by one constraint of each kind.
    assert_eq!(query.results().count(), 4);

    let first = ConstraintQuery::new(&policy)
        .ruletypes(["mlsvalidatetrans"])
        .expect("ruletypes")
        .results()
        .next()
        .map(|constraint| constraint.to_string());
    assert_eq!(first.as_deref(), Some("mlsvalidatetrans file (l1 domby h2 or ( t3 == t0_t ));"));
}

#[test]
fn te_queries_on_counter_policy() {
    let policy = counter_policy();
    let query = TeRuleQuery::new(&policy).source("t0_t").expect("source");
    assert_eq!(query.results().count(), 3);
    let query = TeRuleQuery::new(&policy).source("domain").expect("source");
    assert_eq!(query.results().count(), 21);
    let query = TeRuleQuery::new(&policy).source("domain").expect("source").source_indirect(false);
    assert_eq!(query.results().count(), 0);
}
