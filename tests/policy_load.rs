// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use assert_matches::assert_matches;
use selinux_analysis::policy::error::ParseError;
use selinux_analysis::policy::metadata::{probe, HandleUnknown, PolicyFormat};
use selinux_analysis::policy::{LoadOptions, Policy};

use std::path::PathBuf;

fn testdata(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
}

#[test]
fn compiled_policy_header_is_reported() {
    let path = testdata("micro_policies/compiled_policy_header.bin");
    let bytes = std::fs::read(&path).expect("read header");
    assert_matches!(
        probe(&bytes),
        Ok(PolicyFormat::Binary(header)) if header.version == 31 && header.mls
    );

    let error = Policy::open(&path).expect_err("compiled policies are not loaded");
    assert_matches!(
        error.downcast_ref::<ParseError>(),
        Some(ParseError::UnsupportedBinaryPolicy { version: 31 })
    );
}

#[test]
fn undeclared_symbol_reports_its_line() {
    let error = Policy::open(testdata("micro_policies/undeclared_type.conf"))
        .expect_err("b_t is never declared");
    assert_matches!(
        error.downcast_ref::<ParseError>(),
        Some(ParseError::UndeclaredSymbol { line: 6, name, .. }) if name == "b_t"
    );
}

#[test]
fn missing_file_is_an_io_error() {
    let error = Policy::open(testdata("micro_policies/no_such_policy.conf"))
        .expect_err("file does not exist");
    assert!(error.downcast_ref::<std::io::Error>().is_some());
}

#[test]
fn load_options_set_policy_properties() {
    let options = LoadOptions { handle_unknown: HandleUnknown::Allow, version: 30 };
    let policy =
        Policy::open_with_options(testdata("micro_policies/permissive_left.conf"), &options)
            .expect("load policy");
    assert_eq!(policy.version(), 30);
    assert_eq!(policy.handle_unknown(), HandleUnknown::Allow);
    assert!(!policy.mls());
    assert_eq!(policy.permissives_count(), 0);
}
