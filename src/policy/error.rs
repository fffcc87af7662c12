// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use super::constraints::ConstraintError;
use super::metadata::SELINUX_MAGIC;

use std::fmt;
use thiserror::Error;

/// Structured errors that may be encountered loading a policy. Every variant that refers to a
/// location in a source policy carries the 1-based `line` of the offending statement.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("policy is not valid UTF-8")]
    InvalidEncoding,
    #[error("line {line}: invalid character {character:?}")]
    InvalidCharacter { line: usize, character: char },
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },
    #[error("line {line}: expected {expected}, but found {found:?}")]
    UnexpectedToken { line: usize, expected: &'static str, found: String },
    #[error("line {line}: expected {expected}, but found end of policy")]
    UnexpectedEnd { line: usize, expected: &'static str },
    #[error("line {line}: unknown statement {keyword:?}")]
    UnknownStatement { line: usize, keyword: String },
    #[error("line {line}: {kind} {name:?} is not declared")]
    UndeclaredSymbol { line: usize, kind: &'static str, name: String },
    #[error("line {line}: {kind} {name:?} is already declared")]
    DuplicateDeclaration { line: usize, kind: &'static str, name: String },
    #[error("line {line}: permission {permission:?} is not defined for class {class:?}")]
    UnknownPermission { line: usize, class: String, permission: String },
    #[error("line {line}: conflicting type rule {rule:?}")]
    ConflictingTypeRule { line: usize, rule: String },
    #[error("line {line}: malformed constraint expression: {reason}")]
    InvalidConstraintExpression { line: usize, reason: &'static str },
    #[error("line {line}: {message}")]
    InvalidStatement { line: usize, message: String },
    #[error(
        "compiled policy (magic {SELINUX_MAGIC:#x}, version {version}) symbol tables are not \
         supported; load the source policy instead"
    )]
    UnsupportedBinaryPolicy { version: u32 },
}

/// Structured errors that may be encountered validating a parsed policy.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidateError {
    #[error("constraint on class {class:?} is malformed: {source}")]
    InvalidConstraint { class: String, source: ConstraintError },
    #[error("user {user:?} has no MLS level and range")]
    MissingUserMls { user: String },
    #[error("default level of user {user:?} is outside the user's range")]
    UserLevelOutsideRange { user: String },
    #[error("class {class:?} has {count} permissions, more than the {max} an access vector holds")]
    TooManyPermissions { class: String, count: usize, max: usize },
}

/// Rule families whose rule-type names are validated separately.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RuleFamily {
    Te,
    Rbac,
    Mls,
}

impl fmt::Display for RuleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleFamily::Te => "TE",
            RuleFamily::Rbac => "RBAC",
            RuleFamily::Mls => "MLS",
        })
    }
}

/// Structured errors returned when querying a loaded policy.
///
/// The variants fall into the following groups:
///
///   * invalid symbol lookups (`Invalid*` for named symbols),
///   * invalid rule types (`InvalidRuleType`, `InvalidConstraintType`, `InvalidDefault*`),
///   * symbol misuse (`RuleUse`, `ConstraintUse`, `NoStatement`),
///   * structural absence (`NoCommon`, `NoDefaults`, `RuleNotConditional`,
///     `TeRuleNoFilename`), which queries and diffs treat as "does not match",
///   * `MlsDisabled`,
///   * `InvalidRegex`, for query patterns that do not compile.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PolicyError {
    #[error("{name:?} is not a valid Boolean")]
    InvalidBoolean { name: String },
    #[error("{name:?} is not a valid category")]
    InvalidCategory { name: String },
    #[error("{name:?} is not a valid object class")]
    InvalidClass { name: String },
    #[error("{perms} not defined by any object class")]
    InvalidPermission { perms: String },
    #[error("{name:?} is not a valid common")]
    InvalidCommon { name: String },
    #[error("{name:?} is not a valid initial sid")]
    InvalidInitialSid { name: String },
    #[error("{name:?} is not a valid level: {reason}")]
    InvalidLevel { name: String, reason: String },
    #[error("{name:?} is not a valid level declaration")]
    InvalidLevelDecl { name: String },
    #[error("{name:?} is not a valid range: {reason}")]
    InvalidRange { name: String, reason: String },
    #[error("{name:?} is not a valid role")]
    InvalidRole { name: String },
    #[error("{name:?} is not a valid sensitivity")]
    InvalidSensitivity { name: String },
    #[error("{name:?} is not a valid type or attribute")]
    InvalidType { name: String },
    #[error("{name:?} is not a valid user")]
    InvalidUser { name: String },
    #[error("{ruletype:?} is not a valid {family} rule type")]
    InvalidRuleType { family: RuleFamily, ruletype: String },
    #[error("{ruletype:?} is not a valid constraint type")]
    InvalidConstraintType { ruletype: String },
    #[error("{ruletype:?} is not a valid default_* rule type")]
    InvalidDefaultType { ruletype: String },
    #[error("{value:?} is not a valid default_* value")]
    InvalidDefaultValue { value: String },
    #[error("{value:?} is not a valid default_* range")]
    InvalidDefaultRange { value: String },
    #[error("{ruletype} rules do not have {field}")]
    RuleUse { ruletype: String, field: &'static str },
    #[error("{ruletype} rules do not have a permission set")]
    ConstraintUse { ruletype: String },
    #[error("{what} has no policy statement")]
    NoStatement { what: String },
    #[error("{class} does not inherit a common")]
    NoCommon { class: String },
    #[error("{class} has no default_* statements")]
    NoDefaults { class: String },
    #[error("rule is not conditional")]
    RuleNotConditional,
    #[error("type_transition rule has no file name")]
    TeRuleNoFilename,
    #[error("MLS is disabled in this policy")]
    MlsDisabled,
    #[error("{pattern:?} is not a valid regular expression: {message}")]
    InvalidRegex { pattern: String, message: String },
}

impl PolicyError {
    /// Returns true for failed lookups of named symbols, including rule types.
    pub fn is_invalid_symbol(&self) -> bool {
        matches!(
            self,
            Self::InvalidBoolean { .. }
                | Self::InvalidCategory { .. }
                | Self::InvalidClass { .. }
                | Self::InvalidPermission { .. }
                | Self::InvalidCommon { .. }
                | Self::InvalidInitialSid { .. }
                | Self::InvalidLevel { .. }
                | Self::InvalidLevelDecl { .. }
                | Self::InvalidRange { .. }
                | Self::InvalidRole { .. }
                | Self::InvalidSensitivity { .. }
                | Self::InvalidType { .. }
                | Self::InvalidUser { .. }
                | Self::InvalidDefaultType { .. }
                | Self::InvalidDefaultValue { .. }
                | Self::InvalidDefaultRange { .. }
        ) || self.is_invalid_rule_type()
    }

    /// Returns true for any invalid rule type, of any rule family.
    pub fn is_invalid_rule_type(&self) -> bool {
        matches!(self, Self::InvalidRuleType { .. } | Self::InvalidConstraintType { .. })
    }

    /// Returns true for errors that signal a field or statement a symbol does not carry.
    pub fn is_use_error(&self) -> bool {
        matches!(self, Self::RuleUse { .. } | Self::ConstraintUse { .. } | Self::NoStatement { .. })
    }

    pub(crate) fn rule_use(ruletype: impl fmt::Display, field: &'static str) -> Self {
        Self::RuleUse { ruletype: ruletype.to_string(), field }
    }
}
