// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Policy-wide metadata: the "handle unknown" mode and the header of compiled policies.

use super::parser::ByValue;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zerocopy::{little_endian as le, FromBytes, Immutable, KnownLayout, Unaligned};

pub const SELINUX_MAGIC: u32 = 0xf97cff8c;

pub const POLICYDB_STRING_MAX_LENGTH: u32 = 32;
pub const POLICYDB_SIGNATURE: &[u8] = b"SE Linux";

pub const POLICYDB_VERSION_MIN: u32 = 15;
pub const POLICYDB_VERSION_MAX: u32 = 33;

pub const CONFIG_MLS_FLAG: u32 = 1;
pub const CONFIG_HANDLE_UNKNOWN_REJECT_FLAG: u32 = 1 << 1;
pub const CONFIG_HANDLE_UNKNOWN_ALLOW_FLAG: u32 = 1 << 2;
pub const CONFIG_HANDLE_UNKNOWN_MASK: u32 =
    CONFIG_HANDLE_UNKNOWN_REJECT_FLAG | CONFIG_HANDLE_UNKNOWN_ALLOW_FLAG;

/// How the kernel treats classes and permissions that the policy does not define.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum HandleUnknown {
    #[default]
    Deny,
    Reject,
    Allow,
}

impl fmt::Display for HandleUnknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandleUnknown::Deny => "deny",
            HandleUnknown::Reject => "reject",
            HandleUnknown::Allow => "allow",
        })
    }
}

impl FromStr for HandleUnknown {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deny" => Ok(HandleUnknown::Deny),
            "reject" => Ok(HandleUnknown::Reject),
            "allow" => Ok(HandleUnknown::Allow),
            _ => Err(ProbeError::InvalidHandleUnknownName { name: s.to_string() }),
        }
    }
}

/// Structured errors that may be encountered reading a compiled policy header.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ProbeError {
    #[error("expected data item of type {type_name} ({type_size} bytes), but found {num_bytes}")]
    MissingData { type_name: &'static str, type_size: usize, num_bytes: usize },
    #[error("expected signature length in range [0, {POLICYDB_STRING_MAX_LENGTH}], but found {found_length}")]
    InvalidSignatureLength { found_length: u32 },
    #[error("expected signature {:?}, but found {:?}", bstr::BStr::new(POLICYDB_SIGNATURE), bstr::BStr::new(found_signature.as_slice()))]
    InvalidSignature { found_signature: Vec<u8> },
    #[error("expected policy version in range [{POLICYDB_VERSION_MIN}, {POLICYDB_VERSION_MAX}], but found {found_policy_version}")]
    InvalidPolicyVersion { found_policy_version: u32 },
    #[error("expected handle-unknown config at most 1 bit set (mask {CONFIG_HANDLE_UNKNOWN_MASK:#032b}), but found {masked_bits:#032b}")]
    InvalidHandleUnknownConfigurationBits { masked_bits: u32 },
    #[error("{name:?} is not one of allow, deny or reject")]
    InvalidHandleUnknownName { name: String },
}

#[derive(Clone, Debug, KnownLayout, FromBytes, Immutable, PartialEq, Unaligned)]
#[repr(C, packed)]
struct Magic(le::U32);

#[derive(Clone, Debug, KnownLayout, FromBytes, Immutable, PartialEq, Unaligned)]
#[repr(C, packed)]
struct SignatureMetadata(le::U32);

#[derive(Clone, Debug, KnownLayout, FromBytes, Immutable, PartialEq, Unaligned)]
#[repr(C, packed)]
struct PolicyVersion(le::U32);

#[derive(Clone, Debug, KnownLayout, FromBytes, Immutable, PartialEq, Unaligned)]
#[repr(C, packed)]
struct Config(le::U32);

impl Config {
    fn handle_unknown(&self) -> Result<HandleUnknown, ProbeError> {
        match self.0.get() & CONFIG_HANDLE_UNKNOWN_MASK {
            0 => Ok(HandleUnknown::Deny),
            CONFIG_HANDLE_UNKNOWN_REJECT_FLAG => Ok(HandleUnknown::Reject),
            CONFIG_HANDLE_UNKNOWN_ALLOW_FLAG => Ok(HandleUnknown::Allow),
            masked_bits => Err(ProbeError::InvalidHandleUnknownConfigurationBits { masked_bits }),
        }
    }

    fn mls(&self) -> bool {
        self.0.get() & CONFIG_MLS_FLAG != 0
    }
}

#[derive(Clone, Debug, KnownLayout, FromBytes, Immutable, PartialEq, Unaligned)]
#[repr(C, packed)]
struct Counts {
    symbols_count: le::U32,
    object_context_count: le::U32,
}

/// The fixed header at the start of a compiled policy.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BinaryHeader {
    pub version: u32,
    pub mls: bool,
    pub handle_unknown: HandleUnknown,
    pub symbols_count: u32,
    pub object_context_count: u32,
}

/// The on-disk format of a policy file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PolicyFormat {
    /// Text in the `policy.conf` language.
    Source,
    /// A compiled kernel policy.
    Binary(BinaryHeader),
}

fn missing<T>(parser: &ByValue<&[u8]>) -> ProbeError {
    ProbeError::MissingData {
        type_name: std::any::type_name::<T>(),
        type_size: std::mem::size_of::<T>(),
        num_bytes: parser.len(),
    }
}

/// Determines the format of `bytes`. Data that does not begin with [`SELINUX_MAGIC`] is
/// reported as [`PolicyFormat::Source`]; a compiled policy must carry a well-formed header.
pub fn probe(bytes: &[u8]) -> Result<PolicyFormat, ProbeError> {
    let parser = ByValue::new(bytes);
    let tail = match parser.clone().parse::<Magic>() {
        Some((magic, tail)) if magic.0.get() == SELINUX_MAGIC => tail,
        _ => return Ok(PolicyFormat::Source),
    };

    let (signature_metadata, tail) = tail
        .clone()
        .parse::<SignatureMetadata>()
        .ok_or_else(|| missing::<SignatureMetadata>(&tail))?;
    let found_length = signature_metadata.0.get();
    if found_length > POLICYDB_STRING_MAX_LENGTH {
        return Err(ProbeError::InvalidSignatureLength { found_length });
    }
    let (signature, tail) = tail
        .clone()
        .parse_slice::<u8>(found_length as usize)
        .ok_or_else(|| missing::<u8>(&tail))?;
    if signature.as_slice() != POLICYDB_SIGNATURE {
        return Err(ProbeError::InvalidSignature { found_signature: signature });
    }

    let (version, tail) =
        tail.clone().parse::<PolicyVersion>().ok_or_else(|| missing::<PolicyVersion>(&tail))?;
    let found_policy_version = version.0.get();
    if !(POLICYDB_VERSION_MIN..=POLICYDB_VERSION_MAX).contains(&found_policy_version) {
        return Err(ProbeError::InvalidPolicyVersion { found_policy_version });
    }

    let (config, tail) = tail.clone().parse::<Config>().ok_or_else(|| missing::<Config>(&tail))?;
    let (counts, _) = tail.clone().parse::<Counts>().ok_or_else(|| missing::<Counts>(&tail))?;

    Ok(PolicyFormat::Binary(BinaryHeader {
        version: found_policy_version,
        mls: config.mls(),
        handle_unknown: config.handle_unknown()?,
        symbols_count: counts.symbols_count.get(),
        object_context_count: counts.object_context_count.get(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn header(signature: &[u8], version: u32, config: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&SELINUX_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&(signature.len() as u32).to_le_bytes());
        bytes.extend_from_slice(signature);
        bytes.extend_from_slice(&version.to_le_bytes());
        bytes.extend_from_slice(&config.to_le_bytes());
        bytes.extend_from_slice(&8u32.to_le_bytes());
        bytes.extend_from_slice(&9u32.to_le_bytes());
        bytes
    }

    #[test]
    fn source_text_is_not_binary() {
        assert_eq!(probe(b"class file\n").expect("probe"), PolicyFormat::Source);
        assert_eq!(probe(b"").expect("probe"), PolicyFormat::Source);
    }

    #[test]
    fn binary_header() {
        let bytes =
            header(POLICYDB_SIGNATURE, 31, CONFIG_MLS_FLAG | CONFIG_HANDLE_UNKNOWN_REJECT_FLAG);
        assert_eq!(
            probe(&bytes).expect("probe"),
            PolicyFormat::Binary(BinaryHeader {
                version: 31,
                mls: true,
                handle_unknown: HandleUnknown::Reject,
                symbols_count: 8,
                object_context_count: 9,
            })
        );
    }

    #[test]
    fn binary_header_errors() {
        assert_matches!(
            probe(&header(b"SE Lunix", 31, 0)),
            Err(ProbeError::InvalidSignature { .. })
        );
        assert_matches!(
            probe(&header(POLICYDB_SIGNATURE, 99, 0)),
            Err(ProbeError::InvalidPolicyVersion { found_policy_version: 99 })
        );
        assert_matches!(
            probe(&header(POLICYDB_SIGNATURE, 31, CONFIG_HANDLE_UNKNOWN_MASK)),
            Err(ProbeError::InvalidHandleUnknownConfigurationBits { .. })
        );
        let truncated = &header(POLICYDB_SIGNATURE, 31, 0)[..18];
        assert_matches!(probe(truncated), Err(ProbeError::MissingData { .. }));
    }

    #[test]
    fn handle_unknown_names() {
        assert_eq!("reject".parse::<HandleUnknown>(), Ok(HandleUnknown::Reject));
        assert_eq!(HandleUnknown::Allow.to_string(), "allow");
        assert!("maybe".parse::<HandleUnknown>().is_err());
    }
}
