// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Read-only analysis of SELinux policies: a symbol and rule model over a loaded policy, rule
//! queries, constraint rendering and differences between two policies.

/// Declares a fieldless enum whose variants are named by policy language keywords.
///
/// The enum displays as its keyword and parses from it, failing with the `PolicyError` built by
/// the given closure.
macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        $name:ident,
        $error:expr,
        { $($variant:ident => $keyword:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn keyword(&self) -> &'static str {
                match self {
                    $($name::$variant => $keyword),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.keyword())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::policy::error::PolicyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($keyword => Ok($name::$variant),)+
                    _ => Err(($error)(s.to_string())),
                }
            }
        }
    };
}

pub mod diff;
pub mod policy;
pub mod query;
