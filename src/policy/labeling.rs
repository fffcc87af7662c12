// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Labeling statements: security contexts, initial SIDs and the file system and network
//! labeling rules.

use super::error::PolicyError;
use super::index::PolicyIndex;
use super::parsed_policy::{
    ContextData, FsUseData, GenfsconData, NetifconData, NodeconData, PortconData,
};
use super::symbols::{Range, Role, Type, User};

use std::fmt;
use std::net::IpAddr;

/// How a file system using `fs_use_*` labels its files.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FsUseType {
    /// Labels are stored in extended attributes.
    Xattr,
    /// Objects are labeled with the context of the creating task.
    Task,
    /// Objects are labeled by transition from the creating task.
    Trans,
}

impl fmt::Display for FsUseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FsUseType::Xattr => "fs_use_xattr",
            FsUseType::Task => "fs_use_task",
            FsUseType::Trans => "fs_use_trans",
        })
    }
}

/// A security context `user:role:type[:range]`.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    index: &'a PolicyIndex,
    data: &'a ContextData,
}

impl<'a> Context<'a> {
    pub(super) fn new(index: &'a PolicyIndex, data: &'a ContextData) -> Self {
        Self { index, data }
    }

    pub fn user(&self) -> User<'a> {
        User::new(self.index, &self.index.parsed_policy().users[self.data.user])
    }

    pub fn role(&self) -> Role<'a> {
        Role::new(self.index, &self.index.parsed_policy().roles[self.data.role])
    }

    pub fn type_(&self) -> Type<'a> {
        Type::new(self.index, &self.index.parsed_policy().types[self.data.type_])
    }

    pub fn range(&self) -> Result<Range<'a>, PolicyError> {
        self.data
            .range
            .as_ref()
            .map(|range| Range::from_data(self.index, range))
            .ok_or(PolicyError::MlsDisabled)
    }
}

impl fmt::Display for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.user(), self.role(), self.type_())?;
        if let Ok(range) = self.range() {
            write!(f, ":{}", range)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Context").field(&self.to_string()).finish()
    }
}

impl PartialEq for Context<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.index, other.index) && self.data == other.data
    }
}

impl Eq for Context<'_> {}

macro_rules! labeling_statement {
    ($(#[$meta:meta])* $name:ident, $data:ty) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        pub struct $name<'a> {
            index: &'a PolicyIndex,
            data: &'a $data,
        }

        impl<'a> $name<'a> {
            pub(super) fn new(index: &'a PolicyIndex, data: &'a $data) -> Self {
                Self { index, data }
            }

            pub fn context(&self) -> Context<'a> {
                Context::new(self.index, &self.data.context)
            }

            pub fn statement(&self) -> String {
                self.to_string()
            }
        }

        impl fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.to_string()).finish()
            }
        }

        impl PartialEq for $name<'_> {
            fn eq(&self, other: &Self) -> bool {
                std::ptr::eq(self.data, other.data)
            }
        }

        impl Eq for $name<'_> {}
    };
}

labeling_statement!(
    /// An `fs_use_xattr`, `fs_use_task` or `fs_use_trans` statement.
    FsUse,
    FsUseData
);

impl<'a> FsUse<'a> {
    pub fn ruletype(&self) -> FsUseType {
        self.data.behavior
    }

    pub fn fs(&self) -> &'a str {
        &self.data.fs_type
    }
}

impl fmt::Display for FsUse<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {};", self.ruletype(), self.fs(), self.context())
    }
}

labeling_statement!(
    /// A `genfscon` statement, labeling files of a file system without label support.
    Genfscon,
    GenfsconData
);

impl<'a> Genfscon<'a> {
    pub fn fs(&self) -> &'a str {
        &self.data.fs_type
    }

    pub fn path(&self) -> &'a str {
        &self.data.path
    }

    /// The file type restriction, e.g. `-d`, if any.
    pub fn filetype(&self) -> Option<&'a str> {
        self.data.file_type.as_deref()
    }
}

impl fmt::Display for Genfscon<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "genfscon {} {}", self.fs(), self.path())?;
        if let Some(filetype) = self.filetype() {
            write!(f, " -{}", filetype)?;
        }
        write!(f, " {}", self.context())
    }
}

labeling_statement!(
    /// A `portcon` statement.
    Portcon,
    PortconData
);

impl<'a> Portcon<'a> {
    pub fn protocol(&self) -> &'a str {
        &self.data.protocol
    }

    /// The inclusive port range.
    pub fn ports(&self) -> (u16, u16) {
        (self.data.low, self.data.high)
    }
}

impl fmt::Display for Portcon<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (low, high) = self.ports();
        write!(f, "portcon {} ", self.protocol())?;
        if low == high {
            write!(f, "{}", low)?;
        } else {
            write!(f, "{}-{}", low, high)?;
        }
        write!(f, " {}", self.context())
    }
}

labeling_statement!(
    /// A `netifcon` statement.
    Netifcon,
    NetifconData
);

impl<'a> Netifcon<'a> {
    pub fn netif(&self) -> &'a str {
        &self.data.interface
    }

    /// The context of packets received on the interface.
    pub fn packet(&self) -> Context<'a> {
        Context::new(self.index, &self.data.packet_context)
    }
}

impl fmt::Display for Netifcon<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "netifcon {} {} {}", self.netif(), self.context(), self.packet())
    }
}

labeling_statement!(
    /// A `nodecon` statement.
    Nodecon,
    NodeconData
);

impl<'a> Nodecon<'a> {
    pub fn address(&self) -> IpAddr {
        self.data.address
    }

    pub fn netmask(&self) -> IpAddr {
        self.data.netmask
    }

    /// 4 or 6.
    pub fn ip_version(&self) -> u8 {
        match self.data.address {
            IpAddr::V4(_) => 4,
            IpAddr::V6(_) => 6,
        }
    }
}

impl fmt::Display for Nodecon<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nodecon {} {} {}", self.address(), self.netmask(), self.context())
    }
}
