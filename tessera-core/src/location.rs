// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Code locations and source ranges.
//!
//! A [`Location`] identifies where a program came from; a [`QualifiedId`]
//! names a composite or interface type declared at a location. Both are
//! produced by the external checker and consumed unchanged by the runtime.

use core::fmt;

use crate::address::AccountAddress;

/// The provenance of a program.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    /// A one-shot script or transaction, identified by the host.
    Script(String),
    /// Code deployed to an account under a contract name.
    Contract(AccountAddress, String),
    /// A named test program.
    Test(String),
}

impl Location {
    pub fn script(id: impl Into<String>) -> Self {
        Location::Script(id.into())
    }

    pub fn test(name: impl Into<String>) -> Self {
        Location::Test(name.into())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Script(id) => write!(f, "s.{id}"),
            Location::Contract(address, name) => write!(f, "A.{address}.{name}"),
            Location::Test(name) => write!(f, "t.{name}"),
        }
    }
}

/// A type identifier qualified by the location that declared it, e.g.
/// `A.0x01.Marketplace.Listing`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedId {
    pub location: Location,
    pub identifier: String,
}

impl QualifiedId {
    pub fn new(location: Location, identifier: impl Into<String>) -> Self {
        Self {
            location,
            identifier: identifier.into(),
        }
    }

    /// The identifier without its qualification, e.g. `Listing`.
    pub fn simple_name(&self) -> &str {
        self.identifier.rsplit('.').next().unwrap_or(&self.identifier)
    }
}

impl fmt::Display for QualifiedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.location, self.identifier)
    }
}

/// A position in source code. Offsets are byte offsets; line and column are
/// 1-based and informational only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourcePosition {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub const fn new(offset: u32, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

/// A half-open range of source positions carried by AST nodes and errors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceRange {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceRange {
    /// The empty range used where no source information is available, e.g.
    /// for predeclared values.
    pub const NONE: Self = Self {
        start: SourcePosition::new(0, 0, 0),
        end: SourcePosition::new(0, 0, 0),
    };

    pub const fn is_none(&self) -> bool {
        self.start.offset == 0 && self.end.offset == 0 && self.start.line == 0
    }

    /// A synthetic range useful in tests and builders, spanning a single line.
    pub const fn line(line: u32) -> Self {
        Self {
            start: SourcePosition::new(line, line, 1),
            end: SourcePosition::new(line, line, 1),
        }
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("<unknown>");
        }
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}
