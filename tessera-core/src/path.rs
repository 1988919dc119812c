// Copyright 2024-2026, Tessera Labs, Inc.
// For licensing, see https://github.com/tessera-lang/tessera-rs/blob/main/licenses/COPYRIGHT.md

//! Typed account-storage paths of the form `/<domain>/<identifier>`.

use core::fmt;
use core::str::FromStr;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ErrorKind, RuntimeError};

lazy_static! {
    static ref IDENTIFIER_REGEX: Regex = Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// The domain a path addresses. `Storage` holds values, `Private` and
/// `Public` hold links.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathDomain {
    Storage,
    Private,
    Public,
}

impl PathDomain {
    pub const ALL: [PathDomain; 3] = [PathDomain::Storage, PathDomain::Private, PathDomain::Public];

    pub const fn as_str(self) -> &'static str {
        match self {
            PathDomain::Storage => "storage",
            PathDomain::Private => "private",
            PathDomain::Public => "public",
        }
    }

    /// Only `Private` and `Public` paths may carry links.
    pub const fn is_link_domain(self) -> bool {
        matches!(self, PathDomain::Private | PathDomain::Public)
    }
}

impl fmt::Display for PathDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A domain-qualified path into an account, e.g. `/storage/vault`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoragePath {
    pub domain: PathDomain,
    pub identifier: String,
}

impl StoragePath {
    /// Creates a path, validating the identifier against the
    /// alphanumeric-underscore rule.
    pub fn new(domain: PathDomain, identifier: impl Into<String>) -> Result<Self, RuntimeError> {
        let identifier = identifier.into();
        if !IDENTIFIER_REGEX.is_match(&identifier) {
            return Err(RuntimeError::new(ErrorKind::InvalidPath {
                text: format!("/{domain}/{identifier}"),
            }));
        }
        Ok(Self { domain, identifier })
    }

    pub fn storage(identifier: impl Into<String>) -> Result<Self, RuntimeError> {
        Self::new(PathDomain::Storage, identifier)
    }

    pub fn private(identifier: impl Into<String>) -> Result<Self, RuntimeError> {
        Self::new(PathDomain::Private, identifier)
    }

    pub fn public(identifier: impl Into<String>) -> Result<Self, RuntimeError> {
        Self::new(PathDomain::Public, identifier)
    }
}

impl FromStr for StoragePath {
    type Err = RuntimeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            RuntimeError::new(ErrorKind::InvalidPath {
                text: text.to_owned(),
            })
        };
        let rest = text.strip_prefix('/').ok_or_else(invalid)?;
        let (domain, identifier) = rest.split_once('/').ok_or_else(invalid)?;
        let domain = PathDomain::ALL
            .into_iter()
            .find(|d| d.as_str() == domain)
            .ok_or_else(invalid)?;
        StoragePath::new(domain, identifier).map_err(|_| invalid())
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.domain, self.identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let path: StoragePath = "/storage/flovatar_42".parse().unwrap();
        assert_eq!(path.domain, PathDomain::Storage);
        assert_eq!(path.identifier, "flovatar_42");
        assert_eq!(path.to_string(), "/storage/flovatar_42");
    }

    #[test]
    fn test_rejects_malformed() {
        for text in [
            "storage/x",
            "/storage",
            "/attic/x",
            "/public/",
            "/public/has-dash",
            "/private/0leading",
            "/storage/a/b",
        ] {
            assert!(text.parse::<StoragePath>().is_err(), "accepted {text:?}");
        }
    }

    #[test]
    fn test_link_domains() {
        assert!(!PathDomain::Storage.is_link_domain());
        assert!(PathDomain::Private.is_link_domain());
        assert!(PathDomain::Public.is_link_domain());
    }
}
