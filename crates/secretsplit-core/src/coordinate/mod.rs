//! Versioned secret coordinates
//!
//! A coordinate addresses one plaintext value in a secret store. Its string
//! form, `<name>_v<version>`, is what pointer nodes persist, so the encoding
//! must stay stable.

mod assigner;

pub use assigner::{assign, derive_name, Assignment};

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Separator between the name and the version in a full coordinate
pub const VERSION_SEPARATOR: &str = "_v";

/// Errors parsing a full coordinate string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("Malformed secret coordinate '{0}': expected <name>_v<version>")]
    Malformed(String),

    #[error("Secret coordinate '{0}' has version 0; versions start at 1")]
    ZeroVersion(String),
}

/// Address of a secret: a stable name plus a version starting at 1
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretCoordinate {
    name: String,
    version: u64,
}

impl SecretCoordinate {
    pub fn new(name: impl Into<String>, version: u64) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// The string stored inside pointer nodes
    pub fn full_coordinate(&self) -> String {
        format!("{}{}{}", self.name, VERSION_SEPARATOR, self.version)
    }

    /// Same name, next version
    pub fn next_version(&self) -> Self {
        Self::new(self.name.clone(), self.version + 1)
    }

    /// Parse a full coordinate string
    ///
    /// The version is taken after the *last* `_v`, so names may themselves
    /// contain `_v`.
    pub fn parse(full_coordinate: &str) -> Result<Self, CoordinateError> {
        let malformed = || CoordinateError::Malformed(full_coordinate.to_string());

        let (name, version) = full_coordinate
            .rsplit_once(VERSION_SEPARATOR)
            .ok_or_else(malformed)?;
        if name.is_empty() || version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let version: u64 = version.parse().map_err(|_| malformed())?;
        if version == 0 {
            return Err(CoordinateError::ZeroVersion(full_coordinate.to_string()));
        }
        Ok(Self::new(name, version))
    }
}

impl fmt::Display for SecretCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, VERSION_SEPARATOR, self.version)
    }
}

impl FromStr for SecretCoordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
