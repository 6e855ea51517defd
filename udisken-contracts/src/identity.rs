// SPDX-License-Identifier: GPL-3.0-only

//! Device identity: the object path UDisks2 assigns to every object it exports.

use std::fmt;

/// Opaque, stable object path naming one remote object.
///
/// The registry keys everything by this value. It is never interpreted beyond
/// the "no object" sentinel that UDisks2 uses for unset object-path properties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// UDisks2 reports `/` for object-path properties that point nowhere
    /// (e.g. `Block.Drive` on a loop device).
    pub fn is_root(&self) -> bool {
        self.0.is_empty() || self.0 == "/"
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
