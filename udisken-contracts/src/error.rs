// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;

/// Failure to bind or query one capability of a remote object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("D-Bus error: {0}")]
    DBus(String),
}

/// Result of a rejected `Filesystem.Mount` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    /// The service refused because the filesystem is already mounted.
    #[error("Already mounted: {0}")]
    AlreadyMounted(String),

    #[error("Mount failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

impl From<CapabilityError> for MountError {
    fn from(err: CapabilityError) -> Self {
        MountError::Failed(err.to_string())
    }
}
