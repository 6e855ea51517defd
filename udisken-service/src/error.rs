// SPDX-License-Identifier: GPL-3.0-only

use thiserror::Error;
use udisken_contracts::{Capability, CapabilityError, Identity, TransportError};

/// Contract violations on a single device aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// Caller asked for a capability without checking `has()` first.
    #[error("{identity} has no {capability:?} capability")]
    CapabilityNotPresent {
        identity: Identity,
        capability: Capability,
    },

    #[error("Cannot build a device for {0} without a block capability")]
    InvalidAggregate(Identity),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    TransportUnavailable(#[from] TransportError),

    /// An event claimed an interface that could not be bound.
    #[error("Malformed event for {identity}: {source}")]
    MalformedEvent {
        identity: Identity,
        #[source]
        source: CapabilityError,
    },

    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl RegistryError {
    /// Whether the error should take the process down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransportUnavailable(_))
    }
}
