// SPDX-License-Identifier: GPL-3.0-only

pub mod capability;
pub mod error;
pub mod identity;
pub mod traits;

pub use capability::{
    Capability, CapabilitySet, ObjectEvent, UDISKS_SERVICE, capabilities_from_interfaces,
};
pub use error::{CapabilityError, MountError, TransportError};
pub use identity::Identity;
pub use traits::{
    BlockCapability, CapabilityBinder, DriveCapability, FilesystemCapability, LoopCapability,
    ManagedObjectSource, MountOptions, Notification, Notifier, PartitionCapability,
};
