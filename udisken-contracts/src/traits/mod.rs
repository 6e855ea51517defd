// SPDX-License-Identifier: GPL-3.0-only

pub mod binder;
pub mod capability;
pub mod notify;

pub use binder::{CapabilityBinder, ManagedObjectSource};
pub use capability::{
    BlockCapability, DriveCapability, FilesystemCapability, LoopCapability, MountOptions,
    PartitionCapability,
};
pub use notify::{Notification, Notifier};
