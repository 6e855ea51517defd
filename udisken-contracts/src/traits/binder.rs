// SPDX-License-Identifier: GPL-3.0-only

use async_trait::async_trait;

use crate::{
    BlockCapability, CapabilityError, CapabilitySet, DriveCapability, FilesystemCapability,
    Identity, LoopCapability, PartitionCapability, TransportError,
};

/// Binds typed capability handles to objects on one connection.
///
/// Binding only fails when the transport is unusable or the path is invalid;
/// whether the object really implements the interface is the caller's business.
/// Dropping a handle releases it, whether or not the remote object still exists.
#[async_trait]
pub trait CapabilityBinder: Send + Sync {
    async fn bind_block(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn BlockCapability>, CapabilityError>;

    async fn bind_filesystem(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn FilesystemCapability>, CapabilityError>;

    async fn bind_loop(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn LoopCapability>, CapabilityError>;

    async fn bind_partition(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn PartitionCapability>, CapabilityError>;

    async fn bind_drive(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn DriveCapability>, CapabilityError>;
}

/// Enumeration of every object the service currently manages.
#[async_trait]
pub trait ManagedObjectSource: Send + Sync {
    async fn managed_objects(&self) -> Result<Vec<(Identity, CapabilitySet)>, TransportError>;
}
