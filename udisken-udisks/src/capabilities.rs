// SPDX-License-Identifier: GPL-3.0-only

//! Typed handles over the UDisks2 interfaces a block object may expose.
//!
//! Each handle owns one zbus proxy bound to one object path. Dropping the
//! handle drops the proxy, which releases its signal subscriptions; the remote
//! object does not need to exist anymore for that to succeed.

use std::collections::HashMap;

use async_trait::async_trait;
use udisken_contracts::{
    BlockCapability, Capability, CapabilityBinder, CapabilityError, DriveCapability,
    FilesystemCapability, Identity, LoopCapability, MountError, MountOptions,
    PartitionCapability, UDISKS_SERVICE,
};
use udisks2::{
    block::BlockProxy, drive::DriveProxy, filesystem::FilesystemProxy,
    partition::PartitionProxy,
};
use zbus::{Connection, zvariant::Value};

use crate::dbus::{self, bytestring as bs, dbus_error, object_path};

pub struct UdisksBlock {
    identity: Identity,
    proxy: BlockProxy<'static>,
}

#[async_trait]
impl BlockCapability for UdisksBlock {
    async fn hint_auto(&self) -> Result<bool, CapabilityError> {
        self.proxy.hint_auto().await.map_err(dbus_error)
    }

    async fn hint_name(&self) -> Result<String, CapabilityError> {
        self.proxy.hint_name().await.map_err(dbus_error)
    }

    async fn id_label(&self) -> Result<String, CapabilityError> {
        self.proxy.id_label().await.map_err(dbus_error)
    }

    async fn preferred_device(&self) -> Result<String, CapabilityError> {
        let preferred = self.proxy.preferred_device().await.map_err(dbus_error)?;
        if let Some(preferred) = bs::decode_path_bytes(&preferred) {
            return Ok(preferred);
        }

        let device = self.proxy.device().await.map_err(dbus_error)?;
        Ok(bs::decode_path_bytes(&device).unwrap_or_default())
    }

    async fn backing_drive(&self) -> Result<Option<Identity>, CapabilityError> {
        let drive = self.proxy.drive().await.map_err(dbus_error)?;
        let drive = Identity::from(drive.as_str());

        tracing::trace!("{} is backed by drive {}", self.identity, drive);
        Ok((!drive.is_root()).then_some(drive))
    }
}

pub struct UdisksFilesystem {
    identity: Identity,
    proxy: FilesystemProxy<'static>,
}

#[async_trait]
impl FilesystemCapability for UdisksFilesystem {
    async fn mount_points(&self) -> Result<Vec<String>, CapabilityError> {
        let mount_points = self.proxy.mount_points().await.map_err(dbus_error)?;
        Ok(bs::decode_mount_points(&mount_points))
    }

    async fn mount(&self, options: &MountOptions) -> Result<String, MountError> {
        let mut opts: HashMap<&str, Value<'_>> = HashMap::new();
        if !options.is_default() {
            if let Some(fs_type) = options.fs_type.as_deref() {
                opts.insert("fstype", Value::from(fs_type));
            }
            if let Some(joined) = options.joined_options() {
                opts.insert("options", Value::from(joined));
            }
        }

        match self.proxy.mount(opts).await.map_err(dbus::mount_error) {
            Err(MountError::AlreadyMounted(detail)) => {
                tracing::debug!("UDisks reports {} already mounted: {detail}", self.identity);
                Err(MountError::AlreadyMounted(detail))
            }
            result => result,
        }
    }
}

pub struct UdisksLoop {
    proxy: zbus::Proxy<'static>,
}

#[async_trait]
impl LoopCapability for UdisksLoop {
    async fn backing_file(&self) -> Result<Option<String>, CapabilityError> {
        let bytes = self
            .proxy
            .get_property::<Vec<u8>>("BackingFile")
            .await
            .map_err(dbus_error)?;

        Ok(bs::decode_path_bytes(&bytes))
    }
}

pub struct UdisksPartition {
    proxy: PartitionProxy<'static>,
}

#[async_trait]
impl PartitionCapability for UdisksPartition {
    async fn number(&self) -> Result<u32, CapabilityError> {
        self.proxy.number().await.map_err(dbus_error)
    }

    async fn table(&self) -> Result<Option<Identity>, CapabilityError> {
        let table = self.proxy.table().await.map_err(dbus_error)?;
        let table = Identity::from(table.as_str());
        Ok((!table.is_root()).then_some(table))
    }
}

pub struct UdisksDrive {
    proxy: DriveProxy<'static>,
}

#[async_trait]
impl DriveCapability for UdisksDrive {
    async fn vendor(&self) -> Result<String, CapabilityError> {
        self.proxy.vendor().await.map_err(dbus_error)
    }

    async fn model(&self) -> Result<String, CapabilityError> {
        self.proxy.model().await.map_err(dbus_error)
    }

    async fn removable(&self) -> Result<bool, CapabilityError> {
        self.proxy.removable().await.map_err(dbus_error)
    }
}

/// Binds capability handles on one shared bus connection.
#[derive(Clone)]
pub struct UdisksBinder {
    connection: Connection,
}

impl UdisksBinder {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }
}

fn bind_error(capability: Capability, identity: &Identity, err: zbus::Error) -> CapabilityError {
    match err {
        zbus::Error::InputOutput(e) => CapabilityError::TransportUnavailable(format!(
            "binding {} on {identity}: {e}",
            capability.interface_name()
        )),
        e => CapabilityError::DBus(format!(
            "binding {} on {identity}: {e}",
            capability.interface_name()
        )),
    }
}

#[async_trait]
impl CapabilityBinder for UdisksBinder {
    async fn bind_block(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn BlockCapability>, CapabilityError> {
        let proxy = BlockProxy::builder(&self.connection)
            .path(object_path(identity)?)
            .map_err(|e| bind_error(Capability::Block, identity, e))?
            .build()
            .await
            .map_err(|e| bind_error(Capability::Block, identity, e))?;

        Ok(Box::new(UdisksBlock {
            identity: identity.clone(),
            proxy,
        }))
    }

    async fn bind_filesystem(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn FilesystemCapability>, CapabilityError> {
        let proxy = FilesystemProxy::builder(&self.connection)
            .path(object_path(identity)?)
            .map_err(|e| bind_error(Capability::Filesystem, identity, e))?
            .build()
            .await
            .map_err(|e| bind_error(Capability::Filesystem, identity, e))?;

        Ok(Box::new(UdisksFilesystem {
            identity: identity.clone(),
            proxy,
        }))
    }

    async fn bind_loop(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn LoopCapability>, CapabilityError> {
        let proxy = zbus::Proxy::new(
            &self.connection,
            UDISKS_SERVICE,
            object_path(identity)?,
            Capability::Loop.interface_name(),
        )
        .await
        .map_err(|e| bind_error(Capability::Loop, identity, e))?;

        Ok(Box::new(UdisksLoop { proxy }))
    }

    async fn bind_partition(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn PartitionCapability>, CapabilityError> {
        let proxy = PartitionProxy::builder(&self.connection)
            .path(object_path(identity)?)
            .map_err(|e| bind_error(Capability::Partition, identity, e))?
            .build()
            .await
            .map_err(|e| bind_error(Capability::Partition, identity, e))?;

        Ok(Box::new(UdisksPartition { proxy }))
    }

    async fn bind_drive(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn DriveCapability>, CapabilityError> {
        let proxy = DriveProxy::builder(&self.connection)
            .path(object_path(identity)?)
            .map_err(|e| bind_error(Capability::Drive, identity, e))?
            .build()
            .await
            .map_err(|e| bind_error(Capability::Drive, identity, e))?;

        Ok(Box::new(UdisksDrive { proxy }))
    }
}
