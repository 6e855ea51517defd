// SPDX-License-Identifier: GPL-3.0-only

//! Device aggregate: every capability known for one block object.

use tracing::warn;
use udisken_contracts::{
    BlockCapability, Capability, CapabilityBinder, CapabilityError, CapabilitySet,
    DriveCapability, FilesystemCapability, Identity, LoopCapability, PartitionCapability,
};

use crate::error::DeviceError;

/// A bound capability, moved into a device on construction or attach.
pub enum CapabilityHandle {
    Block(Box<dyn BlockCapability>),
    Filesystem(Box<dyn FilesystemCapability>),
    Loop(Box<dyn LoopCapability>),
    Partition(Box<dyn PartitionCapability>),
}

impl CapabilityHandle {
    /// Bind `capability` at `identity`. `Drive` is never bound this way, it
    /// comes from the block's backing-drive reference instead.
    pub async fn bind(
        binder: &dyn CapabilityBinder,
        identity: &Identity,
        capability: Capability,
    ) -> Result<Option<Self>, CapabilityError> {
        let handle = match capability {
            Capability::Block => Self::Block(binder.bind_block(identity).await?),
            Capability::Filesystem => Self::Filesystem(binder.bind_filesystem(identity).await?),
            Capability::Loop => Self::Loop(binder.bind_loop(identity).await?),
            Capability::Partition => Self::Partition(binder.bind_partition(identity).await?),
            Capability::Drive => return Ok(None),
        };
        Ok(Some(handle))
    }

    pub fn capability(&self) -> Capability {
        match self {
            Self::Block(_) => Capability::Block,
            Self::Filesystem(_) => Capability::Filesystem,
            Self::Loop(_) => Capability::Loop,
            Self::Partition(_) => Capability::Partition,
        }
    }
}

/// The drive a block device sits on. Owned by the device, never the reverse.
pub struct Drive {
    identity: Identity,
    drive: Box<dyn DriveCapability>,
}

impl Drive {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn capability(&self) -> &dyn DriveCapability {
        self.drive.as_ref()
    }
}

pub struct BlockDevice {
    identity: Identity,
    block: Box<dyn BlockCapability>,
    filesystem: Option<Box<dyn FilesystemCapability>>,
    loop_device: Option<Box<dyn LoopCapability>>,
    partition: Option<Box<dyn PartitionCapability>>,
    drive: Option<Drive>,
}

pub struct BlockDeviceBuilder {
    identity: Identity,
    block: Option<Box<dyn BlockCapability>>,
    filesystem: Option<Box<dyn FilesystemCapability>>,
    loop_device: Option<Box<dyn LoopCapability>>,
    partition: Option<Box<dyn PartitionCapability>>,
}

impl BlockDeviceBuilder {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            block: None,
            filesystem: None,
            loop_device: None,
            partition: None,
        }
    }

    pub fn with(mut self, handle: CapabilityHandle) -> Self {
        match handle {
            CapabilityHandle::Block(block) => self.block = Some(block),
            CapabilityHandle::Filesystem(fs) => self.filesystem = Some(fs),
            CapabilityHandle::Loop(lo) => self.loop_device = Some(lo),
            CapabilityHandle::Partition(part) => self.partition = Some(part),
        }
        self
    }

    /// Build the device, binding its backing drive if the block reports one.
    ///
    /// A drive that cannot be read or bound only leaves the drive absent.
    pub async fn build(self, binder: &dyn CapabilityBinder) -> Result<BlockDevice, DeviceError> {
        let Some(block) = self.block else {
            return Err(DeviceError::InvalidAggregate(self.identity));
        };

        let drive = match block.backing_drive().await {
            Ok(Some(drive_identity)) => match binder.bind_drive(&drive_identity).await {
                Ok(drive) => Some(Drive {
                    identity: drive_identity,
                    drive,
                }),
                Err(e) => {
                    warn!(
                        "Could not bind drive {drive_identity} for {}: {e}",
                        self.identity
                    );
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Could not read backing drive of {}: {e}", self.identity);
                None
            }
        };

        Ok(BlockDevice {
            identity: self.identity,
            block,
            filesystem: self.filesystem,
            loop_device: self.loop_device,
            partition: self.partition,
            drive,
        })
    }
}

impl BlockDevice {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Block => true,
            Capability::Filesystem => self.filesystem.is_some(),
            Capability::Loop => self.loop_device.is_some(),
            Capability::Partition => self.partition.is_some(),
            Capability::Drive => self.drive.is_some(),
        }
    }

    pub fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::all()
            .iter()
            .filter(|capability| self.has(*capability))
            .collect()
    }

    pub fn block(&self) -> &dyn BlockCapability {
        self.block.as_ref()
    }

    pub fn filesystem(&self) -> Result<&dyn FilesystemCapability, DeviceError> {
        self.filesystem
            .as_deref()
            .ok_or_else(|| self.not_present(Capability::Filesystem))
    }

    pub fn loop_device(&self) -> Result<&dyn LoopCapability, DeviceError> {
        self.loop_device
            .as_deref()
            .ok_or_else(|| self.not_present(Capability::Loop))
    }

    pub fn partition(&self) -> Result<&dyn PartitionCapability, DeviceError> {
        self.partition
            .as_deref()
            .ok_or_else(|| self.not_present(Capability::Partition))
    }

    pub fn drive(&self) -> Result<&Drive, DeviceError> {
        self.drive
            .as_ref()
            .ok_or_else(|| self.not_present(Capability::Drive))
    }

    /// Attach a capability that appeared after construction.
    ///
    /// Returns `false` and keeps the existing handle when the capability is
    /// already attached.
    pub fn attach(&mut self, handle: CapabilityHandle) -> bool {
        if self.has(handle.capability()) {
            return false;
        }

        match handle {
            // `has(Block)` is always true, handled above.
            CapabilityHandle::Block(_) => return false,
            CapabilityHandle::Filesystem(fs) => self.filesystem = Some(fs),
            CapabilityHandle::Loop(lo) => self.loop_device = Some(lo),
            CapabilityHandle::Partition(part) => self.partition = Some(part),
        }
        true
    }

    /// Drop one optional capability. `Block` cannot be detached; removing it
    /// removes the whole device.
    pub fn detach(&mut self, capability: Capability) -> bool {
        match capability {
            Capability::Block => false,
            Capability::Filesystem => self.filesystem.take().is_some(),
            Capability::Loop => self.loop_device.take().is_some(),
            Capability::Partition => self.partition.take().is_some(),
            Capability::Drive => self.drive.take().is_some(),
        }
    }

    /// Name shown to the user: hint name, label, device node, then identity.
    pub async fn display_name(&self) -> String {
        let candidates = [
            self.block.hint_name().await,
            self.block.id_label().await,
            self.block.preferred_device().await,
        ];

        candidates
            .into_iter()
            .filter_map(Result::ok)
            .find(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.identity.to_string())
    }

    /// One-line description for the registration log.
    pub async fn describe(&self) -> String {
        let mut description = match self.block.preferred_device().await {
            Ok(device) if !device.is_empty() => device,
            _ => self.identity.to_string(),
        };

        if let Ok(partition) = self.partition() {
            if let Ok(number) = partition.number().await {
                description.push_str(&format!(" partition {number}"));
            }
            if let Ok(Some(table)) = partition.table().await {
                description.push_str(&format!(" of {table}"));
            }
        }

        if let Ok(lo) = self.loop_device() {
            if let Ok(Some(file)) = lo.backing_file().await {
                description.push_str(&format!(" backed by {file}"));
            }
        }

        if let Some(drive) = &self.drive {
            let vendor = drive.capability().vendor().await.unwrap_or_default();
            let model = drive.capability().model().await.unwrap_or_default();
            let name = format!("{vendor} {model}");
            let name = name.trim();
            if !name.is_empty() {
                description.push_str(&format!(" on {name}"));
            }
            if drive.capability().removable().await.unwrap_or(false) {
                description.push_str(" (removable)");
            }
        }

        description
    }

    fn not_present(&self, capability: Capability) -> DeviceError {
        DeviceError::CapabilityNotPresent {
            identity: self.identity.clone(),
            capability,
        }
    }
}
