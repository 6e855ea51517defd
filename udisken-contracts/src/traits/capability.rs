// SPDX-License-Identifier: GPL-3.0-only

use async_trait::async_trait;

use crate::{CapabilityError, Identity, MountError};

/// `org.freedesktop.UDisks2.Block`; every registered device has one.
#[async_trait]
pub trait BlockCapability: Send + Sync {
    /// Whether the device should be automatically started (mounted, unlocked...).
    async fn hint_auto(&self) -> Result<bool, CapabilityError>;

    async fn hint_name(&self) -> Result<String, CapabilityError>;

    async fn id_label(&self) -> Result<String, CapabilityError>;

    async fn preferred_device(&self) -> Result<String, CapabilityError>;

    /// Drive object backing this block device, `None` when UDisks reports `/`.
    async fn backing_drive(&self) -> Result<Option<Identity>, CapabilityError>;
}

#[async_trait]
pub trait FilesystemCapability: Send + Sync {
    async fn mount_points(&self) -> Result<Vec<String>, CapabilityError>;

    /// Mount the filesystem and return the mount point chosen by the service.
    async fn mount(&self, options: &MountOptions) -> Result<String, MountError>;
}

#[async_trait]
pub trait LoopCapability: Send + Sync {
    async fn backing_file(&self) -> Result<Option<String>, CapabilityError>;
}

#[async_trait]
pub trait PartitionCapability: Send + Sync {
    async fn number(&self) -> Result<u32, CapabilityError>;

    async fn table(&self) -> Result<Option<Identity>, CapabilityError>;
}

#[async_trait]
pub trait DriveCapability: Send + Sync {
    async fn vendor(&self) -> Result<String, CapabilityError>;

    async fn model(&self) -> Result<String, CapabilityError>;

    async fn removable(&self) -> Result<bool, CapabilityError>;
}

/// Options passed to `Filesystem.Mount`. Empty means the service defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountOptions {
    pub fs_type: Option<String>,
    pub options: Vec<String>,
}

impl MountOptions {
    pub fn is_default(&self) -> bool {
        self.fs_type.is_none() && self.options.is_empty()
    }

    /// Comma-joined `options` value, `None` when there is nothing to pass.
    pub fn joined_options(&self) -> Option<String> {
        let tokens: Vec<&str> = self
            .options
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        if tokens.is_empty() {
            None
        } else {
            Some(tokens.join(","))
        }
    }
}
