// SPDX-License-Identifier: GPL-3.0-only

//! One-shot automount decision for a freshly registered device.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use udisken_contracts::{MountError, MountOptions, Notification, Notifier};

use crate::device::BlockDevice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoFilesystem,
    HintDisabled,
    AlreadyMounted,
    /// Someone else mounted the filesystem between the check and our call.
    RaceAlreadyMounted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomountOutcome {
    Skipped(SkipReason),
    Mounted(String),
    Failed(String),
}

pub struct AutomountEngine {
    notifier: Arc<dyn Notifier>,
    notify: bool,
    mount_options: MountOptions,
}

impl AutomountEngine {
    pub fn new(notifier: Arc<dyn Notifier>, notify: bool, mount_options: MountOptions) -> Self {
        Self {
            notifier,
            notify,
            mount_options,
        }
    }

    /// Decide whether to mount `device` and do it. Never retries.
    pub async fn run(&self, device: &BlockDevice) -> AutomountOutcome {
        let identity = device.identity();

        let Ok(filesystem) = device.filesystem() else {
            info!("Not automounting {identity}: block device has no filesystem");
            return AutomountOutcome::Skipped(SkipReason::NoFilesystem);
        };

        match device.block().hint_auto().await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Not automounting {identity}: HintAuto is off");
                return AutomountOutcome::Skipped(SkipReason::HintDisabled);
            }
            Err(e) => {
                error!("Failed to read HintAuto of {identity}: {e}");
                return AutomountOutcome::Failed(e.to_string());
            }
        }

        match filesystem.mount_points().await {
            Ok(mount_points) if !mount_points.is_empty() => {
                debug!(
                    "Not automounting {identity}: already mounted at {}",
                    mount_points.join(", ")
                );
                return AutomountOutcome::Skipped(SkipReason::AlreadyMounted);
            }
            Ok(_) => {}
            Err(e) => {
                error!("Failed to read mount points of {identity}: {e}");
                return AutomountOutcome::Failed(e.to_string());
            }
        }

        match filesystem.mount(&self.mount_options).await {
            Ok(mount_point) => {
                info!("Mounted {identity} at {mount_point}");
                if self.notify {
                    let name = device.display_name().await;
                    let notification = Notification::mounted(&name, &mount_point);
                    if !self.notifier.notify(&notification).await {
                        debug!("Mount notification for {identity} was not shown");
                    }
                }
                AutomountOutcome::Mounted(mount_point)
            }
            Err(MountError::AlreadyMounted(detail)) => {
                warn!("{identity} was mounted by someone else meanwhile: {detail}");
                match filesystem.mount_points().await {
                    Ok(mount_points) => {
                        warn!("{identity} is mounted at: {}", mount_points.join(", "))
                    }
                    Err(e) => warn!("Failed to re-read mount points of {identity}: {e}"),
                }
                AutomountOutcome::Skipped(SkipReason::RaceAlreadyMounted)
            }
            Err(MountError::Failed(detail)) => {
                error!("Failed to mount {identity}: {detail}");
                AutomountOutcome::Failed(detail)
            }
        }
    }
}
