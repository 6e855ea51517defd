// SPDX-License-Identifier: GPL-3.0-only

use async_trait::async_trait;

/// Desktop notification as sent to `org.freedesktop.Notifications`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub summary: String,
    pub body: String,
    pub icon: String,
}

impl Notification {
    pub fn mounted(display_name: &str, mount_point: &str) -> Self {
        Self {
            summary: "Mounted disk".to_string(),
            body: format!("{display_name} at {mount_point}"),
            icon: "drive-removable-media".to_string(),
        }
    }
}

/// Fire-and-forget notification sink.
///
/// Returns whether the notification was shown. Callers never act on failure
/// beyond logging it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> bool;
}
