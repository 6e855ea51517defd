// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, warn};
use udisken_contracts::{Notification, Notifier, TransportError};
use zbus::{Connection, zvariant::Value};
use zbus_macros::proxy;

const APP_NAME: &str = "udisken";

#[proxy(
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications",
    interface = "org.freedesktop.Notifications"
)]
pub trait Notifications {
    fn get_capabilities(&self) -> zbus::Result<Vec<String>>;

    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: HashMap<&str, Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;
}

/// Notifier backed by the desktop notification server on the session bus.
pub struct DesktopNotifier {
    proxy: NotificationsProxy<'static>,
}

impl DesktopNotifier {
    pub async fn new() -> Result<Self, TransportError> {
        let connection = Connection::session()
            .await
            .map_err(|e| TransportError::Unavailable(format!("session bus: {e}")))?;
        let proxy = NotificationsProxy::new(&connection)
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        match proxy.get_capabilities().await {
            Ok(capabilities) => {
                debug!("Notification server capabilities: {}", capabilities.join(", "))
            }
            Err(e) => debug!("Could not query notification server capabilities: {e}"),
        }

        Ok(Self { proxy })
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, notification: &Notification) -> bool {
        let result = self
            .proxy
            .notify(
                APP_NAME,
                0,
                &notification.icon,
                &notification.summary,
                &notification.body,
                &[],
                HashMap::new(),
                -1,
            )
            .await;

        match result {
            Ok(0) => {
                warn!("Notification server returned no id for \"{}\"", notification.summary);
                false
            }
            Ok(id) => {
                debug!("Sent notification {id}: {}", notification.body);
                true
            }
            Err(e) => {
                warn!("Failed to send notification: {e}");
                false
            }
        }
    }
}

/// Notifier used when notifications are off or no session bus is reachable.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, notification: &Notification) -> bool {
        debug!("Notifications disabled, dropping: {}", notification.body);
        false
    }
}
