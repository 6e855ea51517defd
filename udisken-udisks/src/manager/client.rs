// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::Stream;
use futures::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{trace, warn};
use udisken_contracts::{
    CapabilitySet, Identity, ManagedObjectSource, ObjectEvent, TransportError,
    capabilities_from_interfaces,
};
use zbus::{
    Connection, MatchRule, MessageStream,
    message::Type as MessageType,
    zvariant::{self, OwnedValue},
};
use zbus_macros::proxy;

use crate::UdisksBinder;

const OBJECT_MANAGER_IFACE: &str = "org.freedesktop.DBus.ObjectManager";
const UDISKS_ROOT: &str = "/org/freedesktop/UDisks2";

type InterfacesAndProperties = HashMap<String, HashMap<String, OwnedValue>>;

#[proxy(
    default_service = "org.freedesktop.UDisks2",
    default_path = "/org/freedesktop/UDisks2/Manager",
    interface = "org.freedesktop.UDisks2.Manager"
)]
pub trait UDisks2Manager {
    #[zbus(property)]
    fn version(&self) -> zbus::Result<String>;
}

#[proxy(
    default_service = "org.freedesktop.UDisks2",
    default_path = "/org/freedesktop/UDisks2",
    interface = "org.freedesktop.DBus.ObjectManager"
)]
pub trait UDisks2ObjectManager {
    fn get_managed_objects(
        &self,
    ) -> zbus::Result<HashMap<zvariant::OwnedObjectPath, InterfacesAndProperties>>;
}

/// Entry point to the UDisks2 service on the system bus.
#[derive(Clone)]
pub struct UdisksClient {
    connection: Connection,
}

/// Ordered stream of ObjectManager events.
pub struct ObjectEventStream {
    receiver: mpsc::Receiver<ObjectEvent>,
}

impl UdisksClient {
    pub async fn connect() -> Result<Self, TransportError> {
        let connection = Connection::system()
            .await
            .map_err(|e| TransportError::Unavailable(format!("system bus: {e}")))?;
        Ok(Self { connection })
    }

    pub fn binder(&self) -> UdisksBinder {
        UdisksBinder::new(self.connection.clone())
    }

    pub async fn version(&self) -> Result<String, TransportError> {
        let manager = UDisks2ManagerProxy::new(&self.connection)
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        manager
            .version()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))
    }

    /// Subscribe to `InterfacesAdded`/`InterfacesRemoved` on the UDisks2 root.
    ///
    /// Both signals come through a single match-rule stream so they keep the
    /// order the bus delivered them in. Only capabilities the automounter knows
    /// about are kept; events left with no capability at all are dropped.
    pub async fn object_events(&self) -> Result<ObjectEventStream, TransportError> {
        let rule = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .interface(OBJECT_MANAGER_IFACE)
            .and_then(|b| b.path(UDISKS_ROOT))
            .map_err(|e| TransportError::Unavailable(e.to_string()))?
            .build();

        let mut messages = MessageStream::for_match_rule(rule, &self.connection, Some(64))
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        let (sender, receiver) = mpsc::channel(64);

        tokio::spawn(async move {
            while let Some(message) = messages.next().await {
                let message = match message {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("Failed to receive ObjectManager signal: {e}");
                        continue;
                    }
                };

                let header = message.header();
                let event = match header.member().map(|m| m.as_str()) {
                    Some("InterfacesAdded") => match message
                        .body()
                        .deserialize::<(zvariant::OwnedObjectPath, InterfacesAndProperties)>()
                    {
                        Ok((object_path, interfaces)) => ObjectEvent::InterfacesAdded {
                            identity: Identity::from(object_path.as_str()),
                            capabilities: capabilities_from_interfaces(interfaces.keys()),
                        },
                        Err(e) => {
                            warn!("Failed to parse InterfacesAdded signal args: {e}");
                            continue;
                        }
                    },
                    Some("InterfacesRemoved") => match message
                        .body()
                        .deserialize::<(zvariant::OwnedObjectPath, Vec<String>)>()
                    {
                        Ok((object_path, interfaces)) => ObjectEvent::InterfacesRemoved {
                            identity: Identity::from(object_path.as_str()),
                            capabilities: capabilities_from_interfaces(&interfaces),
                        },
                        Err(e) => {
                            warn!("Failed to parse InterfacesRemoved signal args: {e}");
                            continue;
                        }
                    },
                    _ => continue,
                };

                if !has_capabilities(&event) {
                    trace!("Ignoring ObjectManager signal for {}", event.identity());
                    continue;
                }

                if let Err(e) = sender.send(event).await {
                    warn!("Object event receiver dropped: {e}");
                    break;
                }
            }
        });

        Ok(ObjectEventStream { receiver })
    }
}

fn has_capabilities(event: &ObjectEvent) -> bool {
    match event {
        ObjectEvent::InterfacesAdded { capabilities, .. }
        | ObjectEvent::InterfacesRemoved { capabilities, .. } => !capabilities.is_empty(),
    }
}

#[async_trait]
impl ManagedObjectSource for UdisksClient {
    /// `GetManagedObjects` arrives as a D-Bus dict; entries are returned
    /// sorted by object path so bootstrap order is stable across runs.
    async fn managed_objects(&self) -> Result<Vec<(Identity, CapabilitySet)>, TransportError> {
        let object_manager = UDisks2ObjectManagerProxy::new(&self.connection)
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        let objects = object_manager
            .get_managed_objects()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        let mut objects: Vec<(Identity, CapabilitySet)> = objects
            .into_iter()
            .map(|(path, interfaces)| {
                (
                    Identity::from(path.as_str()),
                    capabilities_from_interfaces(interfaces.keys()),
                )
            })
            .collect();
        objects.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(objects)
    }
}

impl Stream for ObjectEventStream {
    type Item = ObjectEvent;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::has_capabilities;
    use udisken_contracts::{Capability, CapabilitySet, Identity, ObjectEvent};

    #[test]
    fn events_without_known_capabilities_are_filtered() {
        let job = ObjectEvent::InterfacesAdded {
            identity: Identity::from("/org/freedesktop/UDisks2/jobs/12"),
            capabilities: CapabilitySet::empty(),
        };
        let block = ObjectEvent::InterfacesRemoved {
            identity: Identity::from("/org/freedesktop/UDisks2/block_devices/sdb"),
            capabilities: Capability::Block.into(),
        };

        assert!(!has_capabilities(&job));
        assert!(has_capabilities(&block));
    }
}
