// SPDX-License-Identifier: GPL-3.0-only

//! Identity-keyed registry of block devices, driven by ObjectManager events.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::stream::{Stream, StreamExt};
use tracing::{debug, info, warn};
use udisken_contracts::{
    Capability, CapabilityBinder, CapabilitySet, Identity, ManagedObjectSource, ObjectEvent,
    TransportError,
};

use crate::automount::{AutomountEngine, AutomountOutcome};
use crate::device::{BlockDevice, BlockDeviceBuilder, CapabilityHandle};
use crate::error::RegistryError;

/// What one event did to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryChange {
    Registered {
        identity: Identity,
        automount: Option<AutomountOutcome>,
    },
    Attached {
        identity: Identity,
        capabilities: CapabilitySet,
        automount: Option<AutomountOutcome>,
    },
    Detached {
        identity: Identity,
        capabilities: CapabilitySet,
    },
    Removed(Identity),
    Ignored(Identity),
}

/// Sole owner of every [`BlockDevice`]. At most one device per identity, and
/// every registered device has a block capability.
pub struct DeviceRegistry {
    devices: HashMap<Identity, BlockDevice>,
    binder: Arc<dyn CapabilityBinder>,
    /// `None` when automounting is disabled.
    automount: Option<AutomountEngine>,
    automount_on_attach: bool,
}

impl DeviceRegistry {
    pub fn new(
        binder: Arc<dyn CapabilityBinder>,
        automount: Option<AutomountEngine>,
        automount_on_attach: bool,
    ) -> Self {
        Self {
            devices: HashMap::new(),
            binder,
            automount,
            automount_on_attach,
        }
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.devices.contains_key(identity)
    }

    pub fn get(&self, identity: &Identity) -> Option<&BlockDevice> {
        self.devices.get(identity)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Replay every object the service already manages as if it had just
    /// appeared, in the order the source returns them.
    ///
    /// Returns the number of devices registered.
    pub async fn bootstrap(&mut self, source: &dyn ManagedObjectSource) -> Result<usize, RegistryError> {
        let objects = source.managed_objects().await?;
        debug!("Bootstrapping from {} managed objects", objects.len());

        let mut registered = 0;
        for (identity, capabilities) in objects {
            let event = ObjectEvent::InterfacesAdded {
                identity,
                capabilities,
            };
            if let Some(RegistryChange::Registered { .. }) = self.process(event).await {
                registered += 1;
            }
        }

        Ok(registered)
    }

    /// Apply one event and log any non-fatal failure.
    pub async fn process(&mut self, event: ObjectEvent) -> Option<RegistryChange> {
        match self.handle(event).await {
            Ok(change) => Some(change),
            Err(e) => {
                warn!("{e}");
                None
            }
        }
    }

    /// Apply one event. On error the identity keeps its prior state.
    pub async fn handle(&mut self, event: ObjectEvent) -> Result<RegistryChange, RegistryError> {
        match event {
            ObjectEvent::InterfacesAdded {
                identity,
                capabilities,
            } => {
                debug!("Interfaces added on {identity}: {capabilities:?}");
                if self.devices.contains_key(&identity) {
                    self.attach(identity, capabilities).await
                } else if capabilities.contains(Capability::Block) {
                    self.register(identity, capabilities).await
                } else {
                    Ok(RegistryChange::Ignored(identity))
                }
            }
            ObjectEvent::InterfacesRemoved {
                identity,
                capabilities,
            } => {
                debug!("Interfaces removed on {identity}: {capabilities:?}");
                Ok(self.remove(identity, capabilities))
            }
        }
    }

    /// Process events until `shutdown` resolves or the stream ends.
    ///
    /// Each event runs to completion before the next one is looked at. The
    /// stream ending means the bus connection is gone.
    pub async fn run<S, F>(&mut self, mut events: S, shutdown: F) -> Result<(), RegistryError>
    where
        S: Stream<Item = ObjectEvent> + Unpin,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => return Ok(()),
                event = events.next() => match event {
                    Some(event) => {
                        self.process(event).await;
                    }
                    None => {
                        return Err(TransportError::Unavailable(
                            "object event stream ended".to_string(),
                        )
                        .into());
                    }
                },
            }
        }
    }

    /// Release every device, one at a time.
    pub fn shutdown(&mut self) {
        debug!("Releasing {} devices", self.len());
        for (identity, device) in self.devices.drain() {
            debug!("Releasing {identity} ({:?})", device.capabilities());
            drop(device);
        }
    }

    async fn register(
        &mut self,
        identity: Identity,
        capabilities: CapabilitySet,
    ) -> Result<RegistryChange, RegistryError> {
        let handles = self.bind_all(&identity, capabilities).await?;
        let builder = handles
            .into_iter()
            .fold(BlockDeviceBuilder::new(identity.clone()), BlockDeviceBuilder::with);
        let device = builder.build(self.binder.as_ref()).await?;

        info!("Registered {identity}: {}", device.describe().await);
        if let Ok(drive) = device.drive() {
            debug!("{identity} sits on drive {}", drive.identity());
        }
        self.devices.insert(identity.clone(), device);

        let automount = match (&self.automount, self.devices.get(&identity)) {
            (Some(engine), Some(device)) if device.has(Capability::Filesystem) => {
                Some(engine.run(device).await)
            }
            _ => None,
        };

        Ok(RegistryChange::Registered {
            identity,
            automount,
        })
    }

    async fn attach(
        &mut self,
        identity: Identity,
        capabilities: CapabilitySet,
    ) -> Result<RegistryChange, RegistryError> {
        let present = match self.devices.get(&identity) {
            Some(device) => device.capabilities(),
            None => return Ok(RegistryChange::Ignored(identity)),
        };
        // Drive is derived from the block, never attached from an event.
        let missing = capabilities & !present & !CapabilitySet::from(Capability::Drive);
        if missing.is_empty() {
            return Ok(RegistryChange::Ignored(identity));
        }

        let handles = self.bind_all(&identity, missing).await?;
        let Some(device) = self.devices.get_mut(&identity) else {
            return Ok(RegistryChange::Ignored(identity));
        };

        let mut attached = CapabilitySet::empty();
        for handle in handles {
            let capability = handle.capability();
            if device.attach(handle) {
                attached |= capability;
            }
        }
        debug!("Attached {attached:?} to {identity}");

        let automount = match &self.automount {
            Some(engine) if self.automount_on_attach && attached.contains(Capability::Filesystem) => {
                Some(engine.run(device).await)
            }
            _ => None,
        };

        Ok(RegistryChange::Attached {
            identity,
            capabilities: attached,
            automount,
        })
    }

    fn remove(&mut self, identity: Identity, capabilities: CapabilitySet) -> RegistryChange {
        if capabilities.contains(Capability::Block) {
            return match self.devices.remove(&identity) {
                Some(device) => {
                    info!("Removed {identity}");
                    drop(device);
                    RegistryChange::Removed(identity)
                }
                None => RegistryChange::Ignored(identity),
            };
        }

        let Some(device) = self.devices.get_mut(&identity) else {
            return RegistryChange::Ignored(identity);
        };

        let detached: CapabilitySet = capabilities
            .iter()
            .filter(|capability| device.detach(*capability))
            .collect();

        if detached.is_empty() {
            RegistryChange::Ignored(identity)
        } else {
            debug!("Detached {detached:?} from {identity}");
            RegistryChange::Detached {
                identity,
                capabilities: detached,
            }
        }
    }

    /// Bind every capability in `capabilities`, or none of them.
    async fn bind_all(
        &self,
        identity: &Identity,
        capabilities: CapabilitySet,
    ) -> Result<Vec<CapabilityHandle>, RegistryError> {
        let mut handles = Vec::new();
        for capability in capabilities.iter() {
            let handle = CapabilityHandle::bind(self.binder.as_ref(), identity, capability)
                .await
                .map_err(|source| RegistryError::MalformedEvent {
                    identity: identity.clone(),
                    source,
                })?;
            handles.extend(handle);
        }
        Ok(handles)
    }
}
