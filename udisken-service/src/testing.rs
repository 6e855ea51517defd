// SPDX-License-Identifier: GPL-3.0-only

//! In-memory stand-ins for the UDisks2 bindings, for registry and engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use udisken_contracts::{
    BlockCapability, Capability, CapabilityBinder, CapabilityError, CapabilitySet,
    DriveCapability, FilesystemCapability, Identity, LoopCapability, ManagedObjectSource,
    MountError, MountOptions, Notification, Notifier, PartitionCapability, TransportError,
};

#[derive(Debug, Clone)]
pub enum MountBehavior {
    Succeed(String),
    /// Another actor mounts the filesystem at the given path first.
    LoseRace(String),
    Fail(String),
}

#[derive(Debug, Clone)]
pub struct FakeObject {
    pub hint_auto: bool,
    pub hint_name: String,
    pub id_label: String,
    pub device: String,
    pub drive: Option<Identity>,
    pub mount_points: Vec<String>,
    pub mount: MountBehavior,
    pub partition_number: u32,
    pub table: Option<Identity>,
    pub backing_file: Option<String>,
    pub vendor: String,
    pub model: String,
    pub removable: bool,
}

impl Default for FakeObject {
    fn default() -> Self {
        Self {
            hint_auto: true,
            hint_name: String::new(),
            id_label: String::new(),
            device: String::new(),
            drive: None,
            mount_points: Vec::new(),
            mount: MountBehavior::Fail("no mount behaviour configured".into()),
            partition_number: 1,
            table: None,
            backing_file: None,
            vendor: String::new(),
            model: String::new(),
            removable: false,
        }
    }
}

impl FakeObject {
    pub fn device(device: &str) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct BusState {
    objects: HashMap<Identity, FakeObject>,
    failing: HashSet<(Identity, Capability)>,
    mount_calls: Vec<(Identity, MountOptions)>,
    released: Vec<(Identity, Capability)>,
}

/// Shared fake of the remote service state.
#[derive(Clone, Default)]
pub struct FakeBus {
    state: Arc<Mutex<BusState>>,
}

impl FakeBus {
    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap()
    }

    pub fn insert(&self, identity: &str, object: FakeObject) {
        self.lock().objects.insert(Identity::from(identity), object);
    }

    pub fn update(&self, identity: &str, change: impl FnOnce(&mut FakeObject)) {
        let mut state = self.lock();
        change(state.objects.get_mut(&Identity::from(identity)).unwrap());
    }

    pub fn fail_bind(&self, identity: &str, capability: Capability) {
        self.lock()
            .failing
            .insert((Identity::from(identity), capability));
    }

    pub fn heal_bind(&self, identity: &str, capability: Capability) {
        self.lock()
            .failing
            .remove(&(Identity::from(identity), capability));
    }

    pub fn mount_calls(&self) -> Vec<(Identity, MountOptions)> {
        self.lock().mount_calls.clone()
    }

    pub fn released(&self) -> Vec<(Identity, Capability)> {
        self.lock().released.clone()
    }

    pub fn binder(&self) -> FakeBinder {
        FakeBinder { bus: self.clone() }
    }
}

pub struct FakeBinder {
    bus: FakeBus,
}

impl FakeBinder {
    fn bind(&self, identity: &Identity, capability: Capability) -> Result<FakeHandle, CapabilityError> {
        if self
            .bus
            .lock()
            .failing
            .contains(&(identity.clone(), capability))
        {
            return Err(CapabilityError::DBus(format!(
                "cannot bind {} on {identity}",
                capability.interface_name()
            )));
        }

        Ok(FakeHandle {
            identity: identity.clone(),
            capability,
            bus: self.bus.clone(),
        })
    }
}

#[async_trait]
impl CapabilityBinder for FakeBinder {
    async fn bind_block(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn BlockCapability>, CapabilityError> {
        Ok(Box::new(self.bind(identity, Capability::Block)?))
    }

    async fn bind_filesystem(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn FilesystemCapability>, CapabilityError> {
        Ok(Box::new(self.bind(identity, Capability::Filesystem)?))
    }

    async fn bind_loop(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn LoopCapability>, CapabilityError> {
        Ok(Box::new(self.bind(identity, Capability::Loop)?))
    }

    async fn bind_partition(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn PartitionCapability>, CapabilityError> {
        Ok(Box::new(self.bind(identity, Capability::Partition)?))
    }

    async fn bind_drive(
        &self,
        identity: &Identity,
    ) -> Result<Box<dyn DriveCapability>, CapabilityError> {
        Ok(Box::new(self.bind(identity, Capability::Drive)?))
    }
}

/// One bound capability. Records its release on drop.
struct FakeHandle {
    identity: Identity,
    capability: Capability,
    bus: FakeBus,
}

impl FakeHandle {
    fn read<T>(&self, f: impl FnOnce(&FakeObject) -> T) -> Result<T, CapabilityError> {
        self.bus
            .lock()
            .objects
            .get(&self.identity)
            .map(f)
            .ok_or_else(|| {
                CapabilityError::DBus(format!(
                    "org.freedesktop.DBus.Error.UnknownObject: {}",
                    self.identity
                ))
            })
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        if let Ok(mut state) = self.bus.state.lock() {
            state
                .released
                .push((self.identity.clone(), self.capability));
        }
    }
}

#[async_trait]
impl BlockCapability for FakeHandle {
    async fn hint_auto(&self) -> Result<bool, CapabilityError> {
        self.read(|o| o.hint_auto)
    }

    async fn hint_name(&self) -> Result<String, CapabilityError> {
        self.read(|o| o.hint_name.clone())
    }

    async fn id_label(&self) -> Result<String, CapabilityError> {
        self.read(|o| o.id_label.clone())
    }

    async fn preferred_device(&self) -> Result<String, CapabilityError> {
        self.read(|o| o.device.clone())
    }

    async fn backing_drive(&self) -> Result<Option<Identity>, CapabilityError> {
        self.read(|o| o.drive.clone())
    }
}

#[async_trait]
impl FilesystemCapability for FakeHandle {
    async fn mount_points(&self) -> Result<Vec<String>, CapabilityError> {
        self.read(|o| o.mount_points.clone())
    }

    async fn mount(&self, options: &MountOptions) -> Result<String, MountError> {
        let mut state = self.bus.lock();
        state
            .mount_calls
            .push((self.identity.clone(), options.clone()));

        let Some(object) = state.objects.get_mut(&self.identity) else {
            return Err(MountError::Failed(format!(
                "org.freedesktop.DBus.Error.UnknownObject: {}",
                self.identity
            )));
        };

        match object.mount.clone() {
            MountBehavior::Succeed(path) => {
                object.mount_points.push(path.clone());
                Ok(path)
            }
            MountBehavior::LoseRace(path) => {
                let detail = format!(
                    "org.freedesktop.UDisks2.Error.AlreadyMounted: Device {} is already mounted at `{path}'.",
                    object.device
                );
                object.mount_points.push(path);
                Err(MountError::AlreadyMounted(detail))
            }
            MountBehavior::Fail(detail) => Err(MountError::Failed(detail)),
        }
    }
}

#[async_trait]
impl LoopCapability for FakeHandle {
    async fn backing_file(&self) -> Result<Option<String>, CapabilityError> {
        self.read(|o| o.backing_file.clone())
    }
}

#[async_trait]
impl PartitionCapability for FakeHandle {
    async fn number(&self) -> Result<u32, CapabilityError> {
        self.read(|o| o.partition_number)
    }

    async fn table(&self) -> Result<Option<Identity>, CapabilityError> {
        self.read(|o| o.table.clone())
    }
}

#[async_trait]
impl DriveCapability for FakeHandle {
    async fn vendor(&self) -> Result<String, CapabilityError> {
        self.read(|o| o.vendor.clone())
    }

    async fn model(&self) -> Result<String, CapabilityError> {
        self.read(|o| o.model.clone())
    }

    async fn removable(&self) -> Result<bool, CapabilityError> {
        self.read(|o| o.removable)
    }
}

/// Canned `GetManagedObjects` reply.
pub struct FakeEnumeration(pub Result<Vec<(Identity, CapabilitySet)>, TransportError>);

#[async_trait]
impl ManagedObjectSource for FakeEnumeration {
    async fn managed_objects(&self) -> Result<Vec<(Identity, CapabilitySet)>, TransportError> {
        self.0.clone()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> bool {
        self.sent.lock().unwrap().push(notification.clone());
        true
    }
}
