//! Test doubles for the external collaborators

use core::{
    cell::{Cell, RefCell},
    fmt::Write,
};

use heapless::{FnvIndexMap, String, Vec};

use crate::{
    grant_policy::{
        HandlerIntent, PackageInfo, PackageProvider, PackageRegistry, PermissionFlags,
        PermissionGroup, UserId,
        registry::{HandlerNames, PackageName, PackageNames, PermissionName},
    },
    AdapterStack, BluetoothAddress, MemoryPriorityStore, NotificationSink, ObjectPath,
    SinkContext, SinkProperty, SinkState,
    constants::PROPERTY_STATE,
    stack::{DevicePaths, RemoteUuids, SinkProperties},
    uuid::{ServiceClassId, ServiceUuid},
};

#[derive(Debug, Clone)]
struct MockDevice {
    path: ObjectPath,
    uuids: RemoteUuids,
    state: Option<String<32>>,
    properties_available: bool,
}

/// Scriptable adapter recording every native call
pub struct MockAdapterStack {
    enabled: Cell<bool>,
    devices: RefCell<FnvIndexMap<BluetoothAddress, MockDevice, 16>>,
    connect_result: Cell<bool>,
    disconnect_result: Cell<bool>,
    connect_calls: RefCell<Vec<ObjectPath, 16>>,
    disconnect_calls: RefCell<Vec<ObjectPath, 16>>,
}

impl MockAdapterStack {
    pub fn new() -> Self {
        Self {
            enabled: Cell::new(true),
            devices: RefCell::new(FnvIndexMap::new()),
            connect_result: Cell::new(true),
            disconnect_result: Cell::new(true),
            connect_calls: RefCell::new(Vec::new()),
            disconnect_calls: RefCell::new(Vec::new()),
        }
    }

    pub fn path_for(address: BluetoothAddress) -> ObjectPath {
        let mut path = ObjectPath::new();
        write!(path, "/org/bluez/hci0/dev_").unwrap();
        for (i, byte) in address.as_bytes().iter().enumerate() {
            if i > 0 {
                path.push('_').unwrap();
            }
            write!(path, "{byte:02X}").unwrap();
        }
        path
    }

    /// Register a remote device advertising `uuids` whose sink reports `state`
    pub fn add_device(&self, address: BluetoothAddress, uuids: &[ServiceUuid], state: &str) {
        let device = MockDevice {
            path: Self::path_for(address),
            uuids: Vec::from_slice(uuids).unwrap(),
            state: Some(String::try_from(state).unwrap()),
            properties_available: true,
        };
        self.devices.borrow_mut().insert(address, device).unwrap();
    }

    /// Register an A2DP sink
    pub fn add_sink(&self, address: BluetoothAddress, state: &str) {
        self.add_device(address, &[ServiceClassId::AudioSink.to_uuid()], state);
    }

    pub fn set_state(&self, address: BluetoothAddress, state: &str) {
        if let Some(device) = self.devices.borrow_mut().get_mut(&address) {
            device.state = Some(String::try_from(state).unwrap());
        }
    }

    pub fn drop_state_property(&self, address: BluetoothAddress) {
        if let Some(device) = self.devices.borrow_mut().get_mut(&address) {
            device.state = None;
        }
    }

    pub fn fail_properties(&self, address: BluetoothAddress) {
        if let Some(device) = self.devices.borrow_mut().get_mut(&address) {
            device.properties_available = false;
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn set_connect_result(&self, result: bool) {
        self.connect_result.set(result);
    }

    pub fn set_disconnect_result(&self, result: bool) {
        self.disconnect_result.set(result);
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.borrow().len()
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.borrow().len()
    }

    fn find_by_path(&self, path: &str) -> Option<(BluetoothAddress, MockDevice)> {
        self.devices
            .borrow()
            .iter()
            .find(|(_, device)| device.path.as_str() == path)
            .map(|(&address, device)| (address, device.clone()))
    }
}

impl AdapterStack for MockAdapterStack {
    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn bonded_device_paths(&self) -> DevicePaths {
        self.devices
            .borrow()
            .values()
            .map(|device| device.path.clone())
            .collect()
    }

    fn address_from_path(&self, path: &str) -> Option<BluetoothAddress> {
        self.find_by_path(path).map(|(address, _)| address)
    }

    fn path_from_address(&self, address: BluetoothAddress) -> Option<ObjectPath> {
        self.devices
            .borrow()
            .get(&address)
            .map(|device| device.path.clone())
    }

    fn remote_service_uuids(&self, address: BluetoothAddress) -> Option<RemoteUuids> {
        self.devices
            .borrow()
            .get(&address)
            .map(|device| device.uuids.clone())
    }

    fn connect_sink(&self, path: &str) -> bool {
        self.connect_calls
            .borrow_mut()
            .push(String::try_from(path).unwrap())
            .unwrap();
        self.connect_result.get()
    }

    fn disconnect_sink(&self, path: &str) -> bool {
        self.disconnect_calls
            .borrow_mut()
            .push(String::try_from(path).unwrap())
            .unwrap();
        self.disconnect_result.get()
    }

    fn sink_properties(&self, path: &str) -> Option<SinkProperties> {
        let (_, device) = self.find_by_path(path)?;
        if !device.properties_available {
            return None;
        }
        let mut properties = SinkProperties::new();
        properties
            .push(SinkProperty::new("Connected", "true").unwrap())
            .unwrap();
        if let Some(state) = &device.state {
            properties
                .push(SinkProperty::new(PROPERTY_STATE, state).unwrap())
                .unwrap();
        }
        Some(properties)
    }
}

/// A notification as observed by [`MockNotificationSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    StateChanged(BluetoothAddress, SinkState, SinkState),
    BecomingNoisy,
    AudioEnabled(bool),
}

/// Records notifications in emission order
pub struct MockNotificationSink {
    notifications: RefCell<Vec<Notification, 64>>,
}

impl MockNotificationSink {
    pub fn new() -> Self {
        Self {
            notifications: RefCell::new(Vec::new()),
        }
    }

    pub fn take(&self) -> Vec<Notification, 64> {
        core::mem::take(&mut *self.notifications.borrow_mut())
    }

    pub fn noisy_count(&self) -> usize {
        self.notifications
            .borrow()
            .iter()
            .filter(|&&n| n == Notification::BecomingNoisy)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.borrow().is_empty()
    }

    fn record(&self, notification: Notification) {
        self.notifications.borrow_mut().push(notification).unwrap();
    }
}

impl NotificationSink for MockNotificationSink {
    fn sink_state_changed(&self, address: BluetoothAddress, prev: SinkState, state: SinkState) {
        self.record(Notification::StateChanged(address, prev, state));
    }

    fn audio_becoming_noisy(&self) {
        self.record(Notification::BecomingNoisy);
    }

    fn adapter_audio_enabled(&self, enabled: bool) {
        self.record(Notification::AudioEnabled(enabled));
    }
}

/// The three collaborators wired together
pub struct Fixture {
    pub adapter: MockAdapterStack,
    pub priorities: MemoryPriorityStore,
    pub notifier: MockNotificationSink,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            adapter: MockAdapterStack::new(),
            priorities: MemoryPriorityStore::new(),
            notifier: MockNotificationSink::new(),
        }
    }

    pub fn ctx(&self) -> SinkContext<'_, MockAdapterStack, MemoryPriorityStore, MockNotificationSink> {
        SinkContext::new(&self.adapter, &self.priorities, &self.notifier)
    }
}

fn name<const N: usize>(text: &str) -> String<N> {
    String::try_from(text).unwrap()
}

/// In-memory package manager recording every grant
pub struct MockPackageRegistry {
    packages: RefCell<Vec<PackageInfo, 16>>,
    factory_packages: RefCell<Vec<PackageInfo, 4>>,
    handlers: RefCell<Vec<(HandlerIntent, HandlerNames), 16>>,
    provided: RefCell<Vec<(PackageProvider, PackageNames), 4>>,
    flags: RefCell<Vec<(PackageName, PermissionName, PermissionFlags), 64>>,
    runtime_grants: RefCell<Vec<(PackageName, PermissionName), 64>>,
    install_grants: RefCell<Vec<(PackageName, PermissionName), 16>>,
}

impl MockPackageRegistry {
    pub fn new() -> Self {
        Self {
            packages: RefCell::new(Vec::new()),
            factory_packages: RefCell::new(Vec::new()),
            handlers: RefCell::new(Vec::new()),
            provided: RefCell::new(Vec::new()),
            flags: RefCell::new(Vec::new()),
            runtime_grants: RefCell::new(Vec::new()),
            install_grants: RefCell::new(Vec::new()),
        }
    }

    fn build(
        package: &str,
        uid: u32,
        target_sdk: u32,
        (system, privileged, persistent): (bool, bool, bool),
        requested: &[&str],
    ) -> PackageInfo {
        PackageInfo {
            name: name(package),
            uid,
            target_sdk,
            system,
            privileged,
            persistent,
            updated_system: false,
            requested_permissions: requested.iter().map(|&p| name(p)).collect(),
        }
    }

    /// Install a package; `kind` is `(system, privileged, persistent)`
    pub fn add_package(
        &self,
        package: &str,
        uid: u32,
        target_sdk: u32,
        kind: (bool, bool, bool),
        requested: &[&str],
    ) {
        let info = Self::build(package, uid, target_sdk, kind, requested);
        self.packages.borrow_mut().push(info).unwrap();
    }

    /// Turn `package` into an updated system app whose factory image requested `requested`
    pub fn mark_updated(&self, package: &str, requested: &[&str]) {
        let mut packages = self.packages.borrow_mut();
        let installed = packages
            .iter_mut()
            .find(|info| info.name.as_str() == package)
            .unwrap();
        installed.updated_system = true;
        let mut factory = installed.clone();
        factory.updated_system = false;
        factory.requested_permissions = requested.iter().map(|&p| name(p)).collect();
        self.factory_packages.borrow_mut().push(factory).unwrap();
    }

    pub fn set_handlers(&self, intent: HandlerIntent, packages: &[&str]) {
        let names = packages.iter().map(|&p| name(p)).collect();
        self.handlers.borrow_mut().push((intent, names)).unwrap();
    }

    pub fn set_provided(&self, provider: PackageProvider, packages: &[&str]) {
        let names = packages.iter().map(|&p| name(p)).collect();
        self.provided.borrow_mut().push((provider, names)).unwrap();
    }

    pub fn set_flags(&self, package: &str, permission: &str, flags: PermissionFlags) {
        let mut all = self.flags.borrow_mut();
        match all
            .iter_mut()
            .find(|(pkg, perm, _)| pkg.as_str() == package && perm.as_str() == permission)
        {
            Some(entry) => entry.2 = flags,
            None => all.push((name(package), name(permission), flags)).unwrap(),
        }
    }

    pub fn flags(&self, package: &str, permission: &str) -> PermissionFlags {
        self.flags
            .borrow()
            .iter()
            .find(|(pkg, perm, _)| pkg.as_str() == package && perm.as_str() == permission)
            .map_or(PermissionFlags::NONE, |&(_, _, flags)| flags)
    }

    pub fn is_granted(&self, package: &str, permission: &str) -> bool {
        self.runtime_grants
            .borrow()
            .iter()
            .any(|(pkg, perm)| pkg.as_str() == package && perm.as_str() == permission)
    }

    pub fn is_install_granted(&self, package: &str, permission: &str) -> bool {
        self.install_grants
            .borrow()
            .iter()
            .any(|(pkg, perm)| pkg.as_str() == package && perm.as_str() == permission)
    }
}

impl PackageRegistry for MockPackageRegistry {
    fn package_names(&self) -> PackageNames {
        self.packages
            .borrow()
            .iter()
            .map(|info| info.name.clone())
            .collect()
    }

    fn package(&self, name: &str) -> Option<PackageInfo> {
        self.packages
            .borrow()
            .iter()
            .find(|info| info.name.as_str() == name)
            .cloned()
    }

    fn disabled_system_package(&self, name: &str) -> Option<PackageInfo> {
        self.factory_packages
            .borrow()
            .iter()
            .find(|info| info.name.as_str() == name)
            .cloned()
    }

    fn is_runtime_permission(&self, permission: &str) -> bool {
        use PermissionGroup::*;
        [
            Phone, Contacts, Location, Calendar, Sms, Microphone, Camera, Sensors, Storage,
        ]
        .iter()
        .any(|group| group.contains(permission))
    }

    fn query_handlers(&self, intent: HandlerIntent, _user: UserId) -> HandlerNames {
        self.handlers
            .borrow()
            .iter()
            .find(|(handled, _)| *handled == intent)
            .map(|(_, names)| names.clone())
            .unwrap_or_default()
    }

    fn provided_packages(&self, provider: PackageProvider, _user: UserId) -> PackageNames {
        self.provided
            .borrow()
            .iter()
            .find(|(source, _)| *source == provider)
            .map(|(_, names)| names.clone())
            .unwrap_or_default()
    }

    fn permission_flags(&self, permission: &str, package: &str, _user: UserId) -> PermissionFlags {
        self.flags(package, permission)
    }

    fn update_permission_flags(
        &self,
        permission: &str,
        package: &str,
        mask: PermissionFlags,
        flags: PermissionFlags,
        _user: UserId,
    ) {
        let current = self.flags(package, permission);
        let updated = PermissionFlags((current.0 & !mask.0) | (flags.0 & mask.0));
        self.set_flags(package, permission, updated);
    }

    fn grant_runtime_permission(&self, package: &str, permission: &str, _user: UserId) {
        self.runtime_grants
            .borrow_mut()
            .push((name(package), name(permission)))
            .unwrap();
    }

    fn grant_install_permission(&self, package: &str, permission: &str) {
        self.install_grants
            .borrow_mut()
            .push((name(package), name(permission)))
            .unwrap();
    }
}
