//! External collaborators
//!
//! The sink manager never talks to the native Bluetooth stack, the settings store
//! or the broadcast bus directly. Each one sits behind a narrow trait so any
//! transport (local IPC, FFI, a mock) can be plugged in without touching the
//! state machine. All methods take `&self`: implementations are expected to be
//! safe to call from the manager while other parts of the system use them too.

use heapless::{String, Vec};

use crate::{
    BluetoothAddress, SinkPriority, SinkState,
    constants::{
        MAX_BONDED_DEVICES, MAX_OBJECT_PATH_LENGTH, MAX_PROPERTY_NAME_LENGTH,
        MAX_PROPERTY_VALUE_LENGTH, MAX_REMOTE_UUIDS, MAX_SINK_PROPERTIES,
    },
    uuid::ServiceUuid,
};

/// Stack object path of a remote device
pub type ObjectPath = String<MAX_OBJECT_PATH_LENGTH>;

/// Object paths of the bonded devices known to the adapter
pub type DevicePaths = Vec<ObjectPath, MAX_BONDED_DEVICES>;

/// Service UUIDs advertised by a remote device
pub type RemoteUuids = Vec<ServiceUuid, MAX_REMOTE_UUIDS>;

/// Ordered name/value pairs returned by a sink property query
pub type SinkProperties = Vec<SinkProperty, MAX_SINK_PROPERTIES>;

/// A single sink property as reported by the stack
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SinkProperty {
    /// Property name, e.g. `State`
    pub name: String<MAX_PROPERTY_NAME_LENGTH>,
    /// Property value, e.g. `connected`
    pub value: String<MAX_PROPERTY_VALUE_LENGTH>,
}

impl SinkProperty {
    /// Build a property from string slices
    ///
    /// Returns `None` if either part exceeds its capacity.
    #[must_use]
    pub fn new(name: &str, value: &str) -> Option<Self> {
        Some(Self {
            name: String::try_from(name).ok()?,
            value: String::try_from(value).ok()?,
        })
    }
}

/// Native adapter and A2DP sink bridge
pub trait AdapterStack {
    /// Whether the adapter is currently enabled
    fn is_enabled(&self) -> bool;

    /// Object paths of all bonded/known remote devices
    fn bonded_device_paths(&self) -> DevicePaths;

    /// Resolve an object path to a device address
    fn address_from_path(&self, path: &str) -> Option<BluetoothAddress>;

    /// Resolve a device address to its object path
    fn path_from_address(&self, address: BluetoothAddress) -> Option<ObjectPath>;

    /// Service UUIDs of a remote device, if known
    fn remote_service_uuids(&self, address: BluetoothAddress) -> Option<RemoteUuids>;

    /// Ask the native layer to connect the sink; `false` if the request was rejected
    fn connect_sink(&self, path: &str) -> bool;

    /// Ask the native layer to disconnect the sink; `false` if the request was rejected
    fn disconnect_sink(&self, path: &str) -> bool;

    /// Query the sink properties of a remote device
    fn sink_properties(&self, path: &str) -> Option<SinkProperties>;
}

/// Persisted per-device priorities
pub trait PriorityStore {
    /// Stored priority, `None` if nothing was ever stored for the device
    fn priority(&self, address: BluetoothAddress) -> Option<SinkPriority>;

    /// Store a priority; `false` if the write failed
    fn set_priority(&self, address: BluetoothAddress, priority: SinkPriority) -> bool;
}

/// Receiver of the manager's outbound notifications
pub trait NotificationSink {
    /// A sink changed state
    fn sink_state_changed(&self, address: BluetoothAddress, prev: SinkState, state: SinkState);

    /// A connected sink is going away; audio must stop being routed to it
    fn audio_becoming_noisy(&self);

    /// Bluetooth audio became available or unavailable to the audio subsystem
    fn adapter_audio_enabled(&self, enabled: bool);
}

/// Borrowed bundle of the collaborators every manager operation needs
pub struct SinkContext<'a, A, P, N> {
    /// Native adapter bridge
    pub adapter: &'a A,
    /// Priority persistence
    pub priorities: &'a P,
    /// Notification receiver
    pub notifier: &'a N,
}

impl<'a, A, P, N> SinkContext<'a, A, P, N>
where
    A: AdapterStack,
    P: PriorityStore,
    N: NotificationSink,
{
    /// Bundle the collaborators
    #[must_use]
    pub const fn new(adapter: &'a A, priorities: &'a P, notifier: &'a N) -> Self {
        Self {
            adapter,
            priorities,
            notifier,
        }
    }

    /// Stored priority of a device, [`SinkPriority::OFF`] if none
    #[must_use]
    pub fn priority(&self, address: BluetoothAddress) -> SinkPriority {
        self.priorities.priority(address).unwrap_or_default()
    }

    /// Whether the device advertises the audio sink role
    #[must_use]
    pub fn is_sink_device(&self, address: BluetoothAddress) -> bool {
        self.adapter
            .remote_service_uuids(address)
            .is_some_and(|uuids| uuids.iter().any(|&uuid| crate::uuid::is_audio_sink(uuid)))
    }

    /// Whether the device advertises any A2DP role
    #[must_use]
    pub fn is_a2dp_device(&self, address: BluetoothAddress) -> bool {
        self.adapter
            .remote_service_uuids(address)
            .is_some_and(|uuids| uuids.iter().any(|&uuid| crate::uuid::is_a2dp(uuid)))
    }
}

impl<A, P, N> Clone for SinkContext<'_, A, P, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A, P, N> Copy for SinkContext<'_, A, P, N> {}
