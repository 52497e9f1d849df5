#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(clippy::too_many_lines)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

mod address;
pub mod api;
pub mod constants;
pub mod grant_policy;
pub mod manager;
pub mod priority_store;
pub mod processor;
pub mod scheduler;
mod state;
pub mod stack;
pub mod uuid;

#[cfg(test)]
pub(crate) mod mocks;

use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    channel::Channel,
    mutex::{MappedMutexGuard, Mutex, MutexGuard},
    signal::Signal,
};
use embassy_time::Duration;
use heapless::Vec;

use crate::constants::{DEFAULT_AUTO_CONNECT_DELAY_MS, MAX_CHANNELS, MAX_SINK_DEVICES};

pub use address::{AddressText, BluetoothAddress};
pub use manager::SinkManager;
pub use priority_store::MemoryPriorityStore;
pub use stack::{
    AdapterStack, NotificationSink, ObjectPath, PriorityStore, SinkContext, SinkProperty,
};
pub use state::{BondState, SinkPriority, SinkState, TrackedState};

/// External events feeding the manager (adapter, bonding, remote connection, native callbacks)
pub(crate) static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, SinkEvent, MAX_CHANNELS> =
    Channel::new();

pub(crate) static REQUEST_CHANNEL: Channel<CriticalSectionRawMutex, Request, MAX_CHANNELS> =
    Channel::new();

pub(crate) static RESPONSE_CHANNEL: Channel<CriticalSectionRawMutex, Response, MAX_CHANNELS> =
    Channel::new();

/// Raised whenever a new auto-connect deadline is scheduled
pub(crate) static AUTO_CONNECT_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Global `SinkManager`, initialized by client at runtime
pub(crate) static SINK_MANAGER: Mutex<CriticalSectionRawMutex, Option<SinkManager>> =
    Mutex::new(None);

/// Initialize the global `SinkManager` with the given options.
///
/// Must be called before using any API function or running the processor tasks;
/// [`processor::run`] does it for you.
///
/// # Errors
///
/// Returns [`SinkError::AlreadyInitialized`] if the manager has already been initialized.
pub async fn init_sink_manager(options: SinkManagerOptions) -> Result<(), SinkError> {
    let mut guard = SINK_MANAGER.lock().await;
    if guard.is_some() {
        return Err(SinkError::AlreadyInitialized);
    }
    *guard = Some(SinkManager::with_options(options));
    Ok(())
}

/// Get a locked reference to the global `SinkManager`.
///
/// Holding the guard serializes against every other operation on the manager.
///
/// # Errors
///
/// Returns [`SinkError::NotInitialized`] if [`init_sink_manager`] has not run yet.
pub async fn sink_manager<'a>()
-> Result<MappedMutexGuard<'a, CriticalSectionRawMutex, SinkManager>, SinkError> {
    let guard = SINK_MANAGER.lock().await;
    if guard.is_none() {
        return Err(SinkError::NotInitialized);
    }
    Ok(MutexGuard::map(guard, |manager| {
        manager.get_or_insert_with(SinkManager::new)
    }))
}

/// Options for configuring a `SinkManager` instance
///
/// ```rust
/// use embassy_time::Duration;
/// use sinkbird::SinkManagerOptions;
///
/// let default_options = SinkManagerOptions::default();
/// assert_eq!(default_options.auto_connect_delay, Duration::from_millis(6000));
///
/// let eager = SinkManagerOptions {
///     auto_connect_delay: Duration::from_millis(1500),
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkManagerOptions {
    /// Delay between a preferred sink connecting on another profile and the
    /// automatic A2DP connect attempt
    pub auto_connect_delay: Duration,
}

impl Default for SinkManagerOptions {
    fn default() -> Self {
        Self {
            auto_connect_delay: Duration::from_millis(DEFAULT_AUTO_CONNECT_DELAY_MS),
        }
    }
}

/// Sink manager errors
///
/// Returned to the caller as-is; the manager never retries on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkError {
    /// Another sink is already connecting, connected, playing or disconnecting
    AlreadyBusy,
    /// The device is already in a state that makes the request meaningless
    AlreadyTerminal,
    /// No object path is known for the device
    UnknownDevice,
    /// The native stack rejected a connect, disconnect or property query
    NativeCallFailed,
    /// Malformed device address
    InvalidAddress,
    /// The priority store rejected the write
    StoreFailed,
    /// Too many devices tracked or pending
    TableFull,
    /// The global manager has not been initialized
    NotInitialized,
    /// The global manager was already initialized
    AlreadyInitialized,
    /// A string argument exceeds its fixed capacity
    TooLong,
    /// The request processor answered with a response of the wrong kind
    UnexpectedResponse,
}

impl core::fmt::Display for SinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::AlreadyBusy => "another sink is active",
            Self::AlreadyTerminal => "sink already in requested state",
            Self::UnknownDevice => "unknown device",
            Self::NativeCallFailed => "native call failed",
            Self::InvalidAddress => "invalid address",
            Self::StoreFailed => "priority store write failed",
            Self::TableFull => "sink table full",
            Self::NotInitialized => "SinkManager not initialized",
            Self::AlreadyInitialized => "SinkManager already initialized",
            Self::TooLong => "argument too long",
            Self::UnexpectedResponse => "unexpected response",
        })
    }
}

/// Adapter power state as broadcast by the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdapterState {
    /// Adapter is off
    Off,
    /// Adapter is powering on
    TurningOn,
    /// Adapter is on
    On,
    /// Adapter is powering off
    TurningOff,
}

/// External events dispatched into the manager
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkEvent {
    /// Adapter power state changed; `On` and `TurningOff` are acted upon
    AdapterStateChanged(AdapterState),
    /// Bonding state with a remote device changed
    BondStateChanged {
        /// Textual address as broadcast; malformed addresses are dropped
        address: AddressText,
        /// New bond state
        state: BondState,
    },
    /// A remote device connected on some profile
    RemoteDeviceConnected(BluetoothAddress),
    /// The native layer reported a sink property change
    SinkPropertyChanged {
        /// Object path of the remote device
        path: ObjectPath,
        /// The changed property
        property: SinkProperty,
    },
}

/// Capability a caller must hold for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Capability {
    /// Query access
    Read,
    /// Mutating access
    Admin,
}

/// API requests sent to the request processor
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    /// Request an A2DP connection to a sink
    ConnectSink(BluetoothAddress),
    /// Request disconnection of a sink
    DisconnectSink(BluetoothAddress),
    /// Sinks currently connected or playing
    GetConnectedSinks,
    /// Current state of a sink
    GetSinkState(BluetoothAddress),
    /// Stored priority of a sink
    GetSinkPriority(BluetoothAddress),
    /// Store the priority of a sink, address given as text
    SetSinkPriority(AddressText, SinkPriority),
    /// Current active sink counter
    GetActiveSinkCount,
}

impl Request {
    /// Capability the caller must have been granted before issuing this request
    ///
    /// Enforcement belongs to the caller's platform binding; the manager assumes
    /// every request it sees was authorized.
    #[must_use]
    pub const fn required_capability(&self) -> Capability {
        match self {
            Self::ConnectSink(_) | Self::DisconnectSink(_) | Self::SetSinkPriority(..) => {
                Capability::Admin
            }
            Self::GetConnectedSinks
            | Self::GetSinkState(_)
            | Self::GetSinkPriority(_)
            | Self::GetActiveSinkCount => Capability::Read,
        }
    }
}

/// API responses sent back from the request processor
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    /// Request accepted
    Done,
    /// Sinks currently connected or playing
    ConnectedSinks(Vec<BluetoothAddress, MAX_SINK_DEVICES>),
    /// Current state of a sink
    SinkState(SinkState),
    /// Stored priority of a sink
    SinkPriority(SinkPriority),
    /// Current active sink counter
    ActiveSinkCount(u32),
    /// Error occurred
    Error(SinkError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_manager_options_default() {
        let options = SinkManagerOptions::default();
        assert_eq!(options.auto_connect_delay, Duration::from_millis(6000));

        let manager = SinkManager::with_options(SinkManagerOptions {
            auto_connect_delay: Duration::from_millis(250),
        });
        assert_eq!(
            manager.options().auto_connect_delay,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_request_capabilities() {
        let addr = BluetoothAddress::new([0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC]);

        assert_eq!(
            Request::ConnectSink(addr).required_capability(),
            Capability::Admin
        );
        assert_eq!(
            Request::DisconnectSink(addr).required_capability(),
            Capability::Admin
        );
        assert_eq!(
            Request::SetSinkPriority(addr.format_hex(), SinkPriority::AUTO).required_capability(),
            Capability::Admin
        );
        assert_eq!(
            Request::GetConnectedSinks.required_capability(),
            Capability::Read
        );
        assert_eq!(
            Request::GetSinkState(addr).required_capability(),
            Capability::Read
        );
        assert_eq!(
            Request::GetSinkPriority(addr).required_capability(),
            Capability::Read
        );
        assert_eq!(
            Request::GetActiveSinkCount.required_capability(),
            Capability::Read
        );
    }

    #[test]
    fn test_sink_error_display() {
        use core::fmt::Write;

        let mut out: heapless::String<64> = heapless::String::new();
        write!(out, "{}", SinkError::AlreadyBusy).unwrap();
        assert_eq!(out.as_str(), "another sink is active");
    }
}
