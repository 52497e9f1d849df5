//! `Sinkbird` API Functions
//!
//! Public functions for talking to the processor tasks started by
//! [`processor::run`](crate::processor::run). Requests go through the static
//! request/response channels; events are posted to the event channel and
//! applied in order by the event processor.
//!
//! Callers are expected to have checked the [`Capability`](crate::Capability)
//! of each [`Request`] before calling in.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sinkbird::{AdapterState, BluetoothAddress, api};
//!
//! // Feed stack events
//! api::adapter_state_changed(AdapterState::On).await;
//! api::bond_state_changed("00:1A:7D:DA:71:13", BondState::Bonded).await?;
//!
//! // Query and control sinks
//! let sinks = api::get_connected_sinks().await?;
//! if sinks.is_empty() {
//!     api::connect_sink(BluetoothAddress::try_from("00:1A:7D:DA:71:13")?).await?;
//! }
//! ```

use core::fmt::Write;

use crate::{
    AdapterState, AddressText, BluetoothAddress, BondState, EVENT_CHANNEL, ObjectPath,
    REQUEST_CHANNEL, RESPONSE_CHANNEL, Request, Response, SinkError, SinkEvent, SinkPriority,
    SinkProperty, SinkState, manager::SinkList, sink_manager,
};

async fn request(request: Request) -> Response {
    REQUEST_CHANNEL.sender().send(request).await;
    RESPONSE_CHANNEL.receiver().receive().await
}

/// Ask the stack to connect an A2DP sink.
///
/// Success means the request was accepted; watch the state change notifications
/// for the outcome.
///
/// # Errors
///
/// Returns an error if another sink is active, the device is already connected,
/// unknown to the stack, or the native connect was rejected.
pub async fn connect_sink(address: BluetoothAddress) -> Result<(), SinkError> {
    match request(Request::ConnectSink(address)).await {
        Response::Done => Ok(()),
        Response::Error(e) => Err(e),
        _ => Err(SinkError::UnexpectedResponse),
    }
}

/// Ask the stack to disconnect an A2DP sink.
///
/// # Errors
///
/// Returns an error if the device is unknown, already disconnected, or the native
/// disconnect was rejected.
pub async fn disconnect_sink(address: BluetoothAddress) -> Result<(), SinkError> {
    match request(Request::DisconnectSink(address)).await {
        Response::Done => Ok(()),
        Response::Error(e) => Err(e),
        _ => Err(SinkError::UnexpectedResponse),
    }
}

/// Get the sinks currently connected or playing.
///
/// # Errors
///
/// Returns an error if the manager is not running or the response is unexpected.
pub async fn get_connected_sinks() -> Result<SinkList, SinkError> {
    match request(Request::GetConnectedSinks).await {
        Response::ConnectedSinks(sinks) => Ok(sinks),
        Response::Error(e) => Err(e),
        _ => Err(SinkError::UnexpectedResponse),
    }
}

/// Get the current state of a sink; never tracked devices are disconnected.
///
/// # Errors
///
/// Returns an error if the manager is not running or the response is unexpected.
pub async fn get_sink_state(address: BluetoothAddress) -> Result<SinkState, SinkError> {
    match request(Request::GetSinkState(address)).await {
        Response::SinkState(state) => Ok(state),
        Response::Error(e) => Err(e),
        _ => Err(SinkError::UnexpectedResponse),
    }
}

/// Get the stored priority of a sink.
///
/// # Errors
///
/// Returns an error if the manager is not running or the response is unexpected.
pub async fn get_sink_priority(address: BluetoothAddress) -> Result<SinkPriority, SinkError> {
    match request(Request::GetSinkPriority(address)).await {
        Response::SinkPriority(priority) => Ok(priority),
        Response::Error(e) => Err(e),
        _ => Err(SinkError::UnexpectedResponse),
    }
}

/// Store the priority of a sink given its textual address.
///
/// # Errors
///
/// Returns an error if the address is malformed or the store rejected the write.
pub async fn set_sink_priority(address: &str, priority: SinkPriority) -> Result<(), SinkError> {
    let address = AddressText::try_from(address).map_err(|()| SinkError::InvalidAddress)?;
    match request(Request::SetSinkPriority(address, priority)).await {
        Response::Done => Ok(()),
        Response::Error(e) => Err(e),
        _ => Err(SinkError::UnexpectedResponse),
    }
}

/// Get the active sink counter.
///
/// # Errors
///
/// Returns an error if the manager is not running or the response is unexpected.
pub async fn get_active_sink_count() -> Result<u32, SinkError> {
    match request(Request::GetActiveSinkCount).await {
        Response::ActiveSinkCount(count) => Ok(count),
        Response::Error(e) => Err(e),
        _ => Err(SinkError::UnexpectedResponse),
    }
}

/// Write the diagnostic listing of tracked sinks.
///
/// Locks the manager directly instead of going through the request channel.
///
/// # Errors
///
/// Returns [`SinkError::NotInitialized`] if the manager was never initialized.
pub async fn dump<W: Write>(out: &mut W) -> Result<(), SinkError> {
    let manager = sink_manager().await?;
    if manager.dump(out).is_err() {
        warn!("[API] Sink dump truncated");
    }
    Ok(())
}

/// Post an external event for the event processor.
pub async fn post_event(event: SinkEvent) {
    EVENT_CHANNEL.sender().send(event).await;
}

/// The adapter power state changed.
pub async fn adapter_state_changed(state: AdapterState) {
    post_event(SinkEvent::AdapterStateChanged(state)).await;
}

/// Bonding with a device changed.
///
/// Syntactically invalid addresses that fit are still posted and dropped by the
/// manager with a log line.
///
/// # Errors
///
/// Returns [`SinkError::InvalidAddress`] if the address cannot even be carried.
pub async fn bond_state_changed(address: &str, state: BondState) -> Result<(), SinkError> {
    let address = AddressText::try_from(address).map_err(|()| SinkError::InvalidAddress)?;
    post_event(SinkEvent::BondStateChanged { address, state }).await;
    Ok(())
}

/// A remote device connected on some profile.
pub async fn remote_device_connected(address: BluetoothAddress) {
    post_event(SinkEvent::RemoteDeviceConnected(address)).await;
}

/// The native layer reported a sink property change.
///
/// # Errors
///
/// Returns [`SinkError::TooLong`] if the path, name or value exceeds its capacity.
pub async fn sink_property_changed(path: &str, name: &str, value: &str) -> Result<(), SinkError> {
    let path = ObjectPath::try_from(path).map_err(|()| SinkError::TooLong)?;
    let property = SinkProperty::new(name, value).ok_or(SinkError::TooLong)?;
    post_event(SinkEvent::SinkPropertyChanged { path, property }).await;
    Ok(())
}
