//! Sink Manager - authoritative table of A2DP sinks
//!
//! [`SinkManager`] is a synchronous state machine. It owns the sink table, the
//! active sink counter and the pending auto-connect attempts, and turns external
//! events and API requests into state transitions with deterministic side
//! effects on the collaborators bundled in a [`SinkContext`].
//!
//! ## State ownership
//!
//! The table is event-sourced: [`SinkManager::connect_sink`] and
//! [`SinkManager::disconnect_sink`] only ask the native layer to act. The new
//! state is committed when the stack reports it back through
//! [`SinkManager::on_sink_property_changed`].
//!
//! ## Serialization
//!
//! Every operation takes `&mut self`. In the async shell the manager lives in
//! the global mutex (see [`crate::sink_manager`]), so events, requests and the
//! auto-connect timer never interleave and notifications are emitted in commit
//! order.

use core::fmt::Write;

use embassy_time::Instant;
use heapless::{FnvIndexMap, Vec};

use crate::{
    AdapterState, AdapterStack, BluetoothAddress, BondState, NotificationSink, PriorityStore,
    Request, Response, SinkContext, SinkError, SinkEvent, SinkManagerOptions, SinkPriority,
    SinkProperty, SinkState, TrackedState,
    constants::{MAX_SINK_DEVICES, PROPERTY_STATE},
    scheduler::AutoConnectScheduler,
};

/// Devices returned by table queries
pub type SinkList = Vec<BluetoothAddress, MAX_SINK_DEVICES>;

/// A2DP sink connection manager
///
/// ## Internal State
///
/// - `sinks`: every device seen supporting an audio role, with its last reported state
/// - `active_sink_count`: connected sinks, maintained by the transition function
/// - `auto_connect`: pending debounced connect attempts
#[derive(Debug)]
pub struct SinkManager {
    sinks: FnvIndexMap<BluetoothAddress, TrackedState, MAX_SINK_DEVICES>,
    active_sink_count: u32,
    auto_connect: AutoConnectScheduler,
    options: SinkManagerOptions,
}

impl Default for SinkManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkManager {
    /// Create a manager with default options
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(SinkManagerOptions::default())
    }

    /// Create a manager with the given options
    #[must_use]
    pub fn with_options(options: SinkManagerOptions) -> Self {
        Self {
            sinks: FnvIndexMap::new(),
            active_sink_count: 0,
            auto_connect: AutoConnectScheduler::new(options.auto_connect_delay),
            options,
        }
    }

    /// Options this manager was created with
    #[must_use]
    pub fn options(&self) -> SinkManagerOptions {
        self.options
    }

    /// Current value of the active sink counter
    #[must_use]
    pub fn active_sink_count(&self) -> u32 {
        self.active_sink_count
    }

    /// Earliest pending auto-connect deadline
    #[must_use]
    pub fn next_auto_connect_deadline(&self) -> Option<Instant> {
        self.auto_connect.next_deadline()
    }

    /// Whether an auto-connect attempt is pending for `address`
    #[must_use]
    pub fn is_auto_connect_pending(&self, address: BluetoothAddress) -> bool {
        self.auto_connect.is_pending(&address)
    }

    /// Dispatch an external event
    ///
    /// Returns `true` if the event scheduled (or moved) an auto-connect deadline.
    pub fn process_event<A, P, N>(
        &mut self,
        event: &SinkEvent,
        now: Instant,
        ctx: SinkContext<'_, A, P, N>,
    ) -> bool
    where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        match event {
            SinkEvent::AdapterStateChanged(AdapterState::On) => {
                self.on_adapter_enabled(ctx);
                false
            }
            SinkEvent::AdapterStateChanged(AdapterState::TurningOff) => {
                self.on_adapter_disabling(ctx);
                false
            }
            SinkEvent::AdapterStateChanged(state) => {
                trace!("[SINK] Ignoring adapter state {:?}", state);
                false
            }
            SinkEvent::BondStateChanged { address, state } => {
                self.on_bond_state_changed(address, *state, ctx);
                false
            }
            SinkEvent::RemoteDeviceConnected(address) => {
                self.on_remote_device_connected(*address, now, ctx)
            }
            SinkEvent::SinkPropertyChanged { path, property } => {
                self.on_sink_property_changed(path, property, ctx);
                false
            }
        }
    }

    /// Serve an API request
    pub fn process_request<A, P, N>(
        &mut self,
        request: &Request,
        ctx: SinkContext<'_, A, P, N>,
    ) -> Response
    where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        debug!("[SINK] Request: {:?}", request);
        let result = match request {
            Request::ConnectSink(address) => self.connect_sink(*address, ctx),
            Request::DisconnectSink(address) => self.disconnect_sink(*address, ctx),
            Request::SetSinkPriority(address, priority) => {
                self.set_sink_priority(address, *priority, ctx)
            }
            Request::GetConnectedSinks => return Response::ConnectedSinks(self.connected_sinks()),
            Request::GetSinkState(address) => return Response::SinkState(self.sink_state(*address)),
            Request::GetSinkPriority(address) => {
                return Response::SinkPriority(self.sink_priority(*address, ctx));
            }
            Request::GetActiveSinkCount => {
                return Response::ActiveSinkCount(self.active_sink_count);
            }
        };
        match result {
            Ok(()) => Response::Done,
            Err(e) => Response::Error(e),
        }
    }

    /// Adapter turned on: rebuild the table from the bonded devices
    pub fn on_adapter_enabled<A, P, N>(&mut self, ctx: SinkContext<'_, A, P, N>)
    where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        info!("[SINK] Adapter enabled, scanning bonded devices");
        self.active_sink_count = 0;

        for path in ctx.adapter.bonded_device_paths() {
            let Some(address) = ctx.adapter.address_from_path(&path) else {
                warn!("[SINK] No address for bonded device {}", path);
                continue;
            };
            if !ctx.is_a2dp_device(address) {
                continue;
            }
            if let Err(e) = self.add_audio_sink(address, ctx) {
                warn!("[SINK] Could not add audio device {}: {}", address, e);
            }
        }

        ctx.notifier.adapter_audio_enabled(true);
    }

    /// Adapter turning off: tear down every sink and forget the table
    pub fn on_adapter_disabling<A, P, N>(&mut self, ctx: SinkContext<'_, A, P, N>)
    where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        info!("[SINK] Adapter disabling, dropping {} devices", self.sinks.len());
        let tracked: Vec<(BluetoothAddress, TrackedState), MAX_SINK_DEVICES> = self
            .sinks
            .iter()
            .map(|(&address, &state)| (address, state))
            .collect();

        for (address, state) in tracked {
            match state.effective() {
                SinkState::Connecting | SinkState::Connected | SinkState::Playing => {
                    match ctx.adapter.path_from_address(address) {
                        Some(path) => {
                            if !ctx.adapter.disconnect_sink(&path) {
                                warn!("[SINK] Native disconnect of {} failed", address);
                            }
                        }
                        None => warn!("[SINK] No path to disconnect {}", address),
                    }
                }
                SinkState::Disconnecting => {}
                SinkState::Disconnected => continue,
            }
            self.transition(address, state, SinkState::Disconnected, ctx);
        }

        self.sinks.clear();
        ctx.notifier.adapter_audio_enabled(false);
    }

    /// Bonding with `address` changed: bonded devices become auto-connect candidates
    ///
    /// Malformed addresses and store failures are logged and dropped.
    pub fn on_bond_state_changed<A, P, N>(
        &mut self,
        address: &str,
        state: BondState,
        ctx: SinkContext<'_, A, P, N>,
    ) where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        let priority = match state {
            BondState::Bonded => SinkPriority::AUTO,
            BondState::Bonding | BondState::None => SinkPriority::OFF,
        };
        if let Err(e) = self.set_sink_priority(address, priority, ctx) {
            warn!("[SINK] Bond state change for {} dropped: {}", address, e);
        }
    }

    /// A remote device connected on some profile
    ///
    /// Preferred sinks get an auto-connect attempt after the configured delay.
    /// A device that is already pending has its deadline moved.
    pub fn on_remote_device_connected<A, P, N>(
        &mut self,
        address: BluetoothAddress,
        now: Instant,
        ctx: SinkContext<'_, A, P, N>,
    ) -> bool
    where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        if !ctx.priority(address).allows_auto_connect() || !ctx.is_sink_device(address) {
            trace!("[SINK] {} is not an auto-connect candidate", address);
            return false;
        }

        match self.auto_connect.schedule(address, now) {
            Ok(deadline) => {
                debug!(
                    "[SINK] Auto-connect to {} scheduled at {} ms",
                    address,
                    deadline.as_millis()
                );
                true
            }
            Err(e) => {
                warn!("[SINK] Could not schedule auto-connect to {}: {}", address, e);
                false
            }
        }
    }

    /// Fire every auto-connect attempt due at `now`
    ///
    /// Each attempt re-checks that the adapter is on, the device is still
    /// preferred and no sink is active. At most one native connect is issued
    /// per batch; the device it went to is returned.
    pub fn process_due_auto_connects<A, P, N>(
        &mut self,
        now: Instant,
        ctx: SinkContext<'_, A, P, N>,
    ) -> Option<BluetoothAddress>
    where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        let mut issued = None;
        for address in self.auto_connect.take_due(now) {
            if issued.is_some()
                || !ctx.adapter.is_enabled()
                || !ctx.priority(address).allows_auto_connect()
                || self.has_active_sink()
            {
                debug!("[SINK] Auto-connect to {} no longer applicable", address);
                continue;
            }

            info!("[SINK] Auto-connecting A2DP to sink {}", address);
            match self.connect_sink(address, ctx) {
                Ok(()) => issued = Some(address),
                Err(e) => warn!("[SINK] Auto-connect to {} failed: {}", address, e),
            }
        }
        issued
    }

    /// Ask the stack to connect `address`
    ///
    /// Only one sink may be active or activating at a time. Success means the
    /// request was accepted; the table changes once the stack reports the new state.
    ///
    /// # Errors
    ///
    /// - [`SinkError::AlreadyBusy`] if any sink is connecting, connected, playing or disconnecting
    /// - [`SinkError::AlreadyTerminal`] if the device turned out to be connected already
    /// - [`SinkError::UnknownDevice`] if the stack has no path for the device
    /// - [`SinkError::NativeCallFailed`] if the property query or the connect was rejected
    pub fn connect_sink<A, P, N>(
        &mut self,
        address: BluetoothAddress,
        ctx: SinkContext<'_, A, P, N>,
    ) -> Result<(), SinkError>
    where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        debug!("[SINK] connect_sink({})", address);
        if self.has_active_sink() {
            return Err(SinkError::AlreadyBusy);
        }

        let state = match self.sinks.get(&address) {
            Some(&state) => state,
            None => self.add_audio_sink(address, ctx)?,
        };

        match state.effective() {
            SinkState::Connected | SinkState::Playing | SinkState::Disconnecting => {
                Err(SinkError::AlreadyTerminal)
            }
            SinkState::Connecting => Ok(()),
            SinkState::Disconnected => {
                let path = ctx
                    .adapter
                    .path_from_address(address)
                    .ok_or(SinkError::UnknownDevice)?;
                if ctx.adapter.connect_sink(&path) {
                    Ok(())
                } else {
                    Err(SinkError::NativeCallFailed)
                }
            }
        }
    }

    /// Ask the stack to disconnect `address`
    ///
    /// # Errors
    ///
    /// - [`SinkError::UnknownDevice`] if the stack has no path for the device
    /// - [`SinkError::AlreadyTerminal`] if the device is disconnected
    /// - [`SinkError::NativeCallFailed`] if the disconnect was rejected
    pub fn disconnect_sink<A, P, N>(
        &mut self,
        address: BluetoothAddress,
        ctx: SinkContext<'_, A, P, N>,
    ) -> Result<(), SinkError>
    where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        debug!("[SINK] disconnect_sink({})", address);
        let path = ctx
            .adapter
            .path_from_address(address)
            .ok_or(SinkError::UnknownDevice)?;

        match self.sink_state(address) {
            SinkState::Disconnected => Err(SinkError::AlreadyTerminal),
            SinkState::Disconnecting => Ok(()),
            SinkState::Connecting | SinkState::Connected | SinkState::Playing => {
                if ctx.adapter.disconnect_sink(&path) {
                    Ok(())
                } else {
                    Err(SinkError::NativeCallFailed)
                }
            }
        }
    }

    /// Sinks currently connected or playing
    #[must_use]
    pub fn connected_sinks(&self) -> SinkList {
        self.sinks_matching(SinkState::is_connected)
    }

    /// Current state of `address`, disconnected if never tracked
    #[must_use]
    pub fn sink_state(&self, address: BluetoothAddress) -> SinkState {
        self.sinks
            .get(&address)
            .map_or(SinkState::Disconnected, |state| state.effective())
    }

    /// Stored priority of `address`
    pub fn sink_priority<A, P, N>(
        &self,
        address: BluetoothAddress,
        ctx: SinkContext<'_, A, P, N>,
    ) -> SinkPriority
    where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        ctx.priority(address)
    }

    /// Store the priority of the device at the textual `address`
    ///
    /// # Errors
    ///
    /// - [`SinkError::InvalidAddress`] if `address` is not `XX:XX:XX:XX:XX:XX`
    /// - [`SinkError::StoreFailed`] if the store rejected the write
    pub fn set_sink_priority<A, P, N>(
        &mut self,
        address: &str,
        priority: SinkPriority,
        ctx: SinkContext<'_, A, P, N>,
    ) -> Result<(), SinkError>
    where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        let address = BluetoothAddress::from_hex(address)?;
        if ctx.priorities.set_priority(address, priority) {
            debug!("[SINK] Priority of {} set to {}", address, priority);
            Ok(())
        } else {
            Err(SinkError::StoreFailed)
        }
    }

    /// The native layer reported a property change for the device at `path`
    pub fn on_sink_property_changed<A, P, N>(
        &mut self,
        path: &str,
        property: &SinkProperty,
        ctx: SinkContext<'_, A, P, N>,
    ) where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        if !ctx.adapter.is_enabled() {
            debug!("[SINK] Adapter off, dropping property change for {}", path);
            return;
        }

        let Some(address) = ctx.adapter.address_from_path(path) else {
            error!("[SINK] Property change for unknown path {}", path);
            return;
        };

        if property.name.as_str() != PROPERTY_STATE {
            trace!("[SINK] Ignoring property {} of {}", property.name, address);
            return;
        }

        let Some(&prev) = self.sinks.get(&address) else {
            // Inbound connection from a device we have not tracked yet
            info!("[SINK] Unsolicited sink state change from {}", address);
            if let Err(e) = self.add_audio_sink(address, ctx) {
                warn!("[SINK] Could not add audio device {}: {}", address, e);
            }
            return;
        };

        match SinkState::from_stack_str(&property.value) {
            Some(state) => self.transition(address, prev, state, ctx),
            None => {
                warn!(
                    "[SINK] Unrecognized state '{}' reported for {}",
                    property.value, address
                );
                // Invalid reads as disconnected
                self.transition(address, prev, SinkState::Disconnected, ctx);
                if let Some(entry) = self.sinks.get_mut(&address) {
                    *entry = TrackedState::Invalid;
                }
            }
        }
    }

    /// Write the tracked devices and their states, one per line
    ///
    /// Writes nothing when no device is tracked.
    ///
    /// # Errors
    ///
    /// Propagates writer failures.
    pub fn dump<W: Write>(&self, out: &mut W) -> core::fmt::Result {
        if self.sinks.is_empty() {
            return Ok(());
        }
        writeln!(out, "Cached audio devices:")?;
        for (address, state) in &self.sinks {
            writeln!(out, "{} {}", address, state.as_str())?;
        }
        Ok(())
    }

    fn has_active_sink(&self) -> bool {
        self.sinks.values().any(|state| state.effective().is_active())
    }

    fn sinks_matching(&self, predicate: impl Fn(SinkState) -> bool) -> SinkList {
        self.sinks
            .iter()
            .filter(|&(_, state)| predicate(state.effective()))
            .map(|(&address, _)| address)
            .collect()
    }

    /// Query the stack for the sink state of `address` and record it
    fn add_audio_sink<A, P, N>(
        &mut self,
        address: BluetoothAddress,
        ctx: SinkContext<'_, A, P, N>,
    ) -> Result<TrackedState, SinkError>
    where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        let path = ctx
            .adapter
            .path_from_address(address)
            .ok_or(SinkError::UnknownDevice)?;
        let Some(properties) = ctx.adapter.sink_properties(&path) else {
            error!("[SINK] Failed to read sink properties of {}", address);
            return Err(SinkError::NativeCallFailed);
        };

        let state = properties
            .iter()
            .find(|property| property.name.as_str() == PROPERTY_STATE)
            .map_or(TrackedState::Invalid, |property| {
                TrackedState::from_stack_str(&property.value)
            });

        match state {
            TrackedState::Known(state) => {
                let initial = TrackedState::Known(SinkState::Disconnected);
                self.record(address, initial)?;
                self.transition(address, initial, state, ctx);
            }
            TrackedState::Invalid => {
                warn!("[SINK] No usable sink state for {}", address);
                self.record(address, TrackedState::Invalid)?;
            }
        }
        debug!("[SINK] Tracking {} as {}", address, state.as_str());
        Ok(state)
    }

    fn record(&mut self, address: BluetoothAddress, state: TrackedState) -> Result<(), SinkError> {
        self.sinks
            .insert(address, state)
            .map(|_| ())
            .map_err(|_| SinkError::TableFull)
    }

    /// Commit `state` for an already tracked device and emit the side effects
    fn transition<A, P, N>(
        &mut self,
        address: BluetoothAddress,
        prev: TrackedState,
        state: SinkState,
        ctx: SinkContext<'_, A, P, N>,
    ) where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        if let Err(e) = self.apply_transition(address, prev, state, ctx) {
            error!("[SINK] Could not record {} for {}: {}", state, address, e);
        }
    }

    /// Move `address` from `prev` to `state`
    ///
    /// Leaving `Connected`/`Playing` for the disconnected family makes audio
    /// noisy and decrements the counter; entering `Connected` increments it. A state change notification follows
    /// the commit. Nothing happens if the state did not change.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::TableFull`] if `address` is new and the table is full;
    /// no side effect is emitted in that case.
    pub fn apply_transition<A, P, N>(
        &mut self,
        address: BluetoothAddress,
        prev: TrackedState,
        state: SinkState,
        ctx: SinkContext<'_, A, P, N>,
    ) -> Result<(), SinkError>
    where
        A: AdapterStack,
        P: PriorityStore,
        N: NotificationSink,
    {
        let prev_state = prev.effective();
        if prev_state == state {
            if prev == TrackedState::Invalid {
                self.record(address, state.into())?;
            }
            return Ok(());
        }

        self.record(address, state.into())?;

        if prev_state.is_connected() && state.is_disconnected() {
            ctx.notifier.audio_becoming_noisy();
            self.active_sink_count = self.active_sink_count.saturating_sub(1);
        } else if state == SinkState::Connected {
            self.active_sink_count += 1;
        }

        info!("[SINK] {}: {} -> {}", address, prev_state, state);
        ctx.notifier.sink_state_changed(address, prev_state, state);
        Ok(())
    }
}
