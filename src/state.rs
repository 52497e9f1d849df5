//! Sink connection states, priorities and bond states

use core::fmt;

/// Connection state of an A2DP sink
///
/// Transitions are driven by the stack; there is no ordering between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkState {
    /// No A2DP connection
    Disconnected,
    /// Connection requested, waiting for the stack
    Connecting,
    /// A2DP connection established, no stream running
    Connected,
    /// Audio stream running
    Playing,
    /// Disconnection in progress
    Disconnecting,
}

impl SinkState {
    /// States that block a new connection attempt: some sink is active or activating
    pub const ACTIVE: [SinkState; 4] = [
        SinkState::Connecting,
        SinkState::Connected,
        SinkState::Playing,
        SinkState::Disconnecting,
    ];

    /// Parse the state string reported by the stack (case-insensitive)
    ///
    /// The stack never reports `disconnecting`; that state only exists locally.
    #[must_use]
    pub fn from_stack_str(value: &str) -> Option<Self> {
        [
            ("disconnected", Self::Disconnected),
            ("connecting", Self::Connecting),
            ("connected", Self::Connected),
            ("playing", Self::Playing),
        ]
        .into_iter()
        .find(|(name, _)| value.eq_ignore_ascii_case(name))
        .map(|(_, state)| state)
    }

    /// Name used in notifications and the diagnostic dump
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Playing => "playing",
            Self::Disconnecting => "disconnecting",
        }
    }

    /// `Connected` or `Playing`
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Playing)
    }

    /// `Disconnected` or `Disconnecting`
    #[must_use]
    pub const fn is_disconnected(self) -> bool {
        matches!(self, Self::Disconnected | Self::Disconnecting)
    }

    /// Any state other than `Disconnected`
    #[must_use]
    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the sink table records for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrackedState {
    /// A state reported by the stack
    Known(SinkState),
    /// The stack reported a state string we do not understand, or none at all
    Invalid,
}

impl TrackedState {
    /// The state queries report; an invalid entry counts as disconnected
    #[must_use]
    pub const fn effective(self) -> SinkState {
        match self {
            Self::Known(state) => state,
            Self::Invalid => SinkState::Disconnected,
        }
    }

    /// Parse a stack state string, falling back to the invalid sentinel
    #[must_use]
    pub fn from_stack_str(value: &str) -> Self {
        SinkState::from_stack_str(value).map_or(Self::Invalid, Self::Known)
    }

    /// Name used in the diagnostic dump
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Known(state) => state.as_str(),
            Self::Invalid => "invalid",
        }
    }
}

impl From<SinkState> for TrackedState {
    fn from(state: SinkState) -> Self {
        Self::Known(state)
    }
}

/// Persisted per-device auto-connect preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SinkPriority(pub i32);

impl SinkPriority {
    /// Never auto-connect; the default for unknown devices
    pub const OFF: Self = Self(0);
    /// Auto-connect when the device shows up; set when bonding completes
    pub const AUTO: Self = Self(100);

    /// Whether this priority makes the device eligible for auto-connect
    #[must_use]
    pub fn allows_auto_connect(self) -> bool {
        self > Self::OFF
    }
}

impl Default for SinkPriority {
    fn default() -> Self {
        Self::OFF
    }
}

impl fmt::Display for SinkPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bonding relationship with a remote device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BondState {
    /// Not bonded
    None,
    /// Bonding in progress
    Bonding,
    /// Bonded
    Bonded,
}
