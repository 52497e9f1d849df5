//! `Sinkbird` Constants
//!
//! Limits, default values and the stack-facing property names used throughout
//! the crate.

/// Capacity of the static event, request and response channels
pub const MAX_CHANNELS: usize = 8;

/// Maximum number of sink devices tracked at once (power of two for `FnvIndexMap`)
pub const MAX_SINK_DEVICES: usize = 8;

/// Maximum number of bonded device paths reported by the adapter
pub const MAX_BONDED_DEVICES: usize = 16;

/// Maximum number of service UUIDs reported for one remote device
pub const MAX_REMOTE_UUIDS: usize = 16;

/// Maximum number of name/value pairs in a sink property query
pub const MAX_SINK_PROPERTIES: usize = 8;

/// Maximum object path length in bytes
pub const MAX_OBJECT_PATH_LENGTH: usize = 64;

/// Maximum property name length in bytes
pub const MAX_PROPERTY_NAME_LENGTH: usize = 32;

/// Maximum property value length in bytes
pub const MAX_PROPERTY_VALUE_LENGTH: usize = 32;

/// Length of a `XX:XX:XX:XX:XX:XX` address string
pub const ADDRESS_STRING_LENGTH: usize = 17;

/// Delay between a remote device connecting and the automatic A2DP connect attempt.
/// Leaves room for other profiles (e.g. HFP) to connect first and absorbs collisions.
pub const DEFAULT_AUTO_CONNECT_DELAY_MS: u64 = 6000;

/// Name of the sink property carrying the connection state
pub const PROPERTY_STATE: &str = "State";

/// Prefix of the persisted per-device priority key
pub const PRIORITY_KEY_PREFIX: &str = "bluetooth_a2dp_sink_priority_";

/// Maximum persisted priority key length (prefix plus address)
pub const MAX_PRIORITY_KEY_LENGTH: usize = 48;

/// Capacity of the in-memory priority store (power of two for `FnvIndexMap`)
pub const MAX_STORED_PRIORITIES: usize = 16;

/// Maximum package name length in bytes
pub const MAX_PACKAGE_NAME_LENGTH: usize = 64;

/// Maximum permission name length in bytes
pub const MAX_PERMISSION_NAME_LENGTH: usize = 64;

/// Maximum number of permissions a package may request
pub const MAX_REQUESTED_PERMISSIONS: usize = 32;

/// Maximum number of packages returned by a registry query
pub const MAX_PACKAGES: usize = 32;

/// Maximum number of handlers resolved for one intent
pub const MAX_HANDLERS: usize = 8;
