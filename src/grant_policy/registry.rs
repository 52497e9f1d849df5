//! Package registry collaborator

use heapless::{String, Vec};

use super::{HandlerIntent, PackageProvider};
use crate::constants::{
    MAX_HANDLERS, MAX_PACKAGE_NAME_LENGTH, MAX_PACKAGES, MAX_PERMISSION_NAME_LENGTH,
    MAX_REQUESTED_PERMISSIONS,
};

/// Package name
pub type PackageName = String<MAX_PACKAGE_NAME_LENGTH>;

/// Permission name
pub type PermissionName = String<MAX_PERMISSION_NAME_LENGTH>;

/// Package names returned by registry queries
pub type PackageNames = Vec<PackageName, MAX_PACKAGES>;

/// Handlers resolved for an intent, in preference order
pub type HandlerNames = Vec<PackageName, MAX_HANDLERS>;

/// Android user identifier
pub type UserId = u32;

/// First uid handed to regular applications; lower app ids are system components
pub const FIRST_APPLICATION_UID: u32 = 10_000;

/// Uid range reserved per user
pub const PER_USER_RANGE: u32 = 100_000;

/// Highest target API level without runtime permissions
pub const LAST_INSTALL_TIME_PERMISSIONS_API: u32 = 22;

/// Per-user, per-package permission state flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PermissionFlags(pub u32);

impl PermissionFlags {
    /// Nothing recorded; the permission is still ours to grant
    pub const NONE: Self = Self(0);
    /// Set by the user
    pub const USER_SET: Self = Self(1 << 0);
    /// Fixed by the user
    pub const USER_FIXED: Self = Self(1 << 1);
    /// Fixed by device policy
    pub const POLICY_FIXED: Self = Self(1 << 2);
    /// Revoked on upgrade
    pub const REVOKE_ON_UPGRADE: Self = Self(1 << 3);
    /// Granted to a system component and not changeable
    pub const SYSTEM_FIXED: Self = Self(1 << 4);
    /// Every flag the policy may touch
    pub const MASK: Self = Self(0xFF);

    /// Whether every bit of `other` is set
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// No flag set
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// What the policy needs to know about an installed package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    /// Package name
    pub name: PackageName,
    /// Kernel uid of the package for the user being set up
    pub uid: u32,
    /// Declared target API level
    pub target_sdk: u32,
    /// Shipped on the system image
    pub system: bool,
    /// Installed in a privileged location
    pub privileged: bool,
    /// Kept running by the system
    pub persistent: bool,
    /// A system app updated from outside the system image
    pub updated_system: bool,
    /// Permissions declared in the manifest
    pub requested_permissions: Vec<PermissionName, MAX_REQUESTED_PERMISSIONS>,
}

impl PackageInfo {
    /// Application id, the uid without its user part
    #[must_use]
    pub const fn app_id(&self) -> u32 {
        self.uid % PER_USER_RANGE
    }

    /// Core system component, or a privileged app the system keeps running
    #[must_use]
    pub const fn is_system_component(&self) -> bool {
        self.app_id() < FIRST_APPLICATION_UID || (self.privileged && self.persistent)
    }

    /// Target API level opts into runtime permissions
    #[must_use]
    pub const fn supports_runtime_permissions(&self) -> bool {
        self.target_sdk > LAST_INSTALL_TIME_PERMISSIONS_API
    }
}

/// Package manager bridge used by the grant policy
///
/// Grants go straight to the registry; the policy keeps no state of its own.
pub trait PackageRegistry {
    /// Names of every installed package
    fn package_names(&self) -> PackageNames;

    /// Installed package by name
    fn package(&self, name: &str) -> Option<PackageInfo>;

    /// Factory version of an updated system package
    fn disabled_system_package(&self, name: &str) -> Option<PackageInfo>;

    /// Whether `permission` is a runtime (dangerous) permission
    fn is_runtime_permission(&self, permission: &str) -> bool;

    /// Packages handling `intent` for `user`, best match first
    fn query_handlers(&self, intent: HandlerIntent, user: UserId) -> HandlerNames;

    /// Packages supplied by `provider` for `user`; empty when no provider is registered
    fn provided_packages(&self, provider: PackageProvider, user: UserId) -> PackageNames;

    /// Current flags of `permission` for `package`
    fn permission_flags(&self, permission: &str, package: &str, user: UserId) -> PermissionFlags;

    /// Replace the flags selected by `mask`
    fn update_permission_flags(
        &self,
        permission: &str,
        package: &str,
        mask: PermissionFlags,
        flags: PermissionFlags,
        user: UserId,
    );

    /// Grant a runtime permission
    fn grant_runtime_permission(&self, package: &str, permission: &str, user: UserId);

    /// Grant an install-time permission
    fn grant_install_permission(&self, package: &str, permission: &str);
}
