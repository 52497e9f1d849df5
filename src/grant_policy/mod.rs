//! Default Permission Grant Policy
//!
//! Grants runtime permissions to platform components and to the default handler
//! applications so a freshly created user gets a usable device out of the box.
//!
//! The policy is a static sweep over the tables in [`permissions`], run against a
//! [`PackageRegistry`]:
//!
//! 1. System components and persistent privileged apps get every runtime
//!    permission they request, marked [`PermissionFlags::SYSTEM_FIXED`]
//! 2. Privileged installers and verifiers get their install permissions
//! 3. Each default handler (home, dialer, camera, ...) gets its permission groups
//! 4. Input methods, voice interaction services and location providers get theirs
//!
//! Steps 2 to 4 never touch a permission that already carries any flag: it was
//! set by the user, a device policy or the system and must not be clobbered.

pub mod permissions;
pub mod registry;

pub use permissions::{
    DEFAULT_HANDLER_GRANTS, HandlerIntent, PRIVILEGED_HANDLER_GRANTS, PackageProvider,
    PermissionGroup,
};
pub use registry::{
    PackageInfo, PackageName, PackageRegistry, PermissionFlags, PermissionName, UserId,
};

/// Grants issued by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GrantSummary {
    /// Runtime permissions granted and fixed for system components
    pub system_fixed: usize,
    /// Install permissions granted to installers and verifiers
    pub install: usize,
    /// Runtime permissions granted to default handlers and provided packages
    pub runtime: usize,
}

/// Grant the default permissions for a newly created `user`
pub fn grant_default_permissions<R: PackageRegistry>(registry: &R, user: UserId) -> GrantSummary {
    let mut policy = DefaultPermissionGrantPolicy::new(registry, user);
    policy.grant_to_system_components();
    policy.grant_to_default_handlers();
    info!(
        "[POLICY] User {}: {} fixed, {} install, {} runtime grants",
        user,
        policy.summary.system_fixed,
        policy.summary.install,
        policy.summary.runtime
    );
    policy.summary
}

/// One sweep of the policy for one user
pub struct DefaultPermissionGrantPolicy<'a, R> {
    registry: &'a R,
    user: UserId,
    summary: GrantSummary,
}

impl<'a, R: PackageRegistry> DefaultPermissionGrantPolicy<'a, R> {
    /// Prepare a sweep for `user`
    #[must_use]
    pub fn new(registry: &'a R, user: UserId) -> Self {
        Self {
            registry,
            user,
            summary: GrantSummary::default(),
        }
    }

    /// Grants issued so far
    #[must_use]
    pub fn summary(&self) -> GrantSummary {
        self.summary
    }

    /// Grant and fix every requested runtime permission of the system components
    pub fn grant_to_system_components(&mut self) {
        info!("[POLICY] Granting permissions to platform components");

        for name in self.registry.package_names() {
            let Some(package) = self.registry.package(&name) else {
                continue;
            };
            if !package.is_system_component() || !package.supports_runtime_permissions() {
                continue;
            }

            for permission in &package.requested_permissions {
                if !self.registry.is_runtime_permission(permission) {
                    continue;
                }
                let flags = self
                    .registry
                    .permission_flags(permission, &package.name, self.user);
                if flags.contains(PermissionFlags::SYSTEM_FIXED) {
                    continue;
                }
                self.registry
                    .grant_runtime_permission(&package.name, permission, self.user);
                self.registry.update_permission_flags(
                    permission,
                    &package.name,
                    PermissionFlags::MASK,
                    PermissionFlags::SYSTEM_FIXED,
                    self.user,
                );
                self.summary.system_fixed += 1;
                trace!(
                    "[POLICY] Granted {} to system component {}",
                    permission, package.name
                );
            }
        }
    }

    /// Grant the installer, verifier, default handler and provider permissions
    pub fn grant_to_default_handlers(&mut self) {
        info!("[POLICY] Granting permissions to default platform handlers");

        for (intent, group) in PRIVILEGED_HANDLER_GRANTS {
            for name in self.registry.query_handlers(intent, self.user) {
                if let Some(package) = self.privileged_package(&name) {
                    self.grant_install_permissions(&package, group);
                }
            }
        }

        for (intent, groups) in DEFAULT_HANDLER_GRANTS {
            let Some(package) = self.default_handler(intent) else {
                debug!("[POLICY] No system handler for {:?}", intent);
                continue;
            };
            self.grant_runtime_groups(&package, groups);
        }

        for provider in PackageProvider::ALL {
            for name in self.registry.provided_packages(provider, self.user) {
                if let Some(package) = self.system_package(&name) {
                    self.grant_runtime_groups(&package, provider.groups());
                }
            }
        }
    }

    /// Grant `permission` to `package` unless any flag is already set on it
    ///
    /// Returns whether the grant was issued.
    pub fn grant_permission_if_unset(&mut self, package: &str, permission: &str) -> bool {
        if !self
            .registry
            .permission_flags(permission, package, self.user)
            .is_empty()
        {
            return false;
        }
        self.registry
            .grant_runtime_permission(package, permission, self.user);
        self.summary.runtime += 1;
        trace!("[POLICY] Granted {} to default handler {}", permission, package);
        true
    }

    fn grant_runtime_groups(&mut self, package: &PackageInfo, groups: &[PermissionGroup]) {
        if !package.supports_runtime_permissions() {
            debug!("[POLICY] {} targets a legacy API level", package.name);
            return;
        }
        let requested = self.effective_package(package);
        for &group in groups {
            for permission in &requested.requested_permissions {
                if group.contains(permission) {
                    self.grant_permission_if_unset(&package.name, permission);
                }
            }
        }
    }

    fn grant_install_permissions(&mut self, package: &PackageInfo, group: PermissionGroup) {
        let requested = self.effective_package(package);
        for permission in &requested.requested_permissions {
            if !group.contains(permission) {
                continue;
            }
            let flags = self
                .registry
                .permission_flags(permission, &package.name, self.user);
            if flags.is_empty() {
                self.registry
                    .grant_install_permission(&package.name, permission);
                self.summary.install += 1;
                trace!("[POLICY] Granted install {} to {}", permission, package.name);
            }
        }
    }

    /// Updated system apps are judged by what their factory image requested
    fn effective_package(&self, package: &PackageInfo) -> PackageInfo {
        if package.updated_system {
            if let Some(factory) = self.registry.disabled_system_package(&package.name) {
                return factory;
            }
        }
        package.clone()
    }

    fn default_handler(&self, intent: HandlerIntent) -> Option<PackageInfo> {
        self.registry
            .query_handlers(intent, self.user)
            .iter()
            .find_map(|name| self.system_package(name))
    }

    fn system_package(&self, name: &str) -> Option<PackageInfo> {
        self.registry
            .package(name)
            .filter(|package| package.system && !package.is_system_component())
    }

    fn privileged_package(&self, name: &str) -> Option<PackageInfo> {
        self.registry
            .package(name)
            .filter(|package| package.privileged && !package.is_system_component())
    }
}
