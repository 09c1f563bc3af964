// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local transport selection.
//!
//! A profile either bypasses the in-process fast path entirely or depends on
//! one of three local transport provider services:
//!
//! | exclude | pass-by-value | outcome               |
//! |---------|---------------|-----------------------|
//! | true    | (ignored)     | `Excluded`            |
//! | false   | unset         | `DefaultProvider`     |
//! | false   | true          | `ByValueProvider`     |
//! | false   | false         | `ByReferenceProvider` |

use crate::registry::{RegistryError, ServiceDefinition, ServiceName, ServiceRegistry};
use std::sync::Arc;

/// Base name of the local transport provider services.
pub const LOCAL_TRANSPORT_BASE: &str = "local-transport";

/// Resolved local transport dependency of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportDependency {
    /// No in-process fast path.
    Excluded,
    /// Provider configured at subsystem level.
    DefaultProvider,
    /// Arguments are copied across the call.
    ByValueProvider,
    /// Arguments are shared by reference.
    ByReferenceProvider,
}

impl TransportDependency {
    /// Resolve the local transport policy. Total: never fails.
    pub fn resolve(exclude_local: bool, pass_by_value: Option<bool>) -> Self {
        match (exclude_local, pass_by_value) {
            (true, _) => Self::Excluded,
            (false, None) => Self::DefaultProvider,
            (false, Some(true)) => Self::ByValueProvider,
            (false, Some(false)) => Self::ByReferenceProvider,
        }
    }

    /// Service the profile depends on, if any.
    pub fn provider_name(&self) -> Option<ServiceName> {
        let base = ServiceName::of(LOCAL_TRANSPORT_BASE);
        match self {
            Self::Excluded => None,
            Self::DefaultProvider => Some(base.append("default")),
            Self::ByValueProvider => Some(base.append("by-value")),
            Self::ByReferenceProvider => Some(base.append("by-reference")),
        }
    }

    /// Check whether the local fast path is used.
    pub fn is_excluded(&self) -> bool {
        matches!(self, Self::Excluded)
    }
}

/// Argument passing semantics of an in-process call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    ByValue,
    ByReference,
}

impl PassMode {
    /// Mode for a pass-by-value flag.
    pub fn from_flag(by_value: bool) -> Self {
        if by_value {
            Self::ByValue
        } else {
            Self::ByReference
        }
    }
}

/// In-process delivery provider, shared read-only by every profile
/// depending on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTransportProvider {
    mode: PassMode,
}

impl LocalTransportProvider {
    /// Create a provider with the given semantics.
    pub fn new(mode: PassMode) -> Self {
        Self { mode }
    }

    /// Argument passing semantics.
    pub fn mode(&self) -> PassMode {
        self.mode
    }

    /// Register the by-value, by-reference and default providers.
    ///
    /// The default provider uses `default_mode`. Either all three are
    /// registered or none: a collision unregisters the ones already added.
    pub fn install_all(
        registry: &ServiceRegistry,
        default_mode: PassMode,
    ) -> Result<Vec<ServiceName>, RegistryError> {
        let services = [
            (TransportDependency::ByValueProvider, PassMode::ByValue),
            (TransportDependency::ByReferenceProvider, PassMode::ByReference),
            (TransportDependency::DefaultProvider, default_mode),
        ];

        let mut installed = Vec::with_capacity(services.len());
        for (dependency, mode) in services {
            let Some(name) = dependency.provider_name() else {
                continue;
            };
            let definition = ServiceDefinition::new(name.clone(), Arc::new(Self::new(mode)));
            if let Err(err) = registry.register_unique(definition) {
                for name in &installed {
                    let _ = registry.remove(name);
                }
                return Err(err);
            }
            tracing::debug!("Installed local transport provider {} ({:?})", name, mode);
            installed.push(name);
        }
        Ok(installed)
    }
}
