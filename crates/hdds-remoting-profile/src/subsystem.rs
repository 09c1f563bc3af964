// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subsystem boot.
//!
//! Installs the local transport providers and every configured profile in a
//! single transaction. Any failure rolls the whole boot back and leaves the
//! registry as it was.

use crate::config::SubsystemConfig;
use crate::error::Result;
use crate::profile::{ProfileAssembler, RemotingProfile};
use crate::registry::ServiceRegistry;
use crate::stage::{step, Stage, Transaction};
use crate::transport::{LocalTransportProvider, PassMode};
use std::sync::Arc;

/// Booted remoting subsystem.
pub struct RemotingSubsystem {
    registry: Arc<ServiceRegistry>,
    assembler: ProfileAssembler,
}

impl RemotingSubsystem {
    /// Boot into a fresh registry.
    pub fn boot(config: &SubsystemConfig) -> Result<Self> {
        Self::boot_with_registry(Arc::new(ServiceRegistry::new()), config)
    }

    /// Boot into an existing registry.
    pub fn boot_with_registry(
        registry: Arc<ServiceRegistry>,
        config: &SubsystemConfig,
    ) -> Result<Self> {
        config.validate()?;

        let assembler = ProfileAssembler::new(Arc::clone(&registry));
        let mut tx = Transaction::new(Arc::clone(&registry));

        let default_mode = PassMode::from_flag(config.local_transport.default_pass_by_value);
        tx.add_step(
            Stage::Model,
            step("install local transport providers", move |ctx| {
                let installed = LocalTransportProvider::install_all(ctx.registry(), default_mode)?;
                ctx.on_rollback(move |registry| {
                    for name in &installed {
                        let _ = registry.remove(name);
                    }
                });
                Ok(())
            }),
        )?;

        for (name, profile) in &config.profiles {
            assembler.add_profile(&mut tx, name, profile)?;
        }

        tx.commit()?;
        tracing::info!(
            "Remoting subsystem booted ({} profiles, default local transport {:?})",
            config.profiles.len(),
            default_mode
        );

        Ok(Self {
            registry,
            assembler,
        })
    }

    /// Service registry.
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Profile assembler bound to this subsystem's registry.
    pub fn assembler(&self) -> &ProfileAssembler {
        &self.assembler
    }

    /// Look up an installed profile.
    pub fn profile(&self, name: &str) -> Result<Arc<RemotingProfile>> {
        self.assembler.lookup(name)
    }
}
