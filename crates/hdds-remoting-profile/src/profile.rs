// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Remoting profile assembly.
//!
//! [`ProfileAssembler::add_profile`] runs in two phases:
//!
//! 1. Synchronously: reserve the name, build endpoint descriptors, resolve
//!    the local transport dependency and compile channel options. Any
//!    failure aborts here and nothing is queued.
//! 2. Staged: one `Runtime` step per connection child compiles that
//!    connection into the profile's child model; a single `Install` step,
//!    which runs after every `Runtime` step of the transaction, builds the
//!    [`RemotingProfile`] and registers it.
//!
//! Child steps therefore never see an installed profile, and dependents
//! never see a partially wired one.
//!
//! # Add Operation States
//!
//! ```text
//! ReceivedConfig -> Validating -> Failed
//!                              -> AwaitingChildSteps -> Building -> Installed
//!                                                    |           -> Failed
//!                                                    -> Failed (rolled back)
//! ```

use crate::config::{ConfigError, ConnectionConfig, ProfileConfig};
use crate::endpoint::{build_endpoints, EndpointDescriptor};
use crate::error::{ProfileError, Result};
use crate::options::{compile, ChannelOptions};
use crate::registry::{
    RegistryError, ServiceDefinition, ServiceMode, ServiceName, ServiceRegistry, ServiceValue,
};
use crate::stage::{Stage, Step, StepContext, Transaction};
use crate::transport::{LocalTransportProvider, TransportDependency};
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Base name of every profile service.
pub const PROFILE_BASE: &str = "remoting.profile";

/// Service name of the profile called `name`.
pub fn profile_service_name(name: &str) -> ServiceName {
    ServiceName::of(PROFILE_BASE).append(name)
}

/// Compiled connection child resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    name: String,
    outbound_connection_ref: String,
    connect_timeout: Duration,
    channel_options: ChannelOptions,
}

impl ConnectionSpec {
    /// Compile a connection child resource.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            outbound_connection_ref: config.outbound_connection_ref.clone(),
            connect_timeout: Duration::from_millis(config.connect_timeout),
            channel_options: compile(&config.channel_options)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn outbound_connection_ref(&self) -> &str {
        &self.outbound_connection_ref
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn channel_options(&self) -> &ChannelOptions {
        &self.channel_options
    }
}

/// Installed remote client profile.
///
/// Immutable once registered, except for the local transport slot which
/// is written once when the profile's dependency comes up.
#[derive(Debug)]
pub struct RemotingProfile {
    name: String,
    endpoints: Vec<EndpointDescriptor>,
    transport: TransportDependency,
    channel_options: ChannelOptions,
    connections: Vec<ConnectionSpec>,
    local_transport: OnceLock<Arc<LocalTransportProvider>>,
}

impl RemotingProfile {
    /// Profile name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint descriptors, in discovery preference order.
    pub fn endpoints(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    /// Resolved local transport dependency.
    pub fn transport(&self) -> TransportDependency {
        self.transport
    }

    /// Profile-wide channel options.
    pub fn channel_options(&self) -> &ChannelOptions {
        &self.channel_options
    }

    /// Connections, in configuration order.
    pub fn connections(&self) -> &[ConnectionSpec] {
        &self.connections
    }

    /// Injected local transport provider (None if excluded or not yet up).
    pub fn local_transport(&self) -> Option<&Arc<LocalTransportProvider>> {
        self.local_transport.get()
    }

    fn inject_local_transport(&self, value: ServiceValue) {
        match value.downcast::<LocalTransportProvider>() {
            Ok(provider) => {
                if self.local_transport.set(provider).is_err() {
                    tracing::debug!("Profile '{}' already has a local transport", self.name);
                }
            }
            Err(_) => {
                tracing::warn!(
                    "Profile '{}': local transport dependency has unexpected type",
                    self.name
                );
            }
        }
    }
}

/// Progress of one add operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddState {
    ReceivedConfig,
    Validating,
    AwaitingChildSteps,
    Building,
    Installed,
    Failed,
}

impl AddState {
    /// Installed and Failed are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Installed | Self::Failed)
    }
}

/// Handle to an add operation.
#[derive(Debug, Clone)]
pub struct AddOperation {
    name: Arc<str>,
    state: Arc<Mutex<AddState>>,
}

impl AddOperation {
    fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            state: Arc::new(Mutex::new(AddState::ReceivedConfig)),
        }
    }

    /// Profile name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state.
    pub fn state(&self) -> AddState {
        *self.state.lock()
    }

    fn transition(&self, next: AddState) {
        let mut state = self.state.lock();
        tracing::trace!("Profile '{}': {:?} -> {:?}", self.name, *state, next);
        *state = next;
    }
}

/// Child model shared between the connection steps and the install step.
/// One slot per configured connection keeps configuration order.
type ChildModel = Arc<Mutex<Vec<Option<ConnectionSpec>>>>;

struct PreparedProfile {
    name: String,
    endpoints: Vec<EndpointDescriptor>,
    transport: TransportDependency,
    channel_options: ChannelOptions,
}

/// Deferred install step of one profile.
struct InstallProfileStep {
    operation: AddOperation,
    service_name: ServiceName,
    prepared: PreparedProfile,
    children: ChildModel,
}

impl InstallProfileStep {
    fn install(self, ctx: &mut StepContext<'_>) -> Result<()> {
        let Self {
            operation,
            service_name,
            prepared,
            children,
        } = self;

        operation.transition(AddState::Building);

        let connections: Vec<ConnectionSpec> =
            std::mem::take(&mut *children.lock()).into_iter().flatten().collect();

        let profile = Arc::new(RemotingProfile {
            name: prepared.name,
            endpoints: prepared.endpoints,
            transport: prepared.transport,
            channel_options: prepared.channel_options,
            connections,
            local_transport: OnceLock::new(),
        });

        let mut definition = ServiceDefinition::new(service_name.clone(), profile.clone())
            .initial_mode(ServiceMode::Active);
        if let Some(provider) = profile.transport.provider_name() {
            tracing::debug!("Profile '{}' depends on {}", profile.name, provider);
            let target = Arc::clone(&profile);
            definition = definition
                .add_injected_dependency(provider, move |value| target.inject_local_transport(value));
        }

        ctx.registry()
            .register_unique(definition)
            .map_err(|err| match err {
                RegistryError::AlreadyExists(_) => {
                    tracing::warn!("Profile '{}' is already registered", profile.name);
                    ProfileError::DuplicateProfile(profile.name.clone())
                }
                other => other.into(),
            })?;

        let installed = service_name.clone();
        ctx.on_rollback(move |registry| {
            if registry.remove(&installed).is_ok() {
                tracing::debug!("Rolled back {}", installed);
            }
        });

        tracing::info!(
            "Installed remoting profile '{}' ({} endpoints, {} connections, transport {:?})",
            profile.name,
            profile.endpoints.len(),
            profile.connections.len(),
            profile.transport
        );
        Ok(())
    }
}

impl Step for InstallProfileStep {
    fn describe(&self) -> String {
        format!("install {}", self.service_name)
    }

    fn execute(self: Box<Self>, ctx: &mut StepContext<'_>) -> Result<()> {
        let operation = self.operation.clone();
        let result = self.install(ctx);
        operation.transition(if result.is_ok() {
            AddState::Installed
        } else {
            AddState::Failed
        });
        result
    }

    fn discard(self: Box<Self>) {
        tracing::debug!("Install of profile '{}' discarded", self.operation.name());
        self.operation.transition(AddState::Failed);
    }
}

/// Assembles remoting profiles into a service registry.
#[derive(Clone)]
pub struct ProfileAssembler {
    registry: Arc<ServiceRegistry>,
}

impl ProfileAssembler {
    /// Create an assembler over `registry`.
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }

    /// Registry profiles are installed into.
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Add a profile within `tx`.
    ///
    /// Validation errors are returned immediately and leave `tx` untouched.
    /// Errors from connection children surface when the transaction runs.
    /// The profile becomes visible once the transaction's install stage ran.
    pub fn add_profile(
        &self,
        tx: &mut Transaction,
        name: &str,
        config: &ProfileConfig,
    ) -> Result<AddOperation> {
        let operation = AddOperation::new(name);
        operation.transition(AddState::Validating);

        let result = self
            .prepare(tx, name, config)
            .and_then(|prepared| self.schedule(tx, &operation, prepared, config));

        match result {
            Ok(()) => Ok(operation),
            Err(err) => {
                tracing::warn!("Rejected profile '{}': {}", name, err);
                operation.transition(AddState::Failed);
                Err(err)
            }
        }
    }

    fn prepare(
        &self,
        tx: &mut Transaction,
        name: &str,
        config: &ProfileConfig,
    ) -> Result<PreparedProfile> {
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid("Profile name is empty".into()).into());
        }

        let service_name = profile_service_name(name);
        if self.registry.contains(&service_name) {
            return Err(ProfileError::DuplicateProfile(name.to_string()));
        }

        let endpoints = build_endpoints(config.discovery.as_ref())?;
        let transport = TransportDependency::resolve(
            config.exclude_local_receiver,
            config.local_receiver_pass_by_value,
        );
        let channel_options = compile(&config.channel_options)?;

        // Reserve last so a rejected config does not block a corrected retry
        // within the same transaction.
        if !tx.reserve(service_name.as_str()) {
            return Err(ProfileError::DuplicateProfile(name.to_string()));
        }

        Ok(PreparedProfile {
            name: name.to_string(),
            endpoints,
            transport,
            channel_options,
        })
    }

    fn schedule(
        &self,
        tx: &mut Transaction,
        operation: &AddOperation,
        prepared: PreparedProfile,
        config: &ProfileConfig,
    ) -> Result<()> {
        let children: ChildModel = Arc::new(Mutex::new(vec![None; config.connections.len()]));

        for (slot, connection) in config.connections.iter().cloned().enumerate() {
            let model = Arc::clone(&children);
            let description = format!("connection {}/{}", prepared.name, connection.name);
            tx.add_step(
                Stage::Runtime,
                crate::stage::step(description, move |_ctx| {
                    let spec = ConnectionSpec::from_config(&connection)?;
                    if let Some(entry) = model.lock().get_mut(slot) {
                        *entry = Some(spec);
                    }
                    Ok(())
                }),
            )?;
        }

        tx.add_step(
            Stage::Install,
            Box::new(InstallProfileStep {
                operation: operation.clone(),
                service_name: profile_service_name(&prepared.name),
                prepared,
                children,
            }),
        )?;

        operation.transition(AddState::AwaitingChildSteps);
        Ok(())
    }

    /// Remove an installed profile.
    pub fn remove_profile(&self, name: &str) -> Result<()> {
        self.registry
            .remove(&profile_service_name(name))
            .map_err(|err| match err {
                RegistryError::NotFound(_) => ProfileError::ProfileNotFound(name.to_string()),
                other => other.into(),
            })?;
        tracing::info!("Removed remoting profile '{}'", name);
        Ok(())
    }

    /// Look up an installed profile.
    pub fn lookup(&self, name: &str) -> Result<Arc<RemotingProfile>> {
        self.registry
            .lookup(&profile_service_name(name))
            .ok()
            .and_then(|handle| handle.downcast::<RemotingProfile>())
            .ok_or_else(|| ProfileError::ProfileNotFound(name.to_string()))
    }

    /// Names of installed profiles, sorted.
    pub fn profile_names(&self) -> Vec<String> {
        let base = ServiceName::of(PROFILE_BASE);
        self.registry
            .names_under(&base)
            .iter()
            .filter_map(|name| name.suffix_after(&base).map(String::from))
            .collect()
    }
}
