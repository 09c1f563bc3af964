// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service Registry
//!
//! Holds installed runtime services keyed by a globally unique
//! [`ServiceName`], together with their dependency edges.
//!
//! # Architecture
//!
//! ```text
//! ServiceRegistry
//! +-- services: DashMap<ServiceName, ServiceEntry>
//!
//! ServiceEntry
//! +-- value: Arc<dyn Any + Send + Sync>
//! +-- dependencies: Vec<Dependency>   (name + optional injector)
//! +-- mode: ServiceMode               (Active | Never)
//! +-- state: ServiceState             (Waiting | Up | Down)
//! ```
//!
//! # Lifecycle
//!
//! 1. `register_unique` -> atomic check-and-insert (entry API)
//! 2. Active service with every dependency Up -> injectors run, state Up
//! 3. Otherwise -> Waiting { missing }, started when the last dependency
//!    comes up
//! 4. `remove` -> entry dropped, Up dependents fall back to Waiting
//!
//! # Thread Safety
//!
//! - Registration/lookup on different names only contend on a shard lock
//! - State transitions (start, demotion on remove) are serialized by one
//!   lifecycle lock, so a start decision never races a concurrent
//!   registration or removal of a dependency
//! - No entry guard is held while another entry is read (avoids
//!   shard deadlocks)

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Type-erased service value.
pub type ServiceValue = Arc<dyn Any + Send + Sync>;

/// Callback receiving a dependency's value when the dependent starts.
pub type Injector = Box<dyn Fn(ServiceValue) + Send + Sync>;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Service already exists: {0}")]
    AlreadyExists(ServiceName),

    #[error("Service not found: {0}")]
    NotFound(ServiceName),
}

/// Dotted, globally unique service identity (e.g. `remoting.profile.default`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceName(Arc<str>);

impl ServiceName {
    /// Create a name from its dotted form.
    pub fn of(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Append one segment.
    pub fn append(&self, segment: &str) -> Self {
        Self(Arc::from(format!("{}.{}", self.0, segment)))
    }

    /// Check whether `self` is a direct or indirect child of `parent`.
    pub fn is_child_of(&self, parent: &ServiceName) -> bool {
        self.0.len() > parent.0.len()
            && self.0.starts_with(&*parent.0)
            && self.0.as_bytes()[parent.0.len()] == b'.'
    }

    /// Last-segment-relative suffix below `parent` (None if not a child).
    pub fn suffix_after(&self, parent: &ServiceName) -> Option<&str> {
        if self.is_child_of(parent) {
            Some(&self.0[parent.0.len() + 1..])
        } else {
            None
        }
    }

    /// Dotted string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceName({})", self.0)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Initial lifecycle mode of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    /// Start as soon as every dependency is up.
    Active,
    /// Registered but never started.
    Never,
}

/// Current lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    /// Waiting for the listed dependencies.
    Waiting { missing: Vec<ServiceName> },
    /// Started; injectors have run.
    Up,
    /// Not started (mode `Never`).
    Down,
}

/// Dependency edge from a service onto another one.
pub struct Dependency {
    name: ServiceName,
    injector: Option<Injector>,
}

impl Dependency {
    /// Target service name.
    pub fn name(&self) -> &ServiceName {
        &self.name
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("name", &self.name)
            .field("injector", &self.injector.as_ref().map(|_| "Fn(ServiceValue)"))
            .finish()
    }
}

/// Everything needed to register one service.
pub struct ServiceDefinition {
    name: ServiceName,
    value: ServiceValue,
    dependencies: Vec<Dependency>,
    mode: ServiceMode,
}

impl ServiceDefinition {
    /// Create a definition in `Active` mode with no dependencies.
    pub fn new(name: ServiceName, value: ServiceValue) -> Self {
        Self {
            name,
            value,
            dependencies: Vec::new(),
            mode: ServiceMode::Active,
        }
    }

    /// Add a plain dependency edge.
    pub fn add_dependency(mut self, name: ServiceName) -> Self {
        self.dependencies.push(Dependency {
            name,
            injector: None,
        });
        self
    }

    /// Add a dependency edge whose value is handed to `injector` on start.
    ///
    /// The injector runs while the registry holds its lifecycle lock and
    /// must not call back into the registry.
    pub fn add_injected_dependency<F>(mut self, name: ServiceName, injector: F) -> Self
    where
        F: Fn(ServiceValue) + Send + Sync + 'static,
    {
        self.dependencies.push(Dependency {
            name,
            injector: Some(Box::new(injector)),
        });
        self
    }

    /// Set the initial lifecycle mode.
    pub fn initial_mode(mut self, mode: ServiceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Service name.
    pub fn name(&self) -> &ServiceName {
        &self.name
    }
}

struct ServiceEntry {
    value: ServiceValue,
    dependencies: Vec<Dependency>,
    mode: ServiceMode,
    state: ServiceState,
}

/// Snapshot of a registered service.
#[derive(Clone)]
pub struct ServiceHandle {
    name: ServiceName,
    value: ServiceValue,
    state: ServiceState,
    dependencies: Vec<ServiceName>,
}

impl ServiceHandle {
    /// Service name.
    pub fn name(&self) -> &ServiceName {
        &self.name
    }

    /// Lifecycle state at the time of the snapshot.
    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    /// Dependency names, in declaration order.
    pub fn dependencies(&self) -> &[ServiceName] {
        &self.dependencies
    }

    /// Raw service value.
    pub fn value(&self) -> &ServiceValue {
        &self.value
    }

    /// Typed access to the service value.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Registry of installed services.
pub struct ServiceRegistry {
    services: DashMap<ServiceName, ServiceEntry>,
    /// Held while any service changes lifecycle state.
    lifecycle: Mutex<()>,
}

impl ServiceRegistry {
    /// Create new empty registry.
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
            lifecycle: Mutex::new(()),
        }
    }

    /// Register a service unless its name is already taken.
    ///
    /// Check and insert are one atomic operation.
    pub fn register_unique(
        &self,
        definition: ServiceDefinition,
    ) -> Result<ServiceHandle, RegistryError> {
        let ServiceDefinition {
            name,
            value,
            dependencies,
            mode,
        } = definition;

        let initial_state = match mode {
            ServiceMode::Active => ServiceState::Waiting {
                missing: dependencies.iter().map(|d| d.name.clone()).collect(),
            },
            ServiceMode::Never => ServiceState::Down,
        };

        match self.services.entry(name.clone()) {
            Entry::Occupied(_) => return Err(RegistryError::AlreadyExists(name)),
            Entry::Vacant(slot) => {
                slot.insert(ServiceEntry {
                    value,
                    dependencies,
                    mode,
                    state: initial_state,
                });
            }
        }

        tracing::debug!("Registered service {}", name);

        {
            let _lifecycle = self.lifecycle.lock();
            if self.try_start(&name) {
                self.start_dependents(&name);
            }
        }

        self.lookup(&name)
    }

    /// Look up a service.
    pub fn lookup(&self, name: &ServiceName) -> Result<ServiceHandle, RegistryError> {
        let entry = self
            .services
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.clone()))?;
        Ok(ServiceHandle {
            name: name.clone(),
            value: Arc::clone(&entry.value),
            state: entry.state.clone(),
            dependencies: entry.dependencies.iter().map(|d| d.name.clone()).collect(),
        })
    }

    /// Check whether a name is registered.
    pub fn contains(&self, name: &ServiceName) -> bool {
        self.services.contains_key(name)
    }

    /// Unregister a service.
    ///
    /// Dependents that were up go back to waiting on `name`.
    pub fn remove(&self, name: &ServiceName) -> Result<(), RegistryError> {
        let _lifecycle = self.lifecycle.lock();
        if self.services.remove(name).is_none() {
            return Err(RegistryError::NotFound(name.clone()));
        }

        for mut entry in self.services.iter_mut() {
            let depends_on_removed = entry.dependencies.iter().any(|d| &d.name == name);
            if depends_on_removed && entry.state == ServiceState::Up {
                tracing::debug!("Service {} lost dependency {}", entry.key(), name);
                entry.state = ServiceState::Waiting {
                    missing: vec![name.clone()],
                };
            }
        }

        tracing::debug!("Removed service {}", name);
        Ok(())
    }

    /// Names registered below `parent`, sorted.
    pub fn names_under(&self, parent: &ServiceName) -> Vec<ServiceName> {
        let mut names: Vec<_> = self
            .services
            .iter()
            .filter(|e| e.key().is_child_of(parent))
            .map(|e| e.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Start `name` if it is Active, waiting, and every dependency is up.
    ///
    /// Caller holds the lifecycle lock. Returns true when the service
    /// transitioned to Up.
    fn try_start(&self, name: &ServiceName) -> bool {
        let targets: Vec<ServiceName> = match self.services.get(name) {
            Some(entry) if matches!(entry.state, ServiceState::Waiting { .. }) => {
                entry.dependencies.iter().map(|d| d.name.clone()).collect()
            }
            _ => return false,
        };

        let mut missing = Vec::new();
        let mut values = Vec::with_capacity(targets.len());
        for target in &targets {
            match self.services.get(target) {
                Some(dep) if dep.state == ServiceState::Up => values.push(Arc::clone(&dep.value)),
                _ => missing.push(target.clone()),
            }
        }

        let Some(mut entry) = self.services.get_mut(name) else {
            return false;
        };
        if entry.mode != ServiceMode::Active
            || !matches!(entry.state, ServiceState::Waiting { .. })
        {
            return false;
        }
        if !missing.is_empty() {
            tracing::debug!("Service {} waiting on {:?}", name, missing);
            entry.state = ServiceState::Waiting { missing };
            return false;
        }

        for (dependency, value) in entry.dependencies.iter().zip(values) {
            if let Some(inject) = &dependency.injector {
                inject(value);
            }
        }
        entry.state = ServiceState::Up;
        tracing::debug!("Service {} is up", name);
        true
    }

    /// Start every waiting service that becomes satisfiable once `name` is up.
    ///
    /// Caller holds the lifecycle lock.
    fn start_dependents(&self, name: &ServiceName) {
        let mut started = vec![name.clone()];
        while let Some(current) = started.pop() {
            let waiting: Vec<ServiceName> = self
                .services
                .iter()
                .filter(|e| match &e.state {
                    ServiceState::Waiting { missing } => missing.contains(&current),
                    _ => false,
                })
                .map(|e| e.key().clone())
                .collect();

            for dependent in waiting {
                if self.try_start(&dependent) {
                    started.push(dependent);
                }
            }
        }
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
