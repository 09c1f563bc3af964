// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Remoting Profiles
//!
//! Staged assembly of remote client profiles: named bundles of discovery
//! endpoints, local transport policy, channel options and outbound
//! connections, installed into a service registry.
//!
//! # Features
//!
//! - **Static Discovery**: Endpoint descriptors built from configured URI entries
//! - **Local Transport**: In-process fast path selection (by value, by reference, excluded)
//! - **Channel Options**: Typed remoting/xnio options, resolved by category
//! - **Staged Install**: Profiles become visible only after their child steps ran
//!
//! # Quick Start
//!
//! ```no_run
//! use hdds_remoting_profile::{RemotingSubsystem, SubsystemConfig};
//!
//! let config = SubsystemConfig::from_file("remoting.toml")?;
//! let subsystem = RemotingSubsystem::boot(&config)?;
//! let profile = subsystem.profile("default")?;
//! for endpoint in profile.endpoints() {
//!     println!("{} -> {}", endpoint.abstract_type(), endpoint.uri());
//! }
//! # Ok::<(), hdds_remoting_profile::ProfileError>(())
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! [local-transport]
//! default-pass-by-value = true
//!
//! [profiles.default]
//! local-receiver-pass-by-value = false
//!
//! [[profiles.default.discovery.static-urls]]
//! abstract-type = "ejb"
//! abstract-type-authority = "node1"
//! attributes = { uri = "remote+http://node1:8080" }
//!
//! [[profiles.default.connections]]
//! name = "primary"
//! outbound-connection-ref = "node1-connection"
//! connect-timeout = 3000
//! ```

pub mod config;
pub mod endpoint;
pub mod error;
pub mod options;
pub mod profile;
pub mod registry;
pub mod stage;
pub mod subsystem;
pub mod transport;

pub use config::{
    ChannelOptionConfig, ConfigError, ConnectionConfig, DiscoveryConfig, LocalTransportConfig,
    ProfileConfig, StaticUrlConfig, SubsystemConfig,
};
pub use endpoint::{build_endpoints, EndpointDescriptor};
pub use error::{ProfileError, Result};
pub use options::{compile, ChannelOptions, OptionKey, OptionNamespace, OptionValue};
pub use profile::{
    profile_service_name, AddOperation, AddState, ConnectionSpec, ProfileAssembler,
    RemotingProfile, PROFILE_BASE,
};
pub use registry::{
    RegistryError, ServiceDefinition, ServiceHandle, ServiceMode, ServiceName, ServiceRegistry,
    ServiceState,
};
pub use stage::{step, Stage, Step, StepContext, Transaction, TransactionState};
pub use subsystem::RemotingSubsystem;
pub use transport::{LocalTransportProvider, PassMode, TransportDependency};
