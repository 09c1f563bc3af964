// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Remoting profile configuration.
//!
//! Supports both programmatic and file-based (TOML or JSON) configuration.
//! Keys are kebab-case, matching the management model:
//!
//! ```toml
//! [local-transport]
//! default-pass-by-value = true
//!
//! [profiles.default]
//! exclude-local-receiver = false
//! local-receiver-pass-by-value = true
//!
//! [[profiles.default.discovery.static-urls]]
//! abstract-type = "ejb"
//! abstract-type-authority = "node1"
//! attributes = { uri = "http://node1:8080", cluster = "ejb" }
//!
//! [[profiles.default.channel-options]]
//! name = "MAX_OUTBOUND_MESSAGES"
//! category = "remoting"
//! value = "1234"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration: local transport defaults plus named profiles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubsystemConfig {
    /// Defaults for the in-process transport providers.
    #[serde(default)]
    pub local_transport: LocalTransportConfig,

    /// Profiles keyed by name.
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

impl SubsystemConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Add a named profile.
    pub fn add_profile(&mut self, name: impl Into<String>, profile: ProfileConfig) {
        self.profiles.insert(name.into(), profile);
    }

    /// Validate the configuration.
    ///
    /// Only structural checks live here; endpoint URIs and channel option
    /// values are checked when a profile is assembled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, profile) in &self.profiles {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("Profile name is empty".into()));
            }
            profile
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("Profile '{}': {}", name, e)))?;
        }
        Ok(())
    }
}

/// Local transport provider defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LocalTransportConfig {
    /// Semantics of the default provider (profiles that leave
    /// `local-receiver-pass-by-value` unset).
    #[serde(default = "default_true")]
    pub default_pass_by_value: bool,
}

impl Default for LocalTransportConfig {
    fn default() -> Self {
        Self {
            default_pass_by_value: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    5000
}

/// Configuration snapshot for one profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProfileConfig {
    /// Static discovery entries.
    #[serde(default)]
    pub discovery: Option<DiscoveryConfig>,

    /// Disable the in-process fast path entirely.
    #[serde(default)]
    pub exclude_local_receiver: bool,

    /// Pass-by-value semantics for the in-process fast path
    /// (unset = use the default provider).
    #[serde(default)]
    pub local_receiver_pass_by_value: Option<bool>,

    /// Channel options applied to every connection of the profile.
    #[serde(default)]
    pub channel_options: Vec<ChannelOptionConfig>,

    /// Per-connection child resources.
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

impl ProfileConfig {
    /// Create an empty profile configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the exclude-local-receiver flag.
    pub fn exclude_local_receiver(mut self, excluded: bool) -> Self {
        self.exclude_local_receiver = excluded;
        self
    }

    /// Set pass-by-value semantics for the local receiver.
    pub fn pass_by_value(mut self, by_value: bool) -> Self {
        self.local_receiver_pass_by_value = Some(by_value);
        self
    }

    /// Append a static discovery entry.
    pub fn static_url(mut self, entry: StaticUrlConfig) -> Self {
        self.discovery
            .get_or_insert_with(DiscoveryConfig::default)
            .static_urls
            .push(entry);
        self
    }

    /// Append a channel option.
    pub fn channel_option(
        mut self,
        name: impl Into<String>,
        category: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.channel_options
            .push(ChannelOptionConfig::new(name, category, value));
        self
    }

    /// Append a connection child resource.
    pub fn connection(mut self, connection: ConnectionConfig) -> Self {
        self.connections.push(connection);
        self
    }

    /// Validate the profile structure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for (i, conn) in self.connections.iter().enumerate() {
            if conn.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Connection {} has empty name",
                    i
                )));
            }
            if conn.outbound_connection_ref.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Connection '{}' has empty outbound-connection-ref",
                    conn.name
                )));
            }
            if !names.insert(conn.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "Connection '{}' is defined twice",
                    conn.name
                )));
            }
        }
        Ok(())
    }
}

/// Discovery section of a profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiscoveryConfig {
    /// Ordered static entries (order drives discovery preference).
    #[serde(default, alias = "entries")]
    pub static_urls: Vec<StaticUrlConfig>,
}

/// One raw discovery entry.
///
/// The `uri` attribute is reserved and becomes the endpoint URI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StaticUrlConfig {
    /// Attribute name -> value.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Kind of remote capability offered.
    #[serde(default)]
    pub abstract_type: Option<String>,

    /// Authority qualifying the abstract type.
    #[serde(default)]
    pub abstract_type_authority: Option<String>,
}

impl StaticUrlConfig {
    /// Create a discovery entry with its URI and classification.
    pub fn new(
        uri: impl Into<String>,
        abstract_type: impl Into<String>,
        abstract_type_authority: impl Into<String>,
    ) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert("uri".to_string(), uri.into());
        Self {
            attributes,
            abstract_type: Some(abstract_type.into()),
            abstract_type_authority: Some(abstract_type_authority.into()),
        }
    }

    /// Add an attribute.
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// One raw channel option.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChannelOptionConfig {
    /// Option name, literal within its namespace (e.g. `TCP_NODELAY`).
    pub name: String,

    /// Option namespace tag (`remoting` or `xnio`).
    pub category: String,

    /// Raw value, parsed according to the option's declared type.
    pub value: String,
}

impl ChannelOptionConfig {
    /// Create a new channel option entry.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            value: value.into(),
        }
    }
}

/// Connection child resource of a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConnectionConfig {
    /// Connection name (unique within the profile).
    pub name: String,

    /// Name of the outbound connection this receiver uses.
    pub outbound_connection_ref: String,

    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Channel options for this connection only.
    #[serde(default)]
    pub channel_options: Vec<ChannelOptionConfig>,
}

impl ConnectionConfig {
    /// Create a connection with the default timeout and no options.
    pub fn new(name: impl Into<String>, outbound_connection_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outbound_connection_ref: outbound_connection_ref.into(),
            connect_timeout: default_connect_timeout(),
            channel_options: Vec::new(),
        }
    }

    /// Set the connect timeout (milliseconds).
    pub fn connect_timeout(mut self, millis: u64) -> Self {
        self.connect_timeout = millis;
        self
    }

    /// Append a channel option.
    pub fn channel_option(
        mut self,
        name: impl Into<String>,
        category: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.channel_options
            .push(ChannelOptionConfig::new(name, category, value));
        self
    }
}
