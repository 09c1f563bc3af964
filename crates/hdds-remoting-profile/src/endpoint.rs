// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint descriptors built from static discovery entries.
//!
//! Pure transform: no I/O, no registry access. Descriptor order follows
//! configuration order because it drives discovery preference.
//!
//! The URI is validated as an absolute URI but kept exactly as configured:
//! [`EndpointDescriptor::uri_str`] and `Display` return the configured text,
//! [`EndpointDescriptor::uri`] the parsed (normalized) form.

use crate::config::{DiscoveryConfig, StaticUrlConfig};
use crate::error::{ProfileError, Result};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Reserved attribute name carrying the endpoint URI.
pub const URI_ATTRIBUTE: &str = "uri";

/// One discoverable remote service location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    raw_uri: String,
    uri: Url,
    abstract_type: String,
    abstract_type_authority: String,
    attributes: BTreeMap<String, String>,
}

impl EndpointDescriptor {
    /// Build a descriptor from one raw discovery entry.
    ///
    /// `entry` is the entry's position in the discovery list, reported in
    /// `MissingField` errors.
    pub fn from_config(entry: usize, config: &StaticUrlConfig) -> Result<Self> {
        let mut uri = None;
        let mut attributes = BTreeMap::new();

        for (name, value) in &config.attributes {
            if name == URI_ATTRIBUTE {
                let parsed = Url::parse(value).map_err(|source| ProfileError::MalformedEndpoint {
                    value: value.clone(),
                    source,
                })?;
                uri = Some((value.clone(), parsed));
            } else {
                attributes.insert(name.clone(), value.clone());
            }
        }

        let abstract_type = config
            .abstract_type
            .clone()
            .ok_or(ProfileError::MissingField {
                entry,
                field: "abstract-type",
            })?;
        let abstract_type_authority =
            config
                .abstract_type_authority
                .clone()
                .ok_or(ProfileError::MissingField {
                    entry,
                    field: "abstract-type-authority",
                })?;
        let (raw_uri, uri) = uri.ok_or(ProfileError::MissingField {
            entry,
            field: URI_ATTRIBUTE,
        })?;

        Ok(Self {
            raw_uri,
            uri,
            abstract_type,
            abstract_type_authority,
            attributes,
        })
    }

    /// Endpoint URI as configured.
    pub fn uri_str(&self) -> &str {
        &self.raw_uri
    }

    /// Parsed endpoint URI.
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Kind of remote capability offered (e.g. `ejb`).
    pub fn abstract_type(&self) -> &str {
        &self.abstract_type
    }

    /// Authority qualifying the abstract type.
    pub fn abstract_type_authority(&self) -> &str {
        &self.abstract_type_authority
    }

    /// Look up a plain attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// All plain attributes (never contains `uri`).
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Check whether this endpoint offers the given capability.
    pub fn matches(&self, abstract_type: &str, authority: &str) -> bool {
        self.abstract_type == abstract_type && self.abstract_type_authority == authority
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw_uri)
    }
}

/// Build the ordered descriptor list for a profile.
///
/// A missing discovery section yields an empty list.
pub fn build_endpoints(discovery: Option<&DiscoveryConfig>) -> Result<Vec<EndpointDescriptor>> {
    let Some(discovery) = discovery else {
        return Ok(Vec::new());
    };

    discovery
        .static_urls
        .iter()
        .enumerate()
        .map(|(i, entry)| EndpointDescriptor::from_config(i, entry))
        .collect()
}
