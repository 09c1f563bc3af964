// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Channel option compilation.
//!
//! Raw `(name, category, value)` triples become a typed [`ChannelOptions`]
//! set used when negotiating a channel. Categories map to fixed option
//! namespaces through a static table; each namespace declares the value type
//! of its options.

use crate::config::ChannelOptionConfig;
use crate::error::{ProfileError, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Option namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionNamespace {
    /// Remoting protocol options (channels, windows, messages, auth).
    Remoting,
    /// Socket/worker level options.
    Xnio,
}

/// Category tag -> namespace.
static CATEGORIES: &[(&str, OptionNamespace)] = &[
    ("remoting", OptionNamespace::Remoting),
    ("xnio", OptionNamespace::Xnio),
];

impl OptionNamespace {
    /// Resolve a configuration category tag.
    pub fn from_category(category: &str) -> Option<Self> {
        CATEGORIES
            .iter()
            .find(|(tag, _)| *tag == category)
            .map(|(_, ns)| *ns)
    }

    /// Category tag of this namespace.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Remoting => "remoting",
            Self::Xnio => "xnio",
        }
    }

    /// Declared options.
    pub fn definitions(&self) -> &'static [OptionDef] {
        match self {
            Self::Remoting => REMOTING_OPTIONS,
            Self::Xnio => XNIO_OPTIONS,
        }
    }

    /// Find an option definition by literal name.
    pub fn find(&self, name: &str) -> Option<&'static OptionDef> {
        self.definitions().iter().find(|def| def.name == name)
    }
}

/// Declared value type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Int,
    Long,
    Str,
    /// Comma separated strings.
    Sequence,
}

impl OptionKind {
    /// Parse a raw value (None on failure).
    pub fn parse(&self, raw: &str) -> Option<OptionValue> {
        let raw = raw.trim();
        match self {
            Self::Bool => {
                if raw.eq_ignore_ascii_case("true") {
                    Some(OptionValue::Bool(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Some(OptionValue::Bool(false))
                } else {
                    None
                }
            }
            Self::Int => raw.parse().ok().map(OptionValue::Int),
            Self::Long => raw.parse().ok().map(OptionValue::Long),
            Self::Str => Some(OptionValue::Str(raw.to_string())),
            Self::Sequence => Some(OptionValue::Sequence(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )),
        }
    }
}

/// One declared option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionDef {
    pub name: &'static str,
    pub kind: OptionKind,
}

const fn def(name: &'static str, kind: OptionKind) -> OptionDef {
    OptionDef { name, kind }
}

static REMOTING_OPTIONS: &[OptionDef] = &[
    def("MAX_INBOUND_CHANNELS", OptionKind::Int),
    def("MAX_OUTBOUND_CHANNELS", OptionKind::Int),
    def("TRANSMIT_WINDOW_SIZE", OptionKind::Int),
    def("RECEIVE_WINDOW_SIZE", OptionKind::Int),
    def("MAX_INBOUND_MESSAGES", OptionKind::Int),
    def("MAX_OUTBOUND_MESSAGES", OptionKind::Int),
    def("MAX_INBOUND_MESSAGE_SIZE", OptionKind::Long),
    def("MAX_OUTBOUND_MESSAGE_SIZE", OptionKind::Long),
    def("HEARTBEAT_INTERVAL", OptionKind::Int),
    def("AUTHENTICATION_RETRIES", OptionKind::Int),
    def("AUTH_REALM", OptionKind::Str),
    def("SERVER_NAME", OptionKind::Str),
    def("SASL_PROTOCOL", OptionKind::Str),
];

static XNIO_OPTIONS: &[OptionDef] = &[
    def("TCP_NODELAY", OptionKind::Bool),
    def("KEEP_ALIVE", OptionKind::Bool),
    def("REUSE_ADDRESSES", OptionKind::Bool),
    def("SSL_ENABLED", OptionKind::Bool),
    def("SSL_STARTTLS", OptionKind::Bool),
    def("SASL_POLICY_NOANONYMOUS", OptionKind::Bool),
    def("SASL_POLICY_NOPLAINTEXT", OptionKind::Bool),
    def("READ_TIMEOUT", OptionKind::Int),
    def("WRITE_TIMEOUT", OptionKind::Int),
    def("SEND_BUFFER", OptionKind::Int),
    def("RECEIVE_BUFFER", OptionKind::Int),
    def("WORKER_IO_THREADS", OptionKind::Int),
    def("CONNECTION_HIGH_WATER", OptionKind::Int),
    def("CONNECTION_LOW_WATER", OptionKind::Int),
    def("SASL_MECHANISMS", OptionKind::Sequence),
    def("SASL_DISALLOWED_MECHANISMS", OptionKind::Sequence),
];

/// Fully-qualified option identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OptionKey {
    pub namespace: OptionNamespace,
    pub name: &'static str,
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace.tag(), self.name)
    }
}

/// Parsed option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Str(String),
    Sequence(Vec<String>),
}

/// Compiled channel options (unique keys).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelOptions {
    entries: BTreeMap<OptionKey, OptionValue>,
}

impl ChannelOptions {
    /// Empty option set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get a value by namespace and literal name.
    pub fn get(&self, namespace: OptionNamespace, name: &str) -> Option<&OptionValue> {
        let def = namespace.find(name)?;
        self.entries.get(&OptionKey {
            namespace,
            name: def.name,
        })
    }

    /// Number of compiled options.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no option is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&OptionKey, &OptionValue)> {
        self.entries.iter()
    }

    fn set(&mut self, key: OptionKey, value: OptionValue) {
        if let Some(previous) = self.entries.insert(key, value) {
            tracing::debug!("Channel option {} overwritten (was {:?})", key, previous);
        }
    }
}

/// Compile raw option triples, in order. Later duplicates win.
pub fn compile(entries: &[ChannelOptionConfig]) -> Result<ChannelOptions> {
    let mut options = ChannelOptions::empty();

    for entry in entries {
        let namespace = OptionNamespace::from_category(&entry.category)
            .ok_or_else(|| ProfileError::UnknownOptionCategory(entry.category.clone()))?;

        let def = namespace
            .find(&entry.name)
            .ok_or_else(|| ProfileError::UnknownOption {
                category: entry.category.clone(),
                name: entry.name.clone(),
            })?;

        let value = def
            .kind
            .parse(&entry.value)
            .ok_or_else(|| ProfileError::InvalidOptionValue {
                name: entry.name.clone(),
                value: entry.value.clone(),
            })?;

        let key = OptionKey {
            namespace,
            name: def.name,
        };
        tracing::debug!("Channel option {} = {:?}", key, value);
        options.set(key, value);
    }

    Ok(options)
}
