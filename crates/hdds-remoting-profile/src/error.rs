// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Profile assembly errors.
//!
//! Every variant is a validation-class failure detected before a profile
//! becomes visible in the registry. Nothing is retried automatically: the
//! caller fixes the configuration and submits a new operation.

use crate::config::ConfigError;
use crate::registry::RegistryError;
use thiserror::Error;

/// Errors raised while adding, removing or looking up remoting profiles.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile '{0}' is already registered")]
    DuplicateProfile(String),

    #[error("Malformed endpoint URI '{value}': {source}")]
    MalformedEndpoint {
        value: String,
        source: url::ParseError,
    },

    #[error("Discovery entry {entry} is missing required field '{field}'")]
    MissingField { entry: usize, field: &'static str },

    #[error("Unknown channel option category '{0}'")]
    UnknownOptionCategory(String),

    #[error("Unknown channel option '{name}' in category '{category}'")]
    UnknownOption { category: String, name: String },

    #[error("Invalid value '{value}' for channel option '{name}'")]
    InvalidOptionValue { name: String, value: String },

    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transaction is no longer open")]
    TransactionClosed,
}

/// Result type for profile operations.
pub type Result<T> = std::result::Result<T, ProfileError>;
