// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Adapter error types.

use std::path::PathBuf;

use tackle_api::CodecError;
use thiserror::Error;

/// Errors that can occur in the addon adapter.
#[derive(Debug, Error)]
pub enum AddonError {
    /// Configuration error (missing or invalid environment variable)
    #[error("configuration error: {0}")]
    Config(String),

    /// The injected secret could not be read
    #[error("cannot read secret {path}: {source}")]
    Secret {
        /// Path the secret was expected at
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Resource does not exist on the hub
    #[error("not found: {0}")]
    NotFound(String),

    /// Hub answered with a non-success status
    #[error("hub error: {status} - {message}")]
    Hub {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// The hub could not be reached
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Credential decryption failed
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Encrypted credentials were received but no passphrase was injected
    #[error("no passphrase available to decrypt credentials")]
    NoPassphrase,

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for adapter results.
pub type Result<T> = std::result::Result<T, AddonError>;
