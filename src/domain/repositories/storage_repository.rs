// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;

/// Storage error type.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Other(String),
}

/// Byte storage for downloaded documents.
#[async_trait]
pub trait StorageRepository: Send + Sync {
    /// Store `data` under `key` and return the resulting location (a local
    /// filesystem path for the local backend).
    async fn save(&self, key: &str, data: &[u8]) -> Result<String, StorageError>;

    /// Load the bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Whether `key` exists.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Remove `key`. Removing a missing key is a no-op.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
