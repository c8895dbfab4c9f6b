// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// Generic step runner with audit, progress and failure handling.
pub mod runner;

/// The concrete pipeline steps.
pub mod steps;

use crate::config::settings::Settings;
use crate::domain::repositories::job_repository::JobRepository;
use crate::domain::repositories::storage_repository::{StorageError, StorageRepository};
use crate::domain::services::content_verifier::ContentVerifier;
use crate::domain::services::discovery_manager::DiscoveryManager;
use crate::domain::services::extraction::{ExtractionError, TariffExtractor};
use crate::engines::traits::{EngineError, FetchEngine};
use std::sync::Arc;
use thiserror::Error;

/// Collaborators available to every step. Constructed once at startup and
/// passed into the runner; there is no process-wide mutable state.
pub struct StepDeps {
    pub repo: Arc<dyn JobRepository>,
    pub discovery: Arc<DiscoveryManager>,
    pub verifier: Arc<ContentVerifier>,
    pub engine: Arc<dyn FetchEngine>,
    pub storage: Arc<dyn StorageRepository>,
    pub extractor: Arc<dyn TariffExtractor>,
    pub settings: Arc<Settings>,
}

/// Step error type.
#[derive(Error, Debug)]
pub enum StepError {
    /// Discovery terminated without candidates. A valid terminal state,
    /// distinct from crawl errors.
    #[error("no document found")]
    NoDocumentFound,

    /// Every verified candidate failed the confidence threshold.
    #[error("no candidate passed content verification ({tried} tried)")]
    VerificationExhausted { tried: usize },

    /// The downloaded document failed full-content verification.
    #[error("downloaded document failed verification (confidence {confidence:.2})")]
    VerificationFailed { confidence: f64 },

    /// Extracted data failed validation.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// A step depended on a context key no earlier step wrote.
    #[error("missing context key '{0}'")]
    MissingContext(&'static str),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("{0}")]
    Other(String),
}
