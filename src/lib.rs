// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// Configuration module
///
/// Settings loading and the named tuning knobs of the engine.
pub mod config;

/// Domain module
///
/// Core entities, discovery services and repository interfaces.
pub mod domain;

/// Engines module
///
/// Network fetch abstraction and its reqwest implementation.
pub mod engines;

/// Infrastructure module
///
/// Repository and storage implementations.
pub mod infrastructure;

/// Pipeline module
///
/// The multi-step job pipeline and its runner.
pub mod pipeline;

/// Queue module
///
/// Job queue feeding the pipeline worker.
pub mod queue;

/// Utilities module
///
/// URL handling, robots.txt, retries, politeness, telemetry.
pub mod utils;

/// Workers module
///
/// Background workers: pipeline consumer and crash recovery.
pub mod workers;
