// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// Per-host politeness limiter.
pub mod politeness;

/// Retry policy with exponential backoff and jitter.
pub mod retry_policy;

/// Robots.txt checking and caching.
pub mod robots;

/// Logging initialization.
pub mod telemetry;

/// URL normalization and resolution helpers.
pub mod url_utils;
