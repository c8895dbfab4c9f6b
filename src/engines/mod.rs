// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// Fetch engine abstraction and shared request/response types.
pub mod traits;

/// reqwest-backed fetch engine.
pub mod reqwest_engine;

/// SSRF validation.
pub mod validators;
