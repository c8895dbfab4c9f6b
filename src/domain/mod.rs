// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// Core entities: documents, discovery results, jobs.
pub mod models;

/// Repository interfaces.
pub mod repositories;

/// Discovery, scoring and verification services.
pub mod services;
