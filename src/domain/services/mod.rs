// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// Bounded breadth-first site crawler.
pub mod bfs_crawler;

/// Content-based candidate verification.
pub mod content_verifier;

/// Discovery orchestration across strategies.
pub mod discovery_manager;

/// Extraction collaborator seam.
pub mod extraction;

/// Array-backed priority frontier.
pub mod frontier;

/// URL/link-text relevance scoring.
pub mod scorer;

/// sitemap.xml fast-path discovery.
pub mod sitemap;
