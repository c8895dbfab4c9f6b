// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// Job, step-audit and crawl-lock persistence seam.
pub mod job_repository;

/// Download byte storage seam.
pub mod storage_repository;
