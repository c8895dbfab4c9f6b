// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::document::DataType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// A crawl job: one pipeline run against one DNO target.
///
/// The `context` bag is the only channel through which pipeline steps
/// communicate. A step may read any key another step wrote but must not
/// assume keys exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJob {
    /// Job identifier.
    pub id: Uuid,
    /// Target DNO; also the unit of crawl locking.
    pub dno_id: Uuid,
    /// DNO website the discovery starts from.
    pub website: String,
    /// Data type the job is after.
    pub data_type: DataType,
    /// Target year, when the job is year-specific.
    pub target_year: Option<i32>,
    /// Known document URL skipping discovery, when the operator provides one.
    pub hint_url: Option<String>,
    /// Lifecycle status.
    pub status: JobStatus,
    /// Percent complete; monotonically non-decreasing within one run.
    pub progress: u8,
    /// Label of the step currently executing.
    pub current_step: Option<String>,
    /// Open key-value bag mutated by steps.
    pub context: serde_json::Value,
    /// Failure message, composed by the pipeline runner.
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Job lifecycle status.
///
/// Transitions: Pending → Running → Completed/Failed/Cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// Domain error for invalid job state transitions.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid state transition")]
    InvalidStateTransition,
}

impl CrawlJob {
    pub fn new(
        dno_id: Uuid,
        website: impl Into<String>,
        data_type: DataType,
        target_year: Option<i32>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            dno_id,
            website: website.into(),
            data_type,
            target_year,
            hint_url: None,
            status: JobStatus::Pending,
            progress: 0,
            current_step: None,
            context: serde_json::json!({}),
            error_message: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    pub fn with_hint_url(mut self, hint_url: impl Into<String>) -> Self {
        self.hint_url = Some(hint_url.into());
        self
    }

    /// Move Pending → Running.
    pub fn start(&mut self) -> Result<(), DomainError> {
        match self.status {
            JobStatus::Pending => {
                self.status = JobStatus::Running;
                self.started_at = Some(Utc::now());
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// Move Running → Completed.
    pub fn complete(&mut self) -> Result<(), DomainError> {
        match self.status {
            JobStatus::Running => {
                self.status = JobStatus::Completed;
                self.completed_at = Some(Utc::now());
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// Mark the job failed. Valid from any non-terminal state so the
    /// recovery sweep can fail jobs that never left Pending.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Mark the job cancelled.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        match self.status {
            JobStatus::Pending | JobStatus::Running => {
                self.status = JobStatus::Cancelled;
                self.completed_at = Some(Utc::now());
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(DomainError::InvalidStateTransition),
        }
    }

    /// Write a value into the context bag.
    pub fn set_context(&mut self, key: &str, value: serde_json::Value) {
        if let Some(map) = self.context.as_object_mut() {
            map.insert(key.to_string(), value);
        } else {
            self.context = serde_json::json!({ key: value });
        }
        self.updated_at = Utc::now();
    }

    /// Read a value from the context bag.
    pub fn context_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.context.as_object().and_then(|map| map.get(key))
    }

    /// Read a string from the context bag.
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context_value(key).and_then(|v| v.as_str())
    }
}

/// Per-step audit record. One row per step execution, append-only; network
/// retries inside a step do not create additional rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlJobStep {
    pub id: Uuid,
    pub job_id: Uuid,
    pub step_name: String,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    /// Free-form result message or failure cause.
    pub details: Option<String>,
}

/// Sub-state of one step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Done,
    Failed,
}

impl CrawlJobStep {
    /// New record in Running state.
    pub fn started(job_id: Uuid, step_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            step_name: step_name.to_string(),
            status: StepStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration_seconds: None,
            details: None,
        }
    }

    pub fn finish_done(&mut self, duration_seconds: f64, details: Option<String>) {
        self.status = StepStatus::Done;
        self.completed_at = Some(Utc::now());
        self.duration_seconds = Some(duration_seconds);
        self.details = details;
    }

    pub fn finish_failed(&mut self, duration_seconds: f64, cause: String) {
        self.status = StepStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.duration_seconds = Some(duration_seconds);
        self.details = Some(cause);
    }
}
