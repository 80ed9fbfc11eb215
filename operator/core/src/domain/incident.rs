// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::alarm::{AlarmId, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentId(pub Uuid);

impl IncidentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IncidentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Incident lifecycle. Transitions only move forward; there is no path back
/// out of `Resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    New,
    InProgress,
    Resolved,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::New => "new",
            IncidentStatus::InProgress => "in_progress",
            IncidentStatus::Resolved => "resolved",
        }
    }
}

impl std::str::FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(IncidentStatus::New),
            "in_progress" => Ok(IncidentStatus::InProgress),
            "resolved" => Ok(IncidentStatus::Resolved),
            other => Err(format!("unknown incident status: {other}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum IncidentTransitionError {
    #[error("incident is already resolved")]
    AlreadyResolved,
}

/// An operator-tracked response record derived from an alarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub name: String,
    pub description: String,
    pub alarm_id: AlarmId,
    pub severity: Severity,
    pub location: String,
    pub status: IncidentStatus,
    pub created_at: DateTime<Utc>,
}

impl Incident {
    pub fn new(
        alarm_id: AlarmId,
        name: String,
        description: String,
        severity: Severity,
        location: String,
    ) -> Self {
        Self {
            id: IncidentId::new(),
            name,
            description,
            alarm_id,
            severity,
            location,
            status: IncidentStatus::New,
            created_at: Utc::now(),
        }
    }

    /// Marks the incident as being worked. Idempotent for an incident that
    /// is already in progress.
    pub fn begin(&mut self) -> Result<(), IncidentTransitionError> {
        match self.status {
            IncidentStatus::New | IncidentStatus::InProgress => {
                self.status = IncidentStatus::InProgress;
                Ok(())
            }
            IncidentStatus::Resolved => Err(IncidentTransitionError::AlreadyResolved),
        }
    }

    pub fn resolve(&mut self) -> Result<(), IncidentTransitionError> {
        match self.status {
            IncidentStatus::New | IncidentStatus::InProgress => {
                self.status = IncidentStatus::Resolved;
                Ok(())
            }
            IncidentStatus::Resolved => Err(IncidentTransitionError::AlreadyResolved),
        }
    }
}
