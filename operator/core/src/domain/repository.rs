// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root, following the DDD
//! Repository pattern: one repository per aggregate, interface defined in the
//! domain layer, implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `AlarmRepository` | `Alarm` | `InMemoryAlarmRepository`, `PostgresAlarmRepository` |
//! | `IncidentRepository` | `Incident` | `InMemoryIncidentRepository`, `PostgresIncidentRepository` |
//! | `GuidanceTemplateRepository` | `GuidanceTemplate` | `InMemoryGuidanceTemplateRepository`, `PostgresGuidanceTemplateRepository` |
//! | `AssignmentRepository` | `IncidentGuidance` (+ snapshot steps) | `InMemoryAssignmentRepository`, `PostgresAssignmentRepository` |
//! | `UserRepository` | `User` | `InMemoryUserRepository`, `PostgresUserRepository` |
//! | `PremiseRepository` | `Premise` | `InMemoryPremiseRepository`, `PostgresPremiseRepository` |
//!
//! In-memory implementations are used for development and testing;
//! PostgreSQL implementations for production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::alarm::{Alarm, AlarmId};
use crate::domain::directory::{Premise, PremiseId, User, UserId};
use crate::domain::guidance::{
    GuidanceAssignment, GuidanceTemplate, GuidanceTemplateId, IncidentGuidance,
    IncidentGuidanceStep, IncidentGuidanceStepId,
};
use crate::domain::incident::{Incident, IncidentId};

#[async_trait]
pub trait AlarmRepository: Send + Sync {
    /// Save alarm (create or update)
    async fn save(&self, alarm: &Alarm) -> Result<(), RepositoryError>;

    /// Find alarm by ID
    async fn find_by_id(&self, id: AlarmId) -> Result<Option<Alarm>, RepositoryError>;

    /// List alarms, optionally filtered by status
    async fn list(&self, status: Option<&str>) -> Result<Vec<Alarm>, RepositoryError>;
}

#[async_trait]
pub trait IncidentRepository: Send + Sync {
    /// Save incident (create or update)
    async fn save(&self, incident: &Incident) -> Result<(), RepositoryError>;

    /// Find incident by ID
    async fn find_by_id(&self, id: IncidentId) -> Result<Option<Incident>, RepositoryError>;
}

#[async_trait]
pub trait GuidanceTemplateRepository: Send + Sync {
    /// Save template together with its ordered steps
    async fn save(&self, template: &GuidanceTemplate) -> Result<(), RepositoryError>;

    /// Find template by ID, steps included in step-number order
    async fn find_by_id(
        &self,
        id: GuidanceTemplateId,
    ) -> Result<Option<GuidanceTemplate>, RepositoryError>;

    /// List all templates
    async fn list_all(&self) -> Result<Vec<GuidanceTemplate>, RepositoryError>;
}

/// Repository for guidance assignments and their snapshot steps.
///
/// `create_with_steps` is the atomicity boundary for the snapshot: the
/// assignment row and every step row land together or not at all, and a
/// duplicate assignment for the incident fails with `Conflict` even under
/// concurrent callers.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn create_with_steps(
        &self,
        guidance: &IncidentGuidance,
        steps: &[IncidentGuidanceStep],
    ) -> Result<(), RepositoryError>;

    async fn find_by_incident(
        &self,
        incident_id: IncidentId,
    ) -> Result<Option<GuidanceAssignment>, RepositoryError>;

    async fn find_by_assignee(
        &self,
        assignee_id: UserId,
    ) -> Result<Vec<GuidanceAssignment>, RepositoryError>;

    async fn find_step(
        &self,
        id: IncidentGuidanceStepId,
    ) -> Result<Option<IncidentGuidanceStep>, RepositoryError>;

    /// Marks a step completed if and only if it is still pending. Returns
    /// `false` when the step was already completed, so two racing callers
    /// cannot both win.
    async fn complete_step(
        &self,
        id: IncidentGuidanceStepId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Save user; a duplicate email fails with `Conflict`
    async fn save(&self, user: &User) -> Result<(), RepositoryError>;

    /// Find user by ID
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
}

#[async_trait]
pub trait PremiseRepository: Send + Sync {
    /// Save premise (create or update)
    async fn save(&self, premise: &Premise) -> Result<(), RepositoryError>;

    /// Find premise by ID
    async fn find_by_id(&self, id: PremiseId) -> Result<Option<Premise>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.message().to_string())
            }
            other => RepositoryError::Database(other.to_string()),
        }
    }
}
