// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Assignment Repository
//!
//! Persists guidance assignments and their snapshot steps. The assignment
//! row and every step row are written in one transaction, and the unique
//! indexes on `incident_guidances` turn a duplicate assignment into a
//! `Conflict` instead of a second row, even under concurrent writers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::directory::UserId;
use crate::domain::guidance::{
    GuidanceAssignment, GuidanceTemplateId, IncidentGuidance, IncidentGuidanceId,
    IncidentGuidanceStep, IncidentGuidanceStepId,
};
use crate::domain::incident::IncidentId;
use crate::domain::repository::{AssignmentRepository, RepositoryError};

pub struct PostgresAssignmentRepository {
    pool: PgPool,
}

impl PostgresAssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn steps_for(
        &self,
        guidance_id: IncidentGuidanceId,
    ) -> Result<Vec<IncidentGuidanceStep>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, incident_guidance_id, step_number, title, description,
                   is_completed, completed_at
            FROM incident_guidance_steps
            WHERE incident_guidance_id = $1
            ORDER BY step_number ASC
            "#,
        )
        .bind(guidance_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(rows.iter().map(step_from_row).collect())
    }
}

fn guidance_from_row(row: &sqlx::postgres::PgRow) -> IncidentGuidance {
    IncidentGuidance {
        id: IncidentGuidanceId(row.get("id")),
        incident_id: IncidentId(row.get("incident_id")),
        guidance_template_id: GuidanceTemplateId(row.get("guidance_template_id")),
        assigner_id: UserId(row.get("assigner_id")),
        assignee_id: UserId(row.get("assignee_id")),
        assigned_at: row.get("assigned_at"),
    }
}

fn step_from_row(row: &sqlx::postgres::PgRow) -> IncidentGuidanceStep {
    IncidentGuidanceStep {
        id: IncidentGuidanceStepId(row.get("id")),
        incident_guidance_id: IncidentGuidanceId(row.get("incident_guidance_id")),
        step_number: row.get("step_number"),
        title: row.get("title"),
        description: row.get("description"),
        is_completed: row.get("is_completed"),
        completed_at: row.get("completed_at"),
    }
}

#[async_trait]
impl AssignmentRepository for PostgresAssignmentRepository {
    async fn create_with_steps(
        &self,
        guidance: &IncidentGuidance,
        steps: &[IncidentGuidanceStep],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        sqlx::query(
            r#"
            INSERT INTO incident_guidances (
                id, incident_id, guidance_template_id, assigner_id,
                assignee_id, assigned_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(guidance.id.0)
        .bind(guidance.incident_id.0)
        .bind(guidance.guidance_template_id.0)
        .bind(guidance.assigner_id.0)
        .bind(guidance.assignee_id.0)
        .bind(guidance.assigned_at)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        for step in steps {
            sqlx::query(
                r#"
                INSERT INTO incident_guidance_steps (
                    id, incident_guidance_id, step_number, title, description,
                    is_completed, completed_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(step.id.0)
            .bind(step.incident_guidance_id.0)
            .bind(step.step_number)
            .bind(&step.title)
            .bind(&step.description)
            .bind(step.is_completed)
            .bind(step.completed_at)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn find_by_incident(
        &self,
        incident_id: IncidentId,
    ) -> Result<Option<GuidanceAssignment>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, incident_id, guidance_template_id, assigner_id,
                   assignee_id, assigned_at
            FROM incident_guidances
            WHERE incident_id = $1
            "#,
        )
        .bind(incident_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let guidance = guidance_from_row(&row);
        let steps = self.steps_for(guidance.id).await?;
        Ok(Some(GuidanceAssignment { guidance, steps }))
    }

    async fn find_by_assignee(
        &self,
        assignee_id: UserId,
    ) -> Result<Vec<GuidanceAssignment>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, incident_id, guidance_template_id, assigner_id,
                   assignee_id, assigned_at
            FROM incident_guidances
            WHERE assignee_id = $1
            ORDER BY assigned_at ASC
            "#,
        )
        .bind(assignee_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut assignments = Vec::with_capacity(rows.len());
        for row in &rows {
            let guidance = guidance_from_row(row);
            let steps = self.steps_for(guidance.id).await?;
            assignments.push(GuidanceAssignment { guidance, steps });
        }
        Ok(assignments)
    }

    async fn find_step(
        &self,
        id: IncidentGuidanceStepId,
    ) -> Result<Option<IncidentGuidanceStep>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, incident_guidance_id, step_number, title, description,
                   is_completed, completed_at
            FROM incident_guidance_steps
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.as_ref().map(step_from_row))
    }

    async fn complete_step(
        &self,
        id: IncidentGuidanceStepId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE incident_guidance_steps
            SET is_completed = TRUE, completed_at = $2
            WHERE id = $1 AND is_completed = FALSE
            "#,
        )
        .bind(id.0)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Nothing updated: either the step is already completed or it does
        // not exist at all.
        let exists = sqlx::query("SELECT 1 FROM incident_guidance_steps WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        if exists.is_some() {
            Ok(false)
        } else {
            Err(RepositoryError::NotFound(
                "guidance step not found".to_string(),
            ))
        }
    }
}
