// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::alarm::{AlarmId, Severity};
use crate::domain::incident::{Incident, IncidentId, IncidentStatus};
use crate::domain::repository::{IncidentRepository, RepositoryError};

pub struct PostgresIncidentRepository {
    pool: PgPool,
}

impl PostgresIncidentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn incident_from_row(row: &sqlx::postgres::PgRow) -> Result<Incident, RepositoryError> {
    let severity: String = row.get("severity");
    let severity: Severity = severity
        .parse()
        .map_err(RepositoryError::Serialization)?;
    let status: String = row.get("status");
    let status: IncidentStatus = status
        .parse()
        .map_err(RepositoryError::Serialization)?;

    Ok(Incident {
        id: IncidentId(row.get("id")),
        name: row.get("name"),
        description: row.get("description"),
        alarm_id: AlarmId(row.get("alarm_id")),
        severity,
        location: row.get("location"),
        status,
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl IncidentRepository for PostgresIncidentRepository {
    async fn save(&self, incident: &Incident) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO incidents (
                id, name, description, alarm_id, severity, location, status,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status
            "#,
        )
        .bind(incident.id.0)
        .bind(&incident.name)
        .bind(&incident.description)
        .bind(incident.alarm_id.0)
        .bind(incident.severity.as_str())
        .bind(&incident.location)
        .bind(incident.status.as_str())
        .bind(incident.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("failed to save incident: {e}")))?;

        Ok(())
    }

    async fn find_by_id(&self, id: IncidentId) -> Result<Option<Incident>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, alarm_id, severity, location, status,
                   created_at
            FROM incidents
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.as_ref().map(incident_from_row).transpose()
    }
}
