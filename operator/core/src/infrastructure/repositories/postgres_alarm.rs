// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Alarm Repository
//!
//! Production `AlarmRepository` implementation backed by the `alarms` table
//! via `sqlx`. Translates between the `Alarm` domain aggregate and the
//! relational schema.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::alarm::{Alarm, AlarmId, Severity};
use crate::domain::directory::PremiseId;
use crate::domain::repository::{AlarmRepository, RepositoryError};

pub struct PostgresAlarmRepository {
    pool: PgPool,
}

impl PostgresAlarmRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn alarm_from_row(row: &sqlx::postgres::PgRow) -> Result<Alarm, RepositoryError> {
    let severity: String = row.get("severity");
    let severity: Severity = severity
        .parse()
        .map_err(RepositoryError::Serialization)?;
    let premise_id: Option<uuid::Uuid> = row.get("premise_id");

    Ok(Alarm {
        id: AlarmId(row.get("id")),
        premise_id: premise_id.map(PremiseId),
        kind: row.get("kind"),
        description: row.get("description"),
        severity,
        status: row.get("status"),
        triggered_at: row.get("triggered_at"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl AlarmRepository for PostgresAlarmRepository {
    async fn save(&self, alarm: &Alarm) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO alarms (
                id, premise_id, kind, description, severity, status,
                triggered_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status
            "#,
        )
        .bind(alarm.id.0)
        .bind(alarm.premise_id.map(|p| p.0))
        .bind(&alarm.kind)
        .bind(&alarm.description)
        .bind(alarm.severity.as_str())
        .bind(&alarm.status)
        .bind(alarm.triggered_at)
        .bind(alarm.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("failed to save alarm: {e}")))?;

        Ok(())
    }

    async fn find_by_id(&self, id: AlarmId) -> Result<Option<Alarm>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, premise_id, kind, description, severity, status,
                   triggered_at, created_at
            FROM alarms
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.as_ref().map(alarm_from_row).transpose()
    }

    async fn list(&self, status: Option<&str>) -> Result<Vec<Alarm>, RepositoryError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    r#"
                    SELECT id, premise_id, kind, description, severity, status,
                           triggered_at, created_at
                    FROM alarms
                    WHERE status = $1
                    ORDER BY created_at ASC
                    "#,
                )
                .bind(status)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, premise_id, kind, description, severity, status,
                           triggered_at, created_at
                    FROM alarms
                    ORDER BY created_at ASC
                    "#,
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        rows.iter().map(alarm_from_row).collect()
    }
}
