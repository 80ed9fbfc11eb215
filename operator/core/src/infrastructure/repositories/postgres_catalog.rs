// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::guidance::{GuidanceStep, GuidanceStepId, GuidanceTemplate, GuidanceTemplateId};
use crate::domain::repository::{GuidanceTemplateRepository, RepositoryError};

pub struct PostgresGuidanceTemplateRepository {
    pool: PgPool,
}

impl PostgresGuidanceTemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn steps_for(
        &self,
        template_id: GuidanceTemplateId,
    ) -> Result<Vec<GuidanceStep>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, guidance_template_id, step_number, title, description
            FROM guidance_steps
            WHERE guidance_template_id = $1
            ORDER BY step_number ASC
            "#,
        )
        .bind(template_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| GuidanceStep {
                id: GuidanceStepId(row.get("id")),
                guidance_template_id: GuidanceTemplateId(row.get("guidance_template_id")),
                step_number: row.get("step_number"),
                title: row.get("title"),
                description: row.get("description"),
            })
            .collect())
    }
}

fn template_from_row(row: &sqlx::postgres::PgRow) -> GuidanceTemplate {
    GuidanceTemplate {
        id: GuidanceTemplateId(row.get("id")),
        name: row.get("name"),
        description: row.get("description"),
        category: row.get("category"),
        steps: Vec::new(),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl GuidanceTemplateRepository for PostgresGuidanceTemplateRepository {
    async fn save(&self, template: &GuidanceTemplate) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        sqlx::query(
            r#"
            INSERT INTO guidance_templates (id, name, description, category, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                category = EXCLUDED.category
            "#,
        )
        .bind(template.id.0)
        .bind(&template.name)
        .bind(&template.description)
        .bind(&template.category)
        .bind(template.created_at)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        // Replace the step set wholesale; templates are small and read-mostly.
        sqlx::query("DELETE FROM guidance_steps WHERE guidance_template_id = $1")
            .bind(template.id.0)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

        for step in &template.steps {
            sqlx::query(
                r#"
                INSERT INTO guidance_steps (
                    id, guidance_template_id, step_number, title, description
                )
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(step.id.0)
            .bind(step.guidance_template_id.0)
            .bind(step.step_number)
            .bind(&step.title)
            .bind(&step.description)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: GuidanceTemplateId,
    ) -> Result<Option<GuidanceTemplate>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, category, created_at
            FROM guidance_templates
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut template = template_from_row(&row);
        template.steps = self.steps_for(template.id).await?;
        Ok(Some(template))
    }

    async fn list_all(&self) -> Result<Vec<GuidanceTemplate>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, category, created_at
            FROM guidance_templates
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let mut templates = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut template = template_from_row(row);
            template.steps = self.steps_for(template.id).await?;
            templates.push(template);
        }
        Ok(templates)
    }
}
