// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::directory::{Premise, PremiseId, Role, User, UserId};
use crate::domain::repository::{PremiseRepository, RepositoryError, UserRepository};

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn save(&self, user: &User) -> Result<(), RepositoryError> {
        // The unique index on email surfaces duplicates as Conflict through
        // the sqlx error conversion.
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                role = EXCLUDED.role
            "#,
        )
        .bind(user.id.0)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, role, created_at
            FROM users
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
        let role: String = row.get("role");
        let role: Role = role.parse().map_err(RepositoryError::Serialization)?;
        Ok(Some(User {
            id: UserId(row.get("id")),
            name: row.get("name"),
            email: row.get("email"),
            role,
            created_at: row.get("created_at"),
        }))
    }
}

pub struct PostgresPremiseRepository {
    pool: PgPool,
}

impl PostgresPremiseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PremiseRepository for PostgresPremiseRepository {
    async fn save(&self, premise: &Premise) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO premises (id, name, location, parent_premise_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                location = EXCLUDED.location
            "#,
        )
        .bind(premise.id.0)
        .bind(&premise.name)
        .bind(&premise.location)
        .bind(premise.parent_premise_id.map(|p| p.0))
        .bind(premise.created_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }

    async fn find_by_id(&self, id: PremiseId) -> Result<Option<Premise>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, location, parent_premise_id, created_at
            FROM premises
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(|row| {
            let parent: Option<uuid::Uuid> = row.get("parent_premise_id");
            Premise {
                id: PremiseId(row.get("id")),
                name: row.get("name"),
                location: row.get("location"),
                parent_premise_id: parent.map(PremiseId),
                created_at: row.get("created_at"),
            }
        }))
    }
}
