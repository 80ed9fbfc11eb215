// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::directory::{Premise, PremiseId, Role, User};
use crate::domain::error::OperatorError;
use crate::domain::repository::{PremiseRepository, UserRepository};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePremiseRequest {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub parent_premise_id: Option<String>,
}

/// Users and premises are reference data for the orchestrator; this service
/// only carries the minimal write surface the flows need.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn create_user(&self, req: CreateUserRequest) -> Result<User, OperatorError>;

    async fn create_premise(&self, req: CreatePremiseRequest) -> Result<Premise, OperatorError>;
}

pub struct StandardDirectoryService {
    users: Arc<dyn UserRepository>,
    premises: Arc<dyn PremiseRepository>,
}

impl StandardDirectoryService {
    pub fn new(users: Arc<dyn UserRepository>, premises: Arc<dyn PremiseRepository>) -> Self {
        Self { users, premises }
    }
}

#[async_trait]
impl DirectoryService for StandardDirectoryService {
    async fn create_user(&self, req: CreateUserRequest) -> Result<User, OperatorError> {
        let user = User::new(req.name, req.email, req.role);
        // A duplicate email surfaces as Conflict through the repository.
        self.users
            .save(&user)
            .await
            .map_err(|e| OperatorError::database("create user", e))?;
        Ok(user)
    }

    async fn create_premise(&self, req: CreatePremiseRequest) -> Result<Premise, OperatorError> {
        let parent = match req.parent_premise_id.as_deref() {
            Some(raw) => {
                let id = Uuid::parse_str(raw)
                    .map(PremiseId)
                    .map_err(|_| OperatorError::bad_request("invalid parent premise id format"))?;
                self.premises
                    .find_by_id(id)
                    .await
                    .map_err(|e| OperatorError::database("get premise", e))?
                    .ok_or_else(|| OperatorError::not_found("parent premise not found"))?;
                Some(id)
            }
            None => None,
        };

        let premise = Premise::new(req.name, req.location, parent);
        self.premises
            .save(&premise)
            .await
            .map_err(|e| OperatorError::database("create premise", e))?;
        Ok(premise)
    }
}
