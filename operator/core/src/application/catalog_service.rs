// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::error::OperatorError;
use crate::domain::guidance::{GuidanceTemplate, GuidanceTemplateId};
use crate::domain::repository::GuidanceTemplateRepository;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateStep {
    pub step_number: i32,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub steps: Vec<CreateTemplateStep>,
}

/// Read-side catalog of reusable guidance checklists.
#[async_trait]
pub trait GuidanceCatalogService: Send + Sync {
    async fn create_template(
        &self,
        req: CreateTemplateRequest,
    ) -> Result<GuidanceTemplate, OperatorError>;

    async fn get_template(&self, id: &str) -> Result<GuidanceTemplate, OperatorError>;

    async fn list_templates(&self) -> Result<Vec<GuidanceTemplate>, OperatorError>;
}

pub struct StandardGuidanceCatalogService {
    templates: Arc<dyn GuidanceTemplateRepository>,
}

impl StandardGuidanceCatalogService {
    pub fn new(templates: Arc<dyn GuidanceTemplateRepository>) -> Self {
        Self { templates }
    }
}

#[async_trait]
impl GuidanceCatalogService for StandardGuidanceCatalogService {
    async fn create_template(
        &self,
        req: CreateTemplateRequest,
    ) -> Result<GuidanceTemplate, OperatorError> {
        let mut template = GuidanceTemplate::new(req.name, req.description, req.category);
        for step in req.steps {
            template.push_step(step.step_number, step.title, step.description);
        }
        self.templates
            .save(&template)
            .await
            .map_err(|e| OperatorError::database("create guidance template", e))?;
        Ok(template)
    }

    async fn get_template(&self, id: &str) -> Result<GuidanceTemplate, OperatorError> {
        let id = Uuid::parse_str(id)
            .map(GuidanceTemplateId)
            .map_err(|_| OperatorError::bad_request("invalid guidance template id format"))?;
        self.templates
            .find_by_id(id)
            .await
            .map_err(|e| OperatorError::database("get guidance template", e))?
            .ok_or_else(|| OperatorError::not_found("guidance template not found"))
    }

    async fn list_templates(&self) -> Result<Vec<GuidanceTemplate>, OperatorError> {
        self.templates
            .list_all()
            .await
            .map_err(|e| OperatorError::database("list guidance templates", e))
    }
}
