// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Incident-guidance orchestration.
//!
//! The workflow: an incident is created from an existing alarm, a guidance
//! template is snapshotted onto it as assignment-scoped steps, and the
//! assignee completes steps one at a time. Completing all steps does not
//! resolve the incident; resolution is an explicit operator call.
//!
//! Unlike the alarm-create path, a notification-publish failure after a
//! successful assignment write is surfaced to the caller.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::alarm::{AlarmId, Severity};
use crate::domain::directory::UserId;
use crate::domain::error::OperatorError;
use crate::domain::events::{GuidanceAssigned, NOTIFICATION_TOPIC};
use crate::domain::guidance::{
    snapshot_steps, GuidanceAssignment, GuidanceTemplateId, IncidentGuidance, IncidentGuidanceId,
    IncidentGuidanceStep, IncidentGuidanceStepId,
};
use crate::domain::incident::{Incident, IncidentId};
use crate::domain::repository::{
    AlarmRepository, AssignmentRepository, GuidanceTemplateRepository, IncidentRepository,
    UserRepository,
};
use crate::domain::transport::EventPublisher;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIncidentRequest {
    pub name: String,
    pub description: String,
    pub alarm_id: String,
    pub severity: Severity,
    pub location: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignGuidanceRequest {
    pub guidance_template_id: String,
    pub assignee_id: String,
}

#[async_trait]
pub trait IncidentService: Send + Sync {
    async fn create_incident(&self, req: CreateIncidentRequest)
        -> Result<Incident, OperatorError>;

    async fn get_incident(&self, id: IncidentId) -> Result<Incident, OperatorError>;

    async fn assign_guidance(
        &self,
        incident_id: IncidentId,
        req: AssignGuidanceRequest,
        assigner: UserId,
    ) -> Result<GuidanceAssignment, OperatorError>;

    async fn complete_step(
        &self,
        assignment_id: IncidentGuidanceId,
        step_id: IncidentGuidanceStepId,
    ) -> Result<IncidentGuidanceStep, OperatorError>;

    async fn complete_incident(&self, id: IncidentId) -> Result<Incident, OperatorError>;

    async fn get_incident_guidance(
        &self,
        incident_id: IncidentId,
    ) -> Result<GuidanceAssignment, OperatorError>;

    async fn get_assignments(
        &self,
        assignee: UserId,
    ) -> Result<Vec<GuidanceAssignment>, OperatorError>;
}

pub struct StandardIncidentService {
    incidents: Arc<dyn IncidentRepository>,
    alarms: Arc<dyn AlarmRepository>,
    templates: Arc<dyn GuidanceTemplateRepository>,
    assignments: Arc<dyn AssignmentRepository>,
    users: Arc<dyn UserRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl StandardIncidentService {
    pub fn new(
        incidents: Arc<dyn IncidentRepository>,
        alarms: Arc<dyn AlarmRepository>,
        templates: Arc<dyn GuidanceTemplateRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        users: Arc<dyn UserRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            incidents,
            alarms,
            templates,
            assignments,
            users,
            publisher,
        }
    }
}

#[async_trait]
impl IncidentService for StandardIncidentService {
    async fn create_incident(
        &self,
        req: CreateIncidentRequest,
    ) -> Result<Incident, OperatorError> {
        let alarm_id = Uuid::parse_str(&req.alarm_id)
            .map(AlarmId)
            .map_err(|_| OperatorError::bad_request("invalid alarm id format"))?;

        // The originating alarm must exist, not merely parse.
        self.alarms
            .find_by_id(alarm_id)
            .await
            .map_err(|e| OperatorError::database("get alarm", e))?
            .ok_or_else(|| OperatorError::not_found("alarm not found"))?;

        let incident = Incident::new(
            alarm_id,
            req.name,
            req.description,
            req.severity,
            req.location,
        );
        self.incidents
            .save(&incident)
            .await
            .map_err(|e| OperatorError::database("create incident", e))?;
        Ok(incident)
    }

    async fn get_incident(&self, id: IncidentId) -> Result<Incident, OperatorError> {
        self.incidents
            .find_by_id(id)
            .await
            .map_err(|e| OperatorError::database("get incident", e))?
            .ok_or_else(|| OperatorError::not_found("incident not found"))
    }

    async fn assign_guidance(
        &self,
        incident_id: IncidentId,
        req: AssignGuidanceRequest,
        assigner: UserId,
    ) -> Result<GuidanceAssignment, OperatorError> {
        let mut incident = self.get_incident(incident_id).await?;

        let template_id = Uuid::parse_str(&req.guidance_template_id)
            .map(GuidanceTemplateId)
            .map_err(|_| OperatorError::bad_request("invalid guidance template id format"))?;
        let template = self
            .templates
            .find_by_id(template_id)
            .await
            .map_err(|e| OperatorError::database("get guidance template", e))?
            .ok_or_else(|| OperatorError::not_found("guidance template not found"))?;

        let assignee = Uuid::parse_str(&req.assignee_id)
            .map(UserId)
            .map_err(|_| OperatorError::bad_request("invalid assignee id format"))?;
        self.users
            .find_by_id(assignee)
            .await
            .map_err(|e| OperatorError::database("get assignee", e))?
            .ok_or_else(|| OperatorError::not_found("assignee not found"))?;

        incident
            .begin()
            .map_err(|e| OperatorError::Conflict(e.to_string()))?;

        let guidance = IncidentGuidance::new(incident_id, template_id, assigner, assignee);
        let steps = snapshot_steps(guidance.id, &template);

        // Assignment row and snapshot rows land in one storage transaction;
        // a duplicate assignment for this incident fails with Conflict here.
        self.assignments
            .create_with_steps(&guidance, &steps)
            .await
            .map_err(|e| OperatorError::database("assign guidance", e))?;

        self.incidents
            .save(&incident)
            .await
            .map_err(|e| OperatorError::database("update incident", e))?;

        let event = GuidanceAssigned {
            incident_id,
            incident_guidance_id: guidance.id,
            guidance_template_id: template_id,
            assignee_id: assignee,
            assigned_at: guidance.assigned_at,
        };
        let payload = serde_json::to_vec(&event)
            .map_err(|e| OperatorError::Internal(format!("failed to encode notification: {e}")))?;
        let key = incident_id.to_string();
        self.publisher
            .send(NOTIFICATION_TOPIC, key.as_bytes(), &payload)
            .await
            .map_err(|e| {
                OperatorError::Internal(format!("failed to publish assignment notification: {e}"))
            })?;

        info!(incident_id = %incident_id, guidance_id = %guidance.id, steps = steps.len(), "guidance assigned");
        Ok(GuidanceAssignment { guidance, steps })
    }

    async fn complete_step(
        &self,
        assignment_id: IncidentGuidanceId,
        step_id: IncidentGuidanceStepId,
    ) -> Result<IncidentGuidanceStep, OperatorError> {
        let mut step = self
            .assignments
            .find_step(step_id)
            .await
            .map_err(|e| OperatorError::database("get guidance step", e))?
            .ok_or_else(|| OperatorError::not_found("guidance step not found"))?;

        if step.incident_guidance_id != assignment_id {
            return Err(OperatorError::bad_request(
                "guidance step does not belong to this assignment",
            ));
        }
        if step.is_completed {
            return Err(OperatorError::bad_request("guidance step already completed"));
        }

        let now = Utc::now();
        let completed = self
            .assignments
            .complete_step(step_id, now)
            .await
            .map_err(|e| OperatorError::database("complete guidance step", e))?;
        if !completed {
            // Lost a race with another completion of the same step.
            return Err(OperatorError::bad_request("guidance step already completed"));
        }

        step.is_completed = true;
        step.completed_at = Some(now);
        Ok(step)
    }

    async fn complete_incident(&self, id: IncidentId) -> Result<Incident, OperatorError> {
        let mut incident = self.get_incident(id).await?;
        incident
            .resolve()
            .map_err(|e| OperatorError::bad_request(e.to_string()))?;
        self.incidents
            .save(&incident)
            .await
            .map_err(|e| OperatorError::database("update incident", e))?;
        Ok(incident)
    }

    async fn get_incident_guidance(
        &self,
        incident_id: IncidentId,
    ) -> Result<GuidanceAssignment, OperatorError> {
        self.assignments
            .find_by_incident(incident_id)
            .await
            .map_err(|e| OperatorError::database("get incident guidance", e))?
            .ok_or_else(|| OperatorError::not_found("incident has no guidance assigned"))
    }

    async fn get_assignments(
        &self,
        assignee: UserId,
    ) -> Result<Vec<GuidanceAssignment>, OperatorError> {
        self.assignments
            .find_by_assignee(assignee)
            .await
            .map_err(|e| OperatorError::database("get assignments", e))
    }
}
