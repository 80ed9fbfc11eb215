// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Guidance catalog and per-incident guidance assignments.
//!
//! A `GuidanceTemplate` is a reusable, ordered checklist. Assigning one to an
//! incident copies its steps into `IncidentGuidanceStep` rows scoped to the
//! assignment, so later template edits never change in-progress incidents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::directory::UserId;
use crate::domain::incident::IncidentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuidanceTemplateId(pub Uuid);

impl GuidanceTemplateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GuidanceTemplateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GuidanceTemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuidanceStepId(pub Uuid);

impl GuidanceStepId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GuidanceStepId {
    fn default() -> Self {
        Self::new()
    }
}

/// A catalog step. Template-level only; never tied to an incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceStep {
    pub id: GuidanceStepId,
    pub guidance_template_id: GuidanceTemplateId,
    pub step_number: i32,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceTemplate {
    pub id: GuidanceTemplateId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub steps: Vec<GuidanceStep>,
    pub created_at: DateTime<Utc>,
}

impl GuidanceTemplate {
    pub fn new(name: String, description: String, category: String) -> Self {
        Self {
            id: GuidanceTemplateId::new(),
            name,
            description,
            category,
            steps: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Appends a step and keeps the checklist in step-number order.
    pub fn push_step(&mut self, step_number: i32, title: String, description: String) {
        self.steps.push(GuidanceStep {
            id: GuidanceStepId::new(),
            guidance_template_id: self.id,
            step_number,
            title,
            description,
        });
        self.steps.sort_by_key(|s| s.step_number);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentGuidanceId(pub Uuid);

impl IncidentGuidanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IncidentGuidanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IncidentGuidanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentGuidanceStepId(pub Uuid);

impl IncidentGuidanceStepId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IncidentGuidanceStepId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IncidentGuidanceStepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The binding of one guidance template, with a specific assignee, to one
/// incident. Owns its snapshot steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentGuidance {
    pub id: IncidentGuidanceId,
    pub incident_id: IncidentId,
    pub guidance_template_id: GuidanceTemplateId,
    pub assigner_id: UserId,
    pub assignee_id: UserId,
    pub assigned_at: DateTime<Utc>,
}

impl IncidentGuidance {
    pub fn new(
        incident_id: IncidentId,
        guidance_template_id: GuidanceTemplateId,
        assigner_id: UserId,
        assignee_id: UserId,
    ) -> Self {
        Self {
            id: IncidentGuidanceId::new(),
            incident_id,
            guidance_template_id,
            assigner_id,
            assignee_id,
            assigned_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StepCompletionError {
    #[error("guidance step is already completed")]
    AlreadyCompleted,
}

/// A copy of a catalog step taken at assignment time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentGuidanceStep {
    pub id: IncidentGuidanceStepId,
    pub incident_guidance_id: IncidentGuidanceId,
    pub step_number: i32,
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl IncidentGuidanceStep {
    pub fn snapshot_of(incident_guidance_id: IncidentGuidanceId, step: &GuidanceStep) -> Self {
        Self {
            id: IncidentGuidanceStepId::new(),
            incident_guidance_id,
            step_number: step.step_number,
            title: step.title.clone(),
            description: step.description.clone(),
            is_completed: false,
            completed_at: None,
        }
    }

    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), StepCompletionError> {
        if self.is_completed {
            return Err(StepCompletionError::AlreadyCompleted);
        }
        self.is_completed = true;
        self.completed_at = Some(at);
        Ok(())
    }
}

/// Copies every step of the template into assignment-scoped rows, in
/// template step-number order.
pub fn snapshot_steps(
    incident_guidance_id: IncidentGuidanceId,
    template: &GuidanceTemplate,
) -> Vec<IncidentGuidanceStep> {
    let mut ordered: Vec<&GuidanceStep> = template.steps.iter().collect();
    ordered.sort_by_key(|s| s.step_number);
    ordered
        .into_iter()
        .map(|s| IncidentGuidanceStep::snapshot_of(incident_guidance_id, s))
        .collect()
}

/// An assignment together with its snapshot steps, as read back for
/// operators and assignees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceAssignment {
    pub guidance: IncidentGuidance,
    pub steps: Vec<IncidentGuidanceStep>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template_with_steps(numbers: &[i32]) -> GuidanceTemplate {
        let mut template = GuidanceTemplate::new(
            "intrusion response".to_string(),
            "perimeter intrusion checklist".to_string(),
            "security".to_string(),
        );
        for n in numbers {
            template.push_step(*n, format!("step {n}"), format!("do thing {n}"));
        }
        template
    }

    #[test]
    fn snapshot_copies_every_step_in_order() {
        let template = template_with_steps(&[3, 1, 2]);
        let assignment_id = IncidentGuidanceId::new();
        let steps = snapshot_steps(assignment_id, &template);

        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps.iter().map(|s| s.step_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(steps.iter().all(|s| !s.is_completed));
        assert!(steps.iter().all(|s| s.incident_guidance_id == assignment_id));
    }

    #[test]
    fn snapshot_is_detached_from_template() {
        let mut template = template_with_steps(&[1]);
        let steps = snapshot_steps(IncidentGuidanceId::new(), &template);
        template.steps[0].title = "edited later".to_string();
        assert_eq!(steps[0].title, "step 1");
    }

    #[test]
    fn step_completes_once() {
        let template = template_with_steps(&[1]);
        let mut step = snapshot_steps(IncidentGuidanceId::new(), &template).remove(0);

        step.complete(Utc::now()).unwrap();
        assert!(step.is_completed);
        assert!(step.completed_at.is_some());

        let first_completed_at = step.completed_at;
        assert!(step.complete(Utc::now()).is_err());
        assert_eq!(step.completed_at, first_completed_at);
    }
}
