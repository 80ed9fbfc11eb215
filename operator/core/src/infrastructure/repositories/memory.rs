// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-memory repository implementations for development and testing.
//! One `Arc<Mutex<HashMap>>` per aggregate; the assignment repository keeps
//! its assignment and step maps behind a single mutex so the snapshot write
//! and the duplicate-assignment check stay atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::alarm::{Alarm, AlarmId};
use crate::domain::directory::{Premise, PremiseId, User, UserId};
use crate::domain::guidance::{
    GuidanceAssignment, GuidanceTemplate, GuidanceTemplateId, IncidentGuidance,
    IncidentGuidanceStep, IncidentGuidanceStepId,
};
use crate::domain::incident::{Incident, IncidentId};
use crate::domain::repository::{
    AlarmRepository, AssignmentRepository, GuidanceTemplateRepository, IncidentRepository,
    PremiseRepository, RepositoryError, UserRepository,
};

fn poisoned() -> RepositoryError {
    RepositoryError::Database("mutex poisoned".to_string())
}

#[derive(Clone, Default)]
pub struct InMemoryAlarmRepository {
    alarms: Arc<Mutex<HashMap<AlarmId, Alarm>>>,
}

impl InMemoryAlarmRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlarmRepository for InMemoryAlarmRepository {
    async fn save(&self, alarm: &Alarm) -> Result<(), RepositoryError> {
        let mut alarms = self.alarms.lock().map_err(|_| poisoned())?;
        alarms.insert(alarm.id, alarm.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: AlarmId) -> Result<Option<Alarm>, RepositoryError> {
        let alarms = self.alarms.lock().map_err(|_| poisoned())?;
        Ok(alarms.get(&id).cloned())
    }

    async fn list(&self, status: Option<&str>) -> Result<Vec<Alarm>, RepositoryError> {
        let alarms = self.alarms.lock().map_err(|_| poisoned())?;
        let mut out: Vec<Alarm> = alarms
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        out.sort_by_key(|a| a.created_at);
        Ok(out)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryIncidentRepository {
    incidents: Arc<Mutex<HashMap<IncidentId, Incident>>>,
}

impl InMemoryIncidentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IncidentRepository for InMemoryIncidentRepository {
    async fn save(&self, incident: &Incident) -> Result<(), RepositoryError> {
        let mut incidents = self.incidents.lock().map_err(|_| poisoned())?;
        incidents.insert(incident.id, incident.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: IncidentId) -> Result<Option<Incident>, RepositoryError> {
        let incidents = self.incidents.lock().map_err(|_| poisoned())?;
        Ok(incidents.get(&id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryGuidanceTemplateRepository {
    templates: Arc<Mutex<HashMap<GuidanceTemplateId, GuidanceTemplate>>>,
}

impl InMemoryGuidanceTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GuidanceTemplateRepository for InMemoryGuidanceTemplateRepository {
    async fn save(&self, template: &GuidanceTemplate) -> Result<(), RepositoryError> {
        let mut templates = self.templates.lock().map_err(|_| poisoned())?;
        templates.insert(template.id, template.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: GuidanceTemplateId,
    ) -> Result<Option<GuidanceTemplate>, RepositoryError> {
        let templates = self.templates.lock().map_err(|_| poisoned())?;
        Ok(templates.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<GuidanceTemplate>, RepositoryError> {
        let templates = self.templates.lock().map_err(|_| poisoned())?;
        let mut out: Vec<GuidanceTemplate> = templates.values().cloned().collect();
        out.sort_by_key(|t| t.created_at);
        Ok(out)
    }
}

#[derive(Default)]
struct AssignmentState {
    assignments: HashMap<crate::domain::guidance::IncidentGuidanceId, IncidentGuidance>,
    steps: HashMap<IncidentGuidanceStepId, IncidentGuidanceStep>,
}

#[derive(Clone, Default)]
pub struct InMemoryAssignmentRepository {
    state: Arc<Mutex<AssignmentState>>,
}

impl InMemoryAssignmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn assignment_with_steps(
        state: &AssignmentState,
        guidance: &IncidentGuidance,
    ) -> GuidanceAssignment {
        let mut steps: Vec<IncidentGuidanceStep> = state
            .steps
            .values()
            .filter(|s| s.incident_guidance_id == guidance.id)
            .cloned()
            .collect();
        steps.sort_by_key(|s| s.step_number);
        GuidanceAssignment {
            guidance: guidance.clone(),
            steps,
        }
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryAssignmentRepository {
    async fn create_with_steps(
        &self,
        guidance: &IncidentGuidance,
        steps: &[IncidentGuidanceStep],
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        if state
            .assignments
            .values()
            .any(|g| g.incident_id == guidance.incident_id)
        {
            return Err(RepositoryError::Conflict(
                "incident already has guidance assigned".to_string(),
            ));
        }
        state.assignments.insert(guidance.id, guidance.clone());
        for step in steps {
            state.steps.insert(step.id, step.clone());
        }
        Ok(())
    }

    async fn find_by_incident(
        &self,
        incident_id: IncidentId,
    ) -> Result<Option<GuidanceAssignment>, RepositoryError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state
            .assignments
            .values()
            .find(|g| g.incident_id == incident_id)
            .map(|g| Self::assignment_with_steps(&state, g)))
    }

    async fn find_by_assignee(
        &self,
        assignee_id: UserId,
    ) -> Result<Vec<GuidanceAssignment>, RepositoryError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        let mut out: Vec<GuidanceAssignment> = state
            .assignments
            .values()
            .filter(|g| g.assignee_id == assignee_id)
            .map(|g| Self::assignment_with_steps(&state, g))
            .collect();
        out.sort_by_key(|a| a.guidance.assigned_at);
        Ok(out)
    }

    async fn find_step(
        &self,
        id: IncidentGuidanceStepId,
    ) -> Result<Option<IncidentGuidanceStep>, RepositoryError> {
        let state = self.state.lock().map_err(|_| poisoned())?;
        Ok(state.steps.get(&id).cloned())
    }

    async fn complete_step(
        &self,
        id: IncidentGuidanceStepId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.lock().map_err(|_| poisoned())?;
        match state.steps.get_mut(&id) {
            Some(step) if !step.is_completed => {
                step.is_completed = true;
                step.completed_at = Some(at);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RepositoryError::NotFound(
                "guidance step not found".to_string(),
            )),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<Mutex<HashMap<UserId, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: &User) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().map_err(|_| poisoned())?;
        if users
            .values()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(RepositoryError::Conflict(
                "user with this email already exists".to_string(),
            ));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.lock().map_err(|_| poisoned())?;
        Ok(users.get(&id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPremiseRepository {
    premises: Arc<Mutex<HashMap<PremiseId, Premise>>>,
}

impl InMemoryPremiseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PremiseRepository for InMemoryPremiseRepository {
    async fn save(&self, premise: &Premise) -> Result<(), RepositoryError> {
        let mut premises = self.premises.lock().map_err(|_| poisoned())?;
        premises.insert(premise.id, premise.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: PremiseId) -> Result<Option<Premise>, RepositoryError> {
        let premises = self.premises.lock().map_err(|_| poisoned())?;
        Ok(premises.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guidance_for(incident_id: IncidentId) -> IncidentGuidance {
        IncidentGuidance::new(
            incident_id,
            GuidanceTemplateId::new(),
            UserId::new(),
            UserId::new(),
        )
    }

    #[tokio::test]
    async fn second_assignment_for_same_incident_conflicts() {
        let repo = InMemoryAssignmentRepository::new();
        let incident_id = IncidentId::new();

        repo.create_with_steps(&guidance_for(incident_id), &[])
            .await
            .unwrap();
        let err = repo
            .create_with_steps(&guidance_for(incident_id), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn complete_step_is_conditional() {
        let repo = InMemoryAssignmentRepository::new();
        let incident_id = IncidentId::new();
        let guidance = guidance_for(incident_id);
        let step = IncidentGuidanceStep {
            id: IncidentGuidanceStepId::new(),
            incident_guidance_id: guidance.id,
            step_number: 1,
            title: "secure the area".to_string(),
            description: "clear bystanders".to_string(),
            is_completed: false,
            completed_at: None,
        };
        repo.create_with_steps(&guidance, std::slice::from_ref(&step))
            .await
            .unwrap();

        assert!(repo.complete_step(step.id, Utc::now()).await.unwrap());
        assert!(!repo.complete_step(step.id, Utc::now()).await.unwrap());

        let missing = repo
            .complete_step(IncidentGuidanceStepId::new(), Utc::now())
            .await;
        assert!(matches!(missing, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let repo = InMemoryUserRepository::new();
        let first = User::new(
            "ana".to_string(),
            "ana@example.com".to_string(),
            crate::domain::directory::Role::Guard,
        );
        let second = User::new(
            "other".to_string(),
            "ana@example.com".to_string(),
            crate::domain::directory::Role::Operator,
        );
        repo.save(&first).await.unwrap();
        assert!(matches!(
            repo.save(&second).await,
            Err(RepositoryError::Conflict(_))
        ));
    }
}
