// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the incident-guidance orchestrator:
//! 1. Incidents require an existing alarm
//! 2. Assigning guidance snapshots the template's steps in order
//! 3. Step completion is idempotent-reject and ownership-checked
//! 4. Duplicate assignment loses with Conflict, even under concurrency
//! 5. Publish-failure semantics differ between the alarm and assignment paths

use async_trait::async_trait;
use std::sync::Arc;

use vigil_core::application::alarm_service::{
    AlarmOrigin, AlarmService, CreateAlarmRequest, StandardAlarmService,
};
use vigil_core::application::catalog_service::{
    CreateTemplateRequest, GuidanceCatalogService, StandardGuidanceCatalogService,
};
use vigil_core::application::directory_service::{
    CreateUserRequest, DirectoryService, StandardDirectoryService,
};
use vigil_core::application::incident_service::{
    AssignGuidanceRequest, CreateIncidentRequest, IncidentService, StandardIncidentService,
};
use vigil_core::domain::alarm::{Alarm, Severity};
use vigil_core::domain::directory::{Role, User};
use vigil_core::domain::error::OperatorError;
use vigil_core::domain::guidance::{GuidanceTemplate, IncidentGuidanceId, IncidentGuidanceStepId};
use vigil_core::domain::incident::{Incident, IncidentStatus};
use vigil_core::domain::transport::{EventPublisher, TransportError};
use vigil_core::infrastructure::memory_log::MemoryLog;
use vigil_core::infrastructure::repositories::{
    InMemoryAlarmRepository, InMemoryAssignmentRepository, InMemoryGuidanceTemplateRepository,
    InMemoryIncidentRepository, InMemoryPremiseRepository, InMemoryUserRepository,
};

struct Stack {
    alarm_service: Arc<dyn AlarmService>,
    incident_service: Arc<dyn IncidentService>,
    catalog_service: Arc<dyn GuidanceCatalogService>,
    directory_service: Arc<dyn DirectoryService>,
}

fn stack_with_publisher(publisher: Arc<dyn EventPublisher>) -> Stack {
    let alarms = Arc::new(InMemoryAlarmRepository::new());
    let incidents = Arc::new(InMemoryIncidentRepository::new());
    let templates = Arc::new(InMemoryGuidanceTemplateRepository::new());
    let assignments = Arc::new(InMemoryAssignmentRepository::new());
    let users = Arc::new(InMemoryUserRepository::new());
    let premises = Arc::new(InMemoryPremiseRepository::new());

    Stack {
        alarm_service: Arc::new(StandardAlarmService::new(
            alarms.clone(),
            premises.clone(),
            publisher.clone(),
        )),
        incident_service: Arc::new(StandardIncidentService::new(
            incidents,
            alarms,
            templates.clone(),
            assignments,
            users.clone(),
            publisher,
        )),
        catalog_service: Arc::new(StandardGuidanceCatalogService::new(templates)),
        directory_service: Arc::new(StandardDirectoryService::new(users, premises)),
    }
}

fn stack() -> Stack {
    stack_with_publisher(Arc::new(MemoryLog::new().publisher()))
}

async fn seed_alarm(stack: &Stack) -> Alarm {
    let req: CreateAlarmRequest = serde_json::from_value(serde_json::json!({
        "type": "intrusion",
        "description": "fence sensor tripped",
        "severity": "high",
    }))
    .unwrap();
    stack
        .alarm_service
        .create_alarm(req, AlarmOrigin::Api)
        .await
        .unwrap()
}

async fn seed_incident(stack: &Stack) -> Incident {
    let alarm = seed_alarm(stack).await;
    stack
        .incident_service
        .create_incident(CreateIncidentRequest {
            name: "perimeter breach".to_string(),
            description: "intrusion at north fence".to_string(),
            alarm_id: alarm.id.to_string(),
            severity: Severity::High,
            location: "north gate".to_string(),
        })
        .await
        .unwrap()
}

async fn seed_template(stack: &Stack, step_count: i32) -> GuidanceTemplate {
    let steps = (1..=step_count)
        .map(|n| {
            serde_json::json!({
                "step_number": n,
                "title": format!("step {n}"),
                "description": format!("carry out step {n}"),
            })
        })
        .collect::<Vec<_>>();
    let req: CreateTemplateRequest = serde_json::from_value(serde_json::json!({
        "name": "intrusion response",
        "description": "standard perimeter response",
        "category": "security",
        "steps": steps,
    }))
    .unwrap();
    stack.catalog_service.create_template(req).await.unwrap()
}

async fn seed_user(stack: &Stack, email: &str, role: Role) -> User {
    stack
        .directory_service
        .create_user(CreateUserRequest {
            name: email.split('@').next().unwrap().to_string(),
            email: email.to_string(),
            role,
        })
        .await
        .unwrap()
}

struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn send(&self, _topic: &str, _key: &[u8], _value: &[u8]) -> Result<(), TransportError> {
        Err(TransportError::Publish("broker unavailable".to_string()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[tokio::test]
async fn create_incident_requires_existing_alarm() {
    let stack = stack();

    let missing = stack
        .incident_service
        .create_incident(CreateIncidentRequest {
            name: "ghost".to_string(),
            description: "no alarm behind this".to_string(),
            alarm_id: uuid::Uuid::new_v4().to_string(),
            severity: Severity::Low,
            location: "nowhere".to_string(),
        })
        .await;
    assert!(matches!(missing, Err(OperatorError::NotFound(_))));

    let malformed = stack
        .incident_service
        .create_incident(CreateIncidentRequest {
            name: "ghost".to_string(),
            description: "unparseable alarm id".to_string(),
            alarm_id: "not-a-uuid".to_string(),
            severity: Severity::Low,
            location: "nowhere".to_string(),
        })
        .await;
    assert!(matches!(malformed, Err(OperatorError::BadRequest(_))));
}

#[tokio::test]
async fn assign_guidance_snapshots_template_steps_in_order() {
    let stack = stack();
    let incident = seed_incident(&stack).await;
    let template = seed_template(&stack, 3).await;
    let operator = seed_user(&stack, "op@vigil.dev", Role::Operator).await;
    let guard = seed_user(&stack, "guard@vigil.dev", Role::Guard).await;

    let assignment = stack
        .incident_service
        .assign_guidance(
            incident.id,
            AssignGuidanceRequest {
                guidance_template_id: template.id.to_string(),
                assignee_id: guard.id.to_string(),
            },
            operator.id,
        )
        .await
        .unwrap();

    assert_eq!(assignment.steps.len(), template.steps.len());
    assert_eq!(
        assignment.steps.iter().map(|s| s.step_number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(assignment.steps.iter().all(|s| !s.is_completed));
    assert_eq!(assignment.guidance.assigner_id, operator.id);
    assert_eq!(assignment.guidance.assignee_id, guard.id);

    let incident = stack
        .incident_service
        .get_incident(incident.id)
        .await
        .unwrap();
    assert_eq!(incident.status, IncidentStatus::InProgress);
}

#[tokio::test]
async fn assign_guidance_validates_all_references() {
    let stack = stack();
    let incident = seed_incident(&stack).await;
    let template = seed_template(&stack, 2).await;
    let operator = seed_user(&stack, "op@vigil.dev", Role::Operator).await;

    let missing_template = stack
        .incident_service
        .assign_guidance(
            incident.id,
            AssignGuidanceRequest {
                guidance_template_id: uuid::Uuid::new_v4().to_string(),
                assignee_id: operator.id.to_string(),
            },
            operator.id,
        )
        .await;
    assert!(matches!(missing_template, Err(OperatorError::NotFound(_))));

    let missing_assignee = stack
        .incident_service
        .assign_guidance(
            incident.id,
            AssignGuidanceRequest {
                guidance_template_id: template.id.to_string(),
                assignee_id: uuid::Uuid::new_v4().to_string(),
            },
            operator.id,
        )
        .await;
    assert!(matches!(missing_assignee, Err(OperatorError::NotFound(_))));
}

#[tokio::test]
async fn concurrent_assignment_of_same_pair_yields_one_conflict() {
    let stack = stack();
    let incident = seed_incident(&stack).await;
    let template = seed_template(&stack, 2).await;
    let operator = seed_user(&stack, "op@vigil.dev", Role::Operator).await;
    let guard = seed_user(&stack, "guard@vigil.dev", Role::Guard).await;

    let attempts = (0..4).map(|_| {
        stack.incident_service.assign_guidance(
            incident.id,
            AssignGuidanceRequest {
                guidance_template_id: template.id.to_string(),
                assignee_id: guard.id.to_string(),
            },
            operator.id,
        )
    });
    let outcomes = futures::future::join_all(attempts).await;

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(OperatorError::Conflict(_))))
        .count();
    assert_eq!(successes, 1, "exactly one assignment must win");
    assert_eq!(conflicts, outcomes.len() - 1, "every loser must observe Conflict");
}

#[tokio::test]
async fn complete_step_is_idempotent_reject() {
    let stack = stack();
    let incident = seed_incident(&stack).await;
    let template = seed_template(&stack, 2).await;
    let operator = seed_user(&stack, "op@vigil.dev", Role::Operator).await;
    let guard = seed_user(&stack, "guard@vigil.dev", Role::Guard).await;

    let assignment = stack
        .incident_service
        .assign_guidance(
            incident.id,
            AssignGuidanceRequest {
                guidance_template_id: template.id.to_string(),
                assignee_id: guard.id.to_string(),
            },
            operator.id,
        )
        .await
        .unwrap();

    let step_id = assignment.steps[0].id;
    let completed = stack
        .incident_service
        .complete_step(assignment.guidance.id, step_id)
        .await
        .unwrap();
    assert!(completed.is_completed);
    let completed_at = completed.completed_at;

    let again = stack
        .incident_service
        .complete_step(assignment.guidance.id, step_id)
        .await;
    assert!(matches!(again, Err(OperatorError::BadRequest(_))));

    // First completion is untouched by the rejected second call.
    let current = stack
        .incident_service
        .get_incident_guidance(incident.id)
        .await
        .unwrap();
    assert_eq!(current.steps[0].completed_at, completed_at);
    assert!(!current.steps[1].is_completed);
}

#[tokio::test]
async fn complete_step_checks_assignment_ownership() {
    let stack = stack();
    let operator = seed_user(&stack, "op@vigil.dev", Role::Operator).await;
    let guard = seed_user(&stack, "guard@vigil.dev", Role::Guard).await;
    let template = seed_template(&stack, 1).await;

    let first_incident = seed_incident(&stack).await;
    let second_incident = seed_incident(&stack).await;
    let assign = |incident_id| {
        stack.incident_service.assign_guidance(
            incident_id,
            AssignGuidanceRequest {
                guidance_template_id: template.id.to_string(),
                assignee_id: guard.id.to_string(),
            },
            operator.id,
        )
    };
    let first = assign(first_incident.id).await.unwrap();
    let second = assign(second_incident.id).await.unwrap();

    // A step reached through someone else's assignment id is rejected.
    let crossed = stack
        .incident_service
        .complete_step(first.guidance.id, second.steps[0].id)
        .await;
    assert!(matches!(crossed, Err(OperatorError::BadRequest(_))));

    let unknown_assignment = stack
        .incident_service
        .complete_step(IncidentGuidanceId::new(), first.steps[0].id)
        .await;
    assert!(matches!(
        unknown_assignment,
        Err(OperatorError::BadRequest(_))
    ));

    let unknown_step = stack
        .incident_service
        .complete_step(first.guidance.id, IncidentGuidanceStepId::new())
        .await;
    assert!(matches!(unknown_step, Err(OperatorError::NotFound(_))));
}

#[tokio::test]
async fn resolved_incident_rejects_assignment_and_second_resolve() {
    let stack = stack();
    let incident = seed_incident(&stack).await;
    let template = seed_template(&stack, 1).await;
    let operator = seed_user(&stack, "op@vigil.dev", Role::Operator).await;

    let resolved = stack
        .incident_service
        .complete_incident(incident.id)
        .await
        .unwrap();
    assert_eq!(resolved.status, IncidentStatus::Resolved);

    let again = stack.incident_service.complete_incident(incident.id).await;
    assert!(matches!(again, Err(OperatorError::BadRequest(_))));

    let late_assignment = stack
        .incident_service
        .assign_guidance(
            incident.id,
            AssignGuidanceRequest {
                guidance_template_id: template.id.to_string(),
                assignee_id: operator.id.to_string(),
            },
            operator.id,
        )
        .await;
    assert!(matches!(late_assignment, Err(OperatorError::Conflict(_))));
}

#[tokio::test]
async fn publish_failure_is_swallowed_on_alarm_path_and_surfaced_on_assignment_path() {
    let stack = stack_with_publisher(Arc::new(FailingPublisher));

    // Alarm creation: the persisted row is authoritative, the publish
    // failure is logged and swallowed.
    let alarm = seed_alarm(&stack).await;
    assert_eq!(alarm.severity, Severity::High);

    let incident = seed_incident(&stack).await;
    let template = seed_template(&stack, 1).await;
    let operator = seed_user(&stack, "op@vigil.dev", Role::Operator).await;

    let failed = stack
        .incident_service
        .assign_guidance(
            incident.id,
            AssignGuidanceRequest {
                guidance_template_id: template.id.to_string(),
                assignee_id: operator.id.to_string(),
            },
            operator.id,
        )
        .await;
    assert!(matches!(failed, Err(OperatorError::Internal(_))));
}

#[tokio::test]
async fn end_to_end_incident_guidance_scenario() {
    let stack = stack();

    // High-severity alarm comes in and an incident is opened from it.
    let alarm = seed_alarm(&stack).await;
    let incident = stack
        .incident_service
        .create_incident(CreateIncidentRequest {
            name: "perimeter breach".to_string(),
            description: "intrusion at north fence".to_string(),
            alarm_id: alarm.id.to_string(),
            severity: Severity::High,
            location: "north gate".to_string(),
        })
        .await
        .unwrap();

    // A three-step template is assigned to guard U.
    let template = seed_template(&stack, 3).await;
    let operator = seed_user(&stack, "op@vigil.dev", Role::Operator).await;
    let guard = seed_user(&stack, "guard@vigil.dev", Role::Guard).await;
    let assignment = stack
        .incident_service
        .assign_guidance(
            incident.id,
            AssignGuidanceRequest {
                guidance_template_id: template.id.to_string(),
                assignee_id: guard.id.to_string(),
            },
            operator.id,
        )
        .await
        .unwrap();
    assert_eq!(assignment.steps.len(), 3);
    assert!(assignment.steps.iter().all(|s| !s.is_completed));

    // Guard completes step 1.
    stack
        .incident_service
        .complete_step(assignment.guidance.id, assignment.steps[0].id)
        .await
        .unwrap();

    let mine = stack
        .incident_service
        .get_assignments(guard.id)
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    let states: Vec<bool> = mine[0].steps.iter().map(|s| s.is_completed).collect();
    assert_eq!(states, vec![true, false, false]);

    // Completing step 1 again is an error, not a no-op.
    let again = stack
        .incident_service
        .complete_step(assignment.guidance.id, assignment.steps[0].id)
        .await;
    assert!(matches!(again, Err(OperatorError::BadRequest(_))));
}
