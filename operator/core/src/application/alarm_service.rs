// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Alarm creation and the producer half of the ingestion pipeline.
//!
//! Creating an alarm persists the row first, then publishes a snapshot to
//! the alarm topic. The persisted row is the system of record; publication
//! is best-effort notification, so a publish failure here is logged and
//! swallowed rather than failing the request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::alarm::{Alarm, AlarmId, Severity};
use crate::domain::directory::PremiseId;
use crate::domain::error::OperatorError;
use crate::domain::events::ALARM_TOPIC;
use crate::domain::repository::{AlarmRepository, PremiseRepository};
use crate::domain::transport::EventPublisher;

/// Where a creation request came from. Pipeline-originated creates skip
/// re-publication: their payload was read off the alarm topic in the first
/// place, and echoing it back would feed the consumer its own output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmOrigin {
    Api,
    Pipeline,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAlarmRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub premise_id: Option<String>,
    #[serde(default)]
    pub triggered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAlarmRequest {
    pub status: String,
}

#[async_trait]
pub trait AlarmService: Send + Sync {
    async fn create_alarm(
        &self,
        req: CreateAlarmRequest,
        origin: AlarmOrigin,
    ) -> Result<Alarm, OperatorError>;

    async fn get_alarms(&self, status: Option<String>) -> Result<Vec<Alarm>, OperatorError>;

    async fn update_alarm(
        &self,
        id: AlarmId,
        req: UpdateAlarmRequest,
    ) -> Result<Alarm, OperatorError>;
}

pub struct StandardAlarmService {
    alarms: Arc<dyn AlarmRepository>,
    premises: Arc<dyn PremiseRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl StandardAlarmService {
    pub fn new(
        alarms: Arc<dyn AlarmRepository>,
        premises: Arc<dyn PremiseRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            alarms,
            premises,
            publisher,
        }
    }

    async fn publish_snapshot(&self, alarm: &Alarm) {
        let payload = match serde_json::to_vec(alarm) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(alarm_id = %alarm.id, error = %err, "failed to encode alarm snapshot, skipping publish");
                return;
            }
        };
        let key = alarm.id.to_string();
        if let Err(err) = self
            .publisher
            .send(ALARM_TOPIC, key.as_bytes(), &payload)
            .await
        {
            warn!(alarm_id = %alarm.id, error = %err, "failed to publish alarm snapshot, alarm row is authoritative");
        }
    }
}

#[async_trait]
impl AlarmService for StandardAlarmService {
    async fn create_alarm(
        &self,
        req: CreateAlarmRequest,
        origin: AlarmOrigin,
    ) -> Result<Alarm, OperatorError> {
        let premise_id = match req.premise_id.as_deref() {
            Some(raw) => {
                let id = Uuid::parse_str(raw)
                    .map(PremiseId)
                    .map_err(|_| OperatorError::bad_request("invalid premise id format"))?;
                self.premises
                    .find_by_id(id)
                    .await
                    .map_err(|e| OperatorError::database("get premise", e))?
                    .ok_or_else(|| OperatorError::not_found("premise not found"))?;
                Some(id)
            }
            None => None,
        };

        let alarm = Alarm::new(
            premise_id,
            req.kind,
            req.description,
            req.severity,
            req.triggered_at,
        );
        self.alarms
            .save(&alarm)
            .await
            .map_err(|e| OperatorError::database("create alarm", e))?;

        if origin == AlarmOrigin::Api {
            self.publish_snapshot(&alarm).await;
        }

        Ok(alarm)
    }

    async fn get_alarms(&self, status: Option<String>) -> Result<Vec<Alarm>, OperatorError> {
        self.alarms
            .list(status.as_deref())
            .await
            .map_err(|e| OperatorError::database("get alarms", e))
    }

    async fn update_alarm(
        &self,
        id: AlarmId,
        req: UpdateAlarmRequest,
    ) -> Result<Alarm, OperatorError> {
        let mut alarm = self
            .alarms
            .find_by_id(id)
            .await
            .map_err(|e| OperatorError::database("get alarm", e))?
            .ok_or_else(|| OperatorError::not_found("alarm not found"))?;

        alarm.status = req.status;
        self.alarms
            .save(&alarm)
            .await
            .map_err(|e| OperatorError::database("update alarm", e))?;
        Ok(alarm)
    }
}
