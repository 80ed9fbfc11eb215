// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::directory::UserId;
use crate::domain::guidance::{GuidanceTemplateId, IncidentGuidanceId};
use crate::domain::incident::IncidentId;

/// Topic carrying alarm snapshots, keyed by alarm id. The payload is the
/// serialized `Alarm` itself.
pub const ALARM_TOPIC: &str = "alarm.triggered";

/// Topic carrying operator notifications, keyed by incident id.
pub const NOTIFICATION_TOPIC: &str = "notification.triggered";

/// Logical consumer-group name shared by all consumer instances of the same
/// topic set, for partition-level load distribution.
pub const CONSUMER_GROUP: &str = "vigil-operator";

/// Published after a guidance template is assigned to an incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceAssigned {
    pub incident_id: IncidentId,
    pub incident_guidance_id: IncidentGuidanceId,
    pub guidance_template_id: GuidanceTemplateId,
    pub assignee_id: UserId,
    pub assigned_at: DateTime<Utc>,
}
