// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod alarm_service;
pub mod incident_service;
pub mod catalog_service;
pub mod directory_service;
pub mod ingest;
pub mod supervisor;

pub use alarm_service::{AlarmOrigin, AlarmService, StandardAlarmService};
pub use incident_service::{IncidentService, StandardIncidentService};
pub use ingest::AlarmIngestPipeline;
pub use supervisor::PipelineSupervisor;
