// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod memory;
pub mod postgres_alarm;
pub mod postgres_assignment;
pub mod postgres_catalog;
pub mod postgres_directory;
pub mod postgres_incident;

pub use memory::{
    InMemoryAlarmRepository, InMemoryAssignmentRepository, InMemoryGuidanceTemplateRepository,
    InMemoryIncidentRepository, InMemoryPremiseRepository, InMemoryUserRepository,
};
pub use postgres_alarm::PostgresAlarmRepository;
pub use postgres_assignment::PostgresAssignmentRepository;
pub use postgres_catalog::PostgresGuidanceTemplateRepository;
pub use postgres_directory::{PostgresPremiseRepository, PostgresUserRepository};
pub use postgres_incident::PostgresIncidentRepository;
