// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod alarm;
pub mod incident;
pub mod guidance;
pub mod directory;
pub mod events;
pub mod error;
pub mod repository;
pub mod transport;
