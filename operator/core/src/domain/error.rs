// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Error taxonomy shared by every orchestrator operation.
//!
//! | Variant | Meaning | HTTP mapping |
//! |---------|---------|--------------|
//! | `BadRequest` | malformed identifier, ownership mismatch, double completion | 400 |
//! | `NotFound` | missing referenced entity | 404 |
//! | `Conflict` | unique-constraint violation (duplicate assignment, duplicate email) | 409 |
//! | `Database` | opaque storage failure, wraps the cause | 500 |
//! | `Internal` | serialization or transport failure on a path that must surface it | 500 |

use thiserror::Error;

use crate::domain::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error during {op}: {source}")]
    Database {
        op: &'static str,
        #[source]
        source: RepositoryError,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl OperatorError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Wraps a storage failure, preserving conflicts so uniqueness
    /// violations keep their own status code.
    pub fn database(op: &'static str, source: RepositoryError) -> Self {
        match source {
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            source => Self::Database { op, source },
        }
    }
}
