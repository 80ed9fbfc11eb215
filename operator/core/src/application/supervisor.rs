// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lifecycle coordination for the consumer loops.
//!
//! The supervisor owns the shared cancellation token and a `JoinSet` of
//! consumer tasks, so "wait for every loop to finish" is a first-class
//! operation. Shutdown is bounded: loops that do not drain within the grace
//! period are aborted instead of blocking process exit forever.

use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::ingest::AlarmIngestPipeline;

pub struct PipelineSupervisor {
    token: CancellationToken,
    tasks: JoinSet<()>,
}

impl PipelineSupervisor {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: JoinSet::new(),
        }
    }

    /// The token consumer loops select on.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn spawn(&mut self, pipeline: AlarmIngestPipeline) {
        let token = self.token.clone();
        self.tasks.spawn(pipeline.run(token));
    }

    /// Signals cancellation and waits for every consumer loop to report
    /// completion, up to `grace`.
    pub async fn shutdown(mut self, grace: Duration) {
        self.token.cancel();
        let drained = tokio::time::timeout(grace, async {
            while self.tasks.join_next().await.is_some() {}
        })
        .await;
        match drained {
            Ok(()) => info!("all consumer loops stopped"),
            Err(_) => {
                warn!(grace_secs = grace.as_secs(), "consumer loops did not stop within grace period, aborting");
                self.tasks.shutdown().await;
            }
        }
    }
}

impl Default for PipelineSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
