// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Consumer half of the alarm ingestion pipeline.
//!
//! One long-lived loop per subscribed topic. Each inbound message is decoded
//! into an alarm-creation request and pushed through the same creation path
//! the synchronous API uses. Failures are logged and the message is skipped;
//! there is no retry and no dead-letter, so the position metadata in the log
//! line is the only trace of a lost message.
//!
//! Cancellation is a `tokio::select!` between the token and the blocking
//! `receive`, so shutdown does not race the transport teardown. In-flight
//! message processing is not aborted; the loop exits at the next iteration.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::application::alarm_service::{AlarmOrigin, AlarmService, CreateAlarmRequest};
use crate::domain::transport::{EventSubscriber, InboundMessage, TransportError};

pub struct AlarmIngestPipeline {
    subscriber: Arc<dyn EventSubscriber>,
    alarms: Arc<dyn AlarmService>,
}

impl AlarmIngestPipeline {
    pub fn new(subscriber: Arc<dyn EventSubscriber>, alarms: Arc<dyn AlarmService>) -> Self {
        Self { subscriber, alarms }
    }

    /// Runs until the token is cancelled or the transport closes, then
    /// releases the read position exactly once.
    pub async fn run(self, token: CancellationToken) {
        info!("alarm ingest consumer started");
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("cancellation observed, stopping alarm ingest consumer");
                    break;
                }
                received = self.subscriber.receive() => {
                    match received {
                        Ok(msg) => self.process(msg).await,
                        Err(TransportError::Closed) => {
                            info!("transport closed, stopping alarm ingest consumer");
                            break;
                        }
                        Err(err) => {
                            error!(error = %err, "failed to receive alarm event");
                        }
                    }
                }
            }
        }
        if let Err(err) = self.subscriber.close().await {
            error!(error = %err, "failed to close alarm subscriber");
        }
        info!("alarm ingest consumer closed");
    }

    async fn process(&self, msg: InboundMessage) {
        let req: CreateAlarmRequest = match serde_json::from_slice(&msg.value) {
            Ok(req) => req,
            Err(err) => {
                error!(
                    topic = %msg.topic,
                    partition = msg.partition,
                    offset = msg.offset,
                    error = %err,
                    "failed to decode alarm event, skipping message"
                );
                return;
            }
        };

        match self.alarms.create_alarm(req, AlarmOrigin::Pipeline).await {
            Ok(alarm) => {
                info!(alarm_id = %alarm.id, offset = msg.offset, "alarm created from event");
            }
            Err(err) => {
                error!(
                    topic = %msg.topic,
                    partition = msg.partition,
                    offset = msg.offset,
                    error = %err,
                    "failed to create alarm from event, skipping message"
                );
            }
        }
    }
}
