// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the alarm ingestion pipeline:
//! 1. API-created alarms are published to the alarm topic
//! 2. The consumer loop turns inbound events into alarm records
//! 3. Failures are skipped without killing the loop
//! 4. Cancellation stops the loop within the grace period

use std::sync::Arc;
use std::time::{Duration, Instant};

use vigil_core::application::alarm_service::{
    AlarmOrigin, AlarmService, CreateAlarmRequest, StandardAlarmService,
};
use vigil_core::application::{AlarmIngestPipeline, PipelineSupervisor};
use vigil_core::domain::alarm::Severity;
use vigil_core::domain::events::{ALARM_TOPIC, CONSUMER_GROUP};
use vigil_core::domain::transport::EventPublisher;
use vigil_core::infrastructure::memory_log::MemoryLog;
use vigil_core::infrastructure::repositories::{
    InMemoryAlarmRepository, InMemoryPremiseRepository,
};

fn alarm_request(kind: &str, severity: Severity) -> CreateAlarmRequest {
    serde_json::from_value(serde_json::json!({
        "type": kind,
        "description": format!("{kind} detected"),
        "severity": severity,
    }))
    .unwrap()
}

struct PipelineStack {
    log: MemoryLog,
    alarms: Arc<InMemoryAlarmRepository>,
    alarm_service: Arc<dyn AlarmService>,
}

fn pipeline_stack() -> PipelineStack {
    let log = MemoryLog::new();
    let alarms = Arc::new(InMemoryAlarmRepository::new());
    let alarm_service: Arc<dyn AlarmService> = Arc::new(StandardAlarmService::new(
        alarms.clone(),
        Arc::new(InMemoryPremiseRepository::new()),
        Arc::new(log.publisher()),
    ));
    PipelineStack {
        log,
        alarms,
        alarm_service,
    }
}

async fn wait_for_alarm_count(alarms: &InMemoryAlarmRepository, expected: usize) {
    use vigil_core::domain::repository::AlarmRepository;
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let count = alarms.list(None).await.unwrap().len();
        if count >= expected {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "expected {expected} alarms, saw {count}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn api_created_alarm_is_published_at_least_once() {
    let stack = pipeline_stack();

    let alarm = stack
        .alarm_service
        .create_alarm(alarm_request("motion", Severity::High), AlarmOrigin::Api)
        .await
        .unwrap();

    let probe = stack.log.subscriber("probe", ALARM_TOPIC);
    use vigil_core::domain::transport::EventSubscriber;
    let msg = tokio::time::timeout(Duration::from_secs(1), probe.receive())
        .await
        .expect("no event on the alarm topic")
        .unwrap();

    assert_eq!(msg.key, alarm.id.to_string().into_bytes());
    let snapshot: serde_json::Value = serde_json::from_slice(&msg.value).unwrap();
    assert_eq!(snapshot["id"], alarm.id.to_string());
    assert_eq!(snapshot["type"], "motion");
    assert_eq!(snapshot["severity"], "high");
}

#[tokio::test]
async fn consumer_creates_alarm_from_inbound_event() {
    let stack = pipeline_stack();
    let subscriber = Arc::new(stack.log.subscriber(CONSUMER_GROUP, ALARM_TOPIC));
    let mut supervisor = PipelineSupervisor::new();
    supervisor.spawn(AlarmIngestPipeline::new(
        subscriber,
        stack.alarm_service.clone(),
    ));

    let external = stack.log.publisher();
    let payload = serde_json::json!({
        "type": "smoke",
        "description": "smoke detector tripped",
        "severity": "medium",
    });
    external
        .send(
            ALARM_TOPIC,
            b"sensor-17",
            payload.to_string().as_bytes(),
        )
        .await
        .unwrap();

    wait_for_alarm_count(&stack.alarms, 1).await;
    use vigil_core::domain::repository::AlarmRepository;
    let created = stack.alarms.list(None).await.unwrap().remove(0);
    assert_eq!(created.kind, "smoke");
    assert_eq!(created.severity, Severity::Medium);
    assert_eq!(created.status, "new");

    supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn pipeline_created_alarms_are_not_republished() {
    let stack = pipeline_stack();
    let subscriber = Arc::new(stack.log.subscriber(CONSUMER_GROUP, ALARM_TOPIC));
    let mut supervisor = PipelineSupervisor::new();
    supervisor.spawn(AlarmIngestPipeline::new(
        subscriber,
        stack.alarm_service.clone(),
    ));

    let external = stack.log.publisher();
    let payload = serde_json::json!({
        "type": "smoke",
        "description": "smoke detector tripped",
        "severity": "low",
    });
    external
        .send(ALARM_TOPIC, b"sensor-2", payload.to_string().as_bytes())
        .await
        .unwrap();

    wait_for_alarm_count(&stack.alarms, 1).await;

    // A fresh group sees the one external event and nothing else: the
    // consumer did not echo its own creation back onto the topic.
    use vigil_core::domain::transport::EventSubscriber;
    let probe = stack.log.subscriber("probe", ALARM_TOPIC);
    probe.receive().await.unwrap();
    let echo = tokio::time::timeout(Duration::from_millis(200), probe.receive()).await;
    assert!(echo.is_err(), "consumer echoed its own alarm back");

    supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn duplicate_deliveries_are_reinserted() {
    // At-least-once: the consumer is deliberately not idempotent, so a
    // redelivered event creates a second row.
    let stack = pipeline_stack();
    let subscriber = Arc::new(stack.log.subscriber(CONSUMER_GROUP, ALARM_TOPIC));
    let mut supervisor = PipelineSupervisor::new();
    supervisor.spawn(AlarmIngestPipeline::new(
        subscriber,
        stack.alarm_service.clone(),
    ));

    let external = stack.log.publisher();
    let payload = serde_json::json!({
        "type": "glass-break",
        "description": "window sensor",
        "severity": "high",
    })
    .to_string();
    external
        .send(ALARM_TOPIC, b"sensor-5", payload.as_bytes())
        .await
        .unwrap();
    external
        .send(ALARM_TOPIC, b"sensor-5", payload.as_bytes())
        .await
        .unwrap();

    wait_for_alarm_count(&stack.alarms, 2).await;
    supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn malformed_event_is_skipped_and_loop_continues() {
    let stack = pipeline_stack();
    let subscriber = Arc::new(stack.log.subscriber(CONSUMER_GROUP, ALARM_TOPIC));
    let mut supervisor = PipelineSupervisor::new();
    supervisor.spawn(AlarmIngestPipeline::new(
        subscriber,
        stack.alarm_service.clone(),
    ));

    let external = stack.log.publisher();
    external
        .send(ALARM_TOPIC, b"sensor-9", b"not json at all")
        .await
        .unwrap();
    let payload = serde_json::json!({
        "type": "door-forced",
        "description": "forced entry",
        "severity": "high",
    });
    external
        .send(ALARM_TOPIC, b"sensor-9", payload.to_string().as_bytes())
        .await
        .unwrap();

    wait_for_alarm_count(&stack.alarms, 1).await;
    use vigil_core::domain::repository::AlarmRepository;
    let created = stack.alarms.list(None).await.unwrap().remove(0);
    assert_eq!(created.kind, "door-forced");

    supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn cancelled_consumer_exits_within_grace_period() {
    let stack = pipeline_stack();
    let subscriber = Arc::new(stack.log.subscriber(CONSUMER_GROUP, ALARM_TOPIC));
    let mut supervisor = PipelineSupervisor::new();
    supervisor.spawn(AlarmIngestPipeline::new(
        subscriber,
        stack.alarm_service.clone(),
    ));

    // Give the loop a moment to block in receive before cancelling.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = Instant::now();
    supervisor.shutdown(Duration::from_secs(1)).await;
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "consumer did not observe cancellation promptly"
    );

    let publisher = stack.log.publisher();
    publisher.close().await.unwrap();
}
