// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::platform::FINE_LOCATION_PERMISSION;
use common::test_helper::fake_platform::FakePermissions;
use module_core::test_helper::{stop_module, wait_for_event};
use module_core::{
    Event, EventBus, EventKind, EventKindType, Module, PermissionResult, payload_ref,
};
use permission::{DEFAULT_REQUEST_CODE, PermissionCoordinator, PermissionState};
use std::sync::Arc;
use std::time::Duration;

fn coordinator(
    event_bus: &EventBus,
    permissions: &FakePermissions,
) -> PermissionCoordinator<FakePermissions, FakePermissions> {
    PermissionCoordinator::new(permissions.clone(), permissions.clone(), event_bus.context())
}

fn fine_location() -> Vec<String> {
    vec![FINE_LOCATION_PERMISSION.to_string()]
}

fn result(request_code: u32, granted: &[bool]) -> PermissionResult {
    PermissionResult::new(request_code, &fine_location(), granted)
}

async fn wait_until<F>(condition: F, duration: Duration)
where
    F: Fn() -> bool,
{
    let steps = duration.as_millis() / 10;
    for _ in 0..steps {
        if condition() {
            return;
        }
        tokio::time::sleep(duration / 10).await;
    }
    panic!("Condition not met in time");
}

#[test]
fn proceed_when_already_granted() {
    let permissions = FakePermissions::new();
    permissions.grant(FINE_LOCATION_PERMISSION);
    let event_bus = EventBus::default();
    let mut coordinator = coordinator(&event_bus, &permissions);
    assert!(coordinator.check_and_request());
    assert_eq!(coordinator.state(), PermissionState::Granted);
    assert!(permissions.prompts().is_empty());
}

#[test]
fn prompt_fired_when_permission_is_missing() {
    let permissions = FakePermissions::new();
    let event_bus = EventBus::default();
    let mut coordinator = coordinator(&event_bus, &permissions);
    assert!(!coordinator.check_and_request());
    assert_eq!(coordinator.state(), PermissionState::AwaitingGrant);
    assert_eq!(
        permissions.prompts(),
        vec![(fine_location(), DEFAULT_REQUEST_CODE)]
    );
}

#[test]
fn rationale_requested_instead_of_reprompt() {
    let permissions = FakePermissions::new();
    permissions.set_rationale(FINE_LOCATION_PERMISSION, true);
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut coordinator = coordinator(&event_bus, &permissions);
    assert!(!coordinator.check_and_request());
    assert!(permissions.prompts().is_empty());
    let event = receiver.try_recv().unwrap();
    let rationale = payload_ref!(event.kind, EventKind::ShowRationaleEvent).unwrap();
    assert_eq!(**rationale, fine_location());
}

#[test]
fn only_one_prompt_in_flight() {
    let permissions = FakePermissions::new();
    let event_bus = EventBus::default();
    let mut coordinator = coordinator(&event_bus, &permissions);
    coordinator.check_and_request();
    coordinator.check_and_request();
    assert_eq!(permissions.prompts().len(), 1);
}

#[test]
fn mismatched_request_code_is_ignored() {
    let permissions = FakePermissions::new();
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut coordinator = coordinator(&event_bus, &permissions);
    coordinator.check_and_request();
    coordinator.on_permission_result(&result(7, &[true]));
    assert_eq!(coordinator.state(), PermissionState::AwaitingGrant);
    assert!(receiver.try_recv().is_err());
}

#[test]
fn result_without_outstanding_prompt_is_ignored() {
    let permissions = FakePermissions::new();
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut coordinator = coordinator(&event_bus, &permissions);
    coordinator.on_permission_result(&result(DEFAULT_REQUEST_CODE, &[true]));
    assert_eq!(coordinator.state(), PermissionState::Unknown);
    assert!(receiver.try_recv().is_err());
}

#[test]
fn granted_result_notifies_exactly_once() {
    let permissions = FakePermissions::new();
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut coordinator = coordinator(&event_bus, &permissions);
    coordinator.check_and_request();
    coordinator.on_permission_result(&result(DEFAULT_REQUEST_CODE, &[true]));
    assert_eq!(coordinator.state(), PermissionState::Granted);
    let event = receiver.try_recv().unwrap();
    assert_eq!(event.event_type(), EventKindType::PermissionGrantedEvent);
    assert!(receiver.try_recv().is_err());
}

#[test]
fn denied_result_reprompts_and_reports_the_denied_set() {
    let permissions = FakePermissions::new();
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut coordinator = coordinator(&event_bus, &permissions);
    coordinator.check_and_request();
    coordinator.on_permission_result(&result(DEFAULT_REQUEST_CODE, &[false]));
    assert_eq!(coordinator.state(), PermissionState::AwaitingGrant);
    assert_eq!(permissions.prompts().len(), 2);
    let event = receiver.try_recv().unwrap();
    let denied = payload_ref!(event.kind, EventKind::PermissionDeniedEvent).unwrap();
    assert_eq!(**denied, fine_location());
}

#[test]
fn denied_result_with_rationale_shows_the_rationale() {
    let permissions = FakePermissions::new();
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut coordinator = coordinator(&event_bus, &permissions);
    coordinator.check_and_request();
    permissions.set_rationale(FINE_LOCATION_PERMISSION, true);
    coordinator.on_permission_result(&result(DEFAULT_REQUEST_CODE, &[false]));
    assert_eq!(coordinator.state(), PermissionState::Denied);
    assert_eq!(permissions.prompts().len(), 1);
    let first = receiver.try_recv().unwrap();
    assert_eq!(first.event_type(), EventKindType::ShowRationaleEvent);
    let second = receiver.try_recv().unwrap();
    let denied = payload_ref!(second.kind, EventKind::PermissionDeniedEvent).unwrap();
    assert_eq!(**denied, fine_location());
}

#[test]
fn configured_permission_set_and_request_code_are_used() {
    let permissions = FakePermissions::new();
    permissions.grant("location.fine");
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut coordinator = coordinator(&event_bus, &permissions);
    let managed = vec!["location.fine".to_string(), "location.coarse".to_string()];
    coordinator.set_permissions(&managed);
    coordinator.set_request_code(42);
    assert!(!coordinator.check_and_request());
    assert_eq!(permissions.prompts(), vec![(managed.clone(), 42)]);
    coordinator.on_permission_result(&PermissionResult::new(42, &managed, &[true, false]));
    let event = receiver.try_recv().unwrap();
    let denied = payload_ref!(event.kind, EventKind::PermissionDeniedEvent).unwrap();
    assert_eq!(**denied, vec!["location.coarse".to_string()]);
}

#[tokio::test]
#[test_log::test]
async fn required_event_triggers_the_prompt_flow() {
    let permissions = FakePermissions::new();
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut coordinator = coordinator(&event_bus, &permissions);
    let mut handle = tokio::spawn(async move { coordinator.run().await });

    event_bus.publish(&Event {
        kind: EventKind::PermissionRequiredEvent(Arc::new(fine_location())),
    });
    let prompts = permissions.clone();
    wait_until(|| !prompts.prompts().is_empty(), Duration::from_millis(100)).await;

    event_bus.publish(&Event {
        kind: EventKind::PermissionResultEvent(Arc::new(result(DEFAULT_REQUEST_CODE, &[true]))),
    });
    let event = wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::PermissionGrantedEvent,
    )
    .await;
    assert_eq!(event.event_type(), EventKindType::PermissionGrantedEvent);

    stop_module(&event_bus, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
async fn required_event_with_granted_permission_answers_directly() {
    let permissions = FakePermissions::new();
    permissions.grant(FINE_LOCATION_PERMISSION);
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut coordinator = coordinator(&event_bus, &permissions);
    let mut handle = tokio::spawn(async move { coordinator.run().await });

    event_bus.publish(&Event {
        kind: EventKind::PermissionRequiredEvent(Arc::new(fine_location())),
    });
    wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::PermissionGrantedEvent,
    )
    .await;
    assert!(permissions.prompts().is_empty());

    stop_module(&event_bus, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
async fn denied_result_via_the_bus_reports_the_denied_set() {
    let permissions = FakePermissions::new();
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let mut coordinator = coordinator(&event_bus, &permissions);
    let mut handle = tokio::spawn(async move { coordinator.run().await });

    event_bus.publish(&Event {
        kind: EventKind::PermissionRequiredEvent(Arc::new(fine_location())),
    });
    let prompts = permissions.clone();
    wait_until(|| !prompts.prompts().is_empty(), Duration::from_millis(100)).await;

    event_bus.publish(&Event {
        kind: EventKind::PermissionResultEvent(Arc::new(result(DEFAULT_REQUEST_CODE, &[false]))),
    });
    let event = wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::PermissionDeniedEvent,
    )
    .await;
    let denied = payload_ref!(event.kind, EventKind::PermissionDeniedEvent).unwrap();
    assert_eq!(**denied, fine_location());

    stop_module(&event_bus, &mut handle).await;
}
