use common::platform::NETWORK_PROVIDER;
use module_core::test_helper::wait_for_event;
use module_core::{Event, EventBus, EventKind, EventKindType, Module, payload_ref};
use permission::PermissionCoordinator;
use simulator::{PermissionPolicy, SimulatedPlatform, SimulatorModule, default_route};
use std::time::Duration;
use tokio::time::timeout;
use tracker::LocationTracker;

const TICK: Duration = Duration::from_millis(10);

struct Harness {
    event_bus: EventBus,
    handles: Vec<tokio::task::JoinHandle<Result<(), ()>>>,
}

fn start_stack(policy: PermissionPolicy) -> Harness {
    let event_bus = EventBus::default();
    let platform = SimulatedPlatform::new(policy);
    platform.add_provider(NETWORK_PROVIDER, true);

    let mut simulator_module = SimulatorModule::new(
        event_bus.context(),
        platform.clone(),
        &default_route(),
        TICK,
    )
    .unwrap();
    let mut tracker = LocationTracker::new(platform.clone(), platform.clone(), event_bus.context());
    tracker.set_min_time(TICK);
    let mut coordinator =
        PermissionCoordinator::new(platform.clone(), platform.clone(), event_bus.context());

    let handles = vec![
        tokio::spawn(async move { simulator_module.run().await }),
        tokio::spawn(async move { tracker.run().await }),
        tokio::spawn(async move { coordinator.run().await }),
    ];
    Harness { event_bus, handles }
}

async fn shutdown(mut harness: Harness) {
    harness.event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });
    for handle in &mut harness.handles {
        let _ = timeout(Duration::from_millis(100), handle)
            .await
            .expect("Module doesn't handle quit event in timeout")
            .unwrap();
    }
}

#[tokio::test]
#[test_log::test]
async fn location_flow_from_cold_start() {
    let harness = start_stack(PermissionPolicy::AlwaysGrant);
    let mut receiver = harness.event_bus.subscribe();

    let event = wait_for_event(
        &mut receiver,
        Duration::from_millis(500),
        EventKindType::LocationChangedEvent,
    )
    .await;
    let fix = payload_ref!(event.kind, EventKind::LocationChangedEvent).unwrap();
    assert_eq!(fix.provider(), Some(NETWORK_PROVIDER));

    shutdown(harness).await;
}

#[tokio::test]
#[test_log::test]
async fn denied_permission_ends_in_a_rationale_request() {
    let harness = start_stack(PermissionPolicy::AlwaysDeny);
    let mut receiver = harness.event_bus.subscribe();

    wait_for_event(
        &mut receiver,
        Duration::from_millis(500),
        EventKindType::ShowRationaleEvent,
    )
    .await;
    wait_for_event(
        &mut receiver,
        Duration::from_millis(500),
        EventKindType::PermissionDeniedEvent,
    )
    .await;

    shutdown(harness).await;
}
