use chrono::Utc;
use common::fix::LocationFix;
use common::platform::{
    FINE_LOCATION_PERMISSION, HostSurface, LocationService, PermissionProbe,
};
use module_core::{EventKind, Module, ModuleCtx, PermissionResult};
use std::collections::HashSet;
use std::io::{Error, ErrorKind};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, error, info};

/// How the simulated platform answers permission prompts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PermissionPolicy {
    /// Grant every prompt.
    AlwaysGrant,
    /// Deny the first prompt, grant every later one.
    DenyThenGrant,
    /// Deny every prompt and raise the rationale flag after the first
    /// denial, as the platform does for repeated denials.
    AlwaysDeny,
}

/// A point of a simulated route.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

struct SimProvider {
    name: String,
    enabled: bool,
    cached: Option<LocationFix>,
}

struct Subscription {
    provider: String,
    min_time: Duration,
}

struct PendingPrompt {
    permissions: Vec<String>,
    request_code: u32,
}

struct PlatformState {
    policy: PermissionPolicy,
    providers: Vec<SimProvider>,
    subscription: Option<Subscription>,
    granted: HashSet<String>,
    rationale: HashSet<String>,
    pending_prompt: Option<PendingPrompt>,
    denials: u32,
}

/// In-process stand-in for the platform location and permission services.
///
/// The handle is cheap to clone and every clone shares the same state, so
/// one clone can be handed to the tracker and the coordinator while another
/// one drives the simulation.
#[derive(Clone)]
pub struct SimulatedPlatform {
    state: Arc<RwLock<PlatformState>>,
}

impl SimulatedPlatform {
    pub fn new(policy: PermissionPolicy) -> Self {
        SimulatedPlatform {
            state: Arc::new(RwLock::new(PlatformState {
                policy,
                providers: Vec::new(),
                subscription: None,
                granted: HashSet::new(),
                rationale: HashSet::new(),
                pending_prompt: None,
                denials: 0,
            })),
        }
    }

    /// Registers a provider with the given enabled state.
    pub fn add_provider(&self, name: &str, enabled: bool) {
        self.write_state().providers.push(SimProvider {
            name: name.to_string(),
            enabled,
            cached: None,
        });
    }

    /// Marks `permission` as granted without a prompt round trip.
    pub fn grant(&self, permission: &str) {
        self.write_state().granted.insert(permission.to_string());
    }

    fn read_state(&self) -> RwLockReadGuard<'_, PlatformState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, PlatformState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn active_subscription(&self) -> Option<(String, Duration)> {
        let state = self.read_state();
        state
            .subscription
            .as_ref()
            .map(|subscription| (subscription.provider.clone(), subscription.min_time))
    }

    fn update_cached(&self, provider: &str, fix: &LocationFix) {
        let mut state = self.write_state();
        if let Some(sim_provider) = state
            .providers
            .iter_mut()
            .find(|sim_provider| sim_provider.name == provider)
        {
            sim_provider.cached = Some(fix.clone());
        }
    }

    /// Takes the pending prompt and answers it according to the policy.
    ///
    /// Updates the granted and rationale sets like the real platform would
    /// and returns the result to deliver to the host.
    fn answer_prompt(&self) -> Option<PermissionResult> {
        let mut state = self.write_state();
        let prompt = state.pending_prompt.take()?;
        let grant = match state.policy {
            PermissionPolicy::AlwaysGrant => true,
            PermissionPolicy::DenyThenGrant => state.denials >= 1,
            PermissionPolicy::AlwaysDeny => false,
        };
        if grant {
            for permission in &prompt.permissions {
                state.granted.insert(permission.clone());
            }
        } else {
            state.denials += 1;
            if state.policy == PermissionPolicy::AlwaysDeny {
                for permission in &prompt.permissions {
                    state.rationale.insert(permission.clone());
                }
            }
        }
        Some(PermissionResult::new(
            prompt.request_code,
            &prompt.permissions,
            &vec![grant; prompt.permissions.len()],
        ))
    }
}

impl LocationService for SimulatedPlatform {
    fn providers(&self, enabled_only: bool) -> Vec<String> {
        self.read_state()
            .providers
            .iter()
            .filter(|provider| !enabled_only || provider.enabled)
            .map(|provider| provider.name.clone())
            .collect()
    }

    fn request_updates(&mut self, provider: &str, min_time: Duration, min_distance: f64) {
        debug!(
            "Simulated subscription to {provider}: one fix per {min_time:?}, min distance {min_distance} m"
        );
        self.write_state().subscription = Some(Subscription {
            provider: provider.to_string(),
            min_time,
        });
    }

    fn remove_updates(&mut self) {
        self.write_state().subscription = None;
    }

    fn last_known_location(&self, provider: &str) -> Option<LocationFix> {
        self.read_state()
            .providers
            .iter()
            .find(|sim_provider| sim_provider.name == provider)
            .and_then(|sim_provider| sim_provider.cached.clone())
    }
}

impl PermissionProbe for SimulatedPlatform {
    fn is_granted(&self, permission: &str) -> bool {
        self.read_state().granted.contains(permission)
    }
}

impl HostSurface for SimulatedPlatform {
    fn should_show_rationale(&self, permission: &str) -> bool {
        self.read_state().rationale.contains(permission)
    }

    fn request_permissions(&mut self, permissions: &[String], request_code: u32) {
        debug!("Simulated permission prompt for {permissions:?} with request code {request_code}");
        self.write_state().pending_prompt = Some(PendingPrompt {
            permissions: permissions.to_vec(),
            request_code,
        });
    }
}

/// Drives a [`SimulatedPlatform`].
///
/// On every tick a pending permission prompt is answered per the configured
/// [`PermissionPolicy`] and, while a subscription is active and the location
/// permission is granted, the next route point is emitted as a
/// [`LocationFixEvent`](EventKind::LocationFixEvent). Emissions honor the
/// subscription's minimum time interval; the distance threshold is not
/// enforced by the simulation.
pub struct SimulatorModule {
    ctx: ModuleCtx,
    platform: SimulatedPlatform,
    route: Vec<RoutePoint>,
    next_point: usize,
    update_interval: Duration,
    last_emit: Option<tokio::time::Instant>,
}

impl SimulatorModule {
    pub fn new(
        ctx: ModuleCtx,
        platform: SimulatedPlatform,
        route: &[RoutePoint],
        update_interval: Duration,
    ) -> Result<Self, Error> {
        if route.is_empty() {
            return Err(Error::new(ErrorKind::InvalidData, "route parameter is empty"));
        }
        Ok(SimulatorModule {
            ctx,
            platform,
            route: route.to_vec(),
            next_point: 0,
            update_interval,
            last_emit: None,
        })
    }

    fn handle_tick(&mut self) {
        if let Some(result) = self.platform.answer_prompt() {
            info!(
                "Answering simulated permission prompt: granted {:?}",
                result.granted
            );
            let _ = self
                .ctx
                .publish_event(EventKind::PermissionResultEvent(Arc::new(result)));
        }
        self.emit_next_fix();
    }

    fn emit_next_fix(&mut self) {
        let Some((provider, min_time)) = self.platform.active_subscription() else {
            return;
        };
        if !self.platform.is_granted(FINE_LOCATION_PERMISSION) {
            return;
        }
        if let Some(last_emit) = self.last_emit {
            if last_emit.elapsed() < min_time {
                return;
            }
        }
        let point = self.route[self.next_point];
        self.next_point = (self.next_point + 1) % self.route.len();
        let fix = LocationFix::new(
            point.latitude,
            point.longitude,
            point.accuracy,
            &Utc::now(),
            Some(&provider),
        );
        self.platform.update_cached(&provider, &fix);
        self.last_emit = Some(tokio::time::Instant::now());
        let _ = self
            .ctx
            .publish_event(EventKind::LocationFixEvent(Arc::new(fix)));
    }
}

#[async_trait::async_trait]
impl Module for SimulatorModule {
    async fn run(&mut self) -> Result<(), ()> {
        let mut timer = tokio::time::interval(self.update_interval);
        let mut run = true;
        while run {
            tokio::select! {
                _ = timer.tick() => {
                    self.handle_tick();
                }
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            if let EventKind::QuitEvent = event.kind {
                                run = false;
                            }
                        }
                        Err(e) => {
                            error!("Failed to receive event in module Simulator. Error:{e}");
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// A small default route through Berlin Mitte, used when no route file is
/// given.
pub fn default_route() -> Vec<RoutePoint> {
    vec![
        RoutePoint {
            latitude: 52.5200,
            longitude: 13.4050,
            accuracy: 25.0,
        },
        RoutePoint {
            latitude: 52.5206,
            longitude: 13.4094,
            accuracy: 18.0,
        },
        RoutePoint {
            latitude: 52.5219,
            longitude: 13.4132,
            accuracy: 32.0,
        },
        RoutePoint {
            latitude: 52.5233,
            longitude: 13.4094,
            accuracy: 12.0,
        },
    ]
}
