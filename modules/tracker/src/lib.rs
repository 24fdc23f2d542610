// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::fix::LocationFix;
use common::platform::{
    FINE_LOCATION_PERMISSION, LocationService, NETWORK_PROVIDER, PermissionProbe,
    SATELLITE_PROVIDER,
};
use module_core::{EventKind, Module, ModuleCtx};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

const SIGNIFICANT_TIME_DELTA_MS: i64 = 1000 * 60 * 2;
const SIGNIFICANT_ACCURACY_DELTA: f64 = 200.0;
const DEFAULT_MIN_TIME: Duration = Duration::from_secs(15);
const DEFAULT_MIN_DISTANCE: f64 = 50.0;

/// Determines whether a new location reading supersedes the currently
/// remembered fix.
///
/// A missing current fix is always superseded. A reading more than two
/// minutes newer always wins, a reading more than two minutes older never
/// does. Within that window the accuracy radius decides: a strictly more
/// accurate reading wins, a newer reading wins as long as its accuracy does
/// not regress, and a newer reading from the same provider wins as long as
/// its accuracy does not regress by more than 200 meters.
pub fn is_better_fix(candidate: &LocationFix, current_best: Option<&LocationFix>) -> bool {
    let Some(best) = current_best else {
        return true;
    };

    let time_delta = (candidate.time() - best.time()).num_milliseconds();
    let is_significantly_newer = time_delta > SIGNIFICANT_TIME_DELTA_MS;
    let is_significantly_older = time_delta < -SIGNIFICANT_TIME_DELTA_MS;
    let is_newer = time_delta > 0;

    if is_significantly_newer {
        return true;
    } else if is_significantly_older {
        return false;
    }

    let accuracy_delta = candidate.accuracy() - best.accuracy();
    let is_less_accurate = accuracy_delta > 0.0;
    let is_more_accurate = accuracy_delta < 0.0;
    let is_significantly_less_accurate = accuracy_delta > SIGNIFICANT_ACCURACY_DELTA;

    if is_more_accurate {
        true
    } else if is_newer && !is_less_accurate {
        true
    } else {
        is_newer && !is_significantly_less_accurate && candidate.is_same_provider(best)
    }
}

/// Tracks the best known device location reported by a platform
/// [`LocationService`].
///
/// Candidate readings arrive as
/// [`LocationFixEvent`](EventKind::LocationFixEvent)s. A reading that
/// supersedes the remembered fix becomes the new fix and is published once as
/// a [`LocationChangedEvent`](EventKind::LocationChangedEvent). Subscription
/// attempts without the required permission are handed over to the
/// permission coordinator through a
/// [`PermissionRequiredEvent`](EventKind::PermissionRequiredEvent).
pub struct LocationTracker<S, P>
where
    S: LocationService,
    P: PermissionProbe,
{
    service: S,
    permissions: P,
    required_permission: String,
    min_time: Duration,
    min_distance: f64,
    best: Option<LocationFix>,
    ctx: ModuleCtx,
}

impl<S, P> LocationTracker<S, P>
where
    S: LocationService,
    P: PermissionProbe,
{
    /// Creates a new tracker on top of the given platform handles.
    ///
    /// Updates are throttled to one per 15 seconds and 50 meters until
    /// configured otherwise.
    pub fn new(service: S, permissions: P, ctx: ModuleCtx) -> Self {
        LocationTracker {
            service,
            permissions,
            required_permission: FINE_LOCATION_PERMISSION.to_string(),
            min_time: DEFAULT_MIN_TIME,
            min_distance: DEFAULT_MIN_DISTANCE,
            best: None,
            ctx,
        }
    }

    /// Sets the minimum interval between reported updates.
    pub fn set_min_time(&mut self, min_time: Duration) {
        self.min_time = min_time;
    }

    /// Sets the minimum distance in meters between reported updates.
    pub fn set_min_distance(&mut self, min_distance: f64) {
        self.min_distance = min_distance;
    }

    /// Sets the permission identifier that gates location access.
    pub fn set_required_permission(&mut self, permission: &str) {
        self.required_permission = permission.to_string();
    }

    /// Subscribes for location updates from the best available provider.
    ///
    /// The network provider is preferred over the satellite provider.
    /// Without an enabled provider this is a no-op. Without the required
    /// permission no subscription is made; a
    /// [`PermissionRequiredEvent`](EventKind::PermissionRequiredEvent) is
    /// published instead and the subscription is retried once the
    /// coordinator reports the grant.
    pub fn request_updates(&mut self) {
        if !self.permissions.is_granted(&self.required_permission) {
            debug!("Location permission not granted, delegating to the permission coordinator");
            let _ = self
                .ctx
                .publish_event(EventKind::PermissionRequiredEvent(Arc::new(vec![
                    self.required_permission.clone(),
                ])));
            return;
        }
        let enabled = self.service.providers(true);
        if let Some(provider) = select_provider(&enabled) {
            info!("Requesting location updates from provider {provider}");
            self.service
                .request_updates(provider, self.min_time, self.min_distance);
        } else {
            debug!("No location provider available, ignoring update request");
        }
    }

    /// Cancels the update subscription.
    ///
    /// Safe to call repeatedly or when no subscription was ever made.
    pub fn remove_updates(&mut self) {
        self.service.remove_updates();
    }

    /// Returns the best known location without waiting for a live update.
    ///
    /// On first access the platform cache is queried, preferring the network
    /// provider and falling back to the satellite provider. Returns `None`
    /// when the required permission is not currently granted or no fix is
    /// available.
    pub fn last_known_location(&mut self) -> Option<LocationFix> {
        if !self.permissions.is_granted(&self.required_permission) {
            return None;
        }
        self.init_last_known();
        self.best.clone()
    }

    /// Feeds a candidate reading into the tracker.
    ///
    /// The candidate is compared against the remembered fix, seeded from the
    /// platform cache when empty. An accepted candidate becomes the new
    /// remembered fix and is published exactly once as a
    /// [`LocationChangedEvent`](EventKind::LocationChangedEvent).
    pub fn on_location_received(&mut self, candidate: LocationFix) {
        self.init_last_known();
        if !is_better_fix(&candidate, self.best.as_ref()) {
            debug!("Dropping reading that does not supersede the current fix");
            return;
        }
        let accepted = Arc::new(candidate);
        self.best = Some((*accepted).clone());
        let _ = self
            .ctx
            .publish_event(EventKind::LocationChangedEvent(accepted));
    }

    fn init_last_known(&mut self) {
        if self.best.is_some() {
            return;
        }
        let known = self.service.providers(false);
        for provider in [NETWORK_PROVIDER, SATELLITE_PROVIDER] {
            if known.iter().any(|name| name == provider)
                && let Some(fix) = self.service.last_known_location(provider)
            {
                debug!("Seeding the remembered fix from the {provider} provider cache");
                self.best = Some(fix);
                return;
            }
        }
    }
}

fn select_provider(providers: &[String]) -> Option<&'static str> {
    [NETWORK_PROVIDER, SATELLITE_PROVIDER]
        .into_iter()
        .find(|preferred| providers.iter().any(|name| name == preferred))
}

#[async_trait::async_trait]
impl<S, P> Module for LocationTracker<S, P>
where
    S: LocationService + Send,
    P: PermissionProbe + Send,
{
    async fn run(&mut self) -> Result<(), ()> {
        self.request_updates();
        let mut run = true;
        while run {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => match event.kind {
                            EventKind::QuitEvent => {
                                self.remove_updates();
                                run = false;
                            }
                            EventKind::LocationFixEvent(fix) => {
                                self.on_location_received((*fix).clone());
                            }
                            EventKind::PermissionGrantedEvent => {
                                debug!("Permission granted, requesting location updates again");
                                self.request_updates();
                            }
                            _ => (),
                        },
                        Err(e) => {
                            error!("Failed to receive event in module LocationTracker. Error:{e}");
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
