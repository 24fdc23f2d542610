// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::platform::{FINE_LOCATION_PERMISSION, HostSurface, PermissionProbe};
use module_core::{EventKind, Module, ModuleCtx, PermissionResult};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Default request code used to correlate permission prompts with their
/// results.
pub const DEFAULT_REQUEST_CODE: u32 = 100;

/// Grant state of the configured permission set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PermissionState {
    /// No check or prompt has happened yet.
    Unknown,

    /// Every configured permission is granted.
    Granted,

    /// At least one permission was denied by the last prompt.
    Denied,

    /// A prompt is in flight and its result is still outstanding.
    AwaitingGrant,
}

/// Coordinates runtime permission requests for the location tracker.
///
/// The coordinator decides between showing a rationale and firing the
/// platform prompt, keeps track of the single in-flight request, and routes
/// prompt outcomes back into the update flow: a grant is answered with a
/// [`PermissionGrantedEvent`](EventKind::PermissionGrantedEvent) the tracker
/// reacts to by subscribing again, a denial with a
/// [`PermissionDeniedEvent`](EventKind::PermissionDeniedEvent) carrying the
/// denied identifiers.
pub struct PermissionCoordinator<H, P>
where
    H: HostSurface,
    P: PermissionProbe,
{
    host: H,
    probe: P,
    permissions: Vec<String>,
    request_code: u32,
    state: PermissionState,
    ctx: ModuleCtx,
}

impl<H, P> PermissionCoordinator<H, P>
where
    H: HostSurface,
    P: PermissionProbe,
{
    /// Creates a coordinator for the fine location permission with the
    /// default request code.
    pub fn new(host: H, probe: P, ctx: ModuleCtx) -> Self {
        PermissionCoordinator {
            host,
            probe,
            permissions: vec![FINE_LOCATION_PERMISSION.to_string()],
            request_code: DEFAULT_REQUEST_CODE,
            state: PermissionState::Unknown,
            ctx,
        }
    }

    /// Replaces the set of permissions the coordinator manages.
    pub fn set_permissions(&mut self, permissions: &[String]) {
        self.permissions = permissions.to_vec();
    }

    /// Sets the request code used for prompt correlation.
    pub fn set_request_code(&mut self, request_code: u32) {
        self.request_code = request_code;
    }

    /// Returns the current grant state.
    pub fn state(&self) -> PermissionState {
        self.state
    }

    /// Checks the configured permissions and starts the prompt flow when
    /// they are missing.
    ///
    /// Returns true when every permission is already granted and the caller
    /// may proceed. Otherwise false is returned and the outcome arrives
    /// asynchronously: the host UI is asked to show a rationale first when
    /// the platform demands one, otherwise the platform prompt is fired with
    /// the configured request code. At most one prompt is in flight at a
    /// time.
    pub fn check_and_request(&mut self) -> bool {
        if self
            .permissions
            .iter()
            .all(|permission| self.probe.is_granted(permission))
        {
            self.state = PermissionState::Granted;
            return true;
        }
        if self.state == PermissionState::AwaitingGrant {
            debug!("Permission prompt already in flight, waiting for its result");
            return false;
        }
        if self
            .permissions
            .iter()
            .any(|permission| self.host.should_show_rationale(permission))
        {
            info!("Asking the host UI to show a permission rationale");
            let _ = self
                .ctx
                .publish_event(EventKind::ShowRationaleEvent(Arc::new(
                    self.permissions.clone(),
                )));
        } else {
            info!(
                "Firing the platform permission prompt with request code {}",
                self.request_code
            );
            self.host
                .request_permissions(&self.permissions, self.request_code);
            self.state = PermissionState::AwaitingGrant;
        }
        false
    }

    /// Routes a prompt outcome delivered by the host surface.
    ///
    /// Results are ignored unless a prompt is outstanding and the request
    /// code matches it. A fully granted result publishes a single
    /// [`PermissionGrantedEvent`](EventKind::PermissionGrantedEvent). A
    /// result with denials re-enters the rationale-or-prompt decision and
    /// publishes a
    /// [`PermissionDeniedEvent`](EventKind::PermissionDeniedEvent) carrying
    /// exactly the denied identifiers.
    pub fn on_permission_result(&mut self, result: &PermissionResult) {
        if self.state != PermissionState::AwaitingGrant || result.request_code != self.request_code
        {
            debug!(
                "Ignoring permission result with request code {}",
                result.request_code
            );
            return;
        }
        if result.all_granted() {
            info!("All requested permissions granted");
            self.state = PermissionState::Granted;
            let _ = self.ctx.publish_event(EventKind::PermissionGrantedEvent);
        } else {
            let denied = result.denied();
            info!("Permissions denied: {denied:?}");
            self.state = PermissionState::Denied;
            self.check_and_request();
            let _ = self
                .ctx
                .publish_event(EventKind::PermissionDeniedEvent(Arc::new(denied)));
        }
    }
}

#[async_trait::async_trait]
impl<H, P> Module for PermissionCoordinator<H, P>
where
    H: HostSurface + Send,
    P: PermissionProbe + Send,
{
    async fn run(&mut self) -> Result<(), ()> {
        let mut run = true;
        while run {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => match event.kind {
                            EventKind::QuitEvent => run = false,
                            EventKind::PermissionRequiredEvent(_) => {
                                debug!("Permission required event received in PermissionCoordinator module");
                                if self.check_and_request() {
                                    let _ = self.ctx.publish_event(EventKind::PermissionGrantedEvent);
                                }
                            }
                            EventKind::PermissionResultEvent(result) => {
                                self.on_permission_result(&result);
                            }
                            _ => (),
                        },
                        Err(e) => {
                            error!("Failed to receive event in module PermissionCoordinator. Error:{e}");
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
