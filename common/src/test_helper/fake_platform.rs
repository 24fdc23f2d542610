use crate::fix::LocationFix;
use crate::platform::{HostSurface, LocationService, PermissionProbe};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Recorded arguments of a subscribe call on the [`FakeLocationService`].
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedSubscription {
    pub provider: String,
    pub min_time: Duration,
    pub min_distance: f64,
}

#[derive(Default)]
struct FakeLocationServiceState {
    providers: Vec<(String, bool)>,
    cached: HashMap<String, LocationFix>,
    subscriptions: Vec<RecordedSubscription>,
    removals: usize,
}

/// A test implementation of [`LocationService`] backed by shared state.
///
/// The handle is cheap to clone and every clone shares the same state, so a
/// test keeps one handle for assertions after moving a clone into the
/// component under test.
#[derive(Clone, Default)]
pub struct FakeLocationService {
    state: Arc<RwLock<FakeLocationServiceState>>,
}

impl FakeLocationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider with the given enabled state.
    pub fn add_provider(&self, name: &str, enabled: bool) {
        self.state
            .write()
            .unwrap()
            .providers
            .push((name.to_string(), enabled));
    }

    /// Seeds the platform cache of `provider` with `fix`.
    pub fn set_cached(&self, provider: &str, fix: &LocationFix) {
        self.state
            .write()
            .unwrap()
            .cached
            .insert(provider.to_string(), fix.clone());
    }

    /// Returns every subscribe call recorded so far.
    pub fn subscriptions(&self) -> Vec<RecordedSubscription> {
        self.state.read().unwrap().subscriptions.clone()
    }

    /// Returns how often the subscription was removed.
    pub fn removals(&self) -> usize {
        self.state.read().unwrap().removals
    }
}

impl LocationService for FakeLocationService {
    fn providers(&self, enabled_only: bool) -> Vec<String> {
        self.state
            .read()
            .unwrap()
            .providers
            .iter()
            .filter(|(_, enabled)| !enabled_only || *enabled)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn request_updates(&mut self, provider: &str, min_time: Duration, min_distance: f64) {
        self.state
            .write()
            .unwrap()
            .subscriptions
            .push(RecordedSubscription {
                provider: provider.to_string(),
                min_time,
                min_distance,
            });
    }

    fn remove_updates(&mut self) {
        self.state.write().unwrap().removals += 1;
    }

    fn last_known_location(&self, provider: &str) -> Option<LocationFix> {
        self.state.read().unwrap().cached.get(provider).cloned()
    }
}

#[derive(Default)]
struct FakePermissionsState {
    granted: HashSet<String>,
    rationale: HashSet<String>,
    prompts: Vec<(Vec<String>, u32)>,
}

/// A test implementation of [`PermissionProbe`] and [`HostSurface`].
///
/// Grant and rationale flags are settable from the outside, prompt calls are
/// recorded instead of shown. Clones share the same state.
#[derive(Clone, Default)]
pub struct FakePermissions {
    state: Arc<RwLock<FakePermissionsState>>,
}

impl FakePermissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `permission` as granted.
    pub fn grant(&self, permission: &str) {
        self.state
            .write()
            .unwrap()
            .granted
            .insert(permission.to_string());
    }

    /// Marks `permission` as not granted.
    pub fn revoke(&self, permission: &str) {
        self.state.write().unwrap().granted.remove(permission);
    }

    /// Sets whether a rationale should be shown for `permission`.
    pub fn set_rationale(&self, permission: &str, show: bool) {
        let mut state = self.state.write().unwrap();
        if show {
            state.rationale.insert(permission.to_string());
        } else {
            state.rationale.remove(permission);
        }
    }

    /// Returns every prompt recorded so far as (permissions, request code).
    pub fn prompts(&self) -> Vec<(Vec<String>, u32)> {
        self.state.read().unwrap().prompts.clone()
    }
}

impl PermissionProbe for FakePermissions {
    fn is_granted(&self, permission: &str) -> bool {
        self.state.read().unwrap().granted.contains(permission)
    }
}

impl HostSurface for FakePermissions {
    fn should_show_rationale(&self, permission: &str) -> bool {
        self.state.read().unwrap().rationale.contains(permission)
    }

    fn request_permissions(&mut self, permissions: &[String], request_code: u32) {
        self.state
            .write()
            .unwrap()
            .prompts
            .push((permissions.to_vec(), request_code));
    }
}
