/// Represents a high-level event in the system.
///
/// Each `Event` wraps an [`EventKind`], which defines the actual type
/// and data carried by the event.
///
/// This structure is designed to be passed through an [`EventBus`]
/// between asynchronous modules.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// The inner event type and associated data.
    pub kind: EventKind,
}

impl Event {
    /// Returns the discriminant that describes the variant of the carried
    /// [`EventKind`], ignoring any payload.
    pub fn event_type(&self) -> EventKindType {
        EventKindType::from(&self.kind)
    }
}

/// A thread-safe, reference-counted pointer to a [`LocationFix`].
///
/// This type alias wraps a [`LocationFix`] inside an [`Arc`](std::sync::Arc),
/// allowing multiple modules to share ownership of the same reading without
/// copying it.
///
/// [`LocationFix`]: common::fix::LocationFix
pub type LocationFixPtr = std::sync::Arc<common::fix::LocationFix>;

/// A thread-safe, reference-counted pointer to a set of permission
/// identifiers.
pub type PermissionSetPtr = std::sync::Arc<Vec<String>>;

/// A thread-safe, reference-counted pointer to a [`PermissionResult`].
pub type PermissionResultPtr = std::sync::Arc<PermissionResult>;

/// Outcome of a platform permission prompt as delivered by the host surface.
///
/// `permissions` and `granted` line up index by index. A cancelled prompt is
/// reported with empty lists.
#[derive(Clone, Debug, PartialEq)]
pub struct PermissionResult {
    /// Request code the prompt was fired with.
    pub request_code: u32,
    /// The permission identifiers that were requested.
    pub permissions: Vec<String>,
    /// Grant flag per requested permission.
    pub granted: Vec<bool>,
}

impl PermissionResult {
    pub fn new(request_code: u32, permissions: &[String], granted: &[bool]) -> PermissionResult {
        PermissionResult {
            request_code,
            permissions: permissions.to_vec(),
            granted: granted.to_vec(),
        }
    }

    /// True when every requested permission was granted.
    ///
    /// A cancelled prompt (no grant flags at all) does not count as granted.
    pub fn all_granted(&self) -> bool {
        !self.granted.is_empty() && self.granted.iter().all(|granted| *granted)
    }

    /// Returns the identifiers of the permissions that were not granted.
    pub fn denied(&self) -> Vec<String> {
        self.permissions
            .iter()
            .zip(self.granted.iter())
            .filter(|(_, granted)| !**granted)
            .map(|(permission, _)| permission.clone())
            .collect()
    }
}

/// Enumerates the different kinds of events that can be emitted
/// and transmitted via the [`EventBus`].
///
/// The derived [`EventKindType`] discriminant enum identifies a variant
/// without its payload and is mainly used by test helpers.
#[derive(Clone, Debug, PartialEq, strum_macros::EnumDiscriminants)]
#[strum_discriminants(name(EventKindType))]
pub enum EventKind {
    /// Indicates that a module shall terminate.
    QuitEvent,

    /// A raw reading reported by the platform location service.
    ///
    /// Candidate input for the location tracker; not yet accepted.
    LocationFixEvent(LocationFixPtr),

    /// An accepted reading that superseded the previously remembered one.
    ///
    /// Published by the location tracker for every listener on the bus.
    LocationChangedEvent(LocationFixPtr),

    /// The tracker is missing the listed permissions and hands the request
    /// flow over to the permission coordinator.
    PermissionRequiredEvent(PermissionSetPtr),

    /// Outcome of a platform permission prompt, delivered by the host
    /// surface.
    PermissionResultEvent(PermissionResultPtr),

    /// Every requested permission is granted.
    PermissionGrantedEvent,

    /// At least one permission was denied; carries the denied identifiers.
    PermissionDeniedEvent(PermissionSetPtr),

    /// The host UI should display a permission rationale for the listed
    /// permissions before the next prompt.
    ShowRationaleEvent(PermissionSetPtr),
}

/// Extracts a reference to the payload of an [`EventKind`] variant.
///
/// Evaluates to `Some(&payload)` when the expression matches the given
/// variant and to `None` otherwise.
#[macro_export]
macro_rules! payload_ref {
    ($kind:expr, $variant:path) => {
        match &$kind {
            $variant(payload) => Some(payload),
            _ => None,
        }
    };
}

/// A simple asynchronous event bus for publishing and subscribing to [`Event`]s.
///
/// The event bus uses a [`tokio::sync::broadcast::channel`] under the hood,
/// allowing multiple receivers to listen for the same stream of events.
///
/// Each published event is cloned and distributed to all active subscribers.
/// If no subscribers exist at the time of publication, the event is discarded silently.
pub struct EventBus {
    /// The broadcast sender used internally to distribute events.
    sender: tokio::sync::broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new [`EventBus`] with a fixed buffer capacity of 100 messages.
    ///
    /// When the buffer is full, the oldest messages are dropped automatically
    /// as new ones are published.
    pub fn new() -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(100);
        EventBus { sender }
    }

    /// Subscribes to the event bus and returns a [`tokio::sync::broadcast::Receiver`].
    ///
    /// The returned receiver will receive all future events published after the
    /// subscription is created.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publishes an [`Event`] to all active subscribers.
    ///
    /// This method clones the event and attempts to send it to each receiver.
    /// If no subscribers exist, the event is discarded silently.
    ///
    /// # Arguments
    ///
    /// * `event` - The event instance to be published.
    pub fn publish(&self, event: &Event) {
        let _ = self.sender.send(event.clone());
    }

    /// Creates a [`ModuleCtx`] bound to this [`EventBus`].
    ///
    /// The returned context can be used by modules implementing [`Module`]
    /// to send and receive events within their execution scope.
    pub fn context(&self) -> ModuleCtx {
        ModuleCtx::new(self)
    }
}

/// Provides a default instance of [`EventBus`].
impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Defines the common interface for an asynchronous module
/// that can be executed and communicate via the [`EventBus`].
#[async_trait::async_trait]
pub trait Module {
    /// Runs the module asynchronously until completion.
    ///
    /// This function typically contains the module's main event loop,
    /// reacting to messages received through the [`ModuleCtx`].
    async fn run(&mut self) -> Result<(), ()>;
}

/// Provides a module-scoped context for interacting with the [`EventBus`].
///
/// Each `ModuleCtx` owns both a sender and a receiver, allowing the module
/// to both publish and listen for events concurrently.
pub struct ModuleCtx {
    /// The broadcast sender used to publish events.
    pub sender: tokio::sync::broadcast::Sender<Event>,

    /// The broadcast receiver used to listen for events.
    pub receiver: tokio::sync::broadcast::Receiver<Event>,
}

impl ModuleCtx {
    /// Constructs a new [`ModuleCtx`] from the given [`EventBus`].
    ///
    /// Clones the internal broadcast sender and creates a new receiver.
    pub fn new(event_bus: &EventBus) -> Self {
        ModuleCtx {
            sender: event_bus.sender.clone(),
            receiver: event_bus.subscribe(),
        }
    }

    /// Publishes an event constructed from `kind` on the bus this context
    /// belongs to.
    pub fn publish_event(
        &self,
        kind: EventKind,
    ) -> Result<usize, tokio::sync::broadcast::error::SendError<Event>> {
        self.sender.send(Event { kind })
    }
}

pub mod test_helper;
