//! Typed publish/subscribe bus connecting the viewport components.
//!
//! Every emission is delivered synchronously, in subscription order, before
//! `emit` returns. Handlers may emit further events and may subscribe new
//! handlers while a delivery is in progress: the subscriber list is
//! snapshotted per emission, so late subscribers only see later events.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;
use shared::{EntityId, NodeId, TransformMode, TransformSpace};

use crate::scene::SceneMutation;

/// Bus topic. One per `EditorEvent` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    ObjectSelected,
    ObjectFocused,
    ObjectAdded,
    ObjectRemoved,
    ObjectChanged,
    GeometryChanged,
    HelperAdded,
    HelperRemoved,
    TransformModeChanged,
    SnapChanged,
    SpaceChanged,
    ShowGridChanged,
    WindowResize,
    InspectorModeChanged,
    RefreshSidebarObject3D,
    CameraActivated,
    ComponentChanged,
    InspectorCleared,
    TransformStarted,
    TransformFinished,
    EditorCameraChanged,
    DomModified,
}

impl Topic {
    pub const ALL: [Topic; 22] = [
        Topic::ObjectSelected,
        Topic::ObjectFocused,
        Topic::ObjectAdded,
        Topic::ObjectRemoved,
        Topic::ObjectChanged,
        Topic::GeometryChanged,
        Topic::HelperAdded,
        Topic::HelperRemoved,
        Topic::TransformModeChanged,
        Topic::SnapChanged,
        Topic::SpaceChanged,
        Topic::ShowGridChanged,
        Topic::WindowResize,
        Topic::InspectorModeChanged,
        Topic::RefreshSidebarObject3D,
        Topic::CameraActivated,
        Topic::ComponentChanged,
        Topic::InspectorCleared,
        Topic::TransformStarted,
        Topic::TransformFinished,
        Topic::EditorCameraChanged,
        Topic::DomModified,
    ];
}

/// Event payloads, one shape per topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "topic", content = "payload", rename_all = "camelCase")]
pub enum EditorEvent {
    /// New selection, or `None` to deselect
    ObjectSelected(Option<EntityId>),
    /// Frame the edit camera on this node
    ObjectFocused(NodeId),
    /// Render subtree attached to the scene
    ObjectAdded(NodeId),
    /// Render subtree about to leave the scene
    ObjectRemoved(NodeId),
    ObjectChanged(NodeId),
    GeometryChanged(NodeId),
    /// Helper visual root (its `picker` child is the pick proxy)
    HelperAdded(NodeId),
    HelperRemoved(NodeId),
    TransformModeChanged(TransformMode),
    /// Translation snap increment, `None` disables snapping
    SnapChanged(Option<f32>),
    SpaceChanged(TransformSpace),
    ShowGridChanged(bool),
    WindowResize,
    InspectorModeChanged(bool),
    RefreshSidebarObject3D(NodeId),
    /// Scene-level "camera set active" notification
    CameraActivated(EntityId),
    ComponentChanged {
        entity: EntityId,
        component: String,
    },
    InspectorCleared,
    /// Gizmo engaged on this node
    TransformStarted(NodeId),
    /// Gizmo released; `changed` compares the pose against the engage snapshot
    TransformFinished {
        node: NodeId,
        mode: TransformMode,
        changed: bool,
    },
    EditorCameraChanged,
    DomModified(Vec<SceneMutation>),
}

impl EditorEvent {
    pub fn topic(&self) -> Topic {
        match self {
            EditorEvent::ObjectSelected(_) => Topic::ObjectSelected,
            EditorEvent::ObjectFocused(_) => Topic::ObjectFocused,
            EditorEvent::ObjectAdded(_) => Topic::ObjectAdded,
            EditorEvent::ObjectRemoved(_) => Topic::ObjectRemoved,
            EditorEvent::ObjectChanged(_) => Topic::ObjectChanged,
            EditorEvent::GeometryChanged(_) => Topic::GeometryChanged,
            EditorEvent::HelperAdded(_) => Topic::HelperAdded,
            EditorEvent::HelperRemoved(_) => Topic::HelperRemoved,
            EditorEvent::TransformModeChanged(_) => Topic::TransformModeChanged,
            EditorEvent::SnapChanged(_) => Topic::SnapChanged,
            EditorEvent::SpaceChanged(_) => Topic::SpaceChanged,
            EditorEvent::ShowGridChanged(_) => Topic::ShowGridChanged,
            EditorEvent::WindowResize => Topic::WindowResize,
            EditorEvent::InspectorModeChanged(_) => Topic::InspectorModeChanged,
            EditorEvent::RefreshSidebarObject3D(_) => Topic::RefreshSidebarObject3D,
            EditorEvent::CameraActivated(_) => Topic::CameraActivated,
            EditorEvent::ComponentChanged { .. } => Topic::ComponentChanged,
            EditorEvent::InspectorCleared => Topic::InspectorCleared,
            EditorEvent::TransformStarted(_) => Topic::TransformStarted,
            EditorEvent::TransformFinished { .. } => Topic::TransformFinished,
            EditorEvent::EditorCameraChanged => Topic::EditorCameraChanged,
            EditorEvent::DomModified(_) => Topic::DomModified,
        }
    }
}

/// Events a component wants published once its own borrow is released.
pub type Outbox = Vec<EditorEvent>;

pub type Handler = Rc<dyn Fn(&EditorEvent)>;

/// Synchronous, single-threaded event bus
#[derive(Default)]
pub struct EventBus {
    subscribers: RefCell<HashMap<Topic, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `topic` for the lifetime of the bus.
    pub fn on(&self, topic: Topic, handler: impl Fn(&EditorEvent) + 'static) {
        self.subscribers
            .borrow_mut()
            .entry(topic)
            .or_default()
            .push(Rc::new(handler));
    }

    /// Deliver `event` to every current subscriber of its topic.
    pub fn emit(&self, event: EditorEvent) {
        let topic = event.topic();
        let handlers: Vec<Handler> = self
            .subscribers
            .borrow()
            .get(&topic)
            .cloned()
            .unwrap_or_default();
        tracing::trace!("emit {topic:?} to {} subscriber(s)", handlers.len());
        for handler in handlers {
            handler(&event);
        }
    }

    /// Emit a batch in order.
    pub fn emit_all(&self, events: impl IntoIterator<Item = EditorEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers
            .borrow()
            .get(&topic)
            .map_or(0, |handlers| handlers.len())
    }
}
