//! Viewport interaction core: picking, selection, gizmo, helpers and the
//! edit camera, wired together through the event bus.

pub mod camera;
pub mod edit_mode;
pub mod gizmo;
pub mod helpers;
pub mod input;
pub mod picking;
pub mod selection;

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use glam::Vec2;
use shared::{EntityId, NodeId, TransformMode, TransformSpace};

use crate::events::{EditorEvent, EventBus, Outbox, Topic};
use crate::scene::SceneMutation;
use crate::session::EditorSession;
use camera::{EditorControls, OrbitGesture};
use edit_mode::EditMode;
use gizmo::TransformGizmo;
use helpers::HelperSync;
use input::{normalize_pointer, PointerButton, PointerState};
use picking::{pick_nearest, PickHit, PickIndex};
use selection::SelectionHighlight;

/// Route `topics` on `bus` to `handle` on `component`. The component borrow
/// is released before its outbox is published.
fn subscribe<C: 'static>(
    bus: &Rc<EventBus>,
    topics: &[Topic],
    component: &Rc<RefCell<C>>,
    handle: fn(&mut C, &EditorEvent) -> Outbox,
) {
    for &topic in topics {
        let weak = Rc::downgrade(bus);
        let component = Rc::clone(component);
        bus.on(topic, move |event| {
            let out = handle(&mut component.borrow_mut(), event);
            if let Some(bus) = weak.upgrade() {
                bus.emit_all(out);
            }
        });
    }
}

/// Composition root of the viewport core
pub struct Viewport {
    bus: Rc<EventBus>,
    session: EditorSession,
    pick_index: Rc<RefCell<PickIndex>>,
    helpers: Rc<RefCell<HelperSync>>,
    selection: Rc<RefCell<SelectionHighlight>>,
    gizmo: Rc<RefCell<TransformGizmo>>,
    controls: Rc<RefCell<EditorControls>>,
    edit_mode: Rc<RefCell<EditMode>>,
    pointer: PointerState,
}

impl Viewport {
    pub fn new(session: EditorSession) -> Self {
        Self::with_bus(session, Rc::new(EventBus::new()))
    }

    /// Build on an existing bus so outside panels can subscribe first.
    pub fn with_bus(session: EditorSession, bus: Rc<EventBus>) -> Self {
        let pick_index = Rc::new(RefCell::new(PickIndex::new()));
        let helpers = Rc::new(RefCell::new(HelperSync::new(session.clone(), pick_index.clone())));
        let selection = Rc::new(RefCell::new(SelectionHighlight::new(session.clone())));
        let gizmo = Rc::new(RefCell::new(TransformGizmo::new(session.clone())));
        let controls = Rc::new(RefCell::new(EditorControls::new(session.clone())));
        let edit_mode = Rc::new(RefCell::new(EditMode::new(session.clone(), false)));

        subscribe(
            &bus,
            &[
                Topic::ObjectAdded,
                Topic::ObjectRemoved,
                Topic::HelperAdded,
                Topic::HelperRemoved,
                Topic::ObjectChanged,
                Topic::GeometryChanged,
                Topic::ShowGridChanged,
            ],
            &helpers,
            HelperSync::handle,
        );
        subscribe(
            &bus,
            &[
                Topic::ObjectSelected,
                Topic::GeometryChanged,
                Topic::ObjectChanged,
                Topic::ObjectRemoved,
                Topic::ComponentChanged,
            ],
            &selection,
            SelectionHighlight::handle,
        );
        subscribe(
            &bus,
            &[
                Topic::ObjectSelected,
                Topic::ObjectRemoved,
                Topic::TransformModeChanged,
                Topic::SnapChanged,
                Topic::SpaceChanged,
                Topic::ObjectChanged,
                Topic::EditorCameraChanged,
                Topic::WindowResize,
            ],
            &gizmo,
            TransformGizmo::handle,
        );
        subscribe(
            &bus,
            &[
                Topic::TransformStarted,
                Topic::TransformFinished,
                Topic::InspectorCleared,
                Topic::ObjectFocused,
                Topic::WindowResize,
            ],
            &controls,
            EditorControls::handle,
        );
        subscribe(
            &bus,
            &[Topic::InspectorModeChanged, Topic::CameraActivated],
            &edit_mode,
            EditMode::handle,
        );

        tracing::info!("viewport ready (edit camera {})", session.edit_camera);
        Self {
            bus,
            session,
            pick_index,
            helpers,
            selection,
            gizmo,
            controls,
            edit_mode,
            pointer: PointerState::new(),
        }
    }

    // ── Pointer input ────────────────────────────────────────

    /// Container-normalized coords for a client position
    fn normalized(&self, pos: egui::Pos2) -> Option<Vec2> {
        normalize_pointer(pos, self.session.container_rect())
    }

    pub fn mouse_down(&mut self, pos: egui::Pos2, button: PointerButton) {
        let Some(point) = self.normalized(pos) else {
            return;
        };
        if button == PointerButton::Primary {
            let out = self.gizmo.borrow_mut().pointer_down(pos);
            if !out.is_empty() {
                self.bus.emit_all(out);
                return;
            }
        }
        self.pointer.press(point);
        let gesture = match button {
            PointerButton::Primary => OrbitGesture::Rotate,
            PointerButton::Secondary => OrbitGesture::Pan,
        };
        self.controls.borrow_mut().begin(gesture, pos);
    }

    pub fn mouse_move(&mut self, pos: egui::Pos2) {
        let dragging = self.gizmo.borrow().is_dragging();
        let out = if dragging {
            self.gizmo.borrow_mut().pointer_move(pos)
        } else {
            self.controls.borrow_mut().pointer_move(pos)
        };
        self.bus.emit_all(out);
    }

    pub fn mouse_up(&mut self, pos: egui::Pos2) {
        let out = self.gizmo.borrow_mut().pointer_up();
        self.bus.emit_all(out);
        self.controls.borrow_mut().end();
        self.release(pos);
    }

    pub fn touch_start(&mut self, pos: egui::Pos2) {
        if let Some(point) = self.normalized(pos) {
            self.pointer.press(point);
        }
    }

    pub fn touch_end(&mut self, pos: egui::Pos2) {
        self.release(pos);
    }

    fn release(&mut self, pos: egui::Pos2) {
        let Some(point) = self.normalized(pos) else {
            return;
        };
        if let Some(point) = self.pointer.release(point) {
            self.click(point);
        }
    }

    /// Select whatever lies under `point`, or deselect on a miss.
    fn click(&mut self, point: Vec2) {
        let entity = self.pick(point).and_then(|hit| {
            let scene = self.session.scene.borrow();
            hit.resolve_owner(&*scene)
        });
        self.select_entity(entity);
    }

    /// Focus the edit camera on the object under `pos`. Misses do nothing.
    pub fn double_click(&mut self, pos: egui::Pos2) {
        let Some(point) = self.normalized(pos) else {
            return;
        };
        if let Some(hit) = self.pick(point) {
            self.bus.emit(EditorEvent::ObjectFocused(hit.entry.node));
        }
    }

    pub fn wheel(&mut self, delta: f32) {
        let out = self.controls.borrow_mut().wheel(delta);
        self.bus.emit_all(out);
    }

    /// Nearest pickable under container-normalized `point`
    pub fn pick(&self, point: Vec2) -> Option<PickHit> {
        let ray = self.session.camera.borrow().ray_from_normalized(point);
        let candidates = self.pick_index.borrow().entries().to_vec();
        let engine = self.session.engine.borrow();
        pick_nearest(&ray, &candidates, &*engine)
    }

    // ── Host notifications ───────────────────────────────────

    pub fn select_entity(&self, entity: Option<EntityId>) {
        self.bus.emit(EditorEvent::ObjectSelected(entity));
    }

    /// A render subtree was attached to the scene
    pub fn add_object(&self, node: NodeId) {
        self.bus.emit(EditorEvent::ObjectAdded(node));
    }

    /// A render subtree is about to be detached. Call before detaching.
    pub fn remove_object(&self, node: NodeId) {
        self.bus.emit(EditorEvent::ObjectRemoved(node));
    }

    pub fn object_changed(&self, node: NodeId) {
        self.bus.emit(EditorEvent::ObjectChanged(node));
    }

    pub fn geometry_changed(&self, node: NodeId) {
        self.bus.emit(EditorEvent::GeometryChanged(node));
    }

    pub fn component_changed(&self, entity: EntityId, component: &str) {
        self.bus.emit(EditorEvent::ComponentChanged {
            entity,
            component: component.to_string(),
        });
    }

    pub fn camera_activated(&self, camera: EntityId) {
        self.bus.emit(EditorEvent::CameraActivated(camera));
    }

    pub fn observe_mutations(&self, mutations: Vec<SceneMutation>) {
        if !mutations.is_empty() {
            self.bus.emit(EditorEvent::DomModified(mutations));
        }
    }

    pub fn set_mode(&self, mode: TransformMode) {
        self.bus.emit(EditorEvent::TransformModeChanged(mode));
    }

    /// Mode from a host string. Unknown names are logged and ignored.
    pub fn set_mode_str(&self, name: &str) -> bool {
        match TransformMode::parse(name) {
            Some(mode) => {
                self.set_mode(mode);
                true
            }
            None => {
                tracing::warn!("Ignoring unknown transform mode '{name}'");
                false
            }
        }
    }

    pub fn set_snap(&self, snap: Option<f32>) {
        self.bus.emit(EditorEvent::SnapChanged(snap));
    }

    pub fn set_space(&self, space: TransformSpace) {
        self.bus.emit(EditorEvent::SpaceChanged(space));
    }

    pub fn show_grid(&self, visible: bool) {
        self.bus.emit(EditorEvent::ShowGridChanged(visible));
    }

    /// The container was resized; the host rect already reflects it.
    pub fn resize(&self) {
        self.bus.emit(EditorEvent::WindowResize);
    }

    pub fn open(&self) {
        self.bus.emit(EditorEvent::InspectorModeChanged(true));
    }

    pub fn close(&self) {
        self.bus.emit(EditorEvent::InspectorModeChanged(false));
    }

    pub fn clear(&self) {
        self.bus.emit(EditorEvent::InspectorCleared);
    }

    // ── Accessors ────────────────────────────────────────────

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn pick_index(&self) -> Ref<'_, PickIndex> {
        self.pick_index.borrow()
    }

    pub fn helpers(&self) -> Ref<'_, HelperSync> {
        self.helpers.borrow()
    }

    pub fn selection(&self) -> Ref<'_, SelectionHighlight> {
        self.selection.borrow()
    }

    pub fn gizmo(&self) -> Ref<'_, TransformGizmo> {
        self.gizmo.borrow()
    }

    pub fn controls(&self) -> Ref<'_, EditorControls> {
        self.controls.borrow()
    }

    pub fn edit_mode(&self) -> Ref<'_, EditMode> {
        self.edit_mode.borrow()
    }
}
