//! Headless test harness: an in-memory scene graph and engine driving a
//! real `Viewport`, with every bus event recorded.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use glam::{Mat4, Vec3};
use shared::{
    AttributeValue, EntityId, NodeDescription, NodeId, NodeKind, SceneDescription, Transform, Xyz,
};

use crate::events::{EditorEvent, EventBus, Topic};
use crate::scene::{Engine, Pose, SceneGraph};
use crate::session::EditorSession;
use crate::settings::ViewportSettings;
use crate::telemetry::{Telemetry, TelemetrySink};
use crate::viewport::gizmo::GizmoAxis;
use crate::viewport::helpers::PICKER_NAME;
use crate::viewport::input::PointerButton;
use crate::viewport::picking::{ray_aabb, Aabb, Ray};
use crate::viewport::Viewport;

/// Edge length of the box a helper's picker proxy occupies
const PICKER_SIZE: f32 = 0.5;

// ── In-memory scene ──────────────────────────────────────────

#[derive(Debug, Clone)]
struct MemoryNode {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    owner: Option<EntityId>,
    pose: Pose,
    /// Local-space geometry box
    geometry: Option<Aabb>,
}

#[derive(Debug, Clone)]
struct MemoryEntity {
    name: String,
    kind: NodeKind,
    node: NodeId,
    attributes: BTreeMap<String, AttributeValue>,
}

/// Scene graph kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: HashMap<NodeId, MemoryNode>,
    entities: HashMap<EntityId, MemoryEntity>,
    /// Top-level nodes attached to the scene
    roots: Vec<NodeId>,
    /// Helper root -> helped node
    helpers: HashMap<NodeId, NodeId>,
    helper_updates: HashMap<NodeId, usize>,
    active_camera: Option<EntityId>,
}

fn pose_of(transform: &Transform) -> Pose {
    let v = |a: [f64; 3]| Vec3::new(a[0] as f32, a[1] as f32, a[2] as f32);
    Pose {
        position: v(transform.position),
        rotation: v(transform.rotation.map(f64::to_radians)),
        scale: v(transform.scale),
    }
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity (and its children) under `parent`, or as a scene
    /// root when `parent` is `None`. Returns the entity and its node.
    pub fn spawn(&mut self, desc: &NodeDescription, parent: Option<NodeId>) -> (EntityId, NodeId) {
        let (entity, node) = self.create(desc, parent);
        match parent {
            Some(p) => {
                if let Some(parent) = self.nodes.get_mut(&p) {
                    parent.children.push(node);
                }
            }
            None => self.roots.push(node),
        }
        (entity, node)
    }

    /// Create an entity that is never attached to the scene tree
    pub fn spawn_detached(&mut self, desc: &NodeDescription) -> (EntityId, NodeId) {
        self.create(desc, None)
    }

    fn create(&mut self, desc: &NodeDescription, parent: Option<NodeId>) -> (EntityId, NodeId) {
        let entity = EntityId::new();
        let node = NodeId::new();
        let geometry = match &desc.kind {
            NodeKind::Mesh { size } => Some(Aabb::centered(Vec3::new(
                size[0] as f32,
                size[1] as f32,
                size[2] as f32,
            ))),
            _ => None,
        };
        self.nodes.insert(
            node,
            MemoryNode {
                name: desc.name.clone(),
                parent,
                children: Vec::new(),
                owner: Some(entity),
                pose: pose_of(&desc.transform),
                geometry,
            },
        );

        let t = &desc.transform;
        let mut attributes = BTreeMap::new();
        attributes.insert("position".to_string(), AttributeValue::Vec3(Xyz::from(t.position)));
        attributes.insert("rotation".to_string(), AttributeValue::Vec3(Xyz::from(t.rotation)));
        attributes.insert("scale".to_string(), AttributeValue::Vec3(Xyz::from(t.scale)));
        self.entities.insert(
            entity,
            MemoryEntity {
                name: desc.name.clone(),
                kind: desc.kind.clone(),
                node,
                attributes,
            },
        );
        if matches!(desc.kind, NodeKind::Camera { active: true }) {
            self.active_camera = Some(entity);
        }

        for child in &desc.children {
            let (_, child_node) = self.create(child, Some(node));
            if let Some(n) = self.nodes.get_mut(&node) {
                n.children.push(child_node);
            }
        }
        (entity, node)
    }

    /// Remove `node` and its subtree from the scene, dropping their entities
    pub fn detach(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.nodes.get(&node).map(|n| n.parent) else {
            return false;
        };
        match parent {
            Some(p) => {
                if let Some(parent) = self.nodes.get_mut(&p) {
                    parent.children.retain(|c| *c != node);
                }
            }
            None => self.roots.retain(|r| *r != node),
        }
        for n in self.descendants(node) {
            if let Some(removed) = self.nodes.remove(&n) {
                if let Some(entity) = removed.owner {
                    self.entities.remove(&entity);
                }
            }
        }
        true
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn entity_named(&self, name: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .find_map(|(id, e)| (e.name == name).then_some(*id))
    }

    pub fn entity_name(&self, entity: EntityId) -> Option<&str> {
        self.entities.get(&entity).map(|e| e.name.as_str())
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn helper_count(&self) -> usize {
        self.helpers.len()
    }

    pub fn helper_update_count(&self, helper: NodeId) -> usize {
        self.helper_updates.get(&helper).copied().unwrap_or(0)
    }

    /// Swap an entity's geometry box (size zero removes it)
    pub fn set_geometry(&mut self, entity: EntityId, size: Vec3) {
        let Some(node) = self.object_of(entity) else {
            return;
        };
        if let Some(n) = self.nodes.get_mut(&node) {
            n.geometry = (size != Vec3::ZERO).then(|| Aabb::centered(size));
        }
    }

    /// Swap an entity's kind, e.g. turn a group into a light
    pub fn set_kind(&mut self, entity: EntityId, kind: NodeKind) {
        if let Some(e) = self.entities.get_mut(&entity) {
            e.kind = kind;
        }
    }

    /// World-space geometry box of a single node
    pub fn world_geometry(&self, node: NodeId) -> Option<Aabb> {
        let geometry = self.nodes.get(&node)?.geometry?;
        Some(geometry.transformed(&self.world_matrix(node)?))
    }
}

impl SceneGraph for MemoryScene {
    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn name(&self, node: NodeId) -> Option<String> {
        self.nodes.get(&node).map(|n| n.name.clone())
    }

    fn owner(&self, node: NodeId) -> Option<EntityId> {
        self.nodes.get(&node)?.owner
    }

    fn object_of(&self, entity: EntityId) -> Option<NodeId> {
        self.entities.get(&entity).map(|e| e.node)
    }

    fn has_renderable_geometry(&self, entity: EntityId) -> bool {
        self.object_of(entity)
            .and_then(|node| self.nodes.get(&node))
            .is_some_and(|n| n.geometry.is_some())
    }

    fn bounds(&self, node: NodeId) -> Option<Aabb> {
        self.descendants(node)
            .into_iter()
            .filter_map(|n| self.world_geometry(n))
            .reduce(|a, b| a.union(&b))
    }

    fn local_pose(&self, node: NodeId) -> Option<Pose> {
        self.nodes.get(&node).map(|n| n.pose)
    }

    fn set_local_pose(&mut self, node: NodeId, pose: Pose) -> bool {
        match self.nodes.get_mut(&node) {
            Some(n) => {
                n.pose = pose;
                true
            }
            None => false,
        }
    }

    fn world_matrix(&self, node: NodeId) -> Option<Mat4> {
        let n = self.nodes.get(&node)?;
        let local = n.pose.matrix();
        match n.parent {
            Some(parent) => Some(self.world_matrix(parent)? * local),
            None => Some(local),
        }
    }

    fn parent_world_matrix(&self, node: NodeId) -> Mat4 {
        self.nodes
            .get(&node)
            .and_then(|n| n.parent)
            .and_then(|parent| self.world_matrix(parent))
            .unwrap_or(Mat4::IDENTITY)
    }

    fn attribute(&self, entity: EntityId, name: &str) -> Option<AttributeValue> {
        self.entities.get(&entity)?.attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, entity: EntityId, name: &str, value: AttributeValue) {
        if let Some(e) = self.entities.get_mut(&entity) {
            e.attributes.insert(name.to_string(), value);
        }
    }

    fn active_camera(&self) -> Option<EntityId> {
        self.active_camera
    }

    fn set_active_camera(&mut self, camera: EntityId) {
        self.active_camera = Some(camera);
    }

    fn requires_helper(&self, node: NodeId) -> bool {
        self.owner(node)
            .and_then(|entity| self.entities.get(&entity))
            .is_some_and(|e| matches!(e.kind, NodeKind::Light | NodeKind::Camera { .. }))
    }

    fn create_helper(&mut self, target: NodeId) -> Option<NodeId> {
        let position = self.world_matrix(target)?.transform_point3(Vec3::ZERO);
        let helper = NodeId::new();
        let picker = NodeId::new();
        self.nodes.insert(
            helper,
            MemoryNode {
                name: "helper".to_string(),
                parent: None,
                children: vec![picker],
                owner: None,
                pose: Pose::at(position),
                geometry: None,
            },
        );
        self.nodes.insert(
            picker,
            MemoryNode {
                name: PICKER_NAME.to_string(),
                parent: Some(helper),
                children: Vec::new(),
                owner: None,
                pose: Pose::IDENTITY,
                geometry: Some(Aabb::centered(Vec3::splat(PICKER_SIZE))),
            },
        );
        self.helpers.insert(helper, target);
        Some(helper)
    }

    fn dispose_helper(&mut self, helper: NodeId) {
        if self.helpers.remove(&helper).is_none() {
            return;
        }
        for n in self.descendants(helper) {
            self.nodes.remove(&n);
        }
        self.helper_updates.remove(&helper);
    }

    fn helper_target(&self, helper: NodeId) -> Option<NodeId> {
        self.helpers.get(&helper).copied()
    }

    fn update_helper(&mut self, helper: NodeId) {
        let Some(target) = self.helpers.get(&helper).copied() else {
            return;
        };
        if let Some(position) = self.world_matrix(target).map(|m| m.transform_point3(Vec3::ZERO)) {
            if let Some(n) = self.nodes.get_mut(&helper) {
                n.pose = Pose::at(position);
            }
        }
        *self.helper_updates.entry(helper).or_default() += 1;
    }
}

// ── In-memory engine ─────────────────────────────────────────

/// Engine stand-in: a fixed container rect and box raycasts
pub struct MemoryEngine {
    scene: Rc<RefCell<MemoryScene>>,
    rect: egui::Rect,
    chrome_visible: bool,
}

impl MemoryEngine {
    pub fn new(scene: Rc<RefCell<MemoryScene>>, rect: egui::Rect) -> Self {
        Self {
            scene,
            rect,
            chrome_visible: true,
        }
    }

    pub fn set_rect(&mut self, rect: egui::Rect) {
        self.rect = rect;
    }

    pub fn chrome_visible(&self) -> bool {
        self.chrome_visible
    }
}

impl Engine for MemoryEngine {
    fn container_rect(&self) -> egui::Rect {
        self.rect
    }

    fn raycast(&self, ray: &Ray, node: NodeId) -> Option<f32> {
        let bounds = self.scene.borrow().world_geometry(node)?;
        ray_aabb(ray, &bounds)
    }

    fn set_chrome_visible(&mut self, visible: bool) {
        self.chrome_visible = visible;
    }
}

// ── Harness ──────────────────────────────────────────────────

struct RecordingSink(Rc<RefCell<Vec<String>>>);

impl TelemetrySink for RecordingSink {
    fn track(&self, category: &str, action: &str, label: Option<&str>) {
        tracing::debug!(category, action, label = ?label, "telemetry");
        let entry = match label {
            Some(label) => format!("{action}:{label}"),
            None => action.to_string(),
        };
        self.0.borrow_mut().push(entry);
    }
}

/// Headless viewport over an in-memory scene
pub struct TestHarness {
    pub scene: Rc<RefCell<MemoryScene>>,
    pub engine: Rc<RefCell<MemoryEngine>>,
    pub viewport: Viewport,
    edit_camera: EntityId,
    events: Rc<RefCell<Vec<EditorEvent>>>,
    telemetry: Rc<RefCell<Vec<String>>>,
}

impl TestHarness {
    /// Harness with default settings and an 800x600 container
    pub fn new() -> Self {
        Self::with_settings(ViewportSettings::default())
    }

    pub fn with_settings(settings: ViewportSettings) -> Self {
        let scene = Rc::new(RefCell::new(MemoryScene::new()));
        let rect = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(800.0, 600.0));
        let engine = Rc::new(RefCell::new(MemoryEngine::new(scene.clone(), rect)));

        let edit_camera_desc = NodeDescription {
            name: "editor camera".to_string(),
            kind: NodeKind::Camera { active: false },
            transform: Transform::new(),
            children: Vec::new(),
        };
        let (edit_camera, _) = scene.borrow_mut().spawn_detached(&edit_camera_desc);

        let telemetry_log = Rc::new(RefCell::new(Vec::new()));
        let telemetry = Telemetry::new(
            Some(Box::new(RecordingSink(telemetry_log.clone()))),
            &settings.telemetry,
        );

        let scene_dyn: Rc<RefCell<dyn SceneGraph>> = scene.clone();
        let engine_dyn: Rc<RefCell<dyn Engine>> = engine.clone();
        let session = EditorSession::new(scene_dyn, engine_dyn, edit_camera, settings, telemetry);

        // the recorder subscribes first so it sees events in emission order
        let bus = Rc::new(EventBus::new());
        let events = Rc::new(RefCell::new(Vec::new()));
        for topic in Topic::ALL {
            let events = events.clone();
            bus.on(topic, move |event| events.borrow_mut().push(event.clone()));
        }
        let viewport = Viewport::with_bus(session, bus);

        Self {
            scene,
            engine,
            viewport,
            edit_camera,
            events,
            telemetry: telemetry_log,
        }
    }

    // ── Scene ─────────────────────────────────────────────────

    /// Attach every entity of `desc` and announce it to the viewport
    pub fn load_scene(&mut self, desc: &SceneDescription) -> Vec<EntityId> {
        desc.entities.iter().map(|e| self.add_entity(e)).collect()
    }

    pub fn load_scene_json(&mut self, json: &str) -> Result<Vec<EntityId>, String> {
        let desc = SceneDescription::from_json(json).map_err(|e| format!("JSON parse error: {e}"))?;
        Ok(self.load_scene(&desc))
    }

    pub fn add_entity(&mut self, desc: &NodeDescription) -> EntityId {
        let (entity, node) = self.scene.borrow_mut().spawn(desc, None);
        self.viewport.add_object(node);
        entity
    }

    /// Add `desc` as a child of `parent`
    pub fn add_child(&mut self, parent: EntityId, desc: &NodeDescription) -> Option<EntityId> {
        let parent_node = self.node_of(parent)?;
        let (entity, node) = self.scene.borrow_mut().spawn(desc, Some(parent_node));
        self.viewport.add_object(node);
        Some(entity)
    }

    /// Announce removal, then detach the subtree
    pub fn remove_entity(&mut self, entity: EntityId) -> bool {
        let Some(node) = self.node_of(entity) else {
            return false;
        };
        self.viewport.remove_object(node);
        self.scene.borrow_mut().detach(node)
    }

    pub fn entity(&self, name: &str) -> Option<EntityId> {
        self.scene.borrow().entity_named(name)
    }

    pub fn node_of(&self, entity: EntityId) -> Option<NodeId> {
        self.scene.borrow().object_of(entity)
    }

    pub fn edit_camera(&self) -> EntityId {
        self.edit_camera
    }

    pub fn active_camera(&self) -> Option<EntityId> {
        self.scene.borrow().active_camera()
    }

    pub fn attribute(&self, entity: EntityId, name: &str) -> Option<Xyz> {
        self.scene.borrow().attribute(entity, name)?.as_xyz()
    }

    pub fn local_pose(&self, entity: EntityId) -> Option<Pose> {
        let node = self.node_of(entity)?;
        self.scene.borrow().local_pose(node)
    }

    pub fn selected(&self) -> Option<EntityId> {
        self.viewport.selection().selected().map(|s| s.entity)
    }

    // ── Input ─────────────────────────────────────────────────

    /// Client pixel position of a world point
    pub fn client_point_of(&self, world: Vec3) -> Option<egui::Pos2> {
        let rect = self.engine.borrow().container_rect();
        self.viewport.session().camera.borrow().project(world, rect)
    }

    /// Client pixel position of an entity's bounds center
    pub fn client_point_of_entity(&self, entity: EntityId) -> Option<egui::Pos2> {
        let node = self.node_of(entity)?;
        let center = self.scene.borrow().bounds(node)?.center();
        self.client_point_of(center)
    }

    pub fn click_at(&mut self, pos: egui::Pos2) {
        self.viewport.mouse_down(pos, PointerButton::Primary);
        self.viewport.mouse_up(pos);
    }

    pub fn click_entity(&mut self, entity: EntityId) -> bool {
        match self.client_point_of_entity(entity) {
            Some(pos) => {
                self.click_at(pos);
                true
            }
            None => false,
        }
    }

    /// Client position of a point on the gizmo handle for `axis`
    pub fn gizmo_handle_point(&self, axis: GizmoAxis) -> Option<egui::Pos2> {
        let (center, dir, size) = {
            let gizmo = self.viewport.gizmo();
            (gizmo.center()?, gizmo.axis_direction(axis), gizmo.size())
        };
        let along = match self.viewport.gizmo().mode() {
            shared::TransformMode::Rotate => {
                // a point on the ring around `axis`, off the other two rings
                let a = dir.any_orthonormal_vector();
                let b = dir.cross(a);
                return self.client_point_of(center + (a + b).normalize() * size);
            }
            _ => dir * size * 0.8,
        };
        self.client_point_of(center + along)
    }

    /// Press on the `axis` handle, move to each offset in `steps` (relative
    /// to the press point), release at the last one. Returns false if the
    /// gizmo did not engage.
    pub fn drag_gizmo(&mut self, axis: GizmoAxis, steps: &[egui::Vec2]) -> bool {
        let Some(start) = self.gizmo_handle_point(axis) else {
            return false;
        };
        self.viewport.mouse_down(start, PointerButton::Primary);
        if !self.viewport.gizmo().is_dragging() {
            return false;
        }
        let mut pos = start;
        for step in steps {
            pos = start + *step;
            self.viewport.mouse_move(pos);
        }
        self.viewport.mouse_up(pos);
        true
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        let rect = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(width, height));
        self.engine.borrow_mut().set_rect(rect);
        self.viewport.resize();
    }

    pub fn open(&mut self) {
        self.viewport.open();
    }

    pub fn close(&mut self) {
        self.viewport.close();
    }

    // ── Recorded output ───────────────────────────────────────

    pub fn events(&self) -> Vec<EditorEvent> {
        self.events.borrow().clone()
    }

    pub fn events_of(&self, topic: Topic) -> Vec<EditorEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.topic() == topic)
            .cloned()
            .collect()
    }

    pub fn clear_events(&mut self) {
        self.events.borrow_mut().clear();
    }

    pub fn telemetry(&self) -> Vec<String> {
        self.telemetry.borrow().clone()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
