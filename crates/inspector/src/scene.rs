//! Collaborator interfaces: the host scene graph and the rendering engine.
//!
//! The viewport core only observes and mutates the host through these two
//! traits. Capability queries (`has_renderable_geometry`, `bounds`,
//! `requires_helper`) replace any inspection of engine object internals.

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::Serialize;
use shared::{AttributeValue, EntityId, NodeId};

use crate::viewport::picking::{Aabb, Ray};

/// Position, rotation (XYZ Euler, radians) and scale of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }
}

/// Structural mutation reported by the host's scene observer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneMutation {
    ChildrenChanged { node: NodeId },
    AttributeChanged { entity: EntityId, name: String },
    ContentChanged { node: NodeId },
}

/// Host scene graph
pub trait SceneGraph {
    /// Direct children of a render node
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// `node` followed by all of its descendants, depth first
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut children = self.children(current);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    fn name(&self, node: NodeId) -> Option<String>;

    /// First node named `name` in the subtree rooted at `node`
    fn find_named(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(node)
            .into_iter()
            .find(|n| self.name(*n).as_deref() == Some(name))
    }

    /// Logical entity owning a render node
    fn owner(&self, node: NodeId) -> Option<EntityId>;

    /// Root render node of an entity
    fn object_of(&self, entity: EntityId) -> Option<NodeId>;

    fn has_renderable_geometry(&self, entity: EntityId) -> bool;

    /// World-space bounds of the subtree rooted at `node`
    fn bounds(&self, node: NodeId) -> Option<Aabb>;

    /// In-memory pose relative to the parent node
    fn local_pose(&self, node: NodeId) -> Option<Pose>;

    fn set_local_pose(&mut self, node: NodeId, pose: Pose) -> bool;

    fn world_matrix(&self, node: NodeId) -> Option<Mat4>;

    /// World matrix of the parent (identity for roots)
    fn parent_world_matrix(&self, node: NodeId) -> Mat4 {
        match (self.world_matrix(node), self.local_pose(node)) {
            (Some(world), Some(local)) => world * local.matrix().inverse(),
            _ => Mat4::IDENTITY,
        }
    }

    fn attribute(&self, entity: EntityId, name: &str) -> Option<AttributeValue>;

    fn set_attribute(&mut self, entity: EntityId, name: &str, value: AttributeValue);

    fn active_camera(&self) -> Option<EntityId>;

    fn set_active_camera(&mut self, camera: EntityId);

    /// Whether the engine wants an editor helper for this node
    fn requires_helper(&self, node: NodeId) -> bool;

    /// Create the helper visual for `target`, returning the helper root
    fn create_helper(&mut self, target: NodeId) -> Option<NodeId>;

    fn dispose_helper(&mut self, helper: NodeId);

    /// Node a live helper visual is attached to
    fn helper_target(&self, helper: NodeId) -> Option<NodeId>;

    /// Re-sync a helper visual with its target
    fn update_helper(&mut self, helper: NodeId);
}

/// Rendering engine and host container
pub trait Engine {
    /// Container bounding rect in client pixels
    fn container_rect(&self) -> egui::Rect;

    /// Distance along `ray` to the first intersection with `node`'s own geometry
    fn raycast(&self, ray: &Ray, node: NodeId) -> Option<f32>;

    /// Show or hide the runtime chrome (enter-VR button, stats panel)
    fn set_chrome_visible(&mut self, visible: bool);
}
