use std::collections::HashMap;

use glam::{Mat4, Vec2, Vec3};
use shared::{EntityId, NodeId};

use crate::scene::{Engine, SceneGraph};

/// A ray in world space
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box of the given size centered on the origin
    pub fn centered(size: Vec3) -> Self {
        Self::new(-size * 0.5, size * 0.5)
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    /// Center of the bounding box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Radius of the bounding sphere
    pub fn radius(&self) -> f32 {
        self.size().length() * 0.5
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of this box after an affine transform
    pub fn transformed(&self, m: &Mat4) -> Aabb {
        Aabb::from_points(self.corners().map(|c| m.transform_point3(c))).unwrap_or(*self)
    }
}

/// Ray-AABB intersection using the slab method.
/// Returns the distance along the ray to the nearest hit, or None.
pub fn ray_aabb(ray: &Ray, aabb: &Aabb) -> Option<f32> {
    let inv_dir = Vec3::new(
        1.0 / ray.direction.x,
        1.0 / ray.direction.y,
        1.0 / ray.direction.z,
    );

    let t1 = (aabb.min.x - ray.origin.x) * inv_dir.x;
    let t2 = (aabb.max.x - ray.origin.x) * inv_dir.x;
    let t3 = (aabb.min.y - ray.origin.y) * inv_dir.y;
    let t4 = (aabb.max.y - ray.origin.y) * inv_dir.y;
    let t5 = (aabb.min.z - ray.origin.z) * inv_dir.z;
    let t6 = (aabb.max.z - ray.origin.z) * inv_dir.z;

    let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
    let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

    if tmax < 0.0 || tmin > tmax {
        return None;
    }

    Some(if tmin < 0.0 { tmax } else { tmin })
}

/// Container-normalized pointer coords ([0,1] x [0,1], y down) to NDC (y up)
pub fn normalized_to_ndc(point: Vec2) -> Vec2 {
    Vec2::new(point.x * 2.0 - 1.0, -(point.y * 2.0) + 1.0)
}

// ── Pick index ───────────────────────────────────────────────

/// What a pickable node resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOwner {
    /// Scene node owned by an entity
    Entity(EntityId),
    /// Picker proxy of a helper visual, resolving to the helped node
    Helper { helper: NodeId, target: NodeId },
}

/// A render node eligible for ray intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickEntry {
    pub node: NodeId,
    pub owner: PickOwner,
}

/// Flat list of pickable nodes. Each node holds one reference per
/// registration and stays indexed until every reference is released.
#[derive(Debug, Default)]
pub struct PickIndex {
    entries: Vec<PickEntry>,
    refs: HashMap<NodeId, usize>,
}

impl PickIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry`. A node already indexed gains a reference instead of
    /// a second entry. Returns true if the node is new to the index.
    pub fn add(&mut self, entry: PickEntry) -> bool {
        let refs = self.refs.entry(entry.node).or_insert(0);
        *refs += 1;
        if *refs > 1 {
            tracing::trace!("pick index {} refs={refs}", entry.node);
            return false;
        }
        tracing::trace!("pick index += {}", entry.node);
        self.entries.push(entry);
        true
    }

    /// Release one reference to `node`, dropping its entry with the last one.
    /// Returns true if the entry was dropped. Unknown nodes are ignored.
    pub fn remove(&mut self, node: NodeId) -> bool {
        let Some(refs) = self.refs.get_mut(&node) else {
            return false;
        };
        *refs -= 1;
        if *refs > 0 {
            tracing::trace!("pick index {node} refs={refs}");
            return false;
        }
        self.refs.remove(&node);
        self.entries.retain(|e| e.node != node);
        tracing::trace!("pick index -= {node}");
        true
    }

    /// Release the picker proxy registered for `helper`, if any.
    pub fn remove_helper(&mut self, helper: NodeId) -> Option<NodeId> {
        let picker = self.entries.iter().find_map(|e| {
            matches!(e.owner, PickOwner::Helper { helper: h, .. } if h == helper).then_some(e.node)
        })?;
        self.remove(picker);
        Some(picker)
    }

    /// Outstanding registrations of `node`
    pub fn references(&self, node: NodeId) -> usize {
        self.refs.get(&node).copied().unwrap_or(0)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.iter().any(|e| e.node == node)
    }

    pub fn entries(&self) -> &[PickEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted node list, for membership comparisons
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.entries.iter().map(|e| e.node).collect();
        nodes.sort();
        nodes
    }
}

// ── Ray picker ───────────────────────────────────────────────

/// Nearest intersection found by a pick query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub entry: PickEntry,
    pub distance: f32,
}

impl PickHit {
    /// Logical entity the hit reports: the helped entity for helper proxies,
    /// the node's own owner otherwise.
    pub fn resolve_owner(&self, scene: &dyn SceneGraph) -> Option<EntityId> {
        match self.entry.owner {
            PickOwner::Entity(entity) => Some(entity),
            PickOwner::Helper { target, .. } => scene.owner(target),
        }
    }
}

/// Pick the candidate with the smallest positive distance along the ray.
pub fn pick_nearest(ray: &Ray, candidates: &[PickEntry], engine: &dyn Engine) -> Option<PickHit> {
    let mut best: Option<PickHit> = None;

    for entry in candidates {
        if let Some(distance) = engine.raycast(ray, entry.node) {
            if distance > 0.0 && best.as_ref().map_or(true, |b| distance < b.distance) {
                best = Some(PickHit {
                    entry: *entry,
                    distance,
                });
            }
        }
    }

    best
}
