use glam::{EulerRot, Mat4, Quat, Vec3};
use shared::{AttributeValue, EntityId, NodeId, TransformMode, TransformSpace, Xyz};

use super::input::normalize_pointer;
use super::picking::Ray;
use crate::events::{EditorEvent, Outbox};
use crate::scene::Pose;
use crate::session::EditorSession;
use crate::telemetry::Channel;

/// Which axis a gizmo handle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoAxis {
    X,
    Y,
    Z,
}

impl GizmoAxis {
    pub const ALL: [GizmoAxis; 3] = [GizmoAxis::X, GizmoAxis::Y, GizmoAxis::Z];

    pub fn unit(self) -> Vec3 {
        match self {
            GizmoAxis::X => Vec3::X,
            GizmoAxis::Y => Vec3::Y,
            GizmoAxis::Z => Vec3::Z,
        }
    }

    fn index(self) -> usize {
        match self {
            GizmoAxis::X => 0,
            GizmoAxis::Y => 1,
            GizmoAxis::Z => 2,
        }
    }
}

/// Round to three decimals so attribute writes do not carry float noise.
pub fn get_number(value: f32) -> f64 {
    (f64::from(value) * 1000.0).round() / 1000.0
}

/// Attribute payload written back for `mode`.
///
/// Rotation is rounded in radians and then converted to degrees, so an
/// authored 45 deg comes back as 44.977. Hosts read the value in this form.
pub fn attribute_value(mode: TransformMode, pose: &Pose) -> AttributeValue {
    let v = match mode {
        TransformMode::Translate => pose.position,
        TransformMode::Rotate => pose.rotation,
        TransformMode::Scale => pose.scale,
    };
    let xyz = match mode {
        TransformMode::Rotate => Xyz::new(
            get_number(v.x).to_degrees(),
            get_number(v.y).to_degrees(),
            get_number(v.z).to_degrees(),
        ),
        TransformMode::Translate | TransformMode::Scale => {
            Xyz::new(get_number(v.x), get_number(v.y), get_number(v.z))
        }
    };
    AttributeValue::Vec3(xyz)
}

/// Live manipulator drag: the pose snapshot taken on engage plus the
/// screen-space frame the drag is measured in.
#[derive(Debug, Clone)]
pub struct TransformSession {
    pub node: NodeId,
    pub entity: Option<EntityId>,
    pub mode: TransformMode,
    pub axis: GizmoAxis,
    pub pointer_start: egui::Pos2,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    world_axis: Vec3,
    parent_world: Mat4,
    /// Unit direction of the axis on screen and its pixel length per world unit
    screen_axis: Option<(egui::Vec2, f32)>,
    center_screen: Option<egui::Pos2>,
    /// +1 when the axis points toward the camera
    facing: f32,
}

impl TransformSession {
    pub fn snapshot(&self) -> Pose {
        Pose {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
        }
    }

    /// Whether `current` differs from the snapshot in the component the mode edits
    pub fn changed(&self, current: &Pose) -> bool {
        match self.mode {
            TransformMode::Translate => self.position != current.position,
            TransformMode::Rotate => self.rotation != current.rotation,
            TransformMode::Scale => self.scale != current.scale,
        }
    }

    /// World units moved along the axis for a pointer at `pos`
    fn axis_offset(&self, pos: egui::Pos2) -> f32 {
        let Some((screen_axis, pixels_per_unit)) = self.screen_axis else {
            return 0.0;
        };
        let delta = pos - self.pointer_start;
        delta.dot(screen_axis) / pixels_per_unit
    }

    /// Signed screen angle swept around the gizmo center
    fn sweep_angle(&self, pos: egui::Pos2) -> f32 {
        let Some(center) = self.center_screen else {
            return 0.0;
        };
        let a = self.pointer_start - center;
        let b = pos - center;
        if a.length() < 1.0 || b.length() < 1.0 {
            return 0.0;
        }
        // screen y grows downward, so flip to get counter-clockwise positive
        let angle = -(a.x * b.y - a.y * b.x).atan2(a.dot(b));
        angle * self.facing
    }

    /// Pose for a pointer at `pos`, relative to the parent node
    fn pose_at(&self, pos: egui::Pos2, snap: Option<f32>, handle_size: f32) -> Pose {
        let mut pose = self.snapshot();
        match self.mode {
            TransformMode::Translate => {
                let mut offset = self.axis_offset(pos);
                if let Some(step) = snap.filter(|s| *s > 0.0) {
                    offset = (offset / step).round() * step;
                }
                let world_delta = self.world_axis * offset;
                pose.position = self.position + self.parent_world.inverse().transform_vector3(world_delta);
            }
            TransformMode::Rotate => {
                let angle = self.sweep_angle(pos);
                if angle != 0.0 {
                    let (_, parent_rot, _) = self.parent_world.to_scale_rotation_translation();
                    let spin = parent_rot.inverse() * Quat::from_axis_angle(self.world_axis, angle) * parent_rot;
                    let start = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
                    let (x, y, z) = (spin * start).normalize().to_euler(EulerRot::XYZ);
                    pose.rotation = Vec3::new(x, y, z);
                }
            }
            TransformMode::Scale => {
                let factor = (1.0 + self.axis_offset(pos) / handle_size.max(1e-3)).max(1e-3);
                let i = self.axis.index();
                pose.scale[i] = self.scale[i] * factor;
            }
        }
        pose
    }
}

/// Translate/rotate/scale manipulator bound to the selection
pub struct TransformGizmo {
    session: EditorSession,
    object: Option<NodeId>,
    mode: TransformMode,
    space: TransformSpace,
    translation_snap: Option<f32>,
    /// Handle length in world units
    size: f32,
    drag: Option<TransformSession>,
}

/// Hit tolerance as a fraction of the handle length
const HIT_TOLERANCE: f32 = 0.1;

impl TransformGizmo {
    pub fn new(session: EditorSession) -> Self {
        let gizmo = &session.settings.gizmo;
        let (mode, space, translation_snap) = (gizmo.mode, gizmo.space, gizmo.translation_snap);
        Self {
            session,
            object: None,
            mode,
            space,
            translation_snap,
            size: 1.0,
            drag: None,
        }
    }

    pub fn object(&self) -> Option<NodeId> {
        self.object
    }

    pub fn mode(&self) -> TransformMode {
        self.mode
    }

    pub fn space(&self) -> TransformSpace {
        self.space
    }

    pub fn translation_snap(&self) -> Option<f32> {
        self.translation_snap
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn drag_session(&self) -> Option<&TransformSession> {
        self.drag.as_ref()
    }

    /// Attach to `node`, fully detaching from the previous object first.
    pub fn attach(&mut self, node: NodeId) -> Outbox {
        let out = self.detach();
        self.object = Some(node);
        self.update();
        out
    }

    /// Drop the attached object. An in-flight drag is finished first.
    pub fn detach(&mut self) -> Outbox {
        let out = self.finish_drag();
        self.object = None;
        out
    }

    /// Rescale handles to the current camera distance
    pub fn update(&mut self) {
        let Some(center) = self.center() else {
            return;
        };
        let eye = self.session.camera.borrow().eye_position();
        let distance = (eye - center).length();
        self.size = (distance * self.session.settings.gizmo.size).max(1e-3);
    }

    /// World position of the attached object
    pub fn center(&self) -> Option<Vec3> {
        let node = self.object?;
        let world = self.session.scene.borrow().world_matrix(node)?;
        Some(world.transform_point3(Vec3::ZERO))
    }

    fn world_rotation(&self, node: NodeId) -> Quat {
        self.session
            .scene
            .borrow()
            .world_matrix(node)
            .map(|m| m.to_scale_rotation_translation().1)
            .unwrap_or(Quat::IDENTITY)
    }

    /// World direction of `axis` under the current mode and space
    pub fn axis_direction(&self, axis: GizmoAxis) -> Vec3 {
        let local = self.space == TransformSpace::Local || self.mode == TransformMode::Scale;
        match self.object {
            Some(node) if local => (self.world_rotation(node) * axis.unit()).normalize_or_zero(),
            _ => axis.unit(),
        }
    }

    /// Handle under `ray`, if any
    pub fn hit_test(&self, ray: &Ray) -> Option<GizmoAxis> {
        let center = self.center()?;
        let threshold = self.size * HIT_TOLERANCE;
        let mut best: Option<(GizmoAxis, f32)> = None;

        for axis in GizmoAxis::ALL {
            let dir = self.axis_direction(axis);
            let dist = match self.mode {
                TransformMode::Translate | TransformMode::Scale => {
                    ray_line_distance(ray, center, center + dir * self.size)
                }
                TransformMode::Rotate => ray_ring_distance(ray, center, dir, self.size),
            };
            if let Some(dist) = dist {
                if dist < threshold && best.as_ref().map_or(true, |(_, d)| dist < *d) {
                    best = Some((axis, dist));
                }
            }
        }

        best.map(|(axis, _)| axis)
    }

    /// Pointer pressed at client position `pos`. Engages on a handle hit.
    pub fn pointer_down(&mut self, pos: egui::Pos2) -> Outbox {
        if self.drag.is_some() {
            return Vec::new();
        }
        let Some(node) = self.object else {
            return Vec::new();
        };
        let rect = self.session.container_rect();
        let Some(point) = normalize_pointer(pos, rect) else {
            return Vec::new();
        };
        let ray = self.session.camera.borrow().ray_from_normalized(point);
        let Some(axis) = self.hit_test(&ray) else {
            return Vec::new();
        };
        let Some(center) = self.center() else {
            return Vec::new();
        };

        let (pose, parent_world, entity) = {
            let scene = self.session.scene.borrow();
            (
                scene.local_pose(node).unwrap_or_default(),
                scene.parent_world_matrix(node),
                scene.owner(node),
            )
        };
        let world_axis = self.axis_direction(axis);

        let (screen_axis, center_screen, facing) = {
            let camera = self.session.camera.borrow();
            let p0 = camera.project(center, rect);
            let p1 = camera.project(center + world_axis, rect);
            let screen_axis = match (p0, p1) {
                (Some(p0), Some(p1)) => {
                    let v = p1 - p0;
                    let len = v.length();
                    (len >= 1.0).then(|| (v / len, len))
                }
                _ => None,
            };
            let facing = if world_axis.dot(camera.eye_position() - center) >= 0.0 { 1.0 } else { -1.0 };
            (screen_axis, p0, facing)
        };

        tracing::debug!("gizmo engaged on {node} ({} {axis:?})", self.mode.as_str());
        self.drag = Some(TransformSession {
            node,
            entity,
            mode: self.mode,
            axis,
            pointer_start: pos,
            position: pose.position,
            rotation: pose.rotation,
            scale: pose.scale,
            world_axis,
            parent_world,
            screen_axis,
            center_screen,
            facing,
        });
        vec![EditorEvent::TransformStarted(node)]
    }

    /// Pointer moved while held: apply the live pose and write it back.
    pub fn pointer_move(&mut self, pos: egui::Pos2) -> Outbox {
        let Some(drag) = &self.drag else {
            return Vec::new();
        };
        let pose = drag.pose_at(pos, self.translation_snap, self.size);
        let (node, entity, mode) = (drag.node, drag.entity, drag.mode);

        self.session.scene.borrow_mut().set_local_pose(node, pose);
        self.write_back(entity, mode, &pose);
        self.session
            .telemetry
            .track_throttled(Channel::TransformEntity, Some(mode.as_str()));

        vec![
            EditorEvent::ObjectChanged(node),
            EditorEvent::RefreshSidebarObject3D(node),
        ]
    }

    /// Pointer released: end the drag, if any.
    pub fn pointer_up(&mut self) -> Outbox {
        self.finish_drag()
    }

    fn finish_drag(&mut self) -> Outbox {
        let Some(drag) = self.drag.take() else {
            return Vec::new();
        };
        let current = self
            .session
            .scene
            .borrow()
            .local_pose(drag.node)
            .unwrap_or_else(|| drag.snapshot());
        let changed = drag.changed(&current);
        tracing::debug!("gizmo released on {} (changed: {changed})", drag.node);
        vec![EditorEvent::TransformFinished {
            node: drag.node,
            mode: drag.mode,
            changed,
        }]
    }

    fn write_back(&self, entity: Option<EntityId>, mode: TransformMode, pose: &Pose) {
        let Some(entity) = entity else {
            tracing::warn!("Skipping {} write-back: node has no entity", mode.attribute());
            return;
        };
        let value = attribute_value(mode, pose);
        self.session
            .scene
            .borrow_mut()
            .set_attribute(entity, mode.attribute(), value);
    }

    pub fn handle(&mut self, event: &EditorEvent) -> Outbox {
        match event {
            EditorEvent::ObjectSelected(entity) => {
                let node = entity.and_then(|e| self.session.scene.borrow().object_of(e));
                return match node {
                    Some(node) => self.attach(node),
                    None => self.detach(),
                };
            }
            EditorEvent::ObjectRemoved(node) => {
                let removed = self
                    .object
                    .is_some_and(|o| self.session.scene.borrow().descendants(*node).contains(&o));
                if removed {
                    return self.detach();
                }
            }
            EditorEvent::TransformModeChanged(mode) => {
                self.mode = *mode;
                self.update();
            }
            EditorEvent::SnapChanged(snap) => self.translation_snap = *snap,
            EditorEvent::SpaceChanged(space) => self.space = *space,
            EditorEvent::ObjectChanged(_) | EditorEvent::EditorCameraChanged | EditorEvent::WindowResize => {
                self.update()
            }
            _ => {}
        }
        Vec::new()
    }
}

// ── Helpers ──────────────────────────────────────────────────

/// Minimum distance between a ray and a line segment.
fn ray_line_distance(ray: &Ray, line_start: Vec3, line_end: Vec3) -> Option<f32> {
    let u = ray.direction;
    let v = line_end - line_start;
    let w = ray.origin - line_start;

    let a = u.dot(u); // always >= 0
    let b = u.dot(v);
    let c = v.dot(v); // always >= 0
    let d = u.dot(w);
    let e = v.dot(w);

    if c < 1e-12 {
        return None;
    }

    let denom = a * c - b * b;

    let (sc, tc);

    if denom < 1e-7 {
        // Nearly parallel
        sc = 0.0;
        tc = if b > c { d / b } else { e / c };
    } else {
        sc = (b * e - c * d) / denom;
        tc = (a * e - b * d) / denom;
    }

    // Clamp tc to [0,1] (line segment)
    let tc = tc.clamp(0.0, 1.0);
    // Only consider positive ray parameter
    let sc = sc.max(0.0);

    let closest_ray = ray.origin + u * sc;
    let closest_line = line_start + v * tc;

    Some((closest_ray - closest_line).length())
}

/// Distance from the ray's hit on the ring plane to the ring itself.
fn ray_ring_distance(ray: &Ray, center: Vec3, normal: Vec3, radius: f32) -> Option<f32> {
    let denom = ray.direction.dot(normal);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = (center - ray.origin).dot(normal) / denom;
    if t <= 0.0 {
        return None;
    }
    let on_plane = ray.at(t);
    Some(((on_plane - center).length() - radius).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_for(mode: TransformMode) -> TransformSession {
        TransformSession {
            node: NodeId::new(),
            entity: None,
            mode,
            axis: GizmoAxis::X,
            pointer_start: egui::pos2(100.0, 100.0),
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            world_axis: Vec3::X,
            parent_world: Mat4::IDENTITY,
            screen_axis: Some((egui::vec2(1.0, 0.0), 50.0)),
            center_screen: Some(egui::pos2(50.0, 100.0)),
            facing: 1.0,
        }
    }

    #[test]
    fn test_get_number_rounds_to_three_decimals() {
        assert_eq!(get_number(1.23456), 1.235);
        assert_eq!(get_number(-0.0004), 0.0);
        assert_eq!(get_number(2.0), 2.0);
    }

    #[test]
    fn test_rotation_written_in_degrees() {
        let pose = Pose {
            rotation: Vec3::new(std::f32::consts::FRAC_PI_2, 0.0, 0.0),
            ..Pose::IDENTITY
        };
        let value = attribute_value(TransformMode::Rotate, &pose).as_xyz().unwrap();
        assert!((value.x - 1.571_f64.to_degrees()).abs() < 1e-9);
        assert_eq!(value.y, 0.0);
    }

    #[test]
    fn test_rotation_rounded_before_degree_conversion() {
        let pose = Pose {
            rotation: Vec3::new(45f32.to_radians(), 0.0, 0.0),
            ..Pose::IDENTITY
        };
        let value = attribute_value(TransformMode::Rotate, &pose).as_xyz().unwrap();
        assert!((value.x - 0.785_f64.to_degrees()).abs() < 1e-9);
        assert!((value.x - 44.977).abs() < 1e-3);
    }

    #[test]
    fn test_translate_follows_screen_axis() {
        let s = session_for(TransformMode::Translate);
        let pose = s.pose_at(egui::pos2(200.0, 130.0), None, 1.0);
        assert!((pose.position - Vec3::new(3.0, 2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn test_translate_snaps_offset() {
        let s = session_for(TransformMode::Translate);
        let pose = s.pose_at(egui::pos2(137.0, 100.0), Some(0.5), 1.0);
        assert!((pose.position.x - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_return_to_start_is_exact() {
        for mode in [TransformMode::Translate, TransformMode::Rotate, TransformMode::Scale] {
            let s = session_for(mode);
            let pose = s.pose_at(s.pointer_start, Some(0.25), 1.0);
            assert_eq!(pose, s.snapshot());
            assert!(!s.changed(&pose));
        }
    }

    #[test]
    fn test_scale_grows_only_dragged_axis() {
        let s = session_for(TransformMode::Scale);
        let pose = s.pose_at(egui::pos2(150.0, 100.0), None, 1.0);
        assert!((pose.scale.x - 2.0).abs() < 1e-6);
        assert_eq!(pose.scale.y, 1.0);
        assert!(s.changed(&pose));
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let s = session_for(TransformMode::Rotate);
        // start is right of center; move to above center: counter-clockwise on screen
        let pose = s.pose_at(egui::pos2(50.0, 50.0), None, 1.0);
        assert!((pose.rotation.x - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn test_changed_only_checks_mode_component() {
        let s = session_for(TransformMode::Translate);
        let mut pose = s.snapshot();
        pose.scale = Vec3::splat(3.0);
        assert!(!s.changed(&pose));
        pose.position.x += 0.001;
        assert!(s.changed(&pose));
    }

    #[test]
    fn test_ray_line_distance() {
        let ray = Ray {
            origin: Vec3::new(0.5, 0.2, 5.0),
            direction: Vec3::NEG_Z,
        };
        let d = ray_line_distance(&ray, Vec3::ZERO, Vec3::X).unwrap();
        assert!((d - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_ray_ring_distance() {
        let ray = Ray {
            origin: Vec3::new(1.0, 0.0, 5.0),
            direction: Vec3::NEG_Z,
        };
        let d = ray_ring_distance(&ray, Vec3::ZERO, Vec3::Z, 1.0).unwrap();
        assert!(d < 1e-5);
        assert!(ray_ring_distance(&ray, Vec3::ZERO, Vec3::X, 1.0).is_none());
    }
}
