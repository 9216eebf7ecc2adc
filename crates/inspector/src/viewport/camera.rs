use glam::{Mat4, Vec2, Vec3, Vec4};

use super::picking::{normalized_to_ndc, Aabb, Ray};
use crate::events::{EditorEvent, Outbox};
use crate::session::EditorSession;
use crate::settings::CameraSettings;
use crate::telemetry::Channel;

/// Arc-ball edit camera owned by the viewport
#[derive(Debug, Clone)]
pub struct EditorCamera {
    /// Horizontal rotation angle (radians)
    pub yaw: f32,
    /// Vertical rotation angle (radians)
    pub pitch: f32,
    /// Distance from target
    pub distance: f32,
    /// Camera target point
    pub target: Vec3,
    /// Vertical field of view (radians)
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    projection: Mat4,
}

impl EditorCamera {
    pub fn new(settings: &CameraSettings) -> Self {
        let mut camera = Self {
            yaw: 0.6,
            pitch: 0.4,
            distance: settings.initial_distance,
            target: Vec3::ZERO,
            fov: settings.fov_degrees.to_radians(),
            aspect: 1.0,
            near: settings.near,
            far: settings.far,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Recompute the cached projection from fov/aspect/near/far
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh_gl(self.fov, self.aspect, self.near, self.far);
    }

    /// Aspect from a container rect, followed by a projection refresh.
    /// Degenerate rects leave the camera untouched.
    pub fn set_aspect_from_rect(&mut self, rect: egui::Rect) -> bool {
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return false;
        }
        self.aspect = rect.width() / rect.height();
        self.update_projection_matrix();
        true
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx.to_radians();
        self.pitch = (self.pitch + dy.to_radians()).clamp(-1.5, 1.5);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance * (1.0 - delta)).clamp(0.05, self.far * 0.5);
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        let right = self.right_vector();
        let up = self.up_vector();
        let offset = right * dx + up * dy;
        self.target += offset;
    }

    /// Frame `bounds`, keeping the current orientation
    pub fn focus(&mut self, bounds: &Aabb, distance_factor: f32) {
        self.target = bounds.center();
        let radius = bounds.radius();
        self.distance = if radius > 0.0 { radius * distance_factor } else { distance_factor };
    }

    /// Camera position in world space
    pub fn eye_position(&self) -> Vec3 {
        let cy = self.yaw.cos();
        let sy = self.yaw.sin();
        let cp = self.pitch.cos();
        let sp = self.pitch.sin();

        self.target
            + Vec3::new(
                self.distance * cp * sy,
                self.distance * sp,
                self.distance * cp * cy,
            )
    }

    /// View matrix (world -> camera)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye_position(), self.target, Vec3::Y)
    }

    /// Cached projection matrix (camera -> clip)
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// Combined view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    fn right_vector(&self) -> Vec3 {
        let fwd = (self.target - self.eye_position()).normalize_or_zero();
        fwd.cross(Vec3::Y).normalize_or_zero()
    }

    fn up_vector(&self) -> Vec3 {
        let fwd = (self.target - self.eye_position()).normalize_or_zero();
        let right = self.right_vector();
        right.cross(fwd).normalize_or_zero()
    }

    /// Project a world point to client pixel coords inside `rect`
    pub fn project(&self, point: Vec3, rect: egui::Rect) -> Option<egui::Pos2> {
        let p = self.view_projection() * point.extend(1.0);
        if p.w <= 0.0 {
            return None;
        }
        let ndc = p.truncate() / p.w;
        let screen_x = rect.center().x + ndc.x * rect.width() * 0.5;
        let screen_y = rect.center().y - ndc.y * rect.height() * 0.5;
        Some(egui::pos2(screen_x, screen_y))
    }

    /// Ray through container-normalized coords ([0,1] x [0,1])
    pub fn ray_from_normalized(&self, point: Vec2) -> Ray {
        let ndc = normalized_to_ndc(point);

        let vp_inv = self.view_projection().inverse();

        let near_world = vp_inv * Vec4::new(ndc.x, ndc.y, -1.0, 1.0);
        let far_world = vp_inv * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);

        let near = near_world.truncate() / near_world.w;
        let far = far_world.truncate() / far_world.w;

        Ray {
            origin: self.eye_position(),
            direction: (far - near).normalize_or_zero(),
        }
    }
}

/// Which orbit gesture a held pointer drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitGesture {
    Rotate,
    Pan,
}

/// Orbit/pan/zoom controls over the edit camera
pub struct EditorControls {
    session: EditorSession,
    enabled: bool,
    gesture: Option<(OrbitGesture, egui::Pos2)>,
}

const ROTATE_DEGREES_PER_PIXEL: f32 = 0.3;
const PAN_UNITS_PER_PIXEL: f32 = 0.002;

impl EditorControls {
    pub fn new(session: EditorSession) -> Self {
        Self {
            session,
            enabled: true,
            gesture: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn begin(&mut self, gesture: OrbitGesture, pos: egui::Pos2) {
        if self.enabled {
            self.gesture = Some((gesture, pos));
        }
    }

    pub fn end(&mut self) {
        self.gesture = None;
    }

    /// Continue the held gesture to client position `pos`
    pub fn pointer_move(&mut self, pos: egui::Pos2) -> Outbox {
        let Some((gesture, last)) = self.gesture else {
            return Vec::new();
        };
        if !self.enabled {
            return Vec::new();
        }
        let delta = pos - last;
        if delta == egui::Vec2::ZERO {
            return Vec::new();
        }
        self.gesture = Some((gesture, pos));

        {
            let mut camera = self.session.camera.borrow_mut();
            match gesture {
                OrbitGesture::Rotate => camera.rotate(
                    -delta.x * ROTATE_DEGREES_PER_PIXEL,
                    delta.y * ROTATE_DEGREES_PER_PIXEL,
                ),
                OrbitGesture::Pan => {
                    let scale = camera.distance * PAN_UNITS_PER_PIXEL;
                    camera.pan(-delta.x * scale, delta.y * scale);
                }
            }
        }
        self.changed()
    }

    pub fn wheel(&mut self, delta: f32) -> Outbox {
        if !self.enabled || delta == 0.0 {
            return Vec::new();
        }
        self.session.camera.borrow_mut().zoom(delta * 0.01);
        self.changed()
    }

    fn changed(&self) -> Outbox {
        self.session
            .telemetry
            .track_throttled(Channel::ChangeEditorCamera, None);
        vec![EditorEvent::EditorCameraChanged]
    }

    pub fn handle(&mut self, event: &EditorEvent) -> Outbox {
        match event {
            EditorEvent::TransformStarted(_) => {
                self.enabled = false;
                self.gesture = None;
            }
            EditorEvent::TransformFinished { .. } => self.enabled = true,
            EditorEvent::InspectorCleared => {
                self.session.camera.borrow_mut().target = Vec3::ZERO;
            }
            EditorEvent::ObjectFocused(node) => {
                let bounds = self.session.scene.borrow().bounds(*node);
                match bounds {
                    Some(bounds) => {
                        let factor = self.session.settings.camera.focus_distance_factor;
                        self.session.camera.borrow_mut().focus(&bounds, factor);
                        self.session.telemetry.track("selectEntity", None);
                        return vec![EditorEvent::EditorCameraChanged];
                    }
                    None => tracing::debug!("focus target {node} has no bounds"),
                }
            }
            EditorEvent::WindowResize => {
                let rect = self.session.container_rect();
                if !self.session.camera.borrow_mut().set_aspect_from_rect(rect) {
                    tracing::warn!("Ignoring resize to degenerate container {rect:?}");
                }
            }
            _ => {}
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> EditorCamera {
        EditorCamera::new(&CameraSettings::default())
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let cam = camera();
        let ray = cam.ray_from_normalized(Vec2::new(0.5, 0.5));
        let to_target = (cam.target - ray.origin).normalize();
        assert!(ray.direction.dot(to_target) > 0.9999);
    }

    #[test]
    fn test_project_target_lands_on_rect_center() {
        let cam = camera();
        let rect = egui::Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(800.0, 800.0));
        let p = cam.project(cam.target, rect).unwrap();
        assert!((p.x - rect.center().x).abs() < 1e-3);
        assert!((p.y - rect.center().y).abs() < 1e-3);
    }

    #[test]
    fn test_aspect_from_rect_refreshes_projection() {
        let mut cam = camera();
        let before = cam.projection_matrix();
        let rect = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(1600.0, 800.0));
        assert!(cam.set_aspect_from_rect(rect));
        assert_eq!(cam.aspect, 2.0);
        assert_ne!(cam.projection_matrix(), before);
    }

    #[test]
    fn test_degenerate_rect_is_ignored() {
        let mut cam = camera();
        let rect = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(100.0, 0.0));
        assert!(!cam.set_aspect_from_rect(rect));
        assert_eq!(cam.aspect, 1.0);
    }

    #[test]
    fn test_focus_frames_bounds() {
        let mut cam = camera();
        let bounds = Aabb::new(Vec3::new(4.0, 0.0, 0.0), Vec3::new(6.0, 2.0, 2.0));
        cam.focus(&bounds, 3.0);
        assert_eq!(cam.target, Vec3::new(5.0, 1.0, 1.0));
        assert!((cam.distance - bounds.radius() * 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut cam = camera();
        cam.rotate(0.0, 500.0);
        assert_eq!(cam.pitch, 1.5);
    }
}
