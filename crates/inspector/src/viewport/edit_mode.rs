use shared::EntityId;

use crate::events::{EditorEvent, Outbox};
use crate::session::EditorSession;

/// Edit-mode toggle. Swaps the active camera between the edit camera and
/// the last runtime camera, hiding runtime chrome while editing.
pub struct EditMode {
    session: EditorSession,
    enabled: bool,
    prev_camera: Option<EntityId>,
}

impl EditMode {
    /// `enabled` is the state the inspector opened in. The scene's active
    /// camera at construction is remembered as the runtime camera.
    pub fn new(session: EditorSession, enabled: bool) -> Self {
        let active = session.scene.borrow().active_camera();
        let prev_camera = active.filter(|c| *c != session.edit_camera);
        Self {
            session,
            enabled,
            prev_camera,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Runtime camera restored when edit mode is left
    pub fn prev_camera(&self) -> Option<EntityId> {
        self.prev_camera
    }

    pub fn handle(&mut self, event: &EditorEvent) -> Outbox {
        match event {
            EditorEvent::InspectorModeChanged(active) => self.set_enabled(*active),
            EditorEvent::CameraActivated(camera) => self.camera_activated(*camera),
            _ => {}
        }
        Vec::new()
    }

    fn set_enabled(&mut self, active: bool) {
        self.enabled = active;
        if active {
            let current = self.session.scene.borrow().active_camera();
            if let Some(current) = current.filter(|c| *c != self.session.edit_camera) {
                self.prev_camera = Some(current);
            }
            self.session
                .scene
                .borrow_mut()
                .set_active_camera(self.session.edit_camera);
            self.session.engine.borrow_mut().set_chrome_visible(false);
            tracing::debug!("edit mode on, runtime camera {:?} parked", self.prev_camera);
        } else {
            match self.prev_camera {
                Some(camera) => self.session.scene.borrow_mut().set_active_camera(camera),
                None => tracing::warn!("No runtime camera to restore"),
            }
            self.session.engine.borrow_mut().set_chrome_visible(true);
            tracing::debug!("edit mode off, restored {:?}", self.prev_camera);
        }
        let label = if active { "true" } else { "false" };
        self.session.telemetry.track("toggleEditor", Some(label));
    }

    fn camera_activated(&mut self, camera: EntityId) {
        if !self.enabled {
            return;
        }
        if camera != self.session.edit_camera {
            self.prev_camera = Some(camera);
            // keep editing through the edit camera
            self.session
                .scene
                .borrow_mut()
                .set_active_camera(self.session.edit_camera);
        }
    }
}
