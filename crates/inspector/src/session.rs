//! Editor session context handed to every viewport component.

use std::cell::RefCell;
use std::rc::Rc;

use shared::EntityId;

use crate::scene::{Engine, SceneGraph};
use crate::settings::ViewportSettings;
use crate::telemetry::Telemetry;
use crate::viewport::camera::EditorCamera;

/// Everything a component needs from the outside world.
///
/// Cloning is cheap; all fields are shared handles.
#[derive(Clone)]
pub struct EditorSession {
    pub scene: Rc<RefCell<dyn SceneGraph>>,
    pub engine: Rc<RefCell<dyn Engine>>,
    /// Entity carrying the edit camera in the host scene
    pub edit_camera: EntityId,
    /// Projection and orbit state of the edit camera
    pub camera: Rc<RefCell<EditorCamera>>,
    pub settings: Rc<ViewportSettings>,
    pub telemetry: Rc<Telemetry>,
}

impl EditorSession {
    pub fn new(
        scene: Rc<RefCell<dyn SceneGraph>>,
        engine: Rc<RefCell<dyn Engine>>,
        edit_camera: EntityId,
        settings: ViewportSettings,
        telemetry: Telemetry,
    ) -> Self {
        let rect = engine.borrow().container_rect();
        let mut camera = EditorCamera::new(&settings.camera);
        camera.set_aspect_from_rect(rect);
        Self {
            scene,
            engine,
            edit_camera,
            camera: Rc::new(RefCell::new(camera)),
            settings: Rc::new(settings),
            telemetry: Rc::new(telemetry),
        }
    }

    pub fn container_rect(&self) -> egui::Rect {
        self.engine.borrow().container_rect()
    }
}
