//! JSON command protocol driving a headless viewport.

use serde::{Deserialize, Serialize};
use shared::{TransformSpace, Xyz};

use crate::harness::{MemoryScene, TestHarness};
use crate::scene::SceneGraph;
use crate::viewport::input::PointerButton;

/// A scripted viewport interaction. Pointer positions are client pixels.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ViewportCommand {
    MouseDown {
        x: f32,
        y: f32,
        #[serde(default)]
        button: PointerButton,
    },
    MouseUp {
        x: f32,
        y: f32,
    },
    MouseMove {
        x: f32,
        y: f32,
    },
    /// Press and release at the same position
    Click {
        x: f32,
        y: f32,
    },
    DoubleClick {
        x: f32,
        y: f32,
    },
    TouchStart {
        x: f32,
        y: f32,
    },
    TouchEnd {
        x: f32,
        y: f32,
    },
    Wheel {
        delta: f32,
    },
    /// Select an entity by name, or deselect when `name` is absent
    Select {
        #[serde(default)]
        name: Option<String>,
    },
    SetMode {
        mode: String,
    },
    SetSnap {
        #[serde(default)]
        snap: Option<f32>,
    },
    SetSpace {
        space: String,
    },
    ShowGrid {
        visible: bool,
    },
    Resize {
        width: f32,
        height: f32,
    },
    /// Enter or leave edit mode
    SetInspector {
        enabled: bool,
    },
    RemoveEntity {
        name: String,
    },
    /// Report viewport and scene state
    Inspect,
}

/// Response from executing a command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandResponse {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    fn ok_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            data: None,
        }
    }
}

/// Execute a single command on the harness.
pub fn execute_command(harness: &mut TestHarness, cmd: ViewportCommand) -> CommandResponse {
    let pos = egui::pos2;
    match cmd {
        ViewportCommand::MouseDown { x, y, button } => {
            harness.viewport.mouse_down(pos(x, y), button);
            let dragging = harness.viewport.gizmo().is_dragging();
            CommandResponse::ok_with_data(serde_json::json!({ "gizmo_engaged": dragging }))
        }
        ViewportCommand::MouseUp { x, y } => {
            harness.viewport.mouse_up(pos(x, y));
            CommandResponse::ok()
        }
        ViewportCommand::MouseMove { x, y } => {
            harness.viewport.mouse_move(pos(x, y));
            CommandResponse::ok()
        }
        ViewportCommand::Click { x, y } => {
            harness.click_at(pos(x, y));
            CommandResponse::ok_with_data(serde_json::json!({ "selected": selected_name(harness) }))
        }
        ViewportCommand::DoubleClick { x, y } => {
            harness.viewport.double_click(pos(x, y));
            CommandResponse::ok()
        }
        ViewportCommand::TouchStart { x, y } => {
            harness.viewport.touch_start(pos(x, y));
            CommandResponse::ok()
        }
        ViewportCommand::TouchEnd { x, y } => {
            harness.viewport.touch_end(pos(x, y));
            CommandResponse::ok()
        }
        ViewportCommand::Wheel { delta } => {
            harness.viewport.wheel(delta);
            CommandResponse::ok()
        }
        ViewportCommand::Select { name } => {
            let entity = match name {
                Some(name) => match harness.entity(&name) {
                    Some(entity) => Some(entity),
                    None => return CommandResponse::err(format!("No entity named '{name}'")),
                },
                None => None,
            };
            harness.viewport.select_entity(entity);
            CommandResponse::ok_with_data(serde_json::json!({ "selected": selected_name(harness) }))
        }
        ViewportCommand::SetMode { mode } => {
            if harness.viewport.set_mode_str(&mode) {
                CommandResponse::ok()
            } else {
                CommandResponse::err(format!("Unknown transform mode '{mode}'"))
            }
        }
        ViewportCommand::SetSnap { snap } => {
            harness.viewport.set_snap(snap);
            CommandResponse::ok()
        }
        ViewportCommand::SetSpace { space } => match TransformSpace::parse(&space) {
            Some(space) => {
                harness.viewport.set_space(space);
                CommandResponse::ok()
            }
            None => CommandResponse::err(format!("Unknown transform space '{space}'")),
        },
        ViewportCommand::ShowGrid { visible } => {
            harness.viewport.show_grid(visible);
            CommandResponse::ok()
        }
        ViewportCommand::Resize { width, height } => {
            if width <= 0.0 || height <= 0.0 {
                return CommandResponse::err(format!("Invalid container size {width}x{height}"));
            }
            harness.resize(width, height);
            let aspect = harness.viewport.session().camera.borrow().aspect;
            CommandResponse::ok_with_data(serde_json::json!({ "aspect": aspect }))
        }
        ViewportCommand::SetInspector { enabled } => {
            if enabled {
                harness.open();
            } else {
                harness.close();
            }
            CommandResponse::ok_with_data(serde_json::json!({
                "active_camera": active_camera_name(harness),
            }))
        }
        ViewportCommand::RemoveEntity { name } => match harness.entity(&name) {
            Some(entity) => {
                let removed = harness.remove_entity(entity);
                CommandResponse::ok_with_data(serde_json::json!({ "removed": removed }))
            }
            None => CommandResponse::err(format!("No entity named '{name}'")),
        },
        ViewportCommand::Inspect => CommandResponse::ok_with_data(inspect(harness)),
    }
}

fn selected_name(harness: &TestHarness) -> Option<String> {
    let entity = harness.selected()?;
    harness.scene.borrow().entity_name(entity).map(str::to_string)
}

fn active_camera_name(harness: &TestHarness) -> Option<String> {
    let camera = harness.active_camera()?;
    harness.scene.borrow().entity_name(camera).map(str::to_string)
}

fn xyz_json(value: Option<Xyz>) -> serde_json::Value {
    match value {
        Some(v) => serde_json::json!([v.x, v.y, v.z]),
        None => serde_json::Value::Null,
    }
}

fn entity_rows(scene: &MemoryScene) -> Vec<serde_json::Value> {
    let mut rows = Vec::new();
    for root in scene.roots() {
        for entity in scene.descendants(*root).into_iter().filter_map(|n| scene.owner(n)) {
            let attr = |name: &str| scene.attribute(entity, name).and_then(|v| v.as_xyz());
            rows.push(serde_json::json!({
                "name": scene.entity_name(entity),
                "position": xyz_json(attr("position")),
                "rotation": xyz_json(attr("rotation")),
                "scale": xyz_json(attr("scale")),
            }));
        }
    }
    rows
}

fn inspect(harness: &TestHarness) -> serde_json::Value {
    let entities = entity_rows(&harness.scene.borrow());

    let viewport = &harness.viewport;
    let gizmo = viewport.gizmo();
    let camera = viewport.session().camera.borrow();
    serde_json::json!({
        "entity_count": entities.len(),
        "entities": entities,
        "selected": selected_name(harness),
        "highlight_visible": viewport.selection().highlight().visible,
        "gizmo": {
            "mode": gizmo.mode().as_str(),
            "space": gizmo.space(),
            "snap": gizmo.translation_snap(),
            "attached": gizmo.object().is_some(),
        },
        "pickable_count": viewport.pick_index().len(),
        "helper_count": viewport.helpers().helpers().len(),
        "grid_visible": viewport.helpers().grid().visible,
        "edit_mode": viewport.edit_mode().is_enabled(),
        "active_camera": active_camera_name(harness),
        "camera": {
            "aspect": camera.aspect,
            "distance": camera.distance,
            "target": camera.target.to_array(),
        },
    })
}

/// Parse and execute a single JSON command string.
pub fn execute_json(harness: &mut TestHarness, json: &str) -> Result<CommandResponse, String> {
    let cmd: ViewportCommand =
        serde_json::from_str(json).map_err(|e| format!("Invalid command JSON: {e}"))?;
    Ok(execute_command(harness, cmd))
}

/// Parse and execute multiple JSON commands (array).
pub fn execute_json_batch(
    harness: &mut TestHarness,
    json: &str,
) -> Result<Vec<CommandResponse>, String> {
    let cmds: Vec<ViewportCommand> =
        serde_json::from_str(json).map_err(|e| format!("Invalid commands JSON: {e}"))?;
    Ok(cmds
        .into_iter()
        .map(|cmd| execute_command(harness, cmd))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_command_serde_inspect() {
        let cmd: ViewportCommand = serde_json::from_str(r#"{"command": "inspect"}"#).unwrap();
        assert!(matches!(cmd, ViewportCommand::Inspect));
    }

    #[test]
    fn test_command_serde_mouse_down_default_button() {
        let json = r#"{"command": "mouse_down", "x": 10.0, "y": 20.0}"#;
        let cmd: ViewportCommand = serde_json::from_str(json).unwrap();
        match cmd {
            ViewportCommand::MouseDown { x, y, button } => {
                assert_eq!((x, y), (10.0, 20.0));
                assert_eq!(button, PointerButton::Primary);
            }
            _ => panic!("Expected MouseDown"),
        }
    }

    #[test]
    fn test_command_serde_select_without_name() {
        let cmd: ViewportCommand = serde_json::from_str(r#"{"command": "select"}"#).unwrap();
        match cmd {
            ViewportCommand::Select { name } => assert_eq!(name, None),
            _ => panic!("Expected Select"),
        }
    }

    #[test]
    fn test_execute_select_by_name() {
        let mut h = TestHarness::new();
        h.load_scene(&fixtures::two_cubes_scene());

        let resp = execute_json(&mut h, r#"{"command": "select", "name": "Right"}"#).unwrap();
        assert!(resp.success);
        assert_eq!(resp.data.unwrap()["selected"], "Right");
    }

    #[test]
    fn test_execute_select_unknown_name_fails() {
        let mut h = TestHarness::new();
        let resp = execute_json(&mut h, r#"{"command": "select", "name": "Ghost"}"#).unwrap();
        assert!(!resp.success);
        assert!(resp.error.unwrap().contains("Ghost"));
    }

    #[test]
    fn test_execute_unknown_mode_fails_softly() {
        let mut h = TestHarness::new();
        let resp = execute_json(&mut h, r#"{"command": "set_mode", "mode": "shear"}"#).unwrap();
        assert!(!resp.success);
        assert_eq!(h.viewport.gizmo().mode().as_str(), "translate");
    }

    #[test]
    fn test_execute_inspect() {
        let mut h = TestHarness::new();
        h.load_scene(&fixtures::mixed_scene());

        let resp = execute_json(&mut h, r#"{"command": "inspect"}"#).unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data["entity_count"], 4);
        assert_eq!(data["active_camera"], "Player");
        assert_eq!(data["gizmo"]["mode"], "translate");
    }

    #[test]
    fn test_execute_batch() {
        let mut h = TestHarness::new();
        h.load_scene(&fixtures::single_cube_scene());
        let json = r#"[
            {"command": "set_mode", "mode": "scale"},
            {"command": "set_space", "space": "local"},
            {"command": "resize", "width": 1000, "height": 500}
        ]"#;
        let responses = execute_json_batch(&mut h, json).unwrap();
        assert!(responses.iter().all(|r| r.success));
        assert_eq!(responses[2].data.as_ref().unwrap()["aspect"], 2.0);
    }

    #[test]
    fn test_execute_invalid_json() {
        let mut h = TestHarness::new();
        assert!(execute_json(&mut h, "not valid json").is_err());
    }
}
