//! Integration tests for picking, selection, focus, edit mode and resize.

use glam::{Vec2, Vec3};
use scene_inspector_lib::events::{EditorEvent, Topic};
use scene_inspector_lib::fixtures;
use scene_inspector_lib::harness::TestHarness;
use scene_inspector_lib::scene::SceneGraph;
use scene_inspector_lib::viewport::input::PointerButton;

fn harness_with(scene: shared::SceneDescription) -> TestHarness {
    let mut h = TestHarness::new();
    h.load_scene(&scene);
    h.clear_events();
    h
}

// ── Picking & selection ──────────────────────────────────────

#[test]
fn test_click_on_empty_space_deselects() {
    let mut h = harness_with(fixtures::single_cube_scene());
    let cube = h.entity("Box").unwrap();
    h.viewport.select_entity(Some(cube));
    assert_eq!(h.selected(), Some(cube));

    h.click_at(egui::pos2(5.0, 5.0));

    assert_eq!(h.selected(), None);
    assert!(h.viewport.gizmo().object().is_none());
    assert!(!h.viewport.selection().highlight().visible);
    assert_eq!(
        h.events_of(Topic::ObjectSelected).last(),
        Some(&EditorEvent::ObjectSelected(None))
    );
}

#[test]
fn test_click_on_empty_scene_selects_nothing() {
    let mut h = TestHarness::new();
    h.click_at(egui::pos2(400.0, 300.0));
    assert_eq!(h.selected(), None);
    assert_eq!(h.events_of(Topic::ObjectSelected), vec![EditorEvent::ObjectSelected(None)]);
}

#[test]
fn test_click_selects_entity_under_pointer() {
    let mut h = harness_with(fixtures::two_cubes_scene());
    let right = h.entity("Right").unwrap();

    assert!(h.click_entity(right));
    assert_eq!(h.selected(), Some(right));
}

#[test]
fn test_moved_pointer_is_not_a_click() {
    let mut h = harness_with(fixtures::single_cube_scene());
    let cube = h.entity("Box").unwrap();
    let pos = h.client_point_of_entity(cube).unwrap();

    h.viewport.mouse_down(pos, PointerButton::Primary);
    h.viewport.mouse_up(pos + egui::vec2(3.0, 0.0));

    assert_eq!(h.selected(), None);
    assert!(h.events_of(Topic::ObjectSelected).is_empty());
}

#[test]
fn test_mouse_up_without_down_is_ignored() {
    let mut h = harness_with(fixtures::single_cube_scene());
    h.viewport.mouse_up(egui::pos2(400.0, 300.0));
    assert!(h.events_of(Topic::ObjectSelected).is_empty());
}

#[test]
fn test_touch_tap_selects() {
    let mut h = harness_with(fixtures::single_cube_scene());
    let cube = h.entity("Box").unwrap();
    let pos = h.client_point_of_entity(cube).unwrap();

    h.viewport.touch_start(pos);
    h.viewport.touch_end(pos);

    assert_eq!(h.selected(), Some(cube));
}

#[test]
fn test_pick_returns_nearest_hit() {
    let mut h = TestHarness::new();
    let eye = h.viewport.session().camera.borrow().eye_position();
    let mid = eye * 0.5;
    h.load_scene(&fixtures::scene(vec![
        fixtures::cube("Far", [0.0, 0.0, 0.0], 1.0),
        fixtures::cube("Near", [mid.x as f64, mid.y as f64, mid.z as f64], 1.0),
    ]));
    let near = h.entity("Near").unwrap();
    let near_node = h.node_of(near).unwrap();

    // the camera targets the origin, so the container center looks through both cubes
    let hit = h.viewport.pick(Vec2::new(0.5, 0.5)).unwrap();
    assert_eq!(hit.entry.node, near_node);

    h.click_at(egui::pos2(400.0, 300.0));
    assert_eq!(h.selected(), Some(near));
}

#[test]
fn test_helper_pick_resolves_to_helped_entity() {
    let mut h = harness_with(fixtures::mixed_scene());
    let sun = h.entity("Sun").unwrap();

    let pos = h.client_point_of(Vec3::new(0.0, 3.0, 0.0)).unwrap();
    h.click_at(pos);

    assert_eq!(h.selected(), Some(sun));
}

#[test]
fn test_switching_selection_keeps_one_attachment() {
    let mut h = harness_with(fixtures::two_cubes_scene());
    let left = h.entity("Left").unwrap();
    let right = h.entity("Right").unwrap();
    let right_node = h.node_of(right).unwrap();

    h.click_entity(left);
    h.click_entity(right);

    assert_eq!(h.selected(), Some(right));
    assert_eq!(h.viewport.gizmo().object(), Some(right_node));
    let highlight = h.viewport.selection().highlight().clone();
    assert!(highlight.visible);
    assert_eq!(highlight.bounds, h.scene.borrow().bounds(right_node));
}

#[test]
fn test_selecting_entity_without_geometry_hides_highlight() {
    let mut h = harness_with(fixtures::mixed_scene());
    let cube = h.entity("Box").unwrap();
    let sound = h.entity("Ambience").unwrap();

    h.viewport.select_entity(Some(cube));
    assert!(h.viewport.selection().highlight().visible);

    h.viewport.select_entity(Some(sound));
    assert!(!h.viewport.selection().highlight().visible);
    assert_eq!(h.viewport.gizmo().object(), h.node_of(sound));
}

#[test]
fn test_geometry_change_refits_highlight() {
    let mut h = harness_with(fixtures::single_cube_scene());
    let cube = h.entity("Box").unwrap();
    let node = h.node_of(cube).unwrap();
    h.viewport.select_entity(Some(cube));

    h.scene.borrow_mut().set_geometry(cube, Vec3::splat(4.0));
    h.viewport.geometry_changed(node);

    let bounds = h.viewport.selection().highlight().bounds.unwrap();
    assert!((bounds.size() - Vec3::splat(4.0)).length() < 1e-5);
}

#[test]
fn test_highlight_visibility_follows_geometry_of_selection() {
    let mut h = harness_with(fixtures::single_cube_scene());
    let cube = h.entity("Box").unwrap();
    let node = h.node_of(cube).unwrap();
    h.viewport.select_entity(Some(cube));
    assert!(h.viewport.selection().highlight().visible);

    h.scene.borrow_mut().set_geometry(cube, Vec3::ZERO);
    h.viewport.geometry_changed(node);
    let highlight = h.viewport.selection().highlight().clone();
    assert!(!highlight.visible);
    assert_eq!(highlight.bounds, None);

    h.scene.borrow_mut().set_geometry(cube, Vec3::splat(2.0));
    h.viewport.object_changed(node);
    let highlight = h.viewport.selection().highlight().clone();
    assert!(highlight.visible);
    assert_eq!(highlight.bounds, h.scene.borrow().bounds(node));
}

#[test]
fn test_component_change_on_selection_republishes_object_changed() {
    let mut h = harness_with(fixtures::two_cubes_scene());
    let left = h.entity("Left").unwrap();
    let right = h.entity("Right").unwrap();
    h.viewport.select_entity(Some(left));
    h.clear_events();

    h.viewport.component_changed(right, "material");
    assert!(h.events_of(Topic::ObjectChanged).is_empty());

    h.viewport.component_changed(left, "material");
    assert_eq!(
        h.events_of(Topic::ObjectChanged),
        vec![EditorEvent::ObjectChanged(h.node_of(left).unwrap())]
    );
}

#[test]
fn test_removing_selected_entity_clears_selection() {
    let mut h = harness_with(fixtures::two_cubes_scene());
    let left = h.entity("Left").unwrap();
    h.viewport.select_entity(Some(left));

    assert!(h.remove_entity(left));

    assert_eq!(h.selected(), None);
    assert!(h.viewport.gizmo().object().is_none());
    assert!(!h.viewport.selection().highlight().visible);
}

// ── Focus ────────────────────────────────────────────────────

#[test]
fn test_double_click_hit_focuses_without_selecting() {
    let mut h = harness_with(fixtures::two_cubes_scene());
    let right = h.entity("Right").unwrap();
    let node = h.node_of(right).unwrap();
    let pos = h.client_point_of_entity(right).unwrap();

    h.viewport.double_click(pos);

    assert_eq!(h.events_of(Topic::ObjectFocused), vec![EditorEvent::ObjectFocused(node)]);
    assert_eq!(h.selected(), None);
    let camera = h.viewport.session().camera.borrow().clone();
    assert!((camera.target - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    assert!(h.telemetry().contains(&"selectEntity".to_string()));
}

#[test]
fn test_double_click_miss_is_noop() {
    let mut h = harness_with(fixtures::single_cube_scene());
    let cube = h.entity("Box").unwrap();
    h.viewport.select_entity(Some(cube));
    h.clear_events();
    let before = h.viewport.session().camera.borrow().clone();

    h.viewport.double_click(egui::pos2(5.0, 5.0));

    assert!(h.events().is_empty());
    assert_eq!(h.selected(), Some(cube));
    let after = h.viewport.session().camera.borrow().clone();
    assert_eq!(after.target, before.target);
    assert_eq!(after.distance, before.distance);
}

#[test]
fn test_inspector_cleared_recenters_controls() {
    let mut h = harness_with(fixtures::two_cubes_scene());
    let right = h.entity("Right").unwrap();
    let pos = h.client_point_of_entity(right).unwrap();
    h.viewport.double_click(pos);
    assert_ne!(h.viewport.session().camera.borrow().target, Vec3::ZERO);

    h.viewport.clear();
    assert_eq!(h.viewport.session().camera.borrow().target, Vec3::ZERO);
}

// ── Orbit controls ───────────────────────────────────────────

#[test]
fn test_orbit_drag_moves_camera_without_selecting() {
    let mut h = harness_with(fixtures::single_cube_scene());
    let yaw = h.viewport.session().camera.borrow().yaw;

    h.viewport.mouse_down(egui::pos2(10.0, 10.0), PointerButton::Primary);
    h.viewport.mouse_move(egui::pos2(60.0, 10.0));
    h.viewport.mouse_up(egui::pos2(60.0, 10.0));

    assert_ne!(h.viewport.session().camera.borrow().yaw, yaw);
    assert_eq!(h.events_of(Topic::EditorCameraChanged).len(), 1);
    assert!(h.events_of(Topic::ObjectSelected).is_empty());
}

#[test]
fn test_wheel_zooms_and_rescales_gizmo() {
    let mut h = harness_with(fixtures::single_cube_scene());
    let cube = h.entity("Box").unwrap();
    h.viewport.select_entity(Some(cube));
    let size = h.viewport.gizmo().size();

    h.viewport.wheel(50.0);

    assert!(h.viewport.gizmo().size() < size);
    assert_eq!(h.events_of(Topic::EditorCameraChanged).len(), 1);
}

// ── Edit mode ────────────────────────────────────────────────

#[test]
fn test_edit_mode_round_trip_restores_runtime_camera() {
    let mut h = harness_with(fixtures::mixed_scene());
    let player = h.entity("Player").unwrap();
    assert_eq!(h.active_camera(), Some(player));

    h.open();
    assert_eq!(h.active_camera(), Some(h.edit_camera()));
    assert!(!h.engine.borrow().chrome_visible());

    h.close();
    assert_eq!(h.active_camera(), Some(player));
    assert!(h.engine.borrow().chrome_visible());
    assert_eq!(
        h.telemetry(),
        vec!["toggleEditor:true".to_string(), "toggleEditor:false".to_string()]
    );
}

#[test]
fn test_camera_activated_while_editing_is_parked() {
    let mut h = harness_with(fixtures::mixed_scene());
    let drone = h.add_entity(&fixtures::camera("Drone", [4.0, 4.0, 4.0], false));
    h.open();

    h.scene.borrow_mut().set_active_camera(drone);
    h.viewport.camera_activated(drone);
    assert_eq!(h.active_camera(), Some(h.edit_camera()));

    h.viewport.camera_activated(h.edit_camera());
    assert_eq!(h.viewport.edit_mode().prev_camera(), Some(drone));

    h.close();
    assert_eq!(h.active_camera(), Some(drone));
}

#[test]
fn test_camera_activated_outside_edit_mode_is_ignored() {
    let mut h = harness_with(fixtures::mixed_scene());
    let player = h.entity("Player").unwrap();
    let drone = h.add_entity(&fixtures::camera("Drone", [4.0, 4.0, 4.0], false));
    h.open();
    h.close();

    h.viewport.camera_activated(drone);
    assert_eq!(h.viewport.edit_mode().prev_camera(), Some(player));
}

// ── Resize ───────────────────────────────────────────────────

#[test]
fn test_resize_updates_aspect_before_next_pick() {
    let mut h = harness_with(fixtures::two_cubes_scene());
    let right = h.entity("Right").unwrap();

    h.resize(1000.0, 500.0);
    assert_eq!(h.viewport.session().camera.borrow().aspect, 2.0);

    assert!(h.click_entity(right));
    assert_eq!(h.selected(), Some(right));
}

#[test]
fn test_degenerate_resize_keeps_aspect() {
    let mut h = harness_with(fixtures::single_cube_scene());
    let aspect = h.viewport.session().camera.borrow().aspect;
    h.resize(800.0, 0.0);
    assert_eq!(h.viewport.session().camera.borrow().aspect, aspect);
}

#[test]
fn test_scene_mutations_are_published() {
    let h = harness_with(fixtures::single_cube_scene());
    let cube = h.entity("Box").unwrap();
    h.viewport.observe_mutations(Vec::new());
    assert!(h.events_of(Topic::DomModified).is_empty());

    let mutation = scene_inspector_lib::scene::SceneMutation::AttributeChanged {
        entity: cube,
        name: "position".to_string(),
    };
    h.viewport.observe_mutations(vec![mutation.clone()]);
    assert_eq!(h.events_of(Topic::DomModified), vec![EditorEvent::DomModified(vec![mutation])]);
}
