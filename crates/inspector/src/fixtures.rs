//! Factory functions for scene documents used in tests and by the CLI.

use shared::{NodeDescription, NodeKind, SceneDescription, Transform};

// ── Node factories ──────────────────────────────────────────────

fn node(name: &str, kind: NodeKind, position: [f64; 3]) -> NodeDescription {
    NodeDescription {
        name: name.to_string(),
        kind,
        transform: Transform::at(position),
        children: Vec::new(),
    }
}

/// Cube mesh with edge length `size`
pub fn cube(name: &str, position: [f64; 3], size: f64) -> NodeDescription {
    node(name, NodeKind::Mesh { size: [size; 3] }, position)
}

/// Box mesh with per-axis size
pub fn mesh_box(name: &str, position: [f64; 3], size: [f64; 3]) -> NodeDescription {
    node(name, NodeKind::Mesh { size }, position)
}

/// Empty group
pub fn group(name: &str, position: [f64; 3]) -> NodeDescription {
    node(name, NodeKind::Group, position)
}

pub fn light(name: &str, position: [f64; 3]) -> NodeDescription {
    node(name, NodeKind::Light, position)
}

pub fn sound(name: &str, position: [f64; 3]) -> NodeDescription {
    node(name, NodeKind::Sound, position)
}

/// Runtime camera; `active` makes it the scene's active camera
pub fn camera(name: &str, position: [f64; 3], active: bool) -> NodeDescription {
    node(name, NodeKind::Camera { active }, position)
}

/// `parent` with `children` attached
pub fn with_children(mut parent: NodeDescription, children: Vec<NodeDescription>) -> NodeDescription {
    parent.children.extend(children);
    parent
}

// ── Scene factories ─────────────────────────────────────────────

pub fn scene(entities: Vec<NodeDescription>) -> SceneDescription {
    SceneDescription { entities }
}

/// One unit cube at the origin
pub fn single_cube_scene() -> SceneDescription {
    scene(vec![cube("Box", [0.0, 0.0, 0.0], 1.0)])
}

/// Two cubes apart on X
pub fn two_cubes_scene() -> SceneDescription {
    scene(vec![
        cube("Left", [-2.0, 0.0, 0.0], 1.0),
        cube("Right", [2.0, 0.0, 0.0], 1.0),
    ])
}

/// A cube, a light, a sound and an active runtime camera
pub fn mixed_scene() -> SceneDescription {
    scene(vec![
        cube("Box", [0.0, 0.0, 0.0], 1.0),
        light("Sun", [0.0, 3.0, 0.0]),
        sound("Ambience", [-3.0, 0.0, 0.0]),
        camera("Player", [0.0, 1.6, 5.0], true),
    ])
}

/// Group holding a cube and a light, used for subtree add/remove
pub fn nested_scene() -> SceneDescription {
    scene(vec![with_children(
        group("Rig", [1.0, 0.0, 0.0]),
        vec![
            cube("Body", [0.0, 0.5, 0.0], 1.0),
            light("Lamp", [0.0, 2.0, 0.0]),
        ],
    )])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_scene_counts_children() {
        assert_eq!(nested_scene().entity_count(), 3);
    }

    #[test]
    fn test_mixed_scene_has_active_camera() {
        let scene = mixed_scene();
        assert!(scene
            .entities
            .iter()
            .any(|e| e.kind == NodeKind::Camera { active: true }));
    }

    #[test]
    fn test_scene_json_roundtrip() {
        let json = serde_json::to_string(&two_cubes_scene()).unwrap();
        let back = SceneDescription::from_json(&json).unwrap();
        assert_eq!(back, two_cubes_scene());
    }
}
