use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Logical scene entity (the engine's entity, not its render node)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity:{}", short_uuid(&self.0))
    }
}

/// Render-graph node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", short_uuid(&self.0))
    }
}

fn short_uuid(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// `{x, y, z}` attribute payload
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Xyz {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Xyz {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Structured attribute value as stored by the host engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Vec3(Xyz),
    Text(String),
}

impl AttributeValue {
    pub fn as_xyz(&self) -> Option<Xyz> {
        match self {
            AttributeValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

/// Gizmo manipulation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

impl TransformMode {
    /// Parse a host-supplied mode name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "translate" => Some(TransformMode::Translate),
            "rotate" => Some(TransformMode::Rotate),
            "scale" => Some(TransformMode::Scale),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransformMode::Translate => "translate",
            TransformMode::Rotate => "rotate",
            TransformMode::Scale => "scale",
        }
    }

    /// Attribute written back for this mode
    pub fn attribute(&self) -> &'static str {
        match self {
            TransformMode::Translate => "position",
            TransformMode::Rotate => "rotation",
            TransformMode::Scale => "scale",
        }
    }
}

/// Coordinate space the gizmo axes are expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformSpace {
    Local,
    #[default]
    World,
}

impl TransformSpace {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "local" => Some(TransformSpace::Local),
            "world" => Some(TransformSpace::World),
            _ => None,
        }
    }
}

/// Object transform as authored in a scene document (rotation in degrees)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub position: [f64; 3],
    #[serde(default)]
    pub rotation: [f64; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f64; 3],
}

fn unit_scale() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

impl Transform {
    pub fn new() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: unit_scale(),
        }
    }

    pub fn at(position: [f64; 3]) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// What an authored node is, as far as the editor cares
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Empty transform group
    #[default]
    Group,
    /// Box-shaped mesh with the given size
    Mesh { size: [f64; 3] },
    /// Light source (gets an editor helper)
    Light,
    /// Camera (gets an editor helper)
    Camera {
        #[serde(default)]
        active: bool,
    },
    /// Sound emitter, no geometry
    Sound,
}

/// One entity in a scene document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    pub name: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDescription>,
}

/// Scene document used to seed an in-memory scene
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub entities: Vec<NodeDescription>,
}

impl SceneDescription {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Number of entities including nested children
    pub fn entity_count(&self) -> usize {
        fn count(nodes: &[NodeDescription]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_mode_parse() {
        assert_eq!(TransformMode::parse("rotate"), Some(TransformMode::Rotate));
        assert_eq!(TransformMode::parse("shear"), None);
        assert_eq!(TransformMode::Scale.attribute(), "scale");
    }

    #[test]
    fn test_attribute_value_untagged() {
        let v: AttributeValue = serde_json::from_str(r#"{"x": 1.0, "y": 2.0, "z": 3.0}"#).unwrap();
        assert_eq!(v.as_xyz(), Some(Xyz::new(1.0, 2.0, 3.0)));

        let b: AttributeValue = serde_json::from_str("true").unwrap();
        assert_eq!(b, AttributeValue::Bool(true));
    }

    #[test]
    fn test_scene_description_defaults() {
        let json = r#"{"entities": [
            {"name": "box", "kind": {"type": "mesh", "size": [1, 1, 1]},
             "children": [{"name": "lamp", "kind": {"type": "light"}}]},
            {"name": "cam", "kind": {"type": "camera", "active": true}}
        ]}"#;
        let scene = SceneDescription::from_json(json).unwrap();
        assert_eq!(scene.entity_count(), 3);
        assert_eq!(scene.entities[0].transform.scale, [1.0, 1.0, 1.0]);
        assert_eq!(scene.entities[1].kind, NodeKind::Camera { active: true });
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(EntityId::new(), EntityId::new());
        assert!(NodeId::new().to_string().starts_with("node:"));
    }
}
