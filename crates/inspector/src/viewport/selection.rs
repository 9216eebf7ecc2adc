use shared::{EntityId, NodeId};

use super::picking::Aabb;
use crate::events::{EditorEvent, Outbox};
use crate::session::EditorSession;

/// Bounding-box highlight drawn around the selection
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionBox {
    pub visible: bool,
    pub bounds: Option<Aabb>,
    pub color: [u8; 3],
    pub depth_test: bool,
}

impl SelectionBox {
    /// Refit to the current bounds of `node`. Returns false if it has none.
    fn update(&mut self, session: &EditorSession, node: NodeId) -> bool {
        let bounds = session.scene.borrow().bounds(node);
        self.bounds = bounds;
        bounds.is_some()
    }
}

/// Current selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selected {
    pub entity: EntityId,
    pub node: NodeId,
}

/// Tracks the single selection and its highlight box
pub struct SelectionHighlight {
    session: EditorSession,
    selected: Option<Selected>,
    highlight: SelectionBox,
}

impl SelectionHighlight {
    pub fn new(session: EditorSession) -> Self {
        let highlight = SelectionBox {
            visible: false,
            bounds: None,
            color: session.settings.selection.color,
            depth_test: session.settings.selection.depth_test,
        };
        Self {
            session,
            selected: None,
            highlight,
        }
    }

    pub fn selected(&self) -> Option<Selected> {
        self.selected
    }

    pub fn highlight(&self) -> &SelectionBox {
        &self.highlight
    }

    pub fn handle(&mut self, event: &EditorEvent) -> Outbox {
        match event {
            EditorEvent::ObjectSelected(entity) => self.select(*entity),
            EditorEvent::GeometryChanged(node) | EditorEvent::ObjectChanged(node) => {
                self.refit_if_selected(*node)
            }
            EditorEvent::ObjectRemoved(node) => {
                let removed = self
                    .selected
                    .is_some_and(|s| self.session.scene.borrow().descendants(*node).contains(&s.node));
                if removed {
                    return vec![EditorEvent::ObjectSelected(None)];
                }
            }
            EditorEvent::ComponentChanged { entity, component } => {
                if let Some(selected) = self.selected.filter(|s| s.entity == *entity) {
                    tracing::trace!("{component} changed on selected {entity}");
                    return vec![EditorEvent::ObjectChanged(selected.node)];
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn select(&mut self, entity: Option<EntityId>) {
        self.highlight.visible = false;
        self.highlight.bounds = None;
        self.selected = None;

        let Some(entity) = entity else {
            tracing::debug!("selection cleared");
            return;
        };
        let Some(node) = self.session.scene.borrow().object_of(entity) else {
            tracing::debug!("selected {entity} has no render node");
            return;
        };
        self.selected = Some(Selected { entity, node });
        tracing::debug!("selected {entity} ({node})");

        if self.selected_has_geometry() {
            self.highlight.visible = self.highlight.update(&self.session, node);
        }
    }

    fn refit_if_selected(&mut self, node: NodeId) {
        if self.selected_node() == Some(node) {
            let fitted = self.highlight.update(&self.session, node);
            self.highlight.visible = fitted && self.selected_has_geometry();
        }
    }

    fn selected_node(&self) -> Option<NodeId> {
        self.selected.map(|s| s.node)
    }

    fn selected_has_geometry(&self) -> bool {
        self.selected
            .is_some_and(|s| self.session.scene.borrow().has_renderable_geometry(s.entity))
    }
}
