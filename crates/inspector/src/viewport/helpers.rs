use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use shared::NodeId;

use super::picking::{PickEntry, PickIndex, PickOwner};
use crate::events::{EditorEvent, Outbox};
use crate::session::EditorSession;

/// Name of the pick proxy child inside every helper visual
pub const PICKER_NAME: &str = "picker";

/// Target render node -> helper visual root
pub type HelperMap = HashMap<NodeId, NodeId>;

/// Ground grid helper
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub visible: bool,
    pub size: f32,
    pub divisions: u32,
}

/// Keeps the pick index and helper visuals in step with structural scene changes
pub struct HelperSync {
    session: EditorSession,
    pick_index: Rc<RefCell<PickIndex>>,
    helpers: HelperMap,
    grid: Grid,
}

impl HelperSync {
    pub fn new(session: EditorSession, pick_index: Rc<RefCell<PickIndex>>) -> Self {
        let g = &session.settings.grid;
        let grid = Grid {
            visible: g.visible,
            size: g.size,
            divisions: g.divisions,
        };
        Self {
            session,
            pick_index,
            helpers: HelperMap::new(),
            grid,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn helpers(&self) -> &HelperMap {
        &self.helpers
    }

    pub fn helper_of(&self, target: NodeId) -> Option<NodeId> {
        self.helpers.get(&target).copied()
    }

    fn target_of(&self, helper: NodeId) -> Option<NodeId> {
        self.helpers
            .iter()
            .find_map(|(target, h)| (*h == helper).then_some(*target))
    }

    pub fn handle(&mut self, event: &EditorEvent) -> Outbox {
        match event {
            EditorEvent::ObjectAdded(node) => return self.object_added(*node),
            EditorEvent::ObjectRemoved(node) => return self.object_removed(*node),
            EditorEvent::HelperAdded(helper) => self.helper_added(*helper),
            EditorEvent::HelperRemoved(helper) => {
                if self.pick_index.borrow_mut().remove_helper(*helper).is_none() {
                    tracing::trace!("helper {helper} had no registered picker");
                }
            }
            EditorEvent::ObjectChanged(node) | EditorEvent::GeometryChanged(node) => {
                return self.sync_helpers(*node)
            }
            EditorEvent::ShowGridChanged(visible) => self.grid.visible = *visible,
            _ => {}
        }
        Vec::new()
    }

    fn object_added(&mut self, root: NodeId) -> Outbox {
        let nodes = self.session.scene.borrow().descendants(root);
        {
            let scene = self.session.scene.borrow();
            let mut index = self.pick_index.borrow_mut();
            for node in &nodes {
                match scene.owner(*node) {
                    Some(entity) => {
                        index.add(PickEntry {
                            node: *node,
                            owner: PickOwner::Entity(entity),
                        });
                    }
                    None => tracing::trace!("{node} has no owner, not pickable"),
                }
            }
        }
        nodes.into_iter().filter_map(|node| self.create_helper(node)).collect()
    }

    fn object_removed(&mut self, root: NodeId) -> Outbox {
        let nodes = self.session.scene.borrow().descendants(root);
        // nodes still registered by an earlier add keep their helper
        let released: Vec<NodeId> = {
            let mut index = self.pick_index.borrow_mut();
            nodes
                .into_iter()
                .filter(|node| {
                    index.remove(*node);
                    !index.contains(*node)
                })
                .collect()
        };
        released.into_iter().filter_map(|node| self.dispose_helper(node)).collect()
    }

    fn helper_added(&mut self, helper: NodeId) {
        let target = self
            .target_of(helper)
            .or_else(|| self.session.scene.borrow().helper_target(helper));
        let Some(target) = target else {
            tracing::debug!("helper {helper} has no known target, ignoring");
            return;
        };
        let Some(picker) = self.session.scene.borrow().find_named(helper, PICKER_NAME) else {
            tracing::debug!("helper {helper} has no {PICKER_NAME} node");
            return;
        };
        self.pick_index.borrow_mut().add(PickEntry {
            node: picker,
            owner: PickOwner::Helper { helper, target },
        });
    }

    /// Bring helpers under `root` in line with the scene: create missing
    /// ones, dispose unneeded ones, refresh the rest.
    fn sync_helpers(&mut self, root: NodeId) -> Outbox {
        let nodes = self.session.scene.borrow().descendants(root);
        let mut out = Vec::new();
        for node in nodes {
            let required = self.session.scene.borrow().requires_helper(node);
            match (self.helpers.get(&node).copied(), required) {
                (Some(helper), true) => self.session.scene.borrow_mut().update_helper(helper),
                (Some(_), false) => out.extend(self.dispose_helper(node)),
                (None, true) => out.extend(self.create_helper(node)),
                (None, false) => {}
            }
        }
        out
    }

    fn create_helper(&mut self, target: NodeId) -> Option<EditorEvent> {
        if self.helpers.contains_key(&target) || !self.session.scene.borrow().requires_helper(target) {
            return None;
        }
        let helper = self.session.scene.borrow_mut().create_helper(target)?;
        tracing::debug!("created helper {helper} for {target}");
        self.helpers.insert(target, helper);
        Some(EditorEvent::HelperAdded(helper))
    }

    fn dispose_helper(&mut self, target: NodeId) -> Option<EditorEvent> {
        let helper = self.helpers.remove(&target)?;
        tracing::debug!("disposing helper {helper} of {target}");
        self.session.scene.borrow_mut().dispose_helper(helper);
        Some(EditorEvent::HelperRemoved(helper))
    }
}
