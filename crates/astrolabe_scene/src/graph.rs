//! The node arena and hierarchy.
//!
//! Nodes live in a [`SlotMap`] and refer to each other through
//! [`NodeHandle`]s. A parent exclusively owns its subtree: removing a node
//! removes every descendant with it. [`SceneGraph::attach`] is the single
//! place where parent links change, so the single-root, acyclic invariant is
//! enforced there and nowhere else.

use astrolabe_core::errors::{AstrolabeError, Result};
use astrolabe_core::transform::TransformData;
use glam::DVec3;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::NodeHandle;
use crate::node::{Node, NodeDescription, UpdateData};

pub const DEFAULT_ROOT_NAME: &str = "Root";

pub struct SceneGraph {
    nodes: SlotMap<NodeHandle, Node>,
    names: FxHashMap<String, NodeHandle>,
    root: NodeHandle,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_NAME)
    }
}

impl SceneGraph {
    #[must_use]
    pub fn new(root_name: &str) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(root_name));
        let mut names = FxHashMap::default();
        names.insert(root_name.to_string(), root);
        Self { nodes, names, root }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    /// Number of nodes, root included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root cannot be removed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[must_use]
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.contains_key(handle)
    }

    /// Exact-match lookup by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<NodeHandle> {
        self.names.get(name).copied()
    }

    /// Like [`find`](Self::find) but reports a miss as
    /// [`AstrolabeError::NodeNotFound`].
    pub fn handle(&self, name: &str) -> Result<NodeHandle> {
        self.find(name)
            .ok_or_else(|| AstrolabeError::NodeNotFound(name.to_string()))
    }

    // ========================================================================
    // Structure
    // ========================================================================

    /// Builds a node from `desc` and links it below its declared parent (the
    /// root when none is given).
    ///
    /// Every check runs before the node is inserted, so on error the graph is
    /// unchanged.
    pub fn add_node(&mut self, desc: &NodeDescription) -> Result<NodeHandle> {
        if self.names.contains_key(&desc.name) {
            return Err(AstrolabeError::DuplicateNodeName(desc.name.clone()));
        }
        let parent = match &desc.parent {
            Some(parent) => self.find(parent).ok_or_else(|| AstrolabeError::MissingParent {
                node: desc.name.clone(),
                parent: parent.clone(),
            })?,
            None => self.root,
        };
        let node = Node::from_description(desc)?;
        self.insert_node(node, parent)
    }

    /// Links an already built node below `parent`.
    pub fn insert_node(&mut self, mut node: Node, parent: NodeHandle) -> Result<NodeHandle> {
        if self.names.contains_key(node.name()) {
            return Err(AstrolabeError::DuplicateNodeName(node.name().to_string()));
        }
        let parent_depth = self
            .nodes
            .get(parent)
            .map(Node::depth)
            .ok_or_else(|| AstrolabeError::NodeNotFound(format!("{parent:?}")))?;

        node.parent = Some(parent);
        node.depth = parent_depth + 1;
        node.children.clear();
        let name = node.name().to_string();

        let handle = self.nodes.insert(node);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(handle);
        }
        self.names.insert(name, handle);
        Ok(handle)
    }

    /// Removes the named node and its whole subtree, deinitializing each.
    pub fn remove_node(&mut self, name: &str) -> Result<()> {
        let handle = self.handle(name)?;
        if handle == self.root {
            return Err(AstrolabeError::CannotRemoveRoot);
        }

        if let Some(parent) = self.nodes[handle].parent
            && let Some(p) = self.nodes.get_mut(parent)
        {
            p.children.retain(|c| *c != handle);
        }

        for removed in self.subtree(handle) {
            if let Some(mut node) = self.nodes.remove(removed) {
                node.deinitialize();
                self.names.remove(node.name());
            }
        }
        log::debug!("Removed scene graph node '{name}' and its subtree");
        Ok(())
    }

    /// Moves `child` (with its subtree) below `parent`.
    ///
    /// Rejects re-parenting the root and any move that would place a node
    /// below itself. Depths of the moved subtree are refreshed.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) -> Result<()> {
        let child_name = self
            .nodes
            .get(child)
            .map(|n| n.name().to_string())
            .ok_or_else(|| AstrolabeError::NodeNotFound(format!("{child:?}")))?;
        let parent_depth = self
            .nodes
            .get(parent)
            .map(Node::depth)
            .ok_or_else(|| AstrolabeError::NodeNotFound(format!("{parent:?}")))?;

        if child == self.root {
            return Err(AstrolabeError::CannotReparentRoot);
        }
        if parent == child || self.is_descendant_of(parent, child) {
            return Err(AstrolabeError::CyclicAttachment {
                child: child_name,
                parent: self.nodes[parent].name().to_string(),
            });
        }

        // 1. Detach from old
        if let Some(old) = self.nodes[child].parent
            && let Some(p) = self.nodes.get_mut(old)
        {
            p.children.retain(|c| *c != child);
        }

        // 2. Attach to new
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);

        // 3. Refresh depths below the moved node
        let old_base = self.nodes[child].depth;
        let new_base = parent_depth + 1;
        for handle in self.subtree(child) {
            let node = &mut self.nodes[handle];
            node.depth = node.depth - old_base + new_base;
        }
        Ok(())
    }

    /// True when `ancestor` lies on the parent chain of `node`. A node is not
    /// its own descendant.
    #[must_use]
    pub fn is_descendant_of(&self, node: NodeHandle, ancestor: NodeHandle) -> bool {
        let mut current = self.nodes.get(node).and_then(Node::parent);
        while let Some(handle) = current {
            if handle == ancestor {
                return true;
            }
            current = self.nodes.get(handle).and_then(Node::parent);
        }
        false
    }

    /// Drops every node except the root.
    pub fn clear(&mut self) {
        log::info!("Clearing current scene graph");
        let root = self.root;
        for (handle, node) in &mut self.nodes {
            if handle != root {
                node.deinitialize();
            }
        }
        self.nodes.retain(|handle, _| handle == root);
        self.nodes[root].children.clear();
        self.names.retain(|_, handle| *handle == root);
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// All nodes in depth-first pre-order, starting at the root.
    #[must_use]
    pub fn nodes(&self) -> Vec<NodeHandle> {
        self.subtree(self.root)
    }

    /// `start` and its descendants in depth-first pre-order.
    ///
    /// Iterative, so deep chains do not exhaust the stack.
    #[must_use]
    pub fn subtree(&self, start: NodeHandle) -> Vec<NodeHandle> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![start];
        while let Some(handle) = stack.pop() {
            let Some(node) = self.nodes.get(handle) else {
                continue;
            };
            order.push(handle);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    /// Updates every node in tree order, parents before children.
    pub fn update(&mut self, data: &UpdateData) {
        for handle in self.nodes() {
            self.nodes[handle].update(data);
        }
    }

    pub fn initialize_all(&mut self) {
        for handle in self.nodes() {
            let node = &mut self.nodes[handle];
            node.initialize();
            log::debug!("{} initialized successfully!", node.name());
        }
    }

    /// Leaves are visited before their ancestors.
    pub fn calculate_bounding_spheres(&mut self) {
        for handle in self.nodes().into_iter().rev() {
            self.nodes[handle].calculate_bounding_sphere();
        }
    }

    // ========================================================================
    // Relative transforms
    // ========================================================================

    fn node_in_tree(&self, handle: NodeHandle) -> &Node {
        self.nodes
            .get(handle)
            .unwrap_or_else(|| panic!("{handle:?} is not a node of this scene graph"))
    }

    fn parent_in_tree(&self, handle: NodeHandle) -> NodeHandle {
        self.node_in_tree(handle)
            .parent
            .unwrap_or_else(|| panic!("{handle:?} is detached from the scene graph root"))
    }

    /// The transform mapping points in `from`'s frame into `to`'s frame.
    ///
    /// Walks both nodes up to their lowest common ancestor: the deeper side
    /// is raised until both are at equal depth, then both step up together.
    /// The `from` side composes local transforms outward, the `to` side
    /// composes their inverses inward. Only the nodes on the path are
    /// visited.
    ///
    /// Returns exactly [`TransformData::IDENTITY`] when `from == to`.
    ///
    /// # Panics
    ///
    /// If either handle is not in this graph or a walk runs off a detached
    /// node. Both indicate a bug in tree maintenance.
    #[must_use]
    pub fn relative_transform(&self, from: NodeHandle, to: NodeHandle) -> TransformData {
        let mut up = TransformData::IDENTITY;
        let mut down = TransformData::IDENTITY;
        let mut a = from;
        let mut b = to;
        let mut depth_a = self.node_in_tree(a).depth;
        let mut depth_b = self.node_in_tree(b).depth;

        while depth_a > depth_b {
            up = up.then(&self.node_in_tree(a).local_transform());
            a = self.parent_in_tree(a);
            depth_a -= 1;
        }
        while depth_b > depth_a {
            down = self.node_in_tree(b).local_transform().inverse().then(&down);
            b = self.parent_in_tree(b);
            depth_b -= 1;
        }
        while a != b {
            up = up.then(&self.node_in_tree(a).local_transform());
            down = self.node_in_tree(b).local_transform().inverse().then(&down);
            a = self.parent_in_tree(a);
            b = self.parent_in_tree(b);
        }

        up.then(&down)
    }

    /// Transform from `handle`'s frame into the root frame.
    #[must_use]
    pub fn world_transform(&self, handle: NodeHandle) -> TransformData {
        self.relative_transform(handle, self.root)
    }

    #[must_use]
    pub fn world_position(&self, handle: NodeHandle) -> DVec3 {
        self.world_transform(handle).translation
    }
}

impl std::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("root", &self.root)
            .field("len", &self.nodes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::TranslationDescription;

    fn at(name: &str, parent: Option<&str>, position: [f64; 3]) -> NodeDescription {
        let desc = NodeDescription::new(name)
            .with_translation(TranslationDescription::Static { position });
        match parent {
            Some(p) => desc.with_parent(p),
            None => desc,
        }
    }

    fn chain() -> SceneGraph {
        let mut graph = SceneGraph::default();
        graph.add_node(&at("A", None, [1.0, 0.0, 0.0])).unwrap();
        graph.add_node(&at("B", Some("A"), [0.0, 1.0, 0.0])).unwrap();
        graph.add_node(&at("C", Some("A"), [0.0, 0.0, 1.0])).unwrap();
        graph.add_node(&at("D", Some("C"), [2.0, 0.0, 0.0])).unwrap();
        graph
    }

    #[test]
    fn depth_follows_parent_chain() {
        let graph = chain();
        assert_eq!(graph.get(graph.root()).unwrap().depth(), 0);
        assert_eq!(graph.get(graph.find("A").unwrap()).unwrap().depth(), 1);
        assert_eq!(graph.get(graph.find("D").unwrap()).unwrap().depth(), 3);
    }

    #[test]
    fn nodes_are_depth_first_in_insertion_order() {
        let graph = chain();
        let names: Vec<&str> = graph
            .nodes()
            .into_iter()
            .map(|h| graph.get(h).unwrap().name())
            .collect();
        assert_eq!(names, vec!["Root", "A", "B", "C", "D"]);
    }

    #[test]
    fn sibling_relative_transform_goes_through_parent() {
        let graph = chain();
        let b = graph.find("B").unwrap();
        let d = graph.find("D").unwrap();
        let t = graph.relative_transform(b, d);
        // B origin in A: (0,1,0); in C: (0,1,-1); in D: (-2,1,-1)
        assert!(t.translation.abs_diff_eq(DVec3::new(-2.0, 1.0, -1.0), 1e-12));
    }

    #[test]
    fn failed_add_leaves_graph_untouched() {
        let mut graph = chain();
        let before = graph.len();

        let err = graph.add_node(&at("E", Some("Nowhere"), [0.0; 3])).unwrap_err();
        assert!(matches!(err, AstrolabeError::MissingParent { .. }));
        let err = graph.add_node(&at("B", None, [0.0; 3])).unwrap_err();
        assert!(matches!(err, AstrolabeError::DuplicateNodeName(_)));

        assert_eq!(graph.len(), before);
        assert!(graph.find("E").is_none());
    }

    #[test]
    fn remove_cascades_to_subtree() {
        let mut graph = chain();
        graph.remove_node("C").unwrap();
        assert!(graph.find("C").is_none());
        assert!(graph.find("D").is_none());
        assert_eq!(graph.len(), 3);
        let a = graph.find("A").unwrap();
        assert_eq!(graph.get(a).unwrap().children().len(), 1);
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut graph = chain();
        assert!(matches!(graph.remove_node("Root"), Err(AstrolabeError::CannotRemoveRoot)));
    }

    #[test]
    fn attach_rejects_cycles_and_updates_depth() {
        let mut graph = chain();
        let a = graph.find("A").unwrap();
        let b = graph.find("B").unwrap();
        let c = graph.find("C").unwrap();
        let d = graph.find("D").unwrap();

        assert!(matches!(graph.attach(a, d), Err(AstrolabeError::CyclicAttachment { .. })));
        assert!(matches!(graph.attach(a, a), Err(AstrolabeError::CyclicAttachment { .. })));
        let root = graph.root();
        assert!(matches!(graph.attach(root, b), Err(AstrolabeError::CannotReparentRoot)));

        graph.attach(c, b).unwrap();
        assert_eq!(graph.get(c).unwrap().depth(), 3);
        assert_eq!(graph.get(d).unwrap().depth(), 4);
        assert!(graph.is_descendant_of(d, b));
        assert_eq!(graph.get(a).unwrap().children(), &[b]);
    }

    #[test]
    fn clear_keeps_only_root() {
        let mut graph = chain();
        graph.clear();
        assert_eq!(graph.len(), 1);
        assert!(graph.find("A").is_none());
        assert_eq!(graph.find("Root"), Some(graph.root()));
        assert!(graph.get(graph.root()).unwrap().children().is_empty());
    }
}
