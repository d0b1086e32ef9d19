use generational_arena::{Arena, Index};
use itertools::Itertools;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::config::TreeSettings;
use crate::errors::{TreeError, TreeResult};
use crate::traverse::{Order, Traverse, Walk};

/// Default payload: ordered string attributes.
pub type Attributes = BTreeMap<String, String>;

/// Handle to a node inside one [`Tree`].
///
/// Handles are generational: once a node is removed its handle never resolves
/// again, even if the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "#{}v{}", slot, generation)
    }
}

/// Data payload for tree nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData<T = Attributes> {
    /// Display name, not required to be unique
    pub name: String,
    /// Arbitrary caller payload
    pub attrs: T,
}

impl<T> NodeData<T> {
    pub fn new(name: impl Into<String>, attrs: T) -> Self {
        Self {
            name: name.into(),
            attrs,
        }
    }
}

impl<T> fmt::Display for NodeData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug, Clone)]
pub struct TreeNode<T = Attributes> {
    /// Name and payload of this node
    pub data: NodeData<T>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl<T> TreeNode<T> {
    fn new(data: NodeData<T>, parent: Option<NodeId>) -> Self {
        Self {
            data,
            parent,
            children: Vec::new(),
        }
    }

    /// Parent handle, `None` for roots.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child handles in order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Callbacks around link changes.
///
/// `pre_*` hooks run before anything changes and may veto the change by
/// returning an error (usually [`TreeError::Rejected`]); the tree is then left
/// as it was. `post_*` hooks see the finished change. Moving a node fires the
/// detach hooks for its old parent, then the attach hooks for the new one.
/// Copies and [`Tree::extract`] never fire hooks. Hooks are shared by
/// clones of the tree.
pub trait TreeHooks<T>: Send + Sync {
    fn pre_attach(&self, _tree: &Tree<T>, _node: NodeId, _parent: NodeId) -> TreeResult<()> {
        Ok(())
    }

    fn post_attach(&self, _tree: &Tree<T>, _node: NodeId, _parent: NodeId) {}

    fn pre_detach(&self, _tree: &Tree<T>, _node: NodeId, _parent: NodeId) -> TreeResult<()> {
        Ok(())
    }

    fn post_detach(&self, _tree: &Tree<T>, _node: NodeId, _parent: NodeId) {}

    /// Runs once per [`Tree::set_children`], before the per-node hooks.
    fn pre_set_children(&self, _tree: &Tree<T>, _parent: NodeId, _children: &[NodeId]) -> TreeResult<()> {
        Ok(())
    }

    /// Runs once per [`Tree::set_children`], after the per-node hooks.
    fn post_set_children(&self, _tree: &Tree<T>, _parent: NodeId, _children: &[NodeId]) {}
}

type SharedHooks<T> = Arc<dyn TreeHooks<T>>;

/// Nodes of a pending copy in pre-order: position of the parent within the
/// plan (`None` for the copy root) and the already copied data.
type CopyPlan<T> = Vec<(Option<usize>, NodeData<T>)>;

/// Arena-based forest of ordered N-ary trees.
///
/// The arena owns every node. Parent and child links are handles that are
/// always updated together, so `parent.children` contains a node exactly once
/// iff the node's `parent` points back. Any number of disjoint trees may live
/// in one arena; detached subtrees stay as standalone roots.
#[derive(Clone)]
pub struct Tree<T = Attributes> {
    arena: Arena<TreeNode<T>>,
    separator: String,
    hooks: Option<SharedHooks<T>>,
}

impl<T: fmt::Debug> fmt::Debug for Tree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("arena", &self.arena)
            .field("separator", &self.separator)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Tree<T> {
    pub fn new() -> Self {
        Self::with_settings(&TreeSettings::default())
    }

    pub fn with_settings(settings: &TreeSettings) -> Self {
        Self {
            arena: Arena::new(),
            separator: settings.separator.clone(),
            hooks: None,
        }
    }

    /// Installs hooks run around every attach and detach. Replaces any
    /// previously installed hooks.
    pub fn set_hooks(&mut self, hooks: impl TreeHooks<T> + 'static) {
        self.hooks = Some(Arc::new(hooks));
    }

    pub fn clear_hooks(&mut self) {
        self.hooks = None;
    }

    /// Separator used by [`Tree::path_string`].
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Number of nodes across all trees in the arena.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.arena.contains(node.0)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get_node(&self, node: NodeId) -> Option<&TreeNode<T>> {
        self.arena.get(node.0)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn get(&self, node: NodeId) -> TreeResult<&TreeNode<T>> {
        self.arena.get(node.0).ok_or(TreeError::NodeNotFound(node))
    }

    fn get_mut(&mut self, node: NodeId) -> TreeResult<&mut TreeNode<T>> {
        self.arena.get_mut(node.0).ok_or(TreeError::NodeNotFound(node))
    }

    pub fn data(&self, node: NodeId) -> TreeResult<&NodeData<T>> {
        Ok(&self.get(node)?.data)
    }

    /// Mutable access to name and payload. Links are not reachable from here.
    pub fn data_mut(&mut self, node: NodeId) -> TreeResult<&mut NodeData<T>> {
        Ok(&mut self.get_mut(node)?.data)
    }

    pub fn name(&self, node: NodeId) -> TreeResult<&str> {
        Ok(self.get(node)?.data.name.as_str())
    }

    pub fn parent(&self, node: NodeId) -> TreeResult<Option<NodeId>> {
        Ok(self.get(node)?.parent)
    }

    pub fn children(&self, node: NodeId) -> TreeResult<&[NodeId]> {
        Ok(&self.get(node)?.children)
    }

    /// Every parentless node in the arena, in slot order.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.arena
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(idx, _)| NodeId(idx))
    }

    /// Creates a node; appends it as last child of `parent` when given.
    #[instrument(level = "debug", skip(self, attrs))]
    pub fn create(
        &mut self,
        name: &str,
        attrs: T,
        parent: Option<NodeId>,
    ) -> TreeResult<NodeId> {
        self.insert_node(NodeData::new(name, attrs), parent)
    }

    /// Inserts `data` as a new node. With a parent, the attach hooks run; a
    /// veto drops the new node again.
    #[instrument(level = "trace", skip(self, data))]
    pub fn insert_node(&mut self, data: NodeData<T>, parent: Option<NodeId>) -> TreeResult<NodeId> {
        if let Some(parent_id) = parent {
            self.get(parent_id)?;
        }
        let node_id = NodeId(self.arena.insert(TreeNode::new(data, None)));
        if let Some(parent_id) = parent {
            if let Err(e) = self.relink(node_id, parent_id, None) {
                self.arena.remove(node_id.0);
                return Err(e);
            }
        }
        Ok(node_id)
    }

    /// Moves `node` (with its subtree) to the end of `new_parent`'s children.
    ///
    /// Fails with [`TreeError::Cycle`] when `new_parent` is `node` or one of
    /// its descendants; the tree is untouched on failure.
    #[instrument(level = "debug", skip(self))]
    pub fn attach(&mut self, node: NodeId, new_parent: NodeId) -> TreeResult<()> {
        self.check_loop(node, new_parent)?;
        self.relink(node, new_parent, None)
    }

    /// Like [`Tree::attach`] but inserts at `index` (clamped to the number of
    /// children after `node` has been unlinked).
    #[instrument(level = "debug", skip(self))]
    pub fn attach_at(&mut self, node: NodeId, new_parent: NodeId, index: usize) -> TreeResult<()> {
        self.check_loop(node, new_parent)?;
        self.relink(node, new_parent, Some(index))
    }

    /// Removes `node` from its parent's children. No-op for roots.
    #[instrument(level = "debug", skip(self))]
    pub fn detach(&mut self, node: NodeId) -> TreeResult<()> {
        let Some(parent) = self.get(node)?.parent else {
            return Ok(());
        };
        let hooks = self.hooks.clone();
        if let Some(h) = &hooks {
            h.pre_detach(self, node, parent)?;
        }
        self.unlink(node)?;
        if let Some(h) = &hooks {
            h.post_detach(self, node, parent);
        }
        Ok(())
    }

    /// Moves `node` below `parent` with hooks; loop checks are the caller's.
    fn relink(&mut self, node: NodeId, parent: NodeId, index: Option<usize>) -> TreeResult<()> {
        let old_parent = self.get(node)?.parent;
        let hooks = self.hooks.clone();
        if let Some(h) = &hooks {
            if let Some(old) = old_parent {
                h.pre_detach(self, node, old)?;
            }
            h.pre_attach(self, node, parent)?;
        }
        self.unlink(node)?;
        if let (Some(h), Some(old)) = (&hooks, old_parent) {
            h.post_detach(self, node, old);
        }
        self.link(node, parent, index)?;
        if let Some(h) = &hooks {
            h.post_attach(self, node, parent);
        }
        Ok(())
    }

    /// Replaces the children of `parent` with `children`, in order.
    ///
    /// Previous children that are not in the new list become roots. Nodes in
    /// the new list are moved from wherever they were. All checks run before
    /// any link changes.
    #[instrument(level = "debug", skip(self))]
    pub fn set_children(&mut self, parent: NodeId, children: &[NodeId]) -> TreeResult<()> {
        self.get(parent)?;
        let mut seen = HashSet::with_capacity(children.len());
        for &child in children {
            if !seen.insert(child) {
                return Err(TreeError::DuplicateChild(child));
            }
            self.check_loop(child, parent)?;
        }

        let hooks = self.hooks.clone();
        // (node, parent) pairs losing their link, old children first
        let mut detached: Vec<(NodeId, NodeId)> =
            self.children(parent)?.iter().map(|&old| (old, parent)).collect();
        for &child in children {
            if let Some(old) = self.get(child)?.parent.filter(|&p| p != parent) {
                detached.push((child, old));
            }
        }
        if let Some(h) = &hooks {
            h.pre_set_children(self, parent, children)?;
            for &(node, old) in &detached {
                h.pre_detach(self, node, old)?;
            }
            for &child in children {
                h.pre_attach(self, child, parent)?;
            }
        }

        let old_children = std::mem::take(&mut self.get_mut(parent)?.children);
        for old in old_children {
            self.get_mut(old)?.parent = None;
        }
        for &child in children {
            self.unlink(child)?;
            self.link(child, parent, None)?;
        }

        if let Some(h) = &hooks {
            for &(node, old) in &detached {
                h.post_detach(self, node, old);
            }
            for &child in children {
                h.post_attach(self, child, parent);
            }
            h.post_set_children(self, parent, children);
        }
        debug!(parent = %parent, count = children.len(), "children replaced");
        Ok(())
    }

    /// Drops `node` and its whole subtree from the arena, returning the
    /// removed node's data. Handles into the subtree become stale. The detach
    /// hooks run for `node` if it has a parent.
    #[instrument(level = "debug", skip(self))]
    pub fn remove(&mut self, node: NodeId) -> TreeResult<NodeData<T>> {
        self.detach(node)?;
        let doomed: Vec<NodeId> = self.traverse(node, Order::PostOrder)?.map(|(id, _)| id).collect();
        let mut removed_root = None;
        for id in doomed {
            if let Some(removed) = self.arena.remove(id.0) {
                if id == node {
                    removed_root = Some(removed.data);
                }
            }
        }
        debug!(node = %node, "subtree removed");
        removed_root.ok_or(TreeError::NodeNotFound(node))
    }

    /// Fails if linking `node` under `parent` would close a loop.
    fn check_loop(&self, node: NodeId, parent: NodeId) -> TreeResult<()> {
        self.get(node)?;
        self.get(parent)?;
        if node == parent || self.is_ancestor_of(node, parent)? {
            return Err(TreeError::Cycle { node, parent });
        }
        Ok(())
    }

    fn unlink(&mut self, node: NodeId) -> TreeResult<()> {
        let Some(parent) = self.get(node)?.parent else {
            return Ok(());
        };
        let siblings = &mut self.get_mut(parent)?.children;
        if let Some(pos) = siblings.iter().position(|&c| c == node) {
            siblings.remove(pos);
        }
        self.get_mut(node)?.parent = None;
        Ok(())
    }

    fn link(&mut self, node: NodeId, parent: NodeId, index: Option<usize>) -> TreeResult<()> {
        let siblings = &mut self.get_mut(parent)?.children;
        match index {
            Some(i) => siblings.insert(i.min(siblings.len()), node),
            None => siblings.push(node),
        }
        self.get_mut(node)?.parent = Some(parent);
        Ok(())
    }

    /// Copies `node` into this arena as a new standalone root.
    ///
    /// `deep = false` copies just the node, `deep = true` the whole subtree.
    /// The copy shares no handles with the original.
    #[instrument(level = "debug", skip(self))]
    pub fn copy(&mut self, node: NodeId, deep: bool) -> TreeResult<NodeId>
    where
        T: Clone,
    {
        if deep {
            self.copy_with(node, |data| data.clone())
        } else {
            let data = self.data(node)?.clone();
            self.insert_node(data, None)
        }
    }

    /// Deep copy mapping every node's data through `copy_info` exactly once.
    #[instrument(level = "debug", skip(self, copy_info))]
    pub fn copy_with<F>(&mut self, node: NodeId, mut copy_info: F) -> TreeResult<NodeId>
    where
        F: FnMut(&NodeData<T>) -> NodeData<T>,
    {
        let plan = self.plan_copy(node, &mut copy_info)?;
        debug!(node = %node, nodes = plan.len(), "copying subtree");
        self.materialize(node, plan)
    }

    /// Deep copies `node`'s subtree into a new, independent arena.
    #[instrument(level = "debug", skip(self))]
    pub fn extract(&self, node: NodeId) -> TreeResult<(Tree<T>, NodeId)>
    where
        T: Clone,
    {
        let plan = self.plan_copy(node, &mut |data: &NodeData<T>| data.clone())?;
        let mut target = Tree {
            arena: Arena::with_capacity(plan.len()),
            separator: self.separator.clone(),
            hooks: None,
        };
        let root = target.materialize(node, plan)?;
        Ok((target, root))
    }

    /// Single pre-order pass with an explicit stack. Each entry remembers
    /// where its parent sits in the plan, so no ancestry is recomputed later.
    fn plan_copy<F>(&self, node: NodeId, copy_info: &mut F) -> TreeResult<CopyPlan<T>>
    where
        F: FnMut(&NodeData<T>) -> NodeData<T>,
    {
        let mut plan = Vec::new();
        let mut stack = vec![(node, None)];
        while let Some((current, parent_pos)) = stack.pop() {
            let tree_node = self.get(current)?;
            let pos = plan.len();
            plan.push((parent_pos, copy_info(&tree_node.data)));
            // Push children in reverse order for left-to-right traversal
            for &child in tree_node.children.iter().rev() {
                stack.push((child, Some(pos)));
            }
        }
        Ok(plan)
    }

    fn materialize(&mut self, origin: NodeId, plan: CopyPlan<T>) -> TreeResult<NodeId> {
        let mut copies: Vec<NodeId> = Vec::with_capacity(plan.len());
        for (parent_pos, data) in plan {
            let parent = parent_pos.map(|pos| copies[pos]);
            let id = NodeId(self.arena.insert(TreeNode::new(data, parent)));
            if let Some(parent_id) = parent {
                self.get_mut(parent_id)?.children.push(id);
            }
            copies.push(id);
        }
        copies.first().copied().ok_or(TreeError::NodeNotFound(origin))
    }

    /// Starts a configurable walk below `node`.
    pub fn walk(&self, node: NodeId) -> TreeResult<Walk<'_, T>> {
        self.get(node)?;
        Ok(Walk::new(self, node))
    }

    /// Lazy traversal of `node`'s subtree in the given order.
    #[instrument(level = "trace", skip(self))]
    pub fn traverse(&self, node: NodeId, order: Order) -> TreeResult<Traverse<'_, T>> {
        Ok(self.walk(node)?.iter(order))
    }

    /// `node`, its parent, ..., up to the root.
    pub fn iter_path_reverse(&self, node: NodeId) -> TreeResult<PathReverse<'_, T>> {
        self.get(node)?;
        Ok(PathReverse {
            tree: self,
            next: Some(node),
        })
    }

    /// True if `ancestor` lies strictly above `node`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> TreeResult<bool> {
        Ok(self
            .iter_path_reverse(node)?
            .skip(1)
            .any(|id| id == ancestor))
    }

    pub fn root(&self, node: NodeId) -> TreeResult<NodeId> {
        Ok(self.iter_path_reverse(node)?.last().unwrap_or(node))
    }

    /// Root-first path ending in `node`.
    pub fn path(&self, node: NodeId) -> TreeResult<Vec<NodeId>> {
        let mut path: Vec<NodeId> = self.iter_path_reverse(node)?.collect();
        path.reverse();
        Ok(path)
    }

    /// Root-first path excluding `node`.
    pub fn ancestors(&self, node: NodeId) -> TreeResult<Vec<NodeId>> {
        let mut path = self.path(node)?;
        path.pop();
        Ok(path)
    }

    /// Names along the path joined by the separator, e.g. `/root/sub/leaf`.
    pub fn path_string(&self, node: NodeId) -> TreeResult<String> {
        let names = self
            .path(node)?
            .into_iter()
            .map(|id| self.name(id))
            .collect::<TreeResult<Vec<_>>>()?;
        Ok(format!("{}{}", self.separator, names.iter().join(&self.separator)))
    }

    /// All nodes below `node` in pre-order.
    pub fn descendants(&self, node: NodeId) -> TreeResult<Vec<NodeId>> {
        Ok(self
            .traverse(node, Order::PreOrder)?
            .skip(1)
            .map(|(id, _)| id)
            .collect())
    }

    pub fn siblings(&self, node: NodeId) -> TreeResult<Vec<NodeId>> {
        match self.get(node)?.parent {
            Some(parent) => Ok(self
                .children(parent)?
                .iter()
                .copied()
                .filter(|&id| id != node)
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    /// Leaves of `node`'s subtree in pre-order.
    pub fn leaves(&self, node: NodeId) -> TreeResult<Vec<NodeId>> {
        Ok(self
            .walk(node)?
            .filter(|n| n.is_leaf())
            .pre_order()
            .map(|(id, _)| id)
            .collect())
    }

    pub fn is_leaf(&self, node: NodeId) -> TreeResult<bool> {
        Ok(self.get(node)?.is_leaf())
    }

    pub fn is_root(&self, node: NodeId) -> TreeResult<bool> {
        Ok(self.get(node)?.is_root())
    }

    /// Edges on the longest downward path; 0 for a leaf.
    #[instrument(level = "debug", skip(self))]
    pub fn height(&self, node: NodeId) -> TreeResult<usize> {
        Ok(self.walk(node)?.level_order_group().count().saturating_sub(1))
    }

    /// Edges between `node` and its root; 0 for a root.
    pub fn depth(&self, node: NodeId) -> TreeResult<usize> {
        Ok(self.iter_path_reverse(node)?.count() - 1)
    }

    /// Index of `node` within its parent's children.
    pub fn position(&self, node: NodeId) -> TreeResult<Option<usize>> {
        match self.get(node)?.parent {
            Some(parent) => Ok(self.children(parent)?.iter().position(|&c| c == node)),
            None => Ok(None),
        }
    }
}

/// Walks parent links from a node up to its root.
pub struct PathReverse<'a, T> {
    tree: &'a Tree<T>,
    next: Option<NodeId>,
}

impl<T> Iterator for PathReverse<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.get_node(current).and_then(|n| n.parent);
        Some(current)
    }
}
