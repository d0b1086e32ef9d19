//! Lazy traversals over a [`Tree`] subtree.
//!
//! All iterators use an explicit stack or queue. Each call builds a fresh
//! iterator, so traversals can be restarted at will. Walk rules:
//! - `filter`: a rejected node is not yielded, but its children are still visited
//! - `stop`: a stopped node is neither yielded nor descended into
//! - `max_level`: the start node is level 1; deeper nodes are not visited

use std::collections::VecDeque;
use tracing::{instrument, trace};

use crate::arena::{NodeId, Tree, TreeNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    /// Node before its children
    PreOrder,
    /// Children before their node
    PostOrder,
    /// Breadth-first
    LevelOrder,
}

type Predicate<'a, T> = Box<dyn Fn(&TreeNode<T>) -> bool + 'a>;

struct WalkRules<'a, T> {
    filter: Option<Predicate<'a, T>>,
    stop: Option<Predicate<'a, T>>,
    max_level: Option<usize>,
}

impl<T> WalkRules<'_, T> {
    fn accepts(&self, node: &TreeNode<T>) -> bool {
        self.filter.as_ref().map_or(true, |f| f(node))
    }

    fn stopped(&self, node: &TreeNode<T>) -> bool {
        self.stop.as_ref().map_or(false, |f| f(node))
    }

    fn beyond(&self, level: usize) -> bool {
        self.max_level.is_some_and(|max| level > max)
    }
}

/// Traversal builder returned by [`Tree::walk`].
pub struct Walk<'a, T> {
    tree: &'a Tree<T>,
    start: NodeId,
    rules: WalkRules<'a, T>,
}

impl<'a, T> Walk<'a, T> {
    pub(crate) fn new(tree: &'a Tree<T>, start: NodeId) -> Self {
        Self {
            tree,
            start,
            rules: WalkRules {
                filter: None,
                stop: None,
                max_level: None,
            },
        }
    }

    /// Only yield nodes for which `f` returns true.
    pub fn filter(mut self, f: impl Fn(&TreeNode<T>) -> bool + 'a) -> Self {
        self.rules.filter = Some(Box::new(f));
        self
    }

    /// Prune nodes (and their subtrees) for which `f` returns true.
    pub fn stop(mut self, f: impl Fn(&TreeNode<T>) -> bool + 'a) -> Self {
        self.rules.stop = Some(Box::new(f));
        self
    }

    pub fn max_level(mut self, level: usize) -> Self {
        self.rules.max_level = Some(level);
        self
    }

    /// Start node with level 1, unless it is pruned by the rules.
    fn seed(&self) -> Option<(NodeId, usize)> {
        if self.rules.beyond(1) {
            return None;
        }
        let node = self.tree.get_node(self.start)?;
        (!self.rules.stopped(node)).then_some((self.start, 1))
    }

    pub fn pre_order(self) -> PreOrderIter<'a, T> {
        let stack = self.seed().into_iter().collect();
        PreOrderIter {
            tree: self.tree,
            rules: self.rules,
            stack,
        }
    }

    pub fn post_order(self) -> PostOrderIter<'a, T> {
        let stack = self.seed().map(|(id, level)| (id, level, false)).into_iter().collect();
        PostOrderIter {
            tree: self.tree,
            rules: self.rules,
            stack,
        }
    }

    pub fn level_order(self) -> LevelOrderIter<'a, T> {
        let queue = self.seed().into_iter().collect();
        LevelOrderIter {
            tree: self.tree,
            rules: self.rules,
            queue,
        }
    }

    /// One `Vec` of node handles per level.
    pub fn level_order_group(self) -> LevelOrderGroupIter<'a, T> {
        let current = self.seed().map(|(id, _)| id).into_iter().collect();
        LevelOrderGroupIter {
            tree: self.tree,
            rules: self.rules,
            current,
            level: 1,
        }
    }

    /// Like [`Walk::level_order_group`], with every second level reversed.
    pub fn zigzag_group(self) -> ZigZagGroupIter<'a, T> {
        ZigZagGroupIter {
            inner: self.level_order_group(),
            reverse: false,
        }
    }

    pub fn iter(self, order: Order) -> Traverse<'a, T> {
        match order {
            Order::PreOrder => Traverse::PreOrder(self.pre_order()),
            Order::PostOrder => Traverse::PostOrder(self.post_order()),
            Order::LevelOrder => Traverse::LevelOrder(self.level_order()),
        }
    }
}

/// Children of `node` that survive the stop rule, in order, if `level` is
/// still allowed.
fn admitted_children<T>(
    tree: &Tree<T>,
    rules: &WalkRules<'_, T>,
    node: &TreeNode<T>,
    level: usize,
) -> Vec<NodeId> {
    if rules.beyond(level) {
        return Vec::new();
    }
    node.children()
        .iter()
        .copied()
        .filter(|&child| tree.get_node(child).is_some_and(|n| !rules.stopped(n)))
        .collect()
}

pub struct PreOrderIter<'a, T> {
    tree: &'a Tree<T>,
    rules: WalkRules<'a, T>,
    stack: Vec<(NodeId, usize)>,
}

impl<'a, T> Iterator for PreOrderIter<'a, T> {
    type Item = (NodeId, &'a TreeNode<T>);

    #[instrument(level = "trace", skip(self))]
    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, level)) = self.stack.pop() {
            let Some(node) = self.tree.get_node(current) else {
                continue;
            };
            // Push children in reverse order for left-to-right traversal
            for child in admitted_children(self.tree, &self.rules, node, level + 1).into_iter().rev() {
                self.stack.push((child, level + 1));
            }
            if self.rules.accepts(node) {
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIter<'a, T> {
    tree: &'a Tree<T>,
    rules: WalkRules<'a, T>,
    stack: Vec<(NodeId, usize, bool)>,
}

impl<'a, T> Iterator for PostOrderIter<'a, T> {
    type Item = (NodeId, &'a TreeNode<T>);

    #[instrument(level = "trace", skip(self))]
    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, level, visited)) = self.stack.pop() {
            let Some(node) = self.tree.get_node(current) else {
                continue;
            };
            if visited {
                if self.rules.accepts(node) {
                    return Some((current, node));
                }
                continue;
            }
            self.stack.push((current, level, true));
            for child in admitted_children(self.tree, &self.rules, node, level + 1).into_iter().rev() {
                self.stack.push((child, level + 1, false));
            }
        }
        None
    }
}

pub struct LevelOrderIter<'a, T> {
    tree: &'a Tree<T>,
    rules: WalkRules<'a, T>,
    queue: VecDeque<(NodeId, usize)>,
}

impl<'a, T> Iterator for LevelOrderIter<'a, T> {
    type Item = (NodeId, &'a TreeNode<T>);

    #[instrument(level = "trace", skip(self))]
    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, level)) = self.queue.pop_front() {
            let Some(node) = self.tree.get_node(current) else {
                continue;
            };
            for child in admitted_children(self.tree, &self.rules, node, level + 1) {
                self.queue.push_back((child, level + 1));
            }
            if self.rules.accepts(node) {
                return Some((current, node));
            }
        }
        None
    }
}

/// Yields the filtered nodes of each level. A level whose nodes are all
/// filtered out still yields an empty `Vec` as long as deeper levels exist.
pub struct LevelOrderGroupIter<'a, T> {
    tree: &'a Tree<T>,
    rules: WalkRules<'a, T>,
    current: Vec<NodeId>,
    level: usize,
}

impl<T> Iterator for LevelOrderGroupIter<'_, T> {
    type Item = Vec<NodeId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_empty() {
            return None;
        }
        let level_nodes = std::mem::take(&mut self.current);
        let group: Vec<NodeId> = level_nodes
            .iter()
            .copied()
            .filter(|&id| self.tree.get_node(id).is_some_and(|n| self.rules.accepts(n)))
            .collect();

        self.level += 1;
        for id in level_nodes {
            if let Some(node) = self.tree.get_node(id) {
                self.current
                    .extend(admitted_children(self.tree, &self.rules, node, self.level));
            }
        }
        trace!(level = self.level - 1, size = group.len(), "level group");
        Some(group)
    }
}

pub struct ZigZagGroupIter<'a, T> {
    inner: LevelOrderGroupIter<'a, T>,
    reverse: bool,
}

impl<T> Iterator for ZigZagGroupIter<'_, T> {
    type Item = Vec<NodeId>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut group = self.inner.next()?;
        if self.reverse {
            group.reverse();
        }
        self.reverse = !self.reverse;
        Some(group)
    }
}

/// Iterator for a runtime-selected [`Order`].
pub enum Traverse<'a, T> {
    PreOrder(PreOrderIter<'a, T>),
    PostOrder(PostOrderIter<'a, T>),
    LevelOrder(LevelOrderIter<'a, T>),
}

impl<'a, T> Iterator for Traverse<'a, T> {
    type Item = (NodeId, &'a TreeNode<T>);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Traverse::PreOrder(it) => it.next(),
            Traverse::PostOrder(it) => it.next(),
            Traverse::LevelOrder(it) => it.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Attributes;

    // f
    // |-- b
    // |   |-- a
    // |   +-- d
    // |       |-- c
    // |       +-- e
    // +-- g
    //     +-- i
    //         +-- h
    fn letters() -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let f = tree.create("f", Attributes::new(), None).unwrap();
        let b = tree.create("b", Attributes::new(), Some(f)).unwrap();
        tree.create("a", Attributes::new(), Some(b)).unwrap();
        let d = tree.create("d", Attributes::new(), Some(b)).unwrap();
        tree.create("c", Attributes::new(), Some(d)).unwrap();
        tree.create("e", Attributes::new(), Some(d)).unwrap();
        let g = tree.create("g", Attributes::new(), Some(f)).unwrap();
        let i = tree.create("i", Attributes::new(), Some(g)).unwrap();
        tree.create("h", Attributes::new(), Some(i)).unwrap();
        (tree, f)
    }

    fn names<'a>(it: impl Iterator<Item = (NodeId, &'a TreeNode)>) -> String {
        it.map(|(_, n)| n.data.name.as_str()).collect()
    }

    fn group_names(tree: &Tree, groups: impl Iterator<Item = Vec<NodeId>>) -> Vec<String> {
        groups
            .map(|g| g.iter().map(|&id| tree.name(id).unwrap()).collect())
            .collect()
    }

    #[test]
    fn test_orders() {
        let (tree, f) = letters();
        assert_eq!(names(tree.traverse(f, Order::PreOrder).unwrap()), "fbadcegih");
        assert_eq!(names(tree.traverse(f, Order::PostOrder).unwrap()), "acedbhigf");
        assert_eq!(names(tree.traverse(f, Order::LevelOrder).unwrap()), "fbgadiceh");
    }

    #[test]
    fn test_rules() {
        let (tree, f) = letters();
        let it = tree.walk(f).unwrap().max_level(3).pre_order();
        assert_eq!(names(it), "fbadgi");
        let it = tree
            .walk(f)
            .unwrap()
            .filter(|n| !["e", "g"].contains(&n.data.name.as_str()))
            .pre_order();
        assert_eq!(names(it), "fbadcih");
        let it = tree.walk(f).unwrap().stop(|n| n.data.name == "d").post_order();
        assert_eq!(names(it), "abhigf");
    }

    #[test]
    fn test_zigzag() {
        let (tree, f) = letters();
        let groups = group_names(&tree, tree.walk(f).unwrap().zigzag_group());
        assert_eq!(groups, vec!["f", "gb", "adi", "hec"]);
        let groups = group_names(&tree, tree.walk(f).unwrap().max_level(3).zigzag_group());
        assert_eq!(groups, vec!["f", "gb", "adi"]);
        let groups = group_names(&tree, tree.walk(f).unwrap().stop(|n| n.data.name == "d").zigzag_group());
        assert_eq!(groups, vec!["f", "gb", "ai", "h"]);
    }

    #[test]
    fn test_restartable() {
        let (tree, f) = letters();
        let first: Vec<_> = tree.traverse(f, Order::LevelOrder).unwrap().map(|(id, _)| id).collect();
        let second: Vec<_> = tree.traverse(f, Order::LevelOrder).unwrap().map(|(id, _)| id).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 9);
    }
}
