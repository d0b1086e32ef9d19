use std::collections::HashMap;
use termtree::Tree as TextTree;
use tracing::instrument;

use crate::arena::{NodeData, NodeId, Tree};
use crate::errors::TreeResult;
use crate::traverse::Order;

/// Converts a subtree into a printable `termtree` tree.
pub trait TreeNodeConvert<T> {
    /// Subtree of `node` labelled with node names.
    fn to_tree_string(&self, node: NodeId) -> TreeResult<TextTree<String>> {
        self.to_tree_string_with(node, |data| data.name.clone())
    }

    fn to_tree_string_with<F>(&self, node: NodeId, label: F) -> TreeResult<TextTree<String>>
    where
        F: Fn(&NodeData<T>) -> String;
}

impl<T> TreeNodeConvert<T> for Tree<T> {
    /// Built bottom-up from a post-order pass: by the time a node is visited
    /// all of its children have been rendered.
    #[instrument(level = "debug", skip(self, label))]
    fn to_tree_string_with<F>(&self, node: NodeId, label: F) -> TreeResult<TextTree<String>>
    where
        F: Fn(&NodeData<T>) -> String,
    {
        let mut rendered: HashMap<NodeId, TextTree<String>> = HashMap::new();
        for (id, tree_node) in self.traverse(node, Order::PostOrder)? {
            let leaves: Vec<_> = tree_node
                .children()
                .iter()
                .filter_map(|child| rendered.remove(child))
                .collect();
            rendered.insert(id, TextTree::new(label(&tree_node.data)).with_leaves(leaves));
        }
        Ok(rendered
            .remove(&node)
            .unwrap_or_else(|| TextTree::new("Empty tree".to_string())))
    }
}
