use log::debug;

use super::layout::DEFAULT_BRANCH_LENGTH;
use super::{NodeId, Tree, TreeNode};
use crate::life_list::LifeList;

/// What to do with an internal node left with a single child after pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SingleChildPolicy {
    /// Keep the node and its branch as they are.
    #[default]
    Retain,
    /// Splice the node out, adding its branch length onto its only child.
    Collapse,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneOptions {
    pub single_child: SingleChildPolicy,
    /// Length used for a missing branch when collapsing merges two branches.
    pub default_branch_length: f64,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            single_child: SingleChildPolicy::Retain,
            default_branch_length: DEFAULT_BRANCH_LENGTH,
        }
    }
}

/// Prune `tree` down to the tips named in `keep`, retaining single-child nodes.
pub fn prune(tree: &Tree, keep: &LifeList) -> Tree {
    prune_with(tree, keep, &PruneOptions::default())
}

/// Prune `tree` into a fresh arena holding only the tips named in `keep` and their
/// ancestors. The root always survives, even when nothing else does.
pub fn prune_with(tree: &Tree, keep: &LifeList, options: &PruneOptions) -> Tree {
    let survives = surviving_nodes(tree, keep);

    let mut nodes: Vec<TreeNode> = Vec::with_capacity(survives.iter().filter(|s| **s).count());
    // (source node, parent in the new arena, length carried over from collapsed ancestors)
    let mut stack: Vec<(NodeId, Option<NodeId>, Option<f64>)> = vec![(tree.root, None, None)];

    while let Some((source_id, new_parent, carried)) = stack.pop() {
        let source = &tree.nodes[source_id];
        let kept_children: Vec<NodeId> = source
            .children
            .iter()
            .copied()
            .filter(|&child| survives[child])
            .collect();

        let collapse = options.single_child == SingleChildPolicy::Collapse
            && new_parent.is_some()
            && kept_children.len() == 1;

        if collapse {
            let length = carried.unwrap_or(0.0) + source.branch_length(options.default_branch_length);
            stack.push((kept_children[0], new_parent, Some(length)));
            continue;
        }

        let new_id = nodes.len();
        let length = match carried {
            Some(extra) => Some(extra + source.branch_length(options.default_branch_length)),
            None => source.length,
        };
        let mut node = TreeNode::new(new_id, source.name.clone(), length);
        node.parent = new_parent;
        nodes.push(node);

        if let Some(parent_id) = new_parent {
            nodes[parent_id].children.push(new_id);
        }

        for &child in kept_children.iter().rev() {
            stack.push((child, Some(new_id), None));
        }
    }

    debug!(
        "pruned tree {}: {} -> {} nodes ({} tips kept)",
        tree.id,
        tree.nodes.len(),
        nodes.len(),
        nodes.iter().filter(|n| n.is_leaf() && n.parent.is_some()).count()
    );

    Tree {
        id: tree.id,
        label: tree.label.clone(),
        root: 0,
        nodes,
    }
}

/// Post-order marking: a tip survives when listed, an internal node when any child does.
fn surviving_nodes(tree: &Tree, keep: &LifeList) -> Vec<bool> {
    let mut survives = vec![false; tree.nodes.len()];
    for node_id in tree.postorder() {
        let node = &tree.nodes[node_id];
        survives[node_id] = if node.is_leaf() {
            node.name.as_deref().is_some_and(|name| keep.contains(name))
        } else {
            node.children.iter().any(|&child| survives[child])
        };
    }
    survives[tree.root] = true;
    survives
}
