use phylotree::tree::{Node as PhyloNode, Tree as PhyloTree};

use crate::error::{ParseError, ParseResult};

pub mod layout;
pub mod prune;

pub type NodeId = usize;

/// Representation of a phylogenetic tree as an arena of nodes addressed by index.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub id: usize,
    pub label: Option<String>,
    pub root: NodeId,
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    /// A tree made of a single (childless) root.
    pub fn single(id: usize, label: Option<String>) -> Self {
        Self {
            id,
            label,
            root: 0,
            nodes: vec![TreeNode::new(0, None, None)],
        }
    }

    pub fn from_phylo(id: usize, label: Option<String>, phylo: &PhyloTree) -> ParseResult<Self> {
        let root = phylo.get_root().map_err(|_| ParseError::NoRoot)?;
        let mut nodes = Vec::with_capacity(phylo.size());
        for idx in 0..phylo.size() {
            match phylo.get(&idx) {
                Ok(node) => nodes.push(TreeNode::from_phylo(node)),
                Err(_) => nodes.push(TreeNode::new(idx, None, None)),
            }
        }
        if root >= nodes.len() {
            return Err(ParseError::NoRoot);
        }
        Ok(Self {
            id,
            label,
            root,
            nodes,
        })
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn root_node(&self) -> &TreeNode {
        &self.nodes[self.root]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes reachable from the root, parents before children, siblings left to right.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(node_id) = stack.pop() {
            order.push(node_id);
            stack.extend(self.nodes[node_id].children.iter().rev().copied());
        }
        order
    }

    /// Nodes reachable from the root, children before parents, siblings left to right.
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(node_id) = stack.pop() {
            order.push(node_id);
            stack.extend(self.nodes[node_id].children.iter().copied());
        }
        order.reverse();
        order
    }

    /// Tips in depth-first, left-to-right enumeration order.
    pub fn tips(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|&id| self.nodes[id].is_leaf())
            .collect()
    }

    pub fn leaf_count(&self) -> usize {
        self.tips().len()
    }

    /// Names of the tips, in enumeration order.
    pub fn tip_names(&self) -> Vec<&str> {
        self.tips()
            .into_iter()
            .filter_map(|id| self.nodes[id].name.as_deref())
            .collect()
    }

    /// Edges (parent, child), ordered by the pre-order position of the child.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.preorder()
            .into_iter()
            .skip(1)
            .filter_map(|child| self.nodes[child].parent.map(|parent| (parent, child)))
            .collect()
    }

    /// Cumulative branch length from the root to every node; the root sits at 0.
    pub fn distances_from_root(&self, default_branch_length: f64) -> Vec<f64> {
        let mut distances = vec![0.0; self.nodes.len()];
        let mut stack = vec![(self.root, 0.0f64)];
        while let Some((node_id, current_distance)) = stack.pop() {
            distances[node_id] = current_distance;
            for &child_id in &self.nodes[node_id].children {
                let branch_length = self.nodes[child_id].branch_length(default_branch_length);
                stack.push((child_id, current_distance + branch_length));
            }
        }
        distances
    }

    /// Replace every tip name through `rename`; internal labels are left alone.
    pub fn rename_tips<F>(&mut self, mut rename: F) -> ParseResult<()>
    where
        F: FnMut(&str) -> ParseResult<String>,
    {
        for node in self.nodes.iter_mut().filter(|node| node.is_leaf()) {
            if let Some(name) = node.name.take() {
                node.name = Some(rename(&name)?);
            }
        }
        Ok(())
    }
}

/// Node within a phylogenetic tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: NodeId,
    pub name: Option<String>,
    pub length: Option<f64>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl TreeNode {
    pub fn new(id: NodeId, name: Option<String>, length: Option<f64>) -> Self {
        Self {
            id,
            name,
            length,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Branch length to the parent, falling back to `default` when the file gave none.
    pub fn branch_length(&self, default: f64) -> f64 {
        self.length.unwrap_or(default)
    }

    pub(crate) fn from_phylo(node: &PhyloNode) -> Self {
        let name = node.name.clone().filter(|name| !name.trim().is_empty());
        let mut tree_node = TreeNode::new(node.id, name, node.parent_edge);
        tree_node.parent = node.parent;
        tree_node.children = node.children.clone();
        tree_node
    }
}

/// Container for the full contents of an imported file.
#[derive(Debug, Clone)]
pub struct TreeBundle {
    pub format: TreeFileFormat,
    pub trees: Vec<Tree>,
}

impl TreeBundle {
    pub fn new(format: TreeFileFormat, trees: Vec<Tree>) -> Self {
        Self { format, trees }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TreeFileFormat {
    Newick,
    Nexus,
}
