use super::{NodeId, Tree};

mod projection;
mod radial;

pub use projection::{to_cartesian, EdgeSegment, Point, Projection, TipLabel};

/// Branch length assumed when the tree file leaves a branch unlabelled.
pub const DEFAULT_BRANCH_LENGTH: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub default_branch_length: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_branch_length: DEFAULT_BRANCH_LENGTH,
        }
    }
}

/// Position of a node in polar coordinates around the root.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PolarCoord {
    pub radius: f64,
    /// Radians in `[0, 2π)`.
    pub angle: f64,
}

impl PolarCoord {
    pub fn to_cartesian(self) -> Point {
        to_cartesian(self.radius, self.angle)
    }
}

/// Polar coordinates for every node of a tree, indexed by [`NodeId`].
#[derive(Debug, Clone, PartialEq)]
pub struct RadialLayout {
    pub coords: Vec<PolarCoord>,
    pub tip_count: usize,
}

impl RadialLayout {
    /// Build a radial layout for the provided tree.
    pub fn compute(tree: &Tree, config: &LayoutConfig) -> Self {
        radial::build(tree, config)
    }

    pub fn coord(&self, id: NodeId) -> Option<PolarCoord> {
        self.coords.get(id).copied()
    }

    pub fn max_radius(&self) -> f64 {
        self.coords
            .iter()
            .map(|coord| coord.radius)
            .fold(0.0f64, f64::max)
    }

    /// Cartesian edge and tip-label lists for the renderer.
    pub fn project(&self, tree: &Tree) -> Projection {
        projection::build(tree, self)
    }
}
