use super::{NodeId, RadialLayout, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Map a polar coordinate onto the plane, root at the origin.
pub fn to_cartesian(radius: f64, angle: f64) -> Point {
    Point {
        x: radius * angle.cos(),
        y: radius * angle.sin(),
    }
}

/// Straight branch from a parent to one of its children.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSegment {
    pub parent: NodeId,
    pub child: NodeId,
    pub from: Point,
    pub to: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TipLabel {
    pub node: NodeId,
    pub position: Point,
    pub text: String,
}

/// Everything a renderer needs to draw the dendrogram.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    pub edges: Vec<EdgeSegment>,
    pub labels: Vec<TipLabel>,
}

impl Projection {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.labels.is_empty()
    }

    /// Largest distance from the origin over all edge endpoints and labels.
    pub fn extent(&self) -> f64 {
        self.edges
            .iter()
            .flat_map(|edge| [edge.from, edge.to])
            .chain(self.labels.iter().map(|label| label.position))
            .map(|point| point.x.hypot(point.y))
            .filter(|value| value.is_finite())
            .fold(0.0f64, f64::max)
    }
}

pub(super) fn build(tree: &Tree, layout: &RadialLayout) -> Projection {
    let points: Vec<Point> = layout.coords.iter().map(|coord| coord.to_cartesian()).collect();

    let edges = tree
        .edges()
        .into_iter()
        .map(|(parent, child)| EdgeSegment {
            parent,
            child,
            from: points[parent],
            to: points[child],
        })
        .collect();

    let labels = tree
        .tips()
        .into_iter()
        .filter(|&tip| tip != tree.root)
        .filter_map(|tip| {
            tree.nodes[tip].name.as_ref().map(|name| TipLabel {
                node: tip,
                position: points[tip],
                text: display_name(name),
            })
        })
        .collect();

    Projection { edges, labels }
}

/// Tip names use underscores for spaces; labels show the spaces.
fn display_name(name: &str) -> String {
    name.replace('_', " ")
}
