use std::f64::consts::TAU;

use super::{LayoutConfig, PolarCoord, RadialLayout, Tree};

pub(super) fn build(tree: &Tree, config: &LayoutConfig) -> RadialLayout {
    let node_count = tree.nodes.len();
    let mut coords = vec![PolarCoord::default(); node_count];

    let radii = tree.distances_from_root(config.default_branch_length);
    for (coord, radius) in coords.iter_mut().zip(radii) {
        coord.radius = radius;
    }

    let tips = tree.tips();
    let tip_count = tips.len();
    assign_tip_angles(&tips, &mut coords);
    assign_internal_angles(tree, &mut coords);

    RadialLayout { coords, tip_count }
}

/// The i-th tip goes to `i * 2π / n`.
fn assign_tip_angles(tips: &[usize], coords: &mut [PolarCoord]) {
    let step = TAU / tips.len().max(1) as f64;
    for (index, &tip) in tips.iter().enumerate() {
        coords[tip].angle = index as f64 * step;
    }
}

/// Bottom-up: each internal node sits at the mean angle of its children.
fn assign_internal_angles(tree: &Tree, coords: &mut [PolarCoord]) {
    for node_id in tree.postorder() {
        let children = &tree.nodes[node_id].children;
        if children.is_empty() {
            continue;
        }
        let sum: f64 = children.iter().map(|&child| coords[child].angle).sum();
        coords[node_id].angle = sum / children.len() as f64;
    }
}
