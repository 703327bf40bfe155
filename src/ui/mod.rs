use lifetree::life_list::LifeList;
use lifetree::session::{LifeTreeView, Warning};

use crate::app::AppConfig;

const PREVIEW_TIPS: usize = 5;

pub fn render_summary(view: &LifeTreeView, life_list: &LifeList, config: &AppConfig) {
    println!(
        "Life list of {} taxa against {}.",
        life_list.len(),
        config.tree_path.display()
    );
    println!(
        "Pruned tree: {} node(s), {} tip(s), {} edge(s), max radius {:.3}.",
        view.tree.len(),
        view.projection.labels.len(),
        view.projection.edges.len(),
        view.layout.max_radius()
    );

    for label in view.projection.labels.iter().take(PREVIEW_TIPS) {
        println!("- {} at ({:.3}, {:.3})", label.text, label.position.x, label.position.y);
    }
    if view.projection.labels.len() > PREVIEW_TIPS {
        println!(
            "... ({} more tip(s) omitted)",
            view.projection.labels.len() - PREVIEW_TIPS
        );
    }

    for warning in &view.warnings {
        println!("warning: {warning}");
        if let Warning::UnmatchedTaxa { names, .. } = warning {
            for name in names.iter().take(PREVIEW_TIPS) {
                println!("  unmatched: {name}");
            }
        }
    }
}
