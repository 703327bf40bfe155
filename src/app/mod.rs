use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use log::info;

use lifetree::export::{export_svg, RenderConfig};
use lifetree::life_list::LifeList;
use lifetree::session::{LifeTreeSession, ViewOptions};
use lifetree::tree::layout::{LayoutConfig, DEFAULT_BRANCH_LENGTH};
use lifetree::tree::prune::{PruneOptions, SingleChildPolicy};

use crate::ui;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "lifetree",
    about = "Prune a reference phylogeny to your life list and lay it out radially."
)]
pub struct AppConfig {
    /// Reference tree file (Newick or Nexus formats).
    #[arg(value_name = "TREE_FILE")]
    pub tree_path: PathBuf,

    /// eBird-style CSV export whose "Scientific Name" column forms the life list.
    #[arg(long, value_name = "CSV")]
    pub observations: Option<PathBuf>,

    /// Extra taxon to include in the life list (repeatable).
    #[arg(long = "taxon", value_name = "NAME")]
    pub taxa: Vec<String>,

    /// Write the dendrogram as SVG to this path.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Canvas height in pixels
    #[arg(long, default_value_t = 1200)]
    pub height: u32,

    /// Blank border kept around the drawing, in pixels
    #[arg(long, default_value_t = 50.0)]
    pub margin: f64,

    /// Tip label font size
    #[arg(long, default_value_t = 10.0)]
    pub font_size: f64,

    /// Branch length assumed where the tree file gives none
    #[arg(long, default_value_t = DEFAULT_BRANCH_LENGTH)]
    pub default_branch_length: f64,

    /// Splice out internal nodes left with a single child after pruning.
    #[arg(long)]
    pub collapse_single_child: bool,
}

impl AppConfig {
    pub fn view_options(&self) -> ViewOptions {
        let single_child = if self.collapse_single_child {
            SingleChildPolicy::Collapse
        } else {
            SingleChildPolicy::Retain
        };
        ViewOptions {
            prune: PruneOptions {
                single_child,
                default_branch_length: self.default_branch_length,
            },
            layout: LayoutConfig {
                default_branch_length: self.default_branch_length,
            },
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            width: f64::from(self.width),
            height: f64::from(self.height),
            margin: self.margin,
            font_size: self.font_size,
        }
    }
}

pub struct LifeTreeApp;

impl LifeTreeApp {
    pub fn run(config: &AppConfig) -> Result<()> {
        if config.observations.is_none() && config.taxa.is_empty() {
            bail!("no life list given: pass --observations CSV and/or --taxon NAME");
        }
        if config.default_branch_length < 0.0 {
            bail!(
                "default branch length must be non-negative, got {}",
                config.default_branch_length
            );
        }

        let mut session = LifeTreeSession::new(config.view_options());

        let mut names: Vec<String> = config.taxa.clone();
        if let Some(path) = &config.observations {
            let records = session.observations(path)?;
            info!("{} countable observations in {}", records.len(), path.display());
            names.extend(records.iter().map(|record| record.scientific_name.clone()));
        }
        let life_list = LifeList::from_names(&names);

        let view = session.view(&config.tree_path, &life_list)?;
        ui::render_summary(&view, &life_list, config);

        if let Some(dest) = &config.output {
            export_svg(&view.projection, &config.render_config(), dest)?;
            info!("Wrote {}", dest.display());
        }

        Ok(())
    }
}
