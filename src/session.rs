use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::error::{ParseError, ParseResult};
use crate::io;
use crate::life_list::{clean_observations, read_observations, LifeList, Observation};
use crate::tree::layout::{LayoutConfig, Projection, RadialLayout};
use crate::tree::prune::{prune_with, PruneOptions};
use crate::tree::Tree;

/// Non-fatal conditions met while building a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Nothing to keep; the view is a lone root.
    EmptyLifeList,
    /// Life-list entries with no tip in the reference tree.
    UnmatchedTaxa { count: usize, names: Vec<String> },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::EmptyLifeList => write!(f, "life list is empty"),
            Warning::UnmatchedTaxa { count, .. } => {
                write!(f, "{count} life-list taxa have no tip in the reference tree")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewOptions {
    pub prune: PruneOptions,
    pub layout: LayoutConfig,
}

/// Result of one pruning and layout pass.
#[derive(Debug, Clone)]
pub struct LifeTreeView {
    pub tree: Tree,
    pub layout: RadialLayout,
    pub projection: Projection,
    pub warnings: Vec<Warning>,
}

impl LifeTreeView {
    pub fn unmatched_count(&self) -> usize {
        self.warnings
            .iter()
            .map(|warning| match warning {
                Warning::UnmatchedTaxa { count, .. } => *count,
                Warning::EmptyLifeList => 0,
            })
            .sum()
    }
}

/// Prune `reference` to `life_list`, lay it out and project it.
pub fn build_view(reference: &Tree, life_list: &LifeList, options: &ViewOptions) -> LifeTreeView {
    let mut warnings = Vec::new();

    if life_list.is_empty() {
        warn!("life list is empty; rendering a bare root");
        warnings.push(Warning::EmptyLifeList);
    } else {
        let report = life_list.match_tree(reference);
        if !report.unmatched.is_empty() {
            warn!(
                "{} of {} life-list taxa are missing from the reference tree",
                report.unmatched.len(),
                life_list.len()
            );
            debug!("unmatched taxa: {:?}", report.unmatched);
            warnings.push(Warning::UnmatchedTaxa {
                count: report.unmatched.len(),
                names: report.unmatched,
            });
        }
    }

    let tree = prune_with(reference, life_list, &options.prune);
    let layout = RadialLayout::compute(&tree, &options.layout);
    let projection = layout.project(&tree);

    LifeTreeView {
        tree,
        layout,
        projection,
        warnings,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

impl Fingerprint {
    fn of(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

#[derive(Debug)]
struct Cached<T> {
    path: PathBuf,
    fingerprint: Fingerprint,
    value: Arc<T>,
}

impl<T> Cached<T> {
    fn get(slot: &Option<Self>, path: &Path, fingerprint: Fingerprint) -> Option<Arc<T>> {
        slot.as_ref()
            .filter(|cached| cached.path == path && cached.fingerprint == fingerprint)
            .map(|cached| Arc::clone(&cached.value))
    }
}

/// Holds the parsed reference tree and cleaned observations between passes,
/// reloading either only when its source file changes.
#[derive(Debug, Default)]
pub struct LifeTreeSession {
    pub options: ViewOptions,
    tree: Option<Cached<Tree>>,
    observations: Option<Cached<Vec<Observation>>>,
}

impl LifeTreeSession {
    pub fn new(options: ViewOptions) -> Self {
        Self {
            options,
            tree: None,
            observations: None,
        }
    }

    pub fn reference_tree(&mut self, path: &Path) -> ParseResult<Arc<Tree>> {
        let fingerprint = Fingerprint::of(path).map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(tree) = Cached::get(&self.tree, path, fingerprint) {
            debug!("reusing cached tree for {}", path.display());
            return Ok(tree);
        }

        self.tree = None;
        let tree = Arc::new(io::load_tree(path)?);
        info!(
            "cached reference tree {} ({} tips)",
            path.display(),
            tree.leaf_count()
        );
        self.tree = Some(Cached {
            path: path.to_path_buf(),
            fingerprint,
            value: Arc::clone(&tree),
        });
        Ok(tree)
    }

    /// Cleaned observation rows from a CSV export.
    pub fn observations(&mut self, path: &Path) -> Result<Arc<Vec<Observation>>> {
        let fingerprint = Fingerprint::of(path)
            .with_context(|| format!("failed to read observation file: {}", path.display()))?;
        if let Some(records) = Cached::get(&self.observations, path, fingerprint) {
            debug!("reusing cached observations for {}", path.display());
            return Ok(records);
        }

        self.observations = None;
        let records = Arc::new(clean_observations(read_observations(path)?));
        self.observations = Some(Cached {
            path: path.to_path_buf(),
            fingerprint,
            value: Arc::clone(&records),
        });
        Ok(records)
    }

    pub fn view(&mut self, tree_path: &Path, life_list: &LifeList) -> ParseResult<LifeTreeView> {
        let reference = self.reference_tree(tree_path)?;
        Ok(build_view(&reference, life_list, &self.options))
    }

    pub fn has_cached_tree(&self) -> bool {
        self.tree.is_some()
    }

    pub fn has_cached_observations(&self) -> bool {
        self.observations.is_some()
    }
}
