//! Prune a reference phylogeny down to a birder's life list and lay the
//! remaining subtree out as a radial dendrogram.
//!
//! The pipeline runs tree file → [`io::load_tree`] → [`tree::prune::prune`] →
//! [`tree::layout::RadialLayout::compute`] → [`tree::layout::RadialLayout::project`]
//! → an [`export::Renderer`]. [`session::LifeTreeSession`] ties the stages together
//! and caches parsed inputs between passes.

pub mod error;
pub mod export;
pub mod io;
pub mod life_list;
pub mod session;
pub mod tree;

pub use error::{ParseError, ParseResult};
