use anyhow::Result;

use crate::tree::layout::Projection;

mod svg;

pub use self::svg::{export_svg, SvgRenderer};

/// Canvas settings handed to a renderer; none of this is derived from the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub font_size: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 1200.0,
            margin: 50.0,
            font_size: 10.0,
        }
    }
}

/// Turns edge and tip-label lists into something drawable.
pub trait Renderer {
    type Output;

    fn render(&self, projection: &Projection, config: &RenderConfig) -> Result<Self::Output>;
}
