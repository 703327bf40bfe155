use std::path::Path;

use anyhow::{bail, Context, Result};
use svg::node::element::{Group, Line, Rectangle, Text};
use svg::Document;

use super::{RenderConfig, Renderer};
use crate::tree::layout::{Point, Projection};

const BRANCH_COLOR: &str = "#000000";
const LABEL_COLOR: &str = "#202020";
const LABEL_OFFSET: f64 = 4.0;

/// Draws a radial dendrogram as an SVG document: branches as lines, tips as text, no axes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgRenderer;

impl Renderer for SvgRenderer {
    type Output = Document;

    fn render(&self, projection: &Projection, config: &RenderConfig) -> Result<Document> {
        if config.width <= 0.0 || config.height <= 0.0 {
            bail!(
                "canvas must have a positive size, got {}x{}",
                config.width,
                config.height
            );
        }

        let center = (config.width * 0.5, config.height * 0.5);
        let available = (config.width.min(config.height) * 0.5 - config.margin).max(1.0);
        let extent = projection.extent();
        let scale = if extent <= f64::EPSILON {
            1.0
        } else {
            available / extent
        };

        // SVG y grows downwards
        let to_svg_coords = |point: Point| (center.0 + point.x * scale, center.1 - point.y * scale);

        let mut document = Document::new()
            .set("viewBox", (0.0, 0.0, config.width, config.height))
            .set("width", config.width)
            .set("height", config.height);

        let background = Rectangle::new()
            .set("x", 0.0)
            .set("y", 0.0)
            .set("width", config.width)
            .set("height", config.height)
            .set("fill", "#ffffff");
        document = document.add(background);

        let mut branch_group = Group::new()
            .set("stroke", BRANCH_COLOR)
            .set("stroke-width", 1.0)
            .set("stroke-linecap", "round");
        for edge in &projection.edges {
            let (x1, y1) = to_svg_coords(edge.from);
            let (x2, y2) = to_svg_coords(edge.to);
            let line = Line::new()
                .set("x1", x1)
                .set("y1", y1)
                .set("x2", x2)
                .set("y2", y2);
            branch_group = branch_group.add(line);
        }
        document = document.add(branch_group);

        let mut label_group = Group::new()
            .set("font-size", config.font_size)
            .set("font-family", "sans-serif")
            .set("fill", LABEL_COLOR);
        for label in &projection.labels {
            let angle = label.position.y.atan2(label.position.x);
            let (x, y) = to_svg_coords(label.position);

            // Labels on the left half are flipped so they never read upside down
            let left_side = label.position.x < 0.0;
            let mut degrees = -angle.to_degrees();
            let (anchor, dx) = if left_side {
                degrees += 180.0;
                ("end", -LABEL_OFFSET)
            } else {
                ("start", LABEL_OFFSET)
            };

            let text_content = svg::node::Text::new(label.text.clone());
            let text = Text::new("")
                .set("x", x)
                .set("y", y)
                .set("dx", dx)
                .set("text-anchor", anchor)
                .set("dominant-baseline", "middle")
                .set("transform", format!("rotate({degrees:.3} {x:.3} {y:.3})"))
                .add(text_content);
            label_group = label_group.add(text);
        }
        document = document.add(label_group);

        Ok(document)
    }
}

/// Render the projection and write it to `path`.
pub fn export_svg(projection: &Projection, config: &RenderConfig, path: &Path) -> Result<()> {
    let document = SvgRenderer.render(projection, config)?;
    svg::save(path, &document)
        .with_context(|| format!("failed to save SVG to {}", path.display()))
}
