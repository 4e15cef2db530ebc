//! Diagram rendering engine boundary.
//!
//! The engine turns Mermaid text into SVG. Everything after that (element
//! discovery, hit-testing, rasterization) happens on our side of the seam.

mod mmdc;
mod rendered;

pub use mmdc::MermaidCli;
pub use rendered::{Bounds, NodeElement, RenderedDiagram, domain_id_from_element_id};
#[cfg(test)]
pub(crate) use rendered::test_svg;

use std::sync::Arc;

use once_cell::sync::Lazy;
use resvg::usvg::fontdb;

/// Errors raised while producing or installing a rendered diagram.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("diagram engine failed: {0}")]
    Engine(String),
    #[error("could not start diagram engine `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("engine produced invalid SVG: {0}")]
    InvalidSvg(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Something that turns diagram text into an SVG document.
pub trait DiagramEngine: Send + Sync {
    /// Render Mermaid source to SVG text.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the source or cannot run.
    fn render(&self, source: &str) -> Result<String, RenderError>;
}

impl<F> DiagramEngine for F
where
    F: Fn(&str) -> Result<String, RenderError> + Send + Sync,
{
    fn render(&self, source: &str) -> Result<String, RenderError> {
        self(source)
    }
}

static FONTS: Lazy<Arc<fontdb::Database>> = Lazy::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    Arc::new(db)
});

/// Parse SVG text with the shared system font database.
///
/// `font_family` replaces whatever family the SVG would otherwise fall back
/// to, since inherited font stacks do not resolve outside a browser.
///
/// # Errors
///
/// Returns an error if the text is not a valid SVG document.
pub fn parse_svg(svg: &str, font_family: &str) -> Result<resvg::usvg::Tree, resvg::usvg::Error> {
    let mut options = resvg::usvg::Options::default();
    options.fontdb = Arc::clone(&FONTS);
    options.font_family = primary_family(font_family).to_string();
    resvg::usvg::Tree::from_str(svg, &options)
}

/// First family of a CSS font stack, unquoted.
fn primary_family(stack: &str) -> &str {
    stack
        .split(',')
        .map(|f| f.trim().trim_matches(['"', '\'']))
        .find(|f| !f.is_empty())
        .unwrap_or("Arial")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_family_strips_quotes() {
        assert_eq!(primary_family("'Segoe UI', sans-serif"), "Segoe UI");
        assert_eq!(primary_family(""), "Arial");
    }

    #[test]
    fn test_closure_engines() {
        let engine = |source: &str| -> Result<String, RenderError> {
            Ok(format!("<svg xmlns=\"http://www.w3.org/2000/svg\"><!-- {} --></svg>", source.len()))
        };
        assert!(engine.render("flowchart LR").unwrap().contains("12"));
    }
}
