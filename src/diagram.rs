//! Mermaid flowchart generation.
//!
//! Converts a [`Node`] tree into Mermaid flowchart text. Layout is left to
//! the rendering engine; this module only owns the text it is fed and the
//! escaping rules of that text.

use std::fmt::Write;

use serde::Serialize;

use crate::tree::Node;

/// Separator between a node id and a detail index in synthetic ids.
pub const DETAIL_ID_MARKER: &str = "_detail_";

/// CSS class applied to synthetic detail nodes.
pub const DETAIL_CLASS: &str = "detailNode";

/// Flow direction of the generated flowchart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    LeftRight,
    TopDown,
}

impl Direction {
    const fn keyword(self) -> &'static str {
        match self {
            Self::LeftRight => "LR",
            Self::TopDown => "TD",
        }
    }
}

/// Renderer settings shared by the text generator and the engine.
///
/// Built once by the caller and handed to whatever renders the diagram, so
/// independent renderers can run with different settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererConfig {
    pub direction: Direction,
    /// `classDef default` body
    pub node_style: String,
    /// `classDef detailNode` body
    pub detail_style: String,
    /// Mermaid theme name
    pub theme: String,
    /// Edge curve interpolation
    pub curve: String,
    /// Font family forced on rendered and exported text
    pub font_family: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            direction: Direction::LeftRight,
            node_style: "fill:#f9f9f9,stroke:#333,stroke-width:1px".to_string(),
            detail_style: "fill:#e6f7ff,stroke:#69c0ff,stroke-width:1px".to_string(),
            theme: "default".to_string(),
            curve: "basis".to_string(),
            font_family: "Arial, sans-serif".to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EngineConfig<'a> {
    theme: &'a str,
    font_family: &'a str,
    flowchart: FlowchartConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FlowchartConfig<'a> {
    html_labels: bool,
    curve: &'a str,
}

impl RendererConfig {
    /// Mermaid configuration JSON for this renderer.
    ///
    /// HTML labels are always off: `<foreignObject>` content cannot be
    /// rasterized outside a browser.
    pub fn engine_config_json(&self) -> String {
        let config = EngineConfig {
            theme: &self.theme,
            font_family: &self.font_family,
            flowchart: FlowchartConfig {
                html_labels: false,
                curve: &self.curve,
            },
        };
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Escape a label for embedding inside `["..."]`.
///
/// Mermaid strings have no backslash escape; a double quote is written as
/// the `#quot;` entity.
pub fn escape_label(text: &str) -> String {
    text.replace('"', "#quot;")
}

/// Synthetic id of the `index`-th detail entry of `node_id`.
pub fn detail_node_id(node_id: &str, index: usize) -> String {
    format!("{node_id}{DETAIL_ID_MARKER}{index}")
}

/// Whether an id (or a rendered element id) belongs to a detail node.
pub fn is_detail_id(id: &str) -> bool {
    id.contains(DETAIL_ID_MARKER)
}

/// Generate flowchart statements for a tree.
pub fn generate(root: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, root, 0);
    out
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    let indent = "  ".repeat(depth);
    // Writing into a String cannot fail.
    let _ = write!(out, "{indent}{}[\"{}\"]", node.id, escape_label(&node.label));

    for (index, detail) in node.detail_entries().iter().enumerate() {
        let detail_id = detail_node_id(&node.id, index);
        let _ = write!(
            out,
            "\n{indent}{detail_id}[\"{}\"]:::{DETAIL_CLASS}",
            escape_label(detail)
        );
        let _ = write!(out, "\n{indent}{} --> {detail_id}", node.id);
    }

    for child in &node.children {
        let _ = write!(out, "\n{indent}{} --> {}\n", node.id, child.id);
        write_node(out, child, depth + 1);
    }
}

/// Full diagram document: header, class definitions and statements.
pub fn document(root: &Node, config: &RendererConfig) -> String {
    format!(
        "flowchart {}\n%% node styles\nclassDef default {}\nclassDef {DETAIL_CLASS} {}\n{}\n",
        config.direction.keyword(),
        config.node_style,
        config.detail_style,
        generate(root)
    )
}
