use resvg::usvg;

use super::RenderError;

/// Axis-aligned rectangle in SVG canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    fn from_rect(rect: usvg::Rect) -> Self {
        Self::new(rect.x(), rect.y(), rect.width(), rect.height())
    }
}

/// A node (or detail-marked) element discovered in the engine's SVG output.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeElement {
    /// The element's own `id` attribute, in the engine's naming scheme
    pub element_id: String,
    /// Id of the tree node this element draws
    pub node_id: String,
    /// Class tokens, including any added after rendering
    pub classes: Vec<String>,
    /// Canvas bounds, when the element produced any geometry
    pub bounds: Option<Bounds>,
}

impl NodeElement {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }
}

/// Recover a tree node id from an engine element id.
///
/// Mermaid names flowchart nodes `flowchart-<id>-<counter>`. Only the
/// prefix and a trailing numeric counter are removed, so ids that contain
/// dashes survive.
pub fn domain_id_from_element_id(element_id: &str) -> &str {
    let Some((_, rest)) = element_id.split_once('-') else {
        return element_id;
    };
    match rest.rsplit_once('-') {
        Some((head, counter))
            if !head.is_empty()
                && !counter.is_empty()
                && counter.bytes().all(|b| b.is_ascii_digit()) =>
        {
            head
        }
        _ => rest,
    }
}

/// An engine SVG, parsed and ready for display, hit-testing and export.
pub struct RenderedDiagram {
    svg: String,
    tree: usvg::Tree,
    elements: Vec<NodeElement>,
}

impl std::fmt::Debug for RenderedDiagram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedDiagram")
            .field("svg_bytes", &self.svg.len())
            .field("elements", &self.elements.len())
            .finish_non_exhaustive()
    }
}

impl RenderedDiagram {
    /// Parse engine output and discover its node elements.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidSvg`] if the text is not parseable SVG.
    pub fn from_svg(svg: String, font_family: &str) -> Result<Self, RenderError> {
        let elements = discover_node_elements(&svg)?;
        let tree = super::parse_svg(&svg, font_family)
            .map_err(|err| RenderError::InvalidSvg(err.to_string()))?;

        let elements = elements
            .into_iter()
            .map(|mut element| {
                element.bounds = tree
                    .node_by_id(&element.element_id)
                    .map(|node| Bounds::from_rect(node.abs_bounding_box()));
                element
            })
            .collect();

        Ok(Self {
            svg,
            tree,
            elements,
        })
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }

    pub const fn tree(&self) -> &usvg::Tree {
        &self.tree
    }

    /// Intrinsic canvas size in pixels.
    pub fn size(&self) -> (f32, f32) {
        let size = self.tree.size();
        (size.width(), size.height())
    }

    pub fn elements(&self) -> &[NodeElement] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut [NodeElement] {
        &mut self.elements
    }

    pub fn element(&self, element_id: &str) -> Option<&NodeElement> {
        self.elements.iter().find(|e| e.element_id == element_id)
    }
}

/// Node groups (`class="node"`), plus any other element whose id carries
/// the detail marker, such as the edges leading to detail nodes.
fn discover_node_elements(svg: &str) -> Result<Vec<NodeElement>, RenderError> {
    let doc =
        roxmltree::Document::parse(svg).map_err(|err| RenderError::InvalidSvg(err.to_string()))?;

    let elements = doc
        .descendants()
        .filter(roxmltree::Node::is_element)
        .filter_map(|n| {
            let element_id = n.attribute("id")?;
            let class = n.attribute("class").unwrap_or_default();
            let is_node = class.split_whitespace().any(|t| t == "node");
            if !is_node && !crate::diagram::is_detail_id(element_id) {
                return None;
            }
            let node_id = n
                .attribute("data-id")
                .unwrap_or_else(|| domain_id_from_element_id(element_id));
            Some(NodeElement {
                element_id: element_id.to_string(),
                node_id: node_id.to_string(),
                classes: class.split_whitespace().map(ToOwned::to_owned).collect(),
                bounds: None,
            })
        })
        .collect();
    Ok(elements)
}

#[cfg(test)]
pub(crate) mod test_svg {
    /// Minimal engine-shaped SVG: one `g.node` per id laid out in a row,
    /// each 100x40 with a 20px gap, starting at (10, 10).
    pub fn row_of_nodes(ids: &[&str]) -> String {
        let mut body = String::new();
        for (i, id) in ids.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let x = 10.0 + i as f32 * 120.0;
            let class = if id.contains("_detail_") {
                "node detailNode"
            } else {
                "node default"
            };
            body.push_str(&format!(
                r##"<g class="{class}" id="flowchart-{id}-{i}" transform="translate({x}, 10)"><rect x="0" y="0" width="100" height="40" fill="#f9f9f9" stroke="#333"/></g>"##
            ));
        }
        #[allow(clippy::cast_precision_loss)]
        let width = 20.0 + ids.len() as f32 * 120.0;
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="60" viewBox="0 0 {width} 60">{body}</svg>"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_id_strips_engine_scheme() {
        assert_eq!(domain_id_from_element_id("flowchart-A-0"), "A");
        assert_eq!(domain_id_from_element_id("flowchart-my-node-12"), "my-node");
        assert_eq!(domain_id_from_element_id("flowchart-B_detail_1-4"), "B_detail_1");
        assert_eq!(domain_id_from_element_id("plain"), "plain");
        assert_eq!(domain_id_from_element_id("prefix-only"), "only");
    }

    #[test]
    fn test_discovers_nodes_with_bounds() {
        let svg = test_svg::row_of_nodes(&["A", "B", "B_detail_0"]);
        let diagram = RenderedDiagram::from_svg(svg, "Arial").unwrap();
        let ids: Vec<&str> = diagram.elements().iter().map(|e| e.node_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "B_detail_0"]);

        let b = diagram.element("flowchart-B-1").unwrap();
        let bounds = b.bounds.unwrap();
        assert!((bounds.x - 130.0).abs() < 1.0, "x = {}", bounds.x);
        assert!((bounds.width - 100.0).abs() < 2.0, "width = {}", bounds.width);
        assert!(bounds.contains(180.0, 30.0));
    }

    #[test]
    fn test_data_id_attribute_wins_over_element_id() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="50" height="50"><g class="node" id="flowchart-x-y-0" data-id="real id"><rect width="10" height="10"/></g></svg>"#;
        let diagram = RenderedDiagram::from_svg(svg.to_string(), "Arial").unwrap();
        assert_eq!(diagram.elements()[0].node_id, "real id");
    }

    #[test]
    fn test_detail_marked_edges_are_discovered() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="50" height="50"><g class="node" id="flowchart-B-0"><rect width="10" height="10"/></g><path id="L_B_B_detail_0_0" class="flowchart-link" d="M0,0 L10,10"/><path id="L_A_B_0" d="M0,0 L5,5"/></svg>"#;
        let diagram = RenderedDiagram::from_svg(svg.to_string(), "Arial").unwrap();
        let ids: Vec<&str> = diagram.elements().iter().map(|e| e.element_id.as_str()).collect();
        assert_eq!(ids, vec!["flowchart-B-0", "L_B_B_detail_0_0"]);
    }

    #[test]
    fn test_invalid_svg_is_rejected() {
        let err = RenderedDiagram::from_svg("<svg".to_string(), "Arial").unwrap_err();
        assert!(matches!(err, RenderError::InvalidSvg(_)));
    }

    #[test]
    fn test_add_class_is_idempotent() {
        let mut element = NodeElement {
            element_id: "e".into(),
            node_id: "e".into(),
            classes: vec!["node".into()],
            bounds: None,
        };
        element.add_class("detailNode");
        element.add_class("detailNode");
        assert_eq!(element.classes, vec!["node", "detailNode"]);
    }
}
