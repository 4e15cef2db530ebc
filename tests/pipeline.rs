//! Tree to diagram to click to PNG, through the public API.

use std::sync::Arc;

use chrono::NaiveDate;
use mindmapper::controller::{Completion, Controller, Phase, Point};
use mindmapper::diagram::{self, RendererConfig};
use mindmapper::export::ExportOptions;
use mindmapper::fetch::{FetchError, MindMapClient, MindMapSource, ServiceConfig, stub};
use mindmapper::render::{DiagramEngine, RenderError};
use mindmapper::tree::{Node, load_tree_file};

fn fixture_tree() -> Node {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/rust.json");
    load_tree_file(&path).unwrap()
}

/// Lays out every declared node in one row, 100x40 each with a 20px gap,
/// the way the real engine names and classes its node groups.
fn row_engine(source: &str) -> Result<String, RenderError> {
    let ids: Vec<&str> = source
        .lines()
        .filter_map(|line| line.trim().split_once("[\"").map(|(id, _)| id))
        .collect();
    if ids.is_empty() {
        return Err(RenderError::Engine("no nodes".into()));
    }
    let mut body = String::new();
    for (i, id) in ids.iter().enumerate() {
        let x = 10 + i * 120;
        let class = if diagram::is_detail_id(id) {
            "node detailNode"
        } else {
            "node default"
        };
        body.push_str(&format!(
            r##"<g class="{class}" id="flowchart-{id}-{i}" transform="translate({x}, 10)"><rect width="100" height="40" fill="#f9f9f9" stroke="#333"/></g>"##
        ));
    }
    let width = 20 + ids.len() * 120;
    Ok(format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="60" viewBox="0 0 {width} 60">{body}</svg>"#
    ))
}

fn rendered_controller(engine: &dyn DiagramEngine) -> Controller {
    let mut controller = Controller::new(RendererConfig::default());
    let request = controller.load(Arc::new(fixture_tree())).unwrap();
    let svg = engine.render(&request.source).unwrap();
    let (width, height) = (svg_width(&svg), 60.0);
    assert!(matches!(
        controller.complete(request.generation, Ok(svg)),
        Completion::Installed
    ));
    controller.set_surface_size(width, height);
    controller
}

fn svg_width(svg: &str) -> f32 {
    let start = svg.find("width=\"").unwrap() + 7;
    let end = start + svg[start..].find('"').unwrap();
    svg[start..end].parse().unwrap()
}

#[test]
fn test_fixture_generates_flowchart() {
    let text = diagram::document(&fixture_tree(), &RendererConfig::default());

    assert!(text.starts_with("flowchart LR\n"));
    assert!(text.contains("rust --> ownership"));
    assert!(text.contains(r#"tooling["Tooling #quot;cargo#quot;"]"#));
    assert!(text.contains(r#"ownership_detail_1["Values are dropped when the owner goes out of scope"]:::detailNode"#));
    assert!(text.contains("borrowing --> borrowing_detail_0"));
    assert!(!text.contains("clippy_detail"));
}

#[test]
fn test_click_reports_tree_node() {
    let engine = row_engine;
    let mut controller = rendered_controller(&engine);
    assert_eq!(controller.phase(), Phase::Rendered);

    // Second column is `ownership`.
    let mut clicked = Vec::new();
    let id = controller.click(Point::new(180.0, 30.0), Point::ORIGIN, &mut |node: &Node| {
        clicked.push(node.label.clone());
    });
    assert_eq!(id.as_deref(), Some("ownership"));
    assert_eq!(clicked, vec!["Ownership".to_string()]);

    // Third column is a detail node.
    let id = controller.click(Point::new(300.0, 30.0), Point::ORIGIN, &mut |_: &Node| {
        panic!("detail nodes are not clickable");
    });
    assert!(id.is_none());
}

#[test]
fn test_export_writes_dated_png() {
    let engine = row_engine;
    let controller = rendered_controller(&engine);
    let dir = tempfile::tempdir().unwrap();
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();

    let outcome = controller
        .export(&ExportOptions::new(dir.path()).with_date(date))
        .unwrap();

    assert_eq!(outcome.path, dir.path().join("mindmap-2025-01-15.png"));
    let png = image::open(&outcome.path).unwrap().to_rgba8();
    assert_eq!(png.dimensions(), (outcome.width, outcome.height));
    assert!(png.width() > png.height());
    assert_eq!(png.get_pixel(0, 0).0, [255, 255, 255, 255]);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_engine_failure_leaves_controller_empty() {
    let failing = |_: &str| -> Result<String, RenderError> {
        Err(RenderError::Engine("Parse error on line 3".into()))
    };
    let mut controller = Controller::new(RendererConfig::default());
    let request = controller.load(Arc::new(fixture_tree())).unwrap();

    let completion = controller.complete(request.generation, failing.render(&request.source));
    assert!(matches!(completion, Completion::Failed(RenderError::Engine(_))));
    assert_eq!(controller.phase(), Phase::Empty);
}

#[test]
fn test_service_tree_renders_end_to_end() {
    let text = r#"{"id":"p","label":"Photosynthesis","children":[{"id":"l","label":"Light","details":"Chlorophyll"}]}"#;
    let (base_url, server) = stub::serve_once(200, &stub::envelope(text)).unwrap();
    let http = reqwest::blocking::Client::builder()
        .no_proxy()
        .build()
        .unwrap();
    let client =
        MindMapClient::with_http_client(http, ServiceConfig::default().with_base_url(base_url));

    let tree: Result<Node, FetchError> = client.generate("photosynthesis");
    let tree = tree.unwrap();
    assert_eq!(tree.label, "Photosynthesis");
    assert_eq!(tree.detail_count(), 1);
    server.join().unwrap().unwrap();

    let mut controller = Controller::new(RendererConfig::default());
    let request = controller.load(Arc::new(tree)).unwrap();
    let completion = controller.complete(request.generation, row_engine(&request.source));
    assert!(matches!(completion, Completion::Installed));
    assert_eq!(controller.diagram().unwrap().elements().len(), 3);
}
