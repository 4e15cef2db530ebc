//! PNG export of a rendered mind map.
//!
//! The primary strategy rasterizes a staged copy of the SVG whose size and
//! view box are rewritten to the padded content bounds and whose text
//! carries an explicit font family. If that fails, the original SVG is
//! drawn directly onto a padded white canvas. Either way the PNG reaches
//! disk through a temporary file that is removed unless it is persisted.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};
use resvg::tiny_skia::{Color, Pixmap, Transform};
use resvg::usvg;

use crate::diagram::RendererConfig;

/// Padding around the content bounds, in SVG user units.
pub const MARGIN: f32 = 40.0;

/// Raster scale relative to SVG user units.
pub const SCALE: f32 = 2.0;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no rendered mind map to export")]
    NotRendered,
    #[error("could not prepare SVG for export: {0}")]
    Staging(String),
    #[error("could not rasterize mind map: {0}")]
    Raster(String),
    #[error("could not encode PNG: {0}")]
    Encode(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Failed to download mind map. Try taking a screenshot instead.")]
    Exhausted {
        primary: Box<ExportError>,
        fallback: Box<ExportError>,
    },
}

/// Which rasterization path produced the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    /// Date stamped into the file name
    pub date: NaiveDate,
    pub font_family: String,
}

impl ExportOptions {
    /// Export into `output_dir`, dated today (UTC).
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            date: Utc::now().date_naive(),
            font_family: RendererConfig::default().font_family,
        }
    }

    #[must_use]
    pub const fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    #[must_use]
    pub fn with_font_family(mut self, font_family: impl Into<String>) -> Self {
        self.font_family = font_family.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub strategy: Strategy,
    /// PNG width in pixels
    pub width: u32,
    /// PNG height in pixels
    pub height: u32,
}

/// An encoded PNG and its pixel size.
#[derive(Debug, Clone)]
pub struct Raster {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// `mindmap-YYYY-MM-DD.png`
pub fn export_filename(date: NaiveDate) -> String {
    format!("mindmap-{}.png", date.format("%Y-%m-%d"))
}

/// Rasterize `svg` and write it to the options' output directory.
///
/// # Errors
///
/// Returns [`ExportError::Exhausted`] when both strategies fail, or an I/O
/// error if the file cannot be written.
pub fn export_png(svg: &str, options: &ExportOptions) -> Result<ExportOutcome, ExportError> {
    export_with(svg, options, rasterize_primary)
}

/// [`export_png`] with the primary strategy supplied by the caller.
fn export_with(
    svg: &str,
    options: &ExportOptions,
    rasterize: fn(&str, &str) -> Result<Raster, ExportError>,
) -> Result<ExportOutcome, ExportError> {
    let _scope = crate::perf::scope("export.png");

    let (raster, strategy) = match rasterize(svg, &options.font_family) {
        Ok(raster) => (raster, Strategy::Primary),
        Err(primary) => {
            tracing::warn!(error = %primary, "primary export failed, using fallback");
            match rasterize_fallback(svg, &options.font_family) {
                Ok(raster) => (raster, Strategy::Fallback),
                Err(fallback) => {
                    tracing::error!(%primary, %fallback, "mind map export failed");
                    return Err(ExportError::Exhausted {
                        primary: Box::new(primary),
                        fallback: Box::new(fallback),
                    });
                }
            }
        }
    };

    let path = deliver(
        &raster.png,
        &options.output_dir,
        &export_filename(options.date),
    )?;
    tracing::info!(path = %path.display(), ?strategy, "mind map exported");
    crate::perf::log_event(
        "export.png",
        format!(
            "strategy={strategy:?} size={}x{} bytes={}",
            raster.width,
            raster.height,
            raster.png.len()
        ),
    );
    Ok(ExportOutcome {
        path,
        strategy,
        width: raster.width,
        height: raster.height,
    })
}

/// Rasterize a staged copy sized to the padded content bounds.
///
/// # Errors
///
/// Returns an error if the SVG cannot be parsed, staged or encoded.
pub fn rasterize_primary(svg: &str, font_family: &str) -> Result<Raster, ExportError> {
    let original = parse(svg, font_family)?;
    let bounds = user_space_bounds(svg, &original)?;
    let view_box = padded(bounds);

    let staged = stage_svg(svg, view_box, font_family)?;
    let tree = parse(&staged, font_family)?;
    let mut pixmap = white_pixmap(view_box.width(), view_box.height())?;
    resvg::render(
        &tree,
        Transform::from_scale(SCALE, SCALE),
        &mut pixmap.as_mut(),
    );
    encode(&pixmap)
}

/// Draw the original SVG, shifted by the margin, onto a padded canvas.
///
/// # Errors
///
/// Returns an error if the SVG cannot be parsed or encoded.
pub fn rasterize_fallback(svg: &str, font_family: &str) -> Result<Raster, ExportError> {
    let tree = parse(svg, font_family)?;
    let bounds = canvas_bounds(&tree)?;
    let mut pixmap = white_pixmap(
        bounds.width() + 2.0 * MARGIN,
        bounds.height() + 2.0 * MARGIN,
    )?;
    let transform = Transform::from_row(
        SCALE,
        0.0,
        0.0,
        SCALE,
        SCALE * (MARGIN - bounds.x()),
        SCALE * (MARGIN - bounds.y()),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    encode(&pixmap)
}

fn parse(svg: &str, font_family: &str) -> Result<usvg::Tree, ExportError> {
    crate::render::parse_svg(svg, font_family).map_err(|err| ExportError::Raster(err.to_string()))
}

/// Content bounds (strokes included) on the canvas.
fn canvas_bounds(tree: &usvg::Tree) -> Result<usvg::Rect, ExportError> {
    let bounds = tree.root().abs_stroke_bounding_box();
    let valid = bounds.width().is_finite()
        && bounds.height().is_finite()
        && bounds.width() > 0.0
        && bounds.height() > 0.0;
    if valid {
        Ok(bounds)
    } else {
        Err(ExportError::Raster("diagram has no visible content".into()))
    }
}

/// Content bounds in the SVG's own user units, undoing the root view box.
fn user_space_bounds(svg: &str, tree: &usvg::Tree) -> Result<usvg::Rect, ExportError> {
    let bounds = canvas_bounds(tree)?;
    let to_user = view_box_transform(svg, tree.size())?
        .invert()
        .ok_or_else(|| ExportError::Staging("view box is not invertible".into()))?;
    bounds
        .transform(to_user)
        .ok_or_else(|| ExportError::Staging("content bounds collapsed".into()))
}

/// Mapping from the root `viewBox` to the canvas. usvg flattens it into
/// the tree, so it is read back from the source.
fn view_box_transform(svg: &str, canvas: usvg::Size) -> Result<Transform, ExportError> {
    let doc =
        roxmltree::Document::parse(svg).map_err(|err| ExportError::Staging(err.to_string()))?;
    let root = doc.root_element();
    let Some(view_box) = root.attribute("viewBox") else {
        return Ok(Transform::identity());
    };

    let values = view_box
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(str::parse::<f32>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ExportError::Staging(format!("bad viewBox {view_box:?}: {err}")))?;
    let [x, y, width, height] = values[..] else {
        return Err(ExportError::Staging(format!("bad viewBox {view_box:?}")));
    };
    if width <= 0.0 || height <= 0.0 {
        return Err(ExportError::Staging(format!("empty viewBox {view_box:?}")));
    }

    let sx = canvas.width() / width;
    let sy = canvas.height() / height;
    if root
        .attribute("preserveAspectRatio")
        .is_some_and(|value| value.trim() == "none")
    {
        return Ok(Transform::from_row(sx, 0.0, 0.0, sy, -x * sx, -y * sy));
    }

    // Default `xMidYMid meet`
    let scale = sx.min(sy);
    let tx = (canvas.width() - width * scale) / 2.0 - x * scale;
    let ty = (canvas.height() - height * scale) / 2.0 - y * scale;
    Ok(Transform::from_row(scale, 0.0, 0.0, scale, tx, ty))
}

fn padded(bounds: usvg::Rect) -> usvg::Rect {
    usvg::Rect::from_xywh(
        bounds.x() - MARGIN,
        bounds.y() - MARGIN,
        bounds.width() + 2.0 * MARGIN,
        bounds.height() + 2.0 * MARGIN,
    )
    .unwrap_or(bounds)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn white_pixmap(width: f32, height: f32) -> Result<Pixmap, ExportError> {
    let w = (width * SCALE).ceil() as u32;
    let h = (height * SCALE).ceil() as u32;
    let mut pixmap = Pixmap::new(w, h)
        .ok_or_else(|| ExportError::Raster(format!("cannot allocate {w}x{h} canvas")))?;
    pixmap.fill(Color::WHITE);
    Ok(pixmap)
}

fn encode(pixmap: &Pixmap) -> Result<Raster, ExportError> {
    let png = pixmap
        .encode_png()
        .map_err(|err| ExportError::Encode(err.to_string()))?;
    Ok(Raster {
        png,
        width: pixmap.width(),
        height: pixmap.height(),
    })
}

/// Copy of `svg` with the root sized to `view_box` and every `<text>`
/// carrying `font_family`.
///
/// # Errors
///
/// Returns [`ExportError::Staging`] if the SVG is not well-formed XML or
/// has no root `<svg>` element.
pub fn stage_svg(svg: &str, view_box: usvg::Rect, font_family: &str) -> Result<String, ExportError> {
    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Vec::with_capacity(svg.len()));
    let mut saw_root = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| ExportError::Staging(err.to_string()))?;
        let event = match event {
            Event::Eof => break,
            Event::Start(start) => Event::Start(restyle(&start, &mut saw_root, view_box, font_family)?),
            Event::Empty(start) => Event::Empty(restyle(&start, &mut saw_root, view_box, font_family)?),
            other => other,
        };
        writer
            .write_event(event)
            .map_err(|err| ExportError::Staging(err.to_string()))?;
    }

    if !saw_root {
        return Err(ExportError::Staging("no <svg> root element".into()));
    }
    String::from_utf8(writer.into_inner()).map_err(|err| ExportError::Staging(err.to_string()))
}

fn restyle(
    start: &BytesStart<'_>,
    saw_root: &mut bool,
    view_box: usvg::Rect,
    font_family: &str,
) -> Result<BytesStart<'static>, ExportError> {
    let name = start.name();
    let is_root = name.as_ref() == b"svg" && !*saw_root;
    let overrides: Vec<(&str, String)> = if is_root {
        *saw_root = true;
        vec![
            ("width", format!("{}px", view_box.width())),
            ("height", format!("{}px", view_box.height())),
            (
                "viewBox",
                format!(
                    "{} {} {} {}",
                    view_box.x(),
                    view_box.y(),
                    view_box.width(),
                    view_box.height()
                ),
            ),
        ]
    } else if name.as_ref() == b"text" {
        vec![("font-family", font_family.to_string())]
    } else {
        return Ok(start.clone().into_owned());
    };

    let mut staged = start.clone().into_owned();
    staged.clear_attributes();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| ExportError::Staging(err.to_string()))?;
        let key = attr.key.as_ref();
        let replaced = overrides.iter().any(|(name, _)| key == name.as_bytes());
        // A root `style` only carries width limits that the view box now owns.
        let dropped = is_root && key == b"style";
        if !replaced && !dropped {
            staged.push_attribute(attr);
        }
    }
    for (key, value) in &overrides {
        staged.push_attribute((*key, value.as_str()));
    }
    Ok(staged)
}

/// Write `png` to `dir/name` through a temporary file in the same
/// directory. The temporary is removed on every path that does not persist
/// it.
fn deliver(png: &[u8], dir: &Path, name: &str) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(png)?;
    staged.flush()?;
    let path = dir.join(name);
    staged
        .persist(&path)
        .map_err(|err| ExportError::Io(err.error))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_svg::row_of_nodes;
    use tempfile::tempdir;

    fn png_size(path: &Path) -> (u32, u32) {
        let img = image::open(path).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_filename_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        assert_eq!(export_filename(date), "mindmap-2025-01-07.png");
    }

    #[test]
    fn test_stage_rewrites_root_and_text() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100%" style="max-width: 200px;" viewBox="0 0 200 100"><g><text x="1" font-family="serif">Hi</text></g></svg>"#;
        let view_box = usvg::Rect::from_xywh(-40.0, -40.0, 280.0, 180.0).unwrap();
        let staged = stage_svg(svg, view_box, "Arial, sans-serif").unwrap();

        let doc = roxmltree::Document::parse(&staged).unwrap();
        let root = doc.root_element();
        assert_eq!(root.attribute("width"), Some("280px"));
        assert_eq!(root.attribute("height"), Some("180px"));
        assert_eq!(root.attribute("viewBox"), Some("-40 -40 280 180"));
        assert_eq!(root.attribute("style"), None);

        let text = doc
            .descendants()
            .find(|n| n.has_tag_name("text"))
            .unwrap();
        assert_eq!(text.attribute("font-family"), Some("Arial, sans-serif"));
        assert_eq!(text.attribute("x"), Some("1"));
        assert_eq!(text.text(), Some("Hi"));
    }

    #[test]
    fn test_stage_leaves_original_untouched() {
        let svg = row_of_nodes(&["A"]);
        let before = svg.clone();
        let view_box = usvg::Rect::from_xywh(0.0, 0.0, 10.0, 10.0).unwrap();
        let _ = stage_svg(&svg, view_box, "Arial").unwrap();
        assert_eq!(svg, before);
    }

    #[test]
    fn test_stage_rejects_non_svg() {
        let view_box = usvg::Rect::from_xywh(0.0, 0.0, 10.0, 10.0).unwrap();
        assert!(matches!(
            stage_svg("<html></html>", view_box, "Arial"),
            Err(ExportError::Staging(_))
        ));
    }

    #[test]
    fn test_primary_pads_and_doubles() {
        // Content spans x 10..230, y 10..50 (two 100x40 nodes, 1px strokes).
        let raster = rasterize_primary(&row_of_nodes(&["A", "B"]), "Arial").unwrap();
        let expected_w = ((221.0 + 2.0 * MARGIN) * SCALE).ceil();
        let expected_h = ((41.0 + 2.0 * MARGIN) * SCALE).ceil();
        assert!((f64::from(raster.width) - f64::from(expected_w)).abs() <= 2.0);
        assert!((f64::from(raster.height) - f64::from(expected_h)).abs() <= 2.0);
    }

    /// White columns left of and right of the non-white content.
    fn horizontal_padding(png: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(png).unwrap().to_rgba8();
        let inked = |x: u32| (0..img.height()).any(|y| img.get_pixel(x, y).0 != [255, 255, 255, 255]);
        let first = (0..img.width()).find(|&x| inked(x)).unwrap();
        let last = (0..img.width()).rev().find(|&x| inked(x)).unwrap();
        (first, img.width() - 1 - last)
    }

    #[test]
    fn test_primary_pads_evenly_with_offset_view_box() {
        // One 250x40 user-unit block at the user origin, view box shifted
        // by -8 the way mmdc emits it.
        let block = r##"<rect x="0" y="0" width="250" height="40" fill="#000"/>"##;
        for root in [
            r#"width="100%" viewBox="-8 -8 266 56""#,
            r#"width="532" height="112" viewBox="-8 -8 266 56""#,
        ] {
            let svg = format!(r#"<svg xmlns="http://www.w3.org/2000/svg" {root}>{block}</svg>"#);
            let raster = rasterize_primary(&svg, "Arial").unwrap();
            let (left, right) = horizontal_padding(&raster.png);
            let margin = f64::from(MARGIN * SCALE);
            assert!((f64::from(left) - margin).abs() <= 1.0, "{root}: left {left}");
            assert!((f64::from(right) - margin).abs() <= 1.0, "{root}: right {right}");
            let expected_w = f64::from((250.0 + 2.0 * MARGIN) * SCALE);
            assert!(
                (f64::from(raster.width) - expected_w).abs() <= 1.0,
                "{root}: width {}",
                raster.width
            );
        }
    }

    #[test]
    fn test_view_box_transform_maps_user_units_to_canvas() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="-8 -8 266 56"/>"#;
        let canvas = usvg::Size::from_wh(532.0, 112.0).unwrap();
        let transform = view_box_transform(svg, canvas).unwrap();
        assert_eq!((transform.sx, transform.sy), (2.0, 2.0));
        assert_eq!((transform.tx, transform.ty), (16.0, 16.0));

        let plain = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"/>"#;
        assert!(view_box_transform(plain, canvas).unwrap().is_identity());
    }

    #[test]
    fn test_background_is_white() {
        let raster = rasterize_primary(&row_of_nodes(&["A"]), "Arial").unwrap();
        let img = image::load_from_memory(&raster.png).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(1, 1).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_fallback_matches_primary_size() {
        let svg = row_of_nodes(&["A", "B", "C"]);
        let primary = rasterize_primary(&svg, "Arial").unwrap();
        let fallback = rasterize_fallback(&svg, "Arial").unwrap();
        assert!(primary.width.abs_diff(fallback.width) <= 2);
        assert!(primary.height.abs_diff(fallback.height) <= 2);
    }

    #[test]
    fn test_export_writes_dated_file() {
        let dir = tempdir().unwrap();
        let options = ExportOptions::new(dir.path())
            .with_date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        let outcome = export_png(&row_of_nodes(&["A", "B"]), &options).unwrap();

        assert_eq!(outcome.strategy, Strategy::Primary);
        assert_eq!(outcome.path, dir.path().join("mindmap-2024-12-31.png"));
        assert_eq!(png_size(&outcome.path), (outcome.width, outcome.height));
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temporary file left behind");
    }

    #[test]
    fn test_failing_primary_falls_back_to_same_file() {
        fn refuse(_: &str, _: &str) -> Result<Raster, ExportError> {
            Err(ExportError::Staging("refused".into()))
        }

        let dir = tempdir().unwrap();
        let options = ExportOptions::new(dir.path())
            .with_date(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
        let outcome = export_with(&row_of_nodes(&["A", "B"]), &options, refuse).unwrap();

        assert_eq!(outcome.strategy, Strategy::Fallback);
        assert_eq!(outcome.path, dir.path().join("mindmap-2025-03-09.png"));
        assert_eq!(png_size(&outcome.path), (outcome.width, outcome.height));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_unparseable_svg_exhausts_both_strategies() {
        let dir = tempdir().unwrap();
        let options = ExportOptions::new(dir.path());
        let err = export_png("not svg at all", &options).unwrap_err();
        assert!(matches!(err, ExportError::Exhausted { .. }));
        assert_eq!(
            err.to_string(),
            "Failed to download mind map. Try taking a screenshot instead."
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_svg_has_no_content() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"></svg>"#;
        assert!(rasterize_primary(svg, "Arial").is_err());
        assert!(rasterize_fallback(svg, "Arial").is_err());
    }
}
