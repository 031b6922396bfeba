//! JSON composition files.
//!
//! ```json
//! {
//!   "page": { "size": { "width": 595.28, "height": 841.89 }, "margins": { "top": 50 } },
//!   "defaults": { "font": "Helvetica", "font_size": 11 },
//!   "fonts": { "Body": "fonts/DejaVuSans.ttf" },
//!   "header": { "type": "text", "text": "Report", "horizontal": "center" },
//!   "footer": { "type": "text", "text": "Page {page}", "horizontal": "right" },
//!   "watermark": { "type": "tiled", "text": ["DRAFT"], "angle": 30, "opacity": 0.2 },
//!   "body": [
//!     { "type": "text", "text": "Hello" },
//!     { "type": "page_break" },
//!     { "type": "image", "path": "logo.png", "width": 120 }
//!   ]
//! }
//! ```
//!
//! Relative paths (fonts, images) resolve against the composition's directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::model::{
    Component, Defaults, DocumentConfig, Margins, PageOptions, PageSize, TiledText, Watermark,
};
use crate::pdf::Canvas;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageSection {
    size: Option<PageSize>,
    margins: Option<Margins>,
    options: Option<PageOptions>,
    header_height: Option<f32>,
    footer_height: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawComposition {
    page: PageSection,
    defaults: Option<Defaults>,
    fonts: BTreeMap<String, PathBuf>,
    header: Option<Value>,
    footer: Option<Value>,
    watermark: Option<Value>,
    body: Vec<Value>,
}

/// One body entry.
#[derive(Debug)]
pub enum Entry {
    Component(Component),
    PageBreak,
}

/// A parsed composition, ready to be rendered onto any canvas.
#[derive(Debug)]
pub struct Composition {
    pub config: DocumentConfig,
    pub fonts: Vec<(String, PathBuf)>,
    pub header: Option<Component>,
    pub footer: Option<Component>,
    pub watermark: Option<Watermark>,
    pub body: Vec<Entry>,
}

impl Composition {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_slice(&bytes, base)
    }

    /// Parse JSON; relative paths resolve against `base`.
    pub fn from_slice(bytes: &[u8], base: &Path) -> Result<Self> {
        let raw: RawComposition = serde_json::from_slice(bytes)?;
        let defaults = DocumentConfig::default();
        let config = DocumentConfig {
            page_size: raw.page.size.unwrap_or(defaults.page_size),
            margins: raw.page.margins.unwrap_or(defaults.margins),
            defaults: raw.defaults.unwrap_or(defaults.defaults),
            page_options: raw.page.options.unwrap_or(defaults.page_options),
            header_height: raw.page.header_height,
            footer_height: raw.page.footer_height,
        };
        let fonts = raw
            .fonts
            .into_iter()
            .map(|(name, path)| (name, rebase(base, &path)))
            .collect();
        let body = raw
            .body
            .into_iter()
            .enumerate()
            .map(|(i, v)| parse_entry(v, base).map_err(|e| at_entry(i, e)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            config,
            fonts,
            header: raw.header.map(|v| parse_component(v, base)).transpose()?,
            footer: raw.footer.map(|v| parse_component(v, base)).transpose()?,
            watermark: raw.watermark.map(|v| parse_watermark(v, base)).transpose()?,
            body,
        })
    }

    /// Lay the composition out on `canvas`.
    pub fn render<C: Canvas>(self, canvas: C) -> Result<C::Output> {
        let mut doc = Document::new(canvas, self.config);
        for (name, path) in &self.fonts {
            doc.register_font(name, path)?;
        }
        if let Some(header) = self.header {
            doc.set_header(header);
        }
        if let Some(footer) = self.footer {
            doc.set_footer(footer);
        }
        if let Some(watermark) = self.watermark {
            doc.set_watermark(watermark);
        }
        for entry in self.body {
            match entry {
                Entry::Component(c) => doc.append(c)?,
                Entry::PageBreak => {
                    doc.new_page()?;
                }
            }
        }
        log::debug!("composition laid out on {} pages", doc.page_count());
        doc.finish()
    }
}

fn at_entry(index: usize, err: Error) -> Error {
    match err {
        Error::Composition(msg) => Error::Composition(format!("body[{index}]: {msg}")),
        other => other,
    }
}

fn rebase(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn parse_entry(value: Value, base: &Path) -> Result<Entry> {
    if value.get("type").and_then(Value::as_str) == Some("page_break") {
        return Ok(Entry::PageBreak);
    }
    parse_component(value, base).map(Entry::Component)
}

/// A `"tiled"` watermark or any component.
fn parse_watermark(value: Value, base: &Path) -> Result<Watermark> {
    if value.get("type").and_then(Value::as_str) == Some("tiled") {
        let tiled: TiledText = serde_json::from_value(value)?;
        return Ok(tiled.into());
    }
    parse_component(value, base).map(Watermark::from)
}

fn parse_component(mut value: Value, base: &Path) -> Result<Component> {
    rebase_image_paths(&mut value, base);
    Ok(serde_json::from_value(value)?)
}

/// Rewrite relative `path` fields of image objects, at any depth.
fn rebase_image_paths(value: &mut Value, base: &Path) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("image")
                && let Some(Value::String(p)) = map.get_mut("path")
            {
                let rebased = rebase(base, Path::new(p.as_str()));
                *p = rebased.to_string_lossy().into_owned();
            }
            for v in map.values_mut() {
                rebase_image_paths(v, base);
            }
        }
        Value::Array(items) => {
            for v in items {
                rebase_image_paths(v, base);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HorizontalStyle;

    #[test]
    fn parses_body_and_page_breaks() {
        let json = br#"{
            "page": { "size": { "width": 400, "height": 600 } },
            "footer": { "type": "text", "text": "{page}", "horizontal": "right" },
            "body": [
                { "type": "text", "text": "a", "font_size": 9 },
                { "type": "page_break" },
                { "type": "line", "thickness": 2 }
            ]
        }"#;
        let c = Composition::from_slice(json, Path::new(".")).unwrap();
        assert_eq!(c.config.page_size, PageSize::new(400.0, 600.0));
        assert_eq!(c.body.len(), 3);
        assert!(matches!(c.body[1], Entry::PageBreak));
        let Some(Component::Text(footer)) = &c.footer else {
            panic!("footer should be text");
        };
        assert_eq!(footer.placement.horizontal, Some(HorizontalStyle::Right));
    }

    #[test]
    fn tiled_watermark_is_told_apart_from_components() {
        let json = br#"{
            "watermark": { "type": "tiled", "text": ["DRAFT", "v2"], "angle": 45, "opacity": 0.3 }
        }"#;
        let c = Composition::from_slice(json, Path::new(".")).unwrap();
        let Some(Watermark::Tiled(tiled)) = &c.watermark else {
            panic!("watermark should be tiled");
        };
        assert_eq!(tiled.text, ["DRAFT", "v2"]);
        assert_eq!((tiled.rows, tiled.columns), (1, 1));
        assert_eq!(tiled.column_gap, 50.0);

        let json = br#"{ "watermark": { "type": "text", "text": "DRAFT" } }"#;
        let c = Composition::from_slice(json, Path::new(".")).unwrap();
        assert!(matches!(c.watermark, Some(Watermark::Component(Component::Text(_)))));
    }

    #[test]
    fn nested_image_paths_are_rebased() {
        let mut v: Value = serde_json::json!({
            "type": "cell",
            "components": [{ "type": "image", "path": "img/a.png" }]
        });
        rebase_image_paths(&mut v, Path::new("/data"));
        assert_eq!(v["components"][0]["path"], "/data/img/a.png");
    }

    #[test]
    fn bad_entry_reports_its_index() {
        let json = br#"{ "body": [ { "type": "text", "text": "ok" }, { "type": "bogus" } ] }"#;
        let err = Composition::from_slice(json, Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("body[1]"), "{err}");
    }
}
