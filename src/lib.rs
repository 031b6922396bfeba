mod compose;
mod document;
mod error;
mod fonts;
mod model;
mod pdf;

pub use compose::{Composition, Entry};
pub use document::Document;
pub use error::{Error, Result};
pub use fonts::{FontBook, FontId};
pub use model::{
    BLACK, BorderStyle, Cell, CellStyle, Color, Component, ComponentKind, ContentMode, Defaults,
    DocumentConfig, Edge, Edges, HorizontalStyle, Image, ImageFormat, ImageSource, Line, Margins,
    PageOptions, PageSize, Placement, Row, Table, Text, TiledText, VerticalStyle, Watermark,
};
pub use pdf::{
    BorderEdge, Canvas, ContentStream, Cursor, DashLayout, DrawOp, Frame, ImageHandle, Page,
    PageState, PdfCanvas, PlacedBox, PlacedComponent, RecordedPage, RecordedStream, Recording,
    RecordingCanvas, Rect, StreamMode, align_x, dash_layout, draw_border, place_in_frame,
    place_on_page, resolve_styles,
};

use std::path::Path;
use std::time::Instant;

pub fn compose_json_to_pdf(input: &Path, output: &Path) -> Result<()> {
    let t0 = Instant::now();

    let composition = Composition::from_path(input)?;
    let t_parse = t0.elapsed();

    let bytes = composition.render(PdfCanvas::new())?;
    let t_render = t0.elapsed();

    std::fs::write(output, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_parse.as_secs_f64() * 1000.0,
        (t_render - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(())
}

/// Like [`compose_json_to_pdf`]; relative paths resolve against the working
/// directory.
pub fn compose_json_bytes_to_pdf(input: &[u8], output: &Path) -> Result<()> {
    let t0 = Instant::now();

    let composition = Composition::from_slice(input, Path::new("."))?;
    let t_parse = t0.elapsed();

    let bytes = composition.render(PdfCanvas::new())?;
    let t_render = t0.elapsed();

    std::fs::write(output, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_parse.as_secs_f64() * 1000.0,
        (t_render - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(())
}
