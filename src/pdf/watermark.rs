//! Tiled text watermarks.

use crate::error::{Error, Result};
use crate::model::{PageSize, TiledText};

use super::canvas::{Canvas, StreamMode, scoped};
use super::cursor::Rect;
use super::layout::{Inherited, resolve_font};

/// Baseline origin of every line, row by row, then column by column.
fn baselines(tiled: &TiledText, origin: [f32; 2], size: f32, widest: f32) -> Vec<(f32, f32)> {
    let lines = tiled.text.len();
    let row_step = lines as f32 * size + tiled.row_gap.unwrap_or(size);
    let column_step = widest + tiled.column_gap;
    let mut out = Vec::with_capacity(tiled.rows * tiled.columns * lines);
    for row in 0..tiled.rows.max(1) {
        let top = origin[1] - row as f32 * row_step;
        for column in 0..tiled.columns.max(1) {
            let x = origin[0] + column as f32 * column_step;
            out.extend((0..lines).map(|k| (x, top - k as f32 * size)));
        }
    }
    out
}

/// Draw `tiled` underneath page `page` and return the area it covers,
/// ignoring rotation.
pub(crate) fn draw_tiled<C: Canvas + ?Sized>(
    canvas: &mut C,
    page: usize,
    page_size: PageSize,
    tiled: &TiledText,
    inherited: &Inherited,
) -> Result<Rect> {
    if tiled.text.is_empty() {
        return Err(Error::InvalidStyle("tiled watermark has no text".into()));
    }
    let font = resolve_font(
        canvas.fonts_mut(),
        tiled.font.as_deref().unwrap_or(&inherited.font),
    );
    let size = tiled.font_size.unwrap_or(inherited.font_size);
    let color = tiled.color.unwrap_or(inherited.color);
    let widest = tiled
        .text
        .iter()
        .map(|line| canvas.string_width(font, size, line))
        .fold(0.0, f32::max);
    let origin = tiled.origin.unwrap_or([0.0, page_size.height - size]);
    let spots = baselines(tiled, origin, size, widest);

    let cap = canvas.cap_height(font, size);
    scoped(canvas, page, StreamMode::Prepend, |s| {
        if tiled.opacity < 1.0 {
            s.set_opacity(tiled.opacity);
        }
        let lines = tiled.text.iter().cycle();
        for (&(x, y), text) in spots.iter().zip(lines) {
            s.draw_rotated_text(font, size, x, y, tiled.angle, text.as_str(), color);
        }
        Ok(())
    })?;
    log::debug!(
        "WATERMARK page={page} lines={} angle={:.1} opacity={:.2}",
        spots.len(),
        tiled.angle,
        tiled.opacity
    );

    let right = spots.iter().map(|&(x, _)| x).fold(origin[0], f32::max) + widest;
    let bottom = spots.iter().map(|&(_, y)| y).fold(origin[1], f32::min);
    let top = origin[1] + cap;
    Ok(Rect::new(origin[0], bottom, right - origin[0], top - bottom))
}
