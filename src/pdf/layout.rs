use crate::error::{Error, Result};
use crate::fonts::{FontBook, FontId};
use crate::model::{
    BorderStyle, CellStyle, Color, Component, Defaults, HorizontalStyle, Text, VerticalStyle,
};

use super::border::stroke_run;
use super::canvas::{Canvas, ContentStream, ImageHandle};
use super::placer::PlacedBox;
use super::table::{self, CellBlock, TableBlock};

/// Text and alignment parameters a component picks up from its container.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Inherited {
    pub(crate) font: String,
    pub(crate) font_size: f32,
    pub(crate) color: Color,
    pub(crate) horizontal: Option<HorizontalStyle>,
    pub(crate) vertical: Option<VerticalStyle>,
}

impl Inherited {
    pub(crate) fn from_defaults(d: &Defaults) -> Self {
        Self {
            font: d.font.clone(),
            font_size: d.font_size,
            color: d.color,
            horizontal: d.horizontal,
            vertical: d.vertical,
        }
    }

    /// Override with whatever `style` sets.
    pub(crate) fn with(&self, style: &CellStyle) -> Self {
        Self {
            font: style.font.clone().unwrap_or_else(|| self.font.clone()),
            font_size: style.font_size.unwrap_or(self.font_size),
            color: style.font_color.unwrap_or(self.color),
            horizontal: style.horizontal.or(self.horizontal),
            vertical: style.vertical.or(self.vertical),
        }
    }

    pub(crate) fn styles(&self) -> (Option<HorizontalStyle>, Option<VerticalStyle>) {
        (self.horizontal, self.vertical)
    }
}

/// Resolve a font name, falling back to Helvetica for unknown names.
pub(crate) fn resolve_font(fonts: &mut FontBook, name: &str) -> FontId {
    match fonts.resolve(name) {
        Ok(id) => id,
        Err(e) => {
            log::warn!("{e}; using Helvetica");
            FontId::FALLBACK
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TextLine {
    pub(crate) text: String,
    pub(crate) width: f32,
}

/// Greedy word wrap. Explicit newlines always break; a word wider than
/// `max_width` gets a line of its own.
pub(crate) fn wrap_text(
    fonts: &FontBook,
    font: FontId,
    size: f32,
    text: &str,
    max_width: f32,
) -> Vec<TextLine> {
    let space_w = fonts.string_width(font, size, " ");
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_w = 0.0f32;
        for word in paragraph.split_whitespace() {
            let ww = fonts.string_width(font, size, word);
            if current.is_empty() {
                current.push_str(word);
                current_w = ww;
            } else if current_w + space_w + ww <= max_width + 0.01 {
                current.push(' ');
                current.push_str(word);
                current_w += space_w + ww;
            } else {
                lines.push(TextLine {
                    text: std::mem::take(&mut current),
                    width: current_w,
                });
                current.push_str(word);
                current_w = ww;
            }
        }
        lines.push(TextLine {
            text: current,
            width: current_w,
        });
    }
    lines
}

/// Wrapped text ready to draw.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TextBlock {
    pub(crate) lines: Vec<TextLine>,
    pub(crate) font: FontId,
    pub(crate) size: f32,
    pub(crate) leading: f32,
    pub(crate) ascent: f32,
    pub(crate) color: Color,
    pub(crate) width: f32,
    pub(crate) fixed_height: Option<f32>,
    pub(crate) align: HorizontalStyle,
}

impl TextBlock {
    pub(crate) fn height(&self) -> f32 {
        self.fixed_height
            .unwrap_or(self.lines.len() as f32 * self.leading)
    }

    /// Distance from the box top to the first baseline.
    pub(crate) fn baseline(&self) -> f32 {
        (self.leading - self.size) / 2.0 + self.ascent
    }

    /// Split off the first `n` lines into their own block.
    pub(crate) fn take_lines(&mut self, n: usize) -> TextBlock {
        let rest = self.lines.split_off(n.min(self.lines.len()));
        let head = std::mem::replace(&mut self.lines, rest);
        TextBlock {
            lines: head,
            ..self.clone()
        }
    }
}

fn measure_text<C: Canvas + ?Sized>(
    canvas: &mut C,
    text: &Text,
    avail_width: f32,
    inh: &Inherited,
) -> TextBlock {
    let font_name = text.font.as_deref().unwrap_or(&inh.font);
    let font = resolve_font(canvas.fonts_mut(), font_name);
    let size = text.font_size.unwrap_or(inh.font_size);
    let leading = text.leading.unwrap_or(size * 1.2);
    let wrap_w = text.width.unwrap_or(avail_width);
    let lines = wrap_text(canvas.fonts(), font, size, &text.text, wrap_w);
    let width = text
        .width
        .unwrap_or_else(|| lines.iter().map(|l| l.width).fold(0.0, f32::max));
    TextBlock {
        ascent: canvas.ascent(font, size),
        lines,
        font,
        size,
        leading,
        color: text.color.unwrap_or(inh.color),
        width,
        fixed_height: text.height,
        align: text
            .placement
            .horizontal
            .or(inh.horizontal)
            .unwrap_or(HorizontalStyle::Left),
    }
}

/// A component with every size resolved and every resource registered.
#[derive(Clone, Debug)]
pub(crate) enum Measured {
    Text(TextBlock),
    Image {
        handle: ImageHandle,
        width: f32,
        height: f32,
    },
    Line {
        length: f32,
        thickness: f32,
        color: Color,
        style: BorderStyle,
    },
    Cell(CellBlock),
    Table(TableBlock),
}

impl Measured {
    pub(crate) fn width(&self) -> f32 {
        match self {
            Measured::Text(t) => t.width,
            Measured::Image { width, .. } => *width,
            Measured::Line { length, .. } => *length,
            Measured::Cell(c) => c.width,
            Measured::Table(t) => t.width(),
        }
    }

    pub(crate) fn height(&self) -> f32 {
        match self {
            Measured::Text(t) => t.height(),
            Measured::Image { height, .. } => *height,
            Measured::Line { thickness, .. } => *thickness,
            Measured::Cell(c) => c.height,
            Measured::Table(t) => t.height(),
        }
    }

    /// Offset from the box top to the draw origin.
    pub(crate) fn baseline(&self) -> f32 {
        match self {
            Measured::Text(t) => t.baseline(),
            Measured::Image { height, .. } => *height,
            Measured::Line { thickness, .. } => thickness / 2.0,
            Measured::Cell(_) | Measured::Table(_) => 0.0,
        }
    }
}

/// Resolve sizes, fonts and images of `component` for a slot `avail_width` wide.
pub(crate) fn measure<C: Canvas + ?Sized>(
    canvas: &mut C,
    component: &Component,
    avail_width: f32,
    inh: &Inherited,
    defaults: &Defaults,
) -> Result<Measured> {
    let measured = match component {
        Component::Text(text) => Measured::Text(measure_text(canvas, text, avail_width, inh)),
        Component::Image(image) => {
            let (width, height) = image.display_size();
            if !(width > 0.0 && height > 0.0) {
                return Err(Error::InvalidStyle(format!(
                    "image size {width}x{height} is not positive"
                )));
            }
            Measured::Image {
                handle: canvas.register_image(&image.source)?,
                width,
                height,
            }
        }
        Component::Line(line) => Measured::Line {
            length: line.length.unwrap_or(avail_width),
            thickness: line.thickness,
            color: line.color.unwrap_or(inh.color),
            style: line.style,
        },
        Component::Cell(cell) => {
            let width = cell.width.unwrap_or(avail_width);
            let resolved = table::resolve_cell(&[&cell.style], defaults, inh)?;
            Measured::Cell(table::measure_cell(canvas, cell, width, resolved, defaults)?)
        }
        Component::Table(t) => Measured::Table(table::measure_table(canvas, t, defaults, inh)?),
    };
    Ok(measured)
}

/// Emit `m` into `stream` at `at`.
pub(crate) fn draw(stream: &mut ContentStream, m: &Measured, at: &PlacedBox) -> Result<()> {
    match m {
        Measured::Text(block) => {
            for (i, line) in block.lines.iter().enumerate() {
                if line.text.is_empty() {
                    continue;
                }
                let slack = at.width - line.width;
                let x = match block.align {
                    HorizontalStyle::Left => at.x,
                    HorizontalStyle::Center => at.x + slack / 2.0,
                    HorizontalStyle::Right => at.x + slack,
                };
                let y = at.y - i as f32 * block.leading;
                stream.draw_text(block.font, block.size, x, y, line.text.as_str(), block.color);
            }
        }
        Measured::Image {
            handle,
            width,
            height,
        } => stream.draw_image(*handle, at.x, at.y, *width, *height),
        Measured::Line {
            length,
            thickness,
            color,
            style,
        } => {
            stream.set_stroke(*color, *thickness);
            stroke_run(stream, (at.x, at.y), (at.x + length, at.y), style)?;
        }
        Measured::Cell(cell) => table::draw_cell(stream, cell, at.x, at.top, at.height)?,
        Measured::Table(t) => table::draw_table(stream, t, at.x, at.top)?,
    }
    Ok(())
}
