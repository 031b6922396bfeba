//! The drawing collaborator layout talks to.
//!
//! Layout never writes PDF operators itself. It asks a [`Canvas`] for a
//! [`ContentStream`] on a page, records drawing operations into it, and hands
//! it back. Only one stream may be open at a time.

use std::path::Path;

use crate::error::{Error, Result};
use crate::fonts::{FontBook, FontId};
use crate::model::{Color, ImageSource, PageSize};

use super::cursor::Rect;

/// Where a stream's content lands relative to what the page already holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamMode {
    /// Painted after (on top of) existing content.
    Append,
    /// Painted before (underneath) existing content.
    Prepend,
}

/// Image registered with a canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub usize);

/// One drawing operation inside a content stream.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    SetStroke {
        color: Color,
        width: f32,
    },
    MoveTo {
        x: f32,
        y: f32,
    },
    LineTo {
        x: f32,
        y: f32,
    },
    Stroke,
    FillRect {
        rect: Rect,
        color: Color,
    },
    /// Fill and stroke opacity for the rest of the stream.
    SetOpacity {
        alpha: f32,
    },
    /// Single line of text; `(x, y)` is the baseline origin and `angle` a
    /// counter-clockwise rotation around it in degrees.
    Text {
        font: FontId,
        size: f32,
        x: f32,
        y: f32,
        angle: f32,
        text: String,
        color: Color,
    },
    /// `(x, y)` is the image's bottom-left corner.
    Image {
        image: ImageHandle,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// Exclusive handle to a page's content while a component draws.
///
/// Obtained from [`Canvas::open_stream`] and given back with
/// [`Canvas::close_stream`]; the canvas refuses to open another stream while
/// this one is out.
#[derive(Debug)]
pub struct ContentStream {
    page: usize,
    mode: StreamMode,
    reset_graphics: bool,
    ops: Vec<DrawOp>,
}

impl ContentStream {
    pub(crate) fn new(page: usize, mode: StreamMode, reset_graphics: bool) -> Self {
        Self {
            page,
            mode,
            reset_graphics,
            ops: Vec::new(),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    /// Whether the stream is isolated from graphics state set by earlier streams.
    pub fn reset_graphics(&self) -> bool {
        self.reset_graphics
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub(crate) fn into_ops(self) -> Vec<DrawOp> {
        self.ops
    }

    pub fn draw_text(
        &mut self,
        font: FontId,
        size: f32,
        x: f32,
        y: f32,
        text: impl Into<String>,
        color: Color,
    ) {
        self.draw_rotated_text(font, size, x, y, 0.0, text, color);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_rotated_text(
        &mut self,
        font: FontId,
        size: f32,
        x: f32,
        y: f32,
        angle: f32,
        text: impl Into<String>,
        color: Color,
    ) {
        self.ops.push(DrawOp::Text {
            font,
            size,
            x,
            y,
            angle,
            text: text.into(),
            color,
        });
    }

    /// Clamped to `0..=1`.
    pub fn set_opacity(&mut self, alpha: f32) {
        self.ops.push(DrawOp::SetOpacity {
            alpha: alpha.clamp(0.0, 1.0),
        });
    }

    pub fn draw_image(&mut self, image: ImageHandle, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(DrawOp::Image {
            image,
            x,
            y,
            width,
            height,
        });
    }

    pub fn set_stroke(&mut self, color: Color, width: f32) {
        self.ops.push(DrawOp::SetStroke { color, width });
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.ops.push(DrawOp::MoveTo { x, y });
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.ops.push(DrawOp::LineTo { x, y });
    }

    pub fn stroke(&mut self) {
        self.ops.push(DrawOp::Stroke);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }
}

/// Page store plus font metrics; the low-level rendering backend.
pub trait Canvas {
    /// What [`Canvas::finish`] produces: PDF bytes, a recording, ...
    type Output;

    /// Create a page and return its index.
    fn begin_page(&mut self, size: PageSize) -> usize;

    /// Acquire the content stream of `page`.
    ///
    /// Fails with [`Error::StreamBusy`] while another stream is open and with
    /// [`Error::NoSuchPage`] for an index `begin_page` never returned.
    fn open_stream(
        &mut self,
        page: usize,
        mode: StreamMode,
        reset_graphics: bool,
    ) -> Result<ContentStream>;

    /// Flush a stream into its page.
    fn close_stream(&mut self, stream: ContentStream) -> Result<()>;

    /// Register encoded image data; registering the same source twice returns
    /// the same handle.
    fn register_image(&mut self, image: &ImageSource) -> Result<ImageHandle>;

    fn fonts(&self) -> &FontBook;

    fn fonts_mut(&mut self) -> &mut FontBook;

    /// Serialize every page.
    fn finish(self) -> Result<Self::Output>
    where
        Self: Sized;

    fn register_font(&mut self, name: &str, path: &Path) -> Result<FontId> {
        self.fonts_mut().register_file(name, path)
    }

    fn cap_height(&self, font: FontId, size: f32) -> f32 {
        self.fonts().cap_height(font, size)
    }

    fn ascent(&self, font: FontId, size: f32) -> f32 {
        self.fonts().ascent(font, size)
    }

    fn string_width(&self, font: FontId, size: f32, text: &str) -> f32 {
        self.fonts().string_width(font, size, text)
    }
}

/// Open a stream, run `draw`, and close the stream even when `draw` fails.
pub(crate) fn scoped<C, T>(
    canvas: &mut C,
    page: usize,
    mode: StreamMode,
    draw: impl FnOnce(&mut ContentStream) -> Result<T>,
) -> Result<T>
where
    C: Canvas + ?Sized,
{
    let mut stream = canvas.open_stream(page, mode, true)?;
    let out = draw(&mut stream);
    canvas.close_stream(stream)?;
    out
}

/// Bookkeeping shared by canvas implementations: page count and the one
/// stream that may be open.
#[derive(Debug, Default)]
pub(crate) struct StreamLedger {
    pages: usize,
    open: Option<usize>,
}

impl StreamLedger {
    pub(crate) fn add_page(&mut self) -> usize {
        self.pages += 1;
        self.pages - 1
    }

    pub(crate) fn acquire(&mut self, page: usize) -> Result<()> {
        if page >= self.pages {
            return Err(Error::NoSuchPage(page));
        }
        if let Some(busy) = self.open {
            return Err(Error::StreamBusy(busy));
        }
        self.open = Some(page);
        Ok(())
    }

    pub(crate) fn release(&mut self, page: usize) -> Result<()> {
        match self.open {
            Some(open) if open == page => {
                self.open = None;
                Ok(())
            }
            _ => Err(Error::NoSuchPage(page)),
        }
    }

    /// Page of the stream still open, if any.
    pub(crate) fn busy(&self) -> Option<usize> {
        self.open
    }
}
