use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::fonts::FontBook;
use crate::model::{ImageSource, PageSize};

use super::canvas::{Canvas, ContentStream, DrawOp, ImageHandle, StreamLedger, StreamMode};

/// A closed content stream as the recording canvas kept it.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedStream {
    pub mode: StreamMode,
    pub reset_graphics: bool,
    pub ops: Vec<DrawOp>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedPage {
    pub size: PageSize,
    /// Streams in the order they were closed.
    pub streams: Vec<RecordedStream>,
}

impl RecordedPage {
    /// Operations in the order they would be painted: prepended streams
    /// (latest first), then appended streams.
    pub fn painted_ops(&self) -> Vec<&DrawOp> {
        let under = self
            .streams
            .iter()
            .rev()
            .filter(|s| s.mode == StreamMode::Prepend);
        let over = self.streams.iter().filter(|s| s.mode == StreamMode::Append);
        under.chain(over).flat_map(|s| s.ops.iter()).collect()
    }

    /// `(text, x, y)` of every text op, in paint order.
    pub fn texts(&self) -> Vec<(&str, f32, f32)> {
        self.painted_ops()
            .into_iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, x, y, .. } => Some((text.as_str(), *x, *y)),
                _ => None,
            })
            .collect()
    }

    /// Stroked straight segments as `((x1, y1), (x2, y2))`.
    pub fn segments(&self) -> Vec<((f32, f32), (f32, f32))> {
        let mut out = Vec::new();
        for stream in &self.streams {
            let mut at = None;
            for op in &stream.ops {
                match *op {
                    DrawOp::MoveTo { x, y } => at = Some((x, y)),
                    DrawOp::LineTo { x, y } => {
                        if let Some(from) = at {
                            out.push((from, (x, y)));
                        }
                        at = Some((x, y));
                    }
                    _ => {}
                }
            }
        }
        out
    }
}

/// Output of [`RecordingCanvas`].
pub struct Recording {
    pub pages: Vec<RecordedPage>,
    pub images: Vec<ImageSource>,
    pub fonts: FontBook,
}

impl Recording {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn stream_count(&self) -> usize {
        self.pages.iter().map(|p| p.streams.len()).sum()
    }
}

/// Canvas that keeps every stream as a display list in memory.
#[derive(Default)]
pub struct RecordingCanvas {
    fonts: FontBook,
    pages: Vec<RecordedPage>,
    images: Vec<ImageSource>,
    image_ids: HashMap<usize, ImageHandle>,
    ledger: StreamLedger,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[RecordedPage] {
        &self.pages
    }
}

impl Canvas for RecordingCanvas {
    type Output = Recording;

    fn begin_page(&mut self, size: PageSize) -> usize {
        self.pages.push(RecordedPage {
            size,
            streams: Vec::new(),
        });
        self.ledger.add_page()
    }

    fn open_stream(
        &mut self,
        page: usize,
        mode: StreamMode,
        reset_graphics: bool,
    ) -> Result<ContentStream> {
        self.ledger.acquire(page)?;
        Ok(ContentStream::new(page, mode, reset_graphics))
    }

    fn close_stream(&mut self, stream: ContentStream) -> Result<()> {
        let page = stream.page();
        self.ledger.release(page)?;
        let recorded = RecordedStream {
            mode: stream.mode(),
            reset_graphics: stream.reset_graphics(),
            ops: stream.into_ops(),
        };
        self.pages[page].streams.push(recorded);
        Ok(())
    }

    fn register_image(&mut self, image: &ImageSource) -> Result<ImageHandle> {
        let key = Arc::as_ptr(&image.data) as *const u8 as usize;
        if let Some(&handle) = self.image_ids.get(&key) {
            return Ok(handle);
        }
        let handle = ImageHandle(self.images.len());
        self.images.push(image.clone());
        self.image_ids.insert(key, handle);
        Ok(handle)
    }

    fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    fn fonts_mut(&mut self) -> &mut FontBook {
        &mut self.fonts
    }

    fn finish(self) -> Result<Recording> {
        if let Some(page) = self.ledger.busy() {
            return Err(Error::StreamBusy(page));
        }
        Ok(Recording {
            pages: self.pages,
            images: self.images,
            fonts: self.fonts,
        })
    }
}
