//! Public composition API.
//!
//! A [`Document`] owns a canvas and the page list. Components are appended
//! top to bottom; pages are created as content overflows and each new page
//! gets the configured watermark, header and footer.

use std::path::Path;

use crate::error::{Error, Result};
use crate::fonts::FontId;
use crate::model::{
    Component, ContentMode, DocumentConfig, Margins, PageOptions, Placement, Row, Table, Watermark,
};
use crate::pdf::{
    Canvas, Cursor, Measured, Page, PageState, Paginator, PdfCanvas, RecordingCanvas, StreamMode,
    TableRun, TextBlock, draw, measure, place_on_page, scoped,
};

pub struct Document<C: Canvas> {
    canvas: C,
    pager: Paginator,
    table: Option<TableRun>,
}

impl Document<PdfCanvas> {
    /// Document that serializes to PDF bytes.
    pub fn pdf(config: DocumentConfig) -> Self {
        Self::new(PdfCanvas::new(), config)
    }
}

impl Document<RecordingCanvas> {
    /// Document that records display lists instead of writing PDF.
    pub fn recording(config: DocumentConfig) -> Self {
        Self::new(RecordingCanvas::new(), config)
    }
}

impl<C: Canvas> Document<C> {
    pub fn new(canvas: C, config: DocumentConfig) -> Self {
        Self {
            canvas,
            pager: Paginator::new(config),
            table: None,
        }
    }

    pub fn config(&self) -> &DocumentConfig {
        self.pager.config()
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn register_font(&mut self, name: &str, path: &Path) -> Result<FontId> {
        self.canvas.register_font(name, path)
    }

    pub fn register_font_bytes(&mut self, name: &str, data: Vec<u8>) -> Result<FontId> {
        self.canvas.fonts_mut().register_bytes(name, data)
    }

    /// Header drawn at the top of every page that allows one. Its band height
    /// is measured once and reserved above the body.
    pub fn set_header(&mut self, header: impl Into<Component>) {
        self.pager.set_header(Some(header.into()));
    }

    /// Footer drawn at the bottom of every page that allows one, when the page
    /// is closed.
    pub fn set_footer(&mut self, footer: impl Into<Component>) {
        self.pager.set_footer(Some(footer.into()));
    }

    /// Drawn on every page that allows a watermark, when the page opens:
    /// either a component aligned in the content area or a [`TiledText`]
    /// grid over the whole page.
    ///
    /// [`TiledText`]: crate::model::TiledText
    pub fn set_watermark(&mut self, watermark: impl Into<Watermark>) {
        self.pager.set_watermark(Some(watermark.into()));
    }

    pub fn clear_decorations(&mut self) {
        self.pager.set_header(None);
        self.pager.set_footer(None);
        self.pager.set_watermark(None);
    }

    /// Close the current page and start a new one with the default options.
    pub fn new_page(&mut self) -> Result<usize> {
        let options = self.pager.config().page_options;
        self.new_page_with(options)
    }

    pub fn new_page_with(&mut self, options: PageOptions) -> Result<usize> {
        self.pager.new_page(&mut self.canvas, options)
    }

    pub fn current_cursor(&self) -> Option<Cursor> {
        self.pager.active().map(|p| *p.cursor())
    }

    /// Height left in the active page's body. Before the first page this is
    /// the body height the first page will get.
    pub fn remaining_height(&mut self) -> Result<f32> {
        match self.pager.active() {
            Some(page) => Ok(page.cursor().remaining()),
            None => self.pager.fresh_body_height(&mut self.canvas),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pager.pages().len()
    }

    pub fn pages(&self) -> &[Page] {
        self.pager.pages()
    }

    /// Append a component to the active page, opening pages as needed.
    pub fn append(&mut self, component: impl Into<Component>) -> Result<()> {
        let component = component.into();
        if let Component::Table(table) = component {
            self.begin_table(table)?;
            return self.end_table();
        }
        self.place(&component)
    }

    /// Append to a specific page. Only the active page accepts content.
    pub fn append_to(&mut self, page: usize, component: impl Into<Component>) -> Result<()> {
        match self.pager.page(page)?.state() {
            PageState::Closed => Err(Error::PageClosed(page)),
            PageState::Active | PageState::Overflowing => self.append(component),
        }
    }

    /// Start streaming a table; rows already in `table` are drawn right away.
    /// An open table is ended first.
    pub fn begin_table(&mut self, mut table: Table) -> Result<()> {
        if self.table.is_some() {
            self.end_table()?;
        }
        let rows = std::mem::take(&mut table.rows);
        let mut run = TableRun::new(&table);
        for row in rows {
            run.add_row(&mut self.pager, &mut self.canvas, row)?;
        }
        self.table = Some(run);
        Ok(())
    }

    pub fn add_row(&mut self, row: Row) -> Result<()> {
        let run = self.table.as_mut().ok_or(Error::NoTableOpen)?;
        run.add_row(&mut self.pager, &mut self.canvas, row)
    }

    pub fn end_table(&mut self) -> Result<()> {
        let run = self.table.take().ok_or(Error::NoTableOpen)?;
        log::debug!("TABLE end rows={}", run.rows_drawn());
        run.end(&mut self.pager)
    }

    /// Close the last page and serialize.
    pub fn finish(mut self) -> Result<C::Output> {
        if self.table.is_some() {
            self.end_table()?;
        }
        self.pager.finalize_active(&mut self.canvas)?;
        self.canvas.finish()
    }

    fn place(&mut self, component: &Component) -> Result<()> {
        let page = self.pager.ensure_page(&mut self.canvas)?;
        let placement = *component.placement();
        let avail = self.pager.page(page)?.body().width - placement.margins.horizontal();
        let inherited = self.pager.inherited().clone();
        let measured = measure(
            &mut self.canvas,
            component,
            avail,
            &inherited,
            self.pager.defaults(),
        )?;

        let flows = placement.position.is_none() && placement.mode != ContentMode::Overlay;
        if !flows {
            return self.draw_at(page, component, &placement, &measured);
        }

        let needed = measured.height() + placement.margins.vertical();
        let splits = match &measured {
            Measured::Text(block) if block.fixed_height.is_none() => {
                needed > self.pager.fresh_body_height(&mut self.canvas)?
            }
            _ => false,
        };
        match measured {
            Measured::Text(block) if splits => self.split_text(component, block, placement),
            measured => {
                let page = self.pager.fit(&mut self.canvas, needed)?;
                self.draw_at(page, component, &placement, &measured)
            }
        }
    }

    /// Flow text taller than a whole page body, breaking between lines.
    fn split_text(
        &mut self,
        component: &Component,
        mut block: TextBlock,
        placement: Placement,
    ) -> Result<()> {
        let total = block.lines.len();
        let mut first = true;
        while !block.lines.is_empty() {
            let page = self.pager.ensure_page(&mut self.canvas)?;
            let cursor = *self.pager.page(page)?.cursor();
            let top = if first { placement.margins.top } else { 0.0 };
            let usable = cursor.remaining() - top;
            let mut n = ((usable + 1e-3) / block.leading).floor().max(0.0) as usize;
            if n == 0 {
                if !cursor.is_at_top() {
                    self.pager.turn_page(&mut self.canvas)?;
                    continue;
                }
                n = 1;
            }
            let chunk = block.take_lines(n);
            let last = block.lines.is_empty();
            let chunk_placement = Placement {
                margins: Margins {
                    top,
                    bottom: if last { placement.margins.bottom } else { 0.0 },
                    ..placement.margins
                },
                ..placement
            };
            log::debug!(
                "TEXT split page={page} lines={}/{total} remaining={:.2}",
                chunk.lines.len(),
                cursor.remaining()
            );
            self.draw_at(page, component, &chunk_placement, &Measured::Text(chunk))?;
            first = false;
            if !last {
                self.pager.turn_page(&mut self.canvas)?;
            }
        }
        Ok(())
    }

    fn draw_at(
        &mut self,
        page: usize,
        component: &Component,
        placement: &Placement,
        measured: &Measured,
    ) -> Result<()> {
        let body = self.pager.page(page)?.body();
        let styles = self.pager.inherited().styles();
        let placed = place_on_page(
            self.pager.cursor_mut(page)?,
            body,
            placement,
            (measured.width(), measured.height()),
            measured.baseline(),
            styles,
        )?;
        let mode = match placement.mode {
            ContentMode::Prepend => StreamMode::Prepend,
            ContentMode::Append | ContentMode::Overlay => StreamMode::Append,
        };
        scoped(&mut self.canvas, page, mode, |s| draw(s, measured, &placed))?;
        log::debug!(
            "PLACE {:?} page={page} x={:.2} top={:.2} h={:.2}",
            component.kind(),
            placed.x,
            placed.top,
            placed.height
        );
        self.pager.record(page, component.kind(), placed.rect());
        Ok(())
    }
}
