//! Page lifecycle: opening pages with their decorations, deciding when
//! content no longer fits, and closing pages.

use crate::error::{Error, Result};
use crate::model::{
    Component, ComponentKind, ContentMode, Defaults, DocumentConfig, PageOptions, PageSize,
    Watermark,
};

use super::canvas::{Canvas, StreamMode, scoped};
use super::cursor::{Cursor, Rect};
use super::layout::{Inherited, draw, measure};
use super::placer::{Frame, PlacedBox, place_in_frame, resolve_styles};
use super::watermark::draw_tiled;

/// Slack allowed when comparing heights, so content that tiles a page exactly
/// is not pushed off it by rounding.
const FIT_EPSILON: f32 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageState {
    Active,
    /// The last fit check failed; the page is about to be closed.
    Overflowing,
    Closed,
}

/// A component already drawn on a page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedComponent {
    pub kind: ComponentKind,
    pub rect: Rect,
}

#[derive(Clone, Debug)]
pub struct Page {
    index: usize,
    size: PageSize,
    options: PageOptions,
    content: Rect,
    header_band: Option<Rect>,
    footer_band: Option<Rect>,
    body: Rect,
    cursor: Cursor,
    state: PageState,
    placed: Vec<PlacedComponent>,
}

impl Page {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> PageSize {
        self.size
    }

    pub fn options(&self) -> PageOptions {
        self.options
    }

    /// Page minus page margins.
    pub fn content(&self) -> Rect {
        self.content
    }

    pub fn header_band(&self) -> Option<Rect> {
        self.header_band
    }

    pub fn footer_band(&self) -> Option<Rect> {
        self.footer_band
    }

    /// Content rectangle minus the header and footer bands.
    pub fn body(&self) -> Rect {
        self.body
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn placed(&self) -> &[PlacedComponent] {
        &self.placed
    }

    /// True when `needed` points still fit above the bottom of the body;
    /// otherwise the page becomes `Overflowing`.
    pub(crate) fn check_fit(&mut self, needed: f32) -> bool {
        if self.cursor.remaining() + FIT_EPSILON >= needed {
            return true;
        }
        self.state = PageState::Overflowing;
        false
    }
}

#[derive(Clone, Debug, Default)]
struct Decorations {
    header: Option<Component>,
    footer: Option<Component>,
    watermark: Option<Watermark>,
}

/// Owns the page list and the page-level decorations.
pub(crate) struct Paginator {
    config: DocumentConfig,
    inherited: Inherited,
    pages: Vec<Page>,
    decorations: Decorations,
    header_height: Option<f32>,
    footer_height: Option<f32>,
}

impl Paginator {
    pub(crate) fn new(config: DocumentConfig) -> Self {
        Self {
            inherited: Inherited::from_defaults(&config.defaults),
            config,
            pages: Vec::new(),
            decorations: Decorations::default(),
            header_height: None,
            footer_height: None,
        }
    }

    pub(crate) fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub(crate) fn defaults(&self) -> &Defaults {
        &self.config.defaults
    }

    pub(crate) fn inherited(&self) -> &Inherited {
        &self.inherited
    }

    pub(crate) fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub(crate) fn page(&self, index: usize) -> Result<&Page> {
        self.pages.get(index).ok_or(Error::NoSuchPage(index))
    }

    /// The page still accepting content, if any.
    pub(crate) fn active(&self) -> Option<&Page> {
        self.pages.last().filter(|p| p.state != PageState::Closed)
    }

    pub(crate) fn cursor_mut(&mut self, index: usize) -> Result<&mut Cursor> {
        let page = self.pages.get_mut(index).ok_or(Error::NoSuchPage(index))?;
        if page.state == PageState::Closed {
            return Err(Error::PageClosed(index));
        }
        Ok(&mut page.cursor)
    }

    pub(crate) fn record(&mut self, index: usize, kind: ComponentKind, rect: Rect) {
        if let Some(page) = self.pages.get_mut(index) {
            page.placed.push(PlacedComponent { kind, rect });
        }
    }

    pub(crate) fn set_header(&mut self, header: Option<Component>) {
        self.decorations.header = header;
        self.header_height = None;
    }

    pub(crate) fn set_footer(&mut self, footer: Option<Component>) {
        self.decorations.footer = footer;
        self.footer_height = None;
    }

    pub(crate) fn set_watermark(&mut self, watermark: Option<Watermark>) {
        self.decorations.watermark = watermark;
    }

    fn content_rect(&self) -> Rect {
        let size = self.config.page_size;
        let m = &self.config.margins;
        Rect::new(0.0, 0.0, size.width, size.height).inset(m)
    }

    /// Band height of a decoration: its measured height plus margins, or the
    /// configured minimum when that is larger.
    fn band_height<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        component: &Component,
        minimum: Option<f32>,
    ) -> Result<f32> {
        let component = with_page_number(component, 1);
        let p = *component.placement();
        let avail = self.content_rect().width - p.margins.horizontal();
        let m = measure(canvas, &component, avail, &self.inherited, self.defaults())?;
        Ok((m.height() + p.margins.vertical()).max(minimum.unwrap_or(0.0)))
    }

    fn header_height<C: Canvas + ?Sized>(&mut self, canvas: &mut C) -> Result<f32> {
        if let Some(h) = self.header_height {
            return Ok(h);
        }
        let h = match &self.decorations.header {
            Some(header) => self.band_height(canvas, header, self.config.header_height)?,
            None => 0.0,
        };
        self.header_height = Some(h);
        Ok(h)
    }

    fn footer_height<C: Canvas + ?Sized>(&mut self, canvas: &mut C) -> Result<f32> {
        if let Some(h) = self.footer_height {
            return Ok(h);
        }
        let h = match &self.decorations.footer {
            Some(footer) => self.band_height(canvas, footer, self.config.footer_height)?,
            None => 0.0,
        };
        self.footer_height = Some(h);
        Ok(h)
    }

    fn bands<C: Canvas + ?Sized>(
        &mut self,
        canvas: &mut C,
        options: PageOptions,
    ) -> Result<(f32, f32)> {
        let header = if options.allow_header {
            self.header_height(canvas)?
        } else {
            0.0
        };
        let footer = if options.allow_footer {
            self.footer_height(canvas)?
        } else {
            0.0
        };
        Ok((header, footer))
    }

    /// Body height of a page opened with the default page options.
    pub(crate) fn fresh_body_height<C: Canvas + ?Sized>(&mut self, canvas: &mut C) -> Result<f32> {
        let (header, footer) = self.bands(canvas, self.config.page_options)?;
        Ok((self.content_rect().height - header - footer).max(0.0))
    }

    /// Index of the page accepting content, opening the first page on demand.
    pub(crate) fn ensure_page<C: Canvas + ?Sized>(&mut self, canvas: &mut C) -> Result<usize> {
        match self.pages.last() {
            Some(page) if page.state != PageState::Closed => Ok(page.index),
            Some(page) => Err(Error::PageClosed(page.index)),
            None => self.open_page(canvas, self.config.page_options),
        }
    }

    /// Make room for `needed` points, turning the page when they do not fit.
    ///
    /// A page with nothing on it is never turned: content taller than a
    /// whole body is placed at its top instead.
    pub(crate) fn fit<C: Canvas + ?Sized>(&mut self, canvas: &mut C, needed: f32) -> Result<usize> {
        let index = self.ensure_page(canvas)?;
        let page = &mut self.pages[index];
        if page.check_fit(needed) {
            return Ok(index);
        }
        if page.cursor.is_at_top() {
            log::warn!(
                "component of {needed:.1}pt exceeds the {:.1}pt body of page {index}",
                page.cursor.remaining()
            );
            page.state = PageState::Active;
            return Ok(index);
        }
        log::debug!(
            "PAGE overflow index={index} needed={needed:.2} remaining={:.2}",
            page.cursor.remaining()
        );
        self.turn_page(canvas)
    }

    /// Close the active page and open the next one.
    pub(crate) fn turn_page<C: Canvas + ?Sized>(&mut self, canvas: &mut C) -> Result<usize> {
        self.finalize_active(canvas)?;
        self.open_page(canvas, self.config.page_options)
    }

    /// Explicit page break with its own decoration flags.
    pub(crate) fn new_page<C: Canvas + ?Sized>(
        &mut self,
        canvas: &mut C,
        options: PageOptions,
    ) -> Result<usize> {
        self.finalize_active(canvas)?;
        self.open_page(canvas, options)
    }

    pub(crate) fn open_page<C: Canvas + ?Sized>(
        &mut self,
        canvas: &mut C,
        options: PageOptions,
    ) -> Result<usize> {
        let (header_h, footer_h) = self.bands(canvas, options)?;
        let index = canvas.begin_page(self.config.page_size);
        let content = self.content_rect();
        let header_band = (header_h > 0.0)
            .then(|| Rect::from_top(content.x, content.top(), content.width, header_h));
        let footer_band =
            (footer_h > 0.0).then(|| Rect::new(content.x, content.y, content.width, footer_h));
        let body = Rect::new(
            content.x,
            content.y + footer_h,
            content.width,
            (content.height - header_h - footer_h).max(0.0),
        );
        log::debug!(
            "PAGE open index={index} body_h={:.2} header_h={header_h:.2} footer_h={footer_h:.2}",
            body.height
        );
        self.pages.push(Page {
            index,
            size: self.config.page_size,
            options,
            content,
            header_band,
            footer_band,
            body,
            cursor: Cursor::new(body),
            state: PageState::Active,
            placed: Vec::new(),
        });

        if options.allow_watermark
            && let Some(watermark) = self.decorations.watermark.clone()
        {
            self.draw_watermark(canvas, index, &watermark, content)?;
        }
        if let (Some(band), Some(header)) = (header_band, self.decorations.header.clone()) {
            self.draw_band(canvas, index, &header, band)?;
        }
        Ok(index)
    }

    /// Draw the deferred footer and close the active page.
    pub(crate) fn finalize_active<C: Canvas + ?Sized>(&mut self, canvas: &mut C) -> Result<()> {
        let Some(page) = self.active() else {
            return Ok(());
        };
        let (index, footer_band) = (page.index, page.footer_band);
        if let (Some(band), Some(footer)) = (footer_band, self.decorations.footer.clone()) {
            self.draw_band(canvas, index, &footer, band)?;
        }
        if let Some(page) = self.pages.get_mut(index) {
            page.state = PageState::Closed;
        }
        log::debug!("PAGE close index={index}");
        Ok(())
    }

    fn draw_band<C: Canvas + ?Sized>(
        &mut self,
        canvas: &mut C,
        index: usize,
        component: &Component,
        band: Rect,
    ) -> Result<()> {
        let component = with_page_number(component, index + 1);
        let p = *component.placement();
        let avail = band.width - p.margins.horizontal();
        let m = measure(canvas, &component, avail, &self.inherited, self.defaults())?;
        let frame = Frame {
            area: band,
            reference_top: band.top() - p.margins.top,
            reference_height: band.height - p.margins.vertical(),
        };
        let styles = resolve_styles(&p, self.inherited.styles())?;
        let placed = place_in_frame(&frame, &p, styles, (m.width(), m.height()), m.baseline());
        scoped(canvas, index, StreamMode::Prepend, |s| draw(s, &m, &placed))?;
        self.record(index, component.kind(), placed.rect());
        Ok(())
    }

    fn draw_watermark<C: Canvas + ?Sized>(
        &mut self,
        canvas: &mut C,
        index: usize,
        watermark: &Watermark,
        area: Rect,
    ) -> Result<()> {
        let component = match watermark {
            Watermark::Component(component) => component,
            Watermark::Tiled(tiled) => {
                let page_size = self.config.page_size;
                let rect = draw_tiled(canvas, index, page_size, tiled, &self.inherited)?;
                self.record(index, ComponentKind::Text, rect);
                return Ok(());
            }
        };
        let component = with_page_number(component, index + 1);
        let p = *component.placement();
        let m = measure(
            canvas,
            &component,
            area.width - p.margins.horizontal(),
            &self.inherited,
            self.defaults(),
        )?;
        let placed = match p.position {
            Some([x, top]) => PlacedBox {
                x,
                y: top - m.baseline(),
                top,
                width: m.width(),
                height: m.height(),
            },
            None => {
                let styles = resolve_styles(&p, self.inherited.styles())?;
                place_in_frame(
                    &Frame::of(area),
                    &p,
                    styles,
                    (m.width(), m.height()),
                    m.baseline(),
                )
            }
        };
        let mode = match p.mode {
            ContentMode::Prepend => StreamMode::Prepend,
            ContentMode::Append | ContentMode::Overlay => StreamMode::Append,
        };
        scoped(canvas, index, mode, |s| draw(s, &m, &placed))?;
        self.record(index, component.kind(), placed.rect());
        Ok(())
    }
}

/// Copy of `component` with `{page}` replaced by `number` in every text.
pub(crate) fn with_page_number(component: &Component, number: usize) -> Component {
    let mut out = component.clone();
    substitute(&mut out, &number.to_string());
    out
}

fn substitute(component: &mut Component, number: &str) {
    match component {
        Component::Text(t) => {
            if t.text.contains("{page}") {
                t.text = t.text.replace("{page}", number);
            }
        }
        Component::Cell(cell) => {
            for c in &mut cell.components {
                substitute(c, number);
            }
        }
        Component::Table(table) => {
            for cell in table.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                for c in &mut cell.components {
                    substitute(c, number);
                }
            }
        }
        Component::Image(_) | Component::Line(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, Text};

    #[test]
    fn page_number_placeholder_reaches_nested_text() {
        let footer: Component = Cell::new()
            .component(Text::new("Page {page}").into())
            .into();
        let Component::Cell(cell) = with_page_number(&footer, 7) else {
            panic!("expected a cell");
        };
        assert_eq!(
            cell.components[0],
            Component::Text(Text::new("Page 7"))
        );
    }
}
