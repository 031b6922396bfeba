use crate::error::{Error, Result};
use crate::model::{
    BorderStyle, Cell, CellStyle, ComponentKind, ContentMode, Defaults, Edge, Edges,
    HorizontalStyle, Margins, Placement, Row, Table, VerticalStyle,
};

use super::border::{BorderEdge, draw_border};
use super::canvas::{Canvas, ContentStream, StreamMode, scoped};
use super::cursor::Rect;
use super::layout::{Inherited, Measured, draw, measure};
use super::paginate::Paginator;
use super::placer::{PlacedBox, align_x};

/// Cell parameters after walking cell -> row -> table -> document defaults.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ResolvedCell {
    pub(crate) edges: Edges<BorderEdge>,
    pub(crate) border_style: BorderStyle,
    pub(crate) border_width: f32,
    pub(crate) background: Option<[u8; 3]>,
    pub(crate) padding: Margins,
    pub(crate) vertical: VerticalStyle,
    pub(crate) inherited: Inherited,
}

/// `levels` runs from the most specific style to the least specific.
pub(crate) fn resolve_cell(
    levels: &[&CellStyle],
    defaults: &Defaults,
    base: &Inherited,
) -> Result<ResolvedCell> {
    let inherited = levels.iter().rev().fold(base.clone(), |inh, s| inh.with(s));
    let mut edges = Edges::all(BorderEdge::NONE);
    for edge in Edge::ALL {
        let enabled = levels
            .iter()
            .find_map(|s| s.edge_enabled(edge))
            .unwrap_or(false);
        if !enabled {
            continue;
        }
        let color = levels
            .iter()
            .find_map(|s| s.edge_color(edge))
            .or(defaults.border_color)
            .ok_or(Error::MissingColor { edge: edge.name() })?;
        *edge_mut(&mut edges, edge) = BorderEdge::on(color);
    }
    let vertical = inherited
        .vertical
        .ok_or_else(|| Error::InvalidStyle("cell has no vertical style".into()))?;
    Ok(ResolvedCell {
        edges,
        border_style: levels
            .iter()
            .find_map(|s| s.border_style)
            .unwrap_or_default(),
        border_width: levels
            .iter()
            .find_map(|s| s.border_width)
            .unwrap_or(defaults.border_width),
        background: levels.iter().find_map(|s| s.background),
        padding: levels
            .iter()
            .find_map(|s| s.padding)
            .unwrap_or(defaults.cell_padding),
        vertical,
        inherited,
    })
}

fn edge_mut<T>(edges: &mut Edges<T>, edge: Edge) -> &mut T {
    match edge {
        Edge::Top => &mut edges.top,
        Edge::Right => &mut edges.right,
        Edge::Bottom => &mut edges.bottom,
        Edge::Left => &mut edges.left,
    }
}

#[derive(Clone, Debug)]
pub(crate) struct CellChild {
    measured: Measured,
    placement: Placement,
    horizontal: HorizontalStyle,
}

/// A measured cell: width first, then the height its stacked content needs.
#[derive(Clone, Debug)]
pub(crate) struct CellBlock {
    pub(crate) width: f32,
    pub(crate) height: f32,
    stack_height: f32,
    style: ResolvedCell,
    children: Vec<CellChild>,
}

pub(crate) fn measure_cell<C: Canvas + ?Sized>(
    canvas: &mut C,
    cell: &Cell,
    width: f32,
    style: ResolvedCell,
    defaults: &Defaults,
) -> Result<CellBlock> {
    let inner_w = (width - style.padding.horizontal()).max(0.0);
    let mut children = Vec::with_capacity(cell.components.len());
    let mut stack_height = 0.0f32;
    for component in &cell.components {
        let placement = *component.placement();
        let avail = (inner_w - placement.margins.horizontal()).max(0.0);
        let measured = measure(canvas, component, avail, &style.inherited, defaults)?;
        let horizontal = placement
            .horizontal
            .or(style.inherited.horizontal)
            .ok_or_else(|| Error::InvalidStyle("cell content has no horizontal style".into()))?;
        stack_height += measured.height() + placement.margins.vertical();
        children.push(CellChild {
            measured,
            placement,
            horizontal,
        });
    }
    let height = cell
        .height
        .unwrap_or(style.padding.vertical() + stack_height);
    Ok(CellBlock {
        width,
        height,
        stack_height,
        style,
        children,
    })
}

/// Background, then content, then border, inside a `height`-tall slot.
pub(crate) fn draw_cell(
    stream: &mut ContentStream,
    cell: &CellBlock,
    x: f32,
    top: f32,
    height: f32,
) -> Result<()> {
    let rect = Rect::from_top(x, top, cell.width, height);
    if let Some(color) = cell.style.background {
        stream.fill_rect(rect, color);
    }

    let inner = rect.inset(&cell.style.padding);
    let slack = (inner.height - cell.stack_height).max(0.0);
    let mut y = match cell.style.vertical {
        VerticalStyle::Top => inner.top(),
        VerticalStyle::Center => inner.top() - slack / 2.0,
        VerticalStyle::Bottom => inner.top() - slack,
    };
    for child in &cell.children {
        let m = &child.measured;
        let box_top = y - child.placement.margins.top;
        let placed = PlacedBox {
            x: align_x(inner, &child.placement, child.horizontal, m.width()),
            y: box_top - m.baseline(),
            top: box_top,
            width: m.width(),
            height: m.height(),
        };
        draw(stream, m, &placed)?;
        y -= m.height() + child.placement.margins.vertical();
    }

    draw_border(
        stream,
        rect,
        &cell.style.edges,
        &cell.style.border_style,
        cell.style.border_width,
    )
}

#[derive(Clone, Debug)]
pub(crate) struct RowBlock {
    pub(crate) height: f32,
    cells: Vec<CellBlock>,
}

/// Column widths: the declared ones, or else the first row's cell widths.
/// A first-row cell spanning `n` columns splits its width evenly over them.
pub(crate) fn resolve_columns(declared: &[f32], first: &Row) -> Result<Vec<f32>> {
    if !declared.is_empty() {
        return Ok(declared.to_vec());
    }
    let mut columns = Vec::with_capacity(first.cells.len());
    for (i, cell) in first.cells.iter().enumerate() {
        let width = cell
            .width
            .ok_or_else(|| Error::InvalidStyle(format!("cell {i} has no declared width")))?;
        let span = cell.span();
        columns.extend(std::iter::repeat_n(width / span as f32, span));
    }
    Ok(columns)
}

pub(crate) fn measure_row<C: Canvas + ?Sized>(
    canvas: &mut C,
    row: &Row,
    index: usize,
    columns: &[f32],
    table_style: &CellStyle,
    defaults: &Defaults,
    base: &Inherited,
) -> Result<RowBlock> {
    let spanned: usize = row.cells.iter().map(Cell::span).sum();
    if spanned != columns.len() {
        return Err(Error::ColumnCountMismatch {
            row: index,
            expected: columns.len(),
            found: spanned,
        });
    }
    let mut cells = Vec::with_capacity(row.cells.len());
    let mut grid_col = 0;
    for cell in &row.cells {
        let span = cell.span();
        let width: f32 = columns[grid_col..grid_col + span].iter().sum();
        grid_col += span;
        let style = resolve_cell(&[&cell.style, &row.style, table_style], defaults, base)?;
        cells.push(measure_cell(canvas, cell, width, style, defaults)?);
    }
    let content_h = cells.iter().map(|c| c.height).fold(0.0, f32::max);
    Ok(RowBlock {
        height: content_h.max(row.height.unwrap_or(0.0)),
        cells,
    })
}

/// A table drawn in one piece, as cell content or a decoration.
#[derive(Clone, Debug)]
pub(crate) struct TableBlock {
    columns: Vec<f32>,
    rows: Vec<RowBlock>,
}

impl TableBlock {
    pub(crate) fn width(&self) -> f32 {
        self.columns.iter().sum()
    }

    pub(crate) fn height(&self) -> f32 {
        self.rows.iter().map(|r| r.height).sum()
    }
}

pub(crate) fn measure_table<C: Canvas + ?Sized>(
    canvas: &mut C,
    table: &Table,
    defaults: &Defaults,
    base: &Inherited,
) -> Result<TableBlock> {
    let columns = match table.rows.first() {
        Some(first) => resolve_columns(&table.columns, first)?,
        None => table.columns.clone(),
    };
    let rows = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| measure_row(canvas, row, i, &columns, &table.style, defaults, base))
        .collect::<Result<Vec<_>>>()?;
    Ok(TableBlock { columns, rows })
}

pub(crate) fn draw_table(
    stream: &mut ContentStream,
    table: &TableBlock,
    x: f32,
    top: f32,
) -> Result<()> {
    let mut row_top = top;
    for row in &table.rows {
        let mut cell_x = x;
        for cell in &row.cells {
            draw_cell(stream, cell, cell_x, row_top, row.height)?;
            cell_x += cell.width;
        }
        row_top -= row.height;
    }
    Ok(())
}

/// A table being streamed onto pages one row at a time.
///
/// Only the title row is kept once a row has been drawn.
pub(crate) struct TableRun {
    columns: Vec<f32>,
    style: CellStyle,
    placement: Placement,
    auto_title: bool,
    title: Option<Row>,
    title_height: f32,
    rows: usize,
    last_page: Option<usize>,
}

impl TableRun {
    pub(crate) fn new(table: &Table) -> Self {
        Self {
            columns: table.columns.clone(),
            style: table.style.clone(),
            placement: table.placement,
            auto_title: table.auto_title,
            title: None,
            title_height: 0.0,
            rows: 0,
            last_page: None,
        }
    }

    pub(crate) fn rows_drawn(&self) -> usize {
        self.rows
    }

    /// Measure `row`, move to a new page if it does not fit, replay the title
    /// row when the table continues on a new page, then draw it.
    pub(crate) fn add_row<C: Canvas + ?Sized>(
        &mut self,
        pager: &mut Paginator,
        canvas: &mut C,
        row: Row,
    ) -> Result<()> {
        let index = self.rows;
        if index == 0 && self.columns.is_empty() {
            self.columns = resolve_columns(&[], &row)?;
        }
        let base = pager.inherited().clone();
        let block = measure_row(
            canvas,
            &row,
            index,
            &self.columns,
            &self.style,
            pager.defaults(),
            &base,
        )?;

        let title_h = if self.auto_title && index > 0 {
            self.title_height
        } else {
            0.0
        };
        let top_margin = if index == 0 {
            self.placement.margins.top
        } else {
            0.0
        };
        let available = pager.fresh_body_height(canvas)? - title_h - top_margin;
        if block.height > available + 1e-3 {
            return Err(Error::RowTooTall {
                row: index,
                height: block.height,
                available,
            });
        }

        let current = pager.ensure_page(canvas)?;
        let continues_here = self.last_page == Some(current);
        let mut replay = title_h > 0.0 && !continues_here;
        let needed = top_margin + block.height + if replay { title_h } else { 0.0 };
        let page = pager.fit(canvas, needed)?;
        if page != current {
            replay = title_h > 0.0;
        }
        if top_margin > 0.0 {
            pager.cursor_mut(page)?.advance(top_margin);
        }

        if replay && let Some(title) = self.title.clone() {
            let title_block = measure_row(
                canvas,
                &title,
                0,
                &self.columns,
                &self.style,
                pager.defaults(),
                &base,
            )?;
            log::debug!("TABLE title replay page={page}");
            self.draw_row(pager, canvas, page, &title_block)?;
        }
        self.draw_row(pager, canvas, page, &block)?;

        if index == 0 && self.auto_title {
            self.title_height = block.height;
            self.title = Some(row);
        }
        self.rows += 1;
        self.last_page = Some(page);
        Ok(())
    }

    fn draw_row<C: Canvas + ?Sized>(
        &self,
        pager: &mut Paginator,
        canvas: &mut C,
        page: usize,
        block: &RowBlock,
    ) -> Result<()> {
        let body = pager.page(page)?.body();
        let horizontal = self
            .placement
            .horizontal
            .or(pager.inherited().horizontal)
            .ok_or_else(|| Error::InvalidStyle("table has no horizontal style".into()))?;
        let width: f32 = self.columns.iter().sum();
        let x = align_x(body, &self.placement, horizontal, width);
        let top = pager.cursor_mut(page)?.y();
        let mode = match self.placement.mode {
            ContentMode::Prepend => StreamMode::Prepend,
            ContentMode::Append | ContentMode::Overlay => StreamMode::Append,
        };

        log::debug!(
            "TABLE row={} row_h={:.2} cells={} top={:.2}",
            self.rows,
            block.height,
            block.cells.len(),
            top
        );

        let mut cell_x = x;
        for cell in &block.cells {
            scoped(canvas, page, mode, |s| draw_cell(s, cell, cell_x, top, block.height))?;
            cell_x += cell.width;
        }
        pager.cursor_mut(page)?.advance(block.height);
        pager.record(
            page,
            ComponentKind::Table,
            Rect::from_top(x, top, width, block.height),
        );
        Ok(())
    }

    /// Consume the bottom margin after the last row.
    pub(crate) fn end(self, pager: &mut Paginator) -> Result<()> {
        if let Some(page) = self.last_page {
            pager.cursor_mut(page)?.advance(self.placement.margins.bottom);
        }
        Ok(())
    }
}
