use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::Error;

pub type Color = [u8; 3]; // RGB

pub const BLACK: Color = [0, 0, 0];

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub const ZERO: Margins = Margins {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    pub fn uniform(v: f32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct PageSize {
    pub width: f32,  // points
    pub height: f32, // points
}

impl PageSize {
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::A4
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalStyle {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalStyle {
    Top,
    Center,
    Bottom,
}

/// Whether drawing a component consumes space on the page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// Drawn on top of existing content; advances the cursor.
    #[default]
    Append,
    /// Drawn underneath existing content; advances the cursor of its frame.
    Prepend,
    /// Drawn on top without touching the cursor.
    Overlay,
}

/// Immutable placement parameters shared by every component kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Placement {
    pub margins: Margins,
    pub horizontal: Option<HorizontalStyle>,
    pub vertical: Option<VerticalStyle>,
    pub mode: ContentMode,
    /// Absolute top-left corner; bypasses style alignment and the cursor.
    pub position: Option<[f32; 2]>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed { segment: f32, gap: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Top, Edge::Bottom, Edge::Left, Edge::Right];

    pub fn name(self) -> &'static str {
        match self {
            Edge::Top => "top",
            Edge::Right => "right",
            Edge::Bottom => "bottom",
            Edge::Left => "left",
        }
    }
}

/// One value per rectangle edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Edges<T> {
    pub top: T,
    pub right: T,
    pub bottom: T,
    pub left: T,
}

impl<T: Copy> Edges<T> {
    pub fn all(v: T) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn get(&self, edge: Edge) -> T {
        match edge {
            Edge::Top => self.top,
            Edge::Right => self.right,
            Edge::Bottom => self.bottom,
            Edge::Left => self.left,
        }
    }
}

/// Inheritable table/row/cell parameters. Unset fields fall through to the
/// enclosing row, then the table, then the document defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CellStyle {
    /// Toggles all four edges; a per-edge flag in `edges` wins over it.
    pub border: Option<bool>,
    pub edges: Edges<Option<bool>>,
    /// Color for all four edges; a per-edge color in `edge_colors` wins over it.
    pub border_color: Option<Color>,
    pub edge_colors: Edges<Option<Color>>,
    pub border_width: Option<f32>,
    pub border_style: Option<BorderStyle>,
    pub background: Option<Color>,
    pub padding: Option<Margins>,
    pub font: Option<String>,
    pub font_size: Option<f32>,
    pub font_color: Option<Color>,
    pub horizontal: Option<HorizontalStyle>,
    pub vertical: Option<VerticalStyle>,
}

impl CellStyle {
    pub(crate) fn edge_enabled(&self, edge: Edge) -> Option<bool> {
        self.edges.get(edge).or(self.border)
    }

    pub(crate) fn edge_color(&self, edge: Edge) -> Option<Color> {
        self.edge_colors.get(edge).or(self.border_color)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub font_size: Option<f32>,
    /// Distance between consecutive baselines; defaults to 1.2 × font size.
    #[serde(default)]
    pub leading: Option<f32>,
    #[serde(default)]
    pub color: Option<Color>,
    /// Wrapping width; defaults to the available width.
    #[serde(default)]
    pub width: Option<f32>,
    /// Fixed box height. Fixed-height text never splits across pages.
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(flatten)]
    pub placement: Placement,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: None,
            font_size: None,
            leading: None,
            color: None,
            width: None,
            height: None,
            placement: Placement::default(),
        }
    }

    pub fn font(mut self, name: impl Into<String>) -> Self {
        self.font = Some(name.into());
        self
    }

    pub fn font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn leading(mut self, leading: f32) -> Self {
        self.leading = Some(leading);
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: f32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// Encoded image bytes plus the header facts layout needs.
/// Cloning is cheap; clones share the same buffer.
#[derive(Clone, Debug)]
pub struct ImageSource {
    pub data: Arc<[u8]>,
    pub format: ImageFormat,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl ImageSource {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, Error> {
        let format = match image::guess_format(&data)? {
            image::ImageFormat::Png => ImageFormat::Png,
            image::ImageFormat::Jpeg => ImageFormat::Jpeg,
            other => {
                return Err(Error::Image(format!("unsupported image format {other:?}")));
            }
        };
        let (pixel_width, pixel_height) =
            image::ImageReader::new(std::io::Cursor::new(data.as_slice()))
                .with_guessed_format()?
                .into_dimensions()?;
        Ok(Self {
            data: data.into(),
            format,
            pixel_width,
            pixel_height,
        })
    }

    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(data)
    }
}

impl PartialEq for ImageSource {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Image {
    #[serde(rename = "path")]
    #[serde(deserialize_with = "deserialize_image_source")]
    pub source: ImageSource,
    #[serde(default)]
    pub width: Option<f32>, // points
    #[serde(default)]
    pub height: Option<f32>, // points
    #[serde(flatten)]
    pub placement: Placement,
}

fn deserialize_image_source<'de, D>(deserializer: D) -> Result<ImageSource, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let path = PathBuf::deserialize(deserializer)?;
    ImageSource::from_path(&path).map_err(serde::de::Error::custom)
}

impl Image {
    pub fn new(source: ImageSource) -> Self {
        Self {
            source,
            width: None,
            height: None,
            placement: Placement::default(),
        }
    }

    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Display size in points, keeping the aspect ratio when one side is unset.
    pub fn display_size(&self) -> (f32, f32) {
        let pw = self.source.pixel_width.max(1) as f32;
        let ph = self.source.pixel_height.max(1) as f32;
        match (self.width, self.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, w * ph / pw),
            (None, Some(h)) => (h * pw / ph, h),
            (None, None) => (pw, ph),
        }
    }
}

/// A horizontal rule across the available width.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Line {
    #[serde(default)]
    pub length: Option<f32>,
    #[serde(default = "default_thickness")]
    pub thickness: f32,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub style: BorderStyle,
    #[serde(flatten)]
    pub placement: Placement,
}

fn default_thickness() -> f32 {
    1.0
}

impl Line {
    pub fn solid() -> Self {
        Self {
            length: None,
            thickness: 1.0,
            color: None,
            style: BorderStyle::Solid,
            placement: Placement::default(),
        }
    }

    pub fn dashed(segment: f32, gap: f32) -> Self {
        Self {
            style: BorderStyle::Dashed { segment, gap },
            ..Self::solid()
        }
    }

    pub fn thickness(mut self, thickness: f32) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn length(mut self, length: f32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Cell {
    pub width: Option<f32>,
    /// Fixed height; `None` sizes the cell to its content.
    pub height: Option<f32>,
    /// Number of table columns the cell covers.
    pub colspan: usize,
    pub components: Vec<Component>,
    pub style: CellStyle,
    /// Only used when the cell is placed on its own, outside a table.
    #[serde(flatten)]
    pub placement: Placement,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            colspan: 1,
            components: Vec::new(),
            style: CellStyle::default(),
            placement: Placement::default(),
        }
    }
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn colspan(mut self, columns: usize) -> Self {
        self.colspan = columns;
        self
    }

    /// Columns covered; a zero span counts as one.
    pub fn span(&self) -> usize {
        self.colspan.max(1)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new().component(Component::Text(Text::new(text)))
    }

    pub fn width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: f32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn style(mut self, style: CellStyle) -> Self {
        self.style = style;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Row {
    pub cells: Vec<Cell>,
    /// Minimum height; content taller than this grows the row.
    pub height: Option<f32>,
    pub style: CellStyle,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            height: None,
            style: CellStyle::default(),
        }
    }

    pub fn height(mut self, height: f32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn style(mut self, style: CellStyle) -> Self {
        self.style = style;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Table {
    /// Declared column widths; when empty the first row's cell widths are used.
    pub columns: Vec<f32>,
    pub rows: Vec<Row>,
    pub style: CellStyle,
    /// Repeat the first row at the top of every page the table spans.
    pub auto_title: bool,
    #[serde(flatten)]
    pub placement: Placement,
}

impl Table {
    pub fn new(columns: Vec<f32>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    pub fn row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    pub fn style(mut self, style: CellStyle) -> Self {
        self.style = style;
        self
    }

    pub fn auto_title(mut self, on: bool) -> Self {
        self.auto_title = on;
        self
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentKind {
    Text,
    Image,
    Line,
    Table,
    Cell,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Text(Text),
    Image(Image),
    Line(Line),
    Table(Table),
    Cell(Cell),
}

impl Component {
    pub fn placement(&self) -> &Placement {
        match self {
            Component::Text(t) => &t.placement,
            Component::Image(i) => &i.placement,
            Component::Line(l) => &l.placement,
            Component::Table(t) => &t.placement,
            Component::Cell(c) => &c.placement,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Text(_) => ComponentKind::Text,
            Component::Image(_) => ComponentKind::Image,
            Component::Line(_) => ComponentKind::Line,
            Component::Table(_) => ComponentKind::Table,
            Component::Cell(_) => ComponentKind::Cell,
        }
    }
}

impl From<Text> for Component {
    fn from(t: Text) -> Self {
        Component::Text(t)
    }
}

impl From<Image> for Component {
    fn from(i: Image) -> Self {
        Component::Image(i)
    }
}

impl From<Line> for Component {
    fn from(l: Line) -> Self {
        Component::Line(l)
    }
}

impl From<Table> for Component {
    fn from(t: Table) -> Self {
        Component::Table(t)
    }
}

impl From<Cell> for Component {
    fn from(c: Cell) -> Self {
        Component::Cell(c)
    }
}

/// Text repeated in a grid over the whole page, optionally rotated and
/// translucent.
///
/// Each tile stacks `text` one font size apart. Tiles in a row are
/// `column_gap` apart after the widest line; rows are `row_gap` apart after
/// the last line of a tile. A zero row or column count draws one.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TiledText {
    pub text: Vec<String>,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub color: Option<Color>,
    /// 0 (invisible) to 1 (opaque).
    #[serde(default = "opaque")]
    pub opacity: f32,
    /// Counter-clockwise rotation of every line in degrees, around its origin.
    #[serde(default)]
    pub angle: f32,
    #[serde(default = "single")]
    pub rows: usize,
    #[serde(default = "single")]
    pub columns: usize,
    #[serde(default = "default_column_gap")]
    pub column_gap: f32,
    /// Defaults to the font size.
    #[serde(default)]
    pub row_gap: Option<f32>,
    /// Baseline of the first line; defaults to the page's left edge, one
    /// font size below its top.
    #[serde(default)]
    pub origin: Option<[f32; 2]>,
}

fn opaque() -> f32 {
    1.0
}

fn single() -> usize {
    1
}

fn default_column_gap() -> f32 {
    50.0
}

impl TiledText {
    pub fn new<S: Into<String>>(text: impl IntoIterator<Item = S>) -> Self {
        Self {
            text: text.into_iter().map(Into::into).collect(),
            font: None,
            font_size: None,
            color: None,
            opacity: opaque(),
            angle: 0.0,
            rows: single(),
            columns: single(),
            column_gap: default_column_gap(),
            row_gap: None,
            origin: None,
        }
    }

    pub fn font(mut self, name: impl Into<String>) -> Self {
        self.font = Some(name.into());
        self
    }

    pub fn font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn angle(mut self, degrees: f32) -> Self {
        self.angle = degrees;
        self
    }

    pub fn grid(mut self, rows: usize, columns: usize) -> Self {
        self.rows = rows;
        self.columns = columns;
        self
    }

    pub fn gaps(mut self, column_gap: f32, row_gap: f32) -> Self {
        self.column_gap = column_gap;
        self.row_gap = Some(row_gap);
        self
    }

    pub fn origin(mut self, x: f32, y: f32) -> Self {
        self.origin = Some([x, y]);
        self
    }
}

/// What a page's watermark draws.
#[derive(Clone, Debug, PartialEq)]
pub enum Watermark {
    /// Any component, aligned in the page's content area.
    Component(Component),
    Tiled(TiledText),
}

impl From<Component> for Watermark {
    fn from(c: Component) -> Self {
        Watermark::Component(c)
    }
}

impl From<TiledText> for Watermark {
    fn from(t: TiledText) -> Self {
        Watermark::Tiled(t)
    }
}

impl From<Text> for Watermark {
    fn from(t: Text) -> Self {
        Watermark::Component(t.into())
    }
}

impl From<Image> for Watermark {
    fn from(i: Image) -> Self {
        Watermark::Component(i.into())
    }
}

impl From<Line> for Watermark {
    fn from(l: Line) -> Self {
        Watermark::Component(l.into())
    }
}

impl From<Cell> for Watermark {
    fn from(c: Cell) -> Self {
        Watermark::Component(c.into())
    }
}

impl From<Table> for Watermark {
    fn from(t: Table) -> Self {
        Watermark::Component(t.into())
    }
}

/// Which decorations a page receives (header, footer, watermark).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageOptions {
    pub allow_header: bool,
    pub allow_footer: bool,
    pub allow_watermark: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            allow_header: true,
            allow_footer: true,
            allow_watermark: true,
        }
    }
}

/// Document-wide fallbacks at the end of every inheritance chain.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub font: String,
    pub font_size: f32,
    pub color: Color,
    pub horizontal: Option<HorizontalStyle>,
    pub vertical: Option<VerticalStyle>,
    pub border_color: Option<Color>,
    pub border_width: f32,
    pub cell_padding: Margins,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            font: "Helvetica".to_string(),
            font_size: 12.0,
            color: BLACK,
            horizontal: Some(HorizontalStyle::Left),
            vertical: Some(VerticalStyle::Top),
            border_color: Some(BLACK),
            border_width: 1.0,
            cell_padding: Margins::ZERO,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub page_size: PageSize,
    pub margins: Margins,
    pub defaults: Defaults,
    pub page_options: PageOptions,
    /// Minimum header band height; the measured header wins if taller.
    pub header_height: Option<f32>,
    /// Minimum footer band height; the measured footer wins if taller.
    pub footer_height: Option<f32>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            margins: Margins::uniform(50.0),
            defaults: Defaults::default(),
            page_options: PageOptions::default(),
            header_height: None,
            footer_height: None,
        }
    }
}
