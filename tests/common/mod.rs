#![allow(dead_code)]

use pagesetter_pdf::{
    Cell, Document, DocumentConfig, Margins, PageSize, RecordingCanvas, Row, Table, Text,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Page of `width` x `height` points with uniform margins and no decorations.
pub fn config(width: f32, height: f32, margin: f32) -> DocumentConfig {
    DocumentConfig {
        page_size: PageSize::new(width, height),
        margins: Margins::uniform(margin),
        ..DocumentConfig::default()
    }
}

pub fn recording(config: DocumentConfig) -> Document<RecordingCanvas> {
    init_logger();
    Document::recording(config)
}

/// A one-line text box with a fixed height.
pub fn block(label: &str, height: f32) -> Text {
    Text::new(label).height(height)
}

/// A row of `n` empty cells, each `width` wide, at least `height` tall.
pub fn row(n: usize, width: f32, height: f32) -> Row {
    Row::new((0..n).map(|_| Cell::new().width(width)).collect()).height(height)
}

pub fn labelled_row(labels: &[&str], width: f32) -> Row {
    Row::new(
        labels
            .iter()
            .map(|l| Cell::text(*l).width(width))
            .collect(),
    )
}

pub fn table(columns: usize, width: f32) -> Table {
    Table::new(vec![width; columns])
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.01
}
