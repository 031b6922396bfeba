mod common;

use common::{approx, config, labelled_row, recording, row, table};
use pagesetter_pdf::{
    BorderStyle, Cell, CellStyle, ComponentKind, DrawOp, Error, Margins, Placement, Row, Table,
    Text,
};

#[test]
fn twenty_rows_flow_over_three_pages() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    let mut t = table(3, 100.0);
    for _ in 0..20 {
        t = t.row(row(3, 100.0, 50.0));
    }
    doc.append(t).unwrap();
    assert_eq!(doc.page_count(), 3);

    let rows_on = |p: usize| {
        doc.pages()[p]
            .placed()
            .iter()
            .filter(|c| c.kind == ComponentKind::Table)
            .count()
    };
    assert_eq!((rows_on(0), rows_on(1), rows_on(2)), (8, 8, 4));

    // row 9 opens page 2 at the top of the body
    let ninth = doc.pages()[1].placed()[0];
    assert!(approx(ninth.rect.top(), 450.0));
    assert!(approx(ninth.rect.height, 50.0));
}

#[test]
fn streamed_rows_match_a_whole_table() {
    let mut whole = recording(config(500.0, 500.0, 50.0));
    let mut t = table(2, 150.0);
    for _ in 0..11 {
        t = t.row(row(2, 150.0, 60.0));
    }
    whole.append(t).unwrap();

    let mut streamed = recording(config(500.0, 500.0, 50.0));
    streamed.begin_table(table(2, 150.0)).unwrap();
    for _ in 0..11 {
        streamed.add_row(row(2, 150.0, 60.0)).unwrap();
    }
    streamed.end_table().unwrap();

    assert_eq!(whole.page_count(), 2);
    assert_eq!(streamed.page_count(), 2);
    assert_eq!(
        whole.pages()[1].placed().len(),
        streamed.pages()[1].placed().len()
    );
}

#[test]
fn row_taller_than_a_page_fails_before_drawing() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    let err = doc
        .append(table(2, 100.0).row(row(2, 100.0, 450.0)))
        .unwrap_err();
    assert!(
        matches!(err, Error::RowTooTall { row: 0, .. }),
        "unexpected error: {err}"
    );
    assert_eq!(doc.page_count(), 0);
}

#[test]
fn table_top_margin_counts_against_the_first_row() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    let spaced = Placement {
        margins: Margins::new(10.0, 0.0, 0.0, 0.0),
        ..Placement::default()
    };
    let err = doc
        .append(table(1, 100.0).placement(spaced).row(row(1, 100.0, 395.0)))
        .unwrap_err();
    match err {
        Error::RowTooTall {
            row: 0, available, ..
        } => assert!(approx(available, 390.0)),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(doc.page_count(), 0);

    doc.append(table(1, 100.0).placement(spaced).row(row(1, 100.0, 390.0)))
        .unwrap();
    let placed = doc.pages()[0].placed()[0];
    assert!(approx(placed.rect.bottom(), 50.0));
}

#[test]
fn oversized_row_mid_table_leaves_pages_untouched() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    doc.begin_table(table(2, 100.0)).unwrap();
    for _ in 0..3 {
        doc.add_row(row(2, 100.0, 50.0)).unwrap();
    }
    let streams = doc.canvas().pages()[0].streams.len();
    assert_eq!(streams, 6);

    let err = doc.add_row(row(2, 100.0, 450.0)).unwrap_err();
    assert!(
        matches!(err, Error::RowTooTall { row: 3, .. }),
        "unexpected error: {err}"
    );
    assert_eq!(doc.page_count(), 1);
    assert_eq!(doc.canvas().pages().len(), 1);
    assert_eq!(doc.canvas().pages()[0].streams.len(), streams);
    assert_eq!(doc.pages()[0].placed().len(), 3);
    assert!(approx(doc.remaining_height().unwrap(), 250.0));

    // the table stays open for rows that fit
    doc.add_row(row(2, 100.0, 50.0)).unwrap();
    doc.end_table().unwrap();
    let out = doc.finish().unwrap();
    assert_eq!(out.stream_count(), 8);
}

#[test]
fn spanning_cell_covers_its_columns() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    let t = table(3, 60.0)
        .row(Row::new(vec![Cell::text("wide").colspan(2), Cell::text("c0")]).height(20.0))
        .row(labelled_row(&["a", "b", "c1"], 60.0).height(20.0));
    doc.append(t).unwrap();

    let bad = table(3, 60.0).row(Row::new(vec![
        Cell::text("x").colspan(2),
        Cell::text("y"),
        Cell::text("z"),
    ]));
    let err = doc.append(bad).unwrap_err();
    assert!(
        matches!(
            err,
            Error::ColumnCountMismatch {
                row: 0,
                expected: 3,
                found: 4
            }
        ),
        "unexpected error: {err}"
    );

    let out = doc.finish().unwrap();
    let page = &out.pages[0];
    assert_eq!(page.streams.len(), 5);
    let x_of = |label: &str| {
        page.texts()
            .into_iter()
            .find(|(t, _, _)| *t == label)
            .map(|(_, x, _)| x)
            .unwrap()
    };
    assert!(approx(x_of("wide"), x_of("a")));
    assert!(approx(x_of("c0"), x_of("c1")));
    assert!(approx(x_of("c0") - x_of("wide"), 120.0));
}

#[test]
fn row_with_wrong_cell_count_is_rejected() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    doc.begin_table(table(3, 100.0)).unwrap();
    doc.add_row(row(3, 100.0, 20.0)).unwrap();
    let err = doc.add_row(row(2, 100.0, 20.0)).unwrap_err();
    assert!(
        matches!(
            err,
            Error::ColumnCountMismatch {
                row: 1,
                expected: 3,
                found: 2
            }
        ),
        "unexpected error: {err}"
    );
}

#[test]
fn columns_come_from_the_first_row() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    let t = Table::default()
        .row(Row::new(vec![Cell::new().width(80.0), Cell::new().width(120.0)]).height(20.0));
    doc.append(t).unwrap();
    assert!(approx(doc.pages()[0].placed()[0].rect.width, 200.0));

    let undeclared = Table::default().row(Row::new(vec![Cell::new()]));
    let err = doc.append(undeclared).unwrap_err();
    assert!(matches!(err, Error::InvalidStyle(_)), "{err}");
}

#[test]
fn row_calls_need_an_open_table() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    assert!(matches!(
        doc.add_row(row(1, 10.0, 10.0)),
        Err(Error::NoTableOpen)
    ));
    assert!(matches!(doc.end_table(), Err(Error::NoTableOpen)));
}

#[test]
fn title_row_repeats_on_each_page() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    let mut t = table(2, 100.0).auto_title(true);
    t = t.row(labelled_row(&["Name", "Qty"], 100.0).height(40.0));
    for i in 0..12 {
        let label = format!("item {i}");
        t = t.row(labelled_row(&[label.as_str(), "1"], 100.0).height(40.0));
    }
    doc.append(t).unwrap();
    let out = doc.finish().unwrap();
    assert_eq!(out.page_count(), 2);

    for page in &out.pages {
        let texts = page.texts();
        let name = texts
            .iter()
            .find(|(t, _, _)| *t == "Name")
            .expect("title on every page");
        // first text on the page is the title cell
        assert_eq!(texts[0].0, "Name");
        assert!(name.2 > 400.0);
    }
    let items = |p: usize| {
        out.pages[p]
            .texts()
            .iter()
            .filter(|(t, _, _)| t.starts_with("item"))
            .count()
    };
    // 400pt body: title + 9 rows, then title + 3 rows
    assert_eq!((items(0), items(1)), (9, 3));
}

#[test]
fn enabled_border_without_color_fails_before_drawing() {
    let mut cfg = config(500.0, 500.0, 50.0);
    cfg.defaults.border_color = None;
    let mut doc = recording(cfg);
    let bordered = CellStyle {
        border: Some(true),
        ..CellStyle::default()
    };
    let t = table(1, 100.0).row(row(1, 100.0, 20.0).style(bordered));
    let err = doc.append(t).unwrap_err();
    assert!(matches!(err, Error::MissingColor { .. }), "{err}");

    let out = doc.finish().unwrap();
    assert!(out.pages.iter().all(|p| p.streams.is_empty()));
}

#[test]
fn cell_layers_paint_background_content_border() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    let style = CellStyle {
        border: Some(true),
        background: Some([240, 240, 240]),
        border_style: Some(BorderStyle::Dashed {
            segment: 4.0,
            gap: 2.0,
        }),
        ..CellStyle::default()
    };
    let cell = Cell::new()
        .width(120.0)
        .style(style)
        .component(Text::new("inside").into());
    doc.append(table(1, 120.0).row(Row::new(vec![cell]).height(30.0)))
        .unwrap();
    let out = doc.finish().unwrap();

    let ops = out.pages[0].painted_ops();
    let fill = ops
        .iter()
        .position(|op| matches!(op, DrawOp::FillRect { .. }))
        .unwrap();
    let text = ops
        .iter()
        .position(|op| matches!(op, DrawOp::Text { .. }))
        .unwrap();
    let first_stroke = ops
        .iter()
        .position(|op| matches!(op, DrawOp::Stroke))
        .unwrap();
    assert!(fill < text && text < first_stroke);
    assert_eq!(out.pages[0].streams.len(), 1);
    assert!(out.pages[0].segments().len() > 4);
}

#[test]
fn table_margins_wrap_the_rows() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    let spaced = Placement {
        margins: Margins::new(10.0, 0.0, 25.0, 0.0),
        ..Placement::default()
    };
    let t = table(2, 50.0)
        .placement(spaced)
        .row(row(2, 50.0, 40.0))
        .row(row(2, 50.0, 40.0));
    doc.append(t).unwrap();
    assert!(approx(doc.pages()[0].placed()[0].rect.top(), 440.0));
    assert!(approx(doc.remaining_height().unwrap(), 400.0 - 10.0 - 80.0 - 25.0));
}
