mod common;

use common::{approx, block, config, recording};
use pagesetter_pdf::{
    Canvas, ComponentKind, ContentMode, DrawOp, Error, HorizontalStyle, PageOptions, PageSize,
    Placement, RecordingCanvas, StreamMode, Text, TiledText, VerticalStyle,
};

fn text_y(page: &pagesetter_pdf::RecordedPage, prefix: &str) -> f32 {
    page.texts()
        .into_iter()
        .find(|(t, _, _)| t.starts_with(prefix))
        .map(|(_, _, y)| y)
        .unwrap_or_else(|| panic!("no text starting with {prefix:?}"))
}

#[test]
fn header_and_footer_repeat_at_same_offsets() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    doc.set_header(Text::new("Quarterly report"));
    let right = Placement {
        horizontal: Some(HorizontalStyle::Right),
        ..Placement::default()
    };
    doc.set_footer(Text::new("Page {page}").placement(right));
    doc.append(block("one", 300.0)).unwrap();
    doc.append(block("two", 300.0)).unwrap();
    assert_eq!(doc.page_count(), 2);

    let first = &doc.pages()[0];
    let header = first.header_band().unwrap();
    assert!(approx(header.top(), 450.0));
    assert!(approx(first.body().top(), header.bottom()));
    assert!(approx(first.body().bottom(), first.footer_band().unwrap().top()));

    let out = doc.finish().unwrap();
    let (p1, p2) = (&out.pages[0], &out.pages[1]);
    assert_eq!(text_y(p1, "Quarterly"), text_y(p2, "Quarterly"));
    assert_eq!(text_y(p1, "Page"), text_y(p2, "Page"));
    assert!(p1.texts().iter().any(|(t, _, _)| *t == "Page 1"));
    assert!(p2.texts().iter().any(|(t, _, _)| *t == "Page 2"));
}

#[test]
fn configured_band_height_is_a_minimum() {
    let mut cfg = config(500.0, 500.0, 50.0);
    cfg.header_height = Some(40.0);
    let mut doc = recording(cfg);
    doc.set_header(Text::new("short"));
    doc.append(block("a", 10.0)).unwrap();
    assert!(approx(doc.pages()[0].body().height, 360.0));

    let mut cfg = config(500.0, 500.0, 50.0);
    cfg.header_height = Some(5.0);
    let mut doc = recording(cfg);
    doc.set_header(Text::new("short").font_size(10.0));
    doc.append(block("a", 10.0)).unwrap();
    assert!(approx(doc.pages()[0].body().height, 388.0));
}

#[test]
fn footer_is_drawn_when_page_closes() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    doc.set_footer(Text::new("{page}"));
    doc.append(block("a", 10.0)).unwrap();
    assert_eq!(doc.pages()[0].placed().len(), 1);

    doc.new_page().unwrap();
    assert_eq!(doc.pages()[0].placed().len(), 2);
}

#[test]
fn prepended_content_paints_under_earlier_content() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    doc.set_header(Text::new("header"));
    doc.append(Text::new("over")).unwrap();
    let under = Placement {
        mode: ContentMode::Prepend,
        ..Placement::default()
    };
    doc.append(Text::new("under").placement(under)).unwrap();

    let out = doc.finish().unwrap();
    let page = &out.pages[0];
    let order: Vec<&str> = page.texts().into_iter().map(|(t, _, _)| t).collect();
    assert_eq!(order, vec!["under", "header", "over"]);
    assert_eq!(page.streams[1].mode, StreamMode::Append);
    assert_eq!(page.streams[2].mode, StreamMode::Prepend);
    assert!(page.streams.iter().all(|s| s.reset_graphics));
}

#[test]
fn watermark_goes_on_pages_that_allow_it() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    let centered = Placement {
        horizontal: Some(HorizontalStyle::Center),
        vertical: Some(VerticalStyle::Center),
        mode: ContentMode::Prepend,
        ..Placement::default()
    };
    doc.set_watermark(Text::new("DRAFT").font_size(48.0).placement(centered));
    doc.append(block("a", 10.0)).unwrap();
    let mark = doc.pages()[0].placed()[0];
    assert_eq!(mark.kind, ComponentKind::Text);
    assert!(approx(mark.rect.x + mark.rect.width / 2.0, 250.0));
    assert!(approx(mark.rect.y + mark.rect.height / 2.0, 250.0));
    assert_eq!(doc.pages()[0].placed().len(), 2);

    doc.new_page_with(PageOptions {
        allow_watermark: false,
        ..PageOptions::default()
    })
    .unwrap();
    doc.append(block("b", 10.0)).unwrap();
    assert_eq!(doc.pages()[1].placed().len(), 1);
    doc.new_page().unwrap();

    let out = doc.finish().unwrap();
    let has_mark = |p: usize| out.pages[p].texts().iter().any(|(t, _, _)| *t == "DRAFT");
    assert!(has_mark(0));
    assert!(!has_mark(1));
    assert!(has_mark(2));
    assert_eq!(out.pages[0].streams[0].mode, StreamMode::Prepend);
}

#[test]
fn tiled_watermark_repeats_rotated_translucent_text() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    doc.set_watermark(
        TiledText::new(["CONFIDENTIAL", "copy 1"])
            .font_size(20.0)
            .angle(45.0)
            .opacity(0.25)
            .grid(3, 2),
    );
    doc.append(block("body", 10.0)).unwrap();

    // tiles are two 20pt lines plus a 20pt row gap, from a baseline at 480
    let mark = doc.pages()[0].placed()[0];
    assert_eq!(mark.kind, ComponentKind::Text);
    assert!(approx(mark.rect.x, 0.0));
    assert!(approx(mark.rect.y, 340.0));
    assert!(mark.rect.top() > 480.0);

    let out = doc.finish().unwrap();
    let page = &out.pages[0];
    let stream = &page.streams[0];
    assert_eq!(stream.mode, StreamMode::Prepend);
    assert_eq!(stream.ops[0], DrawOp::SetOpacity { alpha: 0.25 });
    let rotated = stream
        .ops
        .iter()
        .filter(|op| matches!(op, DrawOp::Text { angle, .. } if *angle == 45.0))
        .count();
    assert_eq!(rotated, 3 * 2 * 2);
    // body text paints over the watermark
    assert_eq!(page.texts().last().map(|t| t.0), Some("body"));
}

#[test]
fn tiled_watermark_without_text_is_rejected() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    doc.set_watermark(TiledText::new(Vec::<String>::new()));
    let err = doc.append(block("a", 10.0)).unwrap_err();
    assert!(matches!(err, Error::InvalidStyle(_)), "{err}");
}

#[test]
fn second_open_stream_is_refused() {
    let mut canvas = RecordingCanvas::new();
    let page = canvas.begin_page(PageSize::A4);
    let first = canvas.open_stream(page, StreamMode::Append, true).unwrap();
    let err = canvas
        .open_stream(page, StreamMode::Prepend, true)
        .unwrap_err();
    assert!(matches!(err, Error::StreamBusy(0)), "{err}");

    canvas.close_stream(first).unwrap();
    let again = canvas.open_stream(page, StreamMode::Prepend, false).unwrap();
    canvas.close_stream(again).unwrap();
    assert!(matches!(
        canvas.open_stream(9, StreamMode::Append, true),
        Err(Error::NoSuchPage(9))
    ));

    let out = canvas.finish().unwrap();
    assert_eq!(out.stream_count(), 2);
}
