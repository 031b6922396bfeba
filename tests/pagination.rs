mod common;

use common::{approx, block, config, recording};
use pagesetter_pdf::{
    ComponentKind, ContentMode, Error, Line, PageOptions, PageState, Placement, Text,
};

#[test]
fn third_block_moves_to_second_page() {
    let mut doc = recording(config(500.0, 800.0, 50.0));
    for i in 0..3 {
        doc.append(block(&format!("block {i}"), 300.0)).unwrap();
    }
    assert_eq!(doc.page_count(), 2);

    let first = doc.pages()[0].placed();
    assert_eq!(first.len(), 2);
    assert!(approx(first[0].rect.top(), 750.0));
    assert!(approx(first[1].rect.top(), 450.0));

    let second = doc.pages()[1].placed();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].kind, ComponentKind::Text);
    assert!(approx(second[0].rect.top(), 750.0));
    assert_eq!(doc.pages()[0].state(), PageState::Closed);
    assert_eq!(doc.pages()[1].state(), PageState::Active);
}

#[test]
fn page_count_is_ceil_of_blocks_per_page() {
    // body is 400pt tall
    for (count, height) in [(1usize, 400.0), (5, 100.0), (9, 100.0), (7, 130.0), (12, 50.0)] {
        let mut doc = recording(config(500.0, 500.0, 50.0));
        for i in 0..count {
            doc.append(block(&i.to_string(), height)).unwrap();
        }
        let per_page = (400.0f32 / height).floor() as usize;
        assert_eq!(
            doc.page_count(),
            count.div_ceil(per_page),
            "{count} blocks of {height}pt"
        );
    }
}

#[test]
fn no_page_until_first_component() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    assert_eq!(doc.page_count(), 0);
    assert!(approx(doc.remaining_height().unwrap(), 400.0));
    assert_eq!(doc.page_count(), 0);
    assert!(doc.current_cursor().is_none());

    doc.append(block("a", 10.0)).unwrap();
    assert_eq!(doc.page_count(), 1);
    assert!(approx(doc.remaining_height().unwrap(), 390.0));
}

#[test]
fn overlay_and_absolute_position_leave_cursor_alone() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    doc.append(block("flow", 100.0)).unwrap();
    let before = doc.remaining_height().unwrap();

    let overlay = Placement {
        mode: ContentMode::Overlay,
        ..Placement::default()
    };
    doc.append(block("stamp", 50.0).placement(overlay)).unwrap();
    doc.append(block("stamp again", 50.0).placement(overlay)).unwrap();
    assert_eq!(doc.remaining_height().unwrap(), before);

    let fixed = Placement {
        position: Some([10.0, 490.0]),
        ..Placement::default()
    };
    doc.append(Line::solid().length(100.0).placement(fixed)).unwrap();
    assert_eq!(doc.remaining_height().unwrap(), before);

    let placed = doc.pages()[0].placed();
    assert!(approx(placed.last().unwrap().rect.x, 10.0));
}

#[test]
fn overlay_that_opens_the_first_page_leaves_the_body_free() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    doc.set_header(Text::new("header").height(30.0));
    let before = doc.remaining_height().unwrap();
    assert!(approx(before, 370.0));

    let overlay = Placement {
        mode: ContentMode::Overlay,
        ..Placement::default()
    };
    doc.append(block("stamp", 50.0).placement(overlay)).unwrap();
    assert_eq!(doc.page_count(), 1);
    assert_eq!(doc.remaining_height().unwrap(), before);
}

#[test]
fn margins_are_consumed_with_the_component() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    let spaced = Placement {
        margins: pagesetter_pdf::Margins::new(20.0, 0.0, 30.0, 15.0),
        ..Placement::default()
    };
    doc.append(block("spaced", 100.0).placement(spaced)).unwrap();
    assert!(approx(doc.remaining_height().unwrap(), 250.0));

    let placed = &doc.pages()[0].placed()[0];
    assert!(approx(placed.rect.top(), 430.0));
    assert!(approx(placed.rect.x, 65.0));
}

#[test]
fn oversized_component_sits_at_top_of_empty_page() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    doc.append(block("huge", 1000.0)).unwrap();
    assert_eq!(doc.page_count(), 1);
    assert!(approx(doc.pages()[0].placed()[0].rect.top(), 450.0));

    doc.append(block("next", 10.0)).unwrap();
    assert_eq!(doc.page_count(), 2);
}

#[test]
fn long_text_breaks_between_lines() {
    let mut doc = recording(config(500.0, 800.0, 50.0));
    let body: Vec<String> = (0..100).map(|i| format!("line {i}")).collect();
    doc.append(Text::new(body.join("\n")).font_size(12.0)).unwrap();
    assert_eq!(doc.page_count(), 3);

    let out = doc.finish().unwrap();
    // 700pt body at 14.4pt leading
    let per_page: Vec<usize> = out.pages.iter().map(|p| p.texts().len()).collect();
    assert_eq!(per_page, vec![48, 48, 4]);
    assert_eq!(out.pages[1].texts()[0].0, "line 48");
}

#[test]
fn only_the_active_page_accepts_content() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    doc.append(block("a", 10.0)).unwrap();
    doc.new_page().unwrap();

    let err = doc.append_to(0, block("late", 10.0)).unwrap_err();
    assert!(matches!(err, Error::PageClosed(0)), "{err}");
    let err = doc.append_to(5, block("ahead", 10.0)).unwrap_err();
    assert!(matches!(err, Error::NoSuchPage(5)), "{err}");

    doc.append_to(1, block("here", 10.0)).unwrap();
    assert_eq!(doc.pages()[1].placed().len(), 1);
}

#[test]
fn explicit_break_without_decorations() {
    let mut doc = recording(config(500.0, 500.0, 50.0));
    doc.set_header(Text::new("header"));
    doc.append(block("a", 10.0)).unwrap();
    let bare = PageOptions {
        allow_header: false,
        allow_footer: false,
        allow_watermark: false,
    };
    doc.new_page_with(bare).unwrap();

    let second = &doc.pages()[1];
    assert!(second.header_band().is_none());
    assert!(approx(second.body().height, 400.0));
    assert!(doc.pages()[0].header_band().is_some());
}

#[test]
fn missing_vertical_style_is_rejected() {
    let mut cfg = config(500.0, 500.0, 50.0);
    cfg.defaults.vertical = None;
    let mut doc = recording(cfg);
    let err = doc.append(block("a", 10.0)).unwrap_err();
    assert!(matches!(err, Error::InvalidStyle(_)), "{err}");
}
