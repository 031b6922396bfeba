//! Turns a component's size and placement parameters into page coordinates.

use crate::error::{Error, Result};
use crate::model::{ContentMode, HorizontalStyle, Placement, VerticalStyle};

use super::cursor::{Cursor, Rect};

/// Area a component is aligned in.
///
/// `area` bounds horizontal alignment; vertical alignment works against the
/// band from `reference_top` down `reference_height` points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub area: Rect,
    pub reference_top: f32,
    pub reference_height: f32,
}

impl Frame {
    /// Frame whose vertical reference is the area itself.
    pub fn of(area: Rect) -> Self {
        Self {
            area,
            reference_top: area.top(),
            reference_height: area.height,
        }
    }
}

/// Final geometry of a placed component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedBox {
    pub x: f32,
    /// Draw origin: `top` minus the component's baseline offset.
    pub y: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl PlacedBox {
    pub fn rect(&self) -> Rect {
        Rect::from_top(self.x, self.top, self.width, self.height)
    }
}

/// Component styles, falling back to inherited ones.
pub fn resolve_styles(
    placement: &Placement,
    inherited: (Option<HorizontalStyle>, Option<VerticalStyle>),
) -> Result<(HorizontalStyle, VerticalStyle)> {
    let horizontal = placement
        .horizontal
        .or(inherited.0)
        .ok_or_else(|| Error::InvalidStyle("no horizontal style set or inherited".into()))?;
    let vertical = placement
        .vertical
        .or(inherited.1)
        .ok_or_else(|| Error::InvalidStyle("no vertical style set or inherited".into()))?;
    Ok((horizontal, vertical))
}

pub fn align_x(area: Rect, placement: &Placement, style: HorizontalStyle, width: f32) -> f32 {
    match style {
        HorizontalStyle::Left => area.left() + placement.margins.left,
        HorizontalStyle::Center => area.left() + (area.width - width) / 2.0,
        HorizontalStyle::Right => area.right() - width - placement.margins.right,
    }
}

/// Align a `width` x `height` box inside `frame`.
pub fn place_in_frame(
    frame: &Frame,
    placement: &Placement,
    styles: (HorizontalStyle, VerticalStyle),
    size: (f32, f32),
    baseline: f32,
) -> PlacedBox {
    let (width, height) = size;
    let x = align_x(frame.area, placement, styles.0, width);
    let slack = frame.reference_height - height;
    let top = match styles.1 {
        VerticalStyle::Top => frame.reference_top,
        VerticalStyle::Center => frame.reference_top - slack / 2.0,
        VerticalStyle::Bottom => frame.reference_top - slack,
    };
    PlacedBox {
        x,
        y: top - baseline,
        top,
        width,
        height,
    }
}

/// Place a component in a page body.
///
/// Absolute positions and overlays leave the cursor alone; append and
/// prepend advance it by the height plus the vertical margins.
pub fn place_on_page(
    cursor: &mut Cursor,
    body: Rect,
    placement: &Placement,
    size: (f32, f32),
    baseline: f32,
    inherited: (Option<HorizontalStyle>, Option<VerticalStyle>),
) -> Result<PlacedBox> {
    let (width, height) = size;
    if let Some([x, top]) = placement.position {
        return Ok(PlacedBox {
            x,
            y: top - baseline,
            top,
            width,
            height,
        });
    }
    let styles = resolve_styles(placement, inherited)?;
    match placement.mode {
        ContentMode::Overlay => Ok(place_in_frame(
            &Frame::of(body),
            placement,
            styles,
            size,
            baseline,
        )),
        ContentMode::Append | ContentMode::Prepend => {
            let frame = Frame {
                area: body,
                reference_top: cursor.y() - placement.margins.top,
                reference_height: height,
            };
            let placed = place_in_frame(&frame, placement, styles, size, baseline);
            cursor.advance(height + placement.margins.vertical());
            Ok(placed)
        }
    }
}
