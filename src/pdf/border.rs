//! Cell border geometry: solid edges, and dashed edges whose dashes are
//! centered along the edge.

use crate::error::{Error, Result};
use crate::model::{BorderStyle, Color, Edge, Edges};

use super::canvas::ContentStream;
use super::cursor::Rect;

/// Resolved state of one rectangle edge.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BorderEdge {
    pub enabled: bool,
    pub color: Option<Color>,
}

impl BorderEdge {
    pub const NONE: BorderEdge = BorderEdge {
        enabled: false,
        color: None,
    };

    pub fn on(color: Color) -> Self {
        Self {
            enabled: true,
            color: Some(color),
        }
    }
}

/// How `count` dashes of `segment` length, separated by `gap`, sit on an edge.
/// The first dash starts `offset` from the edge's origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DashLayout {
    pub count: usize,
    pub segment: f32,
    pub gap: f32,
    pub offset: f32,
}

impl DashLayout {
    /// Length covered by the dashes and the gaps between them.
    pub fn span(&self) -> f32 {
        self.count as f32 * self.segment + self.count.saturating_sub(1) as f32 * self.gap
    }
}

/// Dash layout for an edge of `length`.
///
/// A segment longer than the edge is clamped to the edge and starts at the
/// origin with no centering.
pub fn dash_layout(length: f32, segment: f32, gap: f32) -> DashLayout {
    if segment > length {
        return DashLayout {
            count: 1,
            segment: length,
            gap,
            offset: 0.0,
        };
    }
    let count = ((length / (segment + gap)).floor() as usize).max(1);
    let offset = (length - (count as f32 * (segment + gap) - gap)).abs() / 2.0;
    DashLayout {
        count,
        segment,
        gap,
        offset,
    }
}

fn check_style(style: &BorderStyle) -> Result<()> {
    if let BorderStyle::Dashed { segment, gap } = *style
        && (!(segment > 0.0) || !(gap >= 0.0))
    {
        return Err(Error::InvalidStyle(format!(
            "dash segment {segment} / gap {gap} must be positive"
        )));
    }
    Ok(())
}

/// Stroke from `from` to `to` in the given style. The stroke color and width
/// must already be set on `stream`.
pub(crate) fn stroke_run(
    stream: &mut ContentStream,
    from: (f32, f32),
    to: (f32, f32),
    style: &BorderStyle,
) -> Result<()> {
    check_style(style)?;
    match *style {
        BorderStyle::Solid => {
            stream.move_to(from.0, from.1);
            stream.line_to(to.0, to.1);
            stream.stroke();
        }
        BorderStyle::Dashed { segment, gap } => {
            let (dx, dy) = (to.0 - from.0, to.1 - from.1);
            let length = (dx * dx + dy * dy).sqrt();
            if length <= 0.0 {
                return Ok(());
            }
            let (ux, uy) = (dx / length, dy / length);
            let dash = dash_layout(length, segment, gap);
            for i in 0..dash.count {
                let start = dash.offset + i as f32 * (dash.segment + dash.gap);
                let end = start + dash.segment;
                stream.move_to(from.0 + ux * start, from.1 + uy * start);
                stream.line_to(from.0 + ux * end, from.1 + uy * end);
                stream.stroke();
            }
        }
    }
    Ok(())
}

/// Draw the enabled edges of `rect`.
///
/// Horizontal edges run left to right, vertical edges top to bottom. Every
/// enabled edge must carry a color; this is checked before anything is
/// emitted. An empty rectangle draws nothing.
pub fn draw_border(
    stream: &mut ContentStream,
    rect: Rect,
    edges: &Edges<BorderEdge>,
    style: &BorderStyle,
    width: f32,
) -> Result<()> {
    if rect.is_empty() {
        return Ok(());
    }
    check_style(style)?;

    let mut strokes = Vec::with_capacity(4);
    for edge in Edge::ALL {
        let be = edges.get(edge);
        if !be.enabled {
            continue;
        }
        let color = be.color.ok_or(Error::MissingColor { edge: edge.name() })?;
        strokes.push((edge, color));
    }

    for (edge, color) in strokes {
        let (from, to) = match edge {
            Edge::Top => ((rect.left(), rect.top()), (rect.right(), rect.top())),
            Edge::Bottom => ((rect.left(), rect.bottom()), (rect.right(), rect.bottom())),
            Edge::Left => ((rect.left(), rect.top()), (rect.left(), rect.bottom())),
            Edge::Right => ((rect.right(), rect.top()), (rect.right(), rect.bottom())),
        };
        stream.set_stroke(color, width);
        stroke_run(stream, from, to, style)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BLACK;
    use crate::pdf::canvas::{DrawOp, StreamMode};

    fn stream() -> ContentStream {
        ContentStream::new(0, StreamMode::Append, true)
    }

    #[test]
    fn dashes_plus_offsets_cover_the_edge() {
        for &(l, s, g) in &[
            (100.0f32, 3.0f32, 2.0f32),
            (97.5, 4.0, 1.5),
            (10.0, 6.0, 6.0),
            (250.0, 10.0, 0.0),
            (33.3, 33.3, 1.0),
        ] {
            let d = dash_layout(l, s, g);
            assert!(
                (d.span() + 2.0 * d.offset - l).abs() < 1e-3,
                "L={l} S={s} G={g} -> {d:?}"
            );
        }
    }

    #[test]
    fn oversized_segment_is_clamped_without_offset() {
        let d = dash_layout(20.0, 50.0, 5.0);
        assert_eq!(d.count, 1);
        assert_eq!(d.segment, 20.0);
        assert_eq!(d.offset, 0.0);
    }

    #[test]
    fn solid_border_skips_disabled_edges() {
        let mut s = stream();
        let mut edges = Edges::all(BorderEdge::on(BLACK));
        edges.left = BorderEdge::NONE;
        draw_border(
            &mut s,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            &edges,
            &BorderStyle::Solid,
            1.0,
        )
        .unwrap();
        let strokes = s.ops().iter().filter(|op| **op == DrawOp::Stroke).count();
        assert_eq!(strokes, 3);
    }

    #[test]
    fn missing_color_emits_nothing() {
        let mut s = stream();
        let mut edges = Edges::all(BorderEdge::on(BLACK));
        edges.right.color = None;
        let err = draw_border(
            &mut s,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            &edges,
            &BorderStyle::Solid,
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingColor { edge: "right" }));
        assert!(s.ops().is_empty());
    }

    #[test]
    fn vertical_dashes_walk_downward() {
        let mut s = stream();
        let edges = Edges {
            left: BorderEdge::on(BLACK),
            ..Edges::all(BorderEdge::NONE)
        };
        draw_border(
            &mut s,
            Rect::new(0.0, 0.0, 10.0, 20.0),
            &edges,
            &BorderStyle::Dashed {
                segment: 4.0,
                gap: 1.0,
            },
            0.5,
        )
        .unwrap();
        let first = s.ops().iter().find_map(|op| match op {
            DrawOp::MoveTo { y, .. } => Some(*y),
            _ => None,
        });
        // 4 dashes of 4 + 3 gaps of 1 = 19, offset 0.5 from the top at y=20
        assert_eq!(first, Some(19.5));
    }
}
