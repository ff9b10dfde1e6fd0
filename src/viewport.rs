//! Initial scroll position for a positioned layout

use crate::geometry::PositionedLayout;
use crate::types::{BBox, Px, Size};

/// Scroll position in rendered pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollOffset {
    pub x: Px,
    pub y: Px,
}

/// Offset that centers the bounding box of every rendered region in the
/// viewport, clamped to non-negative. An empty layout scrolls to the origin.
pub fn center_offset(layout: &PositionedLayout, viewport: Size<Px>) -> ScrollOffset {
    let mut bbox = BBox::<Px>::new();
    for p in layout.regions() {
        bbox.expand_rect(&p.rendered);
    }
    if bbox.is_empty() {
        return ScrollOffset::default();
    }
    let center = bbox.center();
    ScrollOffset {
        x: (center.x - viewport.w / 2.0).max(Px::ZERO),
        y: (center.y - viewport.h / 2.0).max(Px::ZERO),
    }
}
