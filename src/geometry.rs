//! Geometry resolver: document space → rendered pixels (aspect-fit)

use crate::errors::GeometryError;
use crate::region::RawRegion;
use crate::types::{Doc, Px, Rect, RectDoc, RectPx, Size};

/// The document-declared coordinate window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub min_x: Doc,
    pub min_y: Doc,
    pub width: Doc,
    pub height: Doc,
}

impl ViewBox {
    pub fn new(min_x: f64, min_y: f64, width: f64, height: f64) -> Self {
        ViewBox {
            min_x: Doc(min_x),
            min_y: Doc(min_y),
            width: Doc(width),
            height: Doc(height),
        }
    }

    pub fn from_array([x, y, w, h]: [f64; 4]) -> Self {
        Self::new(x, y, w, h)
    }

    /// Width-to-height ratio; `None` for degenerate boxes
    pub fn aspect(&self) -> Option<f64> {
        let (w, h) = (self.width.raw(), self.height.raw());
        (w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0).then(|| w / h)
    }
}

/// Uniform scale plus centering offset, derived once per layout load
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: Px,
    pub offset_y: Px,
    origin_x: Doc,
    origin_y: Doc,
}

impl RenderTransform {
    /// Fit `view_box` into `target`, preserving aspect ratio and centering.
    ///
    /// A relatively wider document fills the target width and is centered
    /// vertically; otherwise it fills the height and is centered horizontally.
    pub fn fit(view_box: &ViewBox, target: Size<Px>) -> Result<Self, GeometryError> {
        let vb_aspect = view_box.aspect().ok_or(GeometryError::InvalidViewBox {
            width: view_box.width.raw(),
            height: view_box.height.raw(),
        })?;
        let (tw, th) = (target.w.raw(), target.h.raw());
        if !(tw.is_finite() && th.is_finite() && tw > 0.0 && th > 0.0) {
            return Err(GeometryError::InvalidTarget {
                width: tw,
                height: th,
            });
        }

        let (scale, offset_x, offset_y) = if vb_aspect > tw / th {
            let s = tw / view_box.width.raw();
            (s, 0.0, (th - view_box.height.raw() * s) / 2.0)
        } else {
            let s = th / view_box.height.raw();
            (s, (tw - view_box.width.raw() * s) / 2.0, 0.0)
        };

        Ok(RenderTransform {
            scale_x: scale,
            scale_y: scale,
            offset_x: Px(offset_x),
            offset_y: Px(offset_y),
            origin_x: view_box.min_x,
            origin_y: view_box.min_y,
        })
    }

    pub fn map_rect(&self, r: &RectDoc) -> RectPx {
        Rect::new(
            Px((r.x - self.origin_x).raw() * self.scale_x) + self.offset_x,
            Px((r.y - self.origin_y).raw() * self.scale_y) + self.offset_y,
            Px(r.width.raw() * self.scale_x),
            Px(r.height.raw() * self.scale_y),
        )
    }
}

/// A region together with its on-screen rectangle
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedRegion {
    pub region: RawRegion,
    pub rendered: RectPx,
}

/// The complete positioned set for one layout load.
///
/// Always rebuilt as a whole; there is no way to patch a single region.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedLayout {
    pub transform: RenderTransform,
    pub target: Size<Px>,
    regions: Vec<PositionedRegion>,
}

impl PositionedLayout {
    pub fn regions(&self) -> &[PositionedRegion] {
        &self.regions
    }

    pub fn get(&self, id: &str) -> Option<&PositionedRegion> {
        self.regions.iter().find(|p| p.region.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }
}

/// Map every region into render-target pixels
pub fn resolve_layout(
    regions: &[RawRegion],
    view_box: &ViewBox,
    target: Size<Px>,
) -> Result<PositionedLayout, GeometryError> {
    let transform = RenderTransform::fit(view_box, target)?;
    let regions = regions
        .iter()
        .map(|region| PositionedRegion {
            rendered: transform.map_rect(&region.rect),
            region: region.clone(),
        })
        .collect();
    Ok(PositionedLayout {
        transform,
        target,
        regions,
    })
}
