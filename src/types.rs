//! Strongly-typed numeric primitives for parkview (zero-cost newtypes).
//!
//! Two coordinate spaces exist and must never be mixed:
//! - [`Doc`]: units of the layout document (whatever its `viewBox` declares)
//! - [`Px`]: rendered pixels on screen
//!
//! Conversion between them only happens through
//! [`RenderTransform`](crate::geometry::RenderTransform).

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

macro_rules! unit_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default)]
        #[repr(transparent)]
        pub struct $name(pub f64);

        impl $name {
            pub const ZERO: $name = $name(0.0);

            /// Get the raw value (use sparingly, prefer typed operations)
            #[inline]
            pub fn raw(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn abs(self) -> $name {
                $name(self.0.abs())
            }

            #[inline]
            pub fn min(self, other: $name) -> $name {
                $name(self.0.min(other.0))
            }

            #[inline]
            pub fn max(self, other: $name) -> $name {
                $name(self.0.max(other.0))
            }

            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl Add for $name {
            type Output = $name;
            fn add(self, rhs: $name) -> $name { $name(self.0 + rhs.0) }
        }
        impl Sub for $name {
            type Output = $name;
            fn sub(self, rhs: $name) -> $name { $name(self.0 - rhs.0) }
        }
        impl Mul<f64> for $name {
            type Output = $name;
            fn mul(self, rhs: f64) -> $name { $name(self.0 * rhs) }
        }
        impl Div<f64> for $name {
            type Output = $name;
            fn div(self, rhs: f64) -> $name { $name(self.0 / rhs) }
        }
        impl Neg for $name {
            type Output = $name;
            fn neg(self) -> $name { $name(-self.0) }
        }
        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: $name) { self.0 += rhs.0; }
        }
        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: $name) { self.0 -= rhs.0; }
        }
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

unit_newtype! {
    /// Length in document units (the layout's `viewBox` space)
    Doc
}

unit_newtype! {
    /// Rendered pixels
    Px
}

// NOTE: Doc * Doc and Doc / Doc are intentionally not implemented.
// Ratios go through raw() at the one place that needs them (aspect-fit).

/// Generic 2D point
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl<T> Point<T> {
    pub fn new(x: T, y: T) -> Self {
        Point { x, y }
    }
}

/// 2D size
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Size<T> {
    pub w: T,
    pub h: T,
}

impl<T> Size<T> {
    pub fn new(w: T, h: T) -> Self {
        Size { w, h }
    }
}

/// Axis-aligned rectangle anchored at its top-left corner (SVG convention, y down)
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Rect<T> {
    pub x: T,
    pub y: T,
    pub width: T,
    pub height: T,
}

impl<T> Rect<T>
where
    T: Copy + Add<Output = T> + Sub<Output = T> + Div<f64, Output = T> + PartialOrd + Default,
{
    pub fn new(x: T, y: T, width: T, height: T) -> Self {
        Rect { x, y, width, height }
    }

    pub fn right(&self) -> T {
        self.x + self.width
    }

    pub fn bottom(&self) -> T {
        self.y + self.height
    }

    pub fn center(&self) -> Point<T> {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// True when both sides are strictly positive
    pub fn has_area(&self) -> bool {
        self.width > T::default() && self.height > T::default()
    }

    /// Shift the rectangle by an offset
    pub fn translate(self, dx: T, dy: T) -> Self {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }
}

impl Rect<Doc> {
    pub fn area(&self) -> f64 {
        self.width.0 * self.height.0
    }
}

/// Axis-aligned bounding box accumulated from points
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox<T> {
    pub min: Point<T>,
    pub max: Point<T>,
}

macro_rules! bbox_impl {
    ($t:ident) => {
        impl BBox<$t> {
            /// An empty box; expanding it with any point makes it valid
            pub fn new() -> Self {
                BBox {
                    min: Point::new($t(f64::MAX), $t(f64::MAX)),
                    max: Point::new($t(f64::MIN), $t(f64::MIN)),
                }
            }

            pub fn is_empty(&self) -> bool {
                self.min.x > self.max.x || self.min.y > self.max.y
            }

            pub fn expand_point(&mut self, p: Point<$t>) {
                self.min.x = self.min.x.min(p.x);
                self.min.y = self.min.y.min(p.y);
                self.max.x = self.max.x.max(p.x);
                self.max.y = self.max.y.max(p.y);
            }

            pub fn expand_rect(&mut self, r: &Rect<$t>) {
                self.expand_point(Point::new(r.x, r.y));
                self.expand_point(Point::new(r.right(), r.bottom()));
            }

            pub fn width(&self) -> $t {
                self.max.x - self.min.x
            }

            pub fn height(&self) -> $t {
                self.max.y - self.min.y
            }

            pub fn center(&self) -> Point<$t> {
                Point::new(
                    (self.min.x + self.max.x) / 2.0,
                    (self.min.y + self.max.y) / 2.0,
                )
            }

            /// Convert to a rectangle; `None` when nothing was added
            pub fn to_rect(&self) -> Option<Rect<$t>> {
                if self.is_empty() {
                    None
                } else {
                    Some(Rect::new(self.min.x, self.min.y, self.width(), self.height()))
                }
            }
        }

        impl Default for BBox<$t> {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

bbox_impl!(Doc);
bbox_impl!(Px);

pub type PtDoc = Point<Doc>;
pub type RectDoc = Rect<Doc>;
pub type RectPx = Rect<Px>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bbox_has_no_rect() {
        let bb = BBox::<Px>::new();
        assert!(bb.is_empty());
        assert_eq!(bb.to_rect(), None);
    }

    #[test]
    fn bbox_covers_rects() {
        let mut bb = BBox::<Px>::new();
        bb.expand_rect(&Rect::new(Px(10.0), Px(10.0), Px(5.0), Px(5.0)));
        bb.expand_rect(&Rect::new(Px(0.0), Px(20.0), Px(2.0), Px(2.0)));
        assert_eq!(bb.to_rect(), Some(Rect::new(Px(0.0), Px(10.0), Px(15.0), Px(12.0))));
        assert_eq!(bb.center(), Point::new(Px(7.5), Px(16.0)));
    }
}
