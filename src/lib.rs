//! Live parking-layout interpretation.
//!
//! Turns a raw SVG parking layout into named, positioned regions, fits them
//! into a render target, and keeps their classification in step with live
//! occupancy from the backend (polling plus push notifications).
//!
//! ```no_run
//! use parkview::{ParseConfig, Px, Size, parse_layout, resolve_layout};
//!
//! let svg = r#"<svg viewBox="0 0 200 100"><rect id="spot-1" x="10" y="10" width="12" height="24"/></svg>"#;
//! let parsed = parse_layout(svg, &[], &ParseConfig::default());
//! let positioned = resolve_layout(&parsed.regions, &parsed.view_box, Size::new(Px(400.0), Px(400.0)))?;
//! assert_eq!(positioned.len(), 1);
//! # Ok::<(), parkview::GeometryError>(())
//! ```

pub mod classify;
pub mod config;
pub mod defaults;
pub mod errors;
pub mod geometry;
pub mod log;
pub mod markup;
pub mod occupancy;
pub mod region;
pub mod screen;
pub mod session;
pub mod types;
pub mod viewport;

pub use classify::{VisualState, classify, classify_utilization};
pub use config::{EngineConfig, ParseConfig, SyncConfig};
pub use errors::{
    BackendError, ConfigError, GeometryError, HandoffError, MarkupError, ScreenError,
};
pub use geometry::{PositionedLayout, PositionedRegion, RenderTransform, ViewBox, resolve_layout};
pub use markup::{IdConventions, ParsedLayout, SectionDescriptor, parse_layout};
pub use region::{RawRegion, RegionKind, RegionSource, SectionMode};
pub use screen::{LayoutScreen, LoadOutcome, RegionView, ScreenTransition};
pub use session::SessionCache;
pub use types::{BBox, Doc, Point, Px, Rect, RectDoc, RectPx, Size};
pub use viewport::{ScrollOffset, center_offset};
