//! Markup parser: layout document → ordered, deduplicated regions
//!
//! This module is organized into submodules:
//! - `attrs`: pest grammar for numeric attributes (viewBox, points, transform, path data)
//! - `filter`: exclusion and legitimacy filters
//! - `extract`: per-element geometry, including the bounded group search
//! - `sections`: placement of backend-declared capacity sections
//!
//! Parsing never fails. Elements that cannot be interpreted are skipped and
//! reported in [`ParsedLayout::diagnostics`]; a document without usable
//! regions is a normal "no layout yet" state.

mod attrs;
mod extract;
mod filter;
mod sections;

pub use filter::IdConventions;

use std::collections::HashSet;

use miette::SourceSpan;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::config::ParseConfig;
use crate::errors::MarkupError;
use crate::geometry::ViewBox;
use crate::log::{debug, warn};
use crate::region::{RawRegion, RegionSource, SectionMode};
use crate::types::RectDoc;

use extract::{AttrFault, Extracted, extract_rect};
use filter::{
    ParkingMarker, has_excluded_token, inside_hidden_container, inside_road_group,
    is_never_spot_kind,
};
use sections::{Placement, locate_section};

/// A section as declared by the backend next to the layout document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDescriptor {
    pub name: String,
    pub mode: SectionMode,
    /// Grid position; multiplied by the grid cell size to get a document offset
    #[serde(default)]
    pub grid_x: Option<f64>,
    #[serde(default)]
    pub grid_y: Option<f64>,
}

/// Output of [`parse_layout`]
#[derive(Debug, Clone)]
pub struct ParsedLayout {
    pub view_box: ViewBox,
    pub regions: Vec<RawRegion>,
    pub diagnostics: Vec<MarkupError>,
}

impl ParsedLayout {
    fn empty(view_box: ViewBox) -> Self {
        ParsedLayout {
            view_box,
            regions: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// No usable regions: the layout is not available yet
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn region(&self, id: &str) -> Option<&RawRegion> {
        self.regions.iter().find(|r| r.id == id)
    }
}

/// Regions in document order; the first occurrence of an id wins
#[derive(Default)]
struct RegionSet {
    regions: Vec<RawRegion>,
    seen: HashSet<String>,
}

impl RegionSet {
    fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    fn push(&mut self, region: RawRegion) {
        if self.seen.insert(region.id.clone()) {
            self.regions.push(region);
        } else {
            debug!(id = %region.id, "dropping duplicate region id");
        }
    }
}

fn span_of(node: Node) -> SourceSpan {
    let range = node.range();
    (range.start, range.len()).into()
}

fn describe(node: Node) -> String {
    match node.attribute("id") {
        Some(id) => format!("{}#{}", node.tag_name().name(), id),
        None => node.tag_name().name().to_string(),
    }
}

/// Byte offset of a 1-based row/column position
fn byte_offset(source: &str, row: u32, col: u32) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(row.saturating_sub(1) as usize)
        .map(str::len)
        .sum();
    let line = &source[line_start.min(source.len())..];
    let col_bytes: usize = line
        .chars()
        .take(col.saturating_sub(1) as usize)
        .map(char::len_utf8)
        .sum();
    (line_start + col_bytes).min(source.len())
}

fn read_view_box(root: Node, config: &ParseConfig, diagnostics: &mut Vec<MarkupError>) -> ViewBox {
    if let Some(raw) = root.attribute("viewBox") {
        match attrs::parse_view_box(raw) {
            Ok(vb) if vb.aspect().is_some() => return vb,
            Ok(_) => diagnostics.push(fault_diagnostic(
                root,
                AttrFault {
                    attribute: "viewBox".into(),
                    value: raw.into(),
                    reason: "width and height must be positive".into(),
                },
            )),
            Err(reason) => diagnostics.push(fault_diagnostic(
                root,
                AttrFault {
                    attribute: "viewBox".into(),
                    value: raw.into(),
                    reason,
                },
            )),
        }
    }

    let dimension = |name: &str| {
        root.attribute(name)
            .map(|v| v.trim().trim_end_matches("px"))
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
    };
    match (dimension("width"), dimension("height")) {
        (Some(w), Some(h)) => ViewBox::new(0.0, 0.0, w, h),
        _ => {
            debug!("no viewBox declared, using the default window");
            config.default_view_box()
        }
    }
}

fn fault_diagnostic(node: Node, fault: AttrFault) -> MarkupError {
    warn!(
        element = %describe(node),
        attribute = %fault.attribute,
        reason = %fault.reason,
        "skipping element with invalid attribute"
    );
    MarkupError::InvalidAttribute {
        element: describe(node),
        attribute: fault.attribute,
        value: fault.value,
        reason: fault.reason,
        span: span_of(node),
    }
}

/// Decide whether an element is a legitimate candidate, and what it is
fn candidate(
    node: Node,
    conventions: &IdConventions,
    sections: &[SectionDescriptor],
) -> Option<(String, RegionSource)> {
    let marker = ParkingMarker::read(node);
    let id = node.attribute("id");
    if marker.is_none() && id.is_none() {
        return None;
    }

    // Exclusion, in order
    if inside_hidden_container(node) || has_excluded_token(node) || inside_road_group(node) {
        return None;
    }
    if marker.is_none() && is_never_spot_kind(node) {
        return None;
    }

    // Legitimacy
    match marker {
        Some(marker) => {
            let region_id = marker.region_id(id)?;
            let source = marker.into_source(&region_id);
            Some((region_id, source))
        }
        None => {
            let id = id?;
            let source = conventions.classify(id, node.attribute("class"), sections)?;
            Some((id.trim().to_string(), source))
        }
    }
}

/// Geometry plus size filter for one element; `None` when it is dropped
fn resolve_rect(
    node: Node,
    id: &str,
    view_box: &ViewBox,
    config: &ParseConfig,
    diagnostics: &mut Vec<MarkupError>,
) -> Option<RectDoc> {
    let rect = match extract_rect(node, view_box, config) {
        Ok(Extracted::Rect(r)) => r,
        Ok(Extracted::Nothing) => {
            diagnostics.push(MarkupError::MissingGeometry {
                id: id.to_string(),
                span: span_of(node),
            });
            return None;
        }
        Ok(Extracted::TooDeep) => {
            warn!(id, limit = config.max_group_depth, "group nesting too deep");
            diagnostics.push(MarkupError::GroupTooDeep {
                element: describe(node),
                limit: config.max_group_depth,
                span: span_of(node),
            });
            return None;
        }
        Err(fault) => {
            diagnostics.push(fault_diagnostic(node, fault));
            return None;
        }
    };

    if !config.plausible_size(rect.width.raw(), rect.height.raw()) {
        debug!(id, width = rect.width.raw(), height = rect.height.raw(), "implausible size");
        diagnostics.push(MarkupError::ImplausibleSize {
            id: id.to_string(),
            width: rect.width.raw(),
            height: rect.height.raw(),
            span: span_of(node),
        });
        return None;
    }
    Some(rect)
}

/// Parse a layout document into regions.
///
/// `sections` is the backend's section list; capacity-only entries are
/// placed even when the document gives them no recognizable id.
pub fn parse_layout(
    svg: &str,
    sections: &[SectionDescriptor],
    config: &ParseConfig,
) -> ParsedLayout {
    let doc = match Document::parse(svg) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "layout document is not well-formed XML");
            let pos = e.pos();
            let mut layout = ParsedLayout::empty(config.default_view_box());
            layout.diagnostics.push(MarkupError::MalformedDocument {
                message: e.to_string(),
                span: (byte_offset(svg, pos.row, pos.col), 0).into(),
            });
            return layout;
        }
    };

    let conventions = IdConventions::new(config.max_slot_number);
    let root = doc.root_element();
    let mut diagnostics = Vec::new();
    let view_box = read_view_box(root, config, &mut diagnostics);
    let mut set = RegionSet::default();

    for node in root.descendants().skip(1).filter(|n| n.is_element()) {
        let Some((id, source)) = candidate(node, &conventions, sections) else {
            continue;
        };
        if set.contains(&id) {
            debug!(id = %id, "duplicate id, first occurrence wins");
            continue;
        }
        if let Some(rect) = resolve_rect(node, &id, &view_box, config, &mut diagnostics) {
            set.push(RawRegion { id, source, rect });
        }
    }

    for desc in sections.iter().filter(|s| s.mode == SectionMode::CapacityOnly) {
        let id = format!("section-{}", desc.name);
        let already_present = set.contains(&id)
            || set.regions.iter().any(|r| {
                matches!(&r.source, RegionSource::Section { name, .. } if name.eq_ignore_ascii_case(&desc.name))
            });
        if already_present {
            continue;
        }
        let Some((group, placement)) = locate_section(&doc, desc, config) else {
            warn!(section = %desc.name, "capacity section not found in layout");
            diagnostics.push(MarkupError::SectionNotPlaced {
                name: desc.name.clone(),
            });
            continue;
        };
        if placement == Placement::TextLabel {
            debug!(section = %desc.name, "placed capacity section by its text label");
        }
        if let Some(rect) = resolve_rect(group, &id, &view_box, config, &mut diagnostics) {
            set.push(RawRegion {
                id,
                source: RegionSource::Section {
                    name: desc.name.clone(),
                    mode: SectionMode::CapacityOnly,
                },
                rect,
            });
        }
    }

    debug!(regions = set.regions.len(), diagnostics = diagnostics.len(), "parsed layout");
    ParsedLayout {
        view_box,
        regions: set.regions,
        diagnostics,
    }
}
