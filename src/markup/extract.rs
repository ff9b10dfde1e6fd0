//! Geometry extraction for candidate elements

use glam::{DVec2, dvec2};
use roxmltree::Node;

use super::attrs::{parse_points, parse_translation, path_bounds};
use crate::config::ParseConfig;
use crate::geometry::ViewBox;
use crate::types::{BBox, Doc, Rect, RectDoc};

/// An attribute that could not be interpreted
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AttrFault {
    pub attribute: String,
    pub value: String,
    pub reason: String,
}

impl AttrFault {
    fn new(attribute: &str, value: &str, reason: impl Into<String>) -> Self {
        AttrFault {
            attribute: attribute.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Outcome of extracting geometry from one element
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Extracted {
    /// Document-space rectangle with every translation applied
    Rect(RectDoc),
    /// The element kind carries no usable geometry
    Nothing,
    /// Group nesting exceeded the configured depth
    TooDeep,
}

/// Result of the bounded descendant search inside a group
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GroupSearch {
    /// Largest `<rect>` by area, relative to the group's own frame
    Rect(RectDoc),
    /// No rect, but paths/polygons/circles give a bounding box
    PathBounds(RectDoc),
    Empty,
    /// Sentinel: nesting went past the depth cap before the search finished
    DepthExceeded,
}

fn attr_number(node: Node, name: &str) -> Result<Option<f64>, AttrFault> {
    let Some(raw) = node.attribute(name) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix("px").unwrap_or(trimmed).trim_end();
    let value = trimmed
        .parse::<f64>()
        .map_err(|e| AttrFault::new(name, raw, e.to_string()))?;
    if !value.is_finite() {
        return Err(AttrFault::new(name, raw, "not a finite number"));
    }
    Ok(Some(value))
}

/// Translation declared on this element alone
pub(crate) fn own_translation(node: Node) -> Result<DVec2, AttrFault> {
    match node.attribute("transform") {
        Some(t) => parse_translation(t).map_err(|e| AttrFault::new("transform", t, e)),
        None => Ok(DVec2::ZERO),
    }
}

/// Sum of the element's own translation and every enclosing element's
pub(crate) fn accumulated_translation(node: Node) -> Result<DVec2, AttrFault> {
    let mut total = DVec2::ZERO;
    for n in node.ancestors().filter(|n| n.is_element()) {
        total += own_translation(n)?;
    }
    Ok(total)
}

fn translate(r: RectDoc, by: DVec2) -> RectDoc {
    r.translate(Doc(by.x), Doc(by.y))
}

/// Untransformed geometry of a leaf shape, in the element's own frame
fn shape_rect(node: Node) -> Result<Option<RectDoc>, AttrFault> {
    match node.tag_name().name() {
        "rect" | "image" => {
            let (Some(w), Some(h)) = (attr_number(node, "width")?, attr_number(node, "height")?)
            else {
                return Ok(None);
            };
            let x = attr_number(node, "x")?.unwrap_or(0.0);
            let y = attr_number(node, "y")?.unwrap_or(0.0);
            Ok(Some(Rect::new(Doc(x), Doc(y), Doc(w), Doc(h))))
        }
        "circle" => {
            let Some(r) = attr_number(node, "r")? else {
                return Ok(None);
            };
            let cx = attr_number(node, "cx")?.unwrap_or(0.0);
            let cy = attr_number(node, "cy")?.unwrap_or(0.0);
            Ok(Some(Rect::new(
                Doc(cx - r),
                Doc(cy - r),
                Doc(2.0 * r),
                Doc(2.0 * r),
            )))
        }
        "ellipse" => {
            let (Some(rx), Some(ry)) = (attr_number(node, "rx")?, attr_number(node, "ry")?) else {
                return Ok(None);
            };
            let cx = attr_number(node, "cx")?.unwrap_or(0.0);
            let cy = attr_number(node, "cy")?.unwrap_or(0.0);
            Ok(Some(Rect::new(
                Doc(cx - rx),
                Doc(cy - ry),
                Doc(2.0 * rx),
                Doc(2.0 * ry),
            )))
        }
        "polygon" | "polyline" => {
            let Some(points) = node.attribute("points") else {
                return Ok(None);
            };
            let pts = parse_points(points).map_err(|e| AttrFault::new("points", points, e))?;
            let mut bbox = BBox::<Doc>::new();
            for p in pts {
                bbox.expand_point(p);
            }
            Ok(bbox.to_rect())
        }
        "path" => {
            let Some(d) = node.attribute("d") else {
                return Ok(None);
            };
            path_bounds(d).map_err(|e| AttrFault::new("d", d, e))
        }
        _ => Ok(None),
    }
}

/// Element children, reversed so a stack pops them in document order
fn children_for_stack<'a, 'input>(node: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    let mut c: Vec<_> = node.children().filter(|c| c.is_element()).collect();
    c.reverse();
    c
}

/// Bounded search of a group's descendants.
///
/// Uses an explicit stack instead of recursion so the depth cap is a plain
/// comparison. Direct children sit at depth 1.
pub(crate) fn search_group(group: Node, max_depth: usize) -> Result<GroupSearch, AttrFault> {
    let mut best: Option<RectDoc> = None;
    let mut bounds = BBox::<Doc>::new();

    let mut stack: Vec<(Node, usize, DVec2)> = children_for_stack(group)
        .into_iter()
        .map(|c| (c, 1, DVec2::ZERO))
        .collect();

    while let Some((node, depth, parent_offset)) = stack.pop() {
        if depth > max_depth {
            return Ok(GroupSearch::DepthExceeded);
        }
        let offset = parent_offset + own_translation(node)?;

        match node.tag_name().name() {
            "g" => {
                for child in children_for_stack(node) {
                    stack.push((child, depth + 1, offset));
                }
            }
            "rect" => {
                if let Some(r) = shape_rect(node)?.filter(|r| r.has_area()) {
                    let r = translate(r, offset);
                    if best.is_none_or(|b| r.area() > b.area()) {
                        best = Some(r);
                    }
                }
            }
            "path" | "polygon" | "polyline" | "circle" | "ellipse" => {
                if let Some(r) = shape_rect(node)? {
                    bounds.expand_rect(&translate(r, offset));
                }
            }
            _ => {}
        }
    }

    Ok(match (best, bounds.to_rect()) {
        (Some(r), _) => GroupSearch::Rect(r),
        (None, Some(b)) => GroupSearch::PathBounds(b),
        (None, None) => GroupSearch::Empty,
    })
}

/// Document-space rectangle of any candidate element
pub(crate) fn extract_rect(
    node: Node,
    view_box: &ViewBox,
    config: &ParseConfig,
) -> Result<Extracted, AttrFault> {
    let offset = accumulated_translation(node)?;

    if node.tag_name().name() != "g" {
        return Ok(match shape_rect(node)? {
            Some(r) => Extracted::Rect(translate(r, offset)),
            None => Extracted::Nothing,
        });
    }

    let local = match search_group(node, config.max_group_depth)? {
        GroupSearch::Rect(r) | GroupSearch::PathBounds(r) => r,
        GroupSearch::DepthExceeded => return Ok(Extracted::TooDeep),
        GroupSearch::Empty => {
            // Nothing measurable: use the group's offset with an estimated size
            Rect::new(
                Doc(0.0),
                Doc(0.0),
                view_box.width * config.estimated_width_ratio,
                view_box.height * config.estimated_height_ratio,
            )
        }
    };
    Ok(Extracted::Rect(translate(local, offset)))
}

/// Document offset of a backend grid position
pub(crate) fn grid_offset(grid_x: f64, grid_y: f64, cell: f64) -> DVec2 {
    dvec2(grid_x * cell, grid_y * cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    fn first_with_id<'a, 'input>(doc: &'a Document<'input>, id: &str) -> Node<'a, 'input> {
        doc.descendants()
            .find(|n| n.attribute("id") == Some(id))
            .unwrap()
    }

    fn rect(x: f64, y: f64, w: f64, h: f64) -> RectDoc {
        Rect::new(Doc(x), Doc(y), Doc(w), Doc(h))
    }

    fn extract(svg: &str, id: &str) -> Extracted {
        let doc = Document::parse(svg).unwrap();
        let vb = ViewBox::new(0.0, 0.0, 1000.0, 1000.0);
        extract_rect(first_with_id(&doc, id), &vb, &ParseConfig::default()).unwrap()
    }

    #[test]
    fn rect_and_circle_geometry() {
        let svg = r#"<svg><rect id="a" x="5" y="6" width="10px" height="20"/><circle id="b" cx="50" cy="50" r="8"/></svg>"#;
        assert_eq!(extract(svg, "a"), Extracted::Rect(rect(5.0, 6.0, 10.0, 20.0)));
        assert_eq!(extract(svg, "b"), Extracted::Rect(rect(42.0, 42.0, 16.0, 16.0)));
    }

    #[test]
    fn ancestor_translations_accumulate() {
        let svg = r#"<svg><g transform="translate(100 50)"><g transform="translate(10,5)">
            <rect id="a" x="1" y="2" width="10" height="20" transform="translate(3)"/></g></g></svg>"#;
        assert_eq!(extract(svg, "a"), Extracted::Rect(rect(114.0, 57.0, 10.0, 20.0)));
    }

    #[test]
    fn group_takes_largest_rect() {
        let svg = r#"<svg><g id="spot-1" transform="translate(100 0)">
            <rect x="0" y="0" width="5" height="5"/>
            <g transform="translate(0 10)"><rect x="2" y="2" width="20" height="40"/></g>
            <path d="M0 0 L500 500"/>
        </g></svg>"#;
        assert_eq!(extract(svg, "spot-1"), Extracted::Rect(rect(102.0, 12.0, 20.0, 40.0)));
    }

    #[test]
    fn group_without_rect_uses_path_bounds() {
        let svg = r#"<svg><g id="spot-2"><path d="M10 10 l20 0 l0 40"/></g></svg>"#;
        assert_eq!(extract(svg, "spot-2"), Extracted::Rect(rect(10.0, 10.0, 20.0, 40.0)));
    }

    #[test]
    fn empty_group_is_estimated_from_view_box() {
        let svg = r#"<svg><g id="spot-3" transform="translate(200 300)"><text>3</text></g></svg>"#;
        assert_eq!(extract(svg, "spot-3"), Extracted::Rect(rect(200.0, 300.0, 30.0, 50.0)));
    }

    #[test]
    fn depth_cap_returns_sentinel() {
        let mut svg = String::from(r#"<svg><g id="deep">"#);
        for _ in 0..20 {
            svg.push_str("<g>");
        }
        svg.push_str(r#"<rect width="10" height="10"/>"#);
        for _ in 0..20 {
            svg.push_str("</g>");
        }
        svg.push_str("</g></svg>");

        let doc = Document::parse(&svg).unwrap();
        let deep = first_with_id(&doc, "deep");
        assert_eq!(search_group(deep, 16).unwrap(), GroupSearch::DepthExceeded);
        assert!(matches!(search_group(deep, 32).unwrap(), GroupSearch::Rect(_)));
    }

    #[test]
    fn bad_number_is_a_fault() {
        let doc = Document::parse(r#"<svg><rect id="a" width="wide" height="2"/></svg>"#).unwrap();
        let err = extract_rect(
            first_with_id(&doc, "a"),
            &ViewBox::new(0.0, 0.0, 10.0, 10.0),
            &ParseConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.attribute, "width");
        assert_eq!(err.value, "wide");
    }
}
