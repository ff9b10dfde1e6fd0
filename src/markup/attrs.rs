//! Numeric attribute parsing (viewBox, points, transform, path data)

use glam::{DVec2, dvec2};
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::geometry::ViewBox;
use crate::log::debug;
use crate::types::{BBox, Doc, Point, PtDoc, RectDoc};

#[derive(Parser)]
#[grammar = "markup/attrs.pest"]
pub(crate) struct AttrParser;

fn parse_rule(rule: Rule, input: &str) -> Result<Pair<'_, Rule>, String> {
    let mut pairs = AttrParser::parse(rule, input).map_err(|e| e.to_string())?;
    pairs
        .next()
        .ok_or_else(|| format!("empty parse for {:?}", rule))
}

fn number(pair: Pair<Rule>) -> Result<f64, String> {
    pair.as_str()
        .parse::<f64>()
        .map_err(|e| format!("invalid number '{}': {}", pair.as_str(), e))
}

/// Collect every `number` below `pair`, in document order
fn numbers(pair: Pair<Rule>) -> Result<Vec<f64>, String> {
    pair.into_inner()
        .flatten()
        .filter(|p| p.as_rule() == Rule::number)
        .map(number)
        .collect()
}

/// Parse a `viewBox` value: four numbers separated by whitespace and/or commas
pub(crate) fn parse_view_box(s: &str) -> Result<ViewBox, String> {
    let nums = numbers(parse_rule(Rule::view_box, s)?)?;
    match nums.as_slice() {
        [x, y, w, h] => Ok(ViewBox::new(*x, *y, *w, *h)),
        other => Err(format!("expected 4 numbers, found {}", other.len())),
    }
}

/// Parse a `points` list into document points
pub(crate) fn parse_points(s: &str) -> Result<Vec<PtDoc>, String> {
    let nums = numbers(parse_rule(Rule::points, s)?)?;
    if nums.len() % 2 != 0 {
        return Err(format!("odd coordinate count {}", nums.len()));
    }
    Ok(nums
        .chunks_exact(2)
        .map(|pair| Point::new(Doc(pair[0]), Doc(pair[1])))
        .collect())
}

/// Translation carried by a `transform` attribute.
///
/// `translate` and the e/f components of `matrix` contribute; scale, rotate
/// and skew are not supported for layouts and are ignored.
pub(crate) fn parse_translation(s: &str) -> Result<DVec2, String> {
    let list = parse_rule(Rule::transform_list, s)?;
    let mut total = DVec2::ZERO;

    for item in list.into_inner().filter(|p| p.as_rule() == Rule::transform) {
        let mut inner = item.into_inner();
        let name = inner
            .next()
            .map(|p| p.as_str().to_string())
            .unwrap_or_default();
        let args = match inner.next() {
            Some(list) => numbers_of_list(list)?,
            None => Vec::new(),
        };

        match (name.as_str(), args.as_slice()) {
            ("translate", [tx]) => total += dvec2(*tx, 0.0),
            ("translate", [tx, ty]) => total += dvec2(*tx, *ty),
            ("matrix", [_, _, _, _, e, f]) => total += dvec2(*e, *f),
            ("translate", _) | ("matrix", _) => {
                return Err(format!("{} takes {} arguments", name, args.len()));
            }
            _ => debug!(transform = %name, "ignoring non-translation transform"),
        }
    }

    Ok(total)
}

fn numbers_of_list(pair: Pair<Rule>) -> Result<Vec<f64>, String> {
    pair.into_inner().map(number).collect()
}

/// Bounding box of path data, control points included.
///
/// Returns `None` for data without any coordinates.
pub(crate) fn path_bounds(d: &str) -> Result<Option<RectDoc>, String> {
    let data = parse_rule(Rule::path_data, d)?;
    let mut bbox = BBox::<Doc>::new();
    let mut current = DVec2::ZERO;
    let mut subpath_start = DVec2::ZERO;

    for segment in data.into_inner().filter(|p| p.as_rule() == Rule::path_segment) {
        let mut inner = segment.into_inner();
        let cmd = inner
            .next()
            .and_then(|p| p.as_str().chars().next())
            .ok_or("path segment without command")?;
        let args = match inner.next() {
            Some(list) => numbers_of_list(list)?,
            None => Vec::new(),
        };
        let relative = cmd.is_ascii_lowercase();

        let stride = match cmd.to_ascii_uppercase() {
            'M' | 'L' | 'T' => 2,
            'H' | 'V' => 1,
            'C' => 6,
            'S' | 'Q' => 4,
            'A' => 7,
            'Z' => {
                current = subpath_start;
                continue;
            }
            other => return Err(format!("unknown path command '{}'", other)),
        };
        if args.is_empty() || args.len() % stride != 0 {
            return Err(format!(
                "command '{}' expects a multiple of {} numbers, found {}",
                cmd,
                stride,
                args.len()
            ));
        }

        for (i, chunk) in args.chunks_exact(stride).enumerate() {
            let origin = if relative { current } else { DVec2::ZERO };
            match cmd.to_ascii_uppercase() {
                'H' => {
                    let x = if relative { current.x + chunk[0] } else { chunk[0] };
                    current = dvec2(x, current.y);
                }
                'V' => {
                    let y = if relative { current.y + chunk[0] } else { chunk[0] };
                    current = dvec2(current.x, y);
                }
                'A' => {
                    current = origin + dvec2(chunk[5], chunk[6]);
                }
                _ => {
                    // Control points then endpoint, all relative to the segment origin
                    for pt in chunk.chunks_exact(2) {
                        add_point(&mut bbox, origin + dvec2(pt[0], pt[1]));
                    }
                    current = origin + dvec2(chunk[stride - 2], chunk[stride - 1]);
                }
            }
            if cmd.eq_ignore_ascii_case(&'M') && i == 0 {
                subpath_start = current;
            }
            add_point(&mut bbox, current);
        }
    }

    Ok(bbox.to_rect())
}

fn add_point(bbox: &mut BBox<Doc>, p: DVec2) {
    bbox.expand_point(Point::new(Doc(p.x), Doc(p.y)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rect;

    #[test]
    fn view_box_accepts_commas_and_spaces() {
        let vb = parse_view_box("0,0 200  100").unwrap();
        assert_eq!(vb, ViewBox::new(0.0, 0.0, 200.0, 100.0));
        let vb = parse_view_box("-10.5 -3e1 4.2e2 .5").unwrap();
        assert_eq!(vb, ViewBox::new(-10.5, -30.0, 420.0, 0.5));
    }

    #[test]
    fn view_box_rejects_wrong_arity() {
        assert!(parse_view_box("0 0 200").is_err());
        assert!(parse_view_box("0 0 200 100 5").is_err());
        assert!(parse_view_box("zero zero 1 1").is_err());
    }

    #[test]
    fn points_parse_into_pairs() {
        let pts = parse_points("0,0 10,0 10,20").unwrap();
        assert_eq!(pts.len(), 3);
        assert_eq!(pts[2], Point::new(Doc(10.0), Doc(20.0)));
        assert!(parse_points("1 2 3").is_err());
    }

    #[test]
    fn translations_accumulate_within_one_attribute() {
        let t = parse_translation("translate(10 20) translate(5)").unwrap();
        assert_eq!(t, dvec2(15.0, 20.0));
        let t = parse_translation("matrix(1,0,0,1,30,-4)").unwrap();
        assert_eq!(t, dvec2(30.0, -4.0));
        let t = parse_translation("scale(2) rotate(45)").unwrap();
        assert_eq!(t, DVec2::ZERO);
        assert!(parse_translation("translate(1 2 3)").is_err());
    }

    #[test]
    fn path_bounds_follow_relative_commands() {
        let r = path_bounds("M10 10 h20 v30 h-20 z").unwrap().unwrap();
        assert_eq!(r, Rect::new(Doc(10.0), Doc(10.0), Doc(20.0), Doc(30.0)));
    }

    #[test]
    fn path_bounds_include_curve_control_points() {
        let r = path_bounds("M0 0 C 0 -10 20 -10 20 0").unwrap().unwrap();
        assert_eq!(r, Rect::new(Doc(0.0), Doc(-10.0), Doc(20.0), Doc(10.0)));
    }

    #[test]
    fn empty_path_has_no_bounds() {
        assert_eq!(path_bounds("").unwrap(), None);
        assert!(path_bounds("M 1").is_err());
    }
}
