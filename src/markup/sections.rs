//! Placement of capacity-only sections declared by the backend

use roxmltree::{Document, Node};

use super::SectionDescriptor;
use super::extract::{accumulated_translation, grid_offset};
use super::filter::{has_excluded_token, inside_hidden_container, inside_road_group};
use crate::config::ParseConfig;
use crate::log::debug;

/// How a section group was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    GridOffset,
    TextLabel,
}

fn text_content(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
}

fn is_excluded(g: Node) -> bool {
    has_excluded_token(g) || inside_road_group(g) || inside_hidden_container(g)
}

/// Group whose accumulated translation sits on the descriptor's grid offset.
///
/// Road, decoration and hidden groups never match. A group that declares
/// its own `transform` is preferred over one that only inherits the offset.
fn group_at_grid_offset<'a, 'input>(
    doc: &'a Document<'input>,
    desc: &SectionDescriptor,
    config: &ParseConfig,
) -> Option<Node<'a, 'input>> {
    let (Some(gx), Some(gy)) = (desc.grid_x, desc.grid_y) else {
        return None;
    };
    let target = grid_offset(gx, gy, config.grid_cell_size);
    let mut inherited = None;
    for g in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "g")
    {
        let on_grid = accumulated_translation(g)
            .map(|t| (t - target).abs().max_element() <= config.grid_match_tolerance)
            .unwrap_or(false);
        if !on_grid || is_excluded(g) {
            continue;
        }
        if g.has_attribute("transform") {
            return Some(g);
        }
        inherited.get_or_insert(g);
    }
    inherited
}

/// Nearest group enclosing a `<text>` whose content is the section name
fn group_of_label<'a, 'input>(
    doc: &'a Document<'input>,
    desc: &SectionDescriptor,
) -> Option<Node<'a, 'input>> {
    let label = doc.descendants().find(|n| {
        n.is_element()
            && n.tag_name().name() == "text"
            && text_content(*n).trim().eq_ignore_ascii_case(desc.name.trim())
    })?;
    label
        .ancestors()
        .skip(1)
        .find(|a| a.is_element() && a.tag_name().name() == "g")
        .filter(|g| !is_excluded(*g))
}

/// Locate the group that draws a capacity section
pub(crate) fn locate_section<'a, 'input>(
    doc: &'a Document<'input>,
    desc: &SectionDescriptor,
    config: &ParseConfig,
) -> Option<(Node<'a, 'input>, Placement)> {
    if let Some(g) = group_at_grid_offset(doc, desc, config) {
        return Some((g, Placement::GridOffset));
    }
    debug!(section = %desc.name, "no group at grid offset, trying text label");
    group_of_label(doc, desc).map(|g| (g, Placement::TextLabel))
}
