//! Exclusion and legitimacy filters
//!
//! Both run before any geometry work. Exclusion removes road and
//! decoration markup; legitimacy keeps only ids that follow one of the
//! accepted spot/section naming conventions.

use regex_lite::Regex;
use roxmltree::Node;

use super::SectionDescriptor;
use crate::region::{RegionSource, SectionMode};

/// Identifier/class tokens that mark roads and way-finding decoration
const EXCLUDED_TOKENS: [&str; 4] = ["road", "path", "line", "arrow"];

/// Element kinds that never represent a spot on their own
const NEVER_SPOT_KINDS: [&str; 7] = ["line", "polyline", "path", "text", "tspan", "use", "image"];

/// Containers whose content is never rendered directly
const HIDDEN_CONTAINERS: [&str; 6] = ["defs", "clipPath", "mask", "pattern", "symbol", "marker"];

/// Whole-word match over `-`, `_` and whitespace separated words; a plural
/// `s` is accepted (`roads`), a longer word is not (`outline`)
fn contains_token(value: Option<&str>, tokens: &[&str]) -> bool {
    value.is_some_and(|v| {
        v.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
            .filter(|w| !w.is_empty())
            .any(|word| {
                let word = word.to_ascii_lowercase();
                let singular = word.strip_suffix('s').unwrap_or(&word);
                tokens.iter().any(|t| word == *t || singular == *t)
            })
    })
}

/// Identifier or class carries a road/path/line/arrow token
pub(crate) fn has_excluded_token(node: Node) -> bool {
    contains_token(node.attribute("id"), &EXCLUDED_TOKENS)
        || contains_token(node.attribute("class"), &EXCLUDED_TOKENS)
}

/// Some enclosing group is a road group
pub(crate) fn inside_road_group(node: Node) -> bool {
    node.ancestors()
        .skip(1)
        .filter(|a| a.is_element() && a.tag_name().name() == "g")
        .any(|g| {
            contains_token(g.attribute("id"), &["road"])
                || contains_token(g.attribute("class"), &["road"])
        })
}

pub(crate) fn inside_hidden_container(node: Node) -> bool {
    node.ancestors()
        .skip(1)
        .any(|a| a.is_element() && HIDDEN_CONTAINERS.contains(&a.tag_name().name()))
}

pub(crate) fn is_never_spot_kind(node: Node) -> bool {
    NEVER_SPOT_KINDS.contains(&node.tag_name().name())
}

/// The structured attribute set of the marker-based layout format:
/// `data-type="parking-slot" data-slot-id=".." data-slot-number=".." data-section=".."`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParkingMarker {
    pub slot_id: Option<String>,
    pub slot_number: Option<u32>,
    pub section: Option<String>,
}

impl ParkingMarker {
    pub(crate) fn read(node: Node) -> Option<ParkingMarker> {
        let typed = node.attribute("data-type") == Some("parking-slot");
        let slot_id = node.attribute("data-slot-id").map(str::trim).filter(|s| !s.is_empty());
        let slot_number = node.attribute("data-slot-number");
        if !typed && slot_id.is_none() && slot_number.is_none() {
            return None;
        }
        Some(ParkingMarker {
            slot_id: slot_id.map(str::to_string),
            slot_number: slot_number.and_then(|n| n.trim().parse().ok()),
            section: node
                .attribute("data-section")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }

    /// Region id for the marker: explicit slot id, element id, or `slot-<n>`
    pub(crate) fn region_id(&self, element_id: Option<&str>) -> Option<String> {
        self.slot_id
            .clone()
            .or_else(|| element_id.map(str::to_string))
            .or_else(|| self.slot_number.map(|n| format!("slot-{n}")))
    }

    pub(crate) fn into_source(self, region_id: &str) -> RegionSource {
        RegionSource::MarkedSlot {
            slot_id: self.slot_id.unwrap_or_else(|| region_id.to_string()),
            slot_number: self.slot_number,
            section: self.section,
        }
    }
}

/// Accepted naming conventions for spot and section ids
pub struct IdConventions {
    floor: Regex,
    section: Regex,
    spot: Regex,
    bare: Regex,
    section_slot: Regex,
    max_slot_number: u32,
}

impl IdConventions {
    pub fn new(max_slot_number: u32) -> Self {
        // Patterns are literals; compiling them cannot fail.
        let re = |p: &str| Regex::new(p).unwrap_or_else(|e| panic!("bad id pattern {p}: {e}"));
        IdConventions {
            floor: re(r"^(?i)(?P<floor>(?:floor|level|f|l|b)\d{1,2})[-_](?P<rest>.+)$"),
            section: re(r"^(?i)section[-_ ](?P<name>[\w-]+)$"),
            spot: re(r"^(?i)(?:spot|slot|space|stall|parking|p)[-_ ]?(?P<num>\d{1,4})$"),
            bare: re(r"^(?P<num>\d{1,4})$"),
            section_slot: re(r"^(?P<section>[A-Z]{1,3})[-_]?(?P<num>\d{1,3})$"),
            max_slot_number,
        }
    }

    fn slot_number(&self, digits: &str) -> Option<u32> {
        digits
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=self.max_slot_number).contains(n))
    }

    /// Interpret an element id; `None` when it follows no accepted convention
    pub fn classify(
        &self,
        id: &str,
        class: Option<&str>,
        sections: &[SectionDescriptor],
    ) -> Option<RegionSource> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }

        if let Some(desc) = sections.iter().find(|s| s.name.eq_ignore_ascii_case(id)) {
            return Some(RegionSource::Section {
                name: desc.name.clone(),
                mode: desc.mode,
            });
        }
        if let Some(caps) = self.section.captures(id) {
            let name = &caps["name"];
            let mode = sections
                .iter()
                .find(|s| s.name.eq_ignore_ascii_case(name))
                .map(|s| s.mode)
                .unwrap_or(SectionMode::CapacityOnly);
            return Some(RegionSource::Section {
                name: name.to_string(),
                mode,
            });
        }
        if class.is_some_and(|c| c.split_whitespace().any(|t| t.eq_ignore_ascii_case("section"))) {
            return Some(RegionSource::Section {
                name: id.to_string(),
                mode: SectionMode::CapacityOnly,
            });
        }

        if let Some(caps) = self.floor.captures(id) {
            let floor = caps["floor"].to_string();
            return self.classify_slot(&caps["rest"], Some(floor));
        }
        self.classify_slot(id, None)
    }

    fn classify_slot(&self, id: &str, floor: Option<String>) -> Option<RegionSource> {
        if let Some(caps) = self.spot.captures(id).or_else(|| self.bare.captures(id)) {
            let number = self.slot_number(&caps["num"])?;
            return Some(RegionSource::Spot {
                number: Some(number),
                floor,
            });
        }
        if let Some(caps) = self.section_slot.captures(id) {
            let local_slot = self.slot_number(&caps["num"])?;
            return Some(RegionSource::SectionSlot {
                section: caps["section"].to_string(),
                local_slot,
                floor,
            });
        }
        None
    }
}

impl Default for IdConventions {
    fn default() -> Self {
        Self::new(crate::defaults::MAX_SLOT_NUMBER)
    }
}
