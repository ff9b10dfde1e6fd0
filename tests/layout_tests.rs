use camino::Utf8Path;
use parkview::{ParseConfig, SectionDescriptor, parse_layout};

/// Every layout fixture must satisfy the parser's structural guarantees.
///
/// Next to `name.svg`:
/// - `name.ids` lists the expected region ids in order, one per line
/// - `name.sections.json` holds the backend section list, if any
fn check_layout(path: &Utf8Path) -> datatest_stable::Result<()> {
    let svg = std::fs::read_to_string(path)?;
    let sections: Vec<SectionDescriptor> =
        match std::fs::read_to_string(path.with_extension("sections.json")) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(_) => Vec::new(),
        };
    let config = ParseConfig::default();

    let first = parse_layout(&svg, &sections, &config);
    let second = parse_layout(&svg, &sections, &config);
    assert_eq!(first.regions, second.regions, "parsing must be idempotent");
    assert_eq!(first.view_box, second.view_box);

    for region in &first.regions {
        let (w, h) = (region.rect.width.raw(), region.rect.height.raw());
        assert!(
            w > 0.0 && h > 0.0,
            "{}: region {} has no area ({w}x{h})",
            path,
            region.id
        );
        assert!(
            config.plausible_size(w, h),
            "{}: region {} is {w}x{h}",
            path,
            region.id
        );
    }

    let ids: Vec<&str> = first.regions.iter().map(|r| r.id.as_str()).collect();
    let unique = {
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        sorted.len()
    };
    assert_eq!(unique, ids.len(), "{path}: duplicate region ids");

    if let Ok(expected) = std::fs::read_to_string(path.with_extension("ids")) {
        let expected: Vec<&str> = expected
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        assert_eq!(ids, expected, "{path}: region ids");
    }

    Ok(())
}

datatest_stable::harness! {
    { test = check_layout, root = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/layouts"), pattern = r"\.svg$" },
}
