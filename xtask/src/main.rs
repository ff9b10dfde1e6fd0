use camino::{Utf8Path, Utf8PathBuf};
use miette::{IntoDiagnostic, Report, WrapErr};
use parkview::{
    MarkupError, ParseConfig, ParsedLayout, Px, RegionKind, SectionDescriptor, Size,
    parse_layout, resolve_layout,
};
use rayon::prelude::*;
use std::fs;

const PREVIEW: f64 = 320.0;

fn main() -> miette::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: cargo xtask <command>");
        eprintln!("Commands:");
        eprintln!("  inspect <layout.svg>   List regions and diagnostics of one layout");
        eprintln!("  report [dir]           Generate an HTML overview of a fixture directory");
        std::process::exit(1);
    }

    match args[1].as_str() {
        "inspect" => {
            let Some(path) = args.get(2) else {
                eprintln!("inspect needs a layout file");
                std::process::exit(1);
            };
            inspect(Utf8Path::new(path))
        }
        "report" => {
            let dir = match args.get(2) {
                Some(dir) => Utf8PathBuf::from(dir),
                None => workspace_root().join("tests/layouts"),
            };
            report(&dir)
        }
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            std::process::exit(1);
        }
    }
}

fn workspace_root() -> Utf8PathBuf {
    let manifest_dir = Utf8Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .unwrap_or(manifest_dir)
        .to_path_buf()
}

/// Fixture plus its optional `name.sections.json` sidecar
fn load(path: &Utf8Path) -> miette::Result<(String, ParsedLayout)> {
    let svg = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {path}"))?;
    let sections: Vec<SectionDescriptor> =
        match fs::read_to_string(path.with_extension("sections.json")) {
            Ok(json) => serde_json::from_str(&json)
                .into_diagnostic()
                .wrap_err("reading section descriptors")?,
            Err(_) => Vec::new(),
        };
    let parsed = parse_layout(&svg, &sections, &ParseConfig::default());
    Ok((svg, parsed))
}

fn inspect(path: &Utf8Path) -> miette::Result<()> {
    let (svg, parsed) = load(path)?;
    let vb = parsed.view_box;
    println!(
        "{path}: viewBox {} {} {} {}, {} regions",
        vb.min_x,
        vb.min_y,
        vb.width,
        vb.height,
        parsed.regions.len()
    );
    for region in &parsed.regions {
        let r = region.rect;
        println!(
            "  {:<20} {:<8} {:>8.1} {:>8.1} {:>7.1}x{:<7.1} {:?}",
            region.id,
            format!("{:?}", region.kind()),
            r.x.raw(),
            r.y.raw(),
            r.width.raw(),
            r.height.raw(),
            region.source
        );
    }
    for diagnostic in parsed.diagnostics {
        let report = Report::new(diagnostic).with_source_code(svg.clone());
        eprintln!("{report:?}");
    }
    Ok(())
}

struct Entry {
    name: String,
    preview: String,
    regions: usize,
    diagnostics: Vec<MarkupError>,
}

fn report(dir: &Utf8Path) -> miette::Result<()> {
    let mut paths: Vec<Utf8PathBuf> = fs::read_dir(dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {dir}"))?
        .filter_map(|e| e.ok())
        .filter_map(|e| Utf8PathBuf::from_path_buf(e.path()).ok())
        .filter(|p| p.extension() == Some("svg"))
        .collect();
    paths.sort();

    let entries: Vec<Entry> = paths
        .par_iter()
        .map(|path| {
            let (_, parsed) = load(path)?;
            Ok(Entry {
                name: path.file_stem().unwrap_or(path.as_str()).to_string(),
                preview: preview(&parsed),
                regions: parsed.regions.len(),
                diagnostics: parsed.diagnostics,
            })
        })
        .collect::<miette::Result<_>>()?;

    let clean = entries.iter().filter(|e| e.diagnostics.is_empty()).count();
    let mut html = String::new();
    html.push_str(&format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Layout fixtures</title>
    <style>
        body {{ font-family: system-ui, sans-serif; background: #eee; color: #333; margin: 0; }}
        .page {{ max-width: 1100px; margin: 0 auto; padding: 24px; }}
        h1 {{ font-size: 20px; font-weight: 600; }}
        .card {{ background: white; border-radius: 8px; margin-bottom: 16px; padding: 12px 16px;
                 box-shadow: 0 1px 3px rgba(0,0,0,0.08); display: grid;
                 grid-template-columns: {PREVIEW}px 1fr; gap: 16px; }}
        .title {{ font-weight: 600; font-size: 13px; }}
        .diag {{ color: #991b1b; font-family: monospace; font-size: 11px; white-space: pre-wrap; }}
        .spot {{ fill: #bbf7d0; stroke: #166534; }}
        .section {{ fill: #bfdbfe; stroke: #1d4ed8; fill-opacity: 0.6; }}
    </style>
</head>
<body><div class="page">
<h1>{} fixtures, {} without diagnostics</h1>
"#,
        entries.len(),
        clean
    ));

    for entry in &entries {
        let diagnostics: Vec<String> = entry
            .diagnostics
            .iter()
            .map(|d| html_escape(&d.to_string()))
            .collect();
        html.push_str(&format!(
            r#"<div class="card" id="{name}">
    <div>{preview}</div>
    <div>
        <div class="title">{name}: {regions} regions</div>
        <div class="diag">{diagnostics}</div>
    </div>
</div>
"#,
            name = entry.name,
            preview = entry.preview,
            regions = entry.regions,
            diagnostics = diagnostics.join("\n"),
        ));
    }
    html.push_str("</div>\n</body></html>");

    let output_path = workspace_root().join("layouts.html");
    fs::write(&output_path, html)
        .into_diagnostic()
        .wrap_err_with(|| format!("writing {output_path}"))?;
    println!("Generated report at: {output_path}");
    Ok(())
}

/// Positioned regions drawn into a square preview
fn preview(parsed: &ParsedLayout) -> String {
    let target = Size::new(Px(PREVIEW), Px(PREVIEW));
    let positioned = match resolve_layout(&parsed.regions, &parsed.view_box, target) {
        Ok(p) => p,
        Err(e) => return format!(r#"<div class="diag">{}</div>"#, html_escape(&e.to_string())),
    };
    let mut svg = format!(r#"<svg width="{PREVIEW}" height="{PREVIEW}">"#);
    for p in positioned.regions() {
        let class = match p.region.kind() {
            RegionKind::Spot => "spot",
            RegionKind::Section => "section",
        };
        let r = p.rendered;
        svg.push_str(&format!(
            r#"<rect class="{class}" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}"><title>{}</title></rect>"#,
            r.x.raw(),
            r.y.raw(),
            r.width.raw(),
            r.height.raw(),
            html_escape(&p.region.id)
        ));
    }
    svg.push_str("</svg>");
    svg
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
