//! Replays a scripted occupancy scenario through a live layout screen and
//! prints every classification change.
//!
//! ```text
//! parkview-replay scenarios/garage.json
//! RUST_LOG=parkview=debug parkview-replay scenarios/garage.json
//! ```

mod scenario;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use parkview::occupancy::MemoryHandoffSlot;
use parkview::{
    LayoutScreen, LoadOutcome, Px, ScreenTransition, SessionCache, Size, VisualState,
};
use scenario::{Scenario, ScriptedBackend};
use tokio::time::{Instant, sleep_until};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        bail!("usage: parkview-replay <scenario.json>");
    };
    let (scenario, svg) = Scenario::load(&path)?;

    let backend = ScriptedBackend::new(&scenario, svg);
    let handoff = Arc::new(MemoryHandoffSlot::new());
    let screen = LayoutScreen::new(
        backend.clone(),
        handoff,
        SessionCache::new(),
        Size::new(Px(800.0), Px(600.0)),
        Size::new(Px(400.0), Px(300.0)),
    )
    .with_config(scenario.config.clone());

    for step in scenario.steps.iter().take_while(|s| s.at_ms == 0) {
        backend.apply(step);
    }
    match screen
        .load_layout(&scenario.area)
        .await
        .context("loading layout")?
    {
        LoadOutcome::Loaded {
            regions,
            diagnostics,
        } => {
            info!(regions, "layout loaded");
            for diagnostic in diagnostics {
                warn!("{diagnostic}");
            }
        }
        other => bail!("layout not available: {other:?}"),
    }
    let offset = screen.center_offset();
    println!("viewport centered at {}, {}", offset.x, offset.y);

    screen.start_live(scenario.reservation.clone()).await;
    let Some(mut updates) = screen.status_updates() else {
        bail!("live updates did not start");
    };

    let start = Instant::now();
    let end = start
        + Duration::from_millis(scenario.steps.last().map_or(0, |s| s.at_ms) + scenario.tail_ms);
    let mut steps = scenario.steps.iter().skip_while(|s| s.at_ms == 0).peekable();
    let mut shown: BTreeMap<String, VisualState> = BTreeMap::new();
    print_changes(&screen, &mut shown, start);

    loop {
        let next_step = steps
            .peek()
            .map(|s| start + Duration::from_millis(s.at_ms));
        tokio::select! {
            _ = sleep_until(next_step.unwrap_or(end)), if next_step.is_some() => {
                if let Some(step) = steps.next() {
                    backend.apply(step);
                    if let Some(event) = step.push.as_ref().and_then(|p| p.decode()) {
                        screen.notify(event);
                    }
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                print_changes(&screen, &mut shown, start);
            }
            transition = screen.next_transition() => {
                match transition {
                    Some(ScreenTransition::SignedOut) => {
                        println!("{:>6}ms  signed out", start.elapsed().as_millis());
                        break;
                    }
                    Some(ScreenTransition::ReservationExpired(payload)) => {
                        println!(
                            "{:>6}ms  reservation {} expired, billed {}",
                            start.elapsed().as_millis(),
                            payload.reservation_id,
                            payload.billing.map_or(0.0, |b| b.total_amount)
                        );
                        break;
                    }
                    None => break,
                }
            }
            _ = sleep_until(end) => break,
        }
    }
    Ok(())
}

fn print_changes(screen: &LayoutScreen, shown: &mut BTreeMap<String, VisualState>, start: Instant) {
    for view in screen.view() {
        if shown.get(&view.id) == Some(&view.state) {
            continue;
        }
        println!(
            "{:>6}ms  {:<16} {}",
            start.elapsed().as_millis(),
            view.id,
            view.state.name()
        );
        shown.insert(view.id, view.state);
    }
}
