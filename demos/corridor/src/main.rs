//! corridor — two groups of agents swap ends of a 30-cell corridor.
//!
//! The corridor is cut in half by a one-cell chasm, crossed by a single
//! off-mesh link, so every agent plans through the link, queues for it
//! under local avoidance, and walks it with the default linear handler.
//!
//! ```text
//! cargo run -p corridor                      # defaults
//! cargo run -p corridor -- nav.toml          # NavConfig from a TOML file
//! RUST_LOG=nav_agent=debug cargo run -p corridor
//! ```

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nav_agent::{AgentArena, AgentBuilder, NavEvent};
use nav_avoidance::AvoidanceSettings;
use nav_core::{MovementPlane, SimClock, Vec3};
use nav_graph::presets;
use nav_sim::{NavConfig, NavObserver, NavSimBuilder};

// ── Constants ─────────────────────────────────────────────────────────────────

const COLS:           u32   = 30;
const ROWS:           u32   = 3;
const CHASM_COL:      u32   = 15;
const PER_SIDE:       usize = 4;
const MAX_TICKS:      u64   = 60 * 60;
const STATUS_EVERY:   u64   = 120;

// ── Observer ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Progress {
    arrived:   usize,
    crossings: usize,
    aborted:   usize,
    failed:    usize,
}

impl NavObserver for Progress {
    fn on_event(&mut self, event: &NavEvent) {
        match *event {
            NavEvent::ReachedDestination { agent } => {
                self.arrived += 1;
                info!(%agent, "arrived");
            }
            NavEvent::LinkTraversalFinished { .. } => self.crossings += 1,
            NavEvent::LinkTraversalAborted { agent, reason, .. } => {
                self.aborted += 1;
                info!(%agent, ?reason, "crossing aborted");
            }
            NavEvent::PathFailed { .. } => self.failed += 1,
            _ => {}
        }
    }

    fn on_tick_end(&mut self, clock: &SimClock, agents: &AgentArena) {
        if clock.tick % STATUS_EVERY != 0 {
            return;
        }
        let on_link = agents.iter().filter(|a| a.is_traversing_link()).count();
        info!(%clock, arrived = self.arrived, on_link, crossings = self.crossings, "status");
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            NavConfig::from_toml_str(&text).with_context(|| format!("parsing {path}"))?
        }
        None => NavConfig::default(),
    };
    info!(?config, "configuration");

    // 1. Mesh: a chasm across the middle column, one link over it.
    let mut mesh = presets::grid_with(MovementPlane::XZ, COLS, ROWS, 1.0, |c, _| c != CHASM_COL);
    let west = CHASM_COL as f32 - 0.1;
    let east = CHASM_COL as f32 + 1.1;
    mesh.add_link(Vec3::new(west, 0.0, 1.5), Vec3::new(east, 0.0, 1.5), true);
    let graph = mesh.build()?;
    info!(nodes = graph.node_count(), links = graph.link_count(), "mesh built");

    // 2. Simulation and agents.
    let mut sim = NavSimBuilder::new(config, graph).build()?;
    let mut handles = Vec::with_capacity(PER_SIDE * 2);
    for i in 0..PER_SIDE {
        let z = 0.5 + (i % ROWS as usize) as f32;
        let x = 1.0 + (i / ROWS as usize) as f32;
        for (start, goal) in [
            (Vec3::new(x, 0.0, z), Vec3::new(COLS as f32 - x, 0.0, z)),
            (Vec3::new(COLS as f32 - x, 0.0, z), Vec3::new(x, 0.0, z)),
        ] {
            let h = sim.spawn(AgentBuilder::new(start).avoidance(AvoidanceSettings::default()));
            sim.set_destination(h, goal, None)?;
            handles.push(h);
        }
    }
    info!(agents = handles.len(), "agents spawned");

    // 3. Run until everyone has arrived.
    let mut progress = Progress::default();
    let started = Instant::now();
    while sim.clock.tick < MAX_TICKS {
        sim.step(&mut progress);
        let done = handles
            .iter()
            .filter_map(|&h| sim.agent(h).ok())
            .all(|a| a.reached_destination());
        if done {
            break;
        }
    }

    // 4. Summary.
    let elapsed = started.elapsed();
    let arrived = handles
        .iter()
        .filter_map(|&h| sim.agent(h).ok())
        .filter(|a| a.reached_destination())
        .count();
    info!(
        ticks = sim.clock.tick,
        sim_secs = sim.clock.now_secs,
        wall_ms = elapsed.as_millis() as u64,
        arrived,
        crossings = progress.crossings,
        aborted = progress.aborted,
        failed_plans = progress.failed,
        "done"
    );
    Ok(())
}
