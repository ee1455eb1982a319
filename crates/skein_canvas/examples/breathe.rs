//! Breathe Demo
//!
//! A rect that slides across the canvas and back once per second, driven by
//! a frame clock. Runs headless: each frame is logged instead of drawn.
//!
//! Run with: cargo run -p skein_canvas --example breathe

use skein_animation::{mix, value_effect, ClockConfig, FrameClock};
use skein_canvas::{node, DependencyManager, Node, RedrawSurface};
use skein_core::{ReactiveGraph, Signal};
use std::rc::Rc;
use std::time::{Duration, Instant};

const FRAMES: u32 = 90;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut graph = ReactiveGraph::new();
    let mut clock = FrameClock::new(&mut graph, ClockConfig::default());
    let t = clock.value();
    let x = graph.create_signal(0.0f32);

    // Ping-pong between 0 and 400 with a 2s period
    value_effect(&mut graph, t, move |g| {
        let ms = g.get(t).unwrap_or(0.0);
        let phase = (ms / 1000.0) % 2.0;
        let progress = (if phase > 1.0 { 2.0 - phase } else { phase }) as f32;
        if let Err(err) = g.set(x, mix(progress, 0.0, 400.0)) {
            tracing::warn!(%err, "breathe effect failed");
        }
    })?;

    let surface = Rc::new(RedrawSurface::new());
    let mut manager = DependencyManager::with_surface(surface.clone());
    manager.render(&mut graph, &scene(x))?;

    let start = Instant::now();
    clock.start(start);
    for frame in 1..=FRAMES {
        let now = start + clock.frame_interval() * frame;
        clock.tick(&mut graph, now)?;

        if surface.take_redraw() {
            manager.render(&mut graph, &scene(x))?;
            tracing::info!(frame, x = graph.get(x).unwrap_or_default(), "redraw");
        }
    }
    clock.stop();
    manager.unsubscribe(&mut graph);

    tracing::info!(
        invalidations = surface.invalidation_count(),
        elapsed = ?Duration::from_secs_f64(graph.get(t).unwrap_or_default() / 1000.0),
        "done"
    );
    Ok(())
}

fn scene(x: Signal<f32>) -> Node {
    node("canvas").child(
        node("rect")
            .prop("x", x)
            .prop("y", 50.0f32)
            .prop("width", 100.0f32)
            .prop("height", 100.0f32)
            .prop("fill", [0.2f32, 0.6, 1.0, 1.0]),
    )
}
