//! Frame clock
//!
//! A [`FrameClock`] owns a signal holding the milliseconds elapsed since the
//! clock was started. The host's frame loop calls [`FrameClock::tick`] once per
//! frame; every tick is one write, so everything derived from the clock settles
//! exactly once per frame.
//!
//! ```
//! use skein_animation::{ClockConfig, FrameClock};
//! use skein_core::ReactiveGraph;
//! use std::time::Instant;
//!
//! let mut graph = ReactiveGraph::new();
//! let mut clock = FrameClock::new(&mut graph, ClockConfig::default());
//! let start = Instant::now();
//! clock.start(start);
//!
//! // One tick per frame; a real host sleeps `frame_interval()` between them
//! for frame in 1..=3 {
//!     clock.tick(&mut graph, start + clock.frame_interval() * frame)?;
//! }
//! assert_eq!(clock.frames(), 3);
//! assert!(graph.get(clock.value()).unwrap_or_default() > 0.0);
//! # Ok::<(), skein_core::ReactiveError>(())
//! ```

use serde::{Deserialize, Serialize};
use skein_core::{ReactiveError, ReactiveGraph, Result, Signal};
use std::time::{Duration, Instant};

/// Frame clock settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClockConfig {
    /// Frames per second the host aims for
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
}

fn default_target_fps() -> u32 {
    60
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
        }
    }
}

impl ClockConfig {
    /// Parse a config from TOML, filling missing keys with defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ReactiveError::Config(e.to_string()))
    }
}

/// Drives a signal with elapsed time
pub struct FrameClock {
    elapsed: Signal<f64>,
    started_at: Option<Instant>,
    frame_interval: Duration,
    frames: u64,
}

impl FrameClock {
    /// Create a stopped clock whose signal starts at 0
    pub fn new(graph: &mut ReactiveGraph, config: ClockConfig) -> Self {
        let fps = config.target_fps.max(1);
        Self {
            elapsed: graph.create_signal(0.0),
            started_at: None,
            frame_interval: Duration::from_micros(1_000_000 / u64::from(fps)),
            frames: 0,
        }
    }

    /// The signal holding elapsed milliseconds
    pub fn value(&self) -> Signal<f64> {
        self.elapsed
    }

    /// Start (or restart) measuring from `now`
    pub fn start(&mut self, now: Instant) {
        if self.started_at.is_none() {
            tracing::debug!("frame clock started");
        }
        self.started_at = Some(now);
        self.frames = 0;
    }

    /// Stop the clock; the signal keeps its last value
    pub fn stop(&mut self) {
        if self.started_at.take().is_some() {
            tracing::debug!(frames = self.frames, "frame clock stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Time between frames at the configured rate
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Frames ticked since the last start
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Write the elapsed time. Returns `false` (and writes nothing) when stopped.
    pub fn tick(&mut self, graph: &mut ReactiveGraph, now: Instant) -> Result<bool> {
        let Some(started_at) = self.started_at else {
            return Ok(false);
        };
        let elapsed_ms = now.saturating_duration_since(started_at).as_nanos() as f64 / 1_000_000.0;
        graph.set(self.elapsed, elapsed_ms)?;
        self.frames += 1;
        Ok(true)
    }
}
