//! Engine - realtime and offline timer-loop drivers
//!
//! The engine owns a [`TimeManager`] and decides how its clock advances.
//! - Realtime: maps the wall clock (scaled by `rate`) onto logical time and
//!   uses spin_sleep to wake precisely at the next deadline or frame.
//! - Offline: the caller steps time explicitly, faster than realtime.

use crate::error::EngineError;
use crate::time_manager::{TimeManager, DEFAULT_MAX_CALLBACKS};
use crate::timers::{DurationMs, TimeMs, Timers, TimersPtr};
use spin_sleep::SpinSleeper;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Engine execution mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineMode {
    Realtime,
    Offline,
}

impl EngineMode {
    fn as_str(&self) -> &'static str {
        match self {
            EngineMode::Realtime => "realtime",
            EngineMode::Offline => "offline",
        }
    }
}

/// Configuration for launching the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Frame rate used by `step_frame` and the realtime animation cadence.
    pub fps: f64,
    /// Logical milliseconds per wall millisecond (realtime only).
    pub rate: f64,
    /// Runaway guard for a single clock update.
    pub max_callbacks_per_update: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps: 60.0,
            rate: 1.0,
            max_callbacks_per_update: DEFAULT_MAX_CALLBACKS,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "fps must be positive, got {}",
                self.fps
            )));
        }
        if !(self.rate.is_finite() && self.rate > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "rate must be positive, got {}",
                self.rate
            )));
        }
        if self.max_callbacks_per_update == 0 {
            return Err(EngineError::InvalidConfig(
                "max_callbacks_per_update must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Drives one timer loop.
pub struct Engine {
    mode: EngineMode,
    time_manager: Rc<TimeManager>,
    sleeper: SpinSleeper,
    frame_ms: DurationMs,
    rate: f64,
    wall_anchor: Instant,
    logical_anchor: TimeMs,
}

impl Engine {
    /// Create a new engine with the given mode and configuration.
    pub fn new(mode: EngineMode, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let time_manager =
            Rc::new(TimeManager::new().with_max_callbacks(config.max_callbacks_per_update));
        debug!(mode = mode.as_str(), fps = config.fps, rate = config.rate, "engine created");

        Ok(Self {
            mode,
            time_manager,
            sleeper: SpinSleeper::default(),
            frame_ms: 1000.0 / config.fps,
            rate: config.rate,
            wall_anchor: Instant::now(),
            logical_anchor: 0.0,
        })
    }

    /// An offline engine with the default configuration.
    pub fn offline() -> Self {
        Self::with_defaults(EngineMode::Offline)
    }

    /// A realtime engine with the default configuration.
    pub fn realtime() -> Self {
        Self::with_defaults(EngineMode::Realtime)
    }

    fn with_defaults(mode: EngineMode) -> Self {
        let config = EngineConfig::default();
        Self {
            mode,
            time_manager: Rc::new(TimeManager::new()),
            sleeper: SpinSleeper::default(),
            frame_ms: 1000.0 / config.fps,
            rate: config.rate,
            wall_anchor: Instant::now(),
            logical_anchor: 0.0,
        }
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    /// The timer loop handle to pass to action factories.
    pub fn timers(&self) -> TimersPtr {
        self.time_manager.clone()
    }

    pub fn time_manager(&self) -> &Rc<TimeManager> {
        &self.time_manager
    }

    /// Current logical time.
    pub fn now(&self) -> TimeMs {
        self.time_manager.current_time()
    }

    pub fn frame_duration(&self) -> DurationMs {
        self.frame_ms
    }

    fn require(&self, mode: EngineMode, operation: &'static str) -> Result<(), EngineError> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(EngineError::WrongMode {
                operation,
                mode: self.mode.as_str(),
            })
        }
    }

    /// Advance offline time to `target`, running everything that falls due.
    pub fn advance_to(&mut self, target: TimeMs) -> Result<(), EngineError> {
        self.require(EngineMode::Offline, "advance_to")?;
        let target = if target.is_finite() { target.max(0.0) } else { self.now() };
        self.time_manager.update_time(target)?;
        Ok(())
    }

    /// Step by a number of milliseconds (offline mode).
    pub fn step_ms(&mut self, dt: DurationMs) -> Result<(), EngineError> {
        let s = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let target = self.now() + s;
        self.advance_to(target)
    }

    /// Step by one frame (offline mode).
    pub fn step_frame(&mut self) -> Result<(), EngineError> {
        self.step_ms(self.frame_ms)
    }

    /// Step by N frames (offline mode).
    pub fn step_frames(&mut self, n: usize) -> Result<(), EngineError> {
        for _ in 0..n {
            self.step_frame()?;
        }
        Ok(())
    }

    /// Logical time corresponding to the wall clock right now.
    fn wall_time(&self) -> TimeMs {
        let dt = self.wall_anchor.elapsed().as_secs_f64() * 1000.0;
        self.logical_anchor + dt * self.rate
    }

    /// Run in realtime until `is_done` returns true.
    pub fn run_until<F>(&mut self, mut is_done: F) -> Result<(), EngineError>
    where
        F: FnMut() -> bool,
    {
        self.run_loop("run_until", |_| is_done())
    }

    /// Run in realtime for `duration` logical milliseconds.
    pub fn run_for(&mut self, duration: DurationMs) -> Result<(), EngineError> {
        let end = self.now() + duration.max(0.0);
        self.run_loop("run_for", |now| now >= end)
    }

    fn run_loop<F>(&mut self, operation: &'static str, mut is_done: F) -> Result<(), EngineError>
    where
        F: FnMut(TimeMs) -> bool,
    {
        self.require(EngineMode::Realtime, operation)?;

        // Re-anchor so time spent outside the loop is not replayed.
        self.logical_anchor = self.now();
        self.wall_anchor = Instant::now();

        loop {
            let now = self.wall_time();
            self.time_manager.update_time(now)?;

            if is_done(self.now()) {
                return Ok(());
            }

            // Wake for the next deadline, or the next frame if sooner.
            let mut next = now + self.frame_ms;
            if let Some(deadline) = self.time_manager.next_deadline() {
                next = next.min(deadline);
            }

            let dt_wall = ((next - now) / self.rate).max(0.0);
            self.sleeper.sleep(Duration::from_secs_f64(dt_wall / 1000.0));
        }
    }
}
