// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Engine time.
//!
//! Real time is measured by a [`Stopwatch`]. Engine time is what gameplay
//! sees: it is derived from real time by an [`EngineClock`], which can be
//! paused and scaled. Consumers only depend on the [`TimeSource`] contract.

use std::time::{Duration, Instant};

/// Anything able to report elapsed engine time.
pub trait TimeSource {
    /// Seconds of engine time elapsed since the source started.
    fn elapsed_secs(&self) -> f64;
}

/// Measures real time since its creation.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    start_time: Option<Instant>,
}

impl Stopwatch {
    /// Creates a stopwatch and starts it.
    #[inline]
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
        }
    }

    /// Time elapsed since the stopwatch was started.
    #[inline]
    pub fn elapsed(&self) -> Option<Duration> {
        self.start_time.map(|start| start.elapsed())
    }

    /// Elapsed time in milliseconds.
    #[inline]
    pub fn elapsed_ms(&self) -> Option<u64> {
        self.elapsed().map(|d| d.as_millis() as u64)
    }

    /// Elapsed time in seconds.
    #[inline]
    pub fn elapsed_secs_f64(&self) -> Option<f64> {
        self.elapsed().map(|d| d.as_secs_f64())
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for Stopwatch {
    fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs_f64().unwrap_or(0.0)
    }
}

/// Pausable, time-scaled engine clock.
///
/// The clock advances either from real time, once per frame with
/// [`tick`](Self::tick), or by explicit amounts with
/// [`advance`](Self::advance). While paused, real time passes but engine
/// time does not.
#[derive(Debug, Clone)]
pub struct EngineClock {
    stopwatch: Stopwatch,
    last_real_secs: f64,
    elapsed_secs: f64,
    delta_secs: f64,
    time_scale: f64,
    paused: bool,
}

impl Default for EngineClock {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineClock {
    /// Creates a running clock at zero with a time scale of 1.
    pub fn new() -> Self {
        Self {
            stopwatch: Stopwatch::new(),
            last_real_secs: 0.0,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            time_scale: 1.0,
            paused: false,
        }
    }

    /// Advances by the real time measured since the previous `tick`.
    /// Returns the engine-time delta of this frame.
    pub fn tick(&mut self) -> f64 {
        let now = self.stopwatch.elapsed_secs();
        let real_delta = (now - self.last_real_secs).max(0.0);
        self.last_real_secs = now;
        self.advance(real_delta)
    }

    /// Advances by `real_delta_secs` of real time, subject to pause and time
    /// scale. Returns the engine-time delta.
    pub fn advance(&mut self, real_delta_secs: f64) -> f64 {
        self.delta_secs = if self.paused || !real_delta_secs.is_finite() {
            0.0
        } else {
            real_delta_secs.max(0.0) * self.time_scale
        };
        self.elapsed_secs += self.delta_secs;
        self.delta_secs
    }

    /// Engine-time delta of the last advance.
    pub fn delta_secs(&self) -> f64 {
        self.delta_secs
    }

    /// Stops engine time.
    pub fn pause(&mut self) {
        if !self.paused {
            log::debug!("Engine clock paused at {:.3}s.", self.elapsed_secs);
            self.paused = true;
        }
    }

    /// Restarts engine time.
    pub fn resume(&mut self) {
        if self.paused {
            log::debug!("Engine clock resumed at {:.3}s.", self.elapsed_secs);
            self.paused = false;
        }
    }

    /// Returns `true` while paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Multiplier applied to real time. Negative scales are clamped to 0.
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = if scale.is_finite() { scale.max(0.0) } else { 1.0 };
    }

    /// The current time scale.
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }
}

impl TimeSource for EngineClock {
    fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_stopwatch_measures_real_time() {
        let watch = Stopwatch::new();
        thread::sleep(Duration::from_millis(20));
        let elapsed = watch.elapsed_ms().expect("started stopwatch");
        assert!(elapsed >= 20, "elapsed ({elapsed} ms) should cover the sleep");
        assert!(watch.elapsed_secs() >= 0.02);
    }

    #[test]
    fn test_clock_advances_manually() {
        let mut clock = EngineClock::new();
        assert_eq!(clock.elapsed_secs(), 0.0);
        assert_eq!(clock.advance(0.5), 0.5);
        clock.advance(0.25);
        assert_eq!(clock.elapsed_secs(), 0.75);
        assert_eq!(clock.delta_secs(), 0.25);
    }

    #[test]
    fn test_paused_clock_does_not_advance() {
        let mut clock = EngineClock::new();
        clock.advance(1.0);
        clock.pause();
        assert!(clock.is_paused());
        assert_eq!(clock.advance(3.0), 0.0);
        assert_eq!(clock.elapsed_secs(), 1.0);

        clock.resume();
        clock.advance(1.0);
        assert_eq!(clock.elapsed_secs(), 2.0);
    }

    #[test]
    fn test_time_scale() {
        let mut clock = EngineClock::new();
        clock.set_time_scale(2.0);
        clock.advance(0.5);
        assert_eq!(clock.elapsed_secs(), 1.0);

        clock.set_time_scale(-4.0);
        assert_eq!(clock.time_scale(), 0.0);
        clock.advance(10.0);
        assert_eq!(clock.elapsed_secs(), 1.0);
    }

    #[test]
    fn test_tick_follows_real_time() {
        let mut clock = EngineClock::new();
        thread::sleep(Duration::from_millis(10));
        let delta = clock.tick();
        assert!(delta >= 0.01, "delta ({delta}) should cover the sleep");
        assert_eq!(clock.elapsed_secs(), delta);
    }

    #[test]
    fn test_time_source_is_object_safe() {
        let mut clock = EngineClock::new();
        clock.advance(4.0);
        let source: &dyn TimeSource = &clock;
        assert_eq!(source.elapsed_secs(), 4.0);
    }
}
