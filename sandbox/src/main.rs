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

// Khora Engine Sandbox
// Drives the default frame pipeline with simulated subsystems.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use khora_core::service_registry::ServiceRegistry;
use khora_core::time::EngineClock;
use khora_pipeline::{listener, slots, ExecutionPipeline, FrameOutcome};

/// Frames after which the simulated window is closed.
const RUN_FRAMES: u64 = 240;
const FRAME_TIME: Duration = Duration::from_micros(16_667);

/// Counters shared between the simulated subsystems.
#[derive(Default)]
struct FrameStats {
    updates: AtomicU64,
    sprites_batched: AtomicU64,
    frames_rendered: AtomicU64,
}

/// Something that attaches itself to the pipeline at startup.
trait Subsystem {
    fn name(&self) -> &'static str;
    fn attach(&self, services: &ServiceRegistry) -> Result<()>;
}

/// Closes the window after [`RUN_FRAMES`] frames.
struct WindowSystem;

impl Subsystem for WindowSystem {
    fn name(&self) -> &'static str {
        "window"
    }

    fn attach(&self, services: &ServiceRegistry) -> Result<()> {
        let pipeline = services.resolve::<ExecutionPipeline>()?;
        let pump = listener(|frame| {
            if frame.frame() + 1 >= RUN_FRAMES {
                log::info!("Window closed after {} frames.", frame.frame() + 1);
                frame.cancellation().cancel();
            }
            Ok(())
        });
        pipeline.add_event(slots::WINDOW_UPDATE, &pump)?;
        Ok(())
    }
}

/// Toggles pause and blur at fixed frames, standing in for player input.
struct InputSystem;

impl Subsystem for InputSystem {
    fn name(&self) -> &'static str {
        "input"
    }

    fn attach(&self, services: &ServiceRegistry) -> Result<()> {
        let pipeline = services.resolve::<ExecutionPipeline>()?;
        let poll = listener(|frame| {
            match frame.frame() {
                60 => {
                    log::info!("Input: pause pressed.");
                    frame.variable(slots::PAUSED).set(true);
                }
                90 => {
                    log::info!("Input: pause released.");
                    frame.variable(slots::PAUSED).set(false);
                }
                120 => {
                    log::info!("Input: blur enabled.");
                    frame.variable(slots::RENDER_GRAPH_BLUR_ENABLED).set(true);
                }
                _ => {}
            }
            Ok(())
        });
        pipeline.add_event(slots::INPUT_UPDATE, &poll)?;
        Ok(())
    }
}

/// Simulation, batching and rendering, recording into [`FrameStats`].
struct SceneSystem;

impl Subsystem for SceneSystem {
    fn name(&self) -> &'static str {
        "scene"
    }

    fn attach(&self, services: &ServiceRegistry) -> Result<()> {
        let pipeline = services.resolve::<ExecutionPipeline>()?;
        let stats = services.resolve::<FrameStats>()?;

        let update_stats = Arc::clone(&stats);
        let update = listener(move |_| {
            update_stats.updates.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });
        pipeline.add_event(slots::UPDATE, &update)?;

        let batch_stats = Arc::clone(&stats);
        let batch = listener(move |_| {
            // Pretend to build vertex data.
            thread::sleep(Duration::from_millis(2));
            batch_stats.sprites_batched.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });
        pipeline.add_event(slots::SPRITE_BATCH, &batch)?;

        let render_stats = Arc::clone(&stats);
        let render = listener(move |_| {
            render_stats.frames_rendered.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });
        pipeline.add_event(slots::RENDER, &render)?;

        let blur = listener(|frame| {
            log::trace!("Blur pass on frame {}.", frame.frame());
            Ok(())
        });
        pipeline.add_event(slots::RENDER_GRAPH_BLUR, &blur)?;

        let report_stats = stats;
        let diagnostics = listener(move |frame| {
            log::info!(
                "[{:>6.2}s] updates: {}, sprite batches: {}, frames rendered: {}",
                frame.elapsed(),
                report_stats.updates.load(Ordering::Relaxed),
                report_stats.sprites_batched.load(Ordering::Relaxed),
                report_stats.frames_rendered.load(Ordering::Relaxed),
            );
            Ok(())
        });
        pipeline.add_event(slots::DIAGNOSTICS, &diagnostics)?;
        Ok(())
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut services = ServiceRegistry::new();
    let pipeline = services.provide(ExecutionPipeline::builder().build()?);
    services.provide(FrameStats::default());
    log::debug!("Frame pipeline:\n{}", pipeline.graph().describe());

    let subsystems: [&dyn Subsystem; 3] = [&WindowSystem, &InputSystem, &SceneSystem];
    for subsystem in subsystems {
        subsystem.attach(&services)?;
        log::info!("Subsystem '{}' attached.", subsystem.name());
    }

    let mut clock = EngineClock::new();
    loop {
        clock.tick();
        match pipeline.tick_with(&clock)? {
            FrameOutcome::Completed => thread::sleep(FRAME_TIME),
            FrameOutcome::Cancelled => break,
        }
    }

    let stats = services.resolve::<FrameStats>()?;
    log::info!(
        "Stopped after {} frames: {} updates, {} sprite batches, {} frames rendered.",
        pipeline.frame_count(),
        stats.updates.load(Ordering::Relaxed),
        stats.sprites_batched.load(Ordering::Relaxed),
        stats.frames_rendered.load(Ordering::Relaxed),
    );
    Ok(())
}
