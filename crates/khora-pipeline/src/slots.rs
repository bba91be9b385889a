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

//! Well-known slots and variables of the default engine pipeline.
//!
//! Subsystems address nodes of [`DEFAULT_PIPELINE`] through these constants
//! only; they never traverse the tree.

use crate::key::NodeKey;

/// The pipeline document the engine runs when none is supplied.
pub const DEFAULT_PIPELINE: &str = include_str!("../assets/default_pipeline.xml");

// --- Slots ---

/// Window event pumping.
pub const WINDOW_UPDATE: NodeKey = NodeKey::from_name("window_update");
/// Input device polling.
pub const INPUT_UPDATE: NodeKey = NodeKey::from_name("input_update");
/// First phase of the simulation update. Skipped while [`PAUSED`].
pub const UPDATE_BEGIN: NodeKey = NodeKey::from_name("update_begin");
/// The simulation update. Skipped while [`PAUSED`].
pub const UPDATE: NodeKey = NodeKey::from_name("update");
/// Camera updates, inside [`UPDATE`].
pub const SCENE_CAMERA_UPDATE: NodeKey = NodeKey::from_name("scene_camera_update");
/// State machine updates, inside [`UPDATE`].
pub const STATE_MACHINE_UPDATE: NodeKey = NodeKey::from_name("state_machine_update");
/// Sprite batching, forked onto a worker and joined by [`RENDER`].
pub const SPRITE_BATCH: NodeKey = NodeKey::from_name("sprite_batch");
/// Text batching, forked onto a worker and joined by [`RENDER`].
pub const TEXT_BATCH: NodeKey = NodeKey::from_name("text_batch");
/// Last phase of the simulation update. Skipped while [`PAUSED`].
pub const UPDATE_END: NodeKey = NodeKey::from_name("update_end");
/// Render graph compilation.
pub const RENDER_GRAPH_COMPILE: NodeKey = NodeKey::from_name("render_graph_compile");
/// Blur pass, run only while [`RENDER_GRAPH_BLUR_ENABLED`] is `true`.
pub const RENDER_GRAPH_BLUR: NodeKey = NodeKey::from_name("render_graph_blur");
/// Frame submission.
pub const RENDER: NodeKey = NodeKey::from_name("render");
/// Once-per-second diagnostics.
pub const DIAGNOSTICS: NodeKey = NodeKey::from_name("diagnostics");

/// Every slot declared above.
pub const ALL: [NodeKey; 13] = [
    WINDOW_UPDATE,
    INPUT_UPDATE,
    UPDATE_BEGIN,
    UPDATE,
    SCENE_CAMERA_UPDATE,
    STATE_MACHINE_UPDATE,
    SPRITE_BATCH,
    TEXT_BATCH,
    UPDATE_END,
    RENDER_GRAPH_COMPILE,
    RENDER_GRAPH_BLUR,
    RENDER,
    DIAGNOSTICS,
];

// --- Variables ---

/// When `true`, the update phase is skipped.
pub const PAUSED: &str = "paused";
/// When `true`, the blur pass runs.
pub const RENDER_GRAPH_BLUR_ENABLED: &str = "render_graph_blur_enabled";
