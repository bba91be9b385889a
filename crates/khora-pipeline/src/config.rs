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

//! Runtime configuration of an [`ExecutionPipeline`](crate::ExecutionPipeline).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One 60 Hz frame slice, in microseconds.
pub const DEFAULT_JOIN_TIMEOUT_US: u64 = 16_667;

/// Tunables of the pipeline. Every field has a default, so a partial JSON
/// document is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Tag of the container element at the root of the pipeline document.
    pub root_element: String,
    /// Number of worker threads serving `task` nodes. Clamped to at least one.
    pub worker_threads: usize,
    /// Upper bound, in microseconds, of a `task` join.
    pub join_timeout_us: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root_element: "pipeline".to_string(),
            worker_threads: 2,
            join_timeout_us: DEFAULT_JOIN_TIMEOUT_US,
        }
    }
}

impl PipelineConfig {
    /// The join timeout as a [`Duration`].
    pub fn join_timeout(&self) -> Duration {
        Duration::from_micros(self.join_timeout_us)
    }

    /// Load the configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load the configuration from a JSON file.
    pub fn from_file(
        path: impl AsRef<Path>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Serialize the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
