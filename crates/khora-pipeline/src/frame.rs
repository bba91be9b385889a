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

//! Per-frame data handed to every listener.

use crate::cancel::CancellationToken;
use crate::key::VariableKey;
use crate::variable::{Variable, VariableStore};
use std::fmt;
use std::sync::Arc;

/// What a listener sees of the frame being walked.
///
/// Cloned into task jobs, so it only carries shared handles.
#[derive(Clone)]
pub struct FrameContext {
    frame: u64,
    elapsed: f64,
    variables: Arc<VariableStore>,
    cancellation: CancellationToken,
}

impl FrameContext {
    /// Builds the context of one walk.
    pub fn new(
        frame: u64,
        elapsed: f64,
        variables: Arc<VariableStore>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            frame,
            elapsed,
            variables,
            cancellation,
        }
    }

    /// Zero-based index of the frame.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Elapsed engine time in seconds, as supplied by the engine's time source.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// The pipeline's variable store.
    pub fn variables(&self) -> &Arc<VariableStore> {
        &self.variables
    }

    /// Shorthand for `variables().get_or_create(name)`.
    pub fn variable(&self, name: &str) -> Variable {
        self.variables.get_or_create(name)
    }

    /// Shorthand for `variables().get_or_create_by_key(key)`.
    pub fn variable_by_key(&self, key: VariableKey) -> Variable {
        self.variables.get_or_create_by_key(key)
    }

    /// The pipeline's cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns `true` once the pipeline has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl fmt::Debug for FrameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameContext")
            .field("frame", &self.frame)
            .field("elapsed", &self.elapsed)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
