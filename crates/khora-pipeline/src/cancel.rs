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

//! The pipeline-wide cooperative stop signal.
//!
//! There is exactly one signal per pipeline. It is set once (usually on
//! engine shutdown) and never reset. Nodes poll it at every boundary of the
//! walk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owner side of the signal. Held by the [`ExecutionPipeline`](crate::ExecutionPipeline).
#[derive(Debug, Default)]
pub struct CancellationSource {
    flag: Arc<AtomicBool>,
}

impl CancellationSource {
    /// Creates a source whose signal is not set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signal. Later calls are no-ops.
    pub fn cancel(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            log::info!("Pipeline cancellation requested.");
        }
    }

    /// Returns a token observing this source.
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            flag: Arc::clone(&self.flag),
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Observer side of the signal, cloned into every frame and every task job.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Returns `true` once the owning source has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Sets the signal from the observer side.
    ///
    /// Listeners use this to stop the walk they are part of, for example when
    /// a window reports that it was closed.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_observe_source() {
        let source = CancellationSource::new();
        let token = source.token();
        assert!(!token.is_cancelled());

        source.cancel();
        assert!(token.is_cancelled());
        assert!(source.token().is_cancelled());
    }

    #[test]
    fn test_token_cancel_reaches_source() {
        let source = CancellationSource::new();
        source.token().clone().cancel();
        assert!(source.is_cancelled());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let source = CancellationSource::new();
        source.cancel();
        source.cancel();
        assert!(source.is_cancelled());
    }
}
