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

//! `<task end="...">`
//!
//! A task node forks its whole subtree (its own listeners, then its children)
//! onto the worker pool and returns immediately. The node named by `end` joins
//! it later in the same walk: when the `end` node runs, it waits for the
//! forked work for at most the configured join timeout, then carries on
//! whether or not the work finished. Unfinished work keeps running detached.

use super::{DefineContext, NodeBehavior, NodeId, PipelineNode, Walk};
use crate::error::{CompileError, ExecuteError};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Forks its subtree onto a worker thread and is joined by its `end` node.
#[derive(Debug, Default)]
pub struct TaskNode {
    end: Option<NodeId>,
    join_timeout: Duration,
    pending: Mutex<Option<Receiver<()>>>,
    in_flight: Arc<AtomicUsize>,
}

impl TaskNode {
    /// The node joining this task, if any.
    pub fn end(&self) -> Option<NodeId> {
        self.end
    }

    /// How long a join waits for the forked work.
    pub fn join_timeout(&self) -> Duration {
        self.join_timeout
    }

    /// Number of forked jobs that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Returns `true` if a fork is waiting to be joined.
    pub fn has_pending_join(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl NodeBehavior for TaskNode {
    fn define(&mut self, ctx: &mut DefineContext<'_>) -> Result<(), CompileError> {
        self.join_timeout = ctx.config().join_timeout();
        if let Some(end) = ctx.attribute("end") {
            let target = ctx.resolve("end", end)?;
            ctx.link_into(target);
            self.end = Some(target);
        }
        Ok(())
    }

    fn execute(&self, node: &PipelineNode, walk: &Walk<'_>) -> Result<(), ExecuteError> {
        walk.join_linked(node)?;
        walk.checkpoint()?;

        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
        let graph = Arc::clone(walk.graph());
        let frame = walk.frame().clone();
        let spawner = walk.spawner().clone();
        let id = node.id();
        let label = node.label();

        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let in_flight = InFlightGuard(Arc::clone(&self.in_flight));

        let submitted = walk.spawner().submit(move || {
            let _in_flight = in_flight;
            let walk = Walk::new(&graph, &frame, &spawner);
            let node = graph.node(id);
            match walk.fire(node).and_then(|()| walk.descend(node)) {
                Ok(()) => {}
                Err(ExecuteError::Cancelled) => {
                    log::debug!("{label} unwound on cancellation.");
                }
                Err(e) => log::error!("{label} failed on worker: {e}"),
            }
            // The receiver is gone when nobody waits for this fork.
            let _ = done_tx.send(());
        });
        if !submitted {
            return Err(ExecuteError::WorkerUnavailable { node: node.label() });
        }

        if self.end.is_some() {
            let previous = self
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .replace(done_rx);
            if previous.is_some() {
                log::debug!("{} forked again before its previous join.", node.label());
            }
        }
        Ok(())
    }

    fn join(&self, node: &PipelineNode, _walk: &Walk<'_>) -> Result<(), ExecuteError> {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(done) = pending else {
            return Ok(());
        };

        match done.recv_timeout(self.join_timeout) {
            Ok(()) => log::trace!("{} joined.", node.label()),
            Err(RecvTimeoutError::Timeout) => {
                log::debug!(
                    "{} still running after {:?}; continuing detached.",
                    node.label(),
                    self.join_timeout
                );
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("{} worker ended without reporting completion.", node.label());
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
