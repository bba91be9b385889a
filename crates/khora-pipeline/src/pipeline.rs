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

//! The engine-facing pipeline.

use crate::cancel::{CancellationSource, CancellationToken};
use crate::compiler::GraphCompiler;
use crate::config::PipelineConfig;
use crate::error::{ExecuteError, PipelineError};
use crate::frame::FrameContext;
use crate::graph::PipelineGraph;
use crate::key::{NodeKey, VariableKey};
use crate::listener::EventListener;
use crate::node::{NodeBehavior, NodeId, PipelineNode, Walk};
use crate::registry::NodeRegistry;
use crate::slots::DEFAULT_PIPELINE;
use crate::variable::{Value, Variable, VariableStore};
use crate::worker::{Spawner, WorkerPool};
use khora_core::time::TimeSource;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// How a walk ended when no listener failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Every reachable node was executed.
    Completed,
    /// The walk observed the cancellation signal and unwound.
    Cancelled,
}

/// Configures and compiles an [`ExecutionPipeline`].
///
/// Without an explicit document, the embedded
/// [`DEFAULT_PIPELINE`](crate::slots::DEFAULT_PIPELINE) is compiled.
#[derive(Debug)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    registry: NodeRegistry,
    document: Option<String>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            config: PipelineConfig::default(),
            registry: NodeRegistry::with_builtins(),
            document: None,
        }
    }
}

impl PipelineBuilder {
    /// Starts with the default configuration and the built-in tags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads the configuration from a JSON file.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        self.config = PipelineConfig::from_file(path).map_err(PipelineError::Config)?;
        Ok(self)
    }

    /// Replaces the tag registry.
    pub fn registry(mut self, registry: NodeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Adds a tag to the registry.
    pub fn register<F>(mut self, tag: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn NodeBehavior> + Send + Sync + 'static,
    {
        self.registry.register(tag, factory);
        self
    }

    /// Sets the pipeline document.
    pub fn document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Compiles the document and starts the worker threads.
    pub fn build(self) -> Result<ExecutionPipeline, PipelineError> {
        let document = self.document.as_deref().unwrap_or(DEFAULT_PIPELINE);
        let variables = Arc::new(VariableStore::new());
        let graph = GraphCompiler::new(&self.registry, &self.config).compile(document, &variables)?;
        ExecutionPipeline::assemble(graph, variables, self.config)
    }

    /// Compiles the document at `path` and starts the worker threads.
    pub fn build_from_file(self, path: impl AsRef<Path>) -> Result<ExecutionPipeline, PipelineError> {
        let variables = Arc::new(VariableStore::new());
        let graph =
            GraphCompiler::new(&self.registry, &self.config).compile_file(path, &variables)?;
        ExecutionPipeline::assemble(graph, variables, self.config)
    }
}

/// A compiled pipeline ready to be ticked once per frame.
///
/// Subsystems attach [`EventListener`]s to named slots (see
/// [`slots`](crate::slots)); the engine loop calls [`tick`](Self::tick) with
/// the elapsed engine time. The graph's structure never changes after
/// compilation; listeners and variables may change at any time and from any
/// thread.
pub struct ExecutionPipeline {
    graph: Arc<PipelineGraph>,
    variables: Arc<VariableStore>,
    // Dropped before `workers`, whose threads only exit once every sender is gone.
    spawner: Spawner,
    workers: WorkerPool,
    cancellation: CancellationSource,
    frame: AtomicU64,
    config: PipelineConfig,
}

impl ExecutionPipeline {
    /// Compiles `document` with the default configuration.
    pub fn from_xml(document: &str) -> Result<Self, PipelineError> {
        PipelineBuilder::new().document(document).build()
    }

    /// Compiles the document at `path` with the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        PipelineBuilder::new().build_from_file(path)
    }

    /// Starts configuring a pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    fn assemble(
        graph: PipelineGraph,
        variables: Arc<VariableStore>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let workers = WorkerPool::new(config.worker_threads).map_err(PipelineError::WorkerSpawn)?;
        Ok(Self {
            graph: Arc::new(graph),
            variables,
            spawner: workers.spawner(),
            workers,
            cancellation: CancellationSource::new(),
            frame: AtomicU64::new(0),
            config,
        })
    }

    /// The compiled graph.
    pub fn graph(&self) -> &Arc<PipelineGraph> {
        &self.graph
    }

    /// The configuration the pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of worker threads serving `task` nodes.
    pub fn worker_threads(&self) -> usize {
        self.workers.threads()
    }

    // --- Events ---

    fn slot(&self, slot: NodeKey) -> Result<&PipelineNode, PipelineError> {
        self.graph.find(slot).ok_or(PipelineError::UnknownSlot(slot))
    }

    /// Returns `true` if a node of the graph carries `slot`.
    pub fn contains_slot(&self, slot: NodeKey) -> bool {
        self.graph.contains(slot)
    }

    /// Attaches `listener` to the node `slot`. Returns `false` if it was
    /// already attached there.
    pub fn add_event(&self, slot: NodeKey, listener: &EventListener) -> Result<bool, PipelineError> {
        Ok(self.slot(slot)?.listeners().add(listener))
    }

    /// Detaches `listener` from the node `slot`. Returns `false` if it was not
    /// attached there.
    pub fn remove_event(
        &self,
        slot: NodeKey,
        listener: &EventListener,
    ) -> Result<bool, PipelineError> {
        Ok(self.slot(slot)?.listeners().remove(listener))
    }

    /// Detaches every listener of the node `slot`.
    pub fn clear_events(&self, slot: NodeKey) -> Result<(), PipelineError> {
        self.slot(slot)?.listeners().clear();
        Ok(())
    }

    /// Number of listeners attached to the node `slot`.
    pub fn listener_count(&self, slot: NodeKey) -> Result<usize, PipelineError> {
        Ok(self.slot(slot)?.listeners().len())
    }

    // --- Variables ---

    /// The shared variable store.
    pub fn variables(&self) -> &Arc<VariableStore> {
        &self.variables
    }

    /// Returns the variable named `name`, creating it unset if needed.
    pub fn variable(&self, name: &str) -> Variable {
        self.variables.get_or_create(name)
    }

    /// Returns the variable stored under `key`, creating it unset if needed.
    pub fn variable_by_key(&self, key: VariableKey) -> Variable {
        self.variables.get_or_create_by_key(key)
    }

    /// Sets the variable named `name`.
    pub fn set_variable(&self, name: &str, value: impl Into<Value>) {
        self.variable(name).set(value);
    }

    // --- Execution ---

    /// Walks the whole tree once.
    pub fn tick(&self, elapsed_secs: f64) -> Result<FrameOutcome, ExecuteError> {
        let frame = self.frame.fetch_add(1, Ordering::AcqRel);
        log::trace!("Pipeline frame {frame} at {elapsed_secs:.4}s.");
        self.walk(self.graph.root().id(), frame, elapsed_secs)
    }

    /// Walks the whole tree once, reading the elapsed time from `time`.
    pub fn tick_with(&self, time: &dyn TimeSource) -> Result<FrameOutcome, ExecuteError> {
        self.tick(time.elapsed_secs())
    }

    /// Walks only the subtree rooted at `slot`, as part of the current frame:
    /// listeners see the index of the last [`tick`](Self::tick), or 0 before
    /// the first one.
    pub fn execute_slot(&self, slot: NodeKey, elapsed_secs: f64) -> Result<FrameOutcome, PipelineError> {
        let id = self.slot(slot)?.id();
        let frame = self.frame_count().saturating_sub(1);
        Ok(self.walk(id, frame, elapsed_secs)?)
    }

    fn walk(&self, id: NodeId, frame: u64, elapsed_secs: f64) -> Result<FrameOutcome, ExecuteError> {
        let context = FrameContext::new(
            frame,
            elapsed_secs,
            Arc::clone(&self.variables),
            self.cancellation.token(),
        );
        let walk = Walk::new(&self.graph, &context, &self.spawner);
        match walk.execute(id) {
            Ok(()) => Ok(FrameOutcome::Completed),
            Err(ExecuteError::Cancelled) => Ok(FrameOutcome::Cancelled),
            Err(e) => {
                log::warn!("Pipeline frame {frame} aborted: {e}");
                Err(e)
            }
        }
    }

    /// Number of frames started with [`tick`](Self::tick).
    pub fn frame_count(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }

    // --- Cancellation ---

    /// Raises the cancellation signal. Running and future walks unwind at
    /// their next node boundary.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// A token observing this pipeline's cancellation signal.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.token()
    }
}

impl Drop for ExecutionPipeline {
    fn drop(&mut self) {
        // Detached task work unwinds instead of holding up the worker join.
        self.cancellation.cancel();
    }
}

impl fmt::Debug for ExecutionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPipeline")
            .field("nodes", &self.graph.len())
            .field("variables", &self.variables.len())
            .field("workers", &self.workers.threads())
            .field("frame", &self.frame_count())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
