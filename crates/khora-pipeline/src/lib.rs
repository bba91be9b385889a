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

//! # Khora Pipeline
//!
//! The frame-tick scheduler of the engine. An XML document declares a tree
//! of nodes; every frame the [`ExecutionPipeline`] walks the tree from the
//! root and invokes the listeners subsystems attached to its nodes.
//!
//! ```rust,no_run
//! use khora_pipeline::{listener, slots, ExecutionPipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let pipeline = ExecutionPipeline::builder().build()?;
//!
//! let update = listener(|frame| {
//!     log::info!("update at {:.3}s", frame.elapsed());
//!     Ok(())
//! });
//! pipeline.add_event(slots::UPDATE, &update)?;
//!
//! pipeline.set_variable(slots::PAUSED, false);
//! pipeline.tick(0.016)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cancel;
pub mod compiler;
pub mod config;
pub mod error;
pub mod frame;
pub mod graph;
pub mod key;
pub mod listener;
pub mod node;
pub mod pipeline;
pub mod registry;
pub mod slots;
pub mod variable;
pub mod worker;

pub use cancel::{CancellationSource, CancellationToken};
pub use compiler::GraphCompiler;
pub use config::PipelineConfig;
pub use error::{CompileError, ExecuteError, PipelineError};
pub use frame::FrameContext;
pub use graph::PipelineGraph;
pub use key::{hash_name, NodeKey, VariableKey};
pub use listener::{listener, DispatchOutcome, EventListener, ListenerSet};
pub use node::{
    Comparison, ConditionalNode, DefineContext, DeferredNode, DeferredTarget, NodeAttributes,
    NodeBehavior, NodeId, PipelineNode, StepNode, TaskNode, Walk,
};
pub use pipeline::{ExecutionPipeline, FrameOutcome, PipelineBuilder};
pub use registry::{NodeFactory, NodeRegistration, NodeRegistry};
pub use variable::{Value, Variable, VariableStore};
pub use worker::{Spawner, WorkerPool};
