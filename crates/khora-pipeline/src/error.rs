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

//! Error types of the frame pipeline.
//!
//! - [`CompileError`]: the pipeline document is unusable. Fatal; the engine
//!   must not start its loop.
//! - [`ExecuteError`]: one frame's walk stopped early. The embedding engine
//!   decides whether to continue with the next frame.
//! - [`PipelineError`]: failures of the engine-facing façade.

use crate::key::NodeKey;
use std::io;
use std::path::PathBuf;

/// A pipeline document could not be turned into a node graph.
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    /// The document is not well-formed XML.
    #[error("malformed pipeline document: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The document root is not the expected container element.
    #[error("unexpected root element '{found}', expected '{expected}'")]
    UnexpectedRoot {
        /// The configured container tag.
        expected: String,
        /// The tag actually found.
        found: String,
    },

    /// No factory is registered for a tag.
    #[error("not registered node '{tag}'")]
    UnknownNode {
        /// The offending tag name.
        tag: String,
    },

    /// Two nodes resolve to the same key.
    #[error("duplicated id '{id}' on <{tag}>")]
    DuplicateId {
        /// The declared id, or the positional key when no id was given.
        id: String,
        /// Tag of the second node carrying the key.
        tag: String,
    },

    /// A node lacks an attribute it cannot work without.
    #[error("required property '{attribute}' is missing on {node}")]
    MissingAttribute {
        /// The missing attribute.
        attribute: &'static str,
        /// Label of the node.
        node: String,
    },

    /// An attribute is present but cannot be interpreted.
    #[error("invalid value '{value}' for property '{attribute}' on {node}")]
    InvalidAttribute {
        /// The attribute.
        attribute: &'static str,
        /// Label of the node.
        node: String,
        /// The rejected value.
        value: String,
    },

    /// An attribute names a node that does not exist in the document.
    #[error("property '{attribute}' on {node} references unknown node '{target}'")]
    UnresolvedReference {
        /// The attribute.
        attribute: &'static str,
        /// Label of the node.
        node: String,
        /// The id that could not be found.
        target: String,
    },

    /// The document file could not be read.
    #[error("failed to read pipeline document '{}': {source}", path.display())]
    Read {
        /// The file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// A frame's walk stopped before reaching the end of the tree.
#[derive(thiserror::Error, Debug)]
pub enum ExecuteError {
    /// The cancellation signal was observed.
    ///
    /// The façade reports this as [`FrameOutcome::Cancelled`](crate::FrameOutcome)
    /// rather than as an error.
    #[error("pipeline walk cancelled")]
    Cancelled,

    /// A listener returned an error.
    #[error("listener on {node} failed: {source}")]
    Listener {
        /// Label of the node whose listener failed.
        node: String,
        /// The listener's error.
        source: anyhow::Error,
    },

    /// A task node could not hand its work to the worker pool.
    #[error("worker pool unavailable for {node}")]
    WorkerUnavailable {
        /// Label of the task node.
        node: String,
    },
}

impl ExecuteError {
    /// Returns `true` for the cooperative cancellation unwind.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecuteError::Cancelled)
    }
}

/// An operation of the [`ExecutionPipeline`](crate::ExecutionPipeline) failed.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// The pipeline document failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A walk started through the façade failed.
    #[error(transparent)]
    Execute(#[from] ExecuteError),

    /// No node of the compiled graph carries this key.
    #[error("unknown pipeline slot {0}")]
    UnknownSlot(NodeKey),

    /// The worker threads could not be started.
    #[error("failed to spawn pipeline worker: {0}")]
    WorkerSpawn(#[source] io::Error),

    /// The configuration could not be loaded.
    #[error("invalid pipeline configuration: {0}")]
    Config(#[source] Box<dyn std::error::Error + Send + Sync>),
}
