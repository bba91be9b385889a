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

//! # Pipeline Nodes
//!
//! A [`PipelineNode`] is one vertex of the compiled scheduling tree. Its
//! structure (children, linked nodes, parent) is fixed at compile time; only
//! its listener set and the private state of its behavior change afterwards.
//!
//! ## Behaviors
//!
//! What a node does when the walk reaches it is delegated to a
//! [`NodeBehavior`]:
//!
//! | Tag        | Behavior            | Semantics                                   |
//! |------------|---------------------|---------------------------------------------|
//! | `step`     | [`StepNode`]        | always fires, always descends               |
//! | `if`       | [`ConditionalNode`] | gates its subtree on a boolean variable     |
//! | `deferred` | [`DeferredNode`]    | re-fires its subtree on an engine-time timer |
//! | `task`     | [`TaskNode`]        | forks its subtree onto a worker thread      |
//!
//! ## Walk order
//!
//! The default behavior ([`Walk::run`]) processes the node's linked nodes,
//! then fires its listeners, then walks its children in document order. The
//! cancellation signal is checked before each of these steps.

use crate::config::PipelineConfig;
use crate::error::{CompileError, ExecuteError};
use crate::frame::FrameContext;
use crate::graph::PipelineGraph;
use crate::key::NodeKey;
use crate::listener::{DispatchOutcome, ListenerSet};
use crate::variable::{Variable, VariableStore};
use crate::worker::Spawner;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

mod conditional;
mod deferred;
mod step;
mod task;

pub use conditional::{Comparison, ConditionalNode};
pub use deferred::{DeferredNode, DeferredTarget};
pub use step::StepNode;
pub use task::TaskNode;

/// Index of a node inside its [`PipelineGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// The execution semantics of one node kind.
///
/// Implementations are created by the [`NodeRegistry`](crate::NodeRegistry)
/// once per XML element, receive their attributes through
/// [`define`](NodeBehavior::define), and are then only accessed through
/// `&self`, possibly from several threads at once.
pub trait NodeBehavior: Send + Sync + 'static {
    /// Parses node-specific attributes. Called exactly once, after every node
    /// of the document exists, so references to nodes declared later resolve.
    fn define(&mut self, _ctx: &mut DefineContext<'_>) -> Result<(), CompileError> {
        Ok(())
    }

    /// Runs the node for the current walk.
    fn execute(&self, node: &PipelineNode, walk: &Walk<'_>) -> Result<(), ExecuteError> {
        walk.run(node)
    }

    /// Called when a node that has this node in its linked list is executed.
    ///
    /// Default is a no-op.
    fn join(&self, _node: &PipelineNode, _walk: &Walk<'_>) -> Result<(), ExecuteError> {
        Ok(())
    }

    /// Downcast to a concrete type for diagnostics.
    fn as_any(&self) -> &dyn Any;
}

/// One vertex of the compiled tree.
pub struct PipelineNode {
    pub(crate) id: NodeId,
    pub(crate) key: NodeKey,
    pub(crate) tag: String,
    pub(crate) name: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) linked: Vec<NodeId>,
    pub(crate) listeners: ListenerSet,
    pub(crate) behavior: Box<dyn NodeBehavior>,
}

impl PipelineNode {
    /// Arena index of the node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's key.
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// The XML tag the node was declared with.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The explicit `id` attribute, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Human-readable label: `tag#id`, or `tag@key` for anonymous nodes.
    pub fn label(&self) -> String {
        node_label(&self.tag, self.name.as_deref(), self.key)
    }

    /// The enclosing node. `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in document order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Nodes this node synchronizes with before firing.
    pub fn linked(&self) -> &[NodeId] {
        &self.linked
    }

    /// The node's listeners.
    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    /// The node's behavior.
    pub fn behavior(&self) -> &dyn NodeBehavior {
        self.behavior.as_ref()
    }
}

impl fmt::Debug for PipelineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineNode")
            .field("label", &self.label())
            .field("key", &self.key)
            .field("children", &self.children.len())
            .field("linked", &self.linked.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

pub(crate) fn node_label(tag: &str, name: Option<&str>, key: NodeKey) -> String {
    match name {
        Some(name) => format!("{tag}#{name}"),
        None => format!("{tag}@{}", key.raw()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compile-time context
// ─────────────────────────────────────────────────────────────────────────────

/// The attributes of one XML element, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct NodeAttributes {
    entries: Vec<(String, String)>,
}

impl NodeAttributes {
    /// Builds the attribute list from name/value pairs.
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Returns the value of `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over all attributes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Everything a [`NodeBehavior::define`] call may consult or request.
pub struct DefineContext<'a> {
    pub(crate) id: NodeId,
    pub(crate) label: String,
    pub(crate) attributes: &'a NodeAttributes,
    pub(crate) table: &'a HashMap<NodeKey, NodeId>,
    pub(crate) variables: &'a Arc<VariableStore>,
    pub(crate) config: &'a PipelineConfig,
    pub(crate) links: &'a mut Vec<(NodeId, NodeId)>,
}

impl<'a> DefineContext<'a> {
    /// Label of the node being defined, for error messages.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns an optional attribute.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        let attributes: &'a NodeAttributes = self.attributes;
        attributes.get(name)
    }

    /// Returns a required attribute or a [`CompileError::MissingAttribute`].
    pub fn require(&self, name: &'static str) -> Result<&'a str, CompileError> {
        self.attribute(name)
            .ok_or_else(|| CompileError::MissingAttribute {
                attribute: name,
                node: self.label.clone(),
            })
    }

    /// Builds a [`CompileError::InvalidAttribute`] for this node.
    pub fn invalid(&self, attribute: &'static str, value: &str) -> CompileError {
        CompileError::InvalidAttribute {
            attribute,
            node: self.label.clone(),
            value: value.to_string(),
        }
    }

    /// Binds a variable of the pipeline's store.
    pub fn variable(&self, name: &str) -> Variable {
        self.variables.get_or_create(name)
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        self.config
    }

    /// Looks up a node declared anywhere in the document by its `id`.
    pub fn resolve(&self, attribute: &'static str, target: &str) -> Result<NodeId, CompileError> {
        self.table
            .get(&NodeKey::from_name(target))
            .copied()
            .ok_or_else(|| CompileError::UnresolvedReference {
                attribute,
                node: self.label.clone(),
                target: target.to_string(),
            })
    }

    /// Adds the node being defined to `target`'s linked nodes.
    pub fn link_into(&mut self, target: NodeId) {
        self.links.push((target, self.id));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run-time walk
// ─────────────────────────────────────────────────────────────────────────────

/// State shared by every node visited during one walk.
pub struct Walk<'a> {
    graph: &'a Arc<PipelineGraph>,
    frame: &'a FrameContext,
    spawner: &'a Spawner,
}

impl<'a> Walk<'a> {
    /// Starts a walk over `graph` for `frame`.
    pub fn new(graph: &'a Arc<PipelineGraph>, frame: &'a FrameContext, spawner: &'a Spawner) -> Self {
        Self {
            graph,
            frame,
            spawner,
        }
    }

    /// The graph being walked.
    pub fn graph(&self) -> &'a Arc<PipelineGraph> {
        self.graph
    }

    /// The frame being walked.
    pub fn frame(&self) -> &'a FrameContext {
        self.frame
    }

    /// Submission handle for background work.
    pub fn spawner(&self) -> &'a Spawner {
        self.spawner
    }

    /// Fails with [`ExecuteError::Cancelled`] once the pipeline is cancelled.
    pub fn checkpoint(&self) -> Result<(), ExecuteError> {
        if self.frame.is_cancelled() {
            Err(ExecuteError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Executes the node `id` according to its behavior.
    pub fn execute(&self, id: NodeId) -> Result<(), ExecuteError> {
        self.checkpoint()?;
        let node = self.graph.node(id);
        node.behavior.execute(node, self)
    }

    /// Step semantics: linked nodes, then listeners, then children.
    pub fn run(&self, node: &PipelineNode) -> Result<(), ExecuteError> {
        self.join_linked(node)?;
        self.fire(node)?;
        self.descend(node)
    }

    /// Lets every linked node act on behalf of `node`.
    pub fn join_linked(&self, node: &PipelineNode) -> Result<(), ExecuteError> {
        for &linked in &node.linked {
            self.checkpoint()?;
            let linked = self.graph.node(linked);
            linked.behavior.join(linked, self)?;
        }
        Ok(())
    }

    /// Invokes the node's listeners. A listener raising cancellation stops the
    /// remaining ones.
    pub fn fire(&self, node: &PipelineNode) -> Result<(), ExecuteError> {
        self.checkpoint()?;
        let outcome = node
            .listeners
            .dispatch(self.frame)
            .map_err(|source| ExecuteError::Listener {
                node: node.label(),
                source,
            })?;
        match outcome {
            DispatchOutcome::Completed => Ok(()),
            DispatchOutcome::Cancelled => Err(ExecuteError::Cancelled),
        }
    }

    /// Executes the node's children in document order.
    pub fn descend(&self, node: &PipelineNode) -> Result<(), ExecuteError> {
        for &child in &node.children {
            self.execute(child)?;
        }
        Ok(())
    }
}
