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

//! The compiled, immutable node tree.

use crate::key::NodeKey;
use crate::node::{NodeId, PipelineNode};
use std::collections::HashMap;
use std::fmt::{self, Write as _};

/// Arena holding every node of one compiled pipeline.
///
/// Nodes refer to each other by [`NodeId`]; the root is always index 0. The
/// arena is never modified after compilation.
pub struct PipelineGraph {
    nodes: Vec<PipelineNode>,
    index: HashMap<NodeKey, NodeId>,
}

impl PipelineGraph {
    pub(crate) fn new(nodes: Vec<PipelineNode>, index: HashMap<NodeKey, NodeId>) -> Self {
        Self { nodes, index }
    }

    /// The synthetic root node.
    pub fn root(&self) -> &PipelineNode {
        &self.nodes[0]
    }

    /// Returns the node at `id`.
    ///
    /// # Panics
    ///
    /// If `id` does not come from this graph.
    pub fn node(&self, id: NodeId) -> &PipelineNode {
        &self.nodes[id.0]
    }

    /// Looks up a node by key.
    pub fn find(&self, key: NodeKey) -> Option<&PipelineNode> {
        self.index.get(&key).map(|&id| self.node(id))
    }

    /// Looks up a node by its `id` attribute.
    pub fn find_by_name(&self, name: &str) -> Option<&PipelineNode> {
        self.find(NodeKey::from_name(name))
    }

    /// Returns `true` if a node carries `key`.
    pub fn contains(&self, key: NodeKey) -> bool {
        self.index.contains_key(&key)
    }

    /// Number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a graph holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all nodes in document order, root first.
    pub fn iter(&self) -> impl Iterator<Item = &PipelineNode> {
        self.nodes.iter()
    }

    /// Renders the tree as indented text, one node per line.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_node(&mut out, self.root(), 0);
        out
    }

    fn describe_node(&self, out: &mut String, node: &PipelineNode, depth: usize) {
        let _ = write!(out, "{:indent$}{}", "", node.label(), indent = depth * 2);
        if !node.linked().is_empty() {
            let linked: Vec<String> = node
                .linked()
                .iter()
                .map(|&id| self.node(id).label())
                .collect();
            let _ = write!(out, " <- joins [{}]", linked.join(", "));
        }
        let listeners = node.listeners().len();
        if listeners > 0 {
            let _ = write!(out, " ({listeners} listener(s))");
        }
        out.push('\n');

        for &child in node.children() {
            self.describe_node(out, self.node(child), depth + 1);
        }
    }
}

impl fmt::Debug for PipelineGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineGraph")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
