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

//! Turns a pipeline document into a [`PipelineGraph`].
//!
//! Compilation runs in two passes:
//!
//! 1. A depth-first walk over the elements creates one node per element in
//!    document order and records its key in a flat table. A node without an
//!    `id` gets a positional key from its document-order index.
//! 2. Every node's behavior parses its attributes against the complete table,
//!    so an attribute may reference a node declared further down.

use crate::config::PipelineConfig;
use crate::error::CompileError;
use crate::graph::PipelineGraph;
use crate::key::NodeKey;
use crate::listener::ListenerSet;
use crate::node::{node_label, DefineContext, NodeAttributes, NodeBehavior, NodeId, PipelineNode, StepNode};
use crate::registry::NodeRegistry;
use crate::variable::VariableStore;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// A node between the two passes.
struct Draft {
    key: NodeKey,
    tag: String,
    name: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    linked: Vec<NodeId>,
    attributes: NodeAttributes,
    behavior: Box<dyn NodeBehavior>,
}

impl Draft {
    fn label(&self) -> String {
        node_label(&self.tag, self.name.as_deref(), self.key)
    }
}

/// Compiles pipeline documents with a given registry and configuration.
pub struct GraphCompiler<'a> {
    registry: &'a NodeRegistry,
    config: &'a PipelineConfig,
}

impl<'a> GraphCompiler<'a> {
    /// Creates a compiler resolving tags through `registry`.
    pub fn new(registry: &'a NodeRegistry, config: &'a PipelineConfig) -> Self {
        Self { registry, config }
    }

    /// Compiles the file at `path`.
    pub fn compile_file(
        &self,
        path: impl AsRef<Path>,
        variables: &Arc<VariableStore>,
    ) -> Result<PipelineGraph, CompileError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| CompileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Compiling pipeline document '{}'.", path.display());
        self.compile(&document, variables)
    }

    /// Compiles a document held in memory. Variables referenced by the
    /// document are bound to cells of `variables`.
    pub fn compile(
        &self,
        document: &str,
        variables: &Arc<VariableStore>,
    ) -> Result<PipelineGraph, CompileError> {
        let document = roxmltree::Document::parse(document)?;
        let container = document.root_element();
        let found = container.tag_name().name();
        if found != self.config.root_element {
            return Err(CompileError::UnexpectedRoot {
                expected: self.config.root_element.clone(),
                found: found.to_string(),
            });
        }

        let mut drafts = vec![Draft {
            key: NodeKey::ROOT,
            tag: found.to_string(),
            name: None,
            parent: None,
            children: Vec::new(),
            linked: Vec::new(),
            attributes: NodeAttributes::default(),
            behavior: Box::new(StepNode),
        }];
        let mut table = HashMap::from([(NodeKey::ROOT, NodeId(0))]);

        // First pass: structure and keys.
        self.collect(container, NodeId(0), &mut drafts, &mut table)?;

        // Second pass: attributes, with every key known.
        let mut links = Vec::new();
        for (index, draft) in drafts.iter_mut().enumerate() {
            let mut ctx = DefineContext {
                id: NodeId(index),
                label: draft.label(),
                attributes: &draft.attributes,
                table: &table,
                variables,
                config: self.config,
                links: &mut links,
            };
            draft.behavior.define(&mut ctx)?;
        }
        for (target, source) in links {
            drafts[target.0].linked.push(source);
        }

        let nodes: Vec<PipelineNode> = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| PipelineNode {
                id: NodeId(index),
                key: draft.key,
                tag: draft.tag,
                name: draft.name,
                parent: draft.parent,
                children: draft.children,
                linked: draft.linked,
                listeners: ListenerSet::new(),
                behavior: draft.behavior,
            })
            .collect();

        let graph = PipelineGraph::new(nodes, table);
        log::info!("Compiled pipeline with {} node(s).", graph.len());
        log::debug!("Pipeline tree:\n{}", graph.describe());
        Ok(graph)
    }

    fn collect(
        &self,
        element: roxmltree::Node<'_, '_>,
        parent: NodeId,
        drafts: &mut Vec<Draft>,
        table: &mut HashMap<NodeKey, NodeId>,
    ) -> Result<(), CompileError> {
        for child in element.children().filter(roxmltree::Node::is_element) {
            let tag = child.tag_name().name();
            let behavior = self
                .registry
                .create(tag)
                .ok_or_else(|| CompileError::UnknownNode {
                    tag: tag.to_string(),
                })?;

            let id = NodeId(drafts.len());
            let name = child.attribute("id").map(str::to_string);
            let key = match &name {
                Some(name) => NodeKey::from_name(name),
                None => NodeKey::from_index(id.0 as u64),
            };
            if table.contains_key(&key) {
                return Err(CompileError::DuplicateId {
                    id: name.unwrap_or_else(|| key.to_string()),
                    tag: tag.to_string(),
                });
            }
            table.insert(key, id);

            let attributes = NodeAttributes::new(
                child
                    .attributes()
                    .map(|attribute| (attribute.name().to_string(), attribute.value().to_string())),
            );
            drafts.push(Draft {
                key,
                tag: tag.to_string(),
                name,
                parent: Some(parent),
                children: Vec::new(),
                linked: Vec::new(),
                attributes,
                behavior,
            });
            drafts[parent.0].children.push(id);

            self.collect(child, id, drafts, table)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(document: &str) -> Result<PipelineGraph, CompileError> {
        let registry = NodeRegistry::with_builtins();
        let config = PipelineConfig::default();
        GraphCompiler::new(&registry, &config).compile(document, &Arc::new(VariableStore::new()))
    }

    #[test]
    fn test_structure_follows_document_order() {
        let graph = compile(
            r#"<pipeline>
                 <step id="a"><step id="a1"/><!-- ignored --><step id="a2"/></step>
                 text is ignored
                 <step id="b"/>
               </pipeline>"#,
        )
        .unwrap();

        assert_eq!(graph.len(), 5);
        let names: Vec<_> = graph
            .root()
            .children()
            .iter()
            .map(|&id| graph.node(id).name().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        let a = graph.find_by_name("a").unwrap();
        let a2 = graph.find_by_name("a2").unwrap();
        assert_eq!(a.children().len(), 2);
        assert_eq!(a2.parent(), Some(a.id()));
    }

    #[test]
    fn test_anonymous_nodes_get_positional_keys() {
        let graph = compile("<pipeline><step/><step id=\"x\"><step/></step></pipeline>").unwrap();
        assert!(graph.contains(NodeKey::from_index(1)));
        assert!(graph.contains(NodeKey::from_index(3)));
        assert!(!graph.contains(NodeKey::from_index(2)));
        assert_eq!(graph.root().key(), NodeKey::ROOT);
    }

    #[test]
    fn test_forward_reference_links_task_into_end() {
        let graph = compile(
            r#"<pipeline>
                 <task id="batch" end="render"/>
                 <step id="render"/>
               </pipeline>"#,
        )
        .unwrap();

        let batch = graph.find_by_name("batch").unwrap();
        let render = graph.find_by_name("render").unwrap();
        assert_eq!(render.linked(), &[batch.id()]);
        assert!(graph.describe().contains("step#render <- joins [task#batch]"));
    }
}
