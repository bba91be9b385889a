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

//! Maps XML tags to node behaviors.
//!
//! The four built-in tags are always available through
//! [`NodeRegistry::with_builtins`]. Engine crates can contribute their own
//! tags either at runtime with [`NodeRegistry::register`] or at link time:
//!
//! ```rust,ignore
//! use khora_pipeline::{NodeBehavior, NodeRegistration};
//!
//! fn create_profiler_scope() -> Box<dyn NodeBehavior> {
//!     Box::new(ProfilerScopeNode::default())
//! }
//!
//! inventory::submit! {
//!     NodeRegistration::new("profile", create_profiler_scope)
//! }
//! ```

use crate::node::{ConditionalNode, DeferredNode, NodeBehavior, StepNode, TaskNode};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Creates a fresh behavior for one XML element.
pub type NodeFactory = Arc<dyn Fn() -> Box<dyn NodeBehavior> + Send + Sync>;

/// A tag contributed by another crate through `inventory::submit!`.
pub struct NodeRegistration {
    tag: &'static str,
    factory: fn() -> Box<dyn NodeBehavior>,
}

impl NodeRegistration {
    /// Declares `tag` as handled by `factory`.
    pub const fn new(tag: &'static str, factory: fn() -> Box<dyn NodeBehavior>) -> Self {
        Self { tag, factory }
    }

    /// The registered tag.
    pub fn tag(&self) -> &'static str {
        self.tag
    }
}

inventory::collect!(NodeRegistration);

fn create_step() -> Box<dyn NodeBehavior> {
    Box::new(StepNode)
}

fn create_if() -> Box<dyn NodeBehavior> {
    Box::new(ConditionalNode::default())
}

fn create_deferred() -> Box<dyn NodeBehavior> {
    Box::new(DeferredNode::default())
}

fn create_task() -> Box<dyn NodeBehavior> {
    Box::new(TaskNode::default())
}

/// Tag → factory table used by the [`GraphCompiler`](crate::GraphCompiler).
#[derive(Clone, Default)]
pub struct NodeRegistry {
    factories: HashMap<String, NodeFactory>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with `step`, `if`, `deferred` and `task`, plus every
    /// tag submitted through `inventory`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("step", create_step);
        registry.register("if", create_if);
        registry.register("deferred", create_deferred);
        registry.register("task", create_task);

        for registration in inventory::iter::<NodeRegistration> {
            if registry.contains(registration.tag) {
                log::warn!(
                    "Node tag '{}' is already registered; ignoring extension.",
                    registration.tag
                );
                continue;
            }
            log::debug!("Registering extension node tag '{}'.", registration.tag);
            registry.register(registration.tag, registration.factory);
        }
        registry
    }

    /// Registers or replaces the factory for `tag`.
    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn NodeBehavior> + Send + Sync + 'static,
    {
        self.factories.insert(tag.into(), Arc::new(factory));
    }

    /// Returns `true` if `tag` has a factory.
    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Creates a behavior for `tag`, or `None` if the tag is unknown.
    pub fn create(&self, tag: &str) -> Option<Box<dyn NodeBehavior>> {
        self.factories.get(tag).map(|factory| factory())
    }

    /// All registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}
