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

//! `<if test="..." compare="Equal|NotEqual">`

use super::{DefineContext, NodeBehavior, PipelineNode, Walk};
use crate::error::{CompileError, ExecuteError};
use crate::variable::Variable;
use std::any::Any;

/// How an `if` node compares its variable against `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparison {
    /// Passes only when the variable is exactly `true`.
    #[default]
    Equal,
    /// Passes whenever the variable is not `true` (including unset).
    NotEqual,
}

impl Comparison {
    /// Parses the `compare` attribute, ignoring ASCII case.
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("equal") {
            Some(Comparison::Equal)
        } else if value.eq_ignore_ascii_case("notequal") {
            Some(Comparison::NotEqual)
        } else {
            None
        }
    }

    /// Applies the comparison to the truth of the tested variable.
    pub fn passes(self, is_true: bool) -> bool {
        match self {
            Comparison::Equal => is_true,
            Comparison::NotEqual => !is_true,
        }
    }
}

/// Gates its subtree on a boolean variable read at execution time.
///
/// A variable that is unset or holds anything other than a boolean counts
/// as `false`. When the test fails the node is skipped entirely: no linked
/// node, listener or child runs this frame.
#[derive(Debug, Default)]
pub struct ConditionalNode {
    test: Option<Variable>,
    compare: Comparison,
}

impl ConditionalNode {
    /// The comparison configured on this node.
    pub fn comparison(&self) -> Comparison {
        self.compare
    }

    /// Evaluates the test against the variable's current value.
    pub fn passes(&self) -> bool {
        let is_true = self.test.as_ref().is_some_and(Variable::is_true);
        self.compare.passes(is_true)
    }
}

impl NodeBehavior for ConditionalNode {
    fn define(&mut self, ctx: &mut DefineContext<'_>) -> Result<(), CompileError> {
        let test = ctx.require("test")?;
        self.test = Some(ctx.variable(test));

        if let Some(compare) = ctx.attribute("compare") {
            self.compare = Comparison::parse(compare).ok_or_else(|| ctx.invalid("compare", compare))?;
        }
        Ok(())
    }

    fn execute(&self, node: &PipelineNode, walk: &Walk<'_>) -> Result<(), ExecuteError> {
        if !self.passes() {
            log::trace!("{} skipped this frame.", node.label());
            return Ok(());
        }
        walk.run(node)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_parsing() {
        assert_eq!(Comparison::parse("Equal"), Some(Comparison::Equal));
        assert_eq!(Comparison::parse("NotEqual"), Some(Comparison::NotEqual));
        assert_eq!(Comparison::parse("notequal"), Some(Comparison::NotEqual));
        assert_eq!(Comparison::parse("Greater"), None);
    }

    #[test]
    fn test_not_equal_inverts() {
        assert!(Comparison::Equal.passes(true));
        assert!(!Comparison::Equal.passes(false));
        assert!(!Comparison::NotEqual.passes(true));
        assert!(Comparison::NotEqual.passes(false));
    }

    #[test]
    fn test_undefined_node_treats_test_as_false() {
        let node = ConditionalNode::default();
        assert!(!node.passes());
    }
}
