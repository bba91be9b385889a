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

//! `<deferred target="...">`

use super::{DefineContext, NodeBehavior, PipelineNode, Walk};
use crate::error::{CompileError, ExecuteError};
use crate::variable::Variable;
use std::any::Any;
use std::sync::{Mutex, PoisonError};

/// Where a deferred node reads its period from.
#[derive(Debug, Clone)]
pub enum DeferredTarget {
    /// A period fixed in the document, in seconds.
    Seconds(f64),
    /// A variable holding the period in seconds, read on every execution.
    Variable(Variable),
}

impl DeferredTarget {
    /// The current period, if one is available.
    pub fn seconds(&self) -> Option<f64> {
        match self {
            DeferredTarget::Seconds(seconds) => Some(*seconds),
            DeferredTarget::Variable(variable) => variable.as_f64(),
        }
    }
}

/// Re-fires its subtree at most once per period of engine time.
///
/// The first execution always fires. Afterwards the node fires when at least
/// the target period has elapsed since its last firing, and records the
/// current time as the new reference. Several periods elapsed since the last
/// check still produce a single firing. A variable target that is unset or
/// not numeric never re-fires.
#[derive(Debug)]
pub struct DeferredNode {
    target: DeferredTarget,
    last_fired: Mutex<Option<f64>>,
}

impl Default for DeferredNode {
    fn default() -> Self {
        Self {
            target: DeferredTarget::Seconds(0.0),
            last_fired: Mutex::new(None),
        }
    }
}

impl DeferredNode {
    /// The configured period source.
    pub fn target(&self) -> &DeferredTarget {
        &self.target
    }

    /// Engine time of the last firing, if the node fired yet.
    pub fn last_fired(&self) -> Option<f64> {
        *self.last_fired.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decides whether the node fires at `now`, recording the firing if so.
    fn try_fire(&self, now: f64) -> bool {
        let mut last_fired = self
            .last_fired
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let due = match *last_fired {
            None => true,
            Some(last) => self
                .target
                .seconds()
                .is_some_and(|period| now - last >= period),
        };
        if due {
            *last_fired = Some(now);
        }
        due
    }
}

impl NodeBehavior for DeferredNode {
    fn define(&mut self, ctx: &mut DefineContext<'_>) -> Result<(), CompileError> {
        let target = ctx.require("target")?;
        self.target = match target.trim().parse::<f64>() {
            Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => DeferredTarget::Seconds(seconds),
            Ok(_) => return Err(ctx.invalid("target", target)),
            Err(_) => DeferredTarget::Variable(ctx.variable(target)),
        };
        Ok(())
    }

    fn execute(&self, node: &PipelineNode, walk: &Walk<'_>) -> Result<(), ExecuteError> {
        if !self.try_fire(walk.frame().elapsed()) {
            return Ok(());
        }
        walk.run(node)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
