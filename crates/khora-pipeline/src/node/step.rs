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

use super::NodeBehavior;
use std::any::Any;

/// `<step>`: an unconditional phase of the frame.
///
/// Always fires its listeners and always walks its children. Most named
/// slots are steps. The synthetic root node is a step as well.
#[derive(Debug, Default)]
pub struct StepNode;

impl NodeBehavior for StepNode {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
