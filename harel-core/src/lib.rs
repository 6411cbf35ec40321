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
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # harel-core
//!
//! A library for building and executing hierarchical, UML-2-style
//! statecharts: nested states, orthogonal (concurrent) regions, guarded
//! transitions, fork/join pseudostates, entry/exit actions, and serialized
//! event application.
//!
//! Construct a graph with [`builder::GraphBuilder`], freeze it with
//! `build()`, then drive it with [`engine::Machine`]:
//!
//! ```ignore
//! let graph = GraphBuilder::new(MyState::Idle)
//!     .state(MyState::Idle, |s| {
//!         s.on(MyEvent::Start, MyState::Running, None::<fn(&MyEvent) -> bool>, None::<fn(&MyEvent)>);
//!     })
//!     .state(MyState::Running, |_| {})
//!     .build()?;
//! let machine = Machine::new(graph, false);
//! let state = machine.apply(MyEvent::Start).await?;
//! ```

mod analyzer;
pub mod builder;
mod dispatch;
pub mod engine;
pub mod error;
pub mod export;
pub mod graph;
pub mod state_of_mind;
pub mod state_path;
pub mod transition;
pub mod types;

pub use builder::{GraphBuilder, StateBuilder};
pub use engine::Machine;
pub use error::{EngineError, GraphError};
pub use export::DiagramFormat;
pub use graph::{Graph, NodeId};
pub use state_of_mind::StateOfMind;
pub use state_path::StatePath;
pub use transition::TransitionDefinition;
pub use types::{EventSpec, EventTag, StateTag};
