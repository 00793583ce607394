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

//! # Vesper RI
//!
//! A stateful scene description emitter in the style of the RenderMan
//! Interface. Callers open a [`Renderer`], declare options and a camera,
//! then describe the world through nested transform, attribute and motion
//! blocks. Accepted calls flow to a [`ProtocolEmitter`], such as the
//! textual [`RibWriter`].

#![warn(missing_docs)]

pub mod config;
pub mod emitter;
pub mod error;
pub mod motion;
pub mod namespace;
pub mod primitive;
pub mod procedural;
pub mod renderable;
pub mod renderer;
pub mod state;

pub use config::{ConfigError, ProceduralExpansion, RendererConfig, WorldOptionPolicy};
pub use emitter::{EmittedCall, ProtocolEmitter, RecordingEmitter, RibWriter};
pub use error::{ErrorKind, RendererError, RendererResult};
pub use motion::{MotionBlock, MotionSample};
pub use primitive::Primitive;
pub use procedural::{DelayedReadArchive, Procedural};
pub use renderable::{
    AttributeState, Group, MatrixMotionTransform, MatrixTransform, Renderable, Shader, ShaderType,
};
pub use renderer::Renderer;
pub use state::{ScopeKind, ShaderBinding};
