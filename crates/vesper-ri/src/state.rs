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

//! The scoped state stack behind every `Begin`/`End` pair.
//!
//! Each open block owns a [`StateFrame`] holding a full copy of the transform
//! and attribute map it started with. Frames are copied by value on push, so a
//! block can never leak a mutation into its parent, and popping a frame is the
//! whole rollback.

use crate::error::{RendererError, RendererResult};
use crate::renderable::ShaderType;
use std::collections::BTreeMap;
use std::fmt;
use vesper_core::math::Mat4;
use vesper_core::{CompoundData, Data};

/// The kind of block that opened a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// `world_begin` / `world_end`.
    World,
    /// `transform_begin` / `transform_end`.
    Transform,
    /// `attribute_begin` / `attribute_end`.
    Attribute,
    /// `motion_begin` / `motion_end`. Motion blocks do not push a frame; the
    /// kind exists so nesting errors can name them.
    Motion,
    /// The implicit block wrapped around a procedural's render callback.
    Procedural,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeKind::World => "World",
            ScopeKind::Transform => "Transform",
            ScopeKind::Attribute => "Attribute",
            ScopeKind::Motion => "Motion",
            ScopeKind::Procedural => "Procedural",
        };
        f.write_str(name)
    }
}

/// A shader bound to one of the slots of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderBinding {
    /// The shader name.
    pub name: String,
    /// The parameters it was bound with.
    pub params: CompoundData,
}

impl ShaderBinding {
    /// Creates a binding.
    pub fn new(name: impl Into<String>, params: CompoundData) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// One entry of the state stack.
#[derive(Debug, Clone, PartialEq)]
pub struct StateFrame {
    /// The block that opened this frame; `None` for the root frame.
    pub scope: Option<ScopeKind>,
    /// Object-to-world transform active in this frame.
    pub transform: Mat4,
    /// Attribute values keyed by their full, namespaced name.
    pub attributes: CompoundData,
    /// Bound shaders. Light sources are statements, not bindings, and never
    /// appear here.
    pub shaders: BTreeMap<ShaderType, ShaderBinding>,
}

impl StateFrame {
    fn root() -> Self {
        Self {
            scope: None,
            transform: Mat4::IDENTITY,
            attributes: CompoundData::new(),
            shaders: BTreeMap::new(),
        }
    }
}

/// A strictly LIFO stack of [`StateFrame`]s, never empty.
#[derive(Debug, Clone)]
pub struct StateStack {
    frames: Vec<StateFrame>,
}

impl Default for StateStack {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStack {
    /// Creates a stack holding only the root frame.
    pub fn new() -> Self {
        Self {
            frames: vec![StateFrame::root()],
        }
    }

    /// Number of frames, including the root.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The active (innermost) frame.
    pub fn top(&self) -> &StateFrame {
        // `frames` always holds at least the root frame.
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut StateFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// The block kind of the innermost open frame, `None` at root level.
    pub fn innermost_scope(&self) -> Option<ScopeKind> {
        self.top().scope
    }

    /// Whether any open frame was opened by `kind`.
    pub fn contains(&self, kind: ScopeKind) -> bool {
        self.frames.iter().any(|f| f.scope == Some(kind))
    }

    /// Opens a frame copying the active transform and attributes.
    pub fn push(&mut self, kind: ScopeKind) {
        let mut frame = self.top().clone();
        frame.scope = Some(kind);
        log::trace!("push {kind} frame at depth {}", self.frames.len());
        self.frames.push(frame);
    }

    /// Opens a frame with explicit contents, e.g. state captured for a
    /// deferred procedural.
    pub fn push_frame(&mut self, kind: ScopeKind, mut frame: StateFrame) {
        frame.scope = Some(kind);
        log::trace!("push restored {kind} frame at depth {}", self.frames.len());
        self.frames.push(frame);
    }

    /// Closes the innermost frame, which must have been opened by `kind`.
    pub fn pop(&mut self, kind: ScopeKind) -> RendererResult<StateFrame> {
        let open = self.innermost_scope();
        if open != Some(kind) {
            return Err(RendererError::MismatchedEnd {
                closing: kind,
                open,
            });
        }
        log::trace!("pop {kind} frame at depth {}", self.frames.len() - 1);
        self.frames
            .pop()
            .ok_or(RendererError::MismatchedEnd { closing: kind, open })
    }

    /// Pops frames until only `depth` remain and returns the kinds that were
    /// closed, innermost first. The root frame is never removed.
    pub fn unwind_to(&mut self, depth: usize) -> Vec<ScopeKind> {
        let depth = depth.max(1);
        let mut closed = Vec::new();
        while self.frames.len() > depth {
            if let Some(StateFrame {
                scope: Some(kind), ..
            }) = self.frames.pop()
            {
                closed.push(kind);
            }
        }
        closed
    }

    /// The active object-to-world transform.
    pub fn transform(&self) -> Mat4 {
        self.top().transform
    }

    /// Post-multiplies `matrix` into the active transform.
    pub fn concat_transform(&mut self, matrix: &Mat4) {
        let frame = self.top_mut();
        frame.transform = frame.transform * *matrix;
    }

    /// Replaces the active transform.
    pub fn set_transform(&mut self, matrix: Mat4) {
        self.top_mut().transform = matrix;
    }

    /// Looks up an attribute in the active frame.
    pub fn attribute(&self, key: &str) -> Option<&Data> {
        self.top().attributes.get(key)
    }

    /// Sets an attribute in the active frame only.
    pub fn set_attribute(&mut self, key: &str, value: Data) {
        self.top_mut().attributes.insert(key.to_owned(), value);
    }

    /// The attribute map of the active frame.
    pub fn attributes(&self) -> &CompoundData {
        &self.top().attributes
    }

    /// The shader bound to `kind` in the active frame.
    pub fn shader(&self, kind: ShaderType) -> Option<&ShaderBinding> {
        self.top().shaders.get(&kind)
    }

    /// Binds a shader in the active frame only.
    pub fn bind_shader(&mut self, kind: ShaderType, binding: ShaderBinding) {
        self.top_mut().shaders.insert(kind, binding);
    }
}
