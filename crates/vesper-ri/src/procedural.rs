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

//! Geometry generated on demand by user callbacks.

use crate::renderer::Renderer;
use crate::state::StateFrame;
use anyhow::Context;
use std::path::PathBuf;
use vesper_core::math::Aabb;
use vesper_core::{CompoundData, Data};

/// A user object that expands into scene description when the renderer asks.
///
/// [`bound`](Procedural::bound) is always queried first. When it fails or
/// returns an invalid box the procedural is dropped and
/// [`render`](Procedural::render) is never called. Otherwise `render` runs
/// exactly once, inside an attribute scope of its own; any block it leaves
/// open is closed for it. Errors from either method are logged, never
/// propagated to the caller of [`Renderer::procedural`].
pub trait Procedural {
    /// The object-space bound of everything `render` will produce.
    fn bound(&self, args: &CompoundData) -> anyhow::Result<Aabb>;

    /// Issues calls on `renderer` describing the geometry.
    fn render(&self, renderer: &mut Renderer, args: &CompoundData) -> anyhow::Result<()>;
}

/// A procedural waiting for expansion at `world_end`, with the state that was
/// active when it was submitted.
pub(crate) struct DeferredProcedural {
    pub(crate) handle: Box<dyn Procedural>,
    pub(crate) args: CompoundData,
    pub(crate) bound: Aabb,
    pub(crate) frame: StateFrame,
}

/// Reads a RIB archive once the renderer reaches it.
///
/// `render` issues a native `readArchive` command for `path`, so the archive
/// is only pulled in when the procedural is expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayedReadArchive {
    /// The archive to read.
    pub path: PathBuf,
    /// The bound of the archive's contents.
    pub bound: Aabb,
}

impl DelayedReadArchive {
    /// Creates a delayed archive read.
    pub fn new(path: impl Into<PathBuf>, bound: Aabb) -> Self {
        Self {
            path: path.into(),
            bound,
        }
    }
}

impl Procedural for DelayedReadArchive {
    fn bound(&self, _args: &CompoundData) -> anyhow::Result<Aabb> {
        Ok(self.bound)
    }

    fn render(&self, renderer: &mut Renderer, _args: &CompoundData) -> anyhow::Result<()> {
        let path = self
            .path
            .to_str()
            .with_context(|| format!("archive path {:?} is not UTF-8", self.path))?;
        let mut params = CompoundData::new();
        params.insert("name".to_owned(), Data::from(path));
        let command = format!("{}:readArchive", renderer.config().native_prefix);
        renderer.command(&command, &params)?;
        Ok(())
    }
}
