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

//! Sinks the renderer writes accepted calls to.
//!
//! The renderer validates every call and keeps the scoped state; an emitter
//! only serializes what it is handed, in order. Keys reach the emitter
//! already resolved, so an emitter never sees foreign or unknown keys.

mod recording;
mod rib;

pub use recording::{EmittedCall, RecordingEmitter};
pub use rib::RibWriter;

use crate::motion::MotionSample;
use crate::namespace::ResolvedKey;
use crate::primitive::Primitive;
use crate::renderable::ShaderType;
use std::any::Any;
use std::io;
use vesper_core::math::{Aabb, Mat4};
use vesper_core::{CompoundData, Data};

/// The output side of a [`Renderer`](crate::Renderer).
pub trait ProtocolEmitter: Any {
    /// An accepted option.
    fn emit_option(&mut self, key: &ResolvedKey, value: &Data) -> io::Result<()>;

    /// An accepted attribute.
    fn emit_attribute(&mut self, key: &ResolvedKey, value: &Data) -> io::Result<()>;

    /// A matrix concatenated onto the current transform.
    fn emit_transform(&mut self, matrix: &Mat4) -> io::Result<()>;

    /// A matrix replacing the current transform.
    fn emit_set_transform(&mut self, matrix: &Mat4) -> io::Result<()>;

    /// A static primitive.
    fn emit_primitive(&mut self, primitive: &Primitive) -> io::Result<()>;

    /// A complete motion block. `samples` has one entry per time.
    fn emit_motion_block(&mut self, times: &[f32], samples: &[MotionSample]) -> io::Result<()>;

    /// An output image declaration.
    fn emit_display(
        &mut self,
        name: &str,
        kind: &str,
        mode: &str,
        params: &CompoundData,
    ) -> io::Result<()>;

    /// A camera declaration. `params["transform"]` holds the camera placement.
    fn emit_camera(&mut self, name: &str, params: &CompoundData) -> io::Result<()>;

    /// A native command, named without its namespace prefix.
    fn emit_command(&mut self, name: &str, params: &CompoundData) -> io::Result<()>;

    /// A shader binding.
    fn emit_shader(
        &mut self,
        kind: ShaderType,
        name: &str,
        params: &CompoundData,
    ) -> io::Result<()>;

    /// A named coordinate system marking the current transform.
    fn emit_coordinate_system(&mut self, name: &str) -> io::Result<()>;

    /// The bound of the geometry that follows.
    fn emit_bound(&mut self, bound: &Aabb) -> io::Result<()>;

    /// Start of the world block.
    fn begin_world(&mut self) -> io::Result<()>;

    /// End of the world block.
    fn end_world(&mut self) -> io::Result<()>;

    /// Start of an attribute block.
    fn begin_attribute(&mut self) -> io::Result<()>;

    /// End of an attribute block.
    fn end_attribute(&mut self) -> io::Result<()>;

    /// Start of a transform block.
    fn begin_transform(&mut self) -> io::Result<()>;

    /// End of a transform block.
    fn end_transform(&mut self) -> io::Result<()>;

    /// Pushes buffered output to its destination.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Downcast to Any for type-specific access
    fn as_any(&self) -> &dyn Any;

    /// Downcast to Any for type-specific mutable access
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
