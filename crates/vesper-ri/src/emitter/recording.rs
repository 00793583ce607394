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

use super::ProtocolEmitter;
use crate::motion::MotionSample;
use crate::namespace::ResolvedKey;
use crate::primitive::Primitive;
use crate::renderable::ShaderType;
use std::any::Any;
use std::io;
use vesper_core::math::{Aabb, Mat4};
use vesper_core::{CompoundData, Data};

/// One call received by a [`RecordingEmitter`].
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum EmittedCall {
    Option { key: ResolvedKey, value: Data },
    Attribute { key: ResolvedKey, value: Data },
    Transform(Mat4),
    SetTransform(Mat4),
    Primitive(Primitive),
    MotionBlock { times: Vec<f32>, samples: Vec<MotionSample> },
    Display { name: String, kind: String, mode: String, params: CompoundData },
    Camera { name: String, params: CompoundData },
    Command { name: String, params: CompoundData },
    Shader { kind: ShaderType, name: String, params: CompoundData },
    CoordinateSystem(String),
    Bound(Aabb),
    BeginWorld,
    EndWorld,
    BeginAttribute,
    EndAttribute,
    BeginTransform,
    EndTransform,
}

/// An emitter that keeps every call in memory, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingEmitter {
    calls: Vec<EmittedCall>,
}

impl RecordingEmitter {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls received so far.
    pub fn calls(&self) -> &[EmittedCall] {
        &self.calls
    }

    /// Removes and returns the recorded calls.
    pub fn take_calls(&mut self) -> Vec<EmittedCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&EmittedCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    /// Index of the first recorded call matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&EmittedCall) -> bool) -> Option<usize> {
        self.calls.iter().position(predicate)
    }

    fn record(&mut self, call: EmittedCall) -> io::Result<()> {
        log::trace!("recorded {call:?}");
        self.calls.push(call);
        Ok(())
    }
}

impl ProtocolEmitter for RecordingEmitter {
    fn emit_option(&mut self, key: &ResolvedKey, value: &Data) -> io::Result<()> {
        self.record(EmittedCall::Option {
            key: key.clone(),
            value: value.clone(),
        })
    }

    fn emit_attribute(&mut self, key: &ResolvedKey, value: &Data) -> io::Result<()> {
        self.record(EmittedCall::Attribute {
            key: key.clone(),
            value: value.clone(),
        })
    }

    fn emit_transform(&mut self, matrix: &Mat4) -> io::Result<()> {
        self.record(EmittedCall::Transform(*matrix))
    }

    fn emit_set_transform(&mut self, matrix: &Mat4) -> io::Result<()> {
        self.record(EmittedCall::SetTransform(*matrix))
    }

    fn emit_primitive(&mut self, primitive: &Primitive) -> io::Result<()> {
        self.record(EmittedCall::Primitive(primitive.clone()))
    }

    fn emit_motion_block(&mut self, times: &[f32], samples: &[MotionSample]) -> io::Result<()> {
        self.record(EmittedCall::MotionBlock {
            times: times.to_vec(),
            samples: samples.to_vec(),
        })
    }

    fn emit_display(
        &mut self,
        name: &str,
        kind: &str,
        mode: &str,
        params: &CompoundData,
    ) -> io::Result<()> {
        self.record(EmittedCall::Display {
            name: name.to_owned(),
            kind: kind.to_owned(),
            mode: mode.to_owned(),
            params: params.clone(),
        })
    }

    fn emit_camera(&mut self, name: &str, params: &CompoundData) -> io::Result<()> {
        self.record(EmittedCall::Camera {
            name: name.to_owned(),
            params: params.clone(),
        })
    }

    fn emit_command(&mut self, name: &str, params: &CompoundData) -> io::Result<()> {
        self.record(EmittedCall::Command {
            name: name.to_owned(),
            params: params.clone(),
        })
    }

    fn emit_shader(
        &mut self,
        kind: ShaderType,
        name: &str,
        params: &CompoundData,
    ) -> io::Result<()> {
        self.record(EmittedCall::Shader {
            kind,
            name: name.to_owned(),
            params: params.clone(),
        })
    }

    fn emit_coordinate_system(&mut self, name: &str) -> io::Result<()> {
        self.record(EmittedCall::CoordinateSystem(name.to_owned()))
    }

    fn emit_bound(&mut self, bound: &Aabb) -> io::Result<()> {
        self.record(EmittedCall::Bound(*bound))
    }

    fn begin_world(&mut self) -> io::Result<()> {
        self.record(EmittedCall::BeginWorld)
    }

    fn end_world(&mut self) -> io::Result<()> {
        self.record(EmittedCall::EndWorld)
    }

    fn begin_attribute(&mut self) -> io::Result<()> {
        self.record(EmittedCall::BeginAttribute)
    }

    fn end_attribute(&mut self) -> io::Result<()> {
        self.record(EmittedCall::EndAttribute)
    }

    fn begin_transform(&mut self) -> io::Result<()> {
        self.record(EmittedCall::BeginTransform)
    }

    fn end_transform(&mut self) -> io::Result<()> {
        self.record(EmittedCall::EndTransform)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::Namespace;

    #[test]
    fn records_in_order() {
        let mut emitter = RecordingEmitter::new();
        emitter.begin_world().unwrap();
        emitter
            .emit_attribute(
                &ResolvedKey::new(Namespace::Native, "shadingRate"),
                &Data::Float(2.0),
            )
            .unwrap();
        emitter.end_world().unwrap();

        assert_eq!(emitter.calls().len(), 3);
        assert_eq!(emitter.calls()[0], EmittedCall::BeginWorld);
        assert_eq!(
            emitter.count(|c| matches!(c, EmittedCall::Attribute { .. })),
            1
        );
        assert_eq!(emitter.position(|c| *c == EmittedCall::EndWorld), Some(2));
    }

    #[test]
    fn take_calls_empties_the_recorder() {
        let mut emitter = RecordingEmitter::new();
        emitter.emit_coordinate_system("lamp").unwrap();
        let calls = emitter.take_calls();
        assert_eq!(calls, vec![EmittedCall::CoordinateSystem("lamp".to_owned())]);
        assert!(emitter.calls().is_empty());
    }

    #[test]
    fn downcasts_through_the_trait() {
        let emitter: Box<dyn ProtocolEmitter> = Box::new(RecordingEmitter::new());
        assert!(emitter.as_any().downcast_ref::<RecordingEmitter>().is_some());
    }
}
