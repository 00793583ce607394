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

//! An opaque description of geometry handed to the emitter.

use crate::error::RendererResult;
use crate::renderable::Renderable;
use crate::renderer::Renderer;
use vesper_core::{CompoundData, Data, DataKind};

/// A geometric primitive: a protocol statement name, its positional
/// arguments and its named primitive variables.
///
/// The renderer never interprets the payload. It only compares topology
/// between motion samples and forwards the primitive to the emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    /// Statement name, e.g. `Sphere` or `PointsPolygons`.
    pub kind: String,
    /// Positional arguments. For polygon meshes these hold the topology.
    pub arguments: Vec<Data>,
    /// Named primitive variables, e.g. `P`.
    pub variables: CompoundData,
}

impl Primitive {
    /// Creates a primitive with no arguments or variables.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            arguments: Vec::new(),
            variables: CompoundData::new(),
        }
    }

    /// Appends a positional argument.
    pub fn with_argument(mut self, value: impl Into<Data>) -> Self {
        self.arguments.push(value.into());
        self
    }

    /// Adds or replaces a primitive variable.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Data>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Explains how `other` differs in topology from `self`, or returns
    /// `None` when the two can be samples of the same moving primitive.
    ///
    /// Topology means the statement name, the kind and length of every
    /// positional argument, the values of integer and string arguments
    /// (vertex counts, indices, scheme names) and the name, kind and length
    /// of every primitive variable. Float values, such as a sphere radius or
    /// point positions, may differ freely.
    pub fn topology_mismatch(&self, other: &Primitive) -> Option<String> {
        if self.kind != other.kind {
            return Some(format!("primitive '{}' vs '{}'", other.kind, self.kind));
        }
        if self.arguments.len() != other.arguments.len() {
            return Some(format!(
                "'{}' takes {} arguments vs {}",
                self.kind,
                other.arguments.len(),
                self.arguments.len()
            ));
        }
        for (index, (mine, theirs)) in self.arguments.iter().zip(&other.arguments).enumerate() {
            let same = if mine.kind() != theirs.kind() || mine.len() != theirs.len() {
                false
            } else if is_topological(mine.kind()) {
                mine == theirs
            } else {
                true
            };
            if !same {
                return Some(format!("'{}' argument {index} differs", self.kind));
            }
        }
        if self.variables.len() != other.variables.len() {
            return Some(format!(
                "{} primitive variables vs {}",
                other.variables.len(),
                self.variables.len()
            ));
        }
        for (name, value) in &self.variables {
            match other.variables.get(name) {
                None => return Some(format!("missing primitive variable '{name}'")),
                Some(o) if o.kind() != value.kind() || o.len() != value.len() => {
                    return Some(format!(
                        "primitive variable '{name}' is {} x{} vs {} x{}",
                        o.kind(),
                        o.len(),
                        value.kind(),
                        value.len()
                    ));
                }
                Some(_) => {}
            }
        }
        None
    }
}

fn is_topological(kind: DataKind) -> bool {
    matches!(
        kind,
        DataKind::Bool
            | DataKind::Int
            | DataKind::V2i
            | DataKind::IntVector
            | DataKind::String
            | DataKind::StringVector
    )
}

impl Renderable for Primitive {
    fn render(&self, renderer: &mut Renderer) -> RendererResult<()> {
        renderer.primitive(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_core::math::Vec3;

    fn quad(z: f32) -> Primitive {
        Primitive::new("PointsPolygons")
            .with_argument(vec![4])
            .with_argument(vec![0, 1, 2, 3])
            .with_variable(
                "P",
                vec![
                    Vec3::new(0.0, 0.0, z),
                    Vec3::new(1.0, 0.0, z),
                    Vec3::new(1.0, 1.0, z),
                    Vec3::new(0.0, 1.0, z),
                ],
            )
    }

    #[test]
    fn moved_points_keep_topology() {
        assert_eq!(quad(0.0).topology_mismatch(&quad(1.0)), None);
    }

    #[test]
    fn different_statement_breaks_topology() {
        let sphere = Primitive::new("Sphere").with_argument(1.0_f32);
        assert!(quad(0.0).topology_mismatch(&sphere).is_some());
    }

    #[test]
    fn different_indices_break_topology() {
        let mut other = quad(0.0);
        other.arguments[1] = Data::from(vec![3, 2, 1, 0]);
        assert!(quad(0.0).topology_mismatch(&other).is_some());
    }

    #[test]
    fn float_arguments_may_animate() {
        let small = Primitive::new("Sphere").with_argument(1.0_f32);
        let large = Primitive::new("Sphere").with_argument(2.0_f32);
        assert_eq!(small.topology_mismatch(&large), None);

        let mistyped = Primitive::new("Sphere").with_argument(2);
        assert!(small.topology_mismatch(&mistyped).is_some());
        let extra = large.clone().with_argument(0.5_f32);
        assert!(small.topology_mismatch(&extra).is_some());
    }

    #[test]
    fn variable_length_breaks_topology() {
        let other = quad(0.0).with_variable("P", vec![Vec3::ZERO]);
        let reason = quad(0.0).topology_mismatch(&other).expect("mismatch");
        assert!(reason.contains("'P'"));
    }
}
