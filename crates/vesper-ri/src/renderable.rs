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

//! Scene objects that describe themselves to a [`Renderer`].

use crate::error::RendererResult;
use crate::renderer::Renderer;
use std::fmt;
use vesper_core::math::Mat4;
use vesper_core::{CompoundData, Data};

/// Anything that can be described to a renderer.
///
/// Implementations must close every block they open, even on error.
pub trait Renderable {
    /// Issues the calls describing `self`.
    fn render(&self, renderer: &mut Renderer) -> RendererResult<()>;
}

/// The shader slots a [`Shader`] can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShaderType {
    /// Surface shading.
    Surface,
    /// Surface displacement.
    Displacement,
    /// Volume shading between surfaces and the camera.
    Atmosphere,
    /// Volume shading inside a surface.
    Interior,
    /// Volume shading outside a surface.
    Exterior,
    /// A light source.
    Light,
}

impl ShaderType {
    /// The RIB statement that binds this kind of shader.
    pub const fn statement(self) -> &'static str {
        match self {
            ShaderType::Surface => "Surface",
            ShaderType::Displacement => "Displacement",
            ShaderType::Atmosphere => "Atmosphere",
            ShaderType::Interior => "Interior",
            ShaderType::Exterior => "Exterior",
            ShaderType::Light => "LightSource",
        }
    }

    /// Lower-case name, as used in log messages.
    pub const fn name(self) -> &'static str {
        match self {
            ShaderType::Surface => "surface",
            ShaderType::Displacement => "displacement",
            ShaderType::Atmosphere => "atmosphere",
            ShaderType::Interior => "interior",
            ShaderType::Exterior => "exterior",
            ShaderType::Light => "light",
        }
    }
}

impl fmt::Display for ShaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of attributes applied in one go.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeState {
    /// Attribute values keyed by their full, namespaced name.
    pub attributes: CompoundData,
}

impl AttributeState {
    /// Creates an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one attribute.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Data>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl Renderable for AttributeState {
    fn render(&self, renderer: &mut Renderer) -> RendererResult<()> {
        for (key, value) in &self.attributes {
            renderer.set_attribute(key, value.clone())?;
        }
        Ok(())
    }
}

/// A static matrix concatenated onto the current transform.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatrixTransform {
    /// The matrix to concatenate.
    pub matrix: Mat4,
}

impl MatrixTransform {
    /// Wraps `matrix`.
    pub const fn new(matrix: Mat4) -> Self {
        Self { matrix }
    }
}

impl Renderable for MatrixTransform {
    fn render(&self, renderer: &mut Renderer) -> RendererResult<()> {
        renderer.concat_transform(&self.matrix)
    }
}

/// A transform sampled over time.
///
/// A single sample renders as a plain concatenation; two or more render as
/// a motion block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixMotionTransform {
    samples: Vec<(f32, Mat4)>,
}

impl MatrixMotionTransform {
    /// Creates a transform with no samples.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the matrix at `time`, replacing any sample already at that time.
    pub fn insert(&mut self, time: f32, matrix: Mat4) {
        match self.samples.binary_search_by(|(t, _)| t.total_cmp(&time)) {
            Ok(i) => self.samples[i].1 = matrix,
            Err(i) => self.samples.insert(i, (time, matrix)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_sample(mut self, time: f32, matrix: Mat4) -> Self {
        self.insert(time, matrix);
        self
    }

    /// The samples in increasing time order.
    pub fn samples(&self) -> &[(f32, Mat4)] {
        &self.samples
    }
}

impl Renderable for MatrixMotionTransform {
    fn render(&self, renderer: &mut Renderer) -> RendererResult<()> {
        match self.samples.as_slice() {
            [] => Ok(()),
            [(_, matrix)] => renderer.concat_transform(matrix),
            samples => {
                renderer.motion_begin(samples.iter().map(|(t, _)| *t).collect())?;
                for (_, matrix) in samples {
                    renderer.concat_transform(matrix)?;
                }
                renderer.motion_end()
            }
        }
    }
}

/// A shader bound to one of the [`ShaderType`] slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    /// Which slot the shader fills.
    pub kind: ShaderType,
    /// Shader name, e.g. `plastic`.
    pub name: String,
    /// Shader parameters.
    pub parameters: CompoundData,
}

impl Shader {
    /// Creates a shader with no parameters.
    pub fn new(kind: ShaderType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            parameters: CompoundData::new(),
        }
    }

    /// Adds or replaces a parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Data>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

impl Renderable for Shader {
    fn render(&self, renderer: &mut Renderer) -> RendererResult<()> {
        renderer.shader(self.kind, &self.name, &self.parameters)
    }
}

/// A transform, some state and child renderables, enclosed in an attribute
/// block.
#[derive(Default)]
pub struct Group {
    /// Concatenated before anything else in the group.
    pub transform: Mat4,
    /// Rendered before the children, typically attributes and shaders.
    pub state: Vec<Box<dyn Renderable>>,
    /// The group's contents.
    pub children: Vec<Box<dyn Renderable>>,
}

impl Group {
    /// Creates an empty group with an identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the group transform.
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Appends a state renderable.
    pub fn with_state(mut self, state: impl Renderable + 'static) -> Self {
        self.state.push(Box::new(state));
        self
    }

    /// Appends a child.
    pub fn with_child(mut self, child: impl Renderable + 'static) -> Self {
        self.children.push(Box::new(child));
        self
    }

    fn render_contents(&self, renderer: &mut Renderer) -> RendererResult<()> {
        if self.transform != Mat4::IDENTITY {
            renderer.concat_transform(&self.transform)?;
        }
        for state in &self.state {
            state.render(renderer)?;
        }
        for child in &self.children {
            child.render(renderer)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("transform", &self.transform)
            .field("state", &self.state.len())
            .field("children", &self.children.len())
            .finish()
    }
}

impl Renderable for Group {
    fn render(&self, renderer: &mut Renderer) -> RendererResult<()> {
        renderer.attribute_begin()?;
        let result = self.render_contents(renderer);
        let end = renderer.attribute_end();
        result.and(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_core::math::Vec3;

    #[test]
    fn motion_samples_stay_sorted() {
        let t = MatrixMotionTransform::new()
            .with_sample(1.0, Mat4::from_translation(Vec3::X))
            .with_sample(0.0, Mat4::IDENTITY)
            .with_sample(1.0, Mat4::from_translation(Vec3::Y));
        let times: Vec<f32> = t.samples().iter().map(|(t, _)| *t).collect();
        assert_eq!(times, vec![0.0, 1.0]);
        assert_eq!(t.samples()[1].1, Mat4::from_translation(Vec3::Y));
    }

    #[test]
    fn shader_statements() {
        assert_eq!(ShaderType::Light.statement(), "LightSource");
        assert_eq!(ShaderType::Displacement.to_string(), "displacement");
    }
}
