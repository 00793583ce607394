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

//! The typed value store used for options, attributes and call parameters.
//!
//! Every value handed to the renderer is a [`Data`], a tagged union whose
//! [`DataKind`] is checked against the attribute/option schema at resolution
//! time. Named collections of values are [`CompoundData`] maps; they iterate in
//! key order, which keeps emitted parameter lists deterministic.

use crate::math::{Aabb, Aabb2, Color3, IVec2, Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named set of values: attribute maps, option tables, parameter lists.
pub type CompoundData = BTreeMap<String, Data>;

/// A single heterogeneous value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Data {
    /// A boolean flag.
    Bool(bool),
    /// A signed integer.
    Int(i32),
    /// A single-precision float.
    Float(f32),
    /// A UTF-8 string.
    String(String),
    /// A pair of integers, e.g. an image resolution.
    V2i(IVec2),
    /// A pair of floats, e.g. a shutter interval.
    V2f(Vec2),
    /// A point or vector.
    V3f(Vec3),
    /// An RGB color.
    Color3f(Color3),
    /// A 2D rectangle.
    Box2f(Aabb2),
    /// A 3D box.
    Box3f(Aabb),
    /// A 4x4 transform.
    M44f(Mat4),
    /// An array of integers.
    IntVector(Vec<i32>),
    /// An array of floats.
    FloatVector(Vec<f32>),
    /// An array of strings.
    StringVector(Vec<String>),
    /// An array of points.
    V3fVector(Vec<Vec3>),
    /// An array of colors.
    Color3fVector(Vec<Color3>),
}

/// The kind tag of a [`Data`] value, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    /// See [`Data::Bool`].
    Bool,
    /// See [`Data::Int`].
    Int,
    /// See [`Data::Float`].
    Float,
    /// See [`Data::String`].
    String,
    /// See [`Data::V2i`].
    V2i,
    /// See [`Data::V2f`].
    V2f,
    /// See [`Data::V3f`].
    V3f,
    /// See [`Data::Color3f`].
    Color3f,
    /// See [`Data::Box2f`].
    Box2f,
    /// See [`Data::Box3f`].
    Box3f,
    /// See [`Data::M44f`].
    M44f,
    /// See [`Data::IntVector`].
    IntVector,
    /// See [`Data::FloatVector`].
    FloatVector,
    /// See [`Data::StringVector`].
    StringVector,
    /// See [`Data::V3fVector`].
    V3fVector,
    /// See [`Data::Color3fVector`].
    Color3fVector,
}

impl DataKind {
    /// Whether values of this kind hold a variable-length array.
    pub const fn is_vector(self) -> bool {
        matches!(
            self,
            DataKind::IntVector
                | DataKind::FloatVector
                | DataKind::StringVector
                | DataKind::V3fVector
                | DataKind::Color3fVector
        )
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::Bool => "BoolData",
            DataKind::Int => "IntData",
            DataKind::Float => "FloatData",
            DataKind::String => "StringData",
            DataKind::V2i => "V2iData",
            DataKind::V2f => "V2fData",
            DataKind::V3f => "V3fData",
            DataKind::Color3f => "Color3fData",
            DataKind::Box2f => "Box2fData",
            DataKind::Box3f => "Box3fData",
            DataKind::M44f => "M44fData",
            DataKind::IntVector => "IntVectorData",
            DataKind::FloatVector => "FloatVectorData",
            DataKind::StringVector => "StringVectorData",
            DataKind::V3fVector => "V3fVectorData",
            DataKind::Color3fVector => "Color3fVectorData",
        };
        f.write_str(name)
    }
}

impl Data {
    /// Returns the kind tag of this value.
    pub fn kind(&self) -> DataKind {
        match self {
            Data::Bool(_) => DataKind::Bool,
            Data::Int(_) => DataKind::Int,
            Data::Float(_) => DataKind::Float,
            Data::String(_) => DataKind::String,
            Data::V2i(_) => DataKind::V2i,
            Data::V2f(_) => DataKind::V2f,
            Data::V3f(_) => DataKind::V3f,
            Data::Color3f(_) => DataKind::Color3f,
            Data::Box2f(_) => DataKind::Box2f,
            Data::Box3f(_) => DataKind::Box3f,
            Data::M44f(_) => DataKind::M44f,
            Data::IntVector(_) => DataKind::IntVector,
            Data::FloatVector(_) => DataKind::FloatVector,
            Data::StringVector(_) => DataKind::StringVector,
            Data::V3fVector(_) => DataKind::V3fVector,
            Data::Color3fVector(_) => DataKind::Color3fVector,
        }
    }

    /// Number of elements: the array length for vector kinds, `1` otherwise.
    pub fn len(&self) -> usize {
        match self {
            Data::IntVector(v) => v.len(),
            Data::FloatVector(v) => v.len(),
            Data::StringVector(v) => v.len(),
            Data::V3fVector(v) => v.len(),
            Data::Color3fVector(v) => v.len(),
            _ => 1,
        }
    }

    /// Whether this is an empty array. Scalars are never empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value if it is a [`Data::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Data::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value if it is a [`Data::Int`].
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Data::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value if it is a [`Data::Float`].
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Data::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value if it is a [`Data::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the value if it is a [`Data::V2f`].
    pub fn as_v2f(&self) -> Option<Vec2> {
        match self {
            Data::V2f(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value if it is a [`Data::M44f`].
    pub fn as_matrix(&self) -> Option<&Mat4> {
        match self {
            Data::M44f(m) => Some(m),
            _ => None,
        }
    }

    /// Flattens numeric payloads into floats, in declaration order.
    ///
    /// Returns `None` for strings, string arrays and booleans.
    pub fn to_floats(&self) -> Option<Vec<f32>> {
        let floats = match self {
            Data::Int(v) => vec![*v as f32],
            Data::Float(v) => vec![*v],
            Data::V2i(v) => vec![v.x as f32, v.y as f32],
            Data::V2f(v) => v.to_array().to_vec(),
            Data::V3f(v) => v.to_array().to_vec(),
            Data::Color3f(c) => c.to_array().to_vec(),
            Data::Box2f(b) => b.to_window_array().to_vec(),
            Data::Box3f(b) => b.to_bound_array().to_vec(),
            Data::M44f(m) => m.to_cols_array().to_vec(),
            Data::IntVector(v) => v.iter().map(|i| *i as f32).collect(),
            Data::FloatVector(v) => v.clone(),
            Data::V3fVector(v) => v.iter().flat_map(|p| p.to_array()).collect(),
            Data::Color3fVector(v) => v.iter().flat_map(|c| c.to_array()).collect(),
            Data::Bool(_) | Data::String(_) | Data::StringVector(_) => return None,
        };
        Some(floats)
    }
}

macro_rules! impl_from_for_data {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Data {
                #[inline]
                fn from(value: $ty) -> Self {
                    Data::$variant(value)
                }
            }
        )*
    };
}

impl_from_for_data! {
    bool => Bool,
    i32 => Int,
    f32 => Float,
    String => String,
    IVec2 => V2i,
    Vec2 => V2f,
    Vec3 => V3f,
    Color3 => Color3f,
    Aabb2 => Box2f,
    Aabb => Box3f,
    Mat4 => M44f,
    Vec<i32> => IntVector,
    Vec<f32> => FloatVector,
    Vec<String> => StringVector,
    Vec<Vec3> => V3fVector,
    Vec<Color3> => Color3fVector,
}

impl From<&str> for Data {
    #[inline]
    fn from(value: &str) -> Self {
        Data::String(value.to_owned())
    }
}
