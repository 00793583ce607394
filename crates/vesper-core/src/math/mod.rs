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

//! Math primitives carried through scene descriptions.
//!
//! Transforms are column-major `Mat4`s composed so that `a * b` applies `b`
//! first. Angles are in **radians**.

/// Default tolerance for approximate matrix comparisons.
pub const EPSILON: f32 = 1e-5;

pub mod color;
pub mod geometry;
pub mod matrix;
pub mod vector;

pub use self::color::Color3;
pub use self::geometry::{Aabb, Aabb2};
pub use self::matrix::Mat4;
pub use self::vector::{IVec2, Vec2, Vec3, Vec4};
