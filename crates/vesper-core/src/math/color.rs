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

//! Defines the `Color3` type used for surface color and opacity.

use serde::{Deserialize, Serialize};

/// An RGB triple with `f32` components.
///
/// The bytestream's `Color` and `Opacity` statements carry three channels and
/// no alpha, so this is deliberately not a four-channel type.
#[derive(
    Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Serialize, Deserialize,
)]
#[repr(C)]
pub struct Color3 {
    /// The red component.
    pub r: f32,
    /// The green component.
    pub g: f32,
    /// The blue component.
    pub b: f32,
}

impl Color3 {
    /// White (`[1.0, 1.0, 1.0]`), the default color and opacity.
    pub const WHITE: Self = Self::splat(1.0);
    /// Black (`[0.0, 0.0, 0.0]`).
    pub const BLACK: Self = Self::splat(0.0);

    /// Creates a new color from its three channels.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Creates a grey with all three channels set to `v`.
    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { r: v, g: v, b: v }
    }

    /// Returns the channels as an array.
    #[inline]
    pub const fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Color3 {
    fn default() -> Self {
        Self::WHITE
    }
}
